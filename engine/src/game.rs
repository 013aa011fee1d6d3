use common::{Board, Colour, Game, Piece, Position, Status};

use itertools::Itertools;

use crate::error::{EngineResult, Illegal};
use crate::executor::{apply_move, Applied};
use crate::rules::{check, validate_move, Move};

const HOME_ROWS: i8 = 3;

fn init_board() -> Board {
    let mut board = Board::empty();
    for at in Position::all().filter(|at| (at.row + at.col) % 2 == 1) {
        if at.row < HOME_ROWS {
            board.set(at, Piece::man(Colour::Black));
        } else if at.row >= common::BOARD_SIZE - HOME_ROWS {
            board.set(at, Piece::man(Colour::White));
        }
    }
    board
}

/// A fresh game waiting for its players, White to move.
pub fn create_game() -> Game {
    Game {
        board: init_board(),
        current_player: Colour::White,
        status: Status::Waiting,
        winner: None,
        must_continue_from: None,
    }
}

/// Updates `waiting`/`playing` for the number of seated players.
pub fn seat_players(game: &mut Game, players: usize) {
    let status = if players >= 2 {
        Status::Playing
    } else {
        Status::Waiting
    };
    if game.status != status {
        info!("Game status {:?} -> {:?} with {} player(s)", game.status, status, players);
        game.status = status;
    }
}

/// Discards the current game in favour of a fresh one.
pub fn reset_game(players: usize) -> Game {
    let mut game = create_game();
    seat_players(&mut game, players);
    game
}

/// Validates and applies in one step; a rejected move leaves `game` as it was.
pub fn play(game: &mut Game, from: Position, to: Position, colour: Colour) -> EngineResult<Applied> {
    let mv = validate_move(game, from, to, colour)?;
    apply_move(game, mv.from, mv.to).ok_or(Illegal::NotYourPiece(mv.from))
}

/// Every legal move `colour` has in this position.
pub fn legal_moves(game: &Game, colour: Colour) -> Vec<Move> {
    game.board
        .pieces(colour)
        .map(|(from, _)| from)
        .cartesian_product(Position::all().collect::<Vec<_>>())
        .filter_map(|(from, to)| check(game, from, to, colour).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_board_has_twelve_men_a_side() {
        let game = create_game();
        let white: Vec<_> = game.board.pieces(Colour::White).collect();
        let black: Vec<_> = game.board.pieces(Colour::Black).collect();

        assert_eq!(white.len(), 12);
        assert_eq!(black.len(), 12);
        assert!(white.iter().all(|&(at, piece)| at.row >= 5 && piece == Piece::man(Colour::White)));
        assert!(black.iter().all(|&(at, piece)| at.row <= 2 && piece == Piece::man(Colour::Black)));
        assert!(white.iter().chain(&black).all(|&(at, _)| (at.row + at.col) % 2 == 1));
    }

    #[test]
    fn status_follows_player_count() {
        let mut game = create_game();
        assert_eq!(game.status, Status::Waiting);

        seat_players(&mut game, 1);
        assert_eq!(game.status, Status::Waiting);
        seat_players(&mut game, 2);
        assert_eq!(game.status, Status::Playing);
        seat_players(&mut game, 1);
        assert_eq!(game.status, Status::Waiting);

        assert_eq!(reset_game(2).status, Status::Playing);
        assert_eq!(reset_game(0).status, Status::Waiting);
    }

    #[test]
    fn opening_position_has_seven_moves() {
        let game = reset_game(2);
        let moves = legal_moves(&game, Colour::White);
        assert_eq!(moves.len(), 7);
        assert!(moves.iter().all(|mv| !mv.is_capture() && mv.from.row == 5));
        assert!(legal_moves(&game, Colour::Black).is_empty());
    }

    #[test]
    fn rejected_play_changes_nothing() {
        let mut game = reset_game(2);
        let before = game.clone();
        assert!(play(&mut game, Position::new(5, 0), Position::new(3, 2), Colour::White).is_err());
        assert_eq!(game, before);
    }
}
