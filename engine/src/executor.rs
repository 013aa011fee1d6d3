use common::{Game, Piece, Position};

use crate::capture::{capture_target, has_capture_from};

/// What a single applied move did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub captured: Option<Position>,
    pub promoted: bool,
    /// The same piece must capture again from its landing square.
    pub continues: bool,
}

/// Applies a move that has already been validated. Returns `None` and leaves
/// the game untouched if there is no piece on `from`.
pub fn apply_move(game: &mut Game, from: Position, to: Position) -> Option<Applied> {
    let piece = match game.board.get(from) {
        Some(piece) => piece,
        None => {
            warn!("No piece at {} to apply a move with", from);
            return None;
        }
    };

    let captured = capture_target(&game.board, piece, from, to);
    game.board.clear(from);
    if let Some(square) = captured {
        game.board.clear(square);
    }

    let promoted = !piece.is_king() && to.row == piece.colour.crowning_row();
    let landed = if promoted {
        Piece::king(piece.colour)
    } else {
        piece
    };
    game.board.set(to, landed);

    let continues = captured.is_some() && has_capture_from(&game.board, to);
    if continues {
        game.must_continue_from = Some(to);
    } else {
        game.must_continue_from = None;
        game.current_player = game.current_player.opponent();
    }

    debug!(
        "Applied {} -> {}: captured {:?}, promoted {}, {:?} to move",
        from, to, captured, promoted, game.current_player
    );

    Some(Applied {
        captured,
        promoted,
        continues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Board, Colour, Status};

    fn game_with(pieces: &[(i8, i8, Piece)], to_move: Colour) -> Game {
        let mut board = Board::empty();
        for &(row, col, piece) in pieces {
            board.set(Position::new(row, col), piece);
        }
        Game {
            board,
            current_player: to_move,
            status: Status::Playing,
            winner: None,
            must_continue_from: None,
        }
    }

    #[test]
    fn simple_move_relocates_and_passes_the_turn() {
        let mut game = game_with(&[(5, 2, Piece::man(Colour::White))], Colour::White);
        let applied = apply_move(&mut game, Position::new(5, 2), Position::new(4, 3)).unwrap();

        assert_eq!(applied.captured, None);
        assert!(!applied.continues);
        assert_eq!(game.board.get(Position::new(5, 2)), None);
        assert_eq!(game.board.get(Position::new(4, 3)), Some(Piece::man(Colour::White)));
        assert_eq!(game.current_player, Colour::Black);
    }

    #[test]
    fn king_capture_removes_the_scanned_enemy() {
        let mut game = game_with(
            &[
                (7, 0, Piece::king(Colour::White)),
                (4, 3, Piece::man(Colour::Black)),
            ],
            Colour::White,
        );
        let applied = apply_move(&mut game, Position::new(7, 0), Position::new(2, 5)).unwrap();

        assert_eq!(applied.captured, Some(Position::new(4, 3)));
        assert_eq!(game.board.pieces(Colour::Black).count(), 0);
        assert_eq!(game.board.get(Position::new(2, 5)), Some(Piece::king(Colour::White)));
    }

    #[test]
    fn capture_with_follow_up_keeps_the_turn() {
        let mut game = game_with(
            &[
                (5, 0, Piece::man(Colour::White)),
                (4, 1, Piece::man(Colour::Black)),
                (2, 3, Piece::man(Colour::Black)),
            ],
            Colour::White,
        );
        let applied = apply_move(&mut game, Position::new(5, 0), Position::new(3, 2)).unwrap();

        assert!(applied.continues);
        assert_eq!(game.current_player, Colour::White);
        assert_eq!(game.must_continue_from, Some(Position::new(3, 2)));

        let applied = apply_move(&mut game, Position::new(3, 2), Position::new(1, 4)).unwrap();
        assert!(!applied.continues);
        assert_eq!(game.current_player, Colour::Black);
        assert_eq!(game.must_continue_from, None);
    }

    #[test]
    fn man_is_crowned_on_the_far_row() {
        let mut game = game_with(&[(6, 1, Piece::man(Colour::Black))], Colour::Black);
        let applied = apply_move(&mut game, Position::new(6, 1), Position::new(7, 2)).unwrap();

        assert!(applied.promoted);
        assert_eq!(game.board.get(Position::new(7, 2)), Some(Piece::king(Colour::Black)));
    }

    #[test]
    fn king_is_never_demoted_or_recrowned() {
        let mut game = game_with(&[(1, 2, Piece::king(Colour::White))], Colour::White);
        let applied = apply_move(&mut game, Position::new(1, 2), Position::new(0, 1)).unwrap();

        assert!(!applied.promoted);
        assert_eq!(game.board.get(Position::new(0, 1)), Some(Piece::king(Colour::White)));
    }

    #[test]
    fn missing_piece_leaves_game_untouched() {
        let mut game = game_with(&[], Colour::White);
        let before = game.clone();
        assert_eq!(apply_move(&mut game, Position::new(5, 0), Position::new(4, 1)), None);
        assert_eq!(game, before);
    }
}
