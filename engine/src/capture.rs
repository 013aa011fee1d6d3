//! Capture detection for men and kings.
//!
//! Men jump an adjacent enemy onto the empty square directly behind it, in
//! any of the four diagonal directions. Kings capture at range: the path up
//! to the enemy must be empty, and they may land on any empty square past it
//! provided no second piece sits between the enemy and the landing square.

use common::{Board, Colour, Game, Piece, Position, Rank};

pub const DIRECTIONS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Whether the piece standing on `from` has at least one capture available.
pub fn has_capture_from(board: &Board, from: Position) -> bool {
    let piece = match board.get(from) {
        Some(piece) => piece,
        None => return false,
    };

    match piece.rank {
        Rank::Man => DIRECTIONS
            .iter()
            .any(|&(rows, cols)| man_can_jump(board, piece.colour, from, rows, cols)),
        Rank::King => DIRECTIONS
            .iter()
            .any(|&(rows, cols)| king_can_capture(board, piece.colour, from, rows, cols)),
    }
}

fn man_can_jump(board: &Board, colour: Colour, from: Position, rows: i8, cols: i8) -> bool {
    let over = from.offset(rows, cols);
    let landing = from.offset(2 * rows, 2 * cols);

    board.get(over).map_or(false, |piece| piece.colour != colour)
        && landing.on_board()
        && board.get(landing).is_none()
}

fn king_can_capture(board: &Board, colour: Colour, from: Position, rows: i8, cols: i8) -> bool {
    let mut enemy_found = false;
    for square in from.ray(rows, cols) {
        match board.get(square) {
            None if enemy_found => return true,
            None => (),
            Some(piece) if piece.colour == colour || enemy_found => return false,
            Some(_) => enemy_found = true,
        }
    }
    false
}

/// Whether `colour` is obliged to capture this turn. While a chain is in
/// progress only the continuing piece counts.
pub fn player_has_any_capture(game: &Game, colour: Colour) -> bool {
    if let Some(chain) = game.must_continue_from {
        return has_capture_from(&game.board, chain);
    }

    game.board
        .pieces(colour)
        .any(|(at, _)| has_capture_from(&game.board, at))
}

/// The square of the enemy piece that moving `piece` from `from` to `to`
/// would capture, or `None` if that move is not a capture.
pub fn capture_target(board: &Board, piece: Piece, from: Position, to: Position) -> Option<Position> {
    match piece.rank {
        Rank::Man => man_capture_target(board, piece.colour, from, to),
        Rank::King => king_capture_target(board, piece.colour, from, to),
    }
}

fn man_capture_target(board: &Board, colour: Colour, from: Position, to: Position) -> Option<Position> {
    if !from.on_board() || !to.on_board() {
        return None;
    }

    let rows = to.row - from.row;
    let cols = to.col - from.col;
    if rows.abs() != 2 || cols.abs() != 2 || board.get(to).is_some() {
        return None;
    }

    let over = from.offset(rows / 2, cols / 2);
    match board.get(over) {
        Some(piece) if piece.colour != colour => Some(over),
        _ => None,
    }
}

fn king_capture_target(board: &Board, colour: Colour, from: Position, to: Position) -> Option<Position> {
    if !from.on_board() || !to.on_board() {
        return None;
    }

    let rows = to.row - from.row;
    let cols = to.col - from.col;
    if rows == 0 || rows.abs() != cols.abs() || board.get(to).is_some() {
        return None;
    }

    let mut enemy = None;
    for square in from.ray(rows.signum(), cols.signum()).take_while(|&square| square != to) {
        match board.get(square) {
            None => (),
            Some(piece) if piece.colour == colour => return None,
            Some(_) if enemy.is_some() => return None,
            Some(_) => enemy = Some(square),
        }
    }
    enemy
}
