use common::{Board, Colour, Game, Piece, Position, Rank, Status};

use crate::capture::{capture_target, player_has_any_capture};
use crate::error::{EngineResult, Illegal};

/// A move that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    /// Square of the enemy piece removed by this move, if it is a capture.
    pub captured: Option<Position>,
}

impl Move {
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }
}

/// Decides whether `colour` may move the piece on `from` to `to`.
pub fn validate_move(game: &Game, from: Position, to: Position, colour: Colour) -> EngineResult<Move> {
    let result = check(game, from, to, colour);
    match result {
        Ok(ref mv) => debug!(
            "{} -> {} accepted for {:?}, capture: {:?}",
            from, to, colour, mv.captured
        ),
        Err(ref reason) => info!(
            "Move {} -> {} rejected for {:?}: {}",
            from, to, colour, reason
        ),
    }
    result
}

pub(crate) fn check(game: &Game, from: Position, to: Position, colour: Colour) -> EngineResult<Move> {
    if game.status != Status::Playing {
        return Err(Illegal::NotPlaying);
    }
    if game.current_player != colour {
        return Err(Illegal::NotYourTurn);
    }
    if from == to {
        return Err(Illegal::SameSquare);
    }
    if !to.on_board() {
        return Err(Illegal::OffBoard(to));
    }

    let piece = match game.board.get(from) {
        Some(piece) if piece.colour == colour => piece,
        _ => return Err(Illegal::NotYourPiece(from)),
    };

    if let Some(chain) = game.must_continue_from {
        if from != chain {
            return Err(Illegal::MustContinueFrom(chain));
        }
    }
    if game.board.get(to).is_some() {
        return Err(Illegal::Occupied(to));
    }

    if let Some(captured) = capture_target(&game.board, piece, from, to) {
        return Ok(Move {
            from,
            to,
            captured: Some(captured),
        });
    }

    simple_move(&game.board, piece, from, to)?;
    if game.must_continue_from.is_some() || player_has_any_capture(game, colour) {
        return Err(Illegal::MustCapture);
    }

    Ok(Move {
        from,
        to,
        captured: None,
    })
}

/// Shape rules for a non-capturing move.
fn simple_move(board: &Board, piece: Piece, from: Position, to: Position) -> EngineResult<()> {
    let rows = to.row - from.row;
    let cols = to.col - from.col;
    if rows.abs() != cols.abs() {
        return Err(Illegal::NotDiagonal);
    }

    match piece.rank {
        Rank::Man => {
            if rows.abs() > 1 {
                Err(Illegal::TooFar)
            } else if rows != piece.colour.forward() {
                Err(Illegal::Backward)
            } else {
                Ok(())
            }
        }
        Rank::King => {
            let blocked = from.ray(rows.signum(), cols.signum())
                .take_while(|&square| square != to)
                .any(|square| board.get(square).is_some());
            if blocked {
                Err(Illegal::Blocked)
            } else {
                Ok(())
            }
        }
    }
}
