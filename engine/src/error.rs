//! Reasons a proposed move is turned down.

use common::{Position, RejectReason};

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Illegal {
    #[error("the game is not in progress")]
    NotPlaying,

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("the piece must move to a different square")]
    SameSquare,

    #[error("square {0} is off the board")]
    OffBoard(Position),

    #[error("there is no piece of yours at {0}")]
    NotYourPiece(Position),

    #[error("the capture must continue from {0}")]
    MustContinueFrom(Position),

    #[error("square {0} is occupied")]
    Occupied(Position),

    #[error("pieces only move diagonally")]
    NotDiagonal,

    #[error("men only move forward unless capturing")]
    Backward,

    #[error("men move a single square unless capturing")]
    TooFar,

    #[error("the path is blocked")]
    Blocked,

    #[error("a capture is available and must be taken")]
    MustCapture,
}

pub type EngineResult<T> = Result<T, Illegal>;

impl Illegal {
    /// Wire code for relaying the rejection to a client.
    pub fn reason(&self) -> RejectReason {
        match *self {
            Illegal::MustCapture => RejectReason::MustCapture,
            Illegal::NotYourTurn => RejectReason::NotYourTurn,
            _ => RejectReason::Illegal,
        }
    }
}
