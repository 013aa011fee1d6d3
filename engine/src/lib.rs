//! Rules engine for two-player draughts on an 8x8 board.
//!
//! Every proposed move goes through [`validate_move`], which enforces turn
//! order, forced capture and capture chains, and is then applied with
//! [`apply_move`]. [`play`] does both in one step. The engine never decides a
//! winner: `Game::winner` stays `None` and the status never reaches
//! `Finished`.

extern crate common;
extern crate itertools;
extern crate thiserror;

#[macro_use]
extern crate log;

pub mod capture;
pub mod error;
pub mod executor;
pub mod game;
pub mod rules;

use common::{Colour, Game};

pub use capture::{has_capture_from, player_has_any_capture};
pub use error::{EngineResult, Illegal};
pub use executor::{apply_move, Applied};
pub use game::{create_game, legal_moves, play, reset_game, seat_players};
pub use rules::{validate_move, Move};

/// Whether `colour` currently has a capture it is obliged to take.
pub fn any_capture_available(game: &Game, colour: Colour) -> bool {
    player_has_any_capture(game, colour)
}
