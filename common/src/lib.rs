#[macro_use]
extern crate serde_derive;

use std::fmt;

pub const BOARD_SIZE: i8 = 8;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Colour {
    White,
    Black,
}

impl Colour {
    pub fn opponent(self) -> Colour {
        match self {
            Colour::White => Colour::Black,
            Colour::Black => Colour::White,
        }
    }

    /// Row step a man takes on a simple move.
    pub fn forward(self) -> i8 {
        match self {
            Colour::White => -1,
            Colour::Black => 1,
        }
    }

    /// The row on which a man of this colour is crowned.
    pub fn crowning_row(self) -> i8 {
        match self {
            Colour::White => 0,
            Colour::Black => BOARD_SIZE - 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Man,
    King,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub colour: Colour,
    pub rank: Rank,
}

impl Piece {
    pub fn man(colour: Colour) -> Piece {
        Piece {
            colour,
            rank: Rank::Man,
        }
    }

    pub fn king(colour: Colour) -> Piece {
        Piece {
            colour,
            rank: Rank::King,
        }
    }

    pub fn is_king(&self) -> bool {
        self.rank == Rank::King
    }
}

/// A square on the board. Coordinates are signed so that scans may step
/// past the edge; anything outside `0..8` is off the board.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: i8,
    pub col: i8,
}

impl Position {
    pub fn new(row: i8, col: i8) -> Position {
        Position { row, col }
    }

    pub fn on_board(&self) -> bool {
        (0..BOARD_SIZE).contains(&self.row) && (0..BOARD_SIZE).contains(&self.col)
    }

    pub fn offset(&self, rows: i8, cols: i8) -> Position {
        Position {
            row: self.row.saturating_add(rows),
            col: self.col.saturating_add(cols),
        }
    }

    /// Squares along a direction, nearest first, stopping at the edge.
    pub fn ray(self, rows: i8, cols: i8) -> impl Iterator<Item = Position> {
        (1..BOARD_SIZE)
            .map(move |n| self.offset(rows * n, cols * n))
            .take_while(Position::on_board)
    }

    /// Every square of the board, row by row.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Position { row, col }))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board(pub [[Option<Piece>; 8]; 8]);

impl Board {
    pub fn empty() -> Board {
        Board([[None; 8]; 8])
    }

    /// Piece at `at`, or `None` if the square is empty or off the board.
    pub fn get(&self, at: Position) -> Option<Piece> {
        if at.on_board() {
            self.0[at.row as usize][at.col as usize]
        } else {
            None
        }
    }

    pub fn set(&mut self, at: Position, piece: Piece) {
        if at.on_board() {
            self.0[at.row as usize][at.col as usize] = Some(piece);
        }
    }

    pub fn take(&mut self, at: Position) -> Option<Piece> {
        if at.on_board() {
            self.0[at.row as usize][at.col as usize].take()
        } else {
            None
        }
    }

    pub fn clear(&mut self, at: Position) {
        self.take(at);
    }

    pub fn pieces(&self, colour: Colour) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all().filter_map(move |at| match self.get(at) {
            Some(piece) if piece.colour == colour => Some((at, piece)),
            _ => None,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Waiting,
    Playing,
    Finished,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub board: Board,
    pub current_player: Colour,
    pub status: Status,
    pub winner: Option<Colour>,
    pub must_continue_from: Option<Position>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub name: String,
    pub colour: Colour,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    Illegal,
    MustCapture,
    NotYourTurn,
    RoomFull,
    NotSeated,
    AlreadySeated,
    TooManyRooms,
    Malformed,
}

/// Client to server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Upstream {
    Join { room: String, name: String },
    Move { from: Position, to: Position },
    Reset,
}

/// Server to client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Downstream {
    Joined { room: String, colour: Colour },
    State {
        room: String,
        game: Game,
        players: Vec<Seat>,
    },
    Rejected { reason: RejectReason, detail: String },
}
