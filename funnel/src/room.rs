//! Rooms pair two connections around one game. The store is owned by the
//! server loop; rooms appear on first join and vanish when the last player
//! leaves.

use std::collections::{BTreeMap, HashMap};

use common::{Colour, Downstream, Game, Position, RejectReason, Seat, Upstream};
use engine::{Applied, Illegal};
use thiserror::Error;

pub type ClientId = usize;

pub const SEATS: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("room {0} already has two players")]
    Full(String),

    #[error("already seated in room {0}")]
    AlreadySeated(String),

    #[error("not seated in any room")]
    NotSeated,

    #[error("the server is already hosting {0} rooms")]
    TooManyRooms(usize),

    #[error("room and player names must not be empty")]
    Malformed,

    #[error(transparent)]
    Move(#[from] Illegal),
}

impl RoomError {
    pub fn reason(&self) -> RejectReason {
        match *self {
            RoomError::Full(_) => RejectReason::RoomFull,
            RoomError::AlreadySeated(_) => RejectReason::AlreadySeated,
            RoomError::NotSeated => RejectReason::NotSeated,
            RoomError::TooManyRooms(_) => RejectReason::TooManyRooms,
            RoomError::Malformed => RejectReason::Malformed,
            RoomError::Move(ref illegal) => illegal.reason(),
        }
    }

    pub fn to_message(&self) -> Downstream {
        Downstream::Rejected {
            reason: self.reason(),
            detail: self.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Room {
    id: String,
    game: Game,
    players: BTreeMap<ClientId, Seat>,
}

impl Room {
    fn new(id: &str) -> Room {
        Room {
            id: id.to_owned(),
            game: engine::create_game(),
            players: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn members(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.players.keys().cloned()
    }

    pub fn seat(&self, client: ClientId) -> Option<&Seat> {
        self.players.get(&client)
    }

    pub fn seats(&self) -> Vec<Seat> {
        self.players.values().cloned().collect()
    }

    fn free_colour(&self) -> Colour {
        if self.players.values().any(|seat| seat.colour == Colour::White) {
            Colour::Black
        } else {
            Colour::White
        }
    }

    fn renew_game(&mut self) {
        self.game = engine::reset_game(self.players.len());
    }

    /// Full state of the room, sent after every change.
    pub fn snapshot(&self) -> Downstream {
        Downstream::State {
            room: self.id.clone(),
            game: self.game.clone(),
            players: self.seats(),
        }
    }

    fn broadcast(&self, outbox: &mut Vec<(ClientId, Downstream)>) {
        let snapshot = self.snapshot();
        outbox.extend(self.members().map(|client| (client, snapshot.clone())));
    }
}

#[derive(Debug, Default)]
pub struct Rooms {
    rooms: HashMap<String, Room>,
    seated: HashMap<ClientId, String>,
    max_rooms: Option<usize>,
}

impl Rooms {
    pub fn new(max_rooms: Option<usize>) -> Rooms {
        Rooms {
            rooms: HashMap::new(),
            seated: HashMap::new(),
            max_rooms,
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn room_of(&self, client: ClientId) -> Option<&Room> {
        self.seated.get(&client).and_then(|id| self.rooms.get(id))
    }

    pub fn join(&mut self, client: ClientId, room: &str, name: &str) -> Result<&Room, RoomError> {
        if room.trim().is_empty() || name.trim().is_empty() {
            return Err(RoomError::Malformed);
        }
        if let Some(current) = self.seated.get(&client) {
            return Err(RoomError::AlreadySeated(current.clone()));
        }
        if !self.rooms.contains_key(room) {
            if let Some(max) = self.max_rooms {
                if self.rooms.len() >= max {
                    return Err(RoomError::TooManyRooms(max));
                }
            }
            info!("Opening room {}", room);
        }

        let target = self
            .rooms
            .entry(room.to_owned())
            .or_insert_with(|| Room::new(room));
        if target.players.len() >= SEATS {
            info!("Join to full room {} by {} refused", room, name);
            return Err(RoomError::Full(room.to_owned()));
        }

        let colour = target.free_colour();
        target.players.insert(
            client,
            Seat {
                name: name.to_owned(),
                colour,
            },
        );
        engine::seat_players(&mut target.game, target.players.len());
        self.seated.insert(client, room.to_owned());
        info!("{} joined room {} as {:?}", name, room, colour);

        Ok(&*target)
    }

    /// Removes `client` from its room. The game restarts for whoever is left;
    /// returns `None` when the room closed or the client was not seated.
    pub fn leave(&mut self, client: ClientId) -> Option<&Room> {
        let id = self.seated.remove(&client)?;
        let emptied = {
            let room = self.rooms.get_mut(&id)?;
            if let Some(seat) = room.players.remove(&client) {
                info!("{} left room {}", seat.name, id);
            }
            room.players.is_empty()
        };

        if emptied {
            self.rooms.remove(&id);
            info!("Closing empty room {}", id);
            return None;
        }

        let room = self.rooms.get_mut(&id)?;
        room.renew_game();
        Some(&*room)
    }

    pub fn reset(&mut self, client: ClientId) -> Result<&Room, RoomError> {
        let id = self.seated.get(&client).ok_or(RoomError::NotSeated)?;
        let room = self.rooms.get_mut(id).ok_or(RoomError::NotSeated)?;
        room.renew_game();
        info!("Room {} reset", id);
        Ok(&*room)
    }

    pub fn play(
        &mut self,
        client: ClientId,
        from: Position,
        to: Position,
    ) -> Result<(&Room, Applied), RoomError> {
        let id = self.seated.get(&client).ok_or(RoomError::NotSeated)?;
        let room = self.rooms.get_mut(id).ok_or(RoomError::NotSeated)?;
        let colour = room
            .players
            .get(&client)
            .map(|seat| seat.colour)
            .ok_or(RoomError::NotSeated)?;

        let applied = engine::play(&mut room.game, from, to, colour)?;
        Ok((&*room, applied))
    }

    /// Handles one client message and returns what to send to whom.
    pub fn handle(&mut self, client: ClientId, message: Upstream) -> Vec<(ClientId, Downstream)> {
        let mut outbox = Vec::new();

        match message {
            Upstream::Join { room, name } => match self.join(client, &room, &name) {
                Ok(joined) => {
                    if let Some(seat) = joined.seat(client) {
                        outbox.push((
                            client,
                            Downstream::Joined {
                                room: joined.id().to_owned(),
                                colour: seat.colour,
                            },
                        ));
                    }
                    joined.broadcast(&mut outbox);
                }
                Err(e) => outbox.push((client, e.to_message())),
            },
            Upstream::Move { from, to } => match self.play(client, from, to) {
                Ok((room, applied)) => {
                    debug!(
                        "Room {}: {:?}, {:?} to move",
                        room.id(),
                        applied,
                        room.game().current_player
                    );
                    room.broadcast(&mut outbox);
                }
                Err(e) => outbox.push((client, e.to_message())),
            },
            Upstream::Reset => match self.reset(client) {
                Ok(room) => room.broadcast(&mut outbox),
                Err(e) => outbox.push((client, e.to_message())),
            },
        }

        outbox
    }

    /// Messages owed to the remaining player when `client` goes away.
    pub fn disconnect(&mut self, client: ClientId) -> Vec<(ClientId, Downstream)> {
        let mut outbox = Vec::new();
        if let Some(room) = self.leave(client) {
            room.broadcast(&mut outbox);
        }
        outbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Status;

    fn at(row: i8, col: i8) -> Position {
        Position::new(row, col)
    }

    fn seated_pair(rooms: &mut Rooms) {
        rooms.join(1, "lobby", "ann").unwrap();
        rooms.join(2, "lobby", "bob").unwrap();
    }

    #[test]
    fn first_joiner_is_white_and_waits() {
        let mut rooms = Rooms::new(None);
        let room = rooms.join(1, "lobby", "ann").unwrap();

        assert_eq!(room.seat(1).map(|seat| seat.colour), Some(Colour::White));
        assert_eq!(room.game().status, Status::Waiting);
    }

    #[test]
    fn second_joiner_is_black_and_starts_play() {
        let mut rooms = Rooms::new(None);
        seated_pair(&mut rooms);

        let room = rooms.room_of(1).unwrap();
        assert_eq!(room.seat(2).map(|seat| seat.colour), Some(Colour::Black));
        assert_eq!(room.game().status, Status::Playing);
    }

    #[test]
    fn third_joiner_is_refused() {
        let mut rooms = Rooms::new(None);
        seated_pair(&mut rooms);

        assert_eq!(
            rooms.join(3, "lobby", "cat").unwrap_err(),
            RoomError::Full("lobby".to_owned())
        );
        assert!(rooms.room_of(3).is_none());
    }

    #[test]
    fn cannot_sit_in_two_rooms() {
        let mut rooms = Rooms::new(None);
        rooms.join(1, "lobby", "ann").unwrap();
        assert_eq!(
            rooms.join(1, "other", "ann").unwrap_err(),
            RoomError::AlreadySeated("lobby".to_owned())
        );
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn empty_names_are_malformed() {
        let mut rooms = Rooms::new(None);
        assert_eq!(rooms.join(1, " ", "ann").unwrap_err(), RoomError::Malformed);
        assert_eq!(rooms.join(1, "lobby", "").unwrap_err(), RoomError::Malformed);
        assert!(rooms.is_empty());
    }

    #[test]
    fn room_limit_applies_to_new_rooms_only() {
        let mut rooms = Rooms::new(Some(1));
        rooms.join(1, "lobby", "ann").unwrap();

        assert_eq!(
            rooms.join(2, "other", "bob").unwrap_err(),
            RoomError::TooManyRooms(1)
        );
        assert!(rooms.join(2, "lobby", "bob").is_ok());
    }

    #[test]
    fn moves_use_the_seat_colour() {
        let mut rooms = Rooms::new(None);
        seated_pair(&mut rooms);

        assert_eq!(
            rooms.play(2, at(2, 1), at(3, 0)).unwrap_err(),
            RoomError::Move(Illegal::NotYourTurn)
        );
        let (room, _) = rooms.play(1, at(5, 0), at(4, 1)).unwrap();
        assert_eq!(room.game().current_player, Colour::Black);
        assert!(rooms.play(2, at(2, 1), at(3, 0)).is_ok());
    }

    #[test]
    fn unseated_clients_cannot_act() {
        let mut rooms = Rooms::new(None);
        assert_eq!(
            rooms.play(9, at(5, 0), at(4, 1)).unwrap_err(),
            RoomError::NotSeated
        );
        assert_eq!(rooms.reset(9).unwrap_err(), RoomError::NotSeated);
    }

    #[test]
    fn leaving_restarts_the_game_for_the_other_player() {
        let mut rooms = Rooms::new(None);
        seated_pair(&mut rooms);
        rooms.play(1, at(5, 0), at(4, 1)).unwrap();

        let room = rooms.leave(1).unwrap();
        assert_eq!(room.game(), &engine::create_game());
        assert_eq!(room.seats().len(), 1);

        // The freed white seat goes to the next joiner.
        let room = rooms.join(3, "lobby", "cat").unwrap();
        assert_eq!(room.seat(3).map(|seat| seat.colour), Some(Colour::White));
        assert_eq!(room.game().status, Status::Playing);
    }

    #[test]
    fn last_one_out_closes_the_room() {
        let mut rooms = Rooms::new(None);
        seated_pair(&mut rooms);

        assert!(rooms.leave(2).is_some());
        assert!(rooms.leave(1).is_none());
        assert!(rooms.is_empty());
        assert!(rooms.leave(1).is_none());
    }

    #[test]
    fn reset_keeps_players_seated() {
        let mut rooms = Rooms::new(None);
        seated_pair(&mut rooms);
        rooms.play(1, at(5, 0), at(4, 1)).unwrap();

        let room = rooms.reset(2).unwrap();
        assert_eq!(room.game(), &engine::reset_game(2));
        assert_eq!(room.seats().len(), 2);
    }

    #[test]
    fn state_changes_are_broadcast_to_both_players() {
        let mut rooms = Rooms::new(None);
        rooms.handle(
            1,
            Upstream::Join {
                room: "lobby".to_owned(),
                name: "ann".to_owned(),
            },
        );
        let outbox = rooms.handle(
            2,
            Upstream::Join {
                room: "lobby".to_owned(),
                name: "bob".to_owned(),
            },
        );

        assert_eq!(
            outbox[0],
            (
                2,
                Downstream::Joined {
                    room: "lobby".to_owned(),
                    colour: Colour::Black,
                }
            )
        );
        let recipients: Vec<_> = outbox[1..].iter().map(|&(client, _)| client).collect();
        assert_eq!(recipients, vec![1, 2]);

        let outbox = rooms.handle(
            1,
            Upstream::Move {
                from: at(5, 0),
                to: at(4, 1),
            },
        );
        assert_eq!(outbox.len(), 2);
        match outbox[0].1 {
            Downstream::State { ref game, .. } => assert_eq!(game.current_player, Colour::Black),
            ref other => panic!("expected a state snapshot, got {:?}", other),
        }
    }

    #[test]
    fn forced_capture_is_reported_to_the_mover_only() {
        let mut rooms = Rooms::new(None);
        seated_pair(&mut rooms);
        rooms.play(1, at(5, 2), at(4, 3)).unwrap();
        rooms.play(2, at(2, 5), at(3, 4)).unwrap();

        let outbox = rooms.handle(
            1,
            Upstream::Move {
                from: at(5, 0),
                to: at(4, 1),
            },
        );
        assert_eq!(outbox.len(), 1);
        match outbox[0] {
            (1, Downstream::Rejected { reason, .. }) => {
                assert_eq!(reason, RejectReason::MustCapture)
            }
            ref other => panic!("expected a rejection, got {:?}", other),
        }
    }

    #[test]
    fn disconnect_notifies_the_remaining_player() {
        let mut rooms = Rooms::new(None);
        seated_pair(&mut rooms);

        let outbox = rooms.disconnect(2);
        assert_eq!(outbox.len(), 1);
        match outbox[0] {
            (1, Downstream::State { ref game, ref players, .. }) => {
                assert_eq!(game.status, Status::Waiting);
                assert_eq!(players.len(), 1);
            }
            ref other => panic!("expected a state snapshot, got {:?}", other),
        }
        assert!(rooms.disconnect(2).is_empty());
    }
}
