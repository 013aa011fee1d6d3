extern crate mio;
extern crate slab;
extern crate thiserror;
extern crate tungstenite;

#[macro_use]
extern crate serde_derive;

extern crate serde_json;
extern crate toml;

#[macro_use]
extern crate log;
extern crate env_logger;

extern crate common;
extern crate engine;

mod config;
mod error;
mod room;

use slab::Slab;

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};

use tungstenite::handshake::server::{NoCallback, ServerHandshake};
use tungstenite::handshake::MidHandshake;
use tungstenite::HandshakeError::{self, Interrupted};
use tungstenite::{accept, Message, WebSocket};

use common::{Downstream, RejectReason, Upstream};

use std::env;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::process;

use config::Config;
use error::Error;
use room::{ClientId, Rooms};

type Handshake = ServerHandshake<TcpStream, NoCallback>;

enum Conn {
    /// Upgrade request not fully read or response not fully written yet.
    Handshaking(MidHandshake<Handshake>),
    Open(WebSocket<TcpStream>),
}

struct Client {
    conn: Option<Conn>,
    addr: SocketAddr,
}

impl Client {
    fn websocket(&mut self) -> Option<&mut WebSocket<TcpStream>> {
        match self.conn {
            Some(Conn::Open(ref mut websocket)) => Some(websocket),
            _ => None,
        }
    }

    fn stream(&mut self) -> Option<&mut TcpStream> {
        match self.conn {
            Some(Conn::Open(ref mut websocket)) => Some(websocket.get_mut()),
            Some(Conn::Handshaking(ref mut pending)) => Some(pending.get_mut().get_mut()),
            None => None,
        }
    }
}

struct State {
    poll: Poll,
    listener: TcpListener,
    clients: Slab<Client>,
    rooms: Rooms,
}

const SERVER: Token = Token(0);
const FIRST_CLIENT: Token = Token(1);

fn client_conn_token(index: usize) -> Token {
    Token(index + FIRST_CLIENT.0)
}

fn client_conn_untoken(token: Token) -> usize {
    token.0 - FIRST_CLIENT.0
}

fn is_client(token: Token) -> bool {
    token.0 >= FIRST_CLIENT.0
}

fn would_block(e: &tungstenite::Error) -> bool {
    match *e {
        tungstenite::Error::Io(ref e) => e.kind() == ErrorKind::WouldBlock,
        _ => false,
    }
}

/// Returns `false` when the connection is broken and the client should go.
fn send_client_message(clients: &mut Slab<Client>, index: ClientId, message: &Downstream) -> bool {
    let client = match clients.get_mut(index) {
        Some(client) => client,
        None => return true,
    };
    let addr = client.addr;
    let websocket = match client.websocket() {
        Some(websocket) => websocket,
        None => return true,
    };

    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!("Could not encode message for client {}: {}", index, e);
            return true;
        }
    };

    match websocket.send(Message::text(text)) {
        Ok(()) => true,
        Err(ref e) if would_block(e) => {
            debug!("Message to {} pending until writable", addr);
            true
        }
        Err(e) => {
            warn!("Error sending to websocket {}: {}", addr, e);
            false
        }
    }
}

impl State {
    fn bind(config: &Config) -> Result<State, Error> {
        let mut listener = TcpListener::bind(config.host)?;
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, SERVER, Interest::READABLE)?;

        Ok(State {
            poll,
            listener,
            clients: Slab::new(),
            rooms: Rooms::new(config.max_rooms),
        })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    fn serve(&mut self) -> Result<(), Error> {
        let mut events = Events::with_capacity(1024);

        loop {
            if let Err(e) = self.poll.poll(&mut events, None) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            for event in events.iter() {
                match event.token() {
                    SERVER => if let Err(e) = self.accept_clients() {
                        warn!("Accepting clients failed: {}", e);
                    },
                    client if is_client(client) => {
                        let index = client_conn_untoken(client);
                        if event.is_readable() {
                            self.client_readable_event(index);
                        }
                        if event.is_writable() {
                            self.client_writable_event(index);
                        }
                    }
                    Token(_) => (),
                }
            }
        }
    }

    fn accept_clients(&mut self) -> io::Result<()> {
        loop {
            let (stream, addr) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            };

            if let Err(e) = self.new_client(stream, addr) {
                warn!("Client accept failed for {}: {}", addr, e);
            }
        }
    }

    fn new_client(&mut self, mut stream: TcpStream, addr: SocketAddr) -> Result<(), Error> {
        let entry = self.clients.vacant_entry();
        let index = entry.key();
        self.poll.registry().register(
            &mut stream,
            client_conn_token(index),
            Interest::READABLE | Interest::WRITABLE,
        )?;
        debug!("Accepted {} as client {}", addr, index);
        entry.insert(Client { conn: None, addr });

        self.finish_round(index, accept(stream));
        Ok(())
    }

    /// Picks up a pending upgrade where it left off. Returns whether the
    /// connection is open for frames.
    fn resume_handshake(&mut self, index: ClientId) -> bool {
        let pending = match self.clients.get_mut(index) {
            Some(client) => match client.conn.take() {
                Some(Conn::Handshaking(pending)) => pending,
                open => {
                    client.conn = open;
                    return client.conn.is_some();
                }
            },
            None => return false,
        };

        self.finish_round(index, pending.handshake())
    }

    fn finish_round(
        &mut self,
        index: ClientId,
        round: Result<WebSocket<TcpStream>, HandshakeError<Handshake>>,
    ) -> bool {
        let client = match self.clients.get_mut(index) {
            Some(client) => client,
            None => return false,
        };

        match round {
            Ok(websocket) => {
                info!("Connection established: {} (client {})", client.addr, index);
                client.conn = Some(Conn::Open(websocket));
                true
            }
            Err(Interrupted(pending)) => {
                client.conn = Some(Conn::Handshaking(pending));
                false
            }
            Err(HandshakeError::Failure(e)) => {
                warn!("Handshake with {} failed: {}", client.addr, e);
                self.drop_client(index);
                false
            }
        }
    }

    fn client_readable_event(&mut self, index: ClientId) {
        if !self.resume_handshake(index) {
            return;
        }

        loop {
            let message = match self.clients.get_mut(index).and_then(Client::websocket) {
                Some(websocket) => websocket.read(),
                None => return,
            };

            let text = match message {
                Ok(Message::Text(text)) => text.to_string(),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Binary message from client {} is not UTF-8: {}", index, e);
                        self.reject_malformed(index, e.to_string());
                        continue;
                    }
                },
                Ok(_) => continue,
                Err(ref e) if would_block(e) => return,
                Err(e) => {
                    info!("Connection to client {} closed: {}", index, e);
                    self.drop_client(index);
                    return;
                }
            };

            self.client_message(index, &text);
        }
    }

    fn client_message(&mut self, index: ClientId, text: &str) {
        let message: Upstream = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Badly formatted text received from client {}: {}", index, e);
                self.reject_malformed(index, e.to_string());
                return;
            }
        };

        debug!(
            "Received from client {} in room {:?}: {:?}",
            index,
            self.rooms.room_of(index).map(|room| room.id()),
            message
        );
        let outbox = self.rooms.handle(index, message);
        self.deliver(outbox);
    }

    fn reject_malformed(&mut self, index: ClientId, detail: String) {
        let message = Downstream::Rejected {
            reason: RejectReason::Malformed,
            detail,
        };
        if !send_client_message(&mut self.clients, index, &message) {
            self.drop_client(index);
        }
    }

    /// Sends every queued message, then drops the clients whose sockets failed.
    fn deliver(&mut self, outbox: Vec<(ClientId, Downstream)>) {
        let mut broken = Vec::new();
        for (index, message) in outbox {
            if !send_client_message(&mut self.clients, index, &message) {
                broken.push(index);
            }
        }

        for index in broken {
            self.drop_client(index);
        }
    }

    fn client_writable_event(&mut self, index: ClientId) {
        if !self.resume_handshake(index) {
            return;
        }

        let result = match self.clients.get_mut(index).and_then(Client::websocket) {
            Some(websocket) => websocket.flush(),
            None => return,
        };

        match result {
            Ok(()) => (),
            Err(ref e) if would_block(e) => (),
            Err(e) => {
                info!("Connection to client {} lost while flushing: {}", index, e);
                self.drop_client(index);
            }
        }
    }

    fn drop_client(&mut self, index: ClientId) {
        if let Some(mut client) = self.clients.try_remove(index) {
            if let Some(stream) = client.stream() {
                if let Err(e) = self.poll.registry().deregister(stream) {
                    debug!("Deregistering {} failed: {}", client.addr, e);
                }
            }
            info!("Connection dropped: {}", client.addr);
        }

        let outbox = self.rooms.disconnect(index);
        self.deliver(outbox);

        if self.rooms.is_empty() {
            info!("No rooms open");
        } else {
            debug!("{} room(s) open", self.rooms.len());
        }
    }
}

fn run(config: &Config) -> Result<(), Error> {
    let mut state = State::bind(config)?;
    info!("Listening on {}", state.local_addr()?);
    state.serve()
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("USAGE: funnel configpath");
        process::exit(1);
    }

    let config = match Config::from_file(&args[1]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Could not load config {}: {}", args[1], e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&config) {
        error!("Server stopped: {}", e);
        process::exit(1);
    }
}
