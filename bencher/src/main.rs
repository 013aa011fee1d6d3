extern crate tungstenite;
extern crate url;

extern crate serde_json;

#[macro_use]
extern crate log;
extern crate env_logger;

extern crate rand;

extern crate common;
extern crate engine;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use common::{Colour, Downstream, Game, Status, Upstream};

use std::env;
use std::io;
use std::net::TcpStream;
use std::process;
use std::thread;
use std::time::Instant;

use rand::Rng;

const DEFAULT_URL: &str = "ws://127.0.0.1:2826";

struct Player {
    room: String,
    name: String,
    plies: usize,
}

#[derive(Default, Debug)]
struct Tally {
    moves: usize,
    resets: usize,
    rejected: usize,
}

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

fn send(websocket: &mut Socket, message: &Upstream) -> tungstenite::Result<()> {
    let text = serde_json::to_string(message)
        .map_err(|e| tungstenite::Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    websocket.send(Message::text(text))
}

/// Picks one of our legal moves at random, or a reset when we are stuck.
fn respond(game: &Game, colour: Colour) -> Upstream {
    let moves = engine::legal_moves(game, colour);
    if moves.is_empty() {
        return Upstream::Reset;
    }

    let mv = moves[rand::thread_rng().gen_range(0..moves.len())];
    Upstream::Move {
        from: mv.from,
        to: mv.to,
    }
}

fn play(url: &url::Url, player: Player) -> tungstenite::Result<Tally> {
    let (mut websocket, _) = tungstenite::connect(url.as_str())?;
    send(
        &mut websocket,
        &Upstream::Join {
            room: player.room.clone(),
            name: player.name.clone(),
        },
    )?;

    let mut tally = Tally::default();
    let mut colour = None;
    let mut started = false;

    while tally.moves < player.plies {
        let text = match websocket.read()? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let message: Downstream = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(e) => {
                warn!("{}: badly formatted message from server: {}", player.name, e);
                continue;
            }
        };

        match message {
            Downstream::Joined { colour: seat, .. } => {
                debug!("{} seated as {:?} in {}", player.name, seat, player.room);
                colour = Some(seat);
            }
            Downstream::Rejected { reason, detail } => {
                warn!("{}: rejected ({:?}): {}", player.name, reason, detail);
                tally.rejected += 1;
                if colour.is_none() {
                    break;
                }
            }
            Downstream::State { game, .. } => {
                let colour = match colour {
                    Some(colour) => colour,
                    None => continue,
                };
                match game.status {
                    Status::Playing => started = true,
                    // The opponent left once play had begun.
                    _ if started => break,
                    _ => continue,
                }
                if game.current_player != colour {
                    continue;
                }

                let reply = respond(&game, colour);
                match reply {
                    Upstream::Reset => tally.resets += 1,
                    _ => tally.moves += 1,
                }
                send(&mut websocket, &reply)?;
            }
        }
    }

    if let Err(e) = websocket.close(None) {
        debug!("{}: close failed: {}", player.name, e);
    }
    Ok(tally)
}

fn parse_arg(args: &[String], index: usize, default: usize) -> usize {
    match args.get(index) {
        Some(arg) => arg.parse().unwrap_or_else(|_| {
            eprintln!("USAGE: bencher [url] [rooms] [plies]");
            process::exit(1);
        }),
        None => default,
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let url = match url::Url::parse(args.get(1).map(String::as_str).unwrap_or(DEFAULT_URL)) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Invalid server url: {}", e);
            process::exit(1);
        }
    };
    let rooms = parse_arg(&args, 2, 100);
    let plies = parse_arg(&args, 3, 40);

    info!("Playing {} rooms of {} plies against {}", rooms, plies, url);
    let start = Instant::now();

    let handles: Vec<_> = (0..rooms)
        .flat_map(|room| (0..2).map(move |seat| (room, seat)))
        .map(|(room, seat)| {
            let url = url.clone();
            let player = Player {
                room: format!("bench-{}", room),
                name: format!("bot-{}-{}", room, seat),
                plies,
            };
            thread::spawn(move || play(&url, player))
        })
        .collect();

    let mut total = Tally::default();
    for handle in handles {
        match handle.join() {
            Ok(Ok(tally)) => {
                total.moves += tally.moves;
                total.resets += tally.resets;
                total.rejected += tally.rejected;
            }
            Ok(Err(e)) => warn!("Client failed: {}", e),
            Err(_) => warn!("Client thread panicked"),
        }
    }

    let elapsed = start.elapsed();
    println!(
        "{} moves, {} resets, {} rejections in {:.2}s ({:.0} moves/s)",
        total.moves,
        total.resets,
        total.rejected,
        elapsed.as_secs_f64(),
        total.moves as f64 / elapsed.as_secs_f64().max(1e-9)
    );
}
