//! # Tic-Tac-Toe DNS Server
//!
//! An authoritative DNS server whose zone is a multiplayer tic-tac-toe
//! service. Commands travel inside TXT question names; results come back as
//! TXT payloads, so a plain stub resolver is a complete game client:
//!
//! ```text
//! dig @server new.game.local TXT          # create a session
//! dig @server <id>.join.game.local TXT    # join, receive a bearer token
//! dig @server <id>-<token>-move-1-1.game.local TXT
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  TIC-TAC-TOE DNS SERVER                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config.rs       - Environment-driven configuration          │
//! │                                                              │
//! │  game/           - Match rules (plain data)                  │
//! │  ├── state.rs    - Board, players, status, JSON document     │
//! │  └── engine.rs   - Move validation, win/draw detection       │
//! │                                                              │
//! │  network/        - DNS front                                 │
//! │  ├── codec.rs    - RFC 1035 wire subset (TXT/NS responder)   │
//! │  ├── query.rs    - Sub-domain grammar -> game commands       │
//! │  ├── reply.rs    - Byte-stable TXT payloads                  │
//! │  ├── session.rs  - 2-player sessions, tokens, expiry reaper  │
//! │  └── server.rs   - UDP+TCP listeners and dispatch            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire discipline
//!
//! Reply payloads are parsed by downstream clients with regular
//! expressions; `network::reply` owns every byte of them. The zone grammar
//! and the per-message rcode policy (FORMERR for question-less messages,
//! NXDOMAIN off-zone, NODATA for non-TXT types on-zone) live in
//! `network::server`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use game::{Engine, GameEngine, GameState, MoveError, Player, Status};
pub use network::{DnsServer, ServerError, SessionManager};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
