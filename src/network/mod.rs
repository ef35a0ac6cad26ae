//! Network Layer
//!
//! The DNS front of the service: wire codec, sub-domain command grammar,
//! TXT reply formatting, session lifecycle and the UDP/TCP responder.
//! Game rules stay in `game/`; this layer only routes and formats.

pub mod codec;
pub mod query;
pub mod reply;
pub mod server;
pub mod session;

pub use codec::{CodecError, Question, Record, RecordData, Response};
pub use query::{Command, MoveParams, Query};
pub use server::{DnsServer, ServerError};
pub use session::{GameSession, SessionError, SessionManager};
