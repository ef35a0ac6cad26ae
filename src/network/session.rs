//! Session Management
//!
//! A session is one 2-player match identified by a short opaque id. The
//! manager owns the id-to-session map; each session owns its engine and the
//! bearer tokens it has issued. Sessions live until the expiry reaper
//! removes them; age is measured from creation, not last activity.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::game::engine::{Engine, GameEngine};
use crate::game::state::Player;

/// Session lifecycle errors surfaced to clients as TXT payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No session with this id.
    #[error("session not found: {0}")]
    NotFound(String),

    /// Both seats are taken.
    #[error("session is full")]
    SessionFull,

    /// The presented token was not issued by this session.
    #[error("invalid player token: {0}")]
    InvalidToken(String),
}

/// Draw a fresh UUID-shaped id truncated to `len` characters.
///
/// `len` is capped by the 36-character UUID string itself.
fn short_id(len: usize) -> String {
    let mut id = uuid::Uuid::new_v4().to_string();
    id.truncate(len.min(36));
    id
}

// =============================================================================
// GAME SESSION
// =============================================================================

/// One match: engine state plus the tokens issued to its players.
pub struct GameSession {
    id: String,
    engine: GameEngine,
    /// Bearer token to assigned symbol.
    players: BTreeMap<String, Player>,
    created_at: Instant,
}

impl GameSession {
    /// Create an empty session. The game stays `pending` until two players
    /// have joined.
    pub fn new(id: String) -> Self {
        Self {
            id,
            engine: GameEngine::new(),
            players: BTreeMap::new(),
            created_at: Instant::now(),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read access to the engine.
    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    /// Mutable access to the engine, for moves.
    pub fn engine_mut(&mut self) -> &mut GameEngine {
        &mut self.engine
    }

    /// Number of joined players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Symbol assigned to `token`, if this session issued it.
    pub fn player_for_token(&self, token: &str) -> Option<Player> {
        self.players.get(token).copied()
    }

    /// Time since the session was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Admit a player: issue a fresh token and assign a symbol.
    ///
    /// The first joiner plays X, the second O. Admitting the second player
    /// starts the game.
    pub fn join(&mut self, token_length: usize) -> Result<(String, Player), SessionError> {
        if self.players.len() >= 2 {
            return Err(SessionError::SessionFull);
        }
        let mut token = short_id(token_length);
        while self.players.contains_key(&token) {
            token = short_id(token_length);
        }
        let symbol = if self.players.is_empty() {
            Player::X
        } else {
            Player::O
        };
        self.players.insert(token.clone(), symbol);
        if self.players.len() == 2 {
            self.engine.start_game();
        }
        Ok((token, symbol))
    }

    /// Restore the initial board. A session that still has both players
    /// goes straight back to `playing`; a solo player waits in `pending`.
    pub fn reset(&mut self) {
        self.engine.reset();
        if self.players.len() == 2 {
            self.engine.start_game();
        }
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Owns all live sessions.
///
/// The map lock is held only for lookup/insert/remove; callers clone the
/// session `Arc` and enter the session's own lock afterwards.
pub struct SessionManager {
    sessions: RwLock<BTreeMap<String, Arc<RwLock<GameSession>>>>,
    id_length: usize,
    token_length: usize,
}

impl SessionManager {
    /// Create a manager issuing ids and tokens of the given lengths.
    pub fn new(id_length: usize, token_length: usize) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            id_length,
            token_length,
        }
    }

    /// Token length handed to sessions on join.
    pub fn token_length(&self) -> usize {
        self.token_length
    }

    /// Allocate a new session under a fresh unique id.
    pub async fn create_session(&self) -> String {
        let mut sessions = self.sessions.write().await;
        let mut id = short_id(self.id_length);
        while sessions.contains_key(&id) {
            id = short_id(self.id_length);
        }
        sessions.insert(id.clone(), Arc::new(RwLock::new(GameSession::new(id.clone()))));
        id
    }

    /// Look up a session by id.
    pub async fn get_session(&self, id: &str) -> Option<Arc<RwLock<GameSession>>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// Remove a session. Returns whether it existed.
    pub async fn delete_session(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id).is_some()
    }

    /// Ids of all live sessions, in sorted order.
    pub async fn list_sessions(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions.keys().cloned().collect()
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Remove every session older than `max_age`. Returns how many were
    /// reaped.
    ///
    /// Ages are read outside the map lock; they only grow, so an id judged
    /// expired stays expired by removal time.
    pub async fn cleanup_old_sessions(&self, max_age: Duration) -> usize {
        let candidates: Vec<(String, Arc<RwLock<GameSession>>)> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .map(|(id, session)| (id.clone(), session.clone()))
                .collect()
        };

        let mut expired = Vec::new();
        for (id, session) in candidates {
            if session.read().await.age() > max_age {
                expired.push(id);
            }
        }
        if expired.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        for id in &expired {
            sessions.remove(id);
            debug!("Expired session {}", id);
        }
        info!("Reaped {} expired session(s)", expired.len());
        expired.len()
    }
}
