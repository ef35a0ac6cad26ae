//! DNS Responder
//!
//! UDP and TCP listeners sharing one transport-agnostic message handler.
//! The handler decodes the query, applies the zone and record-type policy,
//! parses the grammar and dispatches to session management or a per-session
//! command. Every on-zone TXT query gets a well-formed answer; protocol
//! problems are expressed through rcodes only.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::game::engine::Engine;
use crate::network::codec::{
    self, Record, RecordData, Response, RCODE_FORMERR, RCODE_NXDOMAIN, TYPE_NS, TYPE_TXT,
};
use crate::network::query::{Command, Query};
use crate::network::reply;
use crate::network::session::{GameSession, SessionError, SessionManager};

/// Receive buffer size for UDP datagrams.
const MAX_UDP_PACKET: usize = 4096;

/// Responder errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind a listener.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// The DNS game server.
///
/// Cheap to clone; handler tasks share the config and session manager.
#[derive(Clone)]
pub struct DnsServer {
    config: Arc<Config>,
    sessions: Arc<SessionManager>,
    shutdown_tx: broadcast::Sender<()>,
}

impl DnsServer {
    /// Create a server from its configuration.
    pub fn new(config: Config) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let sessions = Arc::new(SessionManager::new(
            config.session_id_length,
            config.token_length,
        ));
        Self {
            config: Arc::new(config),
            sessions,
            shutdown_tx,
        }
    }

    /// Run both listeners and the expiry reaper until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let bind_addr = self.config.bind_addr();
        let udp = Arc::new(UdpSocket::bind(&bind_addr).await?);
        let tcp = TcpListener::bind(&bind_addr).await?;
        info!("DNS server listening on {} (udp+tcp)", bind_addr);
        info!("Authoritative for zone {}", self.config.zone);

        let reaper_sessions = self.sessions.clone();
        let cleanup_interval = self.config.cleanup_interval;
        let max_age = self.config.session_max_age;
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(reaper_sessions, cleanup_interval, max_age).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut buf = vec![0u8; MAX_UDP_PACKET];

        loop {
            tokio::select! {
                result = udp.recv_from(&mut buf) => match result {
                    Ok((len, peer)) => {
                        let packet = buf[..len].to_vec();
                        let server = self.clone();
                        let socket = udp.clone();
                        tokio::spawn(async move {
                            if let Some(response) = server.handle_message(&packet).await {
                                if let Err(e) = socket.send_to(&response, peer).await {
                                    warn!("Failed to send UDP reply to {}: {}", peer, e);
                                }
                            }
                        });
                    }
                    Err(e) => error!("UDP receive error: {}", e),
                },
                result = tcp.accept() => match result {
                    Ok((stream, peer)) => {
                        debug!("TCP connection from {}", peer);
                        let server = self.clone();
                        tokio::spawn(async move {
                            server.handle_tcp_connection(stream, peer).await;
                        });
                    }
                    Err(e) => error!("Accept error: {}", e),
                },
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();
        Ok(())
    }

    /// Signal the listeners to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.session_count().await
    }

    /// Periodic expiry reaper.
    async fn run_cleanup_loop(sessions: Arc<SessionManager>, period: Duration, max_age: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            sessions.cleanup_old_sessions(max_age).await;
        }
    }

    /// Serve one TCP connection; each message is 16-bit length framed.
    async fn handle_tcp_connection(&self, mut stream: TcpStream, peer: SocketAddr) {
        loop {
            let mut len_buf = [0u8; 2];
            if stream.read_exact(&mut len_buf).await.is_err() {
                break;
            }
            let len = u16::from_be_bytes(len_buf) as usize;
            if len == 0 {
                break;
            }
            let mut packet = vec![0u8; len];
            if let Err(e) = stream.read_exact(&mut packet).await {
                debug!("TCP read error from {}: {}", peer, e);
                break;
            }
            let Some(response) = self.handle_message(&packet).await else {
                break;
            };
            if stream
                .write_all(&(response.len() as u16).to_be_bytes())
                .await
                .is_err()
                || stream.write_all(&response).await.is_err()
            {
                debug!("TCP write error to {}", peer);
                break;
            }
        }
        debug!("TCP connection from {} closed", peer);
    }

    /// Handle one DNS message, transport-independent.
    ///
    /// Returns the encoded reply, or `None` when the packet is dropped
    /// (undecodable input never gets a response).
    pub async fn handle_message(&self, packet: &[u8]) -> Option<Vec<u8>> {
        let msg = match codec::decode(packet) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Dropping undecodable packet: {}", e);
                return None;
            }
        };
        let mut response = Response::for_query(&msg);

        match &msg.question {
            None => response.rcode = RCODE_FORMERR,
            Some(question) => {
                let qname = normalize_qname(&question.name);
                let on_zone = self.is_on_zone(&qname);
                match question.qtype {
                    TYPE_NS => {
                        if on_zone {
                            response.answers.push(Record {
                                name: self.config.zone.clone(),
                                ttl: self.config.ttl,
                                data: RecordData::Ns(self.config.ns_hostname.clone()),
                            });
                            if let Some(ip) = self.config.ns_ip {
                                response.additionals.push(Record {
                                    name: self.config.ns_hostname.clone(),
                                    ttl: self.config.ttl,
                                    data: RecordData::A(ip),
                                });
                            }
                        } else {
                            response.rcode = RCODE_NXDOMAIN;
                        }
                    }
                    TYPE_TXT => {
                        if on_zone {
                            let query = Query::parse(self.strip_zone(&qname));
                            debug!("Dispatching {:?} (raw: {:?})", query.command, query.raw);
                            let payload = self.dispatch(&query).await;
                            response.answers.push(Record {
                                name: question.name.clone(),
                                ttl: self.config.ttl,
                                data: RecordData::Txt(payload),
                            });
                        } else {
                            response.rcode = RCODE_NXDOMAIN;
                        }
                    }
                    // Any other type: NODATA on-zone, NXDOMAIN off-zone.
                    _ => {
                        if !on_zone {
                            response.rcode = RCODE_NXDOMAIN;
                        }
                    }
                }
            }
        }

        match response.encode() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!("Failed to encode response: {}", e);
                None
            }
        }
    }

    fn is_on_zone(&self, qname: &str) -> bool {
        qname == self.config.zone || qname.ends_with(&format!(".{}", self.config.zone))
    }

    /// Remainder of `qname` with the zone suffix removed.
    fn strip_zone<'a>(&self, qname: &'a str) -> &'a str {
        if qname == self.config.zone {
            ""
        } else {
            &qname[..qname.len() - self.config.zone.len() - 1]
        }
    }

    /// Produce the TXT payload for a parsed query.
    async fn dispatch(&self, query: &Query) -> String {
        let zone = &self.config.zone;
        match query.command {
            Command::Create => {
                let id = self.sessions.create_session().await;
                info!("Created session {}", id);
                reply::session_created(&id, zone)
            }
            Command::List => reply::session_list(&self.sessions.list_sessions().await, zone),
            Command::Help => reply::help(zone),
            Command::Unknown => {
                debug!("Unknown command: {:?}", query.raw);
                reply::help(zone)
            }
            Command::Board | Command::Json | Command::Join | Command::Reset | Command::Move => {
                match self.sessions.get_session(&query.session_id).await {
                    Some(session) => self.dispatch_session(query, &session).await,
                    None => reply::error_with_context(
                        &SessionError::NotFound(query.session_id.clone()).to_string(),
                        &reply::create_hint(zone),
                    ),
                }
            }
        }
    }

    /// Per-session commands, entered after the manager lookup succeeded.
    async fn dispatch_session(
        &self,
        query: &Query,
        session: &Arc<tokio::sync::RwLock<GameSession>>,
    ) -> String {
        match query.command {
            Command::Board => {
                let session = session.read().await;
                reply::board(session.id(), &session.engine().format_board())
            }
            Command::Json => {
                let session = session.read().await;
                match reply::json(&session.engine().state(), session.player_count()) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("Failed to serialize state for {}: {}", session.id(), e);
                        reply::error("internal error")
                    }
                }
            }
            Command::Join => {
                let mut session = session.write().await;
                match session.join(self.sessions.token_length()) {
                    Ok((token, player)) => {
                        info!("Player {} joined session {}", player, session.id());
                        reply::join_success(session.id(), &token, player, &self.config.zone)
                    }
                    Err(e) => reply::error(&e.to_string()),
                }
            }
            Command::Reset => {
                let mut session = session.write().await;
                session.reset();
                info!("Session {} reset", session.id());
                reply::board_with_message(
                    session.id(),
                    "Game reset!",
                    &session.engine().format_board(),
                )
            }
            Command::Move => {
                let mut session = session.write().await;
                if session.player_count() < 2 {
                    return reply::error("waiting for players to join (need 2 players)");
                }
                if query.token.is_empty() {
                    return reply::error("player token is required");
                }
                let Some(player) = session.player_for_token(&query.token) else {
                    return reply::error(
                        &SessionError::InvalidToken(query.token.clone()).to_string(),
                    );
                };
                let Some(params) = query.move_params else {
                    return reply::help(&self.config.zone);
                };
                match session.engine_mut().make_move(params.row, params.col, player) {
                    Ok(()) => reply::board_with_message(
                        session.id(),
                        "Move accepted!",
                        &session.engine().format_board(),
                    ),
                    Err(e) => reply::board_with_message(
                        session.id(),
                        &reply::error(&e.to_string()),
                        &session.engine().format_board(),
                    ),
                }
            }
            // Session-management commands never reach this path.
            _ => reply::help(&self.config.zone),
        }
    }
}

/// Lowercase and append the trailing dot zone matching expects.
fn normalize_qname(name: &str) -> String {
    let mut qname = name.to_lowercase();
    if !qname.ends_with('.') {
        qname.push('.');
    }
    qname
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{GameState, Player, Status};
    use crate::network::codec::{encode_query, TYPE_A};

    fn test_server() -> DnsServer {
        let config = Config {
            zone: "game.local.".to_string(),
            ..Config::default()
        };
        DnsServer::new(config)
    }

    /// Minimal response reader for assertions: rcode, answer count and the
    /// concatenated TXT payload of the first answer.
    fn read_response(bytes: &[u8]) -> (u8, u16, Option<String>) {
        let rcode = bytes[3] & 0x0F;
        let qdcount = u16::from_be_bytes([bytes[4], bytes[5]]);
        let ancount = u16::from_be_bytes([bytes[6], bytes[7]]);

        let mut pos = codec::HEADER_LEN;
        let skip_name = |pos: &mut usize| {
            while bytes[*pos] != 0 {
                *pos += bytes[*pos] as usize + 1;
            }
            *pos += 1;
        };
        if qdcount == 1 {
            skip_name(&mut pos);
            pos += 4;
        }
        if ancount == 0 {
            return (rcode, ancount, None);
        }
        skip_name(&mut pos);
        let rtype = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]);
        pos += 8; // type, class, ttl
        let rdlength = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
        pos += 2;
        if rtype != TYPE_TXT {
            return (rcode, ancount, None);
        }
        let mut payload = String::new();
        let end = pos + rdlength;
        while pos < end {
            let chunk_len = bytes[pos] as usize;
            pos += 1;
            payload.push_str(std::str::from_utf8(&bytes[pos..pos + chunk_len]).unwrap());
            pos += chunk_len;
        }
        (rcode, ancount, Some(payload))
    }

    async fn txt(server: &DnsServer, name: &str) -> String {
        let response = server
            .handle_message(&encode_query(1, name, TYPE_TXT))
            .await
            .expect("TXT query answered");
        let (rcode, _, payload) = read_response(&response);
        assert_eq!(rcode, codec::RCODE_NOERROR);
        payload.expect("TXT answer present")
    }

    fn field<'a>(payload: &'a str, label: &str) -> &'a str {
        payload
            .lines()
            .find_map(|line| line.strip_prefix(label))
            .unwrap_or_else(|| panic!("payload missing {label:?}: {payload}"))
    }

    async fn new_session(server: &DnsServer) -> String {
        let payload = txt(server, "new.game.local").await;
        field(&payload, "Session ID: ").to_string()
    }

    async fn join(server: &DnsServer, id: &str) -> (String, String) {
        let payload = txt(server, &format!("{id}.join.game.local")).await;
        (
            field(&payload, "Player Token: ").to_string(),
            field(&payload, "You are playing as: ").to_string(),
        )
    }

    async fn state_of(server: &DnsServer, id: &str) -> GameState {
        let payload = txt(server, &format!("{id}.json.game.local")).await;
        serde_json::from_str(&payload).unwrap()
    }

    #[tokio::test]
    async fn test_happy_path_to_x_wins() {
        let server = test_server();
        let id = new_session(&server).await;

        let (token_x, symbol_x) = join(&server, &id).await;
        assert_eq!(symbol_x, "X");
        let (token_o, symbol_o) = join(&server, &id).await;
        assert_eq!(symbol_o, "O");

        let state = state_of(&server, &id).await;
        assert_eq!(state.status, Status::Playing);
        assert_eq!(state.turn, Player::X);

        let payload = txt(&server, &format!("{id}-{token_x}-move-0-0.game.local")).await;
        assert!(payload.contains("Move accepted!"), "{payload}");
        let state = state_of(&server, &id).await;
        assert_eq!(state.board[0][0], Player::X);
        assert_eq!(state.turn, Player::O);

        for query in [
            format!("{id}-{token_o}-move-1-1.game.local"),
            format!("{id}-{token_x}-move-0-1.game.local"),
            format!("{id}-{token_o}-move-2-2.game.local"),
            format!("{id}-{token_x}-move-0-2.game.local"),
        ] {
            let payload = txt(&server, &query).await;
            assert!(payload.contains("Move accepted!"), "{payload}");
        }
        assert_eq!(state_of(&server, &id).await.status, Status::XWins);
    }

    #[tokio::test]
    async fn test_wrong_turn_reports_error_and_keeps_board() {
        let server = test_server();
        let id = new_session(&server).await;
        let (token_x, _) = join(&server, &id).await;
        join(&server, &id).await;

        txt(&server, &format!("{id}-{token_x}-move-0-0.game.local")).await;
        let payload = txt(&server, &format!("{id}-{token_x}-move-0-1.game.local")).await;
        assert!(
            payload.starts_with(&format!("Session: {id}\nERROR: not X's turn")),
            "{payload}"
        );

        let state = state_of(&server, &id).await;
        assert_eq!(state.board[0][0], Player::X);
        assert_eq!(state.board[0][1], Player::Empty);
    }

    #[tokio::test]
    async fn test_position_taken() {
        let server = test_server();
        let id = new_session(&server).await;
        let (token_x, _) = join(&server, &id).await;
        let (token_o, _) = join(&server, &id).await;

        txt(&server, &format!("{id}-{token_x}-move-0-0.game.local")).await;
        let before = state_of(&server, &id).await;
        let payload = txt(&server, &format!("{id}-{token_o}-move-0-0.game.local")).await;
        assert!(payload.contains("ERROR: position already taken"), "{payload}");
        assert_eq!(state_of(&server, &id).await.board, before.board);
    }

    #[tokio::test]
    async fn test_move_gates_in_order() {
        let server = test_server();
        let id = new_session(&server).await;

        // No players yet.
        let payload = txt(&server, &format!("{id}-sometok1-move-0-0.game.local")).await;
        assert_eq!(
            payload,
            "ERROR: waiting for players to join (need 2 players)"
        );

        let (token_x, _) = join(&server, &id).await;
        // Still only one player.
        let payload = txt(&server, &format!("{id}-{token_x}-move-0-0.game.local")).await;
        assert_eq!(
            payload,
            "ERROR: waiting for players to join (need 2 players)"
        );

        join(&server, &id).await;
        // Empty token.
        let payload = txt(&server, &format!("{id}--move-0-0.game.local")).await;
        assert_eq!(payload, "ERROR: player token is required");
        // Unregistered token.
        let payload = txt(&server, &format!("{id}-badtok99-move-0-0.game.local")).await;
        assert_eq!(payload, "ERROR: invalid player token: badtok99");
    }

    #[tokio::test]
    async fn test_session_not_found() {
        let server = test_server();
        let payload = txt(&server, "deadbeef.board.game.local").await;
        assert!(
            payload.starts_with("ERROR: session not found: deadbeef"),
            "{payload}"
        );
        assert!(payload.contains("new.game.local"), "{payload}");
    }

    #[tokio::test]
    async fn test_join_full_session() {
        let server = test_server();
        let id = new_session(&server).await;
        join(&server, &id).await;
        join(&server, &id).await;
        let payload = txt(&server, &format!("{id}.join.game.local")).await;
        assert_eq!(payload, "ERROR: session is full");
    }

    #[tokio::test]
    async fn test_reset_mid_game_resumes_playing() {
        let server = test_server();
        let id = new_session(&server).await;
        let (token_x, _) = join(&server, &id).await;
        join(&server, &id).await;
        txt(&server, &format!("{id}-{token_x}-move-0-0.game.local")).await;

        let payload = txt(&server, &format!("{id}.reset.game.local")).await;
        assert!(payload.contains("Game reset!"), "{payload}");

        let state = state_of(&server, &id).await;
        assert_eq!(state.status, Status::Playing);
        assert_eq!(state.turn, Player::X);
        assert!(state.board.iter().flatten().all(|c| *c == Player::Empty));
    }

    #[tokio::test]
    async fn test_json_pending_before_two_players() {
        let server = test_server();
        let id = new_session(&server).await;
        join(&server, &id).await;
        assert_eq!(state_of(&server, &id).await.status, Status::Pending);
    }

    #[tokio::test]
    async fn test_list_and_help() {
        let server = test_server();
        let empty = txt(&server, "list.game.local").await;
        assert_eq!(empty, "No active sessions. Create one with: new.game.local");

        let id = new_session(&server).await;
        let listing = txt(&server, "sessions.game.local").await;
        assert_eq!(listing, format!("Active sessions (1):\n{id}"));

        let help = txt(&server, "help.game.local").await;
        let apex = txt(&server, "game.local").await;
        let unknown = txt(&server, "what.is.this.game.local").await;
        assert_eq!(help, apex);
        assert_eq!(help, unknown);
    }

    #[tokio::test]
    async fn test_qname_is_lowercased() {
        let server = test_server();
        let id = new_session(&server).await;
        let payload = txt(
            &server,
            &format!("{}.BOARD.Game.LOCAL", id.to_uppercase()),
        )
        .await;
        assert!(payload.starts_with(&format!("Session: {id}\n")), "{payload}");
    }

    #[tokio::test]
    async fn test_off_zone_nxdomain() {
        let server = test_server();
        let response = server
            .handle_message(&encode_query(7, "foo.example.com", TYPE_TXT))
            .await
            .unwrap();
        let (rcode, ancount, _) = read_response(&response);
        assert_eq!(rcode, RCODE_NXDOMAIN);
        assert_eq!(ancount, 0);
    }

    #[tokio::test]
    async fn test_non_txt_on_zone_is_nodata() {
        let server = test_server();
        let response = server
            .handle_message(&encode_query(7, "new.game.local", TYPE_A))
            .await
            .unwrap();
        let (rcode, ancount, _) = read_response(&response);
        assert_eq!(rcode, codec::RCODE_NOERROR);
        assert_eq!(ancount, 0);

        let response = server
            .handle_message(&encode_query(8, "foo.example.com", TYPE_A))
            .await
            .unwrap();
        let (rcode, _, _) = read_response(&response);
        assert_eq!(rcode, RCODE_NXDOMAIN);
    }

    #[tokio::test]
    async fn test_ns_answer() {
        let server = test_server();
        let response = server
            .handle_message(&encode_query(9, "game.local", TYPE_NS))
            .await
            .unwrap();
        let (rcode, ancount, _) = read_response(&response);
        assert_eq!(rcode, codec::RCODE_NOERROR);
        assert_eq!(ancount, 1);

        let response = server
            .handle_message(&encode_query(9, "sub.game.local", TYPE_NS))
            .await
            .unwrap();
        let (_, ancount, _) = read_response(&response);
        assert_eq!(ancount, 1);

        let response = server
            .handle_message(&encode_query(9, "example.com", TYPE_NS))
            .await
            .unwrap();
        let (rcode, ancount, _) = read_response(&response);
        assert_eq!(rcode, RCODE_NXDOMAIN);
        assert_eq!(ancount, 0);
    }

    #[tokio::test]
    async fn test_no_question_is_formerr() {
        let server = test_server();
        let response = server.handle_message(&[0u8; 12]).await.unwrap();
        let (rcode, ancount, _) = read_response(&response);
        assert_eq!(rcode, RCODE_FORMERR);
        assert_eq!(ancount, 0);
    }

    #[tokio::test]
    async fn test_garbage_is_dropped_silently() {
        let server = test_server();
        assert!(server.handle_message(&[0xFF; 5]).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_gone_after_cleanup() {
        let server = test_server();
        let id = new_session(&server).await;

        tokio::time::advance(Duration::from_secs(121)).await;
        server
            .sessions
            .cleanup_old_sessions(server.config.session_max_age)
            .await;

        let payload = txt(&server, &format!("{id}.board.game.local")).await;
        assert!(
            payload.starts_with(&format!("ERROR: session not found: {id}")),
            "{payload}"
        );
    }
}
