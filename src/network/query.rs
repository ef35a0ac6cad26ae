//! Query Grammar
//!
//! Turns the lowercased, zone-stripped remainder of a QNAME into a game
//! command. Two shapes exist: dotted commands (`<sid>.join`) and the
//! single-label hyphen move form (`<sid>-<token>-move-<row>-<col>`).
//! Anything unrecognized degrades to help rather than an error.

/// Session id length bounds accepted by the grammar.
pub const SESSION_ID_MIN_LEN: usize = 4;
/// Upper bound; ids derive from 36-character UUID strings.
pub const SESSION_ID_MAX_LEN: usize = 36;

/// A recognized game command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Create a new session.
    Create,
    /// List active sessions.
    List,
    /// Show the help text.
    Help,
    /// Unrecognized input; rendered as help, logged for diagnostics.
    Unknown,
    /// Show a session's board.
    Board,
    /// Session state as JSON.
    Json,
    /// Join a session as a player.
    Join,
    /// Reset a session's game.
    Reset,
    /// Make a move.
    Move,
}

/// Row/column carried by the hyphen move form.
///
/// Values are parsed, not range-checked; the engine owns position
/// validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveParams {
    /// Attempted row.
    pub row: i32,
    /// Attempted column.
    pub col: i32,
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Target session id; empty for session-management commands.
    pub session_id: String,
    /// Player token; only the move form carries one.
    pub token: String,
    /// The recognized command.
    pub command: Command,
    /// Move coordinates for [`Command::Move`].
    pub move_params: Option<MoveParams>,
    /// The raw pre-zone remainder, kept for error messages and logs.
    pub raw: String,
}

impl Query {
    fn bare(command: Command, raw: &str) -> Self {
        Self {
            session_id: String::new(),
            token: String::new(),
            command,
            move_params: None,
            raw: raw.to_string(),
        }
    }

    fn on_session(session_id: &str, command: Command, raw: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            token: String::new(),
            command,
            move_params: None,
            raw: raw.to_string(),
        }
    }

    /// Parse the zone-stripped, lowercased QNAME remainder.
    pub fn parse(input: &str) -> Query {
        if input.is_empty() {
            return Query::bare(Command::Help, input);
        }
        // The move form is detected first; a malformed hyphen shape falls
        // through to dotted parsing.
        if input.contains("-move-") {
            if let Some(query) = parse_move(input) {
                return query;
            }
        }
        parse_dotted(input)
    }
}

/// `<sid>-<token>-move-<row>-<col>`, exactly five hyphen-separated fields.
fn parse_move(input: &str) -> Option<Query> {
    let fields: Vec<&str> = input.split('-').collect();
    if fields.len() != 5 || fields[2] != "move" {
        return None;
    }
    let row: i32 = fields[3].parse().ok()?;
    let col: i32 = fields[4].parse().ok()?;
    Some(Query {
        session_id: fields[0].to_string(),
        token: fields[1].to_string(),
        command: Command::Move,
        move_params: Some(MoveParams { row, col }),
        raw: input.to_string(),
    })
}

fn parse_dotted(input: &str) -> Query {
    let labels: Vec<&str> = input.split('.').collect();
    if labels.iter().any(|l| l.is_empty()) {
        return Query::bare(Command::Unknown, input);
    }
    match labels.as_slice() {
        [keyword] => match *keyword {
            "new" | "create" => Query::bare(Command::Create, input),
            "list" | "sessions" => Query::bare(Command::List, input),
            "help" => Query::bare(Command::Help, input),
            sid if is_well_formed_session_id(sid) => Query::on_session(sid, Command::Board, input),
            _ => Query::bare(Command::Unknown, input),
        },
        [sid, keyword] if is_well_formed_session_id(sid) => match *keyword {
            "join" => Query::on_session(sid, Command::Join, input),
            "board" | "status" => Query::on_session(sid, Command::Board, input),
            "reset" => Query::on_session(sid, Command::Reset, input),
            "json" => Query::on_session(sid, Command::Json, input),
            _ => Query::bare(Command::Unknown, input),
        },
        _ => Query::bare(Command::Unknown, input),
    }
}

/// Length check only; existence is the session manager's concern.
fn is_well_formed_session_id(sid: &str) -> bool {
    (SESSION_ID_MIN_LEN..=SESSION_ID_MAX_LEN).contains(&sid.len())
}
