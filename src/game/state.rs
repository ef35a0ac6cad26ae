//! Game State Definitions
//!
//! Board, cell ownership and game status for a single 3x3 match.
//! Serde derives pin the JSON wire document consumed by external clients.

use serde::{Deserialize, Serialize};

// =============================================================================
// PLAYER
// =============================================================================

/// Owner of a board cell.
///
/// `Empty` marks an unclaimed cell and is distinct from either symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    /// The X symbol. Always moves first.
    #[serde(rename = "X")]
    X,
    /// The O symbol.
    #[serde(rename = "O")]
    O,
    /// Unclaimed cell. Serialized as an empty string on the wire.
    #[default]
    #[serde(rename = "")]
    Empty,
}

impl Player {
    /// The opposing symbol. `Empty` has no opponent and maps to itself.
    pub fn opponent(self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
            Player::Empty => Player::Empty,
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Player::X => "X",
            Player::O => "O",
            Player::Empty => "_",
        };
        f.write_str(s)
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Lifecycle status of a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Fewer than two players have joined.
    #[default]
    #[serde(rename = "pending")]
    Pending,
    /// Both players joined, moves are being accepted.
    #[serde(rename = "playing")]
    Playing,
    /// X completed a line.
    #[serde(rename = "X_wins")]
    XWins,
    /// O completed a line.
    #[serde(rename = "O_wins")]
    OWins,
    /// Board full with no winner.
    #[serde(rename = "draw")]
    Draw,
}

impl Status {
    /// Terminal statuses accept no further moves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::XWins | Status::OWins | Status::Draw)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Playing => "playing",
            Status::XWins => "X_wins",
            Status::OWins => "O_wins",
            Status::Draw => "draw",
        };
        f.write_str(s)
    }
}

// =============================================================================
// BOARD / GAME STATE
// =============================================================================

/// 3x3 grid of cell owners, row-major.
pub type Board = [[Player; 3]; 3];

/// Complete state of one match.
///
/// The serialized form is the wire contract:
/// `{"board":[[...],[...],[...]],"turn":"X|O","status":"..."}` with empty
/// cells as empty strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Current board contents.
    pub board: Board,
    /// Whose move it is. Meaningful only while `status` is `playing`.
    pub turn: Player,
    /// Match lifecycle status.
    pub status: Status,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Fresh match: empty board, X to move, waiting for players.
    pub fn new() -> Self {
        Self {
            board: Board::default(),
            turn: Player::X,
            status: Status::Pending,
        }
    }

    /// Whether `player` owns a full row, column or diagonal.
    pub fn has_winning_line(&self, player: Player) -> bool {
        let b = &self.board;
        for i in 0..3 {
            if b[i][0] == player && b[i][1] == player && b[i][2] == player {
                return true;
            }
            if b[0][i] == player && b[1][i] == player && b[2][i] == player {
                return true;
            }
        }
        (b[0][0] == player && b[1][1] == player && b[2][2] == player)
            || (b[0][2] == player && b[1][1] == player && b[2][0] == player)
    }

    /// Whether every cell is claimed.
    pub fn is_full(&self) -> bool {
        self.board
            .iter()
            .flatten()
            .all(|cell| *cell != Player::Empty)
    }
}
