//! Game Engine
//!
//! Move validation, win/draw detection and state transitions for one match.
//! The engine is plain data; the owning session's lock provides exclusion.

use crate::game::state::{GameState, Player, Status};

/// Capability set the responder depends on.
///
/// One production implementation exists ([`GameEngine`]); the seam lets
/// responder tests script engine behavior.
pub trait Engine {
    /// Independent snapshot of the current state.
    fn state(&self) -> GameState;

    /// Transition `pending` to `playing`. No-op in any other status.
    fn start_game(&mut self);

    /// Apply a move for `player` at (`row`, `col`).
    fn make_move(&mut self, row: i32, col: i32, player: Player) -> Result<(), MoveError>;

    /// Restore the initial state: empty board, X to move, `pending`.
    fn reset(&mut self);

    /// Human-readable board block with a turn/status trailer.
    fn format_board(&self) -> String;

    /// Canonical JSON document for the current state.
    fn state_json(&self) -> serde_json::Result<String>;
}

/// Why a move was rejected.
///
/// Preconditions are checked in declaration order; the first failure wins.
/// The `Display` strings travel to clients inside `ERROR:` TXT payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// The match is not accepting moves.
    #[error("game is over (status: {status})")]
    GameOver {
        /// Status at the time of the attempt.
        status: Status,
    },

    /// It is the other player's move.
    #[error("not {player}'s turn (current turn: {turn})")]
    WrongTurn {
        /// The player who attempted the move.
        player: Player,
        /// The player whose move it actually is.
        turn: Player,
    },

    /// Row or column outside the 3x3 grid.
    #[error("invalid position: ({row}, {col})")]
    InvalidPosition {
        /// Attempted row.
        row: i32,
        /// Attempted column.
        col: i32,
    },

    /// The target cell is already claimed.
    #[error("position already taken")]
    PositionTaken,
}

/// The production engine.
#[derive(Debug, Clone, Default)]
pub struct GameEngine {
    state: GameState,
}

impl GameEngine {
    /// Create an engine in the initial state.
    pub fn new() -> Self {
        Self {
            state: GameState::new(),
        }
    }
}

impl Engine for GameEngine {
    fn state(&self) -> GameState {
        self.state.clone()
    }

    fn start_game(&mut self) {
        if self.state.status == Status::Pending {
            self.state.status = Status::Playing;
        }
    }

    fn make_move(&mut self, row: i32, col: i32, player: Player) -> Result<(), MoveError> {
        if self.state.status != Status::Playing {
            return Err(MoveError::GameOver {
                status: self.state.status,
            });
        }
        if player != self.state.turn {
            return Err(MoveError::WrongTurn {
                player,
                turn: self.state.turn,
            });
        }
        if !(0..=2).contains(&row) || !(0..=2).contains(&col) {
            return Err(MoveError::InvalidPosition { row, col });
        }
        let (r, c) = (row as usize, col as usize);
        if self.state.board[r][c] != Player::Empty {
            return Err(MoveError::PositionTaken);
        }

        self.state.board[r][c] = player;

        if self.state.has_winning_line(player) {
            self.state.status = match player {
                Player::O => Status::OWins,
                _ => Status::XWins,
            };
        } else if self.state.is_full() {
            self.state.status = Status::Draw;
        } else {
            self.state.turn = self.state.turn.opponent();
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.state = GameState::new();
    }

    fn format_board(&self) -> String {
        let mut out = String::new();
        for row in &self.state.board {
            out.push_str(&format!("{} {} {}\n", row[0], row[1], row[2]));
        }
        out.push_str(&format!(
            "Turn: {} | Status: {}\n",
            self.state.turn, self.state.status
        ));
        out
    }

    fn state_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.state)
    }
}
