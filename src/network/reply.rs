//! Reply Formatting
//!
//! Builds every TXT payload the server emits. These strings are a wire
//! contract: downstream clients extract fields with regular expressions
//! (`Session ID: (\w+)`, `Player Token: (\w+)`, the `ERROR:` sentinel), so
//! punctuation and capitalization are load-bearing. Tests pin exact bytes.

use crate::game::state::{GameState, Player, Status};

/// Zone as shown inside payload examples: no trailing dot.
fn display_zone(zone: &str) -> &str {
    zone.trim_end_matches('.')
}

/// Payload for a freshly created session.
pub fn session_created(id: &str, zone: &str) -> String {
    let zone = display_zone(zone);
    format!(
        "New session created!\n\
         Session ID: {id}\n\
         \n\
         Use this ID in your queries:\n\
         - {id}.board.{zone}\n\
         - {id}.move-1-2-X.{zone}\n\
         - {id}.reset.{zone}"
    )
}

/// Payload listing active sessions.
pub fn session_list(ids: &[String], zone: &str) -> String {
    if ids.is_empty() {
        return format!(
            "No active sessions. Create one with: new.{}",
            display_zone(zone)
        );
    }
    let mut out = format!("Active sessions ({}):", ids.len());
    for id in ids {
        out.push('\n');
        out.push_str(id);
    }
    out
}

/// Plain board view.
pub fn board(id: &str, board_block: &str) -> String {
    format!("Session: {id}\n\n{board_block}")
}

/// Board view with a status line (move results, resets).
pub fn board_with_message(id: &str, message: &str, board_block: &str) -> String {
    format!("Session: {id}\n{message}\n{board_block}")
}

/// Payload for a successful join.
pub fn join_success(id: &str, token: &str, player: Player, zone: &str) -> String {
    let zone = display_zone(zone);
    format!(
        "Joined session: {id}\n\
         Player Token: {token}\n\
         You are playing as: {player}\n\
         \n\
         Use your token to make moves:\n\
         {id}-{token}-move-ROW-COL.{zone}\n\
         \n\
         Example: {id}-{token}-move-1-1.{zone}"
    )
}

/// Hint line appended to session-not-found errors.
pub fn create_hint(zone: &str) -> String {
    format!("Create one with: new.{}", display_zone(zone))
}

/// Bare error payload.
pub fn error(message: &str) -> String {
    format!("ERROR: {message}")
}

/// Error payload with a follow-up hint line.
pub fn error_with_context(message: &str, context: &str) -> String {
    format!("ERROR: {message}\n{context}")
}

/// JSON payload for a session's state.
///
/// While fewer than two players have joined the status is forced to
/// `pending` regardless of the engine's internal status.
pub fn json(state: &GameState, player_count: usize) -> serde_json::Result<String> {
    let mut state = state.clone();
    if player_count < 2 {
        state.status = Status::Pending;
    }
    serde_json::to_string(&state)
}

/// Help payload enumerating every command for the configured zone.
pub fn help(zone: &str) -> String {
    let zone = display_zone(zone);
    format!(
        "Tic-Tac-Toe over DNS\n\
         \n\
         Query these names as TXT records:\n\
         new.{zone} - create a session\n\
         list.{zone} - list active sessions\n\
         <id>.join.{zone} - join a session (returns your player token)\n\
         <id>.board.{zone} - show the board\n\
         <id>.json.{zone} - game state as JSON\n\
         <id>.reset.{zone} - reset the game\n\
         <id>-<token>-move-ROW-COL.{zone} - make a move (row and col in 0-2)\n\
         help.{zone} - this message"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::{Engine, GameEngine};

    const ZONE: &str = "game.local.";

    #[test]
    fn test_session_created() {
        assert_eq!(
            session_created("abc12345", ZONE),
            "New session created!\n\
             Session ID: abc12345\n\
             \n\
             Use this ID in your queries:\n\
             - abc12345.board.game.local\n\
             - abc12345.move-1-2-X.game.local\n\
             - abc12345.reset.game.local"
        );
    }

    #[test]
    fn test_session_list_empty() {
        assert_eq!(
            session_list(&[], ZONE),
            "No active sessions. Create one with: new.game.local"
        );
    }

    #[test]
    fn test_session_list() {
        let ids = vec!["aaaa1111".to_string(), "bbbb2222".to_string()];
        assert_eq!(
            session_list(&ids, ZONE),
            "Active sessions (2):\naaaa1111\nbbbb2222"
        );
    }

    #[test]
    fn test_board_payload() {
        let mut engine = GameEngine::new();
        engine.start_game();
        engine.make_move(0, 0, Player::X).unwrap();
        assert_eq!(
            board("abc12345", &engine.format_board()),
            "Session: abc12345\n\nX _ _\n_ _ _\n_ _ _\nTurn: O | Status: playing\n"
        );
    }

    #[test]
    fn test_board_with_message() {
        let engine = GameEngine::new();
        let payload = board_with_message("abc12345", "Move accepted!", &engine.format_board());
        assert!(payload.starts_with("Session: abc12345\nMove accepted!\n_ _ _\n"));
    }

    #[test]
    fn test_join_success() {
        assert_eq!(
            join_success("abc12345", "tok99999", Player::O, ZONE),
            "Joined session: abc12345\n\
             Player Token: tok99999\n\
             You are playing as: O\n\
             \n\
             Use your token to make moves:\n\
             abc12345-tok99999-move-ROW-COL.game.local\n\
             \n\
             Example: abc12345-tok99999-move-1-1.game.local"
        );
    }

    #[test]
    fn test_error_payloads() {
        assert_eq!(
            error("session not found: deadbeef"),
            "ERROR: session not found: deadbeef"
        );
        assert_eq!(
            error_with_context("session not found: deadbeef", "Create one with: new.game.local"),
            "ERROR: session not found: deadbeef\nCreate one with: new.game.local"
        );
    }

    #[test]
    fn test_json_forces_pending_below_two_players() {
        let mut engine = GameEngine::new();
        engine.start_game();
        let state = engine.state();

        let solo = json(&state, 1).unwrap();
        assert!(solo.contains(r#""status":"pending""#));

        let full = json(&state, 2).unwrap();
        assert!(full.contains(r#""status":"playing""#));
    }

    #[test]
    fn test_help_mentions_every_command() {
        let text = help(ZONE);
        for needle in [
            "new.game.local",
            "list.game.local",
            "<id>.join.game.local",
            "<id>.board.game.local",
            "<id>.json.game.local",
            "<id>.reset.game.local",
            "-move-ROW-COL.game.local",
            "help.game.local",
        ] {
            assert!(text.contains(needle), "help text missing {needle}");
        }
    }
}
