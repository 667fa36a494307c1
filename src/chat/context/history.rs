use serde_json::Value;

use super::message::{ChatTurn, MessageRole};

/// Converts a loosely-typed history into provider-ready turns.
///
/// History arrives from heterogeneous sources (the UI, stored sessions, older
/// clients using the `parts` shape), so a malformed turn is skipped rather
/// than failing the whole request. Order is preserved.
pub fn normalize_history(raw: &[Value]) -> Vec<ChatTurn> {
    let turns = raw
        .iter()
        .enumerate()
        .filter_map(|(index, turn)| match normalize_turn(turn) {
            Some(turn) => Some(turn),
            None => {
                log::debug!("dropping malformed history turn at index {index}");
                None
            }
        })
        .collect::<Vec<_>>();

    if turns.len() != raw.len() {
        log::warn!(
            "dropped {} of {} history turns while normalizing",
            raw.len() - turns.len(),
            raw.len()
        );
    }

    turns
}

fn normalize_turn(turn: &Value) -> Option<ChatTurn> {
    let role = MessageRole::parse(turn.get("role")?.as_str()?)?;
    let content = turn_text(turn)?;

    Some(ChatTurn::new(role, content))
}

/// `content`, then `text`, then the first of `parts`. A field that is present
/// but not a string makes the turn malformed.
fn turn_text(turn: &Value) -> Option<&str> {
    if let Some(content) = turn.get("content") {
        return content.as_str();
    }

    if let Some(text) = turn.get("text") {
        return text.as_str();
    }

    turn.get("parts")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
}
