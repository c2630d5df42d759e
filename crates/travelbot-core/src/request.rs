//! Wire payload construction for the `generateContent` endpoint.

use serde::{Deserialize, Serialize};

use crate::state::{ChatRole, Turn};

/// Role names as the completion endpoint spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Model,
}

impl From<ChatRole> for WireRole {
    fn from(role: ChatRole) -> Self {
        match role {
            ChatRole::User => WireRole::User,
            ChatRole::Assistant => WireRole::Model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireContent {
    pub role: WireRole,
    pub parts: Vec<WirePart>,
}

impl WireContent {
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub contents: Vec<WireContent>,
}

/// Map turns to wire contents, prefixing `persona` onto the latest user turn.
///
/// The stored turns are left untouched; the persona only exists on the wire.
pub fn build_contents(turns: &[Turn], persona: &str) -> Vec<WireContent> {
    let last_user = turns.iter().rposition(|t| t.role == ChatRole::User);

    turns
        .iter()
        .enumerate()
        .map(|(idx, turn)| {
            let text = if Some(idx) == last_user {
                with_persona(persona, &turn.content)
            } else {
                turn.content.clone()
            };
            WireContent {
                role: turn.role.into(),
                parts: vec![WirePart { text }],
            }
        })
        .collect()
}

pub fn build_request(turns: &[Turn], persona: &str) -> GenerateRequest {
    GenerateRequest {
        contents: build_contents(turns, persona),
    }
}

fn with_persona(persona: &str, content: &str) -> String {
    let persona = persona.trim();
    if persona.is_empty() {
        content.to_string()
    } else {
        format!("{} Query: {}", persona, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format;

    const PERSONA: &str = "You are a travel consultant.";

    fn history() -> Vec<Turn> {
        vec![
            Turn::user("Best beaches?"),
            Turn::assistant("Mirissa", format("Mirissa")),
            Turn::user("And hikes?"),
        ]
    }

    #[test]
    fn test_length_and_roles_preserved() {
        let turns = history();
        let contents = build_contents(&turns, PERSONA);
        assert_eq!(contents.len(), turns.len());
        let roles: Vec<WireRole> = contents.iter().map(|c| c.role).collect();
        assert_eq!(roles, vec![WireRole::User, WireRole::Model, WireRole::User]);
    }

    #[test]
    fn test_persona_only_on_latest_user_turn() {
        let turns = history();
        let contents = build_contents(&turns, PERSONA);

        assert_eq!(contents[0].text(), "Best beaches?");
        assert_eq!(contents[1].text(), "Mirissa");
        assert_eq!(
            contents[2].text(),
            "You are a travel consultant. Query: And hikes?"
        );
        // stored turn unchanged
        assert_eq!(turns[2].content, "And hikes?");
    }

    #[test]
    fn test_latest_user_turn_need_not_be_last() {
        let turns = vec![Turn::user("Hi"), Turn::assistant("Hello", format("Hello"))];
        let contents = build_contents(&turns, PERSONA);
        assert_eq!(contents[0].text(), "You are a travel consultant. Query: Hi");
        assert_eq!(contents[1].text(), "Hello");
    }

    #[test]
    fn test_empty_persona_leaves_content_alone() {
        let contents = build_contents(&history(), "  ");
        assert_eq!(contents[2].text(), "And hikes?");
    }

    #[test]
    fn test_empty_history_gives_empty_payload() {
        assert!(build_contents(&[], PERSONA).is_empty());
    }

    #[test]
    fn test_request_serializes_to_wire_shape() {
        let request = build_request(&[Turn::user("Hi")], "");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Hi" }] }]
            })
        );
    }
}
