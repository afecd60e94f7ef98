use serde::{Deserialize, Serialize};

const GREETING: &str = "Hi, I'm a chatbot who can search the web. How can I help you?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Ordered chat history for one session. Seeded with the assistant
/// greeting; grows by appending, never shrinks.
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            turns: vec![ChatTurn {
                role: Role::Assistant,
                content: GREETING.to_string(),
            }],
        }
    }

    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[ChatTurn] {
        &self.turns
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transcript_starts_with_greeting() {
        let transcript = Transcript::new();
        let messages = transcript.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert!(messages[0].content.contains("search the web"));
    }

    #[test]
    fn add_message_is_append_only() {
        let mut transcript = Transcript::new();
        transcript.add_message(Role::User, "first");
        transcript.add_message(Role::Assistant, "second");
        transcript.add_message(Role::User, "third");

        let messages = transcript.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "first");
        assert_eq!(messages[2].content, "second");
        assert_eq!(messages[3].content, "third");
        assert_eq!(messages[3].role, Role::User);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let turn = ChatTurn {
            role: Role::User,
            content: "hi".to_string(),
        };
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
