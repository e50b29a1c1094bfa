//! Conversation state: the append-only message history of one agent.

use synth_ai::Message;

/// Append-only message history. System messages may be pushed at any
/// point, not only at the start.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a history with a leading system instruction
    pub fn with_system(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keeps_order() {
        let mut conversation = Conversation::with_system("You are a customer.");
        conversation.push(Message::user("Hi, what can I get you?"));
        conversation.push(Message::system("Context: Burger Fries"));
        conversation.push(Message::assistant("A burger, please."));

        let roles: Vec<_> = conversation.messages().iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec!["system", "user", "system", "assistant"]);
        assert_eq!(conversation.messages()[3].text(), "A burger, please.");
    }
}
