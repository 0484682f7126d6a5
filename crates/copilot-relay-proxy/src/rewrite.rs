//! Bypass injection.
//!
//! When enabled, a conversation that consists of exactly one user turn is
//! prefixed with a synthetic `user: "hey"` / `assistant: "hello"` exchange.
//! Every other conversation passes through untouched.

use serde_json::{json, Value};

use crate::types::{Message, Role};

pub const BYPASS_USER_TEXT: &str = "hey";
pub const BYPASS_ASSISTANT_TEXT: &str = "hello";

/// A conversation turn the rewriter can inspect and synthesize.
pub trait Turn: Sized {
    fn is_user(&self) -> bool;
    fn user_text(text: &str) -> Self;
    fn assistant_text(text: &str) -> Self;
}

impl Turn for Message {
    fn is_user(&self) -> bool {
        self.role == Role::User
    }

    fn user_text(text: &str) -> Self {
        Message::text(Role::User, text)
    }

    fn assistant_text(text: &str) -> Self {
        Message::text(Role::Assistant, text)
    }
}

/// OpenAI-style `{"role": ..., "content": ...}` objects.
impl Turn for Value {
    fn is_user(&self) -> bool {
        self.get("role").and_then(|r| r.as_str()) == Some("user")
    }

    fn user_text(text: &str) -> Self {
        json!({"role": "user", "content": text})
    }

    fn assistant_text(text: &str) -> Self {
        json!({"role": "assistant", "content": text})
    }
}

pub fn should_inject<T: Turn>(messages: &[T], bypass_enabled: bool) -> bool {
    bypass_enabled && messages.len() == 1 && messages[0].is_user()
}

pub fn rewrite<T: Turn>(messages: Vec<T>, bypass_enabled: bool) -> Vec<T> {
    if !should_inject(&messages, bypass_enabled) {
        return messages;
    }

    let mut out = Vec::with_capacity(messages.len() + 2);
    out.push(T::user_text(BYPASS_USER_TEXT));
    out.push(T::assistant_text(BYPASS_ASSISTANT_TEXT));
    out.extend(messages);
    out
}

/// Apply [`rewrite`] to the `messages` array of a `chat/completions` body.
/// Bodies without a `messages` array are left alone.
pub fn rewrite_chat_body(body: &mut Value, bypass_enabled: bool) {
    let Some(messages) = body.get_mut("messages").and_then(|m| m.as_array_mut()) else {
        return;
    };
    let taken = std::mem::take(messages);
    *messages = rewrite(taken, bypass_enabled);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_user_message_gets_prefix() {
        let original = Message::text(Role::User, "explain lifetimes");
        let out = rewrite(vec![original.clone()], true);

        assert_eq!(
            out,
            vec![
                Message::text(Role::User, "hey"),
                Message::text(Role::Assistant, "hello"),
                original,
            ]
        );
    }

    #[test]
    fn test_disabled_leaves_input_alone() {
        let input = vec![Message::text(Role::User, "hi")];
        assert_eq!(rewrite(input.clone(), false), input);
    }

    #[test]
    fn test_only_first_turn_is_rewritten() {
        let two = vec![
            Message::text(Role::User, "hi"),
            Message::text(Role::Assistant, "hello"),
        ];
        assert_eq!(rewrite(two.clone(), true), two);

        let assistant_only = vec![Message::text(Role::Assistant, "hi")];
        assert_eq!(rewrite(assistant_only.clone(), true), assistant_only);

        let empty: Vec<Message> = Vec::new();
        assert!(rewrite(empty, true).is_empty());
    }

    #[test]
    fn test_rewrite_is_deterministic() {
        let input = vec![Message::text(Role::User, "same")];
        assert_eq!(rewrite(input.clone(), true), rewrite(input, true));
    }

    #[test]
    fn test_chat_body_rewrite() {
        let mut body = json!({
            "model": "gpt-4.1",
            "messages": [{"role": "user", "content": "hi"}]
        });
        rewrite_chat_body(&mut body, true);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], json!({"role": "user", "content": "hey"}));
        assert_eq!(messages[1], json!({"role": "assistant", "content": "hello"}));
        assert_eq!(messages[2]["content"], "hi");
    }

    #[test]
    fn test_chat_body_with_system_prompt_is_untouched() {
        let mut body = json!({
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hi"}
            ]
        });
        let before = body.clone();
        rewrite_chat_body(&mut body, true);
        assert_eq!(body, before);
    }
}
