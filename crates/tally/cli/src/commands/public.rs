//! Public capability commands

use crate::output::print_result;
use anyhow::{anyhow, Result};
use serde_json::json;
use std::str::FromStr;
use tally_client::DualContextRouter;
use tally_types::{ChatMessage, ChatRole};

/// Send a greeting
pub async fn greet(router: &DualContextRouter, name: Option<String>, json: bool) -> Result<()> {
    let message = router.greet(name.unwrap_or_default()).await?;
    print_result(&message, json!({ "message": &message }), json);
    Ok(())
}

/// Send a single prompt to the daemon's language model
pub async fn prompt(router: &DualContextRouter, text: String, json: bool) -> Result<()> {
    let response = router.send_prompt(text).await?;
    print_result(&response, json!({ "response": &response }), json);
    Ok(())
}

/// Send a multi-turn chat, each turn written as `role:content`
pub async fn chat(router: &DualContextRouter, turns: Vec<String>, json: bool) -> Result<()> {
    let messages = turns
        .iter()
        .map(|turn| parse_turn(turn))
        .collect::<Result<Vec<_>>>()?;

    let response = router.chat(messages).await?;
    print_result(&response, json!({ "response": &response }), json);
    Ok(())
}

/// `user:hello` → user message; a turn without a known role prefix is a
/// user message as written.
pub fn parse_turn(turn: &str) -> Result<ChatMessage> {
    let (role, content) = match turn.split_once(':') {
        Some((role, content)) => match ChatRole::from_str(role.trim()) {
            Ok(role) => (role, content.trim_start()),
            Err(_) => (ChatRole::User, turn),
        },
        None => (ChatRole::User, turn),
    };

    if content.is_empty() {
        return Err(anyhow!("chat turn '{}' has no content", turn));
    }
    Ok(ChatMessage::new(role, content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_turn() {
        let message = parse_turn("system: be brief").unwrap();
        assert_eq!(message.role, ChatRole::System);
        assert_eq!(message.content, "be brief");

        let message = parse_turn("Assistant:ok").unwrap();
        assert_eq!(message.role, ChatRole::Assistant);

        let message = parse_turn("what is 2:1 odds?").unwrap();
        assert_eq!(message.role, ChatRole::User);
        assert_eq!(message.content, "what is 2:1 odds?");

        assert!(parse_turn("user:").is_err());
    }
}
