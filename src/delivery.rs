//! Direct-message delivery to plate owners.
use crate::registry::OwnerId;
use crate::reply::Card;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord's error code for "Cannot send messages to this user".
const DISCORD_CANNOT_DM: u64 = 50007;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient does not accept direct messages from us.
    Refused,
    Failed(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Refused => f.write_str("recipient refused direct messages"),
            DeliveryError::Failed(detail) => write!(f, "delivery failed: {detail}"),
        }
    }
}

impl std::error::Error for DeliveryError {}

pub trait Messenger {
    fn send_direct(&self, owner: OwnerId, card: &Card) -> Result<(), DeliveryError>;
}

/// Sends cards as Discord embeds through the bot REST API.
pub struct DiscordMessenger {
    agent: ureq::Agent,
    api_base: String,
    authorization: String,
}

impl DiscordMessenger {
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            api_base: api_base.trim_end_matches('/').to_string(),
            authorization: format!("Bot {token}"),
        }
    }

    fn post(&self, path: &str, body: Value) -> Result<Value, DeliveryError> {
        let url = format!("{}{}", self.api_base, path);
        let mut response = self
            .agent
            .post(url.as_str())
            .header("Authorization", self.authorization.as_str())
            .send_json(body)
            .map_err(|err| DeliveryError::Failed(err.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|err| DeliveryError::Failed(format!("read response body: {err}")))?;
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        classify_discord_status(status, &payload)?;
        Ok(payload)
    }
}

impl Messenger for DiscordMessenger {
    fn send_direct(&self, owner: OwnerId, card: &Card) -> Result<(), DeliveryError> {
        let channel = self.post(
            "/users/@me/channels",
            json!({ "recipient_id": owner.to_string() }),
        )?;
        let channel_id = channel
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| DeliveryError::Failed("DM channel response has no id".to_string()))?;
        self.post(
            &format!("/channels/{channel_id}/messages"),
            json!({ "embeds": [card.to_discord_embed()] }),
        )?;
        Ok(())
    }
}

fn classify_discord_status(status: u16, payload: &Value) -> Result<(), DeliveryError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let code = payload.get("code").and_then(Value::as_u64);
    if status == 403 || code == Some(DISCORD_CANNOT_DM) {
        return Err(DeliveryError::Refused);
    }
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message");
    Err(DeliveryError::Failed(format!("HTTP {status}: {message}")))
}

/// Used when no bot token is configured: logs the card instead of sending it.
pub struct LogMessenger;

impl Messenger for LogMessenger {
    fn send_direct(&self, owner: OwnerId, card: &Card) -> Result<(), DeliveryError> {
        tracing::info!(
            owner = %owner,
            title = %card.title,
            fields = card.fields.len(),
            "no bot token configured; direct message not sent"
        );
        Ok(())
    }
}
