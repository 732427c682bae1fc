use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::domain::config::ChatConfig;
use crate::domain::DomainError;
use crate::ports::ChatLog;

/// Marker prepended to relayed lines so they read as voice-originated in
/// the chat history.
const VOICE_PREFIX: &str = "🎤 ";

/// Fixed sender identity for relayed transcripts.
const AGENT_SENDER: &str = "agent";

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    session_id: &'a str,
    sender_type: &'a str,
    content: String,
}

impl<'a> NewMessage<'a> {
    fn transcript(chat_session_id: &'a str, transcript: &str) -> Self {
        Self {
            session_id: chat_session_id,
            sender_type: AGENT_SENDER,
            content: format!("{}{}", VOICE_PREFIX, transcript),
        }
    }
}

/// Transcript relay writing to the chat backend's message API.
pub struct HttpChatLog {
    client: reqwest::Client,
    messages_url: String,
}

impl HttpChatLog {
    pub fn new(config: &ChatConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(format!("VoiceDesk/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            messages_url: format!("{}/messages", config.base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ChatLog for HttpChatLog {
    async fn append_transcript(
        &self,
        chat_session_id: &str,
        transcript: &str,
    ) -> Result<(), DomainError> {
        let body = NewMessage::transcript(chat_session_id, transcript);

        let response = self
            .client
            .post(&self.messages_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::RelayWrite(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::RelayWrite(format!(
                "HTTP {} for {}",
                status, self.messages_url
            )));
        }

        debug!(chat_session_id = %chat_session_id, "Transcript appended to chat log");
        Ok(())
    }
}
