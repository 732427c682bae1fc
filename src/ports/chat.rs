use async_trait::async_trait;

use crate::domain::DomainError;

/// Port for the external chat message log.
///
/// Best-effort side channel: a write failure is logged by the caller and
/// never affects the live audio session.
#[async_trait]
pub trait ChatLog: Send + Sync {
    /// Append a finalized voice transcription to a chat session's log,
    /// tagged as voice-originated and attributed to the agent identity.
    async fn append_transcript(
        &self,
        chat_session_id: &str,
        transcript: &str,
    ) -> Result<(), DomainError>;
}
