use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{ClientEvent, DomainError, ServerEvent};

/// The two directions of an open duplex channel.
///
/// Outbound events are fire-and-forget sends; inbound events arrive in
/// wire order. The channel closes when either half is dropped, and a
/// `None` from `inbound` means the peer or transport ended the connection.
pub struct ChannelHandle {
    pub outbound: mpsc::Sender<ClientEvent>,
    pub inbound: mpsc::Receiver<ServerEvent>,
}

/// Port for the duplex connection to the remote conversational voice
/// service.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Open the channel. Called once per `connect`; the handle is owned by
    /// the session and dropped during teardown.
    async fn connect(&self) -> Result<ChannelHandle, DomainError>;
}
