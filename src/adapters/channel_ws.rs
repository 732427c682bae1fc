use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{handshake::client::Request, Message};
use tracing::{error, info, warn};
use url::Url;

use crate::domain::config::{ApiKey, ServiceConfig};
use crate::domain::{ClientEvent, DomainError, ServerEvent};
use crate::ports::{ChannelHandle, RealtimeChannel};

/// Events buffered per direction before sends apply backpressure.
const EVENT_QUEUE: usize = 64;

/// WebSocket client for the realtime voice service.
///
/// `connect` opens the socket, splits it, and bridges both halves onto
/// plain channels: a writer task serializes [`ClientEvent`]s, a reader task
/// parses [`ServerEvent`]s. Dropping either half of the returned handle
/// ends the matching task; the writer sends a close frame on its way out.
pub struct WsRealtimeChannel {
    endpoint: String,
    api_key: ApiKey,
}

impl WsRealtimeChannel {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            endpoint: config.realtime_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn build_request(&self) -> Result<Request, DomainError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| DomainError::Config(format!("invalid realtime endpoint: {}", e)))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(DomainError::Config(format!(
                    "realtime endpoint must be ws:// or wss://, got {}://",
                    other
                )));
            }
        }

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| DomainError::Channel(e.to_string()))?;

        if !self.api_key.is_empty() {
            let value = format!("Bearer {}", self.api_key.as_str()).parse().map_err(|_| {
                DomainError::Config("API key contains invalid header characters".to_string())
            })?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        Ok(request)
    }
}

#[async_trait]
impl RealtimeChannel for WsRealtimeChannel {
    async fn connect(&self) -> Result<ChannelHandle, DomainError> {
        let request = self.build_request()?;
        let (ws_stream, _response) = connect_async(request)
            .await
            .map_err(|e| DomainError::Channel(format!("connection failed: {}", e)))?;
        info!(endpoint = %self.endpoint, "Realtime channel open");

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientEvent>(EVENT_QUEUE);
        let (inbound_tx, inbound_rx) = mpsc::channel::<ServerEvent>(EVENT_QUEUE);

        // Writer: serialize client events onto the socket.
        tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(error = %e, "Failed to serialize outbound event");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    error!(error = %e, "Failed to send outbound event");
                    break;
                }
            }
            let _ = write.send(Message::Close(None)).await;
        });

        // Reader: parse server events off the socket. Dropping the sender on
        // exit is what tells the session loop the channel is gone.
        tokio::spawn(async move {
            while let Some(result) = read.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => {
                                if inbound_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, "Failed to parse channel event"),
                        }
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                    Ok(Message::Close(_)) => {
                        info!("Channel closed by peer");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "Channel transport error");
                        break;
                    }
                }
            }
        });

        Ok(ChannelHandle {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
