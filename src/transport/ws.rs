//! WebSocket transport.
//!
//! One persistent duplex connection per session. The reader task parses
//! inbound JSON frames into `ServerEvent`s on an ordered channel; the
//! writer task drains the outbound queue. Handshake failures map onto the
//! session error kinds so the host can pick a remediation path.

use futures_util::{SinkExt, StreamExt};
use http::header::{HeaderValue, AUTHORIZATION};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use super::{Outbound, ServerEvent, TransportHandle};
use crate::error::{ErrorKind, SessionError};

/// Connection parameters resolved from configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub endpoint: String,
    pub api_key: String,
}

/// Open the duplex channel.
///
/// Returns the send handle and the ordered inbound event stream. The
/// caller owns both; dropping the receiver tears the reader down.
pub async fn connect(
    cfg: &TransportConfig,
) -> Result<(TransportHandle, mpsc::UnboundedReceiver<ServerEvent>), SessionError> {
    let mut request = cfg
        .endpoint
        .clone()
        .into_client_request()
        .map_err(|e| {
            SessionError::new(
                ErrorKind::TransportNetwork,
                format!("bad endpoint {}: {e}", cfg.endpoint),
            )
        })?;
    let bearer = format!("Bearer {}", cfg.api_key);
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&bearer).map_err(|e| {
            SessionError::new(ErrorKind::TransportAuth, format!("bad credential: {e}"))
        })?,
    );

    info!(endpoint = %cfg.endpoint, "connecting");
    let (socket, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(map_handshake_error)?;
    info!("connected");

    let (mut write, mut read) = socket.split();
    let (handle, mut outbound_rx) = TransportHandle::channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    // Writer: fire-and-forget sends. An individual failed frame is
    // swallowed; retrying one ~85 ms chunk would desynchronize timing.
    tokio::spawn(async move {
        while let Some(out) = outbound_rx.recv().await {
            match out {
                Outbound::Message(msg) => {
                    let text = match serde_json::to_string(&msg) {
                        Ok(t) => t,
                        Err(e) => {
                            warn!("outbound serialize failed: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = write.send(Message::Text(text)).await {
                        debug!("send failed, dropping frame: {e}");
                    }
                }
                Outbound::Close => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        debug!("writer task exiting");
    });

    // Reader: JSON text frames -> ServerEvent, preserving arrival order.
    tokio::spawn(async move {
        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(ev) => {
                            if event_tx.send(ev).is_err() {
                                break; // Session gone.
                            }
                        }
                        Err(e) => warn!("unrecognized server message: {e}"),
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed");
                    let _ = event_tx.send(ServerEvent::Closed {});
                    break;
                }
                Some(Ok(_)) => {} // ping/pong/binary ignored
                Some(Err(e)) => {
                    let _ = event_tx.send(ServerEvent::Error {
                        message: e.to_string(),
                    });
                    break;
                }
                None => {
                    let _ = event_tx.send(ServerEvent::Closed {});
                    break;
                }
            }
        }
        debug!("reader task exiting");
    });

    Ok((handle, event_rx))
}

/// Classify a handshake failure: 401/403 means the credential is bad,
/// 404 means the endpoint or model does not exist, anything else is a
/// connectivity problem.
fn map_handshake_error(err: WsError) -> SessionError {
    match &err {
        WsError::Http(response) => match response.status().as_u16() {
            401 | 403 => SessionError::new(
                ErrorKind::TransportAuth,
                format!("handshake rejected: {}", response.status()),
            ),
            404 => SessionError::new(
                ErrorKind::TransportNotFound,
                format!("endpoint not found: {}", response.status()),
            ),
            _ => SessionError::new(
                ErrorKind::TransportNetwork,
                format!("handshake failed: {}", response.status()),
            ),
        },
        _ => SessionError::new(ErrorKind::TransportNetwork, err.to_string()),
    }
}
