//! WebSocket transport on top of `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::TransportError;

use super::{Frame, Session, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket sessions with `connect_async`.
///
/// `wss://` endpoints need the `tls` feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, endpoint: &Url) -> Result<Box<dyn Session>, TransportError> {
        let (ws, resp) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        debug!(%endpoint, status = %resp.status(), "websocket handshake complete");
        Ok(Box::new(WsSession { ws }))
    }
}

struct WsSession {
    ws: WsStream,
}

#[async_trait]
impl Session for WsSession {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let msg = match frame {
            Frame::Text(text) => Message::text(text),
            Frame::Binary(data) => Message::binary(data),
        };
        self.ws
            .send(msg)
            .await
            .map_err(|e| TransportError::io(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Frame, TransportError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.to_string())),
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data.to_vec())),
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                        None => (None, String::new()),
                    };
                    return Err(TransportError::Closed { code, reason });
                }
                // tungstenite answers pings on the next read/write
                Some(Ok(other)) => trace!(kind = ?other, "control frame"),
                Some(Err(e)) => return Err(TransportError::io(e.to_string())),
                None => {
                    return Err(TransportError::Closed {
                        code: None,
                        reason: "stream ended".into(),
                    });
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            debug!(err = %e, "close handshake failed");
            return;
        }
        // drain until the peer acknowledges
        while let Some(Ok(_)) = self.ws.next().await {}
    }
}
