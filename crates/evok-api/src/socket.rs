//! WebSocket channel to the controller.
//!
//! A single connection lifecycle: connect, read incremental device
//! messages, write set-commands, close. Reconnect policy deliberately
//! lives with the caller's connection supervisor, not here -- the
//! supervisor decides between fixed-delay retry and immediate restart.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};
use url::Url;

use crate::error::Error;
use crate::wire::{self, RawDevice, SetCommand};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One inbound observation on the channel.
///
/// `Keepalive` covers control frames that carry no device records
/// (pings, pongs); callers still treat those as transport traffic for
/// liveness accounting. Text frames that fail to parse are errors, not
/// keepalives.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// One or more device records, in wire order.
    Batch(Vec<RawDevice>),
    /// Traffic observed, nothing to ingest.
    Keepalive,
}

/// An established WebSocket connection to the controller.
pub struct EvokSocket {
    stream: WsStream,
}

impl EvokSocket {
    /// Open the duplex channel.
    pub async fn connect(url: &Url) -> Result<Self, Error> {
        info!(%url, "connecting to WebSocket");

        let uri: tungstenite::http::Uri = url
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;
        let request = ClientRequestBuilder::new(uri);

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        info!("WebSocket connected");
        Ok(Self { stream })
    }

    /// Split into independent read/write halves so a caller can `select!`
    /// over inbound frames while sending commands from another branch.
    pub fn split(self) -> (SocketWriter, SocketReader) {
        let (write, read) = self.stream.split();
        (SocketWriter { write }, SocketReader { read })
    }
}

/// Read half: yields [`SocketEvent`]s until the connection drops.
pub struct SocketReader {
    read: SplitStream<WsStream>,
}

impl SocketReader {
    /// Wait for the next frame.
    ///
    /// `Ok(None)` means the server closed the connection cleanly (close
    /// frame or stream end); `Err` is a socket-level failure or a text
    /// frame that did not parse as device records. Either way the
    /// caller should abandon the connection and reconnect.
    pub async fn next(&mut self) -> Result<Option<SocketEvent>, Error> {
        match self.read.next().await {
            // A malformed payload is a transport fault, not liveness
            // traffic: surface it instead of feeding the watchdog.
            Some(Ok(tungstenite::Message::Text(text))) => {
                let batch = wire::parse_batch(text.as_str())?;
                Ok(Some(SocketEvent::Batch(batch)))
            }
            Some(Ok(tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_))) => {
                // tungstenite queues the pong reply automatically
                trace!("WebSocket ping");
                Ok(Some(SocketEvent::Keepalive))
            }
            Some(Ok(tungstenite::Message::Close(frame))) => {
                if let Some(ref cf) = frame {
                    info!(code = %cf.code, reason = %cf.reason, "WebSocket close frame received");
                } else {
                    info!("WebSocket close frame received (no payload)");
                }
                Ok(None)
            }
            Some(Ok(_)) => {
                // Binary, Frame -- nothing we expect from evok
                Ok(Some(SocketEvent::Keepalive))
            }
            Some(Err(e)) => Err(Error::WebSocket(e.to_string())),
            None => {
                info!("WebSocket stream ended");
                Ok(None)
            }
        }
    }
}

/// Write half: delivers set-commands over the open channel.
pub struct SocketWriter {
    write: SplitSink<WsStream, tungstenite::Message>,
}

impl SocketWriter {
    /// Serialize and send one command.
    pub async fn send(&mut self, command: &SetCommand) -> Result<(), Error> {
        let json = serde_json::to_string(command).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        trace!(payload = %json, "sending command");
        self.write
            .send(tungstenite::Message::Text(json.into()))
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))
    }

    /// Terminate the channel. Idempotent as far as the caller is
    /// concerned: errors on an already-dead socket are logged and dropped.
    pub async fn close(&mut self) {
        if let Err(e) = self.write.send(tungstenite::Message::Close(None)).await {
            debug!(error = %e, "close frame not delivered (connection may already be gone)");
        }
    }
}
