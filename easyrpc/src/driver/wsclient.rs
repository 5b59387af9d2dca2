use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{info, warn};
use url::Url;

use crate::core::config::ChannelConfig;
use crate::driver::Driver;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// WebSocket driver
///
/// Pure transport: forwards queued outbound text frames to the socket and
/// inbound text frames to `incoming_tx`. Reconnects with exponential
/// back-off until either side of its queues is dropped.
pub struct WsDriver {
    url: Url,
    max_retry_delay: Duration,
    outgoing_rx: mpsc::Receiver<String>,
    incoming_tx: mpsc::Sender<String>,
}

impl WsDriver {
    pub fn new(
        url: &str,
        incoming_tx: mpsc::Sender<String>,
        outgoing_rx: mpsc::Receiver<String>,
    ) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid WebSocket URL: {}", url))?;

        Ok(Self {
            url,
            max_retry_delay: Duration::from_secs(60),
            outgoing_rx,
            incoming_tx,
        })
    }

    /// Driver for the endpoint described by a `[channel]` section
    pub fn from_config(
        config: &ChannelConfig,
        incoming_tx: mpsc::Sender<String>,
        outgoing_rx: mpsc::Receiver<String>,
    ) -> Result<Self> {
        Ok(Self::new(&config.ws_url_with_token(), incoming_tx, outgoing_rx)?
            .with_max_retry_delay(config.max_retry_delay()))
    }

    pub fn with_max_retry_delay(mut self, max_retry_delay: Duration) -> Self {
        self.max_retry_delay = max_retry_delay.max(INITIAL_RETRY_DELAY);
        self
    }

    async fn run_inner(mut self) -> Result<()> {
        let mut retry_delay = INITIAL_RETRY_DELAY;

        loop {
            if self.queues_closed() {
                info!("Message queues closed, stopping WebSocket driver");
                return Ok(());
            }

            match connect_async(self.url.as_str()).await {
                Ok((ws_stream, _)) => {
                    info!(
                        "WebSocket connected to {}, {} outbound frame(s) waiting",
                        self.url.host_str().unwrap_or("?"),
                        self.outgoing_rx.len()
                    );
                    retry_delay = INITIAL_RETRY_DELAY;

                    if let SessionEnd::Shutdown = self.pump(ws_stream).await {
                        continue;
                    }
                }
                Err(e) => warn!("Connection to {} failed: {}", self.url, e),
            }

            info!("Reconnecting in {}s...", retry_delay.as_secs());
            tokio::time::sleep(retry_delay).await;
            retry_delay = (retry_delay * 2).min(self.max_retry_delay);
        }
    }

    fn queues_closed(&self) -> bool {
        self.incoming_tx.is_closed() || (self.outgoing_rx.is_closed() && self.outgoing_rx.is_empty())
    }

    /// Shuttle frames until the socket drops or a queue closes
    async fn pump(&mut self, ws_stream: WsStream) -> SessionEnd {
        let (mut sink, mut stream) = ws_stream.split();

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        if self.incoming_tx.send(text.to_string()).await.is_err() {
                            return SessionEnd::Shutdown;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return SessionEnd::Reconnect,
                    // JSON-RPC travels in text frames only
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        return SessionEnd::Reconnect;
                    }
                },
                outbound = self.outgoing_rx.recv() => {
                    let Some(text) = outbound else {
                        return SessionEnd::Shutdown;
                    };
                    if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                        warn!("WebSocket send failed: {}", e);
                        return SessionEnd::Reconnect;
                    }
                }
            }
        }
    }
}

enum SessionEnd {
    Reconnect,
    Shutdown,
}

#[async_trait::async_trait]
impl Driver for WsDriver {
    async fn run(self: Box<Self>) -> Result<()> {
        self.run_inner().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_is_rejected() {
        let (incoming_tx, _incoming_rx) = mpsc::channel(1);
        let (_outgoing_tx, outgoing_rx) = mpsc::channel(1);

        assert!(WsDriver::new("not a url", incoming_tx, outgoing_rx).is_err());
    }

    #[test]
    fn retry_cap_comes_from_config() {
        let (incoming_tx, _incoming_rx) = mpsc::channel(1);
        let (_outgoing_tx, outgoing_rx) = mpsc::channel(1);
        let config = ChannelConfig {
            max_retry_delay_secs: 5,
            ..Default::default()
        };

        let driver = WsDriver::from_config(&config, incoming_tx, outgoing_rx).unwrap();
        assert_eq!(driver.max_retry_delay, Duration::from_secs(5));
        assert_eq!(driver.url.as_str(), "ws://127.0.0.1:8080/");
    }

    #[tokio::test]
    async fn frames_flow_both_ways_until_the_queue_closes() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let peer = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(WsMessage::Text(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#.to_string().into()))
                .await
                .unwrap();
            loop {
                match ws.next().await {
                    Some(Ok(WsMessage::Text(text))) => return text.to_string(),
                    Some(Ok(_)) => continue,
                    other => panic!("unexpected frame: {:?}", other),
                }
            }
        });

        let (incoming_tx, mut incoming_rx) = mpsc::channel(4);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(4);
        let driver = WsDriver::new(&format!("ws://{}", addr), incoming_tx, outgoing_rx).unwrap();
        let driver = tokio::spawn(Box::new(driver).run());

        let inbound = incoming_rx.recv().await.unwrap();
        assert!(inbound.contains(r#""method":"ping""#));

        outgoing_tx
            .send(r#"{"jsonrpc":"2.0","result":"pong","id":1}"#.to_string())
            .await
            .unwrap();
        assert!(peer.await.unwrap().contains("pong"));

        drop(outgoing_tx);
        let stopped = tokio::time::timeout(Duration::from_secs(5), driver).await;
        assert!(matches!(stopped, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn unreachable_peer_keeps_retrying() {
        let (incoming_tx, _incoming_rx) = mpsc::channel(1);
        let (_outgoing_tx, outgoing_rx) = mpsc::channel::<String>(1);

        // nothing listens on port 9
        let driver = WsDriver::new("ws://127.0.0.1:9", incoming_tx, outgoing_rx)
            .unwrap()
            .with_max_retry_delay(Duration::from_secs(1));
        let result = tokio::time::timeout(Duration::from_millis(200), Box::new(driver).run()).await;

        assert!(result.is_err(), "driver keeps retrying while disconnected");
    }
}
