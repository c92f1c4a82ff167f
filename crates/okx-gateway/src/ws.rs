//! Streaming client for one OKX WebSocket endpoint.
//!
//! Each instance owns a socket session plus two bounded queues: inbound
//! decoded frames and outbound text frames. Producers await when a queue
//! is full. The session task multiplexes the reader and writer loops and
//! owns reconnection: bounded exponential backoff, a fresh login when
//! credentials are attached (private endpoint), and replay of every
//! subscription written so far. Decode failures drop the frame and keep
//! the session alive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::backoff::ExponentialBackoff;
use crate::codec::decode_ws_message;
use crate::config::OkxConfig;
use crate::error::GatewayError;
use crate::types::{WsMessage, WsRequest};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// The venue drops sockets idle for 30 seconds; ping a little sooner.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const RESUME_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OkxWs {
    url: String,
    sim: bool,
    credentials: Option<Arc<OkxConfig>>,
    inbound_tx: mpsc::Sender<WsMessage>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<WsMessage>>,
    outbound_tx: mpsc::Sender<String>,
    outbound_rx: Mutex<Option<mpsc::Receiver<String>>>,
    subscriptions: Arc<Mutex<Vec<String>>>,
}

impl OkxWs {
    /// `credentials` makes this a private-endpoint client: the session
    /// re-sends a freshly signed login before replaying subscriptions on
    /// every reconnect.
    pub fn new(
        base_url: &str,
        path: &str,
        queue_size: usize,
        sim: bool,
        credentials: Option<Arc<OkxConfig>>,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(queue_size);
        let (outbound_tx, outbound_rx) = mpsc::channel(queue_size);
        Self {
            url: format!("{base_url}{path}"),
            sim,
            credentials,
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Perform the handshake and spawn the session task. The first
    /// connection failure is fatal to the caller; later failures are
    /// handled by the session's reconnect loop.
    pub async fn connect(&self) -> Result<(), GatewayError> {
        let stream = handshake(&self.url, self.sim).await?;
        let outbound = self
            .outbound_rx
            .lock()
            .take()
            .ok_or(GatewayError::ChannelClosed)?;
        info!(url = %self.url, "stream connected");

        let session = Session {
            url: self.url.clone(),
            sim: self.sim,
            credentials: self.credentials.clone(),
            inbound: self.inbound_tx.clone(),
            subscriptions: self.subscriptions.clone(),
        };
        tokio::spawn(session.run(stream, outbound));
        Ok(())
    }

    /// Receive the next decoded inbound frame.
    pub async fn read(&self) -> Result<WsMessage, GatewayError> {
        self.inbound_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or(GatewayError::ChannelClosed)
    }

    /// Encode and enqueue one outbound frame. Subscription frames are
    /// recorded for replay after a reconnect.
    pub async fn write<T: Serialize>(&self, message: &T) -> Result<(), GatewayError> {
        let value = serde_json::to_value(message)?;
        let text = value.to_string();
        if value.get("op").and_then(Value::as_str) == Some("subscribe") {
            self.subscriptions.lock().push(text.clone());
        }
        self.outbound_tx
            .send(text)
            .await
            .map_err(|_| GatewayError::ChannelClosed)
    }
}

struct Session {
    url: String,
    sim: bool,
    credentials: Option<Arc<OkxConfig>>,
    inbound: mpsc::Sender<WsMessage>,
    subscriptions: Arc<Mutex<Vec<String>>>,
}

impl Session {
    async fn run(self, first: WsStream, mut outbound: mpsc::Receiver<String>) {
        let mut backoff = ExponentialBackoff::default();
        let mut stream = Some(first);
        let mut first_connection = true;

        loop {
            let ws = match stream.take() {
                Some(ws) => ws,
                None => match handshake(&self.url, self.sim).await {
                    Ok(ws) => ws,
                    Err(e) => {
                        let delay = backoff.next_delay();
                        warn!(url = %self.url, error = %e, ?delay, "reconnect failed");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                },
            };
            let (mut sink, mut source) = ws.split();

            if !first_connection {
                let resumed = tokio::time::timeout(
                    RESUME_TIMEOUT,
                    self.resume(&mut sink, &mut source),
                )
                .await
                .unwrap_or(Err(GatewayError::LoginTimeout));
                if let Err(e) = resumed {
                    let delay = backoff.next_delay();
                    warn!(url = %self.url, error = %e, ?delay, "session resume failed");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                info!(url = %self.url, "stream reconnected");
            }
            first_connection = false;
            backoff.reset();

            match self.pump(&mut sink, &mut source, &mut outbound).await {
                Ok(()) => {
                    debug!(url = %self.url, "stream client dropped, ending session");
                    return;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(url = %self.url, error = %e, ?delay, "stream session failed, reconnecting");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Re-authenticate (private endpoint) and replay recorded
    /// subscriptions on a fresh socket.
    async fn resume(&self, sink: &mut WsSink, source: &mut WsSource) -> Result<(), GatewayError> {
        if let Some(config) = &self.credentials {
            let login = WsRequest::login(config, Utc::now().timestamp());
            sink.send(Message::Text(serde_json::to_string(&login)?)).await?;
            loop {
                let frame = source
                    .next()
                    .await
                    .ok_or_else(|| GatewayError::Transport("stream ended during login".into()))??;
                let Message::Text(text) = frame else { continue };
                let msg = match decode_ws_message(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(url = %self.url, error = %e, "dropping undecodable frame");
                        continue;
                    }
                };
                if msg.event == "login" {
                    if msg.code == 0 {
                        break;
                    }
                    return Err(GatewayError::Auth { code: msg.code, msg: msg.msg });
                }
                if msg.event == "error" {
                    return Err(GatewayError::Auth { code: msg.code, msg: msg.msg });
                }
                if self.inbound.send(msg).await.is_err() {
                    return Err(GatewayError::ChannelClosed);
                }
            }
        }
        let subscriptions = self.subscriptions.lock().clone();
        for subscription in subscriptions {
            sink.send(Message::Text(subscription)).await?;
        }
        Ok(())
    }

    /// Reader and writer loops multiplexed until the socket fails
    /// (`Err`, reconnect) or the client side is dropped (`Ok`, end).
    async fn pump(
        &self,
        sink: &mut WsSink,
        source: &mut WsSource,
        outbound: &mut mpsc::Receiver<String>,
    ) -> Result<(), GatewayError> {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                frame = source.next() => {
                    let frame = frame
                        .ok_or_else(|| GatewayError::Transport("stream ended".into()))??;
                    self.handle_frame(frame, sink).await?;
                }
                queued = outbound.recv() => {
                    let Some(text) = queued else { return Ok(()) };
                    sink.send(Message::Text(text)).await?;
                }
                _ = heartbeat.tick() => {
                    sink.send(Message::Text("ping".into())).await?;
                }
            }
        }
    }

    async fn handle_frame(&self, frame: Message, sink: &mut WsSink) -> Result<(), GatewayError> {
        match frame {
            Message::Text(text) => match decode_ws_message(&text) {
                Ok(msg) => {
                    if msg.event == "pong" {
                        return Ok(());
                    }
                    self.inbound
                        .send(msg)
                        .await
                        .map_err(|_| GatewayError::ChannelClosed)?;
                }
                Err(e) => warn!(url = %self.url, error = %e, "dropping undecodable frame"),
            },
            Message::Ping(payload) => sink.send(Message::Pong(payload)).await?,
            Message::Close(_) => {
                return Err(GatewayError::Transport("server closed the connection".into()));
            }
            _ => {}
        }
        Ok(())
    }
}

async fn handshake(url: &str, sim: bool) -> Result<WsStream, GatewayError> {
    let mut request = url.into_client_request()?;
    request.headers_mut().insert(
        "User-Agent",
        HeaderValue::from_static(concat!("okx-trader/", env!("CARGO_PKG_VERSION"))),
    );
    if sim {
        request
            .headers_mut()
            .insert("x-simulated-trading", HeaderValue::from_static("1"));
    }
    let (stream, _) = connect_async(request).await?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PUBLIC_PATH, WS_URL};
    use crate::types::SubscribeArg;

    fn client() -> OkxWs {
        OkxWs::new(WS_URL, PUBLIC_PATH, 8, false, None)
    }

    #[tokio::test]
    async fn write_records_subscriptions_for_replay() {
        let ws = client();
        ws.write(&WsRequest::subscribe(vec![SubscribeArg::instrument("books", "BTC-USDT")]))
            .await
            .unwrap();
        ws.write(&WsRequest::subscribe(vec![SubscribeArg::instrument("tickers", "BTC-USDT")]))
            .await
            .unwrap();

        let recorded = ws.subscriptions.lock().clone();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[0].contains("\"books\""));
        assert!(recorded[1].contains("\"tickers\""));
    }

    #[tokio::test]
    async fn write_does_not_record_other_operations() {
        let ws = client();
        ws.write(&serde_json::json!({"op":"unsubscribe","args":[]}))
            .await
            .unwrap();
        assert!(ws.subscriptions.lock().is_empty());
    }

    #[tokio::test]
    async fn read_yields_queued_frames_in_order() {
        let ws = client();
        let tx = ws.inbound_tx.clone();
        tx.send(WsMessage { event: "subscribe".into(), ..WsMessage::default() })
            .await
            .unwrap();
        tx.send(WsMessage { event: "error".into(), code: 1, ..WsMessage::default() })
            .await
            .unwrap();

        assert_eq!(ws.read().await.unwrap().event, "subscribe");
        assert_eq!(ws.read().await.unwrap().event, "error");
    }
}
