//! A minimal client for Realmgate routers.
//!
//! Enough to attach with a ticket or a WAMP-CRA signature, call
//! procedures, and leave:
//!
//! ```rust,no_run
//! use realmgate::prelude::*;
//!
//! # async fn run() -> Result<(), RealmgateError> {
//! let mut client = TicketClient::connect("ws://127.0.0.1:8080").await?;
//! let welcome = client.join("realm1", "peter", "magic_secret_1").await?;
//! println!("joined as {} ({})", welcome.authid, welcome.authrole);
//!
//! // or: client.join_wampcra("realm1", "peter", "magic_secret_1")
//! let now = client.call("com.timeservice.now", vec![]).await?;
//! println!("router time: {now}");
//!
//! client.leave().await
//! # }
//! ```

use futures_util::{SinkExt, StreamExt};
use realmgate_auth::{AuthMethod, cra};
use realmgate_protocol::{
    Codec, HelloDetails, JsonCodec, Message, RequestId, SessionId, uri,
};
use realmgate_transport::TransportError;
use serde_json::Value;
use tokio_tungstenite::tungstenite;

use crate::RealmgateError;

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// What the router said when it let us in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    pub session: SessionId,
    pub authid: String,
    pub authrole: String,
    pub authmethod: String,
    pub authprovider: String,
}

/// A WebSocket client speaking the Realmgate session protocol.
pub struct TicketClient {
    ws: ClientWs,
    codec: JsonCodec,
    next_request: u64,
}

impl TicketClient {
    /// Opens a WebSocket connection to `url` (e.g. `ws://localhost:8080`).
    pub async fn connect(url: &str) -> Result<Self, RealmgateError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            TransportError::ConnectFailed {
                url: url.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e),
            }
        })?;
        tracing::debug!(url, "connected to router");
        Ok(Self {
            ws,
            codec: JsonCodec,
            next_request: 1,
        })
    }

    /// Attaches to `realm` as `authid`, answering the ticket challenge
    /// with `ticket`.
    ///
    /// # Errors
    /// [`RealmgateError::Aborted`] if the router refuses the attach.
    pub async fn join(
        &mut self,
        realm: &str,
        authid: &str,
        ticket: &str,
    ) -> Result<Welcome, RealmgateError> {
        self.attach(realm, authid, AuthMethod::Ticket, ticket).await
    }

    /// Attaches to `realm` as `authid` with WAMP-CRA. `secret` never
    /// leaves the process: the client signs the router's challenge with
    /// it, deriving a key first when the challenge is salted.
    ///
    /// # Errors
    /// - [`RealmgateError::Aborted`] if the router refuses the attach
    /// - [`RealmgateError::BadChallenge`] if the challenge can't be signed
    pub async fn join_wampcra(
        &mut self,
        realm: &str,
        authid: &str,
        secret: &str,
    ) -> Result<Welcome, RealmgateError> {
        self.attach(realm, authid, AuthMethod::WampCra, secret).await
    }

    async fn attach(
        &mut self,
        realm: &str,
        authid: &str,
        method: AuthMethod,
        secret: &str,
    ) -> Result<Welcome, RealmgateError> {
        self.send(&Message::Hello(HelloDetails::new(
            realm,
            &[method.as_str()],
            Some(authid),
        )))
        .await?;

        loop {
            match self.recv().await? {
                Message::Challenge { authmethod, extra } if authmethod == method.as_str() => {
                    tracing::debug!(authid, %authmethod, "answering challenge");
                    let signature = match method {
                        AuthMethod::Ticket => secret.to_string(),
                        AuthMethod::WampCra => cra::sign_challenge(secret, &extra).ok_or_else(
                            || RealmgateError::BadChallenge(authmethod.clone()),
                        )?,
                    };
                    self.send(&Message::Authenticate {
                        signature,
                        extra: Default::default(),
                    })
                    .await?;
                }
                Message::Welcome {
                    session,
                    authid,
                    authrole,
                    authmethod,
                    authprovider,
                } => {
                    tracing::info!(%session, %authid, %authrole, "joined realm");
                    return Ok(Welcome {
                        session,
                        authid,
                        authrole,
                        authmethod,
                        authprovider,
                    });
                }
                Message::Abort { reason, message } => {
                    return Err(RealmgateError::Aborted { reason, message });
                }
                other => {
                    return Err(RealmgateError::UnexpectedMessage(
                        other.kind().to_string(),
                    ));
                }
            }
        }
    }

    /// Calls `procedure` and returns the first result value (`null` when
    /// the procedure returned nothing).
    pub async fn call(
        &mut self,
        procedure: &str,
        args: Vec<Value>,
    ) -> Result<Value, RealmgateError> {
        let request = RequestId(self.next_request);
        self.next_request += 1;

        self.send(&Message::Call {
            request,
            procedure: procedure.to_string(),
            args,
        })
        .await?;

        loop {
            match self.recv().await? {
                Message::CallResult { request: r, args } if r == request => {
                    return Ok(args.into_iter().next().unwrap_or(Value::Null));
                }
                Message::Error {
                    request: r,
                    error,
                    message,
                } if r == request => {
                    return Err(RealmgateError::CallFailed { error, message });
                }
                Message::Abort { reason, message } => {
                    return Err(RealmgateError::Aborted { reason, message });
                }
                other => {
                    tracing::debug!(kind = other.kind(), "skipping unrelated message");
                }
            }
        }
    }

    /// Says goodbye, waits for the router's goodbye, and closes.
    pub async fn leave(mut self) -> Result<(), RealmgateError> {
        self.send(&Message::Goodbye {
            reason: uri::CLOSE_NORMAL.to_string(),
        })
        .await?;

        match self.recv().await {
            Ok(Message::Goodbye { reason }) => {
                tracing::debug!(%reason, "router acknowledged goodbye");
            }
            Ok(other) => {
                tracing::debug!(kind = other.kind(), "expected Goodbye");
            }
            // Router hung up first.
            Err(RealmgateError::Transport(_)) => {}
            Err(e) => return Err(e),
        }

        let _ = self.ws.close(None).await;
        Ok(())
    }

    /// Sends one raw protocol message.
    pub async fn send(&mut self, msg: &Message) -> Result<(), RealmgateError> {
        let bytes = self.codec.encode(msg)?;
        self.ws
            .send(tungstenite::Message::Binary(bytes.into()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })?;
        Ok(())
    }

    /// Receives the next protocol message, skipping frames that don't
    /// decode.
    ///
    /// # Errors
    /// [`TransportError::ConnectionClosed`] once the router has closed.
    pub async fn recv(&mut self) -> Result<Message, RealmgateError> {
        loop {
            let data = match self.ws.next().await {
                Some(Ok(tungstenite::Message::Binary(data))) => data.to_vec(),
                Some(Ok(tungstenite::Message::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(tungstenite::Message::Close(_))) | None => {
                    return Err(TransportError::ConnectionClosed(
                        "router closed the connection".into(),
                    )
                    .into());
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    ))
                    .into());
                }
            };

            match self.codec.decode(&data) {
                Ok(msg) => return Ok(msg),
                Err(e) => tracing::debug!(error = %e, "skipping undecodable frame"),
            }
        }
    }
}
