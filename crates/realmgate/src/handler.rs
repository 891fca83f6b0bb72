//! Per-connection handler: attach handshake, then call routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Hello → check the realm
//!   2. Drive the `AuthenticatingSession` until it accepts or denies
//!   3. Join the realm, send Welcome
//!   4. Loop: receive messages → answer calls, honour goodbye

use std::sync::Arc;
use std::time::Duration;

use realmgate_auth::{AuthDecision, AuthenticatingSession, CredentialStore, Identity};
use realmgate_protocol::{Codec, Message, SessionId, uri};
use realmgate_router::Realm;
use realmgate_transport::{Connection, WebSocketConnection};

use crate::RealmgateError;
use crate::server::ServerState;

/// Drop guard that detaches a session from its realm when the handler
/// exits, however it exits.
struct SessionGuard {
    realm: Arc<Realm>,
    session_id: SessionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self.realm.leave(self.session_id);
    }
}

/// What a bounded receive produced.
enum Inbound {
    Frame(Vec<u8>),
    Closed,
    TimedOut,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), RealmgateError>
where
    S: CredentialStore,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    // --- Step 1: Attach ---
    let Some((realm, identity)) = attach(&conn, &state).await? else {
        let _ = conn.close().await;
        return Ok(());
    };

    let session_id = realm.join(identity.clone());
    let _guard = SessionGuard {
        realm: Arc::clone(&realm),
        session_id,
    };

    send(
        &conn,
        &state.codec,
        &Message::Welcome {
            session: session_id,
            authid: identity.authid.clone(),
            authrole: identity.authrole,
            authmethod: identity.authmethod,
            authprovider: identity.authprovider,
        },
    )
    .await?;

    tracing::info!(
        %conn_id,
        %session_id,
        authid = %identity.authid,
        realm = %realm.name(),
        "session established"
    );

    // --- Step 2: Message loop ---
    loop {
        let data = match recv_within(&conn, state.config.idle_timeout).await {
            Ok(Inbound::Frame(data)) => data,
            Ok(Inbound::Closed) => {
                tracing::info!(%session_id, "connection closed cleanly");
                break;
            }
            Ok(Inbound::TimedOut) => {
                tracing::info!(%session_id, "session idle, closing");
                break;
            }
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "recv error");
                break;
            }
        };

        let msg: Message = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "failed to decode message");
                continue;
            }
        };

        match msg {
            Message::Call {
                request,
                procedure,
                args,
            } => {
                let reply = match realm.call(&procedure, &args).await {
                    Ok(value) => Message::CallResult {
                        request,
                        args: vec![value],
                    },
                    Err(e) => {
                        tracing::debug!(%session_id, %request, error = %e, "call failed");
                        Message::Error {
                            request,
                            error: e.uri().to_string(),
                            message: Some(e.to_string()),
                        }
                    }
                };
                send(&conn, &state.codec, &reply).await?;
            }

            Message::Goodbye { reason } => {
                tracing::info!(%session_id, %reason, "client said goodbye");
                send(
                    &conn,
                    &state.codec,
                    &Message::Goodbye {
                        reason: uri::GOODBYE_AND_OUT.to_string(),
                    },
                )
                .await?;
                break;
            }

            Message::Hello(_) | Message::Authenticate { .. } => {
                tracing::info!(%session_id, kind = msg.kind(), "handshake message on an established session");
                let detail = format!("{} after welcome", msg.kind());
                abort(&conn, &state.codec, uri::PROTOCOL_VIOLATION, Some(&detail)).await?;
                break;
            }

            other => {
                tracing::debug!(%session_id, kind = other.kind(), "ignoring unexpected message");
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → session leaves the realm.
    Ok(())
}

/// Reads the hello and runs the handshake.
///
/// Returns the realm and identity on accept, `None` once the client has
/// been refused (an abort is already sent) or has gone away.
async fn attach<S, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, C>>,
) -> Result<Option<(Arc<Realm>, Identity)>, RealmgateError>
where
    S: CredentialStore,
    C: Codec,
{
    let conn_id = conn.id();
    let codec = &state.codec;

    let details = match recv_within(conn, state.config.hello_timeout).await? {
        Inbound::Frame(data) => match codec.decode::<Message>(&data) {
            Ok(Message::Hello(details)) => details,
            Ok(other) => {
                tracing::debug!(%conn_id, kind = other.kind(), "first message was not Hello");
                abort(conn, codec, uri::PROTOCOL_VIOLATION, Some("expected Hello")).await?;
                return Ok(None);
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "undecodable first frame");
                abort(conn, codec, uri::PROTOCOL_VIOLATION, Some("expected Hello")).await?;
                return Ok(None);
            }
        },
        Inbound::Closed => return Ok(None),
        Inbound::TimedOut => {
            tracing::info!(%conn_id, "no hello received in time");
            return Ok(None);
        }
    };

    let realm = match state.router.realm(&details.realm) {
        Ok(realm) => realm,
        Err(e) => {
            tracing::info!(%conn_id, realm = %details.realm, "hello for unknown realm");
            abort(conn, codec, e.uri(), None).await?;
            return Ok(None);
        }
    };

    let mut session =
        AuthenticatingSession::new(Arc::clone(&state.store), state.auth_config.clone());
    let mut decision = session.hello(&details).await;

    loop {
        match decision {
            AuthDecision::Challenge { authmethod, extra } => {
                send(conn, codec, &Message::Challenge { authmethod, extra }).await?;

                decision = match recv_within(conn, session.response_timeout()).await? {
                    Inbound::Frame(data) => match codec.decode::<Message>(&data) {
                        Ok(Message::Authenticate { signature, extra }) => {
                            session.authenticate(&signature, &extra)
                        }
                        Ok(Message::Hello(details)) => session.hello(&details).await,
                        Ok(_) => session.reject("unexpected message during handshake"),
                        Err(_) => session.reject("undecodable frame during handshake"),
                    },
                    Inbound::Closed => {
                        tracing::debug!(%conn_id, "connection closed mid-handshake");
                        return Ok(None);
                    }
                    Inbound::TimedOut => session.expire(),
                };
            }
            AuthDecision::Accept(identity) => return Ok(Some((realm, identity))),
            AuthDecision::Deny(cause) => {
                tracing::debug!(%conn_id, reason = %cause, "sending abort");
                abort(conn, codec, uri::NOT_AUTHORIZED, None).await?;
                return Ok(None);
            }
        }
    }
}

/// Waits up to `limit` for the next frame.
async fn recv_within(
    conn: &WebSocketConnection,
    limit: Duration,
) -> Result<Inbound, RealmgateError> {
    match tokio::time::timeout(limit, conn.recv()).await {
        Ok(Ok(Some(data))) => Ok(Inbound::Frame(data)),
        Ok(Ok(None)) => Ok(Inbound::Closed),
        Ok(Err(e)) => Err(RealmgateError::Transport(e)),
        Err(_) => Ok(Inbound::TimedOut),
    }
}

/// Sends an Abort to the client.
async fn abort(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    reason: &str,
    message: Option<&str>,
) -> Result<(), RealmgateError> {
    send(conn, codec, &Message::abort(reason, message)).await
}

async fn send(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    msg: &Message,
) -> Result<(), RealmgateError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await.map_err(RealmgateError::Transport)?;
    Ok(())
}
