//! Integration tests for the WebSocket transport and the wrapped byte
//! protocol server.
//!
//! These spin up a real listener on a random port and talk to it with a
//! `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use realmgate_transport::{
        ByteProtocol, Connection, ConnectionId, Transport, WebSocketTransport,
        serve_wrapped,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: &str) -> ClientWs {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    async fn bind_random() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport
            .local_addr()
            .expect("should have local addr")
            .to_string();
        (transport, addr)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind_random().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().into_inner() > 0);

        server_conn
            .send(b"hello from router")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from router");

        client_ws
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_text_frames_arrive_as_bytes() {
        let (mut transport, addr) = bind_random().await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws
            .send(Message::Text("{\"type\":\"Goodbye\"}".into()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, b"{\"type\":\"Goodbye\"}");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind_random().await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_bind_invalid_address_returns_bind_failed() {
        let result = WebSocketTransport::bind("not-an-address").await;
        assert!(matches!(
            result,
            Err(realmgate_transport::TransportError::BindFailed { .. })
        ));
    }

    /// Greets the peer, records what it receives, and answers "ping" with
    /// "pong".
    struct Recorder {
        seen: Arc<Mutex<Vec<Vec<u8>>>>,
        lost: Arc<Mutex<bool>>,
    }

    impl ByteProtocol for Recorder {
        fn connection_made(&mut self, _id: ConnectionId) -> Option<Vec<u8>> {
            Some(b"how are you?".to_vec())
        }

        fn data_received(
            &mut self,
            _id: ConnectionId,
            data: &[u8],
        ) -> Option<Vec<u8>> {
            self.seen.lock().unwrap().push(data.to_vec());
            (data == b"ping").then(|| b"pong".to_vec())
        }

        fn connection_lost(&mut self, _id: ConnectionId) {
            *self.lost.lock().unwrap() = true;
        }
    }

    #[tokio::test]
    async fn test_serve_wrapped_greets_and_delivers_chunks() {
        let (transport, addr) = bind_random().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let lost = Arc::new(Mutex::new(false));

        let (seen_f, lost_f) = (Arc::clone(&seen), Arc::clone(&lost));
        tokio::spawn(serve_wrapped(transport, move || Recorder {
            seen: Arc::clone(&seen_f),
            lost: Arc::clone(&lost_f),
        }));

        let mut client_ws = connect_client(&addr).await;

        let greeting = client_ws.next().await.unwrap().unwrap();
        assert_eq!(greeting.into_data().as_ref(), b"how are you?");

        client_ws
            .send(Message::Binary(b"fine, thanks".to_vec().into()))
            .await
            .unwrap();
        client_ws
            .send(Message::Binary(b"ping".to_vec().into()))
            .await
            .unwrap();

        let reply = client_ws.next().await.unwrap().unwrap();
        assert_eq!(reply.into_data().as_ref(), b"pong");

        client_ws.send(Message::Close(None)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen, vec![b"fine, thanks".to_vec(), b"ping".to_vec()]);
        assert!(*lost.lock().unwrap(), "connection_lost should fire");
    }
}
