//! End-to-end tests: real axum server, real WebSocket clients.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use fanout_hub::app_state::AppState;
use fanout_hub::config::HubConfig;
use fanout_hub::domain::RemovalReason;
use fanout_hub::hub::Hub;
use fanout_hub::server::build_app;

type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn start() -> (SocketAddr, Arc<Hub>) {
    let config = HubConfig::default();
    let hub = Arc::new(Hub::new(&config));
    let app = build_app(AppState::new(Arc::clone(&hub)), &config.ws_path);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, hub)
}

async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{addr}/websocket/rails");
    let Ok((client, _)) = tokio_tungstenite::connect_async(url).await else {
        panic!("websocket connect failed");
    };
    client
}

async fn wait_for_count(hub: &Hub, expected: usize) {
    for _ in 0..100 {
        if hub.connection_count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("connection count never reached {expected}");
}

async fn next_text(client: &mut Client) -> String {
    let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(2), client.next()).await
    else {
        panic!("no frame received");
    };
    let Ok(text) = msg.to_text() else {
        panic!("expected a text frame");
    };
    text.to_string()
}

#[tokio::test]
async fn rest_broadcast_reaches_every_socket() {
    let (addr, hub) = start().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_count(&hub, 2).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/broadcast"))
        .json(&serde_json::json!({ "message": "{\"tick\":1}" }))
        .send()
        .await;
    let Ok(response) = response else {
        panic!("broadcast request failed");
    };
    assert!(response.status().is_success());
    let Ok(body) = response.json::<serde_json::Value>().await else {
        panic!("broadcast response was not JSON");
    };
    assert_eq!(body["evicted"], 0);
    assert_eq!(body["live"], 2);

    assert_eq!(next_text(&mut a).await, "{\"tick\":1}");
    assert_eq!(next_text(&mut b).await, "{\"tick\":1}");
}

#[tokio::test]
async fn inbound_text_reaches_subscribers_and_reply_returns() {
    let (addr, hub) = start().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _ = hub.subscribe_messages(move |envelope| {
        tx.send(envelope.clone())?;
        Ok(())
    });

    let mut client = connect(addr).await;
    wait_for_count(&hub, 1).await;
    let Ok(()) = client.send(Message::text("hello")).await else {
        panic!("client send failed");
    };

    let Ok(Some(envelope)) = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await else {
        panic!("subscriber never saw the message");
    };
    assert_eq!(envelope.message(), "hello");
    assert!(hub.is_live(envelope.connection()).await);

    assert!(hub.reply(&envelope, "hi back").await);
    assert_eq!(next_text(&mut client).await, "hi back");
}

#[tokio::test]
async fn client_close_deregisters_once() {
    let (addr, hub) = start().await;
    let mut removals = hub.removal_stream();

    let mut client = connect(addr).await;
    wait_for_count(&hub, 1).await;
    let _ = client.close(None).await;
    wait_for_count(&hub, 0).await;

    let Ok(Ok(event)) = tokio::time::timeout(Duration::from_secs(2), removals.recv()).await else {
        panic!("no removal event");
    };
    assert_eq!(event.reason(), RemovalReason::Closed);
    assert!(
        tokio::time::timeout(Duration::from_millis(100), removals.recv())
            .await
            .is_err(),
        "removal must fire once"
    );
}

#[tokio::test]
async fn admin_disconnect_and_unknown_ids() {
    let (addr, hub) = start().await;
    let _client = connect(addr).await;
    wait_for_count(&hub, 1).await;
    let connections = hub.connections().await;
    let Some(conn) = connections.first() else {
        panic!("expected one connection");
    };

    let http = reqwest::Client::new();
    let Ok(resp) = http
        .put(format!("http://{addr}/api/v1/connections/{}/init-data", conn.id()))
        .json(&serde_json::json!({ "value": "room-42" }))
        .send()
        .await
    else {
        panic!("init-data request failed");
    };
    assert_eq!(resp.status().as_u16(), 204);
    assert_eq!(conn.init_data(), Some("room-42"));

    let Ok(resp) = http
        .delete(format!("http://{addr}/api/v1/connections/{}", conn.id()))
        .send()
        .await
    else {
        panic!("delete request failed");
    };
    assert_eq!(resp.status().as_u16(), 204);
    assert!(!hub.is_live(conn).await);

    let Ok(resp) = http
        .delete(format!("http://{addr}/api/v1/connections/{}", conn.id()))
        .send()
        .await
    else {
        panic!("second delete request failed");
    };
    assert_eq!(resp.status().as_u16(), 404);
}
