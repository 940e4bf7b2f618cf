use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        WebSocketUpgrade,
    },
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use tracing::info;

mod config;

use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let app = build_router();

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "echo server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/hello", get(hello))
        .route("/ws", get(ws_handler))
}

async fn index() -> Html<&'static str> {
    Html("<h1>WebSocket echo server</h1><p>Point a console at <code>/ws</code>.</p>")
}

async fn healthz() -> &'static str {
    "ok"
}

async fn hello() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Hello from the echo server" }))
}

async fn ws_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(ws_connection)
}

// Echoes every inbound text frame back verbatim; other frames are ignored.
async fn ws_connection(mut socket: WebSocket) {
    while let Some(Ok(frame)) = socket.recv().await {
        match frame {
            Message::Text(text) => {
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio_tungstenite::{connect_async, tungstenite::Message as ClientFrame};

    async fn spawn_server() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, build_router()).await;
        });
        addr
    }

    #[tokio::test]
    async fn ws_endpoint_echoes_text_frames() {
        let addr = spawn_server().await;
        let (mut stream, _) = connect_async(format!("ws://{addr}/ws"))
            .await
            .expect("connect");

        stream
            .send(ClientFrame::Text("ping".to_string()))
            .await
            .expect("send");

        loop {
            let frame = stream.next().await.expect("frame").expect("frame ok");
            if let ClientFrame::Text(text) = frame {
                assert_eq!(text, "ping");
                break;
            }
        }
    }

    #[tokio::test]
    async fn ws_endpoint_echoes_frames_in_order() {
        let addr = spawn_server().await;
        let (mut stream, _) = connect_async(format!("ws://{addr}/ws"))
            .await
            .expect("connect");

        for text in ["one", "two", "three"] {
            stream
                .send(ClientFrame::Text(text.to_string()))
                .await
                .expect("send");
        }

        let mut echoed = Vec::new();
        while echoed.len() < 3 {
            let frame = stream.next().await.expect("frame").expect("frame ok");
            if let ClientFrame::Text(text) = frame {
                echoed.push(text);
            }
        }
        assert_eq!(echoed, vec!["one", "two", "three"]);
    }
}
