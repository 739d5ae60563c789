//! HTTP transport for the color stream
//!
//! - `GET /` returns an HTML viewer page
//! - `GET /screen-colors` streams one server-sent event per sample
//! - `GET /status` returns sampler status and metrics

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        Html,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures_util::{Stream, StreamExt};
use screenhue_core::hub::BroadcastHub;
use screenhue_core::metrics::MetricsSnapshot;
use screenhue_core::types::ScreenBounds;
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared state for the HTTP handlers
#[derive(Clone)]
struct ServerState {
    hub: BroadcastHub,
}

/// Build the router
pub fn router(hub: BroadcastHub) -> Router {
    Router::new()
        .route("/", get(viewer_page))
        .route("/screen-colors", get(screen_colors))
        .route("/status", get(get_status))
        .layer(CorsLayer::permissive())
        .with_state(ServerState { hub })
}

/// Bind `addr` and serve until `shutdown` completes
pub async fn run(
    hub: BroadcastHub,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    serve_on(listener, hub, shutdown).await
}

/// Serve on an already bound listener until `shutdown` completes
///
/// Shutting down also shuts the hub down, which ends every open event
/// stream so the server can drain.
pub async fn serve_on(
    listener: TcpListener,
    hub: BroadcastHub,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no address")?;
    info!("Color stream available at http://{}/screen-colors", addr);

    let app = router(hub.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutting down HTTP server");
            hub.shutdown();
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}

/// HTML viewer page
async fn viewer_page() -> Html<&'static str> {
    Html(VIEWER_HTML)
}

/// Event stream endpoint; one subscription per connection
async fn screen_colors(
    State(state): State<ServerState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<serde_json::Value>)>
{
    let subscription = state.hub.subscribe().map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
    })?;
    info!("Stream client attached as subscriber {}", subscription.id());

    let stream = subscription
        .into_stream()
        .map(|event| Ok(Event::default().data(event.to_json())));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Status response body
#[derive(Debug, Serialize)]
struct StatusBody {
    running: bool,
    shut_down: bool,
    lifecycle: String,
    subscribers: usize,
    capturer: String,
    bounds: ScreenBounds,
    metrics: MetricsSnapshot,
}

/// Status endpoint
async fn get_status(State(state): State<ServerState>) -> Json<StatusBody> {
    let hub = &state.hub;
    Json(StatusBody {
        running: hub.is_running(),
        shut_down: hub.is_shut_down(),
        lifecycle: hub.lifecycle().to_string(),
        subscribers: hub.subscriber_count(),
        capturer: hub.pipeline().capturer_name().to_string(),
        bounds: hub.bounds(),
        metrics: hub.snapshot(),
    })
}

/// Embedded HTML viewer page
const VIEWER_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Screenhue</title>
    <style>
        body {
            margin: 0;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            background: #000;
            color: #fff;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            transition: background 0.3s linear;
        }
        .panel {
            padding: 20px;
            background: rgba(0, 0, 0, 0.6);
            border-radius: 8px;
            min-width: 280px;
        }
        .swatch {
            display: inline-block;
            width: 14px;
            height: 14px;
            border-radius: 3px;
            margin-right: 8px;
            vertical-align: middle;
        }
        .connected { color: #22c55e; }
        .disconnected { color: #ef4444; }
        table { width: 100%; margin-top: 10px; }
        td { padding: 4px 0; font-family: monospace; }
    </style>
</head>
<body>
    <div class="panel">
        <div>Status: <span id="status" class="disconnected">Disconnected</span></div>
        <table id="results"></table>
    </div>
    <script>
        const statusEl = document.getElementById('status');
        const results = document.getElementById('results');
        const source = new EventSource('/screen-colors');

        source.onopen = () => {
            statusEl.textContent = 'Connected';
            statusEl.className = 'connected';
        };

        source.onerror = () => {
            statusEl.textContent = 'Disconnected';
            statusEl.className = 'disconnected';
        };

        source.onmessage = (message) => {
            const event = JSON.parse(message.data);
            document.body.style.background = event.color.hexTriplet;
            results.innerHTML = '';
            for (const [name, color] of Object.entries(event.algorithmResults)) {
                const row = results.insertRow();
                row.insertCell().textContent = name;
                const value = row.insertCell();
                value.innerHTML = '<span class="swatch"></span>' + color.hexTriplet;
                value.firstChild.style.background = color.hexTriplet;
            }
        };
    </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use screenhue_core::capture::SyntheticCapturer;
    use screenhue_core::config::SamplingConfig;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    fn test_hub() -> BroadcastHub {
        let capturer = SyntheticCapturer::new(ScreenBounds::new(32, 18)).unwrap();
        let config = SamplingConfig::default().with_interval(Duration::from_millis(20));
        BroadcastHub::new(Box::new(capturer), &config).unwrap()
    }

    async fn start_server(hub: BroadcastHub) -> (SocketAddr, oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        tokio::spawn(serve_on(listener, hub, async {
            let _ = stop_rx.await;
        }));
        (addr, stop_tx)
    }

    async fn request(addr: SocketAddr, path: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            path, addr
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        stream
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let hub = test_hub();
        let (addr, _stop) = start_server(hub).await;

        let mut stream = request(addr, "/status").await;
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"subscribers\":0"));
        assert!(response.contains("\"capturer\":\"synthetic\""));
        assert!(response.contains("\"lifecycle\":\"on-demand\""));
    }

    #[tokio::test]
    async fn test_viewer_page() {
        let (addr, _stop) = start_server(test_hub()).await;

        let mut stream = request(addr, "/").await;
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.contains("text/html"));
        assert!(response.contains("EventSource('/screen-colors')"));
    }

    #[tokio::test]
    async fn test_event_stream_delivers_colors() {
        let hub = test_hub();
        let (addr, stop) = start_server(hub.clone()).await;

        let mut stream = request(addr, "/screen-colors").await;
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        let read = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                assert!(n > 0, "stream closed early");
                received.extend_from_slice(&buf[..n]);
                if String::from_utf8_lossy(&received).contains("hexTriplet") {
                    break;
                }
            }
        })
        .await;
        assert!(read.is_ok(), "no event received");

        let text = String::from_utf8_lossy(&received);
        assert!(text.contains("text/event-stream"));
        assert!(text.contains("data: {"));
        assert!(text.contains("\"algorithmResults\""));
        assert_eq!(hub.subscriber_count(), 1);

        // Shutting down ends the stream.
        let _ = stop.send(());
        let ended = tokio::time::timeout(Duration::from_secs(5), async {
            while stream.read(&mut buf).await.unwrap_or(0) > 0 {}
        })
        .await;
        assert!(ended.is_ok(), "stream did not end on shutdown");
        assert!(hub.is_shut_down());
    }

    #[tokio::test]
    async fn test_event_stream_after_shutdown() {
        let hub = test_hub();
        hub.shutdown();
        let (addr, _stop) = start_server(hub).await;

        let mut stream = request(addr, "/screen-colors").await;
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 503"));
        assert!(response.contains("shut down"));
    }
}
