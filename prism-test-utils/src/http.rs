//! Local HTTP server standing in for the provider's result CDN.
//!
//! Routes:
//! - `GET /files/{name}`: 200 with [`payload_for`]`(name)`
//! - `GET /status/{code}`: empty response with that status
//! - `GET /slow/{millis}`: one chunk, a pause of `millis`, then a second chunk
//! - `GET /broken`: one chunk, then the stream errors
//! - `GET /empty`: 200 with an empty body

use axum::body::{Body, Bytes};
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Deterministic body served for `name`, large enough to span several chunks.
pub fn payload_for(name: &str) -> Vec<u8> {
    name.bytes().cycle().take(48 * 1024).collect()
}

pub struct ArtifactServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl ArtifactServer {
    /// Bind to an ephemeral localhost port and start serving.
    pub async fn start() -> std::io::Result<Self> {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new()
            .route("/files/:name", get(serve_file))
            .route("/status/:code", get(serve_status))
            .route("/slow/:millis", get(serve_slow))
            .route("/broken", get(serve_broken))
            .route("/empty", get(|| async { StatusCode::OK }))
            .layer(axum::middleware::from_fn(
                move |req: axum::extract::Request, next: axum::middleware::Next| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        next.run(req).await
                    }
                },
            ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { addr, hits, handle })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    pub fn file_url(&self, name: &str) -> String {
        self.url(&format!("files/{}", name))
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for ArtifactServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_file(Path(name): Path<String>) -> Vec<u8> {
    payload_for(&name)
}

async fn serve_status(Path(code): Path<u16>) -> Response {
    StatusCode::from_u16(code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

async fn serve_slow(Path(millis): Path<u64>) -> Response {
    let chunks = stream::unfold(0u8, move |step| async move {
        match step {
            0 => Some((Ok::<_, std::io::Error>(Bytes::from_static(b"first-chunk;")), 1)),
            1 => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Some((Ok(Bytes::from_static(b"second-chunk")), 2))
            }
            _ => None,
        }
    });
    Body::from_stream(chunks).into_response()
}

async fn serve_broken() -> Response {
    let chunks = stream::iter(vec![
        Ok(Bytes::from(vec![7u8; 16 * 1024])),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer went away")),
    ]);
    Body::from_stream(chunks).into_response()
}
