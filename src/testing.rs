//! Helpers shared by the module tests: in-process HTTP servers, a kill switch for
//! simulating node outages, and a probe driven by a shared liveness table.

use crate::health::{NodeId, NodeInfo, ProbeFn};

use axum::Router;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

/// An axum app served on an ephemeral localhost port for the lifetime of the value.
pub struct TestServer {
    pub url: String,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Makes every request to `app` answer `503` while `down` is set.
pub fn with_kill_switch(app: Router, down: Arc<AtomicBool>) -> Router {
    app.layer(middleware::from_fn(move |req: Request, next: Next| {
        let down = down.clone();
        async move {
            if down.load(Ordering::SeqCst) {
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
            next.run(req).await
        }
    }))
}

/// Probe answering from `liveness`; nodes missing from the table are down.
pub fn table_probe(liveness: Arc<DashMap<NodeId, bool>>) -> ProbeFn {
    Arc::new(move |node: NodeInfo| {
        let liveness = liveness.clone();
        Box::pin(async move {
            liveness
                .get(&node.node_id)
                .map(|entry| *entry.value())
                .unwrap_or(false)
        }) as Pin<Box<dyn Future<Output = bool> + Send>>
    })
}
