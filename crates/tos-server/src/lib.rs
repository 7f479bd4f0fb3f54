//! HTTP server for tos.
//!
//! `POST /{id}` binds a payload to an id exactly once, `GET /{id}` returns it
//! (optionally long-polling with `?wait=1`), and `GET /{id}/icon` redirects
//! to a favicon of the payload's origin.

pub mod config;
pub mod error;
pub mod handler;
pub mod icon;
pub mod router;
pub mod server;
pub mod state;

pub use config::{IconConfig, ServerConfig, WaitConfig};
pub use error::{ServerError, ServerResult};
pub use icon::{Icon, IconFinder, SizeRange};
pub use server::{shutdown_signal, TosServer};
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tokio_util::sync::CancellationToken;
    use tower::util::ServiceExt;

    use tos_core::{BlobService, CoreConfig, WaitPolicy};
    use tos_store::{KvStore, MemoryKvStore};

    struct Harness {
        app: Router,
        store: Arc<MemoryKvStore>,
        shutdown: CancellationToken,
    }

    fn harness_with(store: MemoryKvStore, max_body_bytes: usize) -> Harness {
        let store = Arc::new(store);
        let config = CoreConfig {
            entry_ttl: Duration::from_secs(600),
            wait: WaitPolicy::new(Duration::from_millis(600), Duration::from_millis(100)),
        };
        let service = BlobService::new(Arc::clone(&store) as Arc<dyn KvStore>, config).unwrap();
        let icons = IconFinder::new(&IconConfig::default()).unwrap();
        let shutdown = CancellationToken::new();
        let state = AppState::new(service, icons, shutdown.clone());
        Harness {
            app: router::build_router(state, max_body_bytes),
            store,
            shutdown,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryKvStore::new(), 1024)
    }

    fn post(uri: &str, body: &'static str, content_type: &str, origin: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", content_type)
            .header("origin", origin)
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let h = harness();
        let response = h.app.oneshot(get("/-/healthz")).await.unwrap();
        assert_eq!(response.status(), 200);
        let body = body_string(response).await;
        assert!(body.contains("\"backend\":\"memory\""));
    }

    #[tokio::test]
    async fn healthz_is_an_ordinary_id() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(post("/healthz", "x", "text/plain", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = h.app.clone().oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "x");

        let response = h.app.oneshot(get("/-/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_then_get_roundtrip() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(post("/abc", "hello", "text/plain", "https://example.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = h.app.clone().oneshot(get("/abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(response.headers()[handler::X_DATA_ORIGIN], "https://example.com");
        assert_eq!(body_string(response).await, "hello");
    }

    #[tokio::test]
    async fn identical_repost_is_ok_and_different_is_forbidden() {
        let h = harness();
        let first = post("/abc", "hello", "text/plain", "example.com");
        assert_eq!(h.app.clone().oneshot(first).await.unwrap().status(), StatusCode::CREATED);

        let again = post("/abc", "hello", "text/plain", "example.com");
        assert_eq!(h.app.clone().oneshot(again).await.unwrap().status(), StatusCode::OK);

        let other = post("/abc", "world", "text/plain", "example.com");
        let response = h.app.clone().oneshot(other).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_string(response).await, "id already exists");

        let response = h.app.oneshot(get("/abc")).await.unwrap();
        assert_eq!(body_string(response).await, "hello");
    }

    #[tokio::test]
    async fn unspecified_metadata_is_not_echoed() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/bare")
            .body(Body::from("raw"))
            .unwrap();
        h.app.clone().oneshot(request).await.unwrap();

        let response = h.app.oneshot(get("/bare")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("content-type").is_none());
        assert!(response.headers().get(handler::X_DATA_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn missing_id_is_no_content() {
        let h = harness();
        let response = h.app.oneshot(get("/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test(start_paused = true)]
    async fn long_poll_times_out_with_no_content() {
        let h = harness();
        let start = tokio::time::Instant::now();
        let response = h.app.oneshot(get("/missing?wait=1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_flag_values() {
        let h = harness();
        let start = tokio::time::Instant::now();
        h.app.clone().oneshot(get("/missing?wait=0")).await.unwrap();
        h.app.clone().oneshot(get("/missing?wait=yes")).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        h.app.oneshot(get("/missing?wait=true")).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn long_poll_is_released_by_post() {
        let h = harness();
        let pending = tokio::spawn(h.app.clone().oneshot(get("/late?wait=1")));
        tokio::time::sleep(Duration::from_millis(250)).await;

        let response = h
            .app
            .clone()
            .oneshot(post("/late", "finally", "text/plain", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = pending.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "finally");
        assert_eq!(h.store.subscribed_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_long_poll() {
        let h = harness();
        let pending = tokio::spawn(h.app.clone().oneshot(get("/never?wait=1")));
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.shutdown.cancel();

        let response = pending.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(h.store.subscribed_keys(), 0);
    }

    #[tokio::test]
    async fn corrupt_stored_value_is_server_error() {
        let h = harness();
        h.store
            .set("junk", b"\x07not an entity", Duration::from_secs(60))
            .await
            .unwrap();
        let response = h.app.oneshot(get("/junk")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let h = harness_with(MemoryKvStore::new(), 4);
        let response = h
            .app
            .oneshot(post("/big", "more than four bytes", "text/plain", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn icon_with_bad_size_is_bad_request() {
        let h = harness();
        let response = h.app.oneshot(get("/abc/icon?size=huge")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn icon_for_missing_entity_is_no_content() {
        let h = harness();
        let response = h.app.oneshot(get("/abc/icon?size=32")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn icon_without_origin_is_no_content() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/plain")
            .body(Body::from("x"))
            .unwrap();
        h.app.clone().oneshot(request).await.unwrap();
        let response = h.app.oneshot(get("/plain/icon?size=16..32..64")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
