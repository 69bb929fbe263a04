//! Shared test fixtures.

use axum::Router;

/// Serve a router on an ephemeral local port and return its base URL. The
/// server task lives until the test runtime shuts down.
pub async fn http_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
