//! In-process HTTP server for tests that talk to catalog or credential
//! endpoints.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

/// Serve `app` on a random local port and return its base URL.
///
/// The listener is bound before this returns, so requests can be sent
/// immediately. The server runs until the test runtime shuts down.
pub async fn spawn_mock_server(app: Router) -> String {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = TcpListener::bind(addr)
        .await
        .expect("bind mock server");
    let bound = listener.local_addr().expect("mock server address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });

    format!("http://{}", bound)
}

/// A base URL nothing is listening on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind scratch listener");
    let addr = listener.local_addr().expect("scratch listener address");
    drop(listener);
    format!("http://{}", addr)
}
