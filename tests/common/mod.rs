// fake upstreams for the integration tests, bound to an ephemeral port on loopback
#![allow(dead_code)]

use axum::Router;

pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

pub fn html(body: &str) -> String {
    format!("<!doctype html><html><head><title>player</title></head><body>{}</body></html>", body)
}
