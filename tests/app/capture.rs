use std::time::Duration;

use actix_web::http::Method;
use actix_web::test;
use futures_util::future::join_all;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use webhook_probe::capture::{CaptureLog, CaptureServer};
use webhook_probe::error::Error;

use crate::helpers::capture_app;

#[actix_web::test]
async fn post_is_acknowledged_and_recorded() {
    let log = CaptureLog::default();
    let app = test::init_service(capture_app(log.clone())).await;

    let req = test::TestRequest::post()
        .uri("/hooks/test")
        .set_payload(r#"{"order_id":42}"#)
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "received");
    assert!(body["timestamp"].is_string());

    let records = log.snapshot().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].method, "POST");
    assert_eq!(records[0].path, "/hooks/test");
    let parsed: serde_json::Value = serde_json::from_str(&records[0].body).unwrap();
    assert_eq!(parsed["order_id"], 42);
}

#[actix_web::test]
async fn query_string_is_kept_in_path() {
    let log = CaptureLog::default();
    let app = test::init_service(capture_app(log.clone())).await;

    let req = test::TestRequest::get().uri("/hooks?a=1&b=2").to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());

    let records = log.snapshot().await;
    assert_eq!(records[0].path, "/hooks?a=1&b=2");
    assert_eq!(records[0].body, "");
}

#[actix_web::test]
async fn extension_methods_are_captured_not_rejected() {
    let log = CaptureLog::default();
    let app = test::init_service(capture_app(log.clone())).await;

    let req = test::TestRequest::default()
        .method(Method::from_bytes(b"PURGE").unwrap())
        .uri("/cache")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 200);

    let records = log.snapshot().await;
    assert_eq!(records[0].method, "PURGE");
}

#[actix_web::test]
async fn headers_are_recorded_as_received() {
    let log = CaptureLog::default();
    let app = test::init_service(capture_app(log.clone())).await;

    let req = test::TestRequest::post()
        .uri("/hooks")
        .insert_header(("x-webhook-signature", "sha256=abc"))
        .insert_header(("x-delivery", "7"))
        .set_payload("{}")
        .to_request();
    test::call_service(&app, req).await;

    let records = log.snapshot().await;
    let headers = &records[0].headers;
    assert!(headers
        .iter()
        .any(|(n, v)| n == "x-webhook-signature" && v == "sha256=abc"));
    assert!(headers.iter().any(|(n, v)| n == "x-delivery" && v == "7"));
}

#[actix_web::test]
async fn sequential_requests_are_logged_in_order() {
    let log = CaptureLog::default();
    let app = test::init_service(capture_app(log.clone())).await;

    for i in 0..5 {
        let req = test::TestRequest::post()
            .uri(&format!("/hooks/{i}"))
            .set_payload(format!(r#"{{"seq":{i}}}"#))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_success());
    }

    let records = log.snapshot().await;
    assert_eq!(records.len(), 5);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.path, format!("/hooks/{i}"));
    }
}

#[actix_web::test]
async fn concurrent_requests_are_all_captured() {
    let server = CaptureServer::start_on(("127.0.0.1", 0)).unwrap();
    let url = format!("http://{}/hooks/concurrent", server.addr());
    let client = reqwest::Client::new();

    let requests = (0..8).map(|i| {
        let client = client.clone();
        let url = url.clone();
        async move {
            client
                .post(&url)
                .json(&serde_json::json!({ "seq": i }))
                .send()
                .await
                .unwrap()
        }
    });
    for response in join_all(requests).await {
        assert_eq!(response.status().as_u16(), 200);
    }

    let records = server.stop().await;
    assert_eq!(records.len(), 8);

    let mut seqs: Vec<i64> = records
        .iter()
        .map(|r| {
            serde_json::from_str::<serde_json::Value>(&r.body).unwrap()["seq"]
                .as_i64()
                .unwrap()
        })
        .collect();
    seqs.sort_unstable();
    assert_eq!(seqs, (0..8i64).collect::<Vec<_>>());
}

#[actix_web::test]
async fn truncated_body_is_captured_best_effort() {
    let server = CaptureServer::start_on(("127.0.0.1", 0)).unwrap();
    let log = server.log();

    // Declare 100 bytes, send 5, then hang up.
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();
    stream
        .write_all(
            b"POST /partial HTTP/1.1\r\nhost: localhost\r\ncontent-length: 100\r\n\r\nshort",
        )
        .await
        .unwrap();
    stream.flush().await.unwrap();
    drop(stream);

    for _ in 0..100 {
        if log.len().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let records = server.stop().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, "/partial");
    assert_eq!(records[0].body, "short");
}

#[actix_web::test]
async fn bind_conflict_is_a_startup_error() {
    let server = CaptureServer::start_on(("127.0.0.1", 0)).unwrap();
    let port = server.addr().port();

    match CaptureServer::start_on(("127.0.0.1", port)) {
        Err(Error::Bind { port: p, .. }) => assert_eq!(p, port),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("bind conflict not detected"),
    }

    server.stop().await;
}
