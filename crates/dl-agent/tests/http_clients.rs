//! Integration tests: HTTP clients against a one-shot local endpoint.
//!
//! Each test binds a listener on an ephemeral port, answers exactly one
//! request with a canned response, and hands back the JSON body it received.

use dl_agent::{
    AgentError, HttpAgentClient, HttpImageTransport, ImageTransport, LayoutAgent, TransportError,
};
use dl_core::id::ShapeId;
use dl_core::model::{CanvasSize, ImageFormat, ImageReference, LayoutObject, RasterImage};
use dl_core::wire::Status;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

async fn serve_once(status_line: &'static str, body: Value) -> (String, JoinHandle<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/endpoint", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length: usize = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let received: Value =
            serde_json::from_slice(&buf[header_end..header_end + content_length]).unwrap();

        let payload = body.to_string();
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
            payload.len()
        );
        // The client may hang up early on error statuses.
        let _ = sock.write_all(response.as_bytes()).await;
        let _ = sock.shutdown().await;
        received
    });

    (url, handle)
}

fn jpeg_stub() -> RasterImage {
    RasterImage {
        bytes: vec![0, 0, 0],
        width: 400,
        height: 400,
        format: ImageFormat::Jpeg,
    }
}

// ─── Upload ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_sends_bare_base64_and_returns_uri() {
    let (url, server) = serve_once("200 OK", json!({ "status": 200, "uri": "u1" })).await;
    let transport = HttpImageTransport::new(url);

    let reference = transport.upload(&jpeg_stub(), "x.jpg").await.unwrap();
    assert_eq!(
        reference,
        ImageReference {
            status: Status::Code(200),
            uri: "u1".into()
        }
    );

    let sent = server.await.unwrap();
    assert_eq!(sent, json!({ "base64": "AAAA", "name": "x.jpg" }));
}

#[tokio::test]
async fn upload_http_failure_is_transport_error() {
    let (url, server) = serve_once("500 Internal Server Error", json!({})).await;
    let err = HttpImageTransport::new(url)
        .upload(&jpeg_stub(), "x.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Status(500)));
    server.await.unwrap();
}

#[tokio::test]
async fn upload_reported_failure_is_rejected() {
    let (url, server) = serve_once("200 OK", json!({ "status": "error", "uri": "" })).await;
    let err = HttpImageTransport::new(url)
        .upload(&jpeg_stub(), "x.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Rejected { .. }));
    server.await.unwrap();
}

// ─── Agent ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn analyze_posts_image_path() {
    let (url, server) = serve_once(
        "200 OK",
        json!({ "status": 200, "result": ["a wooden chair", "white background"] }),
    )
    .await;
    let reference = ImageReference {
        status: Status::Code(200),
        uri: "u1".into(),
    };

    let analysis = HttpAgentClient::new(url)
        .analyze_image(&reference)
        .await
        .unwrap();
    assert_eq!(analysis.description(), "a wooden chair\nwhite background");

    let sent = server.await.unwrap();
    assert_eq!(
        sent,
        json!({ "name": "analyze_image", "args": { "image_path": "u1" } })
    );
}

#[tokio::test]
async fn autolayout_posts_canvas_and_objects() {
    let (url, server) = serve_once(
        "200 OK",
        json!({
            "status": 200,
            "result": {
                "canvas_top_margin": 30,
                "canvas_right_margin": 0,
                "canvas_bottom_margin": 0,
                "canvas_left_margin": 30,
                "objects": []
            }
        }),
    )
    .await;

    let layout = HttpAgentClient::new(url)
        .compute_layout(
            CanvasSize {
                width: 800.0,
                height: 600.0,
            },
            vec![LayoutObject {
                id: ShapeId::intern("shape:hero"),
                desc: "a wooden chair".into(),
            }],
        )
        .await
        .unwrap();
    assert_eq!(layout.origin(), (30.0, 30.0));

    let sent = server.await.unwrap();
    assert_eq!(
        sent,
        json!({
            "name": "autolayout",
            "args": {
                "width": 800.0,
                "height": 600.0,
                "objects": [{ "id": "shape:hero", "desc": "a wooden chair" }]
            }
        })
    );
}

#[tokio::test]
async fn agent_reported_failure_is_rejected() {
    let (url, server) = serve_once("200 OK", json!({ "status": 500, "result": [] })).await;
    let reference = ImageReference {
        status: Status::Code(200),
        uri: "u1".into(),
    };
    let err = HttpAgentClient::new(url)
        .analyze_image(&reference)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::Rejected {
            operation: "analyze_image",
            ..
        }
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn autolayout_object_without_desc_is_malformed() {
    let (url, server) = serve_once(
        "200 OK",
        json!({
            "status": 200,
            "result": {
                "canvas_top_margin": 30,
                "canvas_left_margin": 30,
                "objects": [{ "id": "shape:elsewhere" }]
            }
        }),
    )
    .await;

    let err = HttpAgentClient::new(url)
        .compute_layout(
            CanvasSize {
                width: 800.0,
                height: 600.0,
            },
            vec![LayoutObject {
                id: ShapeId::intern("shape:hero"),
                desc: "a wooden chair".into(),
            }],
        )
        .await
        .unwrap_err();
    match err {
        AgentError::Malformed(malformed) => assert_eq!(malformed.index, 0),
        other => panic!("unexpected {other:?}"),
    }
    server.await.unwrap();
}
