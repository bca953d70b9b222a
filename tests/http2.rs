//! HTTP/2 end-to-end tests over cleartext prior knowledge.

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use h2::client::{ResponseFuture, SendRequest};
use h2::Reason;
use http::{Method, Request, StatusCode};
use tokio::net::TcpStream;

use switchyard::http::response::{INTERNAL_ERROR_BODY, NOT_FOUND_BODY, PAYLOAD_TOO_LARGE_BODY};
use switchyard::{handler_fn, Response, Server};

mod common;

async fn connect(address: SocketAddr) -> SendRequest<Bytes> {
    let tcp = TcpStream::connect(address).await.unwrap();
    let (client, connection) = h2::client::handshake(tcp).await.unwrap();
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
}

fn request(method: Method, address: SocketAddr, path: &str) -> Request<()> {
    Request::builder()
        .method(method)
        .uri(format!("http://{address}{path}"))
        .body(())
        .unwrap()
}

async fn read_response(response: ResponseFuture) -> (StatusCode, String) {
    let (parts, mut body) = response.await.unwrap().into_parts();
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.unwrap();
        let _ = body.flow_control().release_capacity(chunk.len());
        buf.extend_from_slice(&chunk);
    }
    (parts.status, String::from_utf8_lossy(&buf).into_owned())
}

#[tokio::test]
async fn test_interleaved_streams_complete_independently() {
    let (server, address) = common::start_echo_server(common::test_config()).await;
    let client = connect(address).await;

    let mut client = client.ready().await.unwrap();
    let (response_a, mut body_a) = client
        .send_request(request(Method::POST, address, "/echo/a"), false)
        .unwrap();
    let mut client = client.ready().await.unwrap();
    let (response_b, mut body_b) = client
        .send_request(request(Method::POST, address, "/echo/b"), false)
        .unwrap();

    body_b.send_data(Bytes::from_static(b"second"), true).unwrap();
    let (status, body) = read_response(response_b).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "b:second");

    body_a.send_data(Bytes::from_static(b"fir"), false).unwrap();
    body_a.send_data(Bytes::from_static(b"st"), true).unwrap();
    let (status, body) = read_response(response_a).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "a:first");

    server.shutdown();
}

#[tokio::test]
async fn test_headers_only_request() {
    let (server, address) = common::start_echo_server(common::test_config()).await;
    let mut client = connect(address).await.ready().await.unwrap();

    let (response, _) = client
        .send_request(request(Method::GET, address, "/echo/carol"), true)
        .unwrap();
    let (status, body) = read_response(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "carol");

    server.shutdown();
}

#[tokio::test]
async fn test_not_found_and_handler_error_keep_connection_usable() {
    let (server, address) = common::start_echo_server(common::test_config()).await;
    let client = connect(address).await;

    let mut client = client.ready().await.unwrap();
    let (response, _) = client
        .send_request(request(Method::GET, address, "/missing"), true)
        .unwrap();
    assert_eq!(
        read_response(response).await,
        (StatusCode::NOT_FOUND, NOT_FOUND_BODY.to_string())
    );

    let mut client = client.ready().await.unwrap();
    let (response, _) = client
        .send_request(request(Method::GET, address, "/fail"), true)
        .unwrap();
    assert_eq!(
        read_response(response).await,
        (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY.to_string())
    );

    let mut client = client.ready().await.unwrap();
    let (response, _) = client
        .send_request(request(Method::GET, address, "/echo/after"), true)
        .unwrap();
    assert_eq!(read_response(response).await, (StatusCode::OK, "after".to_string()));

    server.shutdown();
}

#[tokio::test]
async fn test_reset_stream_does_not_disturb_others() {
    let (server, address) = common::start_echo_server(common::test_config()).await;
    let client = connect(address).await;

    let mut client = client.ready().await.unwrap();
    let (_abandoned, mut body) = client
        .send_request(request(Method::POST, address, "/echo/gone"), false)
        .unwrap();
    body.send_data(Bytes::from_static(b"partial"), false).unwrap();
    body.send_reset(Reason::CANCEL);

    let mut client = client.ready().await.unwrap();
    let (response, _) = client
        .send_request(request(Method::GET, address, "/echo/still-here"), true)
        .unwrap();
    assert_eq!(
        read_response(response).await,
        (StatusCode::OK, "still-here".to_string())
    );

    server.shutdown();
}

#[tokio::test]
async fn test_declared_oversized_body_is_rejected() {
    let mut config = common::test_config();
    config.limits.max_payload_bytes = 16;
    let (server, address) = common::start_echo_server(config).await;
    let mut client = connect(address).await.ready().await.unwrap();

    let mut oversized = request(Method::POST, address, "/echo/big");
    oversized
        .headers_mut()
        .insert(http::header::CONTENT_LENGTH, http::HeaderValue::from_static("64"));
    let (response, _body) = client.send_request(oversized, false).unwrap();
    assert_eq!(
        read_response(response).await,
        (StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE_BODY.to_string())
    );

    server.shutdown();
}

#[tokio::test]
async fn test_any_method_route_and_exact_method_preference() {
    let server = Server::new(common::test_config());
    server
        .add_route("/thing", handler_fn(|_| Ok(Response::ok_text("any"))))
        .unwrap();
    server
        .add_route_with_method("/thing", Method::DELETE, handler_fn(|_| Ok(Response::ok_text("delete"))))
        .unwrap();
    let address = common::start(&server).await;
    let client = connect(address).await;

    let mut client = client.ready().await.unwrap();
    let (response, _) = client
        .send_request(request(Method::PUT, address, "/thing"), true)
        .unwrap();
    assert_eq!(read_response(response).await.1, "any");

    let mut client = client.ready().await.unwrap();
    let (response, _) = client
        .send_request(request(Method::DELETE, address, "/thing"), true)
        .unwrap();
    assert_eq!(read_response(response).await.1, "delete");

    server.shutdown();
}

#[tokio::test]
async fn test_prior_knowledge_client() {
    let (server, address) = common::start_echo_server(common::test_config()).await;

    let response = common::http2_client()
        .get(format!("http://{address}/echo/dave"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.version(), reqwest::Version::HTTP_2);
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), "dave");

    let pong = common::http2_client()
        .get(format!("http://{address}/ping"))
        .send()
        .await
        .unwrap();
    assert_eq!(pong.text().await.unwrap(), "PONG");

    server.shutdown();
}

#[tokio::test]
async fn test_hop_by_hop_response_header_does_not_break_connection() {
    let (server, address) = common::start_echo_server(common::test_config()).await;
    server
        .add_route(
            "/gzip",
            handler_fn(|_| {
                Ok(Response::ok_text("x").with_header(http::header::TE, http::HeaderValue::from_static("gzip")))
            }),
        )
        .unwrap();
    let client = connect(address).await;

    let mut client = client.ready().await.unwrap();
    let (response, _) = client
        .send_request(request(Method::GET, address, "/gzip"), true)
        .unwrap();
    assert_eq!(read_response(response).await, (StatusCode::OK, "x".to_string()));

    let mut client = client.ready().await.unwrap();
    let (response, _) = client
        .send_request(request(Method::GET, address, "/echo/next"), true)
        .unwrap();
    assert_eq!(read_response(response).await, (StatusCode::OK, "next".to_string()));

    server.shutdown();
}

#[tokio::test]
async fn test_head_request_gets_headers_without_body() {
    let (server, address) = common::start_echo_server(common::test_config()).await;
    let client = connect(address).await;

    let mut client = client.ready().await.unwrap();
    let (response, _) = client
        .send_request(request(Method::HEAD, address, "/echo/quiet"), true)
        .unwrap();
    let (parts, mut body) = response.await.unwrap().into_parts();
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(parts.headers[http::header::CONTENT_LENGTH], "5");
    while let Some(chunk) = body.data().await {
        assert!(chunk.unwrap().is_empty());
    }

    let mut client = client.ready().await.unwrap();
    let (response, _) = client
        .send_request(request(Method::GET, address, "/echo/loud"), true)
        .unwrap();
    assert_eq!(read_response(response).await, (StatusCode::OK, "loud".to_string()));

    server.shutdown();
}
