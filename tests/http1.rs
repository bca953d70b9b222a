//! HTTP/1.1 end-to-end tests.

use reqwest::StatusCode;
use switchyard::http::response::{INTERNAL_ERROR_BODY, NOT_FOUND_BODY, PAYLOAD_TOO_LARGE_BODY};
use switchyard::{handler_fn, Response, Server};

mod common;

#[tokio::test]
async fn test_variables_reach_handler() {
    let (server, address) = common::start_echo_server(common::test_config()).await;
    let client = common::http1_client();

    let response = client
        .get(format!("http://{address}/echo/alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.version(), reqwest::Version::HTTP_11);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.headers()["content-length"], "5");
    assert_eq!(response.text().await.unwrap(), "alice");

    server.shutdown();
}

#[tokio::test]
async fn test_request_body_is_buffered() {
    let (server, address) = common::start_echo_server(common::test_config()).await;

    let response = common::http1_client()
        .post(format!("http://{address}/echo/bob"))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "bob:hello");

    server.shutdown();
}

#[tokio::test]
async fn test_unmatched_path_is_not_found() {
    let (server, address) = common::start_echo_server(common::test_config()).await;

    let response = common::http1_client()
        .get(format!("http://{address}/nope/at/all"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), NOT_FOUND_BODY);

    server.shutdown();
}

#[tokio::test]
async fn test_handler_error_is_internal_error() {
    let (server, address) = common::start_echo_server(common::test_config()).await;

    let response = common::http1_client()
        .get(format!("http://{address}/fail"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), INTERNAL_ERROR_BODY);

    assert_eq!(server.meters().count("responseCodes.serverError"), 1);
    server.shutdown();
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = common::test_config();
    config.limits.max_payload_bytes = 16;
    let (server, address) = common::start_echo_server(config).await;

    let response = common::http1_client()
        .post(format!("http://{address}/echo/big"))
        .body(vec![b'x'; 64])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.text().await.unwrap(), PAYLOAD_TOO_LARGE_BODY);

    server.shutdown();
}

#[tokio::test]
async fn test_method_specific_routes() {
    let server = Server::new(common::test_config());
    server
        .add_route_with_method("/items", http::Method::GET, handler_fn(|_| Ok(Response::ok_text("list"))))
        .unwrap();
    server
        .add_route_with_method("/items", http::Method::POST, handler_fn(|_| Ok(Response::ok_text("created"))))
        .unwrap();
    let address = common::start(&server).await;
    let client = common::http1_client();
    let url = format!("http://{address}/items");

    assert_eq!(client.get(&url).send().await.unwrap().text().await.unwrap(), "list");
    assert_eq!(client.post(&url).send().await.unwrap().text().await.unwrap(), "created");

    let response = client.delete(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), NOT_FOUND_BODY);

    server.shutdown();
}

#[tokio::test]
async fn test_most_specific_route_wins() {
    let server = Server::new(common::test_config());
    server
        .add_route("/files/{path}", handler_fn(|_| Ok(Response::ok_text("variable"))))
        .unwrap();
    server
        .add_route("/files/readme", handler_fn(|_| Ok(Response::ok_text("literal"))))
        .unwrap();
    let address = common::start(&server).await;
    let client = common::http1_client();

    let literal = client.get(format!("http://{address}/files/readme")).send().await.unwrap();
    assert_eq!(literal.text().await.unwrap(), "literal");
    let variable = client.get(format!("http://{address}/files/other")).send().await.unwrap();
    assert_eq!(variable.text().await.unwrap(), "variable");

    server.shutdown();
}

#[tokio::test]
async fn test_route_added_while_serving() {
    let (server, address) = common::start_echo_server(common::test_config()).await;
    let client = common::http1_client();
    let url = format!("http://{address}/late");

    assert_eq!(client.get(&url).send().await.unwrap().status(), StatusCode::NOT_FOUND);

    server
        .add_route("/late", handler_fn(|_| Ok(Response::ok_text("here now"))))
        .unwrap();
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "here now");

    server.shutdown();
}

#[tokio::test]
async fn test_requests_and_status_codes_are_metered() {
    let (server, address) = common::start_echo_server(common::test_config()).await;
    let client = common::http1_client();

    for path in ["/echo/a", "/echo/b", "/missing"] {
        client.get(format!("http://{address}{path}")).send().await.unwrap();
    }

    assert_eq!(server.meters().count("requests"), 3);
    assert_eq!(server.meters().count("responseCodes.ok"), 2);
    assert_eq!(server.meters().count("responseCodes.notFound"), 1);

    server.shutdown();
}
