//! Client facade integration tests against the in-process fixture server.

mod common;

use std::io::Write as _;

use courier::client::Client;
use courier::config::{ClientConfig, ProxyServer};
use courier::dispatch::handler::DefaultHandler;
use courier::http::cookie::Cookie;
use courier::http::headers::HeaderMap;
use courier::http::multipart::Part;
use courier::http::request::{Method, Request};
use courier::http::response::Response;

use common::EchoServer;

fn param_fixture() -> Vec<(String, String)> {
    (0..5)
        .map(|i| (format!("param_{}", i), format!("value_{}", i)))
        .collect()
}

fn assert_params_echoed(response: &Response) {
    assert_eq!(response.status(), 200);
    for i in 0..5 {
        assert_eq!(
            response.header(&format!("X-param_{}", i)),
            Some(format!("value_{}", i).as_str()),
            "param_{} did not round-trip",
            i
        );
    }
}

fn form_body() -> String {
    param_fixture()
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn form_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.add("Content-Type", "application/x-www-form-urlencoded");
    headers
}

#[tokio::test]
async fn test_get_custom_headers_round_trip() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let mut request = Request::builder(Method::GET, server.url("/"));
    for i in 1..=5 {
        request = request.header(format!("Test{}", i), format!("Test{}", i));
    }

    let future = client
        .execute(request.build().unwrap(), DefaultHandler)
        .unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.status(), 200);
    for i in 1..=5 {
        assert_eq!(
            response.header(&format!("X-Test{}", i)),
            Some(format!("Test{}", i).as_str())
        );
    }
}

#[tokio::test]
async fn test_get_content_type() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let future = client.get(&server.url("/"), DefaultHandler).unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.content_type(), Some("text/plain"));
}

#[tokio::test]
async fn test_post_params_echoed() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let future = client
        .post_params(
            &server.url("/"),
            HeaderMap::new(),
            param_fixture(),
            DefaultHandler,
        )
        .unwrap();

    assert_params_echoed(&future.get().await.unwrap());
}

#[tokio::test]
async fn test_post_bytes_equivalent_to_params() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let future = client
        .post_bytes(
            &server.url("/"),
            form_headers(),
            form_body().into_bytes(),
            DefaultHandler,
        )
        .unwrap();

    assert_params_echoed(&future.get().await.unwrap());
}

#[tokio::test]
async fn test_post_stream_equivalent_to_params() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let stream = std::io::Cursor::new(form_body().into_bytes());
    let future = client
        .post_stream(&server.url("/"), form_headers(), stream, DefaultHandler)
        .unwrap();

    assert_params_echoed(&future.get().await.unwrap());
}

#[tokio::test]
async fn test_post_entity_writer_equivalent_to_params() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let body = form_body();
    let future = client
        .post_entity(
            &server.url("/"),
            form_headers(),
            move |out| out.write_all(body.as_bytes()),
            DefaultHandler,
        )
        .unwrap();

    assert_params_echoed(&future.get().await.unwrap());
}

#[tokio::test]
async fn test_post_empty_body() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let future = client
        .post_bytes(&server.url("/"), HeaderMap::new(), Vec::new(), DefaultHandler)
        .unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn test_put_bytes_echoed() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let future = client
        .put_bytes(
            &server.url("/"),
            HeaderMap::new(),
            b"put payload".to_vec(),
            DefaultHandler,
        )
        .unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.header("X-Method"), Some("PUT"));
    assert_eq!(response.body(), b"put payload");
}

#[tokio::test]
async fn test_multipart_post() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let future = client
        .multipart_post(
            &server.url("/"),
            vec![Part::text("foo", "bar")],
            DefaultHandler,
        )
        .unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.status(), 200);

    // The server saw a multipart content type with a boundary...
    let content_type = response.header("X-Content-Type").unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let boundary = content_type.split("boundary=").nth(1).unwrap();

    // ...and the body the server received starts with it
    let body = response.body_string();
    assert!(body.starts_with(&format!("--{}", boundary)));
    assert!(body.contains("Content-Disposition: form-data; name=\"foo\""));
    assert!(body.contains("bar"));
}

#[tokio::test]
async fn test_cookie_round_trip() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let request = Request::builder(Method::GET, server.url("/"))
        .cookie(Cookie::new("/", "foo", "value", "/", 3000, false))
        .build()
        .unwrap();

    let future = client.execute(request, DefaultHandler).unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.header("Set-Cookie"), Some("foo=value;Path=/;Domain=/"));

    let cookies = response.cookies();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name, "foo");
    assert_eq!(cookies[0].value, "value");
}

#[tokio::test]
async fn test_head_request_no_body() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let request = Request::builder(Method::HEAD, server.url("/"))
        .build()
        .unwrap();
    let future = client.execute(request, DefaultHandler).unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.status_text(), "OK");
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn test_compression_decodes_gzip_transparently() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::with_config(ClientConfig {
        compression_enabled: true,
        ..ClientConfig::default()
    });

    let future = client.get(&server.url("/gzip"), DefaultHandler).unwrap();
    let response = future.get().await.unwrap();

    // Body is decoded before the handler sees it; headers stay as received
    assert_eq!(response.body(), b"compressed payload");
    assert_eq!(response.header("Content-Encoding"), Some("gzip"));
}

#[tokio::test]
async fn test_compression_advertised_to_server() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::with_config(ClientConfig {
        compression_enabled: true,
        ..ClientConfig::default()
    });

    let future = client.get(&server.url("/"), DefaultHandler).unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.header("X-Accept-Encoding"), Some("gzip"));
}

#[tokio::test]
async fn test_virtual_host_substitutes_host_header() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    // The TCP destination is the fixture server; only the Host header changes
    let request = Request::builder(Method::POST, server.url("/"))
        .virtual_host("virtual.example")
        .build()
        .unwrap();

    let future = client.execute(request, DefaultHandler).unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.header("X-Host"), Some("virtual.example"));
}

#[tokio::test]
async fn test_proxy_changes_destination_keeps_target() {
    // The fixture server plays the proxy: the request must arrive at it
    // with the original target in absolute form
    let proxy_server = EchoServer::spawn().await.unwrap();
    let client = Client::with_config(ClientConfig {
        proxy: Some(ProxyServer::new("127.0.0.1", proxy_server.addr.port())),
        ..ClientConfig::default()
    });

    let future = client
        .get("http://upstream.example/resource", DefaultHandler)
        .unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.header("X-Request-Line"),
        Some("GET http://upstream.example/resource HTTP/1.1")
    );
    assert_eq!(response.header("X-Host"), Some("upstream.example"));
}

#[tokio::test]
async fn test_per_request_proxy_override() {
    let proxy_server = EchoServer::spawn().await.unwrap();
    let client = Client::new();

    let request = Request::builder(Method::GET, "http://upstream.example/")
        .proxy(ProxyServer::new("127.0.0.1", proxy_server.addr.port()))
        .build()
        .unwrap();

    let future = client.execute(request, DefaultHandler).unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.header("X-Request-Line"),
        Some("GET http://upstream.example/ HTTP/1.1")
    );
}

#[tokio::test]
async fn test_default_headers_sent() {
    let server = EchoServer::spawn().await.unwrap();
    let client = Client::with_config(ClientConfig {
        default_headers: vec![("Test9".to_string(), "from-config".to_string())],
        ..ClientConfig::default()
    });

    let future = client.get(&server.url("/"), DefaultHandler).unwrap();
    let response = future.get().await.unwrap();

    assert_eq!(response.header("X-Test9"), Some("from-config"));
}
