use std::io::Read;
use std::path::PathBuf;

use flate2::read::GzDecoder;
use wirehttp::http::request::{Method, Request, RequestBuilder};
use wirehttp::http::response::StatusCode;
use wirehttp::routing::{Handler, ROUTES, Router, match_route};
use wirehttp::storage::{DiskStore, TMP_DIR};

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wirehttp-router-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn router(tag: &str) -> Router<DiskStore> {
    Router::new(DiskStore::new(scratch_dir(tag)))
}

fn get(path: &str) -> Request {
    RequestBuilder::new().method(Method::GET).path(path).build().unwrap()
}

#[test]
fn test_route_table_order() {
    let handlers: Vec<Handler> = ROUTES.iter().map(|r| r.handler).collect();
    assert_eq!(
        handlers,
        vec![
            Handler::Root,
            Handler::UserAgent,
            Handler::Echo,
            Handler::ReadFile,
            Handler::WriteFile,
        ]
    );
}

#[test]
fn test_match_route_exact_and_prefix() {
    let (route, rest) = match_route(ROUTES, &Method::GET, "/").unwrap();
    assert_eq!(route.handler, Handler::Root);
    assert_eq!(rest, "");

    let (route, rest) = match_route(ROUTES, &Method::GET, "/echo/hi/there").unwrap();
    assert_eq!(route.handler, Handler::Echo);
    assert_eq!(rest, "hi/there");

    assert!(match_route(ROUTES, &Method::GET, "/echo").is_none());
    assert!(match_route(ROUTES, &Method::GET, "/user-agent/x").is_none());
}

#[test]
fn test_match_route_by_method() {
    let (route, _) = match_route(ROUTES, &Method::GET, "/files/a").unwrap();
    assert_eq!(route.handler, Handler::ReadFile);

    let (route, _) = match_route(ROUTES, &Method::POST, "/files/a").unwrap();
    assert_eq!(route.handler, Handler::WriteFile);

    assert!(match_route(ROUTES, &Method::DELETE, "/files/a").is_none());

    let (route, _) = match_route(ROUTES, &Method::HEAD, "/files/a").unwrap();
    assert_eq!(route.handler, Handler::ReadFile);
}

#[tokio::test]
async fn test_root() {
    let response = router("root").dispatch(&get("/")).await;

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.content_type, "text/plain");
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_user_agent() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/user-agent")
        .header("User-Agent", "test-agent/1.0")
        .build()
        .unwrap();

    let response = router("ua").dispatch(&req).await;
    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"test-agent/1.0".to_vec());
}

#[tokio::test]
async fn test_user_agent_missing_header() {
    let response = router("ua-missing").dispatch(&get("/user-agent")).await;

    assert_eq!(response.status, StatusCode::Ok);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_echo_plain() {
    let response = router("echo").dispatch(&get("/echo/abc")).await;

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"abc".to_vec());
    assert_eq!(response.header("Content-Encoding"), None);
}

#[tokio::test]
async fn test_echo_empty_value() {
    let response = router("echo-empty").dispatch(&get("/echo/")).await;

    assert_eq!(response.status, StatusCode::Ok);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_echo_gzip() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/echo/abc")
        .header("Accept-Encoding", "encoding-1, gzip, encoding-2")
        .build()
        .unwrap();

    let response = router("echo-gzip").dispatch(&req).await;
    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.header("Content-Encoding"), Some("gzip"));

    let mut out = String::new();
    GzDecoder::new(&response.body[..])
        .read_to_string(&mut out)
        .unwrap();
    assert_eq!(out, "abc");
}

#[tokio::test]
async fn test_echo_unknown_encoding() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/echo/abc")
        .header("Accept-Encoding", "unknown-coding")
        .build()
        .unwrap();

    let response = router("echo-unknown").dispatch(&req).await;
    assert_eq!(response.body, b"abc".to_vec());
    assert_eq!(response.header("Content-Encoding"), None);
}

#[tokio::test]
async fn test_post_then_get_file() {
    let router = router("files");
    let post = RequestBuilder::new()
        .method(Method::POST)
        .path("/files/foo.txt")
        .body(b"hello".to_vec())
        .build()
        .unwrap();

    let created = router.dispatch(&post).await;
    assert_eq!(created.status, StatusCode::Created);
    assert!(created.body.is_empty());

    let fetched = router.dispatch(&get("/files/foo.txt")).await;
    assert_eq!(fetched.status, StatusCode::Ok);
    assert_eq!(fetched.content_type, "application/octet-stream");
    assert_eq!(fetched.body, b"hello".to_vec());
}

#[tokio::test]
async fn test_post_overwrites_existing_file() {
    let router = router("files-overwrite");
    for body in [&b"first"[..], &b"second"[..]] {
        let post = RequestBuilder::new()
            .method(Method::POST)
            .path("/files/same")
            .body(body.to_vec())
            .build()
            .unwrap();
        assert_eq!(router.dispatch(&post).await.status, StatusCode::Created);
    }

    let fetched = router.dispatch(&get("/files/same")).await;
    assert_eq!(fetched.body, b"second".to_vec());
}

#[tokio::test]
async fn test_get_missing_file() {
    let response = router("files-missing").dispatch(&get("/files/does-not-exist")).await;

    assert_eq!(response.status, StatusCode::NotFound);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_get_traversal_is_not_found() {
    let response = router("files-traversal").dispatch(&get("/files/../secret")).await;
    assert_eq!(response.status, StatusCode::NotFound);
}

#[tokio::test]
async fn test_post_traversal_is_bad_request() {
    let root = scratch_dir("files-post-traversal");
    let router = Router::new(DiskStore::new(root.join("inner")));
    let post = RequestBuilder::new()
        .method(Method::POST)
        .path("/files/../escaped")
        .body(b"x".to_vec())
        .build()
        .unwrap();

    let response = router.dispatch(&post).await;
    assert_eq!(response.status, StatusCode::BadRequest);
    assert!(!root.join("escaped").exists());
}

#[tokio::test]
async fn test_post_write_failure_is_server_error() {
    let root = scratch_dir("files-fail");
    std::fs::write(root.join("blocker"), b"file").unwrap();
    let router = Router::new(DiskStore::new(&root));
    let post = RequestBuilder::new()
        .method(Method::POST)
        .path("/files/blocker/child")
        .body(b"x".to_vec())
        .build()
        .unwrap();

    let response = router.dispatch(&post).await;
    assert_eq!(response.status, StatusCode::InternalServerError);
}

#[tokio::test]
async fn test_unknown_path() {
    let response = router("unknown").dispatch(&get("/unknown/path")).await;

    assert_eq!(response.status, StatusCode::NotFound);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_unsupported_method_on_files() {
    let req = RequestBuilder::new()
        .method(Method::PUT)
        .path("/files/foo")
        .build()
        .unwrap();

    let response = router("files-put").dispatch(&req).await;
    assert_eq!(response.status, StatusCode::NotFound);
}

fn request(method: Method, path: &str) -> Request {
    RequestBuilder::new().method(method).path(path).build().unwrap()
}

#[tokio::test]
async fn test_extension_method_routes() {
    let router = router("extension");
    let foo = || Method::Extension("FOO".to_string());

    let echoed = router.dispatch(&request(foo(), "/echo/abc")).await;
    assert_eq!(echoed.status, StatusCode::Ok);
    assert_eq!(echoed.body, b"abc".to_vec());

    let unknown = router.dispatch(&request(foo(), "/unknown")).await;
    assert_eq!(unknown.status, StatusCode::NotFound);

    let files = router.dispatch(&request(foo(), "/files/a")).await;
    assert_eq!(files.status, StatusCode::NotFound);
}

#[tokio::test]
async fn test_staged_upload_not_readable() {
    let root = scratch_dir("staged");
    std::fs::create_dir_all(root.join(TMP_DIR)).unwrap();
    std::fs::write(root.join(TMP_DIR).join("7.0.tmp"), b"partial").unwrap();
    let router = Router::new(DiskStore::new(&root));

    let response = router
        .dispatch(&get(&format!("/files/{TMP_DIR}/7.0.tmp")))
        .await;
    assert_eq!(response.status, StatusCode::NotFound);
    assert!(response.body.is_empty());
}
