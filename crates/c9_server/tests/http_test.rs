use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use c9_repo::{EntityType, ObjectStore, Reader, RepoConfig, RepoError};
use c9_server::{build_router, AppState, C9Server, ServerConfig};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

struct TestServer {
    router: axum::Router,
    _server: C9Server,
    _temp: TempDir,
}

fn start() -> TestServer {
    let temp = tempdir().expect("tempdir");
    let config = ServerConfig::default()
        .with_data_dir(temp.path())
        .with_sync_on_commit(false);
    let server = C9Server::open(config).expect("server");
    TestServer {
        router: server.router(),
        _server: server,
        _temp: temp,
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    fn header(&self, name: header::HeaderName) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

async fn send(
    server: &TestServer,
    method: Method,
    path: &str,
    headers: &[(header::HeaderName, &str)],
    body: Body,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(name, *value);
    }
    let request = builder.body(body).expect("request");
    let response = server
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    Reply {
        status,
        headers,
        body: body.to_vec(),
    }
}

async fn send_json(server: &TestServer, method: Method, path: &str, body: Value) -> Reply {
    send(
        server,
        method,
        path,
        &[(header::CONTENT_TYPE, "application/json")],
        Body::from(body.to_string()),
    )
    .await
}

async fn get(server: &TestServer, path: &str) -> Reply {
    send(server, Method::GET, path, &[], Body::empty()).await
}

async fn create_alice(server: &TestServer) -> Reply {
    send_json(
        server,
        Method::POST,
        "/user",
        json!({"user_name": "alice", "email": "alice@example.com"}),
    )
    .await
}

#[tokio::test]
async fn user_lifecycle() {
    let server = start();

    let created = create_alice(&server).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.header(header::LOCATION), "/user/alice");
    assert_eq!(created.header(header::CACHE_CONTROL), "no-cache");
    assert_eq!(created.json()["id"], 1);
    let etag = created.header(header::ETAG).to_string();
    assert!(etag.starts_with('"'));

    let by_name = get(&server, "/user/ALICE").await;
    assert_eq!(by_name.status, StatusCode::OK);
    assert_eq!(by_name.header(header::ETAG), etag);
    assert_eq!(by_name.header(header::CACHE_CONTROL), "public, max-age=86400");
    assert_eq!(by_name.json()["email"], "alice@example.com");

    let by_id = get(&server, "/user/1").await;
    assert_eq!(by_id.body, by_name.body);

    let list = get(&server, "/user").await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.json().as_array().map(Vec::len), Some(1));

    let deleted = send(&server, Method::DELETE, "/user/alice", &[], Body::empty()).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = get(&server, "/user/1").await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_name_conflicts_without_consuming_id() {
    let server = start();
    assert_eq!(create_alice(&server).await.status, StatusCode::CREATED);

    let dup = send_json(
        &server,
        Method::POST,
        "/user/",
        json!({"user_name": "Alice", "email": "other@example.com"}),
    )
    .await;
    assert_eq!(dup.status, StatusCode::CONFLICT);

    let deleted = send(&server, Method::DELETE, "/user/alice", &[], Body::empty()).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let again = create_alice(&server).await;
    assert_eq!(again.status, StatusCode::CREATED);
    assert_eq!(again.json()["id"], 2);
}

#[tokio::test]
async fn conditional_put() {
    let server = start();
    let created = create_alice(&server).await;
    let f1 = created.header(header::ETAG).to_string();
    let patch = json!({"display_name": "Alice A."}).to_string();

    let missing = send(
        &server,
        Method::PUT,
        "/user/alice",
        &[(header::CONTENT_TYPE, "application/json")],
        Body::from(patch.clone()),
    )
    .await;
    assert_eq!(missing.status, StatusCode::PRECONDITION_REQUIRED);
    assert_eq!(missing.header(header::ETAG), f1);

    let stale = send(
        &server,
        Method::PUT,
        "/user/alice",
        &[
            (header::CONTENT_TYPE, "application/json"),
            (header::IF_MATCH, "\"0000\""),
        ],
        Body::from(patch.clone()),
    )
    .await;
    assert_eq!(stale.status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(stale.header(header::ETAG), f1);

    let ok = send(
        &server,
        Method::PUT,
        "/user/1",
        &[
            (header::CONTENT_TYPE, "application/json"),
            (header::IF_MATCH, f1.as_str()),
        ],
        Body::from(patch),
    )
    .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_ne!(ok.header(header::ETAG), f1);
    assert_eq!(ok.json()["display_name"], "Alice A.");

    let fetched = get(&server, "/user/alice").await;
    assert_eq!(fetched.header(header::ETAG), ok.header(header::ETAG));
}

#[tokio::test]
async fn put_rejects_rename_before_lookup() {
    let server = start();
    let reply = send_json(
        &server,
        Method::PUT,
        "/user/nobody",
        json!({"user_name": "renamed"}),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send_json(&server, Method::PUT, "/user/nobody", json!({"url": ""})).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_body_errors() {
    let server = start();

    let wrong_type = send(
        &server,
        Method::POST,
        "/user",
        &[(header::CONTENT_TYPE, "text/plain")],
        Body::from("{}"),
    )
    .await;
    assert_eq!(wrong_type.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let bad_json = send(
        &server,
        Method::POST,
        "/group",
        &[(header::CONTENT_TYPE, "application/json")],
        Body::from("{not json"),
    )
    .await;
    assert_eq!(bad_json.status, StatusCode::BAD_REQUEST);

    let invalid = send_json(&server, Method::POST, "/group", json!({"group_name": "9ops"})).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn group_resource() {
    let server = start();

    let created = send_json(
        &server,
        Method::POST,
        "/group",
        json!({"group_name": "ops", "description": "Operators", "users": [1, 2]}),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.header(header::LOCATION), "/group/ops");

    let fetched = get(&server, "/group/OPS").await;
    assert_eq!(fetched.json()["users"], json!([1, 2]));

    let zero_member = send_json(&server, Method::PUT, "/group/ops", json!({"users": [0]})).await;
    assert_eq!(zero_member.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blob_roundtrip() {
    let server = start();

    let created = send(
        &server,
        Method::POST,
        "/blob",
        &[(header::CONTENT_TYPE, "image/png")],
        Body::from(vec![0x89, b'P', b'N', b'G']),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.header(header::LOCATION), "/blob/1");
    assert_eq!(created.json(), json!({"id": 1}));
    let etag = created.header(header::ETAG).to_string();

    let content = get(&server, "/blob/1").await;
    assert_eq!(content.status, StatusCode::OK);
    assert_eq!(content.header(header::CONTENT_TYPE), "application/octet-stream");
    assert_eq!(content.header(header::ETAG), etag);
    assert_eq!(content.body, vec![0x89, b'P', b'N', b'G']);

    let list = get(&server, "/blob/").await;
    assert_eq!(list.json(), json!([{"id": 1}]));
}

#[tokio::test]
async fn blob_media_type_rules() {
    let server = start();

    let none = send(&server, Method::POST, "/blob", &[], Body::from("x")).await;
    assert_eq!(none.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let multipart = send(
        &server,
        Method::POST,
        "/blob",
        &[(header::CONTENT_TYPE, "multipart/form-data; boundary=b")],
        Body::from("x"),
    )
    .await;
    assert_eq!(multipart.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn if_none_match_gives_304() {
    let server = start();
    let created = create_alice(&server).await;
    let etag = created.header(header::ETAG).to_string();

    let cached = send(
        &server,
        Method::GET,
        "/user/alice",
        &[(header::IF_NONE_MATCH, etag.as_str())],
        Body::empty(),
    )
    .await;
    assert_eq!(cached.status, StatusCode::NOT_MODIFIED);
    assert!(cached.body.is_empty());
    assert_eq!(cached.header(header::ETAG), etag);
}

#[tokio::test]
async fn put_with_if_none_match_still_reports_the_write() {
    let server = start();
    let created = create_alice(&server).await;
    let f1 = created.header(header::ETAG).to_string();

    let updated = send(
        &server,
        Method::PUT,
        "/user/alice",
        &[
            (header::CONTENT_TYPE, "application/json"),
            (header::IF_MATCH, f1.as_str()),
            (header::IF_NONE_MATCH, "*"),
        ],
        Body::from(json!({"display_name": "Changed"}).to_string()),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.header(header::CACHE_CONTROL), "no-cache");
    assert_eq!(updated.json()["display_name"], "Changed");
}

#[tokio::test]
async fn field_syntax_is_enforced() {
    let server = start();

    let rejected = [
        json!({"user_name": "alice", "email": "a@example.com", "url": "http://localhost"}),
        json!({"user_name": "alice", "email": "a@example.com", "url": "http://-/"}),
        json!({"user_name": "alice", "email": "a@example.com", "url": "http://a:b@c"}),
        json!({"user_name": "alice", "email": "a@example.com", "display_name": "zero\u{200B}width"}),
        json!({"user_name": "alice", "email": "alice@localhost"}),
    ];
    for body in rejected {
        let reply = send_json(&server, Method::POST, "/user", body.clone()).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{body}");
    }

    let accepted = send_json(
        &server,
        Method::POST,
        "/user",
        json!({
            "user_name": "alice",
            "email": "alice@example.com",
            "url": "http://[::1]:8080/home",
            "display_name": "Alice Ünicode",
        }),
    )
    .await;
    assert_eq!(accepted.status, StatusCode::CREATED);
    // Rejected creates never consumed an id.
    assert_eq!(accepted.json()["id"], 1);

    let group = send_json(
        &server,
        Method::POST,
        "/group",
        json!({"group_name": "ops", "description": "bell\u{7}"}),
    )
    .await;
    assert_eq!(group.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn slow_write_slot_does_not_time_out_a_committed_create() {
    let temp = tempdir().expect("tempdir");
    let store = ObjectStore::open_with_config(
        temp.path(),
        RepoConfig::new().sync_on_commit(false),
    )
    .expect("store");
    let store = Arc::new(store);
    let config = ServerConfig::default()
        .with_data_dir(temp.path())
        .with_request_timeout(Duration::from_secs(1));
    let router = build_router(AppState::new(Arc::clone(&store)), &config);

    // Hold the single write slot for longer than the request timeout.
    let (started, wait_started) = mpsc::channel();
    let holder = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            store
                .update(EntityType::Group, |_| {
                    started.send(()).expect("signal");
                    std::thread::sleep(Duration::from_millis(1500));
                    Ok::<_, RepoError>(())
                })
                .expect("holder update");
        })
    };
    wait_started.recv().expect("holder started");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/blob")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("late"))
        .expect("request");
    let response = router.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    holder.join().expect("holder thread");

    let count = store
        .view(EntityType::Blob, |tx| tx.count())
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn path_and_method_errors() {
    let server = start();

    for path in ["/user/0", "/user/9lives", "/blob/alice", "/nowhere", "/user/a-b"] {
        let reply = get(&server, path).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{path}");
    }

    let wrong = send(&server, Method::DELETE, "/blob/1", &[], Body::empty()).await;
    assert_eq!(wrong.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(wrong.header(header::ALLOW), "HEAD, GET");

    let options = send(&server, Method::OPTIONS, "/user", &[], Body::empty()).await;
    assert_eq!(options.status, StatusCode::OK);
    assert_eq!(options.header(header::ALLOW), "HEAD, GET, POST");
}

#[tokio::test]
async fn head_has_headers_but_no_body() {
    let server = start();
    create_alice(&server).await;

    let head = send(&server, Method::HEAD, "/user/alice", &[], Body::empty()).await;
    assert_eq!(head.status, StatusCode::OK);
    assert!(!head.header(header::ETAG).is_empty());
    assert!(head.body.is_empty());
}
