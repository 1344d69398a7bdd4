use std::time::{Duration, Instant};
use worktally::error::StoreError;
use worktally::session::{NewSession, SessionPatch, UserId};
use worktally::store::SessionStore;
use worktally::store::client::DocumentStoreClient;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(uri: &str) -> DocumentStoreClient {
    DocumentStoreClient::new("https://unused.invalid", "TEST_KEY", "TEST_TOKEN").with_base_url(uri)
}

#[tokio::test]
async fn test_list_sessions_sorted_newest_first() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/u-1/sessions"))
        .and(header("Authorization", "Bearer TEST_TOKEN"))
        .and(header("X-Api-Key", "TEST_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "old",
                "startTime": "2026-10-12T09:00:00Z",
                "endTime": "2026-10-12T09:30:00Z",
                "durationMinutes": 30,
                "jobName": "Client A"
            },
            {
                "id": "new",
                "startTime": "2026-10-19T09:00:00Z",
                "endTime": null,
                "durationMinutes": null,
                "jobName": "Client B"
            }
        ])))
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let sessions = tokio::task::spawn_blocking(move || client(&uri).list(&UserId::new("u-1")))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, "new");
    assert!(sessions[0].is_open());
    assert_eq!(sessions[1].id, "old");
    assert_eq!(sessions[1].duration_minutes, Some(30));
}

#[tokio::test]
async fn test_create_session_sends_nulls_and_returns_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users/u-1/sessions"))
        .and(body_json(serde_json::json!({
            "startTime": "2026-10-19T09:00:00Z",
            "endTime": null,
            "durationMinutes": null,
            "jobName": "Unspecified Project"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "doc-42" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let id = tokio::task::spawn_blocking(move || {
        let start = "2026-10-19T09:00:00Z".parse().unwrap();
        client(&uri).create(&UserId::new("u-1"), &NewSession::open(start, "   "))
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(id, "doc-42");
}

#[tokio::test]
async fn test_update_session_patches_end_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/users/u-1/sessions/doc-42"))
        .and(body_json(serde_json::json!({
            "endTime": "2026-10-19T10:30:00Z",
            "durationMinutes": 90
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    tokio::task::spawn_blocking(move || {
        let patch = SessionPatch {
            end_time: "2026-10-19T10:30:00Z".parse().unwrap(),
            duration_minutes: 90,
        };
        client(&uri).update(&UserId::new("u-1"), "doc-42", &patch)
    })
    .await
    .unwrap()
    .unwrap();
}

#[tokio::test]
async fn test_remove_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/users/u-1/sessions/doc-42"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    tokio::task::spawn_blocking(move || client(&uri).remove(&UserId::new("u-1"), "doc-42"))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_error_status_is_reported_with_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/users/u-1/sessions/doc-42"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let err = tokio::task::spawn_blocking(move || client(&uri).remove(&UserId::new("u-1"), "doc-42"))
        .await
        .unwrap()
        .unwrap_err();

    assert!(err.is_auth_rejection());
    match err {
        StoreError::Status { status, body } => {
            assert_eq!(status.as_u16(), 403);
            assert_eq!(body, "permission denied");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_malformed_list_is_a_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/u-1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "not": "a list" })))
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let err = tokio::task::spawn_blocking(move || client(&uri).list(&UserId::new("u-1")))
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, StoreError::Decode(_)));
}

#[tokio::test]
async fn test_stalled_list_gives_up_at_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/u-1/sessions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let (err, elapsed) = tokio::task::spawn_blocking(move || {
        let client = client(&uri).with_timeout(Duration::from_millis(300)).unwrap();
        let started = Instant::now();
        let err = client.list(&UserId::new("u-1")).unwrap_err();
        (err, started.elapsed())
    })
    .await
    .unwrap();

    assert!(matches!(err, StoreError::Http(_)));
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
}
