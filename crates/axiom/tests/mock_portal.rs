//! Mock portal tests for the axiom library.
//!
//! These tests use wiremock to simulate the portal's login pages and report
//! API, exercising negotiation and fetch behavior without network access or
//! real credentials.

use std::sync::Arc;
use std::time::Duration;

use axiom::error::StatusError;
use axiom::{AuthenticatedClient, Credentials, Endpoints, Error, Negotiator, Portal, Step, TokenKind};
use futures_util::future::join_all;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_COOKIE: &str = "_axiom_session=abc123";

/// A page carrying a csrf token, shaped like the portal's served head.
fn token_page(token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8" />
    <title>Axiom</title>
    <meta content="authenticity_token" name="csrf-param" />
    <meta name="csrf-token" content="{token}" />
</head>
<body><div id="app"></div></body>
</html>"#
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn portal(server: &MockServer, endpoints: Endpoints) -> Portal {
    Portal::for_tenant(&server.uri(), "baz", endpoints).unwrap()
}

fn credentials() -> Credentials {
    Credentials::new("alice", "secret123", "baz")
}

/// Serve the login page with a session cookie.
async fn mount_login_page(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/baz/login"))
        .respond_with(
            html(token_page(token)).insert_header("set-cookie", format!("{SESSION_COOKIE}; Path=/")),
        )
        .mount(server)
        .await;
}

/// Accept credentials (only with the login cookie) and serve a fresh token.
async fn mount_submit(server: &MockServer, login_token: &str, fresh_token: &str) {
    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .and(header("cookie", SESSION_COOKIE))
        .and(body_string_contains(format!("authenticity_token={login_token}")))
        .and(body_string_contains("login_name=alice"))
        .and(body_string_contains("password=secret123"))
        .respond_with(html(token_page(fresh_token)))
        .mount(server)
        .await;
}

async fn negotiated_client(server: &MockServer) -> AuthenticatedClient {
    mount_login_page(server, "login-token").await;
    mount_submit(server, "login-token", "fresh-token").await;
    AuthenticatedClient::connect(portal(server, Endpoints::default()), credentials())
        .await
        .unwrap()
}

// ============================================================================
// Negotiation Tests
// ============================================================================

#[tokio::test]
async fn test_negotiate_keeps_fresh_token_not_login_token() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;
    mount_submit(&server, "login-token", "fresh-token").await;

    Mock::given(method("GET"))
        .and(path("/baz/"))
        .respond_with(html(token_page("landing-token")))
        .expect(0)
        .mount(&server)
        .await;

    let negotiator = Negotiator::new(portal(&server, Endpoints::default()));
    let session = negotiator.negotiate(&credentials()).await.unwrap();

    assert_eq!(session.token().as_str(), "fresh-token");
    assert_eq!(session.tenant(), "baz");
}

#[tokio::test]
async fn test_negotiate_shares_one_cookie_jar() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;
    mount_submit(&server, "login-token", "fresh-token").await;

    let portal = portal(&server, Endpoints::default());
    let login_url = portal.login_url().unwrap();
    let session = Negotiator::new(portal).negotiate(&credentials()).await.unwrap();

    let cookies = session.cookie_header(&login_url).unwrap();
    assert!(cookies.contains(SESSION_COOKIE));
}

#[tokio::test]
async fn test_negotiate_submit_failure_reports_step() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;

    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let negotiator = Negotiator::new(portal(&server, Endpoints::default()));
    let err = negotiator.negotiate(&credentials()).await.unwrap_err();

    match err {
        Error::HttpStatus(StatusError {
            step, status, url, ..
        }) => {
            assert_eq!(step, Step::SubmitCredentials);
            assert_eq!(status, 500);
            assert!(url.ends_with("/baz/login"));
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_negotiate_login_page_without_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/baz/login"))
        .respond_with(html("Hello World".to_string()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(html(token_page("never")))
        .expect(0)
        .mount(&server)
        .await;

    let negotiator = Negotiator::new(portal(&server, Endpoints::default()));
    let err = negotiator.negotiate(&credentials()).await.unwrap_err();

    match err {
        Error::LoginPage { source } => match *source {
            Error::TokenNotFound(missing) => assert_eq!(missing.kind, TokenKind::Csrf),
            other => panic!("expected TokenNotFound, got {other:?}"),
        },
        other => panic!("expected LoginPage, got {other:?}"),
    }
}

#[tokio::test]
async fn test_negotiate_login_page_status_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/baz/login"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let negotiator = Negotiator::new(portal(&server, Endpoints::default()));
    let err = negotiator.negotiate(&credentials()).await.unwrap_err();

    assert_eq!(err.step(), Some(Step::LoginPage));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_negotiate_with_confirmation_step() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;

    let account_page = r#"<html><head>
        <meta name="csrf-token" content="mid-token">
    </head><body>
        <form action="/baz/session" method="post">
            <div><input value="acct-7" type="hidden" name="account"></div>
        </form>
    </body></html>"#;

    Mock::given(method("POST"))
        .and(path("/baz/authenticate"))
        .and(header("cookie", SESSION_COOKIE))
        .and(body_string_contains("authenticity_token=login-token"))
        .respond_with(html(account_page.to_string()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/baz/session"))
        .and(header("cookie", SESSION_COOKIE))
        .and(body_string_contains("account=acct-7"))
        .and(body_string_contains("authenticity_token=mid-token"))
        .respond_with(html(token_page("final-token")))
        .expect(1)
        .mount(&server)
        .await;

    let endpoints = Endpoints {
        authenticate: Some("authenticate".to_string()),
        ..Endpoints::default()
    };
    let session = Negotiator::new(portal(&server, endpoints))
        .negotiate(&credentials())
        .await
        .unwrap();

    assert_eq!(session.token().as_str(), "final-token");
}

#[tokio::test]
async fn test_negotiate_falls_back_to_landing_page() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;

    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(html("<html><body>Welcome</body></html>".to_string()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/baz/"))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(html(token_page("home-token")))
        .expect(1)
        .mount(&server)
        .await;

    let session = Negotiator::new(portal(&server, Endpoints::default()))
        .negotiate(&credentials())
        .await
        .unwrap();

    assert_eq!(session.token().as_str(), "home-token");
}

#[tokio::test]
async fn test_negotiate_without_landing_page_requires_token() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;

    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(html("<html><body>Welcome</body></html>".to_string()))
        .mount(&server)
        .await;

    let endpoints = Endpoints {
        landing: None,
        ..Endpoints::default()
    };
    let err = Negotiator::new(portal(&server, endpoints))
        .negotiate(&credentials())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TokenNotFound(_)));
}

#[tokio::test]
async fn test_negotiate_follows_redirect_after_submit() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;

    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/baz/home"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/baz/home"))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(html(token_page("redirected-token")))
        .mount(&server)
        .await;

    let session = Negotiator::new(portal(&server, Endpoints::default()))
        .negotiate(&credentials())
        .await
        .unwrap();

    assert_eq!(session.token().as_str(), "redirected-token");
}

// ============================================================================
// Fetch Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_attaches_token_and_cookies() {
    let server = MockServer::start().await;
    let client = negotiated_client(&server).await;

    Mock::given(method("POST"))
        .and(path("/baz/query/42/result_data.json"))
        .and(header("x-csrf-token", "fresh-token"))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":1}]"#))
        .expect(1)
        .mount(&server)
        .await;

    let body = client.fetch_resource(42).await.unwrap();
    assert_eq!(body, br#"[{"id":1}]"#);
}

#[tokio::test]
async fn test_concurrent_fetches_isolate_auth_failure() {
    let server = MockServer::start().await;
    let client = Arc::new(negotiated_client(&server).await);

    for id in [1u64, 2, 4] {
        Mock::given(method("POST"))
            .and(path(format!("/baz/query/{id}/result_data.json")))
            .and(header("x-csrf-token", "fresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(r#"[{{"id":{id}}}]"#)))
            .mount(&server)
            .await;
    }

    Mock::given(method("POST"))
        .and(path("/baz/query/3/result_data.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let fetches = (1u64..=4).map(|id| {
        let client = client.clone();
        async move { (id, client.fetch_resource(id).await) }
    });
    let results = join_all(fetches).await;

    for (id, result) in results {
        if id == 3 {
            let err = result.unwrap_err();
            assert!(err.is_auth_expired(), "id 3: {err:?}");
        } else {
            let body = result.unwrap();
            assert_eq!(body, format!(r#"[{{"id":{id}}}]"#).into_bytes());
        }
    }
}

#[tokio::test]
async fn test_fetch_redirected_to_login_is_auth_expired() {
    let server = MockServer::start().await;
    let client = negotiated_client(&server).await;

    Mock::given(method("POST"))
        .and(path("/baz/query/9/result_data.json"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/baz/login"))
        .mount(&server)
        .await;

    let err = client.fetch_resource(9).await.unwrap_err();
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_fetch_server_error_is_status_error() {
    let server = MockServer::start().await;
    let client = negotiated_client(&server).await;

    Mock::given(method("POST"))
        .and(path("/baz/query/5/result_data.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.fetch_resource(5).await.unwrap_err();
    assert_eq!(err.step(), Some(Step::FetchResource));
    assert!(!err.is_auth_expired());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_renegotiate_swaps_session() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;

    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(html(token_page("first-token")))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(html(token_page("second-token")))
        .mount(&server)
        .await;

    let client = AuthenticatedClient::connect(portal(&server, Endpoints::default()), credentials())
        .await
        .unwrap();

    let before = client.session().await;
    assert_eq!(before.token().as_str(), "first-token");

    client.renegotiate().await.unwrap();

    assert_eq!(client.session().await.token().as_str(), "second-token");
    // Snapshots taken before the swap are untouched
    assert_eq!(before.token().as_str(), "first-token");
}

#[tokio::test]
async fn test_failed_renegotiation_keeps_current_session() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;

    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(html(token_page("first-token")))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = AuthenticatedClient::connect(portal(&server, Endpoints::default()), credentials())
        .await
        .unwrap();

    assert!(client.renegotiate().await.is_err());
    assert_eq!(client.session().await.token().as_str(), "first-token");
}

#[tokio::test]
async fn test_concurrent_expired_fetches_share_one_login() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;

    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(html(token_page("old-token")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(html(token_page("new-token")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/baz/query/5/result_data.json"))
        .and(header("x-csrf-token", "old-token"))
        .respond_with(ResponseTemplate::new(403).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/baz/query/5/result_data.json"))
        .and(header("x-csrf-token", "new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let client = AuthenticatedClient::connect(portal(&server, Endpoints::default()), credentials())
        .await
        .unwrap();

    let attempts = (0..5).map(|_| async {
        let session = client.session().await;
        let err = session.fetch_resource(5).await.unwrap_err();
        assert!(err.is_auth_expired());
        let negotiated = client.replace_expired(&session).await.unwrap();
        let body = client.fetch_resource(5).await.unwrap();
        (negotiated, body)
    });
    let results = join_all(attempts).await;

    assert_eq!(results.iter().filter(|(negotiated, _)| *negotiated).count(), 1);
    assert!(results.iter().all(|(_, body)| body == b"[]"));
    assert_eq!(client.session().await.token().as_str(), "new-token");

    let logins = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/baz/login")
        .count();
    assert_eq!(logins, 2);
}

#[tokio::test]
async fn test_replace_expired_skips_already_replaced_session() {
    let server = MockServer::start().await;
    mount_login_page(&server, "login-token").await;
    Mock::given(method("POST"))
        .and(path("/baz/login"))
        .respond_with(html(token_page("some-token")))
        .mount(&server)
        .await;

    let client = AuthenticatedClient::connect(portal(&server, Endpoints::default()), credentials())
        .await
        .unwrap();

    let stale = client.session().await;
    client.renegotiate().await.unwrap();
    let current = client.session().await;

    assert!(!client.replace_expired(&stale).await.unwrap());
    assert!(Arc::ptr_eq(&client.session().await, &current));

    assert!(client.replace_expired(&current).await.unwrap());
    assert!(!Arc::ptr_eq(&client.session().await, &current));
}

