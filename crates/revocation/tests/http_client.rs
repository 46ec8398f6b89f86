//! Tests for the HTTP revocation client and the workflow driving it, against
//! mock application servers.

use std::time::Duration;

use chrono::Utc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use signon_accounts::{Application, CreateUser, RevocationContract, SuspendUser, User, UserCommand};
use signon_core::{Aggregate, ApplicationId, UserId};
use signon_revocation::{
    HttpRevocationClient, RevocationClient, RevocationConfig, RevocationOutcome, SuspensionWorkflow,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn application(name: &str, redirect_uri: &str) -> Application {
    Application::new(ApplicationId::new(), name, RevocationContract::new(redirect_uri)).unwrap()
}

fn application_on(server: &MockServer, name: &str) -> Application {
    application(name, &format!("{}/auth/gds/callback", server.uri()))
}

fn reauth_path(user_id: UserId) -> String {
    format!("/auth/gds/api/users/{user_id}/reauth")
}

fn client(timeout: Duration) -> HttpRevocationClient {
    HttpRevocationClient::new(&RevocationConfig::default().with_timeout(timeout)).unwrap()
}

fn suspended_user() -> User {
    let id = UserId::new();
    let mut user = User::empty(id);
    user.execute(&UserCommand::Create(CreateUser {
        user_id: id,
        email: "leaver@example.com".to_string(),
        name: "Leaver".to_string(),
        occurred_at: Utc::now(),
    }))
    .unwrap();
    user.execute(&UserCommand::Suspend(SuspendUser {
        user_id: id,
        reason: "Account compromised".to_string(),
        occurred_at: Utc::now(),
    }))
    .unwrap();
    user
}

fn failure_reason(outcome: RevocationOutcome) -> String {
    match outcome {
        RevocationOutcome::Failure { reason, .. } => reason,
        RevocationOutcome::Success => panic!("expected a failure"),
    }
}

// =============================================================================
// Client Tests
// =============================================================================

#[tokio::test]
async fn ok_response_is_success() {
    let server = MockServer::start().await;
    let user_id = UserId::new();

    Mock::given(method("POST"))
        .and(path(reauth_path(user_id)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(Duration::from_secs(5))
        .revoke(user_id, &application_on(&server, "Publisher"))
        .await;

    assert_eq!(outcome, RevocationOutcome::Success);
}

#[tokio::test]
async fn not_found_is_success() {
    let server = MockServer::start().await;
    let user_id = UserId::new();

    Mock::given(method("POST"))
        .and(path(reauth_path(user_id)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let outcome = client(Duration::from_secs(5))
        .revoke(user_id, &application_on(&server, "Publisher"))
        .await;

    assert!(outcome.is_success());
}

#[tokio::test]
async fn server_error_is_failure_with_status() {
    let server = MockServer::start().await;
    let user_id = UserId::new();
    let app = application_on(&server, "Publisher");

    Mock::given(method("POST"))
        .and(path(reauth_path(user_id)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let outcome = client(Duration::from_secs(5)).revoke(user_id, &app).await;

    match outcome {
        RevocationOutcome::Failure { application, reason } => {
            assert_eq!(application, app.id);
            assert!(reason.contains("500"), "unexpected reason: {reason}");
        }
        RevocationOutcome::Success => panic!("500 must not count as revoked"),
    }
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    let server = MockServer::start().await;
    let user_id = UserId::new();
    let contract = RevocationContract::new(format!("{}/callback", server.uri()))
        .with_bearer_token("app-secret");
    let app = Application::new(ApplicationId::new(), "Publisher", contract).unwrap();

    Mock::given(method("POST"))
        .and(path(reauth_path(user_id)))
        .and(header("authorization", "Bearer app-secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(Duration::from_secs(5)).revoke(user_id, &app).await;

    assert!(outcome.is_success());
}

#[tokio::test]
async fn slow_application_times_out() {
    let server = MockServer::start().await;
    let user_id = UserId::new();

    Mock::given(method("POST"))
        .and(path(reauth_path(user_id)))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let outcome = client(Duration::from_millis(200))
        .revoke(user_id, &application_on(&server, "Sluggish"))
        .await;

    assert_eq!(failure_reason(outcome), "timeout");
}

#[tokio::test]
async fn unreachable_application_is_failure() {
    // Bind then drop to find a port nothing is listening on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let outcome = client(Duration::from_secs(5))
        .revoke(UserId::new(), &application("Gone", &format!("http://127.0.0.1:{port}/callback")))
        .await;

    assert!(failure_reason(outcome).starts_with("request failed"));
}

#[tokio::test]
async fn malformed_contract_is_failure_without_a_request() {
    let outcome = client(Duration::from_secs(5))
        .revoke(UserId::new(), &application("Broken", "definitely not a uri"))
        .await;

    assert!(failure_reason(outcome).contains("invalid redirect uri"));
}

// =============================================================================
// Workflow Tests
// =============================================================================

#[tokio::test]
async fn suspension_reports_each_application_separately() {
    let user = suspended_user();
    let (healthy, broken, slow) = (
        MockServer::start().await,
        MockServer::start().await,
        MockServer::start().await,
    );

    Mock::given(method("POST"))
        .and(path(reauth_path(user.id)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&healthy)
        .await;
    Mock::given(method("POST"))
        .and(path(reauth_path(user.id)))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&broken)
        .await;
    Mock::given(method("POST"))
        .and(path(reauth_path(user.id)))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(1)
        .mount(&slow)
        .await;

    let apps = vec![
        application_on(&slow, "Slow"),
        application_on(&healthy, "Healthy"),
        application_on(&broken, "Broken"),
    ];
    let config = RevocationConfig::default().with_timeout(Duration::from_millis(300));
    let workflow = SuspensionWorkflow::new(HttpRevocationClient::new(&config).unwrap(), config);

    let report = workflow.run_suspension(&user, &apps).await;

    assert_eq!(report.successes(), &[apps[1].clone()]);
    let failures: Vec<(&str, &str)> = report
        .failures()
        .iter()
        .map(|f| (f.application.name.as_str(), f.reason.as_str()))
        .collect();
    assert_eq!(failures[0], ("Slow", "timeout"));
    assert_eq!(failures[1].0, "Broken");
    assert!(failures[1].1.contains("503"));
}
