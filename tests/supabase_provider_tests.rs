use quest_portal::{
    SessionProvider, SupabaseSessionProvider,
    error::SessionError,
    models::{AuthEventKind, Role},
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANON_KEY: &str = "test-anon-key";

fn gotrue_user(role: &str, confirmed: bool) -> serde_json::Value {
    let confirmed_at = confirmed.then_some("2026-01-05T10:00:00.123456Z");
    json!({
        "id": "6f1c1f0e-2a55-4d5b-9c55-0c5d2b7f3a10",
        "aud": "authenticated",
        "email": "kid@school.test",
        "email_confirmed_at": confirmed_at,
        "user_metadata": { "role": role, "display_name": "Kid" }
    })
}

async fn mount_user(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", "Bearer good-token"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_no_token_is_anonymous_without_network() {
    let server = MockServer::start().await;
    let provider = SupabaseSessionProvider::new(&server.uri(), ANON_KEY);

    let session = provider.get_session().await.unwrap();

    assert!(session.user.is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sign_in_resolves_user_and_broadcasts() {
    let server = MockServer::start().await;
    mount_user(&server, 200, gotrue_user("parent", true)).await;

    let provider = SupabaseSessionProvider::new(&format!("{}/", server.uri()), ANON_KEY);
    let mut subscription = provider.on_auth_state_change();

    let session = provider
        .sign_in_with_token("good-token".to_string())
        .await
        .unwrap();
    let user = session.user.clone().unwrap();
    assert_eq!(user.role, Role::Parent);
    assert!(user.email_verified);

    let event = subscription.next().await.unwrap();
    assert_eq!(event.kind, AuthEventKind::SignedIn);
    assert_eq!(event.session, Some(session.clone()));

    // The installed token is reused by later checks.
    assert_eq!(provider.get_session().await.unwrap(), session);
}

#[tokio::test]
async fn test_unknown_role_and_unconfirmed_email() {
    let server = MockServer::start().await;
    mount_user(&server, 200, gotrue_user("principal", false)).await;

    let provider = SupabaseSessionProvider::new(&server.uri(), ANON_KEY);
    let session = provider
        .sign_in_with_token("good-token".to_string())
        .await
        .unwrap();

    let user = session.user.unwrap();
    assert_eq!(user.role, Role::Student);
    assert!(!user.email_verified);
}

#[tokio::test]
async fn test_rejected_token_fails_sign_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = SupabaseSessionProvider::new(&server.uri(), ANON_KEY);
    let result = provider.sign_in_with_token("revoked".to_string()).await;

    assert!(matches!(result, Err(SessionError::Status(401))));
    assert!(provider.get_session().await.unwrap().user.is_none());
}

#[tokio::test]
async fn test_expired_token_reads_as_signed_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gotrue_user("student", true)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = SupabaseSessionProvider::new(&server.uri(), ANON_KEY);
    provider
        .sign_in_with_token("good-token".to_string())
        .await
        .unwrap();

    let session = provider.get_session().await.unwrap();
    assert!(session.user.is_none());
}

#[tokio::test]
async fn test_provider_outage_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gotrue_user("admin", true)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = SupabaseSessionProvider::new(&server.uri(), ANON_KEY);
    provider
        .sign_in_with_token("good-token".to_string())
        .await
        .unwrap();

    let result = provider.get_session().await;
    assert!(matches!(result, Err(SessionError::Status(503))));
}

#[tokio::test]
async fn test_sign_out_revokes_and_always_broadcasts() {
    let server = MockServer::start().await;
    mount_user(&server, 200, gotrue_user("student", true)).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer good-token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let provider = SupabaseSessionProvider::new(&server.uri(), ANON_KEY);
    provider
        .sign_in_with_token("good-token".to_string())
        .await
        .unwrap();
    let mut subscription = provider.on_auth_state_change();

    let result = provider.sign_out().await;
    assert!(matches!(result, Err(SessionError::Status(500))));

    let event = subscription.next().await.unwrap();
    assert_eq!(event.kind, AuthEventKind::SignedOut);
    assert!(provider.get_session().await.unwrap().user.is_none());
}
