//! HTTP-level behaviour of the GitHub collaborators, against wiremock.

use copilot_relay_auth::{
    poll_for_token, start_device_flow, AuthError, Credential, DeviceFlowConfig,
    GithubTokenExchanger, TokenExchanger,
};
use copilot_relay_core::AccountType;
use secrecy::ExposeSecret;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_exchange_sends_github_token_and_reads_lifetime() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/copilot_internal/v2/token"))
        .and(header("authorization", "token gho_valid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "tid=copilot;exp=1",
            "expires_at": 4102444800u64,
            "refresh_in": 1500
        })))
        .expect(1)
        .mount(&server)
        .await;

    let exchanger = GithubTokenExchanger::with_base_url(reqwest::Client::new(), server.uri());
    let exchanged = exchanger
        .exchange(&Credential::new("gho_valid", AccountType::Individual))
        .await
        .unwrap();

    assert_eq!(exchanged.token.expose_secret(), "tid=copilot;exp=1");
    assert_eq!(exchanged.lifetime, Duration::from_secs(1500));
}

#[tokio::test]
async fn test_exchange_maps_unauthorized_to_invalid_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/copilot_internal/v2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .mount(&server)
        .await;

    let exchanger = GithubTokenExchanger::with_base_url(reqwest::Client::new(), server.uri());
    let err = exchanger
        .exchange(&Credential::new("gho_revoked", AccountType::Individual))
        .await
        .unwrap_err();

    match err {
        AuthError::InvalidCredentials { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Bad credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_exchange_maps_server_errors_to_exchange_failed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/copilot_internal/v2/token"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let exchanger = GithubTokenExchanger::with_base_url(reqwest::Client::new(), server.uri());
    let err = exchanger
        .exchange(&Credential::new("gho", AccountType::Individual))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::ExchangeFailed { status: 502, .. }));
}

#[tokio::test]
async fn test_device_flow_polls_until_token_is_issued() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/device/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "device_code": "dev-123",
            "user_code": "WXYZ-1234",
            "verification_uri": "https://github.com/login/device",
            "expires_in": 900,
            "interval": 0
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .and(body_string_contains("device_code=dev-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "authorization_pending"
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "gho_from_device_flow",
            "token_type": "bearer",
            "scope": "read:user"
        })))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let config = DeviceFlowConfig::with_base_url(&server.uri());

    let device = start_device_flow(&client, &config).await.unwrap();
    assert_eq!(device.user_code, "WXYZ-1234");

    let token = poll_for_token(
        &client,
        &config,
        &device.device_code,
        device.interval,
        device.expires_in,
    )
    .await
    .unwrap();

    assert_eq!(token.expose_secret(), "gho_from_device_flow");
}

#[tokio::test]
async fn test_device_flow_reports_denied_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "access_denied",
            "error_description": "The user has denied your application access."
        })))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let config = DeviceFlowConfig::with_base_url(&server.uri());

    let err = poll_for_token(&client, &config, "dev-123", 0, 60)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::OAuthError(msg) if msg.contains("denied")));
}
