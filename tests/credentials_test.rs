use httpmock::prelude::*;
use httpmock::Method::PATCH;
use reqwest::Client;
use serde_json::json;
use trunk_sync::domain::ports::{CredentialProvider, PbxApi};
use trunk_sync::{PasswordLogin, Reconciler, SyncError, TrunkId, XapiClient};

fn login(server: &MockServer) -> PasswordLogin {
    PasswordLogin::new(
        &server.base_url(),
        "admin".to_string(),
        "s3cret".to_string(),
        Client::new(),
    )
}

#[tokio::test]
async fn test_login_token_is_fetched_once_and_reused() {
    let server = MockServer::start();

    let login_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/webclient/api/Login/GetAccessToken")
            .json_body(json!({"Username": "admin", "Password": "s3cret", "SecurityCode": ""}));
        then.status(200).json_body(json!({
            "Status": "AuthSuccess",
            "Token": {"access_token": "login-token-1", "token_type": "Bearer", "expires_in": 60}
        }));
    });

    let credentials = login(&server);
    assert_eq!(credentials.bearer_token().await.unwrap(), "login-token-1");
    assert_eq!(credentials.bearer_token().await.unwrap(), "login-token-1");

    login_mock.assert_hits(1);
}

#[tokio::test]
async fn test_login_failure_reports_server_message() {
    let server = MockServer::start();

    let _login = server.mock(|when, then| {
        when.method(POST).path("/webclient/api/Login/GetAccessToken");
        then.status(200).json_body(json!({
            "Status": "AuthFailed",
            "Message": "Invalid credentials"
        }));
    });

    let err = login(&server).bearer_token().await.unwrap_err();
    match err {
        SyncError::AuthenticationError { message } => assert_eq!(message, "Invalid credentials"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_login_failure_without_message() {
    let server = MockServer::start();

    let _login = server.mock(|when, then| {
        when.method(POST).path("/webclient/api/Login/GetAccessToken");
        then.status(200).json_body(json!({"Status": "AuthFailed"}));
    });

    let err = login(&server).bearer_token().await.unwrap_err();
    assert_eq!(err.to_string(), "Authentication failed: Login failed");
}

#[tokio::test]
async fn test_reconciler_sends_login_token() {
    let server = MockServer::start();

    let login_mock = server.mock(|when, then| {
        when.method(POST).path("/webclient/api/Login/GetAccessToken");
        then.status(200).json_body(json!({
            "Status": "AuthSuccess",
            "Token": {"access_token": "login-token-2"}
        }));
    });

    let reads = server.mock(|when, then| {
        when.method(GET)
            .path_matches(regex::Regex::new(r"^/xapi/v1/Trunks\([12]\)$").unwrap())
            .header("authorization", "Bearer login-token-2");
        then.status(200).json_body(json!({"DidNumbers": ["100"]}));
    });
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/xapi/v1/Trunks(2)")
            .header("authorization", "Bearer login-token-2");
        then.status(204);
    });
    let bindings = server.mock(|when, then| {
        when.method(GET)
            .path("/xapi/v1/DidNumbers")
            .header("authorization", "Bearer login-token-2");
        then.status(200).json_body(json!({"value": []}));
    });

    let api = XapiClient::with_client(&server.base_url(), Client::new());
    let reconciler = Reconciler::new(api, login(&server));
    reconciler.run(TrunkId(1), TrunkId(2)).await.unwrap();

    login_mock.assert_hits(1);
    reads.assert_hits(2);
    patch.assert();
    bindings.assert();
}

#[tokio::test]
async fn test_list_trunks_with_display_names() {
    let server = MockServer::start();

    let trunks_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/xapi/v1/Trunks")
            .query_param("$select", "Id,Gateway")
            .header("authorization", "Bearer list-token");
        then.status(200).json_body(json!({
            "value": [
                {"Id": 1, "Gateway": {"Name": "Primary SIP"}},
                {"Id": 2, "Gateway": {"Name": ""}},
                {"Id": 3}
            ]
        }));
    });

    let api = XapiClient::with_client(&server.base_url(), Client::new());
    let trunks = api.list_trunks("list-token").await.unwrap();

    trunks_mock.assert();
    let names: Vec<(TrunkId, String)> = trunks
        .iter()
        .map(|t| (t.id, t.display_name()))
        .collect();
    assert_eq!(
        names,
        vec![
            (TrunkId(1), "Primary SIP".to_string()),
            (TrunkId(2), "Trunk 2".to_string()),
            (TrunkId(3), "Trunk 3".to_string()),
        ]
    );
}
