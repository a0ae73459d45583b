//! End-to-end and security tests against a mock identity provider.

#[cfg(test)]
mod integration_tests {
    use crate::providers::AzureAdapter;
    use crate::{
        AuthorizationResponse, CancellationToken, ErrorKind, FlowState, InMemoryAttemptStore,
        AttemptStore, OAuth2ClientConfig, OAuth2Engine, OAuth2Error, ReqwestTransport,
    };
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};
    use url::Url;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MEGAN: &str = "48d31887-5fad-4d73-a9f5-3c356e68a038";

    async fn setup_mock_azure() -> (MockServer, AzureAdapter, OAuth2ClientConfig) {
        let mock_server = MockServer::start().await;

        let adapter = AzureAdapter::new("common")
            .with_login_base(mock_server.uri())
            .with_graph_base(format!("{}/v1.0", mock_server.uri()));

        let config = OAuth2ClientConfig::new("mock_client_id", "http://localhost:3000/callback")
            .with_scopes(["openid", "offline_access", "User.Read"]);

        (mock_server, adapter, config)
    }

    fn engine() -> OAuth2Engine {
        OAuth2Engine::new(Arc::new(
            ReqwestTransport::new(Duration::from_secs(5)).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_full_azure_flow() {
        let (mock_server, adapter, config) = setup_mock_azure().await;

        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=mock_auth_code"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "mock_access_token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "mock_refresh_token",
                "scope": "openid offline_access User.Read"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1.0/me"))
            .and(header("Authorization", "Bearer mock_access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": MEGAN,
                "displayName": "Megan Bowen",
                "givenName": "Megan",
                "surname": "Bowen",
                "mail": "MeganB@M365x214355.onmicrosoft.com"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let engine = engine();
        let cancel = CancellationToken::new();
        let mut flow = FlowState::Initiated;

        let built = engine.build_login_url(&config, &adapter, true, &[]);
        flow = flow.record(&built);
        let (auth_url, attempt) = built.unwrap();

        let params: HashMap<_, _> = Url::parse(&auth_url)
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect();
        assert!(auth_url.starts_with(&format!("{}/common/oauth2/v2.0/authorize", mock_server.uri())));
        assert_eq!(params["response_mode"], "query");
        assert_eq!(params["nonce"], attempt.nonce);
        assert_eq!(params["scope"], "openid offline_access User.Read");
        assert!(params.contains_key("code_challenge"));

        // The user comes back with a code.
        let callback = AuthorizationResponse {
            code: "mock_auth_code".to_string(),
            state: params["state"].clone(),
            error: None,
            error_description: None,
        };
        flow = flow.advance().unwrap();

        let token = engine
            .handle_callback(attempt, &callback, &config, &adapter, &cancel)
            .await;
        flow = flow.record(&token);
        let token = token.unwrap();
        assert_eq!(token.access_token, "mock_access_token");
        assert!(token.expires_at.is_some());

        let profile = engine.fetch_user_profile(&token, &adapter, &cancel).await;
        flow = flow.record(&profile);
        let profile = profile.unwrap();

        assert_eq!(flow, FlowState::ProfileFetched);
        assert_eq!(profile.id, MEGAN);
        assert_eq!(profile.first_name, "Megan");
        assert_eq!(profile.last_name, "Bowen");
        assert_eq!(
            profile.email.as_deref(),
            Some("MeganB@M365x214355.onmicrosoft.com")
        );
        assert_eq!(profile.provider_name, "Azure");
    }

    #[tokio::test]
    async fn test_state_mismatch_never_reaches_provider() {
        let (mock_server, adapter, config) = setup_mock_azure().await;

        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "should_not_be_issued"
            })))
            .expect(0)
            .mount(&mock_server)
            .await;

        let engine = engine();
        let (_, attempt) = engine.build_login_url(&config, &adapter, true, &[]).unwrap();

        let result = engine
            .exchange_code(
                attempt,
                "invalid_state",
                "test_code",
                &config,
                &adapter,
                &CancellationToken::new(),
            )
            .await;

        let err = assert_err!(result);
        assert_eq!(err.kind(), ErrorKind::StateMismatch);
        assert_eq!(
            FlowState::CodeReceived.fail(err.kind()),
            FlowState::Failed(ErrorKind::StateMismatch)
        );
    }

    #[tokio::test]
    async fn test_attempts_validate_only_against_their_own_state() {
        let (mock_server, adapter, config) = setup_mock_azure().await;

        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token_for_b",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let engine = engine();
        let (_, attempt_a) = engine.build_login_url(&config, &adapter, true, &[]).unwrap();
        let (_, attempt_b) = engine.build_login_url(&config, &adapter, true, &[]).unwrap();
        let state_b = attempt_b.state.clone();

        // A's attempt cannot be completed with B's callback state.
        let crossed = engine
            .exchange_code(attempt_a, &state_b, "code", &config, &adapter, &CancellationToken::new())
            .await;
        assert!(matches!(crossed, Err(OAuth2Error::StateMismatch)));

        let token = engine
            .exchange_code(attempt_b, &state_b, "code", &config, &adapter, &CancellationToken::new())
            .await;
        assert_eq!(assert_ok!(token).access_token, "token_for_b");
    }

    #[tokio::test]
    async fn test_token_exchange_error_cases() {
        let (mock_server, adapter, config) = setup_mock_azure().await;

        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/token"))
            .and(body_string_contains("code=invalid_code"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "The provided authorization code is invalid"
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/token"))
            .and(body_string_contains("code=garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .named("malformed_response")
            .mount(&mock_server)
            .await;

        let engine = engine();
        let cancel = CancellationToken::new();

        let (_, attempt) = engine.build_login_url(&config, &adapter, true, &[]).unwrap();
        let state = attempt.state.clone();
        let result = engine
            .exchange_code(attempt, &state, "invalid_code", &config, &adapter, &cancel)
            .await;
        match result {
            Err(OAuth2Error::Provider { code, description }) => {
                assert_eq!(code, "invalid_grant");
                assert_eq!(
                    description.as_deref(),
                    Some("The provided authorization code is invalid")
                );
            }
            other => panic!("expected provider error, got {other:?}"),
        }

        let (_, attempt) = engine.build_login_url(&config, &adapter, true, &[]).unwrap();
        let state = attempt.state.clone();
        let result = engine
            .exchange_code(attempt, &state, "garbled", &config, &adapter, &cancel)
            .await;
        assert!(matches!(result, Err(OAuth2Error::Parse(_))));
    }

    #[tokio::test]
    async fn test_user_info_missing_optional_fields() {
        let (mock_server, adapter, _config) = setup_mock_azure().await;

        Mock::given(method("GET"))
            .and(path("/v1.0/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": MEGAN,
                "displayName": "Megan Bowen"
            })))
            .mount(&mock_server)
            .await;

        let token = crate::TokenResponse {
            access_token: "at".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            scope: None,
            id_token: None,
            issued_at: chrono::Utc::now(),
            expires_at: None,
        };

        let profile = engine()
            .fetch_user_profile(&token, &adapter, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(profile.id, MEGAN);
        assert_eq!(profile.email, None);
        assert_eq!(profile.first_name, "");
    }

    #[tokio::test]
    async fn test_cancelled_exchange_leaves_no_token() {
        let (mock_server, adapter, config) = setup_mock_azure().await;

        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "late" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let engine = engine();
        let (_, attempt) = engine.build_login_url(&config, &adapter, true, &[]).unwrap();
        let state = attempt.state.clone();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = engine
            .exchange_code(attempt, &state, "code", &config, &adapter, &cancel)
            .await;
        assert!(matches!(result, Err(OAuth2Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_concurrent_login_urls_never_share_secrets() {
        let (_mock_server, adapter, config) = setup_mock_azure().await;
        let engine = engine();
        let adapter = Arc::new(adapter);
        let config = Arc::new(config);

        let mut handles = vec![];
        for _ in 0..32 {
            let engine = engine.clone();
            let adapter = adapter.clone();
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                engine.build_login_url(config.as_ref(), adapter.as_ref(), true, &[])
            }));
        }

        let mut states = HashSet::new();
        let mut verifiers = HashSet::new();
        for handle in handles {
            let (_, attempt) = handle.await.unwrap().unwrap();
            states.insert(attempt.state);
            verifiers.insert(attempt.code_verifier.unwrap());
        }

        assert_eq!(states.len(), 32);
        assert_eq!(verifiers.len(), 32);
    }

    #[tokio::test]
    async fn test_attempt_store_round_trip_with_engine() {
        let (mock_server, adapter, config) = setup_mock_azure().await;

        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "stored_flow_token"
            })))
            .mount(&mock_server)
            .await;

        let engine = engine();
        let store = InMemoryAttemptStore::default();

        let (_, attempt) = engine.build_login_url(&config, &adapter, true, &[]).unwrap();
        let state = attempt.state.clone();
        store.put("session-1", attempt).await.unwrap();

        let attempt = store.take("session-1").await.unwrap();
        let token = engine
            .exchange_code(attempt, &state, "code", &config, &adapter, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(token.access_token, "stored_flow_token");

        // The attempt was consumed; a replayed callback finds nothing.
        assert!(matches!(
            store.take("session-1").await,
            Err(OAuth2Error::StateMismatch)
        ));
    }
}
