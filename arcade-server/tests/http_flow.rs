use std::net::SocketAddr;
use std::sync::Arc;

use arcade_db::ArcadeDb;
use arcade_env::{Config, RunMode};
use arcade_server::checkout::FakeCheckoutProvider;
use arcade_server::mail::RecordingMailSender;
use arcade_server::server::build_router;
use arcade_server::state::AppState;
use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        run_mode: RunMode::Development,
        port: 0,
        database_path: ":memory:".into(),
        cors_allowed_origins: vec!["http://localhost:3000".into()],
        public_base_url: "http://localhost:8080".into(),
        log_filter: "error".into(),
        jwt_access_secret: "test-jwt-access-secret".into(),
        jwt_refresh_secret: "test-jwt-refresh-secret".into(),
        save_session_secret: "test-save-session-secret".into(),
        continue_token_secret: "test-continue-token-secret".into(),
        leaderboard_session_secret: "test-leaderboard-session-secret".into(),
        payment_provider_secret_key: "test-payment-provider-secret".into(),
        payment_webhook_secret: "test-payment-webhook-secret".into(),
        payment_price_id: "price_test".into(),
        mail_sender_api_key: "test-mail-key".into(),
    }
}

fn test_state() -> (AppState, Arc<RecordingMailSender>) {
    let db = ArcadeDb::try_new_mem().unwrap();
    let mail = Arc::new(RecordingMailSender::default());
    let checkout = Arc::new(FakeCheckoutProvider {
        base_url: "http://localhost:8080".into(),
    });
    let state = AppState::new(db, test_config(), mail.clone(), checkout);
    (state, mail)
}

fn json_request(method: Method, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let mut request = builder.body(Body::from(serde_json::to_vec(&body).unwrap())).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 0))));
    request
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register_verify_and_login(state: &AppState, mail: &RecordingMailSender, email: &str) -> String {
    let router = build_router(state.clone());
    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "email": email, "password": "correct horse battery staple", "displayName": "Runner" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, code) = mail.last_code().expect("verification code was sent");
    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/auth/verify-registration",
            None,
            json!({ "email": email, "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["accessToken"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_verify_save_and_continue_round_trip() {
    let (state, mail) = test_state();
    let access_token = register_verify_and_login(&state, &mail, "runner@example.com").await;
    let router = build_router(state.clone());

    let response = router
        .clone()
        .oneshot(json_request(Method::POST, "/api/save/session", Some(&access_token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let session_token = body["token"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/api/save",
            Some(&access_token),
            json!({
                "sessionToken": session_token,
                "saveData": { "x": 1 },
                "wave": 4,
                "gameState": "alive",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(json_request(Method::GET, "/api/save", Some(&access_token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["save"]["wave"], json!(4));

    let response = router
        .clone()
        .oneshot(json_request(Method::POST, "/api/credits/continue", Some(&access_token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let continue_token = body["continueToken"].as_str().unwrap().to_string();
    assert_eq!(body["creditBalance"]["total"], json!(2));

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/credits/redeem",
            Some(&access_token),
            json!({ "continueToken": continue_token }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/credits/redeem",
            Some(&access_token),
            json!({ "continueToken": continue_token }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stale_save_fingerprint_is_rejected_with_conflict() {
    let (state, mail) = test_state();
    let access_token = register_verify_and_login(&state, &mail, "saver@example.com").await;
    let router = build_router(state.clone());

    let response = router
        .clone()
        .oneshot(json_request(Method::POST, "/api/save/session", Some(&access_token), json!({})))
        .await
        .unwrap();
    let session_token = body_json(response).await["token"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/api/save",
            Some(&access_token),
            json!({ "sessionToken": session_token, "saveData": {}, "wave": 1, "gameState": "alive" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/api/save",
            Some(&access_token),
            json!({
                "sessionToken": session_token,
                "saveData": {},
                "wave": 2,
                "gameState": "alive",
                "expectedFingerprint": "not-the-real-fingerprint",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn leaderboard_submission_rejects_tampered_checksum() {
    let (state, mail) = test_state();
    let access_token = register_verify_and_login(&state, &mail, "climber@example.com").await;
    let router = build_router(state.clone());

    let response = router
        .clone()
        .oneshot(json_request(Method::POST, "/api/leaderboard/session", Some(&access_token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let session_token = body["gameSessionToken"].as_str().unwrap().to_string();

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/leaderboard/submit",
            Some(&access_token),
            json!({
                "gameSessionToken": session_token,
                "checksum": "0000000000000000000000000000000000000000000000000000000000000000",
                "difficulty": "normal",
                "score": 1000,
                "wave": 10,
                "kills": 50,
                "maxCombo": 5,
                "level": 3,
                "isVictory": false,
                "gameDurationMs": 60000,
                "startWave": 1,
                "continuesUsed": 0,
                "runDetail": {},
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("checksum mismatch"));
}

#[tokio::test]
async fn repeated_registration_is_rate_limited() {
    let (state, mail) = test_state();
    let router = build_router(state.clone());
    let _ = mail;

    for i in 0..5 {
        let response = router
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({
                    "email": format!("spammer{i}@example.com"),
                    "password": "correct horse battery staple",
                    "displayName": "Spammer",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "email": "onemore@example.com", "password": "correct horse battery staple", "displayName": "x" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn refresh_token_reuse_revokes_the_whole_session_family() {
    let (state, mail) = test_state();
    let router = build_router(state.clone());

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "displayName": "Guest Runner" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let _ = mail;
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let refresh_cookie = cookie.split(';').next().unwrap().to_string();

    let first = router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/refresh")
                .header(header::COOKIE, refresh_cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/refresh")
                .header(header::COOKIE, refresh_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (state, _mail) = test_state();
    let router = build_router(state);
    let response = router
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
