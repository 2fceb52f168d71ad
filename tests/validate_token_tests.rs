mod common;

use axum::http::StatusCode;
use common::{T0, TTL_MS, body_json, create_test_app, send, validate_token_request};
use tollgate::introspect::format_timestamp;

#[tokio::test]
async fn test_missing_header() {
    let t = create_test_app().await;

    for header in [None, Some("   ")] {
        let response = send(&t.app, validate_token_request(header)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["isValid"], false);
        assert_eq!(json["message"], "Authorization header is missing");
        assert_eq!(json["errorCode"], "MISSING_HEADER");
        assert!(json["validatedAt"].is_string());
    }
}

#[tokio::test]
async fn test_token_lifetime() {
    let t = create_test_app().await;
    let token = t.enabled_user_token("lea@example.com", "lea", None).await;
    let header = format!("Bearer {}", token);

    t.clock.set(T0 + 1000);
    let response = send(&t.app, validate_token_request(Some(&header))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["isValid"], true);
    assert_eq!(json["message"], "Token is valid");
    assert_eq!(json["remainingTimeMs"], 3_599_000);
    assert_eq!(json["tokenType"], "Bearer");
    assert_eq!(json["issuedAt"], format_timestamp(T0));
    assert_eq!(json["expiresAt"], format_timestamp(T0 + TTL_MS));
    assert_eq!(json["validatedAt"], format_timestamp(T0 + 1000));
    assert_eq!(json["user"]["email"], "lea@example.com");
    assert!(json.get("errorCode").is_none());

    t.clock.set(T0 + 3_600_001);
    let response = send(&t.app, validate_token_request(Some(&header))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["isValid"], false);
    assert_eq!(json["errorCode"], "EXPIRED");
    assert!(json.get("user").is_none());
}

#[tokio::test]
async fn test_raw_token_without_prefix() {
    let t = create_test_app().await;
    let token = t.enabled_user_token("max@example.com", "max", None).await;

    let response = send(&t.app, validate_token_request(Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_disabled_account() {
    let t = create_test_app().await;
    let token = t.enabled_user_token("ned@example.com", "ned", None).await;
    t.db.users().set_enabled("ned@example.com", false).await.unwrap();

    let response = send(
        &t.app,
        validate_token_request(Some(&format!("Bearer {}", token))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["isValid"], false);
    assert_eq!(json["message"], "User account is disabled");
    assert_eq!(json["errorCode"], "USER_DISABLED");
}

#[tokio::test]
async fn test_tampered_token() {
    let t = create_test_app().await;
    let token = t.enabled_user_token("ola@example.com", "ola", None).await;

    let (head, sig) = token.rsplit_once('.').unwrap();
    let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{}.{}{}", head, flipped, &sig[1..]);

    let response = send(
        &t.app,
        validate_token_request(Some(&format!("Bearer {}", tampered))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["errorCode"], "INVALID_SIGNATURE");
}
