use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use notification_cell::notification_routes;
use shared_models::notification::NotificationKind;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_inbox_lists_and_marks_notifications() {
    let config = TestConfig::default();
    let client = TestUser::client("cliente");
    let other = TestUser::client("otro");
    let state = config.state_with_users(&[&client, &other]);

    let id = state
        .db
        .transaction(|data| -> Result<i64, shared_database::StoreError> {
            data.notify(
                client.id,
                "New appointment scheduled",
                NotificationKind::Info,
                Utc::now().with_timezone(&config.reference_offset),
            )
        })
        .await
        .unwrap();

    let token = JwtTestUtils::create_test_token(&client, &config.jwt_secret, None);
    let response = notification_routes(state.clone())
        .oneshot(
            Request::get("/notifications")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let inbox = body_json(response).await;
    assert_eq!(inbox[0]["id"], id);
    assert_eq!(inbox[0]["type"], "info");
    assert_eq!(inbox[0]["is_read"], false);

    let intruder = JwtTestUtils::create_test_token(&other, &config.jwt_secret, None);
    let response = notification_routes(state.clone())
        .oneshot(
            Request::post(format!("/notifications/{}/read", id))
                .header("Authorization", format!("Bearer {}", intruder))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = notification_routes(state.clone())
        .oneshot(
            Request::post(format!("/notifications/{}/read", id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["notification"]["is_read"], true);

    let response = notification_routes(state)
        .oneshot(
            Request::post("/notifications/999/read")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
