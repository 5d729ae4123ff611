use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use super::common::*;

async fn setup_admin_and_user(app: &TestApp) -> (String, String, String) {
    let (admin_token, _) = register_user(app, "root", "root@example.com").await;
    promote_to_admin(app, "root@example.com").await;
    let (user_token, user) = register_user(app, "alice", "alice@example.com").await;
    (admin_token, user_token, user["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn admin_endpoints_reject_regular_users() {
    let app = setup_test_app().await;
    let (token, _) = register_user(&app, "alice", "alice@example.com").await;

    let (status, body) = send(&app, empty_request("GET", "/users", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized as an admin");

    let (status, _) = send(&app, empty_request("GET", "/users/dashboard", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_users_includes_restriction_details() {
    let app = setup_test_app().await;
    let (admin_token, _user_token, user_id) = setup_admin_and_user(&app).await;

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}/restrict-ip", user_id),
            Some(&admin_token),
            &json!({ "ip": "10.1.2.3", "reason": "abuse" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, empty_request("GET", "/users", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    let alice = users.iter().find(|u| u["username"] == "alice").unwrap();
    assert_eq!(alice["restricted_ips"][0]["ip"], "10.1.2.3");
    assert_eq!(alice["restricted_ips"][0]["reason"], "abuse");
    assert!(alice.get("password_hash").is_none());
}

#[tokio::test]
async fn suspension_blocks_requests_and_login() {
    let app = setup_test_app().await;
    let (admin_token, user_token, user_id) = setup_admin_and_user(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}/suspend", user_id),
            Some(&admin_token),
            &json!({ "duration": 24, "reason": "spam" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["suspension_ends_at"].is_string());

    // Existing token stops working immediately
    let (status, body) = send(&app, empty_request("GET", "/users/profile", Some(&user_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let msg = body["message"].as_str().unwrap();
    assert!(msg.contains("suspended"), "unexpected message: {}", msg);
    assert!(msg.contains("spam"), "unexpected message: {}", msg);

    // So does logging in again
    let (status, _) = login(&app, "alice@example.com", "password123").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn suspending_an_admin_is_rejected() {
    let app = setup_test_app().await;
    let (admin_token, _) = register_user(&app, "root", "root@example.com").await;
    promote_to_admin(&app, "root@example.com").await;
    let (_, other_admin) = register_user(&app, "root2", "root2@example.com").await;
    promote_to_admin(&app, "root2@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}/suspend", other_admin["id"].as_str().unwrap()),
            Some(&admin_token),
            &json!({ "duration": 24 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Admin users cannot be suspended");
}

#[tokio::test]
async fn missing_or_nonpositive_suspension_duration_is_rejected() {
    let app = setup_test_app().await;
    let (admin_token, _user_token, user_id) = setup_admin_and_user(&app).await;
    let uri = format!("/users/{}/suspend", user_id);

    // No duration at all must not fall back to some default
    let (status, body) = send(
        &app,
        json_request("PUT", &uri, Some(&admin_token), &json!({ "reason": "spam" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide a valid suspension duration in hours");

    let (status, body) =
        send(&app, json_request("PUT", &uri, Some(&admin_token), &json!({ "duration": -5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide a valid suspension duration in hours");

    let (status, _) =
        send(&app, json_request("PUT", &uri, Some(&admin_token), &json!({ "duration": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The user must still be untouched
    let row: (i64,) =
        sqlx::query_as("SELECT is_suspended FROM users WHERE email = 'alice@example.com'")
            .fetch_one(&app.db)
            .await
            .unwrap();
    assert_eq!(row.0, 0);
}

#[tokio::test]
async fn unsuspend_restores_access() {
    let app = setup_test_app().await;
    let (admin_token, user_token, user_id) = setup_admin_and_user(&app).await;

    // Unsuspending someone who is not suspended is an error
    let (status, body) = send(
        &app,
        empty_request("PUT", &format!("/users/{}/unsuspend", user_id), Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User is not suspended");

    send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}/suspend", user_id),
            Some(&admin_token),
            &json!({ "duration": 24 }),
        ),
    )
    .await;
    let (status, _) = send(&app, empty_request("GET", "/users/profile", Some(&user_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        empty_request("PUT", &format!("/users/{}/unsuspend", user_id), Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, empty_request("GET", "/users/profile", Some(&user_token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_suspension_clears_on_login() {
    let app = setup_test_app().await;
    register_user(&app, "alice", "alice@example.com").await;

    let past = (chrono::Utc::now() - chrono::Duration::hours(2)).to_rfc3339();
    sqlx::query(
        "UPDATE users SET is_suspended = 1, suspension_ends_at = ?1, suspension_reason = 'old'
         WHERE email = 'alice@example.com'",
    )
    .bind(&past)
    .execute(&app.db)
    .await
    .unwrap();

    let (status, _) = login(&app, "alice@example.com", "password123").await;
    assert_eq!(status, StatusCode::OK);

    let row: (i64,) =
        sqlx::query_as("SELECT is_suspended FROM users WHERE email = 'alice@example.com'")
            .fetch_one(&app.db)
            .await
            .unwrap();
    assert_eq!(row.0, 0);
}

#[tokio::test]
async fn expired_suspension_clears_on_token_validation() {
    let app = setup_test_app().await;
    let (token, _) = register_user(&app, "alice", "alice@example.com").await;

    let past = (chrono::Utc::now() - chrono::Duration::hours(2)).to_rfc3339();
    sqlx::query(
        "UPDATE users SET is_suspended = 1, suspension_ends_at = ?1, suspension_reason = 'old'
         WHERE email = 'alice@example.com'",
    )
    .bind(&past)
    .execute(&app.db)
    .await
    .unwrap();

    // An ordinary authenticated request, not a login, lifts the expired ban
    let (status, _) = send(&app, empty_request("GET", "/users/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let row: (i64, Option<String>, Option<String>) = sqlx::query_as(
        "SELECT is_suspended, suspension_ends_at, suspension_reason
         FROM users WHERE email = 'alice@example.com'",
    )
    .fetch_one(&app.db)
    .await
    .unwrap();
    assert_eq!(row.0, 0);
    assert!(row.1.is_none());
    assert!(row.2.is_none());
}

#[tokio::test]
async fn restricted_ip_blocks_only_that_address() {
    let app = setup_test_app().await;
    let (admin_token, user_token, user_id) = setup_admin_and_user(&app).await;

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}/restrict-ip", user_id),
            Some(&admin_token),
            &json!({ "ip": "10.1.2.3" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // From the restricted address the user is locked out
    let req = Request::builder()
        .method("GET")
        .uri("/users/profile")
        .header("authorization", format!("Bearer {}", user_token))
        .header("x-forwarded-for", "10.1.2.3")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Access from your current location is restricted. Please contact support."
    );

    // From anywhere else they are fine
    let (status, _) = send(&app, empty_request("GET", "/users/profile", Some(&user_token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn restrict_ip_validations() {
    let app = setup_test_app().await;
    let (admin_token, _user_token, user_id) = setup_admin_and_user(&app).await;
    let uri = format!("/users/{}/restrict-ip", user_id);

    let (status, body) = send(
        &app,
        json_request("PUT", &uri, Some(&admin_token), &json!({ "ip": "not-an-ip" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid IP address");

    let (status, _) =
        send(&app, json_request("PUT", &uri, Some(&admin_token), &json!({ "ip": "10.0.0.9" }))).await;
    assert_eq!(status, StatusCode::OK);

    // When no reason is given the stored default is used
    let row: (String,) =
        sqlx::query_as("SELECT reason FROM restricted_ips WHERE ip = '10.0.0.9'")
            .fetch_one(&app.db)
            .await
            .unwrap();
    assert_eq!(row.0, "Suspicious activity");

    let (status, body) =
        send(&app, json_request("PUT", &uri, Some(&admin_token), &json!({ "ip": "10.0.0.9" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "IP address is already restricted for this user");
}

#[tokio::test]
async fn unrestrict_ip_flows() {
    let app = setup_test_app().await;
    let (admin_token, _user_token, user_id) = setup_admin_and_user(&app).await;
    let restrict_uri = format!("/users/{}/restrict-ip", user_id);
    let unrestrict_uri = format!("/users/{}/unrestrict-ip", user_id);

    let (status, body) = send(
        &app,
        json_request("PUT", &unrestrict_uri, Some(&admin_token), &json!({ "ip": "10.0.0.9" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User has no restricted IP addresses");

    send(&app, json_request("PUT", &restrict_uri, Some(&admin_token), &json!({ "ip": "10.0.0.9" })))
        .await;

    let (status, body) = send(
        &app,
        json_request("PUT", &unrestrict_uri, Some(&admin_token), &json!({ "ip": "10.0.0.8" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "IP address is not restricted for this user");

    let (status, _) = send(
        &app,
        json_request("PUT", &unrestrict_uri, Some(&admin_token), &json!({ "ip": "10.0.0.9" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admins_bypass_suspension_and_restriction() {
    let app = setup_test_app().await;
    let (admin_token, _) = register_user(&app, "root", "root@example.com").await;
    promote_to_admin(&app, "root@example.com").await;

    // Force impossible state directly in storage; the gate must still let an
    // admin through.
    let future = (chrono::Utc::now() + chrono::Duration::hours(24)).to_rfc3339();
    sqlx::query("UPDATE users SET is_suspended = 1, suspension_ends_at = ?1 WHERE email = 'root@example.com'")
        .bind(&future)
        .execute(&app.db)
        .await
        .unwrap();

    let (status, _) = send(&app, empty_request("GET", "/users", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_cannot_delete_their_own_account_here() {
    let app = setup_test_app().await;
    let (admin_token, admin) = register_user(&app, "root", "root@example.com").await;
    promote_to_admin(&app, "root@example.com").await;

    let (status, body) = send(
        &app,
        empty_request(
            "DELETE",
            &format!("/users/{}", admin["id"].as_str().unwrap()),
            Some(&admin_token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Admin cannot delete their own account through this endpoint");
}

#[tokio::test]
async fn admin_delete_cascades_through_content() {
    let app = setup_test_app().await;
    let (admin_token, user_token, user_id) = setup_admin_and_user(&app).await;
    let qid = create_question(&app, &user_token, "Q").await;
    let aid = create_answer(&app, &user_token, &qid, "self answer").await;

    let (status, _) = send(
        &app,
        empty_request("DELETE", &format!("/users/{}", user_id), Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, empty_request("GET", &format!("/questions/{}", qid), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, empty_request("GET", &format!("/answers/{}", aid), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_an_unknown_user_is_not_found() {
    let app = setup_test_app().await;
    let (admin_token, _) = register_user(&app, "root", "root@example.com").await;
    promote_to_admin(&app, "root@example.com").await;

    let (status, _) = send(
        &app,
        empty_request("DELETE", "/users/not-a-uuid", Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_reports_counts() {
    let app = setup_test_app().await;
    let (admin_token, user_token, _) = setup_admin_and_user(&app).await;
    register_user(&app, "bob", "bob@example.com").await;
    let qid = create_question(&app, &user_token, "Q").await;
    create_answer(&app, &user_token, &qid, "A").await;

    let (status, body) = send(&app, empty_request("GET", "/users/dashboard", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_users"], 3);
    assert_eq!(body["admin_users"], 1);
    assert_eq!(body["regular_users"], 2);
    assert_eq!(body["suspended_users"], 0);
    assert_eq!(body["total_questions"], 1);
    assert_eq!(body["total_answers"], 1);
    assert_eq!(body["recent_users"].as_array().unwrap().len(), 3);
}
