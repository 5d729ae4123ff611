use axum::http::StatusCode;
use serde_json::json;

use super::common::*;

#[tokio::test]
async fn answering_a_missing_question_is_not_found() {
    let app = setup_test_app().await;
    let (token, _) = register_user(&app, "alice", "alice@example.com").await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/questions/00000000-0000-0000-0000-000000000000/answers",
            Some(&token),
            &json!({ "body": "into the void" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_and_list_answers() {
    let app = setup_test_app().await;
    let (owner_token, _) = register_user(&app, "alice", "alice@example.com").await;
    let (bob_token, bob) = register_user(&app, "bob", "bob@example.com").await;
    let qid = create_question(&app, &owner_token, "Any takers?").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/questions/{}/answers", qid),
            Some(&bob_token),
            &json!({ "body": "Here is how." }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "bob");
    assert_eq!(body["user_id"], bob["id"]);
    assert_eq!(body["is_accepted"], false);
    assert_eq!(body["score"], 0);

    // Listing is public
    let (status, body) =
        send(&app, empty_request("GET", &format!("/questions/{}/answers", qid), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // And the question detail embeds them with an updated answer count
    let (_, detail) = send(&app, empty_request("GET", &format!("/questions/{}", qid), None)).await;
    assert_eq!(detail["answer_count"], 1);
    assert_eq!(detail["answers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn only_owner_or_admin_may_edit_answers() {
    let app = setup_test_app().await;
    let (alice_token, _) = register_user(&app, "alice", "alice@example.com").await;
    let (bob_token, _) = register_user(&app, "bob", "bob@example.com").await;
    let qid = create_question(&app, &alice_token, "Q").await;
    let aid = create_answer(&app, &bob_token, &qid, "original").await;

    // The question owner is not the answer owner
    let (status, body) = send(
        &app,
        json_request("PUT", &format!("/answers/{}", aid), Some(&alice_token), &json!({ "body": "edited" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "User not authorized");

    let (status, body) = send(
        &app,
        json_request("PUT", &format!("/answers/{}", aid), Some(&bob_token), &json!({ "body": "edited" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["body"], "edited");
}

#[tokio::test]
async fn deleting_an_answer() {
    let app = setup_test_app().await;
    let (alice_token, _) = register_user(&app, "alice", "alice@example.com").await;
    let (bob_token, _) = register_user(&app, "bob", "bob@example.com").await;
    let qid = create_question(&app, &alice_token, "Q").await;
    let aid = create_answer(&app, &bob_token, &qid, "going away").await;

    let (status, body) =
        send(&app, empty_request("DELETE", &format!("/answers/{}", aid), Some(&bob_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Answer removed");

    let (status, _) = send(&app, empty_request("GET", &format!("/answers/{}", aid), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_question_owner_accepts() {
    let app = setup_test_app().await;
    let (alice_token, _) = register_user(&app, "alice", "alice@example.com").await;
    let (bob_token, _) = register_user(&app, "bob", "bob@example.com").await;
    let qid = create_question(&app, &alice_token, "Q").await;
    let aid = create_answer(&app, &bob_token, &qid, "pick me").await;

    // The answer's own author cannot accept it
    let (status, body) =
        send(&app, empty_request("PUT", &format!("/answers/{}/accept", aid), Some(&bob_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Only question owner can accept answers");

    let (status, body) =
        send(&app, empty_request("PUT", &format!("/answers/{}/accept", aid), Some(&alice_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_accepted"], true);
}

#[tokio::test]
async fn accepting_is_exclusive_per_question() {
    let app = setup_test_app().await;
    let (alice_token, _) = register_user(&app, "alice", "alice@example.com").await;
    let (bob_token, _) = register_user(&app, "bob", "bob@example.com").await;
    let qid = create_question(&app, &alice_token, "Q").await;
    let a1 = create_answer(&app, &bob_token, &qid, "first").await;
    let a2 = create_answer(&app, &bob_token, &qid, "second").await;

    let (_, body) =
        send(&app, empty_request("PUT", &format!("/answers/{}/accept", a1), Some(&alice_token))).await;
    assert_eq!(body["is_accepted"], true);

    // Accepting the second clears the first
    let (_, body) =
        send(&app, empty_request("PUT", &format!("/answers/{}/accept", a2), Some(&alice_token))).await;
    assert_eq!(body["is_accepted"], true);

    let (_, first) = send(&app, empty_request("GET", &format!("/answers/{}", a1), None)).await;
    assert_eq!(first["is_accepted"], false);
    let (_, second) = send(&app, empty_request("GET", &format!("/answers/{}", a2), None)).await;
    assert_eq!(second["is_accepted"], true);

    // The accepted answer sorts first in the detail view
    let (_, detail) = send(&app, empty_request("GET", &format!("/questions/{}", qid), None)).await;
    assert_eq!(detail["answers"][0]["is_accepted"], true);
}

#[tokio::test]
async fn accepting_twice_toggles_off() {
    let app = setup_test_app().await;
    let (alice_token, _) = register_user(&app, "alice", "alice@example.com").await;
    let (bob_token, _) = register_user(&app, "bob", "bob@example.com").await;
    let qid = create_question(&app, &alice_token, "Q").await;
    let aid = create_answer(&app, &bob_token, &qid, "toggle me").await;

    let uri = format!("/answers/{}/accept", aid);
    let (_, body) = send(&app, empty_request("PUT", &uri, Some(&alice_token))).await;
    assert_eq!(body["is_accepted"], true);
    let (_, body) = send(&app, empty_request("PUT", &uri, Some(&alice_token))).await;
    assert_eq!(body["is_accepted"], false);

    let (_, answer) = send(&app, empty_request("GET", &format!("/answers/{}", aid), None)).await;
    assert_eq!(answer["is_accepted"], false);
}

#[tokio::test]
async fn answer_votes_toggle_like_question_votes() {
    let app = setup_test_app().await;
    let (alice_token, _) = register_user(&app, "alice", "alice@example.com").await;
    let (bob_token, _) = register_user(&app, "bob", "bob@example.com").await;
    let qid = create_question(&app, &alice_token, "Q").await;
    let aid = create_answer(&app, &bob_token, &qid, "vote on me").await;

    let uri = format!("/answers/{}/vote", aid);
    let (status, body) =
        send(&app, json_request("PUT", &uri, Some(&alice_token), &json!({ "vote_type": "downvote" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["downvotes"], 1);
    assert_eq!(body["score"], -1);

    let (_, body) =
        send(&app, json_request("PUT", &uri, Some(&alice_token), &json!({ "vote_type": "downvote" }))).await;
    assert_eq!(body["downvotes"], 0);
    assert_eq!(body["score"], 0);
}
