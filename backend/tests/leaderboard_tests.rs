// tests/leaderboard_tests.rs

mod common;

use common::*;
use serde_json::{Value, json};

/// Two free-text questions: 2 + 3 points.
fn capitals_quiz() -> Value {
    json!({
        "title": "Capitals",
        "questions": [
            {
                "kind": "free_text",
                "content": "Capital of Italy?",
                "points": 2,
                "options": [{ "label": "Rome", "is_correct": true }]
            },
            {
                "kind": "free_text",
                "content": "Capital of Japan?",
                "points": 3,
                "options": [{ "label": "Tokyo", "is_correct": true }]
            }
        ]
    })
}

fn capitals_answers(quiz: &Value, italy: &str, japan: &str) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(question_id(quiz, 0), json!(italy));
    map.insert(question_id(quiz, 1), json!(japan));
    json!({ "answers": map })
}

async fn get_json(client: &reqwest::Client, url: String, token: Option<&str>) -> Value {
    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.expect("Request failed");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.expect("Failed to parse json")
}

#[tokio::test]
async fn test_leaderboard_and_profile_flow() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // 1. Setup: one creator, two players, two quizzes
    let creator = register_and_login(&client, &address, "creator").await;
    let ada = register_and_login(&client, &address, "ada").await;
    let bo = register_and_login(&client, &address, "bo").await;

    let general_id = create_quiz(&client, &address, &creator, &general_knowledge_quiz()).await;
    let capitals_id = create_quiz(&client, &address, &creator, &capitals_quiz()).await;
    let general = fetch_quiz(&client, &address, general_id).await;
    let capitals = fetch_quiz(&client, &address, capitals_id).await;

    // 2. Ada: 9 + 2, Bo: 4 + 5
    let ada_general = answers(&general, Some("Vrai"), Some(&["Espagne", "Allemagne", "Italie"]), Some("Canberra"));
    let bo_general = answers(&general, Some("Vrai"), Some(&["Espagne", "Allemagne", "Italie"]), Some("Sydney"));
    for (token, quiz_id, body) in [
        (&ada, general_id, ada_general),
        (&bo, general_id, bo_general),
        (&ada, capitals_id, capitals_answers(&capitals, "rome", "Kyoto")),
        (&bo, capitals_id, capitals_answers(&capitals, "Rome", "TOKYO")),
    ] {
        let response = submit(&client, &address, token, quiz_id, &body).await;
        assert_eq!(response.status().as_u16(), 200);
    }

    // The creator's own attempt never reaches the boards.
    let creator_body = capitals_answers(&capitals, "Rome", "Tokyo");
    submit(&client, &address, &creator, capitals_id, &creator_body).await;

    // 3. Global leaderboard: sum over quizzes
    let global = get_json(&client, format!("{}/api/leaderboard", address), None).await;
    assert_eq!(global["type"], "global");
    let entries = global["leaderboard"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["total_score"], 11);
    assert_eq!(entries[0]["quizzes_completed"], 2);
    assert_eq!(entries[1]["rank"], 2);
    assert_eq!(entries[1]["total_score"], 9);

    // 4. Per-quiz leaderboard
    let board = get_json(
        &client,
        format!("{}/api/leaderboard?quiz_id={}", address, capitals_id),
        None,
    )
    .await;
    assert_eq!(board["type"], "quiz");
    assert_eq!(board["quiz_title"], "Capitals");
    let entries = board["leaderboard"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["score"], 5);
    assert_eq!(entries[0]["percentage"], 100);
    assert_eq!(entries[1]["score"], 2);
    assert_eq!(entries[1]["percentage"], 40);

    let unknown = client
        .get(format!("{}/api/leaderboard?quiz_id={}", address, capitals_id + 1000))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 404);

    // 5. Profiles
    let me = get_json(&client, format!("{}/api/profile/me", address), Some(&ada)).await;
    assert_eq!(me["quizzes_completed"], 2);
    assert_eq!(me["quizzes_created"], 0);
    assert_eq!(me["total_score"], 11);

    let creator_me = get_json(&client, format!("{}/api/profile/me", address), Some(&creator)).await;
    assert_eq!(creator_me["quizzes_created"], 2);
    assert_eq!(creator_me["quizzes_completed"], 0);
    assert_eq!(creator_me["total_score"], 0);

    let scores = get_json(&client, format!("{}/api/profile/scores", address), Some(&bo)).await;
    let scores = scores.as_array().unwrap();
    assert_eq!(scores.len(), 2);
    let general_score = scores
        .iter()
        .find(|s| s["quiz_id"] == general_id)
        .expect("General quiz score missing");
    assert_eq!(general_score["total_score"], 4);
    assert_eq!(general_score["max_points"], 9);
    assert_eq!(general_score["percentage"], 44);
}

#[tokio::test]
async fn test_deleting_quiz_removes_its_scores() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let creator = register_and_login(&client, &address, "creator").await;
    let player = register_and_login(&client, &address, "player").await;

    let quiz_id = create_quiz(&client, &address, &creator, &capitals_quiz()).await;
    let quiz = fetch_quiz(&client, &address, quiz_id).await;
    submit(&client, &address, &player, quiz_id, &capitals_answers(&quiz, "Rome", "Tokyo")).await;

    let global = get_json(&client, format!("{}/api/leaderboard", address), None).await;
    assert_eq!(global["leaderboard"][0]["total_score"], 5);

    let deleted = client
        .delete(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&creator)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let global = get_json(&client, format!("{}/api/leaderboard", address), None).await;
    assert!(global["leaderboard"].as_array().unwrap().is_empty());

    let scores = get_json(&client, format!("{}/api/profile/scores", address), Some(&player)).await;
    assert!(scores.as_array().unwrap().is_empty());
}
