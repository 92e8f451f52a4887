// tests/common/mod.rs

#![allow(dead_code)]

use backend::{config::Config, models::score::RepeatAttemptPolicy, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;

/// Spawns the app on a random port with a fresh in-memory database.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
pub async fn spawn_app() -> String {
    spawn_app_with(RepeatAttemptPolicy::KeepFirst, true).await
}

pub async fn spawn_app_with(repeat_policy: RepeatAttemptPolicy, reveal_answers: bool) -> String {
    // A single connection that never expires keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        server_port: 0,
        repeat_policy,
        reveal_answers,
        seed_demo_data: false,
    };

    let app = routes::create_router(AppState { pool, config });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// Registers and logs in a fresh user. Returns the bearer token.
pub async fn register_and_login(client: &reqwest::Client, address: &str, prefix: &str) -> String {
    let username = unique_name(prefix);
    let password = "password123";

    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": password
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(resp.status().as_u16(), 201);

    let login: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    login["token"].as_str().expect("Token not found").to_string()
}

/// One question of each kind: 1 + 3 + 5 points.
pub fn general_knowledge_quiz() -> Value {
    json!({
        "title": "Quiz de Culture Générale",
        "description": "Testez vos connaissances générales !",
        "questions": [
            {
                "kind": "binary_choice",
                "content": "La Tour Eiffel mesure 330 mètres de hauteur.",
                "points": 1,
                "options": [
                    { "label": "Vrai", "is_correct": true },
                    { "label": "Faux", "is_correct": false }
                ]
            },
            {
                "kind": "multi_select",
                "content": "Quels sont les pays frontaliers de la France ?",
                "points": 3,
                "options": [
                    { "label": "Espagne", "is_correct": true },
                    { "label": "Allemagne", "is_correct": true },
                    { "label": "Pologne", "is_correct": false },
                    { "label": "Italie", "is_correct": true }
                ]
            },
            {
                "kind": "free_text",
                "content": "Quelle est la capitale de l'Australie ?",
                "points": 5,
                "options": [
                    { "label": "Canberra", "is_correct": true }
                ]
            }
        ]
    })
}

pub async fn create_quiz(client: &reqwest::Client, address: &str, token: &str, body: &Value) -> i64 {
    let resp = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .expect("Create quiz failed");
    assert_eq!(resp.status().as_u16(), 201);

    let created: Value = resp.json().await.unwrap();
    created["id"].as_i64().expect("Quiz id not found")
}

pub async fn fetch_quiz(client: &reqwest::Client, address: &str, quiz_id: i64) -> Value {
    client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .send()
        .await
        .expect("Fetch quiz failed")
        .json()
        .await
        .expect("Failed to parse quiz json")
}

/// Id of the option with the given label in question `index` of a public quiz.
pub fn option_id(quiz: &Value, index: usize, label: &str) -> i64 {
    quiz["questions"][index]["options"]
        .as_array()
        .expect("Question has no options")
        .iter()
        .find(|o| o["label"] == label)
        .unwrap_or_else(|| panic!("Option {} not found", label))["id"]
        .as_i64()
        .unwrap()
}

pub fn question_id(quiz: &Value, index: usize) -> String {
    quiz["questions"][index]["id"].as_i64().unwrap().to_string()
}

/// Answers for the general knowledge quiz; `None` leaves the question out.
pub fn answers(
    quiz: &Value,
    binary: Option<&str>,
    multi: Option<&[&str]>,
    text: Option<&str>,
) -> Value {
    let mut map = serde_json::Map::new();
    if let Some(label) = binary {
        map.insert(question_id(quiz, 0), json!(option_id(quiz, 0, label)));
    }
    if let Some(labels) = multi {
        let ids: Vec<i64> = labels.iter().map(|l| option_id(quiz, 1, l)).collect();
        map.insert(question_id(quiz, 1), json!(ids));
    }
    if let Some(text) = text {
        map.insert(question_id(quiz, 2), json!(text));
    }
    json!({ "answers": map })
}

pub async fn submit(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    quiz_id: i64,
    body: &Value,
) -> reqwest::Response {
    client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .expect("Submit failed")
}
