// tests/api_tests.rs

use academy::{
    config::Config,
    routes,
    state::AppState,
    store::MemoryStore,
    utils::jwt::{ROLE_ADMIN, ROLE_USER, sign_jwt},
};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";

/// Spawns the app on a random port, backed by an in-memory store.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let config = Config {
        database_url: None,
        jwt_secret: SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        db_max_connections: 1,
    };

    let state = AppState::from_store(MemoryStore::new(), config);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn bearer(user_id: i64, role: &str) -> String {
    format!("Bearer {}", sign_jwt(user_id, role, SECRET, 600).unwrap())
}

fn primes_quiz(max_attempts: i32) -> Value {
    json!({
        "title": "Numbers",
        "passing_score": 70.0,
        "time_limit_minutes": 30,
        "max_attempts": max_attempts,
        "questions": [
            {
                "content": "What is 2 + 2?",
                "options": ["3", "4", "5"],
                "correct_answers": ["4"]
            },
            {
                "content": "Which are prime?",
                "options": ["2", "3", "4", "5", "7"],
                "correct_answers": ["2", "3", "5", "7"]
            }
        ]
    })
}

/// Creates a quiz as admin and returns the full definition.
async fn create_quiz(client: &reqwest::Client, address: &str, body: &Value) -> Value {
    let response = client
        .post(format!("{}/api/admin/quizzes", address))
        .header("Authorization", bearer(1, ROLE_ADMIN))
        .json(body)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

/// An answer sheet picking every correct option of `quiz`.
fn perfect_answers(quiz: &Value) -> Value {
    let mut answers = serde_json::Map::new();
    for q in quiz["questions"].as_array().unwrap() {
        answers.insert(q["id"].as_i64().unwrap().to_string(), q["correct_answers"].clone());
    }
    Value::Object(answers)
}

async fn start(client: &reqwest::Client, address: &str, user_id: i64, quiz_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/api/quiz-attempts", address))
        .header("Authorization", bearer(user_id, ROLE_USER))
        .json(&json!({ "quiz_id": quiz_id }))
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn create_quiz_requires_admin() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let anonymous = client
        .post(format!("{}/api/admin/quizzes", address))
        .json(&primes_quiz(3))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    let user = client
        .post(format!("{}/api/admin/quizzes", address))
        .header("Authorization", bearer(2, ROLE_USER))
        .json(&primes_quiz(3))
        .send()
        .await
        .unwrap();
    assert_eq!(user.status().as_u16(), 403);
}

#[tokio::test]
async fn create_quiz_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let mut no_correct = primes_quiz(3);
    no_correct["questions"][0]["correct_answers"] = json!([]);

    let mut zero_attempts = primes_quiz(3);
    zero_attempts["max_attempts"] = json!(0);

    let mut unanswerable = primes_quiz(3);
    unanswerable["questions"][0]["correct_answers"] = json!(["22"]);

    for body in [no_correct, zero_attempts, unanswerable] {
        let response = client
            .post(format!("{}/api/admin/quizzes", address))
            .header("Authorization", bearer(1, ROLE_ADMIN))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
    }
}

#[tokio::test]
async fn public_quiz_hides_answer_keys() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz = create_quiz(&client, &address, &primes_quiz(3)).await;

    let response = client
        .get(format!("{}/api/quizzes/{}", address, quiz["id"]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let public: Value = response.json().await.unwrap();
    assert_eq!(public["title"], "Numbers");
    for q in public["questions"].as_array().unwrap() {
        assert!(q.get("correct_answers").is_none());
        assert!(!q["options"].as_array().unwrap().is_empty());
    }

    let missing = client
        .get(format!("{}/api/quizzes/9999", address))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn test_attempt_flow() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz = create_quiz(&client, &address, &primes_quiz(3)).await;
    let quiz_id = quiz["id"].as_i64().unwrap();

    // 1. Start
    let response = start(&client, &address, 7, quiz_id).await;
    assert_eq!(response.status().as_u16(), 201);
    let attempt: Value = response.json().await.unwrap();
    assert_eq!(attempt["attempt_number"], 1);
    assert_eq!(attempt["status"], "in_progress");
    let attempt_id = attempt["id"].as_str().unwrap().to_string();

    // 2. Someone else may neither read nor submit it
    let foreign = client
        .get(format!("{}/api/quiz-attempts/{}", address, attempt_id))
        .header("Authorization", bearer(8, ROLE_USER))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status().as_u16(), 403);

    let foreign_submit = client
        .post(format!("{}/api/quiz-attempts/{}/submit", address, attempt_id))
        .header("Authorization", bearer(8, ROLE_USER))
        .json(&json!({ "answers": perfect_answers(&quiz) }))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign_submit.status().as_u16(), 403);

    // 3. Submit all correct
    let response = client
        .post(format!("{}/api/quiz-attempts/{}/submit", address, attempt_id))
        .header("Authorization", bearer(7, ROLE_USER))
        .json(&json!({ "answers": perfect_answers(&quiz) }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let submitted: Value = response.json().await.unwrap();
    assert_eq!(submitted["status"], "completed");
    assert_eq!(submitted["score"], 100.0);
    assert_eq!(submitted["is_passed"], true);
    assert!(!submitted["end_time"].is_null());

    // 4. Second submit is rejected
    let again = client
        .post(format!("{}/api/quiz-attempts/{}/submit", address, attempt_id))
        .header("Authorization", bearer(7, ROLE_USER))
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 400);

    // 5. The stored attempt keeps the first result, admins may read it
    let stored: Value = client
        .get(format!("{}/api/quiz-attempts/{}", address, attempt_id))
        .header("Authorization", bearer(1, ROLE_ADMIN))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["score"], 100.0);
    assert_eq!(stored["status"], "completed");
}

#[tokio::test]
async fn attempt_limit_is_enforced() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz = create_quiz(&client, &address, &primes_quiz(2)).await;
    let quiz_id = quiz["id"].as_i64().unwrap();

    assert_eq!(start(&client, &address, 7, quiz_id).await.status().as_u16(), 201);
    assert_eq!(start(&client, &address, 7, quiz_id).await.status().as_u16(), 201);

    let third = start(&client, &address, 7, quiz_id).await;
    assert_eq!(third.status().as_u16(), 400);
    let body: Value = third.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("(2)"));

    // Other users keep their own budget.
    assert_eq!(start(&client, &address, 8, quiz_id).await.status().as_u16(), 201);

    // Unknown quiz.
    assert_eq!(start(&client, &address, 7, 9999).await.status().as_u16(), 404);
}

#[tokio::test]
async fn list_attempts_most_recent_first() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz = create_quiz(&client, &address, &primes_quiz(3)).await;
    let quiz_id = quiz["id"].as_i64().unwrap();

    for _ in 0..3 {
        start(&client, &address, 7, quiz_id).await;
    }

    let own: Vec<Value> = client
        .get(format!("{}/api/quiz-attempts?quiz_id={}", address, quiz_id))
        .header("Authorization", bearer(7, ROLE_USER))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let numbers: Vec<i64> = own.iter().map(|a| a["attempt_number"].as_i64().unwrap()).collect();
    assert_eq!(numbers, vec![3, 2, 1]);

    let foreign = client
        .get(format!("{}/api/quiz-attempts?quiz_id={}&user_id=7", address, quiz_id))
        .header("Authorization", bearer(8, ROLE_USER))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status().as_u16(), 403);

    let as_admin: Vec<Value> = client
        .get(format!("{}/api/quiz-attempts?quiz_id={}&user_id=7", address, quiz_id))
        .header("Authorization", bearer(1, ROLE_ADMIN))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(as_admin.len(), 3);
}

#[tokio::test]
async fn submit_ignores_keys_that_are_not_question_ids() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz = create_quiz(&client, &address, &primes_quiz(3)).await;

    let attempt: Value = start(&client, &address, 7, quiz["id"].as_i64().unwrap())
        .await
        .json()
        .await
        .unwrap();

    let mut answers = perfect_answers(&quiz);
    answers["extra-note"] = json!(["x"]);
    answers["9999"] = json!(["4"]);

    let response = client
        .post(format!("{}/api/quiz-attempts/{}/submit", address, attempt["id"].as_str().unwrap()))
        .header("Authorization", bearer(7, ROLE_USER))
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let submitted: Value = response.json().await.unwrap();
    assert_eq!(submitted["status"], "completed");
    assert_eq!(submitted["score"], 100.0);
}
