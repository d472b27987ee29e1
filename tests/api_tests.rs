// tests/api_tests.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use logisticare::{
    config::{Config, LlmConfig, QuizSettings},
    llm::LlmService,
    models::evaluation::ScoringMode,
    routes,
    state::AppState,
    store::Store,
};
use serde_json::{Value, json};

use common::{Calls, MockLlm};

struct TestApp {
    address: String,
    llm: Arc<MockLlm>,
}

/// Helper function to spawn the app on a random port for testing.
/// Every app gets its own in-memory database and mock LLM.
async fn spawn_app() -> TestApp {
    // 1. Open a private store with migrations applied
    let store = Store::open_in_memory()
        .await
        .expect("Failed to open in-memory store");

    // 2. Create test configuration and state
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        rust_log: "error".to_string(),
        llm: LlmConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: None,
            model: "test".to_string(),
            timeout: Duration::from_secs(1),
            max_retries: 0,
            retry_base_delay: Duration::from_millis(1),
        },
        quiz: QuizSettings {
            time_limit_secs: 600,
            autosave_interval: Duration::from_secs(30),
            scoring_mode: ScoringMode::AiAssisted,
        },
        cache_retention_days: 7,
    };

    let llm = MockLlm::new();
    let llm_dyn: Arc<dyn LlmService> = llm.clone();
    let state = AppState::new(store, config, llm_dyn);

    // 3. Create the router with the app state
    let app = routes::create_router(state);

    // 4. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 5. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, llm }
}

impl TestApp {
    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}{}", self.address, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn post_empty(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn put(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .put(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn generate_questions(&self, topic: &str, count: usize) -> Value {
        let response = self
            .post(
                "/api/questions/generate",
                json!({ "topic": topic, "count": count, "difficulty": "medium" }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get("/random_path_that_does_not_exist").await;

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn quiz_round_trip_updates_progress() {
    let app = spawn_app().await;
    let generated = app.generate_questions("Procurement", 3).await;
    assert_eq!(generated.as_array().unwrap().len(), 3);

    // Load from the bank and start
    let response = app
        .post(
            "/api/quiz/load",
            json!({ "source": "existing", "topic": "Procurement", "count": 3 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["phase"], "not_started");
    assert_eq!(view["total_questions"], 3);

    let view: Value = app.post_empty("/api/quiz/start").await.json().await.unwrap();
    assert_eq!(view["phase"], "in_progress");
    assert_eq!(view["time_left"], 600);

    // Answer the first question correctly
    let response = app
        .post(
            "/api/quiz/answer",
            json!({ "index": 0, "answer": { "kind": "selected_index", "value": 0 } }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["answered"], 1);

    // Complete with heuristic scoring
    let response = app.post_empty("/api/quiz/complete?mode=heuristic").await;
    assert_eq!(response.status().as_u16(), 200);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["phase"], "completed");
    assert_eq!(view["result"]["score"], 33);
    assert_eq!(view["result"]["scoring_mode"], "heuristic");
    assert_eq!(Calls::get(&app.llm.calls.evaluate_answer), 0);

    // Dashboard
    let dashboard: Value = app.get("/api/progress").await.json().await.unwrap();
    assert_eq!(dashboard["progress"].as_array().unwrap().len(), 1);
    assert_eq!(dashboard["progress"][0]["topic"], "Procurement");
    assert_eq!(dashboard["progress"][0]["total_questions"], 3);
    assert_eq!(dashboard["recent_sessions"].as_array().unwrap().len(), 1);

    let sessions: Value = app
        .get("/api/progress/sessions?topic=Procurement&limit=5")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(sessions.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn quiz_errors_map_to_statuses() {
    let app = spawn_app().await;

    // Nothing loaded yet
    let response = app.get("/api/quiz").await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), Value::Null);

    let response = app.post_empty("/api/quiz/start").await;
    assert_eq!(response.status().as_u16(), 409);

    // Empty bank
    let response = app
        .post(
            "/api/quiz/load",
            json!({ "source": "existing", "topic": "Procurement", "count": 5 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Procurement"));

    // Out-of-range count
    let response = app
        .post(
            "/api/quiz/load",
            json!({ "source": "generate", "topic": "Procurement", "count": 0 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(Calls::get(&app.llm.calls.generate_questions), 0);

    // Generator down
    app.llm.fail(true);
    let response = app
        .post(
            "/api/quiz/load",
            json!({ "source": "generate", "topic": "Procurement", "count": 2 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 502);
}

#[tokio::test]
async fn pause_saves_a_snapshot_that_can_be_discarded() {
    let app = spawn_app().await;
    app.generate_questions("Distribution", 2).await;
    app.post(
        "/api/quiz/load",
        json!({ "source": "existing", "topic": "Distribution", "count": 2 }),
    )
    .await;
    app.post_empty("/api/quiz/start").await;

    let view: Value = app.post_empty("/api/quiz/pause").await.json().await.unwrap();
    assert_eq!(view["phase"], "paused");

    let snapshot: Value = app
        .get("/api/quiz/snapshot/Distribution")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["topic"], "Distribution");

    let response = app.delete("/api/quiz/snapshot/Distribution").await;
    assert_eq!(response.status().as_u16(), 204);
    let response = app.delete("/api/quiz/snapshot/Distribution").await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn hint_and_explanation_are_cached() {
    let app = spawn_app().await;
    app.generate_questions("Asset Management", 1).await;
    app.post(
        "/api/quiz/load",
        json!({ "source": "existing", "topic": "Asset Management", "count": 1 }),
    )
    .await;
    app.post_empty("/api/quiz/start").await;

    for _ in 0..2 {
        let response = app.post_empty("/api/quiz/hint").await;
        assert_eq!(response.status().as_u16(), 200);
        let hint: Value = response.json().await.unwrap();
        assert!(hint["hint"].as_str().unwrap().contains("Asset Management"));

        let explanation: Value = app
            .post_empty("/api/quiz/explanation")
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(explanation["fallback"], false);
    }
    assert_eq!(Calls::get(&app.llm.calls.hint), 1);
    assert_eq!(Calls::get(&app.llm.calls.explanation), 1);
}

#[tokio::test]
async fn question_bank_endpoints() {
    let app = spawn_app().await;
    let generated = app.generate_questions("Procurement", 2).await;
    let id = generated[0]["id"].as_i64().unwrap();

    let count: Value = app
        .get("/api/questions/count/Procurement")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 2);

    let toggled: Value = app
        .put(&format!("/api/questions/{}/bookmark", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["bookmarked"], true);

    let bookmarked: Value = app
        .get("/api/questions?bookmarked=true")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(bookmarked.as_array().unwrap().len(), 1);

    let response = app.delete(&format!("/api/questions/{}", id)).await;
    assert_eq!(response.status().as_u16(), 204);
    let response = app.get(&format!("/api/questions/{}", id)).await;
    assert_eq!(response.status().as_u16(), 404);

    let response = app
        .post(
            "/api/questions/generate",
            json!({ "topic": "", "count": 2 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn reading_material_endpoints() {
    let app = spawn_app().await;

    let response = app
        .post(
            "/api/reading-materials/generate",
            json!({ "topic": "Distribution", "difficulty": "easy" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let material: Value = response.json().await.unwrap();
    let id = material["id"].as_i64().unwrap();
    assert_eq!(material["topic"], "Distribution");

    let toggled: Value = app
        .put(&format!("/api/reading-materials/{}/bookmark", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["bookmarked"], true);

    let response = app
        .post_empty(&format!("/api/reading-materials/{}/read", id))
        .await;
    assert_eq!(response.status().as_u16(), 204);

    let fetched: Value = app
        .get(&format!("/api/reading-materials/{}", id))
        .await
        .json()
        .await
        .unwrap();
    assert!(!fetched["last_read"].is_null());

    let listed: Value = app
        .get("/api/reading-materials?topic=Distribution")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let removed: Value = app
        .delete("/api/reading-materials/topics/Distribution")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(removed["removed"], 1);
}

#[tokio::test]
async fn data_management_endpoints() {
    let app = spawn_app().await;
    app.generate_questions("Procurement", 3).await;
    app.generate_questions("Distribution", 2).await;

    let stats: Value = app.get("/api/data/stats").await.json().await.unwrap();
    assert_eq!(stats["schema_version"], 3);
    assert_eq!(stats["collections"]["questions"], 5);

    let topic: Value = app
        .get("/api/data/topics/Procurement")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(topic["collections"]["questions"], 3);

    let response = app.delete("/api/data/topics/Procurement").await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.post_empty("/api/data/reset-all").await;
    assert_eq!(response.status().as_u16(), 200);
    let stats: Value = app.get("/api/data/stats").await.json().await.unwrap();
    assert_eq!(stats["collections"]["questions"], 2);

    let response = app.post_empty("/api/data/cleanup").await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.post_empty("/api/data/clear-all").await;
    assert_eq!(response.status().as_u16(), 200);
    let stats: Value = app.get("/api/data/stats").await.json().await.unwrap();
    assert_eq!(stats["collections"]["questions"], 0);
}
