//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use budgee_core::ai::MockBackend;
use budgee_core::db::Database;
use budgee_core::models::{Mood, NewTransaction};
use budgee_core::{AIClient, Advisor, EventBus, LedgerEvent, PromptLibrary};
use http_body_util::BodyExt;
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    }
}

fn mock_advisor(backend: MockBackend) -> Advisor {
    Advisor::with_prompts(AIClient::Mock(backend), PromptLibrary::embedded_only())
}

fn setup_with(db: Database, config: ServerConfig, advisor: Option<Advisor>) -> Router {
    let state = AppState::new(db, config, advisor, EventBus::new());
    create_router_with_state(Arc::new(state), None)
}

fn setup_test_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    db.set_total_budget(3000.0).unwrap();
    let app = setup_with(
        db.clone(),
        test_config(),
        Some(mock_advisor(MockBackend::new())),
    );
    (app, db)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// ========== Transaction API Tests ==========

#[tokio::test]
async fn test_create_transaction() {
    let (app, db) = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/transactions",
            serde_json::json!({
                "title": "Groceries",
                "description": "weekly run",
                "amount": 450.0,
                "mood": "neutral",
                "date": "2024-03-02"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["title"], "Groceries");
    assert_eq!(json["mood"], "neutral");
    assert_eq!(json["kind"], "expense");

    let budget = db.get_budget().unwrap();
    assert_eq!(budget.remaining_budget, 2550.0);
}

#[tokio::test]
async fn test_create_transaction_accepts_mood_aliases() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/transactions",
            serde_json::json!({"title": "Concert", "amount": 800.0, "mood": "rad"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["mood"], "excited");
}

#[tokio::test]
async fn test_create_transaction_over_budget() {
    let (app, db) = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/transactions",
            serde_json::json!({"title": "Phone", "amount": 5000.0, "mood": "regret"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("budget"));

    // Nothing was recorded
    assert_eq!(db.get_budget().unwrap().remaining_budget, 3000.0);
}

#[tokio::test]
async fn test_create_transaction_invalid_amount() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/transactions",
            serde_json::json!({"title": "Nothing", "amount": -5.0, "mood": "happy"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_transactions_with_filters() {
    let (app, db) = setup_test_app();
    db.add_transaction(&NewTransaction::now("Coffee", "", 120.0, Mood::Happy))
        .unwrap();
    db.add_transaction(&NewTransaction::now("Taxi", "late night", 300.0, Mood::Unhappy))
        .unwrap();
    db.add_transaction(&NewTransaction::now("Shoes", "", 900.0, Mood::Regret))
        .unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/transactions?mood=unhappy,regret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["transactions"].as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(get("/api/transactions?search=night"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["transactions"][0]["title"], "Taxi");

    let response = app
        .oneshot(get("/api/transactions?limit=1&offset=1"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(json["total"], 3);
    assert_eq!(json["limit"], 1);
}

#[tokio::test]
async fn test_list_transactions_invalid_mood() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(get("/api/transactions?mood=furious"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_transactions_inverted_date_range() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(get("/api/transactions?from=2024-05-01&to=2024-04-01"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transaction_totals() {
    let (app, db) = setup_test_app();
    db.add_transaction(&NewTransaction::now("Rent share", "", 1500.0, Mood::Neutral))
        .unwrap();
    db.add_transaction(&NewTransaction::now("Snacks", "", 80.0, Mood::Happy))
        .unwrap();

    let response = app
        .oneshot(get("/api/transactions/totals"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["total_amount"], 1580.0);
    assert_eq!(json["large_count"], 1);
}

#[tokio::test]
async fn test_get_transaction_not_found() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/transactions/99999")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_transaction() {
    let (app, db) = setup_test_app();
    let tx = db
        .add_transaction(&NewTransaction::now("Lunch", "", 200.0, Mood::Neutral))
        .unwrap();

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/api/transactions/{}", tx.id),
            serde_json::json!({"amount": 250.0, "mood": "happy"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["amount"], 250.0);
    assert_eq!(json["mood"], "happy");
    assert_eq!(json["title"], "Lunch");

    // The difference comes out of the budget
    assert_eq!(db.get_budget().unwrap().remaining_budget, 2750.0);
}

#[tokio::test]
async fn test_update_transaction_empty_body() {
    let (app, db) = setup_test_app();
    let tx = db
        .add_transaction(&NewTransaction::now("Lunch", "", 200.0, Mood::Neutral))
        .unwrap();

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/api/transactions/{}", tx.id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_transaction_refunds_budget() {
    let (app, db) = setup_test_app();
    let tx = db
        .add_transaction(&NewTransaction::now("Movie", "", 350.0, Mood::Happy))
        .unwrap();
    assert_eq!(db.get_budget().unwrap().remaining_budget, 2650.0);

    let response = app
        .clone()
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/transactions/{}", tx.id),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["id"], tx.id);
    assert_eq!(db.get_budget().unwrap().remaining_budget, 3000.0);

    // Second delete finds nothing
    let response = app
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/transactions/{}", tx.id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Budget API Tests ==========

#[tokio::test]
async fn test_get_budget() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/budget")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_budget"], 3000.0);
    assert_eq!(json["remaining_budget"], 3000.0);
    assert_eq!(json["savings"], 0.0);
}

#[tokio::test]
async fn test_set_budget() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/budget",
            serde_json::json!({"amount": 5000.0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_budget"], 5000.0);
    assert_eq!(json["remaining_budget"], 5000.0);
}

#[tokio::test]
async fn test_deposit_budget() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/budget/deposit",
            serde_json::json!({"amount": 500.0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_budget"], 3500.0);
    assert_eq!(json["remaining_budget"], 3500.0);
}

#[tokio::test]
async fn test_savings_round_trip() {
    let (app, db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/savings/deposit",
            serde_json::json!({"amount": 1000.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["savings"], 1000.0);
    assert_eq!(json["remaining_budget"], 2000.0);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/savings/withdraw",
            serde_json::json!({"amount": 400.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["savings"], 600.0);
    assert_eq!(json["remaining_budget"], 2400.0);

    // Cannot withdraw more than is saved
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/savings/withdraw",
            serde_json::json!({"amount": 10000.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(db.get_budget().unwrap().savings, 600.0);
}

#[tokio::test]
async fn test_budget_changes_are_audited() {
    let (app, db) = setup_test_app();

    app.oneshot(
        Request::builder()
            .method("PUT")
            .uri("/api/budget")
            .header("content-type", "application/json")
            .header("cf-access-authenticated-user-email", "ana@example.com")
            .body(Body::from(r#"{"amount": 4200.0}"#))
            .unwrap(),
    )
    .await
    .unwrap();

    let entries = db.list_audit_log(10).unwrap();
    let entry = entries
        .iter()
        .find(|e| e.entity_type.as_deref() == Some("budget"))
        .expect("budget audit entry");
    assert_eq!(entry.user_email, "ana@example.com");
}

#[tokio::test]
async fn test_reset_budget_moves_leftover_to_savings() {
    let (app, db) = setup_test_app();
    db.add_transaction(&NewTransaction::now("Books", "", 1000.0, Mood::Happy))
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/api/budget/reset"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["reset"], true);
    assert_eq!(json["transferred"], 2000.0);
    assert_eq!(json["budget"]["savings"], 2000.0);
    assert_eq!(json["budget"]["remaining_budget"], 0.0);
    assert_eq!(json["budget"]["total_budget"], 0.0);

    // A reset notification was posted
    let notifications = db.list_notifications(10).unwrap();
    assert_eq!(notifications.len(), 1);

    // Second reset in the same month is a no-op
    let response = app
        .oneshot(empty_request("POST", "/api/budget/reset"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["reset"], false);
    assert_eq!(json["transferred"], 0.0);
}

// ========== Mood API Tests ==========

#[tokio::test]
async fn test_mood_chart() {
    let (app, db) = setup_test_app();
    for (title, date, amount, mood) in [
        ("Tea", "2024-04-01T03:00:00Z", 100.0, Mood::Happy),
        ("Cab", "2024-04-01T05:00:00Z", 300.0, Mood::Unhappy),
        ("Gift", "2024-04-02T05:00:00Z", 200.0, Mood::Excited),
    ] {
        let mut tx = NewTransaction::now(title, "", amount, mood);
        tx.date = budgee_core::models::parse_transaction_date(date).unwrap();
        db.add_transaction(&tx).unwrap();
    }

    let response = app
        .oneshot(get(
            "/api/mood/chart?from=2024-04-01&to=2024-04-30&utc_offset_minutes=0",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let days = json["days"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(json["total_spent"], 600.0);
    assert_eq!(json["average_daily_spending"], 300.0);
    assert_eq!(json["mood_totals"]["unhappy"], 300.0);
}

#[tokio::test]
async fn test_mood_chart_range_in_client_days() {
    let (app, db) = setup_test_app();
    for (title, date, amount, mood) in [
        ("Breakfast", "2024-01-01T20:00:00Z", 120.0, Mood::Happy),
        ("Taxi home", "2024-01-02T20:00:00Z", 250.0, Mood::Regret),
    ] {
        let mut tx = NewTransaction::now(title, "", amount, mood);
        tx.date = budgee_core::models::parse_transaction_date(date).unwrap();
        db.add_transaction(&tx).unwrap();
    }

    // UTC+8: the breakfast falls on Jan 2, the taxi on Jan 3
    let response = app
        .oneshot(get(
            "/api/mood/chart?from=2024-01-02&to=2024-01-02&utc_offset_minutes=480",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let days = json["days"].as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["date"], "2024-01-02");
    assert_eq!(days[0]["transactions"][0]["title"], "Breakfast");
    assert_eq!(json["total_spent"], 120.0);
}

#[tokio::test]
async fn test_mood_chart_rejects_bad_offset() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(get("/api/mood/chart?utc_offset_minutes=5000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mood_patterns() {
    let (app, db) = setup_test_app();
    db.add_transaction(&NewTransaction::now("Cake", "", 150.0, Mood::Happy))
        .unwrap();
    db.add_transaction(&NewTransaction::now("Bag", "", 850.0, Mood::Regret))
        .unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/mood/patterns?period=all"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_spent"], 1000.0);
    assert_eq!(json["patterns"].as_array().unwrap().len(), 2);

    let response = app
        .oneshot(get("/api/mood/patterns?period=someday"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Advisor API Tests ==========

#[tokio::test]
async fn test_conversation_lifecycle() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/conversations",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let conversation = get_body_json(response).await;
    let id = conversation["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/conversations/{}/messages", id),
            serde_json::json!({"text": "Am I spending too much on food?"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let exchange = get_body_json(response).await;
    assert_eq!(exchange["failed"], false);
    assert_eq!(exchange["title"], "Budget Check-In");
    assert_eq!(exchange["user_message"]["sender"], "user");
    assert_eq!(exchange["advisor_message"]["sender"], "advisor");
    assert_eq!(exchange["conversation"]["name"], "Budget Check-In");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/conversations/{}/messages", id)))
        .await
        .unwrap();
    let messages = get_body_json(response).await;
    assert_eq!(messages.as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(get("/api/conversations"))
        .await
        .unwrap();
    let list = get_body_json(response).await;
    assert_eq!(list[0]["unread_count"], 0);

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/conversations/{}", id),
            serde_json::json!({"name": "Food budget"}),
        ))
        .await
        .unwrap();
    let renamed = get_body_json(response).await;
    assert_eq!(renamed["name"], "Food budget");

    let response = app
        .clone()
        .oneshot(get("/api/conversations?search=food"))
        .await
        .unwrap();
    let found = get_body_json(response).await;
    assert_eq!(found.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/conversations/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/api/conversations/{}/messages", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_message_unknown_conversation() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/conversations/4242/messages",
            serde_json::json!({"text": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_empty_message() {
    let (app, db) = setup_test_app();
    let conversation = db.create_conversation(None).unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/conversations/{}/messages", conversation.id),
            serde_json::json!({"text": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_reply_is_stored_as_apology() {
    let db = Database::in_memory().unwrap();
    let conversation = db.create_conversation(None).unwrap();
    let app = setup_with(
        db.clone(),
        test_config(),
        Some(mock_advisor(MockBackend::failing())),
    );

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/conversations/{}/messages", conversation.id),
            serde_json::json!({"text": "Can I afford a trip?"}),
        ))
        .await
        .unwrap();

    // The exchange still succeeds so the user sees a reply
    assert_eq!(response.status(), StatusCode::OK);
    let exchange = get_body_json(response).await;
    assert_eq!(exchange["failed"], true);
    assert_eq!(exchange["advisor_message"]["text"], budgee_core::CHAT_APOLOGY);
    assert!(exchange["title"].is_null());

    let messages = db.list_chat_messages(conversation.id).unwrap();
    assert_eq!(messages.len(), 2);
}

#[tokio::test]
async fn test_advisor_not_configured() {
    let db = Database::in_memory().unwrap();
    let conversation = db.create_conversation(None).unwrap();
    let app = setup_with(db, test_config(), None);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/conversations/{}/messages", conversation.id),
            serde_json::json!({"text": "hi"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.oneshot(get("/api/ai/health")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["configured"], false);
    assert_eq!(json["healthy"], false);
}

#[tokio::test]
async fn test_analysis_returns_blocks() {
    let (app, db) = setup_test_app();
    db.add_transaction(&NewTransaction::now("Dinner", "", 600.0, Mood::Unhappy))
        .unwrap();

    let response = app
        .oneshot(empty_request("POST", "/api/analysis"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["model"], "mock");
    assert!(!json["blocks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_analysis_backend_down() {
    let db = Database::in_memory().unwrap();
    let app = setup_with(
        db,
        test_config(),
        Some(mock_advisor(MockBackend::failing())),
    );

    let response = app
        .oneshot(empty_request("POST", "/api/analysis"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "AI backend unavailable");
}

#[tokio::test]
async fn test_ai_health() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/ai/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["configured"], true);
    assert_eq!(json["healthy"], true);
    assert_eq!(json["model"], "mock");
}

#[tokio::test]
async fn test_chat_against_ollama_server() {
    use budgee_core::test_utils::{MockOllamaServer, MOCK_TITLE};

    let server = MockOllamaServer::start().await;
    let db = Database::in_memory().unwrap();
    db.set_total_budget(3000.0).unwrap();
    let conversation = db.create_conversation(None).unwrap();
    let advisor = Advisor::with_prompts(
        AIClient::ollama(&server.url(), "llama3.2"),
        PromptLibrary::embedded_only(),
    );
    let app = setup_with(db, test_config(), Some(advisor));

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/conversations/{}/messages", conversation.id),
            serde_json::json!({"text": "I'm stressed about bills"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let exchange = get_body_json(response).await;
    assert_eq!(exchange["title"], MOCK_TITLE);
    assert!(exchange["advisor_message"]["text"]
        .as_str()
        .unwrap()
        .contains("breathing"));
    assert_eq!(server.requests().len(), 2);
}

// ========== Notification API Tests ==========

#[tokio::test]
async fn test_notifications() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/notifications",
            serde_json::json!({"message": "Rent due Friday", "type": "warning"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = get_body_json(response).await;
    assert_eq!(created["type"], "warning");
    let id = created["id"].as_i64().unwrap();

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/notifications",
            serde_json::json!({"message": "Nice week"}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/notifications"))
        .await
        .unwrap();
    let list = get_body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
    assert_eq!(list[0]["message"], "Nice week");
    assert_eq!(list[0]["type"], "info");

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/notifications/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/notifications/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(empty_request("DELETE", "/api/notifications"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["removed"], 1);
}

// ========== Change Feed Tests ==========

#[tokio::test]
async fn test_mutations_publish_events() {
    let db = Database::in_memory().unwrap();
    db.set_total_budget(1000.0).unwrap();
    let events = EventBus::new();
    let mut subscription = events.subscribe();
    let state = AppState::new(db, test_config(), None, events);
    let app = create_router_with_state(Arc::new(state), None);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/transactions",
            serde_json::json!({"title": "Bread", "amount": 60.0, "mood": "neutral"}),
        ))
        .await
        .unwrap();
    let created = get_body_json(response).await;
    let id = created["id"].as_i64().unwrap();

    assert_eq!(
        subscription.try_recv(),
        Some(LedgerEvent::TransactionAdded { id })
    );
    assert_eq!(subscription.try_recv(), Some(LedgerEvent::BudgetChanged));
}

#[tokio::test]
async fn test_event_stream_content_type() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/events")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
}

// ========== Export and Audit Tests ==========

#[tokio::test]
async fn test_export_csv() {
    let (app, db) = setup_test_app();
    db.add_transaction(&NewTransaction::now("Noodles", "", 95.0, Mood::Happy))
        .unwrap();

    let response = app
        .oneshot(get("/api/export?format=csv"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("transactions.csv"));
    let body = get_body_text(response).await;
    let mut lines = body.lines();
    assert!(lines.next().unwrap().contains("title"));
    assert!(lines.next().unwrap().contains("Noodles"));
}

#[tokio::test]
async fn test_export_json_lines_filtered() {
    let (app, db) = setup_test_app();
    db.add_transaction(&NewTransaction::now("Noodles", "", 95.0, Mood::Happy))
        .unwrap();
    db.add_transaction(&NewTransaction::now("Parking", "", 50.0, Mood::Unhappy))
        .unwrap();

    let response = app
        .oneshot(get("/api/export?format=json&mood=unhappy"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = get_body_text(response).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 1);
    let row: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(row["title"], "Parking");
}

#[tokio::test]
async fn test_export_unknown_format() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(get("/api/export?format=xlsx"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_audit_log() {
    let (app, db) = setup_test_app();
    db.log_audit("someone", "create", Some("transaction"), Some(1), None)
        .unwrap();

    let response = app.oneshot(get("/api/audit?limit=5")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["user_email"] == "someone"));
}

#[tokio::test]
async fn test_audit_log_entity_filter() {
    let (app, db) = setup_test_app();
    db.log_audit("someone", "create", Some("transaction"), Some(1), None)
        .unwrap();
    db.log_audit("someone", "remove", Some("notification"), Some(4), None)
        .unwrap();

    let response = app
        .oneshot(get("/api/audit?entity=notification"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "remove");
}

// ========== Authentication Tests ==========

#[tokio::test]
async fn test_auth_required() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        allowed_origins: vec![],
        ..Default::default()
    };
    let app = setup_with(db, config, None);

    let response = app.oneshot(get("/api/budget")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Authentication required");
}

#[tokio::test]
async fn test_auth_with_header() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        ..Default::default()
    };
    let app = setup_with(db, config, None);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("cf-access-authenticated-user-email", "test@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"], "test@example.com");
    assert_eq!(json["auth_method"], "cloudflare_header");
}

#[tokio::test]
async fn test_auth_with_api_key() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        api_keys: vec!["s3cret-key".to_string()],
        ..Default::default()
    };
    let app = setup_with(db, config, None);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("authorization", "Bearer s3cret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["auth_method"], "api_key");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("authorization", "Bearer wrong-key!")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_with_trusted_network() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        trusted_networks: parse_trusted_networks("192.168.1.0/24"),
        ..Default::default()
    };
    let app = setup_with(db, config, None);

    let inside: std::net::SocketAddr = "192.168.1.20:5000".parse().unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .extension(axum::extract::ConnectInfo(inside))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["auth_method"], "trusted_network");
    assert_eq!(json["user"], "192.168.1.20");

    let outside: std::net::SocketAddr = "10.0.0.9:5000".parse().unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .extension(axum::extract::ConnectInfo(outside))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forwarded_for_ignored_without_trusted_proxy() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        trusted_networks: parse_trusted_networks("192.168.1.0/24"),
        ..Default::default()
    };
    let app = setup_with(db, config, None);

    let peer: std::net::SocketAddr = "203.0.113.7:443".parse().unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("x-forwarded-for", "192.168.1.20")
                .extension(axum::extract::ConnectInfo(peer))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_without_auth() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/me")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"], "local-dev");
    assert_eq!(json["auth_method"], "none");
}

#[tokio::test]
async fn test_health_skips_auth() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        ..Default::default()
    };
    let app = setup_with(db, config, None);

    let response = app.oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[test]
fn test_parse_trusted_networks() {
    let networks = parse_trusted_networks("192.168.1.0/24, 10.0.0.5,not-an-ip,,fd00::/8");
    assert_eq!(networks.len(), 3);
    assert!(networks[1].contains(&"10.0.0.5".parse::<std::net::IpAddr>().unwrap()));
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["abc123".to_string()];
    assert!(validate_api_key("abc123", &keys));
    assert!(!validate_api_key("abc124", &keys));
    assert!(!validate_api_key("abc", &keys));
    assert!(!validate_api_key("abc123", &[]));
}

// ========== Security Header Tests ==========

#[tokio::test]
async fn test_security_headers() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/health")).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers
        .get("content-security-policy")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("frame-ancestors 'none'"));
}

#[test]
fn test_app_error_mapping() {
    let err = AppError::from(budgee_core::Error::NotFound("Transaction 9".into()));
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let err = AppError::from(budgee_core::Error::InsufficientSavings {
        requested: 10.0,
        available: 5.0,
    });
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = AppError::from(budgee_core::Error::Ai("timeout".into()));
    assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
}
