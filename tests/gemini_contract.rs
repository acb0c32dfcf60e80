//! Contract tests for the generateContent client and the resilient gateway
//!
//! A local mock server stands in for the hosted API.

use alfredo::llm::{resilient, GatewayConfig, GeminiClient, NutritionGateway, TextGenerator};
use alfredo::messages::{PantryItem, PantrySnapshot};
use alfredo::AlfredoError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/v1beta/models/gemini-1.5-flash-latest:generateContent";

fn client_for(server: &MockServer) -> GeminiClient {
    let config = GatewayConfig::default()
        .with_endpoint(format!("{}/v1beta", server.uri()))
        .with_api_key("test-key")
        .with_timeout(Duration::from_secs(2));
    GeminiClient::new(config).unwrap_or_else(|e| panic!("client: {e}"))
}

fn text_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "parts": [{ "text": text }], "role": "model" }, "finishReason": "STOP" }
        ]
    })
}

fn pantry() -> PantrySnapshot {
    PantrySnapshot::new(vec![
        PantryItem::new("Jasmine Rice", 2.0, "cup"),
        PantryItem::new("eggs", 6.0, "piece"),
    ])
}

// ── Client ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_carries_prompt_key_and_sampling() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "hello there" }] }],
            "generationConfig": { "topK": 40, "maxOutputTokens": 512 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Hi!")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server).generate("hello there").await;
    assert_eq!(reply.unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}")), "Hi!");
}

#[tokio::test]
async fn test_non_success_status_is_gateway_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = client_for(&server).generate("hi").await.unwrap_err();
    match err {
        AlfredoError::GatewayError(message) => {
            assert!(message.contains("503"));
            assert!(message.contains("overloaded"));
        }
        other => panic!("Expected GatewayError, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_candidates_is_gateway_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = client_for(&server).generate("hi").await.unwrap_err();
    assert!(matches!(err, AlfredoError::GatewayError(_)));
}

#[tokio::test]
async fn test_timeout_is_gateway_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_reply("late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).generate("hi").await.unwrap_err();
    assert!(matches!(err, AlfredoError::GatewayError(_)));
}

// ── Gateway ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_recipe_from_fenced_reply_with_availability_override() {
    let server = MockServer::start().await;
    let reply = "Here is your recipe:\n```json\n{\"name\": \"Egg Fried Rice\", \"ingredients\": [\
        {\"name\": \"rice\", \"quantity\": 2, \"unit\": \"cup\", \"available\": false},\
        {\"name\": \"soy sauce\", \"quantity\": 1, \"unit\": \"tbsp\", \"available\": true}],\
        \"instructions\": [\"Cook rice\", \"Fry with eggs\"], \"prep_time\": \"5 minutes\",\
        \"cook_time\": \"10 minutes\", \"servings\": 2}\n```\nEnjoy!";

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(reply)))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = resilient(client_for(&server));
    let recipe = gateway
        .generate_recipe("fried rice", &pantry())
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));

    assert_eq!(recipe.name, "Egg Fried Rice");
    assert!(recipe.ingredients[0].available, "rice is in the pantry");
    assert!(!recipe.ingredients[1].available, "soy sauce is not");
    assert_eq!(recipe.servings, Some(2));
}

#[tokio::test]
async fn test_consumption_from_bare_json_with_prose() {
    let server = MockServer::start().await;
    let reply = "Sure! {\"action\": \"consume\", \"ingredient\": \"banana\", \"quantity\": 1, \
        \"unit\": \"piece\", \"calories\": 105, \"protein\": 1.3, \"carbs\": 27, \"fat\": 0.4} Hope that helps.";

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(reply)))
        .mount(&server)
        .await;

    let record = resilient(client_for(&server))
        .parse_consumption("I ate a banana")
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));

    assert_eq!(record.ingredient, "banana");
    assert_eq!(record.calories, 105.0);
}

#[tokio::test]
async fn test_server_error_falls_back_to_lexical_parse() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gateway = resilient(client_for(&server));

    let record = gateway
        .parse_consumption("I ate 2 slices of bread")
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert_eq!(record.ingredient, "bread");
    assert_eq!(record.quantity, 2.0);
    assert_eq!(record.calories, 5.0);

    let recipe = gateway
        .generate_recipe("stew", &pantry())
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert_eq!(recipe.name, "Simple stew");
    assert_eq!(recipe.ingredients.len(), 2);
}

#[tokio::test]
async fn test_prose_only_reply_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(text_reply("I'm not able to format that as JSON.")),
        )
        .mount(&server)
        .await;

    let recipe = resilient(client_for(&server))
        .generate_recipe("curry", &PantrySnapshot::default())
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert_eq!(recipe.name, "Simple curry");
}

#[tokio::test]
async fn test_freeform_reply_and_canned_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": alfredo::llm::prompts::freeform_prompt("hi", "ctx") }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("  Hello! Ready to plan meals?  ")))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = resilient(client_for(&server));
    let reply = gateway.freeform_reply("hi", "ctx").await.unwrap_or_default();
    assert_eq!(reply, "Hello! Ready to plan meals?");

    // Unmatched body gets wiremock's 404, which triggers the canned reply
    let fallback = gateway.freeform_reply("any recipe ideas", "ctx").await.unwrap_or_default();
    assert_eq!(
        fallback,
        "I'd be happy to help you with a recipe! Let me generate one based on your pantry ingredients."
    );
}
