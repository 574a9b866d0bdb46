pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::auth::handlers as auth;
use crate::chat::handlers as chat;
use crate::profile::handlers as profile;
use crate::questionnaire::handlers as questionnaire;
use crate::resources::handlers as resources;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat widget
        .route("/api/chat", post(chat::handle_chat))
        .route("/api/v1/chat/history", get(chat::handle_chat_history))
        // Accounts
        .route("/api/v1/auth/signup", post(auth::handle_signup))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        // Profile
        .route("/api/v1/profile", get(profile::handle_get_profile))
        .route(
            "/api/v1/profile/responses",
            put(profile::handle_update_responses),
        )
        .route(
            "/api/v1/preferences",
            put(profile::handle_update_preferences),
        )
        .route("/api/v1/needs", put(profile::handle_update_needs))
        .route("/api/v1/account", delete(profile::handle_delete_account))
        .route(
            "/api/v1/admin/mock-user",
            post(profile::handle_create_mock_user),
        )
        // Resources
        .route("/api/v1/locations", get(resources::handle_list_locations))
        .route("/api/v1/dashboard", get(resources::handle_dashboard))
        .route(
            "/api/v1/resources/:location/:category/:id",
            get(resources::handle_resource_detail),
        )
        // Questionnaire & onboarding
        .route(
            "/api/v1/questionnaire",
            get(questionnaire::handle_get_questionnaire),
        )
        .route(
            "/api/v1/onboarding",
            get(questionnaire::handle_get_onboarding),
        )
        .route(
            "/api/v1/onboarding/validate",
            post(questionnaire::handle_validate_step),
        )
        .route(
            "/api/v1/onboarding/complete",
            post(questionnaire::handle_complete_onboarding),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::chat::patterns::{ResponsePicker, FALLBACK_RESPONSES};
    use crate::config::Config;
    use crate::questionnaire::catalog::bundled_questionnaire;
    use crate::resources::catalog::ResourceCatalog;
    use crate::store::memory::MemoryStore;

    fn test_state(enable_demo_tools: bool) -> AppState {
        let store = Arc::new(MemoryStore::new(bundled_questionnaire().unwrap()));
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.enable_demo_tools = enable_demo_tools;
        AppState {
            auth: store.clone(),
            store,
            llm: None,
            catalog: Arc::new(ResourceCatalog::bundled().unwrap()),
            picker: Arc::new(ResponsePicker::new(Some(3))),
            config,
        }
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn signed_in(app: &Router, email: &str) -> String {
        let (status, _) = send(
            app,
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"name": "Test User", "email": email, "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": email, "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["redirect"], "/initial-setup");
        body["token"].as_str().unwrap().to_string()
    }

    fn complete_answers() -> Value {
        json!({
            "1": "2", "2": "no", "3": "no",
            "5": "no",
            "7": "no", "8": "no", "9": "no",
            "11": "no", "12": "no", "13": "no",
            "14": "homeless", "15": "yes", "17": "no"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state(false));
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "carecompass-api");
    }

    #[tokio::test]
    async fn test_chat_without_key_uses_patterns() {
        let app = build_router(test_state(false));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chat",
            None,
            Some(json!({"messages": [{"role": "user", "content": "I need help with rent"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isAIUnavailable"], true);
        assert_eq!(body["emergencyDetected"], false);
        assert!(body.get("emergencyContacts").is_none());
        let text = body["text"].as_str().unwrap();
        assert!(!FALLBACK_RESPONSES.contains(&text));
    }

    #[tokio::test]
    async fn test_chat_flags_emergency() {
        let app = build_router(test_state(false));
        let (_, body) = send(
            &app,
            Method::POST,
            "/api/chat",
            None,
            Some(json!({"messages": [{"role": "user", "content": "I want to kill myself"}]})),
        )
        .await;
        assert_eq!(body["emergencyDetected"], true);
        assert_eq!(body["emergencyContacts"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_chat_failures_use_flat_error_body() {
        let app = build_router(test_state(false));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chat",
            None,
            Some(json!({"messages": []})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"error": "There was an error processing your request. Please try again later."})
        );

        let (status, _) = send(&app, Method::POST, "/api/chat", None, Some(json!({"nope": 1}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_onboarding_requires_login() {
        let app = build_router(test_state(false));
        let (status, body) = send(&app, Method::GET, "/api/v1/onboarding", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["redirect"], "/login?redirect=/onboarding");
    }

    #[tokio::test]
    async fn test_signup_validation_and_duplicates() {
        let app = build_router(test_state(false));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"email": "not-an-email", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"]["message"],
            "Please enter a valid email address (e.g., name@example.com)"
        );

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"email": "ana@example.com", "password": "123"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        signed_in(&app, "ana@example.com").await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"email": " ANA@example.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let app = build_router(test_state(false));
        signed_in(&app, "ana@example.com").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": "wrong-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_onboarding_to_personalised_dashboard() {
        let app = build_router(test_state(false));
        let token = signed_in(&app, "maria@example.com").await;

        let (status, body) = send(&app, Method::GET, "/api/v1/dashboard", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["needs_onboarding"], true);
        assert_eq!(body["redirect"], "/initial-setup");

        let (_, view) = send(&app, Method::GET, "/api/v1/onboarding", Some(&token), None).await;
        assert_eq!(view["state"], "in_progress");
        let steps = view["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[5]["title"], "Confirmation");

        let (_, check) = send(
            &app,
            Method::POST,
            "/api/v1/onboarding/validate",
            None,
            Some(json!({"step": 0, "responses": {"1": "2", "2": "no", "3": "yes"}})),
        )
        .await;
        assert_eq!(check["can_advance"], false);
        assert_eq!(check["missing_required"], json!([4]));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/onboarding/complete",
            Some(&token),
            Some(json!({"responses": {"1": "2"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "ONBOARDING_INCOMPLETE");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/onboarding/complete",
            Some(&token),
            Some(json!({"responses": complete_answers()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "done");
        assert_eq!(body["redirect"], "/dashboard");
        assert_eq!(body["saved_responses"], 13);

        let (_, profile) = send(&app, Method::GET, "/api/v1/profile", Some(&token), None).await;
        assert_eq!(profile["housing_status"], "homeless");
        assert_eq!(profile["has_children"], false);

        let (status, dashboard) =
            send(&app, Method::GET, "/api/v1/dashboard", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["location"], "nyc");
        let housing = dashboard["resources"]["housing"].as_array().unwrap();
        assert!(housing.iter().all(|r| r["high_priority"] == true));

        let (_, login) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "maria@example.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(login["redirect"], "/dashboard");

        let (_, view) = send(&app, Method::GET, "/api/v1/onboarding", Some(&token), None).await;
        assert_eq!(view["state"], "done");
    }

    #[tokio::test]
    async fn test_preview_dashboard_has_no_badges() {
        let app = build_router(test_state(false));
        let (status, body) = send(
            &app,
            Method::GET,
            "/api/v1/dashboard?location=boston&preview=true",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"], "boston");
        assert_eq!(body["catalog_location"], "boston");
        for bucket in ["emergency", "housing", "healthcare", "food"] {
            for r in body["resources"][bucket].as_array().unwrap() {
                assert_eq!(r["high_priority"], false);
            }
        }
    }

    #[tokio::test]
    async fn test_dashboard_unknown_location_serves_nyc_data() {
        let app = build_router(test_state(false));
        let (_, body) =
            send(&app, Method::GET, "/api/v1/dashboard?location=miami", None, None).await;
        assert_eq!(body["location"], "miami");
        assert_eq!(body["location_name"], "Miami");
        assert_eq!(body["catalog_location"], "nyc");
    }

    #[tokio::test]
    async fn test_resource_detail_and_related() {
        let app = build_router(test_state(false));
        let (status, body) =
            send(&app, Method::GET, "/api/v1/resources/nyc/food/1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resource"]["id"], 1);
        assert_eq!(body["related"].as_array().unwrap().len(), 3);

        let (status, _) =
            send(&app, Method::GET, "/api/v1/resources/nyc/food/999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) =
            send(&app, Method::GET, "/api/v1/resources/nyc/transit/1", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_locations_listed() {
        let app = build_router(test_state(false));
        let (_, body) = send(&app, Method::GET, "/api/v1/locations", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 5);
        assert_eq!(body[0], json!({"id": "nyc", "name": "New York City"}));
    }

    #[tokio::test]
    async fn test_mock_user_gated_and_resettable() {
        let disabled = build_router(test_state(false));
        let (status, _) = send(&disabled, Method::POST, "/api/v1/admin/mock-user", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let app = build_router(test_state(true));
        let (_, first) = send(&app, Method::POST, "/api/v1/admin/mock-user", None, None).await;
        assert_eq!(first["created"], true);
        let (_, second) = send(&app, Method::POST, "/api/v1/admin/mock-user", None, None).await;
        assert_eq!(second["created"], false);
        assert_eq!(second["user_id"], first["user_id"]);

        let (status, login) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "hofhackathon@nyu.edu", "password": "HelloWorld"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(login["redirect"], "/initial-setup");
    }

    #[tokio::test]
    async fn test_profile_preferences_and_account_deletion() {
        let app = build_router(test_state(false));
        let token = signed_in(&app, "lee@example.com").await;

        let (_, profile) = send(&app, Method::GET, "/api/v1/profile", Some(&token), None).await;
        assert_eq!(profile["name"], "Test User");
        assert_eq!(profile["location"], "nyc");

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/v1/preferences",
            Some(&token),
            Some(json!({"location": "atlantis"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, profile) = send(
            &app,
            Method::PUT,
            "/api/v1/preferences",
            Some(&token),
            Some(json!({"location": "boston", "food_security": "often"})),
        )
        .await;
        assert_eq!(profile["location"], "boston");
        assert_eq!(profile["food_security"], "often");

        let (status, profile) = send(
            &app,
            Method::PUT,
            "/api/v1/needs",
            Some(&token),
            Some(json!({"housing_status": "temporary", "has_children": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["housing_status"], "temporary");
        assert_eq!(profile["location"], "boston");

        let (_, saved) = send(
            &app,
            Method::PUT,
            "/api/v1/profile/responses",
            Some(&token),
            Some(json!({"responses": [
                {"question_id": 9, "response": "yes"},
                {"question_id": 10, "response": ""}
            ]})),
        )
        .await;
        assert_eq!(saved["saved_responses"], 1);

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/v1/profile/responses",
            Some(&token),
            Some(json!({"responses": [{"question_id": 999, "response": "yes"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(&app, Method::DELETE, "/api/v1/account", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, "/api/v1/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let app = build_router(test_state(false));
        let token = signed_in(&app, "kim@example.com").await;
        let (status, _) = send(&app, Method::POST, "/api/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, Method::GET, "/api/v1/chat/history", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["redirect"], "/login?redirect=/chat/history");
    }

    async fn onboarded(app: &Router, email: &str) -> String {
        let token = signed_in(app, email).await;
        let (status, _) = send(
            app,
            Method::POST,
            "/api/v1/onboarding/complete",
            Some(&token),
            Some(json!({"responses": complete_answers()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        token
    }

    #[tokio::test]
    async fn test_signed_in_user_can_switch_dashboard_location() {
        let app = build_router(test_state(false));
        let token = onboarded(&app, "sam@example.com").await;

        let (_, home) = send(&app, Method::GET, "/api/v1/dashboard", Some(&token), None).await;
        assert_eq!(home["location"], "nyc");

        let (status, switched) = send(
            &app,
            Method::GET,
            "/api/v1/dashboard?location=boston",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(switched["location"], "boston");
        assert_eq!(switched["catalog_location"], "boston");
        assert_eq!(switched["resources"]["food"][0]["location"], "boston");

        // The saved preference is unchanged.
        let (_, profile) = send(&app, Method::GET, "/api/v1/profile", Some(&token), None).await;
        assert_eq!(profile["location"], "nyc");
    }

    #[tokio::test]
    async fn test_completion_rejects_unknown_question_ids() {
        let app = build_router(test_state(false));
        let token = signed_in(&app, "ivy@example.com").await;

        let mut answers = complete_answers();
        answers["999"] = json!("yes");
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/onboarding/complete",
            Some(&token),
            Some(json!({"responses": answers})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (_, view) = send(&app, Method::GET, "/api/v1/onboarding", Some(&token), None).await;
        assert_eq!(view["state"], "in_progress");
        assert_eq!(view["responses"], json!({}));
    }

    #[tokio::test]
    async fn test_chat_records_turn_for_session_user_not_claimed_id() {
        let app = build_router(test_state(false));
        let ana = signed_in(&app, "ana@example.com").await;
        let bob = signed_in(&app, "bob@example.com").await;

        let (_, login) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "bob@example.com", "password": "secret1"})),
        )
        .await;
        let bob_id = login["user_id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/chat",
            Some(&ana),
            Some(json!({
                "messages": [{"role": "user", "content": "I need food"}],
                "userId": bob_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, bob_history) =
            send(&app, Method::GET, "/api/v1/chat/history", Some(&bob), None).await;
        assert_eq!(bob_history, json!([]));

        let (_, ana_history) =
            send(&app, Method::GET, "/api/v1/chat/history", Some(&ana), None).await;
        let messages = ana_history.as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["content"], "I need food");
    }
}
