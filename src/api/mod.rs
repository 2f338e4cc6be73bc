// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{authenticate, BEARER_AUTH},
    models::{CreateUserRequest, ErrorResponse, User},
    state::AppState,
};

pub mod health;
pub mod users;

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let user_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{userId}", get(users::get_user))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .merge(user_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Registers the bearer token scheme the operations refer to.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            BEARER_AUTH,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        users::list_users,
        users::get_user,
        users::create_user,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            User,
            CreateUserRequest,
            ErrorResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "User management"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, Response},
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::auth::provider::testing::StubProvider;
    use crate::auth::{
        LocalIdentityProvider, OperationRegistry, RequiredClaims, TokenSubject, TokenVerifier,
    };
    use crate::storage::{RedbUserRepository, UserId, UserRepository};

    const SECRET: &[u8] = b"router-test-secret-0123456789abcdef";

    struct TestApp {
        app: Router,
        tokens: Arc<LocalIdentityProvider>,
        users: RedbUserRepository,
        _dir: TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let users = RedbUserRepository::open_in(dir.path()).expect("Failed to open store");
            let tokens =
                Arc::new(LocalIdentityProvider::new(SECRET, Duration::from_secs(600)).unwrap());
            let operations = OperationRegistry::from_openapi(&ApiDoc::openapi()).unwrap();

            let state = AppState::new(
                TokenVerifier::new(tokens.clone()),
                Arc::new(users.clone()),
                operations,
            );

            Self {
                app: router(state, Duration::from_secs(5)),
                tokens,
                users,
                _dir: dir,
            }
        }

        fn token(&self, permissions: &[&str]) -> String {
            self.tokens
                .issue_token(&TokenSubject::developer("dev-1"), permissions)
                .unwrap()
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            bearer: Option<&str>,
            body: Option<Value>,
        ) -> Response<Body> {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = bearer {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };
            self.app
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap()
        }
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn new_user() -> Value {
        json!({"name": "Ivan", "email": "ivan@example.com", "password": "hunter2"})
    }

    #[test]
    fn contract_declares_write_claim_for_create() {
        let registry = OperationRegistry::from_openapi(&ApiDoc::openapi()).unwrap();

        assert_eq!(
            registry.required_claims(&Method::POST, Some("/users")).unwrap(),
            &RequiredClaims::new([users::WRITE_CLAIM])
        );
        assert!(registry
            .required_claims(&Method::GET, Some("/users"))
            .unwrap()
            .is_empty());
        assert!(registry
            .required_claims(&Method::GET, Some("/users/{userId}"))
            .unwrap()
            .is_empty());
        assert!(registry
            .required_claims(&Method::GET, Some("/health"))
            .is_err());
    }

    #[test]
    fn contract_registers_bearer_scheme() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert_eq!(
            doc["components"]["securitySchemes"][BEARER_AUTH]["scheme"],
            "bearer"
        );
    }

    #[tokio::test]
    async fn rejected_token_returns_401_with_generic_message() {
        let app = TestApp::new();
        let response = app
            .send(Method::GET, "/users", Some("abc.def.ghi"), None)
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_string(response).await,
            r#"{"message":"Please provide valid credentials"}"#
        );
    }

    #[tokio::test]
    async fn missing_header_returns_401() {
        let app = TestApp::new();
        let response = app.send(Method::POST, "/users", None, Some(new_user())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(app.users.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writer_creates_user_with_generated_id() {
        let app = TestApp::new();
        let token = app.token(&[users::WRITE_CLAIM]);

        let response = app
            .send(Method::POST, "/users", Some(&token), Some(new_user()))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_string(response).await, "");

        let stored = app.users.list_users().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Ivan");
        assert_eq!(stored[0].password, "hunter2");
        assert!(uuid::Uuid::parse_str(stored[0].id.as_str()).is_ok());
    }

    #[tokio::test]
    async fn reader_cannot_create_user() {
        let app = TestApp::new();
        let token = app.token(&[]);

        let response = app
            .send(Method::POST, "/users", Some(&token), Some(new_user()))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_string(response).await,
            r#"{"message":"Insufficient permissions for this operation"}"#
        );
        assert!(app.users.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_client_id_returns_409() {
        let app = TestApp::new();
        let token = app.token(&[users::WRITE_CLAIM]);
        let mut body = new_user();
        body["id"] = json!("42");

        let first = app
            .send(Method::POST, "/users", Some(&token), Some(body.clone()))
            .await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .send(Method::POST, "/users", Some(&token), Some(body))
            .await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(app.users.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_or_blank_body_returns_400() {
        let app = TestApp::new();
        let token = app.token(&[users::WRITE_CLAIM]);

        let response = app
            .send(Method::POST, "/users", Some(&token), Some(json!({"name": "Ivan"})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut blank = new_user();
        blank["email"] = json!("  ");
        let response = app
            .send(Method::POST, "/users", Some(&token), Some(blank))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut bad_id = new_user();
        bad_id["id"] = json!("a/b");
        let response = app
            .send(Method::POST, "/users", Some(&token), Some(bad_id))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert!(app.users.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reader_can_list_and_fetch_users() {
        let app = TestApp::new();
        let writer = app.token(&[users::WRITE_CLAIM]);
        let reader = app.token(&[]);
        let mut body = new_user();
        body["id"] = json!("7");
        app.send(Method::POST, "/users", Some(&writer), Some(body))
            .await;

        let response = app.send(Method::GET, "/users", Some(&reader), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let list: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["id"], "7");
        assert!(list[0].get("password").is_none());

        let response = app.send(Method::GET, "/users/7", Some(&reader), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let user: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(user["email"], "ivan@example.com");

        let response = app
            .send(Method::GET, "/users/missing", Some(&reader), None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_user_requires_credentials() {
        let app = TestApp::new();
        app.users
            .add_user(crate::storage::UserRecord {
                id: UserId::parse("7").unwrap(),
                name: "Ivan".to_string(),
                email: "ivan@example.com".to_string(),
                password: "p".to_string(),
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let response = app.send(Method::GET, "/users/7", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn request_deadline_cancels_slow_verification() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let users = RedbUserRepository::open_in(dir.path()).expect("Failed to open store");
        let provider = Arc::new(StubProvider::slow(
            "slow-token",
            json!({"sub": "dev-1", "email": "d@x.com", "role": "developer", "name": "Dev"}),
            Duration::from_millis(500),
        ));
        let state = AppState::new(
            TokenVerifier::new(provider.clone()),
            Arc::new(users),
            OperationRegistry::from_openapi(&ApiDoc::openapi()).unwrap(),
        );
        let app = router(state, Duration::from_millis(50));

        let request = Request::builder()
            .uri("/users")
            .header(header::AUTHORIZATION, "Bearer slow-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.completed(), 0);
    }

    #[tokio::test]
    async fn health_routes_need_no_credentials() {
        let app = TestApp::new();

        let response = app.send(Method::GET, "/health/live", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.send(Method::GET, "/health/ready", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let ready: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(ready["checks"]["store"], "ok");
        assert_eq!(ready["checks"]["identity_provider"], "ok");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = TestApp::new();
        let response = app
            .send(Method::GET, "/api-doc/openapi.json", None, None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(doc["paths"]["/users/{userId}"]["get"].is_object());
    }
}
