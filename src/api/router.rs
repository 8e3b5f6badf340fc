//! REST API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Extension(ApiContext) → 2. Auth validator → 3. Audit logger

use std::sync::Arc;

use axum::http::header::{HeaderValue, CACHE_CONTROL};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router over shared state.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub(crate) fn build_router(ctx: ApiContext) -> Router {
    // Layers apply bottom (outermost) to top (innermost). `.with_state()`
    // turns Router<ApiContext> into Router<()> so the from_fn layers fit.
    // Path params use `:param` syntax (axum 0.7).
    let protected = Router::new()
        .route("/auth/me", get(endpoints::auth::me))
        .route("/auth/password", put(endpoints::auth::change_password))
        .merge(user_routes())
        .merge(patient_routes())
        .merge(doctor_routes())
        .merge(medicine_routes())
        .merge(registration_routes())
        .merge(payment_routes())
        .merge(feedback_routes())
        .route("/dashboard/stats", get(endpoints::dashboard::stats))
        .route("/dashboard/time-series", get(endpoints::dashboard::time_series))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    let public = Router::new()
        .route("/auth/login", post(endpoints::auth::login))
        .route("/auth/check-username", get(endpoints::auth::check_username))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", public)
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
}

fn user_routes() -> Router<ApiContext> {
    use endpoints::users;
    Router::new()
        .route("/users", post(users::create).get(users::list))
        .route("/users/by-role", get(users::by_role))
        .route("/users/search", get(users::search))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/users/:id/toggle-status", put(users::toggle_status))
        .route("/users/:id/reset-password", put(users::reset_password))
}

fn patient_routes() -> Router<ApiContext> {
    use endpoints::patients;
    Router::new()
        .route("/patients", post(patients::create).get(patients::list))
        .route("/patients/search", get(patients::search))
        .route("/patients/by-idcard", get(patients::by_id_card))
        .route(
            "/patients/:id",
            get(patients::get).put(patients::update).delete(patients::delete),
        )
}

fn doctor_routes() -> Router<ApiContext> {
    use endpoints::doctors;
    Router::new()
        .route("/doctors", post(doctors::create).get(doctors::list))
        .route("/doctors/search", get(doctors::search))
        .route("/doctors/by-department", get(doctors::by_department))
        .route("/doctors/departments", get(doctors::departments))
        .route("/doctors/available", get(doctors::available))
        .route(
            "/doctors/:id",
            get(doctors::get).put(doctors::update).delete(doctors::delete),
        )
}

fn medicine_routes() -> Router<ApiContext> {
    use endpoints::medicines;
    Router::new()
        .route("/medicines", post(medicines::create).get(medicines::list))
        .route("/medicines/search", get(medicines::search))
        .route("/medicines/by-code", get(medicines::by_code))
        .route("/medicines/low-stock", get(medicines::low_stock))
        .route("/medicines/init-common-medicines", post(medicines::init_common))
        .route(
            "/medicines/:id",
            get(medicines::get).put(medicines::update).delete(medicines::delete),
        )
        .route("/medicines/:id/stock", put(medicines::update_stock))
}

fn registration_routes() -> Router<ApiContext> {
    use endpoints::registrations;
    Router::new()
        .route(
            "/registrations",
            post(registrations::create).get(registrations::list),
        )
        .route("/registrations/statistics/today", get(registrations::today_stats))
        .route("/registrations/patient/:id", get(registrations::by_patient))
        .route("/registrations/doctor/:id", get(registrations::by_doctor))
        .route(
            "/registrations/:id",
            get(registrations::get)
                .put(registrations::update)
                .delete(registrations::delete),
        )
        .route("/registrations/:id/status", put(registrations::update_status))
}

fn payment_routes() -> Router<ApiContext> {
    use endpoints::payments;
    Router::new()
        .route("/payments", post(payments::create).get(payments::list))
        .route("/payments/statistics/today", get(payments::today_stats))
        .route("/payments/revenue", get(payments::revenue))
        .route("/payments/patient/:id", get(payments::by_patient))
        .route(
            "/payments/:id",
            get(payments::get).put(payments::update).delete(payments::delete),
        )
        .route("/payments/:id/status", put(payments::update_status))
        .route("/payments/:id/pay", put(payments::pay))
        .route("/payments/:id/refund", put(payments::refund))
}

fn feedback_routes() -> Router<ApiContext> {
    use endpoints::feedback;
    Router::new()
        .route("/feedbacks", post(feedback::create).get(feedback::list))
        .route("/feedbacks/statistics", get(feedback::statistics))
        .route("/feedbacks/search", get(feedback::search))
        .route("/feedbacks/status/:status", get(feedback::by_status))
        .route("/feedbacks/type/:type", get(feedback::by_type))
        .route(
            "/feedbacks/:id",
            get(feedback::get).delete(feedback::delete),
        )
        .route("/feedbacks/:id/process", put(feedback::process))
        .route("/feedbacks/:id/close", put(feedback::close))
        .route("/feedbacks/:id/status", put(feedback::update_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;

    /// CoreState over a temp database with the default accounts seeded.
    /// The tempdir guard must outlive the test.
    fn test_core() -> (Arc<CoreState>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
            db_path: tmp.path().join("hospital.db"),
            token_secret: Some("router-test-secret-0123456789abcdef".into()),
            token_ttl_secs: 3600,
            password_iterations: 1_000,
            seed_users: true,
        };
        (Arc::new(CoreState::initialize(&config).unwrap()), tmp)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &Router, username: &str) -> String {
        let req = request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": "admin123" })),
        );
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        json["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (core, _tmp) = test_core();
        let app = api_router(core);

        let response = app.oneshot(request("GET", "/api/health", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["database"], true);
    }

    #[tokio::test]
    async fn protected_route_requires_token() {
        let (core, _tmp) = test_core();
        let app = api_router(core);

        let response = app
            .clone()
            .oneshot(request("GET", "/api/patients", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);

        let response = app
            .oneshot(request("GET", "/api/patients", Some("not-a-token"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_generically() {
        let (core, _tmp) = test_core();
        let app = api_router(core);

        let req = request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong" })),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn me_returns_caller_without_password() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let token = login(&app, "staff1").await;

        let response = app
            .oneshot(request("GET", "/api/auth/me", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["username"], "staff1");
        assert_eq!(json["data"]["role"], "STAFF");
        assert!(json["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn staff_cannot_reach_admin_routes() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let token = login(&app, "staff1").await;

        let response = app
            .clone()
            .oneshot(request("GET", "/api/users", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Staff may still list doctors.
        let response = app
            .oneshot(request("GET", "/api/doctors", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_patient_returns_field_errors() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let token = login(&app, "admin").await;

        let req = request(
            "POST",
            "/api/patients",
            Some(&token),
            Some(json!({ "name": "X", "gender": "MALE", "birthDate": "1990-01-01" })),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Validation failed");
        assert!(json["errors"]["name"].is_string());
        assert!(json["errors"]["idCard"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let token = login(&app, "admin").await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/patients")
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn patient_create_then_find_by_id_card() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let token = login(&app, "staff1").await;

        let req = request(
            "POST",
            "/api/patients",
            Some(&token),
            Some(json!({
                "name": "Li Na",
                "gender": "FEMALE",
                "birthDate": "1990-05-17",
                "idCard": "110105199005170022",
                "phone": "13800138000"
            })),
        );
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request(
                "GET",
                "/api/patients/by-idcard?idCard=110105199005170022",
                Some(&token),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["name"], "Li Na");

        let response = app
            .oneshot(request("GET", "/api/patients?page=0&size=10", Some(&token), None))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["totalElements"], 1);
    }

    #[tokio::test]
    async fn missing_entity_is_bad_request_envelope() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let token = login(&app, "admin").await;

        let response = app
            .oneshot(request("GET", "/api/doctors/999", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("999"));
    }

    #[tokio::test]
    async fn unknown_status_is_validation_error() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let token = login(&app, "admin").await;

        let response = app
            .oneshot(request("GET", "/api/feedbacks/status/DONE", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["errors"]["status"].is_string());
    }

    #[tokio::test]
    async fn check_username_reports_availability() {
        let (core, _tmp) = test_core();
        let app = api_router(core);

        let response = app
            .clone()
            .oneshot(request("GET", "/api/auth/check-username?username=admin", None, None))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["data"], false);

        let response = app
            .oneshot(request("GET", "/api/auth/check-username?username=nobody", None, None))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["data"], true);
    }

    #[tokio::test]
    async fn common_medicines_import_is_admin_only() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let staff = login(&app, "staff1").await;
        let admin = login(&app, "admin").await;

        let response = app
            .clone()
            .oneshot(request("POST", "/api/medicines/init-common-medicines", Some(&staff), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(request("POST", "/api/medicines/init-common-medicines", Some(&admin), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request("GET", "/api/medicines/low-stock?threshold=100000", Some(&staff), None))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 10);
    }

    async fn try_login(app: &Router, username: &str, password: &str) -> StatusCode {
        let req = request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        );
        app.clone().oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn password_writes_round_trip_through_login() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let admin = login(&app, "admin").await;

        let req = request(
            "POST",
            "/api/users",
            Some(&admin),
            Some(json!({
                "username": "nurse01",
                "password": "secret1",
                "realName": "Wang Fang",
                "role": "STAFF"
            })),
        );
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let nurse_id = body_json(response).await["data"]["id"].as_i64().unwrap();

        assert_eq!(try_login(&app, "nurse01", "secret1").await, StatusCode::OK);
        assert_eq!(try_login(&app, "ghost", "secret1").await, StatusCode::BAD_REQUEST);

        let req = request(
            "PUT",
            &format!("/api/users/{nurse_id}/reset-password"),
            Some(&admin),
            Some(json!({ "newPassword": "secret2" })),
        );
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);
        assert_eq!(try_login(&app, "nurse01", "secret1").await, StatusCode::BAD_REQUEST);
        assert_eq!(try_login(&app, "nurse01", "secret2").await, StatusCode::OK);

        let staff = login(&app, "staff1").await;
        let req = request(
            "PUT",
            "/api/auth/password",
            Some(&staff),
            Some(json!({ "oldPassword": "admin123", "newPassword": "changed9" })),
        );
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);
        assert_eq!(try_login(&app, "staff1", "changed9").await, StatusCode::OK);
    }
}
