use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ai::QuestionGenerator;
use crate::config::AppConfig;
use crate::database::Store;
use crate::email::Mailer;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{api_rate_limit, auth_rate_limit, jwt_auth_middleware, require_admin, RateLimiters};
use crate::storage::ObjectStore;

/// Shared dependencies handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub objects: Arc<dyn ObjectStore>,
    pub generator: Arc<dyn QuestionGenerator>,
    pub mailer: Arc<dyn Mailer>,
    pub limiters: Arc<RateLimiters>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        objects: Arc<dyn ObjectStore>,
        generator: Arc<dyn QuestionGenerator>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let limiters = Arc::new(RateLimiters::from_config(&config.api));
        Self {
            config: Arc::new(config),
            store,
            objects,
            generator,
            mailer,
            limiters,
        }
    }
}

/// Full HTTP surface: public routes, JWT-protected `/api` routes and the admin-only version endpoints
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);
    let json_limit = state.config.api.max_request_size_bytes;

    let api = Router::new()
        .merge(auth_public_routes(&state))
        .merge(app_version_routes(&state))
        .merge(protected_routes(&state))
        .merge(upload_routes(&state))
        .layer(middleware::from_fn_with_state(state.clone(), api_rate_limit));

    Router::new()
        .route("/", get(public::health::root))
        .route("/health", get(public::health::get))
        .merge(api)
        .fallback(public::health::not_found)
        .layer(DefaultBodyLimit::max(json_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| o.parse().ok())
        .collect();
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn auth_public_routes(state: &AppState) -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/resend-otp", post(auth::resend_otp))
        .route("/api/auth/verify-otp", post(auth::verify_otp))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .layer(middleware::from_fn_with_state(state.clone(), auth_rate_limit))
}

/// Public update check and admin writes share one path, so the admin guard sits on the method
fn app_version_routes(state: &AppState) -> Router<AppState> {
    let admin_put = put(elevated::app_version::put)
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route("/api/app/version", get(public::app_version::get).merge(admin_put))
        .route(
            "/api/app/version/config",
            get(elevated::app_version::config_get)
                .route_layer(middleware::from_fn(require_admin))
                .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware)),
        )
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    use protected::{auth, divisions, lesson_plans, mcq, mcq_student, profile, standards, students, uploads};

    Router::new()
        // Account
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/change-password", put(auth::change_password))
        .route("/api/profile/change-password", put(auth::change_password))
        .route("/api/profile/profile", get(profile::get).put(profile::put))
        .route("/api/profile/settings", get(profile::settings_get).put(profile::settings_put))
        .route("/api/profile/profile-picture", delete(profile::picture_delete))
        // Class hierarchy
        .route("/api/standards", get(standards::list).post(standards::post))
        .route(
            "/api/standards/:id",
            get(standards::get).put(standards::put).delete(standards::delete),
        )
        .route("/api/divisions", post(divisions::post))
        .route("/api/divisions/by-standard/:standard_id", get(divisions::list_by_standard))
        .route(
            "/api/divisions/:id",
            get(divisions::get).put(divisions::put).delete(divisions::delete),
        )
        .route("/api/students", get(students::list).post(students::post))
        .route("/api/students/import", post(students::import))
        .route("/api/students/by-standard/:standard_id", get(students::list_by_standard))
        .route("/api/students/by-division/:division_id", get(students::list_by_division))
        .route(
            "/api/students/:id",
            get(students::get).put(students::put).delete(students::delete),
        )
        // Uploads (metadata)
        .route("/api/uploads/student/:student_id", get(uploads::list_for_student))
        .route("/api/uploads/:id", get(uploads::get).put(uploads::put).delete(uploads::delete))
        // Lesson plans
        .route("/api/lesson-plans", get(lesson_plans::list).post(lesson_plans::post))
        .route("/api/lesson-plans/today", get(lesson_plans::today))
        .route(
            "/api/lesson-plans/:id",
            get(lesson_plans::get).put(lesson_plans::put).delete(lesson_plans::delete),
        )
        .route("/api/lesson-plans/:id/toggle-completion", patch(lesson_plans::toggle_completion))
        .route("/api/lesson-plans/:id/material", delete(lesson_plans::remove_material))
        // MCQ authoring
        .route("/api/mcq/status", get(mcq::status))
        .route("/api/mcq/save", post(mcq::save))
        .route("/api/mcq/standard/:standard_id", get(mcq::list_by_standard))
        .route("/api/mcq/:id", get(mcq::get).put(mcq::put).delete(mcq::delete))
        // Test taking
        .route(
            "/api/mcq-student/student/:student_id/available-tests",
            get(mcq_student::available_tests),
        )
        .route("/api/mcq-student/student/:student_id/test-history", get(mcq_student::history))
        .route("/api/mcq-student/student/test/:mcq_id", get(mcq_student::test_for_student))
        .route("/api/mcq-student/student/submit-test", post(mcq_student::submit))
        .route("/api/mcq-student/student/test-result/:submission_id", get(mcq_student::result))
        .route("/api/mcq-student/teacher/test-results/:mcq_id", get(mcq_student::teacher_results))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware))
}

/// Multipart routes get a body limit sized for a full set of files
fn upload_routes(state: &AppState) -> Router<AppState> {
    use protected::{lesson_plans, mcq, profile, students, uploads};

    let api = &state.config.api;
    let limit = api.max_upload_size_bytes.saturating_mul(api.max_files_per_request.max(1)) + 1024 * 1024;

    Router::new()
        .route("/api/profile/upload-profile-picture", post(profile::picture_post))
        .route("/api/students/:id/profile-picture", post(students::picture_post))
        .route("/api/uploads", post(uploads::post))
        .route("/api/lesson-plans/upload-material", post(lesson_plans::upload_material))
        .route("/api/mcq/generate", post(mcq::generate))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware))
        .layer(DefaultBodyLimit::max(limit))
}
