// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, dashboard, profile, quiz},
    state::AppState,
    utils::{
        jwt::auth_middleware,
        roles::{require_admin, require_student, require_teacher},
    },
};

/// Assembles the main application router.
///
/// * Public routes: login, registration, roles, fun fact.
/// * Session routes: dashboard redirect and profile.
/// * Role routes: `/admin`, `/staff` and `/student`, each behind auth then a role gate.
///   Both gates redirect to `/login` instead of erroring.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().expect("valid origin"),
            "http://127.0.0.1:3000".parse().expect("valid origin"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .allow_credentials(true);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let public_routes = Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/register", post(auth::register))
        .route("/roles", get(auth::list_roles))
        .route("/fact", get(dashboard::fun_fact));

    let session_routes = Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/profile", get(profile::get_me).put(profile::update_me))
        .route_layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/dashboard", get(dashboard::admin_dashboard))
        // Auth first, then the role check
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(auth_layer.clone());

    let staff_routes = Router::new()
        .route("/dashboard", get(dashboard::staff_dashboard))
        .route("/quizzes", get(quiz::list_my_quizzes))
        .route("/quizzes/generate", post(quiz::generate_quiz))
        .route("/quizzes/{id}/results", get(quiz::quiz_results))
        .route_layer(middleware::from_fn(require_teacher))
        .route_layer(auth_layer.clone());

    let student_routes = Router::new()
        .route("/dashboard", get(dashboard::student_dashboard))
        .route("/quizzes", get(quiz::list_quizzes))
        .route("/quizzes/{id}", get(quiz::get_quiz))
        .route("/quizzes/{id}/submit", post(quiz::submit_quiz))
        .route("/history", get(quiz::history))
        .route("/history/{id}", get(quiz::attempt_detail))
        .route_layer(middleware::from_fn(require_student))
        .route_layer(auth_layer);

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .nest("/admin", admin_routes)
        .nest("/staff", staff_routes)
        .nest("/student", student_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
