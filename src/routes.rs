// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{data, progress, questions, quiz, reading},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Nests the sub-routers (quiz, questions, reading, progress, data).
/// * Applies global middleware (Trace, CORS).
/// * Injects the shared [`AppState`].
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://localhost:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/", get(quiz::get_quiz))
        .route("/load", post(quiz::load_questions))
        .route("/start", post(quiz::start))
        .route("/pause", post(quiz::pause))
        .route("/resume", post(quiz::resume))
        .route("/next", post(quiz::next))
        .route("/previous", post(quiz::previous))
        .route("/answer", post(quiz::answer))
        .route("/regenerate", post(quiz::regenerate))
        .route("/hint", post(quiz::hint))
        .route("/explanation", post(quiz::explanation))
        .route("/complete", post(quiz::complete))
        .route(
            "/snapshot/{topic}",
            get(quiz::get_snapshot).delete(quiz::discard_snapshot),
        )
        .route("/snapshot/{topic}/resume", post(quiz::resume_snapshot));

    let question_routes = Router::new()
        .route("/", get(questions::list_questions))
        .route("/generate", post(questions::generate_questions))
        .route("/count/{topic}", get(questions::count_questions))
        .route(
            "/{id}",
            get(questions::get_question).delete(questions::delete_question),
        )
        .route("/{id}/bookmark", put(questions::toggle_bookmark));

    let reading_routes = Router::new()
        .route("/", get(reading::list_materials))
        .route("/generate", post(reading::generate_material))
        .route("/bookmarked", get(reading::list_bookmarked))
        .route("/topics/{topic}", delete(reading::delete_topic_materials))
        .route(
            "/{id}",
            get(reading::get_material).delete(reading::delete_material),
        )
        .route("/{id}/bookmark", put(reading::toggle_bookmark))
        .route("/{id}/read", post(reading::mark_read));

    let progress_routes = Router::new()
        .route("/", get(progress::get_progress))
        .route("/sessions", get(progress::list_sessions));

    let data_routes = Router::new()
        .route("/stats", get(data::stats))
        .route("/clear-all", post(data::clear_all))
        .route("/reset-all", post(data::reset_all))
        .route("/cleanup", post(data::cleanup))
        .route(
            "/topics/{topic}",
            get(data::topic_stats).delete(data::delete_topic),
        )
        .route("/topics/{topic}/reset", post(data::reset_topic));

    Router::new()
        .nest("/api/quiz", quiz_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/reading-materials", reading_routes)
        .nest("/api/progress", progress_routes)
        .nest("/api/data", data_routes)
        // Applied from top to bottom
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
