use super::{handlers, state::AppState};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route(
            "/upload",
            post(handlers::upload_handler).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
        .route("/list", get(handlers::list_files_handler))
        .route(
            "/upload-and-ask",
            post(handlers::upload_and_ask_handler).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
        .route("/kb-ask", post(handlers::kb_ask_handler))
        .route("/history", get(handlers::history_handler))
        .route("/history/{id}", delete(handlers::delete_history_handler))
        .route("/save-chat-turn", post(handlers::save_chat_turn_handler))
        .route("/chat-history", get(handlers::chat_history_handler))
        .route("/conversations", get(handlers::conversations_handler))
        .route(
            "/conversations/{id}",
            delete(handlers::delete_conversation_handler),
        )
        .route("/delete/{id}", delete(handlers::delete_document_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
