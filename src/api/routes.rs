use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Multipart framing on top of the file bytes
    let upload_limit = state.config.max_upload_size as usize + 64 * 1024;

    let mut router = Router::new()
        // Upload & serving
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/picgo/upload",
            post(handlers::picgo_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/file/:id", get(handlers::serve_file))
        // Accounts
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/user", get(handlers::current_user))
        .route("/api/auth/profile", get(handlers::profile))
        .route("/api/auth/avatar", put(handlers::update_avatar))
        // Images
        .route("/api/images", get(handlers::list_images))
        .route("/api/images/search", get(handlers::search_images))
        .route(
            "/api/images/:id",
            put(handlers::update_image).delete(handlers::delete_image),
        )
        // Favorites
        .route("/api/favorites", get(handlers::list_favorites))
        .route("/api/favorites/batch", post(handlers::batch_favorites))
        .route(
            "/api/favorites/:id",
            post(handlers::add_favorite).delete(handlers::remove_favorite),
        )
        .route("/api/favorites/:id/status", get(handlers::favorite_status))
        // Tags
        .route(
            "/api/tags",
            get(handlers::list_tags).post(handlers::create_tag),
        )
        .route("/api/tags/batch", post(handlers::batch_tags))
        .route(
            "/api/tags/:id",
            put(handlers::update_tag).delete(handlers::delete_tag),
        )
        .route("/api/tags/:id/images", get(handlers::tag_images))
        // Shares
        .route(
            "/api/shares",
            get(handlers::list_shares).post(handlers::create_share),
        )
        .route(
            "/api/shares/:id",
            get(handlers::get_share_info).delete(handlers::delete_share),
        )
        .route("/api/shares/:id/access", post(handlers::access_share))
        // Internal
        .route("/_internal/health", get(handlers::health));

    // Moderation routes
    if state.config.auth.admin.is_some() {
        router = router
            .route("/api/manage/list", get(handlers::manage_list))
            .route("/api/manage/block/:id", post(handlers::manage_block))
            .route("/api/manage/white/:id", post(handlers::manage_white))
            .route("/api/manage/label/:id", put(handlers::manage_label))
            .route("/api/manage/delete/:id", delete(handlers::manage_delete));
    } else {
        tracing::info!("ADMIN_USERNAME/ADMIN_PASSWORD not set; moderation routes are disabled");
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
