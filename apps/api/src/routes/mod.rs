pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::feeds::handlers as feeds;
use crate::library;
use crate::state::AppState;
use crate::swipes;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Feeds & market data
        .route("/api/v1/feed/trending", get(feeds::handle_trending))
        .route("/api/v1/feed/new", get(feeds::handle_new))
        .route("/api/v1/search", get(feeds::handle_search))
        .route("/api/v1/chart", get(feeds::handle_chart))
        .route("/api/v1/holders", get(feeds::handle_holders))
        .route("/api/v1/market/overview", get(feeds::handle_market_overview))
        // Themes
        .route(
            "/api/v1/themes/search",
            get(feeds::handle_theme_search).post(feeds::handle_theme_search),
        )
        .route("/api/v1/themes/tag", post(feeds::handle_theme_tag))
        // Swipes
        .route("/api/v1/swipes", post(swipes::handle_record_swipe))
        .route("/api/v1/most-swiped", get(swipes::handle_most_swiped))
        // Library
        .route(
            "/api/v1/favorites",
            get(library::handle_list_favorites).post(library::handle_add_favorite),
        )
        .route("/api/v1/favorites/:mint", delete(library::handle_remove_favorite))
        .route(
            "/api/v1/matches",
            get(library::handle_list_matches).post(library::handle_add_match),
        )
        .route("/api/v1/matches/:mint", delete(library::handle_remove_match))
        .route(
            "/api/v1/folders",
            get(library::handle_list_folders).post(library::handle_create_folder),
        )
        .route("/api/v1/folders/:id", delete(library::handle_delete_folder))
        .route("/api/v1/folders/:id/coins", post(library::handle_add_folder_coin))
        .route(
            "/api/v1/folders/:id/coins/:mint",
            delete(library::handle_remove_folder_coin),
        )
        .with_state(state)
}
