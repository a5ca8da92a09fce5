/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use kanban_gateway::{app::{build_router, AppState}, config::Config, pool::ClientPool};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let clients = ClientPool::new(&config.services, config.rpc_timeout);
/// let app = build_router(AppState::new(config, clients));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::require_bearer, security::SecurityHeadersLayer},
    pool::ClientPool,
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Supervised clients for the internal services
    pub clients: ClientPool,
}

impl AppState {
    pub fn new(config: Config, clients: ClientPool) -> Self {
        Self {
            config: Arc::new(config),
            clients,
        }
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET  /health                    public
/// ├── /user                           create and confirm are public
/// ├── /auth                           public
/// ├── /boards                         bearer
/// ├── /lists                          bearer
/// └── /cards                          bearer
/// ```
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/user/create", post(routes::users::create_user))
        .route("/user/confirm-new-email", put(routes::users::confirm_new_email))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    // collections answer with and without the trailing slash
    let boards = Router::new()
        .route("/boards", post(routes::boards::create_board).get(routes::boards::list_boards))
        .route("/boards/", post(routes::boards::create_board).get(routes::boards::list_boards))
        .route(
            "/boards/:id",
            get(routes::boards::get_board)
                .put(routes::boards::update_board)
                .delete(routes::boards::delete_board),
        )
        .route("/boards/:id/archive", put(routes::boards::archive_board))
        .route("/boards/:id/restore", put(routes::boards::restore_board))
        .route(
            "/boards/:id/users",
            post(routes::boards::add_members).delete(routes::boards::remove_members),
        )
        .route("/boards/:id/users/:user_id", put(routes::boards::assign_role))
        .route("/boards/:id/owner", put(routes::boards::transfer_ownership))
        .route("/boards/:id/labels", post(routes::boards::create_label))
        .route("/boards/:id/labels/:label_id", delete(routes::boards::delete_label));

    let lists = Router::new()
        .route("/lists", post(routes::lists::create_list).get(routes::lists::get_lists))
        .route("/lists/", post(routes::lists::create_list).get(routes::lists::get_lists))
        .route(
            "/lists/:id",
            get(routes::lists::get_list)
                .put(routes::lists::update_list)
                .delete(routes::lists::delete_list),
        )
        .route("/lists/:id/position", put(routes::lists::move_list))
        .route("/lists/:id/archive", put(routes::lists::archive_list))
        .route("/lists/:id/restore", put(routes::lists::restore_list));

    let cards = Router::new()
        .route("/cards", post(routes::cards::create_card).get(routes::cards::get_cards))
        .route("/cards/", post(routes::cards::create_card).get(routes::cards::get_cards))
        .route(
            "/cards/:id",
            get(routes::cards::get_card)
                .put(routes::cards::update_card)
                .delete(routes::cards::delete_card),
        )
        .route("/cards/:id/position", put(routes::cards::move_card))
        .route("/cards/:id/archive", put(routes::cards::archive_card))
        .route("/cards/:id/restore", put(routes::cards::restore_card))
        .route(
            "/cards/:id/labels/:label_id",
            post(routes::cards::add_label).delete(routes::cards::remove_label),
        )
        .route("/cards/:id/comments", post(routes::cards::create_comment))
        .route("/cards/:id/comments/:comment_id", delete(routes::cards::delete_comment))
        .route("/cards/:id/attachments", post(routes::cards::create_attachment))
        .route(
            "/cards/:id/attachments/:attachment_id",
            delete(routes::cards::delete_attachment),
        );

    let protected = Router::new()
        .route("/user/email", put(routes::users::change_email))
        .merge(boards)
        .merge(lists)
        .merge(cards)
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.server.production))
        .with_state(state)
}

fn cors(config: &Config) -> CorsLayer {
    if config.permissive_cors() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
