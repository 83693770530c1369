/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use nexus_api::{app::{build_router, AppState}, config::Config};
/// use nexus_shared::mailer::LogMailer;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(LogMailer));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, build_router(state)).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        access::{authenticate, board_guard, project_guard, workspace_guard, RoleGuard},
        security::SecurityHeadersLayer,
    },
    oauth::GoogleOAuth,
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use nexus_shared::{
    auth::roles::{BoardRole, WorkspaceRole},
    mailer::Mailer,
    store::{AccessStore, PgAccessStore},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler; all fields are reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Pool used by the CRUD handlers
    pub db: PgPool,

    /// Persistence behind authentication, role checks, tokens and invitations
    pub store: Arc<dyn AccessStore>,

    pub mailer: Arc<dyn Mailer>,

    /// `None` when Google sign-in is not configured
    pub oauth: Option<Arc<GoogleOAuth>>,

    pub config: Arc<Config>,
}

impl AppState {
    /// State backed by PostgreSQL for both the pool and the access store
    pub fn new(db: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let store: Arc<dyn AccessStore> = Arc::new(PgAccessStore::new(db.clone()));
        Self::with_store(db, store, config, mailer)
    }

    /// State with an explicit access store
    pub fn with_store(
        db: PgPool,
        store: Arc<dyn AccessStore>,
        config: Config,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let oauth = config
            .google
            .clone()
            .map(|google| Arc::new(GoogleOAuth::new(google)));

        Self {
            db,
            store,
            mailer,
            oauth,
            config: Arc::new(config),
        }
    }

    pub fn access_secret(&self) -> &str {
        &self.config.jwt.access_secret
    }

    pub fn refresh_secret(&self) -> &str {
        &self.config.jwt.refresh_secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                                              public
/// /api/v1/users
///   POST register | login | verify-email | reset-password
///   POST password/reset | refresh-token                 public
///   GET  :provider | :provider/callback                 public
///   POST logout                                         authenticated
/// /api/v1/boards                                        authenticated
///   POST create, GET list
///   GET  :board_id                                      observer
///   PUT  :board_id/update, DELETE :board_id/delete      admin
///   POST :board_id/invite                               admin
///   POST :board_id/accept-invite?token=                 any user
///   POST :board_id/lists/create                         member
///   PUT  :board_id/lists/:list_id/update                member
///   DELETE :board_id/lists/:list_id/delete              member
///   GET  :board_id/lists/:list_id/cards/:card_id        observer
///   POST :board_id/lists/:list_id/cards/create          member
///   PUT  :board_id/lists/:list_id/cards/:card_id/update member
///   DELETE .../cards/:card_id/delete                    member
/// /api/v1/workspaces                                    authenticated
///   POST create, GET list
///   GET  :workspace_id                                  member
///   PUT  :workspace_id/members/:user_id/role            admin
///   POST :workspace_id/projects/create                  manager
///   GET  :workspace_id/projects/list                    member
/// /api/v1/projects                                      authenticated
///   GET  :project_id                                    member
///   PUT  :project_id/update                             manager
///   DELETE :project_id/delete                           admin
///   POST :project_id/tasks/create, GET tasks/list       member
///   GET  :project_id/tasks/:task_id                     member
///   PUT  :project_id/tasks/:task_id/update              member
///   PUT  :project_id/tasks/:task_id/assign              manager
///   DELETE :project_id/tasks/:task_id/delete            manager
/// ```
///
/// Role requirements use the inverted hierarchy: a route marked `member`
/// admits members, managers and admins.
pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/register", post(routes::users::register))
        .route("/login", post(routes::users::login))
        .route("/verify-email", post(routes::users::verify_email))
        .route("/reset-password", post(routes::users::request_password_reset))
        .route("/password/reset", post(routes::users::reset_password))
        .route("/refresh-token", post(routes::users::refresh_token))
        .route("/:provider", get(routes::users::oauth_start))
        .route("/:provider/callback", get(routes::users::oauth_callback))
        .merge(
            Router::new()
                .route("/logout", post(routes::users::logout))
                .route_layer(from_fn_with_state(state.clone(), authenticate)),
        );

    let v1_routes = Router::new()
        .nest("/users", user_routes)
        .merge(
            Router::new()
                .nest("/boards", board_routes(&state))
                .nest("/workspaces", workspace_routes(&state))
                .nest("/projects", project_routes(&state))
                .route_layer(from_fn_with_state(state.clone(), authenticate)),
        );

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Board routes; expects an authenticated caller
pub fn board_routes(state: &AppState) -> Router<AppState> {
    use routes::{boards, cards, lists};

    let guard = |role| from_fn_with_state(RoleGuard::new(state, role), board_guard);

    let observer = Router::new()
        .route("/:board_id", get(boards::get_board))
        .route(
            "/:board_id/lists/:list_id/cards/:card_id",
            get(cards::get_card),
        )
        .route_layer(guard(BoardRole::Observer));

    let member = Router::new()
        .route("/:board_id/lists/create", post(lists::create_list))
        .route("/:board_id/lists/:list_id/update", put(lists::update_list))
        .route("/:board_id/lists/:list_id/delete", delete(lists::delete_list))
        .route("/:board_id/lists/:list_id/cards/create", post(cards::create_card))
        .route(
            "/:board_id/lists/:list_id/cards/:card_id/update",
            put(cards::update_card),
        )
        .route(
            "/:board_id/lists/:list_id/cards/:card_id/delete",
            delete(cards::delete_card),
        )
        .route_layer(guard(BoardRole::Member));

    let admin = Router::new()
        .route("/:board_id/update", put(boards::update_board))
        .route("/:board_id/delete", delete(boards::delete_board))
        .route("/:board_id/invite", post(boards::invite_to_board))
        .route_layer(guard(BoardRole::Admin));

    Router::new()
        .route("/create", post(boards::create_board))
        .route("/list", get(boards::list_boards))
        .route("/:board_id/accept-invite", post(boards::accept_invite))
        .merge(observer)
        .merge(member)
        .merge(admin)
}

/// Workspace routes; expects an authenticated caller
pub fn workspace_routes(state: &AppState) -> Router<AppState> {
    use routes::{projects, workspaces};

    let guard = |role| from_fn_with_state(RoleGuard::new(state, role), workspace_guard);

    let member = Router::new()
        .route("/:workspace_id", get(workspaces::get_workspace))
        .route("/:workspace_id/projects/list", get(projects::list_projects))
        .route_layer(guard(WorkspaceRole::Member));

    let manager = Router::new()
        .route("/:workspace_id/projects/create", post(projects::create_project))
        .route_layer(guard(WorkspaceRole::Manager));

    let admin = Router::new()
        .route(
            "/:workspace_id/members/:user_id/role",
            put(workspaces::update_member_role),
        )
        .route_layer(guard(WorkspaceRole::Admin));

    Router::new()
        .route("/create", post(workspaces::create_workspace))
        .route("/list", get(workspaces::list_workspaces))
        .merge(member)
        .merge(manager)
        .merge(admin)
}

/// Project routes; expects an authenticated caller
pub fn project_routes(state: &AppState) -> Router<AppState> {
    use routes::{projects, tasks};

    let guard = |role| from_fn_with_state(RoleGuard::new(state, role), project_guard);

    Router::new()
        .merge(
            Router::new()
                .route("/:project_id", get(projects::get_project))
                .route("/:project_id/tasks/create", post(tasks::create_task))
                .route("/:project_id/tasks/list", get(tasks::list_tasks))
                .route("/:project_id/tasks/:task_id", get(tasks::get_task))
                .route("/:project_id/tasks/:task_id/update", put(tasks::update_task))
                .route_layer(guard(WorkspaceRole::Member)),
        )
        .merge(
            Router::new()
                .route("/:project_id/update", put(projects::update_project))
                .route("/:project_id/tasks/:task_id/assign", put(tasks::assign_task))
                .route("/:project_id/tasks/:task_id/delete", delete(tasks::delete_task))
                .route_layer(guard(WorkspaceRole::Manager)),
        )
        .merge(
            Router::new()
                .route("/:project_id/delete", delete(projects::delete_project))
                .route_layer(guard(WorkspaceRole::Admin)),
        )
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
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
