use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::HeaderName,
    middleware,
};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Routers split by caller (public, staff, superadmin).
pub mod routes;
use routes::{admin, public, superadmin};

// --- Public Re-exports ---

pub use auth::{AuthGate, STAFF_ROLES, SUPERADMIN_ROLES, TokenService};
pub use config::AppConfig;
pub use cors::CorsPolicy;
pub use repository::Repositories;
pub use storage::{LocalStorage, MockStorageService, StorageState};

/// Upper bound on request bodies for the staff routes. Slightly above the upload
/// limit so oversize files reach validation and get a proper message.
const ADMIN_BODY_LIMIT: usize = 6 * 1024 * 1024;

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`. The generic content
/// handlers are not listed; their row schemas are.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login, handlers::auth::whoami,
        handlers::regulation::get_regulation, handlers::regulation::get_admin_regulation,
        handlers::regulation::update_content, handlers::regulation::create_section,
        handlers::regulation::update_section, handlers::regulation::delete_section,
        handlers::regulation::create_item, handlers::regulation::update_item,
        handlers::regulation::delete_item,
        handlers::contact::get_contact, handlers::contact::update_contact,
        handlers::uploads::upload_course_image, handlers::uploads::upload_contact_image,
        handlers::uploads::upload_regulation_pdf,
        handlers::users::list_staff, handlers::users::create_staff,
        handlers::users::update_staff, handlers::users::reset_password,
        handlers::users::delete_staff,
    ),
    components(
        schemas(
            models::News, models::Event, models::Course, models::Program,
            models::AdmissionStep, models::Service, models::FaqItem,
            models::NewsInput, models::EventInput, models::CourseInput, models::ProgramInput,
            models::TitledInput, models::FaqInput,
            models::RegulationView, models::RegulationSection, models::RegulationItem,
            models::SectionWithItems, models::RegulationContentInput, models::SectionInput,
            models::ItemInput,
            models::ContactSettings, models::ContactUpdate, models::SocialLink,
            models::SocialLinkInput,
            models::LoginRequest, models::LoginResponse, models::PublicUser,
            models::StaffMember, models::StaffList, models::CreateStaffRequest,
            models::UpdateStaffRequest, models::ResetPasswordRequest,
            models::StaffActionResponse, models::MessageResponse, models::CreatedResponse,
            auth::Role, auth::AuthUser, handlers::auth::SessionInfo,
        )
    ),
    tags(
        (name = "campus-site", description = "Institutional website API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request. Handlers pull the part
/// they need through the `FromRef` impls below.
#[derive(Clone)]
pub struct AppState {
    /// Persistence services, one per table group.
    pub repos: Repositories,
    /// Where uploads are written.
    pub storage: StorageState,
    /// The loaded environment configuration.
    pub config: AppConfig,
    /// Session token signer and verifier.
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(repos: Repositories, storage: StorageState, config: AppConfig) -> Self {
        let tokens = TokenService::new(&config.jwt_secret);
        Self {
            repos,
            storage,
            config,
            tokens,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for Repositories {
    fn from_ref(app_state: &AppState) -> Repositories {
        app_state.repos.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

/// create_router
///
/// Assembles the routing tree, attaches the role gates and the global layers, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let staff_gate = AuthGate::new(state.tokens.clone(), STAFF_ROLES);
    let superadmin_gate = AuthGate::new(state.tokens.clone(), SUPERADMIN_ROLES);
    let cors = CorsPolicy::from_config(&state.config);
    let base_path = state.config.base_path.clone();
    let upload_dir = state.config.upload_dir.clone();

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 1. API routes. Gates are route layers so unmatched paths fall through to the
    // 404 fallback instead of answering 401.
    let api = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            admin::admin_routes()
                .layer(DefaultBodyLimit::max(ADMIN_BODY_LIMIT))
                .route_layer(middleware::from_fn_with_state(
                    staff_gate,
                    auth::require_roles,
                )),
        )
        .merge(
            superadmin::superadmin_routes().route_layer(middleware::from_fn_with_state(
                superadmin_gate,
                auth::require_roles,
            )),
        )
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .fallback(handlers::system::not_found)
        .with_state(state);

    // 2. Optional deployment prefix.
    let app = if base_path.is_empty() {
        api
    } else {
        Router::new()
            .nest(&base_path, api)
            .fallback(handlers::system::not_found)
    };

    // 3. Observability and correlation layers, then CORS outermost so preflights
    // and error responses are decorated too.
    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
    .layer(middleware::from_fn_with_state(cors, cors::apply_cors))
}

/// trace_span_logger
///
/// Builds the per-request span with the `x-request-id` set by the layer above, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
