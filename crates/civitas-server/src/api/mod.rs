//! HTTP API.
//!
//! Handlers are thin: resolve the caller, lock the engine, call one engine
//! operation, serialize the result. Every rule lives in the engine.

mod accounts;
mod admin;
mod issues;
mod payments;
mod staff;

use std::sync::Arc;

use axum::{
    extract::State,
    http::Method,
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use civitas_engine::Engine;
use civitas_shared::constants::APP_NAME;
use civitas_shared::{
    Category, IssueFilter, IssueQuery, IssueSort, IssueStatus, PageRequest, PaymentFilter,
    PaymentKind, Priority,
};

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<Engine>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(engine: Engine, config: ServerConfig) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        // Issues
        .route("/issues", get(issues::list).post(issues::create))
        .route("/issues/latest-resolved", get(issues::latest_resolved))
        .route("/issues/mine", get(issues::mine))
        .route(
            "/issues/:id",
            get(issues::detail).put(issues::edit).delete(issues::remove),
        )
        .route("/issues/:id/upvote", post(issues::upvote))
        .route("/issues/:id/boost", post(issues::boost))
        // Accounts
        .route("/accounts/register", post(accounts::register))
        .route("/accounts/me", get(accounts::me))
        .route("/citizen/stats", get(accounts::citizen_stats))
        // Payments
        .route("/payments/subscribe", post(payments::subscribe))
        .route("/payments/mine", get(payments::mine))
        .route("/payments/:id/invoice", get(payments::invoice))
        // Staff
        .route("/staff/issues", get(staff::assigned))
        .route("/staff/issues/:id/status", patch(staff::change_status))
        .route("/staff/stats", get(staff::stats))
        // Admin
        .route("/admin/stats", get(admin::stats))
        .route("/admin/issues", get(admin::issues))
        .route("/admin/issues/:id/assign", patch(admin::assign))
        .route("/admin/issues/:id/reject", patch(admin::reject))
        .route("/admin/staff", get(admin::list_staff).post(admin::create_staff))
        .route("/admin/staff/:id", delete(admin::delete_staff))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id/block", patch(admin::toggle_block))
        .route("/admin/payments", get(payments::admin_list))
        .route("/admin/payments/stats", get(payments::admin_monthly))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: &'static str,
    version: &'static str,
    free_issue_quota: u32,
    boost_amount: i64,
    premium_amount: i64,
    max_page_limit: u32,
}

/// Limits and prices clients need before calling the paid endpoints.
async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    let settings = &state.config.engine;
    Json(ServerInfoResponse {
        name: APP_NAME,
        version: env!("CARGO_PKG_VERSION"),
        free_issue_quota: settings.free_issue_quota,
        boost_amount: settings.default_boost_amount,
        premium_amount: settings.default_premium_amount,
        max_page_limit: settings.max_page_limit,
    })
}

/// `?page=&limit=` with the usual defaults.
fn page_request(page: Option<u32>, limit: Option<u32>) -> PageRequest {
    let default = PageRequest::default();
    PageRequest::new(page.unwrap_or(default.page), limit.unwrap_or(default.limit))
}

/// Query string shared by every issue listing.
#[derive(Debug, Default, Deserialize)]
struct IssueListParams {
    status: Option<IssueStatus>,
    category: Option<Category>,
    priority: Option<Priority>,
    search: Option<String>,
    sort: Option<IssueSort>,
    page: Option<u32>,
    limit: Option<u32>,
}

impl IssueListParams {
    fn into_query(self) -> IssueQuery {
        IssueQuery {
            filter: IssueFilter {
                status: self.status,
                category: self.category,
                priority: self.priority,
                search: self.search,
            },
            sort: self.sort.unwrap_or_default(),
            page: page_request(self.page, self.limit),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PaymentListParams {
    kind: Option<PaymentKind>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    page: Option<u32>,
    limit: Option<u32>,
}

impl PaymentListParams {
    fn into_parts(self) -> (PaymentFilter, PageRequest) {
        let filter = PaymentFilter {
            kind: self.kind,
            actor: None,
            from: self.from,
            to: self.to,
        };
        (filter, page_request(self.page, self.limit))
    }
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
