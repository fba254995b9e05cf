//! REST API for the container planner.
//!
//! Collects the container spec and the item list, validates them, runs the
//! packing engine and renders the plan. Uses Axum as the web framework and
//! supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, PlannerConfig};
use crate::error::{ApiError, ErrorResponse};
use crate::geometry::Dimensions;
use crate::model::{ContainerSpec, Item};
use crate::optimizer::{PackBatch, PackEvent, PackedContainer, PackingPlan, UnfitItem};

#[derive(Clone)]
struct ApiState {
    planner: PlannerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>container-planner API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Embedded planning form (HTML, CSS, JS)
#[derive(RustEmbed)]
#[folder = "web/"]
struct WebAssets;

/// Request body for the packing endpoints.
///
/// `container` falls back to the configured default container when omitted.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": { "length": 10.0, "width": 10.0, "height": 10.0, "max_weight": 100.0 },
        "items": [
            { "id": 1, "length": 2.0, "width": 3.0, "height": 4.0, "weight": 10.0 },
            { "id": 2, "length": 5.0, "width": 5.0, "height": 5.0, "weight": 20.0 },
            { "id": 3, "length": 3.0, "width": 3.0, "height": 3.0, "weight": 15.0 }
        ]
    })
)]
pub struct PackRequest {
    #[serde(default)]
    #[schema(nullable = true)]
    pub container: Option<ContainerSpec>,
    pub items: Vec<Item>,
}

impl PackRequest {
    fn into_validated(self, planner: &PlannerConfig) -> Result<PackBatch, ApiError> {
        let container = self
            .container
            .unwrap_or_else(|| planner.default_container());
        container.validate().map_err(ApiError::InvalidContainer)?;

        if self.items.is_empty() {
            return Err(ApiError::NoItems);
        }
        if self.items.len() > planner.max_items() {
            return Err(ApiError::TooManyItems {
                count: self.items.len(),
                limit: planner.max_items(),
            });
        }
        Ok(PackBatch::new(container, self.items)?)
    }
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
    planner: &PlannerConfig,
) -> Result<PackBatch, ApiError> {
    let Json(payload) = payload.map_err(|err| ApiError::InvalidJson(err.body_text()))?;
    payload.into_validated(planner)
}

/// Response with the packing plan.
///
/// When `is_complete` is false, `containers` is empty and `unfit` lists the
/// items that cannot fit the container on their own.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub is_complete: bool,
    pub container_count: usize,
    pub total_packed_weight: f64,
    pub average_utilization: f64,
    pub containers: Vec<ContainerReport>,
    pub unfit: Vec<UnfitReport>,
}

/// One container of the plan.
///
/// # Fields
/// * `id` - Container number (1-based, opening order)
/// * `items` - Item ids in assignment order
/// * `volume_utilization` - Used volume in percent
#[derive(Serialize, ToSchema)]
pub struct ContainerReport {
    pub id: usize,
    pub items: Vec<usize>,
    pub used_volume: f64,
    pub volume_capacity: f64,
    pub used_weight: f64,
    pub weight_capacity: f64,
    pub residual_volume: f64,
    pub residual_weight: f64,
    pub volume_utilization: f64,
}

impl From<PackedContainer> for ContainerReport {
    fn from(container: PackedContainer) -> Self {
        let volume_utilization = container.volume_utilization_percent();
        let residual_volume = container.residual_volume();
        let residual_weight = container.residual_weight();
        let PackedContainer {
            id,
            items,
            used_volume,
            used_weight,
            volume_capacity,
            weight_capacity,
        } = container;
        Self {
            id,
            items,
            used_volume,
            volume_capacity,
            used_weight,
            weight_capacity,
            residual_volume,
            residual_weight,
            volume_utilization,
        }
    }
}

/// An item that cannot be packed, with a machine-readable reason.
#[derive(Serialize, ToSchema)]
pub struct UnfitReport {
    pub id: usize,
    pub reason_code: String,
    pub reason: String,
}

impl From<UnfitItem> for UnfitReport {
    fn from(entry: UnfitItem) -> Self {
        Self {
            id: entry.id,
            reason_code: entry.reason.code().to_string(),
            reason: entry.reason.to_string(),
        }
    }
}

impl PackResponse {
    pub fn from_packing_plan(plan: PackingPlan) -> Self {
        let is_complete = plan.is_complete();
        let container_count = plan.container_count();
        let total_packed_weight = plan.total_packed_weight();
        let average_utilization = plan.average_utilization();
        let PackingPlan { containers, unfit } = plan;

        Self {
            is_complete,
            container_count,
            total_packed_weight,
            average_utilization,
            containers: containers.into_iter().map(ContainerReport::from).collect(),
            unfit: unfit.into_iter().map(UnfitReport::from).collect(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, health),
    components(
        schemas(
            PackRequest,
            PackResponse,
            ContainerReport,
            UnfitReport,
            ErrorResponse,
            Item,
            ContainerSpec,
            Dimensions,
            PackEvent
        )
    ),
    tags((name = "packing", description = "Endpoints for container planning"))
)]
struct ApiDoc;

/// Builds the router with all API routes and, if enabled, the embedded form.
fn build_router(config: &ApiConfig, planner: PlannerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { planner };

    let mut router = Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/health", get(health))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui));

    if config.serve_ui() {
        router = router
            .route("/", get(serve_index))
            .route("/{*path}", get(serve_static));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, planner: PlannerConfig) {
    let app = build_router(&config, planner);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Could not bind API server to {}: {}", addr, err);
            return;
        }
    };

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("API endpoints: POST /pack, POST /pack_stream, GET /health");
    info!("Documentation: GET /docs, GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        error!("API server terminated with an error: {err}");
    }
}

/// Handler for POST /pack endpoint.
///
/// Packs the items into containers of the requested type. A plan with unfit
/// items is still a successful response; only malformed input is rejected.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Packing plan or list of unfit items", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let batch = parse_pack_request(payload, &state.planner)?;

    info!(
        items = batch.item_count(),
        volume_capacity = batch.spec().volume_capacity(),
        "new pack request"
    );
    let plan = batch.pack();
    if plan.is_complete() {
        info!(containers = plan.container_count(), "pack request planned");
    } else {
        info!(
            unfit = plan.unfit_count(),
            ids = ?plan.unfit_ids(),
            "pack request has unfit items"
        );
    }

    let response = PackResponse::from_packing_plan(plan);
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events as Server-Sent Events (text/event-stream) so a client
/// can follow the assignment step by step.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = PackEvent
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let batch = parse_pack_request(payload, &state.planner)?;

    info!(items = batch.item_count(), "new streaming pack request");
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        batch.pack_with_progress(|evt| match serde_json::to_string(evt) {
            // A closed receiver means the client went away; later events are dropped.
            Ok(json) => {
                let _ = tx.blocking_send(json);
            }
            Err(err) => warn!("could not serialize pack event: {err}"),
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Ok(Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response())
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "packing"
)]
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
    }))
}

/// Serves the index.html main page
async fn serve_index() -> Response {
    match WebAssets::get("index.html") {
        Some(content) => Html(content.data).into_response(),
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Serves static assets (JS, CSS, etc.)
async fn serve_static(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match WebAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
