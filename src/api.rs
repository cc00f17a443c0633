//! REST API for the layer packing service.
//!
//! Provides HTTP endpoints for rendering frontends. The engine output is
//! translated into layers with stacking offsets and placed blocks; scene
//! construction is left to the consumer.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, OptimizerConfig};
use crate::model::{Block, ValidationError};
use crate::optimizer::{
    Container, PackingConfig, PackingResult, pack_blocks, pack_blocks_with_progress,
};

#[derive(Clone)]
struct ApiState {
    optimizer_config: OptimizerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>layer_pack API Docs</title>
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

/// Container bounds in the request.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ContainerRequest {
    /// Width, height, depth
    #[schema(value_type = [f64; 3], example = json!([202.0, 120.0, 202.0]))]
    pub dims: (f64, f64, f64),
}

/// Single block in the request.
#[derive(Deserialize, Clone, ToSchema)]
pub struct BlockRequest {
    pub id: usize,
    /// Width, height, depth
    #[schema(value_type = [f64; 3], example = json!([180.0, 77.0, 12.0]))]
    pub dims: (f64, f64, f64),
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": { "dims": [202.0, 120.0, 202.0] },
        "blocks": [
            { "id": 1, "dims": [180.0, 77.0, 12.0] },
            { "id": 2, "dims": [30.0, 22.0, 8.0] }
        ],
        "allow_rotation": true
    })
)]
pub struct PackRequest {
    pub container: ContainerRequest,
    pub blocks: Vec<BlockRequest>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub allow_rotation: Option<bool>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub presort: Option<bool>,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    container: Container,
    blocks: Vec<Block>,
    allow_rotation: Option<bool>,
    presort: Option<bool>,
}

impl ValidatedPackRequest {
    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Applies request-level overrides on top of the configured defaults.
    fn packing_config(&self, base: PackingConfig) -> PackingConfig {
        let mut config = base;
        if let Some(allow_rotation) = self.allow_rotation {
            config.allow_rotation = allow_rotation;
        }
        if let Some(presort) = self.presort {
            config.presort = presort;
        }
        config
    }
}

#[derive(Debug)]
enum PackRequestValidationError {
    InvalidContainer(ValidationError),
    InvalidBlock(ValidationError),
}

impl PackRequest {
    fn into_validated(self) -> Result<ValidatedPackRequest, PackRequestValidationError> {
        let (w, h, d) = self.container.dims;
        let container =
            Container::new(w, h, d).map_err(PackRequestValidationError::InvalidContainer)?;

        let blocks = self
            .blocks
            .into_iter()
            .map(|b| Block::new(b.id, b.dims.0, b.dims.1, b.dims.2))
            .collect::<Result<Vec<_>, ValidationError>>()
            .map_err(PackRequestValidationError::InvalidBlock)?;

        Ok(ValidatedPackRequest {
            container,
            blocks,
            allow_rotation: self.allow_rotation,
            presort: self.presort,
        })
    }
}

/// Response with all layers in creation order.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub layers: Vec<PackedLayer>,
    pub unplaced: Vec<PackedUnplacedBlock>,
    pub is_complete: bool,
    /// Sum of all layer depths
    pub stacked_depth: f64,
    /// Whether the layer stack is deeper than the container (advisory)
    pub exceeds_depth: bool,
    /// Volume utilization in percent
    pub utilization: f64,
}

/// A layer with its stacking offset and placed blocks.
#[derive(Serialize, ToSchema)]
pub struct PackedLayer {
    pub index: usize,
    pub depth: f64,
    /// Offset along the stacking axis (sum of the depths of all earlier layers)
    pub offset: f64,
    pub blocks: Vec<PackedBlock>,
}

/// A placed block. `dims` reflect the orientation it was placed in.
#[derive(Serialize, ToSchema)]
pub struct PackedBlock {
    /// Sequential index within the layer, in placement order
    pub slot: usize,
    /// Caller-supplied block id
    pub id: usize,
    #[schema(value_type = [f64; 2], example = json!([0.0, 0.0]))]
    pub pos: (f64, f64),
    #[schema(value_type = [f64; 3], example = json!([180.0, 77.0, 12.0]))]
    pub dims: (f64, f64, f64),
    pub rotated: bool,
}

#[derive(Serialize, ToSchema)]
pub struct PackedUnplacedBlock {
    pub id: usize,
    #[schema(value_type = [f64; 3], example = json!([500.0, 500.0, 10.0]))]
    pub dims: (f64, f64, f64),
    pub reason_code: String,
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => {
            return Err(error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid JSON data",
                err.to_string(),
            ));
        }
    };

    payload.into_validated().map_err(|err| match err {
        PackRequestValidationError::InvalidContainer(err) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid container configuration",
            err.to_string(),
        ),
        PackRequestValidationError::InvalidBlock(err) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid input data",
            err.to_string(),
        ),
    })
}

impl PackResponse {
    /// Creates a PackResponse from a PackingResult.
    pub fn from_packing_result(result: PackingResult) -> Self {
        let PackingResult {
            container,
            unplaced,
        } = result;

        let layers = container
            .layers()
            .iter()
            .enumerate()
            .map(|(index, layer)| PackedLayer {
                index,
                depth: layer.depth(),
                offset: container.stack_offset(index),
                blocks: layer
                    .blocks()
                    .iter()
                    .enumerate()
                    .map(|(slot, b)| PackedBlock {
                        slot,
                        id: b.id(),
                        pos: b.position().map(|p| p.as_tuple()).unwrap_or((0.0, 0.0)),
                        dims: (b.width(), b.height(), b.depth()),
                        rotated: b.is_rotated(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            layers,
            is_complete: unplaced.is_empty(),
            unplaced: unplaced
                .into_iter()
                .map(|entry| PackedUnplacedBlock {
                    id: entry.block.id(),
                    dims: (
                        entry.block.width(),
                        entry.block.height(),
                        entry.block.depth(),
                    ),
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                })
                .collect(),
            stacked_depth: container.stacked_depth(),
            exceeds_depth: container.exceeds_depth(),
            utilization: container.utilization_percent(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream),
    components(
        schemas(
            PackRequest,
            ContainerRequest,
            BlockRequest,
            PackResponse,
            PackedLayer,
            PackedBlock,
            PackedUnplacedBlock,
            ErrorResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for layered block packing"))
)]
struct ApiDoc;

fn router(optimizer_config: OptimizerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(ApiState { optimizer_config })
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    optimizer_config: OptimizerConfig,
) -> std::io::Result<()> {
    let app = router(optimizer_config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|err| {
        log::error!("❌ Could not bind API server to {}: {}", addr, err);
        err
    })?;

    log::info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        log::info!("💡 Local access: http://localhost:{}", config.port());
    }
    log::info!("📦 API Endpoints: POST /pack, POST /pack_stream");
    log::info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /pack endpoint.
///
/// Packs the blocks into layers of the given container.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Successfully packed blocks", body = PackResponse),
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
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    log::info!("📥 New pack request: {} blocks", request.block_count());
    let packing_config = request.packing_config(state.optimizer_config.packing_config());
    let ValidatedPackRequest {
        container, blocks, ..
    } = request;

    let packing_result = pack_blocks(container, blocks, packing_config);
    log::info!(
        "📦 Result: {} layers, {} unplaced blocks",
        packing_result.layer_count(),
        packing_result.unplaced_count()
    );

    let response = PackResponse::from_packing_result(packing_result);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events in real-time as Server-Sent Events (text/event-stream).
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
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
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let packing_config = request.packing_config(state.optimizer_config.packing_config());
    let ValidatedPackRequest {
        container, blocks, ..
    } = request;

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let _ = pack_blocks_with_progress(container, blocks, packing_config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // Receiver has closed the stream; remaining events are discarded.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
