//! REST API for the packing service.
//!
//! Exposes the packing engine over HTTP. Uses Axum as the web framework and
//! supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use log::{error, info};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, EngineConfig};
use crate::error::PackingError;
use crate::model::{BoxDimensions, Dimensions, Orientation, PackingBox, Part, ensure_unique_ids};
use crate::packer::{
    PackEvent, PackingConfig, PackingResult, pack_parts, pack_parts_with_progress,
};
use crate::shipment::{ShipmentPlan, pack_shipments};
use crate::sizing::{estimate_box_size, size_and_pack, size_and_pack_with_progress};
use crate::types::Vec3;

#[derive(Clone)]
struct ApiState {
    engine: EngineConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>freight-packer API Docs</title>
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
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Per-request overrides of the engine defaults.
#[derive(Deserialize, Clone, Copy, Debug, Default, ToSchema)]
pub struct PackOptions {
    #[serde(default)]
    #[schema(nullable = true)]
    pub padding: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub spacing: Option<f64>,
    /// `false` pins every part to its given orientation.
    #[serde(default)]
    #[schema(nullable = true)]
    pub allow_rotations: Option<bool>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub weight_distribution: Option<bool>,
}

impl PackOptions {
    fn apply(&self, mut config: PackingConfig) -> PackingConfig {
        if let Some(padding) = self.padding {
            config.padding = padding;
        }
        if let Some(spacing) = self.spacing {
            config.spacing = spacing;
        }
        if let Some(weight_distribution) = self.weight_distribution {
            config.weight_distribution = weight_distribution;
        }
        config
    }

    fn apply_to_parts(&self, parts: Vec<Part>) -> Vec<Part> {
        match self.allow_rotations {
            Some(false) => parts.into_iter().map(Part::fixed).collect(),
            _ => parts,
        }
    }
}

/// Request structure for the packing endpoints.
///
/// Without `box` the service sizes a box for the parts itself.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(
    example = json!({
        "box": { "width": 28.0, "height": 22.0, "depth": 16.0 },
        "parts": [
            { "id": "PN-1234", "dimensions": { "width": 12.0, "height": 8.0, "depth": 3.0 }, "weight": 2.5 },
            { "id": "PN-5678", "dimensions": { "width": 18.0, "height": 10.0, "depth": 4.0 } }
        ],
        "padding": 2.0,
        "spacing": 1.0
    })
)]
pub struct PackRequest {
    #[serde(rename = "box", default)]
    #[schema(nullable = true)]
    pub container: Option<PackingBox>,
    pub parts: Vec<Part>,
    #[serde(flatten)]
    pub options: PackOptions,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    container: Option<PackingBox>,
    parts: Vec<Part>,
    config: PackingConfig,
}

impl ValidatedPackRequest {
    fn part_count(&self) -> usize {
        self.parts.len()
    }
}

/// Validates the shared part of every request: parts, ids and options.
fn validate_parts_and_options(
    parts: Vec<Part>,
    options: &PackOptions,
    base: PackingConfig,
) -> Result<(Vec<Part>, PackingConfig), PackingError> {
    if parts.is_empty() {
        return Err(PackingError::EmptyInput);
    }
    for part in &parts {
        part.validate()?;
    }
    ensure_unique_ids(&parts)?;

    let config = options.apply(base);
    config.validate()?;
    Ok((options.apply_to_parts(parts), config))
}

impl PackRequest {
    fn into_validated(self, base: PackingConfig) -> Result<ValidatedPackRequest, PackingError> {
        if let Some(container) = &self.container {
            container
                .validate()
                .map_err(|err| PackingError::Configuration(err.to_string()))?;
        }
        let (parts, config) = validate_parts_and_options(self.parts, &self.options, base)?;
        Ok(ValidatedPackRequest {
            container: self.container,
            parts,
            config,
        })
    }
}

/// Request structure for the box estimation endpoint.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(
    example = json!({
        "parts": [
            { "id": "PN-1234", "dimensions": { "width": 12.0, "height": 8.0, "depth": 3.0 } }
        ],
        "padding": 2.0,
        "inefficiency_factor": 1.3
    })
)]
pub struct EstimateRequest {
    pub parts: Vec<Part>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub padding: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub inefficiency_factor: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub granularity: Option<f64>,
}

impl EstimateRequest {
    fn config(&self, mut base: PackingConfig) -> PackingConfig {
        if let Some(padding) = self.padding {
            base.padding = padding;
        }
        if let Some(factor) = self.inefficiency_factor {
            base.inefficiency_factor = factor;
        }
        if let Some(granularity) = self.granularity {
            base.granularity = granularity;
        }
        base
    }
}

/// Request structure for the multi-box endpoint.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ShipmentRequest {
    #[serde(rename = "box")]
    pub container: PackingBox,
    pub parts: Vec<Part>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub max_boxes: Option<usize>,
    #[serde(flatten)]
    pub options: PackOptions,
}

impl ShipmentRequest {
    const DEFAULT_MAX_BOXES: usize = 10;
}

/// Response structure of a single-box packing run.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    #[serde(rename = "box")]
    pub container: BoxDimensions,
    pub placed: Vec<PackedPart>,
    pub unplaced: Vec<PackedUnplacedPart>,
    pub stats: PackStats,
    pub success: bool,
    pub aborted: bool,
    /// Number of boxes tried when the box was sized automatically.
    #[schema(nullable = true)]
    pub sizing_attempts: Option<usize>,
}

/// Single placed part in the response.
///
/// # Fields
/// * `pos` - Minimum corner (x, y, z) inside the box
/// * `dims` - Extents along (x, y, z) after rotation
#[derive(Serialize, ToSchema)]
pub struct PackedPart {
    pub id: String,
    #[schema(value_type = [f64; 3], example = json!([2.0, 2.0, 2.0]))]
    pub pos: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([18.0, 10.0, 4.0]))]
    pub dims: (f64, f64, f64),
    pub orientation: Orientation,
    #[schema(nullable = true)]
    pub weight: Option<f64>,
    #[schema(nullable = true)]
    pub color: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PackedUnplacedPart {
    pub id: String,
    pub dimensions: Dimensions,
    pub reason_code: String,
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct PackStats {
    pub total_volume: f64,
    pub box_volume: f64,
    pub space_efficiency: u32,
    pub placed_count: usize,
    pub unplaced_count: usize,
    pub total_weight: f64,
    #[schema(nullable = true)]
    pub center_of_mass: Option<Vec3>,
}

#[derive(Serialize, ToSchema)]
pub struct ShipmentResponse {
    pub shipments: Vec<PackResponse>,
    pub oversized: Vec<PackedUnplacedPart>,
    pub total_shipments: usize,
    pub is_complete: bool,
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

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn packing_error(err: PackingError) -> Response {
    let error = match err {
        PackingError::Configuration(_) => "Invalid box configuration",
        PackingError::InvalidOption(_) => "Invalid packing options",
        _ => "Invalid input data",
    };
    error_response(StatusCode::UNPROCESSABLE_ENTITY, error, err.to_string())
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
    base: PackingConfig,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    payload.into_validated(base).map_err(packing_error)
}

impl PackedUnplacedPart {
    fn oversized(part: Part) -> Self {
        Self {
            id: part.id,
            dimensions: part.dimensions,
            reason_code: "no_box_accepts_part".to_string(),
            reason: "Part did not fit into a fresh box".to_string(),
        }
    }
}

impl PackResponse {
    /// Creates a PackResponse from a PackingResult.
    pub fn from_packing_result(result: PackingResult, sizing_attempts: Option<usize>) -> Self {
        let PackingResult {
            container,
            placed_parts,
            unplaced_parts,
            stats,
            success,
            aborted,
            remaining_points: _,
        } = result;

        Self {
            container: container.dimensions(),
            placed: placed_parts
                .into_iter()
                .map(|p| PackedPart {
                    pos: p.position.as_tuple(),
                    dims: p.extents.as_tuple(),
                    orientation: p.orientation,
                    id: p.part.id,
                    weight: p.part.weight,
                    color: p.part.color,
                })
                .collect(),
            unplaced: unplaced_parts
                .into_iter()
                .map(|entry| PackedUnplacedPart {
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                    id: entry.part.id,
                    dimensions: entry.part.dimensions,
                })
                .collect(),
            stats: PackStats {
                total_volume: stats.total_volume,
                box_volume: stats.box_volume,
                space_efficiency: stats.space_efficiency,
                placed_count: stats.placed_count,
                unplaced_count: stats.unplaced_count,
                total_weight: stats.total_weight,
                center_of_mass: stats.center_of_mass,
            },
            success,
            aborted,
            sizing_attempts,
        }
    }
}

impl ShipmentResponse {
    fn from_plan(plan: ShipmentPlan) -> Self {
        Self {
            shipments: plan
                .shipments
                .into_iter()
                .map(|result| PackResponse::from_packing_result(result, None))
                .collect(),
            oversized: plan
                .oversized
                .into_iter()
                .map(PackedUnplacedPart::oversized)
                .collect(),
            total_shipments: plan.total_shipments,
            is_complete: plan.is_complete,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, handle_estimate, handle_shipments),
    components(
        schemas(
            PackRequest,
            PackOptions,
            EstimateRequest,
            ShipmentRequest,
            PackResponse,
            PackedPart,
            PackedUnplacedPart,
            PackStats,
            ShipmentResponse,
            ErrorResponse,
            Part,
            Dimensions,
            Orientation,
            PackingBox,
            BoxDimensions,
            Vec3
        )
    ),
    tags((name = "packing", description = "Endpoints for 3D bin packing"))
)]
struct ApiDoc;

/// Builds the router with all endpoints.
pub fn router(engine: EngineConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/estimate", post(handle_estimate))
        .route("/shipments", post(handle_shipments))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(ApiState { engine })
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(config: ApiConfig, engine: EngineConfig) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API Endpoints: POST /pack, POST /pack_stream, POST /estimate, POST /shipments");
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, router(engine)).await
}

/// Handler for POST /pack endpoint.
///
/// Packs the parts into the given box, or sizes a box first when none is
/// given.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Packing finished (check `success` for unplaced parts)", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, box or options",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload, state.engine.packing_config()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        "📥 New pack request: {} parts, box {}",
        request.part_count(),
        if request.container.is_some() { "given" } else { "sized automatically" }
    );

    let ValidatedPackRequest {
        container,
        parts,
        config,
    } = request;
    let outcome = tokio::task::spawn_blocking(move || match container {
        Some(container) => pack_parts(&container, &parts, &config).map(|r| (r, None)),
        None => size_and_pack(&parts, &config).map(|s| (s.result, Some(s.attempts))),
    })
    .await;

    match outcome {
        Ok(Ok((result, attempts))) => {
            info!(
                "📦 Result: {} placed, {} unplaced",
                result.stats.placed_count, result.stats.unplaced_count
            );
            let response = PackResponse::from_packing_result(result, attempts);
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(Err(err)) => packing_error(err),
        Err(err) => {
            error!("❌ Packing task failed: {err}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Packing failed",
                err.to_string(),
            )
        }
    }
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events in real-time as Server-Sent Events (text/event-stream).
/// Without a box the box is sized first and the final attempt is streamed.
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
            description = "Invalid request, box or options",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let ValidatedPackRequest {
        container,
        parts,
        config,
    } = match parse_pack_request(payload, state.engine.packing_config()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let send = |evt: &PackEvent| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver discards the remaining events.
                let _ = tx.blocking_send(json);
            }
        };
        let outcome = match container {
            Some(container) => pack_parts_with_progress(&container, &parts, &config, send),
            None => size_and_pack_with_progress(&parts, &config, send).map(|sized| sized.result),
        };
        if let Err(err) = outcome {
            error!("❌ Streaming pack failed: {err}");
        }
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

/// Handler for POST /estimate endpoint.
///
/// Proposes box dimensions for the parts without packing them.
#[utoipa::path(
    post,
    path = "/estimate",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "Proposed box dimensions", body = BoxDimensions),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid parts or options", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_estimate(
    State(state): State<ApiState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let config = request.config(state.engine.packing_config());
    match estimate_box_size(&request.parts, &config) {
        Ok(dims) => (StatusCode::OK, Json(dims)).into_response(),
        Err(err) => packing_error(err),
    }
}

/// Handler for POST /shipments endpoint.
///
/// Splits the parts over as many boxes of the given size as needed.
#[utoipa::path(
    post,
    path = "/shipments",
    request_body = ShipmentRequest,
    responses(
        (status = 200, description = "Shipment plan", body = ShipmentResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request, box or options", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_shipments(
    State(state): State<ApiState>,
    payload: Result<Json<ShipmentRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };
    if let Err(err) = request.container.validate() {
        return packing_error(PackingError::Configuration(err.to_string()));
    }
    let (parts, config) = match validate_parts_and_options(
        request.parts,
        &request.options,
        state.engine.packing_config(),
    ) {
        Ok(validated) => validated,
        Err(err) => return packing_error(err),
    };

    let container = request.container;
    let max_boxes = request
        .max_boxes
        .unwrap_or(ShipmentRequest::DEFAULT_MAX_BOXES);
    info!("📥 New shipment request: {} parts, up to {} boxes", parts.len(), max_boxes);

    let outcome = tokio::task::spawn_blocking(move || {
        pack_shipments(&container, &parts, &config, max_boxes)
    })
    .await;

    match outcome {
        Ok(Ok(plan)) => (StatusCode::OK, Json(ShipmentResponse::from_plan(plan))).into_response(),
        Ok(Err(err)) => packing_error(err),
        Err(err) => {
            error!("❌ Shipment task failed: {err}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Packing failed",
                err.to_string(),
            )
        }
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
