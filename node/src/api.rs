//! # REST + WebSocket API
//!
//! Builds the axum router that exposes one registry instance over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Description                          |
//! |--------|--------------------------|--------------------------------------|
//! | GET    | `/health`                | Liveness probe                       |
//! | GET    | `/status`                | Instance status and table counts     |
//! | POST   | `/link`                  | Link a meta-address (home only)      |
//! | POST   | `/claim`                 | Claim human status for an address    |
//! | POST   | `/commitments/import`    | Relayer imports a home commitment    |
//! | POST   | `/credentials/mint`      | Issuer mints a credential            |
//! | GET    | `/linked/:meta_address`  | Is this meta-address linked here?    |
//! | GET    | `/humans/:address`       | Is this address verified here?       |
//! | GET    | `/events`                | Page through the notification log    |
//! | GET    | `/ws`                    | Live notification stream             |
//!
//! The `caller` field of mutating requests is taken at face value.
//! Authenticating callers is the job of whatever submits requests to the
//! node (a signing gateway or the chain's own transaction layer).

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use humanlink_contracts::{
    CredentialToken, HumanRegistry, RegistryError, RegistryResult, TokenError, TokenId,
    TokenSnapshot,
};
use humanlink_protocol::config::{DEFAULT_EVENT_PAGE_SIZE, MAX_EVENT_PAGE_SIZE};
use humanlink_protocol::identity::decode_meta_address_bytes;
use humanlink_protocol::storage::{RegistryDb, RegistryStats};
use humanlink_protocol::{
    Address, CallContext, CommitmentHash, EventRecord, NetworkId, RegistryEvent,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// The registry, serialized behind one lock so calls on this instance run in
/// a single total order.
pub type SharedRegistry = Arc<Mutex<HumanRegistry<RegistryDb>>>;

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Network this instance runs on.
    pub network: NetworkId,
    pub registry: SharedRegistry,
    /// The credential contract, shared with the registry as its oracle.
    pub credentials: Arc<CredentialToken>,
    /// Where credential snapshots are written after each mint. `None` keeps
    /// credentials in memory only.
    pub credentials_path: Option<PathBuf>,
    /// Broadcast channel for committed notifications.
    pub event_tx: broadcast::Sender<EventRecord>,
    pub metrics: SharedMetrics,
}

/// A mutation outcome that may carry a committed record.
trait Committed {
    fn record(&self) -> Option<&EventRecord>;
}

impl Committed for EventRecord {
    fn record(&self) -> Option<&EventRecord> {
        Some(self)
    }
}

impl Committed for Option<EventRecord> {
    fn record(&self) -> Option<&EventRecord> {
        self.as_ref()
    }
}

impl AppState {
    /// Run a registry mutation on the blocking pool.
    ///
    /// Proof verification and sled commits are synchronous and stay off the
    /// async workers. The registry lock is held until the committed record
    /// has been broadcast, so `/ws` subscribers receive records in log order.
    async fn mutate<T, F>(&self, operation: &'static str, op: F) -> Result<T, ApiError>
    where
        T: Committed + Send + 'static,
        F: FnOnce(&mut HumanRegistry<RegistryDb>) -> RegistryResult<T> + Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut registry = state.registry.lock();
            let outcome = op(&mut *registry);
            match &outcome {
                Ok(value) => {
                    if let Some(record) = value.record() {
                        state.publish(record);
                        match registry.stats() {
                            Ok(stats) => state.metrics.observe_stats(&stats),
                            Err(e) => tracing::warn!(error = %e, "failed to read registry stats"),
                        }
                    }
                }
                Err(e) => state.metrics.record_rejection(operation, e.kind()),
            }
            outcome
        })
        .await
        .map_err(|e| ApiError::internal(format!("{operation} task failed: {e}")))?
        .map_err(ApiError::from)
    }

    fn publish(&self, record: &EventRecord) {
        match record.event {
            RegistryEvent::CommitmentLinked { .. } => self.metrics.links_total.inc(),
            RegistryEvent::CommitmentImported { .. } => self.metrics.imports_total.inc(),
            RegistryEvent::HumanStatusClaimed { .. } => self.metrics.claims_total.inc(),
        }
        // No subscribers is not an error.
        let _ = self.event_tx.send(record.clone());
    }
}

/// Write a credential snapshot next to `path` and rename it into place, so
/// the file on disk is always a complete snapshot.
fn write_snapshot(path: &std::path::Path, snapshot: &TokenSnapshot) -> Result<(), ApiError> {
    let bytes = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| ApiError::internal(format!("credential snapshot: {e}")))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes)
        .and_then(|()| std::fs::rename(&tmp, path))
        .map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            tracing::error!(path = %path.display(), error = %e, "failed to persist credentials");
            ApiError::internal(format!("credential snapshot: {e}"))
        })
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/link", post(link_handler))
        .route("/claim", post(claim_handler))
        .route("/commitments/import", post(import_handler))
        .route("/credentials/mint", post(mint_handler))
        .route("/linked/:meta_address", get(linked_handler))
        .route("/humans/:address", get(human_handler))
        .route("/events", get(events_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable snake_case error kind.
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal_error",
            message: message.into(),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match &err {
            RegistryError::WrongNetwork { .. }
            | RegistryError::UnauthorizedRelayer(_)
            | RegistryError::NotVerifiedHuman(_) => StatusCode::FORBIDDEN,
            RegistryError::AlreadyLinked(_) => StatusCode::CONFLICT,
            RegistryError::InvalidMetaAddressLength { .. } | RegistryError::NullAddress => {
                StatusCode::BAD_REQUEST
            }
            RegistryError::InvalidProof => StatusCode::UNPROCESSABLE_ENTITY,
            RegistryError::CredentialOracle(_) | RegistryError::ProofVerifier(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RegistryError::InvalidConfiguration(_) | RegistryError::Storage(_) => {
                tracing::error!(error = %err, "registry failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        let (status, kind) = match &err {
            TokenError::Unauthorized(_) => (StatusCode::FORBIDDEN, "unauthorized_issuer"),
            TokenError::NullRecipient => (StatusCode::BAD_REQUEST, "null_address"),
            TokenError::TokenNotFound(_) => (StatusCode::NOT_FOUND, "token_not_found"),
            TokenError::NonTransferable => (StatusCode::FORBIDDEN, "non_transferable"),
            TokenError::IdOverflow => (StatusCode::INTERNAL_SERVER_ERROR, "token_id_overflow"),
        };
        Self {
            status,
            kind,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.kind.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address, ApiError> {
    value
        .parse()
        .map_err(|e| ApiError::bad_request(format!("{field}: {e}")))
}

fn parse_commitment(value: &str) -> Result<CommitmentHash, ApiError> {
    value
        .parse()
        .map_err(|e| ApiError::bad_request(format!("commitment: {e}")))
}

fn parse_proof(value: &str) -> Result<Vec<u8>, ApiError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| ApiError::bad_request(format!("proof: {e}")))
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /link`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkRequest {
    pub caller: String,
    /// `st:eth:0x…`, `0x…`, or bare hex.
    pub meta_address: String,
}

/// Body of `POST /claim`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub derived_address: String,
    pub commitment: String,
    /// Hex-encoded proof bytes.
    pub proof: String,
}

/// Body of `POST /commitments/import`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImportRequest {
    pub caller: String,
    pub commitment: String,
}

/// Body of `POST /credentials/mint`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MintRequest {
    pub caller: String,
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    /// `false` when the commitment was already known here.
    pub imported: bool,
    pub record: Option<EventRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MintResponse {
    pub token_id: TokenId,
    pub owner: Address,
    pub balance: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkedResponse {
    /// Present only for well-formed 66-byte meta-addresses.
    pub commitment: Option<CommitmentHash>,
    pub linked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HumanResponse {
    pub address: Address,
    pub human: bool,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub from: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<EventRecord>,
    /// Sequence to pass as `from` for the next page.
    pub next: u64,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub network_id: NetworkId,
    pub network: String,
    pub home_network_id: NetworkId,
    pub is_home: bool,
    pub relayer: Option<Address>,
    pub stats: RegistryStats,
    pub credential_supply: u64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: instance summary.
async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let (home, relayer, stats) = {
        let registry = state.registry.lock();
        (registry.home(), registry.config().relayer, registry.stats()?)
    };

    Ok(Json(StatusResponse {
        version: state.version.clone(),
        network_id: state.network,
        network: state.network.name(),
        home_network_id: home,
        is_home: state.network == home,
        relayer,
        stats,
        credential_supply: state.credentials.total_supply(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /link`
async fn link_handler(
    State(state): State<AppState>,
    Json(req): Json<LinkRequest>,
) -> Result<Json<EventRecord>, ApiError> {
    let caller = parse_address("caller", &req.caller)?;
    let meta_address = decode_meta_address_bytes(&req.meta_address)
        .map_err(|e| ApiError::bad_request(format!("meta_address: {e}")))?;
    let ctx = CallContext::new(state.network, caller);

    state
        .mutate("link", move |registry| registry.link(&ctx, &meta_address))
        .await
        .map(Json)
}

/// `POST /claim`
async fn claim_handler(
    State(state): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<EventRecord>, ApiError> {
    let derived = parse_address("derived_address", &req.derived_address)?;
    let commitment = parse_commitment(&req.commitment)?;
    let proof = parse_proof(&req.proof)?;

    state
        .mutate("claim", move |registry| registry.claim(derived, commitment, &proof))
        .await
        .map(Json)
}

/// `POST /commitments/import`
async fn import_handler(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, ApiError> {
    let caller = parse_address("caller", &req.caller)?;
    let commitment = parse_commitment(&req.commitment)?;
    let ctx = CallContext::new(state.network, caller);

    // `None` is a no-op import of an already known commitment.
    let record = state
        .mutate("import", move |registry| registry.import_commitment(&ctx, commitment))
        .await?;

    Ok(Json(ImportResponse {
        imported: record.is_some(),
        record,
    }))
}

/// `POST /credentials/mint`
///
/// The snapshot is written before the mint becomes visible; if the write
/// fails the credential is not issued.
async fn mint_handler(
    State(state): State<AppState>,
    Json(req): Json<MintRequest>,
) -> Result<Json<MintResponse>, ApiError> {
    let caller = parse_address("caller", &req.caller)?;
    let to = parse_address("to", &req.to)?;

    let credentials = Arc::clone(&state.credentials);
    let path = state.credentials_path.clone();
    let token_id = tokio::task::spawn_blocking(move || {
        credentials.mint_with(&caller, to, |snapshot| match &path {
            Some(path) => write_snapshot(path, snapshot),
            None => Ok(()),
        })
    })
    .await
    .map_err(|e| ApiError::internal(format!("mint task failed: {e}")))??;

    Ok(Json(MintResponse {
        token_id,
        owner: to,
        balance: state.credentials.balance_of(&to),
    }))
}

/// `GET /linked/:meta_address`
///
/// Wrong-length input answers `linked: false`; only undecodable hex is an
/// error.
async fn linked_handler(
    Path(meta_address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LinkedResponse>, ApiError> {
    let bytes = decode_meta_address_bytes(&meta_address)
        .map_err(|e| ApiError::bad_request(format!("meta_address: {e}")))?;
    let linked = state.registry.lock().is_linked_on_chain(&bytes)?;

    let commitment = (bytes.len() == humanlink_protocol::config::META_ADDRESS_LENGTH)
        .then(|| CommitmentHash::of(&bytes));
    Ok(Json(LinkedResponse { commitment, linked }))
}

/// `GET /humans/:address`
async fn human_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<HumanResponse>, ApiError> {
    let address = parse_address("address", &address)?;
    let human = state.registry.lock().is_human_on_chain(&address)?;
    Ok(Json(HumanResponse { address, human }))
}

/// `GET /events?from=&limit=`
async fn events_handler(
    Query(query): Query<EventsQuery>,
    State(state): State<AppState>,
) -> Result<Json<EventsResponse>, ApiError> {
    let from = query.from.unwrap_or(0);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_PAGE_SIZE)
        .min(MAX_EVENT_PAGE_SIZE);

    let events = state.registry.lock().events_since(from, limit)?;
    let next = events.last().map(|r| r.sequence + 1).unwrap_or(from);
    Ok(Json(EventsResponse { events, next }))
}

/// `GET /ws`: WebSocket upgrade for live notification streaming.
///
/// Clients receive each committed [`EventRecord`] as a JSON text message.
/// The connection is push-only; client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(record) => {
                        let payload = match serde_json::to_string(&record) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Lagging clients can backfill from GET /events.
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
