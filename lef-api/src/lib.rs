pub mod views;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lef_crypto::signatures::verify_signature;
use lef_storage::{KvBackend, Storage};
use lef_types::address::parse_address;
use lef_types::batch::Batch;
use lef_types::state::GlobalState;
use lef_types::transaction::Transaction;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};
use views::*;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub struct AppState<B: KvBackend> {
    pub global_state: Arc<RwLock<GlobalState>>,
    pub storage: Arc<Storage<B>>,
    pub tx_sender: mpsc::Sender<Transaction>,
}

impl<B: KvBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            global_state: self.global_state.clone(),
            storage: self.storage.clone(),
            tx_sender: self.tx_sender.clone(),
        }
    }
}

pub fn router<B: KvBackend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/tx", post(submit_tx::<B>))
        .route("/account/:addr", get(get_account::<B>))
        .route("/index", get(get_index::<B>))
        .route("/index/subindices", get(get_sub_indices::<B>))
        .route("/destinations", get(get_destinations::<B>))
        .route("/destinations/:addr", get(get_destination::<B>))
        .route("/proposals/:id", get(get_proposal::<B>))
        .route("/ledger", get(get_ledger::<B>))
        .route("/batch/:height", get(get_batch::<B>))
        .with_state(state)
}

pub async fn start_server<B: KvBackend + 'static>(listen: SocketAddr, state: AppState<B>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("API listening on {}", listen);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn bad_request(msg: impl ToString) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.to_string())
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

async fn root() -> &'static str {
    "LefCoin ledger API v0.1"
}

/// Queues a transaction after checking its signature. Execution outcome is
/// visible once the next batch is sealed.
async fn submit_tx<B: KvBackend>(State(app): State<AppState<B>>, Json(tx): Json<Transaction>) -> ApiResult<SubmitResponse> {
    let tx_id = hex::encode(tx.id());
    if let Err(e) = verify_signature(&tx.sender, &tx.signing_bytes(), &tx.signature) {
        warn!(tx = %tx_id, "rejected unsigned submission: {}", e);
        return Ok(Json(SubmitResponse { accepted: false, tx_id, error: Some(e.to_string()) }));
    }

    app.tx_sender
        .send(tx)
        .await
        .map_err(|_| (StatusCode::SERVICE_UNAVAILABLE, "sequencer unavailable".to_string()))?;
    Ok(Json(SubmitResponse { accepted: true, tx_id, error: None }))
}

async fn get_account<B: KvBackend>(State(app): State<AppState<B>>, Path(addr): Path<String>) -> ApiResult<AccountView> {
    let who = parse_address(&addr).map_err(bad_request)?;
    let state = app.global_state.read().await;
    Ok(Json(AccountView::build(&state, &who)))
}

async fn get_index<B: KvBackend>(State(app): State<AppState<B>>) -> Json<IndexView> {
    let state = app.global_state.read().await;
    Json(IndexView::build(&state))
}

async fn get_sub_indices<B: KvBackend>(State(app): State<AppState<B>>) -> Json<SubIndicesView> {
    let state = app.global_state.read().await;
    Json(SubIndicesView { sub_indices: state.index.sub_indices.clone() })
}

async fn get_destinations<B: KvBackend>(State(app): State<AppState<B>>) -> Json<RegistryView> {
    let state = app.global_state.read().await;
    Json(RegistryView::build(&state))
}

async fn get_destination<B: KvBackend>(
    State(app): State<AppState<B>>,
    Path(addr): Path<String>,
) -> ApiResult<DestinationView> {
    let who = parse_address(&addr).map_err(bad_request)?;
    let state = app.global_state.read().await;
    state
        .registry
        .destination(&who)
        .map(|d| Json(DestinationView::from(d)))
        .ok_or_else(|| not_found("destination"))
}

async fn get_proposal<B: KvBackend>(State(app): State<AppState<B>>, Path(id): Path<u64>) -> ApiResult<ProposalView> {
    let state = app.global_state.read().await;
    let proposal = state.governance.proposal(id).ok_or_else(|| not_found("proposal"))?;
    let status = state.proposal_status(id, unix_now()).ok_or_else(|| not_found("proposal"))?;
    Ok(Json(ProposalView::build(proposal, status)))
}

async fn get_ledger<B: KvBackend>(State(app): State<AppState<B>>) -> Json<LedgerView> {
    let state = app.global_state.read().await;
    Json(LedgerView::build(&state))
}

async fn get_batch<B: KvBackend>(State(app): State<AppState<B>>, Path(height): Path<u64>) -> ApiResult<Batch> {
    match app.storage.load_batch_by_height(height) {
        Ok(Some(batch)) => Ok(Json(batch)),
        Ok(None) => Err(not_found("batch")),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
