//! HTTP routes
//!
//! Thin serving layer over the engine: query, synchronous ingest,
//! queue-backed asynchronous ingest, and the administrative snapshot reset.

use crate::state::AppState;
use actix_web::{web, HttpResponse};
use reco_core::RecoError;
use reco_engine::Interaction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/recommend", web::post().to(recommend))
        .route("/interact", web::post().to(interact))
        .route("/interact/async", web::post().to(interact_async))
        .route("/admin/reset", web::post().to(reset));
}

fn default_top_n() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub user_id: u64,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub exclude: HashSet<u64>,
}

#[derive(Debug, Serialize)]
pub struct RecommendedItem {
    pub item_id: u64,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub user_id: u64,
    pub recommendations: Vec<RecommendedItem>,
}

/// Top-N query. An unknown user gets an empty list; a deployment whose model
/// is not yet available gets 503 instead.
async fn recommend(
    state: web::Data<AppState>,
    req: web::Json<RecommendRequest>,
) -> Result<HttpResponse, RecoError> {
    let recs = state
        .recommend(req.user_id, req.top_n, &req.exclude)
        .await?;
    Ok(HttpResponse::Ok().json(RecommendResponse {
        user_id: req.user_id,
        recommendations: recs
            .into_iter()
            .map(|(item_id, score)| RecommendedItem { item_id, score })
            .collect(),
    }))
}

/// One interaction or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InteractRequest {
    One(Interaction),
    Many(Vec<Interaction>),
}

impl InteractRequest {
    fn into_vec(self) -> Vec<Interaction> {
        match self {
            Self::One(interaction) => vec![interaction],
            Self::Many(interactions) => interactions,
        }
    }
}

/// Synchronous ingest: interactions are validated, scored, and applied
/// within the request, returning the computed score per interaction. The
/// whole batch is validated up front, so a rejected request applies nothing.
async fn interact(
    state: web::Data<AppState>,
    req: web::Json<InteractRequest>,
) -> Result<HttpResponse, RecoError> {
    let interactions = req.into_inner().into_vec();
    for interaction in &interactions {
        interaction.validate()?;
    }
    let mut results = Vec::with_capacity(interactions.len());
    for interaction in &interactions {
        results.push(state.apply(interaction).await?);
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "applied": results.len(),
        "results": results,
    })))
}

/// Asynchronous ingest: interactions are validated, enqueued, and processed
/// out-of-band by the workers; the response carries the job ids. Validation
/// covers the whole batch before the first enqueue, so a 400 means no job
/// was queued and the request is safe to retry as-is.
async fn interact_async(
    state: web::Data<AppState>,
    req: web::Json<InteractRequest>,
) -> Result<HttpResponse, RecoError> {
    let interactions = req.into_inner().into_vec();
    for interaction in &interactions {
        interaction.validate()?;
    }
    let mut job_ids: Vec<Uuid> = Vec::with_capacity(interactions.len());
    for interaction in &interactions {
        job_ids.push(state.queue().enqueue(interaction).await?);
    }
    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "status": "accepted",
        "job_ids": job_ids,
    })))
}

/// Discard the durable snapshot. Any model already loaded in memory
/// elsewhere is unaffected; callers reconcile that explicitly.
async fn reset(state: web::Data<AppState>) -> Result<HttpResponse, RecoError> {
    state.reset().await?;
    tracing::info!(mode = state.mode_name(), "durable snapshot discarded");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "completed",
    })))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "reco-service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
