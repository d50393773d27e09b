//! HTTP handlers for the system and evolution endpoints.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use jarvis_core::{
    CycleId, EngineStatus, EvolutionCycle, Improvement, ImprovementType, MetricSample, Priority, Time,
    Trigger,
};
use jarvis_evolution::CycleReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of history records returned.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Most history records returned by one request.
pub const MAX_HISTORY_LIMIT: usize = 500;

/// Banner response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Root endpoint
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "J.A.R.V.I.S backend online".to_string(),
    })
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// System status response
#[derive(Debug, Serialize)]
pub struct SystemStatusResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub modules: BTreeMap<String, String>,
}

/// System status endpoint
pub async fn system_status(State(state): State<AppState>) -> Json<SystemStatusResponse> {
    let evolution = if state.engine.is_active() { "active" } else { "paused" };
    let mut modules = BTreeMap::new();
    modules.insert("evolution".to_string(), evolution.to_string());

    Json(SystemStatusResponse {
        status: "online".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        modules,
    })
}

/// Evolution status endpoint
pub async fn evolution_status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.engine.status())
}

/// An improvement as shown to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct ImprovementView {
    #[serde(rename = "type")]
    pub kind: ImprovementType,
    pub priority: Priority,
    pub description: String,
    pub target_module: String,
}

impl From<&Improvement> for ImprovementView {
    fn from(improvement: &Improvement) -> Self {
        Self {
            kind: improvement.kind,
            priority: improvement.priority,
            description: improvement.description.clone(),
            target_module: improvement.target_module.clone(),
        }
    }
}

/// An applied improvement and how its application went.
#[derive(Debug, Serialize)]
pub struct AppliedImprovement {
    #[serde(flatten)]
    pub improvement: ImprovementView,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Summary of a triggered cycle.
#[derive(Debug, Serialize)]
pub struct TriggerSummary {
    pub evolution_id: CycleId,
    pub success: bool,
    pub error: Option<String>,
    pub improvements_identified: usize,
    pub improvements_applied: usize,
    pub improvements: Vec<AppliedImprovement>,
    pub evolution_log_size: u64,
    pub learning_patterns: u64,
}

/// Trigger response
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub improvements: TriggerSummary,
}

impl From<CycleReport> for TriggerResponse {
    fn from(report: CycleReport) -> Self {
        let cycle = &report.cycle;
        let improvements = cycle
            .candidates_applied
            .iter()
            .map(|applied| {
                let outcome = cycle.outcomes.get(&applied.id);
                AppliedImprovement {
                    improvement: ImprovementView::from(applied),
                    success: outcome.is_some_and(|o| o.success),
                    error: outcome.and_then(|o| o.error.clone()),
                    duration_ms: outcome.map_or(0, |o| o.duration_ms),
                }
            })
            .collect();

        Self {
            improvements: TriggerSummary {
                evolution_id: cycle.cycle_id,
                success: cycle.success(),
                error: cycle.error.as_ref().map(|e| e.message.clone()),
                improvements_identified: cycle.candidates_identified.len(),
                improvements_applied: cycle.applied_count(),
                improvements,
                evolution_log_size: report.evolution_log_size,
                learning_patterns: report.learning_patterns,
            },
        }
    }
}

/// Trigger endpoint - runs one manual cycle synchronously.
pub async fn trigger_evolution(State(state): State<AppState>) -> ApiResult<Json<TriggerResponse>> {
    let report = state.engine.run_cycle(Trigger::Manual).await?;
    Ok(Json(TriggerResponse::from(report)))
}

/// History query parameters
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
    pub module: Option<String>,
}

/// One cycle as shown in history.
#[derive(Debug, Serialize)]
pub struct HistoryRecord {
    pub evolution_id: CycleId,
    pub timestamp: Time,
    pub success: bool,
    pub trigger: Trigger,
    pub improvements_identified: usize,
    pub improvements_applied: usize,
    pub improvement: Option<ImprovementView>,
    pub error: Option<String>,
}

impl From<&EvolutionCycle> for HistoryRecord {
    fn from(cycle: &EvolutionCycle) -> Self {
        Self {
            evolution_id: cycle.cycle_id,
            timestamp: cycle.completed_at,
            success: cycle.success(),
            trigger: cycle.trigger,
            improvements_identified: cycle.candidates_identified.len(),
            improvements_applied: cycle.applied_count(),
            improvement: cycle.primary_improvement().map(ImprovementView::from),
            error: cycle.error.as_ref().map(|e| e.message.clone()),
        }
    }
}

/// History response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryRecord>,
}

/// History endpoint - newest first.
pub async fn evolution_history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Json<HistoryResponse>> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);

    let module = params.module.as_deref().map(str::trim).filter(|m| !m.is_empty());
    let cycles = match module {
        Some(module) => state.engine.history_for_module(module, limit).await?,
        None => state.engine.history(limit).await?,
    };

    Ok(Json(HistoryResponse {
        history: cycles.iter().map(HistoryRecord::from).collect(),
    }))
}

/// A metric sample submitted by a producer.
#[derive(Debug, Deserialize)]
pub struct SampleInput {
    pub module: String,
    pub metric_name: String,
    pub value: f64,
    #[serde(default)]
    pub timestamp: Option<Time>,
}

impl SampleInput {
    fn into_sample(self) -> ApiResult<MetricSample> {
        let module = self.module.trim();
        let metric_name = self.metric_name.trim();
        if module.is_empty() || metric_name.is_empty() {
            return Err(ApiError::BadRequest("module and metric_name are required".to_string()));
        }
        if !self.value.is_finite() {
            return Err(ApiError::BadRequest(format!("value for {}/{} is not finite", module, metric_name)));
        }
        let timestamp = self.timestamp.unwrap_or_else(chrono::Utc::now);
        Ok(MetricSample::at(timestamp, module, metric_name, self.value))
    }
}

/// Metric submission body: one sample or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MetricsPayload {
    Batch { samples: Vec<SampleInput> },
    Single(SampleInput),
}

/// Metric submission response
#[derive(Debug, Serialize)]
pub struct RecordedResponse {
    pub recorded: usize,
}

/// Metrics endpoint - feeds the engine's metric window.
pub async fn record_metrics(
    State(state): State<AppState>,
    payload: Result<Json<MetricsPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RecordedResponse>)> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let inputs = match payload {
        MetricsPayload::Batch { samples } => samples,
        MetricsPayload::Single(sample) => vec![sample],
    };

    // Validate the whole batch before recording any of it.
    let samples = inputs
        .into_iter()
        .map(SampleInput::into_sample)
        .collect::<ApiResult<Vec<_>>>()?;
    let recorded = samples.len();
    state.engine.metrics().record_all(samples);

    Ok((StatusCode::ACCEPTED, Json(RecordedResponse { recorded })))
}
