//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use advisor_context::{
    AdvisorError, AllocationResult, Profile, RiskTolerance, Snapshot, SnapshotSource, advisor_messages, allocation,
};
use advisor_core::{CoreError, HistoryDay, PersistenceError, Turn, provider::GenerationOptions};

use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 50;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_connected: bool,
    pub feed_configured: bool,
    pub snapshot_source: SnapshotSource,
}

/// Profile as submitted by clients; the risk tolerance is checked strictly here
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub risk_tolerance: String,
    pub current_age: u32,
    pub target_retirement_age: u32,
    #[serde(default)]
    pub monthly_contribution: Decimal,
    #[serde(default)]
    pub retirement_goal: Decimal,
}

impl TryFrom<ProfileRequest> for Profile {
    type Error = AdvisorError;

    fn try_from(req: ProfileRequest) -> Result<Self, Self::Error> {
        let profile = Self {
            risk_tolerance: req.risk_tolerance.parse::<RiskTolerance>()?,
            current_age: req.current_age,
            target_retirement_age: req.target_retirement_age,
            monthly_contribution: req.monthly_contribution,
            retirement_goal: req.retirement_goal,
        };
        profile.validate()?;
        Ok(profile)
    }
}

#[derive(Debug, Serialize)]
pub struct AllocationResponse {
    pub allocation: AllocationResult,
    pub summary: String,
    pub years_to_retirement: u32,
    pub annual_contribution: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub profile: Option<ProfileRequest>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub model: String,
    pub context: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn persistence_failed(e: PersistenceError) -> ApiError {
    let err = CoreError::from(e);
    tracing::error!(error = %err, "Conversation log unavailable");
    api_error(StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_ERROR", err.user_message())
}

fn invalid_profile(e: &AdvisorError) -> ApiError {
    api_error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PROFILE", e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let llm_connected = state.provider.health_check().await.unwrap_or(false);
    let market = state.assembler.market();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        llm_connected,
        feed_configured: market.has_feed(),
        snapshot_source: market.get_latest().source,
    })
}

/// Latest cached market snapshot
pub async fn market_snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.assembler.market().get_latest().as_ref().clone())
}

/// Allocation for a submitted profile
pub async fn allocation_handler(Json(payload): Json<ProfileRequest>) -> Result<Json<AllocationResponse>, ApiError> {
    let profile = Profile::try_from(payload).map_err(|e| invalid_profile(&e))?;
    let result = allocation::recommend_for(&profile);

    Ok(Json(AllocationResponse {
        allocation: result,
        summary: result.to_string(),
        years_to_retirement: profile.years_to_retirement(),
        annual_contribution: profile.annual_contribution(),
    }))
}

/// Grounded chat: context, persist question, generate, persist reply
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.user_id.trim().is_empty() || payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", "user_id and message are required"));
    }

    let profile = payload
        .profile
        .map(Profile::try_from)
        .transpose()
        .map_err(|e| invalid_profile(&e))?;

    // Built before recording so the question never retrieves itself
    let context = match &profile {
        Some(profile) => {
            state
                .assembler
                .build_context_with_profile(&payload.user_id, &payload.message, profile)
                .await
        }
        None => state.assembler.build_context(&payload.user_id, &payload.message).await,
    };

    let question = Turn::user(&payload.user_id, &payload.message);
    state
        .assembler
        .record_turn(question.clone())
        .await
        .map_err(persistence_failed)?;

    let options = GenerationOptions {
        model: payload.model.unwrap_or_else(|| state.default_model.clone()),
        ..Default::default()
    };

    let completion = state
        .provider
        .complete(&advisor_messages(&context, &payload.message), &options)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %payload.user_id, error = %e, "Provider error");
            api_error(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", e.user_message())
        })?;

    state
        .assembler
        .record_turn(question.reply(&completion.content))
        .await
        .map_err(persistence_failed)?;

    Ok(Json(ChatResponse {
        message: completion.content,
        model: completion.model,
        context,
    }))
}

/// Day-grouped conversation history
pub async fn history_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryDay>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let days = state
        .assembler
        .history(&user_id, limit)
        .await
        .map_err(persistence_failed)?;
    Ok(Json(days))
}
