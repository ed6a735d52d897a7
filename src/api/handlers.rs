//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

use crate::{
    error::AppResult,
    state::{AppState, CountdownBoard},
    timer::TimerCommand,
};
use super::responses::{
    ApiResponse, CreateScopeRequest, DurationRequest, HealthResponse, ScopeListResponse, ScopeView,
    StatusResponse,
};

/// Handle GET /scopes - All scopes evaluated at the current server time
pub async fn list_scopes_handler(State(state): State<Arc<AppState>>) -> AppResult<Json<ScopeListResponse>> {
    let server_time = state.now();
    let scopes = state
        .scopes
        .list()?
        .into_iter()
        .map(|scope| ScopeView::observe(scope, &state.schedule, server_time))
        .collect();

    Ok(Json(ScopeListResponse { server_time, scopes }))
}

/// Handle POST /scopes - Create a paused scope at full duration
pub async fn create_scope_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateScopeRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    let scope = state.create_scope(&request.name, request.timer_total_hours).await?;
    let view = ScopeView::observe(scope, &state.schedule, state.now());

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(format!("Scope '{}' created", view.scope.name), view)),
    ))
}

/// Handle GET /scopes/:id
pub async fn get_scope_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<Json<ScopeView>> {
    let scope = state.scopes.get(id)?;
    Ok(Json(ScopeView::observe(scope, &state.schedule, state.now())))
}

/// Handle DELETE /scopes/:id
pub async fn delete_scope_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<Json<ApiResponse>> {
    let scope = state.delete_scope(id).await?;
    let view = ScopeView::observe(scope, &state.schedule, state.now());
    Ok(Json(ApiResponse::ok(format!("Scope '{}' deleted", view.scope.name), view)))
}

/// Handle POST /scopes/:id/timer/start - Resume the countdown
pub async fn start_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<Json<ApiResponse>> {
    timer_action(&state, id, TimerCommand::Start, "Timer started").await
}

/// Handle POST /scopes/:id/timer/pause - Freeze the countdown
pub async fn pause_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<Json<ApiResponse>> {
    timer_action(&state, id, TimerCommand::Pause, "Timer paused").await
}

/// Handle POST /scopes/:id/timer/reset - Back to full duration, paused
pub async fn reset_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<Json<ApiResponse>> {
    timer_action(&state, id, TimerCommand::Reset, "Timer reset").await
}

/// Handle PUT /scopes/:id/timer/duration - Change the total used by the next reset
pub async fn set_duration_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<DurationRequest>,
) -> AppResult<Json<ApiResponse>> {
    timer_action(
        &state,
        id,
        TimerCommand::SetDuration(request.timer_total_hours),
        "Timer duration updated",
    )
    .await
}

async fn timer_action(
    state: &AppState,
    id: u64,
    command: TimerCommand,
    message: &str,
) -> AppResult<Json<ApiResponse>> {
    let scope = state.apply_timer(id, command).await?;
    let view = ScopeView::observe(scope, &state.schedule, state.now());
    info!("{} for scope {} ({}s remaining)", message, id, view.remaining_seconds);
    Ok(Json(ApiResponse::ok(message.to_string(), view)))
}

/// Handle GET /countdowns - Latest board from the display task
pub async fn countdowns_handler(State(state): State<Arc<AppState>>) -> Json<CountdownBoard> {
    Json(state.get_countdowns())
}

/// Handle GET /status - Return current server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> AppResult<Json<StatusResponse>> {
    let scopes = state.scopes.list()?;
    let server_time = state.now();
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        scope_count: scopes.len(),
        running_count: scopes.iter().filter(|scope| scope.is_timer_running).count(),
        schedule: state.schedule.describe(),
        working_now: state.schedule.is_working_moment(server_time),
        server_time,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
        persistence_error: state.get_persist_error(),
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
