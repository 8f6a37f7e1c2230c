use crate::{
    AppState,
    research::ServerContext,
    types::{AppError, Result},
};
use axum::{Json, extract::State};

/// Workspace, provider, rate-limit and cache snapshot
#[utoipa::path(
    get,
    path = "/api/context",
    responses(
        (status = 200, description = "Current server context", body = ServerContext)
    ),
    tag = "system"
)]
pub async fn get_context(State(state): State<AppState>) -> Result<Json<ServerContext>> {
    let orchestrator = state.orchestrator.clone();
    // the workspace scan touches the filesystem
    let context = tokio::task::spawn_blocking(move || ServerContext::collect_for_cwd(&orchestrator))
        .await
        .map_err(|e| AppError::Internal(format!("workspace scan failed: {}", e)))?;
    Ok(Json(context))
}
