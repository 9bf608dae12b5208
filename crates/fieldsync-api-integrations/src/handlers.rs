//! Integration API handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;
use validator::Validate;

use fieldsync_connector::ProviderCredentials;
use fieldsync_sync::orchestrator::SyncStore;
use fieldsync_sync::RunStatus;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    ConfigureResponse, CredentialsRequest, HistoryQuery, IntegrationStatus, IntegrationSummary,
    RunResponse, SyncSettingsResponse, TestConnectionResponse, TriggerSyncResponse,
    UpdateSettingsRequest,
};
use crate::state::{CompanyContext, IntegrationsState};

/// Configure (or replace) provider credentials.
#[utoipa::path(
    post,
    path = "/integrations/{provider}/credentials",
    params(("provider" = String, Path, description = "Provider key")),
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Credentials stored", body = ConfigureResponse),
        (status = 400, description = "Invalid credentials or unsupported provider"),
    ),
    tag = "integrations"
)]
pub async fn configure_credentials<S: SyncStore>(
    State(state): State<IntegrationsState<S>>,
    Extension(ctx): Extension<CompanyContext>,
    Path(provider): Path<String>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<Json<ConfigureResponse>> {
    let credentials: ProviderCredentials = request.into();
    let configured_at = state
        .vault
        .configure(ctx.company_id, &provider, &credentials)
        .await?;
    Ok(Json(ConfigureResponse {
        provider,
        configured_at,
    }))
}

/// Probe connectivity with the stored credentials.
///
/// Always answers 200; failures are reported in the body.
#[utoipa::path(
    post,
    path = "/integrations/{provider}/test",
    params(("provider" = String, Path, description = "Provider key")),
    responses(
        (status = 200, description = "Probe outcome", body = TestConnectionResponse),
        (status = 404, description = "Provider not configured"),
    ),
    tag = "integrations"
)]
pub async fn test_connection<S: SyncStore>(
    State(state): State<IntegrationsState<S>>,
    Extension(ctx): Extension<CompanyContext>,
    Path(provider): Path<String>,
) -> ApiResult<Json<TestConnectionResponse>> {
    let credentials = state.vault.get(ctx.company_id, &provider).await?;
    let profile = state.directory.get(&provider)?;
    let adapter = state.factory.build(profile, &credentials)?;

    let outcome = adapter.test_connection().await;
    Ok(Json(TestConnectionResponse {
        ok: outcome.ok,
        message: outcome.detail,
    }))
}

/// Effective sync settings (stored or defaults).
#[utoipa::path(
    get,
    path = "/integrations/{provider}/settings",
    params(("provider" = String, Path, description = "Provider key")),
    responses((status = 200, description = "Effective settings", body = SyncSettingsResponse)),
    tag = "integrations"
)]
pub async fn get_settings<S: SyncStore>(
    State(state): State<IntegrationsState<S>>,
    Extension(ctx): Extension<CompanyContext>,
    Path(provider): Path<String>,
) -> ApiResult<Json<SyncSettingsResponse>> {
    state.directory.get(&provider)?;
    let settings = state
        .orchestrator
        .registry()
        .get(ctx.company_id, &provider)
        .await?;
    Ok(Json(settings.into()))
}

/// Merge a partial settings update over the effective settings.
#[utoipa::path(
    put,
    path = "/integrations/{provider}/settings",
    params(("provider" = String, Path, description = "Provider key")),
    request_body = UpdateSettingsRequest,
    responses((status = 200, description = "Merged settings", body = SyncSettingsResponse)),
    tag = "integrations"
)]
pub async fn update_settings<S: SyncStore>(
    State(state): State<IntegrationsState<S>>,
    Extension(ctx): Extension<CompanyContext>,
    Path(provider): Path<String>,
    Json(request): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<SyncSettingsResponse>> {
    state.directory.get(&provider)?;
    let merged = state
        .orchestrator
        .registry()
        .update(ctx.company_id, &provider, &request.into())
        .await?;
    Ok(Json(merged.into()))
}

/// Start a sync run.
#[utoipa::path(
    post,
    path = "/integrations/{provider}/sync",
    params(("provider" = String, Path, description = "Provider key")),
    responses(
        (status = 202, description = "Run accepted", body = TriggerSyncResponse),
        (status = 404, description = "Provider not configured"),
        (status = 409, description = "A run is already in progress"),
    ),
    tag = "integrations"
)]
pub async fn trigger_sync<S: SyncStore>(
    State(state): State<IntegrationsState<S>>,
    Extension(ctx): Extension<CompanyContext>,
    Path(provider): Path<String>,
) -> ApiResult<(StatusCode, Json<TriggerSyncResponse>)> {
    let run_id = state
        .orchestrator
        .trigger(ctx.company_id, &provider)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerSyncResponse {
            accepted: true,
            run_id: run_id.as_uuid(),
        }),
    ))
}

/// List every supported provider with its status for this company.
#[utoipa::path(
    get,
    path = "/integrations",
    responses((status = 200, description = "Provider statuses", body = [IntegrationSummary])),
    tag = "integrations"
)]
pub async fn list_integrations<S: SyncStore>(
    State(state): State<IntegrationsState<S>>,
    Extension(ctx): Extension<CompanyContext>,
) -> ApiResult<Json<Vec<IntegrationSummary>>> {
    let mut summaries = Vec::new();
    for key in state.directory.keys() {
        let profile = state.directory.get(key)?;
        let configured = state.vault.is_configured(ctx.company_id, key).await?;

        let status = if !configured {
            IntegrationStatus::Inactive
        } else {
            let last = state
                .orchestrator
                .ledger()
                .list(ctx.company_id, key, 1)
                .await?;
            match last.first() {
                Some(run) if run.status == RunStatus::Failed => IntegrationStatus::Error,
                _ => IntegrationStatus::Active,
            }
        };

        let last_synced_at = state
            .orchestrator
            .ledger()
            .last_synced_at(ctx.company_id, key)
            .await?;

        summaries.push(IntegrationSummary {
            provider: key.to_string(),
            display_name: profile.display_name.clone(),
            status,
            last_synced_at,
        });
    }
    Ok(Json(summaries))
}

/// Run history for a provider, most recent first.
#[utoipa::path(
    get,
    path = "/integrations/{provider}/history",
    params(
        ("provider" = String, Path, description = "Provider key"),
        HistoryQuery,
    ),
    responses((status = 200, description = "Runs, most recent first", body = [RunResponse])),
    tag = "integrations"
)]
pub async fn sync_history<S: SyncStore>(
    State(state): State<IntegrationsState<S>>,
    Extension(ctx): Extension<CompanyContext>,
    Path(provider): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<RunResponse>>> {
    state.directory.get(&provider)?;
    query
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let runs = state
        .orchestrator
        .ledger()
        .list(ctx.company_id, &provider, query.effective_limit())
        .await?;
    Ok(Json(runs.into_iter().map(Into::into).collect()))
}

/// One run, with its item errors.
#[utoipa::path(
    get,
    path = "/integrations/{provider}/runs/{run_id}",
    params(
        ("provider" = String, Path, description = "Provider key"),
        ("run_id" = Uuid, Path, description = "Run identifier"),
    ),
    responses(
        (status = 200, description = "The run", body = RunResponse),
        (status = 404, description = "Unknown run"),
    ),
    tag = "integrations"
)]
pub async fn get_run<S: SyncStore>(
    State(state): State<IntegrationsState<S>>,
    Extension(ctx): Extension<CompanyContext>,
    Path((provider, run_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<RunResponse>> {
    state.directory.get(&provider)?;
    let run = state
        .orchestrator
        .ledger()
        .run(ctx.company_id, run_id.into())
        .await?
        .filter(|run| run.provider == provider)
        .ok_or_else(|| ApiError::NotFound(format!("run {run_id} not found")))?;
    Ok(Json(run.into()))
}

/// Remove the integration: credentials and settings. Idempotent.
#[utoipa::path(
    delete,
    path = "/integrations/{provider}",
    params(("provider" = String, Path, description = "Provider key")),
    responses((status = 200, description = "Integration removed")),
    tag = "integrations"
)]
pub async fn remove_integration<S: SyncStore>(
    State(state): State<IntegrationsState<S>>,
    Extension(ctx): Extension<CompanyContext>,
    Path(provider): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.directory.get(&provider)?;
    state.vault.remove(ctx.company_id, &provider).await?;
    Ok(Json(serde_json::json!({ "provider": provider })))
}
