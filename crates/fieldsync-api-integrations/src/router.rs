//! Route table for the integrations API.

use axum::routing::{delete, get, post};
use axum::Router;
use utoipa::OpenApi;

use fieldsync_sync::orchestrator::SyncStore;

use crate::handlers;
use crate::state::IntegrationsState;

/// OpenAPI document for the integrations surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::configure_credentials,
        handlers::test_connection,
        handlers::get_settings,
        handlers::update_settings,
        handlers::trigger_sync,
        handlers::list_integrations,
        handlers::sync_history,
        handlers::get_run,
        handlers::remove_integration,
    ),
    components(schemas(
        crate::models::CredentialsRequest,
        crate::models::ConfigureResponse,
        crate::models::TestConnectionResponse,
        crate::models::SyncSettingsResponse,
        crate::models::UpdateSettingsRequest,
        crate::models::TriggerSyncResponse,
        crate::models::IntegrationStatus,
        crate::models::IntegrationSummary,
        crate::models::ItemErrorResponse,
        crate::models::RunResponse,
    )),
    tags((name = "integrations", description = "CRM integration management"))
)]
pub struct ApiDoc;

/// Build the integrations router.
///
/// Expects a [`crate::state::CompanyContext`] extension installed by the
/// authentication middleware.
pub fn router<S: SyncStore>(state: IntegrationsState<S>) -> Router {
    Router::new()
        .route("/integrations", get(handlers::list_integrations::<S>))
        .route(
            "/integrations/:provider",
            delete(handlers::remove_integration::<S>),
        )
        .route(
            "/integrations/:provider/credentials",
            post(handlers::configure_credentials::<S>),
        )
        .route(
            "/integrations/:provider/test",
            post(handlers::test_connection::<S>),
        )
        .route(
            "/integrations/:provider/settings",
            get(handlers::get_settings::<S>).put(handlers::update_settings::<S>),
        )
        .route(
            "/integrations/:provider/sync",
            post(handlers::trigger_sync::<S>),
        )
        .route(
            "/integrations/:provider/history",
            get(handlers::sync_history::<S>),
        )
        .route(
            "/integrations/:provider/runs/:run_id",
            get(handlers::get_run::<S>),
        )
        .with_state(state)
}
