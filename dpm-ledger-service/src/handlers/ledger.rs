use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use service_core::error::AppError;
use tracing::instrument;

use super::{query_error, LEDGER_READ_ROLES};
use crate::dtos::LedgerParams;
use crate::ledger;
use crate::middleware::AuthUser;
use crate::models::{AreaSummary, AuditTargetType, NewAuditEntry, PharmacyStatement, PharmacySummary};
use crate::startup::AppState;

async fn record_view(
    state: &AppState,
    user: &AuthUser,
    target_type: AuditTargetType,
    target_id: &str,
    mode: &str,
) -> Result<(), AppError> {
    state
        .db
        .insert_audit_entry(&NewAuditEntry::view_statement(
            user.0.user_id(),
            target_type,
            target_id,
            mode,
        ))
        .await?;
    Ok(())
}

#[instrument(skip(state, user, params), fields(user = %user.0.sub))]
pub async fn pharmacy_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Path(legacy_id): Path<String>,
    params: Result<Query<LedgerParams>, QueryRejection>,
) -> Result<Json<PharmacySummary>, AppError> {
    user.0.require_any_role(LEDGER_READ_ROLES)?;
    let Query(params) = params.map_err(query_error)?;

    let summary = ledger::get_pharmacy_account_summary(
        state.ledger.as_ref(),
        &legacy_id,
        params.range(),
        params.year.as_deref(),
    )
    .await?;

    record_view(&state, &user, AuditTargetType::Pharmacy, &legacy_id, "summary").await?;
    Ok(Json(summary))
}

#[instrument(skip(state, user, params), fields(user = %user.0.sub))]
pub async fn pharmacy_statement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(legacy_id): Path<String>,
    params: Result<Query<LedgerParams>, QueryRejection>,
) -> Result<Json<PharmacyStatement>, AppError> {
    user.0.require_any_role(LEDGER_READ_ROLES)?;
    let Query(params) = params.map_err(query_error)?;

    let statement = ledger::get_pharmacy_detailed_statement(
        state.ledger.as_ref(),
        &legacy_id,
        params.range(),
        params.year.as_deref(),
    )
    .await?;

    record_view(&state, &user, AuditTargetType::Pharmacy, &legacy_id, "statement").await?;
    Ok(Json(statement))
}

#[instrument(skip(state, user, params), fields(user = %user.0.sub))]
pub async fn area_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Path(area_id): Path<String>,
    params: Result<Query<LedgerParams>, QueryRejection>,
) -> Result<Json<AreaSummary>, AppError> {
    user.0.require_any_role(LEDGER_READ_ROLES)?;
    let Query(params) = params.map_err(query_error)?;

    let summary = ledger::get_area_summary(
        state.ledger.as_ref(),
        &area_id,
        params.range(),
        params.year.as_deref(),
    )
    .await?;

    record_view(&state, &user, AuditTargetType::Area, &area_id, "area_summary").await?;
    Ok(Json(summary))
}
