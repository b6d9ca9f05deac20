use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use super::{query_error, LEDGER_ADMIN_ROLES};
use crate::dtos::{AuditListParams, AuditListResponse};
use crate::middleware::AuthUser;
use crate::models::AuditTargetType;
use crate::services::AuditFilter;
use crate::startup::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;

pub async fn list_audit_entries(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    params: Result<Query<AuditListParams>, QueryRejection>,
) -> Result<Json<AuditListResponse>, AppError> {
    claims.require_any_role(LEDGER_ADMIN_ROLES)?;
    let Query(params) = params.map_err(query_error)?;
    params.validate()?;

    let target_type = params
        .target_type
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| {
            AuditTargetType::parse(s).ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!("Unknown target_type '{}'", s))
            })
        })
        .transpose()?;

    let filter = AuditFilter {
        target_type,
        target_id: params.target_id.filter(|s| !s.is_empty()),
    };
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let items = state.db.list_audit_entries(&filter, limit, offset).await?;
    let total = state.db.count_audit_entries(&filter).await?;

    Ok(Json(AuditListResponse {
        items,
        total,
        limit,
        offset,
    }))
}
