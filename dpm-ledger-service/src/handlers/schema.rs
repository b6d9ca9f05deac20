use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use service_core::error::AppError;

use super::{query_error, LEDGER_ADMIN_ROLES};
use crate::dtos::SchemaParams;
use crate::ledger::{describe_year, YearSchema};
use crate::middleware::AuthUser;
use crate::startup::AppState;

/// Reflected tables, row counts and role resolution for one year's partitions.
pub async fn ledger_schema(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    params: Result<Query<SchemaParams>, QueryRejection>,
) -> Result<Json<YearSchema>, AppError> {
    claims.require_any_role(LEDGER_ADMIN_ROLES)?;
    let Query(params) = params.map_err(query_error)?;

    let schema = describe_year(state.ledger.as_ref(), params.year.as_deref()).await?;
    Ok(Json(schema))
}
