use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::LedgerAuditLog;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AuditListParams {
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditListResponse {
    pub items: Vec<LedgerAuditLog>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
