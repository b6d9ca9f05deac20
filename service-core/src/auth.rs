//! Bearer-token verification and role checks.
//!
//! Tokens are issued by the CRM backend; services here only verify them. The
//! role carried in the token is canonicalised through a small alias table so
//! that legacy role slugs keep working.

use std::str::FromStr;

use axum::http::{HeaderMap, header};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Header accepted as an alternative to `Authorization: Bearer`.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

const ROLE_ALIASES: &[(&str, &str)] = &[
    ("sales-marketing-manager", "sales_manager"),
    ("medical-sales-rep", "medical_rep"),
    ("salesman", "medical_rep"),
];

/// Claims read from an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Role slug, possibly a legacy alias
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl AccessTokenClaims {
    /// Numeric user id, when the subject is one.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.trim().parse().ok()
    }

    pub fn canonical_role(&self) -> Option<&str> {
        self.role.as_deref().map(canonicalize_role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        has_any_role(self.role.as_deref(), roles)
    }

    /// `Forbidden` unless the caller holds one of `roles`. An empty list admits everyone.
    pub fn require_any_role(&self, roles: &[&str]) -> Result<(), AppError> {
        if roles.is_empty() || self.has_any_role(roles) {
            return Ok(());
        }
        Err(AppError::Forbidden(anyhow::anyhow!("Insufficient permissions.")))
    }
}

pub fn canonicalize_role(role: &str) -> &str {
    ROLE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == role)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(role)
}

pub fn has_any_role(user_role: Option<&str>, roles: &[&str]) -> bool {
    let Some(user_role) = user_role.map(canonicalize_role) else {
        return false;
    };
    roles
        .iter()
        .filter(|r| !r.is_empty())
        .any(|r| canonicalize_role(r) == user_role)
}

/// Pull the raw token from `Authorization: Bearer` or `X-Auth-Token`.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}

/// Verifies access tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl JwtVerifier {
    pub fn new(secret: &str, algorithm: &str) -> Result<Self, AppError> {
        let algorithm = Algorithm::from_str(algorithm).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Unsupported JWT algorithm '{}': {}", algorithm, e))
        })?;

        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        // `exp` is checked when present but not mandatory.
        validation.required_spec_claims.clear();

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, AppError> {
        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Invalid authentication token."
            )));
        }
        Ok(data.claims)
    }
}
