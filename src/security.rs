use axum::http::HeaderMap;
use std::path::{Component, Path};
use subtle::ConstantTimeEq;

/// Header carrying the admin API token.
pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Constant-time string comparison to prevent timing attacks
/// Use this for comparing API tokens and other sensitive values
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check the admin token header against the configured token.
///
/// With no token configured the admin API is closed.
pub fn check_api_token(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected.filter(|token| !token.is_empty()) else {
        return false;
    };

    headers
        .get(API_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|provided| constant_time_compare(provided, expected))
        .unwrap_or(false)
}

/// True when `path` stays inside `base` (lexically: no `..`, same prefix).
pub fn directory_traversal_check(base: &Path, path: &Path) -> bool {
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return false;
    }
    path.starts_with(base)
}
