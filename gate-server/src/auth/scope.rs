//! Route prefix to scope mapping and the scope check itself

use crate::auth::directory::Permission;
use crate::auth::principal::UserPrincipal;
use crate::auth::AuthError;
use crate::config::AuthConfig;
use std::collections::HashMap;
use thiserror::Error;

/// Prefixes served by the gateway itself or left unauthenticated
const RESERVED_PREFIXES: &[&str] = &["/health", "/scalar", "/organizationStatus"];

const DEFAULT_SCOPES: &[(&str, &str)] = &[
    ("/organization", "organization"),
    ("/business-profile-settings", "business-profile-settings"),
    ("/settings", "settings"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeMapError {
    #[error("Invalid scope entry `{0}`, expected `/prefix=scope`")]
    InvalidEntry(String),
    #[error("Route prefix `{0}` must be a single path segment like `/settings`")]
    InvalidPrefix(String),
    #[error("Route prefix `{0}` is reserved")]
    ReservedPrefix(String),
}

/// Immutable mapping from route prefix to the scope it requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeMap {
    scopes: HashMap<String, String>,
}

impl Default for ScopeMap {
    fn default() -> Self {
        Self {
            scopes: DEFAULT_SCOPES
                .iter()
                .map(|(prefix, scope)| (prefix.to_string(), scope.to_string()))
                .collect(),
        }
    }
}

impl ScopeMap {
    /// Built-in map extended with the configured overrides
    pub fn from_config(config: &AuthConfig) -> Result<Self, ScopeMapError> {
        let mut map = Self::default();
        if let Some(overrides) = &config.scopes {
            for (prefix, scope) in parse_entries(overrides)? {
                map.scopes.insert(prefix, scope);
            }
        }
        Ok(map)
    }

    /// Route prefixes, in a stable order
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.scopes.keys().map(String::as_str).collect();
        prefixes.sort_unstable();
        prefixes
    }

    /// Scope required to access `path`, if its prefix is mapped
    pub fn required_scope(&self, path: &str) -> Option<&str> {
        route_prefix_of(path)
            .and_then(|prefix| self.scopes.get(prefix))
            .map(String::as_str)
    }

    /// Checks that `permission` grants the scope required by `path`.
    /// Unmapped prefixes are denied.
    pub fn authorize(
        &self,
        path: &str,
        permission: Permission,
    ) -> Result<UserPrincipal, AuthError> {
        match self.required_scope(path) {
            Some(scope) if permission.has_scope(scope) => Ok(UserPrincipal::from(permission)),
            _ => Err(AuthError::ScopeDenied {
                prefix: route_prefix_of(path).unwrap_or("/").to_string(),
            }),
        }
    }
}

/// `/` followed by the first non-empty segment of `path`.
/// `/organization/42` gives `/organization`.
pub fn route_prefix_of(path: &str) -> Option<&str> {
    let trimmed = path.trim_start_matches('/');
    let start = path.len() - trimmed.len();
    if start == 0 {
        return None;
    }
    let segment_len = trimmed.find(['/', '?']).unwrap_or(trimmed.len());
    if segment_len == 0 {
        return None;
    }
    Some(&path[start - 1..start + segment_len])
}

fn parse_entries(value: &str) -> Result<Vec<(String, String)>, ScopeMapError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (prefix, scope) = entry
                .split_once('=')
                .map(|(prefix, scope)| (prefix.trim(), scope.trim()))
                .filter(|(prefix, scope)| !prefix.is_empty() && !scope.is_empty())
                .ok_or_else(|| ScopeMapError::InvalidEntry(entry.to_string()))?;
            validate_prefix(prefix)?;
            Ok((prefix.to_string(), scope.to_string()))
        })
        .collect()
}

fn validate_prefix(prefix: &str) -> Result<(), ScopeMapError> {
    let segment = prefix
        .strip_prefix('/')
        .filter(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
        .ok_or_else(|| ScopeMapError::InvalidPrefix(prefix.to_string()))?;

    if RESERVED_PREFIXES.contains(&prefix) || segment.starts_with('.') {
        return Err(ScopeMapError::ReservedPrefix(prefix.to_string()));
    }
    Ok(())
}
