// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-operation claim requirements loaded from the OpenAPI contract.
//!
//! Each operation lists the scopes of its `bearerAuth` security requirement;
//! those scopes are the claims a caller's token must grant. Operations that
//! declare no security of their own inherit the document-level requirement.
//! The registry is built once at startup and never changes afterwards.

use std::collections::HashMap;

use axum::http::Method;
use serde_json::Value;
use utoipa::openapi::OpenApi;

use super::authorize::RequiredClaims;
use super::AuthError;

/// Security scheme name used by every authenticated operation.
pub const BEARER_AUTH: &str = "bearerAuth";

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("failed to serialize API contract: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("API contract has no paths")]
    NoPaths,

    #[error("malformed security requirement on {operation}: {reason}")]
    MalformedSecurity { operation: String, reason: String },
}

/// Required claims keyed by HTTP method and route template.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: HashMap<(Method, String), RequiredClaims>,
}

impl OperationRegistry {
    /// Build the registry from an OpenAPI document.
    pub fn from_openapi(doc: &OpenApi) -> Result<Self, ContractError> {
        Self::from_json(&serde_json::to_value(doc)?)
    }

    fn from_json(doc: &Value) -> Result<Self, ContractError> {
        let paths = doc
            .get("paths")
            .and_then(Value::as_object)
            .ok_or(ContractError::NoPaths)?;

        let default_security = match doc.get("security") {
            Some(security) => bearer_scopes(security, "document")?,
            None => None,
        };

        let mut registry = Self::default();
        for (path, item) in paths {
            for method_name in HTTP_METHODS {
                let Some(operation) = item.get(method_name) else {
                    continue;
                };
                let label = format!("{} {path}", method_name.to_uppercase());

                let required = match operation.get("security") {
                    Some(security) => bearer_scopes(security, &label)?,
                    None => default_security.clone(),
                };

                if let Some(required) = required {
                    let method = Method::from_bytes(method_name.to_uppercase().as_bytes())
                        .map_err(|e| ContractError::MalformedSecurity {
                            operation: label.clone(),
                            reason: e.to_string(),
                        })?;
                    registry.insert(method, path.clone(), required);
                }
            }
        }

        Ok(registry)
    }

    /// Declare an operation's requirement.
    pub fn insert(&mut self, method: Method, path: impl Into<String>, required: RequiredClaims) {
        self.operations.insert((method, path.into()), required);
    }

    /// Requirement for a matched route; undeclared operations are denied.
    pub fn required_claims(
        &self,
        method: &Method,
        path: Option<&str>,
    ) -> Result<&RequiredClaims, AuthError> {
        let undeclared = || AuthError::UndeclaredOperation {
            method: method.to_string(),
            path: path.unwrap_or("<unmatched>").to_string(),
        };

        let path = path.ok_or_else(undeclared)?;
        self.operations
            .get(&(method.clone(), path.to_string()))
            .ok_or_else(undeclared)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Scopes of the `bearerAuth` entry in a security array.
///
/// `None` when no entry names the scheme. Entries of a security array are
/// alternatives, so more than one `bearerAuth` entry is rejected rather than
/// guessing which scope set applies.
fn bearer_scopes(security: &Value, operation: &str) -> Result<Option<RequiredClaims>, ContractError> {
    let malformed = |reason: &str| ContractError::MalformedSecurity {
        operation: operation.to_string(),
        reason: reason.to_string(),
    };

    let entries = security
        .as_array()
        .ok_or_else(|| malformed("security is not an array"))?;

    let mut found: Option<RequiredClaims> = None;
    for entry in entries {
        let Some(scopes) = entry.get(BEARER_AUTH) else {
            continue;
        };
        if found.is_some() {
            return Err(malformed("more than one bearerAuth alternative"));
        }
        let scopes = scopes
            .as_array()
            .ok_or_else(|| malformed("scopes are not an array"))?
            .iter()
            .map(|scope| {
                scope
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed("scope is not a string"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        found = Some(RequiredClaims::new(scopes));
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_contract() -> Value {
        json!({
            "openapi": "3.1.0",
            "security": [{"bearerAuth": []}],
            "paths": {
                "/users": {
                    "get": {"security": [{"bearerAuth": []}]},
                    "post": {"security": [{"bearerAuth": ["things:w"]}]}
                },
                "/users/{userId}": {
                    "get": {}
                },
                "/public": {
                    "get": {"security": []}
                }
            }
        })
    }

    #[test]
    fn loads_operation_scopes() {
        let registry = OperationRegistry::from_json(&sample_contract()).unwrap();

        let post = registry.required_claims(&Method::POST, Some("/users")).unwrap();
        assert_eq!(post, &RequiredClaims::new(["things:w"]));

        let get = registry.required_claims(&Method::GET, Some("/users")).unwrap();
        assert!(get.is_empty());
    }

    #[test]
    fn operations_without_security_inherit_document_requirement() {
        let registry = OperationRegistry::from_json(&sample_contract()).unwrap();
        let get = registry
            .required_claims(&Method::GET, Some("/users/{userId}"))
            .unwrap();
        assert!(get.is_empty());
    }

    #[test]
    fn explicitly_public_operations_are_not_registered() {
        let registry = OperationRegistry::from_json(&sample_contract()).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(matches!(
            registry.required_claims(&Method::GET, Some("/public")),
            Err(AuthError::UndeclaredOperation { .. })
        ));
    }

    #[test]
    fn unknown_route_or_method_is_undeclared() {
        let registry = OperationRegistry::from_json(&sample_contract()).unwrap();
        assert!(matches!(
            registry.required_claims(&Method::DELETE, Some("/users")),
            Err(AuthError::UndeclaredOperation { .. })
        ));
        assert!(matches!(
            registry.required_claims(&Method::GET, None),
            Err(AuthError::UndeclaredOperation { .. })
        ));
    }

    #[test]
    fn bearer_entry_alongside_other_schemes_is_used() {
        let doc = json!({
            "paths": {
                "/things": {
                    "put": {"security": [
                        {"apiKey": []},
                        {"bearerAuth": ["things:w", "things:r"]}
                    ]}
                }
            }
        });
        let registry = OperationRegistry::from_json(&doc).unwrap();
        let put = registry.required_claims(&Method::PUT, Some("/things")).unwrap();
        assert_eq!(put, &RequiredClaims::new(["things:r", "things:w"]));
    }

    #[test]
    fn alternative_bearer_entries_are_rejected() {
        let doc = json!({
            "paths": {
                "/things": {
                    "put": {"security": [
                        {"bearerAuth": ["things:w"]},
                        {"bearerAuth": ["things:admin"]}
                    ]}
                }
            }
        });
        assert!(matches!(
            OperationRegistry::from_json(&doc),
            Err(ContractError::MalformedSecurity { operation, .. }) if operation == "PUT /things"
        ));
    }

    #[test]
    fn malformed_scopes_fail() {
        let doc = json!({
            "paths": {"/x": {"get": {"security": [{"bearerAuth": "things:w"}]}}}
        });
        assert!(matches!(
            OperationRegistry::from_json(&doc),
            Err(ContractError::MalformedSecurity { .. })
        ));

        let doc = json!({
            "paths": {"/x": {"get": {"security": [{"bearerAuth": [1]}]}}}
        });
        assert!(matches!(
            OperationRegistry::from_json(&doc),
            Err(ContractError::MalformedSecurity { .. })
        ));
    }

    #[test]
    fn missing_paths_fail() {
        assert!(matches!(
            OperationRegistry::from_json(&json!({"openapi": "3.1.0"})),
            Err(ContractError::NoPaths)
        ));
    }
}
