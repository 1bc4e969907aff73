//! Authorization middleware stage.
//!
//! Checks the caller's role, read from an identity attribute set during
//! authentication, against a static [`PermissionTable`].
//!
//! A missing role, a role that is not a string, and a role that is not in
//! the table are all rejected with the same `403 forbidden`. Only the log
//! tells them apart.
//!
//! # Example
//!
//! ```
//! use aegis_middleware::stages::{AuthorizationMiddleware, PermissionTable};
//!
//! let table = PermissionTable::builder()
//!     .allow_role("admin", ["read", "write", "delete"])
//!     .allow_role("viewer", ["read"])
//!     .build();
//!
//! assert!(table.allows("viewer", "read"));
//! assert!(!table.allows("viewer", "write"));
//!
//! let middleware = AuthorizationMiddleware::new("role", "write", table).unwrap();
//! assert_eq!(middleware.permission(), "write");
//! ```

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{Request, Response};
use aegis_config::{ConfigError, PermissionsConfig};
use aegis_core::{AppError, Failure};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const FORBIDDEN: &str = "forbidden";
const MISSING_PERMISSION: &str = "user does not have the required permission";

/// Immutable role to permission mapping.
///
/// Cloning is cheap; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    roles: Arc<HashMap<String, HashSet<String>>>,
}

impl PermissionTable {
    /// Creates a table builder.
    #[must_use]
    pub fn builder() -> PermissionTableBuilder {
        PermissionTableBuilder::default()
    }

    /// Builds a table from the `[permissions]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty role or permission
    /// name.
    pub fn from_config(config: &PermissionsConfig) -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        for (role, permissions) in config {
            if role.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "permissions",
                    "role names must not be empty",
                ));
            }
            if permissions.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::invalid_value(
                    format!("permissions.{role}"),
                    "permission names must not be empty",
                ));
            }
            builder = builder.allow_role(role.as_str(), permissions.iter().map(String::as_str));
        }
        Ok(builder.build())
    }

    /// Returns `true` if `role` is in the table.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Returns `true` if `role` holds `permission`.
    #[must_use]
    pub fn allows(&self, role: &str, permission: &str) -> bool {
        self.roles
            .get(role)
            .is_some_and(|permissions| permissions.contains(permission))
    }

    /// Returns the number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns `true` if the table has no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Builder for [`PermissionTable`].
#[derive(Debug, Default)]
pub struct PermissionTableBuilder {
    roles: HashMap<String, HashSet<String>>,
}

impl PermissionTableBuilder {
    /// Grants `permissions` to `role`. Repeated calls accumulate.
    #[must_use]
    pub fn allow_role<I, S>(mut self, role: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .entry(role.into())
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Freezes the table.
    #[must_use]
    pub fn build(self) -> PermissionTable {
        PermissionTable {
            roles: Arc::new(self.roles),
        }
    }
}

/// Checks that the caller's role holds `permission`.
///
/// # Errors
///
/// - no role, a non-string role, or an unknown role gives `403 forbidden`
/// - a known role without the permission gives
///   `403 user does not have the required permission`
pub fn authorize(
    ctx: &MiddlewareContext,
    role_key: &str,
    permission: &str,
    table: &PermissionTable,
) -> Result<(), Failure> {
    let role = match ctx.attribute(role_key) {
        Some(Value::String(role)) => role,
        Some(other) => {
            tracing::warn!(
                role_key,
                found = value_kind(other),
                "Role attribute is not a string"
            );
            return Err(AppError::forbidden(FORBIDDEN).into());
        }
        None => {
            tracing::warn!(role_key, "Role attribute missing");
            return Err(AppError::forbidden(FORBIDDEN).into());
        }
    };

    if !table.has_role(role) {
        tracing::warn!(role = %role, "Unknown role");
        return Err(AppError::forbidden(FORBIDDEN).into());
    }

    if !table.allows(role, permission) {
        tracing::debug!(role = %role, permission, "Permission denied");
        return Err(AppError::forbidden(MISSING_PERMISSION).into());
    }

    Ok(())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Pipeline stage that runs [`authorize`] for one required permission.
#[derive(Debug, Clone)]
pub struct AuthorizationMiddleware {
    role_key: String,
    permission: String,
    table: PermissionTable,
}

impl AuthorizationMiddleware {
    /// Creates the stage.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `role_key` or `permission` is
    /// empty.
    pub fn new(
        role_key: impl Into<String>,
        permission: impl Into<String>,
        table: PermissionTable,
    ) -> Result<Self, ConfigError> {
        let role_key = role_key.into();
        let permission = permission.into();

        if role_key.trim().is_empty() {
            return Err(ConfigError::invalid_value("auth.role_key", "must not be empty"));
        }
        if permission.trim().is_empty() {
            return Err(ConfigError::invalid_value("permission", "must not be empty"));
        }

        Ok(Self {
            role_key,
            permission,
            table,
        })
    }

    /// Returns the attribute key holding the role.
    #[must_use]
    pub fn role_key(&self) -> &str {
        &self.role_key
    }

    /// Returns the permission this stage requires.
    #[must_use]
    pub fn permission(&self) -> &str {
        &self.permission
    }
}

impl Middleware for AuthorizationMiddleware {
    fn name(&self) -> &'static str {
        Stage::Authorization.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            match authorize(ctx, &self.role_key, &self.permission, &self.table) {
                Ok(()) => next.run(ctx, request).await,
                Err(failure) => ctx.fail(failure, self.name()),
            }
        })
    }
}
