//! Caller identity
//!
//! Authentication happens upstream; operations receive an already-verified
//! identity (or none, which maps to `Unauthenticated`).

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Platform role attached to a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Creator,
    Auditor,
    Contributor,
}

/// A verified caller identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub roles: Vec<Role>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, vec![Role::Admin])
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// Resolve an optional identity, or fail with `Unauthenticated`.
pub fn require_caller(caller: Option<&Caller>) -> EngineResult<&Caller> {
    caller.ok_or_else(|| EngineError::unauthenticated("caller identity required"))
}
