//! # Actors and Capabilities
//!
//! Who is calling, and whether they may perform admin operations.
//!
//! The core does not authenticate. The presentation layer builds an
//! [`Actor`] from its session; admin operations then demand an
//! [`AdminCapability`], which can only be obtained through
//! [`Actor::require_admin`].
//!
//! ```rust
//! use toolcrib_core::{Actor, Role};
//!
//! let clerk = Actor::new("front-desk", Role::Worker);
//! assert!(clerk.require_admin().is_err());
//!
//! let admin = Actor::new("alice", Role::Admin);
//! let cap = admin.require_admin().unwrap();
//! assert_eq!(cap.actor().name, "alice");
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Role of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Worker,
}

/// The caller of an operation. `name` ends up in audit rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self::new(name, Role::Admin)
    }

    pub fn worker(name: impl Into<String>) -> Self {
        Self::new(name, Role::Worker)
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns the admin capability, or `Forbidden`.
    pub fn require_admin(&self) -> CoreResult<AdminCapability> {
        if self.is_admin() {
            Ok(AdminCapability {
                actor: self.clone(),
            })
        } else {
            Err(CoreError::Forbidden {
                actor: self.name.clone(),
            })
        }
    }
}

/// Proof that the caller is an admin.
///
/// The field is private: the only constructor is [`Actor::require_admin`].
#[derive(Debug, Clone)]
pub struct AdminCapability {
    actor: Actor,
}

impl AdminCapability {
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Name written to `changed_by` / `deleted_by`.
    pub fn name(&self) -> &str {
        &self.actor.name
    }
}
