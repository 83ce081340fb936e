//! Session keys: one live session per `(tenant, user)`.
//!
//! The durable form is `<tenantId>:<userId>`.  Tenant ids never contain
//! `:` (enforced by config validation); user ids may, so parsing splits on
//! the first colon only.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub tenant_id: String,
    pub user_id: String,
}

impl SessionKey {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Parse the durable `tenantId:userId` form.
    pub fn parse(raw: &str) -> Option<Self> {
        let (tenant, user) = raw.split_once(':')?;
        if tenant.is_empty() || user.is_empty() {
            return None;
        }
        Some(Self::new(tenant, user))
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tenant_id, self.user_id)
    }
}
