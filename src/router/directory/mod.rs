use crate::config::CallerConfig;
use crate::errors::ParleyError;
use crate::router::permissions::Role;
use crate::tools::base::CallerContext;
use async_trait::async_trait;
use std::collections::HashMap;

/// A known caller within one tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub user_id: String,
    pub tenant_id: String,
    pub role: Role,
    pub display_name: String,
}

impl Caller {
    pub fn context(&self, request_id: &str) -> CallerContext {
        CallerContext {
            user_id: self.user_id.clone(),
            tenant_id: self.tenant_id.clone(),
            role: self.role.clone(),
            display_name: self.display_name.clone(),
            request_id: request_id.to_string(),
        }
    }
}

impl From<&CallerConfig> for Caller {
    fn from(config: &CallerConfig) -> Self {
        let display_name = if config.display_name.trim().is_empty() {
            config.user_id.clone()
        } else {
            config.display_name.clone()
        };
        Self {
            user_id: config.user_id.clone(),
            tenant_id: config.tenant_id.clone(),
            role: config.role.clone(),
            display_name,
        }
    }
}

/// Resolves who is speaking. `Ok(None)` means the caller is unknown in that
/// tenant; `Err` means the lookup itself failed.
#[async_trait]
pub trait CallerDirectory: Send + Sync {
    async fn resolve(&self, user_id: &str, tenant_id: &str) -> Result<Option<Caller>, ParleyError>;
}

/// Directory built from the `callers` config section.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    callers: HashMap<(String, String), Caller>,
}

impl StaticDirectory {
    pub fn new(callers: impl IntoIterator<Item = Caller>) -> Self {
        Self {
            callers: callers
                .into_iter()
                .map(|c| ((c.user_id.clone(), c.tenant_id.clone()), c))
                .collect(),
        }
    }

    pub fn from_config(callers: &[CallerConfig]) -> Self {
        Self::new(callers.iter().map(Caller::from))
    }

    pub fn len(&self) -> usize {
        self.callers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }
}

#[async_trait]
impl CallerDirectory for StaticDirectory {
    async fn resolve(&self, user_id: &str, tenant_id: &str) -> Result<Option<Caller>, ParleyError> {
        Ok(self
            .callers
            .get(&(user_id.to_string(), tenant_id.to_string()))
            .cloned())
    }
}
