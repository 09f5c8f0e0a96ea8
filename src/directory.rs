//! User directory. Existence checks for doctors and actor resolution for the
//! authentication layer.
use super::appointment::{Actor, Role, UserId};
use std::collections::HashMap;
use std::sync::Arc;

pub trait UserDirectory: Send + Sync {
    fn exists(&self, id: &UserId) -> anyhow::Result<bool>;
}

/// Users and their roles, kept in their own sled tree.
pub struct UserRegistry {
    users: sled::Tree,
}

impl UserRegistry {
    pub fn open(instance: &Arc<sled::Db>) -> anyhow::Result<Self> {
        Ok(Self {
            users: instance.open_tree("users")?,
        })
    }

    pub fn register(&self, id: &UserId, role: Role) -> anyhow::Result<()> {
        self.users
            .insert(id.as_str().as_bytes(), minicbor::to_vec(role)?)?;
        tracing::debug!(user = %id, role = role.as_str(), "registered user");
        Ok(())
    }

    /// Resolve the current actor from an authenticated user id.
    pub fn resolve(&self, id: &UserId) -> anyhow::Result<Option<Actor>> {
        match self.users.get(id.as_str().as_bytes())? {
            Some(bytes) => {
                let role: Role = minicbor::decode(&bytes)?;
                Ok(Some(Actor::new(id.clone(), role)))
            }
            None => Ok(None),
        }
    }
}

impl UserDirectory for UserRegistry {
    fn exists(&self, id: &UserId) -> anyhow::Result<bool> {
        Ok(self.users.contains_key(id.as_str().as_bytes())?)
    }
}

// in-memory directory, handy when no database is around
impl UserDirectory for HashMap<UserId, Role> {
    fn exists(&self, id: &UserId) -> anyhow::Result<bool> {
        Ok(self.contains_key(id))
    }
}
