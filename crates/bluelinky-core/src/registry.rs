// ── Account registry ──
//
// Maps account configuration node ids to their login coordinators. Action
// nodes resolve their account reference here at construction time.

use dashmap::DashMap;
use tracing::debug;

use crate::login::LoginCoordinator;

/// Concurrent id → account map.
#[derive(Default)]
pub struct AccountRegistry {
    accounts: DashMap<String, LoginCoordinator>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `account` under `id`. A previously registered account with
    /// the same id is shut down.
    pub fn register(&self, id: impl Into<String>, account: LoginCoordinator) {
        let id = id.into();
        if let Some(previous) = self.accounts.insert(id.clone(), account) {
            debug!(account = %id, "replacing registered account");
            previous.shutdown();
        }
    }

    pub fn get(&self, id: &str) -> Option<LoginCoordinator> {
        self.accounts.get(id).map(|entry| entry.value().clone())
    }

    /// Remove and shut down the account registered under `id`.
    pub fn remove(&self, id: &str) -> bool {
        match self.accounts.remove(id) {
            Some((_, account)) => {
                account.shutdown();
                debug!(account = %id, "account removed");
                true
            }
            None => false,
        }
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.accounts.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
