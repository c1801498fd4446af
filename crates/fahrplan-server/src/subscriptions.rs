//! Subscription and presence collaborators.
//!
//! Who is subscribed to what is owned by an external store; which live
//! targets an account currently has is owned by whatever tracks
//! connections. The server only reads both through these traits. The
//! in-memory implementations back the standalone binary and the tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use fahrplan_core::SessionId;
use fahrplan_providers::BoxFuture;
use thiserror::Error;

/// Reading or writing subscriptions failed.
#[derive(Debug, Error)]
#[error("subscription store error: {message}")]
pub struct SubscriptionError {
    pub message: String,
}

impl SubscriptionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Maps sessions to the accounts subscribed to them.
pub trait SubscriptionStore: Send + Sync {
    /// Accounts subscribed to `session_id`.
    fn accounts_subscribed_to(
        &self,
        session_id: SessionId,
    ) -> BoxFuture<'_, Result<Vec<String>, SubscriptionError>>;

    /// Sessions `account` is subscribed to.
    fn sessions_subscribed_by<'a>(
        &'a self,
        account: &'a str,
    ) -> BoxFuture<'a, Result<Vec<SessionId>, SubscriptionError>>;
}

/// Resolves an account to its live notification targets.
pub trait Presence: Send + Sync {
    /// Live targets of `account`; empty when it is not connected.
    fn targets_for(&self, account: &str) -> Vec<String>;
}

/// Subscriptions kept in memory, keyed by session.
#[derive(Debug, Default)]
pub struct MemorySubscriptions {
    by_session: RwLock<BTreeMap<SessionId, BTreeSet<String>>>,
}

impl MemorySubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the account was already subscribed.
    pub fn subscribe(&self, account: impl Into<String>, session_id: SessionId) -> bool {
        let mut map = self.by_session.write().unwrap_or_else(|e| e.into_inner());
        map.entry(session_id).or_default().insert(account.into())
    }

    /// Returns false if the account was not subscribed.
    pub fn unsubscribe(&self, account: &str, session_id: SessionId) -> bool {
        let mut map = self.by_session.write().unwrap_or_else(|e| e.into_inner());
        let Some(accounts) = map.get_mut(&session_id) else {
            return false;
        };
        let removed = accounts.remove(account);
        if accounts.is_empty() {
            map.remove(&session_id);
        }
        removed
    }

    /// Drops every subscription of `account`, returning how many there were.
    pub fn unsubscribe_all(&self, account: &str) -> usize {
        let mut map = self.by_session.write().unwrap_or_else(|e| e.into_inner());
        let mut removed = 0;
        map.retain(|_, accounts| {
            if accounts.remove(account) {
                removed += 1;
            }
            !accounts.is_empty()
        });
        removed
    }

    fn accounts(&self, session_id: SessionId) -> Vec<String> {
        let map = self.by_session.read().unwrap_or_else(|e| e.into_inner());
        map.get(&session_id)
            .map(|accounts| accounts.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn sessions(&self, account: &str) -> Vec<SessionId> {
        let map = self.by_session.read().unwrap_or_else(|e| e.into_inner());
        map.iter()
            .filter(|(_, accounts)| accounts.contains(account))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl SubscriptionStore for MemorySubscriptions {
    fn accounts_subscribed_to(
        &self,
        session_id: SessionId,
    ) -> BoxFuture<'_, Result<Vec<String>, SubscriptionError>> {
        let accounts = self.accounts(session_id);
        Box::pin(async move { Ok(accounts) })
    }

    fn sessions_subscribed_by<'a>(
        &'a self,
        account: &'a str,
    ) -> BoxFuture<'a, Result<Vec<SessionId>, SubscriptionError>> {
        let sessions = self.sessions(account);
        Box::pin(async move { Ok(sessions) })
    }
}

/// Presence table maintained by hand.
#[derive(Debug, Default)]
pub struct StaticPresence {
    targets: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl StaticPresence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `account` is reachable at `target`.
    pub fn connect(&self, account: impl Into<String>, target: impl Into<String>) {
        let mut map = self.targets.write().unwrap_or_else(|e| e.into_inner());
        map.entry(account.into()).or_default().insert(target.into());
    }

    /// Forgets one target of `account`.
    pub fn disconnect(&self, account: &str, target: &str) {
        let mut map = self.targets.write().unwrap_or_else(|e| e.into_inner());
        if let Some(targets) = map.get_mut(account) {
            targets.remove(target);
            if targets.is_empty() {
                map.remove(account);
            }
        }
    }
}

impl Presence for StaticPresence {
    fn targets_for(&self, account: &str) -> Vec<String> {
        let map = self.targets.read().unwrap_or_else(|e| e.into_inner());
        map.get(account)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default()
    }
}
