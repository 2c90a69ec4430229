use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use config::SignalConfig;
use query_key::QueryKey;
use thiserror::Error;

use crate::event::CacheEvent;
use crate::types::{EventCallback, SubscriptionId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("Too many subscribers for key {key} (limit {limit})")]
    TooManySubscribers { key: String, limit: usize },

    #[error("Signal registry lock poisoned")]
    LockPoisoned,
}

type Subscribers = Vec<(SubscriptionId, EventCallback)>;

/// Per-key observer registry for cache change notifications
pub struct SignalManager {
    subscriptions: RwLock<HashMap<QueryKey, Subscribers>>,
    listeners: RwLock<Subscribers>,
    max_subscribers_per_key: usize,
}

impl std::fmt::Debug for SignalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalManager")
            .field("subscribed_keys", &self.subscribed_key_count())
            .field("listener_count", &self.listener_count())
            .field("max_subscribers_per_key", &self.max_subscribers_per_key)
            .finish()
    }
}

impl SignalManager {
    pub fn new() -> Self {
        Self::with_config(&SignalConfig::default())
    }

    pub fn with_config(config: &SignalConfig) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            max_subscribers_per_key: config.max_subscribers_per_key,
        }
    }

    /// Subscribe to changes of a single key
    pub fn subscribe<F>(&self, key: QueryKey, callback: F) -> Result<SubscriptionId, SignalError>
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| SignalError::LockPoisoned)?;

        let subscribers = subscriptions.entry(key.clone()).or_default();
        if subscribers.len() >= self.max_subscribers_per_key {
            return Err(SignalError::TooManySubscribers {
                key: key.to_string(),
                limit: self.max_subscribers_per_key,
            });
        }

        let id = SubscriptionId::new();
        subscribers.push((id, Arc::new(callback)));
        tracing::trace!("Subscribed {} to {}", id, key);
        Ok(id)
    }

    /// Add a listener that receives events for every key
    pub fn add_listener<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push((id, Arc::new(callback)));
        }
        id
    }

    /// Remove a key subscription or a listener. Returns false if the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if let Ok(mut subscriptions) = self.subscriptions.write() {
            let found = subscriptions.iter_mut().find_map(|(key, subscribers)| {
                let pos = subscribers.iter().position(|(sid, _)| *sid == id)?;
                subscribers.remove(pos);
                Some((key.clone(), subscribers.is_empty()))
            });

            if let Some((key, emptied)) = found {
                if emptied {
                    subscriptions.remove(&key);
                }
                return true;
            }
        }

        if let Ok(mut listeners) = self.listeners.write() {
            if let Some(pos) = listeners.iter().position(|(sid, _)| *sid == id) {
                listeners.remove(pos);
                return true;
            }
        }

        false
    }

    /// Deliver an event to the subscribers of its key and to all listeners.
    ///
    /// Callbacks run after the registry locks are released, so a callback may
    /// subscribe or unsubscribe without deadlocking.
    pub fn emit(&self, event: &CacheEvent) {
        let mut targets: Vec<EventCallback> = Vec::new();

        if let Ok(subscriptions) = self.subscriptions.read() {
            if let Some(subscribers) = subscriptions.get(&event.key) {
                targets.extend(subscribers.iter().map(|(_, cb)| Arc::clone(cb)));
            }
        }
        if let Ok(listeners) = self.listeners.read() {
            targets.extend(listeners.iter().map(|(_, cb)| Arc::clone(cb)));
        }

        for callback in targets {
            callback(event);
        }
    }

    /// Number of subscribers bound to a key
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.subscriptions
            .read()
            .map(|s| s.get(key).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn has_subscribers(&self, key: &QueryKey) -> bool {
        self.subscriber_count(key) > 0
    }

    pub fn subscribed_key_count(&self) -> usize {
        self.subscriptions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }

    /// Drop every subscription and listener
    pub fn clear(&self) {
        if let Ok(mut subscriptions) = self.subscriptions.write() {
            subscriptions.clear();
        }
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.clear();
        }
    }
}

impl Default for SignalManager {
    fn default() -> Self {
        Self::new()
    }
}
