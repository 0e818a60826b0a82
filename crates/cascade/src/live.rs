//! Live configuration handle with change notification

use crate::cascade::CascadeConfig;
use std::fmt;
use tracing::debug;
use types::{get_path, set_path, unset_path, Result, Value};

/// Observer of configuration changes
///
/// `path` is the changed path, or `None` after a full reload.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, path: Option<&str>, config: &Value);
}

impl<F> ChangeListener for F
where
    F: Fn(Option<&str>, &Value) + Send + Sync,
{
    fn on_change(&self, path: Option<&str>, config: &Value) {
        self(path, config)
    }
}

/// Owns a cascade and its resolved tree, with path accessors and reload
pub struct LiveConfig {
    cascade: CascadeConfig,
    listeners: Vec<Box<dyn ChangeListener>>,
}

impl LiveConfig {
    /// Resolve `cascade` and wrap the result
    pub async fn load(cascade: CascadeConfig) -> Result<Self> {
        let mut live = Self {
            cascade,
            listeners: Vec::new(),
        };
        live.reload().await?;
        Ok(live)
    }

    /// The whole current tree
    pub fn config(&self) -> &Value {
        self.cascade.accumulator()
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(self.config(), path)
    }

    /// Value at `path`, or `default` when nothing is there
    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Value {
        self.get(path).cloned().unwrap_or_else(|| default.into())
    }

    /// Assign `value` at `path` and notify listeners
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        set_path(self.cascade.accumulator_mut(), path, value.into());
        self.notify(Some(path));
    }

    /// Remove `path`; listeners are notified only if something was removed
    pub fn unset(&mut self, path: &str) -> bool {
        let removed = unset_path(self.cascade.accumulator_mut(), path);
        if removed {
            self.notify(Some(path));
        }
        removed
    }

    /// Re-run every source from scratch, then notify listeners with no path
    pub async fn reload(&mut self) -> Result<()> {
        self.cascade.resolve().await?;
        self.notify(None);
        Ok(())
    }

    /// Register a listener
    pub fn on_change(&mut self, listener: impl ChangeListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Give back the underlying cascade
    pub fn into_cascade(self) -> CascadeConfig {
        self.cascade
    }

    fn notify(&self, path: Option<&str>) {
        debug!(path = ?path, listeners = self.listeners.len(), "Configuration changed");
        let config = self.cascade.accumulator();
        for listener in &self.listeners {
            listener.on_change(path, config);
        }
    }
}

impl fmt::Debug for LiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveConfig")
            .field("cascade", &self.cascade)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
