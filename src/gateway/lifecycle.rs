//! Generation lifecycle: Installing → Waiting → Active.

use std::fmt;

use serde::Deserialize;

use crate::app::{ConfluenceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Precaching the shell into the static store.
    Installing,
    /// Installed, waiting for consumers of the previous generation to close.
    Waiting,
    /// Serving requests. Older generations have been deleted.
    Active,
    /// Install failed or the generation was uninstalled.
    Redundant,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Installing => "installing",
            Phase::Waiting => "waiting",
            Phase::Active => "active",
            Phase::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Precache finished.
    Installed,
    /// Precache failed.
    InstallFailed,
    /// This generation was already activated by an earlier run.
    Resumed,
    /// Adopt the new generation without waiting for consumers.
    ForceActivate,
    /// Every consumer of the previous generation has closed.
    ConsumersReleased,
    Uninstall,
}

/// Administrative message accepted on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlMessage {
    ForceActivate,
}

impl ControlMessage {
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Names of one generation's stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    app: String,
    version: String,
}

impl Generation {
    pub fn new(app: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            version: version.into(),
        }
    }

    /// `<app>-<version>`, holds the precached shell.
    pub fn static_store(&self) -> String {
        format!("{}-{}", self.app, self.version)
    }

    /// `<app>-runtime-<version>`, holds responses cached while serving.
    pub fn runtime_store(&self) -> String {
        format!("{}-runtime-{}", self.app, self.version)
    }

    /// Whether a store name belongs to this app, any generation.
    pub fn owns(&self, store: &str) -> bool {
        let prefix = format!("{}-", self.app.to_lowercase());
        store.to_lowercase().starts_with(&prefix)
    }

    pub fn is_current(&self, store: &str) -> bool {
        store == self.static_store() || store == self.runtime_store()
    }

    /// Stores of this app left over from other generations.
    pub fn stale<'a>(&self, stores: &'a [String]) -> Vec<&'a str> {
        stores
            .iter()
            .map(String::as_str)
            .filter(|name| self.owns(name) && !self.is_current(name))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    phase: Phase,
    skip_waiting: bool,
}

impl Lifecycle {
    pub fn new(skip_waiting: bool) -> Self {
        Self {
            phase: Phase::Installing,
            skip_waiting,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Apply an event and return the new phase.
    pub fn apply(&mut self, event: LifecycleEvent) -> Result<Phase> {
        use LifecycleEvent::*;
        use Phase::*;

        let next = match (self.phase, event) {
            (_, Uninstall) => Redundant,
            (Installing, Installed) if self.skip_waiting => Active,
            (Installing, Installed) => Waiting,
            (Installing, InstallFailed) => Redundant,
            (Installing, Resumed) => Active,
            // Remembered until the install completes
            (Installing, ForceActivate) => {
                self.skip_waiting = true;
                Installing
            }
            (Waiting, ForceActivate) | (Waiting, ConsumersReleased) => Active,
            (Active, ForceActivate) | (Active, ConsumersReleased) => Active,
            (phase, event) => {
                return Err(ConfluenceError::Lifecycle(format!(
                    "{:?} is not valid while {}",
                    event, phase
                )))
            }
        };

        self.phase = next;
        Ok(next)
    }
}
