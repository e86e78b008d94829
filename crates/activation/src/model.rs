use crate::ActivationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The area of work a profile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationContext {
    Technical,
    Behavioral,
    Semantic,
    Integration,
}

impl ActivationContext {
    pub const ALL: [ActivationContext; 4] = [
        Self::Technical,
        Self::Behavioral,
        Self::Semantic,
        Self::Integration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Behavioral => "behavioral",
            Self::Semantic => "semantic",
            Self::Integration => "integration",
        }
    }

    /// Words that trigger contextual activation.
    pub fn trigger_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Technical => &["infrastructure", "validation", "sre", "deployment", "monitoring"],
            Self::Behavioral => &["behavior", "response", "cognitive", "drift", "consistency"],
            Self::Semantic => &["semantic", "translation", "ontology", "domain", "intent"],
            Self::Integration => &["integration", "cross-pillar", "coordinator", "synergy"],
        }
    }
}

impl fmt::Display for ActivationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivationContext {
    type Err = ActivationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ActivationError::UnknownContext(s.to_string()))
    }
}

/// Runs when a profile is deactivated. An `Err` is logged and the
/// remaining callbacks still run.
pub type DeactivationCallback = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

/// A switchable role.
#[derive(Clone, Serialize, Deserialize)]
pub struct ActivationProfile {
    pub id: String,
    pub name: String,
    pub context: ActivationContext,
    /// 1-10, higher activates first.
    pub priority: i32,
    pub active: bool,
    pub activation_time: Option<DateTime<Utc>>,
    pub expiry_time: Option<DateTime<Utc>>,
    /// Profiles that must already be active.
    pub dependencies: Vec<String>,
    #[serde(skip)]
    pub callbacks: Vec<DeactivationCallback>,
}

impl ActivationProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, context: ActivationContext) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            context,
            priority: 5,
            active: false,
            activation_time: None,
            expiry_time: None,
            dependencies: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn on_deactivate<F>(mut self, callback: F) -> Self
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
        self
    }

    /// Active and not past its expiry at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expiry_time.is_none_or(|expiry| now < expiry)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expiry_time.is_some_and(|expiry| now > expiry)
    }
}

impl fmt::Debug for ActivationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationProfile")
            .field("id", &self.id)
            .field("context", &self.context)
            .field("priority", &self.priority)
            .field("active", &self.active)
            .field("expiry_time", &self.expiry_time)
            .field("dependencies", &self.dependencies)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
