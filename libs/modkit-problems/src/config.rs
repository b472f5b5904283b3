//! Process-wide settings for problem construction.
//!
//! Settings are layered with figment: built-in defaults, then an optional YAML
//! file, then `PROBLEMS_*` environment variables. The active snapshot is held
//! in an `ArcSwap` so reads on the request path never lock.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use figment::Figment;
use figment::providers::{Env, Format as _, Serialized, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Prefix for environment overrides, e.g. `PROBLEMS_DUMP_GUARD_VIOLATIONS=false`.
pub const ENV_PREFIX: &str = "PROBLEMS_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProblemsConfig {
    /// Log a debug dump of the failure when an extension is set on an untyped problem.
    pub dump_guard_violations: bool,
    /// Location tag given to issues produced from `validator` errors.
    pub validation_location: String,
}

impl Default for ProblemsConfig {
    fn default() -> Self {
        Self {
            dump_guard_violations: true,
            validation_location: "body".to_owned(),
        }
    }
}

impl ProblemsConfig {
    /// Load settings from defaults, an optional YAML file and the environment.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the file cannot be read or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file_exact(path));
        }
        let config = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        Ok(config)
    }
}

static CURRENT: LazyLock<ArcSwap<ProblemsConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(ProblemsConfig::default()));

/// Replace the active settings.
pub fn install(config: ProblemsConfig) {
    tracing::debug!(
        dump_guard_violations = config.dump_guard_violations,
        validation_location = %config.validation_location,
        "installing problems config"
    );
    CURRENT.store(Arc::new(config));
}

/// Snapshot of the active settings.
#[must_use]
pub fn current() -> Arc<ProblemsConfig> {
    CURRENT.load_full()
}
