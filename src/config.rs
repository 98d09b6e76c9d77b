//! Container configuration.
//!
//! Options are an explicit value handed to [`Container::with_options`](crate::Container::with_options);
//! the container reads no process-wide settings on its own. They can be built in
//! code, read from prefixed environment variables, or (with the `config`
//! feature) deserialized from JSON.

use std::env;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Default bound on nested resolutions.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Behavioural switches of a [`Container`](crate::Container).
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, ContainerOptions};
///
/// let options = ContainerOptions::default()
///     .single_flight(false)
///     .max_depth(64);
///
/// let container = Container::with_options(options);
/// assert!(!container.options().single_flight);
/// assert_eq!(container.options().max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    /// Build each singleton and per-context dependent at most once, even under
    /// concurrent first requests.
    pub single_flight: bool,
    /// Run blocking factories on the blocking thread pool.
    pub offload_blocking_factories: bool,
    /// Maximum nesting of dependency resolution.
    pub max_depth: usize,
    /// Log a warning when a named request falls back to the default provider.
    pub warn_on_default_fallback: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            single_flight: true,
            offload_blocking_factories: true,
            max_depth: DEFAULT_MAX_DEPTH,
            warn_on_default_fallback: true,
        }
    }
}

impl ContainerOptions {
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn offload_blocking_factories(mut self, enabled: bool) -> Self {
        self.offload_blocking_factories = enabled;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn warn_on_default_fallback(mut self, enabled: bool) -> Self {
        self.warn_on_default_fallback = enabled;
        self
    }

    /// Reads `<PREFIX>_SINGLE_FLIGHT`, `<PREFIX>_OFFLOAD_BLOCKING_FACTORIES`,
    /// `<PREFIX>_MAX_DEPTH` and `<PREFIX>_WARN_ON_DEFAULT_FALLBACK`.
    ///
    /// Unset variables keep their defaults; unparsable ones are an error.
    pub fn from_env(prefix: &str) -> DiResult<Self> {
        let mut options = Self::default();
        let prefix = prefix.to_uppercase();

        if let Some(v) = env_value(&prefix, "SINGLE_FLIGHT")? {
            options.single_flight = v;
        }
        if let Some(v) = env_value(&prefix, "OFFLOAD_BLOCKING_FACTORIES")? {
            options.offload_blocking_factories = v;
        }
        if let Some(v) = env_value(&prefix, "MAX_DEPTH")? {
            options.max_depth = v;
        }
        if let Some(v) = env_value(&prefix, "WARN_ON_DEFAULT_FALLBACK")? {
            options.warn_on_default_fallback = v;
        }

        options.validate()?;
        Ok(options)
    }

    /// Parses options from JSON. Missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| DiError::Config(format!("invalid options JSON: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> DiResult<()> {
        if self.max_depth == 0 {
            return Err(DiError::Config("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

fn env_value<T: FromStr>(prefix: &str, name: &str) -> DiResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    let key = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", prefix, name)
    };
    match env::var(&key) {
        Ok(raw) => raw
            .trim()
            .to_lowercase()
            .parse::<T>()
            .map(Some)
            .map_err(|e| DiError::Config(format!("{}={:?}: {}", key, raw, e))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(DiError::Config(format!("{}: {}", key, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        env::set_var("INJECT_TEST_SINGLE_FLIGHT", "false");
        env::set_var("INJECT_TEST_MAX_DEPTH", "32");

        let options = ContainerOptions::from_env("inject_test").unwrap();
        assert!(!options.single_flight);
        assert_eq!(options.max_depth, 32);
        assert!(options.offload_blocking_factories);
        assert!(options.warn_on_default_fallback);

        env::remove_var("INJECT_TEST_SINGLE_FLIGHT");
        env::remove_var("INJECT_TEST_MAX_DEPTH");
    }

    #[test]
    #[serial]
    fn unparsable_env_value_is_a_config_error() {
        env::set_var("INJECT_BAD_MAX_DEPTH", "lots");
        let err = ContainerOptions::from_env("INJECT_BAD").unwrap_err();
        assert!(matches!(err, DiError::Config(ref m) if m.contains("INJECT_BAD_MAX_DEPTH")));
        env::remove_var("INJECT_BAD_MAX_DEPTH");
    }

    #[test]
    #[serial]
    fn zero_depth_is_rejected() {
        env::set_var("INJECT_ZERO_MAX_DEPTH", "0");
        assert!(ContainerOptions::from_env("INJECT_ZERO").is_err());
        env::remove_var("INJECT_ZERO_MAX_DEPTH");
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let options = ContainerOptions::from_json(r#"{ "single_flight": false }"#).unwrap();
        assert_eq!(options, ContainerOptions::default().single_flight(false));
        assert!(matches!(
            ContainerOptions::from_json("{ not json"),
            Err(DiError::Config(_))
        ));
    }
}
