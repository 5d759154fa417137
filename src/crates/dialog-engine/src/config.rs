//! Tunables a host sets once per engine instance, mirroring the teacher's
//! builder-style `RetryPolicy`/runtime configuration structs rather than
//! scattering constants through the node set.

use std::time::Duration;

/// Engine-wide tunables. Built with [`EngineConfig::builder`]; every field
/// has a spec-compatible default so `EngineConfig::default()` matches the
/// original implementation's unconfigured behavior.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Substituted for a template placeholder that fails to resolve
    /// (spec §7: "substitute a configured fallback message").
    pub template_fallback: String,
    /// Default timeout applied to the `http-response-branch` node's
    /// outbound request when the script doesn't set one explicitly.
    pub http_default_timeout: Duration,
    /// Upper bound on how many nodes the pre-dispatch interrupt scan (spec
    /// §4.1) will walk before giving up and logging a warning, guarding
    /// against a pathologically large script turning every tick quadratic.
    pub max_interrupt_scan_nodes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_fallback: String::new(),
            http_default_timeout: Duration::from_secs(10),
            max_interrupt_scan_nodes: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    inner: OptionalConfig,
}

#[derive(Debug, Default)]
struct OptionalConfig {
    template_fallback: Option<String>,
    http_default_timeout: Option<Duration>,
    max_interrupt_scan_nodes: Option<usize>,
}

impl EngineConfigBuilder {
    pub fn template_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.inner.template_fallback = Some(fallback.into());
        self
    }

    pub fn http_default_timeout(mut self, timeout: Duration) -> Self {
        self.inner.http_default_timeout = Some(timeout);
        self
    }

    pub fn max_interrupt_scan_nodes(mut self, max: usize) -> Self {
        self.inner.max_interrupt_scan_nodes = Some(max);
        self
    }

    pub fn build(self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            template_fallback: self.inner.template_fallback.unwrap_or(defaults.template_fallback),
            http_default_timeout: self.inner.http_default_timeout.unwrap_or(defaults.http_default_timeout),
            max_interrupt_scan_nodes: self.inner.max_interrupt_scan_nodes.unwrap_or(defaults.max_interrupt_scan_nodes),
        }
    }
}
