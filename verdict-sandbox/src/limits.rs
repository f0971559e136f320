//! Resource limits and capability grants for sandboxed execution

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// A named primitive the sandbox may expose to a script.
///
/// Anything not listed here is never reachable from script code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    /// `JSON.parse` / `JSON.stringify`
    StructuredData,
    /// A frozen subset of `Math`
    Math,
    /// The `Date` constructor
    Date,
    /// The `String` constructor
    Strings,
    /// The `RegExp` constructor
    RegExp,
    /// Write-only `console`
    Logging,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::StructuredData,
        Capability::Math,
        Capability::Date,
        Capability::Strings,
        Capability::RegExp,
        Capability::Logging,
    ];

    /// The script-visible global this capability is bound to.
    pub fn global_name(self) -> &'static str {
        match self {
            Capability::StructuredData => "JSON",
            Capability::Math => "Math",
            Capability::Date => "Date",
            Capability::Strings => "String",
            Capability::RegExp => "RegExp",
            Capability::Logging => "console",
        }
    }
}

/// Limits applied to every sandboxed call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxLimits {
    /// Wall-clock deadline per call
    pub timeout_ms: u64,

    /// Heap ceiling of the script's isolate
    pub max_heap_bytes: usize,

    /// Capabilities the script may use
    pub allowed_capabilities: BTreeSet<Capability>,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 100,
            max_heap_bytes: 32 * 1024 * 1024,
            allowed_capabilities: Capability::ALL.into_iter().collect(),
        }
    }
}

impl SandboxLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.allowed_capabilities.contains(&capability)
    }

    /// Globals that must be removed because their capability was not granted
    pub fn denied_globals(&self) -> Vec<&'static str> {
        Capability::ALL
            .into_iter()
            .filter(|capability| !self.allows(*capability))
            .map(Capability::global_name)
            .collect()
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_heap_bytes(mut self, max_heap_bytes: usize) -> Self {
        self.max_heap_bytes = max_heap_bytes;
        self
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.allowed_capabilities = capabilities.into_iter().collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = SandboxLimits::default();
        assert_eq!(limits.timeout(), Duration::from_millis(100));
        assert_eq!(limits.max_heap_bytes, 32 * 1024 * 1024);
        assert!(limits.denied_globals().is_empty());
    }

    #[test]
    fn test_denied_globals() {
        let limits = SandboxLimits::default().with_capabilities([Capability::StructuredData]);
        let denied = limits.denied_globals();
        assert!(denied.contains(&"Math"));
        assert!(denied.contains(&"console"));
        assert!(!denied.contains(&"JSON"));
    }

    #[test]
    fn test_deserialize_partial() {
        let limits: SandboxLimits =
            serde_json::from_str(r#"{"timeoutMs": 250, "allowedCapabilities": ["math", "logging"]}"#)
                .unwrap();
        assert_eq!(limits.timeout_ms, 250);
        assert_eq!(limits.max_heap_bytes, 32 * 1024 * 1024);
        assert!(limits.allows(Capability::Math));
        assert!(!limits.allows(Capability::RegExp));
    }
}
