/// Configuration for history trackers.

/// Capacity used when none is given explicitly.
const DEFAULT_CAPACITY: usize = 100;

/// Environment variable that overrides the default capacity.
pub const CAPACITY_ENV_VAR: &str = "UNDO_CELL_CAPACITY";

/// Tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Max records kept per tracker.
    pub default_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl HistoryConfig {
    /// Builds a config whose capacity honors `UNDO_CELL_CAPACITY`.
    pub fn from_env() -> Self {
        Self {
            default_capacity: resolve_default_capacity(),
        }
    }
}

/// Resolves the default capacity.
///
/// Resolution order:
/// 1. `UNDO_CELL_CAPACITY` environment variable, if it parses to a positive integer
/// 2. Built-in default (100)
pub fn resolve_default_capacity() -> usize {
    capacity_from_env().unwrap_or(DEFAULT_CAPACITY)
}

/// Reads `UNDO_CELL_CAPACITY`.
///
/// Returns `None` when the variable is unset, or when it is not a positive
/// integer (logged and ignored).
pub fn capacity_from_env() -> Option<usize> {
    let raw = std::env::var(CAPACITY_ENV_VAR).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!("Ignoring invalid {CAPACITY_ENV_VAR}={raw:?}");
            None
        }
    }
}
