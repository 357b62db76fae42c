//! Global constants used throughout the credo codebase.
//!
//! File names, timeouts, and other values shared by several modules live here
//! so they are easy to discover and change in one place.

use std::time::Duration;

/// Name of the spell manifest searched for in the project directory and its parents.
pub const MANIFEST_FILE_NAME: &str = "credospell.toml";

/// File inside the cache directory that stores memoized resolutions.
pub const CACHE_FILE_NAME: &str = "spells.json";

/// Environment variable used to pass `--manifest-path` down to command handlers.
pub const MANIFEST_ENV_VAR: &str = "CREDO_MANIFEST";

/// Environment variable used to pass `--config` down to command handlers.
pub const CONFIG_ENV_VAR: &str = "CREDO_CONFIG";

/// Default timeout for external package-manager commands (10 minutes).
///
/// `apt-get update` on a cold mirror and large downloads can take several
/// minutes, so this is deliberately generous.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Timeout for HTTP downloads performed by the url module (5 minutes).
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Minimum Jaro-Winkler similarity for "did you mean" module hints.
pub const MODULE_SUGGESTION_THRESHOLD: f64 = 0.8;
