//! Centralized installer settings.
//! These values are used by download helpers, planners and the runtime manager.

pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default number of concurrent downloads per batch
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Attempts per artifact before a transient failure is surfaced
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base retry delay; attempt `n` waits `n * RETRY_DELAY_MS`
pub const RETRY_DELAY_MS: u64 = 1000;

/// Java major version assumed when a manifest does not declare one
pub const DEFAULT_JAVA_MAJOR: u32 = 17;

pub const LAUNCHER_NAME: &str = "EmberLauncher";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

// URL Constants
pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
pub const ADOPTIUM_API_URL: &str = "https://api.adoptium.net/v3/binary/latest";

pub fn current_timeout() -> std::time::Duration {
    std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS)
}
