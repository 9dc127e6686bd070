//! Compile-time build metadata exposed to the CLI.

/// Semver package version from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// VCS commit hash captured at build time.
pub const GIT_COMMIT: &str = env!("RETRY_STAGE_BUILD_GIT_HASH");

/// Build timestamp captured at compile time.
pub const BUILD_TIMESTAMP: &str = env!("RETRY_STAGE_BUILD_TIMESTAMP");

/// Version block shown by `retry-stage --version`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("RETRY_STAGE_BUILD_GIT_HASH"),
    "\nbuilt: ",
    env!("RETRY_STAGE_BUILD_TIMESTAMP")
);

/// One-line summary logged when the stage starts.
pub fn startup_metadata_line() -> String {
    format!("v{VERSION} ({GIT_COMMIT}, built {BUILD_TIMESTAMP})")
}
