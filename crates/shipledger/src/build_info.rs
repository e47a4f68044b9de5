//! Build metadata embedded at compile time.

use shipledger_core::cache::KeyPrefix;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git commit captured by the build script.
const GIT_SHA: Option<&str> = option_env!("VERGEN_GIT_SHA");

/// Build identifier supplied by CI through `SHIPLEDGER_BUILD_ID`.
const BUILD_ID: Option<&str> = option_env!("SHIPLEDGER_BUILD_ID");

/// Value vergen emits when the build did not run inside a git checkout.
const VERGEN_PLACEHOLDER: &str = "VERGEN_IDEMPOTENT_OUTPUT";

fn git_sha() -> Option<&'static str> {
    GIT_SHA.filter(|sha| *sha != VERGEN_PLACEHOLDER)
}

/// Cache key prefix for this build.
pub fn key_prefix() -> KeyPrefix {
    KeyPrefix::from_build(PKG_VERSION, git_sha(), BUILD_ID)
}

/// Full version string: `{version}+{sha}` when the commit is known.
pub fn version_string() -> String {
    match git_sha() {
        Some(sha) => format!("{PKG_VERSION}+{sha}"),
        None => PKG_VERSION.to_string(),
    }
}
