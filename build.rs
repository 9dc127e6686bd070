//! Stamps the commit and build time into `RETRY_STAGE_BUILD_*` env vars.
//!
//! Explicit `RETRY_STAGE_BUILD_*` values win. `SOURCE_DATE_EPOCH` pins the
//! timestamp for reproducible builds. Missing git or date tooling yields
//! `unknown` instead of a build failure.

use std::env;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const GIT_HASH_VAR: &str = "RETRY_STAGE_BUILD_GIT_HASH";
const TIMESTAMP_VAR: &str = "RETRY_STAGE_BUILD_TIMESTAMP";

fn main() {
    for var in [GIT_HASH_VAR, TIMESTAMP_VAR, "SOURCE_DATE_EPOCH"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
    if let Some(git_dir) = command_output("git", &["rev-parse", "--git-dir"]) {
        println!("cargo:rerun-if-changed={git_dir}/HEAD");
        println!("cargo:rerun-if-changed={git_dir}/index");
    }

    let commit = env::var(GIT_HASH_VAR).ok().unwrap_or_else(describe_commit);
    let built = env::var(TIMESTAMP_VAR).ok().unwrap_or_else(build_time);

    println!("cargo:rustc-env={GIT_HASH_VAR}={commit}");
    println!("cargo:rustc-env={TIMESTAMP_VAR}={built}");
}

/// Short hash, suffixed `-dirty` when the work tree has local edits.
fn describe_commit() -> String {
    command_output("git", &["describe", "--always", "--dirty", "--abbrev=12"])
        .unwrap_or_else(|| "unknown".to_string())
}

fn build_time() -> String {
    let epoch = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok());
    let secs = epoch.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    });
    let stamp = format!("@{secs}");
    command_output("date", &["-u", "-d", &stamp, "+%Y-%m-%dT%H:%M:%SZ"])
        .unwrap_or_else(|| format!("unix:{secs}"))
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
