use anyhow::Result;
use chrono::TimeZone;
use std::env;
use std::fs;
use vergen_gitcl::{Emitter, GitclBuilder};

fn main() -> Result<()> {
    // Generate git information
    let gitcl = GitclBuilder::default()
        .describe(true, true, Some("[0-9]*"))
        .build()?;

    let gitcl_res = Emitter::default()
        .idempotent()
        .fail_on_error()
        .add_instructions(&gitcl)
        .and_then(|emitter| emitter.emit());

    if let Err(e) = gitcl_res {
        eprintln!("error occurred while generating instructions: {e:?}");
        Emitter::default().idempotent().fail_on_error().emit()?;
    }

    // Reproducible builds pin the timestamp
    let now = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|val| val.parse::<i64>().ok())
        .and_then(|secs| chrono::Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(chrono::Utc::now);

    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let library_version =
        read_package_version("mp3chunk/Cargo.toml").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=MP3CHUNK_VERSION={library_version}");

    println!("cargo:rerun-if-changed=mp3chunk/Cargo.toml");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    Ok(())
}

/// Reads the `version` key of the `[package]` table.
fn read_package_version(manifest: &str) -> Result<String> {
    let toml_content = fs::read_to_string(manifest)?;
    let mut in_package = false;

    for line in toml_content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_package = line == "[package]";
            continue;
        }

        if !in_package {
            continue;
        }

        let value = line
            .strip_prefix("version")
            .and_then(|rest| rest.trim_start().strip_prefix('='));
        if let Some(value) = value {
            return Ok(value.trim().trim_matches('"').trim_matches('\'').to_string());
        }
    }

    anyhow::bail!("Could not find package version in {manifest}");
}
