// Stamps HARVEST_VERSION into the binary. Release pipelines may replace the
// patch segment through HARVEST_PATCH_VERSION.

use std::env;

fn main() {
    let version = env::var("CARGO_PKG_VERSION").expect("CARGO_PKG_VERSION not set");

    let (release, patch) = match version.rsplit_once('.') {
        Some((release, patch)) if release.contains('.') => (release, patch),
        _ => panic!("Cargo.toml version must be MAJOR.MINOR.PATCH, got {}", version),
    };

    let patch = env::var("HARVEST_PATCH_VERSION")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| patch.to_string());

    println!("cargo:rustc-env=HARVEST_VERSION={}.{}", release, patch);
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=HARVEST_PATCH_VERSION");
}
