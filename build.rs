use std::env;
use std::path::PathBuf;

const HINT: &str = "PROVIDER_REGISTRY_OUTPUT_HINT";

// Bakes a fallback output directory into the binary. Relative hints are taken
// from the manifest directory so they do not depend on where cargo runs.
fn main() {
    println!("cargo:rerun-if-env-changed={HINT}");

    let Some(raw) = env::var_os(HINT).filter(|raw| !raw.is_empty()) else {
        return;
    };
    let mut hint = PathBuf::from(raw);
    if hint.is_relative() {
        if let Some(manifest) = env::var_os("CARGO_MANIFEST_DIR") {
            hint = PathBuf::from(manifest).join(hint);
        }
    }
    let hint = hint.canonicalize().unwrap_or(hint);
    println!("cargo:rustc-env={HINT}={}", hint.display());
}
