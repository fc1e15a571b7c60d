use std::env;
use std::path::Path;
use std::process::Command;

// Packagers without a checkout can pin the version string through the env.
const OVERRIDE: &str = "TRIAGE_BUILD_SHA";

fn git_describe(repo_root: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let described = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!described.is_empty()).then_some(described)
}

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let repo_root = Path::new(&manifest_dir).join("..");

    let build = env::var(OVERRIDE)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| git_describe(&repo_root))
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env={OVERRIDE}={build}");
    println!("cargo:rerun-if-env-changed={OVERRIDE}");
    for watched in [".git/HEAD", ".git/index"] {
        println!("cargo:rerun-if-changed={}", repo_root.join(watched).display());
    }
}
