use std::env;
use std::process::Command;

/// Short hash of the checked-out commit, if this is a git work tree.
fn git_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn main() {
    println!("cargo:rerun-if-env-changed=GDIET_GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");

    // Release tarballs have no .git directory; packagers pass the hash instead.
    let sha = env::var("GDIET_GIT_SHA")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(git_sha);

    if let Some(sha) = sha {
        println!("cargo:rustc-env=GDIET_GIT_SHA={}", sha);
    }
}
