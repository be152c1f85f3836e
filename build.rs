//! Build script to capture git commit hash at compile time
//!
//! Stamped into every run summary as `build`.

use std::process::Command;

fn main() {
    let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output();

    let git_hash = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => String::from("unknown"),
    };

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rerun-if-changed=.git/HEAD");
}
