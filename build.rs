use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=GITHUB_REF");
    println!("cargo:rerun-if-env-changed=GITHUB_REF_NAME");
    println!("cargo:rerun-if-env-changed=GITHUB_REF_TYPE");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");

    let version = github_tag_version()
        .or_else(git_describe_version)
        .map(|tag| tag.trim_start_matches('v').to_string())
        .unwrap_or_else(|| env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string()));

    println!("cargo:rustc-env=DATEVER_VERSION={version}");
}

/// Tag name when the build itself runs on a tag push.
fn github_tag_version() -> Option<String> {
    if env::var("GITHUB_REF_TYPE").ok()? != "tag" {
        return None;
    }

    env::var("GITHUB_REF_NAME")
        .ok()
        .or_else(|| {
            env::var("GITHUB_REF")
                .ok()
                .and_then(|full| full.strip_prefix("refs/tags/").map(ToOwned::to_owned))
        })
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
}

fn git_describe_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--exact-match"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let tag = String::from_utf8(output.stdout).ok()?;
    Some(tag.trim().to_string()).filter(|tag| !tag.is_empty())
}
