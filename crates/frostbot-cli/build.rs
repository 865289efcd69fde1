use std::process::Command;

fn git(args: &[&str]) -> Option<std::process::Output> {
    Command::new("git").args(args).output().ok()
}

fn main() {
    let version = env!("CARGO_PKG_VERSION");
    let is_release = std::env::var("PROFILE").unwrap_or_default() == "release";

    let version_str = if is_release {
        version.to_string()
    } else {
        let hash = git(&["rev-parse", "--short", "HEAD"])
            .filter(|output| output.status.success())
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .map(|hash| hash.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let dirty = git(&["diff-index", "--quiet", "HEAD"])
            .map(|output| !output.status.success())
            .unwrap_or(false);

        if dirty {
            format!("{}+{}-dirty", version, hash)
        } else {
            format!("{}+{}", version, hash)
        }
    };

    println!("cargo:rustc-env=VERSION_STRING={}", version_str);
}
