// src/build/env.rs

//! Compiler environment composition.

use std::path::{Path, PathBuf};

use crate::build::target::BuildTarget;

/// C toolchain used when the host cannot link for the target OS natively.
pub const CROSS_CC: &str = "x86_64-linux-musl-cc";
pub const CROSS_CXX: &str = "x86_64-linux-musl-c++";

/// Linker flags requesting a statically linked binary.
pub const STATIC_LDFLAGS: &str = r#"-linkmode external -extldflags "-static""#;

/// Make `./`, `-I./` and `-L./` values absolute against `base`, so they stay
/// valid whatever directory the compiler runs in. Anything else is returned
/// unchanged.
pub fn expand_path(value: &str, base: &Path) -> String {
    if let Some(rest) = value.strip_prefix("./") {
        return join_display(base, rest);
    }
    for flag in ["-I", "-L"] {
        if let Some(rest) = value
            .strip_prefix(flag)
            .and_then(|v| v.strip_prefix("./"))
        {
            return format!("{flag}{}", join_display(base, rest));
        }
    }
    value.to_string()
}

/// [`expand_path`] applied to every whitespace-separated token, so flag lists
/// such as `CGO_CFLAGS="-I./include -L./lib"` are handled too.
pub fn expand_env_value(value: &str, base: &Path) -> String {
    if !value.contains(char::is_whitespace) {
        return expand_path(value, base);
    }
    value
        .split_whitespace()
        .map(|token| expand_path(token, base))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn expand_env(env: &[(String, String)], base: &Path) -> Vec<(String, String)> {
    env.iter()
        .map(|(k, v)| (k.clone(), expand_env_value(v, base)))
        .collect()
}

/// Whether `target` needs the musl cross toolchain on a host running
/// `host_os`.
pub fn needs_cross_toolchain(target: &BuildTarget, host_os: &str) -> bool {
    target.is_cross() && target.os != host_os
}

/// Environment added on top of the inherited OS environment, in order:
/// forced cgo, target platform, user overrides, then the cross C toolchain
/// when `cross_toolchain` is set.
pub fn compose_env(
    target: &BuildTarget,
    base: &Path,
    cross_toolchain: bool,
) -> Vec<(String, String)> {
    let mut env = vec![
        ("CGO_ENABLED".to_string(), "1".to_string()),
        ("GOOS".to_string(), target.os.clone()),
        ("GOARCH".to_string(), target.arch.clone()),
    ];
    env.extend(expand_env(&target.env, base));
    if cross_toolchain {
        env.push(("CC".to_string(), CROSS_CC.to_string()));
        env.push(("CXX".to_string(), CROSS_CXX.to_string()));
    }
    env
}

/// Compiler arguments for `target`. Static linking is requested for Linux
/// targets only; other platforms do not support fully static binaries.
pub fn build_args(target: &BuildTarget) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "-o".to_string(),
        target.output.to_string_lossy().into_owned(),
    ];
    if target.os == "linux" {
        args.push("--ldflags".to_string());
        args.push(STATIC_LDFLAGS.to_string());
    }
    args.push(target.entry.clone());
    args
}

fn join_display(base: &Path, rest: &str) -> String {
    let joined: PathBuf = base.join(rest);
    joined.to_string_lossy().into_owned()
}
