//! Shared utilities for integration tests.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Write `content` to a fresh `config.toml` in a temporary directory.
///
/// The directory is removed when the returned guard is dropped.
pub fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("write config");
    (dir, path)
}

/// A document exercising every known field plus plugin tables.
#[allow(dead_code)]
pub const FULL_CONFIG: &str = r#"
root = "/srv/hostd"
state = "/run/hostd-test"
snapshotter = "btrfs"
subreaper = true

[grpc]
socket = "/run/hostd-test/hostd.sock"
uid = 1000
gid = 1000

[debug]
socket = "/run/hostd-test/debug.sock"
level = "debug"

[metrics]
address = "127.0.0.1:1338"

[plugins.cri]
sandbox_image = "pause:3.10"
stream_idle_timeout = "4h"
enable_selinux = false
max_concurrent_downloads = 3

[plugins.cri.registry.mirrors."docker.io"]
endpoint = ["https://mirror.example.com", "https://registry-1.docker.io"]

[plugins.linux]
shim = "hostd-shim"
runtime = "runc"
no_shim = false

[scheduler]
pause_threshold = 0.02
deletion_threshold = 0
started_at = 1979-05-27T07:32:00Z
"#;
