//! Tests for the ALSA loopback resolver against fake `modprobe`/`arecord` scripts.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rtspmic_core::{DeviceError, DeviceResolver};
use rtspmic_runtime::AlsaLoopbackResolver;
use tempfile::TempDir;

const LISTING: &str = "\
**** List of CAPTURE Hardware Devices ****
card 0: PCH [HDA Intel PCH], device 0: ALC3246 Analog [ALC3246 Analog]
  Subdevices: 1/1
card 4: Loopback [Loopback], device 0: Loopback PCM [Loopback PCM]
  Subdevices: 8/8";

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn resolver(modprobe: &Path, arecord: &Path) -> AlsaLoopbackResolver {
    AlsaLoopbackResolver::new()
        .with_programs(
            modprobe.to_string_lossy().into_owned(),
            arecord.to_string_lossy().into_owned(),
        )
        .with_tool_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_resolves_loopback_card() {
    let dir = TempDir::new().unwrap();
    let modprobe = script(dir.path(), "modprobe", "exit 0");
    let arecord = script(dir.path(), "arecord", &format!("cat <<'EOF'\n{LISTING}\nEOF"));

    let device = resolver(&modprobe, &arecord)
        .resolve_loopback_device()
        .await
        .unwrap();
    assert_eq!(device.hw_path(), "hw:4,0,0");
    assert_eq!(device.short_id(), "4");
}

#[tokio::test]
async fn test_module_failure_is_not_fatal_when_device_exists() {
    let dir = TempDir::new().unwrap();
    let modprobe = script(dir.path(), "modprobe", "echo 'Operation not permitted' >&2\nexit 1");
    let arecord = script(dir.path(), "arecord", &format!("cat <<'EOF'\n{LISTING}\nEOF"));

    let device = resolver(&modprobe, &arecord)
        .resolve_loopback_device()
        .await
        .unwrap();
    assert_eq!(device.card, 4);
}

#[tokio::test]
async fn test_not_found_carries_module_error() {
    let dir = TempDir::new().unwrap();
    let modprobe = script(dir.path(), "modprobe", "echo 'Operation not permitted' >&2\nexit 1");
    let arecord = script(
        dir.path(),
        "arecord",
        "echo 'card 0: PCH [HDA Intel PCH], device 0: ALC3246 Analog [ALC3246 Analog]'",
    );

    let err = resolver(&modprobe, &arecord)
        .resolve_loopback_device()
        .await
        .unwrap_err();
    match err {
        DeviceError::NotFound { module_error } => {
            assert!(module_error.unwrap().contains("Operation not permitted"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_enumeration_failure() {
    let dir = TempDir::new().unwrap();
    let modprobe = script(dir.path(), "modprobe", "exit 0");
    let arecord = dir.path().join("missing-arecord");

    let err = resolver(&modprobe, &arecord)
        .resolve_loopback_device()
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::Enumeration(_)));
}
