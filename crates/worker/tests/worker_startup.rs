//! Startup tests for the worker binary.
//!
//! The binary must refuse to do anything when the renderer executables are
//! not configured or missing, and must otherwise talk to the renderer.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::OnceLock;

use tempfile::TempDir;

const FAKE_RENDERER: &str = r#"#!/bin/sh
while [ "$#" -gt 0 ]; do
    if [ "$1" = "-P" ]; then
        script="$2"
        shift 2
        exec /bin/sh "$script" "$@"
    fi
    shift
done
exit 3
"#;

/// Written once before any test spawns a process.
fn fake_renderer() -> &'static Path {
    static FAKE: OnceLock<PathBuf> = OnceLock::new();
    FAKE.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("renderfarm-worker-fake-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("blender");
        std::fs::write(&path, FAKE_RENDERER).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    })
}

/// Write a config file into `dir` and return its path.
fn write_config(dir: &TempDir, renderer_section: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        format!(
            "[renderer]\n{}\nscripts_dir = \"{}\"\n",
            renderer_section,
            dir.path().display()
        ),
    )
    .unwrap();
    path
}

/// Run the worker with the given config and arguments.
async fn run_worker(config: &Path, args: &[&str]) -> Output {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_renderfarm-worker"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .env_remove("RENDERFARM_CONFIG")
        .kill_on_drop(true)
        .output()
        .await
        .expect("Failed to run worker")
}

#[tokio::test]
async fn test_missing_primary_executable_is_fatal() {
    let _ = fake_renderer();
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");

    let output = run_worker(&config, &["devices"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("renderer.primary_executable"),
        "stderr: {}",
        stderr
    );
    assert!(output.stdout.is_empty());
}

#[tokio::test]
async fn test_nonexistent_primary_executable_is_fatal() {
    let _ = fake_renderer();
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "primary_executable = \"/nonexistent/blender\"");

    let output = run_worker(&config, &["devices"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/nonexistent/blender"), "stderr: {}", stderr);
}

#[tokio::test]
async fn test_nonexistent_secondary_executable_is_fatal() {
    let fake = fake_renderer();
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        &format!(
            "primary_executable = \"{}\"\nsecondary_executable = \"/nonexistent/blender-next\"",
            fake.display()
        ),
    );

    let output = run_worker(&config, &["devices"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("renderer.secondary_executable"), "stderr: {}", stderr);
}

#[tokio::test]
async fn test_missing_config_file_is_fatal() {
    let _ = fake_renderer();
    let output = run_worker(Path::new("/nonexistent/config.toml"), &["devices"]).await;
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_devices_end_to_end() {
    let fake = fake_renderer();
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("get_devices.py"),
        "echo 'render_farm_data=[{\"id\":0,\"name\":\"CPU\",\"type\":\"CPU\"}]'\n",
    )
    .unwrap();
    let config = write_config(&dir, &format!("primary_executable = \"{}\"", fake.display()));

    let output = run_worker(&config, &["devices"]).await;

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(devices[0]["name"], "CPU");
}

#[tokio::test]
async fn test_render_end_to_end() {
    let fake = fake_renderer();
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("render.py"),
        "echo 'Fra:1 Mem:10.00M (Peak 12.00M) | Time:00:01.00 | Mem:5.00M, Peak:6.00M | Scene, ViewLayer | Sample 1/4'\necho 'Blender quit'\n",
    )
    .unwrap();
    let scene = dir.path().join("scene.blend");
    std::fs::write(&scene, b"BLENDER").unwrap();
    let config = write_config(&dir, &format!("primary_executable = \"{}\"", fake.display()));

    let output = run_worker(
        &config,
        &[
            "render",
            scene.to_str().unwrap(),
            "--output-dir",
            dir.path().join("out").to_str().unwrap(),
            "-d",
            "0",
        ],
    )
    .await;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["frame"], 1);
    assert_eq!(record["render_time"], 1000);
    assert_eq!(record["information"], "Sample 1/4");
}
