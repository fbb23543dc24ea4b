use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use video_capture::{CaptureConfig, CaptureError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "CAPTURE_CAMERA_INDEX",
        "CAPTURE_FPS",
        "CAPTURE_PUBLISH_PORT",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_json_file_and_keeps_default_fps() {
    let file = write_config(
        ".json",
        r#"{
            "camera_index": 1,
            "frame_width": 1280,
            "frame_height": 720,
            "zmq_port": 5600
        }"#,
    );

    let cfg = CaptureConfig::load(file.path()).expect("load config");

    assert_eq!(cfg.camera_index, 1);
    assert_eq!(cfg.frame_width, 1280);
    assert_eq!(cfg.frame_height, 720);
    assert_eq!(cfg.fps, 30);
    assert_eq!(cfg.publish_port, 5600);
}

#[test]
fn loads_toml_file() {
    let file = write_config(
        ".toml",
        "camera_index = 2\nfps = 15\npublish_port = 6100\n",
    );

    let cfg = CaptureConfig::load(file.path()).expect("load config");

    assert_eq!(cfg.camera_index, 2);
    assert_eq!(cfg.fps, 15);
    assert_eq!(cfg.publish_port, 6100);
    assert_eq!((cfg.frame_width, cfg.frame_height), (640, 480));
}

#[test]
fn missing_file_is_a_config_error_and_falls_back() {
    let path = Path::new("/nonexistent/camera_config.json");
    assert!(matches!(
        CaptureConfig::load(path),
        Err(CaptureError::Config(_))
    ));
    assert_eq!(CaptureConfig::load_or_default(path), CaptureConfig::default());
}

#[test]
fn malformed_file_falls_back_to_defaults() {
    let file = write_config(".json", "{ \"fps\": 12,");
    assert_eq!(
        CaptureConfig::load_or_default(file.path()),
        CaptureConfig::default()
    );
}

#[test]
fn invalid_values_fall_back_to_defaults() {
    let file = write_config(".json", r#"{"fps": 0, "camera_index": 4}"#);
    assert_eq!(
        CaptureConfig::load_or_default(file.path()),
        CaptureConfig::default()
    );
}

#[test]
fn env_overrides_file_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(".json", r#"{"camera_index": 1, "fps": 20}"#);
    std::env::set_var("CAPTURE_FPS", "5");
    std::env::set_var("CAPTURE_PUBLISH_PORT", "7100");

    let mut cfg = CaptureConfig::load(file.path()).expect("load config");
    cfg.apply_env().expect("apply env");

    assert_eq!(cfg.camera_index, 1);
    assert_eq!(cfg.fps, 5);
    assert_eq!(cfg.publish_port, 7100);

    clear_env();
}

#[test]
fn bad_env_override_leaves_config_untouched() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("CAPTURE_CAMERA_INDEX", "3");
    std::env::set_var("CAPTURE_FPS", "fast");

    let mut cfg = CaptureConfig::default();
    assert!(matches!(cfg.apply_env(), Err(CaptureError::Config(_))));
    assert_eq!(cfg, CaptureConfig::default());

    clear_env();
}
