// Saved presets on disk and their effect on compiled commands

use ffqueue::engine::{ClipMethod, Preset, Rotation, compile};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::common::assertions::*;

fn sample_preset() -> Preset {
    let mut preset = Preset::default();
    preset.output.container = "matroska".to_string();
    preset.output.file_extension = "mkv".to_string();
    preset.video.encoder = "libsvtav1".to_string();
    preset.video.preset = "6".to_string();
    preset.quality.param_name = "crf".to_string();
    preset.quality.param_value = "30".to_string();
    preset.filters.rotation = Rotation::Clockwise90;
    preset.clip.method = ClipMethod::Precise;
    preset.clip.start = "00:00:02".to_string();
    preset.custom.post_output = vec!["-map_metadata 0".to_string()];
    preset
}

#[test]
fn test_saved_preset_compiles_identically() {
    let dir = TempDir::new().unwrap();
    let preset = sample_preset();
    preset.save(dir.path(), "av1").unwrap();

    let loaded = Preset::load(dir.path(), "av1").unwrap();
    assert_eq!(loaded, preset);

    let input = Path::new("/v/in.mp4");
    let output = loaded.derive_output_path(input, None);
    assert_eq!(output, Path::new("/v/in_output.mkv"));
    assert_eq!(
        compile(&loaded, input, &output),
        compile(&preset, input, &output)
    );
}

#[test]
fn test_store_lists_and_deletes() {
    let dir = TempDir::new().unwrap();
    for name in ["web", "archive", "phone"] {
        Preset::default().save(dir.path(), name).unwrap();
    }
    fs::write(dir.path().join("README.txt"), "not a preset").unwrap();

    assert_eq!(
        Preset::list_saved(dir.path()).unwrap(),
        vec!["archive", "phone", "web"]
    );

    Preset::delete(dir.path(), "phone").unwrap();
    Preset::delete(dir.path(), "phone").unwrap();
    assert_eq!(Preset::list_saved(dir.path()).unwrap(), vec!["archive", "web"]);
}

#[test]
fn test_hand_written_json_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mini.json");
    fs::write(
        &path,
        r#"{
            "output": {"container": "mp4", "fast_start": true},
            "video": {"encoder": "libx264", "preset": "fast"},
            "filters": {"mirror": "vertical"},
            "clip": {"method": "precise_fast_seek", "start": "00:10:00", "pre_decode": "00:00:30"}
        }"#,
    )
    .unwrap();

    let preset = Preset::load_from_path(&path).unwrap();
    assert!(preset.output.overwrite);
    let cmd = compile(&preset, Path::new("/in.mkv"), Path::new("/out.mp4"));

    assert_cmd_contains(&cmd, "-ss 00:09:30.00 -i \"/in.mkv\"");
    assert_cmd_contains(&cmd, "-c:v libx264 -preset fast");
    assert_cmd_contains(&cmd, "-vf \"vflip\"");
    assert_cmd_contains(&cmd, "-f mp4 -movflags +faststart -y \"/out.mp4\"");
}

#[test]
fn test_corrupt_preset_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.json"), "{ nope").unwrap();
    let err = Preset::load(dir.path(), "bad").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    assert!(Preset::load(dir.path(), "absent").is_err());
}
