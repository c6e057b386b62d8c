// Phase 1: 設定ファイル解析テスト

use std::io::Write;
use std::path::Path;

use chop_cropper::config::job::{JobFile, parse_image_url};
use chop_cropper::config::merged::MergedConfig;
use chop_cropper::config::settings::{BackgroundMode, DetectorKind, OutputFormat, Settings};
use chop_cropper::config::{load_settings_for_job, load_settings_in};
use chop_cropper::error::ChopError;
use chop_cropper::record::StoredCrop;

// ============================================================
// 1. 画像URLの検証
// ============================================================

#[test]
fn test_parse_image_url_accepts_http_and_https() {
    assert_eq!(
        parse_image_url("  https://cdn.example.com/a.jpg ").unwrap(),
        "https://cdn.example.com/a.jpg"
    );
    assert!(parse_image_url("http://10.0.0.5:8080/img/b.png").is_ok());
}

#[test]
fn test_parse_image_url_rejects_other_schemes() {
    for url in ["ftp://example.com/a.jpg", "file:///tmp/a.jpg", "data:image/png;base64,AAAA"] {
        let result = parse_image_url(url);
        assert!(matches!(result, Err(ChopError::ConfigError(_))), "{url}: {result:?}");
    }
}

#[test]
fn test_parse_image_url_rejects_empty_and_relative() {
    assert!(parse_image_url("").is_err());
    assert!(parse_image_url("   ").is_err());
    assert!(parse_image_url("images/a.jpg").is_err());
}

// ============================================================
// 2. Settings 構造体のデシリアライズ
// ============================================================

#[test]
fn test_settings_full_yaml() {
    let yaml = r#"
fetch_timeout_secs: 30
connect_timeout_secs: 2
output_format: png
jpeg_quality: 75
background: matte
matte_color: [0, 0, 0]
detector: heuristic
parallel_workers: 4
storage_dir: "/tmp/chops"
public_base_url: "https://media.example.com"
"#;
    let settings = Settings::from_yaml(yaml).expect("should parse full YAML");
    assert_eq!(settings.fetch_timeout_secs, 30);
    assert_eq!(settings.connect_timeout_secs, 2);
    assert_eq!(settings.output_format, OutputFormat::Png);
    assert_eq!(settings.jpeg_quality, 75);
    assert_eq!(settings.background, BackgroundMode::Matte);
    assert_eq!(settings.matte_color, [0, 0, 0]);
    assert_eq!(settings.detector, DetectorKind::Heuristic);
    assert_eq!(settings.parallel_workers, 4);
    assert_eq!(settings.storage_dir, Path::new("/tmp/chops"));
    assert_eq!(settings.public_base_url.as_deref(), Some("https://media.example.com"));
}

#[test]
fn test_settings_empty_yaml() {
    // 空YAML（"{}" はserde_ymlで空のマッピングを意味する）
    let settings = Settings::from_yaml("{}").expect("should parse empty YAML");
    assert_eq!(settings.fetch_timeout_secs, 10);
    assert_eq!(settings.connect_timeout_secs, 5);
    assert_eq!(settings.output_format, OutputFormat::Jpeg);
    assert_eq!(settings.jpeg_quality, 90);
    assert_eq!(settings.background, BackgroundMode::Keep);
    assert_eq!(settings.matte_color, [255, 255, 255]);
    assert_eq!(settings.parallel_workers, 0);
    assert_eq!(settings.storage_dir, Path::new(".storage"));
    assert!(settings.public_base_url.is_none());
}

#[test]
fn test_settings_partial_yaml_keeps_defaults() {
    let settings = Settings::from_yaml("jpeg_quality: 60\n").unwrap();
    assert_eq!(settings.jpeg_quality, 60);
    assert_eq!(settings.output_format, OutputFormat::Jpeg);
    assert_eq!(settings.fetch_timeout_secs, 10);
}

#[test]
fn test_settings_invalid_quality() {
    for yaml in ["jpeg_quality: 0\n", "jpeg_quality: 101\n"] {
        let result = Settings::from_yaml(yaml);
        assert!(matches!(result, Err(ChopError::ConfigError(_))), "{yaml}: {result:?}");
    }
}

#[test]
fn test_settings_zero_timeout_rejected() {
    for yaml in ["fetch_timeout_secs: 0\n", "connect_timeout_secs: 0\n"] {
        let result = Settings::from_yaml(yaml);
        assert!(matches!(result, Err(ChopError::ConfigError(_))), "{yaml}: {result:?}");
    }
}

#[test]
fn test_settings_transparent_requires_png() {
    let result = Settings::from_yaml("background: transparent\n");
    match result {
        Err(ChopError::ConfigError(msg)) => assert!(msg.contains("png"), "message: {msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }

    let settings = Settings::from_yaml("background: transparent\noutput_format: png\n")
        .expect("transparent png is valid");
    assert_eq!(settings.crop_config().background, BackgroundMode::Transparent);
}

#[test]
fn test_load_settings_rejects_transparent_jpeg_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("settings.yaml"), "background: transparent\n").unwrap();
    assert!(load_settings_in(dir.path()).is_err());
}

#[test]
fn test_settings_unknown_enum_value_rejected() {
    assert!(Settings::from_yaml("output_format: webp\n").is_err());
    assert!(Settings::from_yaml("detector: neural\n").is_err());
}

// ============================================================
// 3. settings.yaml の自動検出
// ============================================================

#[test]
fn test_load_settings_for_job_with_settings_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut file = std::fs::File::create(dir.path().join("settings.yaml")).unwrap();
    writeln!(file, "output_format: png\nbackground: transparent").unwrap();

    let job_path = dir.path().join("jobs.yaml");
    let settings = load_settings_for_job(&job_path).expect("should load settings");
    assert_eq!(settings.output_format, OutputFormat::Png);
    assert_eq!(settings.background, BackgroundMode::Transparent);
}

#[test]
fn test_load_settings_without_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = load_settings_in(dir.path()).expect("defaults");
    assert_eq!(settings.jpeg_quality, 90);
}

#[test]
fn test_load_settings_invalid_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("settings.yaml"), "jpeg_quality: [not, a, number]\n").unwrap();
    assert!(load_settings_in(dir.path()).is_err());
}

// ============================================================
// 4. ジョブファイル
// ============================================================

#[test]
fn test_job_file_with_overrides_and_stored_crop() {
    let yaml = r#"
study: "2304"
images:
  - url: https://cdn.example.com/original/2304B00C0001D00.jpg
  - url: https://cdn.example.com/original/2304B00C0002D00.jpg
    filename: chop-2.jpg
    study: "2401"
    output_format: png
    jpeg_quality: 70
    background: transparent
    crop:
      x1: 10
      y1: 20
      x2: 110
      y2: 220
"#;
    let job_file = JobFile::from_yaml(yaml).expect("should parse job YAML");
    assert_eq!(job_file.study.as_deref(), Some("2304"));
    assert_eq!(job_file.images.len(), 2);

    let second = &job_file.images[1];
    assert_eq!(second.filename.as_deref(), Some("chop-2.jpg"));
    assert_eq!(second.output_format, Some(OutputFormat::Png));
    assert_eq!(
        second.crop,
        Some(StoredCrop {
            x1: 10,
            y1: 20,
            x2: 110,
            y2: 220,
            confidence: 1.0,
        })
    );
}

#[test]
fn test_job_file_rejects_invalid_url() {
    let yaml = "images:\n  - url: ftp://example.com/a.jpg\n";
    let result = JobFile::from_yaml(yaml);
    assert!(matches!(result, Err(ChopError::ConfigError(_))), "got {result:?}");
}

#[test]
fn test_job_file_requires_images() {
    assert!(JobFile::from_yaml("study: \"2304\"\n").is_err());
}

#[test]
fn test_job_file_from_urls() {
    let job_file = JobFile::from_urls(&["https://a.example.com/1.jpg", " https://a.example.com/2.jpg "])
        .expect("valid URLs");
    assert!(job_file.study.is_none());
    assert_eq!(job_file.images[1].url, "https://a.example.com/2.jpg");

    assert!(JobFile::from_urls(&["https://a.example.com/1.jpg", "not a url"]).is_err());
}

// ============================================================
// 5. MergedConfig の優先順位
// ============================================================

#[test]
fn test_merged_config_image_overrides_win() {
    let settings = Settings::default();
    let yaml = r#"
study: "2304"
images:
  - url: https://cdn.example.com/a.jpg
  - url: https://cdn.example.com/b.jpg
    study: "2401"
    output_format: png
    jpeg_quality: 50
    background: matte
"#;
    let job_file = JobFile::from_yaml(yaml).unwrap();

    let first = MergedConfig::new(&settings, &job_file, &job_file.images[0]);
    assert_eq!(first.study.as_deref(), Some("2304"));
    assert_eq!(first.output_format, OutputFormat::Jpeg);
    assert_eq!(first.jpeg_quality, 90);
    assert_eq!(first.background, BackgroundMode::Keep);

    let second = MergedConfig::new(&settings, &job_file, &job_file.images[1]);
    assert_eq!(second.study.as_deref(), Some("2401"));
    assert_eq!(second.output_format, OutputFormat::Png);
    assert_eq!(second.jpeg_quality, 50);
    assert_eq!(second.background, BackgroundMode::Matte);

    let crop = second.crop_config();
    assert_eq!(crop.output_format, OutputFormat::Png);
    assert_eq!(crop.matte_color, [255, 255, 255]);
}

#[test]
fn test_merged_config_settings_fallback() {
    let settings = Settings::from_yaml("output_format: png\nmatte_color: [10, 20, 30]\n").unwrap();
    let job_file = JobFile::from_urls(&["https://cdn.example.com/a.jpg"]).unwrap();

    let merged = MergedConfig::new(&settings, &job_file, &job_file.images[0]);
    assert!(merged.study.is_none());
    assert_eq!(merged.output_format, OutputFormat::Png);
    assert_eq!(merged.matte_color, [10, 20, 30]);
}
