use std::path::Path;

use assert_cmd::Command;
use image::{DynamicImage, Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::TempDir;

fn pixflow() -> Command {
    Command::cargo_bin("pixflow").unwrap()
}

fn write_png(path: &Path, width: u32, height: u32) {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([250, 250, 250])));
    image.save(path).unwrap();
}

/// Config file with defaults, so tests never read the user's real config.
fn config_file(dir: &TempDir) -> String {
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{}").unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_tools_lists_catalog() {
    let dir = TempDir::new().unwrap();
    pixflow()
        .args(["--config", &config_file(&dir), "tools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("image-to-pdf"))
        .stdout(predicate::str::contains("pdf-compressor"))
        .stdout(predicate::str::contains("bg-remover"));
}

#[test]
fn test_tools_panel_json() {
    let dir = TempDir::new().unwrap();
    pixflow()
        .args(["--config", &config_file(&dir), "tools", "--tool", "image-resizer", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tool_id\": \"image-resizer\""))
        .stdout(predicate::str::contains("\"maintain_aspect\""));
}

#[test]
fn test_unknown_tool_fails() {
    let dir = TempDir::new().unwrap();
    pixflow()
        .args(["--config", &config_file(&dir), "tools", "--tool", "pdf-to-images"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown tool"));
}

#[test]
fn test_run_resize() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("photo.png");
    let output = dir.path().join("small.png");
    write_png(&input, 40, 20);

    pixflow()
        .args(["--config", &config_file(&dir), "run", "image-resizer"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--set", "scale=50", "--set", "format=png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resized to 20×10 pixels"));

    let resized = image::open(&output).unwrap();
    assert_eq!((resized.width(), resized.height()), (20, 10));
}

#[test]
fn test_run_rejects_out_of_range_setting() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("photo.png");
    write_png(&input, 10, 10);

    pixflow()
        .args(["--config", &config_file(&dir), "run", "image-resizer"])
        .arg(&input)
        .args(["--set", "scale=500"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value for scale"));
}

#[test]
fn test_run_image_to_pdf_into_directory() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    write_png(&a, 30, 20);
    write_png(&b, 20, 30);
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    pixflow()
        .args(["--config", &config_file(&dir), "run", "image-to-pdf"])
        .arg(&a)
        .arg(&b)
        .arg("-o")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created PDF with 2 page(s)"));

    let pdf = std::fs::read(out_dir.join("converted.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[test]
fn test_batch_background_removal() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("in");
    std::fs::create_dir(&inputs).unwrap();
    write_png(&inputs.join("one.png"), 8, 8);
    write_png(&inputs.join("two.png"), 8, 8);
    std::fs::write(inputs.join("notes.txt"), "not an image").unwrap();
    let out_dir = dir.path().join("out");
    let pattern = format!("{}/*", inputs.display());

    pixflow()
        .args(["--config", &config_file(&dir), "batch", "bg-remover", &pattern, "-o"])
        .arg(&out_dir)
        .arg("--continue-on-error")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful"))
        .stdout(predicate::str::contains("notes.txt"));

    assert!(out_dir.join("one-no-background.png").exists());
    assert!(out_dir.join("two-no-background.png").exists());
}

#[test]
fn test_config_set_and_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.json");
    let config = config.to_string_lossy().into_owned();

    pixflow()
        .args(["--config", &config, "config", "set", "image.quality", "70"])
        .assert()
        .success();

    pixflow()
        .args(["--config", &config, "config", "get", "image.quality"])
        .assert()
        .success()
        .stdout(predicate::str::diff("70\n"));

    pixflow()
        .args(["--config", &config, "config", "set", "image.colour", "red"])
        .assert()
        .failure();
}
