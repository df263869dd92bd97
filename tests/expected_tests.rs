//! Test runner that compares rendered output against .expected.html files and
//! diagnostics against .expected.txt files under tests/cases/errors/
//!
//! Run with: cargo test --test expected_tests

use html_bindings::{Options, render_document};
use libtest_mimic::{Arguments, Failed, Trial};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let args = Arguments::from_args();

    let trials = collect_test_files()
        .into_iter()
        .map(|path| Trial::test(test_name(&path), move || run_case(&path)))
        .collect();

    libtest_mimic::run(&args, trials).exit();
}

/// Collect all template files, skipping expectations and CLI output
fn collect_test_files() -> Vec<PathBuf> {
    let pattern = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/cases/**/*.html");
    let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .expect("valid glob pattern")
        .filter_map(|entry| entry.ok())
        .filter(|path| {
            let name = path.to_string_lossy();
            !name.ends_with(".expected.html") && !name.ends_with(".rendered.html")
        })
        .collect();

    files.sort();
    files
}

/// "tests/cases/repeat/tracks.html" -> "repeat::tracks"
fn test_name(path: &Path) -> String {
    let parent = path.parent().and_then(|p| p.file_name()).unwrap_or_default();
    let stem = path.file_stem().unwrap_or_default();
    format!("{}::{}", parent.to_string_lossy(), stem.to_string_lossy())
}

fn load_data(path: &Path) -> Result<Value, Failed> {
    let data_path = path.with_extension("json");
    if !data_path.exists() {
        return Ok(Value::Object(Default::default()));
    }
    let text = fs::read_to_string(&data_path)?;
    Ok(serde_json::from_str(&text)?)
}

fn run_case(path: &Path) -> Result<(), Failed> {
    let source = fs::read_to_string(path)?;
    let data = load_data(path)?;
    let filename = path.file_name().and_then(|s| s.to_str()).unwrap_or("unknown");
    let is_error_test = path.to_string_lossy().contains("/errors/");

    match render_document(&source, &data, &Options::default()) {
        Ok(html) if is_error_test => Err(format!("Expected an error but rendered:\n{}", html).into()),
        Ok(html) => {
            let expected_path = path.with_extension("expected.html");
            let expected = fs::read_to_string(&expected_path)
                .map_err(|_| format!("Missing expected file: {}", expected_path.display()))?;
            compare(&expected, &html)
        }
        Err(e) if is_error_test => {
            let expected_path = path.with_extension("expected.txt");
            let expected = fs::read_to_string(&expected_path)
                .map_err(|_| format!("Missing expected file: {} (error: {})", expected_path.display(), e))?;
            compare(&expected, &e.render(&source, filename))
        }
        Err(e) => Err(format!("Render error: {}", e.render(&source, filename)).into()),
    }
}

fn compare(expected: &str, actual: &str) -> Result<(), Failed> {
    if expected.trim() == actual.trim() {
        Ok(())
    } else {
        Err(format!(
            "Output mismatch\n--- expected ---\n{}\n--- actual ---\n{}",
            expected.trim(),
            actual.trim()
        )
        .into())
    }
}
