//! Binary to generate/update .expected.html and .expected.txt files
//!
//! Usage:
//!   cargo run --bin accept_expected             # Update all
//!   cargo run --bin accept_expected -- repeat   # Update only cases matching "repeat"

use html_bindings::{Options, render_document};
use serde_json::Value;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

fn main() {
    let filter: Option<String> = std::env::args().nth(1);
    let cases_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("cases");

    let mut updated = 0;
    let mut skipped = 0;

    for entry in WalkDir::new(&cases_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| is_template(e.path()))
    {
        let path = entry.path();

        if let Some(ref f) = filter {
            if !path.to_string_lossy().contains(f) {
                skipped += 1;
                continue;
            }
        }

        process_file(path);
        updated += 1;
    }

    println!("Updated {} files, skipped {}", updated, skipped);
}

fn is_template(path: &Path) -> bool {
    let name = path.to_string_lossy();
    path.extension().is_some_and(|ext| ext == "html")
        && !name.ends_with(".expected.html")
        && !name.ends_with(".rendered.html")
}

fn load_data(path: &Path) -> Result<Value, String> {
    let data_path = path.with_extension("json");
    if !data_path.exists() {
        return Ok(Value::Object(Default::default()));
    }
    let text = fs::read_to_string(&data_path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

fn process_file(path: &Path) {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {:?}: {}", path, e);
            return;
        }
    };

    let data = match load_data(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to load data for {:?}: {}", path, e);
            return;
        }
    };

    let is_error_test = path.to_string_lossy().contains("/errors/");
    let filename = path.file_name().and_then(|s| s.to_str()).unwrap_or("unknown");

    match render_document(&source, &data, &Options::default()) {
        Ok(html) => {
            if is_error_test {
                eprintln!("ERROR: {:?} is in errors/ but rendered successfully", path);
                return;
            }
            write_expected(&path.with_extension("expected.html"), &html);
        }
        Err(e) => {
            if is_error_test {
                write_expected(&path.with_extension("expected.txt"), &e.render(&source, filename));
            } else {
                eprintln!("ERROR: {:?} failed to render but is not in errors/: {}", path, e);
            }
        }
    }
}

fn write_expected(path: &Path, content: &str) {
    if let Err(e) = fs::write(path, content) {
        eprintln!("Failed to write {:?}: {}", path, e);
    } else {
        println!("  wrote {}", path.display());
    }
}
