use clap::{Args, Parser, Subcommand};
use html_bindings::{CompileError, Options, ScopeSummary, check, render};
use serde_json::Value;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "hb")]
#[command(about = "HTML bindings - render HTML templates against JSON data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    attributes: AttributeArgs,
}

#[derive(Args)]
struct AttributeArgs {
    /// Attribute marking elements to repeat per collection item
    #[arg(long, global = true, default_value = "hb-repeat")]
    repeat_attribute: String,

    /// Attribute marking controller mount points
    #[arg(long, global = true, default_value = "hb-controller")]
    controller_attribute: String,
}

impl From<AttributeArgs> for Options {
    fn from(args: AttributeArgs) -> Self {
        Options {
            repeat_attribute: args.repeat_attribute,
            controller_attribute: args.controller_attribute,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render .html templates with JSON data
    Render {
        /// Path to .html file or directory
        #[arg(required_unless_present = "stdin")]
        file: Option<PathBuf>,

        /// JSON data file (default: the template's sibling .json, else {})
        #[arg(long)]
        data: Option<PathBuf>,

        /// Read the template from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON with the bound scopes
        #[arg(long)]
        json: bool,
    },

    /// Parse and compile a template without rendering
    Check {
        /// Path to .html file
        file: PathBuf,

        /// Output the binding summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = Options::from(cli.attributes);

    match cli.command {
        Commands::Render { file, data, stdin, json } => {
            if stdin {
                render_stdin(data.as_deref(), json, &options);
            } else if let Some(path) = file {
                render_path(&path, data.as_deref(), json, &options);
            } else {
                fail("provide a file/directory or use --stdin");
            }
        }
        Commands::Check { file, json } => check_file(&file, json, &options),
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_module("html_bindings", log::LevelFilter::Debug);
        }
        _ => {
            builder.filter_module("html_bindings", log::LevelFilter::Trace);
        }
    }
    builder.init();
}

fn render_stdin(data_path: Option<&Path>, json_output: bool, options: &Options) {
    let mut source = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut source) {
        fail(&format!("failed to read stdin: {}", e));
    }

    let data = match data_path {
        Some(path) => read_data(path).unwrap_or_else(|e| fail(&e)),
        None => empty_data(),
    };

    match render(&source, &data, options) {
        Ok(rendered) if json_output => print_json(&rendered),
        Ok(rendered) => print!("{}", rendered.html),
        Err(e) => exit_with(&e, &source, "<stdin>"),
    }
}

fn render_path(path: &Path, data_path: Option<&Path>, json_output: bool, options: &Options) {
    if path.is_file() {
        if !is_template(path) {
            fail(&format!("{} is not an .html template", path.display()));
        }
        let source = read_source(path);
        let data = match data_path {
            Some(data_path) => read_data(data_path),
            None => sibling_data(path).unwrap_or_else(|| Ok(empty_data())),
        }
        .unwrap_or_else(|e| fail(&e));

        match render(&source, &data, options) {
            Ok(rendered) if json_output => print_json(&rendered),
            Ok(rendered) => print!("{}", rendered.html),
            Err(e) => exit_with(&e, &source, &file_name(path)),
        }
    } else if path.is_dir() {
        render_directory(path, options);
    } else {
        fail(&format!("{} does not exist", path.display()));
    }
}

/// Render every template that has a sibling .json to `<stem>.rendered.html`.
fn render_directory(dir: &Path, options: &Options) {
    let start = Instant::now();
    let mut file_count = 0;
    let mut failed = false;

    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| is_template(e.path()))
    {
        let path = entry.path();
        let Some(data) = sibling_data(path) else {
            log::debug!("skipping {}: no data file", path.display());
            continue;
        };

        let source = read_source(path);
        let rendered = data
            .map_err(CompileError::Data)
            .and_then(|data| render(&source, &data, options));

        match rendered {
            Ok(rendered) => {
                let output = path.with_extension("rendered.html");
                if let Err(e) = fs::write(&output, &rendered.html) {
                    fail(&format!("failed to write {}: {}", output.display(), e));
                }
                print_generated(&output.display().to_string());
                file_count += 1;
            }
            Err(e) => {
                report(&e, &source, &path.display().to_string());
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    if file_count == 0 {
        fail(&format!("no .html templates with data found in {}", dir.display()));
    }

    print_summary(file_count, start.elapsed());
}

fn check_file(path: &Path, json_output: bool, options: &Options) {
    let source = read_source(path);

    match check(&source, options) {
        Ok(summary) if json_output => print_json(&summary),
        Ok(summary) => {
            print!("{}", describe(&summary, 0));
            print_generated(&path.display().to_string());
        }
        Err(e) => exit_with(&e, &source, &file_name(path)),
    }
}

/// Indented outline of what a scope binds.
fn describe(summary: &ScopeSummary, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    let mut out = String::new();
    for path in &summary.bindings {
        out.push_str(&format!("{}{{{{ {} }}}}\n", indent, path));
    }
    for repeat in &summary.repeats {
        out.push_str(&format!("{}repeat {} in {}\n", indent, repeat.item, repeat.collection));
        out.push_str(&describe(&repeat.scope, depth + 1));
    }
    out
}

fn is_template(path: &Path) -> bool {
    let name = path.to_string_lossy();
    path.extension().is_some_and(|ext| ext == "html")
        && !name.ends_with(".rendered.html")
        && !name.ends_with(".expected.html")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn read_source(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(&format!("failed to read {}: {}", path.display(), e)))
}

/// `<stem>.json` next to the template, if there is one.
fn sibling_data(path: &Path) -> Option<Result<Value, String>> {
    let data_path = path.with_extension("json");
    data_path.is_file().then(|| read_data(&data_path))
}

fn read_data(path: &Path) -> Result<Value, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))
}

fn empty_data() -> Value {
    Value::Object(Default::default())
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(&format!("failed to serialize output: {}", e)),
    }
}

fn report(err: &CompileError, source: &str, filename: &str) {
    if io::stderr().is_terminal() {
        eprint!("{}", err.render_color(source, filename));
    } else {
        eprint!("{}", err.render(source, filename));
    }
}

fn exit_with(err: &CompileError, source: &str, filename: &str) -> ! {
    report(err, source, filename);
    std::process::exit(1);
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn print_generated(path: &str) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("  \x1b[32m✓\x1b[0m {}", path);
    } else {
        eprintln!("  ✓ {}", path);
    }
}

fn print_summary(count: usize, elapsed: std::time::Duration) {
    let is_tty = io::stderr().is_terminal();
    let time_str = format_duration(elapsed);
    let files_word = if count == 1 { "file" } else { "files" };

    if is_tty {
        eprintln!("\n\x1b[1m✨ Rendered {} {} in {}\x1b[0m", count, files_word, time_str);
    } else {
        eprintln!("\n✨ Rendered {} {} in {}", count, files_word, time_str);
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let micros = d.as_micros();
    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
