//! tgpu-gen - command line driver for the kernel extraction pipeline

use std::fs;
use std::path::{Path, PathBuf};

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Args, Parser, Subcommand};
use walkdir::WalkDir;

use tgpu_ast::Span;
use tgpu_transform::{Diagnostic, Options, Pipeline, Severity, TransformOutput};
use tinyest::KernelIr;

#[derive(Parser)]
#[command(name = "tgpu-gen")]
#[command(about = "Extract and lower TypeGPU kernels from JS/TS modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite files so every kernel is registered with its IR
    Transform {
        /// Files or directories
        paths: Vec<PathBuf>,
        /// Write results under this directory instead of stdout
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Write a `.map` file next to every output
        #[arg(long)]
        source_map: bool,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Print the IR of every kernel in a file as JSON
    Lower {
        /// Input file
        file: PathBuf,
        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// List the files the filters and the early-prune scan would transform
    Scan {
        /// Files or directories
        paths: Vec<PathBuf>,
        #[command(flatten)]
        options: OptionArgs,
    },
}

/// Plugin options; flags override the config file
#[derive(Args)]
struct OptionArgs {
    /// JSON file with plugin options
    #[arg(long)]
    config: Option<PathBuf>,
    /// Include glob (repeatable)
    #[arg(long)]
    include: Vec<String>,
    /// Exclude glob (repeatable)
    #[arg(long)]
    exclude: Vec<String>,
    /// Treat this dotted path as the typegpu root namespace
    #[arg(long)]
    force_tgpu_alias: Option<String>,
    /// Parse every matching file, even ones the prune scan would skip
    #[arg(long)]
    no_early_pruning: bool,
    /// Do not wrap initializers with the auto-naming hook
    #[arg(long)]
    no_auto_naming: bool,
    /// IR version to emit
    #[arg(long)]
    ir_version: Option<u32>,
}

impl OptionArgs {
    fn load(&self) -> Result<Options, String> {
        let mut options = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
                Options::from_json(&text).map_err(|e| format!("{}: {}", path.display(), e))?
            }
            None => Options::default(),
        };
        if !self.include.is_empty() {
            options.include = self.include.clone();
        }
        if !self.exclude.is_empty() {
            options.exclude = self.exclude.clone();
        }
        if let Some(alias) = &self.force_tgpu_alias {
            options.force_tgpu_alias = Some(alias.clone());
        }
        if self.no_early_pruning {
            options.early_pruning = false;
        }
        if self.no_auto_naming {
            options.auto_naming_enabled = false;
        }
        if let Some(version) = self.ir_version {
            options.ir_version = version;
        }
        Ok(options)
    }

    fn pipeline(&self) -> Pipeline {
        let pipeline = self
            .load()
            .and_then(|options| Pipeline::new(options).map_err(|e| format!("[{}] {}", e.code(), e)));
        match pipeline {
            Ok(pipeline) => pipeline,
            Err(message) => {
                eprintln!("Error: {}", message);
                std::process::exit(2);
            }
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let ok = match cli.command {
        Commands::Transform {
            paths,
            out_dir,
            source_map,
            options,
        } => cmd_transform(&options.pipeline(), &paths, out_dir.as_deref(), source_map),
        Commands::Lower {
            file,
            pretty,
            options,
        } => cmd_lower(&options.pipeline(), &file, pretty),
        Commands::Scan { paths, options } => cmd_scan(&options.pipeline(), &paths),
    };

    if !ok {
        std::process::exit(1);
    }
}

/// Every file under `paths`, paired with its id: the path relative to the
/// directory it was found in, with `/` separators
fn collect_files(paths: &[PathBuf]) -> Vec<(PathBuf, String)> {
    let mut files = Vec::new();
    for root in paths {
        if root.is_file() {
            files.push((root.clone(), file_id(root)));
            continue;
        }
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            files.push((entry.path().to_path_buf(), file_id(relative)));
        }
    }
    files
}

fn file_id(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn read(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            None
        }
    }
}

/// Parse and transform one file, reporting problems. `Err(())` means the
/// problem was already reported.
fn run_pipeline(pipeline: &Pipeline, source: &str, id: &str) -> Result<Option<TransformOutput>, ()> {
    let program = match tgpu_parser::parse(source) {
        Ok(program) => program,
        Err(e) => {
            report(source, id, ReportKind::Warning, e.code(), &e.to_string(), e.span());
            return Ok(None);
        }
    };
    match pipeline.run_program(source, id, &program) {
        Ok(outcome) => {
            for diagnostic in outcome.diagnostics() {
                report_diagnostic(source, diagnostic);
            }
            Ok(outcome.into_output())
        }
        Err(e) => {
            report(source, id, ReportKind::Error, e.code(), &e.to_string(), e.span());
            Err(())
        }
    }
}

fn cmd_transform(pipeline: &Pipeline, paths: &[PathBuf], out_dir: Option<&Path>, source_map: bool) -> bool {
    let mut all_ok = true;
    let mut changed = 0;

    for (path, id) in collect_files(paths) {
        let Some(source) = read(&path) else {
            all_ok = false;
            continue;
        };
        if !pipeline.should_transform(&id, &source) {
            continue;
        }
        let output = match run_pipeline(pipeline, &source, &id) {
            Ok(Some(output)) => output,
            Ok(None) => continue,
            Err(()) => {
                all_ok = false;
                continue;
            }
        };
        changed += 1;
        log::info!("{}: {} kernel(s)", id, output.kernels.len());

        let Some(out_dir) = out_dir else {
            println!("// {}", id);
            println!("{}", output.code);
            continue;
        };
        let target = out_dir.join(&id);
        let written = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| {
                if !source_map {
                    return fs::write(&target, &output.code);
                }
                let map_path = PathBuf::from(format!("{}.map", target.display()));
                let map_name = map_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                fs::write(
                    &target,
                    format!("{}\n//# sourceMappingURL={}\n", output.code, map_name),
                )?;
                fs::write(&map_path, output.map.to_json())
            });
        if let Err(e) = written {
            eprintln!("Error writing {}: {}", target.display(), e);
            all_ok = false;
        }
    }

    eprintln!("{} file(s) transformed", changed);
    all_ok
}

fn cmd_lower(pipeline: &Pipeline, file: &Path, pretty: bool) -> bool {
    let Some(source) = read(file) else {
        return false;
    };
    let id = file_id(file);
    let kernels = match run_pipeline(pipeline, &source, &id) {
        Ok(Some(output)) => output.kernels,
        Ok(None) => Vec::new(),
        Err(()) => return false,
    };

    let json = serde_json::Value::Array(
        kernels
            .iter()
            .map(|kernel| {
                kernel_json(
                    kernel.name.as_deref(),
                    kernel.position.line + 1,
                    kernel.position.column + 1,
                    &kernel.ir,
                )
            })
            .collect(),
    );
    let text = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    match text {
        Ok(text) => {
            println!("{}", text);
            true
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}

fn kernel_json(name: Option<&str>, line: usize, column: usize, ir: &KernelIr) -> serde_json::Value {
    serde_json::json!({
        "name": name.unwrap_or(tgpu_lower::UNNAMED),
        "line": line,
        "column": column,
        "minVersion": ir.min_version(),
        "ir": ir.to_json(),
    })
}

fn cmd_scan(pipeline: &Pipeline, paths: &[PathBuf]) -> bool {
    let mut all_ok = true;
    for (path, id) in collect_files(paths) {
        if !pipeline.filter().matches(&id) {
            continue;
        }
        let Some(source) = read(&path) else {
            all_ok = false;
            continue;
        };
        let status = if pipeline.should_transform(&id, &source) {
            "candidate"
        } else {
            "pruned"
        };
        println!("{:<10} {}", status, id);
    }
    all_ok
}

fn report_diagnostic(source: &str, diagnostic: &Diagnostic) {
    let kind = match diagnostic.severity {
        Severity::Warning => ReportKind::Warning,
        Severity::Error => ReportKind::Error,
    };
    report(
        source,
        &diagnostic.file,
        kind,
        diagnostic.code,
        &diagnostic.message,
        diagnostic.span,
    );
}

fn report(source: &str, id: &str, kind: ReportKind<'_>, code: &str, message: &str, span: Span) {
    // ariadne counts characters, spans count bytes
    let start = char_offset(source, span.start);
    let end = char_offset(source, span.end).max(start);
    let color = if matches!(kind, ReportKind::Error) {
        Color::Red
    } else {
        Color::Yellow
    };
    let printed = Report::build(kind, id.to_string(), start)
        .with_code(code)
        .with_message(message)
        .with_label(
            Label::new((id.to_string(), start..end))
                .with_message(message)
                .with_color(color),
        )
        .finish()
        .eprint((id.to_string(), Source::from(source)));
    if printed.is_err() {
        eprintln!("{} {}: {}", code, id, message);
    }
}

fn char_offset(source: &str, byte: usize) -> usize {
    let mut byte = byte.min(source.len());
    while !source.is_char_boundary(byte) {
        byte -= 1;
    }
    source[..byte].chars().count()
}
