mod loader;
mod logging;
mod settings;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use fauxgen_core::{Error as CoreError, Node, ast_json_schema, parse_ast_json, validate_ast};
use fauxgen_eval::{EvalError, Interpreter};
use fauxgen_generate::{EmitterError, JsonLinesEmitter};
use loader::JsonFileLoader;
use logging::{LogFormat, init_logging};
use settings::{Settings, SettingsError};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("invalid program: {0}")]
    Ast(#[from] CoreError),
    #[error("evaluation failed: {0}")]
    Eval(#[from] EvalError),
    #[error("output error: {0}")]
    Output(#[from] EmitterError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
}

#[derive(Parser, Debug)]
#[command(name = "fauxgen", version, about = "Synthetic data generator")]
struct Cli {
    /// Log output format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a program and write generated records as JSON lines.
    Run(RunArgs),
    /// Decode a program and check the shape of every node.
    Check(CheckArgs),
    /// Print the JSON Schema of the AST format.
    AstSchema,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Program as a JSON-serialized AST.
    program: PathBuf,
    /// Output file; stdout when omitted.
    #[arg(long)]
    dest: Option<PathBuf>,
    /// Omit `$id` and `$parent` from records.
    #[arg(long, default_value_t = false)]
    no_metadata: bool,
    /// Evaluate declarations without generating records.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Directory of custom dictionary files.
    #[arg(long, value_name = "DIR")]
    dictionary: Option<PathBuf>,
    /// Settings file; defaults to ./fauxgen.toml when present.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    program: PathBuf,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging(cli.log_format).map_err(CliError::Logging)?;

    match cli.command {
        Command::Run(args) => run_program(args),
        Command::Check(args) => check_program(&args.program),
        Command::AstSchema => {
            let schema = serde_json::to_string_pretty(&ast_json_schema())?;
            println!("{schema}");
            Ok(())
        }
    }
}

fn run_program(args: RunArgs) -> Result<(), CliError> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if args.no_metadata {
        settings.disable_metadata = true;
    }
    if args.dry_run {
        settings.dry_run = true;
    }
    if let Some(dictionary) = args.dictionary {
        settings.dictionary_path = Some(dictionary);
    }
    if let Some(dest) = args.dest {
        settings.output = Some(dest);
    }

    let program = read_program(&args.program)?;
    let writer: Box<dyn Write> = match settings.output.as_deref() {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    tracing::info!(
        event = "run_started",
        program = %args.program.display(),
        dry_run = settings.dry_run,
        metadata = !settings.disable_metadata
    );
    let timer = Instant::now();

    let mut interpreter =
        Interpreter::new(JsonLinesEmitter::new(writer), settings.interpreter_options())
            .with_loader(JsonFileLoader)
            .with_source_path(std::fs::canonicalize(&args.program)?);
    interpreter.run(&program)?;

    let emitter = interpreter.emitter();
    tracing::info!(
        event = "run_finished",
        status = "success",
        records = emitter.records_written(),
        bytes = emitter.bytes_written(),
        warnings = interpreter.warnings().len(),
        duration_ms = timer.elapsed().as_millis()
    );
    Ok(())
}

fn check_program(path: &Path) -> Result<(), CliError> {
    let program = read_program(path)?;
    tracing::info!(
        event = "program_checked",
        program = %path.display(),
        statements = program.children.len()
    );
    println!("{}: ok", path.display());
    Ok(())
}

fn read_program(path: &Path) -> Result<Node, CliError> {
    let source = std::fs::read_to_string(path)?;
    let program = parse_ast_json(&source)?;
    validate_ast(&program)?;
    Ok(program)
}
