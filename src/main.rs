//! Purpose: `contentpush` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Command results are JSON on stdout; logs and errors go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Only validated collections are handed to the uploader.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod input;

use contentpush::api::{
    ContentSource, ContentSourceApiExt, Error, ErrorKind, HttpProjectClient, ProjectConfig,
    UploadCollection, UploadOptions, Uploader, to_exit_code,
};
use input::{InputFormat, Records, parse_input, read_source};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    let connection = Connection {
        api_url: cli.api_url,
        project: cli.project,
        token: cli.token,
    };

    command_dispatch::dispatch_command(cli.command, connection)
        .map_err(add_transport_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("---help") => OsString::from("--help"),
            Some("---version") => OsString::from("--version"),
            _ => arg,
        })
        .collect()
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "contentpush",
    version,
    about = "Validate content records and upload them to a project's content API",
    long_about = None,
    after_help = r#"EXAMPLES
  $ contentpush validate posts.json
  $ contentpush validate sheet.json --input rows --flatten
  $ contentpush --project 1234567 upload posts.jsonl --input jsonl
  $ contentpush --project 1234567 upload posts.json --content-source 42 --request-usage
  $ contentpush --project 1234567 sources create --name "Survey responses"

CONFIGURATION
  --api-url   CONTENTPUSH_API_URL   (default: https://api.brandwatch.com/)
  --project   CONTENTPUSH_PROJECT
  --token     CONTENTPUSH_TOKEN

  Set RUST_LOG=debug to log every request."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "CONTENTPUSH_API_URL",
        help = "API base url",
        value_hint = ValueHint::Url
    )]
    api_url: Option<String>,
    #[arg(long, global = true, env = "CONTENTPUSH_PROJECT", help = "Project id")]
    project: Option<String>,
    #[arg(
        long,
        global = true,
        env = "CONTENTPUSH_TOKEN",
        hide_env_values = true,
        help = "Access token sent as a bearer credential"
    )]
    token: Option<String>,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum InputFormatCli {
    Json,
    Jsonl,
    Rows,
}

impl From<InputFormatCli> for InputFormat {
    fn from(format: InputFormatCli) -> Self {
        match format {
            InputFormatCli::Json => InputFormat::Json,
            InputFormatCli::Jsonl => InputFormat::Jsonl,
            InputFormatCli::Rows => InputFormat::Rows,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Validate items and print them normalized",
        after_help = r#"EXAMPLES
  $ contentpush validate posts.json
  $ cat posts.jsonl | contentpush validate - --input jsonl
  $ contentpush validate sheet.json --input rows --flatten"#
    )]
    Validate {
        #[arg(help = "Input file, or '-' for stdin", value_hint = ValueHint::FilePath)]
        file: String,
        #[arg(long, value_enum, default_value = "json", help = "Input format")]
        input: InputFormatCli,
        #[arg(long, help = "Print a flat table (columns + rows) instead of nested items")]
        flatten: bool,
    },
    #[command(
        about = "Validate items and upload them, batching large collections",
        after_help = r#"NOTES
  - Collections over 1000 items are sent as sequential batches of 1000.
  - The first failing batch stops the upload; earlier batches stay uploaded."#
    )]
    Upload {
        #[arg(help = "Input file, or '-' for stdin", value_hint = ValueHint::FilePath)]
        file: String,
        #[arg(long, value_enum, default_value = "json", help = "Input format")]
        input: InputFormatCli,
        #[arg(long, help = "Content source id to upload into")]
        content_source: Option<u64>,
        #[arg(
            long,
            requires = "content_source",
            help = "Ask the platform to report usage (needs --content-source)"
        )]
        request_usage: bool,
    },
    #[command(arg_required_else_help = true, about = "Manage project content sources")]
    Sources {
        #[command(subcommand)]
        command: SourcesCommand,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SourcesCommand {
    #[command(about = "List content sources")]
    List,
    #[command(about = "Create a content source")]
    Create {
        #[arg(long, help = "Content source name")]
        name: String,
        #[arg(long, help = "Optional description")]
        description: Option<String>,
    },
}

/// Connection flags, resolved into a `ProjectConfig` only by commands that talk to the API.
struct Connection {
    api_url: Option<String>,
    project: Option<String>,
    token: Option<String>,
}

impl Connection {
    fn client(&self) -> Result<HttpProjectClient, Error> {
        let config = ProjectConfig::new(
            self.api_url.as_deref(),
            self.project.as_deref(),
            self.token.as_deref(),
        )?;
        HttpProjectClient::from_config(&config)
    }
}

fn load_collection(file: &str, input: InputFormatCli) -> Result<UploadCollection, Error> {
    let text = read_source(file)?;
    match parse_input(&text, InputFormat::from(input))? {
        Records::Items(items) => UploadCollection::validate(&items),
        Records::Rows(rows) => UploadCollection::from_tabular(&rows),
    }
}

fn add_transport_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Transport || err.hint().is_some() {
        return err;
    }
    match err.batch() {
        Some(batch) if batch > 0 => err.with_hint(format!(
            "Batches before Batch {batch} were already uploaded; resubmit only the remaining items."
        )),
        _ => err.with_hint("Check --api-url and network access to the platform."),
    }
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("I/O error. Check the path and file permissions.")
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share command/context if it persists.",
    )
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Validation => "validation failed".to_string(),
        ErrorKind::Transport => "request failed".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if !err.issues().is_empty() {
        inner.insert("issues".to_string(), json!(err.issues()));
    }
    if let Some(url) = err.url() {
        inner.insert("url".to_string(), json!(url));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(batch) = err.batch() {
        inner.insert("batch".to_string(), json!(batch));
    }
    if let Some(response) = err.response() {
        inner.insert("response".to_string(), response.clone());
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    for issue in err.issues() {
        lines.push(format!("  {issue}"));
    }

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(url) = err.url() {
        lines.push(format!(
            "{} {url}",
            colorize_label("url:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(status) = err.status() {
        lines.push(format!(
            "{} {status}",
            colorize_label("status:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(batch) = err.batch() {
        lines.push(format!(
            "{} Batch {batch}",
            colorize_label("batch:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `contentpush --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "contentpush") else {
        return "Try `contentpush --help`.".to_string();
    };

    let parts: Vec<&str> = tokens
        .iter()
        .skip(pos + 1)
        .take_while(|token| {
            !(token.starts_with('-') || token.starts_with('<') || token.starts_with('['))
        })
        .copied()
        .collect();

    if parts.is_empty() {
        return "Try `contentpush --help`.".to_string();
    }
    format!("Try `contentpush {} --help`.", parts.join(" "))
}
