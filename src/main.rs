//! Purpose: `redlist` CLI entry point.
//! Role: Binary crate root; parses args, installs logging, dispatches commands.
//! Invariants: Command output goes to stdout as JSON; diagnostics and logs go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code` of the root cause.
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::time::Duration;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod link_json;

use redlist::api::{
    DEFAULT_BASE_URL, Error, ErrorKind, HttpTransport, LinkList, ListingClient, ListingType,
    to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.cause_kind().unwrap_or(err.kind()))
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Internal)
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
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `redlist --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    let config = ClientConfig {
        base_url: cli.base_url,
        user_agent: cli.user_agent,
        timeout: Duration::from_millis(cli.timeout_ms),
    };

    command_dispatch::dispatch_command(cli.command, &config)
        .map_err(add_transport_hint)
        .map_err(add_decode_hint)
        .map_err(|err| (err, color_mode))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "redlist",
    version,
    about = "Fetch paginated reddit listings as JSON",
    long_about = None,
    after_help = r#"EXAMPLES
  $ redlist fetch rust                      # hot posts in /r/rust
  $ redlist fetch rust --sort new --pages 3 # three pages of new posts
  $ redlist fetch --format jsonl            # front page, one post per line
  $ redlist locator rust --sort top --after abc123

NOTES
  - Set RUST_LOG=debug to see request URLs and page sizes on stderr."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        env = "REDLIST_BASE_URL",
        default_value = DEFAULT_BASE_URL,
        help = "API base URL (scheme and host only)",
        value_hint = ValueHint::Url
    )]
    base_url: String,
    #[arg(
        long,
        env = "REDLIST_USER_AGENT",
        help = "User-Agent header sent with every request (default: redlist/<version>)"
    )]
    user_agent: Option<String>,
    #[arg(long, default_value_t = 30_000, help = "Request timeout in milliseconds")]
    timeout_ms: u64,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize error labels: auto, always, never"
    )]
    color: ColorMode,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
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
enum OutputFormat {
    Pretty,
    Jsonl,
}

fn sort_parser() -> impl TypedValueParser<Value = ListingType> {
    PossibleValuesParser::new(ListingType::ALL.map(ListingType::as_str))
        .try_map(|raw| raw.parse::<ListingType>())
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Fetch one or more listing pages",
        after_help = r#"EXAMPLES
  $ redlist fetch
  $ redlist fetch rust --sort new
  $ redlist fetch /r/rust --pages 2 --format jsonl"#
    )]
    Fetch {
        #[arg(help = "Subreddit name, r/name, or /r/name (default: front page)")]
        subreddit: Option<String>,
        #[arg(
            long,
            default_value = "hot",
            ignore_case = true,
            value_parser = sort_parser(),
            help = "Listing sort order"
        )]
        sort: ListingType,
        #[arg(long, default_value_t = 1, help = "Number of pages to fetch")]
        pages: usize,
        #[arg(long, value_enum, default_value = "pretty", help = "Output format")]
        format: OutputFormat,
    },
    #[command(about = "Print the URL a fetch would request, without network access")]
    Locator {
        #[arg(help = "Subreddit name, r/name, or /r/name (default: front page)")]
        subreddit: Option<String>,
        #[arg(
            long,
            default_value = "hot",
            ignore_case = true,
            value_parser = sort_parser(),
            help = "Listing sort order"
        )]
        sort: ListingType,
        #[arg(long, help = "Id of the last known post (without the t3_ prefix)")]
        after: Option<String>,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

struct ClientConfig {
    base_url: String,
    user_agent: Option<String>,
    timeout: Duration,
}

impl ClientConfig {
    fn transport(&self) -> Result<HttpTransport, Error> {
        let mut transport = HttpTransport::new(self.base_url.clone())?.with_timeout(self.timeout);
        if let Some(user_agent) = &self.user_agent {
            transport = transport.with_user_agent(user_agent.clone());
        }
        Ok(transport)
    }
}

/// Accepts `rust`, `r/rust`, or `/r/rust`; empty means the front page.
fn normalize_subreddit(raw: Option<&str>) -> Result<String, Error> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(String::new());
    };
    let name = raw
        .strip_prefix("/r/")
        .or_else(|| raw.strip_prefix("r/"))
        .unwrap_or(raw)
        .trim_end_matches('/');
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+')
    {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("invalid subreddit `{raw}`"))
            .with_hint("Use a name like `rust`, `r/rust`, or `/r/rust`."));
    }
    Ok(format!("/r/{name}"))
}

fn emit_json(value: Value) {
    let pretty = io::stdout().is_terminal();
    let json = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
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

fn add_transport_hint(err: Error) -> Error {
    if err.hint().is_some() || err.cause_kind() != Some(ErrorKind::Transport) {
        return err;
    }
    err.with_hint("Network request failed. Check connectivity and --base-url, then retry.")
}

fn add_decode_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.cause_kind() {
        Some(ErrorKind::MalformedResponse) => {
            err.with_hint("The server did not return valid JSON. Check --base-url.")
        }
        Some(ErrorKind::DecodeTypeMismatch) => {
            err.with_hint("The listing JSON did not have the expected field types.")
        }
        _ => err,
    }
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(cause) = err.cause_kind() {
        inner.insert("cause".to_string(), json!(format!("{cause:?}")));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
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
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    for cause in error_causes(err) {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
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

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .map(|line| line.trim_start_matches("error: ").trim())
        .find(|line| !line.is_empty())
        .unwrap_or("invalid arguments")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, error_json, error_text, normalize_subreddit};
    use clap::CommandFactory;
    use redlist::api::{Error, ErrorKind};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn normalize_subreddit_accepts_common_forms() {
        assert_eq!(normalize_subreddit(None).expect("front"), "");
        assert_eq!(normalize_subreddit(Some("  ")).expect("blank"), "");
        for raw in ["rust", "r/rust", "/r/rust", "/r/rust/"] {
            assert_eq!(normalize_subreddit(Some(raw)).expect(raw), "/r/rust");
        }
        assert_eq!(
            normalize_subreddit(Some("rust+golang")).expect("multi"),
            "/r/rust+golang"
        );
    }

    #[test]
    fn normalize_subreddit_rejects_paths() {
        for raw in ["r/", "/r/a/b", "../etc", "a?b"] {
            let err = normalize_subreddit(Some(raw)).expect_err(raw);
            assert_eq!(err.kind(), ErrorKind::Usage);
        }
    }

    #[test]
    fn error_json_reports_cause_kind() {
        let err = Error::response(
            Error::new(ErrorKind::Transport).with_message("connection refused"),
        );
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Response");
        assert_eq!(value["error"]["cause"], "Transport");
        assert_eq!(value["error"]["causes"][0], "Transport: connection refused");
    }

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::Usage).with_message("bad input");
        let colored = error_text(&err, true);
        let plain = error_text(&err, false);
        assert!(colored.contains("\u{1b}[31merror:\u{1b}[0m"));
        assert!(plain.contains("error: bad input"));
        assert!(!plain.contains("\u{1b}["));
    }
}
