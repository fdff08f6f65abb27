use anyhow::Result;
use clap::{CommandFactory, Parser};
use minitest_cli::commands;
use minitest_cli::commands::test::{OutputFormat, TestArgs};
use minitest_cli::config::{Config, LOG_ENV};
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Run MiniTest test modules.
///
/// Each MODULE is a compiled test library (a cdylib built with
/// `minitest_module!`). Modules run in the order given; the exit code is 0
/// only if no test failed.
///
/// EXAMPLES:
///     minitest target/debug/libcalc_tests.so
///     minitest libcalc_tests.so --filter Add --format json
///
/// ENVIRONMENT VARIABLES:
///     MINITEST_FORMAT       Set to 'json' for JSON output by default
///     MINITEST_NO_COLOR     Set to disable colored output (NO_COLOR also works)
///     MINITEST_SEARCH_PATH  Extra dependency directories, path-list separated
///     MINITEST_LOG          Diagnostic log filter (default: warn)
#[derive(Parser, Debug)]
#[command(name = "minitest")]
#[command(version)]
struct Cli {
    /// Test module libraries to run
    modules: Vec<PathBuf>,

    /// Only run units whose name contains this pattern
    #[arg(long, short = 'f')]
    filter: Option<String>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Extra directory searched for module dependencies (repeatable)
    #[arg(long = "search-path", short = 'L', value_name = "DIR")]
    search_paths: Vec<PathBuf>,
}

impl Cli {
    /// Merge flags with environment defaults; flags win
    fn into_args(self, config: Config) -> TestArgs {
        let format = self.format.unwrap_or(if config.default_json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        });
        let mut search_paths = self.search_paths;
        search_paths.extend(config.search_paths);
        TestArgs {
            modules: self.modules,
            filter: self.filter,
            format,
            no_color: self.no_color || config.no_color,
            search_paths,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    install_panic_hook();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.modules.is_empty() {
        eprintln!("No test modules provided.");
        eprintln!("{}", Cli::command().render_usage());
        return Ok(ExitCode::FAILURE);
    }

    let total = commands::test::run(cli.into_args(Config::from_env()))?;
    Ok(if total.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Log runner panics, then hand them to the previously installed hook.
///
/// Test code panics inside its own module and is reported as a failure there,
/// so anything reaching this hook is a fault in the runner itself.
fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "runner panicked");
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_modules_positional() {
        let cli = Cli::parse_from(["minitest", "a.so", "b.so"]);
        assert_eq!(cli.modules, vec![PathBuf::from("a.so"), PathBuf::from("b.so")]);
        assert!(cli.format.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::parse_from([
            "minitest",
            "a.so",
            "--filter",
            "Add",
            "--format",
            "json",
            "--no-color",
            "-L",
            "/opt/deps",
            "--search-path",
            "/opt/more",
        ]);
        assert_eq!(cli.filter.as_deref(), Some("Add"));
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(cli.no_color);
        assert_eq!(
            cli.search_paths,
            vec![PathBuf::from("/opt/deps"), PathBuf::from("/opt/more")]
        );
    }

    #[test]
    fn test_flags_override_environment() {
        let config = Config {
            default_json: true,
            no_color: false,
            search_paths: vec![PathBuf::from("/env")],
        };
        let args = Cli::parse_from(["minitest", "a.so", "--format", "text", "-L", "/cli"])
            .into_args(config);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(
            args.search_paths,
            vec![PathBuf::from("/cli"), PathBuf::from("/env")]
        );
    }

    #[test]
    fn test_environment_supplies_defaults() {
        let config = Config {
            default_json: true,
            no_color: true,
            search_paths: Vec::new(),
        };
        let args = Cli::parse_from(["minitest", "a.so"]).into_args(config);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.no_color);
    }

    #[test]
    fn test_panic_hook_forwards_to_previous() {
        static FORWARDED: AtomicBool = AtomicBool::new(false);

        let original = panic::take_hook();
        panic::set_hook(Box::new(|_| FORWARDED.store(true, Ordering::SeqCst)));
        install_panic_hook();
        let result = panic::catch_unwind(|| panic!("runner bug"));
        let _ = panic::take_hook();
        panic::set_hook(original);

        assert!(result.is_err());
        assert!(FORWARDED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_verify_cli() {
        Cli::command().debug_assert();
    }
}
