//! Command-line surface and dispatch.
//!
//! Diagnostics go to stderr through `tracing`; command results are the
//! only thing printed to stdout, always as JSON, so output can be piped
//! into other tools.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::actions;
use crate::scrape;
use crate::selectors::SelectorConfig;
use crate::session::{self, CloseOutcome, SessionContext, SessionStore};
use crate::utils::constants::DEFAULT_DEBUG_PORT;

#[derive(Parser, Debug)]
#[command(
    name = "browser-tools",
    version,
    about = "Browser automation from the command line"
)]
pub struct Cli {
    /// JSON file overriding the built-in scraping selectors.
    #[arg(long, global = true, value_name = "FILE")]
    pub selectors: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a persistent browser and record its session.
    Start {
        /// Remote debugging port.
        #[arg(long, default_value_t = DEFAULT_DEBUG_PORT)]
        port: u16,
        /// Run without a visible window.
        #[arg(long)]
        headless: bool,
    },

    /// Stop the persistent browser and remove its session record.
    Close,

    /// Navigate the browser to a URL.
    Navigate { url: String },

    /// Capture a PNG screenshot.
    Screenshot {
        /// Output file; defaults to a unique file in the temp directory.
        path: Option<PathBuf>,
        /// Navigate here before capturing.
        #[arg(long)]
        url: Option<String>,
        /// Capture the whole page, not just the viewport.
        #[arg(long)]
        full_page: bool,
    },

    /// Describe elements matching a CSS selector.
    Pick {
        selector: String,
        /// Describe every match instead of only the first.
        #[arg(long)]
        all: bool,
    },

    /// Evaluate a JavaScript expression and print its value.
    Eval { expression: String },

    /// Dump cookies visible to the current page.
    Cookies,

    /// Run a Google search and print the results.
    Search {
        query: String,
        /// Number of results to return.
        #[arg(long = "n", default_value_t = 5)]
        limit: usize,
        /// Also fetch each result page's text content.
        #[arg(long)]
        content: bool,
        /// Concurrent content fetches when --content is set.
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Extract page content as text, markdown, or html.
    Content {
        /// URL to load first; omit to read the browser's current page.
        url: Option<String>,
        #[arg(long, default_value = "markdown")]
        format: String,
    },

    /// Scrape the Hacker News front page.
    #[command(name = "hn-scraper")]
    HnScraper {
        /// Number of stories to fetch.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Run one command in a throwaway browser instead of the persistent
    /// session. Example: `browser-tools run -- search "rust lang"`.
    Run {
        /// Run the throwaway browser headless (default) or with a window.
        #[arg(
            long,
            action = ArgAction::Set,
            num_args = 0..=1,
            default_value_t = true,
            default_missing_value = "true"
        )]
        headless: bool,
        /// The command to run, with its own arguments.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },
}

/// Execute a parsed invocation end to end.
pub async fn run_command(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    // Explicit flag wins; otherwise an optional per-user override file.
    let selectors_path = cli.selectors.clone().or_else(default_selectors_path);
    let selectors = SelectorConfig::load(selectors_path.as_deref())?;
    let store = SessionStore::new()?;

    match cli.command {
        Command::Start { port, headless } => {
            let record = session::start(&store, port, headless, cancel).await?;
            print_json(&json!({
                "status": "started",
                "url": record.url,
                "pid": record.pid,
            }))
        }
        Command::Close => {
            let result = match session::close(&store)? {
                CloseOutcome::Closed { pid } => json!({ "status": "closed", "pid": pid }),
                CloseOutcome::NotRunning => json!({ "status": "not_running" }),
            };
            print_json(&result)
        }
        Command::Run { headless, args } => {
            let inner = parse_run_args(&args)?;
            let mut ctx = SessionContext::create_temporary(headless).await?;
            let result = dispatch_action(&ctx, inner, &selectors, cancel).await;
            // Teardown must happen on the error path too.
            let released = ctx.release().await;
            let value = result?;
            released?;
            print_json(&value)
        }
        command => {
            let mut ctx = SessionContext::attach_persistent(&store).await?;
            let result = dispatch_action(&ctx, command, &selectors, cancel).await;
            let released = ctx.release().await;
            let value = result?;
            released?;
            print_json(&value)
        }
    }
}

fn default_selectors_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("browser-tools").join("selectors.json"))
}

/// Re-parse the trailing arguments of `run` as a full command line.
fn parse_run_args(args: &[String]) -> Result<Command> {
    let argv = std::iter::once("browser-tools".to_string()).chain(args.iter().cloned());
    let inner = Cli::try_parse_from(argv)
        .context("invalid argument: could not parse the command after 'run'")?;

    if inner.selectors.is_some() {
        bail!("invalid argument: pass --selectors before 'run', not after it");
    }
    match inner.command {
        Command::Start { .. } | Command::Close | Command::Run { .. } => {
            bail!("invalid argument: '{}' cannot be nested under 'run'", command_name(&inner.command))
        }
        command => Ok(command),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Start { .. } => "start",
        Command::Close => "close",
        Command::Navigate { .. } => "navigate",
        Command::Screenshot { .. } => "screenshot",
        Command::Pick { .. } => "pick",
        Command::Eval { .. } => "eval",
        Command::Cookies => "cookies",
        Command::Search { .. } => "search",
        Command::Content { .. } => "content",
        Command::HnScraper { .. } => "hn-scraper",
        Command::Run { .. } => "run",
    }
}

/// Run one page-level command against an established browser connection.
async fn dispatch_action(
    ctx: &SessionContext,
    command: Command,
    selectors: &SelectorConfig,
    cancel: &CancellationToken,
) -> Result<serde_json::Value> {
    let page = ctx.page().await?;
    debug!(command = command_name(&command), "dispatching");

    match command {
        Command::Navigate { url } => {
            let outcome = actions::navigate(&page, &url, cancel).await?;
            Ok(serde_json::to_value(outcome)?)
        }
        Command::Screenshot {
            path,
            url,
            full_page,
        } => {
            if let Some(url) = url {
                actions::navigate(&page, &url, cancel).await?;
            }
            let path = actions::screenshot(&page, path.as_deref(), full_page).await?;
            Ok(json!({ "path": path }))
        }
        Command::Pick { selector, all } => {
            let limit = if all { usize::MAX } else { 1 };
            let elements = actions::pick_elements(&page, &selector, limit).await?;
            Ok(serde_json::to_value(elements)?)
        }
        Command::Eval { expression } => actions::evaluate(&page, &expression).await,
        Command::Cookies => actions::cookies(&page).await,
        Command::Search {
            query,
            limit,
            content,
            concurrency,
        } => {
            let mut results =
                scrape::search(&page, &query, limit, &selectors.google_search, cancel).await?;
            if content {
                scrape::enrich_results(ctx.browser(), &mut results, concurrency, cancel).await?;
            }
            Ok(serde_json::to_value(results)?)
        }
        Command::Content { url, format } => {
            let format = format.parse()?;
            let content = scrape::extract(&page, url.as_deref(), format, cancel).await?;
            Ok(serde_json::to_value(content)?)
        }
        Command::HnScraper { limit } => {
            let submissions =
                scrape::scrape_front_page(&page, limit, &selectors.hacker_news, cancel).await?;
            Ok(serde_json::to_value(submissions)?)
        }
        Command::Start { .. } | Command::Close | Command::Run { .. } => {
            // Routed in run_command; unreachable through dispatch.
            bail!("invalid argument: unsupported command")
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_with_options() {
        let cli = Cli::try_parse_from([
            "browser-tools",
            "search",
            "rust language",
            "--n",
            "8",
            "--content",
        ])
        .unwrap();
        match cli.command {
            Command::Search {
                query,
                limit,
                content,
                concurrency,
            } => {
                assert_eq!(query, "rust language");
                assert_eq!(limit, 8);
                assert!(content);
                assert!(concurrency.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn search_defaults_to_five_results() {
        let cli = Cli::try_parse_from(["browser-tools", "search", "q"]).unwrap();
        match cli.command {
            Command::Search { limit, content, .. } => {
                assert_eq!(limit, 5);
                assert!(!content);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn hn_scraper_defaults_to_ten_stories() {
        let cli = Cli::try_parse_from(["browser-tools", "hn-scraper"]).unwrap();
        match cli.command {
            Command::HnScraper { limit } => assert_eq!(limit, 10),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_defaults_to_headless() {
        let cli = Cli::try_parse_from(["browser-tools", "run", "--", "cookies"]).unwrap();
        match cli.command {
            Command::Run { headless, args } => {
                assert!(headless);
                assert_eq!(args, vec!["cookies"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_headless_can_be_disabled() {
        let cli =
            Cli::try_parse_from(["browser-tools", "run", "--headless", "false", "--", "cookies"])
                .unwrap();
        match cli.command {
            Command::Run { headless, .. } => assert!(!headless),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_args_reparse_into_a_command() {
        let args = vec!["search".to_string(), "query".to_string()];
        match parse_run_args(&args).unwrap() {
            Command::Search { query, .. } => assert_eq!(query, "query"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_rejects_nested_lifecycle_commands() {
        for nested in [vec!["start".to_string()], vec!["close".to_string()], vec![
            "run".to_string(),
            "cookies".to_string(),
        ]] {
            let err = parse_run_args(&nested).unwrap_err();
            assert!(err.to_string().contains("invalid argument"), "{err}");
        }
    }

    #[test]
    fn start_has_default_port() {
        let cli = Cli::try_parse_from(["browser-tools", "start"]).unwrap();
        match cli.command {
            Command::Start { port, headless } => {
                assert_eq!(port, DEFAULT_DEBUG_PORT);
                assert!(!headless);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_selectors_flag_is_accepted_anywhere() {
        let cli = Cli::try_parse_from([
            "browser-tools",
            "search",
            "q",
            "--selectors",
            "/tmp/sel.json",
        ])
        .unwrap();
        assert_eq!(cli.selectors.as_deref(), Some(std::path::Path::new("/tmp/sel.json")));
    }
}
