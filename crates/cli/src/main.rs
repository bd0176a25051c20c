//! Groupsync command-line tool.
//!
//! Checks the groups described in a local JSON file against the groups of a
//! Canvas course and reports what differs. Also manages the cached student
//! id mapping and the configuration file.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing::info;
use tracing_subscriber::EnvFilter;

use groupsync_core::canvas::CanvasClient;
use groupsync_core::config::AppConfig;
use groupsync_core::identity::{CacheKey, IdentifierMap, JsonFileCache};
use groupsync_core::models::{LocalId, RemoteId};
use groupsync_core::reconcile::{ReconciliationContext, ReconciliationEngine, ReconciliationReport};
use groupsync_core::reporter::{JsonReporter, Reporter, TextReporter};
use groupsync_core::sources::ConfigSource;
use groupsync_core::GroupSpecFile;

/// Exit status of `check --fail-on-drift` when Canvas differs from the file.
const EXIT_DRIFT: u8 = 2;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Groupsync command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "groupsync",
    version,
    about = "Reconcile locally configured groups against a Canvas course"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "groupsync.toml")]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare the groups file with Canvas and report the differences.
    Check {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Also list groups that are already in sync.
        #[arg(long)]
        show_clean: bool,

        /// Exit with status 2 when any group differs from Canvas.
        #[arg(long)]
        fail_on_drift: bool,
    },

    /// Manage the cached student id mapping.
    Students {
        #[command(subcommand)]
        action: StudentsAction,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./groupsync.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

#[derive(Subcommand, Debug)]
enum StudentsAction {
    /// Fetch students from Canvas and overwrite the cache.
    Refresh,
    /// Translate a login name to a Canvas id, or a Canvas id to a login name.
    Lookup {
        /// Local id or numeric Canvas user id.
        id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so report output on stdout stays machine readable.
fn init_logging(cli: &Cli) {
    let filter = log_filter(
        cli.log_level.as_deref(),
        || std::env::var("RUST_LOG").ok(),
        || {
            AppConfig::load_from_file(&cli.config)
                .ok()
                .map(|c| c.general.log_level)
        },
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Pick the filter directive: `--log-level`, then `RUST_LOG`, then the
/// config file's `general.log_level`, then `warn`.
fn log_filter(
    flag: Option<&str>,
    env: impl FnOnce() -> Option<String>,
    config: impl FnOnce() -> Option<String>,
) -> EnvFilter {
    let directive = flag
        .map(str::to_string)
        .or_else(|| env().filter(|v| !v.is_empty()))
        .or_else(config)
        .unwrap_or_else(|| "warn".to_string());
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Init { output } => cmd_init(&output).map(|()| ExitCode::SUCCESS),
        Commands::Validate => cmd_validate(&cli.config).map(|()| ExitCode::SUCCESS),
        Commands::Check {
            format,
            show_clean,
            fail_on_drift,
        } => {
            let config = load_config(&cli.config)?;
            cmd_check(&config, format, show_clean, fail_on_drift).await
        }
        Commands::Students { action } => {
            let config = load_config(&cli.config)?;
            cmd_students(&config, action)
                .await
                .map(|()| ExitCode::SUCCESS)
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_resolve(path).context("failed to load configuration file")
}

fn canvas_client(config: &AppConfig) -> Result<CanvasClient> {
    let token = config
        .require_token()
        .context("a Canvas access token is required")?;
    let client = CanvasClient::new(&config.canvas.api_url, token)
        .context("failed to create Canvas client")?
        .with_local_id_field(config.canvas.local_id_field);
    Ok(client)
}

fn student_cache(config: &AppConfig) -> JsonFileCache {
    let cache = JsonFileCache::new(&config.paths.student_cache);
    match config.cache.max_age() {
        Some(max_age) => cache.with_max_age(max_age),
        None => cache,
    }
}

fn cache_key(config: &AppConfig) -> CacheKey {
    CacheKey::new(config.canvas.course_id).with_local_id_field(config.canvas.local_id_field)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_check(
    config: &AppConfig,
    format: OutputFormat,
    show_clean: bool,
    fail_on_drift: bool,
) -> Result<ExitCode> {
    let specs = GroupSpecFile::new(&config.paths.groups_file)
        .read_group_specs()
        .context("failed to read groups file")?;
    info!(count = specs.len(), "found groups in the local configuration file");

    let client = canvas_client(config)?;
    let cache = student_cache(config);
    let ctx = ReconciliationContext::build(
        &cache,
        &client,
        &client,
        &cache_key(config),
        config.canvas.group_category_id,
    )
    .await
    .context("failed to load students and groups from Canvas")?;

    let report = ReconciliationEngine::new(&ctx).reconcile_all(&specs);

    match format {
        OutputFormat::Json => println!("{}", JsonReporter.render(&report)),
        OutputFormat::Text => {
            println!();
            println!(
                "{}",
                style::header(&format!(
                    "{} configured group(s), {} on Canvas",
                    specs.len(),
                    ctx.catalog.len()
                ))
            );
            println!();
            print!("{}", TextReporter { show_clean }.render(&report));
            println!();
            print_summary_table(&report);
            if report.is_in_sync() {
                println!("{}", style::success("All groups match Canvas"));
            } else {
                println!("{}", style::warn("Canvas differs from the groups file"));
            }
            println!();
        }
    }

    if fail_on_drift && !report.is_in_sync() {
        return Ok(ExitCode::from(EXIT_DRIFT));
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary_table(report: &ReconciliationReport) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Group", "Canvas ID", "Status", "Add", "Remove", "Unresolved"]);

    for outcome in &report.outcomes {
        let id = outcome
            .remote_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "—".to_string());
        let (add, remove, unresolved) = match outcome.result.diff() {
            Some(d) => (
                d.to_add.len(),
                d.to_remove.len(),
                d.unresolved_local.len() + d.unresolved_remote.len(),
            ),
            None => (0, 0, 0),
        };

        table.add_row(vec![
            Cell::new(&outcome.name),
            Cell::new(id),
            style::outcome_cell(&outcome.result),
            style::count_cell(add),
            style::count_cell(remove),
            style::count_cell(unresolved),
        ]);
    }

    println!("{}", table);
}

async fn cmd_students(config: &AppConfig, action: StudentsAction) -> Result<()> {
    let client = canvas_client(config)?;
    let cache = student_cache(config);
    let key = cache_key(config);

    match action {
        StudentsAction::Refresh => {
            let map = IdentifierMap::refresh(&cache, &key, &client)
                .await
                .context("failed to fetch students from Canvas")?;
            println!(
                "{}",
                style::success(&format!(
                    "Cached {} student(s) to {}",
                    map.len(),
                    cache.path().display()
                ))
            );
            Ok(())
        }

        StudentsAction::Lookup { id } => {
            let map = IdentifierMap::build(&cache, &key, &client)
                .await
                .context("failed to load student id mapping")?;

            if let Some(remote) = map.lookup_remote(&LocalId::from(id.as_str())) {
                println!("Local id : {}", id);
                println!("Canvas id: {}", remote);
                return Ok(());
            }
            if let Some(local) = id
                .parse::<u64>()
                .ok()
                .and_then(|n| map.lookup_local(RemoteId::new(n)))
            {
                println!("Canvas id: {}", id);
                println!("Local id : {}", local);
                return Ok(());
            }

            println!(
                "{}",
                style::warn(&format!("No student matching '{}' in course {}", id, key.course_id))
            );
            println!("{}", style::dim("Run 'groupsync students refresh' if the roster changed."));
            Ok(())
        }
    }
}

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# Groupsync Configuration

[general]
log_level = "info"

[canvas]
api_url = "https://canvas.example.edu"
token_env = "CANVAS_TOKEN"
course_id = 1234
group_category_id = 567
# Canvas user field used as the local id: "login_id" or "sis_user_id".
local_id_field = "login_id"

[paths]
groups_file = "config/groups.json"
student_cache = "config/students.json"

[cache]
# Refetch students when the cache is older than this. 0 never expires.
max_age_hours = 0
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file with your Canvas course and group category");
    println!("  2. Export the access token variable (CANVAS_TOKEN by default)");
    println!(
        "  3. Validate with: groupsync validate --config {}",
        output.display()
    );
    println!(
        "  4. Compare groups: groupsync check --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Canvas URL    : {}", config.canvas.api_url);
    println!(
        "  Canvas token  : {}",
        if config.canvas.token.is_some() {
            "set"
        } else {
            "NOT SET"
        }
    );
    println!("  Course        : {}", config.canvas.course_id);
    println!("  Group category: {}", config.canvas.group_category_id);
    println!("  Local id field: {:?}", config.canvas.local_id_field);
    println!("  Groups file   : {}", config.paths.groups_file.display());
    println!("  Student cache : {}", config.paths.student_cache.display());
    println!();
    println!("Configuration is valid.");

    Ok(())
}
