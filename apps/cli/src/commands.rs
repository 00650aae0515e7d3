//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use brandscout_core::pipeline::{
    ProgressReporter, RecordStatus, RunOptions, RunSummary, run_pipeline,
};
use brandscout_core::providers::Enricher;
use brandscout_discovery::{LogoResolver, build_client, parse_site_url};
use brandscout_shared::{
    AppConfig, EnrichConfig, ProviderKind, init_config, load_config, load_config_from,
    resolve_secret, slugify,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// BrandScout: find official websites and logos for a catalog of organizations.
#[derive(Parser)]
#[command(
    name = "brandscout",
    version,
    about = "Fill in missing websites, social handles, and logos in a site content catalog.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.brandscout/brandscout.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process every record in the catalog.
    Run {
        /// Catalog JSON file.
        #[arg(long)]
        site: Option<PathBuf>,

        /// Public directory that logo paths resolve against.
        #[arg(long)]
        public: Option<PathBuf>,

        /// Only process records marked active.
        #[arg(long)]
        only_active: bool,

        /// Comma-separated category filter (case-insensitive).
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,

        /// Look everything up but download and write nothing.
        #[arg(long)]
        dry_run: bool,

        /// Also fill missing social handles using the selected provider.
        #[arg(long)]
        enrich_missing: bool,

        #[command(flatten)]
        keys: ProviderArgs,
    },

    /// Look up one organization's website and social handle.
    Enrich {
        /// Organization name.
        name: String,

        #[command(flatten)]
        keys: ProviderArgs,
    },

    /// Discover and download a single logo.
    Logo {
        /// Website to take the logo from.
        url: String,

        /// Output directory.
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Name used for the file (defaults to the URL host).
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Provider selection and credentials shared by `run` and `enrich`.
#[derive(Args)]
pub(crate) struct ProviderArgs {
    /// Enrichment provider: ddg, serpapi, openai, or hybrid.
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Locality hint added to search queries and prompts.
    #[arg(long)]
    locality: Option<String>,

    /// SerpAPI key (overrides the environment).
    #[arg(long)]
    serpapi_key: Option<String>,

    /// Language-model API key (overrides the environment).
    #[arg(long)]
    openai_key: Option<String>,

    /// Dotenv file loaded before reading keys from the environment.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "brandscout=info",
        1 => "brandscout=debug",
        _ => "brandscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Run {
            site,
            public,
            only_active,
            categories,
            dry_run,
            enrich_missing,
            keys,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            let enrich = enrich_config(&config, &keys)?;
            let options = RunOptions {
                catalog_path: site.unwrap_or_else(|| PathBuf::from(&config.defaults.catalog_path)),
                public_dir: public.unwrap_or_else(|| PathBuf::from(&config.defaults.public_dir)),
                collection: config.defaults.collection.clone(),
                only_active,
                categories: category_filter(&categories),
                dry_run,
                enrich_missing,
                enrich,
                http: config.http.clone(),
            };
            cmd_run(&options).await
        }
        Command::Enrich { name, keys } => {
            let config = resolve_config(config_path.as_deref())?;
            let enrich = enrich_config(&config, &keys)?;
            cmd_enrich(&config, &enrich, &name).await
        }
        Command::Logo { url, out, name } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_logo(&config, &url, &out, name.as_deref()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Merge config file, dotenv, environment, and flags.
fn enrich_config(config: &AppConfig, keys: &ProviderArgs) -> Result<EnrichConfig> {
    load_env_file(&keys.env_file)?;

    let mut enrich = EnrichConfig::from(config);
    if let Some(provider) = keys.provider {
        enrich.provider = provider;
    }
    if let Some(locality) = &keys.locality {
        enrich.locality = locality.clone();
    }
    enrich.serpapi_key = resolve_secret(keys.serpapi_key.as_deref(), &config.search.serpapi_key_env)
        .or_else(|| resolve_secret(None, "SERPAPI_KEY"));
    enrich.llm_key = resolve_secret(keys.openai_key.as_deref(), &config.llm.api_key_env)
        .or_else(|| resolve_secret(None, "OPENAI_API_KEY"));
    Ok(enrich)
}

/// Existing environment variables win; a missing file is fine.
fn load_env_file(path: &Path) -> Result<()> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded env file");
            Ok(())
        }
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(eyre!("failed to load {}: {e}", path.display())),
    }
}

fn category_filter(categories: &[String]) -> BTreeSet<String> {
    categories
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(options: &RunOptions) -> Result<()> {
    info!(
        catalog = %options.catalog_path.display(),
        public = %options.public_dir.display(),
        dry_run = options.dry_run,
        enrich_missing = options.enrich_missing,
        "starting run"
    );

    let reporter = CliProgress::new();
    let summary = run_pipeline(options, &reporter).await?;

    println!();
    println!("  Records:       {}", summary.total);
    println!("  Saved:         {}", summary.saved);
    println!("  Already OK:    {}", summary.already_ok);
    println!("  Failed:        {}", summary.failed);
    if summary.filtered_out > 0 {
        println!("  Filtered out:  {}", summary.filtered_out);
    }
    if options.dry_run {
        println!("  Would fetch:   {}", summary.simulated);
    }
    if summary.enrich_errors > 0 {
        println!("  Lookup errors: {}", summary.enrich_errors);
    }
    match (&summary.backup, summary.catalog_changed) {
        (Some(backup), _) => println!(
            "  Catalog:       updated {} record(s), backup at {}",
            summary.records_changed,
            backup.display()
        ),
        (None, true) => println!(
            "  Catalog:       {} record(s) would change (dry run)",
            summary.records_changed
        ),
        (None, false) => println!("  Catalog:       unchanged"),
    }
    println!("  Time:          {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_enrich(config: &AppConfig, enrich: &EnrichConfig, name: &str) -> Result<()> {
    let client = build_client(&config.http)?;
    let enricher = Enricher::from_config(enrich.provider, enrich, client);
    info!(name, provider = enricher.name(), "looking up organization");

    let outcome = enricher.enrich(name).await?;
    if outcome.is_empty() {
        println!("Nothing found for '{name}'.");
        return Ok(());
    }
    println!("  Website: {}", outcome.website.as_deref().unwrap_or("-"));
    println!("  Handle:  {}", outcome.handle.as_deref().unwrap_or("-"));
    Ok(())
}

async fn cmd_logo(config: &AppConfig, url: &str, out: &Path, name: Option<&str>) -> Result<()> {
    let site = parse_site_url(url)?;
    let name = name
        .map(str::to_string)
        .or_else(|| site.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default();

    let client = build_client(&config.http)?;
    let resolver = LogoResolver::new(client, &config.http);
    let candidate = resolver.discover(site.as_str()).await?;
    info!(url = %candidate.url, format = %candidate.format, "logo candidate");

    let target = out.join(format!("{}.{}", slugify(&name), candidate.format.extension()));
    let logo = resolver.download(&candidate, site.as_str(), &target).await?;
    println!("Saved {} ({} bytes)", logo.path.display(), logo.bytes);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn record_started(&self, _index: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn record_finished(&self, _index: usize, name: &str, status: &RecordStatus) {
        let line = match status {
            RecordStatus::FilteredOut => None,
            RecordStatus::AlreadyOk => Some(format!("  ok     {name}")),
            RecordStatus::Saved(path) => Some(format!("  saved  {name} -> {}", path.display())),
            RecordStatus::Simulated(url) => Some(format!("  would  {name} <- {url}")),
            RecordStatus::Failed(reason) => Some(format!("  failed {name}: {reason}")),
        };
        if let Some(line) = line {
            self.bar.println(line);
        }
        self.bar.inc(1);
    }

    fn done(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}
