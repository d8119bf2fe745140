use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use org_pr_scanner::config::{self, Config, MergeMethod, MergeOrder, Overrides};
use org_pr_scanner::github::GitHubClient;
use org_pr_scanner::scanner::{
    append_step_summary, resolve_caller_visibility, MergePolicy, OutputFormat, PrScanner,
    ReportGenerator, ScanReport, ScannerConfig,
};

#[derive(Parser)]
#[command(name = "scan-prs")]
#[command(about = "List open pull requests across a GitHub organization and auto-merge Dependabot workflow bumps")]
struct Cli {
    /// GitHub token (can also be set via GITHUB_TOKEN env var)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Organization name
    #[arg(short, long, env = "ORG", global = true)]
    org: Option<String>,

    /// public, private, internal, all, or a comma-separated combination
    #[arg(long, env = "VISIBILITY", global = true)]
    visibility: Option<String>,

    /// Visibility of the repository running the scan
    #[arg(long, env = "REPO_VISIBILITY", global = true)]
    repo_visibility: Option<String>,

    /// Repository running the scan, as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY", global = true)]
    caller_repo: Option<String>,

    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API root, for GitHub Enterprise
    #[arg(long, env = "SCAN_PRS_API_URL", global = true)]
    api_url: Option<String>,

    /// Output file path (stdout if not specified)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, default_value = "markdown", global = true)]
    format: OutputFormat,

    /// Custom handlebars template for the markdown report
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    /// Evaluate merges without performing them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Skip the Dependabot merge step entirely
    #[arg(long, global = true)]
    no_merge: bool,

    /// Merge method
    #[arg(long, global = true)]
    merge_method: Option<MergeMethod>,

    /// Order in which a repository's bot PRs are considered
    #[arg(long, global = true)]
    merge_order: Option<MergeOrder>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Report open pull requests and merge eligible Dependabot PRs (default)
    Scan,

    /// Report open pull requests only
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Scan);

    // Everything that can reject the configuration runs before the first API call
    let file_config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let settings = config::resolve(
        Overrides {
            token: cli.token.clone(),
            org: cli.org.clone(),
            visibility: cli.visibility.clone(),
            merge_method: cli.merge_method,
            merge_order: cli.merge_order,
            no_merge: cli.no_merge,
        },
        file_config,
    )?;
    let policy = MergePolicy::from_config(&settings.merge)?;
    let generator = ReportGenerator::new(cli.format, cli.template.clone())?
        .with_max_prs_listed(settings.max_prs_listed);

    let client = GitHubClient::new(settings.token, cli.api_url.as_deref())
        .context("Failed to create GitHub client")?;

    let caller = resolve_caller_visibility(
        &client,
        cli.repo_visibility.as_deref(),
        cli.caller_repo.as_deref(),
    )
    .await;
    let visibility = settings.visibility.narrow_for_caller(caller);

    let merge_enabled = matches!(command, Commands::Scan) && settings.merge.enabled;
    info!(
        org = %settings.org,
        visibility = %visibility.describe(),
        merge_enabled,
        dry_run = cli.dry_run,
        "Starting scan"
    );

    let scanner = PrScanner::new(
        client,
        ScannerConfig {
            org: settings.org,
            visibility,
            merge_enabled,
            dry_run: cli.dry_run,
        },
        policy,
    );

    let now = Utc::now();
    let report = match command {
        Commands::Scan => scanner.scan(now).await,
        Commands::List => scanner.list(now).await,
    }
    .context("Failed to list organization repositories")?;

    // Merges may already have happened, so output problems only warn from here on
    let content = generator.generate(&report)?;
    write_report(cli.output.as_deref(), &content);

    if let Ok(summary_path) = std::env::var("GITHUB_STEP_SUMMARY") {
        if !summary_path.is_empty() {
            let path = Path::new(&summary_path);
            write_step_summary(&generator, &report, &content, cli.format, path);
        }
    }

    Ok(())
}

fn write_report(output: Option<&Path>, content: &str) {
    let Some(path) = output else {
        println!("{}", content);
        return;
    };
    match std::fs::write(path, content) {
        Ok(()) => info!(path = %path.display(), "Report written"),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to write report, printing it instead");
            println!("{}", content);
        }
    }
}

fn write_step_summary(
    generator: &ReportGenerator,
    report: &ScanReport,
    content: &str,
    format: OutputFormat,
    path: &Path,
) {
    let markdown = if format == OutputFormat::Markdown {
        Ok(content.to_string())
    } else {
        generator.generate_markdown(report)
    };
    let result = markdown.and_then(|m| append_step_summary(path, &m).map_err(Into::into));
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Failed to append step summary");
    }
}
