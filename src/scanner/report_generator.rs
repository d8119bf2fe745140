use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::pr_scanner::{MergeDecision, ScanReport};

pub const DEFAULT_MAX_PRS_LISTED: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Json,
    Html,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "html" => Ok(OutputFormat::Html),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

pub struct ReportGenerator {
    template_engine: Handlebars<'static>,
    format: OutputFormat,
    max_prs_listed: usize,
}

impl ReportGenerator {
    pub fn new(format: OutputFormat, template_path: Option<PathBuf>) -> Result<Self> {
        let mut template_engine = Handlebars::new();
        // Output is markdown, not HTML
        template_engine.register_escape_fn(handlebars::no_escape);

        match template_path {
            Some(path) => {
                let template_content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read template {}", path.display()))?;
                template_engine.register_template_string("summary", &template_content)?;
            }
            None => {
                let default_template = include_str!("../../templates/summary.md.hbs");
                template_engine.register_template_string("summary", default_template)?;
            }
        }

        Ok(Self {
            template_engine,
            format,
            max_prs_listed: DEFAULT_MAX_PRS_LISTED,
        })
    }

    pub fn with_max_prs_listed(mut self, max_prs_listed: usize) -> Self {
        self.max_prs_listed = max_prs_listed;
        self
    }

    pub fn generate(&self, report: &ScanReport) -> Result<String> {
        match self.format {
            OutputFormat::Markdown => self.generate_markdown(report),
            OutputFormat::Json => self.generate_json(report),
            OutputFormat::Html => self.generate_html(report),
        }
    }

    pub fn generate_markdown(&self, report: &ScanReport) -> Result<String> {
        let repositories: Vec<serde_json::Value> = report
            .repositories
            .iter()
            .map(|entry| {
                let count = entry.pull_requests.len();
                let listed: Vec<serde_json::Value> = entry
                    .pull_requests
                    .iter()
                    .take(self.max_prs_listed)
                    .map(|t| {
                        json!({
                            "number": t.pr.number,
                            "url": t.pr.url,
                            "title": t.pr.title,
                            "emoji": t.bucket.emoji(),
                            "age": super::age::age_label(t.bucket, t.age_days),
                        })
                    })
                    .collect();

                json!({
                    "name": entry.repository.name,
                    "url": entry.repository.html_url,
                    "count": count,
                    "noun": if count == 1 { "PR" } else { "PRs" },
                    "pull_requests": listed,
                    "hidden": count.saturating_sub(self.max_prs_listed),
                })
            })
            .collect();

        let errors: Vec<serde_json::Value> = report
            .errors
            .iter()
            .map(|e| json!({ "name": e.repository, "message": e.message }))
            .collect();

        let merge = report.merges.as_ref().map(|run| {
            let outcomes: Vec<serde_json::Value> = run
                .outcomes
                .iter()
                .map(|o| {
                    let (icon, verb, reason) = match &o.decision {
                        MergeDecision::Merged => ("✅", "Merged", None),
                        MergeDecision::WouldMerge => ("🔍", "Would merge", None),
                        MergeDecision::Skipped(reason) => ("⏭️", "Skipped", Some(reason.clone())),
                        MergeDecision::Failed(reason) => {
                            ("❌", "Merge failed", Some(reason.clone()))
                        }
                    };
                    json!({
                        "icon": icon,
                        "verb": verb,
                        "reference": format!("{}#{}", o.repository, o.number),
                        "url": o.url,
                        "reason": reason,
                    })
                })
                .collect();

            json!({
                "dry_run": report.dry_run,
                "outcomes": outcomes,
                "found": run.summary.found,
                "merged": run.summary.merged,
                "would_merge": run.summary.would_merge,
                "skipped": run.summary.skipped,
            })
        });

        let data = json!({
            "title": capitalize(&report.org),
            "total": report.total_pull_requests,
            "repos_with_prs": report.repositories.len(),
            "repos_scanned": report.repositories_scanned,
            "visibility": report.visibility,
            "buckets": report.buckets,
            "repositories": repositories,
            "errors": errors,
            "merge": merge,
        });

        Ok(self.template_engine.render("summary", &data)?)
    }

    fn generate_json(&self, report: &ScanReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    fn generate_html(&self, report: &ScanReport) -> Result<String> {
        let markdown = self.generate_markdown(report)?;
        let parser = pulldown_cmark::Parser::new(&markdown);
        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, parser);

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Open Pull Requests - {}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif; max-width: 900px; margin: 0 auto; padding: 20px; }}
        h1, h2 {{ border-bottom: 1px solid #e1e4e8; padding-bottom: 0.3em; }}
    </style>
</head>
<body>
    {}
</body>
</html>"#,
            report.org, html
        ))
    }
}

/// Appends to the file GitHub Actions renders on the run page.
pub fn append_step_summary(path: &Path, markdown: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", markdown)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
