mod capture;
mod config;
mod dedup;
mod enrich;
mod error;
mod parser;
mod pipeline;
mod records;
mod resolve;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::records::{Extracted, PostRecord, ResolutionReport};

#[derive(Parser)]
#[command(name = "xhs_cards", about = "Xiaohongshu feed card extraction and user resolution")]
struct Cli {
    /// JSON file overriding the default pipeline settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Write JSON output here instead of stdout
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract post cards from one or more search/explore captures
    Posts {
        /// Capture files (processed in parallel)
        #[arg(required = true)]
        captures: Vec<PathBuf>,
        /// Only replay runs for these keywords (repeatable)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,
        /// Stop each keyword once this many cards are collected
        #[arg(short = 'n', long)]
        target: Option<usize>,
        /// Enrich the first N cards from captured detail pages
        #[arg(long)]
        detail_limit: Option<usize>,
        /// Include confidence and per-field miss reasons in the output
        #[arg(long)]
        diagnostics: bool,
    },
    /// Resolve a user from a search capture and collect their posts
    Users {
        capture: PathBuf,
        /// Override the account identifier stored in the capture
        #[arg(long)]
        identifier: Option<String>,
        /// Posts to keep from the selected user's feed
        #[arg(long)]
        posts: Option<usize>,
    },
    /// Parse an abbreviated count such as "1.2万" or "10+"
    Numeral { text: String },
    /// Find the time token in a line such as "编辑于 昨天 10:20"
    Time { text: String },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => PipelineConfig::default(),
    };

    let result = match cli.command {
        Commands::Posts {
            captures,
            keywords,
            target,
            detail_limit,
            diagnostics,
        } => {
            if !keywords.is_empty() {
                config.keywords = keywords;
            }
            if target.is_some() {
                config.target_count = target;
            }
            if let Some(n) = detail_limit {
                config.detail_limit = n;
            }

            let records = process_captures(&captures, &config)?;
            if records.is_empty() {
                eprintln!("No cards found in {} capture(s).", captures.len());
            } else {
                print_posts(&records);
            }
            if diagnostics {
                write_json(&records, cli.out.as_deref())?;
            } else {
                let plain: Vec<&PostRecord> = records.iter().map(|r| &r.value).collect();
                write_json(&plain, cli.out.as_deref())?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Users {
            capture,
            identifier,
            posts,
        } => {
            if let Some(n) = posts {
                config.posts_per_user = n;
            }
            let mut user_capture = capture::load_user_capture(&capture)?;
            if let Some(id) = identifier {
                user_capture.identifier = id;
            }

            let report = pipeline::run_user_capture(&user_capture, &config)
                .with_context(|| format!("Capture failed: {}", capture.display()))?;
            print_report(&report);
            write_json(&report, cli.out.as_deref())?;

            // Unresolved searches still write their report but exit non-zero.
            if report.is_resolved() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(2))
            }
        }
        Commands::Numeral { text } => {
            match parser::numeral::normalize(&text) {
                Some(n) => println!("{}", n),
                None => println!("null"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Time { text } => {
            match parser::time::find(&text) {
                Some(token) => println!("{:?}\t{}", token.kind, token.text),
                None => println!("null"),
            }
            Ok(ExitCode::SUCCESS)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Each capture is an independent run; results are concatenated in argument
/// order and deduplicated once more across files.
fn process_captures(
    paths: &[PathBuf],
    config: &PipelineConfig,
) -> anyhow::Result<Vec<Extracted<PostRecord>>> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} captures")?
            .progress_chars("#>-"),
    );

    let results: Vec<anyhow::Result<Vec<Extracted<PostRecord>>>> = paths
        .par_iter()
        .map(|path| {
            let capture = capture::load_post_capture(path)?;
            let records = pipeline::run_post_capture(&capture, config)
                .with_context(|| format!("Capture failed: {}", path.display()))?;
            pb.inc(1);
            Ok(records)
        })
        .collect();
    pb.finish_and_clear();

    let mut all = Vec::new();
    for r in results {
        all.extend(r?);
    }
    Ok(dedup::dedup_keep_order(all))
}

fn write_json<T: Serialize + ?Sized>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_posts(records: &[Extracted<PostRecord>]) {
    const MAX_ROWS: usize = 50;

    eprintln!(
        "{:>3} | {:<12} | {:<28} | {:<14} | {:>7} | {:<12} | {:<6}",
        "#", "Keyword", "Title", "Author", "Likes", "Time", "Conf"
    );
    eprintln!("{}", "-".repeat(100));

    for (i, r) in records.iter().take(MAX_ROWS).enumerate() {
        let p = &r.value;
        let likes = p
            .like_count
            .map(|n| n.to_string())
            .or_else(|| p.like_text.clone())
            .unwrap_or_else(|| "-".into());
        eprintln!(
            "{:>3} | {:<12} | {:<28} | {:<14} | {:>7} | {:<12} | {:<6}",
            i + 1,
            truncate(p.keyword.as_deref().unwrap_or("explore"), 12),
            truncate(p.title.as_deref().unwrap_or("-"), 28),
            truncate(p.author.as_deref().unwrap_or("-"), 14),
            likes,
            p.publish_time.as_deref().unwrap_or("-"),
            format!("{:?}", r.confidence).to_lowercase(),
        );
    }

    let partial = records.iter().filter(|r| !r.misses.is_empty()).count();
    eprintln!("\n{} cards | {} with missing fields", records.len(), partial);
}

fn print_report(report: &ResolutionReport) {
    match &report.selected_user {
        Some(u) => eprintln!(
            "Selected {} (fans={}) by {} | {}",
            u.username.as_deref().unwrap_or("-"),
            u.fans_count.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
            report.matched_by.as_str(),
            u.profile_url.as_deref().unwrap_or("-"),
        ),
        None => eprintln!("No user matched {} / {}", report.name, report.identifier),
    }

    if !report.candidates_top_k.is_empty() {
        eprintln!("\n--- Candidates ---");
        for (i, c) in report.candidates_top_k.iter().enumerate() {
            eprintln!(
                "{:>3} | {:<20} | {:>8}",
                i + 1,
                truncate(c.username.as_deref().unwrap_or("-"), 20),
                c.fans_text.as_deref().unwrap_or("-"),
            );
        }
    }

    if !report.posts.is_empty() {
        eprintln!("\n--- Posts ---");
        for (i, p) in report.posts.iter().enumerate() {
            eprintln!(
                "{:>3} | {:<30} | {:>7} | {}",
                i + 1,
                truncate(p.title.as_deref().unwrap_or("-"), 30),
                p.like_count.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
                p.publish_time.as_deref().unwrap_or("-"),
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
