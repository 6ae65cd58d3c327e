use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod catalog;
mod config;
mod error;
mod thumbs;
mod utils;

use catalog::diagnostics::{diagnose, CatalogReport};
use catalog::Catalog;
use config::{Background, Config};
use thumbs::fetch::{fetch_catalog, HttpSource};
use thumbs::migrate::migrate_catalog;
use thumbs::sync::{sync_catalog, SyncOptions};
use thumbs::urls::fix_urls;

#[derive(Parser, Debug)]
#[command(name = "gallery-thumbs")]
#[command(about = "Generate and repair the gallery's thumbnail set and catalog URLs", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/gallery-thumbs/config.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog JSON to read
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Write the updated catalog here instead of in place
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Directory holding img/thumbnails
    #[arg(long, global = true)]
    site_root: Option<PathBuf>,

    /// Also write the run summary as JSON to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Locate artwork, render missing thumbnails and update catalog URLs.
    Sync(SyncArgs),

    /// Fill missing thumbnailURLs and rewrite URLs that contain '#'. Catalog only.
    FixUrls,

    /// Rename legacy `<raw name>.jpg` thumbnails to their sanitized names.
    Rename,

    /// Download each record's URL and render one square thumbnail.
    Fetch {
        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Edge length of the square thumbnail
        #[arg(long)]
        size: Option<u32>,
        /// Only the first N records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Report duplicates, missing thumbnails and broken URLs. Read-only.
    Check {
        /// Only count records of this type in the summary
        #[arg(long = "type")]
        record_type: Option<String>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// Directory of source artwork
    #[arg(long)]
    image_root: Option<PathBuf>,
    /// Subdirectory of the image root to search too (repeatable)
    #[arg(long = "subdir")]
    subdirs: Vec<String>,
    /// Only records of this Type (case-insensitive)
    #[arg(long = "type")]
    record_type: Option<String>,
    /// Only records with this exact name (repeatable)
    #[arg(long = "name")]
    names: Vec<String>,
    /// Only the first N catalog records
    #[arg(long)]
    limit: Option<usize>,
    /// Worker threads for locate/render
    #[arg(short, long)]
    jobs: Option<usize>,
    /// JPEG quality, 1-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,
    /// Letterbox and transparency fill
    #[arg(long, value_enum)]
    background: Option<Background>,
    /// Rename legacy thumbnails before checking for existing files
    #[arg(long)]
    migrate_legacy: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Config file values, overridden by whatever was given on the command line
    fn resolve_config(&self) -> error::Result<Config> {
        let config = Config::load(self.config.as_deref())?;
        Ok(self.apply_overrides(config))
    }

    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(catalog) = &self.catalog {
            config.catalog = catalog.clone();
        }
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if let Some(site_root) = &self.site_root {
            config.site_root = site_root.clone();
        }

        match &self.command {
            Command::Sync(args) => {
                if let Some(root) = &args.image_root {
                    config.image_root = Some(root.clone());
                }
                if !args.subdirs.is_empty() {
                    config.subdirs = args.subdirs.clone();
                }
                if let Some(jobs) = args.jobs {
                    config.jobs = jobs.max(1);
                }
                if let Some(quality) = args.quality {
                    config.quality = quality;
                }
                if let Some(background) = args.background {
                    config.background = background;
                }
            }
            Command::Fetch { timeout, size, .. } => {
                if let Some(timeout) = timeout {
                    config.fetch.timeout_secs = *timeout;
                }
                if let Some(size) = size {
                    config.fetch.size = *size;
                }
            }
            _ => {}
        }
        config
    }
}

#[derive(Serialize)]
struct RunReport<'a, T: Serialize> {
    command: &'a str,
    catalog: &'a Path,
    finished_at: String,
    #[serde(flatten)]
    counters: T,
}

fn write_report<T: Serialize>(path: &Path, command: &str, config: &Config, counters: T) -> error::Result<()> {
    let report = RunReport {
        command,
        catalog: config.output_path(),
        finished_at: Utc::now().to_rfc3339(),
        counters,
    };
    let mut text = serde_json::to_string_pretty(&report).map_err(|e| error::Error::io(path, e.into()))?;
    text.push('\n');
    utils::write_atomic(path, text.as_bytes())
}

fn print_check(report: &CatalogReport, record_type: Option<&str>) {
    println!("Total records:           {}", report.total);
    if let Some(kind) = record_type {
        let count = report.types.get(&kind.trim().to_lowercase()).copied().unwrap_or(0);
        println!("Records of type '{}': {}", kind, count);
    }
    println!("Unnamed records:         {}", report.unnamed.len());
    println!("Duplicate mint groups:   {}", report.duplicate_mints.len());
    for group in &report.duplicate_mints {
        println!("  {} -> records {:?}", group.key, group.indices);
    }
    println!("Duplicate name groups:   {}", report.duplicate_names.len());
    for group in &report.duplicate_names {
        println!("  '{}' -> records {:?}", group.key, group.indices);
    }
    println!("Missing thumbnailURLs:   {}", report.missing_thumbnails.len());
    println!("URLs containing '#':     {}", report.hash_in_url.len());
    println!("Inconsistent 190x190:    {}", report.inconsistent.len());
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    SimpleLogger::new()
        .with_level(cli.log_level())
        .env()
        .init()?;

    let config = cli.resolve_config()?;
    log::debug!("Effective config: {:?}", config);

    match &cli.command {
        Command::Sync(args) => {
            let options = SyncOptions {
                type_filter: args.record_type.clone(),
                names: args.names.clone(),
                limit: args.limit,
                migrate_legacy: args.migrate_legacy,
            };
            let report = sync_catalog(&config, &options)?;
            print!("{}", report);
            if let Some(path) = &cli.report {
                write_report(path, "sync", &config, report)?;
            }
        }
        Command::FixUrls => {
            let mut catalog = Catalog::load(&config.catalog)?;
            let report = fix_urls(&mut catalog);
            catalog.save(config.output_path())?;
            println!("Filled:    {}", report.filled);
            println!("Rewritten: {}", report.rewritten);
            println!("Updated:   {}", report.updated());
            if let Some(path) = &cli.report {
                write_report(path, "fix-urls", &config, report)?;
            }
        }
        Command::Rename => {
            let mut catalog = Catalog::load(&config.catalog)?;
            let report = migrate_catalog(&mut catalog, &config);
            catalog.save(config.output_path())?;
            println!("Records with legacy names: {}", report.processed);
            println!("Files renamed:             {}", report.renamed);
            println!("Conflicts:                 {}", report.conflicts);
            println!("Records updated:           {}", report.updated);
            if let Some(path) = &cli.report {
                write_report(path, "rename", &config, report)?;
            }
        }
        Command::Fetch { limit, .. } => {
            let mut catalog = Catalog::load(&config.catalog)?;
            let source = HttpSource::new(Duration::from_secs(config.fetch.timeout_secs.max(1)));
            let report = fetch_catalog(&mut catalog, &config, &source, *limit)?;
            catalog.save(config.output_path())?;
            println!(
                "Completed: {} thumbnails ready, {} skipped, {} failed",
                report.updated, report.skipped, report.failed
            );
            if let Some(path) = &cli.report {
                write_report(path, "fetch", &config, report)?;
            }
        }
        Command::Check { record_type, json } => {
            let catalog = Catalog::load(&config.catalog)?;
            let report = diagnose(&catalog);
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_check(&report, record_type.as_deref());
            }
            if let Some(path) = &cli.report {
                write_report(path, "check", &config, &report)?;
            }
            if !report.is_clean() {
                log::warn!("Catalog has duplicates or broken thumbnail URLs");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
