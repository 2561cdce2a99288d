//! `failure-excerpt`: print the relevant tail of a failed build's console log.
//!
//! Usage:
//!   failure-excerpt [--lines N] [--json] [--config PATH] [FILE]
//!   failure-excerpt --build UUID [--db PATH] [--json] [--config PATH]
//!
//! Without `--build`, the last N lines of FILE (or stdin) are treated as the
//! console tail of a failed build. With `--build`, the build is looked up in
//! the build database and the excerpt is shown only if the build qualifies.

mod file_logging;

use std::{
    env,
    fs::File,
    io::{self, BufReader, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use db::DBService;
use services::services::{
    build_host::LocalBuildHost,
    config::{Config, ConfigError, read_config_file},
    excerpt::{Excerpt, extract},
    failure_log::FailureLogService,
};
use tracing::{debug, info, warn};
use utils::{assets, log_tail::LogTail};
use uuid::Uuid;

/// Flags followed by a value.
const VALUE_FLAGS: [&str; 4] = ["--lines", "--config", "--db", "--build"];

fn print_usage() {
    println!("Show the relevant part of a failed build's console log");
    println!();
    println!("Usage:");
    println!("  failure-excerpt [OPTIONS] [FILE]          Read the console log from FILE or stdin");
    println!("  failure-excerpt --build <UUID> [OPTIONS]  Look up a build in the build database");
    println!();
    println!("Options:");
    println!("  --lines <N>       Number of trailing lines to inspect (default: 30)");
    println!("  --json            Print the excerpt as a JSON array of lines");
    println!("  --config <PATH>   Config file (default: {})", assets::config_path().display());
    println!("  --db <PATH>       Build database (default: FX_DATABASE_PATH or the data dir)");
    println!("  --help            Show this help");
}

fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|pos| args.get(pos + 1))
        .map(String::as_str)
}

fn positional(args: &[String]) -> Option<&str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            return Some(arg);
        }
    }
    None
}

fn config_path(args: &[String]) -> PathBuf {
    value_of(args, "--config")
        .map(PathBuf::from)
        .unwrap_or_else(assets::config_path)
}

/// Settle the config file outcome and apply command-line overrides. Called
/// once logging is up so a fallback to defaults is reported.
fn resolve_config(
    path: &Path,
    loaded: Result<Option<Config>, ConfigError>,
    args: &[String],
) -> anyhow::Result<Config> {
    let mut config = match loaded {
        Ok(Some(config)) => config,
        Ok(None) => {
            debug!(path = ?path, "No config file found, using defaults");
            Config::default()
        }
        Err(e) => {
            warn!(path = ?path, error = %e, "Invalid config file, using defaults");
            Config::default()
        }
    };

    if let Some(lines) = value_of(args, "--lines") {
        config.tail_lines = lines
            .parse()
            .with_context(|| format!("invalid --lines value: {lines}"))?;
    }
    config.validate()?;
    Ok(config)
}

fn excerpt_from_log(args: &[String], config: &Config) -> anyhow::Result<Excerpt> {
    let tail = match positional(args) {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
            LogTail::read_last_lines(BufReader::new(file), config.tail_lines)?
        }
        None => LogTail::read_last_lines(io::stdin().lock(), config.tail_lines)?,
    };
    debug!(tail_lines = tail.len(), "Read console tail");
    Ok(extract(&tail))
}

async fn excerpt_from_db(
    build: &str,
    args: &[String],
    config: &Config,
) -> anyhow::Result<Option<Arc<Excerpt>>> {
    let build_id = Uuid::parse_str(build).with_context(|| format!("invalid build id: {build}"))?;

    let db = match value_of(args, "--db") {
        Some(path) => DBService::connect(&PathBuf::from(path)).await?,
        None => DBService::new().await?,
    };
    let host = LocalBuildHost::new(db.pool.clone());
    let service = FailureLogService::new(Arc::new(host.clone()), Arc::new(host), config);

    let excerpt = service.get_excerpt(build_id).await?;
    if excerpt.is_none() {
        info!(build_id = %build_id, "Build has no failure excerpt");
    }
    Ok(excerpt)
}

fn print_excerpt(excerpt: &Excerpt, json: bool) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer(&mut out, excerpt)?;
        out.write_all(b"\n")?;
    } else {
        excerpt.write_to(&mut out)?;
    }
    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let path = config_path(&args);
    let loaded = read_config_file(&path).await;
    let log_level = match &loaded {
        Ok(Some(config)) => config.log_level.clone(),
        _ => Config::default().log_level,
    };
    let _guard = file_logging::init_logging(&log_level);
    let config = resolve_config(&path, loaded, &args)?;
    let json = args.iter().any(|a| a == "--json");

    match value_of(&args, "--build") {
        Some(build) => {
            if let Some(excerpt) = excerpt_from_db(build, &args, &config).await? {
                print_excerpt(&excerpt, json)?;
            }
        }
        None => print_excerpt(&excerpt_from_log(&args, &config)?, json)?,
    }

    Ok(())
}
