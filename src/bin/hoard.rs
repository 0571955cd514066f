//! hoard — command-line front end for the image cache.
//!
//! Resolves URLs to cached files, warms and clears the cache. Uses the same
//! configuration files as library consumers (see [`hoard::CacheConfig`]).

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hoard::{CacheConfig, FetchOptions, HoardBuilder, HoardError};

/// Hoard image cache
#[derive(Parser)]
#[command(name = "hoard")]
#[command(version = hoard::PKG_VERSION)]
#[command(about = "Disk cache for remotely fetched images")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Cache directory (overrides the configuration file).
    #[arg(long, env = "HOARD_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a URL to a cached file, fetching it if needed
    Get {
        url: String,
        /// Always refetch, even if a fresh copy is cached
        #[arg(long)]
        no_cache: bool,
        /// Refetch if the cached copy is older than this many seconds
        #[arg(long)]
        max_age: Option<u64>,
        /// Key-affecting request header, `name:value` (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
        /// Print a file:// URI instead of a path
        #[arg(long)]
        uri: bool,
    },

    /// Fetch several URLs into the cache
    Prefetch {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Remove one URL from the cache
    Remove {
        url: String,
        /// Key-affecting header the entry was cached with (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Remove every cached file
    Clear,

    /// Show cache statistics as JSON
    Stats,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn header_options(headers: Vec<(String, String)>) -> FetchOptions {
    headers
        .into_iter()
        .fold(FetchOptions::new(), |opts, (name, value)| opts.header(name, value))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with HOARD_LOG or RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("HOARD_LOG")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = CacheConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.cache_dir {
        config.cache_dir = dir;
    }
    let cache = HoardBuilder::from_config(&config).build()?;

    match args.command {
        Command::Get {
            url,
            no_cache,
            max_age,
            headers,
            uri,
        } => {
            let options = header_options(headers);
            let path = cache
                .get(&url, &options, no_cache, max_age.map(Duration::from_secs))
                .await?;
            if uri {
                let uri = hoard::file_uri(&path).ok_or_else(|| {
                    HoardError::Configuration(format!(
                        "cache path {} is not absolute",
                        path.display()
                    ))
                })?;
                println!("{uri}");
            } else {
                println!("{}", path.display());
            }
        }

        Command::Prefetch { urls } => {
            let results = cache.prefetch(&urls).await;
            let mut failed = 0;
            for (url, result) in urls.iter().zip(results) {
                match result {
                    Ok(path) => println!("{url} -> {}", path.display()),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{url}: {e}");
                    }
                }
            }
            if failed > 0 {
                return Err(format!("{failed} of {} prefetches failed", urls.len()).into());
            }
        }

        Command::Remove { url, headers } => {
            if cache.remove(&url, &header_options(headers)).await? {
                println!("removed {url}");
            } else {
                println!("{url} was not cached");
            }
        }

        Command::Clear => {
            cache.clear().await?;
            println!("cleared {}", cache.root().display());
        }

        Command::Stats => {
            let stats = cache.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_accepts_the_headers_get_cached_with() {
        let args = Args::try_parse_from([
            "hoard",
            "remove",
            "https://example.com/a.png",
            "-H",
            "Authorization: Bearer t",
        ])
        .unwrap();
        let Command::Remove { url, headers } = args.command else {
            panic!("expected remove");
        };
        assert_eq!(url, "https://example.com/a.png");
        assert_eq!(
            header_options(headers),
            FetchOptions::new().header("authorization", "Bearer t")
        );
    }

    #[test]
    fn header_without_separator_is_rejected() {
        assert!(parse_header("Authorization").is_err());
        assert!(parse_header(": value").is_err());
    }
}
