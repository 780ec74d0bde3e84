mod cli;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use sc_core::config::Config;
use sc_core::plan::plan_interval;
use sc_core::range::{RangeRequest, ResolvedInterval};
use sc_core::JobAssembly;

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting shardcast");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    sc_server::start(config).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "shardcast=trace,sc_server=trace,sc_stream=trace,sc_core=debug,sc_db=debug,tower_http=debug"
                .to_string()
        } else {
            "shardcast=info,sc_server=info,sc_stream=info,sc_core=info,sc_db=info,tower_http=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
            json,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref(), json)
        }
        Commands::Plan {
            size,
            cids,
            chunk_size,
            range,
        } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            let chunk_size = chunk_size.unwrap_or(config.streaming.chunk_size);
            print_plan(
                size,
                cids,
                chunk_size,
                range.as_deref(),
                config.streaming.max_ranges,
            )
        }
        Commands::Version => {
            println!("shardcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>, json: bool) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = Config::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!(
        "  Gateway: {}/{}",
        config.gateway.url.trim_end_matches('/'),
        config.gateway.path_prefix
    );
    println!(
        "  Streaming: chunk size {}, prefetch window {}, max ranges {}",
        config.streaming.chunk_size, config.streaming.prefetch_window, config.streaming.max_ranges
    );

    let warnings = config.validate();
    for warning in &warnings {
        println!("  warning: {warning}");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }

    Ok(())
}

const MAX_PLAN_CHUNKS: u64 = 1 << 20;

fn print_plan(
    size: u64,
    cids: u64,
    chunk_size: u64,
    range: Option<&str>,
    max_ranges: usize,
) -> Result<()> {
    if chunk_size == 0 {
        anyhow::bail!("chunk size must be > 0");
    }

    // Identifiers past the last chunk the file can use never enter a plan.
    let needed = size.div_ceil(chunk_size);
    let listed = cids.min(needed);
    if listed > MAX_PLAN_CHUNKS {
        anyhow::bail!(
            "{listed} chunks is more than plan can list (limit {MAX_PLAN_CHUNKS}); use a larger --chunk-size"
        );
    }

    let chunk_ids = (0..listed).map(|i| format!("chunk-{i}")).collect();
    let assembly = JobAssembly::new(size, chunk_size, chunk_ids);
    if assembly.chunks_required() > assembly.chunk_count() {
        println!(
            "warning: {} bytes need {} chunks but only {} are recorded",
            size,
            assembly.chunks_required(),
            cids
        );
    }

    let intervals = match range {
        Some(value) => RangeRequest::parse(value, max_ranges)?.resolve(&assembly)?,
        None => ResolvedInterval::whole(&assembly).into_iter().collect(),
    };

    if intervals.is_empty() {
        println!("empty file: nothing to fetch");
        return Ok(());
    }

    for interval in intervals {
        let plan = plan_interval(interval.bytes, &assembly)?;
        println!(
            "{}  (bytes {}-{}, {} bytes, {} fetches)",
            interval.content_range(),
            interval.bytes.start,
            interval.bytes.end,
            plan.byte_len(),
            plan.requests.len()
        );
        for request in &plan.requests {
            match request.range {
                Some(r) => println!("  chunk {:>6}  {}  {} bytes", request.index, r.header_value(), request.len),
                None => println!("  chunk {:>6}  whole  {} bytes", request.index, request.len),
            }
        }
    }

    Ok(())
}
