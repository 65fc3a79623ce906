//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::SplayConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    server: ServerInfo,
    forward: ForwardInfo,
    notify: NotifyInfo,
    buckets: Vec<BucketInfo>,
}

#[derive(Serialize)]
struct ServerInfo {
    host: String,
    port: u16,
    auth_required: bool,
    max_body_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

#[derive(Serialize)]
struct ForwardInfo {
    timeout_secs: u64,
    max_in_flight: usize,
}

#[derive(Serialize)]
struct NotifyInfo {
    ttl_ms: u64,
    poll_interval_ms: u64,
}

#[derive(Serialize)]
struct BucketInfo {
    slug: String,
    name: String,
    user: String,
    forward_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    forwards: Vec<TargetInfo>,
}

#[derive(Serialize)]
struct TargetInfo {
    name: String,
    url: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args.forwards);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args.forwards);
    }

    Ok(())
}

fn build_config_info(config: &SplayConfig, with_forwards: bool) -> ConfigInfo {
    let buckets = config
        .buckets
        .iter()
        .map(|bucket| BucketInfo {
            slug: bucket.slug.clone(),
            name: bucket.name.clone(),
            user: bucket.user.clone(),
            forward_count: bucket.forwards.len(),
            forwards: if with_forwards {
                bucket
                    .forwards
                    .iter()
                    .map(|f| TargetInfo {
                        name: f.name.clone(),
                        url: f.url.clone(),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", config.version),
        server: ServerInfo {
            host: config.server.host.clone(),
            port: config.server.port,
            auth_required: config.server.ingest_token.is_some(),
            max_body_bytes: config.server.max_body_bytes,
            metrics_port: config.observability.metrics_port,
        },
        forward: ForwardInfo {
            timeout_secs: config.forward.timeout_secs,
            max_in_flight: config.forward.max_in_flight,
        },
        notify: NotifyInfo {
            ttl_ms: config.notify.ttl_ms,
            poll_interval_ms: config.notify.poll_interval_ms,
        },
        buckets,
    }
}

fn print_config_info(config: &SplayConfig, with_forwards: bool) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   Splay Configuration                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🌐 Server");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Listen: {}:{}", config.server.host, config.server.port);
    println!(
        "   ├─ Auth: {}",
        if config.server.ingest_token.is_some() {
            "bearer token"
        } else {
            "open"
        }
    );
    match config.observability.metrics_port {
        Some(port) => println!("   └─ Metrics: :{}", port),
        None => println!("   └─ Metrics: disabled"),
    }

    println!("\n📦 Buckets ({})", config.buckets.len());
    for (i, bucket) in config.buckets.iter().enumerate() {
        let is_last = i == config.buckets.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} (user {})", prefix, bucket.slug, bucket.user);

        if with_forwards && !bucket.forwards.is_empty() {
            println!("   {}  ↪ Forwards ({}):", child_prefix, bucket.forwards.len());
            for (j, forward) in bucket.forwards.iter().enumerate() {
                let forward_prefix = if j == bucket.forwards.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                let name = if forward.name.is_empty() {
                    "-"
                } else {
                    forward.name.as_str()
                };
                println!(
                    "   {}     {} {} → {}",
                    child_prefix, forward_prefix, name, forward.url
                );
            }
        } else {
            println!("   {}  └─ {} forwards", child_prefix, bucket.forwards.len());
        }
    }

    println!("\n⚙️  Delivery");
    println!("   ├─ Forward timeout: {}s", config.forward.timeout_secs);
    println!("   ├─ Max in flight: {}", config.forward.max_in_flight);
    println!("   ├─ Notify TTL: {}ms", config.notify.ttl_ms);
    println!("   └─ Poll interval: {}ms", config.notify.poll_interval_ms);
    println!();
}
