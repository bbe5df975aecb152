//! Example of using the devp2p-peers crawler.
//!
//! Revalidates the nodes listed in a file, one `enode://` URL per line, and
//! prints the ones which are still alive together with their score.

use clap::Parser;
use devp2p_peers_crawler::{
    ClientId, ConnectionConfiguration, CrawlerBuilder, DialResolver, Node, NodeRecord, NodeSet,
    TcpPeerDialer,
};
use log::LevelFilter;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File with one enode URL per line.
    #[arg(short, long)]
    nodes: String,

    /// Only keep nodes on this network, 0 keeps every network.
    #[arg(short = 'i', long, default_value = "0")]
    network_id: u64,

    /// Custom client id (optional).
    #[arg(short, long)]
    client_id: Option<String>,

    /// Number of concurrent revalidation workers.
    #[arg(short, long, default_value = "16")]
    threads: usize,

    /// Crawl timeout in seconds, 0 runs until the input is exhausted.
    #[arg(long, default_value = "0")]
    timeout: u64,

    /// Log level.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    // Configure fern logger
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {} - {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log_level)
        .chain(std::io::stderr())
        .apply()?;

    log::info!("CRAWLING THE DEVP2P NETWORK");

    let contents = std::fs::read_to_string(&args.nodes)
        .map_err(|e| format!("Unable to read {}: {e}", args.nodes))?;
    let mut input = NodeSet::new();
    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let node: Node = line
            .parse()
            .map_err(|e| format!("Invalid node URL {line}: {e}"))?;
        // Listed nodes count as alive until a revalidation fails.
        input.insert(NodeRecord::new(node).with_score(1));
    }
    log::debug!("Loaded {} nodes from {}", input.len(), args.nodes);

    let mut config = ConnectionConfiguration::random();
    if let Some(client_id) = args.client_id.clone() {
        log::debug!("Using custom client id: {client_id}");
        config = config.with_client_id(ClientId::new(client_id)?);
    }
    // The resolver and the network filter share one identity.
    let dialer = TcpPeerDialer::new(config);
    let resolver = DialResolver::new(dialer.clone());
    let crawler = CrawlerBuilder::new(input, resolver, dialer)
        .with_network_id(args.network_id)
        .build();

    tokio::select! {
        output = crawler.run(Duration::from_secs(args.timeout), args.threads) => {
            log::info!("{} nodes alive", output.len());
            for record in output.iter() {
                println!("{} score={}", record.node, record.score);
            }
        }
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => log::info!("Interrupted, discarding crawl"),
                Err(err) => log::error!("Unable to listen for shutdown signal: {err}"),
            }
        }
    }

    Ok(())
}
