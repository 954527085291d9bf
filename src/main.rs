use cluster_membership::coordination::client::CoordinationClient;
use cluster_membership::coordination::memory::MemoryCoordination;
use cluster_membership::membership::node::Node;
use cluster_membership::membership::types::NodeConfig;

use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut node_count: usize = 3;
    let mut lease_ttl_secs: u64 = 5;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--nodes" => {
                node_count = args[i + 1].parse()?;
                i += 2;
            }
            "--lease-ttl" => {
                lease_ttl_secs = args[i + 1].parse()?;
                i += 2;
            }
            "--help" => {
                eprintln!("Usage: {} [--nodes N] [--lease-ttl seconds]", args[0]);
                eprintln!("Example: {} --nodes 5 --lease-ttl 3", args[0]);
                std::process::exit(1);
            }
            _ => {
                i += 1;
            }
        }
    }

    let config = NodeConfig {
        lease_ttl: Duration::from_secs(lease_ttl_secs),
        ..NodeConfig::default()
    };

    tracing::info!(
        "Starting {} membership nodes against an embedded coordination store",
        node_count
    );

    // 1. Coordination store (embedded, shared by all demo nodes):
    let store = MemoryCoordination::new();

    // 2. Construct and join the nodes:
    let mut nodes: Vec<Arc<Node>> = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let client: Arc<dyn CoordinationClient> = store.clone();
        let node = Arc::new(Node::new(client, config.clone()).await?);
        tracing::info!("Node ID: {}", node.identity());
        node.join().await?;
        nodes.push(node);
    }

    // 3. Spawn stats reporter:
    let stats_nodes = nodes.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));

        loop {
            interval.tick().await;
            for node in &stats_nodes {
                let members = node.members();
                tracing::info!(
                    "Node {} sees {} members",
                    node.identity(),
                    members.len()
                );
                for member in members {
                    tracing::info!("  - {}", member.id());
                }
            }
        }
    });

    tracing::info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    // 4. Graceful departure:
    for node in &nodes {
        if let Err(error) = node.leave().await {
            tracing::warn!("Leave failed for {}: {}", node.identity(), error);
        }
        node.close().await;
    }

    Ok(())
}
