use egress_resolver::config::{Command, Config};
use egress_resolver::{
    InterfaceResolver, PlatformEgress, RouteTableReader, RoutingTable, SocketProbe,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let reader = RouteTableReader::new(&config.route_table_path);
    let probe = SocketProbe::new(config.probe_port);
    let egress = PlatformEgress::select(config.backend, reader.clone(), probe);

    match config.command {
        Command::Resolve { target, json, .. } => {
            let interfaces = config.interfaces;
            tracing::info!(
                "Resolving {} against {} interface(s) using {}",
                target,
                interfaces.len(),
                egress.name()
            );

            // Route table reads and probes block; keep them off the runtime threads
            let resolved = tokio::task::spawn_blocking(move || {
                InterfaceResolver::new(egress).resolve(&interfaces, target)
            })
            .await?;

            if json {
                let out = json!({
                    "target": target,
                    "interface": resolved.map(|i| i.to_string()),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                match resolved {
                    Some(iface) => println!("{}", iface),
                    None => println!("unreachable"),
                }
            }
        }
        Command::Routes => {
            let routes = tokio::task::spawn_blocking(move || reader.read_routes()).await?;
            tracing::info!(
                "Read {} usable route(s) from {}",
                routes.len(),
                config.route_table_path.display()
            );
            println!("{}", serde_json::to_string_pretty(&RoutingTable::new(routes))?);
        }
    }

    Ok(())
}
