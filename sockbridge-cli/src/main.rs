use clap::Parser;
use tokio_stream::StreamExt;

use sockbridge_relay::{EndpointConfig, RelayConfig, RelayEvent, RelayServer, ResolutionMode};

#[derive(Debug, Parser)]
#[command(name = "sockbridge")]
struct Cli {
    /// Local SOCKS4/4a listen address, host:port (port 0 picks one).
    #[arg(long, default_value = "127.0.0.1:1080")]
    listen: String,
    /// Upstream SOCKS5 proxy address, host:port.
    #[arg(long)]
    upstream: String,
    /// Where SOCKS4a hostnames are resolved.
    #[arg(long, value_enum, default_value = "local")]
    resolve: ResolveArg,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum ResolveArg {
    Local,
    Remote,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();

    let config = RelayConfig {
        listen: parse_endpoint(&cli.listen)?,
        upstream: parse_endpoint(&cli.upstream)?,
        resolution: match cli.resolve {
            ResolveArg::Local => ResolutionMode::ResolveLocally,
            ResolveArg::Remote => ResolutionMode::ResolveRemotely,
        },
        timeouts: Default::default(),
    };

    let (mut relay, mut events) = RelayServer::new(config);
    relay.start().await.map_err(|err| err.to_string())?;
    let local_addr = relay
        .local_addr()
        .ok_or_else(|| "relay has no bound address".to_string())?;
    println!("relay listening on {local_addr}");

    while let Some(Ok(event)) = events.next().await {
        match event {
            RelayEvent::ClientAccepted { peer } => {
                println!("accepted connection from {peer}");
            }
            RelayEvent::UpstreamConnected { upstream } => {
                println!("opened connection to {upstream}");
            }
            RelayEvent::Log { message } => {
                println!("{message}");
            }
        }
    }

    Ok(())
}

fn parse_endpoint(raw: &str) -> Result<EndpointConfig, String> {
    let Some((host, port)) = raw.rsplit_once(':') else {
        return Err(format!("expected host:port, got {raw}"));
    };
    let port = port
        .parse::<u16>()
        .map_err(|err| format!("bad port in {raw}: {err}"))?;
    Ok(EndpointConfig {
        host: host.to_string(),
        port,
    })
}
