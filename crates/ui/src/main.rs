use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bpaf::{construct, long, OptionParser, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postie_ui::composer::{local_endpoint, Composer, RelayClient};
use postie_ui::history::FileStorage;
use postie_ui::AppState;

#[derive(Debug, Clone)]
struct Args {
    listen: SocketAddr,
    history: PathBuf,
    relay_timeout: u64,
}

fn args() -> OptionParser<Args> {
    let listen = long("listen")
        .help("Address to serve the tester on")
        .argument::<SocketAddr>("ADDR")
        .fallback(SocketAddr::from(([0, 0, 0, 0], 8888)));
    let history = long("history")
        .help("File holding saved requests")
        .argument::<PathBuf>("PATH")
        .fallback(PathBuf::from("api-tester-requests.json"));
    let relay_timeout = long("relay-timeout")
        .help("Milliseconds to wait for the target server")
        .argument::<u64>("MS")
        .fallback(30_000);

    construct!(Args {
        listen,
        history,
        relay_timeout
    })
    .to_options()
    .descr("Browser based API tester")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postie_ui=info,postie=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = args().run();

    let mut relay_config = postie::Config::default();
    relay_config.relay.timeout_ms = args.relay_timeout;
    let relay = postie::app(&relay_config)?;

    // the relay is mounted on this server, so the composer calls its own origin
    let endpoint = local_endpoint(args.listen);
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_millis(args.relay_timeout.saturating_add(5_000)))
        .build()
        .context("Failed to build relay client")?;

    let composer = Composer::new(Box::new(FileStorage::new(&args.history)));
    let state = AppState::new(composer, RelayClient::new(client, endpoint));
    let app = postie_ui::router(state).merge(relay);

    tracing::info!("api tester listening on {}", args.listen);
    axum::Server::bind(&args.listen)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
