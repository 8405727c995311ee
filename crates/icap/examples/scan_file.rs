//! Scans a file with an ICAP antivirus server.
//!
//! ```text
//! cargo run --example scan_file -- <host> <path>
//! ```

use std::process::ExitCode;

use micro_icap::client::{ClientConfig, IcapClient};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = std::env::args().skip(1);
    let (Some(host), Some(path)) = (args.next(), args.next()) else {
        eprintln!("usage: scan_file <host> <path>");
        return ExitCode::from(2);
    };

    let config = match ClientConfig::new(host) {
        Ok(config) => config,
        Err(e) => {
            error!(cause = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    let mut client = match IcapClient::connect(config).await {
        Ok(client) => client,
        Err(e) => {
            error!(kind = ?e.kind(), cause = %e, "icap handshake failed");
            return ExitCode::FAILURE;
        }
    };

    let result = client.scan_file(&path).await;
    let _ = client.shutdown().await;

    match result {
        Ok(true) => {
            info!(%path, "clean");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            info!(%path, "infected");
            ExitCode::from(3)
        }
        Err(e) => {
            error!(kind = ?e.kind(), cause = %e, %path, "scan could not be completed");
            ExitCode::FAILURE
        }
    }
}
