//! main() for the Blockyard world server.

use clap::Parser as _;

use blockyard_server::config::Args;
use blockyard_server::{logging, webserver};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    logging::install(&args.logging)?;
    webserver::server_main(args).await
}
