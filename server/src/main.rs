use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use server::{
    core::{Application, Grant},
    http,
};

#[derive(Parser, Debug)]
#[command(version, about = "In-memory books backend for the bookdesk dashboard")]
struct Args {
    #[arg(long, env = "BOOKDESK_SERVER_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    #[arg(
        long = "token",
        help = "Accepted bearer token, as `owner=token` or a bare token",
        env = "BOOKDESK_SERVER_TOKENS",
        value_delimiter = ',',
        required = true
    )]
    grants: Vec<Grant>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Args { bind, grants } = Args::parse();

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;

    tracing::info!(address = %listener.local_addr()?, tokens = grants.len(), "serving books");

    http::Api::new(Application::new(grants))
        .start(listener)
        .await
        .context("serving the books API")?;

    Ok(())
}
