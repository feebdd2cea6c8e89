//! oxide-front-server CLI
//!
//! Serves the controllers of one or more packages over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use oxide_front::{Discoverer, Dispatcher, FrontConfig, Registry};
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_front_server::{serve, DirectoryResources, TemplateViews};

mod demo;

/// Front controller HTTP server.
#[derive(Parser)]
#[command(name = "oxide-front-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(short, long, env = "OXIDE_FRONT_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Comma-separated controller packages to scan (`a::b` or `a.b`).
    #[arg(short, long, env = "OXIDE_FRONT_PACKAGES")]
    packages: Option<String>,

    /// Application root the server is mounted under.
    #[arg(long, default_value = "")]
    context_path: String,

    /// Directory of static files.
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Directory of view templates.
    #[arg(long, default_value = "views")]
    views_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = FrontConfig::from_declaration(cli.packages.as_deref(), demo::PACKAGE)
        .context_path(&cli.context_path);
    let registry = Registry::from_config(&config, &Discoverer::global())?;
    info!(routes = registry.len(), packages = ?config.packages, "route table built");

    let dispatcher = Dispatcher::new(Arc::new(registry))
        .with_resources(DirectoryResources::new(&cli.static_dir))
        .with_views(TemplateViews::new(&cli.views_dir));

    let listener = TcpListener::bind(cli.bind).await?;
    info!(addr = %cli.bind, context_path = %config.context_path, "oxide-front-server listening");

    serve(listener, dispatcher, &config.context_path).await?;
    Ok(())
}
