use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::ServiceExt;

use crate::service::Weather;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "qweather-mcp", version, about = "QWeather MCP server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve MCP over stdin/stdout (default).
    Stdio,

    /// Serve MCP over streamable HTTP at `/mcp`.
    Http {
        /// Address to listen on.
        #[arg(long, env = "QWEATHER_MCP_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },
}

impl Cli {
    pub async fn run(self, weather: Weather) -> anyhow::Result<()> {
        match self.command.unwrap_or(Command::Stdio) {
            Command::Stdio => {
                tracing::info!("Serving over stdio");
                let server = weather.serve(rmcp::transport::stdio()).await?;
                server.waiting().await?;
            }
            Command::Http { bind } => {
                let service = StreamableHttpService::new(
                    move || Ok(weather.clone()),
                    LocalSessionManager::default().into(),
                    Default::default(),
                );
                let router = axum::Router::new().nest_service("/mcp", service);
                let listener = tokio::net::TcpListener::bind(bind).await?;

                tracing::info!("Serving over HTTP at http://{}/mcp", bind);
                axum::serve(listener, router)
                    .with_graceful_shutdown(async {
                        let _ = tokio::signal::ctrl_c().await;
                    })
                    .await?;
            }
        }

        Ok(())
    }
}
