//! # Command Line Interface
//!
//! `serve` runs the control API, `compile` turns an OpenAPI file into an Envoy
//! bootstrap and `deployment` renders the gateway workload manifest.

pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::assembly::ConfigAssembler;
use crate::config::AppConfig;
use crate::deployment::{DeploymentBuilder, WorkloadRequest};
use crate::observability::{init_logging, log_config_info};
use crate::openapi::ImportOptions;
use crate::xds::{render_bootstrap, BootstrapFormat, UpstreamSelection};

#[derive(Parser)]
#[command(name = "oasproxy")]
#[command(about = "Compile OpenAPI descriptions into Envoy proxy configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML or YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP control API
    Serve {
        /// Bind address override
        #[arg(long)]
        host: Option<String>,

        /// Port override
        #[arg(long)]
        port: Option<u16>,
    },

    /// Compile an OpenAPI document into an Envoy bootstrap
    Compile {
        /// OpenAPI 3 document (JSON or YAML)
        input: PathBuf,

        /// Route to the sandbox endpoints
        #[arg(long)]
        sandbox: bool,

        /// Sandbox server URL, may be repeated
        #[arg(long = "sandbox-url")]
        sandbox_urls: Vec<String>,

        /// Output format: yaml or json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render the gateway Deployment manifest
    Deployment {
        /// Workload name
        name: String,

        #[arg(long, default_value_t = 1)]
        replicas: i32,

        #[arg(long)]
        namespace: Option<String>,

        /// Container environment entry as KEY=VALUE, may be repeated
        #[arg(short, long = "env")]
        env: Vec<String>,

        /// Secret holding registry credentials, may be repeated
        #[arg(long = "image-pull-secret")]
        image_pull_secrets: Vec<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    init_logging(&config.observability)?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            log_config_info(&config);
            crate::api::start_api_server(Arc::new(config)).await?;
        }
        Commands::Compile { input, sandbox, sandbox_urls, format, output } => {
            let format: BootstrapFormat = format.parse()?;
            let upstream = if sandbox { UpstreamSelection::Sandbox } else { UpstreamSelection::Production };
            let bytes = std::fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let assembler = ConfigAssembler::from_config(&config);
            let compiled =
                assembler.import_and_assemble(&bytes, &ImportOptions { sandbox_urls }, upstream)?;
            let body = format.serialize(&render_bootstrap(&compiled)?)?;

            output::write_document(&body, output.as_deref())?;
        }
        Commands::Deployment { name, replicas, namespace, env, image_pull_secrets, output } => {
            let request = WorkloadRequest {
                name,
                namespace,
                replicas,
                environment_variables: env,
                image_pull_secrets,
                ..Default::default()
            };
            let deployment = DeploymentBuilder::new(config.deployment.clone()).build(&request)?;
            info!(name = %request.name, replicas, "Rendered gateway deployment");

            output::write_document(&deployment.to_yaml()?, output.as_deref())?;
        }
    }

    Ok(())
}
