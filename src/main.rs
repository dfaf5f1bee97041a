//! CAMARA MCP Gateway - CAMARA network APIs as MCP tools

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use camara_gateway::{
    cli::{Cli, Command},
    config::Config,
    registry::{ApiVersion, EndpointRegistry},
    server::Gateway,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Pick up a local .env before config/env merging
    dotenvy::dotenv().ok();

    let mut cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command.take() {
        Some(Command::Endpoints { version, format }) => {
            run_endpoints(cli.config.as_deref(), version, &format)
        }
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Run the gateway server
async fn run_server(cli: Cli) -> ExitCode {
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // CLI flags override file/env configuration
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let gateway = match Gateway::new(config) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("Failed to start gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    match gateway.run().await {
        Ok(()) => {
            info!("Gateway stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Gateway error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Print the endpoint table for one version tag
fn run_endpoints(
    config_path: Option<&std::path::Path>,
    version: Option<String>,
    format: &str,
) -> ExitCode {
    let registry = match EndpointRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Endpoint table is invalid: {e}");
            return ExitCode::FAILURE;
        }
    };

    let version = match version {
        Some(tag) => match tag.parse::<ApiVersion>() {
            Ok(version) => version,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::load(config_path)
            .map(|c| c.version)
            .unwrap_or_default(),
    };

    let mut rows: Vec<(&str, &str)> = registry
        .keys()
        .map(|key| {
            let template = registry
                .lookup(key, version)
                .expect("validated registry covers all versions");
            (key, template)
        })
        .collect();
    rows.sort_unstable();

    if format == "json" {
        let table: serde_json::Map<String, serde_json::Value> = rows
            .into_iter()
            .map(|(key, template)| (key.to_string(), serde_json::json!(template)))
            .collect();
        match serde_json::to_string_pretty(&table) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{} endpoints ({version}):\n", rows.len());
        for (key, template) in rows {
            println!("  {key:32} {template}");
        }
    }

    ExitCode::SUCCESS
}
