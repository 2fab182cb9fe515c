//! Signing gateway server CLI.
//!
//! Loads the configuration, connects to the remote signature backend and
//! serves the gateway HTTP API until interrupted.

use clap::{Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use signing_gateway::{
    adapters::{
        http::server::{serve, GatewayServerConfig},
        registry::DirectoryFormRegistry,
        remote::client::{RemoteBackend, RemoteBackendConfig},
    },
    services::validation::spawn_trust_list_refresh,
    Collaborators, ConfigManager, FormRegistry, ServerConfiguration, SigningGateway,
    ValidationFacade,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "signing-gateway")]
#[command(about = "Signing parameter resolution and two-phase remote signing gateway")]
#[command(long_about = "
Signing Gateway - prepares documents for signing with an external key

EXAMPLES:
    # Serve with the default configuration
    signing-gateway serve

    # Serve on all interfaces with an explicit timestamp authority
    signing-gateway serve --bind 0.0.0.0:7200 --tsa-server http://tsa.example/tsr

    # Create the default configuration file
    signing-gateway config init

    # Point the gateway at a signature backend
    signing-gateway config set backend.base_url https://dss.example.com

ENVIRONMENT VARIABLES:
    SIGNING_GATEWAY_TOKEN    Bearer token required from callers
    RUST_LOG                 Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user configuration directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway HTTP server
    Serve {
        /// Address to bind to (overrides config)
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,

        /// Timestamp server URL; repeat for fallbacks (overrides config)
        #[arg(long = "tsa-server", value_name = "URL")]
        tsa_servers: Vec<String>,

        /// Allow signing plain XML without an eForm
        #[arg(long)]
        plain_xml: bool,

        /// Bearer token required from callers (overrides config)
        #[arg(long, env = "SIGNING_GATEWAY_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Initialize default configuration
    Init,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g. `bind_address`, `backend.base_url`)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new().into_diagnostic()?,
    };

    match cli.command {
        Commands::Serve {
            bind,
            tsa_servers,
            plain_xml,
            token,
            verbose,
        } => {
            let log_level = if verbose { "debug" } else { "info" };
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
                .init();

            let mut config = config_manager.load_or_create_default().into_diagnostic()?;
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            if !tsa_servers.is_empty() {
                config.timestamp_servers = tsa_servers;
            }
            if plain_xml {
                config.plain_xml_enabled = true;
            }
            if token.is_some() {
                config.auth_token = token;
            }
            ConfigManager::validate_config(&config).into_diagnostic()?;
            run_server(config)
        }
        Commands::Config(cmd) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
                .init();
            handle_config_command(&config_manager, cmd)
        }
    }
}

fn run_server(config: ServerConfiguration) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .max_blocking_threads(config.worker_threads.max(1) * 4)
        .enable_all()
        .build()
        .into_diagnostic()?;

    runtime.block_on(async move {
        let backend = RemoteBackend::new(
            RemoteBackendConfig::from(&config.backend),
            tokio::runtime::Handle::current(),
        )
        .into_diagnostic()?;
        let backend = Arc::new(backend);

        let form_registry: Option<Arc<dyn FormRegistry>> = match &config.form_registry_dir {
            Some(dir) => Some(Arc::new(
                DirectoryFormRegistry::load(dir)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("Failed to load form registry from {}", dir.display()))?,
            )),
            None => None,
        };

        let validation = Arc::new(ValidationFacade::new(
            backend.clone(),
            config.trust_list_wait(),
        ));
        let collaborators = Collaborators {
            signature_services: backend.clone(),
            validation: Arc::clone(&validation),
            xml_engine: backend,
            form_registry,
        };
        let gateway = Arc::new(SigningGateway::new(
            config.resolution_policy().into_diagnostic()?,
            collaborators,
        ));

        log::info!("Signature backend: {}", config.backend.base_url);
        if config.timestamp_servers.is_empty() {
            log::warn!("No timestamp servers configured; T-level signatures are unavailable");
        }
        let refresh = spawn_trust_list_refresh(validation, config.trust_list_refresh());

        let server_config = GatewayServerConfig::from_configuration(&config).into_diagnostic()?;
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {e}");
            }
        };
        let result = serve(&server_config, gateway, shutdown).await;
        refresh.abort();
        result.into_diagnostic()
    })
}

fn handle_config_command(config_manager: &ConfigManager, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => match config_manager.load() {
            Ok(config) => {
                println!("Configuration ({})", config_manager.config_path().display());
                println!("  Bind address: {}", config.bind_address);
                println!("  Backend: {}", config.backend.base_url);
                println!("  Timestamp servers: {}", config.timestamp_servers.len());
                for server in &config.timestamp_servers {
                    println!("    {server}");
                }
                println!("  Plain XML enabled: {}", config.plain_xml_enabled);
                println!("  Worker threads: {}", config.worker_threads);
                println!(
                    "  Trust list refresh: every {} min",
                    config.trust_list_refresh_minutes
                );
                println!(
                    "  Caller authentication: {}",
                    if config.auth_token.is_some() {
                        "bearer token"
                    } else {
                        "none"
                    }
                );
                if let Some(dir) = &config.form_registry_dir {
                    println!("  Form registry: {}", dir.display());
                }
            }
            Err(_) => {
                println!("No configuration file found. Use 'config init' to create one.");
            }
        },
        ConfigCommands::Init => {
            config_manager.load_or_create_default().into_diagnostic()?;
            println!(
                "Configuration initialized at {}",
                config_manager.config_path().display()
            );
        }
        ConfigCommands::Set { key, value } => {
            config_manager.update_value(&key, &value).into_diagnostic()?;
            println!("Set {key} = {value}");
        }
    }
    Ok(())
}
