//! Theme Probe server: entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use theme_probe_server::config::{ConfigOverrides, ServerConfig};
use theme_probe_server::transport::{AppState, HttpTransport};

#[derive(Parser)]
#[command(
    name = "theme-probe-server",
    about = "Check whether a storefront's published theme supports app blocks",
    version
)]
struct Cli {
    /// Shop domain, e.g. example.myshopify.com. Also reads SHOPIFY_SHOP.
    #[arg(long, global = true)]
    shop: Option<String>,

    /// Admin API access token. Also reads SHOPIFY_ACCESS_TOKEN.
    #[arg(long, global = true)]
    access_token: Option<String>,

    /// Admin API version. Also reads SHOPIFY_API_VERSION.
    #[arg(long, global = true)]
    api_version: Option<String>,

    /// Template to inspect (repeatable). Also reads PROBE_TEMPLATES.
    #[arg(long = "template", global = true)]
    templates: Vec<String>,

    /// Block type to report on (repeatable). Also reads PROBE_TARGET_BLOCKS.
    #[arg(long = "target", global = true)]
    targets: Vec<String>,

    /// Maximum asset requests in flight. Also reads PROBE_CONCURRENCY.
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Probe time budget in milliseconds. Also reads PROBE_TIMEOUT_MS.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Treat a missing preview product as "not found".
    #[arg(long, global = true)]
    preview_required: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the probe over HTTP (default).
    Serve {
        /// Listen address (host:port). Defaults to 127.0.0.1:$BACKEND_PORT.
        #[arg(long)]
        addr: Option<String>,
    },

    /// Run one probe and print the report as JSON.
    Probe,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   theme-probe-server completions bash > ~/.local/share/bash-completion/completions/theme-probe-server
    ///   theme-probe-server completions zsh > ~/.zfunc/_theme-probe-server
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

impl Cli {
    fn overrides(&self, addr: Option<String>) -> ConfigOverrides {
        ConfigOverrides {
            shop: self.shop.clone(),
            access_token: self.access_token.clone(),
            api_version: self.api_version.clone(),
            addr,
            templates: self.templates.clone(),
            targets: self.targets.clone(),
            concurrency: self.concurrency,
            timeout_ms: self.timeout_ms,
            preview_required: self.preview_required,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    theme_probe_server::logging::init(&cli.log_level, cli.log_json);

    match cli.command.as_ref().unwrap_or(&Commands::Serve { addr: None }) {
        Commands::Serve { addr } => {
            let config = ServerConfig::from_env(cli.overrides(addr.clone()))?;
            tracing::info!("Theme probe server for {}", config.shop.shop);
            tracing::info!(
                "Templates: {:?}, targets: {:?}",
                config.probe.template_names,
                config.probe.targets
            );

            let transport = HttpTransport::new(config);
            let shutdown = transport.shutdown_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Shutting down");
                    shutdown.cancel();
                }
            });
            transport.run().await?;
        }

        Commands::Probe => {
            let config = ServerConfig::from_env(cli.overrides(None))?;
            let preview_required = config.probe.preview_required;
            let state = AppState::new(config);

            match state.probe().await {
                Ok(run) => {
                    for degradation in &run.degradations {
                        eprintln!("degraded: {degradation}");
                    }
                    println!("{}", serde_json::to_string_pretty(&run.report)?);
                    if run.report.http_status(preview_required) != 200 {
                        std::process::exit(2);
                    }
                }
                Err(e) => {
                    eprintln!("Probe failed: {e}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                *shell,
                &mut cmd,
                "theme-probe-server",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
