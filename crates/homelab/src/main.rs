mod commands;
mod output;

use clap::{Parser, Subcommand};
use output::{OutputFormat, Reporter};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lab")]
#[command(about = "Provision homelab VMs from a declarative document", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Format of user-facing messages
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output_format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to a Proxmox VE cluster
    #[command(subcommand)]
    Proxmox(ProxmoxCommands),
    /// Fetch and remaster installation media
    #[command(subcommand)]
    Iso(IsoCommands),
    /// Provision every VM declared in a config document
    Bootstrap {
        /// Config document (discovered when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Keep provisioning the remaining VMs after a failure
        #[arg(long)]
        keep_going: bool,
        /// Ignore the cached session and log in again
        #[arg(long)]
        force_login: bool,
        /// Run media work through an external program speaking the result protocol
        #[arg(long)]
        helper: Option<PathBuf>,
    },
    /// Check a config document without touching anything
    Validate {
        /// Config document (discovered when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ProxmoxCommands {
    /// Log in and cache the session
    Login {
        /// API server, e.g. https://pve.home:8006
        #[arg(long, env = "PROXMOX_API_SERVER")]
        api_server: String,
        #[arg(long, default_value = "root")]
        username: String,
        #[arg(long, env = "PROXMOX_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "pam")]
        realm: String,
        /// Log in even when a session is cached
        #[arg(long)]
        force: bool,
    },
    /// Upload a file to a node storage
    Upload {
        #[arg(long, default_value = homelab_proxmox::vm::DEFAULT_NODE)]
        node: String,
        #[arg(long)]
        file: PathBuf,
        /// Target storage (first storage accepting the format when omitted)
        #[arg(long)]
        storage: Option<String>,
        #[arg(long, default_value = homelab_proxmox::ISO_FORMAT)]
        format: String,
    },
    /// Manage virtual machines
    #[command(subcommand)]
    Vm(VmCommands),
}

#[derive(Subcommand)]
pub enum VmCommands {
    /// Create a VM from an archetype (`lab proxmox vm create basic -- --help`)
    Create {
        archetype: String,
        /// Archetype flags
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List available archetypes
    Archetypes,
}

#[derive(Subcommand)]
pub enum IsoCommands {
    /// Download a base image
    Get {
        #[arg(long, help = flavor_help())]
        flavor: String,
        /// Directory to download into (work dir when omitted)
        #[arg(long)]
        target_dir: Option<PathBuf>,
        /// Reuse a previously downloaded file
        #[arg(long)]
        reuse: bool,
    },
    /// Build an unattended-install image
    Auto {
        #[arg(long, help = flavor_help())]
        flavor: String,
        #[arg(long)]
        input_iso: PathBuf,
        /// Output image (`<input>-unattended.iso` in the workspace when omitted)
        #[arg(long)]
        output_iso: Option<PathBuf>,
        /// Scratch directory (work dir when omitted)
        #[arg(long)]
        workspace: Option<PathBuf>,
        /// Make the image bootable from a USB stick
        #[arg(long)]
        usb_boot: bool,
        #[arg(long)]
        reuse: bool,
        #[arg(long, default_value = "America/Toronto")]
        timezone: String,
        #[arg(long)]
        username: String,
        #[arg(long, hide_env_values = true, env = "LAB_GUEST_PASSWORD")]
        password: String,
        #[arg(long)]
        hostname: String,
        #[arg(long, default_value = "home.local")]
        domain: String,
        #[arg(long)]
        ip_address: String,
        #[arg(long, default_value = "255.255.255.0")]
        net_mask: String,
        #[arg(long)]
        gateway: String,
        /// Comma separated list
        #[arg(long, default_value = "8.8.8.8")]
        name_servers: String,
    },
}

fn flavor_help() -> String {
    format!("Image flavor: {}", homelab_iso::flavor_ids().join(", "))
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout is reserved for user output and result records
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(cli: Cli, reporter: &Reporter) -> anyhow::Result<()> {
    match cli.command {
        Commands::Proxmox(cmd) => commands::proxmox::handle(cmd, reporter).await,
        Commands::Iso(cmd) => commands::iso::handle(cmd, cli.debug, reporter).await,
        Commands::Bootstrap {
            config,
            keep_going,
            force_login,
            helper,
        } => {
            let options = commands::bootstrap::Options {
                config,
                keep_going,
                force_login,
                helper,
                debug: cli.debug,
            };
            commands::bootstrap::handle(options, reporter).await
        }
        Commands::Validate { config } => commands::validate::handle(config, reporter).await,
        Commands::Version => {
            reporter.info(
                "version",
                format!("homelab {}", env!("CARGO_PKG_VERSION")),
            )?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let reporter = Reporter::new(cli.output_format);
    if let Err(e) = run(cli, &reporter).await {
        let kind = output::error_kind(&e);
        reporter.failure(kind, &e);
        std::process::exit(kind.exit_code());
    }
}
