// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Cabletrace CLI - follow cables and patch panels end to end

use anyhow::Result;
use cabletrace::commands::{self, cable::CableArgs, port::PortArgs, Output};
use cabletrace::config;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cabletrace")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "CABLETRACE_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Data directory override
    #[arg(long, env = "CABLETRACE_DATA_DIR", global = true)]
    data_dir: Option<std::path::PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register, remove and list terminations
    Port {
        /// Action: add, rm, positions, list
        action: String,

        /// Termination reference (kind:id, e.g. interface:12)
        reference: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Owning device or circuit
        #[arg(long)]
        parent: Option<String>,

        /// Number of positions (rear ports)
        #[arg(long)]
        positions: Option<u16>,

        /// Rear port id this front port maps to
        #[arg(long)]
        rear: Option<u64>,

        /// Rear port position this front port maps to
        #[arg(long)]
        position: Option<u16>,

        /// Register a virtual interface (cannot be cabled)
        #[arg(long = "virtual")]
        virtual_interface: bool,

        /// Provider network a circuit termination attaches to (cannot be cabled)
        #[arg(long)]
        provider_network: Option<String>,
    },

    /// Create, rewire and remove cables
    Cable {
        /// Action: add, status, update, swap, rm, show, list
        action: String,

        /// Cable id
        id: Option<u64>,

        /// A-side terminations (comma-separated kind:id)
        #[arg(short = 'a', long = "a-side", value_delimiter = ',')]
        a_side: Vec<String>,

        /// B-side terminations (comma-separated kind:id)
        #[arg(short = 'b', long = "b-side", value_delimiter = ',')]
        b_side: Vec<String>,

        /// Status: connected, planned, decommissioning
        #[arg(long)]
        status: Option<String>,

        /// Cable type (e.g. cat6, smf)
        #[arg(long = "type")]
        cable_type: Option<String>,

        /// Label
        #[arg(long)]
        label: Option<String>,

        /// Color as six hex digits
        #[arg(long)]
        color: Option<String>,

        /// Length
        #[arg(long)]
        length: Option<f64>,

        /// Length unit: km, m, cm, mi, ft, in
        #[arg(long)]
        unit: Option<String>,

        /// Drop the recorded length and unit (pass "" to --type, --label or --color to clear those)
        #[arg(long, conflicts_with_all = ["length", "unit"])]
        clear_length: bool,
    },

    /// Trace the path from a termination
    Trace {
        /// Termination reference (kind:id)
        reference: String,
    },

    /// Show connection status of terminations
    Status {
        /// Termination references (kind:id)
        #[arg(required = true)]
        references: Vec<String>,
    },

    /// Show the connected component around a termination
    Component {
        /// Termination reference (kind:id)
        reference: String,
    },

    /// Export the topology
    Export {
        /// Output format (dot, json)
        #[arg(short, long, default_value = "dot")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,

        /// Only export the component around this termination (dot only)
        #[arg(long)]
        component: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Single key to print
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        cfg.data_dir = dir;
    }
    if cli.no_color {
        cfg.color = false;
    }

    // Initialize logging; RUST_LOG wins over flags and config
    let level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => cfg.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let out = Output {
        json: cli.json,
        color: cfg.color,
    };

    match cli.command {
        Commands::Port {
            action,
            reference,
            name,
            parent,
            positions,
            rear,
            position,
            virtual_interface,
            provider_network,
        } => commands::port::run(
            &cfg,
            out,
            &action,
            reference,
            PortArgs {
                name,
                parent,
                positions,
                rear,
                position,
                virtual_interface,
                provider_network,
            },
        ),
        Commands::Cable {
            action,
            id,
            a_side,
            b_side,
            status,
            cable_type,
            label,
            color,
            length,
            unit,
            clear_length,
        } => commands::cable::run(
            &cfg,
            out,
            &action,
            id,
            CableArgs {
                a_side,
                b_side,
                status,
                cable_type,
                label,
                color,
                length,
                unit,
                clear_length,
            },
        ),
        Commands::Trace { reference } => commands::trace::run(&cfg, out, &reference),
        Commands::Status { references } => commands::status::run(&cfg, out, &references),
        Commands::Component { reference } => commands::component::run(&cfg, out, &reference),
        Commands::Export {
            format,
            output,
            component,
        } => commands::export::run(&cfg, &format, output, component),
        Commands::Config { key } => commands::config::run(&cfg, key.as_deref()),
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }
}
