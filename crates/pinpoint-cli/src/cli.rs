//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};

use pinpoint_core::{DeviceOrdering, SignalKind};

/// Output format for commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Device list ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OrderArg {
    /// Sort by name ascending.
    Name,
    /// Strongest signal first.
    #[default]
    Signal,
    /// Most recently seen first.
    LastSeen,
}

impl From<OrderArg> for DeviceOrdering {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Name => DeviceOrdering::Name,
            OrderArg::Signal => DeviceOrdering::SignalStrength,
            OrderArg::LastSeen => DeviceOrdering::LastSeen,
        }
    }
}

/// Attention signal kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    #[default]
    Sound,
    Vibrate,
}

impl From<KindArg> for SignalKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Sound => SignalKind::Sound,
            KindArg::Vibrate => SignalKind::Vibrate,
        }
    }
}

#[derive(Parser)]
#[command(name = "pinpoint")]
#[command(author, version, about = "Find nearby Bluetooth devices", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use the synthetic discovery source instead of the real radio
    #[arg(long, global = true)]
    pub synthetic: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for nearby devices and print what was found
    Scan {
        /// How long to scan, in seconds
        #[arg(short, long, default_value = "15")]
        timeout: u64,

        /// Ordering of the device list
        #[arg(short, long, value_enum, default_value = "signal")]
        order: OrderArg,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Watch the live discovery/connection event stream
    Watch {
        /// Stop after this many seconds (default: until interrupted)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Connect to a device and make it ring or vibrate
    Ring {
        /// Device identity or name fragment
        device: String,

        /// Signal kind
        #[arg(short, long, value_enum, default_value = "sound")]
        kind: KindArg,

        /// How long to search for the device, in seconds
        #[arg(short, long, default_value = "20")]
        timeout: u64,
    },

    /// Toggle the saved (favorite) flag on a device
    Save {
        /// Device identity or name fragment
        device: String,

        /// How long to search for the device, in seconds
        #[arg(short, long, default_value = "20")]
        timeout: u64,
    },

    /// Remove a device from the registry and the saved list
    Forget {
        /// Device identity or name fragment
        device: String,
    },

    /// List saved (favorited) devices
    Devices {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
