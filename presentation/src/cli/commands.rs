//! CLI command definitions

use argos_domain::ScarceDevice;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for argos
#[derive(Parser, Debug)]
#[command(name = "argos")]
#[command(author, version, about = "Hardware-aware tool runtime for SDR and wireless tooling")]
#[command(long_about = r#"
argos discovers radio hardware on this host, arbitrates exclusive use of the
scarce devices (HackRF, Alfa WiFi adapter, Bluetooth controller) and runs
tools over process, HTTP, socket, JSON-RPC or in-process backends.

Configuration files are loaded from (in priority order):
1. ARGOS_* environment variables (ARGOS_HARDWARE__KISMET_URL=...)
2. --config <path>                Explicit config file
3. ./argos.toml                   Project-level config
4. ~/.config/argos/config.toml    Global config

Example:
  argos scan
  argos acquire hackrf spectrum-sweep
  argos exec geo.distance --params '{"lat1": 0, "lon1": 0, "lat2": 0, "lon2": 1}'
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the host for radio hardware
    Scan {
        /// Print the scan report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show who owns each scarce device
    Status,

    /// Claim a scarce device for an owner
    Acquire {
        #[arg(value_parser = parse_device)]
        device: ScarceDevice,
        owner: String,
    },

    /// Give a scarce device back
    Release {
        #[arg(value_parser = parse_device)]
        device: ScarceDevice,
        owner: String,
    },

    /// Reclaim a device by killing whatever holds it
    ForceRelease {
        #[arg(value_parser = parse_device)]
        device: ScarceDevice,
    },

    /// List registered tools
    Tools {
        #[arg(long, value_name = "NS")]
        namespace: Option<String>,

        /// Free-text filter over name, description and tags
        #[arg(long, value_name = "TEXT")]
        search: Option<String>,
    },

    /// Execute a tool and print the result
    Exec {
        tool: String,

        /// Parameters as a JSON object
        #[arg(long, value_name = "JSON")]
        params: Option<String>,

        /// Workflow the call belongs to
        #[arg(long, value_name = "W")]
        workflow: Option<String>,
    },

    /// Print the JSON schemas of all tools
    Schemas,

    /// Show configuration file locations
    Config,
}

fn parse_device(s: &str) -> Result<ScarceDevice, String> {
    s.parse().map_err(|e: argos_domain::DomainError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_acquire() {
        let cli = Cli::parse_from(["argos", "-vv", "acquire", "hackrf", "sweep"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Acquire { device, owner } => {
                assert_eq!(device, ScarceDevice::Hackrf);
                assert_eq!(owner, "sweep");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_device_is_rejected() {
        assert!(Cli::try_parse_from(["argos", "force-release", "rtlsdr"]).is_err());
    }

    #[test]
    fn test_parse_exec_with_params() {
        let cli = Cli::parse_from([
            "argos",
            "exec",
            "geo.distance",
            "--params",
            r#"{"lat1": 0}"#,
            "--workflow",
            "geospatial_analysis",
        ]);
        match cli.command {
            Commands::Exec { tool, params, workflow } => {
                assert_eq!(tool, "geo.distance");
                assert_eq!(params.as_deref(), Some(r#"{"lat1": 0}"#));
                assert_eq!(workflow.as_deref(), Some("geospatial_analysis"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
