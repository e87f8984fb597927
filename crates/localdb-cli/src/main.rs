//! LocalDB command-line tool.
//!
//! Thin front end over `localdb-core`: every subcommand maps onto one call of
//! the LocalDB instance API.

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use localdb_core::flags::{LOCALDB_SHUTDOWN_KILL_PROCESS, LOCALDB_SHUTDOWN_WITH_NOWAIT};
use localdb_core::{
    LocalDb, LocalDbApi, LocalDbError, LocatorConfig, OwnerSid, RegistryView, VersionSelection,
};
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Exit status when LocalDB could not be located, loaded or bound.
const EXIT_NOT_AVAILABLE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "localdb")]
#[command(about = "Manage SQL Server Express LocalDB instances")]
struct Args {
    /// Bind the highest installed version instead of the lowest
    #[arg(long)]
    highest: bool,

    /// Read the 32-bit registry view
    #[arg(long)]
    registry_32: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List instances owned by the current user
    Instances,
    /// List installed engine versions
    Versions,
    /// Show one instance
    Info { name: String },
    /// Show one engine version
    VersionInfo { version: String },
    /// Create an instance
    Create {
        name: String,
        /// Engine version, e.g. 13.0
        #[arg(long)]
        version: String,
    },
    /// Delete an instance
    Delete { name: String },
    /// Start an instance and print its connection string
    Start { name: String },
    /// Stop an instance
    Stop {
        name: String,
        /// Seconds to wait for shutdown
        #[arg(long, default_value = "30")]
        timeout: u32,
        /// Kill the engine process
        #[arg(long)]
        kill: bool,
        /// Shut down without waiting for checkpoints
        #[arg(long)]
        nowait: bool,
    },
    /// Share an instance under a public name
    Share {
        name: String,
        shared_name: String,
        /// Owner as a hex-encoded binary SID; defaults to the current user
        #[arg(long, value_parser = parse_owner_sid)]
        owner_sid: Option<OwnerSid>,
    },
    /// Stop sharing an instance
    Unshare { name: String },
    /// Turn API tracing on or off
    Trace {
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
    /// Describe a LocalDB result code (hex or decimal)
    Message { code: String },
}

fn locator_config(args: &Args) -> LocatorConfig {
    let mut config = LocatorConfig::default();
    if args.highest {
        config.selection = VersionSelection::Highest;
    }
    if args.registry_32 {
        config.view = RegistryView::Registry32;
    }
    config
}

fn parse_code(code: &str) -> Result<i32> {
    let parsed = match code.strip_prefix("0x").or_else(|| code.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).map(|v| v as i32),
        None => code.parse::<i32>(),
    };
    parsed.with_context(|| format!("invalid result code: {}", code))
}

fn parse_owner_sid(value: &str) -> Result<OwnerSid> {
    let bytes = hex::decode(value).context("owner SID must be hex")?;
    Ok(OwnerSid::from_bytes(&bytes)?)
}

fn log_filter(debug: bool) -> EnvFilter {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

/// Process status for a failed run: 2 if the binding could not be set up,
/// 1 otherwise.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<LocalDbError>() {
        Some(e) if e.is_construction_failure() => EXIT_NOT_AVAILABLE,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging
    FmtSubscriber::builder()
        .with_env_filter(log_filter(args.debug))
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = locator_config(args);
    debug!("Locator config: {:?}", config);
    let api = LocalDbApi::with_config(config).context("failed to bind the LocalDB instance API")?;
    let localdb = LocalDb::new(api);
    info!("Using LocalDB instance API {}", localdb.api().api_version());
    let out = output::Printer::new(args.json);

    match &args.command {
        Command::Instances => out.list(&localdb.instances()?)?,
        Command::Versions => out.list(&localdb.versions()?)?,
        Command::Info { name } => out.instance(&localdb.instance_info(name)?)?,
        Command::VersionInfo { version } => out.version(&localdb.version_info(version)?)?,
        Command::Create { name, version } => {
            localdb.create_instance(version, name)?;
            out.done(&format!("Created {}", name))?;
        }
        Command::Delete { name } => {
            localdb.delete_instance(name)?;
            out.done(&format!("Deleted {}", name))?;
        }
        Command::Start { name } => {
            let connection = localdb.start_instance(name)?;
            out.value("connection", &connection)?;
        }
        Command::Stop {
            name,
            timeout,
            kill,
            nowait,
        } => {
            let mut flags = 0;
            if *kill {
                flags |= LOCALDB_SHUTDOWN_KILL_PROCESS;
            }
            if *nowait {
                flags |= LOCALDB_SHUTDOWN_WITH_NOWAIT;
            }
            localdb.stop_instance(name, flags, *timeout)?;
            out.done(&format!("Stopped {}", name))?;
        }
        Command::Share {
            name,
            shared_name,
            owner_sid,
        } => {
            if let Some(sid) = owner_sid {
                debug!("Sharing as {}", sid.to_sid_string());
            }
            localdb.share_instance(owner_sid.as_ref(), name, shared_name)?;
            out.done(&format!("Shared {} as {}", name, shared_name))?;
        }
        Command::Unshare { name } => {
            localdb.unshare_instance(name)?;
            out.done(&format!("Unshared {}", name))?;
        }
        Command::Trace { state } => {
            if state == "on" {
                localdb.start_tracing()?;
            } else {
                localdb.stop_tracing()?;
            }
            out.done(&format!("Tracing {}", state))?;
        }
        Command::Message { code } => {
            let code = parse_code(code)?;
            out.value("message", &localdb.message(code))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code("0x89C50107").unwrap(), 0x89C5_0107_u32 as i32);
        assert_eq!(parse_code("-5").unwrap(), -5);
        assert!(parse_code("0xZZ").is_err());
    }

    #[test]
    fn test_locator_flags() {
        let args = Args::parse_from(["localdb", "--highest", "--registry-32", "versions"]);
        let config = locator_config(&args);
        assert_eq!(config.selection, VersionSelection::Highest);
        assert_eq!(config.view, RegistryView::Registry32);

        let args = Args::parse_from(["localdb", "instances"]);
        assert_eq!(locator_config(&args), LocatorConfig::default());
    }

    #[test]
    fn test_share_owner_sid() {
        let args = Args::parse_from([
            "localdb",
            "share",
            "MSSQLLocalDB",
            "TeamDB",
            "--owner-sid",
            "01020000000000052000000020020000",
        ]);
        match args.command {
            Command::Share {
                owner_sid: Some(sid),
                ..
            } => assert_eq!(sid.to_sid_string(), "S-1-5-32-544"),
            other => panic!("unexpected command: {other:?}"),
        }

        let args = Args::parse_from(["localdb", "share", "MSSQLLocalDB", "TeamDB"]);
        assert!(matches!(args.command, Command::Share { owner_sid: None, .. }));

        assert!(parse_owner_sid("zz").is_err());
        assert!(parse_owner_sid("0102").is_err());
    }

    #[test]
    fn test_exit_code_for_binding_failures() {
        let not_installed = anyhow::Error::new(LocalDbError::NotInstalled {
            reason: "no versions".into(),
        });
        assert_eq!(exit_code(&not_installed), EXIT_NOT_AVAILABLE);

        let missing_export = anyhow::Error::new(LocalDbError::EntryPointNotFound {
            name: "LocalDBStartTracing",
        });
        assert_eq!(exit_code(&missing_export), EXIT_NOT_AVAILABLE);

        let call_failed = anyhow::Error::new(LocalDbError::NativeCall {
            code: 0x89C5_0107_u32 as i32,
            message: "unknown instance".into(),
        });
        assert_eq!(exit_code(&call_failed), 1);

        let bind_failed = Err::<(), _>(LocalDbError::LoadFailed {
            path: None,
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
        .context("failed to bind the LocalDB instance API")
        .unwrap_err();
        assert_eq!(exit_code(&bind_failed), EXIT_NOT_AVAILABLE);

        let parse_failed = parse_code("0xZZ").unwrap_err();
        assert_eq!(exit_code(&parse_failed), 1);
    }

    #[test]
    fn test_log_filter_defaults() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert_eq!(log_filter(true).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(false).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_stop_arguments() {
        let args = Args::parse_from(["localdb", "stop", "MSSQLLocalDB", "--kill", "--timeout", "5"]);
        match args.command {
            Command::Stop {
                name,
                timeout,
                kill,
                nowait,
            } => {
                assert_eq!(name, "MSSQLLocalDB");
                assert_eq!(timeout, 5);
                assert!(kill);
                assert!(!nowait);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
