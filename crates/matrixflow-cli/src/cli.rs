//! Command-line client for operating a matrixFlow backend.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use matrixflow_core::Presence;
use matrixflow_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliDependencies, CliResult, parse_url};
use crate::commands::activity::handle_activity;
use crate::commands::auth::{handle_login, handle_logout};
use crate::commands::config::{handle_config_get, handle_config_set};
use crate::commands::devices::{handle_device_assign, handle_device_list, handle_device_show};
use crate::commands::error_logs::handle_error_logs;
use crate::commands::remote::{handle_command_list, handle_command_send};
use crate::commands::reports::handle_report;
use crate::commands::watch::handle_watch;
use crate::session::{SessionStore, resolve_token};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_URL: &str = "http://127.0.0.1:4000";
const DEFAULT_WATCH_INTERVAL_SECS: u64 = 15;
const DEFAULT_TOP_ENTRIES: usize = 5;

/// Parses CLI arguments, executes the requested command, and handles
/// user-facing telemetry emission. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&logging_config(&cli)) {
        eprintln!("warning: {err}");
    }

    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    let deps = match CliDependencies::from_env(&cli, &trace_id) {
        Ok(deps) => deps,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    let telemetry = deps.telemetry.clone();

    debug!(command = command_name, trace_id = %trace_id, "dispatching command");
    let result = dispatch(cli, &deps).await;

    let (exit_code, message, outcome) = match result {
        Ok(()) => (0, None, "success"),
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            eprintln!("error: {message}");
            (exit_code, Some(message), "error")
        }
    };

    if let Some(emitter) = &telemetry {
        emitter
            .emit(
                &trace_id,
                command_name,
                outcome,
                exit_code,
                message.as_deref(),
            )
            .await;
    }

    exit_code
}

async fn dispatch(cli: Cli, deps: &CliDependencies) -> CliResult<()> {
    let session = SessionStore::resolve(cli.session_file);
    let token = resolve_token(cli.token, session.as_ref(), cli.api_url.as_str());

    let ctx = AppContext {
        client: deps.client.clone(),
        base_url: cli.api_url,
        token,
        session,
    };
    let output = cli.output;

    match cli.command {
        Command::Login(args) => handle_login(&ctx, args).await,
        Command::Logout => handle_logout(&ctx),
        Command::Devices(devices) => match devices {
            DeviceCommand::Ls(args) => handle_device_list(&ctx, args, output).await,
            DeviceCommand::Show(args) => handle_device_show(&ctx, args, output).await,
            DeviceCommand::Assign(args) => handle_device_assign(&ctx, args, output).await,
        },
        Command::Activity(args) => handle_activity(&ctx, args, output).await,
        Command::Remote(remote) => match remote {
            RemoteCommand::Send(args) => handle_command_send(&ctx, args, output).await,
            RemoteCommand::Ls(args) => handle_command_list(&ctx, args, output).await,
        },
        Command::Report(args) => handle_report(&ctx, args, output).await,
        Command::Errors(args) => handle_error_logs(&ctx, args, output).await,
        Command::Config(config) => match config {
            ConfigCommand::Get => handle_config_get(&ctx, output).await,
            ConfigCommand::Set(args) => handle_config_set(&ctx, args, output).await,
        },
        Command::Watch(args) => handle_watch(&ctx, args, output).await,
    }
}

#[derive(Parser)]
#[command(
    name = "matrixflow",
    version,
    about = "Administrative CLI for the matrixFlow device monitoring backend"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "MATRIXFLOW_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(long, global = true, env = "MATRIXFLOW_TOKEN", hide_env_values = true)]
    pub(crate) token: Option<String>,
    #[arg(
        long,
        global = true,
        env = "MATRIXFLOW_SESSION_FILE",
        help = "Where `login` stores the session token"
    )]
    pub(crate) session_file: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "MATRIXFLOW_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "MATRIXFLOW_LOG",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log filter directive (RUST_LOG takes precedence)"
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        value_parser = parse_log_format,
        help = "pretty or json (default: pretty in debug builds, json in release)"
    )]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Exchange operator credentials for a session token.
    Login(LoginArgs),
    /// Forget the stored session token.
    Logout,
    /// List, inspect, and annotate devices.
    #[command(subcommand)]
    Devices(DeviceCommand),
    /// Show activity logs for a device.
    Activity(ActivityArgs),
    /// Queue remote commands and review their history.
    #[command(name = "command")]
    #[command(subcommand)]
    Remote(RemoteCommand),
    /// Fleet-wide activity report.
    Report(ReportArgs),
    /// Browse error logs.
    Errors(ErrorLogArgs),
    /// Read or update heartbeat thresholds.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Poll device presence and print transitions.
    Watch(WatchArgs),
}

#[derive(Subcommand)]
pub(crate) enum DeviceCommand {
    Ls(DeviceListArgs),
    Show(DeviceShowArgs),
    Assign(DeviceAssignArgs),
}

#[derive(Subcommand)]
pub(crate) enum RemoteCommand {
    Send(CommandSendArgs),
    Ls(CommandListArgs),
}

#[derive(Subcommand)]
pub(crate) enum ConfigCommand {
    Get,
    Set(ConfigSetArgs),
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    #[arg(long, short = 'u')]
    pub(crate) username: String,
    #[arg(long, help = "Prompted for when omitted on a terminal")]
    pub(crate) password: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum PresenceFilter {
    Online,
    Offline,
}

impl PresenceFilter {
    pub(crate) const fn matches(self, presence: Presence) -> bool {
        matches!(
            (self, presence),
            (Self::Online, Presence::Online) | (Self::Offline, Presence::Offline)
        )
    }
}

#[derive(Args, Default)]
pub(crate) struct DeviceListArgs {
    #[arg(long)]
    pub(crate) page: Option<u32>,
    #[arg(long)]
    pub(crate) limit: Option<u32>,
    #[arg(long, help = "Match against device name or hostname")]
    pub(crate) search: Option<String>,
    #[arg(long, value_enum, help = "Keep only devices whose client has this status")]
    pub(crate) status: Option<PresenceFilter>,
}

#[derive(Args)]
pub(crate) struct DeviceShowArgs {
    #[arg(help = "Device identifier")]
    pub(crate) id: String,
}

#[derive(Args, Default)]
pub(crate) struct DeviceAssignArgs {
    #[arg(help = "Device identifier")]
    pub(crate) id: String,
    #[arg(long = "user", help = "Person the device is assigned to")]
    pub(crate) assigned_user: Option<String>,
    #[arg(long)]
    pub(crate) department: Option<String>,
    #[arg(long)]
    pub(crate) location: Option<String>,
    #[arg(long)]
    pub(crate) notes: Option<String>,
}

#[derive(Args, Default)]
pub(crate) struct ActivityArgs {
    #[arg(help = "Device identifier")]
    pub(crate) device: String,
    #[arg(long, help = "First day to include (YYYY-MM-DD)")]
    pub(crate) from: Option<String>,
    #[arg(long, help = "Last day to include (YYYY-MM-DD)")]
    pub(crate) to: Option<String>,
    #[arg(long)]
    pub(crate) page: Option<u32>,
    #[arg(long)]
    pub(crate) limit: Option<u32>,
    #[arg(long, default_value_t = DEFAULT_TOP_ENTRIES, help = "Apps and titles to list")]
    pub(crate) top: usize,
}

#[derive(Args, Default)]
pub(crate) struct CommandSendArgs {
    #[arg(help = "Device identifier")]
    pub(crate) device: String,
    #[arg(value_name = "COMMAND", help = "Command name understood by the device client")]
    pub(crate) name: String,
    #[arg(long, help = "JSON arguments passed with the command")]
    pub(crate) payload: Option<String>,
}

#[derive(Args, Default)]
pub(crate) struct CommandListArgs {
    #[arg(help = "Device identifier")]
    pub(crate) device: String,
    #[arg(long)]
    pub(crate) page: Option<u32>,
    #[arg(long)]
    pub(crate) limit: Option<u32>,
}

#[derive(Args, Default)]
pub(crate) struct ReportArgs {
    #[arg(long, help = "First day to include (YYYY-MM-DD)")]
    pub(crate) from: Option<String>,
    #[arg(long, help = "Last day to include (YYYY-MM-DD)")]
    pub(crate) to: Option<String>,
    #[arg(long, default_value_t = DEFAULT_TOP_ENTRIES, help = "Apps and titles to list")]
    pub(crate) top: usize,
}

#[derive(Args, Default)]
pub(crate) struct ErrorLogArgs {
    #[arg(long, help = "Only errors reported by this device")]
    pub(crate) device: Option<String>,
    #[arg(long, help = "Only errors with this level")]
    pub(crate) level: Option<String>,
    #[arg(long, help = "First day to include (YYYY-MM-DD)")]
    pub(crate) from: Option<String>,
    #[arg(long, help = "Last day to include (YYYY-MM-DD)")]
    pub(crate) to: Option<String>,
    #[arg(long)]
    pub(crate) page: Option<u32>,
    #[arg(long)]
    pub(crate) limit: Option<u32>,
}

#[derive(Args, Default)]
pub(crate) struct ConfigSetArgs {
    #[arg(long, help = "Expected seconds between client heartbeats")]
    pub(crate) client_delay: Option<u64>,
    #[arg(long, help = "Expected seconds between service heartbeats")]
    pub(crate) service_delay: Option<u64>,
}

#[derive(Args)]
pub(crate) struct WatchArgs {
    #[arg(
        long,
        default_value_t = DEFAULT_WATCH_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between polls"
    )]
    pub(crate) interval: u64,
    #[arg(long, help = "Match against device name or hostname")]
    pub(crate) search: Option<String>,
    #[arg(long, help = "Stop after this many polls")]
    pub(crate) count: Option<u64>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn logging_config(cli: &Cli) -> LoggingConfig<'_> {
    LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
    }
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse::<LogFormat>().map_err(|err| err.to_string())
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login(_) => "login",
        Command::Logout => "logout",
        Command::Devices(DeviceCommand::Ls(_)) => "devices_ls",
        Command::Devices(DeviceCommand::Show(_)) => "devices_show",
        Command::Devices(DeviceCommand::Assign(_)) => "devices_assign",
        Command::Activity(_) => "activity",
        Command::Remote(RemoteCommand::Send(_)) => "command_send",
        Command::Remote(RemoteCommand::Ls(_)) => "command_ls",
        Command::Report(_) => "report",
        Command::Errors(_) => "errors",
        Command::Config(ConfigCommand::Get) => "config_get",
        Command::Config(ConfigCommand::Set(_)) => "config_set",
        Command::Watch(_) => "watch",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["matrixflow"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn devices_ls_parses_filters() {
        let cli = parse(&[
            "--api-url",
            "http://backend:4000",
            "--output",
            "json",
            "devices",
            "ls",
            "--status",
            "offline",
            "--limit",
            "50",
        ]);
        assert_eq!(cli.api_url.as_str(), "http://backend:4000/");
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Command::Devices(DeviceCommand::Ls(args)) => {
                assert_eq!(args.status, Some(PresenceFilter::Offline));
                assert_eq!(args.limit, Some(50));
                assert_eq!(args.page, None);
            }
            _ => panic!("expected devices ls"),
        }
    }

    #[test]
    fn command_send_uses_command_subcommand_name() {
        let cli = parse(&["command", "send", "dev-1", "lock", "--payload", "{}"]);
        assert_eq!(command_label(&cli.command), "command_send");
        match cli.command {
            Command::Remote(RemoteCommand::Send(args)) => {
                assert_eq!(args.device, "dev-1");
                assert_eq!(args.name, "lock");
                assert_eq!(args.payload.as_deref(), Some("{}"));
            }
            _ => panic!("expected command send"),
        }
    }

    #[test]
    fn watch_rejects_zero_interval() {
        assert!(Cli::try_parse_from(["matrixflow", "watch", "--interval", "0"]).is_err());
        let cli = parse(&["watch", "--count", "3"]);
        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.interval, DEFAULT_WATCH_INTERVAL_SECS);
                assert_eq!(args.count, Some(3));
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn log_format_flag_is_validated() {
        let cli = parse(&["--log-format", "json", "logout"]);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(Cli::try_parse_from(["matrixflow", "--log-format", "xml", "logout"]).is_err());
    }

    #[test]
    fn logging_format_falls_back_to_build_default() {
        let cli = parse(&["logout"]);
        assert_eq!(cli.log_format, None);
        let config = logging_config(&cli);
        assert_eq!(config.format, LogFormat::infer());
        assert_eq!(config.level, DEFAULT_LOG_LEVEL);

        let cli = parse(&["--log-format", "pretty", "--log-level", "debug", "logout"]);
        let config = logging_config(&cli);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn presence_filter_matches_variants() {
        assert!(PresenceFilter::Online.matches(Presence::Online));
        assert!(!PresenceFilter::Online.matches(Presence::Offline));
        assert!(PresenceFilter::Offline.matches(Presence::Offline));
    }

    #[test]
    fn command_label_matches_variants() {
        assert_eq!(command_label(&Command::Logout), "logout");
        assert_eq!(
            command_label(&Command::Config(ConfigCommand::Set(ConfigSetArgs::default()))),
            "config_set"
        );
        assert_eq!(
            command_label(&Command::Devices(DeviceCommand::Show(DeviceShowArgs {
                id: "dev-1".into()
            }))),
            "devices_show"
        );
    }
}
