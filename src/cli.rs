//! CLI - Command Line Interface for rokuremote
//!
//! Every remote action is scriptable. All output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Find devices on the network
//! rokuremote discover --timeout 5
//!
//! # Press keys and type into a search box
//! rokuremote -d "Living Room" key home down down select
//! rokuremote -d http://10.0.0.5:8060/ type "star trek" --enter
//!
//! # Query state
//! rokuremote info power-mode
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::api::KeyAction;
use crate::logging::LogLevel;
use crate::models::{InputSource, Key, UnknownKey};

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Device not found
    DeviceNotFound = 4,
    /// Device rejected a command
    CommandFailed = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// rokuremote - remote control for Roku devices
///
/// Run without arguments to launch the interactive remote.
/// Use subcommands for scriptable automation.
#[derive(Parser, Debug)]
#[command(
    name = "rokuremote",
    version,
    about = "Remote control for Roku devices on the local network",
    long_about = "Discovers Roku devices with SSDP and drives them through \
                  their control API.\n\n\
                  Run without arguments to launch the interactive remote.\n\
                  Use subcommands for automation and scripting.",
    after_help = "EXAMPLES:\n\
                  rokuremote                              Launch interactive remote\n\
                  rokuremote discover                     List devices\n\
                  rokuremote -d \"Living Room\" key home    Press Home\n\
                  rokuremote info power-mode --json       Query power state"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Target device (friendly name or base URL)
    #[arg(long, short = 'd', global = true)]
    pub device: Option<String>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Subcommand to run (omit for interactive mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Check if running in CLI mode (has subcommand)
    pub fn is_cli_mode(&self) -> bool {
        self.command.is_some()
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover devices on the local network
    #[command(visible_alias = "scan")]
    Discover(DiscoverCmd),

    /// Send remote-control keys
    #[command(visible_alias = "k")]
    Key(KeyCmd),

    /// Type text into the device's on-screen keyboard
    #[command(visible_alias = "t")]
    Type(TypeCmd),

    /// Launch a channel (app) by id
    Launch(LaunchCmd),

    /// Show device info
    #[command(visible_alias = "i")]
    Info(InfoCmd),

    /// Switch power on, off, or toggle it
    Power(PowerCmd),

    /// Switch TV input
    Input(InputCmd),
}

// =============================================================================
// Discover Command
// =============================================================================

/// Run one discovery sweep and list the devices that answered
#[derive(Args, Debug)]
pub struct DiscoverCmd {
    /// Listen window in seconds (default from config)
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,

    /// SSDP search target (default roku:ecp)
    #[arg(long, visible_alias = "scope")]
    pub target: Option<String>,

    /// Print raw reply headers instead of resolved devices
    #[arg(long)]
    pub raw: bool,
}

// =============================================================================
// Key Command
// =============================================================================

/// Send one or more keys, in order
#[derive(Args, Debug)]
pub struct KeyCmd {
    /// Key names (e.g. home, select, volume-up, VolumeMute)
    #[arg(required = true, value_parser = parse_key)]
    pub keys: Vec<Key>,

    /// Press, hold down, or release
    #[arg(long, short = 'a', value_enum, default_value = "press")]
    pub action: KeyActionArg,
}

fn parse_key(s: &str) -> Result<Key, UnknownKey> {
    s.parse()
}

/// Key endpoint selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyActionArg {
    /// keypress (default)
    #[default]
    Press,
    /// keydown
    Down,
    /// keyup
    Up,
}

impl From<KeyActionArg> for KeyAction {
    fn from(arg: KeyActionArg) -> Self {
        match arg {
            KeyActionArg::Press => KeyAction::Press,
            KeyActionArg::Down => KeyAction::Down,
            KeyActionArg::Up => KeyAction::Up,
        }
    }
}

// =============================================================================
// Type Command
// =============================================================================

/// Type a string, one literal key press per character
#[derive(Args, Debug)]
pub struct TypeCmd {
    /// Text to type
    #[arg(required = true)]
    pub text: String,

    /// Press Select after the text
    #[arg(long, short = 'e')]
    pub enter: bool,
}

// =============================================================================
// Launch Command
// =============================================================================

/// Launch a channel
#[derive(Args, Debug)]
pub struct LaunchCmd {
    /// Channel id (e.g. 12 for Netflix)
    #[arg(required = true)]
    pub channel_id: String,
}

// =============================================================================
// Info Command
// =============================================================================

/// Show the device-info document, or a single field
#[derive(Args, Debug)]
pub struct InfoCmd {
    /// Field name (e.g. power-mode, friendly-model-name)
    pub field: Option<String>,
}

// =============================================================================
// Power Command
// =============================================================================

/// Change power state
#[derive(Args, Debug)]
pub struct PowerCmd {
    /// Desired state
    #[arg(value_enum, default_value = "toggle")]
    pub state: PowerState,
}

/// Requested power state
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    On,
    Off,
    #[default]
    Toggle,
}

// =============================================================================
// Input Command
// =============================================================================

/// Switch TV input
#[derive(Args, Debug)]
pub struct InputCmd {
    /// Input source
    #[arg(required = true, value_enum)]
    pub source: InputArg,
}

/// Input source names on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputArg {
    #[value(name = "hdmi1", alias = "hdmi-1")]
    Hdmi1,
    #[value(name = "hdmi2", alias = "hdmi-2")]
    Hdmi2,
    #[value(name = "hdmi3", alias = "hdmi-3")]
    Hdmi3,
    #[value(name = "hdmi4", alias = "hdmi-4")]
    Hdmi4,
    Tuner,
    #[value(name = "av1", alias = "av-1")]
    Av1,
}

impl From<InputArg> for InputSource {
    fn from(arg: InputArg) -> Self {
        match arg {
            InputArg::Hdmi1 => InputSource::Hdmi1,
            InputArg::Hdmi2 => InputSource::Hdmi2,
            InputArg::Hdmi3 => InputSource::Hdmi3,
            InputArg::Hdmi4 => InputSource::Hdmi4,
            InputArg::Tuner => InputSource::Tuner,
            InputArg::Av1 => InputSource::Av1,
        }
    }
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Command acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandOk {
    pub status: String,
    pub device: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sent: Vec<String>,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            // For non-JSON, caller should handle formatting
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print a list: one Display line each in text mode, JSON otherwise
    pub fn print_lines<T: Serialize + std::fmt::Display>(&self, items: &[T]) -> anyhow::Result<()> {
        if self.json {
            return self.print(items);
        }
        for item in items {
            println!("{}", item);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args_is_interactive_mode() {
        let cli = Cli::parse_from::<_, &str>(["rokuremote"]);
        assert!(!cli.is_cli_mode());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "rokuremote",
            "--json",
            "--device",
            "Living Room",
            "--quiet",
            "--log-level",
            "debug",
            "info",
        ]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert_eq!(cli.device.as_deref(), Some("Living Room"));
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert!(matches!(cli.command, Some(Command::Info(InfoCmd { field: None }))));
    }

    #[test]
    fn test_discover_command() {
        let cli = Cli::parse_from(["rokuremote", "discover", "-t", "5", "--scope", "ssdp:all"]);
        if let Some(Command::Discover(cmd)) = cli.command {
            assert_eq!(cmd.timeout, Some(5));
            assert_eq!(cmd.target.as_deref(), Some("ssdp:all"));
            assert!(!cmd.raw);
        } else {
            panic!("Expected Discover command");
        }
    }

    #[test]
    fn test_key_command_parses_keys_in_order() {
        let cli = Cli::parse_from(["rokuremote", "key", "home", "volume-up", "Select"]);
        if let Some(Command::Key(cmd)) = cli.command {
            assert_eq!(cmd.keys, vec![Key::Home, Key::VolumeUp, Key::Select]);
            assert_eq!(cmd.action, KeyActionArg::Press);
        } else {
            panic!("Expected Key command");
        }
    }

    #[test]
    fn test_key_command_rejects_unknown_key() {
        assert!(Cli::try_parse_from(["rokuremote", "key", "teleport"]).is_err());
    }

    #[test]
    fn test_key_action() {
        let cli = Cli::parse_from(["rokuremote", "key", "--action", "down", "fwd"]);
        if let Some(Command::Key(cmd)) = cli.command {
            assert_eq!(KeyAction::from(cmd.action), KeyAction::Down);
        } else {
            panic!("Expected Key command");
        }
    }

    #[test]
    fn test_power_defaults_to_toggle() {
        let cli = Cli::parse_from(["rokuremote", "power"]);
        if let Some(Command::Power(cmd)) = cli.command {
            assert_eq!(cmd.state, PowerState::Toggle);
        } else {
            panic!("Expected Power command");
        }
    }

    #[test]
    fn test_input_aliases() {
        let cli = Cli::parse_from(["rokuremote", "input", "hdmi-2"]);
        if let Some(Command::Input(cmd)) = cli.command {
            assert_eq!(InputSource::from(cmd.source), InputSource::Hdmi2);
        } else {
            panic!("Expected Input command");
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::Error), 1);
        assert_eq!(i32::from(ExitCode::InvalidArgs), 2);
        assert_eq!(i32::from(ExitCode::NetworkError), 3);
        assert_eq!(i32::from(ExitCode::DeviceNotFound), 4);
        assert_eq!(i32::from(ExitCode::CommandFailed), 5);
    }
}
