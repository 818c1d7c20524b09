//! rokuremote - remote control for Roku devices
//!
//! # Usage
//!
//! ```bash
//! # Launch the interactive remote
//! rokuremote
//!
//! # CLI mode (for automation)
//! rokuremote discover
//! rokuremote -d "Living Room" key home
//! rokuremote info power-mode --json
//! ```

use std::io::{stdout, Stdout};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, info};

use rokuremote::api::EcpClient;
use rokuremote::cli::{Cli, Command, ExitCode, Output};
use rokuremote::commands::{self, Context};
use rokuremote::config::Config;
use rokuremote::discovery::DiscoveryEngine;
use rokuremote::logging::{self, LogLevel, LogTarget};
use rokuremote::remote::{RegisterOutcome, Remote, RemoteSettings};
use rokuremote::ui::{view, Action, Controls};

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    let level = log_level(&cli, &config);

    if cli.is_cli_mode() {
        // CLI mode: log to stderr, execute command and exit
        if let Err(e) = logging::init(level, LogTarget::Stderr) {
            eprintln!("warning: {}", e);
        }
        let exit_code = run_cli(cli, config).await;
        std::process::exit(exit_code.into());
    } else {
        // TUI mode: the terminal is ours, so logs go to a file
        if let Some(path) = logging::default_log_file() {
            if let Err(e) = logging::init(level, LogTarget::File(path)) {
                eprintln!("warning: {}", e);
            }
        }
        run_tui(config).await
    }
}

fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// --log-level, then the config file, then the default
fn log_level(cli: &Cli, config: &Config) -> LogLevel {
    cli.log_level
        .or_else(|| config.log_level.as_deref().and_then(|l| l.parse().ok()))
        .unwrap_or_default()
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: Config) -> ExitCode {
    let output = Output::new(&cli);
    let ctx = Context::new(config, cli.device.clone());

    match cli.command {
        Some(Command::Discover(cmd)) => commands::discover_cmd(cmd, &ctx, &output).await,

        Some(Command::Key(cmd)) => commands::key_cmd(cmd, &ctx, &output).await,

        Some(Command::Type(cmd)) => commands::type_cmd(cmd, &ctx, &output).await,

        Some(Command::Launch(cmd)) => commands::launch_cmd(cmd, &ctx, &output).await,

        Some(Command::Info(cmd)) => commands::info_cmd(cmd, &ctx, &output).await,

        Some(Command::Power(cmd)) => commands::power_cmd(cmd, &ctx, &output).await,

        Some(Command::Input(cmd)) => commands::input_cmd(cmd, &ctx, &output).await,

        None => {
            // This shouldn't happen (handled by is_cli_mode check)
            ExitCode::Success
        }
    }
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Initialize the terminal for TUI mode
fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run interactive TUI
async fn run_tui(config: Config) -> Result<()> {
    let mut terminal = init_terminal()?;

    let mut remote = Remote::new(
        RemoteSettings::from(&config),
        DiscoveryEngine::new(),
        EcpClient::new(),
    );
    let mut controls = Controls::new().with_channels(config.channel_presets());

    let result = run_event_loop(
        &mut terminal,
        &mut remote,
        &mut controls,
        config.default_device.as_deref(),
    )
    .await;

    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;

    result
}

/// Main event loop - handles input, registrations and timers, renders UI
async fn run_event_loop(
    terminal: &mut Tui,
    remote: &mut Remote,
    controls: &mut Controls,
    default_device: Option<&str>,
) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(100);

    info!("starting interactive remote");
    remote.discover(false);

    while controls.running {
        terminal.draw(|frame| view::render(frame, remote, controls))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (ignore releases on Windows)
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = controls.handle_key(key) {
                        apply_action(action, remote, controls).await;
                    }
                }
            }
        }

        for outcome in remote.drain_registrations().await {
            if let RegisterOutcome::Added { name, selected: false } = outcome {
                if default_device.is_some_and(|d| d.eq_ignore_ascii_case(&name)) {
                    debug!("switching to default device {}", name);
                    remote.select_by_name(&name).await;
                }
            }
        }

        remote.tick(Instant::now()).await;
    }

    info!("leaving interactive remote");
    Ok(())
}

/// Carry out one action against the selected device
async fn apply_action(action: Action, remote: &mut Remote, controls: &mut Controls) {
    let (label, sent) = match action {
        Action::Quit => return,
        Action::Press(key) => (key.to_string(), remote.press(key).await),
        Action::Type { ch, keysym } => {
            let label = ch.map(|c| c.to_string()).unwrap_or_else(|| keysym.clone());
            (label, remote.type_char(ch, &keysym).await)
        }
        Action::SwitchInput(input) => (input.to_string(), remote.switch_input(input).await),
        Action::Launch(channel) => (channel.label, remote.launch(&channel.id).await),
        Action::TogglePower => ("power".to_string(), remote.toggle_power().await),
        Action::NextDevice => {
            remote.select_next().await;
            return;
        }
        Action::PrevDevice => {
            remote.select_prev().await;
            return;
        }
        Action::Rediscover => {
            remote.discover(true);
            return;
        }
    };

    if sent {
        controls.last_sent = Some(label);
    } else if remote.selected().is_none() {
        remote.status = "no device selected".to_string();
    } else {
        remote.status = format!("{} not sent", label);
    }
}
