use crate::app_main::AppMain;
use crate::config::{AppConfig, Keymap};
use crate::state::State;
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::cursor::Show;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use pasajes_client::{PasajesClient, PasajesFake, RecordService};
use pasajes_editor::EditorController;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Command-line flags; each one overrides the config file
#[derive(Debug, Parser)]
#[command(name = "pasajes-tui", version, about = "Emisión y gestión de pasajes")]
pub struct Cli {
    /// Server base URL, e.g. http://localhost:5000
    #[arg(long, env = "PASAJES_BASE_URL")]
    pub base_url: Option<String>,

    /// YAML configuration file
    #[arg(long, short = 'c', env = "PASAJES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run against built-in demo data instead of a server
    #[arg(long)]
    pub offline: bool,

    /// Log file (default ~/.config/pasajes/pasajes.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Fully resolved startup settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub timeout: Duration,
    pub export_path: PathBuf,
    pub keymap: Keymap,
    pub offline: bool,
}

impl Settings {
    /// Flags over config file over defaults
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = AppConfig::resolve(cli.config.as_deref())?;
        Ok(Self::merge(cli, config))
    }

    pub fn merge(cli: &Cli, config: AppConfig) -> Self {
        let timeout = config.timeout();
        Self {
            base_url: cli.base_url.clone().unwrap_or(config.base_url),
            timeout,
            export_path: config.export_path,
            keymap: config.keybindings.into_keymap(),
            offline: cli.offline,
        }
    }
}

pub fn build_service(settings: &Settings) -> Result<Arc<dyn RecordService>> {
    if settings.offline {
        info!("[PasajesTui] Offline mode, using demo data");
        return Ok(Arc::new(PasajesFake::demo()));
    }
    let client = PasajesClient::with_timeout(&settings.base_url, settings.timeout)
        .with_context(|| format!("Invalid server URL {}", settings.base_url))?;
    info!("[PasajesTui] Using server {}", settings.base_url);
    Ok(Arc::new(client))
}

pub async fn run_app(settings: Settings) -> Result<()> {
    let service = build_service(&settings)?;
    let controller = EditorController::new(service);
    let mut state = State::new(controller, settings.keymap, settings.export_path);
    let app = AppMain::default();

    enable_raw_mode().context("failed to enter raw mode")?;
    let _guard = TerminalGuard {
        restore: leave_terminal,
    };
    install_panic_hook();

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
    terminal.hide_cursor()?;
    terminal.clear()?;

    let (event_tx, event_rx) = mpsc::channel::<Event>(128);
    spawn_input_thread(event_tx);

    event_loop(&mut terminal, &app, &mut state, event_rx).await
}

/// Draw, wait for a key, run what it asks for; repeat until quit.
///
/// Server commands are awaited here, so the next key is only read after the
/// request finished. Keys typed in the meantime are discarded, which rules out
/// a second submit of the same form.
pub async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &AppMain,
    state: &mut State,
    mut events: mpsc::Receiver<Event>,
) -> Result<()> {
    terminal.draw(|frame| app.render(frame, state))?;
    state.init().await;

    loop {
        terminal.draw(|frame| app.render(frame, state))?;
        if state.should_quit() {
            break;
        }

        let Some(event) = events.recv().await else {
            break;
        };
        let Event::Key(key) = event else {
            continue;
        };

        if let Some(command) = state.on_key(key) {
            state.begin(&command);
            terminal.draw(|frame| app.render(frame, state))?;
            state.run_command(command).await;

            let mut dropped = 0;
            while events.try_recv().is_ok() {
                dropped += 1;
            }
            if dropped > 0 {
                debug!("[PasajesTui] Discarded {} events received while busy", dropped);
            }
        }
    }
    Ok(())
}

/// Runs `restore` when dropped, so raw mode is left on every return path
struct TerminalGuard<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> Drop for TerminalGuard<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

fn leave_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        leave_terminal();
        original_hook(panic_info);
    }));
}

fn spawn_input_thread(sender: mpsc::Sender<Event>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(evt).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.is_closed() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}
