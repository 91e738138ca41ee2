use std::{
    fs::{self, OpenOptions},
    io::{self, IsTerminal, Write},
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use courseplayer_core::{Catalog, Config, LogSink, RuntimeContext, classify};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use directories::ProjectDirs;
use log::{debug, error, info, warn};
use ratatui::{Terminal, backend::CrosstermBackend, style::Color};

mod app;
mod commands;
mod events;
mod headless;
mod surface;
mod ui;

use app::App;
use events::event_utils;

/// Terminal course browser and video player
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory with courses.json and categories.json
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Config file (default: config.toml in the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// User agent to classify the requester by
    #[arg(long, env = "HTTP_USER_AGENT")]
    user_agent: Option<String>,

    /// Listing page to start on
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Log file for interactive sessions
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Course route to open, e.g. /dsa/intro/2
    route: Option<String>,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "courseplayer")
}

fn init_logging(interactive: bool, log_file: Option<PathBuf>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{} {:<5} {}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    // the alternate screen must stay clean, so interactive sessions log to a file
    if interactive {
        let path = match log_file {
            Some(path) => path,
            None => project_dirs()
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(std::env::temp_dir)
                .join("courseplayer.log"),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => match project_dirs() {
            Some(dirs) => dirs.config_dir().join("config.toml"),
            None => return Ok(Config::default()),
        },
    };
    Config::load(&path).with_context(|| format!("Invalid config {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let interactive = io::stdout().is_terminal();
    init_logging(interactive, args.log_file.clone())?;
    info!("Application starting");

    let config = load_config(args.config.clone())?;
    let catalog_dir = args
        .catalog
        .clone()
        .or_else(|| config.catalog.dir.clone())
        .unwrap_or_else(|| PathBuf::from("data"));
    let catalog = Catalog::load_dir_or_empty(&catalog_dir);

    let context = if interactive {
        RuntimeContext::Client {
            user_agent: args.user_agent.clone(),
        }
    } else {
        RuntimeContext::NoClientRuntime
    };
    let verdict = classify(&context);
    debug!("Runtime {:?} classified as {:?}", context, verdict);

    if !interactive {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        return headless::run(
            &mut out,
            &catalog,
            &config,
            verdict,
            args.page,
            args.route.as_deref(),
            &LogSink,
        );
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let mut app = App::new(config, catalog, verdict, runtime.handle().clone())?;
    if args.page > 1 {
        if let Err(e) = app.go_to_page(args.page) {
            warn!("Ignoring --page: {}", e);
        }
    }
    if let Some(route) = &args.route {
        if let Err(e) = app.open_route(route) {
            warn!("Could not open {}: {}", route, e);
            app.set_status(format!("Error: {}", e), Color::Red);
        }
    }

    run_tui(&mut app)?;

    // engines must be gone before the runtime shuts down
    drop(app);
    runtime.shutdown_timeout(Duration::from_millis(500));
    info!("Application terminated");
    Ok(())
}

fn run_tui(app: &mut App) -> Result<()> {
    // Set up clean terminal restoration on panic
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, DisableMouseCapture);
        error!("PANIC: {}", panic_info);
        orig_hook(panic_info);
    }));

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        let _ = disable_raw_mode();
        return Err(e).context("Failed to setup terminal");
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(term) => term,
        Err(e) => {
            let _ = disable_raw_mode();
            return Err(e).context("Failed to create terminal");
        }
    };
    debug!("Terminal setup complete");

    let result = event_loop(&mut terminal, app);

    debug!("CLEANUP: Starting terminal cleanup sequence");
    let cleanup = (|| -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)
            .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    })();
    if let Err(e) = cleanup {
        error!("Error during cleanup: {}", e);
        eprintln!("Error during cleanup: {}", e);
    }

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now().checked_sub(tick_rate).unwrap_or_else(Instant::now);

    while !app.should_quit {
        if last_tick.elapsed() >= tick_rate {
            if let Err(e) = app.update() {
                error!("App update error: {}", e);
                app.set_status(format!("Error: {}", e), Color::Red);
            }
            terminal.draw(|f| {
                if let Err(e) = ui::draw_ui(f, app) {
                    error!("UI draw function error: {}", e);
                }
            })?;
            last_tick = Instant::now();
        }

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if !event::poll(timeout)? {
            continue;
        }

        let event = event::read()?;
        if event_utils::is_terminate_event(&event) {
            info!("Quit key pressed");
            app.should_quit = true;
            break;
        }

        match event {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if app.is_command_mode() && key.code == event::KeyCode::Enter {
                    let cmd = app.get_command_buffer().to_string();
                    app.exit_command_mode();
                    debug!("Executing command: {}", cmd);
                    if let Err(e) = commands::handle_command(app, &cmd) {
                        warn!("Command error: {}", e);
                        app.set_status(format!("Error: {}", e), Color::Red);
                    }
                } else if let Err(e) = app.handle_key_event(key) {
                    warn!("Key handler error: {}", e);
                    app.set_status(format!("Error: {}", e), Color::Red);
                }
                // redraw right away
                last_tick = Instant::now().checked_sub(tick_rate).unwrap_or(last_tick);
            }
            Event::Mouse(mouse) => app.handle_mouse_event(mouse),
            Event::Resize(w, h) => {
                debug!("Resize event: {}x{}", w, h);
                last_tick = Instant::now().checked_sub(tick_rate).unwrap_or(last_tick);
            }
            _ => {}
        }
    }

    Ok(())
}
