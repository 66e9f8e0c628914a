mod app;
mod braille;
mod hash;
mod map;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use county_conquest::config::AppConfig;
use county_conquest::data::{self, RegionMap};
use county_conquest::territory::{GameSession, Site};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use map::TerritoryRenderer;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "County conquest map in the terminal", long_about = None)]
struct Cli {
    /// JSON config file; defaults apply when it does not exist.
    #[arg(default_value = "conquest.json")]
    config: PathBuf,
    /// Tracing filter, overriding the config file and RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,
    /// Log file, overriding the config file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        AppConfig::default()
    };
    if let Some(file) = cli.log_file {
        config.log_file = file;
    }
    let filter_override = cli.log_filter.is_some();
    if let Some(filter) = cli.log_filter {
        config.log_filter = filter;
    }
    init_tracing(&config, filter_override)?;

    let (map, sites) = load_world(&config)?;
    let bounds = map.bounds();
    let RegionMap { graph, shapes } = map;
    let session = GameSession::new(graph, sites, &config.engine).context("seeding the game")?;

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, session, TerritoryRenderer::new(shapes), bounds);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Log to a file; the terminal belongs to the UI
fn init_tracing(config: &AppConfig, filter_override: bool) -> Result<()> {
    let file = File::create(&config.log_file)
        .with_context(|| format!("creating log file {}", config.log_file.display()))?;
    let filter = if filter_override {
        EnvFilter::try_new(&config.log_filter)?
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_filter))?
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// County file and roster from the data directory, with demo fallbacks
fn load_world(config: &AppConfig) -> Result<(RegionMap, Vec<Site>)> {
    let counties = config.counties_path();
    let map = if counties.exists() {
        data::load_counties(&counties, &config.excluded_state_fips)?
    } else {
        warn!(path = %counties.display(), "county file missing; using demo grid");
        data::generate_demo_map()?
    };

    let sites_path = config.sites_path();
    let sites = if sites_path.exists() {
        data::load_sites(&sites_path)?
    } else {
        warn!(path = %sites_path.display(), "sites file missing; using demo roster");
        data::demo_sites()
    };

    info!(regions = map.graph.len(), sites = sites.len(), "world loaded");
    Ok((map, sites))
}

/// Handle mouse events for panning, zooming and recording results
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        MouseEventKind::Down(MouseButton::Right) => {
            app.handle_right_click(mouse.column, mouse.row);
        }
        _ => {}
    }
}

fn run(
    terminal: &mut DefaultTerminal,
    session: GameSession,
    renderer: TerritoryRenderer,
    bounds: Option<(f64, f64, f64, f64)>,
) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(session, renderer, bounds, size.width as usize, size.height as usize);

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') => app.quit(),
                            KeyCode::Esc => {
                                if !app.cancel_selection() {
                                    app.message = None;
                                }
                            }

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            // Layer toggles
                            KeyCode::Char('o') | KeyCode::Char('O') => app.renderer.toggle_outlines(),
                            KeyCode::Char('L') => app.renderer.toggle_labels(),
                            KeyCode::Char('a') | KeyCode::Char('A') => app.renderer.toggle_anchors(),

                            KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_conquest_json() {
        let cli = Cli::try_parse_from(["county-conquest"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("conquest.json"));
        assert!(cli.log_filter.is_none());
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "county-conquest",
            "season.json",
            "--log-filter",
            "county_conquest=debug",
            "--log-file",
            "/tmp/conquest.log",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("season.json"));
        assert_eq!(cli.log_filter.as_deref(), Some("county_conquest=debug"));
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/conquest.log")));
    }
}
