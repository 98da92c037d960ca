use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use s2scope::app::{App, DrawMode, Focus};
use s2scope::config::{self, Config};
use s2scope::{data, ui};
use std::time::Duration;

/// Command line options: an optional initial query plus a heatmap URL
struct Options {
    query: Option<String>,
    heatmap: Option<String>,
}

fn parse_args() -> Result<Options> {
    let mut query = None;
    let mut heatmap = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--heatmap" => {
                heatmap = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("--heatmap requires a URL"))?,
                );
            }
            "--help" | "-h" => {
                println!("Usage: s2scope [QUERY] [--heatmap URL]");
                println!();
                println!("  QUERY          coordinates or S2 cell ids to render on launch");
                println!("  --heatmap URL  fetch a cell,color heatmap file and render it");
                std::process::exit(0);
            }
            other if query.is_none() => query = Some(other.to_string()),
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }

    Ok(Options { query, heatmap })
}

fn main() -> Result<()> {
    let options = parse_args()?;
    let config = Config::from_env()?;
    config::init_tracing(&config)?;

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, &config, options);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for panning, zooming and position readout
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for cursor marker
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click and drag to pan
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        // Right click echoes the coordinates under the cursor
        MouseEventKind::Down(MouseButton::Right) => {
            app.echo_position(mouse.column, mouse.row);
        }
        _ => {}
    }
}

/// Keystrokes while the query input has focus
fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            app.submit();
            app.focus_map();
        }
        KeyCode::Esc => app.focus_map(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Char('u') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
            app.clear_input();
        }
        KeyCode::Char(c) => app.push_char(c),
        _ => {}
    }
}

/// Keystrokes while the map has focus
fn handle_map_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Focus the query input
        KeyCode::Char('i') | KeyCode::Char('/') => app.focus_input(),
        KeyCode::Enter => app.submit(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Drawing mode
        KeyCode::Char('1') => app.set_draw_mode(DrawMode::Point),
        KeyCode::Char('2') => app.set_draw_mode(DrawMode::Line),
        KeyCode::Char('3') => app.set_draw_mode(DrawMode::Polygon),

        // Parsing and rendering toggles
        KeyCode::Char('o') => app.toggle_coord_order(),
        KeyCode::Char('x') => app.toggle_clear_on_render(),
        KeyCode::Char('v') => app.toggle_covering(),

        // Covering parameters
        KeyCode::Char(',') => app.bump_min_level(-1),
        KeyCode::Char('.') => app.bump_min_level(1),
        KeyCode::Char('<') => app.bump_max_level(-1),
        KeyCode::Char('>') => app.bump_max_level(1),
        KeyCode::Char('[') => app.bump_max_cells(-50),
        KeyCode::Char(']') => app.bump_max_cells(50),
        KeyCode::Char('m') => app.cycle_level_mod(),

        // Layer toggles
        KeyCode::Char('b') | KeyCode::Char('B') => app.map_renderer.toggle_borders(),
        KeyCode::Char('L') => app.map_renderer.toggle_labels(),

        // Reset view
        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: &Config, options: Options) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, size.width as usize, size.height as usize)?;

    // Load all available GeoJSON data at different resolutions
    if config.data_dir.exists() {
        let _ = data::load_all_geojson(&mut app.map_renderer, &config.data_dir);
    }

    // Fall back to simple world if no data loaded
    if !app.map_renderer.has_data() {
        data::generate_simple_world(&mut app.map_renderer);
    }

    // Kick off launch-time requests before the first frame
    if let Some(query) = options.query {
        app.input = query;
        app.submit();
    }
    if let Some(url) = options.heatmap {
        app.request_heatmap(&url);
    }

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match app.focus {
                            Focus::Input => handle_input_key(&mut app, key),
                            Focus::Map => handle_map_key(&mut app, key),
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(&mut app, mouse);
                }
                Event::Resize(width, height) => {
                    app.resize(width as usize, height as usize);
                }
                _ => {}
            }
        }

        // Apply any finished API responses
        app.drain_api_events();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
