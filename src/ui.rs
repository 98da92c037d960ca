use crate::app::{App, Focus};
use crate::map::MapLayers;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Info panel width in character columns
pub const INFO_PANEL_WIDTH: u16 = 42;

/// The panel collapses on narrow terminals
pub fn info_panel_width(total_width: u16) -> u16 {
    if total_width >= 80 {
        INFO_PANEL_WIDTH
    } else {
        0
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Map row, query input, status bar
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map + info
            Constraint::Length(3), // Query input
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    // Info panel sits right of the map when there is room
    let info_width = info_panel_width(area.width);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(info_width)])
        .split(rows[0]);

    render_map(frame, app, columns[0]);
    if info_width > 0 {
        render_info(frame, app, columns[1]);
    }
    render_input(frame, app, rows[1]);
    render_status_bar(frame, app, rows[2]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " S2 Map ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 resolution per character
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let layers = app.map_renderer.render(
        inner.width as usize,
        inner.height as usize,
        &viewport,
        &app.overlays,
    );

    // Mouse position marker in character cells
    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        if cx < inner.width && cy < inner.height {
            Some((cx, cy))
        } else {
            None
        }
    });

    let map_widget = MapWidget { layers, cursor_pos };
    frame.render_widget(map_widget, inner);
}

/// Custom widget that renders colored braille layers with labels overlaid
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(
        &self,
        canvas: &crate::braille::BrailleCanvas,
        color: Color,
        area: Rect,
        buf: &mut Buffer,
    ) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: base map, then colored overlays
        self.render_layer(&self.layers.coastlines, Color::DarkGray, area, buf);
        self.render_layer(&self.layers.borders, Color::Cyan, area, buf);
        for (color, canvas) in &self.layers.overlays {
            self.render_layer(canvas, *color, area, buf);
        }

        // Marker labels
        let label_style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &self.layers.labels {
            if *lx >= area.width || *ly >= area.height {
                continue;
            }
            let y = area.y + *ly;
            for (i, ch) in text.chars().take(10).enumerate() {
                let x = area.x + *lx + i as u16;
                if x < area.x + area.width {
                    buf[(x, y)].set_char(ch).set_style(label_style);
                }
            }
        }

        // Mouse cursor
        if let Some((cx, cy)) = self.cursor_pos {
            let x = area.x + cx;
            let y = area.y + cy;
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn render_info(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" Info ", Style::default().fg(Color::Cyan)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Show the most recent lines that fit
    let visible = inner.height as usize;
    let start = app.info.len().saturating_sub(visible);
    let lines: Vec<Line> = app.info[start..]
        .iter()
        .map(|l| Line::from(l.as_str()))
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Input;
    let border_color = if focused {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(
            " Query (coords or cell ids) ",
            Style::default().fg(Color::Cyan),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let content = if app.input.is_empty() {
        Paragraph::new(Span::styled(
            app.placeholder.as_str(),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Paragraph::new(app.input.as_str())
    };
    frame.render_widget(content, inner);

    if focused {
        let cursor_x = inner.x
            + (app.input.chars().count() as u16).min(inner.width.saturating_sub(1));
        frame.set_cursor_position((cursor_x, inner.y));
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map_renderer.settings;

    let on = Style::default().fg(Color::Green);
    let off = Style::default().fg(Color::DarkGray);
    let flag = |active: bool| if active { on } else { off };

    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", Style::default().fg(Color::DarkGray)),
        Span::styled(app.lod_level(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("[{}] ", app.draw_mode.label()),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(format!("[{}] ", app.coord_order.label()), on),
        Span::styled("[x]clear ", flag(app.clear_on_render)),
        Span::styled("[v]cover ", flag(app.covering)),
    ];

    if app.covering {
        spans.push(Span::styled(
            format!("({}) ", app.cover_summary()),
            Style::default().fg(Color::Magenta),
        ));
    }

    spans.extend([
        Span::styled("[b]orders ", flag(settings.show_borders)),
        Span::styled("[L]abels ", flag(settings.show_labels)),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(
            " | i:query 123:mode hjkl:pan +/-:zoom r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
