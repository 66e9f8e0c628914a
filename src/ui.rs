use crate::app::{App, Standing, SIDEBAR_WIDTH};
use crate::braille::BrailleCanvas;
use crate::hash::{hash_str, unit_from};
use crate::map::TerritoryLayers;
use county_conquest::territory::{CenterKind, Site};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map + sidebar
            Constraint::Length(1), // Status bar
        ])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(SIDEBAR_WIDTH)])
        .split(rows[0]);

    let palette: Vec<Color> = app.session.roster().iter().map(site_color).collect();

    render_map(frame, app, columns[0], &palette);
    render_sidebar(frame, app, columns[1], &palette);
    render_status_bar(frame, app, rows[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect, palette: &[Color]) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " County Conquest ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 resolution per character
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let anchors: Vec<_> = app.session.active_sites().iter().map(|s| s.anchor).collect();
    let layers = app.renderer.render(
        inner.width as usize,
        inner.height as usize,
        &viewport,
        &app.owner_slots,
        app.hover,
        &anchors,
    );

    let mut labels = Vec::new();
    if app.renderer.settings.show_labels {
        for center in &app.centers {
            let (px, py) = viewport.project(center.position.0, center.position.1);
            if px < 0 || py < 0 || !viewport.is_visible(px, py) {
                continue;
            }
            let Some(slot) = app.site_slot(&center.site) else {
                continue;
            };
            let name = app.site_name(&center.site);
            let text = match center.kind {
                CenterKind::Conquered => format!("{name}*"),
                CenterKind::Home | CenterKind::Combined => name,
            };
            // Center the label on the territory
            let col = ((px / 2) as u16).saturating_sub(text.chars().count() as u16 / 2);
            labels.push((col, (py / 4) as u16, text, slot));
        }
    }

    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    let selected = app.pending_winner.as_ref().and_then(|id| app.site_slot(id));

    frame.render_widget(
        MapWidget {
            layers,
            labels,
            palette,
            selected,
            cursor_pos,
        },
        inner,
    );
}

/// Custom widget that renders the braille territories with labels overlaid
struct MapWidget<'a> {
    layers: TerritoryLayers,
    /// (col, row, text, roster slot)
    labels: Vec<(u16, u16, String, usize)>,
    palette: &'a [Color],
    selected: Option<usize>,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget<'_> {
    /// Render a braille layer; tagged cells take their slot color
    fn render_layer(&self, canvas: &BrailleCanvas, fallback: Color, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height.min(canvas.height() as u16) {
            for col in 0..area.width.min(canvas.width() as u16) {
                let Some((ch, tag)) = canvas.cell(col as usize, row as usize) else {
                    continue;
                };
                let mut style = Style::default().fg(fallback);
                if let Some(slot) = tag.map(usize::from) {
                    style = style.fg(self.palette.get(slot).copied().unwrap_or(fallback));
                    if self.selected == Some(slot) {
                        style = style.add_modifier(Modifier::BOLD);
                    } else if self.selected.is_some() {
                        style = style.add_modifier(Modifier::DIM);
                    }
                }
                buf[(area.x + col, area.y + row)].set_char(ch).set_style(style);
            }
        }
    }
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: territory fill, region outlines, hover, anchors
        self.render_layer(&self.layers.fill, Color::Gray, area, buf);
        self.render_layer(&self.layers.outlines, Color::DarkGray, area, buf);
        self.render_layer(&self.layers.hover, Color::White, area, buf);
        self.render_layer(&self.layers.markers, Color::White, area, buf);

        for (lx, ly, text, slot) in &self.labels {
            if *ly >= area.height || *lx >= area.width {
                continue;
            }
            let style = Style::default()
                .fg(Color::Black)
                .bg(self.palette.get(*slot).copied().unwrap_or(Color::White))
                .add_modifier(Modifier::BOLD);
            let max_len = area.width.saturating_sub(*lx) as usize;
            for (i, ch) in text.chars().take(max_len.min(20)).enumerate() {
                buf[(area.x + *lx + i as u16, area.y + *ly)].set_char(ch).set_style(style);
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect, palette: &[Color]) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Standings ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let standings = app.standings();
    let name_width = (SIDEBAR_WIDTH as usize).saturating_sub(19);
    let mut lines: Vec<Line> = standings
        .iter()
        .enumerate()
        .map(|(rank, row)| standing_line(rank + 1, row, name_width, palette))
        .collect();

    let report = app.session.report();
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        format!(
            "{} left · balance {}",
            standings.len(),
            if report.converged { "ok" } else { "partial" }
        ),
        Style::default().fg(Color::DarkGray),
    )));
    if let Some(champion) = app.session.champion() {
        lines.push(Line::from(Span::styled(
            format!("Champion: {}", champion.name),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn standing_line(rank: usize, row: &Standing, name_width: usize, palette: &[Color]) -> Line<'static> {
    let color = palette.get(row.slot).copied().unwrap_or(Color::White);
    let name: String = row.name.chars().take(name_width).collect();
    let mut name_style = Style::default().fg(Color::White);
    if row.selected {
        name_style = name_style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }
    Line::from(vec![
        Span::styled(format!("{rank:>2} "), Style::default().fg(Color::DarkGray)),
        Span::styled("■ ", Style::default().fg(color)),
        Span::styled(format!("{name:<name_width$}"), name_style),
        Span::styled(format!("{:>6.1}%", row.share * 100.0), Style::default().fg(Color::Yellow)),
        Span::styled(format!("{:>5}", row.regions), Style::default().fg(Color::DarkGray)),
    ])
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.renderer.settings;
    let toggle = |on: bool, label_on: &'static str, label_off: &'static str| {
        Span::styled(
            if on { label_on } else { label_off },
            Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
        )
    };

    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        toggle(settings.show_outlines, "[O]utline ", "[o]utline "),
        toggle(settings.show_labels, "[L]abels ", "[l]abels "),
        toggle(settings.show_anchors, "[A]nchors ", "[a]nchors "),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
    ];

    if let Some(message) = &app.message {
        spans.push(Span::styled(message.clone(), Style::default().fg(Color::White)));
    } else if let Some(info) = app.hover_info() {
        spans.push(Span::styled(info, Style::default().fg(Color::White)));
    } else {
        spans.push(Span::styled(
            "hjkl:pan +/-:zoom r:reset right-click:record win q:quit",
            Style::default().fg(Color::DarkGray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Configured `#RRGGBB` color, else a stable hue derived from the site id
fn site_color(site: &Site) -> Color {
    if let Some((r, g, b)) = site.color.as_deref().and_then(parse_hex) {
        return Color::Rgb(r, g, b);
    }
    let (r, g, b) = hue_to_rgb(unit_from(hash_str(site.id.as_str())));
    Color::Rgb(r, g, b)
}

fn parse_hex(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Fully saturated HSV color at value 0.9
fn hue_to_rgb(hue: f64) -> (u8, u8, u8) {
    let h = hue.rem_euclid(1.0) * 6.0;
    let v = 0.9;
    let x = v * (1.0 - ((h % 2.0) - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (v, x, 0.0),
        1 => (x, v, 0.0),
        2 => (0.0, v, x),
        3 => (0.0, x, v),
        4 => (x, 0.0, v),
        _ => (v, 0.0, x),
    };
    let to_u8 = |c: f64| (c * 255.0).round() as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}
