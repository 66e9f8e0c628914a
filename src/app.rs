use std::collections::HashMap;

use county_conquest::territory::{GameSession, SiteId, TerritoryAssignment, TerritoryCenter};
use tracing::{debug, warn};

use crate::map::{TerritoryRenderer, Viewport};

/// Standings panel width in terminal columns
pub const SIDEBAR_WIDTH: u16 = 32;

/// One row of the standings panel
#[derive(Clone, Debug, PartialEq)]
pub struct Standing {
    /// Roster slot, used for colors
    pub slot: usize,
    pub name: String,
    /// Fraction of the total map area
    pub share: f64,
    pub regions: usize,
    pub selected: bool,
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    home_bounds: Option<(f64, f64, f64, f64)>,
    pub renderer: TerritoryRenderer,
    pub session: GameSession,
    /// Cached result of the last resolve
    pub assignment: TerritoryAssignment,
    pub centers: Vec<TerritoryCenter>,
    /// Roster slot per region index, aligned with the region graph
    pub owner_slots: Vec<Option<u16>>,
    /// Winner picked with the first right-click, waiting for a loser
    pub pending_winner: Option<SiteId>,
    /// Region index under the mouse
    pub hover: Option<usize>,
    pub message: Option<String>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
}

/// Braille pixel size of the map panel for a terminal of `width` x `height` cells
fn map_pixels(width: usize, height: usize) -> (usize, usize) {
    // 2 for the border, plus the sidebar; 2 for the border + 1 for the status bar
    let inner_width = width.saturating_sub(2 + SIDEBAR_WIDTH as usize);
    let inner_height = height.saturating_sub(3);
    (inner_width * 2, inner_height * 4)
}

impl App {
    pub fn new(
        session: GameSession,
        renderer: TerritoryRenderer,
        bounds: Option<(f64, f64, f64, f64)>,
        width: usize,
        height: usize,
    ) -> Self {
        let (pixel_width, pixel_height) = map_pixels(width, height);
        let mut app = Self {
            viewport: home_viewport(bounds, pixel_width, pixel_height),
            home_bounds: bounds,
            renderer,
            session,
            assignment: TerritoryAssignment::default(),
            centers: Vec::new(),
            owner_slots: Vec::new(),
            pending_winner: None,
            hover: None,
            message: None,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
        };
        app.refresh();
        app
    }

    /// Re-resolve territory after the ledger or active set changed
    pub fn refresh(&mut self) {
        let assignment = self.session.assignment();
        let centers = self.session.centers(&assignment);

        let slots: HashMap<&SiteId, u16> = self
            .session
            .roster()
            .iter()
            .enumerate()
            .map(|(i, s)| (&s.id, i as u16))
            .collect();
        let owner_slots = self
            .session
            .graph()
            .regions()
            .iter()
            .map(|r| assignment.site_of(r.id).and_then(|s| slots.get(s).copied()))
            .collect();

        self.owner_slots = owner_slots;
        self.assignment = assignment;
        self.centers = centers;
        debug!(regions = self.assignment.len(), centers = self.centers.len(), "view refreshed");
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = map_pixels(width, height);
        self.viewport.width = pixel_width;
        self.viewport.height = pixel_height;
    }

    /// Back to the initial fitted view
    pub fn reset_view(&mut self) {
        self.viewport = home_viewport(self.home_bounds, self.viewport.width, self.viewport.height);
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = screen_to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = screen_to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// Handle mouse drag
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            // One cell of drag moves one cell of map
            self.pan(dx * 2, dy * 4);
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Update mouse cursor position and the hovered region
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        self.hover = self.region_at_screen(col, row);
    }

    /// Get mouse position in braille pixel coordinates (for rendering marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| screen_to_pixel(col, row))
    }

    fn region_at_screen(&self, col: u16, row: u16) -> Option<usize> {
        let (px, py) = screen_to_pixel(col, row);
        if px < 0 || py < 0 || px >= self.viewport.width as i32 || py >= self.viewport.height as i32 {
            return None;
        }
        // Sample the middle of the character cell
        let (lon, lat) = self.viewport.unproject(px + 1, py + 2);
        self.renderer.region_at(lon, lat)
    }

    /// Right-click: first pick the winner, then the loser's territory
    pub fn handle_right_click(&mut self, col: u16, row: u16) {
        match self.region_at_screen(col, row) {
            Some(idx) => self.select_region(idx),
            None => self.message = Some("No region there".to_string()),
        }
    }

    /// Selection step for the region at `idx`
    pub fn select_region(&mut self, idx: usize) {
        let region = self.session.graph().region(idx).id;
        let Some(owner) = self.assignment.site_of(region).cloned() else {
            self.message = Some(format!("Region {region} is unclaimed"));
            return;
        };

        match self.pending_winner.take() {
            None => {
                self.message = Some(format!(
                    "{} selected: right-click a rival to record the win (Esc cancels)",
                    self.site_name(&owner)
                ));
                self.pending_winner = Some(owner);
            }
            Some(winner) if winner == owner => {
                self.message = Some(format!("{} deselected", self.site_name(&winner)));
            }
            Some(winner) => self.record(&winner, &owner),
        }
    }

    fn record(&mut self, winner: &SiteId, loser: &SiteId) {
        match self.session.record_result(winner, loser) {
            Ok(outcome) => {
                self.refresh();
                let message = match self.session.champion() {
                    Some(champion) => format!("{} is the last one standing", champion.name),
                    None => format!(
                        "{} conquered {} (+{} regions, {} left)",
                        self.site_name(winner),
                        self.site_name(loser),
                        outcome.transferred,
                        outcome.remaining
                    ),
                };
                self.message = Some(message);
            }
            Err(err) => {
                warn!(%err, "result rejected");
                self.message = Some(err.to_string());
            }
        }
    }

    /// Esc: drop a pending winner. Returns false when nothing was pending.
    pub fn cancel_selection(&mut self) -> bool {
        match self.pending_winner.take() {
            Some(_) => {
                self.message = Some("Selection cancelled".to_string());
                true
            }
            None => false,
        }
    }

    pub fn site_name(&self, id: &SiteId) -> String {
        self.session
            .site(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Roster slot of a site, the key for its color
    pub fn site_slot(&self, id: &SiteId) -> Option<usize> {
        self.session.roster().iter().position(|s| &s.id == id)
    }

    /// Active sites, largest share first
    pub fn standings(&self) -> Vec<Standing> {
        let mut rows: Vec<Standing> = self
            .session
            .roster()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(slot, s)| Standing {
                slot,
                name: s.name.clone(),
                share: self.assignment.share_of(&s.id),
                regions: self.assignment.region_count(&s.id),
                selected: self.pending_winner.as_ref() == Some(&s.id),
            })
            .collect();
        rows.sort_by(|a, b| b.share.total_cmp(&a.share).then(a.slot.cmp(&b.slot)));
        rows
    }

    /// Status line text for the hovered region
    pub fn hover_info(&self) -> Option<String> {
        let idx = self.hover?;
        let region = self.session.graph().region(idx).id;
        let owner = self.assignment.site_of(region)?;
        Some(format!(
            "Region {:05} · {} ({:.1}%)",
            region,
            self.site_name(owner),
            self.assignment.share_of(owner) * 100.0
        ))
    }
}

fn home_viewport(bounds: Option<(f64, f64, f64, f64)>, width: usize, height: usize) -> Viewport {
    match bounds {
        Some(bounds) => Viewport::fit_bounds(bounds, width, height),
        None => Viewport::new(-96.0, 38.0, 6.0, width, height),
    }
}

/// Terminal cell to braille pixel, accounting for the 1-cell border
fn screen_to_pixel(col: u16, row: u16) -> (i32, i32) {
    let px = (col.saturating_sub(1) as i32) * 2;
    let py = (row.saturating_sub(1) as i32) * 4;
    (px, py)
}

#[cfg(test)]
mod tests {
    use super::*;
    use county_conquest::config::EngineConfig;
    use county_conquest::data::{demo_sites, generate_demo_map};

    fn app() -> App {
        let map = generate_demo_map().unwrap();
        let bounds = map.bounds();
        let session = GameSession::new(map.graph, demo_sites(), &EngineConfig::default()).unwrap();
        App::new(session, TerritoryRenderer::new(map.shapes), bounds, 140, 50)
    }

    /// Index of some region currently held by `site`
    fn region_of(app: &App, site: &str) -> usize {
        let id = SiteId::from(site);
        app.session
            .graph()
            .regions()
            .iter()
            .position(|r| app.assignment.site_of(r.id) == Some(&id))
            .unwrap()
    }

    #[test]
    fn test_every_region_has_a_slot() {
        let app = app();
        assert_eq!(app.owner_slots.len(), app.session.graph().len());
        assert!(app.owner_slots.iter().all(Option::is_some));
        assert_eq!(app.standings().len(), demo_sites().len());
    }

    #[test]
    fn test_two_clicks_record_a_conquest() {
        let mut app = app();
        let texas = region_of(&app, "texas");
        let lsu = region_of(&app, "lsu");

        app.select_region(texas);
        assert_eq!(app.pending_winner, Some(SiteId::from("texas")));
        app.select_region(lsu);

        assert_eq!(app.pending_winner, None);
        assert_eq!(app.assignment.region_count(&SiteId::from("lsu")), 0);
        assert!(app.standings().iter().all(|s| s.name != "LSU"));
        assert!(app.message.as_deref().unwrap_or("").contains("conquered"));
    }

    #[test]
    fn test_same_owner_click_deselects() {
        let mut app = app();
        let utah = region_of(&app, "utah");
        app.select_region(utah);
        app.select_region(utah);
        assert_eq!(app.pending_winner, None);
        assert_eq!(app.standings().len(), demo_sites().len());
    }

    #[test]
    fn test_escape_cancels_pending_winner() {
        let mut app = app();
        assert!(!app.cancel_selection());
        let oregon = region_of(&app, "oregon");
        app.select_region(oregon);
        assert!(app.cancel_selection());
        assert_eq!(app.pending_winner, None);
    }

    #[test]
    fn test_standings_sorted_by_share() {
        let app = app();
        let shares: Vec<f64> = app.standings().iter().map(|s| s.share).collect();
        assert!(shares.windows(2).all(|w| w[0] >= w[1]));
        let total: f64 = shares.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_hover_over_map_finds_region() {
        let mut app = app();
        // Middle of the map panel
        let (col, row) = ((app.viewport.width / 4) as u16, (app.viewport.height / 8) as u16);
        app.set_mouse_pos(col, row);
        assert!(app.hover.is_some());
        assert!(app.hover_info().is_some());
    }
}
