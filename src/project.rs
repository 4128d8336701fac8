use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::gradient::{GradientAsset, GradientScheduler};
use crate::grid::GridConfig;
use crate::io::{self, LayoutError};
use crate::model::{BackgroundStyle, Card, CardSize, Layout, now_millis};
use crate::placement::{self, DropKind, HoverState, PlacementError};
use crate::settings::EditorSettings;
use crate::log_info;

/// In-progress drag of one card.
#[derive(Clone, Debug, PartialEq)]
pub struct DragSession {
    pub card_id: String,
    /// Pointer offset inside the card when the drag started, in pixels.
    pub grab_offset: (f64, f64),
    /// Last hover result; reused until the snapped cell changes.
    last_hover: Option<HoverState>,
}

/// Single open layout with its editing state.
pub struct Project {
    pub id: Uuid,
    pub layout: Layout,
    /// `None` for unsaved/untitled layouts.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,

    pub grid: GridConfig,
    pub canvas_padding: f64,

    drag: Option<DragSession>,
    gradients: GradientScheduler,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, settings: &EditorSettings) -> Self {
        let id = Uuid::new_v4();
        let name = format!("Untitled-{}", untitled_counter);
        let layout = Layout::new(id.to_string(), name.clone(), Vec::new());
        Self::with_layout(id, layout, None, settings)
    }

    /// Wrap an already-validated layout.
    pub fn from_layout(layout: Layout, path: Option<PathBuf>, settings: &EditorSettings) -> Self {
        let id = Uuid::parse_str(&layout.id).unwrap_or_else(|_| Uuid::new_v4());
        Self::with_layout(id, layout, path, settings)
    }

    fn with_layout(
        id: Uuid,
        layout: Layout,
        path: Option<PathBuf>,
        settings: &EditorSettings,
    ) -> Self {
        let name = layout.name.clone();
        Self {
            id,
            layout,
            path,
            is_dirty: false,
            name,
            grid: GridConfig::default(),
            canvas_padding: settings.canvas_padding as f64,
            drag: None,
            gradients: GradientScheduler::new(
                settings.gradient_debounce(),
                settings.gradient_quality,
            ),
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.layout.cards
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.layout.card(id)
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    /// Open a layout file (`.bento` or JSON) as a project.
    pub fn open(path: &Path, settings: &EditorSettings) -> Result<Self, LayoutError> {
        let layout = io::read_layout(path, &GridConfig::default())?;
        Ok(Self::from_layout(layout, Some(path.to_path_buf()), settings))
    }

    /// Write back to the file the project was opened from or last saved to.
    pub fn save(&mut self) -> Result<(), LayoutError> {
        let Some(path) = self.path.clone() else {
            return Err(LayoutError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "project has not been saved to a file yet",
            )));
        };
        self.write_to(&path)
    }

    /// Save under a new path; the project takes its name from the file stem.
    pub fn save_as(&mut self, path: &Path) -> Result<(), LayoutError> {
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        self.write_to(path)
    }

    fn write_to(&mut self, path: &Path) -> Result<(), LayoutError> {
        let mut layout = self.to_layout();
        layout.updated_at = now_millis();
        io::write_layout(&layout, path)?;
        self.layout.updated_at = layout.updated_at;
        self.mark_clean();
        log_info!("project: saved '{}' to {}", self.name, path.display());
        Ok(())
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
        self.layout.name = self.name.clone();
        self.mark_dirty();
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            self.layout.name = self.name.clone();
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Swap in a new card collection produced by the placement engine.
    fn commit(&mut self, cards: Vec<Card>) {
        self.layout.cards = cards;
        self.layout.updated_at = now_millis();
        self.mark_dirty();
    }

    // ------------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------------

    /// Add a card with editor defaults at the first free cell. Returns its id.
    pub fn add_card(&mut self, size: CardSize) -> Result<String, PlacementError> {
        let id = Uuid::new_v4().to_string();
        let card = Card::with_defaults(id.clone(), size, 0, 0);
        let next = placement::add_card(self.cards(), card, &self.grid)?;
        self.commit(next);
        Ok(id)
    }

    pub fn begin_drag(
        &mut self,
        card_id: &str,
        grab_offset: (f64, f64),
    ) -> Result<(), PlacementError> {
        if self.card(card_id).is_none() {
            return Err(PlacementError::UnknownCard(card_id.to_string()));
        }
        self.drag = Some(DragSession {
            card_id: card_id.to_string(),
            grab_offset,
            last_hover: None,
        });
        Ok(())
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Hover feedback for the current drag. Recomputed only when the pointer
    /// crosses into a different cell.
    pub fn hover(&mut self, pointer: (f64, f64)) -> Option<HoverState> {
        let drag = self.drag.as_mut()?;
        let cell = placement::hover_cell(pointer, drag.grab_offset, self.canvas_padding, &self.grid);
        if let Some(cached) = drag.last_hover
            && (cached.x, cached.y) == cell
        {
            return Some(cached);
        }
        let dragged = self.layout.card(&drag.card_id)?;
        let state = HoverState {
            x: cell.0,
            y: cell.1,
            valid: placement::is_free_for(&self.layout.cards, dragged, cell.0, cell.1, &self.grid),
        };
        drag.last_hover = Some(state);
        Some(state)
    }

    /// Finish the current drag with the pointer at `pointer`. The drag ends
    /// whether or not the drop succeeds.
    pub fn drop_at_pointer(&mut self, pointer: (f64, f64)) -> Result<DropKind, PlacementError> {
        let Some(drag) = self.drag.take() else {
            return Err(PlacementError::UnknownCard(String::new()));
        };
        let cell = placement::hover_cell(pointer, drag.grab_offset, self.canvas_padding, &self.grid);
        self.move_card(&drag.card_id, cell)
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Drop a card at an explicit grid cell.
    pub fn move_card(&mut self, card_id: &str, target: (i32, i32)) -> Result<DropKind, PlacementError> {
        let outcome = placement::drop_card(self.cards(), card_id, target, &self.grid)?;
        self.commit(outcome.cards);
        Ok(outcome.kind)
    }

    pub fn resize_card(&mut self, card_id: &str, size: CardSize, now: Instant) -> Result<(), PlacementError> {
        let next = placement::resize_card(self.cards(), card_id, size, &self.grid)?;
        self.commit(next);
        // Footprint changed, so any gradient must be re-rendered.
        self.request_gradient(card_id, now);
        Ok(())
    }

    /// Remove a card. Returns false if no card had that id.
    pub fn delete_card(&mut self, card_id: &str) -> bool {
        if self.card(card_id).is_none() {
            return false;
        }
        let next = placement::delete_card(self.cards(), card_id);
        self.commit(next);
        self.gradients.forget(card_id);
        if self.drag.as_ref().is_some_and(|d| d.card_id == card_id) {
            self.drag = None;
        }
        true
    }

    /// Edit a card's presentation attributes. Geometry (id, size, position)
    /// stays owned by the placement engine and is restored after `edit`.
    pub fn update_card(
        &mut self,
        card_id: &str,
        now: Instant,
        edit: impl FnOnce(&mut Card),
    ) -> Result<(), PlacementError> {
        let idx = self
            .cards()
            .iter()
            .position(|c| c.id == card_id)
            .ok_or_else(|| PlacementError::UnknownCard(card_id.to_string()))?;

        let original = &self.layout.cards[idx];
        let mut edited = original.clone();
        edit(&mut edited);
        edited.id = original.id.clone();
        edited.size = original.size;
        edited.x = original.x;
        edited.y = original.y;

        let gradient_changed = edited.gradient != original.gradient
            || edited.background_style != original.background_style;

        let mut next = self.cards().to_vec();
        next[idx] = edited;
        self.commit(next);
        if gradient_changed {
            self.request_gradient(card_id, now);
        }
        Ok(())
    }

    /// Replace every card at once (template or import). Rejects collections
    /// that break the grid invariant.
    pub fn replace_cards(&mut self, cards: Vec<Card>, now: Instant) -> Result<(), LayoutError> {
        let candidate = Layout {
            cards,
            ..self.layout.clone()
        };
        io::validate_import(&candidate, &self.grid)?;
        self.drag = None;
        self.commit(candidate.cards);
        let ids: Vec<String> = self.cards().iter().map(|c| c.id.clone()).collect();
        let keep: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.gradients.retain(&keep);
        self.request_all_gradients(now);
        log_info!("project: replaced cards, {} now", self.cards().len());
        Ok(())
    }

    /// Layout snapshot with the current name.
    pub fn to_layout(&self) -> Layout {
        Layout {
            name: self.name.clone(),
            ..self.layout.clone()
        }
    }

    // ------------------------------------------------------------------------
    // Gradients
    // ------------------------------------------------------------------------

    /// Queue a render for one card if it uses a gradient background.
    pub fn request_gradient(&mut self, card_id: &str, now: Instant) {
        let Some(card) = self.layout.card(card_id) else { return };
        match (&card.gradient, card.background_style()) {
            (Some(config), BackgroundStyle::Gradient) => {
                let (w, h) = card.pixel_size(&self.grid);
                self.gradients.request(card_id, config.clone(), w, h, now);
            }
            _ => self.gradients.forget(card_id),
        }
    }

    pub fn request_all_gradients(&mut self, now: Instant) {
        let ids: Vec<String> = self.cards().iter().map(|c| c.id.clone()).collect();
        for id in ids {
            self.request_gradient(&id, now);
        }
    }

    /// Advance the gradient scheduler. Returns ids whose asset changed.
    pub fn poll_gradients(&mut self, now: Instant) -> Vec<String> {
        self.gradients.poll(now)
    }

    pub fn gradients_idle(&self) -> bool {
        self.gradients.is_idle()
    }

    pub fn gradient_asset(&self, card_id: &str) -> Option<Arc<GradientAsset>> {
        self.gradients.asset(card_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GradientConfig;
    use std::time::Duration;

    fn project() -> Project {
        let settings = EditorSettings {
            gradient_debounce_ms: 0,
            gradient_quality: 1.0,
            ..EditorSettings::default()
        };
        Project::new_untitled(1, &settings)
    }

    #[test]
    fn new_project_is_clean_and_named() {
        let p = project();
        assert_eq!(p.display_title(), "Untitled-1");
        assert!(p.cards().is_empty());
        assert_eq!(p.layout.id, p.id.to_string());
    }

    #[test]
    fn add_marks_dirty() {
        let mut p = project();
        let id = p.add_card(CardSize::Wide).unwrap();
        assert!(p.is_dirty);
        assert_eq!(p.display_title(), "Untitled-1*");
        let card = p.card(&id).unwrap();
        assert_eq!((card.x, card.y), (0, 0));
        assert_eq!(card.font_size, Some(16));
    }

    #[test]
    fn hover_is_cached_per_cell() {
        let mut p = project();
        let a = p.add_card(CardSize::Square).unwrap();
        p.add_card(CardSize::Square).unwrap(); // lands at (2,0)
        p.begin_drag(&a, (10.0, 10.0)).unwrap();

        // Pointer over cell (2,0): occupied.
        let h = p.hover((32.0 + 192.0 + 10.0, 32.0 + 10.0)).unwrap();
        assert_eq!((h.x, h.y, h.valid), (2, 0, false));
        // Small movement inside the same cell returns the cached state.
        let again = p.hover((32.0 + 192.0 + 14.0, 32.0 + 12.0)).unwrap();
        assert_eq!(again, h);
        // Cell (4,0) is free.
        let free = p.hover((32.0 + 384.0 + 10.0, 32.0 + 10.0)).unwrap();
        assert_eq!((free.x, free.y, free.valid), (4, 0, true));
    }

    #[test]
    fn drop_swaps_and_ends_drag() {
        let mut p = project();
        let a = p.add_card(CardSize::Square).unwrap();
        let b = p.add_card(CardSize::Square).unwrap();
        p.begin_drag(&a, (0.0, 0.0)).unwrap();
        let kind = p.drop_at_pointer((32.0 + 192.0, 32.0)).unwrap();
        assert_eq!(kind, DropKind::Swap);
        assert!(p.drag_session().is_none());
        assert_eq!(p.card(&a).map(|c| (c.x, c.y)), Some((2, 0)));
        assert_eq!(p.card(&b).map(|c| (c.x, c.y)), Some((0, 0)));
    }

    #[test]
    fn failed_drop_leaves_cards_untouched() {
        let mut p = project();
        let a = p.add_card(CardSize::Large).unwrap();
        let before = p.cards().to_vec();
        let err = p.move_card(&a, (10, 0)).unwrap_err();
        assert!(matches!(err, PlacementError::OutOfBounds { .. }));
        assert_eq!(p.cards(), before.as_slice());
    }

    #[test]
    fn update_keeps_geometry() {
        let mut p = project();
        let a = p.add_card(CardSize::Square).unwrap();
        p.update_card(&a, Instant::now(), |c| {
            c.text = "Hello".into();
            c.x = 9;
            c.size = CardSize::Large;
        })
        .unwrap();
        let card = p.card(&a).unwrap();
        assert_eq!(card.text, "Hello");
        assert_eq!((card.x, card.size), (0, CardSize::Square));
    }

    #[test]
    fn replace_rejects_overlaps() {
        let mut p = project();
        let cards = vec![
            Card::new("x", CardSize::Large, 0, 0),
            Card::new("y", CardSize::Square, 2, 2),
        ];
        assert!(p.replace_cards(cards, Instant::now()).is_err());
        assert!(p.cards().is_empty());
    }

    #[test]
    fn save_as_names_project_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = project();
        p.add_card(CardSize::Wide).unwrap();
        assert!(p.save().is_err());

        let path = dir.path().join("landing page.bento");
        p.save_as(&path).unwrap();
        assert!(!p.is_dirty);
        assert_eq!(p.display_title(), "landing page");

        let reopened = Project::open(&path, &EditorSettings::default()).unwrap();
        assert_eq!(reopened.name, "landing page");
        assert_eq!(reopened.cards(), p.cards());
        assert_eq!(reopened.id, p.id);
        assert_eq!(reopened.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn save_writes_back_to_opened_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.json");
        let mut p = project();
        p.rename("Portfolio");
        p.save_as(&path).unwrap();
        p.rename("Portfolio");
        let id = p.add_card(CardSize::Square).unwrap();
        p.save().unwrap();

        let reopened = Project::open(&path, &EditorSettings::default()).unwrap();
        assert_eq!(reopened.to_layout().name, "Portfolio");
        assert!(reopened.card(&id).is_some());
    }

    #[test]
    fn delete_unknown_is_noop() {
        let mut p = project();
        p.add_card(CardSize::Square).unwrap();
        p.mark_clean();
        assert!(!p.delete_card("nope"));
        assert!(!p.is_dirty);
    }

    #[test]
    fn gradient_cards_get_assets() {
        let mut p = project();
        let a = p.add_card(CardSize::Square).unwrap();
        let now = Instant::now();
        p.update_card(&a, now, |c| {
            c.background_style = Some(BackgroundStyle::Gradient);
            c.gradient = Some(GradientConfig::default());
        })
        .unwrap();
        for _ in 0..2000 {
            p.poll_gradients(now);
            if p.gradients_idle() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        let asset = p.gradient_asset(&a).unwrap();
        assert_eq!((asset.width, asset.height), (176, 176));

        p.delete_card(&a);
        assert!(p.gradient_asset(&a).is_none());
    }
}
