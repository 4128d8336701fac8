// ============================================================================
// PLACEMENT ENGINE — auto-placement, drag hover, drop resolution, resize
// ============================================================================
//
// Every operation takes the current card collection by reference and either
// returns a complete replacement collection or a `PlacementError`. The input
// is never mutated, so a rejected operation is a no-op for the caller.
//
// Drop resolution escalates through an ordered list of `DropStrategy`s:
//   - Swap:       1:1 exchange with a single same-span card
//   - Shift:      push colliding cards out of the way along the drag delta
//   - Rearrange:  pack colliding cards into the dragged card's vacated area
// Each candidate is validated against the whole-layout invariant before it
// can be accepted.
// ============================================================================

use std::collections::HashMap;

use crate::grid::{self, GridConfig};
use crate::model::{Card, CardSize};
use crate::{log_info, log_warn};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Target cell puts the card (partly) outside the grid.
    OutOfBounds { x: i32, y: i32 },
    /// Every drop strategy failed to produce a valid arrangement.
    Blocked { x: i32, y: i32 },
    /// No free cell exists anywhere for this size.
    NoSpace(CardSize),
    UnknownCard(String),
}

impl std::fmt::Display for PlacementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlacementError::OutOfBounds { x, y } => {
                write!(f, "Position ({}, {}) is outside the grid", x, y)
            }
            PlacementError::Blocked { x, y } => {
                write!(f, "Cannot drop at ({}, {}): not enough space to rearrange", x, y)
            }
            PlacementError::NoSpace(size) => {
                write!(f, "No space available for a {} card", size)
            }
            PlacementError::UnknownCard(id) => write!(f, "No card with id '{}'", id),
        }
    }
}

impl std::error::Error for PlacementError {}

// ============================================================================
// INVARIANT + SEARCH
// ============================================================================

/// True when every card lies inside the grid and no two cards overlap.
pub fn validate_layout(cards: &[Card], grid: &GridConfig) -> bool {
    if cards
        .iter()
        .any(|c| !grid::is_valid_position(c.x, c.y, c.size, grid.cols, grid.rows))
    {
        return false;
    }
    for i in 0..cards.len() {
        for j in (i + 1)..cards.len() {
            if grid::collides(&cards[i], &cards[j]) {
                return false;
            }
        }
    }
    true
}

/// Row-major first fit: smallest `y`, then smallest `x`, where a card of
/// `size` is in bounds and overlaps none of `cards` (ignoring `exclude`).
pub fn find_empty_spot(
    cards: &[Card],
    size: CardSize,
    grid: &GridConfig,
    exclude: &[&str],
) -> Option<(i32, i32)> {
    for y in 0..grid.rows {
        for x in 0..grid.cols {
            if !grid::is_valid_position(x, y, size, grid.cols, grid.rows) {
                continue;
            }
            let blocked = cards
                .iter()
                .filter(|c| !exclude.contains(&c.id.as_str()))
                .any(|c| grid::rects_collide((x, y, size), (c.x, c.y, c.size)));
            if !blocked {
                return Some((x, y));
            }
        }
    }
    None
}

fn index_of(cards: &[Card], id: &str) -> Result<usize, PlacementError> {
    cards
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| PlacementError::UnknownCard(id.to_string()))
}

/// Copy of `cards` with the listed cards moved; order is preserved.
fn with_positions(cards: &[Card], moves: &HashMap<&str, (i32, i32)>) -> Vec<Card> {
    cards
        .iter()
        .map(|c| match moves.get(c.id.as_str()) {
            Some(&(x, y)) => c.moved_to(x, y),
            None => c.clone(),
        })
        .collect()
}

// ============================================================================
// ADD / DELETE
// ============================================================================

/// Place `card` at the first free cell for its size and append it.
pub fn add_card(cards: &[Card], card: Card, grid: &GridConfig) -> Result<Vec<Card>, PlacementError> {
    let Some((x, y)) = find_empty_spot(cards, card.size, grid, &[]) else {
        log_info!("add: canvas full for {} card", card.size);
        return Err(PlacementError::NoSpace(card.size));
    };
    let mut next = cards.to_vec();
    next.push(card.moved_to(x, y));
    Ok(next)
}

/// Remove a card by id. Unknown ids leave the collection as it was.
pub fn delete_card(cards: &[Card], id: &str) -> Vec<Card> {
    cards.iter().filter(|c| c.id != id).cloned().collect()
}

// ============================================================================
// DRAG HOVER
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HoverState {
    pub x: i32,
    pub y: i32,
    pub valid: bool,
}

/// Grid cell under the dragged card, from canvas-relative pointer pixels.
pub fn hover_cell(
    pointer: (f64, f64),
    grab_offset: (f64, f64),
    canvas_padding: f64,
    grid: &GridConfig,
) -> (i32, i32) {
    let px = pointer.0 - grab_offset.0 - canvas_padding;
    let py = pointer.1 - grab_offset.1 - canvas_padding;
    (
        grid::snap_to_grid(px, grid.cell_size, grid.gap),
        grid::snap_to_grid(py, grid.cell_size, grid.gap),
    )
}

/// Whether `dragged` could sit at `(x, y)` without displacing anyone.
pub fn is_free_for(cards: &[Card], dragged: &Card, x: i32, y: i32, grid: &GridConfig) -> bool {
    if !grid::is_valid_position(x, y, dragged.size, grid.cols, grid.rows) {
        return false;
    }
    cards
        .iter()
        .filter(|c| c.id != dragged.id)
        .all(|c| !grid::rects_collide((x, y, dragged.size), (c.x, c.y, c.size)))
}

/// Advisory hover feedback. Never changes anything.
pub fn hover(
    cards: &[Card],
    dragged: &Card,
    pointer: (f64, f64),
    grab_offset: (f64, f64),
    canvas_padding: f64,
    grid: &GridConfig,
) -> HoverState {
    let (x, y) = hover_cell(pointer, grab_offset, canvas_padding, grid);
    HoverState {
        x,
        y,
        valid: is_free_for(cards, dragged, x, y, grid),
    }
}

// ============================================================================
// DROP STRATEGIES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropKind {
    Move,
    Swap,
    Shift,
    Rearrange,
}

/// Inputs shared by every strategy for one drop.
pub struct DropContext<'a> {
    pub cards: &'a [Card],
    /// The dragged card at its original position.
    pub dragged: &'a Card,
    pub target: (i32, i32),
    /// Other cards overlapping the dragged card at `target`, in collection order.
    pub colliding: Vec<&'a Card>,
    pub grid: &'a GridConfig,
}

pub trait DropStrategy: Sync {
    fn kind(&self) -> DropKind;

    /// Candidate collection, or `None` when the strategy doesn't apply.
    /// Candidates are validated by the caller.
    fn propose(&self, ctx: &DropContext<'_>) -> Option<Vec<Card>>;
}

/// Exchange positions with the single colliding card when spans match.
pub struct SwapStrategy;

impl DropStrategy for SwapStrategy {
    fn kind(&self) -> DropKind {
        DropKind::Swap
    }

    fn propose(&self, ctx: &DropContext<'_>) -> Option<Vec<Card>> {
        let [other] = ctx.colliding.as_slice() else {
            return None;
        };
        if other.dimensions() != ctx.dragged.dimensions() {
            return None;
        }
        let mut moves = HashMap::new();
        moves.insert(ctx.dragged.id.as_str(), ctx.target);
        moves.insert(other.id.as_str(), (ctx.dragged.x, ctx.dragged.y));
        Some(with_positions(ctx.cards, &moves))
    }
}

/// Push colliding cards against the drag direction.
///
/// Moving left shifts them right by the dragged width, moving right sends
/// them to the dragged card's old column; the vertical axis works the same
/// way with heights and rows.
pub struct ShiftStrategy;

impl DropStrategy for ShiftStrategy {
    fn kind(&self) -> DropKind {
        DropKind::Shift
    }

    fn propose(&self, ctx: &DropContext<'_>) -> Option<Vec<Card>> {
        let (dw, dh) = ctx.dragged.dimensions();
        let dx = ctx.target.0.saturating_sub(ctx.dragged.x);
        let dy = ctx.target.1.saturating_sub(ctx.dragged.y);

        let mut moves = HashMap::new();
        moves.insert(ctx.dragged.id.as_str(), ctx.target);

        for card in &ctx.colliding {
            let nx = if dx < 0 {
                card.x.saturating_add(dw)
            } else if dx > 0 {
                ctx.dragged.x
            } else {
                card.x
            };
            let ny = if dy < 0 {
                card.y.saturating_add(dh)
            } else if dy > 0 {
                ctx.dragged.y
            } else {
                card.y
            };
            if !grid::is_valid_position(nx, ny, card.size, ctx.grid.cols, ctx.grid.rows) {
                return None;
            }
            moves.insert(card.id.as_str(), (nx, ny));
        }

        Some(with_positions(ctx.cards, &moves))
    }
}

/// A free rectangle expressed as a card-sized slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FreeRegion {
    x: i32,
    y: i32,
    size: CardSize,
}

impl FreeRegion {
    fn fits(&self, card: &Card, grid: &GridConfig) -> bool {
        let (cw, ch) = card.dimensions();
        let (rw, rh) = self.size.dimensions();
        grid::is_valid_position(self.x, self.y, card.size, grid.cols, grid.rows)
            && cw <= rw
            && ch <= rh
    }

    /// Space left after `used` is placed at this region's origin: a strip to
    /// the right (full region height) and a strip below (used width). Strips
    /// that aren't exactly a catalog size are dropped.
    fn leftovers(&self, used: CardSize) -> Vec<FreeRegion> {
        let (rw, rh) = self.size.dimensions();
        let (uw, uh) = used.dimensions();
        let mut out = Vec::with_capacity(2);

        let remaining_w = rw - uw;
        if remaining_w >= 2
            && let Some(size) = grid::size_from_dimensions(remaining_w, rh)
        {
            out.push(FreeRegion {
                x: self.x.saturating_add(uw),
                y: self.y,
                size,
            });
        }

        let remaining_h = rh - uh;
        if remaining_h >= 2
            && let Some(size) = grid::size_from_dimensions(uw, remaining_h)
        {
            out.push(FreeRegion {
                x: self.x,
                y: self.y.saturating_add(uh),
                size,
            });
        }

        out
    }
}

/// Pack colliding cards into the dragged card's vacated rectangle, falling
/// back to a global first-fit scan for cards that don't fit there.
pub struct RearrangeStrategy;

impl DropStrategy for RearrangeStrategy {
    fn kind(&self) -> DropKind {
        DropKind::Rearrange
    }

    fn propose(&self, ctx: &DropContext<'_>) -> Option<Vec<Card>> {
        let mut regions = vec![FreeRegion {
            x: ctx.dragged.x,
            y: ctx.dragged.y,
            size: ctx.dragged.size,
        }];

        let mut involved: Vec<&str> = Vec::with_capacity(ctx.colliding.len() + 1);
        involved.push(ctx.dragged.id.as_str());
        involved.extend(ctx.colliding.iter().map(|c| c.id.as_str()));

        let mut moves = HashMap::new();
        moves.insert(ctx.dragged.id.as_str(), ctx.target);

        for card in &ctx.colliding {
            if let Some(i) = regions.iter().position(|r| r.fits(card, ctx.grid)) {
                let region = regions.remove(i);
                moves.insert(card.id.as_str(), (region.x, region.y));
                regions.extend(region.leftovers(card.size));
                continue;
            }

            let spot = find_empty_spot(ctx.cards, card.size, ctx.grid, &involved)?;
            moves.insert(card.id.as_str(), spot);
        }

        Some(with_positions(ctx.cards, &moves))
    }
}

/// Strategies in escalation order.
pub static DEFAULT_STRATEGIES: [&dyn DropStrategy; 3] =
    [&SwapStrategy, &ShiftStrategy, &RearrangeStrategy];

// ============================================================================
// DROP
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct DropOutcome {
    pub cards: Vec<Card>,
    pub kind: DropKind,
}

/// Drop card `dragged_id` at grid cell `target` using the default strategies.
pub fn drop_card(
    cards: &[Card],
    dragged_id: &str,
    target: (i32, i32),
    grid: &GridConfig,
) -> Result<DropOutcome, PlacementError> {
    drop_card_with(cards, dragged_id, target, grid, &DEFAULT_STRATEGIES)
}

pub fn drop_card_with(
    cards: &[Card],
    dragged_id: &str,
    target: (i32, i32),
    grid: &GridConfig,
    strategies: &[&dyn DropStrategy],
) -> Result<DropOutcome, PlacementError> {
    let idx = index_of(cards, dragged_id)?;
    let dragged = &cards[idx];
    let (tx, ty) = target;

    if !grid::is_valid_position(tx, ty, dragged.size, grid.cols, grid.rows) {
        return Err(PlacementError::OutOfBounds { x: tx, y: ty });
    }

    let colliding: Vec<&Card> = cards
        .iter()
        .filter(|c| c.id != dragged.id)
        .filter(|c| grid::rects_collide((tx, ty, dragged.size), (c.x, c.y, c.size)))
        .collect();

    if colliding.is_empty() {
        let mut moves = HashMap::new();
        moves.insert(dragged.id.as_str(), target);
        let next = with_positions(cards, &moves);
        if validate_layout(&next, grid) {
            return Ok(DropOutcome {
                cards: next,
                kind: DropKind::Move,
            });
        }
        log_warn!("drop: direct move of '{}' produced an invalid layout", dragged.id);
        return Err(PlacementError::Blocked { x: tx, y: ty });
    }

    let ctx = DropContext {
        cards,
        dragged,
        target,
        colliding,
        grid,
    };

    for strategy in strategies {
        let Some(candidate) = strategy.propose(&ctx) else {
            continue;
        };
        if validate_layout(&candidate, grid) {
            log_info!(
                "drop: '{}' -> ({}, {}) resolved by {:?}",
                dragged.id,
                tx,
                ty,
                strategy.kind()
            );
            return Ok(DropOutcome {
                cards: candidate,
                kind: strategy.kind(),
            });
        }
    }

    log_info!(
        "drop: '{}' -> ({}, {}) rejected, {} colliding card(s)",
        dragged.id,
        tx,
        ty,
        ctx.colliding.len()
    );
    Err(PlacementError::Blocked { x: tx, y: ty })
}

// ============================================================================
// RESIZE
// ============================================================================

/// Resize in place when possible, else move the card to the first cell that
/// fits the new size. Never displaces other cards.
pub fn resize_card(
    cards: &[Card],
    id: &str,
    new_size: CardSize,
    grid: &GridConfig,
) -> Result<Vec<Card>, PlacementError> {
    let idx = index_of(cards, id)?;
    let card = &cards[idx];

    let in_place = grid::is_valid_position(card.x, card.y, new_size, grid.cols, grid.rows)
        && cards
            .iter()
            .filter(|c| c.id != card.id)
            .all(|c| !grid::rects_collide((card.x, card.y, new_size), (c.x, c.y, c.size)));

    let (x, y) = if in_place {
        (card.x, card.y)
    } else {
        match find_empty_spot(cards, new_size, grid, &[card.id.as_str()]) {
            Some(spot) => spot,
            None => {
                log_info!("resize: no room for '{}' as {}", card.id, new_size);
                return Err(PlacementError::NoSpace(new_size));
            }
        }
    };

    let mut next = cards.to_vec();
    next[idx] = card.resized(new_size, x, y);
    Ok(next)
}
