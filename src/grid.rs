//! Incremental thumbnail grid.
//!
//! The grid owns the displayed (filtered/sorted) list and materializes it
//! batch by batch into [`Cell`]s. Each new cell starts as a placeholder and
//! is registered with a [`VisibilityWatcher`]; the first time it comes into
//! view the grid hands out a [`ThumbRequest`], and the finished thumbnail
//! comes back through [`Grid::apply`].
//!
//! Flow:
//!   1. `reset(view)` → bump generation, drop old cells, `load_more()`
//!   2. `scroll(viewport)` → maybe `load_more()`, then poll the watcher
//!   3. `ThumbnailPool` renders requests off-thread
//!   4. `apply(done)` → swap placeholder for the result (stale = no-op)

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::GridConfig;
use crate::fs::FileHandle;
use crate::media::{self, MediaKind};
use crate::model::FileEntry;

/// Index of a cell; equal to the entry's index in the displayed list.
pub type CellId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Glyph {
    Video,
    Document,
}

impl Glyph {
    pub fn symbol(self) -> &'static str {
        match self {
            Glyph::Video => "🎥",
            Glyph::Document => "📄",
        }
    }

    /// Static stand-in for an entry we don't (or can't) decode.
    fn fallback_for(name: &str) -> Self {
        match media::kind_of(name) {
            MediaKind::Video => Glyph::Video,
            _ => Glyph::Document,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Visual {
    Placeholder,
    /// Encoded JPEG bytes.
    Thumbnail(Arc<Vec<u8>>),
    Glyph(Glyph),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellAction {
    Rename,
    Delete,
    Metadata,
    Open,
}

pub const CELL_ACTIONS: [CellAction; 4] = [
    CellAction::Rename,
    CellAction::Delete,
    CellAction::Metadata,
    CellAction::Open,
];

impl CellAction {
    pub fn title(self) -> &'static str {
        match self {
            CellAction::Rename => "Rename",
            CellAction::Delete => "Delete",
            CellAction::Metadata => "Metadata",
            CellAction::Open => "Open",
        }
    }

    /// Button face. Open plays videos and magnifies everything else.
    pub fn symbol(self, name: &str) -> &'static str {
        match self {
            CellAction::Rename => "✎",
            CellAction::Delete => "🗑",
            CellAction::Metadata => "ℹ️",
            CellAction::Open if media::is_video(name) => "▶️",
            CellAction::Open => "🔍",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Cell {
    pub entry: FileEntry,
    pub visual: Visual,
    /// Thumbnail work has been handed out for this cell.
    requested: bool,
}

impl Cell {
    pub fn actions(&self) -> [CellAction; 4] {
        CELL_ACTIONS
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }
}

/// Visible window of the scroll container, in content coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scroll_top: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(scroll_top: f32, height: f32) -> Self {
        Self { scroll_top, height }
    }
}

// ── Visibility ──────────────────────────────────────────────────────────

pub trait VisibilityWatcher {
    /// Start watching the vertical span `[top, bottom)` of `cell`.
    fn observe(&mut self, cell: CellId, top: f32, bottom: f32);
    fn unobserve(&mut self, cell: CellId);
    fn clear(&mut self);
    /// Cells that intersect the viewport. Each is reported once and then
    /// no longer watched.
    fn poll(&mut self, viewport: Viewport) -> Vec<CellId>;
}

/// Watches vertical spans against a viewport grown by `margin` px on both sides.
#[derive(Debug, Default)]
pub struct RegionWatcher {
    margin: f32,
    observed: BTreeMap<CellId, (f32, f32)>,
}

impl RegionWatcher {
    pub fn new(margin: f32) -> Self {
        Self {
            margin,
            observed: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }
}

impl VisibilityWatcher for RegionWatcher {
    fn observe(&mut self, cell: CellId, top: f32, bottom: f32) {
        self.observed.insert(cell, (top, bottom));
    }

    fn unobserve(&mut self, cell: CellId) {
        self.observed.remove(&cell);
    }

    fn clear(&mut self) {
        self.observed.clear();
    }

    fn poll(&mut self, viewport: Viewport) -> Vec<CellId> {
        let lo = viewport.scroll_top - self.margin;
        let hi = viewport.scroll_top + viewport.height + self.margin;
        let hits: Vec<CellId> = self
            .observed
            .iter()
            .filter(|(_, span)| span.1 > lo && span.0 < hi)
            .map(|(&id, _)| id)
            .collect();
        for id in &hits {
            self.observed.remove(id);
        }
        hits
    }
}

// ── Thumbnail work items ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThumbPlan {
    /// Grab a frame a little way into the video.
    VideoFrame,
    Image,
}

#[derive(Clone, Debug)]
pub struct ThumbRequest {
    pub cell: CellId,
    pub generation: u64,
    pub file: FileHandle,
    pub plan: ThumbPlan,
    pub size: u32,
}

#[derive(Debug)]
pub struct ThumbDone {
    pub cell: CellId,
    pub generation: u64,
    /// Encoded JPEG on success.
    pub result: anyhow::Result<Vec<u8>>,
}

/// Decode strategy for a file of the given MIME type, or the glyph to show
/// instead when there is nothing to decode.
pub fn plan_for(mime: &str) -> Result<ThumbPlan, Glyph> {
    if media::is_video_mime(mime) {
        if media::is_playable_mime(mime) {
            Ok(ThumbPlan::VideoFrame)
        } else {
            Err(Glyph::Video)
        }
    } else if media::is_image_mime(mime) {
        Ok(ThumbPlan::Image)
    } else {
        Err(Glyph::Document)
    }
}

// ── Layout ──────────────────────────────────────────────────────────────

/// Fixed-size cells flowing left to right; cell `i` sits on row `i / columns`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLayout {
    pub columns: usize,
    pub row_height: f32,
    /// Height of the cell itself (thumbnail + label), without the gap.
    pub cell_height: f32,
}

impl GridLayout {
    pub fn new(config: &GridConfig, width: f32) -> Self {
        Self {
            columns: config.columns_for(width),
            row_height: config.row_height(),
            cell_height: config.thumb_size as f32 + config.label_px,
        }
    }

    /// Vertical span `[top, bottom)` of cell `id`.
    pub fn span(&self, id: CellId) -> (f32, f32) {
        let top = (id / self.columns) as f32 * self.row_height;
        (top, top + self.cell_height)
    }

    /// Scroll height of `count` cells.
    pub fn height_of(&self, count: usize) -> f32 {
        count.div_ceil(self.columns) as f32 * self.row_height
    }
}

// ── Grid ────────────────────────────────────────────────────────────────

pub struct Grid<W: VisibilityWatcher = RegionWatcher> {
    config: GridConfig,
    layout: GridLayout,
    watcher: W,
    displayed: Vec<FileEntry>,
    cells: Vec<Cell>,
    /// Insertion-ordered selection.
    selection: Vec<FileHandle>,
    /// Bumped on every reset; completions from older generations are ignored.
    generation: u64,
}

impl Grid<RegionWatcher> {
    pub fn new(config: GridConfig, width: f32) -> Self {
        let watcher = RegionWatcher::new(config.lookahead_px);
        let layout = GridLayout::new(&config, width);
        Self::with_watcher(config, layout, watcher)
    }
}

impl<W: VisibilityWatcher> Grid<W> {
    pub fn with_watcher(mut config: GridConfig, mut layout: GridLayout, watcher: W) -> Self {
        config.batch_size = config.batch_size.max(1);
        layout.columns = layout.columns.max(1);
        Self {
            config,
            layout,
            watcher,
            displayed: Vec::new(),
            cells: Vec::new(),
            selection: Vec::new(),
            generation: 0,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn displayed(&self) -> &[FileEntry] {
        &self.displayed
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// Number of entries materialized so far.
    pub fn loaded(&self) -> usize {
        self.cells.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    /// Replace the displayed list and start over with one batch.
    pub fn reset(&mut self, view: Vec<FileEntry>) -> usize {
        self.generation += 1;
        self.watcher.clear();
        self.cells.clear();
        self.selection.clear();
        self.displayed = view;
        self.load_more()
    }

    /// Materialize the next batch. Returns how many cells were appended;
    /// 0 once everything is loaded.
    pub fn load_more(&mut self) -> usize {
        let start = self.cells.len();
        let end = (start + self.config.batch_size).min(self.displayed.len());
        for id in start..end {
            self.cells.push(Cell {
                entry: self.displayed[id].clone(),
                visual: Visual::Placeholder,
                requested: false,
            });
            let (top, bottom) = self.layout.span(id);
            self.watcher.observe(id, top, bottom);
        }
        let added = end.saturating_sub(start);
        if added > 0 {
            log::debug!(
                "grid: loaded {}..{} of {} (gen {})",
                start,
                end,
                self.displayed.len(),
                self.generation
            );
        }
        added
    }

    /// Relayout for a new container width. Cells still waiting for their
    /// first visibility are re-registered at their new positions.
    pub fn set_width(&mut self, width: f32) {
        let layout = GridLayout::new(&self.config, width);
        if layout == self.layout {
            return;
        }
        self.layout = layout;
        self.watcher.clear();
        for id in 0..self.cells.len() {
            if !self.cells[id].requested {
                let (top, bottom) = self.layout.span(id);
                self.watcher.observe(id, top, bottom);
            }
        }
    }

    /// Scroll height of the materialized cells.
    pub fn content_height(&self) -> f32 {
        self.layout.height_of(self.cells.len())
    }

    /// Handle a scroll: near the end, load another batch; then report the
    /// cells that just became visible.
    pub fn scroll(&mut self, viewport: Viewport) -> Vec<ThumbRequest> {
        let bottom = viewport.scroll_top + viewport.height;
        if bottom >= self.content_height() - self.config.scroll_threshold_px {
            self.load_more();
        }
        self.visible(viewport)
    }

    /// Poll the watcher. Cells with nothing to decode get their glyph right
    /// away; the rest come back as requests.
    pub fn visible(&mut self, viewport: Viewport) -> Vec<ThumbRequest> {
        let mut requests = Vec::new();
        for id in self.watcher.poll(viewport) {
            let Some(cell) = self.cells.get_mut(id) else {
                continue;
            };
            if cell.requested {
                continue;
            }
            cell.requested = true;
            match plan_for(media::mime_for(&cell.entry.name)) {
                Ok(plan) => requests.push(ThumbRequest {
                    cell: id,
                    generation: self.generation,
                    file: cell.entry.handle.clone(),
                    plan,
                    size: self.config.thumb_size,
                }),
                Err(glyph) => cell.visual = Visual::Glyph(glyph),
            }
        }
        requests
    }

    /// Swap a placeholder for its finished thumbnail. Returns false (and
    /// changes nothing) for completions from an older generation, unknown
    /// cells, or cells that already have their final visual. A failed
    /// decode shows the fallback glyph.
    pub fn apply(&mut self, done: ThumbDone) -> bool {
        if done.generation != self.generation {
            log::debug!(
                "grid: dropping stale thumb for cell {} (gen {} != {})",
                done.cell,
                done.generation,
                self.generation
            );
            return false;
        }
        let Some(cell) = self.cells.get_mut(done.cell) else {
            return false;
        };
        if cell.visual != Visual::Placeholder {
            return false;
        }
        cell.visual = match done.result {
            Ok(bytes) => Visual::Thumbnail(Arc::new(bytes)),
            Err(e) => {
                log::debug!("grid: thumb failed for {}: {:#}", cell.entry.name, e);
                Visual::Glyph(Glyph::fallback_for(&cell.entry.name))
            }
        };
        true
    }

    // ── Selection & drag ────────────────────────────────────────────────

    /// Plain click selects only `id`; a modifier click toggles it.
    /// Returns false if there is no such cell.
    pub fn click(&mut self, id: CellId, modifier: bool) -> bool {
        let Some(cell) = self.cells.get(id) else {
            return false;
        };
        let handle = cell.entry.handle.clone();
        if modifier {
            if let Some(pos) = self.selection.iter().position(|h| *h == handle) {
                self.selection.remove(pos);
            } else {
                self.selection.push(handle);
            }
        } else {
            self.selection.clear();
            self.selection.push(handle);
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: CellId) -> bool {
        self.cells
            .get(id)
            .is_some_and(|c| self.selection.contains(&c.entry.handle))
    }

    /// Selected entries in selection order.
    pub fn selected(&self) -> Vec<&FileEntry> {
        self.selection
            .iter()
            .filter_map(|h| self.cells.iter().find(|c| c.entry.handle == *h))
            .map(|c| &c.entry)
            .collect()
    }

    /// Names carried by a drag starting on `id`: the whole selection when
    /// `id` is part of it, otherwise just `id`.
    pub fn drag_names(&self, id: CellId) -> Option<Vec<String>> {
        let cell = self.cells.get(id)?;
        if self.selection.contains(&cell.entry.handle) {
            Some(self.selected().iter().map(|e| e.name.clone()).collect())
        } else {
            Some(vec![cell.entry.name.clone()])
        }
    }

    /// [`Grid::drag_names`] serialized as a JSON array.
    pub fn drag_payload(&self, id: CellId) -> Option<String> {
        let names = self.drag_names(id)?;
        serde_json::to_string(&names).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::DirHandle;

    fn entry(name: &str) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            handle: FileHandle::new(format!("/root/{}", name)),
            parent: DirHandle::new("/root"),
            date: 0,
        }
    }

    fn files(n: usize) -> Vec<FileEntry> {
        (0..n).map(|i| entry(&format!("img{:03}.jpg", i))).collect()
    }

    fn config(batch: usize) -> GridConfig {
        GridConfig {
            batch_size: batch,
            thumb_size: 100,
            label_px: 0.0,
            gap_px: 0.0,
            lookahead_px: 0.0,
            scroll_threshold_px: 100.0,
            ..GridConfig::default()
        }
    }

    /// One column, 100 px rows, no margin: cell i spans [100i, 100i+100).
    fn grid(batch: usize) -> Grid {
        Grid::new(config(batch), 100.0)
    }

    fn ok(cell: CellId, generation: u64) -> ThumbDone {
        ThumbDone {
            cell,
            generation,
            result: Ok(vec![0xFF, 0xD8]),
        }
    }

    // ── batching ────────────────────────────────────────────────────────

    #[test]
    fn load_more_appends_min_of_batch_and_remaining() {
        let mut g = grid(4);
        assert_eq!(g.reset(files(10)), 4);
        assert_eq!(g.load_more(), 4);
        assert_eq!(g.load_more(), 2);
        assert_eq!(g.loaded(), 10);
        assert_eq!(g.load_more(), 0);
        assert_eq!(g.loaded(), 10);
    }

    #[test]
    fn ceil_n_over_b_calls_load_everything() {
        for (n, b) in [(0usize, 3usize), (1, 3), (3, 3), (7, 3), (50, 7)] {
            let mut g = grid(b);
            g.reset(files(n));
            let mut calls = 1;
            while g.loaded() < n {
                g.load_more();
                calls += 1;
            }
            assert_eq!(calls, n.div_ceil(b).max(1), "n={} b={}", n, b);
            assert_eq!(g.load_more(), 0);
        }
    }

    #[test]
    fn zero_batch_still_makes_progress() {
        let mut g = grid(0);
        assert_eq!(g.config().batch_size, 1);
        assert_eq!(g.reset(files(3)), 1);
        assert_eq!(g.load_more(), 1);
        assert_eq!(g.load_more(), 1);
        assert_eq!(g.load_more(), 0);
    }

    #[test]
    fn reset_clears_cells_selection_and_bumps_generation() {
        let mut g = grid(5);
        g.reset(files(8));
        g.load_more();
        g.click(1, false);
        let gen = g.generation();

        g.reset(files(3));
        assert_eq!(g.loaded(), 3);
        assert_eq!(g.displayed().len(), 3);
        assert!(g.selected().is_empty());
        assert_eq!(g.generation(), gen + 1);
        assert_eq!(g.watcher().len(), 3);
    }

    #[test]
    fn cells_carry_all_actions() {
        let mut g = grid(2);
        g.reset(vec![entry("a.jpg"), entry("b.mp4")]);
        let cell = g.cell(1).unwrap();
        assert_eq!(cell.actions(), CELL_ACTIONS);
        assert_eq!(CellAction::Open.symbol("b.mp4"), "▶️");
        assert_eq!(CellAction::Open.symbol("a.jpg"), "🔍");
        assert_eq!(CellAction::Metadata.title(), "Metadata");
        assert_eq!(cell.visual, Visual::Placeholder);
    }

    // ── infinite scroll ─────────────────────────────────────────────────

    #[test]
    fn scroll_near_end_loads_next_batch() {
        let mut g = grid(5);
        g.reset(files(12));
        assert_eq!(g.content_height(), 500.0);

        // Far from the end: nothing new.
        g.scroll(Viewport::new(0.0, 200.0));
        assert_eq!(g.loaded(), 5);

        // Within 100 px of the end.
        g.scroll(Viewport::new(250.0, 200.0));
        assert_eq!(g.loaded(), 10);

        g.scroll(Viewport::new(800.0, 200.0));
        assert_eq!(g.loaded(), 12);
        g.scroll(Viewport::new(1000.0, 200.0));
        assert_eq!(g.loaded(), 12);
    }

    // ── lazy visibility ─────────────────────────────────────────────────

    #[test]
    fn visible_cells_requested_exactly_once() {
        let mut g = grid(10);
        g.reset(files(10));

        let first = g.visible(Viewport::new(0.0, 250.0));
        let ids: Vec<CellId> = first.iter().map(|r| r.cell).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(first.iter().all(|r| r.plan == ThumbPlan::Image));
        assert!(first.iter().all(|r| r.size == 100));

        // Same viewport again: already unregistered.
        assert!(g.visible(Viewport::new(0.0, 250.0)).is_empty());

        let next = g.visible(Viewport::new(150.0, 250.0));
        let ids: Vec<CellId> = next.iter().map(|r| r.cell).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn lookahead_margin_extends_viewport() {
        let mut cfg = config(10);
        cfg.lookahead_px = 200.0;
        let mut g = Grid::new(cfg, 100.0);
        g.reset(files(10));
        let ids: Vec<CellId> = g
            .visible(Viewport::new(0.0, 100.0))
            .iter()
            .map(|r| r.cell)
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn glyph_cells_resolved_without_request() {
        let mut g = grid(10);
        g.reset(vec![
            entry("notes.txt"),
            entry("old.avi"),
            entry("clip.mp4"),
            entry("pic.png"),
        ]);
        let reqs = g.visible(Viewport::new(0.0, 400.0));
        let plans: Vec<(CellId, ThumbPlan)> = reqs.iter().map(|r| (r.cell, r.plan)).collect();
        assert_eq!(plans, vec![(2, ThumbPlan::VideoFrame), (3, ThumbPlan::Image)]);
        assert_eq!(g.cell(0).unwrap().visual, Visual::Glyph(Glyph::Document));
        assert_eq!(g.cell(1).unwrap().visual, Visual::Glyph(Glyph::Video));
        assert_eq!(g.cell(2).unwrap().visual, Visual::Placeholder);
    }

    #[test]
    fn plan_for_mime() {
        assert_eq!(plan_for("video/mp4"), Ok(ThumbPlan::VideoFrame));
        assert_eq!(plan_for("video/x-ms-wmv"), Err(Glyph::Video));
        assert_eq!(plan_for("image/jpeg"), Ok(ThumbPlan::Image));
        assert_eq!(plan_for(""), Err(Glyph::Document));
        assert_eq!(plan_for("application/pdf"), Err(Glyph::Document));
    }

    #[test]
    fn relayout_reobserves_pending_cells() {
        let mut g = Grid::new(config(6), 100.0);
        g.reset(files(6));
        g.visible(Viewport::new(0.0, 100.0)); // cell 0 handed out
        g.set_width(300.0); // 3 columns: cells 1..=2 now on row 0
        assert_eq!(g.layout().columns, 3);
        let ids: Vec<CellId> = g
            .visible(Viewport::new(0.0, 100.0))
            .iter()
            .map(|r| r.cell)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn layout_spans_and_height() {
        let cfg = GridConfig {
            thumb_size: 100,
            label_px: 20.0,
            gap_px: 10.0,
            ..GridConfig::default()
        };
        let layout = GridLayout::new(&cfg, 330.0);
        assert_eq!(layout.columns, 3);
        assert_eq!(layout.span(0), (0.0, 120.0));
        assert_eq!(layout.span(2), (0.0, 120.0));
        assert_eq!(layout.span(3), (130.0, 250.0));
        assert_eq!(layout.height_of(0), 0.0);
        assert_eq!(layout.height_of(4), 260.0);
    }

    /// Reports whatever the test pushes, if still observed.
    #[derive(Default)]
    struct Manual {
        observed: Vec<CellId>,
        next: Vec<CellId>,
    }

    impl VisibilityWatcher for Manual {
        fn observe(&mut self, cell: CellId, _: f32, _: f32) {
            self.observed.push(cell);
        }
        fn unobserve(&mut self, cell: CellId) {
            self.observed.retain(|c| *c != cell);
        }
        fn clear(&mut self) {
            self.observed.clear();
        }
        fn poll(&mut self, _: Viewport) -> Vec<CellId> {
            let hits: Vec<CellId> = self
                .next
                .drain(..)
                .filter(|c| self.observed.contains(c))
                .collect();
            for c in &hits {
                self.unobserve(*c);
            }
            hits
        }
    }

    #[test]
    fn custom_watcher_drives_requests() {
        let cfg = config(4);
        let layout = GridLayout::new(&cfg, 100.0);
        let mut g = Grid::with_watcher(cfg, layout, Manual::default());
        g.reset(files(4));
        assert_eq!(g.watcher().observed, vec![0, 1, 2, 3]);

        g.watcher.next = vec![3, 1];
        let ids: Vec<CellId> = g
            .visible(Viewport::new(0.0, 0.0))
            .iter()
            .map(|r| r.cell)
            .collect();
        assert_eq!(ids, vec![3, 1]);
        g.watcher.next = vec![3];
        assert!(g.visible(Viewport::new(0.0, 0.0)).is_empty());
    }

    // ── completion ──────────────────────────────────────────────────────

    #[test]
    fn apply_swaps_placeholder_once() {
        let mut g = grid(3);
        g.reset(files(3));
        let reqs = g.visible(Viewport::new(0.0, 100.0));
        let gen = reqs[0].generation;

        assert!(g.apply(ok(0, gen)));
        assert!(matches!(g.cell(0).unwrap().visual, Visual::Thumbnail(_)));
        assert!(!g.apply(ok(0, gen)), "second completion is ignored");
    }

    #[test]
    fn stale_generation_is_noop() {
        let mut g = grid(3);
        g.reset(files(3));
        let reqs = g.visible(Viewport::new(0.0, 100.0));
        let old_gen = reqs[0].generation;

        g.reset(files(3));
        assert!(!g.apply(ok(0, old_gen)));
        assert_eq!(g.cell(0).unwrap().visual, Visual::Placeholder);
    }

    #[test]
    fn unknown_cell_is_noop() {
        let mut g = grid(3);
        g.reset(files(1));
        assert!(!g.apply(ok(7, g.generation())));
    }

    #[test]
    fn decode_failure_falls_back_to_glyph() {
        let mut g = grid(3);
        g.reset(vec![entry("broken.jpg"), entry("broken.mp4")]);
        let gen = g.generation();
        for cell in 0..2 {
            assert!(g.apply(ThumbDone {
                cell,
                generation: gen,
                result: Err(anyhow::anyhow!("decode failed")),
            }));
        }
        assert_eq!(g.cell(0).unwrap().visual, Visual::Glyph(Glyph::Document));
        assert_eq!(g.cell(1).unwrap().visual, Visual::Glyph(Glyph::Video));
    }

    // ── selection & drag ────────────────────────────────────────────────

    #[test]
    fn plain_click_replaces_selection() {
        let mut g = grid(5);
        g.reset(files(5));
        g.click(0, false);
        g.click(2, false);
        assert!(!g.is_selected(0));
        assert!(g.is_selected(2));
        assert_eq!(g.selected().len(), 1);
    }

    #[test]
    fn modifier_click_toggles() {
        let mut g = grid(5);
        g.reset(files(5));
        g.click(0, false);
        g.click(3, true);
        g.click(1, true);
        assert_eq!(
            g.selected().iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["img000.jpg", "img003.jpg", "img001.jpg"]
        );
        g.click(3, true);
        assert!(!g.is_selected(3));
        assert_eq!(g.selected().len(), 2);
        assert!(!g.click(42, false));
    }

    #[test]
    fn drag_selected_carries_whole_selection() {
        let mut g = grid(5);
        g.reset(files(5));
        g.click(1, false);
        g.click(4, true);
        assert_eq!(
            g.drag_payload(4).unwrap(),
            r#"["img001.jpg","img004.jpg"]"#
        );
    }

    #[test]
    fn drag_unselected_carries_only_itself() {
        let mut g = grid(5);
        g.reset(files(5));
        g.click(1, false);
        assert_eq!(g.drag_names(2).unwrap(), vec!["img002.jpg"]);
        assert!(g.drag_payload(99).is_none());
    }
}
