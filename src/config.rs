use std::path::PathBuf;

use directories::ProjectDirs;

/// Store file name inside the data directory.
pub const STORE_FILE: &str = "file-sorter.db";
/// Environment override for the store location.
pub const STORE_ENV: &str = "LV_SORTER_DB";

/// Tunables for the incremental grid and the thumbnail pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
    /// Cells materialized per `load_more`.
    pub batch_size: usize,
    /// Edge length of a (square) thumbnail, px.
    pub thumb_size: u32,
    /// Extra margin around the viewport in which cells count as visible, px.
    pub lookahead_px: f32,
    /// Distance from the end of the content that triggers another batch, px.
    pub scroll_threshold_px: f32,
    pub video_seek_secs: f32,
    pub jpeg_quality: u8,
    pub gap_px: f32,
    /// Height of the file-name label under each thumbnail, px.
    pub label_px: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            thumb_size: 160,
            lookahead_px: 200.0,
            scroll_threshold_px: 100.0,
            video_seek_secs: 0.5,
            jpeg_quality: 75,
            gap_px: 8.0,
            label_px: 24.0,
        }
    }
}

impl GridConfig {
    /// Vertical space one grid row takes.
    pub fn row_height(&self) -> f32 {
        self.thumb_size as f32 + self.label_px + self.gap_px
    }

    /// How many cells fit side by side in a container `width` px wide.
    pub fn columns_for(&self, width: f32) -> usize {
        let cell = self.thumb_size as f32 + self.gap_px;
        ((width + self.gap_px) / cell).floor().max(1.0) as usize
    }
}

pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("dev", "lv", "lv-sorter") {
        let data = dirs.data_dir();
        if let Err(e) = std::fs::create_dir_all(data) {
            log::warn!("cannot create {}: {}", data.display(), e);
        }
        data.join(STORE_FILE)
    } else {
        PathBuf::from(STORE_FILE)
    }
}
