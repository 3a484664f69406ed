//! Local media sorter: browse a folder of photos and videos, filter and
//! sort it, page thumbnails in lazily, and move files into album groups.

pub mod albums;
pub mod config;
pub mod filter;
pub mod fs;
pub mod grid;
pub mod media;
pub mod metadata;
pub mod model;
pub mod mover;
pub mod scanner;
pub mod session;
pub mod store;
pub mod thumbs;

pub use config::GridConfig;
pub use fs::{DirHandle, FileHandle, LocalFs, MediaFs};
pub use grid::{Grid, ThumbDone, ThumbRequest, Viewport};
pub use model::{AlbumEntry, FileEntry, MediaFilter, SortMode};
pub use session::Session;
pub use store::HandleStore;

/// Actions refused before touching the disk.
#[derive(Debug, thiserror::Error)]
pub enum SorterError {
    #[error("no folder open; pick one first")]
    NoRoot,
    #[error("no such file: {0}")]
    UnknownFile(String),
    #[error("no such album: {0}")]
    UnknownAlbum(String),
    #[error("name must not be empty")]
    EmptyName,
}
