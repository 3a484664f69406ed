use std::fmt;
use std::str::FromStr;

use crate::fs::{DirHandle, FileHandle};

/// One scanned file. Stale as soon as the file is renamed, moved or deleted;
/// a rescan is the only way to refresh it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub handle: FileHandle,
    /// Directory the file was found in.
    pub parent: DirHandle,
    /// Last-modified time, milliseconds since the Unix epoch.
    pub date: i64,
}

/// A first-level subdirectory of the root and the names of its own subdirectories.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumEntry {
    pub name: String,
    pub handle: DirHandle,
    pub groups: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MediaFilter {
    #[default]
    All,
    Photos,
    Videos,
}

impl MediaFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaFilter::All => "all",
            MediaFilter::Photos => "photos",
            MediaFilter::Videos => "videos",
        }
    }
}

impl FromStr for MediaFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(MediaFilter::All),
            "photos" => Ok(MediaFilter::Photos),
            "videos" => Ok(MediaFilter::Videos),
            other => Err(format!("unknown media filter: {}", other)),
        }
    }
}

impl fmt::Display for MediaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortMode {
    Alpha,
    /// Newest first.
    #[default]
    Date,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Alpha => "alpha",
            SortMode::Date => "date",
        }
    }

    /// Anything other than "alpha" sorts by date.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("alpha") {
            SortMode::Alpha
        } else {
            SortMode::Date
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SortMode::parse_lenient(s))
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
