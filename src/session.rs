//! Browsing session: root, current directory, scanned files, view
//! settings, album index and the grid, plus the file actions.
//!
//! Every mutating action takes `&mut self`, so actions (drops in
//! particular) never interleave.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;

use crate::albums;
use crate::config::GridConfig;
use crate::filter::apply_filters;
use crate::fs::{DirHandle, Entry, LocalFs, MediaFs};
use crate::grid::Grid;
use crate::media::ext_of;
use crate::metadata::{self, MediaProbe, Metadata, SystemProbe};
use crate::model::{AlbumEntry, FileEntry, MediaFilter, SortMode};
use crate::mover::{self, MoveReport};
use crate::scanner;
use crate::store::HandleStore;
use crate::SorterError;

/// Where the grid is currently looking.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Location {
    #[default]
    Root,
    Group { album: String, group: String },
}

pub struct Session<F: MediaFs = LocalFs> {
    fs: F,
    store: HandleStore,
    probe: Box<dyn MediaProbe>,
    root: Option<DirHandle>,
    current: Option<DirHandle>,
    location: Location,
    albums: Vec<AlbumEntry>,
    all: Vec<FileEntry>,
    query: String,
    media: MediaFilter,
    sort: SortMode,
    include_subdirs: bool,
    grid: Grid,
    status: Option<String>,
}

impl<F: MediaFs> Session<F> {
    pub fn new(fs: F, store: HandleStore, config: GridConfig, width: f32) -> Self {
        Self {
            fs,
            store,
            probe: Box::new(SystemProbe),
            root: None,
            current: None,
            location: Location::Root,
            albums: Vec::new(),
            all: Vec::new(),
            query: String::new(),
            media: MediaFilter::default(),
            sort: SortMode::default(),
            include_subdirs: false,
            grid: Grid::new(config, width),
            status: None,
        }
    }

    pub fn with_probe(mut self, probe: impl MediaProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    // ── accessors ───────────────────────────────────────────────────────

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn root(&self) -> Option<&DirHandle> {
        self.root.as_ref()
    }

    pub fn current(&self) -> Option<&DirHandle> {
        self.current.as_ref()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn albums(&self) -> &[AlbumEntry] {
        &self.albums
    }

    /// Everything the last scan found, unfiltered.
    pub fn files(&self) -> &[FileEntry] {
        &self.all
    }

    /// The filtered, sorted list the grid shows.
    pub fn view(&self) -> &[FileEntry] {
        self.grid.displayed()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn media_filter(&self) -> MediaFilter {
        self.media
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort
    }

    pub fn include_subdirs(&self) -> bool {
        self.include_subdirs
    }

    /// Message left by the last action that reports one (drops).
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn breadcrumb(&self) -> String {
        match &self.location {
            Location::Root => "Home".to_string(),
            Location::Group { album, group } if group.is_empty() => format!("Home / {}", album),
            Location::Group { album, group } => format!("Home / {} / {}", album, group),
        }
    }

    // ── root & navigation ───────────────────────────────────────────────

    /// Make `dir` the root, load it and remember it for next time. If it
    /// cannot be scanned the session and the store are left as they were.
    pub fn open_root(&mut self, dir: DirHandle) -> Result<()> {
        log::info!("opening root {}", dir.path().display());
        let all = self.scan(&dir)?;
        let albums = albums::load_albums(&self.fs, &dir)?;

        if let Err(e) = self.store.save_last(&dir) {
            log::warn!("cannot remember root: {:#}", e);
        }
        self.root = Some(dir.clone());
        self.current = Some(dir);
        self.location = Location::Root;
        self.all = all;
        self.albums = albums;
        self.refilter();
        Ok(())
    }

    /// Reopen the remembered root. False (and no change) when there is none
    /// or it can no longer be listed.
    pub fn restore_last(&mut self) -> Result<bool> {
        let Some(last) = self.store.last() else {
            return Ok(false);
        };
        if let Err(e) = self.fs.entries(&last) {
            log::warn!("last root {} unavailable: {}", last.path().display(), e);
            return Ok(false);
        }
        self.open_root(last)?;
        Ok(true)
    }

    /// Rescan the current directory and rebuild the grid.
    pub fn reload(&mut self) -> Result<usize> {
        let dir = self.current.clone().ok_or(SorterError::NoRoot)?;
        self.all = self.scan(&dir)?;
        Ok(self.refilter())
    }

    fn scan(&self, dir: &DirHandle) -> Result<Vec<FileEntry>> {
        if self.include_subdirs {
            scanner::scan_deep(&self.fs, dir)
        } else {
            scanner::scan_top(&self.fs, dir)
        }
    }

    fn refilter(&mut self) -> usize {
        let view = apply_filters(&self.all, &self.query, self.media, self.sort);
        let shown = view.len();
        self.grid.reset(view);
        log::debug!("view: {} of {} files", shown, self.all.len());
        shown
    }

    pub fn show_root(&mut self) -> Result<usize> {
        let root = self.root.clone().ok_or(SorterError::NoRoot)?;
        self.current = Some(root);
        self.location = Location::Root;
        self.reload()
    }

    pub fn show_group(&mut self, album: &str, group: &str) -> Result<usize> {
        let album_dir = self.album_handle(album)?;
        let dir = self
            .fs
            .dir(&album_dir, group, false)
            .with_context(|| format!("no group {} in {}", group, album))?;
        self.current = Some(dir);
        self.location = Location::Group {
            album: album.to_string(),
            group: group.to_string(),
        };
        self.reload()
    }

    // ── view settings ───────────────────────────────────────────────────

    pub fn set_query(&mut self, query: &str) -> usize {
        self.query = query.to_string();
        self.refilter()
    }

    pub fn set_media_filter(&mut self, media: MediaFilter) -> usize {
        self.media = media;
        self.refilter()
    }

    pub fn set_sort_mode(&mut self, sort: SortMode) -> usize {
        self.sort = sort;
        self.refilter()
    }

    /// Toggle recursive scanning; rescans when a directory is open.
    pub fn set_include_subdirs(&mut self, include: bool) -> Result<()> {
        self.include_subdirs = include;
        if self.current.is_some() {
            self.reload()?;
        }
        Ok(())
    }

    // ── albums ──────────────────────────────────────────────────────────

    pub fn refresh_albums(&mut self) -> Result<&[AlbumEntry]> {
        let root = self.root.clone().ok_or(SorterError::NoRoot)?;
        self.albums = albums::load_albums(&self.fs, &root)?;
        Ok(&self.albums)
    }

    pub fn add_album(&mut self, name: &str) -> Result<()> {
        let root = self.root.clone().ok_or(SorterError::NoRoot)?;
        albums::add_album(&self.fs, &root, name)?;
        self.refresh_albums()?;
        Ok(())
    }

    pub fn add_group(&mut self, album: &str, name: &str) -> Result<()> {
        let album_dir = self.album_handle(album)?;
        albums::add_group(&self.fs, &album_dir, name)?;
        self.refresh_albums()?;
        Ok(())
    }

    fn album_handle(&self, album: &str) -> Result<DirHandle> {
        if let Some(a) = self.albums.iter().find(|a| a.name == album) {
            return Ok(a.handle.clone());
        }
        // Not in the index (created since the last refresh?); try the disk.
        let root = self.root.as_ref().ok_or(SorterError::NoRoot)?;
        self.fs
            .dir(root, album, false)
            .map_err(|_| SorterError::UnknownAlbum(album.to_string()).into())
    }

    // ── file actions ────────────────────────────────────────────────────

    /// First scanned entry called `name`.
    pub fn find(&self, name: &str) -> Result<&FileEntry> {
        self.all
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SorterError::UnknownFile(name.to_string()).into())
    }

    /// Move the files named in a drag payload into `album/group`, then
    /// reload. An empty or unparsable payload moves nothing.
    pub fn drop_on_group(&mut self, payload: &str, album: &str, group: &str) -> Result<MoveReport> {
        let names = mover::parse_payload(payload);
        if names.is_empty() {
            return Ok(MoveReport::default());
        }
        let album_dir = self.album_handle(album)?;
        let report = mover::move_files(&self.fs, &self.all, &names, &album_dir, group);
        self.status = Some(report.summary());
        self.reload()?;
        self.refresh_albums()?;
        Ok(report)
    }

    /// Rename `name` to `new_base`, keeping its extension. Returns the new
    /// name, or None when there is nothing to do (blank or unchanged).
    pub fn rename(&mut self, name: &str, new_base: &str) -> Result<Option<String>> {
        let base = new_base.trim();
        if base.is_empty() {
            return Ok(None);
        }
        let entry = self.find(name)?.clone();
        let new_name = with_extension_of(name, base);
        if new_name == name {
            return Ok(None);
        }

        // Any other entry equal ignoring case counts as taken.
        let wanted = new_name.to_lowercase();
        let taken = self
            .fs
            .entries(&entry.parent)?
            .iter()
            .any(|e| e.name() != name && e.name().to_lowercase() == wanted);
        if taken {
            anyhow::bail!("{} already exists", new_name);
        }

        self.fs
            .rename(&entry.parent, name, &new_name)
            .with_context(|| format!("rename {} to {}", name, new_name))?;
        log::info!("renamed {} -> {}", name, new_name);
        self.reload()?;
        Ok(Some(new_name))
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        let entry = self.find(name)?.clone();
        self.fs
            .remove(&entry.parent, &entry.name)
            .with_context(|| format!("delete {}", name))?;
        log::info!("deleted {}", entry.handle.path().display());
        self.reload()?;
        Ok(())
    }

    pub fn describe(&self, name: &str) -> Result<Metadata> {
        let entry = self.find(name)?;
        metadata::describe(&self.fs, self.probe.as_ref(), entry)
    }

    /// Hand the file to the desktop's default application.
    pub fn open(&self, name: &str) -> Result<PathBuf> {
        let path = self.find(name)?.handle.path().to_path_buf();
        open_with_system(&path)?;
        Ok(path)
    }

    /// Directory names under the current directory, for drop targets
    /// outside the album index.
    pub fn subdirs(&self) -> Result<Vec<String>> {
        let dir = self.current.as_ref().ok_or(SorterError::NoRoot)?;
        Ok(self
            .fs
            .entries(dir)?
            .into_iter()
            .filter_map(|e| match e {
                Entry::Dir { name, .. } => Some(name),
                Entry::File { .. } => None,
            })
            .collect())
    }
}

/// `base` with the extension of `name` appended, unless it already ends
/// with it (case-insensitively).
fn with_extension_of(name: &str, base: &str) -> String {
    let ext = ext_of(name);
    if ext.is_empty() || ext_of(base) == ext {
        base.to_string()
    } else {
        let dot = name.rfind('.').unwrap_or(name.len());
        format!("{}{}", base, &name[dot..])
    }
}

fn open_with_system(path: &std::path::Path) -> Result<()> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(path);
    spawn_reaped(cmd).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(())
}

/// Start `cmd` without waiting for it. A background thread reaps the
/// child; the handle lets callers wait for that.
fn spawn_reaped(mut cmd: Command) -> Result<std::thread::JoinHandle<()>> {
    let mut child = cmd.spawn()?;
    Ok(std::thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => log::warn!("opener exited with {}", status),
        Ok(_) => {}
        Err(e) => log::warn!("opener: {}", e),
    }))
}
