//! CLI subcommand implementations.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lv_sorter::grid::{Glyph, Visual};
use lv_sorter::media;
use lv_sorter::thumbs::{self, ThumbnailPool, Thumbnailer, FF_TIMEOUT};
use lv_sorter::{DirHandle, MediaFilter, Session, SortMode, Viewport};

/// Simulated window height for paging and lazy thumbnails.
pub const VIEWPORT_HEIGHT: f32 = 720.0;

pub struct LsOpts {
    pub group: Option<String>,
    pub query: String,
    pub media: MediaFilter,
    pub sort: SortMode,
    pub recursive: bool,
    pub pages: usize,
}

/// `ALBUM/GROUP` → (album, group).
pub fn split_group(target: &str) -> Result<(&str, &str)> {
    match target.split_once('/') {
        Some((a, g)) if !a.trim().is_empty() && !g.trim().is_empty() => Ok((a.trim(), g.trim())),
        _ => anyhow::bail!("expected ALBUM/GROUP, got {:?}", target),
    }
}

pub fn pick(s: &mut Session, path: &Path) -> Result<()> {
    let abs = path
        .canonicalize()
        .with_context(|| format!("{}", path.display()))?;
    s.open_root(DirHandle::new(&abs))?;
    println!(
        "Opened {} ({} files, {} albums)",
        abs.display(),
        s.files().len(),
        s.albums().len()
    );
    Ok(())
}

/// Reopen the remembered root, or explain how to pick one.
pub fn restore(s: &mut Session) -> Result<bool> {
    if s.restore_last()? {
        return Ok(true);
    }
    println!("No folder remembered. Use `lv-sorter pick PATH` first.");
    Ok(false)
}

fn navigate(s: &mut Session, group: Option<&str>) -> Result<()> {
    if let Some(target) = group {
        let (album, group) = split_group(target)?;
        s.show_group(album, group)?;
    }
    Ok(())
}

pub fn ls(s: &mut Session, opts: &LsOpts) -> Result<()> {
    s.set_include_subdirs(opts.recursive)?;
    navigate(s, opts.group.as_deref())?;
    s.set_media_filter(opts.media);
    s.set_sort_mode(opts.sort);
    s.set_query(&opts.query);

    // First page comes with the reset; each further one is a scroll to the end.
    for _ in 1..opts.pages.max(1) {
        let end = s.grid().content_height();
        s.grid_mut().scroll(Viewport::new(end, VIEWPORT_HEIGHT));
    }
    print_grid(s);
    Ok(())
}

pub fn print_grid(s: &Session) {
    println!("{}", s.breadcrumb());
    for cell in s.grid().cells() {
        let when = chrono::DateTime::from_timestamp_millis(cell.entry.date)
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_default();
        let kind = match media::kind_of(&cell.entry.name) {
            media::MediaKind::Image => "img",
            media::MediaKind::Video => "vid",
            media::MediaKind::Other => "   ",
        };
        println!("  {}  {}  {}", kind, when, cell.entry.name);
    }
    println!(
        "{} shown, {} matching, {} scanned",
        s.grid().loaded(),
        s.view().len(),
        s.files().len()
    );
}

pub fn albums(s: &mut Session) -> Result<()> {
    let albums = s.refresh_albums()?;
    if albums.is_empty() {
        println!("No albums. Use `lv-sorter add-album NAME`.");
    }
    for album in albums {
        println!("{}", album.name);
        for g in &album.groups {
            println!("  {}", g);
        }
    }
    Ok(())
}

pub fn add_album(s: &mut Session, name: &str) -> Result<()> {
    s.add_album(name)?;
    println!("Album {} ready", name.trim());
    Ok(())
}

pub fn add_group(s: &mut Session, album: &str, name: &str) -> Result<()> {
    s.add_group(album, name)?;
    println!("Group {}/{} ready", album, name.trim());
    Ok(())
}

pub fn mv(s: &mut Session, to: &str, from: Option<&str>, names: &[String]) -> Result<()> {
    navigate(s, from)?;
    let (album, group) = split_group(to)?;
    let payload = serde_json::to_string(names)?;
    let report = s.drop_on_group(&payload, album, group)?;
    for (name, reason) in &report.failures {
        eprintln!("  {}: {}", name, reason);
    }
    println!("{}", report.summary());
    Ok(())
}

pub fn rename(s: &mut Session, name: &str, new_base: &str) -> Result<()> {
    match s.rename(name, new_base)? {
        Some(new_name) => println!("{} -> {}", name, new_name),
        None => println!("{}: unchanged", name),
    }
    Ok(())
}

pub fn rm(s: &mut Session, name: &str) -> Result<()> {
    s.delete(name)?;
    println!("Deleted {}", name);
    Ok(())
}

pub fn info(s: &Session, name: &str) -> Result<()> {
    print!("{}", s.describe(name)?);
    Ok(())
}

pub fn open(s: &Session, name: &str) -> Result<()> {
    let path = s.open(name)?;
    println!("Opened {}", path.display());
    Ok(())
}

/// Drive the lazy pipeline: scroll a simulated viewport through `pages`
/// screens, render what becomes visible, write the results to `out`.
pub fn thumbs(s: &mut Session, out: &Path, pages: usize, fetch_ffmpeg: bool) -> Result<()> {
    if fetch_ffmpeg {
        thumbs::ensure_ffmpeg();
    }
    std::fs::create_dir_all(out).with_context(|| format!("{}", out.display()))?;

    let source = Arc::new(Thumbnailer::from_config(s.grid().config()));
    let pool = ThumbnailPool::start(source, ThumbnailPool::default_workers());

    let mut viewport = Viewport::new(0.0, VIEWPORT_HEIGHT);
    for _ in 0..pages.max(1) {
        pool.submit_all(s.grid_mut().scroll(viewport));
        for done in pool.drain() {
            s.grid_mut().apply(done);
        }
        viewport.scroll_top += VIEWPORT_HEIGHT;
    }

    let wait = FF_TIMEOUT + Duration::from_secs(5);
    while pool.stats.in_flight() > 0 {
        match pool.recv_timeout(wait) {
            Some(done) => {
                s.grid_mut().apply(done);
            }
            None => break,
        }
    }

    let (mut written, mut glyphs, mut pending) = (0usize, 0usize, 0usize);
    for (id, cell) in s.grid().cells().iter().enumerate() {
        match &cell.visual {
            Visual::Thumbnail(bytes) => {
                let path = out.join(format!("{:04}-{}.jpg", id, cell.entry.name));
                std::fs::write(&path, bytes.as_slice())
                    .with_context(|| format!("{}", path.display()))?;
                written += 1;
            }
            Visual::Glyph(g) => {
                log::debug!("{}: {}", cell.entry.name, g.symbol());
                glyphs += 1;
            }
            Visual::Placeholder if cell.is_requested() => pending += 1,
            Visual::Placeholder => {}
        }
    }
    println!(
        "{} thumbnails written to {}, {} {}/{} fallbacks, {} unfinished",
        written,
        out.display(),
        glyphs,
        Glyph::Video.symbol(),
        Glyph::Document.symbol(),
        pending
    );
    Ok(())
}
