//! Thumbnail rendering and the background worker pool.
//!
//! Images: decode + `thumbnail()` (fast box filter), re-encode as JPEG.
//! Videos: ffmpeg grabs one frame shortly after the start, scaled down,
//! then goes through the same JPEG encoder.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, Once};
use std::thread::{self, JoinHandle};
use std::time::Duration;
#[cfg(unix)]
use wait_timeout::ChildExt;

use crate::config::GridConfig;
use crate::grid::{ThumbDone, ThumbPlan, ThumbRequest};

/// Max time to wait for ffprobe/ffmpeg before killing.
pub const FF_TIMEOUT: Duration = Duration::from_secs(30);

pub trait ThumbnailSource: Send + Sync {
    /// Encoded JPEG no larger than `req.size` on either side.
    fn render(&self, req: &ThumbRequest) -> Result<Vec<u8>>;
}

// ── ffmpeg discovery ────────────────────────────────────────────────────

static FFMPEG_INIT: Once = Once::new();

/// Download ffmpeg through ffmpeg-sidecar unless one is already reachable.
pub fn ensure_ffmpeg() {
    FFMPEG_INIT.call_once(|| {
        if which("ffmpeg") {
            log::debug!("ffmpeg: using system binary");
            return;
        }
        log::info!("ffmpeg: not on PATH, downloading via sidecar...");
        match ffmpeg_sidecar::download::auto_download() {
            Ok(_) => log::info!("ffmpeg: sidecar download complete"),
            Err(e) => log::warn!("ffmpeg download failed: {}", e),
        }
    });
}

/// Resolve a tool from the ffmpeg suite: system PATH, then the sidecar dir.
fn tool_bin(name: &str) -> PathBuf {
    if which(name) {
        return PathBuf::from(name);
    }
    if let Ok(dir) = ffmpeg_sidecar::paths::sidecar_dir() {
        let bin = if cfg!(windows) {
            dir.join(format!("{}.exe", name))
        } else {
            dir.join(name)
        };
        if bin.exists() {
            return bin;
        }
    }
    PathBuf::from(name)
}

pub fn ffmpeg_bin() -> PathBuf {
    tool_bin("ffmpeg")
}

pub fn ffprobe_bin() -> PathBuf {
    tool_bin("ffprobe")
}

fn which(name: &str) -> bool {
    let finder = if cfg!(windows) { "where" } else { "which" };
    Command::new(finder)
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run a piped command, killing it if it exceeds `timeout`.
///
/// Output is drained on helper threads so a chatty child can't block on a
/// full pipe while we wait.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<std::process::Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("{:?} failed to start", cmd.get_program()))?;

    let stdout = child.stdout.take().map(drain_pipe);
    let stderr = child.stderr.take().map(drain_pipe);

    #[cfg(not(unix))]
    let wait_result: std::io::Result<Option<std::process::ExitStatus>> = {
        let _ = timeout;
        child.wait().map(Some)
    };
    #[cfg(unix)]
    let wait_result = child.wait_timeout(timeout);

    let status = match wait_result {
        Ok(Some(status)) => status,
        Ok(None) => {
            child.kill().ok();
            child.wait().ok();
            anyhow::bail!("timed out after {}s", timeout.as_secs());
        }
        Err(e) => anyhow::bail!("wait failed: {}", e),
    };

    let join = |h: Option<JoinHandle<Vec<u8>>>| h.and_then(|h| h.join().ok()).unwrap_or_default();
    Ok(std::process::Output {
        status,
        stdout: join(stdout),
        stderr: join(stderr),
    })
}

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).ok();
        buf
    })
}

// ── Renderer ────────────────────────────────────────────────────────────

/// Renders thumbnails straight from local paths.
#[derive(Clone, Debug)]
pub struct Thumbnailer {
    pub jpeg_quality: u8,
    pub video_seek_secs: f32,
}

impl Default for Thumbnailer {
    fn default() -> Self {
        Self::from_config(&GridConfig::default())
    }
}

impl Thumbnailer {
    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality,
            video_seek_secs: config.video_seek_secs,
        }
    }

    pub fn image_thumb(&self, path: &Path, size: u32) -> Result<Vec<u8>> {
        let img = image::open(path).with_context(|| format!("decode failed: {}", path.display()))?;
        self.encode(&img.thumbnail(size, size))
    }

    pub fn video_thumb(&self, path: &Path, size: u32) -> Result<Vec<u8>> {
        ensure_ffmpeg();

        let mut cmd = Command::new(ffmpeg_bin());
        cmd.args(["-v", "error", "-ss"])
            .arg(format!("{:.2}", self.video_seek_secs))
            .arg("-i")
            .arg(path)
            .args(["-frames:v", "1", "-vf"])
            .arg(format!(
                "scale={s}:{s}:force_original_aspect_ratio=decrease",
                s = size
            ))
            .args(["-c:v", "png", "-f", "image2pipe", "-y", "pipe:1"]);
        let output = run_with_timeout(cmd, FF_TIMEOUT)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "ffmpeg error: {}",
                stderr.lines().last().unwrap_or("unknown")
            );
        }
        if output.stdout.is_empty() {
            anyhow::bail!("ffmpeg produced empty output");
        }

        let frame = image::load_from_memory(&output.stdout).context("decode video frame")?;
        // ffmpeg already scaled; this only guards odd rounding.
        self.encode(&frame.thumbnail(size, size))
    }

    fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buf = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality))
            .context("jpeg encode")?;
        Ok(buf)
    }
}

impl ThumbnailSource for Thumbnailer {
    fn render(&self, req: &ThumbRequest) -> Result<Vec<u8>> {
        let path = req.file.path();
        match req.plan {
            ThumbPlan::Image => self.image_thumb(path, req.size),
            ThumbPlan::VideoFrame => self.video_thumb(path, req.size),
        }
    }
}

// ── Worker pool ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct PoolStats {
    pub submitted: AtomicU64,
    pub done: AtomicU64,
    pub failed: AtomicU64,
    /// Results handed back to the owner (or given up on).
    delivered: AtomicU64,
}

impl PoolStats {
    /// Requests whose result the owner hasn't received yet.
    pub fn in_flight(&self) -> u64 {
        let delivered = self.delivered.load(Ordering::Relaxed);
        self.submitted.load(Ordering::Relaxed).saturating_sub(delivered)
    }
}

/// Fixed set of render threads fed from one queue.
///
/// There is no cancellation. Results for cells of an older grid
/// generation still arrive and are rejected by `Grid::apply`.
pub struct ThumbnailPool {
    pub stats: Arc<PoolStats>,
    queue: Option<Sender<ThumbRequest>>,
    results: Receiver<ThumbDone>,
    handles: Vec<JoinHandle<()>>,
}

impl ThumbnailPool {
    /// Half the cores, between 1 and 4.
    pub fn default_workers() -> usize {
        let ncpus = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        (ncpus / 2).clamp(1, 4)
    }

    pub fn start(source: Arc<dyn ThumbnailSource>, workers: usize) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel::<ThumbRequest>();
        let (done_tx, done_rx) = mpsc::channel::<ThumbDone>();
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let stats = Arc::new(PoolStats::default());

        let workers = workers.max(1);
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let source = source.clone();
            let queue_rx = queue_rx.clone();
            let done_tx = done_tx.clone();
            let stats = stats.clone();
            let handle = thread::Builder::new()
                .name(format!("thumb-{}", i))
                .spawn(move || worker_loop(source, queue_rx, done_tx, stats));
            match handle {
                Ok(h) => handles.push(h),
                Err(e) => log::warn!("thumbs: cannot spawn worker {}: {}", i, e),
            }
        }
        log::debug!("thumbs: started {} workers", handles.len());

        Self {
            stats,
            queue: Some(queue_tx),
            results: done_rx,
            handles,
        }
    }

    pub fn submit(&self, req: ThumbRequest) {
        let Some(queue) = &self.queue else { return };
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        if queue.send(req).is_err() {
            // All workers gone; nothing will ever come back for it.
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            self.stats.delivered.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn submit_all(&self, reqs: impl IntoIterator<Item = ThumbRequest>) {
        for req in reqs {
            self.submit(req);
        }
    }

    /// Everything finished so far, without blocking.
    pub fn drain(&self) -> Vec<ThumbDone> {
        let out: Vec<ThumbDone> = self.results.try_iter().collect();
        self.stats
            .delivered
            .fetch_add(out.len() as u64, Ordering::Relaxed);
        out
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ThumbDone> {
        let done = self.results.recv_timeout(timeout).ok()?;
        self.stats.delivered.fetch_add(1, Ordering::Relaxed);
        Some(done)
    }
}

impl Drop for ThumbnailPool {
    fn drop(&mut self) {
        self.queue.take();
        for h in self.handles.drain(..) {
            h.join().ok();
        }
    }
}

fn worker_loop(
    source: Arc<dyn ThumbnailSource>,
    queue: Arc<Mutex<Receiver<ThumbRequest>>>,
    done: Sender<ThumbDone>,
    stats: Arc<PoolStats>,
) {
    loop {
        let next = match queue.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => return,
        };
        let Ok(req) = next else { return };

        let result = source.render(&req);
        match &result {
            Ok(_) => stats.done.fetch_add(1, Ordering::Relaxed),
            Err(e) => {
                log::debug!("thumbs: {}: {:#}", req.file.path().display(), e);
                stats.failed.fetch_add(1, Ordering::Relaxed)
            }
        };
        let msg = ThumbDone {
            cell: req.cell,
            generation: req.generation,
            result,
        };
        if done.send(msg).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FileHandle;
    use image::{GenericImageView, ImageBuffer, Rgb};

    fn request(cell: usize, path: impl Into<PathBuf>, plan: ThumbPlan, size: u32) -> ThumbRequest {
        ThumbRequest {
            cell,
            generation: 1,
            file: FileHandle::new(path),
            plan,
            size,
        }
    }

    // ── renderer ────────────────────────────────────────────────────────

    #[test]
    fn image_thumb_fits_box_and_is_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(200, 100, |x, y| Rgb([x as u8, y as u8, 128]));
        img.save(&path).unwrap();

        let bytes = Thumbnailer::default()
            .render(&request(0, &path, ThumbPlan::Image, 40))
            .unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker");
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn undecodable_image_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();
        assert!(Thumbnailer::default()
            .render(&request(0, &path, ThumbPlan::Image, 40))
            .is_err());
    }

    #[test]
    fn run_with_timeout_captures_output() {
        if cfg!(windows) {
            return;
        }
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err >&2"]);
        let out = run_with_timeout(cmd, Duration::from_secs(5)).unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&out.stderr).trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_kills_slow_child() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let err = run_with_timeout(cmd, Duration::from_millis(100)).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    // ── pool ────────────────────────────────────────────────────────────

    /// Fails for names containing "bad", echoes the cell id otherwise.
    struct Stub;

    impl ThumbnailSource for Stub {
        fn render(&self, req: &ThumbRequest) -> Result<Vec<u8>> {
            if req.file.path().to_string_lossy().contains("bad") {
                anyhow::bail!("stub failure");
            }
            Ok(vec![req.cell as u8])
        }
    }

    fn collect(pool: &ThumbnailPool, n: usize) -> Vec<ThumbDone> {
        let mut out = Vec::new();
        while out.len() < n {
            match pool.recv_timeout(Duration::from_secs(5)) {
                Some(d) => out.push(d),
                None => break,
            }
        }
        out.sort_by_key(|d| d.cell);
        out
    }

    #[test]
    fn pool_delivers_every_request_once() {
        let pool = ThumbnailPool::start(Arc::new(Stub), 3);
        pool.submit_all((0..20).map(|i| request(i, format!("/x/{}.jpg", i), ThumbPlan::Image, 10)));

        let done = collect(&pool, 20);
        assert_eq!(done.len(), 20);
        for (i, d) in done.iter().enumerate() {
            assert_eq!(d.cell, i);
            assert_eq!(d.generation, 1);
            assert_eq!(d.result.as_ref().unwrap(), &vec![i as u8]);
        }
        assert_eq!(pool.stats.in_flight(), 0);
        assert!(pool.drain().is_empty());
    }

    #[test]
    fn pool_reports_failures() {
        let pool = ThumbnailPool::start(Arc::new(Stub), 1);
        pool.submit(request(0, "/x/ok.jpg", ThumbPlan::Image, 10));
        pool.submit(request(1, "/x/bad.jpg", ThumbPlan::Image, 10));

        let done = collect(&pool, 2);
        assert!(done[0].result.is_ok());
        assert!(done[1].result.is_err());
        assert_eq!(pool.stats.failed.load(Ordering::Relaxed), 1);
        assert_eq!(pool.stats.done.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn default_workers_in_range() {
        let n = ThumbnailPool::default_workers();
        assert!((1..=4).contains(&n));
    }
}
