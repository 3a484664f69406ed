//! Per-file metadata listing (name, EXIF date/camera, video stream info,
//! size, type, mtime).

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use serde::Deserialize;
use std::fmt;
use std::process::Command;

use crate::fs::{FileHandle, MediaFs};
use crate::media;
use crate::model::FileEntry;
use crate::thumbs::{ffprobe_bin, run_with_timeout, FF_TIMEOUT};

/// The EXIF tags the viewer shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExifSummary {
    pub date_time_original: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    /// None when the container doesn't report a usable duration.
    pub duration_secs: Option<f64>,
    pub width: u32,
    pub height: u32,
}

pub trait MediaProbe {
    fn exif(&self, file: &FileHandle) -> Result<ExifSummary>;
    fn video(&self, file: &FileHandle) -> Result<VideoInfo>;
}

/// Ordered label/value pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub fields: Vec<(String, String)>,
}

impl Metadata {
    fn push(&mut self, label: &str, value: impl Into<String>) {
        self.fields.push((label.to_string(), value.into()));
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn labels(&self) -> Vec<&str> {
        self.fields.iter().map(|(l, _)| l.as_str()).collect()
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.fields.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        for (label, value) in &self.fields {
            writeln!(f, "{:<width$}  {}", label, value, width = width)?;
        }
        Ok(())
    }
}

/// Collect metadata for `entry`. Probe failures just leave their fields
/// out; only an unreadable file is an error.
pub fn describe<F, P>(fs: &F, probe: &P, entry: &FileEntry) -> Result<Metadata>
where
    F: MediaFs + ?Sized,
    P: MediaProbe + ?Sized,
{
    let info = fs
        .file_info(&entry.handle)
        .with_context(|| format!("cannot read {}", entry.name))?;

    let mut meta = Metadata::default();
    meta.push("File Name", entry.name.as_str());

    if media::is_image_mime(&info.mime) {
        match probe.exif(&entry.handle) {
            Ok(exif) => {
                if let Some(date) = exif.date_time_original.filter(|s| !s.is_empty()) {
                    meta.push("Original Date", date);
                }
                let camera: Vec<String> = [exif.make, exif.model]
                    .into_iter()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .collect();
                if !camera.is_empty() {
                    meta.push("Camera", camera.join(" "));
                }
            }
            Err(e) => log::debug!("metadata: no exif for {}: {:#}", entry.name, e),
        }
    }

    if media::is_video_mime(&info.mime) {
        match probe.video(&entry.handle) {
            Ok(v) => {
                if let Some(secs) = v.duration_secs {
                    meta.push("Duration", format!("{:.2} s", secs));
                }
                meta.push("Width", v.width.to_string());
                meta.push("Height", v.height.to_string());
            }
            Err(e) => log::debug!("metadata: no video info for {}: {:#}", entry.name, e),
        }
    }

    meta.push("Size", format!("{} bytes", info.size));
    meta.push("Type", info.mime.as_str());
    meta.push("Last Modified", format_local(info.modified_ms));
    Ok(meta)
}

fn format_local(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => String::new(),
    }
}

// ── System probe ────────────────────────────────────────────────────────

/// kamadak-exif for stills, ffprobe for videos.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemProbe;

impl MediaProbe for SystemProbe {
    fn exif(&self, file: &FileHandle) -> Result<ExifSummary> {
        let f = std::fs::File::open(file.path())?;
        let mut reader = std::io::BufReader::new(f);
        let exif = exif::Reader::new()
            .read_from_container(&mut reader)
            .context("no exif")?;

        let ascii = |tag: exif::Tag| -> Option<String> {
            let field = exif.get_field(tag, exif::In::PRIMARY)?;
            match field.value {
                exif::Value::Ascii(ref vec) if !vec.is_empty() => {
                    let s = String::from_utf8_lossy(&vec[0]);
                    Some(s.trim_end_matches('\0').trim().to_string())
                }
                _ => Some(field.display_value().to_string()),
            }
        };

        Ok(ExifSummary {
            date_time_original: ascii(exif::Tag::DateTimeOriginal),
            make: ascii(exif::Tag::Make),
            model: ascii(exif::Tag::Model),
        })
    }

    fn video(&self, file: &FileHandle) -> Result<VideoInfo> {
        crate::thumbs::ensure_ffmpeg();
        let mut cmd = Command::new(ffprobe_bin());
        cmd.args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height:format=duration",
            "-of",
            "json",
        ])
        .arg(file.path());
        let output = run_with_timeout(cmd, FF_TIMEOUT)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "ffprobe error: {}",
                stderr.lines().last().unwrap_or("unknown")
            );
        }
        parse_ffprobe(&output.stdout)
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_ffprobe(json: &[u8]) -> Result<VideoInfo> {
    let out: ProbeOutput = serde_json::from_slice(json).context("ffprobe json")?;
    let stream = out.streams.first().context("no video stream")?;
    let duration_secs = out
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);
    Ok(VideoInfo {
        duration_secs,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
    })
}
