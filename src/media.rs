//! Extension tables and MIME classification shared by the filter,
//! grid and metadata layers.

pub const IMAGE_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif", "avif", "ico", "svg", "heic",
    "heif",
];
pub const VIDEO_EXTS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "webm", "flv", "wmv", "m4v", "3gp",
];

/// Video containers we can seek into for a preview frame.
pub const PLAYABLE_VIDEO_EXTS: &[&str] = &["mp4", "m4v", "mov", "webm", "mkv"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

/// Lowercased text after the last `.` of a file name, or "" when there is none.
pub fn ext_of(name: &str) -> String {
    match name.rfind('.') {
        Some(i) => name[i + 1..].to_lowercase(),
        None => String::new(),
    }
}

pub fn is_image(name: &str) -> bool {
    IMAGE_EXTS.contains(&ext_of(name).as_str())
}

pub fn is_video(name: &str) -> bool {
    VIDEO_EXTS.contains(&ext_of(name).as_str())
}

pub fn kind_of(name: &str) -> MediaKind {
    if is_image(name) {
        MediaKind::Image
    } else if is_video(name) {
        MediaKind::Video
    } else {
        MediaKind::Other
    }
}

/// MIME type derived from the extension. Unknown types yield "".
pub fn mime_for(name: &str) -> &'static str {
    match ext_of(name).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tiff" | "tif" => "image/tiff",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "3gp" => "video/3gpp",
        "txt" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        _ => "",
    }
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

pub fn is_video_mime(mime: &str) -> bool {
    mime.starts_with("video/")
}

/// Whether a video MIME type is one we can pull a frame from.
pub fn is_playable_mime(mime: &str) -> bool {
    matches!(
        mime,
        "video/mp4" | "video/x-m4v" | "video/quicktime" | "video/webm" | "video/x-matroska"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_of_basic() {
        assert_eq!(ext_of("photo.jpg"), "jpg");
        assert_eq!(ext_of("video.MKV"), "mkv");
        assert_eq!(ext_of("archive.tar.gz"), "gz");
        assert_eq!(ext_of(".hidden"), "hidden");
    }

    #[test]
    fn ext_of_without_dot_is_empty() {
        assert_eq!(ext_of("README"), "");
        assert_eq!(ext_of(""), "");
        assert_eq!(ext_of("file."), "");
    }

    #[test]
    fn ext_of_unicode_filename() {
        assert_eq!(ext_of("café.JPG"), "jpg");
        assert_eq!(ext_of("📸 photo.PNG"), "png");
    }

    #[test]
    fn classification() {
        assert!(is_image("a.JPEG"));
        assert!(is_video("b.mp4"));
        assert!(!is_image("b.mp4"));
        assert_eq!(kind_of("c.txt"), MediaKind::Other);
        assert_eq!(kind_of("noext"), MediaKind::Other);
    }

    #[test]
    fn mime_table() {
        assert_eq!(mime_for("a.jpg"), "image/jpeg");
        assert_eq!(mime_for("b.MOV"), "video/quicktime");
        assert_eq!(mime_for("c.xyz"), "");
        assert!(is_image_mime(mime_for("d.png")));
        assert!(is_video_mime(mime_for("e.avi")));
    }

    #[test]
    fn playable_subset_of_videos() {
        for ext in PLAYABLE_VIDEO_EXTS {
            let name = format!("clip.{}", ext);
            assert!(is_video(&name), "{} should be a video", ext);
            assert!(is_playable_mime(mime_for(&name)), "{} should be playable", ext);
        }
        assert!(!is_playable_mime(mime_for("old.avi")));
        assert!(!is_playable_mime(mime_for("old.wmv")));
    }
}
