//! Media type detection by file extension.

use std::path::Path;

use crate::config::PerceptualMode;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "csv", "tsv", "json", "xml", "html", "htm", "tex", "srt",
];
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "gif", "bmp", "tif", "tiff",
];
const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "ogg", "opus", "aif", "aiff", "wv", "m4a", "aac", "ac3", "mp2",
];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "mpg", "mpeg", "m4v"];

/// Perceptual mode for a file, or `None` for media outside every supported domain.
pub fn detect_mode(path: &Path) -> Option<PerceptualMode> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let ext = ext.as_str();
    if TEXT_EXTENSIONS.contains(&ext) {
        Some(PerceptualMode::Text)
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        Some(PerceptualMode::Image)
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        Some(PerceptualMode::Audio)
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        Some(PerceptualMode::Video)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension_case_insensitively() {
        assert_eq!(detect_mode(Path::new("a/b.TXT")), Some(PerceptualMode::Text));
        assert_eq!(detect_mode(Path::new("x.jpeg")), Some(PerceptualMode::Image));
        assert_eq!(detect_mode(Path::new("song.opus")), Some(PerceptualMode::Audio));
        assert_eq!(detect_mode(Path::new("clip.mkv")), Some(PerceptualMode::Video));
        assert_eq!(detect_mode(Path::new("blob.bin")), None);
        assert_eq!(detect_mode(Path::new("README")), None);
    }
}
