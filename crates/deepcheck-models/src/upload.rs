//! Upload validation helpers.

/// Video container extensions accepted at upload time.
///
/// Extension-based allow-list only; contents are not sniffed.
pub const ALLOWED_VIDEO_EXTENSIONS: &[&str] =
    &["mp4", "gif", "webm", "avi", "3gp", "wmv", "flv", "mkv"];

/// Extension of a file name (text after the last `.`), lowercased.
fn extension(filename: &str) -> String {
    filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Check a client-supplied file name against the allow-list.
pub fn is_allowed_video_file(filename: &str) -> bool {
    let ext = extension(filename);
    ALLOWED_VIDEO_EXTENSIONS.contains(&ext.as_str())
}

/// Storage name for an upload: `uploaded_<unix seconds>.<ext>`.
///
/// The extension is taken from the original file name, lowercased.
pub fn uploaded_file_name(original: &str, unix_seconds: i64) -> String {
    format!("uploaded_{}.{}", unix_seconds, extension(original))
}

/// Storage name for the `n`th upload within the same second.
///
/// `n == 0` is the plain name; later ones become `uploaded_<secs>_<n>.<ext>`.
pub fn numbered_upload_name(original: &str, unix_seconds: i64, n: u32) -> String {
    if n == 0 {
        return uploaded_file_name(original, unix_seconds);
    }
    format!("uploaded_{}_{}.{}", unix_seconds, n, extension(original))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions() {
        assert!(is_allowed_video_file("clip.mp4"));
        assert!(is_allowed_video_file("CLIP.MKV"));
        assert!(is_allowed_video_file("archive.tar.3gp"));
        assert!(!is_allowed_video_file("notes.txt"));
        assert!(!is_allowed_video_file("noextension"));
        assert!(!is_allowed_video_file("movie.mp4.exe"));
    }

    #[test]
    fn test_uploaded_file_name() {
        assert_eq!(uploaded_file_name("My Clip.WebM", 1_700_000_000), "uploaded_1700000000.webm");
    }

    #[test]
    fn test_numbered_upload_name() {
        assert_eq!(numbered_upload_name("a.mp4", 5, 0), "uploaded_5.mp4");
        assert_eq!(numbered_upload_name("a.MP4", 5, 2), "uploaded_5_2.mp4");
    }
}
