use std::path::{Path, PathBuf};

use crate::config::Config;

/// Android shared-storage download folders, most likely first
const ANDROID_DOWNLOAD_DIRS: &[&str] = &[
    "/storage/emulated/0/Download",
    "/storage/emulated/0/Downloads",
    "/sdcard/Download",
    "/sdcard/Downloads",
];

/// Format duration in human-readable format
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Pick the directory downloads go under: the configured one, else the first
/// writable Android download folder, else the user's download dir, else the cwd.
pub fn resolve_download_dir(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }

    let candidates = ANDROID_DOWNLOAD_DIRS
        .iter()
        .map(PathBuf::from)
        .chain(dirs::download_dir());

    for candidate in candidates {
        if is_writable_dir(&candidate) {
            return candidate;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Mode bits lie on Android shared storage, so actually create a file
fn is_writable_dir(path: &Path) -> bool {
    let is_dir = fs_err::metadata(path).map(|meta| meta.is_dir()).unwrap_or(false);
    is_dir && tempfile::tempfile_in(path).is_ok()
}

/// Check if the current environment has required tools
pub async fn check_dependencies(config: &Config) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&config.tools.yt_dlp, "--version").await {
        missing.push(format!("{} - required for downloading (pip install yt-dlp)", config.tools.yt_dlp));
    }

    if !check_command_available(&config.tools.ffmpeg, "-version").await {
        missing.push(format!(
            "{} - required for merging and MP3 conversion (pkg install ffmpeg)",
            config.tools.ffmpeg
        ));
    }

    // Running the wake-lock command would take the lock, so only look it up
    if config.tools.wake_lock && which::which(&config.tools.wake_lock_command).is_err() {
        missing.push(format!(
            "{} - keeps the device awake during downloads (pkg install termux-api)",
            config.tools.wake_lock_command
        ));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
    }

    #[test]
    fn test_configured_download_dir_wins() {
        let dir = PathBuf::from("/somewhere/else");
        assert_eq!(resolve_download_dir(Some(&dir)), dir);
    }

    #[test]
    fn test_download_dir_falls_back_to_existing_dir() {
        let resolved = resolve_download_dir(None);
        assert!(resolved.is_dir() || resolved == PathBuf::from("."));
    }

    #[tokio::test]
    async fn test_missing_tools_are_reported() {
        let mut config = Config::default();
        config.tools.yt_dlp = "no-such-yt-dlp-binary".to_string();
        config.tools.ffmpeg = "no-such-ffmpeg-binary".to_string();
        config.tools.wake_lock = false;
        let missing = check_dependencies(&config).await;
        assert_eq!(missing.len(), 2);
        assert!(missing[0].starts_with("no-such-yt-dlp-binary"));
    }

    #[tokio::test]
    async fn test_missing_wake_lock_command_is_reported() {
        let mut config = Config::default();
        config.tools.yt_dlp = "no-such-yt-dlp-binary".to_string();
        config.tools.ffmpeg = "no-such-ffmpeg-binary".to_string();
        config.tools.wake_lock_command = "no-such-wake-lock".to_string();

        let missing = check_dependencies(&config).await;
        assert_eq!(missing.len(), 3);
        assert!(missing[2].starts_with("no-such-wake-lock"));

        config.tools.wake_lock = false;
        assert_eq!(check_dependencies(&config).await.len(), 2);
    }

    #[test]
    fn test_writable_dir_is_checked_by_creating_a_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(is_writable_dir(dir.path()));
        assert!(!is_writable_dir(&dir.path().join("missing")));

        let file = dir.path().join("plain.txt");
        fs_err::write(&file, "x").unwrap();
        assert!(!is_writable_dir(&file));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_dir_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs_err::create_dir(&locked).unwrap();
        fs_err::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores mode bits, in which case the directory really is writable
        let root_can_write = fs_err::write(locked.join("marker"), "x").is_ok();
        assert_eq!(is_writable_dir(&locked), root_can_write);

        fs_err::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
