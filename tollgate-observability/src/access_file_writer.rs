//! Access-log file sink with size-based rotation.
//!
//! Lines are appended to `file_path`. Once the file reaches
//! `max_file_size_bytes`, it is renamed to `<file_path>.<UTC timestamp>` and
//! a fresh file is opened. The writer is shared across request workers;
//! writes are serialized by an internal `Mutex`.

use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tollgate_core::AccessLogConfig;
use tracing::{debug, error, info, warn};

/// Suffix of rotated files, e.g. `access.log.2025-01-15-120000`.
const ROTATION_STAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";
const ROTATION_STAMP_LEN: usize = "2025-01-15-120000".len();

#[derive(Debug, Clone)]
pub struct AccessFileConfig {
    pub file_path: PathBuf,
    /// 0 = never rotate.
    pub max_file_size_bytes: u64,
    /// 0 = keep every rotated file.
    pub max_rotated_files: usize,
}

impl AccessFileConfig {
    /// File sink settings, if the access log is configured to go to a file.
    pub fn from_access_log(config: &AccessLogConfig) -> Option<Self> {
        config.file_path.as_ref().map(|path| Self {
            file_path: path.clone(),
            max_file_size_bytes: config.max_file_size_bytes,
            max_rotated_files: config.max_rotated_files,
        })
    }
}

pub struct AccessFileWriter {
    config: AccessFileConfig,
    inner: Mutex<FileState>,
}

struct FileState {
    writer: BufWriter<File>,
    size: u64,
}

impl AccessFileWriter {
    /// Open (or create) the access log, creating parent directories.
    pub fn new(config: AccessFileConfig) -> io::Result<Self> {
        if let Some(parent) = config.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = open_append(&config.file_path)?;
        let size = file.metadata()?.len();

        info!(path = %config.file_path.display(), size, "Access log opened");

        Ok(Self {
            config,
            inner: Mutex::new(FileState {
                writer: BufWriter::new(file),
                size,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.config.file_path
    }

    /// Append one formatted line, adding `\n` if it is missing.
    pub fn write_line(&self, line: &[u8]) -> io::Result<()> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("access log writer lock poisoned"))?;

        if self.config.max_file_size_bytes > 0 && state.size >= self.config.max_file_size_bytes {
            self.rotate(&mut state)?;
        }

        state.writer.write_all(line)?;
        let mut written = line.len() as u64;
        if line.last() != Some(&b'\n') {
            state.writer.write_all(b"\n")?;
            written += 1;
        }
        state.writer.flush()?;
        state.size += written;
        Ok(())
    }

    pub fn flush(&self) -> io::Result<()> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("access log writer lock poisoned"))?;
        state.writer.flush()
    }

    fn rotate(&self, state: &mut FileState) -> io::Result<()> {
        let stamp = Utc::now().format(ROTATION_STAMP_FORMAT).to_string();
        let target = unused_rotation_path(&self.config.file_path, &stamp);
        self.rotate_to(state, &target)
    }

    fn rotate_to(&self, state: &mut FileState, target: &Path) -> io::Result<()> {
        state.writer.flush()?;

        let base = &self.config.file_path;
        let renamed = match fs::rename(base, target) {
            Ok(()) => {
                info!(from = %base.display(), to = %target.display(), "Rotated access log");
                true
            }
            Err(e) => {
                error!(
                    error = %e,
                    from = %base.display(),
                    to = %target.display(),
                    "Failed to rotate access log"
                );
                false
            }
        };

        if renamed && self.config.max_rotated_files > 0 {
            if let Err(e) = prune_rotated_files(base, self.config.max_rotated_files) {
                warn!(error = %e, "Failed to prune rotated access logs");
            }
        }

        // Replacing the writer drops (and closes) the renamed file
        let file = open_append(base)?;
        // After a failed rename, count from zero so the next attempt waits
        // for another full `max_file_size_bytes`
        state.size = if renamed { file.metadata()?.len() } else { 0 };
        state.writer = BufWriter::new(file);
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `access.log` → `access.log.<suffix>`
fn rotated_file_path(base: &Path, suffix: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(".");
    path.push(suffix);
    PathBuf::from(path)
}

/// Rotation target that does not exist yet; rotations within the same
/// second get `-1`, `-2`, ... appended.
fn unused_rotation_path(base: &Path, stamp: &str) -> PathBuf {
    let candidate = rotated_file_path(base, stamp);
    if !candidate.exists() {
        return candidate;
    }
    (1u32..)
        .map(|n| rotated_file_path(base, &format!("{stamp}-{n}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Sort key of a rotation suffix: `2025-01-15-120000-10` →
/// `("2025-01-15-120000", 10)`, so collision counters order numerically.
fn rotation_order(suffix: &str) -> (&str, u64) {
    match suffix.rsplit_once('-') {
        Some((stamp, n)) if stamp.len() == ROTATION_STAMP_LEN => {
            n.parse().map_or((suffix, 0), |n| (stamp, n))
        }
        _ => (suffix, 0),
    }
}

/// Delete the oldest rotated files so at most `keep` remain.
fn prune_rotated_files(base: &Path, keep: usize) -> io::Result<()> {
    let parent = match base.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let prefix = format!("{}.", base.file_name().unwrap_or_default().to_string_lossy());

    let mut rotated: Vec<(String, PathBuf)> = fs::read_dir(parent)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let suffix = name.strip_prefix(&prefix).filter(|s| !s.is_empty())?.to_string();
            Some((suffix, entry.path()))
        })
        .collect();

    // Oldest first
    rotated.sort_by(|a, b| rotation_order(&a.0).cmp(&rotation_order(&b.0)));

    let excess = rotated.len().saturating_sub(keep);
    for (_, path) in rotated.iter().take(excess) {
        debug!(path = %path.display(), "Pruning rotated access log");
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: PathBuf, max_size: u64, keep: usize) -> AccessFileConfig {
        AccessFileConfig {
            file_path: path,
            max_file_size_bytes: max_size,
            max_rotated_files: keep,
        }
    }

    #[test]
    fn rotated_file_path_appends_suffix() {
        let p = rotated_file_path(Path::new("/var/log/access.log"), "2025-01-15-120000");
        assert_eq!(p, PathBuf::from("/var/log/access.log.2025-01-15-120000"));
    }

    #[test]
    fn unused_rotation_path_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("access.log");
        File::create(rotated_file_path(&base, "stamp")).unwrap();
        File::create(rotated_file_path(&base, "stamp-1")).unwrap();
        assert_eq!(
            unused_rotation_path(&base, "stamp"),
            rotated_file_path(&base, "stamp-2")
        );
    }

    #[test]
    fn writes_lines_and_adds_missing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        let writer = AccessFileWriter::new(config(path.clone(), 0, 0)).unwrap();
        writer.write_line(b"first\n").unwrap();
        writer.write_line(b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        fs::write(&path, "old\n").unwrap();

        let writer = AccessFileWriter::new(config(path.clone(), 0, 0)).unwrap();
        writer.write_line(b"new\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("access.log");
        let writer = AccessFileWriter::new(config(path.clone(), 0, 0)).unwrap();
        writer.write_line(b"line\n").unwrap();
        assert!(path.exists());
        assert_eq!(writer.path(), path.as_path());
    }

    #[test]
    fn rotates_when_size_reached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        let writer = AccessFileWriter::new(config(path.clone(), 10, 0)).unwrap();

        writer.write_line(b"0123456789abcdef\n").unwrap();
        writer.write_line(b"after-rotation\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "after-rotation\n");
        let rotated: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("access.log."))
            .collect();
        assert_eq!(rotated.len(), 1);
        assert_eq!(
            fs::read_to_string(rotated[0].path()).unwrap(),
            "0123456789abcdef\n"
        );
    }

    #[test]
    fn prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("access.log");
        for day in 1..=5 {
            File::create(dir.path().join(format!("access.log.2025-01-0{day}-000000"))).unwrap();
        }
        File::create(&base).unwrap();

        prune_rotated_files(&base, 2).unwrap();

        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("access.log."))
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec!["access.log.2025-01-04-000000", "access.log.2025-01-05-000000"]
        );
        assert!(base.exists());
    }

    #[test]
    fn rotation_order_compares_collision_counters_numerically() {
        assert_eq!(rotation_order("2025-01-01-000000"), ("2025-01-01-000000", 0));
        assert_eq!(rotation_order("2025-01-01-000000-10"), ("2025-01-01-000000", 10));
        assert!(rotation_order("2025-01-01-000000-2") < rotation_order("2025-01-01-000000-10"));
        assert!(rotation_order("2025-01-01-000000-10") < rotation_order("2025-01-01-000001"));
    }

    #[test]
    fn prune_keeps_newest_same_second_rotations() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("access.log");
        File::create(rotated_file_path(&base, "2025-01-01-000000")).unwrap();
        for n in 1..=10 {
            File::create(rotated_file_path(&base, &format!("2025-01-01-000000-{n}"))).unwrap();
        }

        prune_rotated_files(&base, 2).unwrap();

        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec!["access.log.2025-01-01-000000-10", "access.log.2025-01-01-000000-9"]
        );
    }

    #[test]
    fn failed_rotation_resets_size_and_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        let writer = AccessFileWriter::new(config(path.clone(), 10, 3)).unwrap();
        writer.write_line(b"0123456789abcdef\n").unwrap();

        {
            let mut state = writer.inner.lock().unwrap();
            // Target directory does not exist, so the rename fails
            let target = dir.path().join("missing").join("access.log.stamp");
            writer.rotate_to(&mut state, &target).unwrap();
            assert_eq!(state.size, 0);
        }

        // Below the threshold again: no new rotation attempt
        writer.write_line(b"next\n").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "0123456789abcdef\nnext\n"
        );
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn concurrent_writers_keep_lines_whole() {
        const WORKERS: usize = 8;
        const LINES: usize = 200;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        let writer = AccessFileWriter::new(config(path.clone(), 0, 0)).unwrap();

        std::thread::scope(|scope| {
            for worker in 0..WORKERS {
                let writer = &writer;
                scope.spawn(move || {
                    for i in 0..LINES {
                        let line = format!("worker={worker} seq={i} {}\n", "x".repeat(64));
                        writer.write_line(line.as_bytes()).unwrap();
                    }
                });
            }
        });

        let content = fs::read_to_string(&path).unwrap();
        let mut seen: Vec<&str> = content.lines().collect();
        assert_eq!(seen.len(), WORKERS * LINES);

        let mut expected: Vec<String> = (0..WORKERS)
            .flat_map(|w| (0..LINES).map(move |i| format!("worker={w} seq={i} {}", "x".repeat(64))))
            .collect();
        seen.sort_unstable();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[test]
    fn from_access_log_requires_file_path() {
        assert!(AccessFileConfig::from_access_log(&AccessLogConfig::default()).is_none());

        let cfg = AccessLogConfig {
            file_path: Some(PathBuf::from("/tmp/access.log")),
            max_rotated_files: 4,
            ..AccessLogConfig::default()
        };
        let file = AccessFileConfig::from_access_log(&cfg).unwrap();
        assert_eq!(file.file_path, PathBuf::from("/tmp/access.log"));
        assert_eq!(file.max_rotated_files, 4);
    }

    #[test]
    fn flush_on_fresh_writer() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AccessFileWriter::new(config(dir.path().join("access.log"), 0, 0)).unwrap();
        writer.flush().unwrap();
    }
}
