//! Age-based eviction of uploads and temp artifacts

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::engine::CancelToken;

/// Suffix of waveform caches, which outlive other temp files
pub const PEAKS_CACHE_SUFFIX: &str = ".peaks.json";

/// Prefix of per-render scratch directories under the temp dir
pub const JOB_SCRATCH_PREFIX: &str = "reelcut-job-";

/// Prefix of outputs still being written next to their final name
pub const STAGING_PREFIX: &str = ".reelcut-";

/// Entries in `dir` older than `max_age` are deleted.
///
/// Top-level files and `reelcut-job-*` scratch directories are candidates;
/// with `staging_only` only `.reelcut-*` files are.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRule {
    pub label: String,
    pub dir: PathBuf,
    pub max_age: Duration,
    pub keep_peaks_cache: bool,
    pub staging_only: bool,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: Vec<PathBuf>,
    pub failed: usize,
}

impl SweepReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }
}

/// Sweeps the top level of each configured directory
#[derive(Debug, Clone, Default)]
pub struct CacheJanitor {
    rules: Vec<SweepRule>,
}

impl CacheJanitor {
    pub fn new(rules: Vec<SweepRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[SweepRule] {
        &self.rules
    }

    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now())
    }

    /// Sweep as if the current time were `now`
    pub fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        for rule in &self.rules {
            let before = report.deleted.len();
            sweep_dir(rule, now, &mut report);
            let deleted = report.deleted.len() - before;
            if deleted > 0 {
                info!(dir = %rule.dir.display(), deleted, "Cleanup: deleted old {} file(s)", rule.label);
            }
        }
        report
    }

    /// Sweep immediately and then every `interval` until `cancel` fires
    pub fn spawn_periodic(self, interval: Duration, cancel: CancelToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let janitor = self.clone();
                        match tokio::task::spawn_blocking(move || janitor.sweep()).await {
                            Ok(report) => debug!(deleted = report.deleted_count(), failed = report.failed, "Sweep finished"),
                            Err(e) => warn!("Sweep task failed: {}", e),
                        }
                    }
                    _ = cancel.cancelled() => {
                        debug!("Janitor stopped");
                        break;
                    }
                }
            }
        })
    }
}

fn file_name_matches(path: &Path, test: impl Fn(&str) -> bool) -> bool {
    path.file_name()
        .map(|n| test(&n.to_string_lossy()))
        .unwrap_or(false)
}

fn is_peaks_cache(path: &Path) -> bool {
    file_name_matches(path, |n| n.ends_with(PEAKS_CACHE_SUFFIX))
}

/// Whether `entry` may be evicted under `rule`, and whether it is a directory
fn candidate(rule: &SweepRule, entry: &walkdir::DirEntry) -> Option<bool> {
    let path = entry.path();
    let file_type = entry.file_type();
    if file_type.is_dir() {
        let scratch = file_name_matches(path, |n| n.starts_with(JOB_SCRATCH_PREFIX));
        return (scratch && !rule.staging_only).then_some(true);
    }
    if !file_type.is_file() {
        return None;
    }
    if rule.staging_only && !file_name_matches(path, |n| n.starts_with(STAGING_PREFIX)) {
        return None;
    }
    if rule.keep_peaks_cache && is_peaks_cache(path) {
        return None;
    }
    Some(false)
}

fn sweep_dir(rule: &SweepRule, now: SystemTime, report: &mut SweepReport) {
    if !rule.dir.is_dir() {
        debug!(dir = %rule.dir.display(), "Sweep directory does not exist");
        return;
    }

    for entry in WalkDir::new(&rule.dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %rule.dir.display(), "Error during {} cleanup: {}", rule.label, e);
                report.failed += 1;
                continue;
            }
        };
        let Some(is_dir) = candidate(rule, &entry) else {
            continue;
        };
        let path = entry.path();

        let modified = match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(modified)) => modified,
            Ok(Err(e)) => {
                warn!(path = %path.display(), "Cannot read modification time: {}", e);
                report.failed += 1;
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), "Cannot read metadata: {}", e);
                report.failed += 1;
                continue;
            }
        };
        // files from the future have age zero
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= rule.max_age {
            continue;
        }

        let removed = if is_dir {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        match removed {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted old {} file", rule.label);
                report.deleted.push(path.to_path_buf());
            }
            Err(e) => {
                warn!(path = %path.display(), "Error deleting {} file: {}", rule.label, e);
                report.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_sweep_deletes_only_old_files() {
        let uploads = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        touch(uploads.path(), "talk.mp4");
        touch(temp.path(), "still_intro.mp4");
        touch(temp.path(), "talk.mp4.peaks.json");
        fs::create_dir(temp.path().join("nested")).unwrap();
        touch(&temp.path().join("nested"), "deep.wav");

        let janitor = CacheJanitor::new(vec![
            SweepRule {
                label: "upload".into(),
                dir: uploads.path().to_path_buf(),
                max_age: 2190 * HOUR,
                keep_peaks_cache: false,
                staging_only: false,
            },
            SweepRule {
                label: "temp".into(),
                dir: temp.path().to_path_buf(),
                max_age: 24 * HOUR,
                keep_peaks_cache: true,
                staging_only: false,
            },
        ]);

        // nothing is old yet
        assert_eq!(janitor.sweep_at(SystemTime::now()), SweepReport::default());

        // two days later only the temp artifact has expired
        let report = janitor.sweep_at(SystemTime::now() + 48 * HOUR);
        assert_eq!(report.deleted, vec![temp.path().join("still_intro.mp4")]);
        assert!(temp.path().join("talk.mp4.peaks.json").exists());
        assert!(temp.path().join("nested").join("deep.wav").exists());
        assert!(uploads.path().join("talk.mp4").exists());

        // a year later uploads go too
        let report = janitor.sweep_at(SystemTime::now() + 365 * 24 * HOUR);
        assert_eq!(report.deleted, vec![uploads.path().join("talk.mp4")]);
        assert!(temp.path().join("talk.mp4.peaks.json").exists());
    }

    #[test]
    fn test_orphaned_job_scratch_is_evicted() {
        let temp = tempfile::tempdir().unwrap();
        let scratch = temp.path().join(format!("{}abc123", JOB_SCRATCH_PREFIX));
        fs::create_dir(&scratch).unwrap();
        touch(&scratch, "still_intro.mp4");
        touch(&scratch, "loudnorm-xyz.wav");
        fs::create_dir(temp.path().join("nested")).unwrap();

        let janitor = CacheJanitor::new(vec![SweepRule {
            label: "temp".into(),
            dir: temp.path().to_path_buf(),
            max_age: 24 * HOUR,
            keep_peaks_cache: true,
            staging_only: false,
        }]);

        assert_eq!(janitor.sweep_at(SystemTime::now()), SweepReport::default());
        assert!(scratch.is_dir());

        let report = janitor.sweep_at(SystemTime::now() + 365 * 24 * HOUR);
        assert_eq!(report.deleted, vec![scratch.clone()]);
        assert_eq!(report.failed, 0);
        assert!(!scratch.exists());
        assert!(temp.path().join("nested").is_dir());
    }

    #[test]
    fn test_staging_rule_only_touches_staged_outputs() {
        let processed = tempfile::tempdir().unwrap();
        let staged = touch(processed.path(), &format!("{}x1y2.mp4", STAGING_PREFIX));
        touch(processed.path(), "clipped_talk.mp4");
        touch(processed.path(), "clipped_talk.wav");

        let janitor = CacheJanitor::new(vec![SweepRule {
            label: "staging".into(),
            dir: processed.path().to_path_buf(),
            max_age: 24 * HOUR,
            keep_peaks_cache: false,
            staging_only: true,
        }]);

        let report = janitor.sweep_at(SystemTime::now() + 48 * HOUR);
        assert_eq!(report.deleted, vec![staged]);
        assert!(processed.path().join("clipped_talk.mp4").is_file());
        assert!(processed.path().join("clipped_talk.wav").is_file());
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let janitor = CacheJanitor::new(vec![SweepRule {
            label: "temp".into(),
            dir: PathBuf::from("/nonexistent/reelcut-temp"),
            max_age: HOUR,
            keep_peaks_cache: true,
            staging_only: false,
        }]);
        assert_eq!(janitor.sweep(), SweepReport::default());
    }

    #[tokio::test]
    async fn test_periodic_sweep_stops_on_cancel() {
        let temp = tempfile::tempdir().unwrap();
        let janitor = CacheJanitor::new(vec![SweepRule {
            label: "temp".into(),
            dir: temp.path().to_path_buf(),
            max_age: Duration::ZERO,
            keep_peaks_cache: true,
            staging_only: false,
        }]);
        let cancel = CancelToken::new();
        let handle = janitor.spawn_periodic(HOUR, cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("janitor should stop")
            .unwrap();
    }
}
