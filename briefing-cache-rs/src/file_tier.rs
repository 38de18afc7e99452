use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::record::{BriefingRecord, BriefingVariant};

/// Wire shape of the file tier: one file, one record, overwritten wholesale.
#[derive(Debug, Serialize, Deserialize)]
struct FileRecord {
    briefing: String,
    timestamp: DateTime<Utc>,
    user_id: String,
}

/// Cross-restart fallback tier.
///
/// Holds only the most recently written record. Purely advisory: write
/// failures are logged, never raised, and reads validate both the owner and
/// the freshness window before anything is served.
pub struct FileTier {
    path: PathBuf,
    freshness: Duration,
}

impl FileTier {
    pub fn new(path: PathBuf, freshness: Duration) -> Self {
        Self { path, freshness }
    }

    /// Best-effort mirror of a record. Runs synchronously so the write is
    /// finished before the caller's `put` returns, but its failure never
    /// fails the overall write.
    pub fn write(&self, record: &BriefingRecord) {
        if let Err(e) = self.write_inner(record) {
            warn!(
                "File tier write failed for {} ({}): {}",
                record.user_id,
                self.path.display(),
                e
            );
        }
    }

    fn write_inner(&self, record: &BriefingRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let payload = FileRecord {
            briefing: record.content.clone(),
            timestamp: record.updated_at,
            user_id: record.user_id.clone(),
        };
        let body = serde_json::to_vec_pretty(&payload)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // Temp file + rename so a crash mid-write never leaves a torn file.
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        debug!("File tier mirrored briefing for {}", record.user_id);
        Ok(())
    }

    /// Reads the stored record if it belongs to `user_id` and is within the
    /// freshness window. Any read or decode failure is treated as absent.
    pub fn read_fresh(&self, user_id: &str) -> Option<BriefingRecord> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("File tier read failed ({}): {}", self.path.display(), e);
                return None;
            }
        };

        let payload: FileRecord = match serde_json::from_slice(&raw) {
            Ok(p) => p,
            Err(e) => {
                warn!("File tier holds undecodable payload, ignoring: {}", e);
                return None;
            }
        };

        if payload.user_id != user_id {
            debug!(
                "File tier record belongs to {}, caller is {}",
                payload.user_id, user_id
            );
            return None;
        }

        let age = Utc::now().signed_duration_since(payload.timestamp);
        if age.to_std().map_or(true, |a| a > self.freshness) {
            return None;
        }

        Some(BriefingRecord {
            user_id: payload.user_id,
            content: payload.briefing,
            variant: BriefingVariant::General,
            cache_date: payload.timestamp.date_naive(),
            created_at: payload.timestamp,
            updated_at: payload.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tier_in(dir: &TempDir, freshness: Duration) -> FileTier {
        FileTier::new(dir.path().join("last_briefing.json"), freshness)
    }

    #[test]
    fn test_write_then_read_fresh() {
        let dir = TempDir::new().unwrap();
        let tier = tier_in(&dir, Duration::from_secs(60));

        tier.write(&BriefingRecord::new("u-1", "today's update", BriefingVariant::Morning));

        let record = tier.read_fresh("u-1").unwrap();
        assert_eq!(record.content, "today's update");
    }

    #[test]
    fn test_wrong_user_is_rejected() {
        let dir = TempDir::new().unwrap();
        let tier = tier_in(&dir, Duration::from_secs(60));

        tier.write(&BriefingRecord::new("u-1", "not yours", BriefingVariant::General));
        assert!(tier.read_fresh("u-2").is_none());
    }

    #[test]
    fn test_wholesale_overwrite() {
        let dir = TempDir::new().unwrap();
        let tier = tier_in(&dir, Duration::from_secs(60));

        tier.write(&BriefingRecord::new("u-1", "first", BriefingVariant::Morning));
        tier.write(&BriefingRecord::new("u-2", "second", BriefingVariant::Evening));

        // Only the most recent record exists; the first owner lost theirs.
        assert!(tier.read_fresh("u-1").is_none());
        assert_eq!(tier.read_fresh("u-2").unwrap().content, "second");
    }

    #[test]
    fn test_stale_record_is_absent() {
        let dir = TempDir::new().unwrap();
        let tier = tier_in(&dir, Duration::from_secs(60));

        let mut record = BriefingRecord::new("u-1", "old news", BriefingVariant::General);
        record.updated_at = Utc::now() - chrono::Duration::hours(2);
        tier.write(&record);

        assert!(tier.read_fresh("u-1").is_none());
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let tier = tier_in(&dir, Duration::from_secs(60));
        assert!(tier.read_fresh("u-1").is_none());
    }
}
