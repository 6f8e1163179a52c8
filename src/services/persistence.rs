use crate::models::AchievementInfo;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// File name used for saved achievement state.
pub const ACHIEVEMENTS_FILE_NAME: &str = "achievements.ini";

/// One saved achievement section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAchievementRecord {
    pub id: String,
    pub achieved: bool,
    pub unlock_time: i64,
}

/// Errors that can occur while reading or writing saved achievements
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to write {path}: {message}")]
    Io { path: Utf8PathBuf, message: String },

    #[error("Failed to read {path}: {message}")]
    Read { path: Utf8PathBuf, message: String },
}

/// Destination of a game's saved achievements.
pub fn achievements_path(base_path: &Utf8Path, game_id: u32) -> Utf8PathBuf {
    base_path
        .join(game_id.to_string())
        .join(ACHIEVEMENTS_FILE_NAME)
}

/// Render the saved file content for `records`, in order.
///
/// Entries without a stored unlock epoch are stamped with `now`.
pub fn render_achievements<'a, I>(records: I, now: i64) -> String
where
    I: IntoIterator<Item = &'a AchievementInfo>,
{
    let mut content = String::new();
    for record in records {
        let unlock_time = record.unlock_time_unix.unwrap_or(now);
        content.push_str(&format!(
            "[{}]\nAchieved=1\nUnlockTime={}\n\n",
            record.id, unlock_time
        ));
    }
    content
}

/// Write the checked achievements of one game to disk.
///
/// `checked` is the snapshot of entries selected for saving; nothing else is
/// written, since a missing section means locked. The destination directory
/// is created if needed and the file is replaced. An empty snapshot is a no-op
/// that returns 0 without touching the filesystem.
pub fn write_achievements(
    checked: &[AchievementInfo],
    game_id: u32,
    base_path: &Utf8Path,
) -> Result<usize, WriteError> {
    if checked.is_empty() {
        tracing::debug!("No checked achievements for game {}, nothing to write", game_id);
        return Ok(0);
    }

    let path = achievements_path(base_path, game_id);
    let content = render_achievements(checked, current_epoch());

    let io_error = |e: std::io::Error| WriteError::Io {
        path: path.clone(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(&path, content).map_err(io_error)?;

    tracing::info!("Saved {} achievements to {}", checked.len(), path);
    Ok(checked.len())
}

fn current_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Parser for saved achievement files.
///
/// Compiles its patterns once:
///
/// - `section_pattern`: `[ACH_ID]` headers
/// - `entry_pattern`: `Key=Value` lines inside a section
pub struct PersistedFileReader {
    section_pattern: Regex,
    entry_pattern: Regex,
}

impl PersistedFileReader {
    pub fn new() -> Self {
        Self {
            section_pattern: Regex::new(r"^\[(.+)\]$").expect("Invalid section regex"),
            entry_pattern: Regex::new(r"^([A-Za-z]+)\s*=\s*(.*)$").expect("Invalid entry regex"),
        }
    }

    /// Parse file content into records in file order.
    ///
    /// Unknown keys and stray lines are ignored. Sections without an
    /// `Achieved` key count as not achieved.
    pub fn parse(&self, content: &str) -> Vec<PersistedAchievementRecord> {
        let mut records: Vec<PersistedAchievementRecord> = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = self.section_pattern.captures(line) {
                records.push(PersistedAchievementRecord {
                    id: caps[1].to_string(),
                    achieved: false,
                    unlock_time: 0,
                });
                continue;
            }

            let (Some(current), Some(caps)) = (records.last_mut(), self.entry_pattern.captures(line))
            else {
                tracing::debug!("Ignoring line outside of a section: {}", line);
                continue;
            };

            let value = caps[2].trim();
            match &caps[1] {
                "Achieved" => current.achieved = value == "1" || value.eq_ignore_ascii_case("true"),
                "UnlockTime" => current.unlock_time = value.parse().unwrap_or(0),
                other => tracing::debug!("Ignoring key '{}' in [{}]", other, current.id),
            }
        }

        records
    }

    /// Read a saved file. A missing file yields no records.
    pub fn read(&self, path: &Utf8Path) -> Result<Vec<PersistedAchievementRecord>, WriteError> {
        if !path.exists() {
            tracing::debug!("No saved achievements at {}", path);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path).map_err(|e| WriteError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(self.parse(&content))
    }
}

impl Default for PersistedFileReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AchievementDefinition;
    use tempfile::TempDir;

    fn info(id: &str, epoch: i64) -> AchievementInfo {
        let definition = AchievementDefinition {
            id: id.to_string(),
            name: id.to_string(),
            icon_unlocked: "a.jpg".to_string(),
            icon_locked: "a.jpg".to_string(),
            ..Default::default()
        };
        AchievementInfo::from_definition(&definition, true, epoch)
    }

    fn temp_base() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let base = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, base)
    }

    #[test]
    fn test_render_uses_raw_epoch_or_now() {
        let content = render_achievements(&[info("ACH_01", 1_700_000_000), info("ACH_02", 0)], 42);
        assert_eq!(
            content,
            "[ACH_01]\nAchieved=1\nUnlockTime=1700000000\n\n[ACH_02]\nAchieved=1\nUnlockTime=42\n\n"
        );
    }

    #[test]
    fn test_write_creates_directories() {
        let (_temp_dir, base) = temp_base();
        let base = base.join("nested").join("saves");

        let count = write_achievements(&[info("ACH_01", 1_700_000_000)], 480, &base).unwrap();
        assert_eq!(count, 1);

        let written = fs::read_to_string(base.join("480").join("achievements.ini")).unwrap();
        assert_eq!(written, "[ACH_01]\nAchieved=1\nUnlockTime=1700000000\n\n");
    }

    #[test]
    fn test_empty_snapshot_touches_nothing() {
        let (_temp_dir, base) = temp_base();
        assert_eq!(write_achievements(&[], 480, &base).unwrap(), 0);
        assert!(!base.join("480").exists());
    }

    #[test]
    fn test_write_replaces_previous_file() {
        let (_temp_dir, base) = temp_base();
        write_achievements(&[info("ACH_01", 1), info("ACH_02", 2)], 480, &base).unwrap();
        write_achievements(&[info("ACH_03", 3)], 480, &base).unwrap();

        let records = PersistedFileReader::new()
            .read(&achievements_path(&base, 480))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "ACH_03");
    }

    #[test]
    fn test_write_failure_is_reported() {
        let (_temp_dir, base) = temp_base();
        // A file where the game directory should be.
        fs::write(base.join("480"), "blocker").unwrap();

        let err = write_achievements(&[info("ACH_01", 1)], 480, &base).unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
    }

    #[test]
    fn test_parse_tolerates_crlf_and_unknown_keys() {
        let content = "[ACH_A]\r\nAchieved=1\r\nUnlockTime=99\r\nProgress=3\r\n\r\n[ACH_B]\r\nAchieved=0\r\n";
        let records = PersistedFileReader::new().parse(content);
        assert_eq!(
            records,
            vec![
                PersistedAchievementRecord {
                    id: "ACH_A".to_string(),
                    achieved: true,
                    unlock_time: 99,
                },
                PersistedAchievementRecord {
                    id: "ACH_B".to_string(),
                    achieved: false,
                    unlock_time: 0,
                },
            ]
        );
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let (_temp_dir, base) = temp_base();
        let records = PersistedFileReader::new()
            .read(&achievements_path(&base, 1))
            .unwrap();
        assert!(records.is_empty());
    }
}
