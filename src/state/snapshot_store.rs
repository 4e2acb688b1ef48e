use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::types::{GiveawayRun, GiveawaySettings};

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// Whole-file JSON snapshots of the giveaway settings and the live run.
///
/// Every save replaces the previous content. Writes go to a sibling `.tmp` file that is
/// then renamed over the target, so a crash mid-write leaves the old snapshot readable.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    settings_path: PathBuf,
    run_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(settings_path: impl Into<PathBuf>, run_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
            run_path: run_path.into(),
        }
    }

    /// Load settings, falling back to the closed default when the file is missing or
    /// unreadable. The default is written back so the next boot finds a valid file.
    pub async fn load_settings(&self) -> GiveawaySettings {
        match read_json::<GiveawaySettings>(&self.settings_path).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(
                    path = %self.settings_path.display(),
                    "[STORE] settings unavailable ({e}), using closed defaults"
                );
                let settings = GiveawaySettings::default();
                if let Err(e) = self.save_settings(&settings).await {
                    error!("[STORE] failed to write default settings: {e}");
                }
                settings
            }
        }
    }

    pub async fn save_settings(&self, settings: &GiveawaySettings) -> Result<()> {
        write_json(&self.settings_path, settings).await
    }

    /// Load the last persisted run. Any failure means there is no run to resume.
    pub async fn load_run(&self) -> Option<GiveawayRun> {
        match read_json::<GiveawayRun>(&self.run_path).await {
            Ok(run) => Some(run),
            Err(e) => {
                warn!(path = %self.run_path.display(), "[STORE] no previous run: {e}");
                None
            }
        }
    }

    pub async fn save_run(&self, run: &GiveawayRun) -> Result<()> {
        write_json(&self.run_path, run).await
    }

    /// Remove the run snapshot. A missing file is not an error.
    pub async fn clear_run(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.run_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "[STORE] snapshot written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::{AnnouncementRef, DrawMode, GiveawayStatus, ParticipantId};

    static NEXT_DIR: AtomicU64 = AtomicU64::new(0);

    /// Fresh directory under the system temp dir, unique per test.
    pub(crate) fn scratch_dir(tag: &str) -> PathBuf {
        let n = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "giveaway-bot-{tag}-{}-{n}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub(crate) fn store_in(dir: &Path) -> SnapshotStore {
        SnapshotStore::new(dir.join("lottery_settings.json"), dir.join("lottery.json"))
    }

    #[tokio::test]
    async fn missing_settings_default_to_closed_and_self_heal() {
        let dir = scratch_dir("missing-settings");
        let store = store_in(&dir);

        let settings = store.load_settings().await;
        assert_eq!(settings, GiveawaySettings::default());
        assert_eq!(settings.status, GiveawayStatus::Closed);
        assert!(dir.join("lottery_settings.json").exists());
    }

    #[tokio::test]
    async fn corrupt_settings_are_replaced_with_defaults() {
        let dir = scratch_dir("corrupt-settings");
        std::fs::write(dir.join("lottery_settings.json"), b"{not json").unwrap();
        let store = store_in(&dir);

        let settings = store.load_settings().await;
        assert_eq!(settings, GiveawaySettings::default());

        let healed = std::fs::read_to_string(dir.join("lottery_settings.json")).unwrap();
        let reparsed: GiveawaySettings = serde_json::from_str(&healed).unwrap();
        assert_eq!(reparsed, GiveawaySettings::default());
    }

    #[tokio::test]
    async fn settings_save_replaces_previous_content() {
        let dir = scratch_dir("save-settings");
        let store = store_in(&dir);

        let mut settings = GiveawaySettings {
            prize: "Nitro".to_string(),
            winner_count: 3,
            duration_ms: 60_000,
            mode: DrawMode::Fake,
            fake_winner_id: Some(ParticipantId::new("7")),
            status: GiveawayStatus::Open,
        };
        store.save_settings(&settings).await.unwrap();
        settings.status = GiveawayStatus::Closed;
        store.save_settings(&settings).await.unwrap();

        assert_eq!(store.load_settings().await, settings);
        assert!(!dir.join("lottery_settings.json.tmp").exists());
    }

    #[tokio::test]
    async fn run_round_trips_and_clears() {
        let dir = scratch_dir("run");
        let store = store_in(&dir);

        let mut run = GiveawayRun::new(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        run.participants.insert(ParticipantId::new("1"));
        run.participants.insert(ParticipantId::new("2"));
        run.announcement = Some(AnnouncementRef::new("555"));
        store.save_run(&run).await.unwrap();

        assert_eq!(store.load_run().await, Some(run));

        store.clear_run().await.unwrap();
        assert_eq!(store.load_run().await, None);
        // Clearing twice is fine.
        store.clear_run().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_run_reads_as_no_previous_run() {
        let dir = scratch_dir("corrupt-run");
        std::fs::write(dir.join("lottery.json"), b"[]").unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load_run().await, None);
    }
}
