use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::GiveawayError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Chat user id of a participant (or of the predetermined winner).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to the posted announcement. The Discord announcer stores the message id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnouncementRef(String);

impl AnnouncementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawMode {
    #[default]
    Real,
    Fake,
}

impl DrawMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "real" => Some(DrawMode::Real),
            "fake" => Some(DrawMode::Fake),
            _ => None,
        }
    }
}

impl std::fmt::Display for DrawMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawMode::Real => write!(f, "real"),
            DrawMode::Fake => write!(f, "fake"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiveawayStatus {
    Open,
    #[default]
    Closed,
}

impl GiveawayStatus {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "open" => Some(GiveawayStatus::Open),
            "closed" | "close" => Some(GiveawayStatus::Closed),
            _ => None,
        }
    }
}

/// Configuration of the current (or last) giveaway, persisted to `lottery_settings.json`.
///
/// The default is a closed giveaway with zero duration and zero winners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SettingsFile")]
pub struct GiveawaySettings {
    pub prize: String,
    pub winner_count: u32,
    pub duration_ms: u64,
    pub mode: DrawMode,
    pub fake_winner_id: Option<ParticipantId>,
    pub status: GiveawayStatus,
}

impl GiveawaySettings {
    pub fn is_open(&self) -> bool {
        self.status == GiveawayStatus::Open
    }

    /// Settings for a freshly started giveaway.
    pub fn opened(request: StartRequest) -> Self {
        Self {
            prize: request.prize,
            winner_count: request.winner_count,
            duration_ms: request.duration_ms,
            mode: request.mode,
            fake_winner_id: request.fake_winner_id,
            status: GiveawayStatus::Open,
        }
    }
}

/// On-disk shape accepted when reading settings. Older files keep the draw mode under
/// `status` and the open/close flag under `giveStatus`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    prize: String,
    #[serde(default, alias = "winners")]
    winner_count: u32,
    #[serde(default, alias = "duration")]
    duration_ms: u64,
    #[serde(default)]
    mode: Option<DrawMode>,
    #[serde(default, alias = "fakeWinner")]
    fake_winner_id: Option<ParticipantId>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    give_status: Option<String>,
}

impl From<SettingsFile> for GiveawaySettings {
    fn from(file: SettingsFile) -> Self {
        let (status, mode) = match file.give_status {
            Some(give_status) => (
                GiveawayStatus::parse(&give_status),
                file.mode.or_else(|| file.status.as_deref().and_then(DrawMode::parse)),
            ),
            None => (file.status.as_deref().and_then(GiveawayStatus::parse), file.mode),
        };
        Self {
            prize: file.prize,
            winner_count: file.winner_count,
            duration_ms: file.duration_ms,
            mode: mode.unwrap_or_default(),
            fake_winner_id: file.fake_winner_id,
            status: status.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// The live giveaway, persisted to `lottery.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiveawayRun {
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
    pub participants: BTreeSet<ParticipantId>,
    #[serde(rename = "messageId", default)]
    pub announcement: Option<AnnouncementRef>,
}

impl GiveawayRun {
    pub fn new(end_time: DateTime<Utc>) -> Self {
        Self {
            end_time,
            participants: BTreeSet::new(),
            announcement: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests and results
// ---------------------------------------------------------------------------

/// A validated `/startlottery` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub prize: String,
    pub winner_count: u32,
    pub duration_ms: u64,
    pub mode: DrawMode,
    pub fake_winner_id: Option<ParticipantId>,
}

impl StartRequest {
    pub fn validate(&self) -> Result<(), GiveawayError> {
        if self.prize.trim().is_empty() {
            return Err(GiveawayError::InvalidRequest("prize must not be empty".to_string()));
        }
        if self.winner_count == 0 {
            return Err(GiveawayError::InvalidRequest(
                "winner count must be greater than zero".to_string(),
            ));
        }
        if self.duration_ms == 0 {
            return Err(GiveawayError::InvalidRequest(
                "duration must be greater than zero".to_string(),
            ));
        }
        match (self.mode, &self.fake_winner_id) {
            (DrawMode::Fake, None) => Err(GiveawayError::InvalidRequest(
                "fake mode requires a winner".to_string(),
            )),
            (DrawMode::Real, Some(_)) => Err(GiveawayError::InvalidRequest(
                "a winner can only be set in fake mode".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Data the announcer needs to render the live giveaway message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiveawayView {
    pub prize: String,
    pub winner_count: u32,
    pub participant_count: usize,
    pub ends_at: DateTime<Utc>,
    pub last_participant: Option<ParticipantId>,
}

/// Outcome of a closed giveaway, handed to the announcer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawResult {
    pub prize: String,
    pub winners: Vec<ParticipantId>,
    pub participant_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    pub participant_count: usize,
}

/// Public view of the giveaway served by the status API. Never carries the draw mode
/// or the predetermined winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GiveawaySnapshot {
    pub status: GiveawayStatus,
    pub prize: String,
    pub winner_count: u32,
    pub participant_count: usize,
    pub ends_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Controller messages
// ---------------------------------------------------------------------------

pub type Reply<T> = oneshot::Sender<Result<T, GiveawayError>>;

/// Requests routed from the Discord handler and the API to the giveaway controller.
#[derive(Debug)]
pub enum ControlMsg {
    Start {
        request: StartRequest,
        reply: Reply<GiveawaySnapshot>,
    },
    Join {
        participant: ParticipantId,
        reply: Reply<JoinOutcome>,
    },
    ForceEnd {
        reply: Reply<DrawResult>,
    },
    Status {
        reply: oneshot::Sender<GiveawaySnapshot>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: DrawMode, fake: Option<&str>) -> StartRequest {
        StartRequest {
            prize: "1000 MC".to_string(),
            winner_count: 2,
            duration_ms: 60_000,
            mode,
            fake_winner_id: fake.map(ParticipantId::new),
        }
    }

    #[test]
    fn settings_round_trip_uses_current_field_names() {
        let settings = GiveawaySettings::opened(request(DrawMode::Fake, Some("42")));
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["winnerCount"], 2);
        assert_eq!(json["durationMs"], 60_000);
        assert_eq!(json["mode"], "fake");
        assert_eq!(json["fakeWinnerId"], "42");
        assert_eq!(json["status"], "open");

        let back: GiveawaySettings = serde_json::from_value(json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn legacy_settings_file_is_understood() {
        let raw = r#"{"prize":"1000 MC","winners":5,"duration":86400000,
            "status":"fake","fakeWinner":"123","giveStatus":"close"}"#;
        let settings: GiveawaySettings = serde_json::from_str(raw).unwrap();
        assert_eq!(settings.winner_count, 5);
        assert_eq!(settings.duration_ms, 86_400_000);
        assert_eq!(settings.mode, DrawMode::Fake);
        assert_eq!(settings.fake_winner_id, Some(ParticipantId::new("123")));
        assert_eq!(settings.status, GiveawayStatus::Closed);
    }

    #[test]
    fn missing_fields_fall_back_to_closed_defaults() {
        let settings: GiveawaySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, GiveawaySettings::default());
        assert!(!settings.is_open());
    }

    #[test]
    fn run_uses_iso_end_time_and_message_id() {
        let raw = r#"{"endTime":"2024-05-01T12:00:00.000Z","participants":["1","2","1"],"messageId":"999"}"#;
        let run: GiveawayRun = serde_json::from_str(raw).unwrap();
        assert_eq!(run.participants.len(), 2);
        assert_eq!(run.announcement, Some(AnnouncementRef::new("999")));
        assert_eq!(run.end_time.timestamp(), 1_714_564_800);
    }

    #[test]
    fn fake_mode_without_winner_is_rejected() {
        assert!(matches!(
            request(DrawMode::Fake, None).validate(),
            Err(GiveawayError::InvalidRequest(_))
        ));
        assert!(request(DrawMode::Fake, Some("7")).validate().is_ok());
        assert!(request(DrawMode::Real, None).validate().is_ok());
    }

    #[test]
    fn zero_winners_or_duration_is_rejected() {
        let mut req = request(DrawMode::Real, None);
        req.winner_count = 0;
        assert!(req.validate().is_err());

        let mut req = request(DrawMode::Real, None);
        req.duration_ms = 0;
        assert!(req.validate().is_err());
    }
}
