use serenity::all::{
    CommandDataOption, CommandOptionType, CreateCommand, CreateCommandOption, Permissions,
};

use crate::error::GiveawayError;
use crate::types::{DrawMode, ParticipantId, StartRequest};

pub const START_COMMAND: &str = "startlottery";
pub const END_COMMAND: &str = "endlottery";

const MS_PER_MINUTE: i64 = 60_000;

/// Slash commands registered on startup. Both are limited to administrators.
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(END_COMMAND)
            .description("End the current giveaway")
            .default_member_permissions(Permissions::ADMINISTRATOR),
        CreateCommand::new(START_COMMAND)
            .description("Start a new giveaway")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "prize", "Prize")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::Integer, "winners", "Number of winners")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::Integer, "duration", "Duration in minutes")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "status", "Giveaway mode (real or fake)")
                    .required(true)
                    .add_string_choice("Real", "real")
                    .add_string_choice("Fake", "fake"),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "winner", "Winner (fake mode only)")
                    .required(false),
            ),
    ]
}

/// Raw `/startlottery` arguments before validation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StartOptions {
    pub prize: Option<String>,
    pub winners: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub status: Option<String>,
    pub winner: Option<String>,
}

impl StartOptions {
    pub fn from_options(options: &[CommandDataOption]) -> Self {
        let mut parsed = Self::default();
        for option in options {
            match option.name.as_str() {
                "prize" => parsed.prize = option.value.as_str().map(str::to_string),
                "winners" => parsed.winners = option.value.as_i64(),
                "duration" => parsed.duration_minutes = option.value.as_i64(),
                "status" => parsed.status = option.value.as_str().map(str::to_string),
                "winner" => parsed.winner = option.value.as_str().map(str::to_string),
                _ => {}
            }
        }
        parsed
    }

    pub fn into_request(self) -> Result<StartRequest, GiveawayError> {
        let invalid = |msg: &str| GiveawayError::InvalidRequest(msg.to_string());

        let prize = self.prize.ok_or_else(|| invalid("prize is required"))?;
        let winner_count = self
            .winners
            .filter(|w| *w > 0)
            .and_then(|w| u32::try_from(w).ok())
            .ok_or_else(|| invalid("winners must be a positive number"))?;
        let duration_ms = self
            .duration_minutes
            .filter(|d| *d > 0)
            .and_then(|d| d.checked_mul(MS_PER_MINUTE))
            .and_then(|ms| u64::try_from(ms).ok())
            .ok_or_else(|| invalid("duration must be a positive number of minutes"))?;
        let mode = match self.status.as_deref() {
            Some("real") => DrawMode::Real,
            Some("fake") => DrawMode::Fake,
            _ => return Err(invalid("status must be real or fake")),
        };
        let fake_winner_id = match mode {
            DrawMode::Fake => Some(
                self.winner
                    .as_deref()
                    .and_then(normalize_user_ref)
                    .ok_or_else(|| invalid("fake mode requires a winner"))?,
            ),
            DrawMode::Real => None,
        };

        let request = StartRequest {
            prize,
            winner_count,
            duration_ms,
            mode,
            fake_winner_id,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Accepts a bare user id or a mention (`<@id>`, `<@!id>`).
pub fn normalize_user_ref(raw: &str) -> Option<ParticipantId> {
    let trimmed = raw.trim();
    let id = trimmed
        .strip_prefix("<@")
        .and_then(|s| s.strip_suffix('>'))
        .map(|s| s.trim_start_matches('!'))
        .unwrap_or(trimmed);
    (!id.is_empty()).then(|| ParticipantId::new(id))
}
