use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid announcement reference: {0}")]
    AnnouncementRef(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Rejections reported back to whoever issued the request. The display text is
/// shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GiveawayError {
    #[error("A giveaway is already running!")]
    AlreadyRunning,

    #[error("There is no active giveaway right now.")]
    NoActiveRun,

    #[error("You are already taking part in this giveaway!")]
    AlreadyJoined,

    #[error("You do not have permission to run this command.")]
    PermissionDenied,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("The giveaway service is not available right now.")]
    ControllerUnavailable,
}

impl IntoResponse for GiveawayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GiveawayError::ControllerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            GiveawayError::PermissionDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::CONFLICT,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_status_codes() {
        let status = |e: GiveawayError| e.into_response().status();
        assert_eq!(status(GiveawayError::ControllerUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status(GiveawayError::PermissionDenied), StatusCode::FORBIDDEN);
        assert_eq!(status(GiveawayError::AlreadyRunning), StatusCode::CONFLICT);
        assert_eq!(status(GiveawayError::NoActiveRun), StatusCode::CONFLICT);
    }
}
