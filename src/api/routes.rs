use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::api::health::{HealthReport, HealthState};
use crate::error::GiveawayError;
use crate::giveaway::ControllerHandle;
use crate::types::GiveawaySnapshot;

#[derive(Clone)]
pub struct ApiState {
    pub controller: ControllerHandle,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/giveaway", get(get_giveaway))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthReport> {
    Json(state.health.report())
}

async fn get_giveaway(
    State(state): State<ApiState>,
) -> Result<Json<GiveawaySnapshot>, GiveawayError> {
    Ok(Json(state.controller.status().await?))
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::types::{ControlMsg, GiveawayStatus};

    #[tokio::test]
    async fn giveaway_route_serves_controller_snapshot() {
        let (control_tx, mut control_rx) = mpsc::channel(4);
        let state = ApiState {
            controller: ControllerHandle::new(control_tx),
            health: Arc::new(HealthState::new()),
        };
        tokio::spawn(async move {
            if let Some(ControlMsg::Status { reply }) = control_rx.recv().await {
                let _ = reply.send(GiveawaySnapshot {
                    status: GiveawayStatus::Closed,
                    prize: "1000 MC".to_string(),
                    winner_count: 5,
                    participant_count: 0,
                    ends_at: None,
                });
            }
        });

        let Json(snapshot) = get_giveaway(State(state)).await.unwrap();
        assert_eq!(snapshot.status, GiveawayStatus::Closed);
        assert_eq!(snapshot.winner_count, 5);
    }

    #[tokio::test]
    async fn giveaway_route_fails_without_controller() {
        let (control_tx, control_rx) = mpsc::channel(4);
        drop(control_rx);
        let state = ApiState {
            controller: ControllerHandle::new(control_tx),
            health: Arc::new(HealthState::new()),
        };
        assert_eq!(
            get_giveaway(State(state)).await.unwrap_err(),
            GiveawayError::ControllerUnavailable
        );
    }

    #[tokio::test]
    async fn health_route_reports_counters() {
        let (control_tx, _control_rx) = mpsc::channel(4);
        let health = Arc::new(HealthState::new());
        health.set_gateway_connected(true);
        health.inc_persist_failures();
        let state = ApiState {
            controller: ControllerHandle::new(control_tx),
            health,
        };

        let Json(report) = get_health(State(state)).await;
        assert!(report.gateway_connected);
        assert_eq!(report.persist_failures, 1);
        assert_eq!(report.announce_failures, 0);
    }
}
