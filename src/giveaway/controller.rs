use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::api::health::HealthState;
use crate::error::GiveawayError;
use crate::giveaway::selection::select_winners;
use crate::giveaway::Announcer;
use crate::state::SnapshotStore;
use crate::types::{
    ControlMsg, DrawResult, GiveawayRun, GiveawaySettings, GiveawaySnapshot, GiveawayStatus,
    GiveawayView, JoinOutcome, ParticipantId, Reply, StartRequest,
};

// ---------------------------------------------------------------------------
// GiveawayController
// ---------------------------------------------------------------------------

/// Owns the single giveaway and serialises every operation on it.
///
/// Runs as one task: control messages and the expiry deadline are multiplexed in
/// `run()`, so no two transitions ever interleave. Every mutation is persisted before
/// the reply goes back to the caller.
pub struct GiveawayController<A> {
    store: SnapshotStore,
    announcer: A,
    health: Arc<HealthState>,
    control_rx: mpsc::Receiver<ControlMsg>,
    settings: GiveawaySettings,
    run: Option<GiveawayRun>,
    /// When the open run expires. None while closed.
    deadline: Option<Instant>,
    rng: StdRng,
}

impl<A: Announcer> GiveawayController<A> {
    pub fn new(
        store: SnapshotStore,
        announcer: A,
        health: Arc<HealthState>,
        control_rx: mpsc::Receiver<ControlMsg>,
    ) -> Self {
        Self {
            store,
            announcer,
            health,
            control_rx,
            settings: GiveawaySettings::default(),
            run: None,
            deadline: None,
            rng: StdRng::from_os_rng(),
        }
    }

    #[cfg(test)]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Resume whatever was persisted, then serve requests until every handle is dropped.
    pub async fn run(mut self) {
        self.recover().await;

        loop {
            let deadline = self.deadline;
            tokio::select! {
                msg = self.control_rx.recv() => match msg {
                    Some(msg) => self.handle(msg).await,
                    None => break,
                },
                _ = wait_for(deadline) => self.expire().await,
            }
        }
        info!("[GIVEAWAY] control channel closed, controller stopped");
    }

    async fn handle(&mut self, msg: ControlMsg) {
        match msg {
            ControlMsg::Start { request, reply } => {
                let _ = reply.send(self.start(request).await);
            }
            ControlMsg::Join { participant, reply } => {
                let _ = reply.send(self.join(participant).await);
            }
            ControlMsg::ForceEnd { reply } => {
                let _ = reply.send(self.force_end().await);
            }
            ControlMsg::Status { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Restore state from the snapshots. Must run before any other operation.
    pub async fn recover(&mut self) {
        self.settings = self.store.load_settings().await;
        if !self.settings.is_open() {
            info!("[GIVEAWAY] no open giveaway to resume");
            return;
        }

        let Some(run) = self.store.load_run().await else {
            error!("[GIVEAWAY] settings are open but no run snapshot could be loaded, closing");
            self.settings.status = GiveawayStatus::Closed;
            self.persist_settings().await;
            return;
        };

        let end_time = run.end_time;
        let participants = run.participants.len();
        self.run = Some(run);

        match remaining_until(end_time, Utc::now()) {
            Some(remaining) => {
                self.deadline = Some(Instant::now() + remaining);
                info!(
                    prize = %self.settings.prize,
                    participants,
                    ends_at = %end_time,
                    "[GIVEAWAY] resumed open giveaway, {}s remaining",
                    remaining.as_secs(),
                );
            }
            None => {
                info!(ends_at = %end_time, "[GIVEAWAY] giveaway ended while offline, drawing now");
                self.close_run().await;
            }
        }
    }

    pub async fn start(&mut self, request: StartRequest) -> Result<GiveawaySnapshot, GiveawayError> {
        if self.settings.is_open() {
            debug!("[GIVEAWAY] start rejected: already running");
            return Err(GiveawayError::AlreadyRunning);
        }
        request.validate()?;

        let too_long = || GiveawayError::InvalidRequest("duration is too long".to_string());
        let duration = Duration::from_millis(request.duration_ms);
        let now = Utc::now();
        let end_time = i64::try_from(request.duration_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or_else(too_long)?;
        let deadline = Instant::now().checked_add(duration).ok_or_else(too_long)?;

        self.settings = GiveawaySettings::opened(request);
        self.run = Some(GiveawayRun::new(end_time));
        self.deadline = Some(deadline);
        self.persist_settings().await;
        self.persist_run().await;

        info!(
            prize = %self.settings.prize,
            winners = self.settings.winner_count,
            mode = %self.settings.mode,
            ends_at = %end_time,
            "[GIVEAWAY] started",
        );

        if let Some(view) = self.view(None) {
            match self.announcer.post_giveaway(&view).await {
                Ok(reference) => {
                    if let Some(run) = self.run.as_mut() {
                        run.announcement = Some(reference);
                    }
                    self.persist_run().await;
                }
                Err(e) => {
                    warn!("[GIVEAWAY] failed to post announcement: {e}");
                    self.health.inc_announce_failures();
                }
            }
        }

        Ok(self.snapshot())
    }

    pub async fn join(&mut self, participant: ParticipantId) -> Result<JoinOutcome, GiveawayError> {
        if self.deadline.is_some_and(|at| Instant::now() >= at) {
            self.expire().await;
        }
        if !self.settings.is_open() {
            debug!(participant = %participant, "[GIVEAWAY] join rejected: no active run");
            return Err(GiveawayError::NoActiveRun);
        }
        let Some(run) = self.run.as_mut() else {
            return Err(GiveawayError::NoActiveRun);
        };
        if !run.participants.insert(participant.clone()) {
            debug!(participant = %participant, "[GIVEAWAY] join ignored: already joined");
            return Err(GiveawayError::AlreadyJoined);
        }
        let participant_count = run.participants.len();
        self.persist_run().await;
        debug!(participant = %participant, participant_count, "[GIVEAWAY] joined");

        self.refresh_announcement(participant).await;
        Ok(JoinOutcome { participant_count })
    }

    pub async fn force_end(&mut self) -> Result<DrawResult, GiveawayError> {
        if !self.settings.is_open() {
            debug!("[GIVEAWAY] end rejected: no active run");
            return Err(GiveawayError::NoActiveRun);
        }
        info!("[GIVEAWAY] ended by administrator");
        Ok(self.close_run().await)
    }

    /// Expiry callback. A late firing after the run already closed does nothing.
    pub async fn expire(&mut self) {
        if !self.settings.is_open() {
            debug!("[GIVEAWAY] stale expiry ignored");
            self.deadline = None;
            return;
        }
        info!("[GIVEAWAY] time is up");
        self.close_run().await;
    }

    async fn close_run(&mut self) -> DrawResult {
        self.deadline = None;
        let run = self.run.take();
        let empty = BTreeSet::new();
        let participants = run.as_ref().map_or(&empty, |r| &r.participants);

        let winners = select_winners(
            participants,
            self.settings.winner_count,
            self.settings.mode,
            self.settings.fake_winner_id.as_ref(),
            &mut self.rng,
        );
        let result = DrawResult {
            prize: self.settings.prize.clone(),
            winners,
            participant_count: participants.len(),
        };

        // Closure hits disk before the results go out, so a restart never announces twice.
        self.settings.status = GiveawayStatus::Closed;
        self.persist_settings().await;
        if let Err(e) = self.store.clear_run().await {
            error!("[GIVEAWAY] failed to clear run snapshot: {e}");
            self.health.inc_persist_failures();
        }

        info!(
            prize = %result.prize,
            participants = result.participant_count,
            winners = result.winners.len(),
            "[GIVEAWAY] closed",
        );

        if let Err(e) = self.announcer.post_results(&result).await {
            warn!("[GIVEAWAY] failed to post results: {e}");
            self.health.inc_announce_failures();
        }
        result
    }

    async fn refresh_announcement(&self, last_participant: ParticipantId) {
        let Some(reference) = self.run.as_ref().and_then(|r| r.announcement.as_ref()) else {
            return;
        };
        let Some(view) = self.view(Some(last_participant)) else {
            return;
        };
        if let Err(e) = self.announcer.refresh_giveaway(reference, &view).await {
            warn!("[GIVEAWAY] failed to refresh announcement: {e}");
            self.health.inc_announce_failures();
        }
    }

    async fn persist_settings(&self) {
        if let Err(e) = self.store.save_settings(&self.settings).await {
            error!("[GIVEAWAY] failed to persist settings: {e}");
            self.health.inc_persist_failures();
        }
    }

    async fn persist_run(&self) {
        let Some(run) = self.run.as_ref() else {
            return;
        };
        if let Err(e) = self.store.save_run(run).await {
            error!("[GIVEAWAY] failed to persist run: {e}");
            self.health.inc_persist_failures();
        }
    }

    fn view(&self, last_participant: Option<ParticipantId>) -> Option<GiveawayView> {
        let run = self.run.as_ref()?;
        Some(GiveawayView {
            prize: self.settings.prize.clone(),
            winner_count: self.settings.winner_count,
            participant_count: run.participants.len(),
            ends_at: run.end_time,
            last_participant,
        })
    }

    pub fn snapshot(&self) -> GiveawaySnapshot {
        let run = self.run.as_ref().filter(|_| self.settings.is_open());
        GiveawaySnapshot {
            status: self.settings.status,
            prize: self.settings.prize.clone(),
            winner_count: self.settings.winner_count,
            participant_count: run.map_or(0, |r| r.participants.len()),
            ends_at: run.map(|r| r.end_time),
        }
    }

    #[cfg(test)]
    pub fn settings(&self) -> &GiveawaySettings {
        &self.settings
    }

    #[cfg(test)]
    pub fn current_run(&self) -> Option<&GiveawayRun> {
        self.run.as_ref()
    }

    #[cfg(test)]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Time left until `end_time`, or None once it has passed.
fn remaining_until(end_time: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    (end_time - now).to_std().ok().filter(|d| !d.is_zero())
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

// ---------------------------------------------------------------------------
// ControllerHandle
// ---------------------------------------------------------------------------

/// Cloneable front door to the controller task.
#[derive(Clone)]
pub struct ControllerHandle {
    control_tx: mpsc::Sender<ControlMsg>,
}

impl ControllerHandle {
    pub fn new(control_tx: mpsc::Sender<ControlMsg>) -> Self {
        Self { control_tx }
    }

    pub async fn start(&self, request: StartRequest) -> Result<GiveawaySnapshot, GiveawayError> {
        self.request(|reply| ControlMsg::Start { request, reply }).await
    }

    pub async fn join(&self, participant: ParticipantId) -> Result<JoinOutcome, GiveawayError> {
        self.request(|reply| ControlMsg::Join { participant, reply }).await
    }

    pub async fn force_end(&self) -> Result<DrawResult, GiveawayError> {
        self.request(|reply| ControlMsg::ForceEnd { reply }).await
    }

    pub async fn status(&self) -> Result<GiveawaySnapshot, GiveawayError> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(ControlMsg::Status { reply })
            .await
            .map_err(|_| GiveawayError::ControllerUnavailable)?;
        rx.await.map_err(|_| GiveawayError::ControllerUnavailable)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> ControlMsg,
    ) -> Result<T, GiveawayError> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(build(reply))
            .await
            .map_err(|_| GiveawayError::ControllerUnavailable)?;
        rx.await.map_err(|_| GiveawayError::ControllerUnavailable)?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
