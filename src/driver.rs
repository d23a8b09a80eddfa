//! Protocol driver for one connection.
//!
//! The driver owns a [`Transport`] and runs a single event loop over two
//! sources: inbound frames from the socket and timer events from the
//! session's own queue. Every delayed action (home-data refresh, claim
//! cooldown, game start, round ticks) is a task that sleeps and then posts
//! a [`SessionEvent`], so all state changes happen on one timeline.

use crate::transport::{Transport, TransportError};
use layernet_protocol::{
    InboundFrame, OutboundCommand, Round, RoundSchedule, RoundTwoOutcome, SessionState, decode,
    encode, is_ping,
};
use std::time::Duration;
use strum::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep};
use tracing::{debug, info, instrument, trace, warn};

/// Delay between auth and the first home-data request.
pub const HOME_DATA_DELAY: Duration = Duration::from_secs(1);
/// How long the claim guard is held.
pub const CLAIM_COOLDOWN: Duration = Duration::from_secs(2);
/// Delay between a qualifying home-data frame and the start request.
pub const START_DELAY: Duration = Duration::from_secs(3);
/// Delay before starting the next game.
pub const RESTART_DELAY: Duration = Duration::from_secs(1);

/// Events posted to the session queue by timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEvent {
    HomeDataDue,
    ClaimCooldownElapsed,
    StartDue,
    RoundTick { round_id: u64 },
}

/// Why the driver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DriverExit {
    /// The socket closed or failed.
    #[strum(serialize = "disconnected")]
    Disconnected,
    /// The game ceiling was reached and the driver closed the socket.
    #[strum(serialize = "ceiling reached")]
    CeilingReached,
}

enum Step {
    Inbound(Option<Result<String, TransportError>>),
    Event(SessionEvent),
}

struct ActiveRound {
    id: u64,
    schedule: RoundSchedule,
    ticker: JoinHandle<()>,
}

/// Drives one connection through auth, claims and games.
pub struct ProtocolDriver<T> {
    transport: T,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    round: Option<ActiveRound>,
    next_round_id: u64,
}

impl<T: Transport> ProtocolDriver<T> {
    /// Wraps a freshly opened transport.
    pub fn new(transport: T) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            events_tx,
            events_rx,
            round: None,
            next_round_id: 0,
        }
    }

    /// Runs the connection until it closes or the game ceiling is reached.
    ///
    /// Sends `auth` immediately and schedules the first home-data request.
    /// Transport failures end the run as [`DriverExit::Disconnected`].
    #[instrument(skip_all, fields(account_id = %session.account_id()))]
    pub async fn run(mut self, session: &mut SessionState, token: &str) -> DriverExit {
        session.mark_connected();

        let exit = match self.event_loop(session, token).await {
            Ok(exit) => exit,
            Err(e) => {
                warn!(error = %e, "Transport failed");
                DriverExit::Disconnected
            }
        };

        if let Some(round) = self.round.take() {
            round.ticker.abort();
        }
        info!(%exit, games = session.completed_game_count(), "Driver stopped");
        exit
    }

    async fn event_loop(
        &mut self,
        session: &mut SessionState,
        token: &str,
    ) -> Result<DriverExit, TransportError> {
        self.send(OutboundCommand::Auth {
            token: token.to_string(),
        })
        .await?;
        self.schedule(HOME_DATA_DELAY, SessionEvent::HomeDataDue);

        loop {
            let step = tokio::select! {
                inbound = self.transport.recv() => Step::Inbound(inbound),
                Some(event) = self.events_rx.recv() => Step::Event(event),
            };

            match step {
                Step::Inbound(Some(Ok(text))) => self.handle_inbound(session, &text).await?,
                Step::Inbound(Some(Err(e))) => {
                    warn!(error = %e, "Error on socket");
                    return Ok(DriverExit::Disconnected);
                }
                Step::Inbound(None) => {
                    info!("Disconnected from server");
                    return Ok(DriverExit::Disconnected);
                }
                Step::Event(event) => {
                    if let Some(exit) = self.handle_event(session, event).await? {
                        return Ok(exit);
                    }
                }
            }
        }
    }

    async fn handle_inbound(
        &mut self,
        session: &mut SessionState,
        text: &str,
    ) -> Result<(), TransportError> {
        if is_ping(text) {
            trace!("Answering heartbeat");
            return self.send(OutboundCommand::Pong).await;
        }

        let frame = match decode(text) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                trace!(frame = %text, "Ignoring non-game frame");
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse message as JSON");
                return Ok(());
            }
        };

        if frame.is_game_not_started() && session.round2_active() {
            session.abort_round_two();
            return self.send(OutboundCommand::RequestHomeData).await;
        }

        self.process_game_data(session, &frame).await
    }

    async fn process_game_data(
        &mut self,
        session: &mut SessionState,
        frame: &InboundFrame,
    ) -> Result<(), TransportError> {
        let Some(home) = frame.home_data() else {
            return Ok(());
        };
        let Some((rank, countdown)) = home.game_data() else {
            return Ok(());
        };

        info!(
            role = rank.role.as_deref().unwrap_or("-"),
            profit_per_hour = rank.profit_per_hour.unwrap_or_default(),
            balance = ?home.gold,
            dogs = ?home.dogs,
            "Home data"
        );
        info!(
            minutes = countdown.minutes,
            seconds = countdown.seconds,
            "Time remaining to claim"
        );

        if session.should_claim(&countdown) && session.begin_claim() {
            info!("Claiming coin");
            self.send(OutboundCommand::WithdrawClaim).await?;
            self.schedule(CLAIM_COOLDOWN, SessionEvent::ClaimCooldownElapsed);
        }

        if session.may_schedule_start() {
            self.schedule(START_DELAY, SessionEvent::StartDue);
        }

        Ok(())
    }

    async fn handle_event(
        &mut self,
        session: &mut SessionState,
        event: SessionEvent,
    ) -> Result<Option<DriverExit>, TransportError> {
        match event {
            SessionEvent::HomeDataDue => {
                self.send(OutboundCommand::RequestHomeData).await?;
            }
            SessionEvent::ClaimCooldownElapsed => {
                session.finish_claim();
                self.send(OutboundCommand::RequestHomeData).await?;
            }
            SessionEvent::StartDue => {
                if session.begin_start() {
                    info!(
                        game = session.completed_game_count(),
                        ceiling = session.game_count_ceiling(),
                        "Starting game"
                    );
                    self.send(OutboundCommand::StartGame).await?;
                    session.mark_game_started();
                    self.begin_round(Round::One);
                }
            }
            SessionEvent::RoundTick { round_id } => {
                return self.handle_tick(session, round_id).await;
            }
        }
        Ok(None)
    }

    async fn handle_tick(
        &mut self,
        session: &mut SessionState,
        round_id: u64,
    ) -> Result<Option<DriverExit>, TransportError> {
        let Some(round) = self.round.as_mut().filter(|round| round.id == round_id) else {
            trace!(round_id, "Ignoring tick from a finished round");
            return Ok(None);
        };

        let outcome = round
            .schedule
            .fire(session.round2_active(), chrono::Utc::now().timestamp_millis());

        if let Some(command) = outcome.command {
            self.send(command).await?;
        }

        if outcome.exhausted {
            return self.finish_round(session).await;
        }
        Ok(None)
    }

    async fn finish_round(
        &mut self,
        session: &mut SessionState,
    ) -> Result<Option<DriverExit>, TransportError> {
        let Some(finished) = self.round.take() else {
            return Ok(None);
        };
        finished.ticker.abort();
        let round = finished.schedule.round();

        if let Some(next) = round.next() {
            info!(sent = finished.schedule.sent(), "Completed {}, starting {}", round, next);
            session.enter_round_two();
            self.begin_round(next);
            return Ok(None);
        }

        match session.complete_round_two() {
            RoundTwoOutcome::Restart { completed } => {
                self.send(OutboundCommand::RequestHomeData).await?;
                info!(
                    game = completed,
                    ceiling = session.game_count_ceiling(),
                    "Restarting game"
                );
                self.schedule(RESTART_DELAY, SessionEvent::StartDue);
                Ok(None)
            }
            RoundTwoOutcome::CeilingReached { completed } => {
                self.send(OutboundCommand::RequestHomeData).await?;
                info!(games = completed, "Game ceiling reached, closing connection");
                if let Err(e) = self.transport.close().await {
                    debug!(error = %e, "Close after final game failed");
                }
                Ok(Some(DriverExit::CeilingReached))
            }
            RoundTwoOutcome::Aborted => {
                debug!("Round 2 schedule ended after abort");
                Ok(None)
            }
        }
    }

    fn begin_round(&mut self, round: Round) {
        let id = self.next_round_id;
        self.next_round_id += 1;

        let cadence = round.cadence();
        let ticks = round.planned_ticks();
        let events = self.events_tx.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + cadence, cadence);
            for _ in 0..ticks {
                interval.tick().await;
                if events.send(SessionEvent::RoundTick { round_id: id }).is_err() {
                    break;
                }
            }
        });

        debug!(%round, id, ticks, ?cadence, "Round started");
        self.round = Some(ActiveRound {
            id,
            schedule: RoundSchedule::new(round),
            ticker,
        });
    }

    fn schedule(&self, delay: Duration, event: SessionEvent) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            let _ = events.send(event);
        });
    }

    async fn send(&mut self, command: OutboundCommand) -> Result<(), TransportError> {
        let frame = encode(&command);
        trace!(%command, %frame, "Sending frame");
        self.transport.send(frame).await
    }
}
