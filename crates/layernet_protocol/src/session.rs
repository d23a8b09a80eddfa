//! Per-account session state.
//!
//! [`SessionState`] holds the flags that guard claim, start and round
//! progress for one account. All mutation goes through transition methods
//! so the flags can never drift into a combination the driver does not
//! expect: `round2_active` implies `game_started`.

use crate::frame::ClaimCountdown;
use strum::Display;
use tracing::{debug, info, instrument};

/// A claim is attempted once fewer than this many minutes remain.
pub const CLAIM_THRESHOLD_MINUTES: f64 = 10.0;

/// Coarse lifecycle position of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Not connected and not trying to.
    Idle,
    /// Fetching a token and opening the socket.
    Authenticating,
    /// Socket open, no game activity.
    Connected,
    /// Reward claim in flight.
    Claiming,
    /// Start request pending.
    Starting,
    /// Sending round-one ticks.
    PlayingRound1,
    /// Sending round-two ticks.
    PlayingRound2,
    /// Socket closed, waiting to reconnect.
    Disconnected,
}

/// What happens after the last round-two firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundTwoOutcome {
    /// Game finished below the ceiling; another one follows.
    Restart {
        /// Game counter after this game.
        completed: u32,
    },
    /// Game finished and the ceiling is reached.
    CeilingReached {
        /// Game counter after this game.
        completed: u32,
    },
    /// The server dropped the game mid-round. Nothing is counted and the
    /// start guard stays held until the connection is reset.
    Aborted,
}

/// Mutable state for one account's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    account_id: String,
    phase: Phase,
    game_started: bool,
    round2_active: bool,
    claiming_in_progress: bool,
    start_request_in_flight: bool,
    completed_game_count: u32,
    game_count_ceiling: u32,
}

impl SessionState {
    /// Creates an idle session for `account_id` with the given game ceiling.
    #[instrument(skip(account_id), fields(account_id = %account_id.as_ref()))]
    pub fn new(account_id: impl AsRef<str>, game_count_ceiling: u32) -> Self {
        debug!(game_count_ceiling, "Creating session state");
        Self {
            account_id: account_id.as_ref().to_string(),
            phase: Phase::Idle,
            game_started: false,
            round2_active: false,
            claiming_in_progress: false,
            start_request_in_flight: false,
            completed_game_count: 1,
            game_count_ceiling,
        }
    }

    /// Account this session belongs to.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// A game has been started and not yet finished.
    pub fn game_started(&self) -> bool {
        self.game_started
    }

    /// Round-two ticks are still wanted by the server.
    pub fn round2_active(&self) -> bool {
        self.round2_active
    }

    /// A reward claim is in flight.
    pub fn claiming_in_progress(&self) -> bool {
        self.claiming_in_progress
    }

    /// A start request has been sent and its game has not finished.
    pub fn start_request_in_flight(&self) -> bool {
        self.start_request_in_flight
    }

    /// Game counter; starts at 1.
    pub fn completed_game_count(&self) -> u32 {
        self.completed_game_count
    }

    /// Counter value at which no further game is started.
    pub fn game_count_ceiling(&self) -> u32 {
        self.game_count_ceiling
    }

    /// True when `round2_active` implies `game_started`.
    pub fn holds_invariants(&self) -> bool {
        !self.round2_active || self.game_started
    }

    /// Supervisor begins a connection attempt.
    pub fn begin_authenticating(&mut self) {
        self.phase = Phase::Authenticating;
    }

    /// Socket is open.
    pub fn mark_connected(&mut self) {
        self.phase = Phase::Connected;
    }

    /// Whether a home-data countdown warrants a claim right now.
    pub fn should_claim(&self, countdown: &ClaimCountdown) -> bool {
        !self.game_started
            && !self.claiming_in_progress
            && countdown.total_minutes() < CLAIM_THRESHOLD_MINUTES
    }

    /// Takes the claim guard. Returns false if a claim is already in flight.
    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub fn begin_claim(&mut self) -> bool {
        if self.claiming_in_progress {
            debug!("Coin is already being claimed");
            return false;
        }
        self.claiming_in_progress = true;
        self.phase = Phase::Claiming;
        true
    }

    /// Releases the claim guard after its cooldown.
    pub fn finish_claim(&mut self) {
        self.claiming_in_progress = false;
        if self.phase == Phase::Claiming {
            self.phase = Phase::Connected;
        }
    }

    /// Whether a home-data frame may schedule a start.
    pub fn may_schedule_start(&self) -> bool {
        !self.start_request_in_flight
    }

    /// Takes the start guard. Returns false if a start is already in flight.
    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub fn begin_start(&mut self) -> bool {
        if self.start_request_in_flight {
            debug!("Start request already in flight");
            return false;
        }
        self.start_request_in_flight = true;
        self.phase = Phase::Starting;
        true
    }

    /// The start frame went out; round one begins.
    pub fn mark_game_started(&mut self) {
        self.game_started = true;
        self.round2_active = true;
        self.phase = Phase::PlayingRound1;
    }

    /// Round one is over.
    pub fn enter_round_two(&mut self) {
        self.phase = Phase::PlayingRound2;
    }

    /// Handles the server's "Game not started" signal.
    ///
    /// Returns true if round two was active and has now been stopped.
    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub fn abort_round_two(&mut self) -> bool {
        if !self.round2_active {
            return false;
        }
        info!("Game not started message received, stopping round 2");
        self.round2_active = false;
        self.game_started = false;
        true
    }

    /// Settles the game after round two's last firing.
    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub fn complete_round_two(&mut self) -> RoundTwoOutcome {
        if !self.round2_active {
            debug!("Round 2 ended after the server dropped the game");
            return RoundTwoOutcome::Aborted;
        }

        self.start_request_in_flight = false;
        self.phase = Phase::Connected;
        self.round2_active = false;
        self.game_started = false;
        self.completed_game_count += 1;
        let completed = self.completed_game_count;

        if completed < self.game_count_ceiling {
            info!(completed, ceiling = self.game_count_ceiling, "Round 2 completed");
            RoundTwoOutcome::Restart { completed }
        } else {
            info!(completed, ceiling = self.game_count_ceiling, "All game rounds completed");
            RoundTwoOutcome::CeilingReached { completed }
        }
    }

    /// Socket closed or failed.
    pub fn mark_disconnected(&mut self) {
        self.phase = Phase::Disconnected;
    }

    /// Clears every flag ahead of a reconnect.
    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub fn reset(&mut self) {
        debug!(phase = %self.phase, "Resetting session state");
        self.game_started = false;
        self.round2_active = false;
        self.claiming_in_progress = false;
        self.start_request_in_flight = false;
        self.completed_game_count = 1;
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countdown(minutes: f64, seconds: f64) -> ClaimCountdown {
        ClaimCountdown { minutes, seconds }
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = SessionState::new("42", 5);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.completed_game_count(), 1);
        assert!(!session.game_started());
        assert!(session.holds_invariants());
    }

    #[test]
    fn test_claim_threshold() {
        let session = SessionState::new("42", 5);
        assert!(session.should_claim(&countdown(5.0, 30.0)));
        assert!(session.should_claim(&countdown(9.0, 59.0)));
        assert!(!session.should_claim(&countdown(10.0, 0.0)));
    }

    #[test]
    fn test_claim_blocked_while_game_started() {
        let mut session = SessionState::new("42", 5);
        assert!(session.begin_start());
        session.mark_game_started();
        assert!(!session.should_claim(&countdown(0.0, 5.0)));
    }

    #[test]
    fn test_claim_guard_is_exclusive() {
        let mut session = SessionState::new("42", 5);
        assert!(session.begin_claim());
        assert!(!session.begin_claim());
        assert!(!session.should_claim(&countdown(1.0, 0.0)));
        session.finish_claim();
        assert!(session.begin_claim());
    }

    #[test]
    fn test_start_guard_is_exclusive() {
        let mut session = SessionState::new("42", 5);
        assert!(session.may_schedule_start());
        assert!(session.begin_start());
        assert!(!session.may_schedule_start());
        assert!(!session.begin_start());
    }

    #[test]
    fn test_abort_only_while_round_two_active() {
        let mut session = SessionState::new("42", 5);
        assert!(!session.abort_round_two());

        session.begin_start();
        session.mark_game_started();
        assert!(session.abort_round_two());
        assert!(!session.round2_active());
        assert!(!session.game_started());
        assert!(session.holds_invariants());
        assert!(!session.abort_round_two());
    }

    #[test]
    fn test_complete_round_two_counts_and_restarts() {
        let mut session = SessionState::new("42", 3);
        session.begin_start();
        session.mark_game_started();
        session.enter_round_two();
        assert_eq!(
            session.complete_round_two(),
            RoundTwoOutcome::Restart { completed: 2 }
        );
        assert!(session.may_schedule_start());
        assert!(!session.game_started());

        session.begin_start();
        session.mark_game_started();
        assert_eq!(
            session.complete_round_two(),
            RoundTwoOutcome::CeilingReached { completed: 3 }
        );
    }

    #[test]
    fn test_complete_after_abort_keeps_start_guard() {
        let mut session = SessionState::new("42", 3);
        session.begin_start();
        session.mark_game_started();
        session.enter_round_two();
        session.abort_round_two();
        assert!(!session.may_schedule_start());

        assert_eq!(session.complete_round_two(), RoundTwoOutcome::Aborted);
        assert!(session.start_request_in_flight());
        assert!(!session.may_schedule_start());
        assert!(!session.begin_start());
        assert!(!session.game_started());
        assert_eq!(session.completed_game_count(), 1);

        session.reset();
        assert!(session.may_schedule_start());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = SessionState::new("42", 3);
        session.begin_claim();
        session.begin_start();
        session.mark_game_started();
        session.complete_round_two();
        session.begin_start();
        session.mark_game_started();
        session.mark_disconnected();

        session.reset();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(!session.game_started());
        assert!(!session.round2_active());
        assert!(!session.claiming_in_progress());
        assert!(!session.start_request_in_flight());
        assert_eq!(session.completed_game_count(), 1);
        assert_eq!(session.game_count_ceiling(), 3);
    }
}
