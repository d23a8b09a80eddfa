//! Round bookkeeping for scripted progress ticks.
//!
//! A [`RoundSchedule`] knows how many times its timer fires, which tag the
//! next tick carries and whether a firing actually produces a frame. Pacing
//! is left to the caller; see [`Round::cadence`].

use crate::frame::{InGameTick, OutboundCommand};
use derive_more::Display;
use std::time::Duration;
use tracing::{debug, instrument};

/// Firings in round one.
pub const ROUND_ONE_TICKS: u32 = 60;
/// Tag of the first round-one tick.
pub const ROUND_ONE_FIRST_TAG: u32 = 2;
/// Round one spreads its ticks over ten seconds.
pub const ROUND_ONE_CADENCE: Duration =
    Duration::from_nanos(10_000_000_000 / ROUND_ONE_TICKS as u64);

/// Firings in round two.
pub const ROUND_TWO_TICKS: u32 = 100;
/// Tag of the first round-two tick.
pub const ROUND_TWO_FIRST_TAG: u32 = 63;
/// Round two spreads its ticks over fifty seconds.
pub const ROUND_TWO_CADENCE: Duration = Duration::from_millis(50_000 / ROUND_TWO_TICKS as u64);

/// One of the two scripted rounds of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Round {
    /// Unconditional warm-up round.
    #[display("round 1")]
    One,
    /// Main round, gated on the session still being active.
    #[display("round 2")]
    Two,
}

impl Round {
    /// Round number as sent on the wire.
    pub fn number(self) -> u8 {
        match self {
            Round::One => 1,
            Round::Two => 2,
        }
    }

    /// How many times the round's timer fires.
    pub fn planned_ticks(self) -> u32 {
        match self {
            Round::One => ROUND_ONE_TICKS,
            Round::Two => ROUND_TWO_TICKS,
        }
    }

    /// Tag carried by the first tick.
    pub fn first_tag(self) -> u32 {
        match self {
            Round::One => ROUND_ONE_FIRST_TAG,
            Round::Two => ROUND_TWO_FIRST_TAG,
        }
    }

    /// Interval between firings.
    pub fn cadence(self) -> Duration {
        match self {
            Round::One => ROUND_ONE_CADENCE,
            Round::Two => ROUND_TWO_CADENCE,
        }
    }

    /// Whether a firing only sends while the game is still active.
    pub fn requires_activity(self) -> bool {
        matches!(self, Round::Two)
    }

    /// The round that follows this one, if any.
    pub fn next(self) -> Option<Round> {
        match self {
            Round::One => Some(Round::Two),
            Round::Two => None,
        }
    }
}

/// Result of one timer firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// Frame to send, if the firing produced one.
    pub command: Option<OutboundCommand>,
    /// True once every planned firing has happened.
    pub exhausted: bool,
}

/// Progress through one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSchedule {
    round: Round,
    fired: u32,
    sent: u32,
    next_tag: u32,
}

impl RoundSchedule {
    /// Creates a fresh schedule for `round`.
    #[instrument]
    pub fn new(round: Round) -> Self {
        Self {
            round,
            fired: 0,
            sent: 0,
            next_tag: round.first_tag(),
        }
    }

    /// The round being played.
    pub fn round(&self) -> Round {
        self.round
    }

    /// Firings so far.
    pub fn fired(&self) -> u32 {
        self.fired
    }

    /// Ticks actually produced so far.
    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// Tag the next produced tick will carry.
    pub fn next_tag(&self) -> u32 {
        self.next_tag
    }

    /// True once every planned firing has happened.
    pub fn is_exhausted(&self) -> bool {
        self.fired >= self.round.planned_ticks()
    }

    /// Records one timer firing.
    ///
    /// `active` is the session's round-two flag. Skipped firings still count
    /// towards the plan but leave the tag counter where it was.
    pub fn fire(&mut self, active: bool, time_ms: i64) -> TickOutcome {
        if self.is_exhausted() {
            return TickOutcome {
                command: None,
                exhausted: true,
            };
        }

        self.fired += 1;

        let command = if active || !self.round.requires_activity() {
            let tick = InGameTick {
                tag: self.next_tag,
                round: self.round.number(),
                time_ms,
                game_over: false,
            };
            self.next_tag += 1;
            self.sent += 1;
            Some(OutboundCommand::InGameTick(tick))
        } else {
            None
        };

        let exhausted = self.is_exhausted();
        if exhausted {
            debug!(
                round = %self.round,
                fired = self.fired,
                sent = self.sent,
                "Round schedule exhausted"
            );
        }

        TickOutcome { command, exhausted }
    }
}
