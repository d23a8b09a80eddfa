//! Pure protocol logic for the Layernet game socket.
//!
//! This crate performs no I/O. It provides:
//!
//! - **Framing**: encode outbound commands, decode inbound text frames
//! - **Session state**: the per-account flags and their legal transitions
//! - **Round scheduling**: tag and count bookkeeping for progress ticks
//!
//! # Example
//!
//! ```
//! use layernet_protocol::{OutboundCommand, Round, RoundSchedule, encode};
//!
//! let mut schedule = RoundSchedule::new(Round::One);
//! let outcome = schedule.fire(true, 1_700_000_000_000);
//! let frame = encode(&outcome.command.unwrap());
//! assert!(frame.starts_with("422[\"inGame\""));
//! assert_eq!(encode(&OutboundCommand::RequestHomeData), "420[\"homeData\"]");
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod frame;
mod schedule;
mod session;

pub use frame::{
    ClaimCountdown, FrameError, GAME_NOT_STARTED, HomeData, InGameTick, InboundFrame,
    InboundPayload, OutboundCommand, UserRank, decode, encode, is_ping,
};
pub use schedule::{
    ROUND_ONE_CADENCE, ROUND_ONE_FIRST_TAG, ROUND_ONE_TICKS, ROUND_TWO_CADENCE,
    ROUND_TWO_FIRST_TAG, ROUND_TWO_TICKS, Round, RoundSchedule, TickOutcome,
};
pub use session::{CLAIM_THRESHOLD_MINUTES, Phase, RoundTwoOutcome, SessionState};
