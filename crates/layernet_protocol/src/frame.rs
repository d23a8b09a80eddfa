//! Wire framing for the game socket.
//!
//! Every frame on the socket is a run of ASCII digits (the channel tag)
//! followed by a JSON payload. Outbound frames are rendered from
//! [`OutboundCommand`]; inbound text is matched by shape and anything that
//! does not look like a game frame is treated as noise.

use derive_more::{Display, Error};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use std::sync::LazyLock;
use tracing::{instrument, trace};

/// Message text the server uses when a tick arrives for a game it no longer tracks.
pub const GAME_NOT_STARTED: &str = "Game not started";

/// Engine heartbeat sent by the server.
const PING: &str = "2";

/// Acknowledgement carrying exactly one JSON object: `430[{...}]`.
static RECORD_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\[(\{.*\})\]$").unwrap());

/// Named event tuple: `42["exception",{...}]`.
static EVENT_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(\d+)(\[\s*".*\])$"#).unwrap());

// ─────────────────────────────────────────────────────────────
//  Outbound
// ─────────────────────────────────────────────────────────────

/// A progress tick sent while a round is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InGameTick {
    /// Secondary tag appended to the channel prefix.
    pub tag: u32,
    /// Round number (1 or 2).
    pub round: u8,
    /// Client wall-clock time in milliseconds.
    pub time_ms: i64,
    /// Always `false` for scripted ticks.
    pub game_over: bool,
}

/// Commands the client sends over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum OutboundCommand {
    /// Authenticates the socket with a bearer token.
    #[display("auth")]
    Auth {
        /// Access token returned by the login endpoint.
        token: String,
    },
    /// Asks for a fresh home-data snapshot.
    #[display("homeData")]
    RequestHomeData,
    /// Claims the accumulated reward.
    #[display("withdrawClaim")]
    WithdrawClaim,
    /// Starts a new game.
    #[display("startGame")]
    StartGame,
    /// Reports round progress.
    #[display("inGame#{}", _0.tag)]
    InGameTick(InGameTick),
    /// Answers an engine heartbeat.
    #[display("pong")]
    Pong,
}

/// Renders a command to its wire frame.
#[instrument(level = "trace", skip(command), fields(command = %command))]
pub fn encode(command: &OutboundCommand) -> String {
    match command {
        OutboundCommand::Auth { token } => {
            format!("40{}", json!({ "token": format!("Bearer {token}") }))
        }
        OutboundCommand::RequestHomeData => r#"420["homeData"]"#.to_string(),
        OutboundCommand::WithdrawClaim => r#"42["withdrawClaim"]"#.to_string(),
        OutboundCommand::StartGame => r#"422["startGame"]"#.to_string(),
        OutboundCommand::InGameTick(tick) => format!(
            r#"42{}["inGame",{{"round":{},"time":{},"gameover":{}}}]"#,
            tick.tag, tick.round, tick.time_ms, tick.game_over
        ),
        OutboundCommand::Pong => "3".to_string(),
    }
}

// ─────────────────────────────────────────────────────────────
//  Inbound
// ─────────────────────────────────────────────────────────────

/// Rank block of a home-data snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRank {
    /// Rank name.
    #[serde(default)]
    pub role: Option<String>,
    /// Passive income rate.
    #[serde(default)]
    pub profit_per_hour: Option<f64>,
}

/// Time left until the reward can be claimed.
///
/// Missing, `null` or non-numeric parts count as zero so the rest of the
/// snapshot still decodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimCountdown {
    /// Whole minutes remaining.
    #[serde(default, deserialize_with = "lenient_number")]
    pub minutes: f64,
    /// Seconds remaining on top of `minutes`.
    #[serde(default, deserialize_with = "lenient_number")]
    pub seconds: f64,
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_f64().unwrap_or_default(),
        Value::String(text) => text.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

impl ClaimCountdown {
    /// Total remaining time expressed in minutes.
    pub fn total_minutes(&self) -> f64 {
        self.minutes + self.seconds / 60.0
    }
}

/// Account snapshot returned for a home-data request.
///
/// Every field is optional; frames that carry none of them still decode and
/// are simply not game data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeData {
    /// Rank and income.
    #[serde(default)]
    pub user_rank: Option<UserRank>,
    /// Claim timer.
    #[serde(default)]
    pub claim_countdown: Option<ClaimCountdown>,
    /// Balance.
    #[serde(default)]
    pub gold: Option<Value>,
    /// Secondary balance.
    #[serde(default)]
    pub dogs: Option<Value>,
}

impl HomeData {
    /// Returns the rank and countdown when both are present.
    pub fn game_data(&self) -> Option<(&UserRank, ClaimCountdown)> {
        match (&self.user_rank, self.claim_countdown) {
            (Some(rank), Some(countdown)) => Some((rank, countdown)),
            _ => None,
        }
    }
}

/// Payload of a decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    /// Single-object acknowledgement.
    Record(HomeData),
    /// `[eventName, payload]` tuple.
    Event {
        /// Event name.
        name: String,
        /// Event payload.
        data: Value,
    },
}

/// A server message that matched one of the known frame shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    /// Numeric channel prefix.
    pub tag: u64,
    /// Decoded body.
    pub payload: InboundPayload,
}

impl InboundFrame {
    /// The home-data record, if this frame carries one.
    pub fn home_data(&self) -> Option<&HomeData> {
        match &self.payload {
            InboundPayload::Record(data) => Some(data),
            InboundPayload::Event { .. } => None,
        }
    }

    /// The `message` of an `exception` event.
    pub fn exception_message(&self) -> Option<&str> {
        match &self.payload {
            InboundPayload::Event { name, data } if name == "exception" => {
                data.get("message").and_then(Value::as_str)
            }
            _ => None,
        }
    }

    /// True for the server's "Game not started" exception.
    pub fn is_game_not_started(&self) -> bool {
        self.exception_message() == Some(GAME_NOT_STARTED)
    }
}

/// A frame matched a known shape but its JSON could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Malformed JSON in frame with tag {tag}: {reason}")]
pub struct FrameError {
    /// Numeric prefix of the rejected frame.
    pub tag: u64,
    /// Parser message.
    pub reason: String,
}

/// Returns true for the engine heartbeat.
pub fn is_ping(raw: &str) -> bool {
    raw == PING
}

/// Decodes one inbound text message.
///
/// Returns `Ok(None)` for anything that is not a game frame.
///
/// # Errors
///
/// Returns [`FrameError`] when a frame has a recognised shape but its JSON
/// body is malformed.
#[instrument(level = "trace", skip(raw), fields(len = raw.len()))]
pub fn decode(raw: &str) -> Result<Option<InboundFrame>, FrameError> {
    if let Some(caps) = RECORD_FRAME.captures(raw) {
        let Some(tag) = parse_tag(&caps[1]) else {
            return Ok(None);
        };
        let data: HomeData = serde_json::from_str(&caps[2]).map_err(|e| FrameError {
            tag,
            reason: e.to_string(),
        })?;
        trace!(tag, "Decoded record frame");
        return Ok(Some(InboundFrame {
            tag,
            payload: InboundPayload::Record(data),
        }));
    }

    if let Some(caps) = EVENT_FRAME.captures(raw) {
        let Some(tag) = parse_tag(&caps[1]) else {
            return Ok(None);
        };
        let items: Vec<Value> = serde_json::from_str(&caps[2]).map_err(|e| FrameError {
            tag,
            reason: e.to_string(),
        })?;
        let mut items = items.into_iter();
        return Ok(match (items.next(), items.next(), items.next()) {
            (Some(Value::String(name)), Some(data), None) => {
                trace!(tag, event = %name, "Decoded event frame");
                Some(InboundFrame {
                    tag,
                    payload: InboundPayload::Event { name, data },
                })
            }
            _ => None,
        });
    }

    Ok(None)
}

fn parse_tag(digits: &str) -> Option<u64> {
    digits.parse().ok()
}
