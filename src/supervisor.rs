//! Per-account session supervisor.
//!
//! Owns the [`SessionState`] for one account and keeps a connection alive:
//! every attempt fetches a fresh token, opens a socket and hands both to a
//! [`ProtocolDriver`]. When the driver stops the state is reset and, after
//! a cooldown, the supervisor tries again.

use crate::driver::{DriverExit, ProtocolDriver};
use crate::login::{LoginError, TokenSource};
use crate::transport::{Connector, TransportError};
use crate::AccountRecord;
use derive_more::{Display, Error, From};
use layernet_protocol::SessionState;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

/// When the supervisor gives up on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Reconnect after every disconnect, including a clean ceiling exit.
    Forever,
    /// Stop once a connection reaches the game ceiling.
    UntilCeiling,
}

/// Summary of a finished supervision run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorExit {
    /// Connection attempts made, including failed logins.
    pub attempts: u32,
}

/// Failure of a single connection attempt.
#[derive(Debug, Display, Error, From)]
enum AttemptError {
    #[display("{}", _0)]
    Login(LoginError),
    #[display("{}", _0)]
    Transport(TransportError),
}

/// Keeps one account connected.
#[derive(Debug)]
pub struct Supervisor<S, C> {
    tokens: S,
    connector: C,
    ceiling: u32,
    cooldown: Duration,
}

impl<S: TokenSource, C: Connector> Supervisor<S, C> {
    /// Creates a supervisor.
    ///
    /// `ceiling` is the game-count ceiling handed to each session and
    /// `cooldown` the pause between a disconnect and the next attempt.
    pub fn new(tokens: S, connector: C, ceiling: u32, cooldown: Duration) -> Self {
        Self {
            tokens,
            connector,
            ceiling,
            cooldown,
        }
    }

    /// Game-count ceiling for each session.
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Supervises `account` until `policy` says stop.
    ///
    /// Under [`ReconnectPolicy::Forever`] this never returns.
    #[instrument(
        skip(self, account),
        fields(account = *account.index(), id = %account.id(), %policy)
    )]
    pub async fn run(&self, account: &AccountRecord, policy: ReconnectPolicy) -> SupervisorExit {
        let mut session = SessionState::new(account.id().to_string(), self.ceiling);
        let mut attempts = 0;

        loop {
            attempts += 1;
            session.begin_authenticating();

            match self.connect_once(account, &mut session).await {
                Ok(DriverExit::CeilingReached) if policy == ReconnectPolicy::UntilCeiling => {
                    info!(attempts, "Account finished");
                    return SupervisorExit { attempts };
                }
                Ok(exit) => {
                    info!(%exit, attempts, "Connection ended");
                }
                Err(e) => {
                    error!(error = %e, attempts, "Connection attempt failed");
                }
            }

            session.mark_disconnected();
            session.reset();
            countdown(self.cooldown).await;
        }
    }

    async fn connect_once(
        &self,
        account: &AccountRecord,
        session: &mut SessionState,
    ) -> Result<DriverExit, AttemptError> {
        let token = self.tokens.fetch_token(account).await?;
        let transport = self.connector.connect().await?;
        info!(name = %account.display_name(), "Successfully logged in");

        Ok(ProtocolDriver::new(transport).run(session, &token).await)
    }
}

/// Sleeps for `wait`, logging the seconds left.
pub async fn countdown(wait: Duration) {
    let mut remaining = wait;
    while !remaining.is_zero() {
        let step = remaining.min(Duration::from_secs(1));
        debug!(seconds = remaining.as_secs_f64().ceil() as u64, "Waiting");
        sleep(step).await;
        remaining -= step;
    }
}
