//! Account fleet.
//!
//! Loads the account file and runs one [`Supervisor`] per account according
//! to the configured [`Mode`].

use crate::login::TokenSource;
use crate::supervisor::{ReconnectPolicy, Supervisor};
use crate::transport::Connector;
use crate::{AccountRecord, BotConfig, Mode, load_accounts};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// What happened during one pass over the account file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Valid accounts found in the file.
    pub accounts: usize,
    /// Accounts whose supervisor ran to completion.
    pub finished: usize,
}

/// Runs supervisors over every account in the account file.
pub struct Fleet<S, C> {
    supervisor: Arc<Supervisor<S, C>>,
    data_file: PathBuf,
    mode: Mode,
    account_pause: Duration,
    cycle_pause: Duration,
}

impl<S, C> Fleet<S, C>
where
    S: TokenSource + 'static,
    C: Connector + 'static,
{
    /// Creates a fleet with the default pauses of [`BotConfig`].
    pub fn new(supervisor: Supervisor<S, C>, data_file: impl Into<PathBuf>, mode: Mode) -> Self {
        let defaults = BotConfig::default();
        Self {
            supervisor: Arc::new(supervisor),
            data_file: data_file.into(),
            mode,
            account_pause: defaults.account_pause(),
            cycle_pause: defaults.cycle_pause(),
        }
    }

    /// Pause after each account in sequential mode.
    pub fn account_pause(&self) -> Duration {
        self.account_pause
    }

    /// Pause after each full pass.
    pub fn cycle_pause(&self) -> Duration {
        self.cycle_pause
    }

    /// Sets the pause between accounts in sequential mode.
    pub fn with_account_pause(mut self, pause: Duration) -> Self {
        self.account_pause = pause;
        self
    }

    /// Sets the pause after each full pass.
    pub fn with_cycle_pause(mut self, pause: Duration) -> Self {
        self.cycle_pause = pause;
        self
    }

    /// Runs passes over the account file forever.
    pub async fn run(&self) {
        loop {
            let report = self.run_cycle().await;
            info!(
                accounts = report.accounts,
                finished = report.finished,
                pause = ?self.cycle_pause,
                "Cycle complete"
            );
            sleep(self.cycle_pause).await;
        }
    }

    /// Runs one pass over the account file.
    ///
    /// The file is re-read on every pass. A missing or empty file is logged
    /// and yields an empty report.
    #[instrument(skip(self), fields(mode = %self.mode, data_file = %self.data_file.display()))]
    pub async fn run_cycle(&self) -> CycleReport {
        let accounts = match load_accounts(&self.data_file) {
            Ok(accounts) => accounts,
            Err(e) => {
                error!(error = %e, "Cannot load accounts");
                return CycleReport::default();
            }
        };

        if accounts.is_empty() {
            warn!("No valid accounts");
            return CycleReport::default();
        }

        let total = accounts.len();
        let finished = match self.mode {
            Mode::Sequential => self.run_sequential(&accounts).await,
            Mode::Concurrent => self.run_concurrent(accounts).await,
            Mode::Single => {
                let account = &accounts[0];
                info!(name = %account.display_name(), "Running single account");
                self.supervisor.run(account, ReconnectPolicy::Forever).await;
                1
            }
        };

        CycleReport {
            accounts: total,
            finished,
        }
    }

    async fn run_sequential(&self, accounts: &[AccountRecord]) -> usize {
        let total = accounts.len();
        let mut finished = 0;
        for (position, account) in accounts.iter().enumerate() {
            info!(
                "Account {}/{} | {}",
                position + 1,
                total,
                account.display_name()
            );
            let exit = self
                .supervisor
                .run(account, ReconnectPolicy::UntilCeiling)
                .await;
            info!(attempts = exit.attempts, "Account done");
            finished += 1;
            sleep(self.account_pause).await;
        }
        finished
    }

    async fn run_concurrent(&self, accounts: Vec<AccountRecord>) -> usize {
        let mut workers = JoinSet::new();
        for account in accounts {
            let supervisor = Arc::clone(&self.supervisor);
            workers.spawn(async move {
                info!(name = %account.display_name(), "Worker started");
                supervisor
                    .run(&account, ReconnectPolicy::UntilCeiling)
                    .await
            });
        }

        let mut finished = 0;
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(exit) => {
                    info!(attempts = exit.attempts, "Worker finished");
                    finished += 1;
                }
                Err(e) => error!(error = %e, "Worker panicked"),
            }
        }
        finished
    }
}
