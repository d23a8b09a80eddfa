//! Layernet game bot.
//!
//! Logs in each configured account, keeps a socket to the game server open
//! and plays scripted games on it, claiming coin whenever the countdown runs
//! low.
//!
//! # Architecture
//!
//! - **Accounts**: one query credential per line of the account file
//! - **Login**: HTTP exchange of a credential for a socket token
//! - **Transport**: text-frame WebSocket connection
//! - **Driver**: single-timeline event loop for one connection
//! - **Supervisor**: reconnect loop for one account
//! - **Fleet**: runs supervisors over the account file
//!
//! Wire framing, session flags and round bookkeeping live in
//! [`layernet_protocol`].
//!
//! # Example
//!
//! ```no_run
//! use layernet::{BotConfig, Fleet, LoginClient, Supervisor, WsConnector};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = BotConfig::default();
//! let supervisor = Supervisor::new(
//!     LoginClient::new(&config)?,
//!     WsConnector::from_config(&config),
//!     *config.max_games(),
//!     config.reconnect_cooldown(),
//! );
//! Fleet::new(supervisor, config.data_file().clone(), *config.mode())
//!     .run()
//!     .await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod accounts;
mod config;
mod driver;
mod fleet;
mod login;
mod supervisor;
mod transport;

// Crate-level exports - Configuration
pub use config::{BotConfig, ConfigError, Mode};

// Crate-level exports - Accounts
pub use accounts::{AccountError, AccountRecord, TelegramUser, UserId, load_accounts};

// Crate-level exports - Login
pub use login::{LoginClient, LoginError, LoginRequest, TokenSource, parse_login_response};

// Crate-level exports - Transport
pub use transport::{Connector, Transport, TransportError, WsConnector, WsTransport, socket_url};

// Crate-level exports - Connection driving
pub use driver::{
    CLAIM_COOLDOWN, DriverExit, HOME_DATA_DELAY, ProtocolDriver, RESTART_DELAY, START_DELAY,
};
pub use fleet::{CycleReport, Fleet};
pub use supervisor::{ReconnectPolicy, Supervisor, SupervisorExit, countdown};

pub use layernet_protocol;
