//! Scripted stand-ins for the game server, used by the driver, supervisor
//! and fleet tests.

#![allow(dead_code)]

use async_trait::async_trait;
use layernet::{AccountRecord, Connector, LoginError, TokenSource, Transport, TransportError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Something the fake server pushes to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Close,
}

/// Computes the server's replies to one client frame.
pub type Responder = Box<dyn FnMut(&str) -> Vec<Inbound> + Send>;

/// Shared view of a [`ScriptedTransport`] that outlives it.
#[derive(Clone)]
pub struct ScriptHandle {
    inbound: mpsc::UnboundedSender<Inbound>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl ScriptHandle {
    /// Pushes a frame to the client.
    pub fn push(&self, inbound: Inbound) {
        self.inbound.send(inbound).expect("transport alive");
    }

    /// Every frame the client sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("sent lock").clone()
    }

    /// True once the client closed the connection.
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory transport that answers client frames with a [`Responder`].
pub struct ScriptedTransport {
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    responder: Responder,
}

impl ScriptedTransport {
    pub fn new(responder: impl FnMut(&str) -> Vec<Inbound> + Send + 'static) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            inbound_rx,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            responder: Box::new(responder),
        }
    }

    /// A transport whose server never says anything on its own.
    pub fn silent() -> Self {
        Self::new(|_| Vec::new())
    }

    pub fn handle(&self) -> ScriptHandle {
        ScriptHandle {
            inbound: self.inbound_tx.clone(),
            sent: Arc::clone(&self.sent),
            closed: Arc::clone(&self.closed),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::new("send after close"));
        }
        for reply in (self.responder)(&frame) {
            let _ = self.inbound_tx.send(reply);
        }
        self.sent.lock().expect("sent lock").push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        match self.inbound_rx.recv().await? {
            Inbound::Text(text) => Some(Ok(text)),
            Inbound::Close => None,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out queued transports in order and records each connect.
pub struct ScriptedConnector {
    transports: Mutex<VecDeque<ScriptedTransport>>,
    log: Arc<Mutex<Vec<String>>>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(transports: Vec<ScriptedTransport>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            transports: Mutex::new(transports.into()),
            log,
            connects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self) -> Result<ScriptedTransport, TransportError> {
        let attempt = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        self.log
            .lock()
            .expect("log lock")
            .push(format!("connect:{attempt}"));
        self.transports
            .lock()
            .expect("transports lock")
            .pop_front()
            .ok_or_else(|| TransportError::new("no scripted connection left"))
    }
}

/// Issues `tok-<n>` tokens, optionally failing the first request.
pub struct FakeTokenSource {
    log: Arc<Mutex<Vec<String>>>,
    fetches: AtomicUsize,
    fail_first: bool,
}

impl FakeTokenSource {
    pub fn new(log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            log,
            fetches: AtomicUsize::new(0),
            fail_first: false,
        }
    }

    pub fn failing_first(log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            fail_first: true,
            ..Self::new(log)
        }
    }
}

#[async_trait]
impl TokenSource for FakeTokenSource {
    async fn fetch_token(&self, account: &AccountRecord) -> Result<String, LoginError> {
        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.log
            .lock()
            .expect("log lock")
            .push(format!("fetch:{}", account.id()));
        if self.fail_first && fetch == 1 {
            return Err(LoginError::new("Login failed"));
        }
        Ok(format!("tok-{fetch}"))
    }
}

/// A home-data record frame with the given claim countdown.
pub fn home_data_frame(minutes: f64, seconds: f64) -> String {
    format!(
        r#"430[{{"userRank":{{"role":"Miner","profitPerHour":12.5}},"claimCountdown":{{"minutes":{minutes},"seconds":{seconds}}},"gold":1500,"dogs":2}}]"#
    )
}

/// The server's "Game not started" exception.
pub const GAME_NOT_STARTED_FRAME: &str =
    r#"42["exception",{"message":"Game not started","code":400}]"#;

pub const HOME_DATA_REQUEST: &str = r#"420["homeData"]"#;
pub const WITHDRAW_CLAIM: &str = r#"42["withdrawClaim"]"#;
pub const START_GAME: &str = r#"422["startGame"]"#;

/// Server that answers every home-data request. The first countdown is
/// `minutes:seconds`; once a claim arrives the countdown resets to 59 minutes.
pub fn game_server(
    minutes: f64,
    seconds: f64,
) -> impl FnMut(&str) -> Vec<Inbound> + Send + 'static {
    let mut claimed = false;
    move |frame| {
        if frame == WITHDRAW_CLAIM {
            claimed = true;
            return Vec::new();
        }
        if frame == HOME_DATA_REQUEST {
            let (m, s) = if claimed { (59.0, 0.0) } else { (minutes, seconds) };
            return vec![Inbound::Text(home_data_frame(m, s))];
        }
        Vec::new()
    }
}

/// Tag of an `inGame` frame, if `frame` is one.
pub fn tick_tag(frame: &str) -> Option<u32> {
    if !frame.contains(r#"["inGame""#) {
        return None;
    }
    let rest = frame.strip_prefix("42")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Tags of every `inGame` frame for `round`, in send order.
pub fn tick_tags(sent: &[String], round: u8) -> Vec<u32> {
    let marker = format!(r#""round":{round},"#);
    sent.iter()
        .filter(|frame| frame.contains(&marker))
        .filter_map(|frame| tick_tag(frame))
        .collect()
}

/// Number of frames equal to `expected`.
pub fn count(sent: &[String], expected: &str) -> usize {
    sent.iter().filter(|frame| frame.as_str() == expected).count()
}

/// An account record with the given numeric id.
pub fn account(index: usize, id: i64) -> AccountRecord {
    AccountRecord::parse(index, &account_line(id, "Tester")).expect("valid account")
}

/// One account-file line.
pub fn account_line(id: i64, first_name: &str) -> String {
    format!(
        "query_id=AAH&user=%7B%22id%22%3A{id}%2C%22first_name%22%3A%22{first_name}%22%2C%22language_code%22%3A%22en%22%7D&auth_date=1718000000&hash=abc"
    )
}
