//! Chained APDU transport over a logical channel
//!
//! [`ApduTransport`] runs one session at a time against a [`CardChannelService`]: it opens a
//! logical channel, lets a request provider queue commands, executes them in order while
//! following `61XX` GET RESPONSE chains and closes the channel again on every exit path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::channel::CardChannelService;
use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::request::RequestBuilder;
use crate::session::{LogicalChannel, Session};

/// Receives the outcome of a session started with [`ApduTransport::send`]
pub trait ResultCallback: Send {
    /// Called with the data of every command but the last
    ///
    /// Returning `false` stops the session; the result passed here becomes its outcome.
    fn should_continue_on_intermediate_result(&mut self, _result: &[u8]) -> bool {
        true
    }

    /// Session finished; `None` when no command was queued
    fn on_result(&mut self, result: Option<Bytes>);

    /// Session failed
    fn on_exception(&mut self, error: Error);
}

/// Marks the transport busy for as long as it lives
#[derive(Debug)]
struct SessionGuard {
    active: Arc<AtomicBool>,
}

impl SessionGuard {
    fn try_acquire(active: &Arc<AtomicBool>) -> Option<Self> {
        active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                active: Arc::clone(active),
            })
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Sentinel for "no logical channel held open"
const NO_CHANNEL: u16 = u16::MAX;

/// Executes command sequences on a logical channel, one session at a time
#[derive(Debug)]
pub struct ApduTransport<S> {
    service: S,
    config: TransportConfig,
    session_active: Arc<AtomicBool>,
    /// Channel opened by the current session and not yet closed
    open_channel: AtomicU16,
}

impl<S> ApduTransport<S>
where
    S: CardChannelService,
{
    /// Create a transport with the default configuration
    pub fn new(service: S) -> Self {
        Self::with_config(service, TransportConfig::default())
    }

    /// Create a transport with the given configuration
    pub fn with_config(service: S, config: TransportConfig) -> Self {
        Self {
            service,
            config,
            session_active: Arc::new(AtomicBool::new(false)),
            open_channel: AtomicU16::new(NO_CHANNEL),
        }
    }

    /// The channel service behind this transport
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Transport configuration
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Whether a session is currently running
    pub fn is_busy(&self) -> bool {
        self.session_active.load(Ordering::Acquire)
    }

    /// Run a session and wait for its outcome
    ///
    /// `provider` receives the select response and queues commands. `should_continue` is
    /// consulted after every command but the last.
    ///
    /// # Cancel safety
    ///
    /// Dropping the future before it completes leaves its logical channel open on the card.
    /// The transport remembers that channel and closes it before the next session opens a
    /// new one. Use [`send`](Self::send) to run a session that cannot be cancelled.
    pub async fn execute<P, F>(
        &self,
        aid: &[u8],
        extended: bool,
        provider: P,
        should_continue: F,
    ) -> Result<Option<Bytes>>
    where
        P: FnOnce(&[u8], &mut RequestBuilder) -> Result<()>,
        F: FnMut(&[u8]) -> bool,
    {
        let Some(_guard) = SessionGuard::try_acquire(&self.session_active) else {
            debug!("Rejecting request, logical channel in use");
            return Err(Error::ChannelInUse);
        };
        self.run_session(aid, extended, provider, should_continue).await
    }

    /// Start a session on `handle` and report its outcome to `callback`
    ///
    /// A transport that is already running a session rejects the request with
    /// [`Error::ChannelInUse`] without touching the card.
    pub fn send<P, C>(
        self: &Arc<Self>,
        aid: impl Into<Bytes>,
        extended: bool,
        provider: P,
        mut callback: C,
        handle: &Handle,
    ) -> JoinHandle<()>
    where
        S: 'static,
        P: FnOnce(&[u8], &mut RequestBuilder) -> Result<()> + Send + 'static,
        C: ResultCallback + 'static,
    {
        let Some(guard) = SessionGuard::try_acquire(&self.session_active) else {
            debug!("Rejecting request, logical channel in use");
            return handle.spawn(async move { callback.on_exception(Error::ChannelInUse) });
        };

        let aid = aid.into();
        let transport = Arc::clone(self);
        handle.spawn(async move {
            let outcome = transport
                .run_session(&aid, extended, provider, |result| {
                    callback.should_continue_on_intermediate_result(result)
                })
                .await;
            drop(guard);

            match outcome {
                Ok(result) => callback.on_result(result),
                Err(error) => callback.on_exception(error),
            }
        })
    }

    #[instrument(skip_all, fields(aid = %hex::encode_upper(aid)))]
    async fn run_session<P, F>(
        &self,
        aid: &[u8],
        extended: bool,
        provider: P,
        should_continue: F,
    ) -> Result<Option<Bytes>>
    where
        P: FnOnce(&[u8], &mut RequestBuilder) -> Result<()>,
        F: FnMut(&[u8]) -> bool,
    {
        self.release_abandoned_channel().await;

        debug!("Opening logical channel");
        let raw = self
            .service
            .open_logical_channel(aid)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to open logical channel");
                Error::OpenChannel(e)
            })?;
        let channel = LogicalChannel::from_open_response(aid, raw)?;
        debug!(channel = channel.number(), "Logical channel opened");
        self.open_channel.store(u16::from(channel.number()), Ordering::Release);

        let mut session = Session::new(&self.service, channel, self.config);
        let outcome = session.run(extended, provider, should_continue).await;
        session.close().await;
        self.open_channel.store(NO_CHANNEL, Ordering::Release);

        match &outcome {
            Ok(result) => debug!(len = result.as_ref().map(Bytes::len), "Session completed"),
            Err(error) => debug!(%error, "Session failed"),
        }
        outcome
    }

    /// Close a channel left open by a session whose future was dropped
    async fn release_abandoned_channel(&self) {
        let Ok(number) = u8::try_from(self.open_channel.swap(NO_CHANNEL, Ordering::AcqRel)) else {
            return;
        };

        warn!(channel = number, "Closing logical channel left open by a cancelled session");
        if let Err(error) = self.service.close_logical_channel(number).await {
            warn!(channel = number, %error, "Failed to close abandoned logical channel");
        }
    }
}
