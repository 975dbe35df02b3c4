//! `StreamConnection`: one duplex subscribe channel with auto-reconnect.
//!
//! ```text
//! Stopped ──start()──▶ Starting ──open──▶ Connected ──error/end──▶ Reconnecting
//!    ▲                                        ▲                        │
//!    └────────────── stop() ──────────────────┴────── delay ───────────┘
//! ```
//!
//! Frames are processed sequentially in arrival order. Filter mutations go
//! through the live-sender slot: when a channel is open the new filter is
//! pushed on it at once, otherwise the next connection carries it.

use chrono::Utc;
use futures::{channel::mpsc, StreamExt};
use serde::Serialize;
use solcodec_core::{
    account::DecodedAccount,
    error::{DecodeError, StreamError},
    instruction::DecodedInstruction,
    transaction::DecodedTransaction,
};
use solcodec_solana::SolanaDecoder;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};
use yellowstone_grpc_proto::geyser::{subscribe_update::UpdateOneof, SubscribeRequest, SubscribeUpdate};

use crate::{
    backoff::ReconnectPolicy,
    config::{Commitment, StreamConfig},
    filter::{ping_request, StreamKind, SubscriptionFilter},
    transport::{GeyserTransport, UpdateStream},
    wire,
};

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Stopped,
    Starting,
    Connected,
    Reconnecting,
}

// ─── Frame decoders ───────────────────────────────────────────────────────────

/// Turns inbound updates into decoded output for one stream kind.
pub trait FrameDecoder: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    const KIND: StreamKind;

    /// `None` for updates this stream does not handle.
    fn decode(&self, update: UpdateOneof) -> Option<Result<Self::Output, DecodeError>>;

    /// The decoded transaction, for streams that carry one.
    fn as_transaction(_output: &Self::Output) -> Option<&DecodedTransaction> {
        None
    }
}

/// Transaction updates through the transaction normalizer.
#[derive(Clone)]
pub struct TransactionFrames {
    decoder: SolanaDecoder,
}

impl TransactionFrames {
    pub fn new(decoder: SolanaDecoder) -> Self {
        Self { decoder }
    }
}

impl FrameDecoder for TransactionFrames {
    type Output = DecodedTransaction;

    const KIND: StreamKind = StreamKind::Transactions;

    fn decode(&self, update: UpdateOneof) -> Option<Result<DecodedTransaction, DecodeError>> {
        match update {
            UpdateOneof::Transaction(frame) => Some(
                wire::from_channel_frame(&frame, Utc::now()).map(|raw| self.decoder.decode_transaction(&raw)),
            ),
            _ => None,
        }
    }

    fn as_transaction(output: &DecodedTransaction) -> Option<&DecodedTransaction> {
        Some(output)
    }
}

/// Account updates through the account decoder.
#[derive(Clone)]
pub struct AccountFrames {
    decoder: SolanaDecoder,
}

impl AccountFrames {
    pub fn new(decoder: SolanaDecoder) -> Self {
        Self { decoder }
    }
}

impl FrameDecoder for AccountFrames {
    type Output = DecodedAccount;

    const KIND: StreamKind = StreamKind::Accounts;

    fn decode(&self, update: UpdateOneof) -> Option<Result<DecodedAccount, DecodeError>> {
        match update {
            UpdateOneof::Account(frame) => {
                Some(wire::account_from_frame(&frame).and_then(|info| self.decoder.decode_account(info)))
            }
            _ => None,
        }
    }
}

pub type TransactionStream = StreamConnection<TransactionFrames>;
pub type AccountStream = StreamConnection<AccountFrames>;

// ─── Callbacks ────────────────────────────────────────────────────────────────

type DataCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&StreamError) + Send + Sync>;
type LifecycleCallback = Arc<dyn Fn() + Send + Sync>;
type InstructionCallback = Arc<dyn Fn(&DecodedInstruction, &DecodedTransaction) + Send + Sync>;

struct Callbacks<T> {
    data: Option<DataCallback<T>>,
    error: Option<ErrorCallback>,
    end: Option<LifecycleCallback>,
    close: Option<LifecycleCallback>,
    instructions: HashMap<String, InstructionCallback>,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            end: None,
            close: None,
            instructions: HashMap::new(),
        }
    }
}

// ─── Metrics ──────────────────────────────────────────────────────────────────

/// Point-in-time counters for one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamMetrics {
    pub frames_received: u64,
    pub decoded: u64,
    pub decode_errors: u64,
    pub reconnections: u64,
}

#[derive(Default)]
struct Counters {
    frames_received: AtomicU64,
    decoded: AtomicU64,
    decode_errors: AtomicU64,
    reconnections: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> StreamMetrics {
        StreamMetrics {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            reconnections: self.reconnections.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}

// ─── Connection ───────────────────────────────────────────────────────────────

struct Shared<D: FrameDecoder> {
    transport: Arc<dyn GeyserTransport>,
    decoder: D,
    filter_name: String,
    commitment: Commitment,
    policy: ReconnectPolicy,
    filter: Mutex<SubscriptionFilter>,
    /// Request side of the open channel; `None` while not connected.
    sender: Mutex<Option<mpsc::UnboundedSender<SubscribeRequest>>>,
    running: AtomicBool,
    /// Bumped by every `stop()`.
    stop: watch::Sender<u64>,
    state: watch::Sender<ConnectionState>,
    callbacks: RwLock<Callbacks<D::Output>>,
    counters: Counters,
}

enum SessionEnd {
    Stopped,
    Ended,
    Failed(StreamError),
}

/// A subscription stream over a `GeyserTransport`.
///
/// Cheap to clone; clones share the same channel, filter and callbacks.
pub struct StreamConnection<D: FrameDecoder> {
    shared: Arc<Shared<D>>,
}

impl<D: FrameDecoder> Clone for StreamConnection<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D: FrameDecoder> StreamConnection<D> {
    /// Build a stopped connection. The initial filter comes from
    /// `config.addresses` and `config.owners`.
    pub fn new(transport: Arc<dyn GeyserTransport>, decoder: D, config: &StreamConfig) -> Self {
        let mut filter = SubscriptionFilter::new();
        filter.add_addresses(config.addresses.iter().cloned());
        if D::KIND == StreamKind::Accounts {
            filter.add_owners(config.owners.iter().cloned());
        }
        let (stop, _) = watch::channel(0);
        let (state, _) = watch::channel(ConnectionState::Stopped);
        Self {
            shared: Arc::new(Shared {
                transport,
                decoder,
                filter_name: config.filter_name.clone(),
                commitment: config.commitment,
                policy: config.reconnect,
                filter: Mutex::new(filter),
                sender: Mutex::new(None),
                running: AtomicBool::new(false),
                stop,
                state,
                callbacks: RwLock::new(Callbacks::default()),
                counters: Counters::default(),
            }),
        }
    }

    pub fn kind(&self) -> StreamKind {
        D::KIND
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn metrics(&self) -> StreamMetrics {
        self.shared.counters.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Copy of the current filter.
    pub fn filter(&self) -> SubscriptionFilter {
        lock(&self.shared.filter).clone()
    }

    // ─── Callbacks ────────────────────────────────────────────────────────────

    pub fn on_data(&self, f: impl Fn(&D::Output) + Send + Sync + 'static) {
        write(&self.shared.callbacks).data = Some(Arc::new(f));
    }

    pub fn on_error(&self, f: impl Fn(&StreamError) + Send + Sync + 'static) {
        write(&self.shared.callbacks).error = Some(Arc::new(f));
    }

    /// Fires when the server ends the stream normally.
    pub fn on_end(&self, f: impl Fn() + Send + Sync + 'static) {
        write(&self.shared.callbacks).end = Some(Arc::new(f));
    }

    /// Fires once when `start()` returns.
    pub fn on_close(&self, f: impl Fn() + Send + Sync + 'static) {
        write(&self.shared.callbacks).close = Some(Arc::new(f));
    }

    // ─── Filter ───────────────────────────────────────────────────────────────

    /// Returns `true` if the filter changed.
    pub fn add_addresses<I, S>(&self, addresses: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared.mutate_filter(|f| f.add_addresses(addresses))
    }

    pub fn remove_addresses<I, S>(&self, addresses: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.shared.mutate_filter(|f| f.remove_addresses(addresses))
    }

    // ─── Lifecycle ────────────────────────────────────────────────────────────

    /// Run the connection until `stop()`. Channel failures are reported to
    /// the error callback and followed by a reconnect.
    pub async fn start(&self) -> Result<(), StreamError> {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Err(StreamError::AlreadyRunning);
        }
        let mut stop_rx = self.shared.stop.subscribe();

        self.shared.run(&mut stop_rx).await;

        *lock(&self.shared.sender) = None;
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.set_state(ConnectionState::Stopped);
        info!(endpoint = %self.shared.transport.endpoint(), "stream stopped");
        let close = read(&self.shared.callbacks).close.clone();
        if let Some(cb) = close {
            cb();
        }
        Ok(())
    }

    /// Cancel the active channel. No reconnect is attempted afterwards.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.stop.send_modify(|epoch| *epoch += 1);
        *lock(&self.shared.sender) = None;
    }
}

impl StreamConnection<TransactionFrames> {
    /// Transaction stream over `decoder`.
    pub fn transactions(transport: Arc<dyn GeyserTransport>, decoder: SolanaDecoder, config: &StreamConfig) -> Self {
        Self::new(transport, TransactionFrames::new(decoder), config)
    }

    /// Call `f` for the first instruction named `name` in each transaction.
    ///
    /// Only names declared by a registered program are accepted; anything
    /// else is logged and ignored. Returns whether the callback was stored.
    pub fn on_detect_instruction(
        &self,
        name: &str,
        f: impl Fn(&DecodedInstruction, &DecodedTransaction) + Send + Sync + 'static,
    ) -> bool {
        if !self.shared.decoder.decoder.registry().has_instruction_name(name) {
            warn!(instruction = name, "no registered program declares this instruction; callback ignored");
            return false;
        }
        write(&self.shared.callbacks)
            .instructions
            .insert(name.to_string(), Arc::new(f));
        true
    }
}

impl StreamConnection<AccountFrames> {
    /// Account stream over `decoder`.
    pub fn accounts(transport: Arc<dyn GeyserTransport>, decoder: SolanaDecoder, config: &StreamConfig) -> Self {
        Self::new(transport, AccountFrames::new(decoder), config)
    }

    pub fn add_owners<I, S>(&self, owners: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared.mutate_filter(|f| f.add_owners(owners))
    }

    pub fn remove_owners<I, S>(&self, owners: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.shared.mutate_filter(|f| f.remove_owners(owners))
    }
}

// ─── Background loop ──────────────────────────────────────────────────────────

impl<D: FrameDecoder> Shared<D> {
    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn request(&self, filter: &SubscriptionFilter) -> SubscribeRequest {
        filter.to_request(D::KIND, &self.filter_name, self.commitment)
    }

    /// Lock order is filter, then sender; `install` follows the same order.
    fn mutate_filter(&self, mutate: impl FnOnce(&mut SubscriptionFilter) -> bool) -> bool {
        let mut filter = lock(&self.filter);
        if !mutate(&mut filter) {
            return false;
        }
        if let Some(tx) = lock(&self.sender).as_ref() {
            match tx.unbounded_send(self.request(&filter)) {
                Ok(()) => debug!(revision = filter.revision(), "filter pushed"),
                Err(_) => debug!(revision = filter.revision(), "channel closing; filter held for reconnect"),
            }
        }
        true
    }

    /// Publish the sender of a freshly opened channel. If the filter moved
    /// while the channel was opening, push the latest one first.
    fn install(&self, tx: mpsc::UnboundedSender<SubscribeRequest>, pushed_revision: u64) {
        let filter = lock(&self.filter);
        let mut slot = lock(&self.sender);
        if filter.revision() != pushed_revision {
            debug!(revision = filter.revision(), "filter changed while connecting; re-pushing");
            let _ = tx.unbounded_send(self.request(&filter));
        }
        *slot = Some(tx);
    }

    async fn run(&self, stop_rx: &mut watch::Receiver<u64>) {
        let endpoint = self.transport.endpoint().to_string();
        let mut attempt: u32 = 0;
        self.set_state(ConnectionState::Starting);

        while self.running.load(Ordering::SeqCst) {
            let (tx, rx) = mpsc::unbounded();
            let pushed_revision = {
                let filter = lock(&self.filter);
                let _ = tx.unbounded_send(self.request(&filter));
                filter.revision()
            };

            let opened = tokio::select! {
                _ = stop_rx.changed() => return,
                opened = self.transport.open(rx) => opened,
            };

            match opened {
                Ok(stream) => {
                    self.install(tx, pushed_revision);
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    info!(endpoint = %endpoint, kind = ?D::KIND, "stream connected");

                    match self.pump(stream, stop_rx).await {
                        SessionEnd::Stopped => return,
                        SessionEnd::Ended => {
                            info!(endpoint = %endpoint, "server ended the stream");
                            let end = read(&self.callbacks).end.clone();
                            if let Some(cb) = end {
                                cb();
                            }
                        }
                        SessionEnd::Failed(e) => {
                            error!(endpoint = %endpoint, error = %e, "stream failed");
                            self.report(&e);
                        }
                    }
                }
                Err(e) => {
                    error!(endpoint = %endpoint, error = %e, "failed to open stream");
                    self.report(&e);
                }
            }

            *lock(&self.sender) = None;
            if !self.running.load(Ordering::SeqCst) {
                return;
            }

            attempt = attempt.saturating_add(1);
            bump(&self.counters.reconnections);
            self.set_state(ConnectionState::Reconnecting);
            let delay = self.policy.delay(attempt);
            warn!(endpoint = %endpoint, attempt, ?delay, "reconnecting");

            tokio::select! {
                _ = stop_rx.changed() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn pump(&self, mut stream: UpdateStream, stop_rx: &mut watch::Receiver<u64>) -> SessionEnd {
        loop {
            let next = tokio::select! {
                _ = stop_rx.changed() => return SessionEnd::Stopped,
                next = stream.next() => next,
            };
            match next {
                None => return SessionEnd::Ended,
                Some(Err(e)) => return SessionEnd::Failed(e),
                Some(Ok(update)) => self.handle(update),
            }
        }
    }

    fn handle(&self, update: SubscribeUpdate) {
        let Some(oneof) = update.update_oneof else {
            trace!("empty update");
            return;
        };
        bump(&self.counters.frames_received);

        match oneof {
            UpdateOneof::Ping(_) => {
                if let Some(tx) = lock(&self.sender).as_ref() {
                    let _ = tx.unbounded_send(ping_request(1));
                }
                trace!("answered server ping");
            }
            UpdateOneof::Pong(pong) => trace!(id = pong.id, "pong"),
            other => match self.decoder.decode(other) {
                None => trace!("update ignored by this stream"),
                Some(Ok(output)) => {
                    bump(&self.counters.decoded);
                    self.dispatch(&output);
                }
                Some(Err(e)) => {
                    bump(&self.counters.decode_errors);
                    debug!(error = %e, "frame decode failed");
                    self.report(&StreamError::Decode(e));
                }
            },
        }
    }

    fn dispatch(&self, output: &D::Output) {
        let (data, instructions) = {
            let callbacks = read(&self.callbacks);
            (callbacks.data.clone(), callbacks.instructions.clone())
        };
        if let Some(cb) = data {
            cb(output);
        }
        let Some(tx) = D::as_transaction(output) else {
            return;
        };
        if instructions.is_empty() {
            return;
        }
        // first match wins; at most one callback per transaction
        let hit = tx
            .instructions_in_dispatch_order()
            .find_map(|ix| ix.name().and_then(|name| instructions.get(name)).map(|cb| (ix, cb)));
        if let Some((ix, cb)) = hit {
            cb(ix, tx);
        }
    }

    fn report(&self, e: &StreamError) {
        let cb = read(&self.callbacks).error.clone();
        if let Some(cb) = cb {
            cb(e);
        }
    }
}
