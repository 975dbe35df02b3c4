//! StreamConnection behaviour against a scripted in-memory transport.
//!
//! Every `open()` hands a `Session` to the test: the request side the
//! connection writes to, and an update sender the test uses to play the
//! server.

use async_trait::async_trait;
use futures::{channel::mpsc, StreamExt};
use solcodec_core::{error::StreamError, types::NormalizedValue};
use solcodec_registry::MemoryRegistry;
use solcodec_solana::SolanaDecoder;
use solcodec_stream::{
    transport::RequestReceiver, AccountStream, ConnectionState, GeyserTransport, ReconnectPolicy, StreamConfig,
    StreamConnection, TransactionStream, UpdateStream,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use yellowstone_grpc_proto::geyser::{subscribe_update::UpdateOneof, SubscribeRequest, SubscribeUpdate};
use yellowstone_grpc_proto::prelude::{
    CompiledInstruction, Message, MessageHeader, SubscribeUpdateAccount, SubscribeUpdateAccountInfo,
    SubscribeUpdatePing, SubscribeUpdateTransaction, SubscribeUpdateTransactionInfo, Transaction,
    TransactionStatusMeta,
};

const VAULT: &str = "5UTRCg1MkqZXFGT1iLzAP6y82pgyBJXSQNhQPysi3FfD";
const WAIT: Duration = Duration::from_secs(5);

// ─── Scripted transport ───────────────────────────────────────────────────────

struct Session {
    requests: RequestReceiver,
    updates: mpsc::UnboundedSender<Result<SubscribeUpdate, StreamError>>,
}

impl Session {
    async fn next_request(&mut self) -> SubscribeRequest {
        timeout(WAIT, self.requests.next())
            .await
            .expect("timed out waiting for a request")
            .expect("request side closed")
    }

    fn send(&self, update: UpdateOneof) {
        self.updates
            .unbounded_send(Ok(SubscribeUpdate {
                update_oneof: Some(update),
                ..Default::default()
            }))
            .expect("connection dropped the stream");
    }

    fn fail(&self, status: &str) {
        let _ = self.updates.unbounded_send(Err(StreamError::Status(status.into())));
    }
}

struct ScriptedTransport {
    sessions: tokio::sync::mpsc::UnboundedSender<Session>,
}

#[async_trait]
impl GeyserTransport for ScriptedTransport {
    fn endpoint(&self) -> &str {
        "scripted://geyser"
    }

    async fn open(&self, requests: RequestReceiver) -> Result<UpdateStream, StreamError> {
        let (updates, stream) = mpsc::unbounded();
        self.sessions
            .send(Session { requests, updates })
            .map_err(|_| StreamError::Closed)?;
        Ok(Box::pin(stream))
    }
}

struct Server {
    sessions: tokio::sync::mpsc::UnboundedReceiver<Session>,
}

impl Server {
    async fn accept(&mut self) -> Session {
        timeout(WAIT, self.sessions.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("transport dropped")
    }
}

fn scripted() -> (Arc<dyn GeyserTransport>, Server) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (Arc::new(ScriptedTransport { sessions: tx }), Server { sessions: rx })
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn decoder() -> SolanaDecoder {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.push("../../fixtures/idl");
    let registry = MemoryRegistry::new();
    registry.load_directory(&dir).expect("failed to load IDL fixtures");
    SolanaDecoder::new(Arc::new(registry))
}

fn config() -> StreamConfig {
    let mut config = StreamConfig::new("http://127.0.0.1:10000");
    config.filter_name = "test".into();
    config.reconnect = ReconnectPolicy::fixed(Duration::from_millis(10));
    config
}

fn included(request: &SubscribeRequest) -> Vec<String> {
    let mut v = request.transactions["test"].account_include.clone();
    v.sort();
    v
}

async fn wait_for<D: solcodec_stream::FrameDecoder>(conn: &StreamConnection<D>, state: ConnectionState) {
    let mut rx = conn.state_changes();
    timeout(WAIT, rx.wait_for(|s| *s == state))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed");
}

fn vault_key() -> Vec<u8> {
    bs58::decode(VAULT).into_vec().unwrap()
}

fn ix(discriminator: [u8; 8], amount: u64) -> Vec<u8> {
    let mut data = discriminator.to_vec();
    data.extend_from_slice(&amount.to_le_bytes());
    data
}

const DEPOSIT: [u8; 8] = [242, 35, 198, 137, 82, 225, 242, 182];
const WITHDRAW: [u8; 8] = [183, 18, 70, 156, 148, 109, 161, 34];

/// Keys: owner (signer), vault account, system program, vault program.
fn vault_tx(instructions: Vec<Vec<u8>>) -> UpdateOneof {
    let message = Message {
        header: Some(MessageHeader {
            num_required_signatures: 1,
            num_readonly_signed_accounts: 0,
            num_readonly_unsigned_accounts: 2,
        }),
        account_keys: vec![vec![7; 32], vec![8; 32], vec![0; 32], vault_key()],
        recent_blockhash: vec![9; 32],
        instructions: instructions
            .into_iter()
            .map(|data| CompiledInstruction {
                program_id_index: 3,
                accounts: vec![1, 0, 2],
                data,
            })
            .collect(),
        versioned: false,
        ..Default::default()
    };
    UpdateOneof::Transaction(SubscribeUpdateTransaction {
        transaction: Some(SubscribeUpdateTransactionInfo {
            signature: vec![1; 64],
            transaction: Some(Transaction {
                signatures: vec![vec![1; 64]],
                message: Some(message),
            }),
            meta: Some(TransactionStatusMeta {
                fee: 5000,
                ..Default::default()
            }),
            ..Default::default()
        }),
        slot: 77,
        ..Default::default()
    })
}

fn ping() -> UpdateOneof {
    UpdateOneof::Ping(SubscribeUpdatePing::default())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reconnect_pushes_latest_filter() {
    let (transport, mut server) = scripted();
    let conn = TransactionStream::transactions(transport, decoder(), &config());
    conn.add_addresses(["A", "B"]);

    let errors = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&errors);
    conn.on_error(move |e| {
        assert!(e.is_channel_error());
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.start().await }
    });

    let mut first = server.accept().await;
    assert_eq!(included(&first.next_request().await), vec!["A", "B"]);
    wait_for(&conn, ConnectionState::Connected).await;

    assert!(conn.remove_addresses(["A"]));
    assert_eq!(included(&first.next_request().await), vec!["B"]);

    first.fail("unavailable");
    let mut second = server.accept().await;
    let resubscribe = second.next_request().await;
    assert_eq!(included(&resubscribe), vec!["B"]);
    assert_eq!(resubscribe.transactions.len(), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 1);

    wait_for(&conn, ConnectionState::Connected).await;
    assert_eq!(conn.metrics().reconnections, 1);

    conn.stop();
    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
    assert_eq!(conn.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn at_most_one_instruction_callback_per_transaction() {
    let (transport, mut server) = scripted();
    let conn = TransactionStream::transactions(transport, decoder(), &config());

    let hits = Arc::new(Mutex::new(Vec::<(String, u64)>::new()));
    for name in ["deposit", "withdraw"] {
        let hits = Arc::clone(&hits);
        assert!(conn.on_detect_instruction(name, move |ix, tx| {
            let parsed = ix.parsed().unwrap();
            let Some(NormalizedValue::Uint(amount)) = parsed.args.get("amount") else {
                panic!("amount missing");
            };
            hits.lock().unwrap().push((parsed.name.clone(), tx.slot + amount));
        }));
    }
    assert!(!conn.on_detect_instruction("not_an_instruction", |_, _| {}));

    let data = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&data);
    conn.on_data(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.start().await }
    });
    let mut session = server.accept().await;
    session.next_request().await;
    wait_for(&conn, ConnectionState::Connected).await;

    session.send(vault_tx(vec![ix(WITHDRAW, 1), ix(DEPOSIT, 2)]));
    session.send(vault_tx(vec![ix(DEPOSIT, 3)]));
    session.send(ping());

    // frames are handled in order, so the ping reply means both are done
    let reply = session.next_request().await;
    assert_eq!(reply.ping.map(|p| p.id), Some(1));
    assert!(reply.transactions.is_empty());

    assert_eq!(data.load(Ordering::SeqCst), 2);
    assert_eq!(
        *hits.lock().unwrap(),
        vec![("withdraw".to_string(), 78), ("deposit".to_string(), 80)]
    );
    assert_eq!(conn.metrics().decoded, 2);

    conn.stop();
    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn bad_frame_is_reported_without_reconnect() {
    let (transport, mut server) = scripted();
    let conn = TransactionStream::transactions(transport, decoder(), &config());

    let decode_errors = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&decode_errors);
    conn.on_error(move |e| {
        if !e.is_channel_error() {
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.start().await }
    });
    let mut session = server.accept().await;
    session.next_request().await;

    session.send(UpdateOneof::Transaction(SubscribeUpdateTransaction::default()));
    session.send(ping());
    assert!(session.next_request().await.ping.is_some());

    assert_eq!(decode_errors.load(Ordering::SeqCst), 1);
    let metrics = conn.metrics();
    assert_eq!(metrics.decode_errors, 1);
    assert_eq!(metrics.reconnections, 0);

    conn.stop();
    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn account_stream_end_then_stop() {
    let (transport, mut server) = scripted();
    let mut cfg = config();
    cfg.owners = vec![VAULT.to_string()];
    let conn = AccountStream::accounts(transport, decoder(), &cfg);

    let accounts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&accounts);
    conn.on_data(move |acc| sink.lock().unwrap().push(acc.parsed.type_name.clone()));
    let ends = Arc::new(AtomicUsize::new(0));
    let e = Arc::clone(&ends);
    conn.on_end(move || {
        e.fetch_add(1, Ordering::SeqCst);
    });
    let closes = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&closes);
    conn.on_close(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.start().await }
    });

    let mut first = server.accept().await;
    let request = first.next_request().await;
    assert_eq!(request.accounts["test"].owner, vec![VAULT]);
    assert!(request.transactions.is_empty());
    wait_for(&conn, ConnectionState::Connected).await;

    let mut data = vec![211, 8, 232, 43, 2, 152, 117, 119];
    data.extend_from_slice(&[7; 32]);
    data.extend_from_slice(&500u64.to_le_bytes());
    data.extend_from_slice(&[0, 254]);
    first.send(UpdateOneof::Account(SubscribeUpdateAccount {
        account: Some(SubscribeUpdateAccountInfo {
            pubkey: vec![8; 32],
            owner: vault_key(),
            lamports: 1_000_000,
            data,
            ..Default::default()
        }),
        slot: 9,
        ..Default::default()
    }));

    // owner changes while connected go straight out
    assert!(conn.add_owners(["11111111111111111111111111111111"]));
    assert_eq!(first.next_request().await.accounts["test"].owner.len(), 2);
    first.send(ping());
    assert!(first.next_request().await.ping.is_some());
    assert_eq!(*accounts.lock().unwrap(), vec!["Vault".to_string()]);

    // a normal server end is followed by a reconnect
    drop(first);
    let mut second = server.accept().await;
    assert_eq!(second.next_request().await.accounts["test"].owner.len(), 2);
    assert_eq!(ends.load(Ordering::SeqCst), 1);

    conn.stop();
    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(conn.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn second_start_is_rejected() {
    let (transport, mut server) = scripted();
    let conn = TransactionStream::transactions(transport, decoder(), &config());
    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.start().await }
    });
    let _session = server.accept().await;

    assert!(matches!(conn.start().await, Err(StreamError::AlreadyRunning)));

    conn.stop();
    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
    assert!(!conn.is_running());
}
