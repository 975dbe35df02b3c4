//! # solcodec-stream
//!
//! Real-time Solana streaming for SolCodec over Yellowstone (Dragon's Mouth) gRPC.
//!
//! A `StreamConnection` owns one duplex subscribe channel. It pushes the
//! current `SubscriptionFilter`, converts inbound protobuf frames into
//! canonical raw types, decodes them with a `SolanaDecoder`, and hands the
//! result to user callbacks. Channel failures are retried forever under a
//! `ReconnectPolicy` until `stop()`.
//!
//! ## Architecture
//! ```text
//! GeyserTransport::open (tonic, x-token)
//!       │  ▲ SubscribeRequest (filter, ping replies)
//!       ▼  │
//! SubscribeUpdate stream
//!       │
//!       ▼
//! wire::from_channel_frame / wire::account_from_frame
//!       │
//!       ▼
//! SolanaDecoder (normalizer / account decoder)
//!       │
//!       ▼
//! on_data, then on_detect_instruction (first match only)
//! ```

pub mod backoff;
pub mod config;
pub mod connection;
pub mod filter;
pub mod transport;
pub mod wire;

pub use backoff::ReconnectPolicy;
pub use config::{Commitment, StreamConfig};
pub use connection::{
    AccountFrames, AccountStream, ConnectionState, FrameDecoder, StreamConnection, StreamMetrics,
    TransactionFrames, TransactionStream,
};
pub use filter::{StreamKind, SubscriptionFilter};
pub use transport::{GeyserTransport, GrpcTransport, UpdateStream};
pub use wire::{account_from_frame, from_channel_frame};
