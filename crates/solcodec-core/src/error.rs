//! Error types for the SolCodec decode pipeline.

use thiserror::Error;

/// Errors that can occur while decoding a byte buffer against a schema.
///
/// Instruction and event decoding demote these to an undecoded result;
/// account decoding and type resolution surface them to the caller.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("account parser not found for owner {owner}")]
    AccountParserNotFound { owner: String },

    #[error("discriminator not found for owner {owner}")]
    DiscriminatorNotFound { owner: String },

    #[error("instruction discriminator not recognised by program {program}")]
    UnknownInstruction { program: String },

    #[error("type '{name}' is not defined in the schema type table")]
    TypeNotFound { name: String },

    #[error("enum '{type_name}' has no variant with discriminant {discriminant}")]
    UnknownVariant { type_name: String, discriminant: u8 },

    #[error("unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("invalid {kind} tag {tag}")]
    InvalidTag { kind: &'static str, tag: u32 },

    #[error("invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("unsupported layout: {0}")]
    UnsupportedLayout(String),

    #[error("malformed {program} instruction: {reason}")]
    MalformedInstruction { program: &'static str, reason: String },

    #[error("account index {index} out of bounds ({len} keys)")]
    AccountIndexOutOfBounds { index: usize, len: usize },

    #[error("invalid wire frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors from the schema registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid program address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("IDL parse error: {0}")]
    ParseError(String),

    #[error("IDL type error in '{context}': {reason}")]
    InvalidType { context: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors from the streaming layer.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("gRPC connection failed: {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("stream closed unexpectedly")]
    Closed,

    #[error("gRPC status: {0}")]
    Status(String),

    #[error("failed to push subscription request: {0}")]
    Push(String),

    #[error("stream connection is already running")]
    AlreadyRunning,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("Decode error in stream: {0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Other(String),
}

/// Errors from a batch decode run.
#[derive(Debug, Error)]
pub enum BatchDecodeError {
    #[error("batch item {index} failed: {source}")]
    ItemFailed {
        index: usize,
        #[source]
        source: DecodeError,
    },

    #[error("batch is empty")]
    Empty,

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

impl StreamError {
    /// Returns `true` for errors raised by the channel itself rather than by decoding.
    pub fn is_channel_error(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}
