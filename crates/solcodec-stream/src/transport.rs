//! `GeyserTransport`: opens one duplex subscribe channel.
//!
//! The connection owns the request side (an unbounded mpsc it can push
//! filter updates and ping replies into) and reads updates from the returned
//! stream. `GrpcTransport` is the Yellowstone implementation; tests script
//! their own.

use async_trait::async_trait;
use futures::{channel::mpsc, Stream, StreamExt};
use solcodec_core::error::StreamError;
use std::pin::Pin;
use std::time::Duration;
use tonic::{
    metadata::AsciiMetadataValue,
    service::Interceptor,
    transport::{ClientTlsConfig, Endpoint},
    Request, Status,
};
use tracing::{debug, info};
use yellowstone_grpc_proto::geyser::{geyser_client::GeyserClient, SubscribeRequest, SubscribeUpdate};

use crate::config::StreamConfig;

/// Inbound side of an open channel.
pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<SubscribeUpdate, StreamError>> + Send>>;

/// Outbound side of an open channel.
pub type RequestReceiver = mpsc::UnboundedReceiver<SubscribeRequest>;

#[async_trait]
pub trait GeyserTransport: Send + Sync {
    /// Endpoint label used in logs and errors.
    fn endpoint(&self) -> &str;

    /// Open a subscribe channel. Requests already queued on `requests` are
    /// sent first.
    async fn open(&self, requests: RequestReceiver) -> Result<UpdateStream, StreamError>;
}

/// Attaches the `x-token` header to every call.
#[derive(Clone)]
pub struct XTokenInterceptor {
    token: Option<AsciiMetadataValue>,
}

impl Interceptor for XTokenInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        if let Some(token) = &self.token {
            request.metadata_mut().insert("x-token", token.clone());
        }
        Ok(request)
    }
}

const MAX_DECODING_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Yellowstone Dragon's Mouth transport over tonic.
pub struct GrpcTransport {
    endpoint: String,
    interceptor: XTokenInterceptor,
    connect_timeout: Duration,
}

impl GrpcTransport {
    /// Fails if the token is not valid header text.
    pub fn new(endpoint: impl Into<String>, x_token: Option<String>) -> Result<Self, StreamError> {
        let token = x_token
            .map(|t| {
                t.parse::<AsciiMetadataValue>()
                    .map_err(|e| StreamError::Config(format!("x-token: {e}")))
            })
            .transpose()?;
        Ok(Self {
            endpoint: endpoint.into(),
            interceptor: XTokenInterceptor { token },
            connect_timeout: Duration::from_secs(10),
        })
    }

    /// Endpoint and token from a validated config.
    pub fn from_config(config: &StreamConfig) -> Result<Self, StreamError> {
        Self::new(config.endpoint.clone(), config.x_token.clone())
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn connection_failed(&self, reason: impl ToString) -> StreamError {
        StreamError::ConnectionFailed {
            url: self.endpoint.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl GeyserTransport for GrpcTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open(&self, requests: RequestReceiver) -> Result<UpdateStream, StreamError> {
        let mut endpoint = Endpoint::from_shared(self.endpoint.clone())
            .map_err(|e| self.connection_failed(e))?
            .connect_timeout(self.connect_timeout)
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .http2_keep_alive_interval(Duration::from_secs(15));
        if self.endpoint.starts_with("https") {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|e| self.connection_failed(e))?;
        }

        let channel = endpoint.connect().await.map_err(|e| self.connection_failed(e))?;
        debug!(endpoint = %self.endpoint, "gRPC channel connected");

        let mut client = GeyserClient::with_interceptor(channel, self.interceptor.clone())
            .max_decoding_message_size(MAX_DECODING_MESSAGE_SIZE);
        let updates = client
            .subscribe(requests)
            .await
            .map_err(|status| StreamError::Status(status.to_string()))?
            .into_inner();
        info!(endpoint = %self.endpoint, "subscribe stream opened");

        Ok(Box::pin(
            updates.map(|item| item.map_err(|status| StreamError::Status(status.to_string()))),
        ))
    }
}
