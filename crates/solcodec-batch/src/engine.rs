//! `BatchEngine`: chunked, parallel decoding of independent items.

use crate::request::BatchRequest;
use rayon::prelude::*;
use solcodec_core::{
    account::{AccountInfo, DecodedAccount},
    decoder::{BatchDecodeResult, ErrorMode},
    error::{BatchDecodeError, DecodeError},
    transaction::{DecodedTransaction, RawTransaction},
};
use solcodec_solana::SolanaDecoder;
use tracing::{debug, info};

/// Batch decode engine over a shared `SolanaDecoder`.
#[derive(Clone)]
pub struct BatchEngine {
    decoder: SolanaDecoder,
}

impl BatchEngine {
    pub fn new(decoder: SolanaDecoder) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &SolanaDecoder {
        &self.decoder
    }

    /// Normalize every transaction. Transaction decoding never fails, so the
    /// error mode has no effect here.
    pub fn decode_transactions(
        &self,
        req: BatchRequest<RawTransaction>,
    ) -> Result<BatchDecodeResult<DecodedTransaction>, BatchDecodeError> {
        self.run(req, |raw| Ok(self.decoder.decode_transaction(raw)))
    }

    pub fn decode_accounts(
        &self,
        req: BatchRequest<AccountInfo>,
    ) -> Result<BatchDecodeResult<DecodedAccount>, BatchDecodeError> {
        self.run(req, |info| self.decoder.decode_account(info.clone()))
    }

    fn run<I, T, F>(&self, req: BatchRequest<I>, decode: F) -> Result<BatchDecodeResult<T>, BatchDecodeError>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> Result<T, DecodeError> + Sync,
    {
        let total = req.items.len();
        if total == 0 {
            return Err(BatchDecodeError::Empty);
        }
        let chunk_size = req.chunk_size.max(1);
        let pool = match req.concurrency {
            0 => None,
            n => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| BatchDecodeError::Pool(e.to_string()))?,
            ),
        };
        info!(total, chunk_size, concurrency = req.concurrency, mode = ?req.error_mode, "batch decode started");

        let mut items = Vec::with_capacity(total);
        let mut errors = Vec::new();
        let mut offset = 0usize;

        for chunk in req.items.chunks(chunk_size) {
            let decode_chunk = || chunk.par_iter().map(&decode).collect::<Vec<_>>();
            let results = match &pool {
                Some(pool) => pool.install(decode_chunk),
                None => decode_chunk(),
            };

            for (i, result) in results.into_iter().enumerate() {
                let index = offset + i;
                match (result, req.error_mode) {
                    (Ok(item), _) => items.push(item),
                    (Err(e), ErrorMode::Skip) => debug!(index, error = %e, "skipping undecodable item"),
                    (Err(e), ErrorMode::Collect) => errors.push((index, e)),
                    (Err(source), ErrorMode::Throw) => {
                        return Err(BatchDecodeError::ItemFailed { index, source });
                    }
                }
            }

            offset += chunk.len();
            if let Some(cb) = &req.on_progress {
                cb.on_progress(offset, total);
            }
        }

        info!(decoded = items.len(), errors = errors.len(), "batch decode complete");
        Ok(BatchDecodeResult { items, errors })
    }
}
