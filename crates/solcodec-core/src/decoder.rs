//! Batch decode policy and progress types shared by the batch engine.

use crate::error::DecodeError;

/// Callback invoked by the batch engine during long-running decodes.
/// `decoded` is the number of items processed so far;
/// `total` is the total count in the current batch.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, decoded: usize, total: usize);
}

/// Blanket impl so closures can be used as progress callbacks.
impl<F: Fn(usize, usize) + Send + Sync> ProgressCallback for F {
    fn on_progress(&self, decoded: usize, total: usize) {
        self(decoded, total)
    }
}

/// Controls how the batch engine reacts to individual decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Silently skip items that fail to decode.
    #[default]
    Skip,
    /// Collect decode errors alongside successes and return both at the end.
    Collect,
    /// Abort the entire batch on first error.
    Throw,
}

/// The output of a batch decode: successful items plus any collected errors.
#[derive(Debug)]
pub struct BatchDecodeResult<T> {
    pub items: Vec<T>,
    /// Populated only when `ErrorMode::Collect` is used.
    pub errors: Vec<(usize, DecodeError)>,
}

impl<T> BatchDecodeResult<T> {
    pub fn total(&self) -> usize {
        self.items.len() + self.errors.len()
    }
}
