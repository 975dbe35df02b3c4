//! Batch decode request configuration.

use solcodec_core::decoder::{ErrorMode, ProgressCallback};

/// Configuration for a batch decode job over items of type `I`.
pub struct BatchRequest<I> {
    /// The items to decode, in input order
    pub items: Vec<I>,
    /// Number of Rayon workers (0 = the global pool)
    pub concurrency: usize,
    /// Max items per chunk; progress is reported after each chunk
    pub chunk_size: usize,
    /// How to handle decode errors
    pub error_mode: ErrorMode,
    /// Optional progress callback
    pub on_progress: Option<Box<dyn ProgressCallback>>,
}

impl<I> BatchRequest<I> {
    pub fn new(items: Vec<I>) -> Self {
        Self {
            items,
            concurrency: 0,
            chunk_size: 10_000,
            error_mode: ErrorMode::Skip,
            on_progress: None,
        }
    }

    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    pub fn on_progress<F: Fn(usize, usize) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }
}
