//! Per-sample work spread over the rayon pool once a sequence is long
//! enough. wasm builds always run serially.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Shorter sequences are mapped on the calling thread.
#[cfg(not(target_arch = "wasm32"))]
pub const MIN_PARALLEL_SAMPLES: usize = 1024;

/// Maps every sample with its index. Output order always matches input order.
pub fn map_samples<T, U, F>(samples: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> U + Sync + Send,
{
    #[cfg(not(target_arch = "wasm32"))]
    {
        if samples.len() >= MIN_PARALLEL_SAMPLES {
            return samples
                .par_iter()
                .enumerate()
                .map(|(idx, sample)| f(idx, sample))
                .collect();
        }
    }

    samples
        .iter()
        .enumerate()
        .map(|(idx, sample)| f(idx, sample))
        .collect()
}
