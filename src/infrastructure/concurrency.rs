//! Worker pool sizing for source parsing.
//! Extraction itself stays single-threaded; only model building fans out.

use rayon::ThreadPool;
use tracing::debug;

use crate::error::LoadError;

/// Default worker count: half the cores, minimum 1 worker.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

/// Builds a local pool; rayon's global pool is left untouched.
pub fn build_pool(workers: Option<usize>) -> Result<ThreadPool, LoadError> {
    let workers = workers.unwrap_or_else(default_workers).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("depreader-parse-{}", i))
        .build()?;

    debug!(workers, cores = num_cpus::get(), "initialized parse pool");
    Ok(pool)
}
