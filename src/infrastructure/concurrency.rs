/// Concurrency management for apextrace.
/// Configures the global rayon pool used for parallel source extraction.

use anyhow::Result;

/// Initialize the global rayon thread pool. Extraction is a batch job, so
/// all cores but one are used; the spare keeps the host responsive.
pub fn init_thread_pool() -> Result<()> {
    let cores = num_cpus::get();
    let workers = std::cmp::max(1, cores - 1);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    println!(
        "[apextrace] Initialized thread pool: {} workers (system has {} cores)",
        workers, cores
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_thread_pool() {
        // The global pool may already be initialized by another test; both
        // outcomes are acceptable, the call must simply not panic.
        let result = init_thread_pool();
        assert!(result.is_ok() || result.is_err());
    }
}
