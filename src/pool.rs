//! Bounded worker pools for the per-file stages.
//!
//! Every top-level operation (validation, comparison, transfer batches) runs
//! its parallel work inside a dedicated rayon pool sized by the `io_threads`
//! setting. Nested stages reuse whatever pool they are already running in.

/// Run `op` inside a rayon pool with `threads` workers.
///
/// If the pool cannot be built, `op` runs on the global rayon pool instead.
pub(crate) fn run_in_pool<R, F>(threads: usize, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(op),
        Err(e) => {
            log::warn!(
                "Failed to create thread pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            op()
        }
    }
}
