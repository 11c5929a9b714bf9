//! Lazily-initialized, process-wide worker pool (spec §5/§6).
//!
//! `CF_MAX_THREADS` overrides the worker count; `CF_NO_PARALLEL` forces
//! every call through [`install`] to run sequentially instead. Both are
//! advisory: they change scheduling, never semantics.

use once_cell::sync::OnceCell;

static POOL: OnceCell<rayon::ThreadPool> = OnceCell::new();

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn no_parallel() -> bool {
    std::env::var("CF_NO_PARALLEL")
        .map(|v| v != "0" && !v.is_empty())
        .unwrap_or(false)
}

fn pool() -> &'static rayon::ThreadPool {
    POOL.get_or_init(|| {
        let threads = env_usize("CF_MAX_THREADS").unwrap_or(0);
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("colframe-{i}"));
        if threads > 0 {
            builder = builder.num_threads(threads);
        }
        builder
            .build()
            .expect("failed to initialize the colframe worker pool")
    })
}

/// Number of workers the pool would use for a parallel call right now.
pub fn current_num_threads() -> usize {
    if no_parallel() {
        1
    } else {
        pool().current_num_threads()
    }
}

/// Returns true when hot paths should not fan out (spec §5: "no nested pool
/// submits from within hot-path operators" — the outermost operator calls
/// `install`, everything it calls internally should check this first).
pub fn is_parallel_disabled() -> bool {
    no_parallel()
}

/// Run `f` on the process-wide pool, unless parallelism has been disabled
/// by env-switch, in which case `f` runs inline on the caller's thread.
///
/// Only the outermost operator in a call should invoke this (spec §5's
/// no-nested-submit rule); kernels invoked from within `f`'s closures must
/// partition statically instead of calling `install` again.
pub fn install<R: Send>(f: impl FnOnce() -> R + Send) -> R {
    if no_parallel() {
        tracing::warn!("CF_NO_PARALLEL set, running on the calling thread instead of the worker pool");
        f()
    } else {
        pool().install(f)
    }
}
