//! Small shared utilities: index types, the small-string name alias, the
//! process-wide worker pool, and the advisory env-switches from spec §6.

pub mod cancel;
pub mod pool;

pub use cancel::CancellationToken;
pub use compact_str::CompactString as SmallStr;

/// Row-index type used throughout take/sort/join kernels.
pub type IdxSize = u32;

/// Sentinel used by permissive `take` to mark "emit null here" (spec §4.5).
pub const NULL_IDX: IdxSize = IdxSize::MAX;

/// Build hasher used for composite group-by/join keys (spec §9).
pub type PlRandomState = ahash::RandomState;

pub fn build_hasher() -> PlRandomState {
    ahash::RandomState::with_seeds(0x5bd1e995, 0x27d4eb2f, 0x165667b1, 0x9e3779b9)
}
