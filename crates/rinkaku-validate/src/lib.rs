//! Cross-representation validator for rinkaku.
//!
//! During migration the "same" logical outline lives in two places: the
//! legacy tree client and the CRDT-backed project store. The two use
//! unrelated id spaces and different structural conventions, so comparison
//! happens on normalized, id-independent snapshots: pages stable-sorted by
//! title, per-page item lists compared positionally, text mismatches hard,
//! id/author/timestamp drift soft.
//!
//! [`ValidationGuard`] wraps the validator for after-every-operation use:
//! log-only by default, or strict (first divergence becomes an error) for
//! test and CI harnesses verifying migration correctness.

mod error;
mod guard;
mod legacy;
mod snapshot;
mod validator;

pub use error::ValidateError;
pub use guard::{GuardConfig, ValidationGuard};
pub use legacy::{LegacyItem, LegacyProject};
pub use snapshot::{NormalizedItem, NormalizedPage, NormalizedSnapshot};
pub use validator::{
    DataValidator, FieldComparison, ItemSide, ItemValidationResult, PageValidationResult,
    ProjectValidationResult, ValidationOptions,
};
