//! The translator's caller-visible error type.
//!
//! Per §7, most translation-time anomalies are *not* reported here: an
//! unrepresentable construct is silently over-approximated (havoc), and a
//! violated upstream invariant (e.g. a non-constant GEP struct index) is a
//! fatal `panic!`/`debug_assert!`, because the translator is entitled to
//! assume the loader already enforced it. `TranslateError` covers only the
//! narrower class of usage/configuration problems a caller can reasonably
//! recover from.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("function `{0}` has no basic blocks")]
    EmptyFunction(String),

    #[error(
        "memory oracle reported array id {array:?} for `{function}` while track level is NONE"
    )]
    OracleTrackLevelMismatch { function: String, array: u32 },

    #[error(
        "call in `{caller}` to `{callee}`: {actual} actual array argument(s) does not match {formal} formal(s)"
    )]
    ArityMismatch {
        caller: String,
        callee: String,
        actual: usize,
        formal: usize,
    },
}
