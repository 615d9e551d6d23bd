//! Shared proptest generators.

use proptest::prelude::*;

/// Codes the retry policy may re-issue.
pub const TRANSIENT_CODES: [i64; 5] = [408, 500, 502, 503, 504];

/// Generate a code on the transient allow-list.
pub fn transient_code_strategy() -> impl Strategy<Value = i64> {
    proptest::sample::select(TRANSIENT_CODES.to_vec())
}

/// Generate any code outside the transient allow-list.
pub fn non_transient_code_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(200_i64),
        Just(400_i64),
        Just(401_i64),
        Just(403_i64),
        Just(404_i64),
        Just(501_i64),
        (0_i64..100_000).prop_filter("transient code", |c| !TRANSIENT_CODES.contains(c)),
    ]
}

/// Generate a non-empty message.
pub fn message_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,40}"
}

/// Generate a token-like string.
pub fn token_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._-]{8,64}"
}
