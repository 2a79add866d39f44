//! Sign-correction rules.
//!
//! Keys and nonces travel as x-only points so every party works with the even-y version of each
//! point. These functions decide when a scalar has to be negated to stay consistent with that.
use crate::PreSession;

/// The internal key had odd y before it was tweaked.
fn internal_key_was_odd(pre_session: &PreSession) -> bool {
    pre_session.is_tweaked() && pre_session.internal_key_parity()
}

/// Whether a signer's secret key must be negated so that `mu * x * G` contributes the right sign
/// to the aggregate key. `pubkey_is_odd` is the parity of `x * G`.
pub(crate) fn seckey_needs_negation(pubkey_is_odd: bool, pre_session: &PreSession) -> bool {
    pubkey_is_odd ^ pre_session.pk_parity() ^ internal_key_was_odd(pre_session)
}

/// Whether the weighted challenge must be negated when checking a partial signature against
/// the signer's x-only key.
pub(crate) fn challenge_needs_negation(pre_session: &PreSession) -> bool {
    pre_session.pk_parity() ^ internal_key_was_odd(pre_session)
}

/// Whether the `e * tweak` term must be negated when completing a signature under a tweaked key.
pub(crate) fn tweak_needs_negation(pre_session: &PreSession) -> bool {
    pre_session.pk_parity()
}

/// Whether our secret nonce must be negated. Our published nonce is the even-y version of
/// `k * G` and the final nonce is the even-y version of the sum.
pub(crate) fn secnonce_needs_negation(own_nonce_was_odd: bool, combined_nonce_was_odd: bool) -> bool {
    own_nonce_was_odd != combined_nonce_was_odd
}

/// Whether the adaptor secret must be negated when it is added to a partial signature.
pub(crate) fn adaptor_needs_negation(nonce_parity: bool) -> bool {
    nonce_parity
}

/// Whether the difference between the partial signatures and the final `s` must be negated to
/// recover the adaptor secret.
pub(crate) fn extracted_adaptor_needs_negation(nonce_parity: bool) -> bool {
    !nonce_parity
}
