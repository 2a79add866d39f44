//! Adaptor signatures on top of MuSig.
//!
//! To make the final signature reveal a secret `t` to the signers, pass `T = t * G` as the
//! adaptor to [`MuSig::combine_nonces`]. The partial signatures are then made as usual and only
//! complete to a valid signature once one of them has been [`adapt`]ed with `t`. Anyone holding the
//! unadapted partial signatures can [`MuSig::extract_secret_adaptor`] from the final signature.
use crate::{Error, MuSig, PartialSignature, Session, parity, secret::SecretScalar};
use schnorr_fun::Signature;
use secp256kfun::{
    Scalar,
    digest::{Digest, generic_array::typenum::U32},
    hash::Hash32,
    marker::*,
    s,
};

/// Adds the adaptor secret to a partial signature.
///
/// `nonce_parity` is the value returned by [`MuSig::combine_nonces`].
pub fn adapt(
    partial_sig: PartialSignature,
    secret_adaptor: &Scalar,
    nonce_parity: bool,
) -> PartialSignature {
    let mut t = SecretScalar::new(*secret_adaptor);
    t.conditional_negate(parity::adaptor_needs_negation(nonce_parity));
    let (s, t) = (partial_sig.0, &*t);
    PartialSignature(s!(s + t).public())
}

impl<H: Hash32 + Digest<OutputSize = U32>> MuSig<H> {
    /// Recovers the adaptor secret from the final signature and the partial signatures before
    /// adaptation.
    ///
    /// The unadapted partial signatures are combined under `session` first so the tweak's
    /// contribution to the final `s` cancels out when the aggregate key was tweaked.
    pub fn extract_secret_adaptor(
        &self,
        session: &Session,
        signature: &Signature,
        partial_sigs: &[PartialSignature],
    ) -> Result<Scalar<Secret, Zero>, Error> {
        let (_, _, nonce_parity) = session.combined()?;
        let pre_signature = self.combine_partial_signatures(session, partial_sigs)?;
        Ok(secret_from_difference(
            &pre_signature.s,
            &signature.s,
            nonce_parity,
        ))
    }
}

fn secret_from_difference(
    pre_s: &Scalar<Public, Zero>,
    final_s: &Scalar<Public, Zero>,
    nonce_parity: bool,
) -> Scalar<Secret, Zero> {
    let mut t = s!(pre_s - final_s).secret();
    t.conditional_negate(parity::extracted_adaptor_needs_negation(nonce_parity));
    t
}
