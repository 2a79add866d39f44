use crate::{Error, MuSig, Session, SignerData, SignerRegistry, parity, secret::SecretScalar};
use schnorr_fun::Signature;
use secp256kfun::{
    G, Point, Scalar,
    digest::{Digest, generic_array::typenum::U32},
    g,
    hash::Hash32,
    marker::*,
    s,
};

/// One signer's share of the final signature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartialSignature(pub(crate) Scalar<Public, Zero>);

impl PartialSignature {
    /// Decodes a partial signature. Returns `None` if the bytes are not less than the curve
    /// order.
    pub fn from_bytes(bytes: [u8; 32]) -> Option<Self> {
        Scalar::<Secret, Zero>::from_bytes(bytes).map(|s| Self(s.public()))
    }

    /// Encodes the partial signature as a 32-byte big-endian scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// The partial signature as a scalar.
    pub fn as_scalar(&self) -> Scalar<Public, Zero> {
        self.0
    }
}

secp256kfun::impl_fromstr_deserialize! {
    name => "MuSig partial signature",
    fn from_bytes(bytes: [u8;32]) -> Option<PartialSignature> {
        PartialSignature::from_bytes(bytes)
    }
}

secp256kfun::impl_display_serialize! {
    fn to_bytes(partial_sig: &PartialSignature) -> [u8;32] {
        partial_sig.to_bytes()
    }
}

impl<H: Hash32 + Digest<OutputSize = U32>> MuSig<H> {
    /// Creates our partial signature.
    ///
    /// The session must be a signing session whose nonces have been combined.
    pub fn partial_sign(&self, session: &Session) -> Result<PartialSignature, Error> {
        let secret = session.secret.as_ref().ok_or(Error::MissingSecret)?;
        let (message, R, nonce_parity) = session.combined()?;
        let e = self.challenge(&R, &session.combined_pk, &message);

        let mut k = SecretScalar::new(*secret.secnonce);
        k.conditional_negate(parity::secnonce_needs_negation(
            secret.nonce_was_odd,
            nonce_parity,
        ));
        let (x, k) = (&*secret.seckey, &*k);
        let s = s!(e * x + k).public();

        tracing::debug!(index = secret.index, "created partial signature");
        Ok(PartialSignature(s))
    }

    /// Checks a partial signature from `signer` whose x-only public key is `pubkey`.
    ///
    /// `pubkey` must be the key at `signer`'s index in the list passed to [`combine_keys`].
    ///
    /// [`combine_keys`]: Self::combine_keys
    pub fn verify_partial_signature(
        &self,
        session: &Session,
        signer: &SignerData,
        partial_sig: PartialSignature,
        pubkey: &Point<EvenY>,
    ) -> Result<(), Error> {
        let (message, R, nonce_parity) = session.combined()?;
        let index = signer.index();
        if index >= session.n_signers {
            return Err(Error::IndexOutOfRange {
                index,
                n_signers: session.n_signers,
            });
        }
        let R_i = signer
            .nonce()
            .ok_or(Error::NonceMissing { index })?
            .conditional_negate(nonce_parity);

        let e = self.challenge(&R, &session.combined_pk, &message);
        let mu = self.key_coefficient(&session.pre_session, index);
        let mut c = s!(e * mu).public();
        c.conditional_negate(parity::challenge_needs_negation(&session.pre_session));

        let s = partial_sig.0;
        let X = pubkey;
        if g!(s * G - c * X - R_i).is_zero() {
            Ok(())
        } else {
            tracing::warn!(index, "invalid partial signature");
            Err(Error::InvalidPartialSignature { index })
        }
    }

    /// Adds up the partial signatures into the final signature.
    ///
    /// This doesn't check the partial signatures. If you haven't checked them individually with
    /// [`verify_partial_signature`] use [`verify_and_combine_partial_signatures`].
    ///
    /// If the aggregate key was tweaked the tweak's contribution is added here.
    ///
    /// [`verify_partial_signature`]: Self::verify_partial_signature
    /// [`verify_and_combine_partial_signatures`]: Self::verify_and_combine_partial_signatures
    pub fn combine_partial_signatures(
        &self,
        session: &Session,
        partial_sigs: &[PartialSignature],
    ) -> Result<Signature, Error> {
        let (message, R, _) = session.combined()?;
        if partial_sigs.len() != session.n_signers as usize {
            return Err(Error::WrongSignerCount {
                expected: session.n_signers,
                got: partial_sigs.len(),
            });
        }
        let mut s = sum(partial_sigs);
        if let Some(tweak) = session.pre_session.tweak() {
            let e = self.challenge(&R, &session.combined_pk, &message);
            let mut e_tweak = s!(e * tweak).public();
            e_tweak.conditional_negate(parity::tweak_needs_negation(&session.pre_session));
            s = s!(s + e_tweak).public();
        }

        Ok(Signature { R, s })
    }

    /// Checks every partial signature and then combines them.
    ///
    /// `pubkeys` are the keys in the order given to [`combine_keys`].
    ///
    /// [`combine_keys`]: Self::combine_keys
    pub fn verify_and_combine_partial_signatures(
        &self,
        session: &Session,
        signers: &SignerRegistry,
        pubkeys: &[Point<EvenY>],
        partial_sigs: &[PartialSignature],
    ) -> Result<Signature, Error> {
        let expected = session.n_signers;
        for got in [signers.len(), pubkeys.len(), partial_sigs.len()] {
            if got != expected as usize {
                return Err(Error::WrongSignerCount { expected, got });
            }
        }
        for ((signer, pubkey), partial_sig) in signers.iter().zip(pubkeys).zip(partial_sigs) {
            self.verify_partial_signature(session, signer, *partial_sig, pubkey)?;
        }
        self.combine_partial_signatures(session, partial_sigs)
    }
}

fn sum(partial_sigs: &[PartialSignature]) -> Scalar<Public, Zero> {
    partial_sigs
        .iter()
        .fold(Scalar::zero(), |acc, partial_sig| {
            let partial_sig = partial_sig.0;
            s!(acc + partial_sig).public()
        })
}
