use crate::{Error, MuSig, Vec};
use secp256kfun::{
    Point,
    digest::{Digest, generic_array::typenum::U32},
    hash::Hash32,
    marker::*,
};

/// A commitment to a signer's nonce: the hash of its 32-byte x-only encoding.
///
/// Every signer sends one of these before anyone reveals their nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct NonceCommitment([u8; 32]);

impl NonceCommitment {
    /// Wraps 32 bytes received from another signer.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The commitment as bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

secp256kfun::impl_fromstr_deserialize! {
    name => "MuSig nonce commitment",
    fn from_bytes(bytes: [u8;32]) -> Option<NonceCommitment> {
        Some(NonceCommitment(bytes))
    }
}

secp256kfun::impl_display_serialize! {
    fn to_bytes(commitment: &NonceCommitment) -> [u8;32] {
        commitment.0
    }
}

/// What a session knows about one signer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "bincode",
    derive(crate::fun::bincode::Encode, crate::fun::bincode::Decode),
    bincode(crate = "crate::fun::bincode")
)]
#[cfg_attr(
    feature = "serde",
    derive(crate::fun::serde::Deserialize, crate::fun::serde::Serialize),
    serde(crate = "crate::fun::serde")
)]
pub struct SignerData {
    index: u32,
    nonce_commitment: NonceCommitment,
    nonce: Option<Point<EvenY>>,
}

impl SignerData {
    fn new(index: u32) -> Self {
        Self {
            index,
            nonce_commitment: NonceCommitment::default(),
            nonce: None,
        }
    }

    /// The signer's position in the key list.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The commitment recorded for the signer (all zeros until commitments are exchanged).
    pub fn nonce_commitment(&self) -> NonceCommitment {
        self.nonce_commitment
    }

    /// The signer's nonce once it has been revealed and checked against the commitment.
    pub fn nonce(&self) -> Option<Point<EvenY>> {
        self.nonce
    }

    /// Whether the nonce has been revealed.
    pub fn is_present(&self) -> bool {
        self.nonce.is_some()
    }
}

/// The [`SignerData`] for every signer in a session, ordered by index.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "bincode",
    derive(crate::fun::bincode::Encode, crate::fun::bincode::Decode),
    bincode(crate = "crate::fun::bincode")
)]
#[cfg_attr(
    feature = "serde",
    derive(crate::fun::serde::Deserialize, crate::fun::serde::Serialize),
    serde(crate = "crate::fun::serde")
)]
pub struct SignerRegistry {
    signers: Vec<SignerData>,
}

impl SignerRegistry {
    pub(crate) fn new(n_signers: u32) -> Self {
        Self {
            signers: (0..n_signers).map(SignerData::new).collect(),
        }
    }

    pub(crate) fn record_commitments(&mut self, commitments: &[NonceCommitment]) {
        for (signer, commitment) in self.signers.iter_mut().zip(commitments) {
            signer.nonce_commitment = *commitment;
        }
    }

    /// The number of signers.
    pub fn len(&self) -> usize {
        self.signers.len()
    }

    /// Always false for a registry created by a session.
    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    /// Iterate over the signers in index order.
    pub fn iter(&self) -> impl Iterator<Item = &SignerData> {
        self.signers.iter()
    }

    /// The data for the signer at `index`.
    pub fn get(&self, index: u32) -> Option<&SignerData> {
        self.signers.get(index as usize)
    }

    /// Mutable access to the data for the signer at `index` e.g. to pass to [`MuSig::set_nonce`].
    pub fn get_mut(&mut self, index: u32) -> Option<&mut SignerData> {
        self.signers.get_mut(index as usize)
    }

    /// Whether every signer has revealed their nonce.
    pub fn all_present(&self) -> bool {
        self.signers.iter().all(SignerData::is_present)
    }
}

impl<H: Hash32 + Digest<OutputSize = U32>> MuSig<H> {
    /// The commitment to a nonce.
    pub fn nonce_commitment(&self, nonce: &[u8; 32]) -> NonceCommitment {
        NonceCommitment(self.hash([&nonce[..]]))
    }

    /// Records the nonce a signer revealed after checking it against their commitment.
    ///
    /// Fails if the nonce doesn't hash to the commitment, if it is not a valid x-only point or if
    /// the signer's nonce was already set. `signer` is not modified on failure.
    pub fn set_nonce(&self, signer: &mut SignerData, nonce: [u8; 32]) -> Result<(), Error> {
        let index = signer.index;
        if signer.nonce.is_some() {
            return Err(Error::NonceAlreadySet { index });
        }
        if self.nonce_commitment(&nonce) != signer.nonce_commitment {
            tracing::warn!(index, "revealed nonce does not match commitment");
            return Err(Error::NonceCommitmentMismatch { index });
        }
        let nonce =
            Point::<EvenY>::from_xonly_bytes(nonce).ok_or(Error::InvalidNonce { index })?;
        signer.nonce = Some(nonce);
        tracing::debug!(index, "nonce revealed");
        Ok(())
    }

    /// The hash of every signer's commitment in index order.
    pub(crate) fn commitments_hash(&self, signers: &SignerRegistry) -> [u8; 32] {
        let commitments = signers
            .iter()
            .map(|signer| signer.nonce_commitment.0)
            .collect::<Vec<_>>();
        self.hash(commitments.iter().map(|commitment| &commitment[..]))
    }
}
