//!
#![no_std]
#![allow(non_snake_case)]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

#[cfg(all(feature = "alloc", not(feature = "std")))]
#[macro_use]
extern crate alloc;
#[cfg(all(feature = "alloc", not(feature = "std")))]
pub(crate) use alloc::vec::Vec;

#[cfg(feature = "std")]
#[macro_use]
extern crate std;
#[cfg(feature = "std")]
pub(crate) use std::vec::Vec;

pub use schnorr_fun;
pub use secp256kfun as fun;

mod error;
pub use error::*;

// the signer registry and key lists need vecs
#[cfg(feature = "alloc")]
mod adaptor;
#[cfg(feature = "alloc")]
pub use adaptor::*;
#[cfg(feature = "alloc")]
mod key_agg;
#[cfg(feature = "alloc")]
pub use key_agg::*;
#[cfg(feature = "alloc")]
mod parity;
#[cfg(feature = "alloc")]
mod partial_sig;
#[cfg(feature = "alloc")]
pub use partial_sig::*;
#[cfg(feature = "alloc")]
mod secret;
#[cfg(feature = "alloc")]
mod session;
#[cfg(feature = "alloc")]
pub use session::*;
#[cfg(feature = "alloc")]
mod signer;
#[cfg(feature = "alloc")]
pub use signer::*;

use schnorr_fun::Schnorr;
use secp256kfun::{
    hash::{Hash32, Tag},
    nonce::NoNonces,
};
#[cfg(feature = "alloc")]
use schnorr_fun::Message;
#[cfg(feature = "alloc")]
use secp256kfun::{
    digest::{Digest, generic_array::typenum::U32},
    marker::*,
    Point, Scalar,
};

/// The MuSig context.
///
/// Holds the precomputed tagged hash for key coefficients and the [`Schnorr`] instance used to
/// compute challenges and check final signatures.
#[derive(Clone, Debug)]
pub struct MuSig<H> {
    /// The instance of the underlying Schnorr context.
    pub schnorr: Schnorr<H, NoNonces>,
    /// The hash used to generate each key's coefficient.
    coeff_hash: H,
}

impl<H: Hash32> Default for MuSig<H> {
    fn default() -> Self {
        MuSig::new(Schnorr::default())
    }
}

impl<H: Hash32> MuSig<H> {
    /// Generate a new MuSig context from a Schnorr context.
    ///
    /// The Schnorr instance is only used to compute BIP340 challenges and verify signatures so it
    /// doesn't need a nonce generator.
    pub fn new(schnorr: Schnorr<H, NoNonces>) -> Self {
        Self {
            coeff_hash: H::default().tag(b"MuSig coefficient"),
            schnorr,
        }
    }
}

#[cfg(feature = "alloc")]
impl<H: Hash32 + Digest<OutputSize = U32>> MuSig<H> {
    /// The coefficient `mu` that the key at `index` is multiplied by in the aggregate key.
    ///
    /// This is the tagged hash of the key list hash and the little endian encoding of `index`.
    pub fn key_coefficient(&self, pre_session: &PreSession, index: u32) -> Scalar<Public, Zero> {
        self.coefficient(&pre_session.pk_hash, index)
    }

    pub(crate) fn coefficient(&self, pk_hash: &[u8; 32], index: u32) -> Scalar<Public, Zero> {
        let mut hash = self.coeff_hash.clone();
        Digest::update(&mut hash, pk_hash);
        Digest::update(&mut hash, index.to_le_bytes());
        Scalar::<Secret, Zero>::from_bytes_mod_order(finalize(hash)).public()
    }

    /// The BIP340 challenge for the final nonce, the aggregate key and the message.
    pub(crate) fn challenge(
        &self,
        R: &Point<EvenY>,
        combined_pk: &Point<EvenY>,
        message: &[u8; 32],
    ) -> Scalar<Public, Zero> {
        self.schnorr
            .challenge(R, combined_pk, Message::<Public>::raw(&message[..]))
    }

    /// Plain `H` over the concatenation of `chunks`.
    pub(crate) fn hash<'a>(&self, chunks: impl IntoIterator<Item = &'a [u8]>) -> [u8; 32] {
        let mut hash = H::default();
        for chunk in chunks {
            Digest::update(&mut hash, chunk);
        }
        finalize(hash)
    }
}

#[cfg(feature = "alloc")]
fn finalize<H: Digest<OutputSize = U32>>(hash: H) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(Digest::finalize(hash).as_slice());
    bytes
}

/// Create a MuSig instance using SHA256 style hashing `H`.
///
/// ```
/// use musig_fun::new_musig;
/// let musig = new_musig::<sha2::Sha256>();
/// ```
pub fn new_musig<H: Hash32>() -> MuSig<H> {
    MuSig::default()
}
