use crate::{Error, MuSig, Vec};
use secp256kfun::{
    G,
    digest::{Digest, generic_array::typenum::U32},
    g,
    hash::Hash32,
    marker::*,
    op, Point, Scalar,
};

/// The data about the aggregate key that every signer needs to run a session.
///
/// Created by [`MuSig::combine_keys`] and optionally tweaked once with [`MuSig::tweak_add`].
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
pub struct PreSession {
    pub(crate) pk_hash: [u8; 32],
    pub(crate) pk_parity: bool,
    pub(crate) tweak: Option<KeyTweak>,
}

/// The tweak applied to an aggregate key.
#[derive(Clone, Copy, Debug, PartialEq)]
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
pub(crate) struct KeyTweak {
    tweak: Scalar<Public, Zero>,
    internal_key_parity: bool,
}

impl PreSession {
    /// The hash of the list of keys in the order they were aggregated.
    pub fn pk_hash(&self) -> [u8; 32] {
        self.pk_hash
    }

    /// Whether the aggregate key (tweaked if a tweak was applied) had odd y before it was turned into
    /// an x-only key.
    pub fn pk_parity(&self) -> bool {
        self.pk_parity
    }

    /// Whether [`MuSig::tweak_add`] has been applied.
    pub fn is_tweaked(&self) -> bool {
        self.tweak.is_some()
    }

    /// The tweak if there is one.
    pub fn tweak(&self) -> Option<Scalar<Public, Zero>> {
        self.tweak.map(|tweak| tweak.tweak)
    }

    /// The parity of the aggregate key before it was tweaked. `false` if it wasn't tweaked.
    pub fn internal_key_parity(&self) -> bool {
        self.tweak
            .map(|tweak| tweak.internal_key_parity)
            .unwrap_or(false)
    }
}

impl<H: Hash32 + Digest<OutputSize = U32>> MuSig<H> {
    /// Aggregates a list of x-only public keys into a single key.
    ///
    /// The order of the keys matters. Every signer must pass the keys in the same order and a
    /// signer's index in the session is the position of their key in this list.
    ///
    /// Duplicate keys are not detected.
    ///
    /// ## Example
    ///
    /// ```
    /// use musig_fun::{MuSig, fun::{G, Scalar, g}};
    /// use sha2::Sha256;
    /// let musig = MuSig::<Sha256>::default();
    /// let keys = (0..3)
    ///     .map(|_| g!({ Scalar::random(&mut rand::thread_rng()) } * G).normalize().into_point_with_even_y().0)
    ///     .collect::<Vec<_>>();
    /// let (combined_pk, pre_session) = musig.combine_keys(&keys).unwrap();
    /// ```
    pub fn combine_keys(&self, keys: &[Point<EvenY>]) -> Result<(Point<EvenY>, PreSession), Error> {
        if keys.is_empty() {
            return Err(Error::EmptyKeyList);
        }
        if u32::try_from(keys.len()).is_err() {
            return Err(Error::SignerCountOutOfBounds {
                n_signers: keys.len(),
            });
        }
        let key_bytes = keys
            .iter()
            .map(|key| key.to_xonly_bytes())
            .collect::<Vec<_>>();
        let pk_hash = self.hash(key_bytes.iter().map(|bytes| &bytes[..]));
        let coefs = (0..keys.len() as u32)
            .map(|index| self.coefficient(&pk_hash, index))
            .collect::<Vec<_>>();

        let (combined_pk, pk_parity) = op::lincomb(coefs.iter(), keys.iter())
            .non_zero()
            .ok_or(Error::IdentityPoint)?
            .into_point_with_even_y();

        tracing::debug!(n_keys = keys.len(), pk_parity, "aggregated public keys");

        Ok((
            combined_pk,
            PreSession {
                pk_hash,
                pk_parity,
                tweak: None,
            },
        ))
    }

    /// Tweaks the aggregate key so that the output key is `internal_pubkey + tweak * G`.
    ///
    /// This is how you embed a taproot commitment into the aggregate key. It can only be done
    /// once per [`PreSession`]. The returned key is a full point since its parity matters for
    /// taproot. The x-only version of it is what the signature verifies under.
    ///
    /// On error `pre_session` is left as it was.
    pub fn tweak_add(
        &self,
        pre_session: &mut PreSession,
        internal_pubkey: &Point<EvenY>,
        tweak: Scalar<impl Secrecy, impl ZeroChoice>,
    ) -> Result<Point, Error> {
        if pre_session.is_tweaked() {
            return Err(Error::AlreadyTweaked);
        }
        let P = *internal_pubkey;
        let output_pubkey = g!(P + tweak * G)
            .normalize()
            .non_zero()
            .ok_or(Error::IdentityPoint)?;

        pre_session.tweak = Some(KeyTweak {
            tweak: tweak.public().mark_zero(),
            internal_key_parity: pre_session.pk_parity,
        });
        pre_session.pk_parity = !output_pubkey.is_y_even();
        tracing::debug!(pk_parity = pre_session.pk_parity, "tweaked aggregate key");

        Ok(output_pubkey)
    }
}
