use crate::{
    Error, MuSig, NonceCommitment, PreSession, SignerRegistry, Vec, parity, secret::SecretScalar,
};
use secp256kfun::{
    G, Point, Scalar,
    digest::{Digest, generic_array::typenum::U32},
    g,
    hash::Hash32,
    marker::*,
    rand_core::RngCore,
    s,
};
use zeroize::Zeroize;

/// A 32-byte value that must be unique for every session started with the same secret key.
///
/// The secret nonce is derived from it. Starting two sessions with the same id, key and message
/// and signing in both leaks the secret key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionId([u8; 32]);

impl SessionId {
    /// Use 32 bytes you have generated yourself as the session id.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh session id.
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// The session id as bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Round {
    /// Nonces are committed to but nothing has been revealed.
    Init { message: Option<[u8; 32]> },
    /// Commitments are known and nonces are being revealed. `commitments_hash` is only there
    /// for signing sessions.
    NoncesExchanged {
        message: [u8; 32],
        commitments_hash: Option<[u8; 32]>,
    },
    /// The final nonce is known and partial signatures can be created.
    NoncesCombined {
        message: [u8; 32],
        combined_nonce: Point<EvenY>,
        nonce_parity: bool,
    },
}

impl Round {
    fn number(&self) -> u8 {
        match self {
            Round::Init { .. } => 0,
            Round::NoncesExchanged { .. } => 1,
            Round::NoncesCombined { .. } => 2,
        }
    }

    fn message(&self) -> Option<[u8; 32]> {
        match self {
            Round::Init { message } => *message,
            Round::NoncesExchanged { message, .. } | Round::NoncesCombined { message, .. } => {
                Some(*message)
            }
        }
    }
}

/// The secret state of a signer.
#[derive(Debug)]
pub(crate) struct SignerSecret {
    pub(crate) index: u32,
    /// `mu * x` with `x` negated as needed to match the aggregate key.
    pub(crate) seckey: SecretScalar,
    pub(crate) secnonce: SecretScalar,
    pub(crate) nonce_was_odd: bool,
    nonce: Point<EvenY>,
    nonce_commitment: NonceCommitment,
}

/// A MuSig signing or verifying session.
///
/// Created with [`MuSig::start_session`] for a signer and [`MuSig::start_verifier_session`] for
/// someone who only wants to check partial signatures. It moves through three rounds:
///
/// 0. nonce commitments are exchanged
/// 1. nonces are revealed (see [`MuSig::set_nonce`])
/// 2. the nonces have been combined and partial signatures can be made and checked
///
/// It deliberately doesn't implement `Clone` since signing twice from copies of the same session
/// with different final nonces would leak the secret key.
#[derive(Debug)]
pub struct Session {
    pub(crate) combined_pk: Point<EvenY>,
    pub(crate) pre_session: PreSession,
    pub(crate) n_signers: u32,
    pub(crate) secret: Option<SignerSecret>,
    pub(crate) round: Round,
}

impl Session {
    /// The aggregate (possibly tweaked) key being signed under.
    pub fn combined_pk(&self) -> Point<EvenY> {
        self.combined_pk
    }

    /// The key aggregation data the session was started with.
    pub fn pre_session(&self) -> &PreSession {
        &self.pre_session
    }

    /// The number of signers.
    pub fn n_signers(&self) -> u32 {
        self.n_signers
    }

    /// Whether this is a signing session rather than a verifier session.
    pub fn has_secret_data(&self) -> bool {
        self.secret.is_some()
    }

    /// Our index if this is a signing session.
    pub fn signer_index(&self) -> Option<u32> {
        self.secret.as_ref().map(|secret| secret.index)
    }

    /// Which round the session is in (0, 1 or 2).
    pub fn round(&self) -> u8 {
        self.round.number()
    }

    /// The message once it has been given.
    pub fn message(&self) -> Option<[u8; 32]> {
        self.round.message()
    }

    /// The commitment to our nonce that must be sent to the other signers. `None` for verifier
    /// sessions.
    pub fn nonce_commitment(&self) -> Option<NonceCommitment> {
        self.secret.as_ref().map(|secret| secret.nonce_commitment)
    }

    /// The final nonce after [`MuSig::combine_nonces`].
    pub fn combined_nonce(&self) -> Option<Point<EvenY>> {
        match self.round {
            Round::NoncesCombined { combined_nonce, .. } => Some(combined_nonce),
            _ => None,
        }
    }

    /// Whether the sum of the nonces (and adaptor point) had to be negated to get the final
    /// nonce. Needed to adapt partial signatures and extract adaptor secrets.
    pub fn nonce_parity(&self) -> Option<bool> {
        match self.round {
            Round::NoncesCombined { nonce_parity, .. } => Some(nonce_parity),
            _ => None,
        }
    }

    /// The message, final nonce and its parity. Fails unless the nonces have been combined.
    pub(crate) fn combined(&self) -> Result<([u8; 32], Point<EvenY>, bool), Error> {
        match self.round {
            Round::NoncesCombined {
                message,
                combined_nonce,
                nonce_parity,
            } => Ok((message, combined_nonce, nonce_parity)),
            ref other => Err(Error::WrongRound {
                expected: 2,
                actual: other.number(),
            }),
        }
    }
}

fn signer_count(n_signers: usize) -> Result<u32, Error> {
    match u32::try_from(n_signers) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::SignerCountOutOfBounds { n_signers }),
    }
}

impl<H: Hash32 + Digest<OutputSize = U32>> MuSig<H> {
    /// Starts a signing session.
    ///
    /// The message can be given here or later in [`get_public_nonce`] but not both. `my_index`
    /// is the position of our key in the list passed to [`combine_keys`].
    ///
    /// The secret nonce is derived by hashing `session_id`, the message (if given), the aggregate
    /// key and `seckey`. This fails with [`Error::InvalidSecretNonce`] in the (practically
    /// impossible) case that the hash is not a valid scalar.
    ///
    /// Returns the session together with the registry where the other signers' nonces will be
    /// recorded.
    ///
    /// [`get_public_nonce`]: Self::get_public_nonce
    /// [`combine_keys`]: Self::combine_keys
    #[allow(clippy::too_many_arguments)]
    pub fn start_session(
        &self,
        session_id: &SessionId,
        message: Option<[u8; 32]>,
        combined_pk: &Point<EvenY>,
        pre_session: &PreSession,
        n_signers: usize,
        my_index: u32,
        seckey: &Scalar,
    ) -> Result<(Session, SignerRegistry), Error> {
        let n_signers = signer_count(n_signers)?;
        if my_index >= n_signers {
            return Err(Error::IndexOutOfRange {
                index: my_index,
                n_signers,
            });
        }

        let mu = self.key_coefficient(pre_session, my_index);
        let (_, pubkey_was_odd) = g!(seckey * G).normalize().into_point_with_even_y();
        let mut x = SecretScalar::new(*seckey);
        x.conditional_negate(parity::seckey_needs_negation(pubkey_was_odd, pre_session));
        let x = &*x;
        let effective_seckey = SecretScalar::new(s!(mu * x));

        let combined_pk_bytes = combined_pk.to_xonly_bytes();
        let mut seckey_bytes = seckey.to_bytes();
        let mut chunks: Vec<&[u8]> = vec![&session_id.0[..]];
        if let Some(message) = &message {
            chunks.push(&message[..]);
        }
        chunks.push(&combined_pk_bytes[..]);
        chunks.push(&seckey_bytes[..]);
        let mut secnonce_bytes = self.hash(chunks);
        let k = Scalar::<Secret, NonZero>::from_bytes(secnonce_bytes);
        secnonce_bytes.zeroize();
        seckey_bytes.zeroize();
        let k = k.ok_or(Error::InvalidSecretNonce)?;

        let (nonce, nonce_was_odd) = g!(k * G).normalize().into_point_with_even_y();
        let secnonce = SecretScalar::new(k);
        let nonce_commitment = self.nonce_commitment(&nonce.to_xonly_bytes());

        tracing::debug!(round = 0, n_signers, index = my_index, "started signing session");

        Ok((
            Session {
                combined_pk: *combined_pk,
                pre_session: pre_session.clone(),
                n_signers,
                secret: Some(SignerSecret {
                    index: my_index,
                    seckey: effective_seckey,
                    secnonce,
                    nonce_was_odd,
                    nonce,
                    nonce_commitment,
                }),
                round: Round::Init { message },
            },
            SignerRegistry::new(n_signers),
        ))
    }

    /// Starts a session that can check partial signatures but not create them.
    ///
    /// There is one signer per commitment. The session starts in round 1 so the next step is to
    /// [`set_nonce`] for each signer.
    ///
    /// [`set_nonce`]: Self::set_nonce
    pub fn start_verifier_session(
        &self,
        message: [u8; 32],
        combined_pk: &Point<EvenY>,
        pre_session: &PreSession,
        commitments: &[NonceCommitment],
    ) -> Result<(Session, SignerRegistry), Error> {
        let n_signers = signer_count(commitments.len())?;
        let mut signers = SignerRegistry::new(n_signers);
        signers.record_commitments(commitments);

        tracing::debug!(round = 1, n_signers, "started verifier session");

        Ok((
            Session {
                combined_pk: *combined_pk,
                pre_session: pre_session.clone(),
                n_signers,
                secret: None,
                round: Round::NoncesExchanged {
                    message,
                    commitments_hash: None,
                },
            },
            signers,
        ))
    }

    /// Records every signer's nonce commitment and returns our nonce so it can be revealed.
    ///
    /// Only call this once you have received commitments from all the other signers.
    /// `commitments` is indexed by signer and includes our own. The commitments are hashed at
    /// this point and [`combine_nonces`] will fail if they change afterwards.
    ///
    /// [`combine_nonces`]: Self::combine_nonces
    pub fn get_public_nonce(
        &self,
        session: &mut Session,
        signers: &mut SignerRegistry,
        commitments: &[NonceCommitment],
        message: Option<[u8; 32]>,
    ) -> Result<[u8; 32], Error> {
        let nonce = session
            .secret
            .as_ref()
            .ok_or(Error::MissingSecret)?
            .nonce;
        let init_message = match session.round {
            Round::Init { message } => message,
            ref other => {
                return Err(Error::WrongRound {
                    expected: 0,
                    actual: other.number(),
                });
            }
        };
        let message = match (init_message, message) {
            (Some(_), Some(_)) => return Err(Error::MessageAlreadySet),
            (None, None) => return Err(Error::MessageMissing),
            (Some(message), None) | (None, Some(message)) => message,
        };
        let n_signers = session.n_signers;
        if commitments.len() != n_signers as usize {
            return Err(Error::WrongSignerCount {
                expected: n_signers,
                got: commitments.len(),
            });
        }
        if signers.len() != n_signers as usize {
            return Err(Error::WrongSignerCount {
                expected: n_signers,
                got: signers.len(),
            });
        }

        signers.record_commitments(commitments);
        let commitments_hash = self.commitments_hash(signers);
        session.round = Round::NoncesExchanged {
            message,
            commitments_hash: Some(commitments_hash),
        };
        tracing::debug!(
            round = 1,
            n_signers,
            index = session.signer_index(),
            "nonce commitments recorded"
        );

        Ok(nonce.to_xonly_bytes())
    }

    /// Adds up every signer's nonce (and the `adaptor` point if there is one) to get the final
    /// nonce.
    ///
    /// Every signer must have had their nonce set. In a signing session the commitments must be
    /// the same as the ones given to [`get_public_nonce`].
    ///
    /// Returns the nonce parity: whether the sum had odd y and was negated. You need it for
    /// [`adapt`] and [`extract_secret_adaptor`].
    ///
    /// [`get_public_nonce`]: Self::get_public_nonce
    /// [`adapt`]: crate::adapt
    /// [`extract_secret_adaptor`]: crate::extract_secret_adaptor
    pub fn combine_nonces(
        &self,
        session: &mut Session,
        signers: &SignerRegistry,
        adaptor: Option<Point>,
    ) -> Result<bool, Error> {
        let (message, expected_commitments_hash) = match session.round {
            Round::NoncesExchanged {
                message,
                commitments_hash,
            } => (message, commitments_hash),
            ref other => {
                return Err(Error::WrongRound {
                    expected: 1,
                    actual: other.number(),
                });
            }
        };
        if signers.len() != session.n_signers as usize {
            return Err(Error::WrongSignerCount {
                expected: session.n_signers,
                got: signers.len(),
            });
        }
        let nonces = signers
            .iter()
            .map(|signer| {
                signer.nonce().ok_or(Error::NonceMissing {
                    index: signer.index(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(expected) = expected_commitments_hash {
            if self.commitments_hash(signers) != expected {
                tracing::warn!(
                    index = session.signer_index(),
                    "nonce commitments changed after our nonce was revealed"
                );
                return Err(Error::CommitmentsChanged);
            }
        }

        let mut R = nonces
            .iter()
            .fold(Point::zero(), |agg, nonce| g!(agg + nonce));
        if let Some(T) = adaptor {
            R = g!(R + T);
        }
        let (combined_nonce, nonce_parity) = R
            .normalize()
            .non_zero()
            .ok_or(Error::IdentityPoint)?
            .into_point_with_even_y();

        session.round = Round::NoncesCombined {
            message,
            combined_nonce,
            nonce_parity,
        };
        tracing::debug!(
            round = 2,
            n_signers = session.n_signers,
            index = session.signer_index(),
            nonce_parity,
            "nonces combined"
        );

        Ok(nonce_parity)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;
    use secp256kfun::{proptest::prelude::*, Scalar};
    use sha2::Sha256;

    fn setup(
        musig: &MuSig<Sha256>,
        message: Option<[u8; 32]>,
    ) -> (Session, SignerRegistry, Point<EvenY>) {
        let x = Scalar::random(&mut rand::thread_rng());
        let X = g!(x * G).normalize().into_point_with_even_y().0;
        let Y = Point::random(&mut rand::thread_rng())
            .into_point_with_even_y()
            .0;
        let (combined_pk, pre_session) = musig.combine_keys(&[X, Y]).unwrap();
        let (session, signers) = musig
            .start_session(
                &SessionId::random(&mut rand::thread_rng()),
                message,
                &combined_pk,
                &pre_session,
                2,
                0,
                &x,
            )
            .unwrap();
        (session, signers, combined_pk)
    }

    #[test]
    fn message_must_be_given_exactly_once() {
        let musig = MuSig::<Sha256>::default();
        let commitments = [NonceCommitment::from_bytes([1; 32]); 2];

        let (mut session, mut signers, _) = setup(&musig, Some([0; 32]));
        assert_eq!(
            musig.get_public_nonce(&mut session, &mut signers, &commitments, Some([0; 32])),
            Err(Error::MessageAlreadySet)
        );
        assert_eq!(session.round(), 0);

        let (mut session, mut signers, _) = setup(&musig, None);
        assert_eq!(
            musig.get_public_nonce(&mut session, &mut signers, &commitments, None),
            Err(Error::MessageMissing)
        );
        musig
            .get_public_nonce(&mut session, &mut signers, &commitments, Some([3; 32]))
            .unwrap();
        assert_eq!(session.message(), Some([3; 32]));
        assert_eq!(session.round(), 1);
    }

    #[test]
    fn second_get_public_nonce_fails() {
        let musig = MuSig::<Sha256>::default();
        let (mut session, mut signers, _) = setup(&musig, Some([0; 32]));
        let commitments = [NonceCommitment::from_bytes([1; 32]); 2];
        musig
            .get_public_nonce(&mut session, &mut signers, &commitments, None)
            .unwrap();
        let err = musig
            .get_public_nonce(&mut session, &mut signers, &commitments, None)
            .unwrap_err();
        assert_eq!(
            err,
            Error::WrongRound {
                expected: 0,
                actual: 1
            }
        );
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }

    #[test]
    fn commitment_count_must_match() {
        let musig = MuSig::<Sha256>::default();
        let (mut session, mut signers, _) = setup(&musig, Some([0; 32]));
        assert_eq!(
            musig.get_public_nonce(
                &mut session,
                &mut signers,
                &[NonceCommitment::default()],
                None
            ),
            Err(Error::WrongSignerCount {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn index_and_signer_count_bounds() {
        let musig = MuSig::<Sha256>::default();
        let x = Scalar::random(&mut rand::thread_rng());
        let X = g!(x * G).normalize().into_point_with_even_y().0;
        let (combined_pk, pre_session) = musig.combine_keys(&[X]).unwrap();
        let sid = SessionId::from_bytes([0; 32]);
        assert_eq!(
            musig
                .start_session(&sid, None, &combined_pk, &pre_session, 1, 1, &x)
                .unwrap_err(),
            Error::IndexOutOfRange {
                index: 1,
                n_signers: 1
            }
        );
        assert_eq!(
            musig
                .start_session(&sid, None, &combined_pk, &pre_session, 0, 0, &x)
                .unwrap_err(),
            Error::SignerCountOutOfBounds { n_signers: 0 }
        );
        assert_eq!(
            musig
                .start_verifier_session([0; 32], &combined_pk, &pre_session, &[])
                .unwrap_err()
                .kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn verifier_session_cannot_reveal_nonce() {
        let musig = MuSig::<Sha256>::default();
        let (_, _, combined_pk) = setup(&musig, None);
        let (_, pre_session) = musig
            .combine_keys(&[combined_pk])
            .unwrap();
        let (mut session, mut signers) = musig
            .start_verifier_session([0; 32], &combined_pk, &pre_session, &[NonceCommitment::default()])
            .unwrap();
        assert_eq!(session.round(), 1);
        assert!(!session.has_secret_data());
        assert_eq!(
            musig.get_public_nonce(&mut session, &mut signers, &[NonceCommitment::default()], None),
            Err(Error::MissingSecret)
        );
    }

    #[test]
    fn combine_nonces_needs_every_nonce() {
        let musig = MuSig::<Sha256>::default();
        let (mut session, mut signers, _) = setup(&musig, Some([0; 32]));
        let own_commitment = session.nonce_commitment().unwrap();
        let commitments = [own_commitment, NonceCommitment::from_bytes([1; 32])];
        let nonce = musig
            .get_public_nonce(&mut session, &mut signers, &commitments, None)
            .unwrap();
        musig
            .set_nonce(signers.get_mut(0).unwrap(), nonce)
            .unwrap();
        assert_eq!(
            musig.combine_nonces(&mut session, &signers, None),
            Err(Error::NonceMissing { index: 1 })
        );
        assert_eq!(session.round(), 1);
        assert_eq!(session.nonce_parity(), None);
    }

    proptest! {
        #[test]
        fn secnonce_depends_on_session_id(sid1 in any::<[u8; 32]>(), sid2 in any::<[u8; 32]>()) {
            prop_assume!(sid1 != sid2);
            let musig = MuSig::<Sha256>::default();
            let x = Scalar::random(&mut rand::thread_rng());
            let X = g!(x * G).normalize().into_point_with_even_y().0;
            let (combined_pk, pre_session) = musig.combine_keys(&[X]).unwrap();
            let start = |sid| {
                musig
                    .start_session(&SessionId::from_bytes(sid), None, &combined_pk, &pre_session, 1, 0, &x)
                    .unwrap()
                    .0
            };
            prop_assert_ne!(start(sid1).nonce_commitment(), start(sid2).nonce_commitment());
            prop_assert_eq!(start(sid1).nonce_commitment(), start(sid1).nonce_commitment());
        }
    }
}
