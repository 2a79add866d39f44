#![allow(dead_code)]
use musig_fun::{
    MuSig, NonceCommitment, PartialSignature, PreSession, Session, SessionId, SignerRegistry,
    fun::{G, Point, Scalar, g, marker::*},
};
use rand::RngCore;
use sha2::Sha256;

pub struct Party {
    pub secret: Scalar,
    pub session: Session,
    pub signers: SignerRegistry,
}

pub fn xonly(secret: &Scalar) -> Point<EvenY> {
    g!(secret * G).normalize().into_point_with_even_y().0
}

pub fn keygen(n: usize, rng: &mut impl RngCore) -> (Vec<Scalar>, Vec<Point<EvenY>>) {
    let secrets = (0..n).map(|_| Scalar::random(&mut *rng)).collect::<Vec<_>>();
    let keys = secrets.iter().map(xonly).collect();
    (secrets, keys)
}

pub fn start_parties(
    musig: &MuSig<Sha256>,
    secrets: &[Scalar],
    combined_pk: &Point<EvenY>,
    pre_session: &PreSession,
    message: Option<[u8; 32]>,
    rng: &mut impl RngCore,
) -> Vec<Party> {
    secrets
        .iter()
        .enumerate()
        .map(|(index, secret)| {
            let (session, signers) = musig
                .start_session(
                    &SessionId::random(&mut *rng),
                    message,
                    combined_pk,
                    pre_session,
                    secrets.len(),
                    index as u32,
                    secret,
                )
                .unwrap();
            Party {
                secret: *secret,
                session,
                signers,
            }
        })
        .collect()
}

pub fn commitments(parties: &[Party]) -> Vec<NonceCommitment> {
    parties
        .iter()
        .map(|party| party.session.nonce_commitment().unwrap())
        .collect()
}

/// Every party records the commitments, reveals their nonce and checks everyone else's.
pub fn exchange_nonces(musig: &MuSig<Sha256>, parties: &mut [Party], message: Option<[u8; 32]>) {
    let commitments = commitments(parties);
    let nonces = parties
        .iter_mut()
        .map(|party| {
            musig
                .get_public_nonce(&mut party.session, &mut party.signers, &commitments, message)
                .unwrap()
        })
        .collect::<Vec<_>>();
    for party in parties.iter_mut() {
        for (index, nonce) in nonces.iter().enumerate() {
            musig
                .set_nonce(party.signers.get_mut(index as u32).unwrap(), *nonce)
                .unwrap();
        }
    }
}

pub fn combine_nonces(
    musig: &MuSig<Sha256>,
    parties: &mut [Party],
    adaptor: Option<Point>,
) -> bool {
    let parities = parties
        .iter_mut()
        .map(|party| {
            musig
                .combine_nonces(&mut party.session, &party.signers, adaptor)
                .unwrap()
        })
        .collect::<Vec<_>>();
    assert!(parities.iter().all(|parity| *parity == parities[0]));
    let combined_nonce = parties[0].session.combined_nonce().unwrap();
    assert!(
        parties
            .iter()
            .all(|party| party.session.combined_nonce() == Some(combined_nonce))
    );
    parities[0]
}

pub fn sign(musig: &MuSig<Sha256>, parties: &[Party]) -> Vec<PartialSignature> {
    parties
        .iter()
        .map(|party| musig.partial_sign(&party.session).unwrap())
        .collect()
}
