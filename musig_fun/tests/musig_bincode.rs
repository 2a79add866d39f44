#![cfg(feature = "bincode")]
mod common;
use common::*;
use musig_fun::{
    MuSig, NonceCommitment, PartialSignature, SignerRegistry,
    fun::bincode::{config, decode_from_slice, encode_to_vec},
};
use secp256kfun::proptest::test_runner::{RngAlgorithm, TestRng};
use sha2::Sha256;

#[test]
fn bincode_protocol_messages() {
    let musig = MuSig::<Sha256>::default();
    let mut rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    let (secrets, keys) = keygen(2, &mut rng);
    let (combined_pk, pre_session) = musig.combine_keys(&keys).unwrap();
    let mut parties = start_parties(
        &musig,
        &secrets,
        &combined_pk,
        &pre_session,
        Some([0; 32]),
        &mut rng,
    );

    let commitment = parties[0].session.nonce_commitment().unwrap();
    let bytes = encode_to_vec(commitment, config::standard()).unwrap();
    let (decoded, _) = decode_from_slice::<NonceCommitment, _>(&bytes, config::standard()).unwrap();
    assert_eq!(decoded, commitment);

    exchange_nonces(&musig, &mut parties, None);
    let bytes = encode_to_vec(&parties[0].signers, config::standard()).unwrap();
    let (decoded, _) = decode_from_slice::<SignerRegistry, _>(&bytes, config::standard()).unwrap();
    assert_eq!(decoded, parties[0].signers);

    combine_nonces(&musig, &mut parties, None);
    let partial_sig = musig.partial_sign(&parties[0].session).unwrap();
    let bytes = encode_to_vec(partial_sig, config::standard()).unwrap();
    let (decoded, _) = decode_from_slice::<PartialSignature, _>(&bytes, config::standard()).unwrap();
    assert_eq!(decoded, partial_sig);
}
