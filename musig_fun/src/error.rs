use core::fmt;

/// Broad category of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller used the API out of order or passed a malformed argument.
    ContractViolation,
    /// A scalar or point was outside of what the group allows.
    CryptographicInvalid,
    /// Another participant misbehaved.
    ProtocolViolation,
    /// The key setup was invalid.
    Configuration,
}

/// Everything that can go wrong while running the protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The session was not in the round the operation needs.
    WrongRound {
        /// The round the operation needs
        expected: u8,
        /// The round the session is in
        actual: u8,
    },
    /// The operation needs the secret data of a signing session but the session is a verifier session.
    MissingSecret,
    /// No message has been given to the session.
    MessageMissing,
    /// A message was given twice.
    MessageAlreadySet,
    /// The number of items passed in doesn't match the number of signers.
    WrongSignerCount {
        /// The number of signers in the session
        expected: u32,
        /// The number that was passed in
        got: usize,
    },
    /// The signer index is not part of the session.
    IndexOutOfRange {
        /// The offending index
        index: u32,
        /// The number of signers in the session
        n_signers: u32,
    },
    /// A signer hasn't revealed their nonce yet.
    NonceMissing {
        /// The signer's index
        index: u32,
    },
    /// A signer's nonce was already set.
    NonceAlreadySet {
        /// The signer's index
        index: u32,
    },
    /// There were no keys to aggregate.
    EmptyKeyList,
    /// A point computation resulted in the point at infinity.
    IdentityPoint,
    /// The revealed nonce was not a valid x-only point.
    InvalidNonce {
        /// The signer's index
        index: u32,
    },
    /// The derived secret nonce was not a valid non-zero scalar. Try again with a new session id.
    InvalidSecretNonce,
    /// The revealed nonce doesn't match the signer's commitment.
    NonceCommitmentMismatch {
        /// The signer's index
        index: u32,
    },
    /// The nonce commitments changed since our public nonce was revealed.
    CommitmentsChanged,
    /// A partial signature didn't verify against the signer's public key.
    InvalidPartialSignature {
        /// The signer's index
        index: u32,
    },
    /// The aggregate key was already tweaked.
    AlreadyTweaked,
    /// The number of signers must be between 1 and `u32::MAX`.
    SignerCountOutOfBounds {
        /// The number of signers requested
        n_signers: usize,
    },
}

impl Error {
    /// Which category the error belongs to.
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            WrongRound { .. }
            | MissingSecret
            | MessageMissing
            | MessageAlreadySet
            | WrongSignerCount { .. }
            | IndexOutOfRange { .. }
            | NonceMissing { .. }
            | NonceAlreadySet { .. }
            | EmptyKeyList => ErrorKind::ContractViolation,
            IdentityPoint | InvalidNonce { .. } | InvalidSecretNonce => {
                ErrorKind::CryptographicInvalid
            }
            NonceCommitmentMismatch { .. } | CommitmentsChanged | InvalidPartialSignature { .. } => {
                ErrorKind::ProtocolViolation
            }
            AlreadyTweaked | SignerCountOutOfBounds { .. } => ErrorKind::Configuration,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;
        match self {
            WrongRound { expected, actual } => write!(
                f,
                "session must be in round {expected} for this operation but it is in round {actual}"
            ),
            MissingSecret => write!(f, "a verifier session cannot produce signatures or nonces"),
            MessageMissing => write!(f, "the message has not been set"),
            MessageAlreadySet => write!(f, "the message can only be set once"),
            WrongSignerCount { expected, got } => {
                write!(f, "expected {expected} items (one per signer) but got {got}")
            }
            IndexOutOfRange { index, n_signers } => write!(
                f,
                "signer index {index} is out of range for a session with {n_signers} signers"
            ),
            NonceMissing { index } => write!(f, "signer {index} has not revealed their nonce"),
            NonceAlreadySet { index } => write!(f, "signer {index} already revealed their nonce"),
            EmptyKeyList => write!(f, "cannot aggregate an empty list of keys"),
            IdentityPoint => write!(f, "the result was the point at infinity"),
            InvalidNonce { index } => write!(f, "nonce from signer {index} is not a valid point"),
            InvalidSecretNonce => write!(
                f,
                "the derived secret nonce was out of range, start a new session with a different session id"
            ),
            NonceCommitmentMismatch { index } => {
                write!(f, "nonce from signer {index} doesn't match their commitment")
            }
            CommitmentsChanged => write!(
                f,
                "the nonce commitments changed after our nonce was revealed"
            ),
            InvalidPartialSignature { index } => {
                write!(f, "partial signature from signer {index} was invalid")
            }
            AlreadyTweaked => write!(f, "the aggregate key can only be tweaked once"),
            SignerCountOutOfBounds { n_signers } => {
                write!(f, "{n_signers} is not a valid number of signers")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
