use core::{
    fmt,
    ops::{Deref, DerefMut},
    sync::atomic::{Ordering, compiler_fence},
};
use secp256kfun::{Scalar, marker::*};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret scalar that is wiped when it goes out of scope.
///
/// Wiping is best-effort: `Scalar` is `Copy` so arithmetic on the inner value leaves copies on
/// the stack that this can't reach.
#[derive(PartialEq)]
pub(crate) struct SecretScalar(Scalar<Secret, Zero>);

impl SecretScalar {
    pub fn new(scalar: Scalar<Secret, impl ZeroChoice>) -> Self {
        Self(scalar.mark_zero())
    }
}

impl Deref for SecretScalar {
    type Target = Scalar<Secret, Zero>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SecretScalar {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Zeroize for SecretScalar {
    fn zeroize(&mut self) {
        self.0 = Scalar::zero();
        compiler_fence(Ordering::SeqCst);
    }
}

impl Drop for SecretScalar {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SecretScalar {}

impl fmt::Debug for SecretScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretScalar(..)")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zeroize_clears_scalar() {
        let mut secret = SecretScalar::new(Scalar::random(&mut rand::thread_rng()));
        assert!(!secret.is_zero());
        secret.zeroize();
        assert!(secret.is_zero());
    }

    #[test]
    fn debug_is_redacted() {
        let secret = SecretScalar::new(Scalar::<Secret, Zero>::from_bytes_mod_order([7u8; 32]));
        let debug = format!("{secret:?}");
        assert_eq!(debug, "SecretScalar(..)");
    }
}
