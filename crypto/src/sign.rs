//! Ed25519 signing and verification.

use denaro_types::{PrivateKey, PublicKey, Signature};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// `false` for a bad signature or a public key that is not a curve point.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn sign_and_verify() {
        let kp = generate_keypair();
        let sig = sign_message(b"spend", &kp.private);
        assert!(verify_signature(b"spend", &sig, &kp.public));
        assert!(!verify_signature(b"spend twice", &sig, &kp.public));
    }

    #[test]
    fn other_key_fails() {
        let a = keypair_from_seed(&[1u8; 32]);
        let b = keypair_from_seed(&[2u8; 32]);
        let sig = sign_message(b"m", &a.private);
        assert!(!verify_signature(b"m", &sig, &b.public));
    }

    #[test]
    fn deterministic_signatures() {
        let kp = keypair_from_seed(&[9u8; 32]);
        assert_eq!(sign_message(b"m", &kp.private), sign_message(b"m", &kp.private));
    }

    #[test]
    fn garbage_key_is_rejected_not_panicking() {
        let kp = generate_keypair();
        let sig = sign_message(b"m", &kp.private);
        assert!(!verify_signature(b"m", &sig, &PublicKey([0xFF; 32])));
    }
}
