pub use ed25519_dalek::{SigningKey, VerifyingKey};
use anyhow::{anyhow, bail, Result};
use ed25519_dalek::{Signature, Signer, Verifier};
use rand::rngs::OsRng;

pub fn generate_keypair() -> SigningKey {
    let mut csprng = OsRng;
    SigningKey::generate(&mut csprng)
}

pub fn keypair_from_hex(secret_hex: &str) -> Result<SigningKey> {
    let secret = hex::decode(secret_hex.trim_start_matches("0x"))?;
    let bytes: [u8; 32] = secret
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("Secret key must be 32 bytes"))?;
    Ok(SigningKey::from_bytes(&bytes))
}

pub fn address_of(key: &SigningKey) -> [u8; 32] {
    key.verifying_key().to_bytes()
}

pub fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    let sig: Signature = key.sign(message);
    sig.to_bytes().to_vec()
}

pub fn verify_signature(pubkey_bytes: &[u8; 32], message: &[u8], signature_bytes: &[u8]) -> Result<()> {
    let pubkey = VerifyingKey::from_bytes(pubkey_bytes).map_err(|_| anyhow!("Invalid public key"))?;

    let Ok(raw) = <[u8; 64]>::try_from(signature_bytes) else {
        bail!("Invalid signature length");
    };
    let signature = Signature::from_bytes(&raw);

    pubkey
        .verify(message, &signature)
        .map_err(|_| anyhow!("Signature verification failed"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify() {
        let kp = generate_keypair();
        let sig = sign(&kp, b"lef");
        assert!(verify_signature(&address_of(&kp), b"lef", &sig).is_ok());
        assert!(verify_signature(&address_of(&kp), b"other", &sig).is_err());
        assert!(verify_signature(&address_of(&kp), b"lef", &sig[..63]).is_err());
    }

    #[test]
    fn hex_secret_round_trips() {
        let kp = generate_keypair();
        let restored = keypair_from_hex(&hex::encode(kp.to_bytes())).unwrap();
        assert_eq!(address_of(&kp), address_of(&restored));
        assert!(keypair_from_hex("abcd").is_err());
    }
}
