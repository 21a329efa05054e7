use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

// Stored format: sha256$<iterations>$<salt-hex>$<digest-hex>

pub const MIN_PASSWORD_LEN: usize = 8;

const SCHEME: &str = "sha256";

fn derive(plain: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut digest = Sha256::new().chain_update(salt).chain_update(plain.as_bytes()).finalize();
    for _ in 1..iterations.max(1) {
        digest = Sha256::new().chain_update(digest).chain_update(salt).finalize();
    }
    digest.to_vec()
}

/// Hash a password with a fresh random salt.
pub fn hash_password(plain: &str, iterations: u32) -> String {
    let salt = *Uuid::new_v4().as_bytes();
    let digest = derive(plain, &salt, iterations);
    format!("{SCHEME}${}${}${}", iterations.max(1), hex::encode(salt), hex::encode(digest))
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let (Ok(iterations), Ok(salt), Ok(expected)) =
        (iterations.parse::<u32>(), hex::decode(salt), hex::decode(expected))
    else {
        return false;
    };

    let actual = derive(plain, &salt, iterations);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}
