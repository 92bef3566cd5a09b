//! Session secret generation

use uuid::Uuid;

/// Length of a generated session secret
pub const SECRET_LEN: usize = 32;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// Largest multiple of 62 that fits in a byte; anything above is rejected to keep
// the distribution uniform.
const REJECT_FROM: u8 = 248;

/// Generate a random alphanumeric secret.
///
/// Randomness comes from v4 UUIDs, which draw on the operating system's CSPRNG.
/// Bytes 6 and 8 carry the fixed version/variant bits and are skipped.
pub fn generate_session_secret() -> String {
    let mut secret = String::with_capacity(SECRET_LEN);

    while secret.len() < SECRET_LEN {
        let bytes = Uuid::new_v4().into_bytes();
        for (i, byte) in bytes.iter().enumerate() {
            if i == 6 || i == 8 || *byte >= REJECT_FROM {
                continue;
            }
            secret.push(ALPHABET[(*byte % 62) as usize] as char);
            if secret.len() == SECRET_LEN {
                break;
            }
        }
    }

    secret
}
