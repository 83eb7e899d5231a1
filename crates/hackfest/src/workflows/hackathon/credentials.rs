use chrono::Utc;
use rand::RngCore;

use super::domain::{CredentialPurpose, EventId, UserId};

/// Bits of random nonce folded into every token, on top of the timestamp.
const NONCE_BYTES: usize = 16;

/// Mint an opaque single-use token bound to (event, subject, purpose).
///
/// The token carries the binding plus a millisecond timestamp and a 128-bit
/// random nonce, so collisions are negligible even for simultaneous issuance
/// across service instances. Uniqueness is still enforced at insert time by
/// the store.
pub fn mint_token(event_id: &EventId, subject_id: &UserId, purpose: &CredentialPurpose) -> String {
    let mut nonce = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut nonce);

    let nonce_hex: String = nonce.iter().map(|byte| format!("{byte:02x}")).collect();

    format!(
        "{}-{}-{}-{:x}{}",
        event_id.0,
        subject_id.0,
        purpose.as_token_tag(),
        Utc::now().timestamp_millis(),
        nonce_hex
    )
}
