//! Signed-request envelope.
//!
//! An authenticated caller attaches three headers to every request: its
//! Ed25519 public key, the unix time of signing and a signature over
//! [`signing_payload`]. A request without any of them is served as the
//! anonymous identity.

pub const PUBLIC_KEY_HEADER: &str = "x-tally-public-key";
pub const TIMESTAMP_HEADER: &str = "x-tally-timestamp";
pub const SIGNATURE_HEADER: &str = "x-tally-signature";

const DOMAIN_SEPARATOR: &[u8] = b"tally-request-v1";

/// Bytes an authenticated caller signs for one request.
///
/// Layout: domain separator, method, path, timestamp and the hex BLAKE3
/// digest of the body, each terminated by a newline.
pub fn signing_payload(method: &str, path: &str, timestamp: i64, body: &[u8]) -> Vec<u8> {
    let body_digest = blake3::hash(body).to_hex();
    let mut payload = Vec::with_capacity(DOMAIN_SEPARATOR.len() + path.len() + 96);
    payload.extend_from_slice(DOMAIN_SEPARATOR);
    payload.push(b'\n');
    payload.extend_from_slice(method.as_bytes());
    payload.push(b'\n');
    payload.extend_from_slice(path.as_bytes());
    payload.push(b'\n');
    payload.extend_from_slice(timestamp.to_string().as_bytes());
    payload.push(b'\n');
    payload.extend_from_slice(body_digest.as_bytes());
    payload.push(b'\n');
    payload
}
