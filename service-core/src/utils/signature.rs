use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

/// Query parameter carrying the hex SHA-256 of a non-form webhook body.
pub const BODY_SHA256_PARAM: &str = "bodySHA256";

/// Generate a provider webhook signature.
///
/// Format: base64(HMAC-SHA1(url || k1 || v1 || k2 || v2 ..., auth_token)) with the
/// form parameters sorted by name, then by value.
pub fn generate_signature(
    auth_token: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();

    mac.update(url.as_bytes());
    for (key, value) in sorted {
        mac.update(key.as_bytes());
        mac.update(value.as_bytes());
    }

    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a provider webhook signature using constant-time comparison
pub fn verify_signature(
    auth_token: &str,
    url: &str,
    params: &[(String, String)],
    signature: &str,
) -> Result<bool, anyhow::Error> {
    let expected_signature = generate_signature(auth_token, url, params)?;

    let expected_bytes = expected_signature.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}

/// Hex SHA-256 of a raw request body, as carried in `bodySHA256`.
pub fn body_sha256(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Check `body` against the `bodySHA256` parameter of `query`, if present.
///
/// Returns `true` when the query does not carry the parameter. A query that
/// cannot be decoded, repeats the parameter, or carries anything other than a
/// 64-digit hex digest fails the check.
pub fn verify_body_hash(query: Option<&str>, body: &[u8]) -> bool {
    let Some(query) = query else {
        return true;
    };

    let params: Vec<(String, String)> = match serde_urlencoded::from_str(query) {
        Ok(params) => params,
        Err(e) => {
            tracing::warn!(error = %e, "Undecodable webhook query string");
            return false;
        }
    };

    let mut hashes = params.iter().filter(|(k, _)| k == BODY_SHA256_PARAM);
    let expected = match (hashes.next(), hashes.next()) {
        (None, _) => return true,
        (Some((_, expected)), None) => expected,
        (Some(_), Some(_)) => return false,
    };

    if expected.len() != 64 || !expected.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }

    let actual = body_sha256(body);
    actual.as_bytes().ct_eq(expected.to_ascii_lowercase().as_bytes()).into()
}
