/*!
 * Identity Codec
 * Reversible case-folding between mixed-case hashes and case-insensitive addresses
 */

use crate::core::errors::CodecError;
use crate::core::types::AppletHash;

/// Marker appended after a down-folded uppercase character
pub const MARKER: char = '$';

/// The alphabet identity hashes are encoded with (base64url, no padding).
///
/// Must never contain [`MARKER`]; [`verify_marker_disjoint`] asserts this at
/// bootstrap against the alphabet actually in use.
pub const IDENTITY_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Prefix of the installed-app id assigned to applet cells
pub const APP_ID_PREFIX: &str = "applet#";

/// Encode a mixed-case identifier into a case-insensitive address-safe label.
///
/// Every ASCII uppercase character becomes its lowercase form immediately
/// followed by the marker; all other characters pass through untouched.
#[must_use]
pub fn to_address_safe(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        if c.is_ascii_uppercase() {
            out.push(c.to_ascii_lowercase());
            out.push(MARKER);
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode an address-safe label back into the mixed-case identifier.
///
/// Scans for marker-suffixed lowercase characters and restores uppercase;
/// everything else passes through untouched. Inverse of [`to_address_safe`]
/// for every label that is a valid encoding.
#[must_use]
pub fn from_address_safe(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut chars = label.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_lowercase() && chars.peek() == Some(&MARKER) {
            chars.next();
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Assert that the identity alphabet does not contain the marker character.
///
/// The codec is only a bijection under this assumption; a future change to the
/// hash encoding could silently violate it, so it is checked at bootstrap
/// instead of assumed.
pub fn verify_marker_disjoint() -> Result<(), CodecError> {
    if IDENTITY_ALPHABET.contains(MARKER) {
        return Err(CodecError::MarkerInAlphabet(MARKER));
    }
    Ok(())
}

/// Installed-app id for an applet hash: `applet#<address-safe hash>`.
#[must_use]
pub fn app_id_from_applet_hash(applet_hash: &AppletHash) -> String {
    format!("{APP_ID_PREFIX}{}", to_address_safe(&applet_hash.to_b64()))
}

/// Recover the applet hash from an `applet#`-prefixed installed-app id.
pub fn applet_hash_from_app_id(app_id: &str) -> Result<AppletHash, CodecError> {
    let label = app_id
        .strip_prefix(APP_ID_PREFIX)
        .ok_or_else(|| CodecError::InvalidHash(app_id.to_string()))?;
    AppletHash::from_b64(&from_address_safe(label))
}
