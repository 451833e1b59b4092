//! Best-effort subject extraction from `JWT`-scheme authorization headers.
//!
//! Used only to make access-log lines readable. The token signature is
//! **not** verified, so the result must never be used for authentication.
//! Every failure degrades to "no subject".

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;
use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

static AUTHORIZATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^JWT [^.]+\.([^.]+)\.[^.]+$").expect("authorization pattern compiles")
});

/// Standard alphabet, padding required, non-zero trailing bits tolerated.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Subject of the token in `header`, or `default` when there is none.
pub fn extract_subject<'a>(header: Option<&str>, default: &'a str) -> Cow<'a, str> {
    match header.map(parse_subject) {
        Some(subject) if !subject.is_empty() => Cow::Owned(subject),
        _ => Cow::Borrowed(default),
    }
}

/// Raw `sub` claim of a `JWT <header>.<payload>.<signature>` value.
///
/// Returns an empty string when the header does not match, the payload
/// cannot be decoded, or the payload has no string `sub`.
pub fn parse_subject(header: &str) -> String {
    let Some(captures) = AUTHORIZATION_RE.captures(header) else {
        return String::new();
    };
    let Some(payload) = captures.get(1) else {
        return String::new();
    };

    let Some(padded) = add_base64_padding(payload.as_str()) else {
        return String::new();
    };

    // Line breaks are skipped by the decoder
    let standard: String = padded
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let Ok(decoded) = PAYLOAD_ENGINE.decode(standard.as_bytes()) else {
        return String::new();
    };

    // Invalid UTF-8 inside strings becomes U+FFFD instead of failing the parse
    let text = String::from_utf8_lossy(&decoded);
    match serde_json::from_str::<SubjectClaim>(&text) {
        Ok(SubjectClaim(subject)) => subject.unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// The `sub` claim of a token payload.
///
/// Keys match `sub` ignoring ASCII case and the last match in document order
/// wins. A `null` value leaves an earlier match in place; any other
/// non-string value rejects the whole payload.
struct SubjectClaim(Option<String>);

impl<'de> Deserialize<'de> for SubjectClaim {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ClaimsVisitor;

        impl<'de> Visitor<'de> for ClaimsVisitor {
            type Value = SubjectClaim;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object of token claims")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SubjectClaim, A::Error> {
                let mut subject = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key.eq_ignore_ascii_case("sub") {
                        if let Some(value) = map.next_value::<Option<String>>()? {
                            subject = Some(value);
                        }
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(SubjectClaim(subject))
            }
        }

        deserializer.deserialize_map(ClaimsVisitor)
    }
}

/// Pad `segment` with `=` to a multiple of four.
///
/// A length of `4n + 1` cannot be valid base64 and yields `None`.
pub fn add_base64_padding(segment: &str) -> Option<String> {
    match segment.len() % 4 {
        0 => Some(segment.to_string()),
        2 => Some(format!("{segment}==")),
        3 => Some(format!("{segment}=")),
        _ => None,
    }
}
