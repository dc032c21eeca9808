use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Lowercase hex SHA-256 of `data`
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Version token of an icon: the content hash of its bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconHash(String);

impl IconHash {
    /// Hash raw icon bytes
    pub fn of(data: &[u8]) -> Self {
        Self(content_hash(data))
    }

    /// Wrap a hash read back from storage
    pub fn from_stored(value: &str) -> Self {
        Self(value.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Strong entity tag, i.e. the hash in double quotes
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Whether an `If-None-Match` style token designates this version
    ///
    /// Accepts quoted or bare hashes, weak tags (`W/"..."`) and comma
    /// separated lists. A `*` wildcard names no particular version and never
    /// matches.
    pub fn matches(&self, token: &str) -> bool {
        token.split(',').map(str::trim).any(|candidate| {
            let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
            let candidate = candidate
                .strip_prefix('"')
                .and_then(|c| c.strip_suffix('"'))
                .unwrap_or(candidate);
            !candidate.is_empty() && candidate == self.0
        })
    }
}

impl fmt::Display for IconHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IconHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_content_hash_is_lowercase_hex_sha256() {
        assert_eq!(content_hash(b"hello"), HELLO_SHA256);
        assert_eq!(IconHash::of(b"hello").as_str(), HELLO_SHA256);
        assert_eq!(IconHash::of(b"hello"), IconHash::of(b"hello"));
        assert_ne!(IconHash::of(b"hello"), IconHash::of(b"hello!"));
    }

    #[test]
    fn test_from_stored_normalizes() {
        let stored = format!("  {}\n", HELLO_SHA256.to_uppercase());
        assert_eq!(IconHash::from_stored(&stored), IconHash::of(b"hello"));
    }

    #[test]
    fn test_etag_is_quoted() {
        assert_eq!(IconHash::of(b"hello").etag(), format!("\"{HELLO_SHA256}\""));
    }

    #[rstest]
    #[case::quoted(format!("\"{HELLO_SHA256}\""), true)]
    #[case::bare(HELLO_SHA256.to_string(), true)]
    #[case::weak(format!("W/\"{HELLO_SHA256}\""), true)]
    #[case::list(format!("\"other\", \"{HELLO_SHA256}\""), true)]
    #[case::wildcard("*".to_string(), false)]
    #[case::wildcard_in_list(format!("*, \"{HELLO_SHA256}\""), true)]
    #[case::other("\"deadbeef\"".to_string(), false)]
    #[case::empty_quotes("\"\"".to_string(), false)]
    #[case::empty(String::new(), false)]
    fn test_matches(#[case] token: String, #[case] expected: bool) {
        assert_eq!(IconHash::of(b"hello").matches(&token), expected);
    }
}
