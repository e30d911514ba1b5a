//! Short code allocation
//!
//! Codes are reserved with a single atomic insert; the database unique
//! constraint on `short_code` is the source of truth for uniqueness, never
//! an application-level existence check.

use rand::Rng;

use crate::error::ServiceError;
use crate::models::ShortLink;
use crate::storage::{Storage, StorageError};

pub const CODE_LENGTH: usize = 6;
pub const MAX_ATTEMPTS: usize = 10;
pub const MAX_SLUG_LENGTH: usize = 50;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Slugs that collide with application routes and can never be claimed.
const RESERVED_SLUGS: &[&str] = &[
    "api", "admin", "login", "signup", "register", "dashboard", "auth", "static", "assets",
    "health", "status", "settings", "profile", "account", "help", "support", "terms", "privacy",
    "about", "contact", "home", "index", "favicon", "robots",
];

/// Generate a random 6-character code over `[A-Za-z0-9]` (62^6 keyspace).
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn is_reserved_slug(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug.to_lowercase().as_str())
}

/// Custom slugs are limited to `[A-Za-z0-9_-]`, at most 50 characters.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LENGTH
        && slug
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Prepend `https://` when the URL carries no scheme.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Render the public short URL. A bare domain gets `https://`; a configured
/// scheme (useful for local setups) is kept as-is.
pub fn build_short_url(domain: &str, short_code: &str) -> String {
    let base = normalize_url(domain.trim_end_matches('/'));
    format!("{base}/{short_code}")
}

/// Allocate a short code and persist the link.
///
/// A custom slug is tried exactly once: a human chose it, so a collision is
/// surfaced as [`ServiceError::SlugTaken`] rather than silently substituted.
/// Random codes are regenerated on conflict, up to [`MAX_ATTEMPTS`] total
/// attempts; exhausting them is treated as an operational anomaly.
pub async fn allocate(
    storage: &dyn Storage,
    original_url: &str,
    custom_slug: Option<&str>,
    owner_id: Option<&str>,
) -> Result<ShortLink, ServiceError> {
    if let Some(slug) = custom_slug {
        if is_reserved_slug(slug) {
            return Err(ServiceError::ReservedSlug);
        }

        return match storage
            .insert_link(slug, original_url, Some(slug), owner_id)
            .await
        {
            Ok(link) => Ok(link),
            Err(StorageError::Conflict) => Err(ServiceError::SlugTaken),
            Err(StorageError::Other(err)) => Err(err.into()),
        };
    }

    for _ in 0..MAX_ATTEMPTS {
        let code = generate_code();
        match storage.insert_link(&code, original_url, None, owner_id).await {
            Ok(link) => return Ok(link),
            Err(StorageError::Conflict) => continue,
            Err(StorageError::Other(err)) => return Err(err.into()),
        }
    }

    Err(ServiceError::AllocationExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_match_alphabet() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| b.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn reserved_slugs_are_case_insensitive() {
        assert!(is_reserved_slug("api"));
        assert!(is_reserved_slug("Admin"));
        assert!(is_reserved_slug("DASHBOARD"));
        assert!(!is_reserved_slug("my-links"));
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("my-link_1"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("has space"));
        assert!(!is_valid_slug("emoji🔥"));
        assert!(!is_valid_slug(&"a".repeat(MAX_SLUG_LENGTH + 1)));
    }

    #[test]
    fn normalize_adds_protocol_only_when_missing() {
        assert_eq!(normalize_url("example.com/page"), "https://example.com/page");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }

    #[test]
    fn short_url_rendering() {
        assert_eq!(
            build_short_url("snap.test", "Ab3xY9"),
            "https://snap.test/Ab3xY9"
        );
        assert_eq!(
            build_short_url("http://localhost:8080/", "Ab3xY9"),
            "http://localhost:8080/Ab3xY9"
        );
    }
}
