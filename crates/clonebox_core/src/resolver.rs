//! Short identifier derivation.
//!
//! Identifiers are a truncated SHA-256 prefix rendered as lowercase hex. The
//! default of 3 bytes gives 6 hex characters and 2^24 (about 16.7 million)
//! possible identifiers. By the birthday bound the first collision between
//! unrelated links is expected after roughly `sqrt(pi / 2 * 2^24)`, about
//! 5,100 registered links, so collisions are routine and the registry insert
//! loop has to handle them. Each extra byte multiplies that threshold by 16.

use crate::Identifier;
use clonebox_error::{CloneboxResult, ConfigError};
use sha2::{Digest, Sha256};

/// Identifier length in bytes used when nothing else is configured.
pub const DEFAULT_IDENTIFIER_BYTES: usize = 3;

/// Derives short identifiers from content.
///
/// Implementations must be deterministic: the same content always yields the
/// same first candidate, and the same `(previous, content)` pair always yields
/// the same next candidate. Retries are reproducible because of this.
pub trait IdentifierResolver: Send + Sync {
    /// First candidate identifier for `content`.
    ///
    /// `content` must not be empty.
    fn derive_candidate(&self, content: &[u8]) -> Identifier;

    /// Candidate to try after `previous` lost a uniqueness race.
    fn next_candidate(&self, previous: &Identifier, content: &[u8]) -> Identifier;
}

/// Truncated SHA-256 resolver.
///
/// Retries fold the previous candidate back into the hash input
/// (`sha256(previous || content)`), never randomness.
///
/// # Examples
///
/// ```
/// use clonebox_core::{IdentifierResolver, Sha256Resolver};
///
/// let resolver = Sha256Resolver::default();
/// let first = resolver.derive_candidate(b"https://example.com");
/// assert_eq!(first.as_str().len(), 6);
///
/// let second = resolver.next_candidate(&first, b"https://example.com");
/// assert_ne!(first, second);
/// assert_eq!(second, resolver.next_candidate(&first, b"https://example.com"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sha256Resolver {
    identifier_bytes: usize,
}

impl Sha256Resolver {
    /// Create a resolver producing identifiers of `identifier_bytes` bytes
    /// (twice as many hex characters).
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless `1 <= identifier_bytes <= 32`.
    pub fn new(identifier_bytes: usize) -> CloneboxResult<Self> {
        if identifier_bytes == 0 || identifier_bytes > 32 {
            Err(ConfigError::for_key(
                "links.identifier_bytes",
                format!("must be between 1 and 32, got {}", identifier_bytes),
            ))?
        }
        Ok(Self { identifier_bytes })
    }

    /// Identifier length in hex characters.
    pub fn identifier_len(&self) -> usize {
        self.identifier_bytes * 2
    }

    fn truncate(&self, hasher: Sha256) -> Identifier {
        let digest = hasher.finalize();
        let hex: String = digest[..self.identifier_bytes]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Identifier::new(hex)
    }
}

impl Default for Sha256Resolver {
    fn default() -> Self {
        Self {
            identifier_bytes: DEFAULT_IDENTIFIER_BYTES,
        }
    }
}

impl IdentifierResolver for Sha256Resolver {
    fn derive_candidate(&self, content: &[u8]) -> Identifier {
        debug_assert!(!content.is_empty(), "identifier content must not be empty");

        let mut hasher = Sha256::new();
        hasher.update(content);
        self.truncate(hasher)
    }

    fn next_candidate(&self, previous: &Identifier, content: &[u8]) -> Identifier {
        let mut hasher = Sha256::new();
        hasher.update(previous.as_str().as_bytes());
        hasher.update(content);
        let next = self.truncate(hasher);

        tracing::trace!(previous = %previous, next = %next, "Derived retry candidate");
        next
    }
}
