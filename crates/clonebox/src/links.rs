//! Link shortening.
//!
//! `shorten_link` is idempotent per normalized link. The registry insert is
//! the only uniqueness check that counts: the content lookup in front of it
//! is a fast path, and a content conflict on insert means a concurrent caller
//! registered the same link first, so its record is returned as existing.
//! An identifier conflict means an unrelated link owns the candidate, and the
//! next candidate in the deterministic chain is tried.

use clonebox_core::{Identifier, IdentifierResolver, LinkRecord, normalize_link};
use clonebox_database::{Insertion, LinkRegistry, UniqueColumn};
use clonebox_error::{CloneboxResult, ContentError, ContentErrorKind};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default cap on identifier candidates per link.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;

/// Result of shortening a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenedLink {
    /// Canonical record for the link
    pub record: LinkRecord,
    /// True when the link was already registered before this call
    pub was_existing: bool,
}

impl ShortenedLink {
    /// The short identifier.
    pub fn identifier(&self) -> &Identifier {
        &self.record.identifier
    }
}

/// Maps links to short, content-derived identifiers.
#[derive(Clone)]
pub struct LinkShortener {
    registry: Arc<dyn LinkRegistry>,
    resolver: Arc<dyn IdentifierResolver>,
    max_attempts: u32,
}

impl LinkShortener {
    /// Create a shortener over the given registry and resolver.
    pub fn new(registry: Arc<dyn LinkRegistry>, resolver: Arc<dyn IdentifierResolver>) -> Self {
        Self {
            registry,
            resolver,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the candidate cap (at least one attempt is always made).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Return the identifier for `original`, registering it if needed.
    ///
    /// # Errors
    ///
    /// - `InvalidContent` if the input is not an absolute URL with a host
    /// - `RetriesExhausted` if every candidate up to the cap is taken
    /// - Registry failures are propagated unchanged
    #[instrument(skip(self))]
    pub async fn shorten_link(&self, original: &str) -> CloneboxResult<ShortenedLink> {
        let content = normalize_link(original)?;

        if let Some(record) = self.registry.find_by_content(&content).await? {
            debug!(identifier = %record.identifier, "Link already registered");
            return Ok(ShortenedLink {
                record,
                was_existing: true,
            });
        }

        let mut candidate = self.resolver.derive_candidate(content.as_bytes());
        for attempt in 1..=self.max_attempts {
            match self.registry.insert_link(&candidate, &content).await? {
                Insertion::Registered(record) => {
                    info!(identifier = %record.identifier, attempt, "Registered link");
                    return Ok(ShortenedLink {
                        record,
                        was_existing: false,
                    });
                }
                Insertion::Conflict(UniqueColumn::Content) => {
                    // Lost a race with a concurrent registration of this link.
                    if let Some(record) = self.registry.find_by_content(&content).await? {
                        debug!(identifier = %record.identifier, "Concurrent registration won");
                        return Ok(ShortenedLink {
                            record,
                            was_existing: true,
                        });
                    }
                }
                Insertion::Conflict(column) => {
                    let next = self.resolver.next_candidate(&candidate, content.as_bytes());
                    debug!(%column, taken = %candidate, next = %next, attempt, "Identifier taken");
                    candidate = next;
                }
            }
        }

        Err(ContentError::new(ContentErrorKind::RetriesExhausted(self.max_attempts)).into())
    }

    /// Look up the link an identifier points to.
    ///
    /// Identifiers are matched case-insensitively; unknown or malformed
    /// identifiers yield `None`.
    #[instrument(skip(self))]
    pub async fn resolve_link(&self, identifier: &str) -> CloneboxResult<Option<LinkRecord>> {
        let identifier = identifier.trim().to_ascii_lowercase();
        if identifier.is_empty() || !identifier.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(None);
        }
        self.registry
            .find_by_identifier(&Identifier::new(identifier))
            .await
    }

    /// Most recent links, newest first.
    pub async fn latest_links(&self, limit: usize) -> CloneboxResult<Vec<LinkRecord>> {
        self.registry.latest_links(limit).await
    }
}
