use clonebox_core::{DEFAULT_IDENTIFIER_BYTES, Identifier, IdentifierResolver, Sha256Resolver};
use std::collections::HashSet;

#[test]
fn first_candidate_is_truncated_sha256_prefix() {
    let resolver = Sha256Resolver::default();
    let id = resolver.derive_candidate(b"https://example.com");

    assert_eq!(id.as_str(), "100680");
    assert_eq!(id.as_str().len(), DEFAULT_IDENTIFIER_BYTES * 2);
}

#[test]
fn first_candidate_is_deterministic() {
    let a = Sha256Resolver::default();
    let b = Sha256Resolver::default();

    assert_eq!(
        a.derive_candidate(b"https://example.com/path"),
        b.derive_candidate(b"https://example.com/path")
    );
}

#[test]
fn trailing_slash_changes_the_candidate() {
    let resolver = Sha256Resolver::default();

    assert_eq!(
        resolver.derive_candidate(b"https://example.com/").as_str(),
        "0f115d"
    );
    assert_ne!(
        resolver.derive_candidate(b"https://example.com"),
        resolver.derive_candidate(b"https://example.com/")
    );
}

#[test]
fn next_candidate_salts_with_previous() {
    let resolver = Sha256Resolver::default();
    let first = resolver.derive_candidate(b"https://example.com");
    let next = resolver.next_candidate(&first, b"https://example.com");

    // sha256("100680" || "https://example.com")[..3]
    assert_eq!(next.as_str(), "d8f8e1");
}

#[test]
fn retry_chain_is_reproducible_and_distinct() {
    let resolver = Sha256Resolver::default();
    let content = b"https://collide.example/a";

    let chain = |r: &Sha256Resolver| {
        let mut ids = vec![r.derive_candidate(content)];
        for _ in 0..50 {
            let next = r.next_candidate(ids.last().unwrap(), content);
            ids.push(next);
        }
        ids
    };

    let one = chain(&resolver);
    let two = chain(&resolver);
    assert_eq!(one, two);

    let unique: HashSet<&Identifier> = one.iter().collect();
    assert_eq!(unique.len(), one.len());
}

#[test]
fn identifiers_are_lowercase_hex() {
    let resolver = Sha256Resolver::new(8).unwrap();
    let id = resolver.derive_candidate(b"https://example.com");

    assert_eq!(resolver.identifier_len(), 16);
    assert_eq!(id.as_str().len(), 16);
    assert!(
        id.as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    );
}

#[test]
fn identifier_length_is_validated() {
    assert!(Sha256Resolver::new(0).is_err());
    assert!(Sha256Resolver::new(33).is_err());
    assert!(Sha256Resolver::new(1).is_ok());
    assert!(Sha256Resolver::new(32).is_ok());
}

#[test]
fn one_byte_space_collides_quickly() {
    // 256 identifiers: the birthday bound puts a collision at about 20 inputs,
    // so 300 distinct links must collide.
    let resolver = Sha256Resolver::new(1).unwrap();
    let mut seen = HashSet::new();
    let mut collided = false;
    for i in 0..300 {
        let link = format!("https://example.com/{}", i);
        if !seen.insert(resolver.derive_candidate(link.as_bytes())) {
            collided = true;
            break;
        }
    }
    assert!(collided);
}
