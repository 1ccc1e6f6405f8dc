//! Character-class alias expansion
//!
//! Mount paths such as `/users/[a-k]` shard a namespace by the first letter
//! of a name. Listing the parent `/users` needs the concrete aliases
//! `/users/a` .. `/users/k`, which this module produces.

use indexmap::IndexSet;
use spacereg_core::{RegistryError, Result};

/// Expansion bound used when the caller has no better value
pub const DEFAULT_EXPANSION_LIMIT: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Class(Vec<char>),
}

/// Expand every `[...]` class in `pattern` into concrete strings
///
/// Supports single characters and ranges (`[abc]`, `[a-k]`, `[a-cx-z]`).
/// A `-` first or last in a class is literal, and `\[`, `\]` and `\\` escape
/// outside a class. Results follow class order, leftmost class varying
/// slowest. Fails when a class is malformed or more than `limit` strings
/// would be produced.
pub fn expand_character_classes(pattern: &str, limit: usize) -> Result<Vec<String>> {
    let pieces = parse(pattern, limit)?;
    let total = pieces.iter().try_fold(1usize, |acc, piece| match piece {
        Piece::Literal(_) => Some(acc),
        Piece::Class(chars) => acc.checked_mul(chars.len()),
    });
    match total {
        Some(total) if total <= limit => {
            let mut out = Vec::with_capacity(total);
            expand(&pieces, String::new(), &mut out);
            Ok(out)
        }
        _ => Err(too_many(pattern, limit)),
    }
}

/// True when `pattern` contains an unescaped character class
pub fn has_character_class(pattern: &str) -> bool {
    parse(pattern, usize::MAX).is_ok_and(|pieces| pieces.iter().any(|p| matches!(p, Piece::Class(_))))
}

fn expand(pieces: &[Piece], prefix: String, out: &mut Vec<String>) {
    let Some((first, rest)) = pieces.split_first() else {
        out.push(prefix);
        return;
    };
    match first {
        Piece::Literal(text) => expand(rest, prefix + text, out),
        Piece::Class(chars) => {
            for c in chars {
                let mut next = prefix.clone();
                next.push(*c);
                expand(rest, next, out);
            }
        }
    }
}

fn parse(pattern: &str, limit: usize) -> Result<Vec<Piece>> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&(_, escaped @ ('[' | ']' | '\\'))) => {
                    literal.push(escaped);
                    chars.next();
                }
                _ => literal.push('\\'),
            },
            '[' => {
                let mut body = Vec::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    body.push(c);
                }
                if !closed {
                    return Err(malformed(pattern, offset, "unterminated class"));
                }
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Class(class_members(pattern, offset, &body, limit)?));
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

/// Distinct members of one class, failing as soon as they outnumber `limit`
fn class_members(pattern: &str, offset: usize, body: &[char], limit: usize) -> Result<Vec<char>> {
    if body.is_empty() {
        return Err(malformed(pattern, offset, "empty class"));
    }
    if body[0] == '^' {
        return Err(malformed(pattern, offset, "negated classes cannot be expanded"));
    }
    let mut members: IndexSet<char> = IndexSet::new();
    let mut push = |c: char| {
        members.insert(c);
        if members.len() > limit {
            Err(too_many(pattern, limit))
        } else {
            Ok(())
        }
    };
    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        if i + 2 < body.len() && body[i + 1] == '-' {
            let end = body[i + 2];
            if end < c {
                return Err(malformed(pattern, offset, &format!("reversed range {c}-{end}")));
            }
            (c..=end).try_for_each(&mut push)?;
            i += 3;
        } else {
            push(c)?;
            i += 1;
        }
    }
    Ok(members.into_iter().collect())
}

fn too_many(pattern: &str, limit: usize) -> RegistryError {
    RegistryError::invalid(format!("'{pattern}' expands to more than {limit} aliases"))
}

fn malformed(pattern: &str, offset: usize, what: &str) -> RegistryError {
    RegistryError::invalid(format!("'{pattern}' at offset {offset}: {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn test_range_expansion() {
        let aliases = expand_character_classes("/users/[a-k]", 100).unwrap();
        assert_eq!(aliases.len(), 11);
        assert_eq!(aliases.first().unwrap(), "/users/a");
        assert_eq!(aliases.last().unwrap(), "/users/k");
    }

    #[test]
    fn test_mixed_members_and_ranges() {
        assert_eq!(
            expand_character_classes("[ab][x-z-]", 100).unwrap(),
            vec!["ax", "ay", "az", "a-", "bx", "by", "bz", "b-"]
        );
    }

    #[test]
    fn test_no_class_is_identity() {
        assert_eq!(
            expand_character_classes("/projects", 1).unwrap(),
            vec!["/projects"]
        );
        assert!(!has_character_class("/projects"));
        assert!(has_character_class("/users/[a-k]"));
    }

    #[test]
    fn test_escaped_bracket_is_literal() {
        assert_eq!(
            expand_character_classes(r"/odd/\[x\]/[12]", 10).unwrap(),
            vec!["/odd/[x]/1", "/odd/[x]/2"]
        );
        assert!(!has_character_class(r"/odd/\[x\]"));
    }

    #[test]
    fn test_malformed_classes() {
        for pattern in ["/users/[a-k", "/users/[]", "/users/[k-a]", "/users/[^a]"] {
            assert_matches!(
                expand_character_classes(pattern, 100),
                Err(RegistryError::Invalid { .. }),
                "{pattern}"
            );
        }
    }

    #[test]
    fn test_limit_enforced() {
        assert_matches!(
            expand_character_classes("[a-z][a-z][a-z]", 1000),
            Err(RegistryError::Invalid { .. })
        );
        assert_eq!(
            expand_character_classes("[a-z][a-z]", 676).unwrap().len(),
            676
        );
    }

    #[test]
    fn test_wide_range_rejected_early() {
        let started = std::time::Instant::now();
        assert_matches!(
            expand_character_classes("/u/[\u{100}-\u{FFFF}]", 10),
            Err(RegistryError::Invalid { .. })
        );
        assert!(started.elapsed() < std::time::Duration::from_millis(500));
        assert!(has_character_class("/u/[\u{100}-\u{FFFF}]"));
    }

    #[test]
    fn test_repeated_members_count_once() {
        assert_eq!(expand_character_classes("[aab-ca]", 3).unwrap(), vec!["a", "b", "c"]);
    }

    proptest! {
        #[test]
        fn prop_range_count_matches_span(start in b'a'..=b'z', len in 0u8..10) {
            let end = start.saturating_add(len).min(b'z');
            let pattern = format!("/x/[{}-{}]", start as char, end as char);
            let aliases = expand_character_classes(&pattern, 100).unwrap();
            prop_assert_eq!(aliases.len(), usize::from(end - start) + 1);
            for alias in &aliases {
                prop_assert!(alias.starts_with("/x/"));
                prop_assert_eq!(alias.chars().count(), 4);
            }
        }

        #[test]
        fn prop_expansions_are_distinct(classes in proptest::collection::vec("[a-e]{1,3}", 1..4)) {
            let pattern: String = classes.iter().map(|c| format!("/[{c}]")).collect();
            let aliases = expand_character_classes(&pattern, 10_000).unwrap();
            let mut deduped = aliases.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), aliases.len());
        }
    }
}
