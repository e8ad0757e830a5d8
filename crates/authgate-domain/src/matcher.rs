//! Path-segment wildcard matching for policy rule patterns.
//!
//! Policy rules scope resources with `/`-delimited hierarchical keys where a
//! segment may carry a single `*` wildcard, e.g. the pattern `env/*/app`
//! matches the path `env/prod/app`. The engine's built-in matchers do not
//! understand segment-scoped wildcards, so this predicate is registered with
//! the engine by name and invoked from rule-matching expressions.

/// Signature of a two-argument match predicate as registered with the
/// policy engine.
pub type MatchFn = fn(&str, &str) -> bool;

/// Returns whether `path` matches `pattern`, segment by segment.
///
/// Rules:
/// - the pattern `*` on its own matches anything (superuser/global rules);
/// - both sides split on `/`; differing segment counts never match;
/// - empty segments on either side never match;
/// - within a segment, a `*` matches any suffix of the corresponding path
///   segment, including the empty one: `bc*` matches `bcd` and `bc`,
///   but not `bd`.
pub fn matches(path: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let path_segs: Vec<&str> = path.split('/').collect();
    let pattern_segs: Vec<&str> = pattern.split('/').collect();

    if path_segs.len() != pattern_segs.len() || path_segs.is_empty() {
        return false;
    }

    path_segs
        .iter()
        .zip(pattern_segs.iter())
        .all(|(p, q)| segment_matches(p, q))
}

fn segment_matches(path_seg: &str, pattern_seg: &str) -> bool {
    if path_seg.is_empty() || pattern_seg.is_empty() {
        return false;
    }

    match pattern_seg.find('*') {
        None => path_seg == pattern_seg,
        // The wildcard may match zero or more trailing characters, so the
        // path segment must carry the pattern's prefix, or equal it exactly
        // when shorter than the wildcard position. Compared as bytes so a
        // wildcard falling inside a multi-byte path character cannot panic.
        Some(j) if path_seg.len() > j => path_seg.as_bytes()[..j] == pattern_seg.as_bytes()[..j],
        Some(j) => path_seg == &pattern_seg[..j],
    }
}
