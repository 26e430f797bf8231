use thiserror::Error;

/// Error returned by `min`/`max` queries on a tree that holds no elements.
///
/// This is the only failure the containers report. Every other kind of
/// absence (a missing key on lookup, a duplicate on insert, a missing key on
/// removal) is an ordinary result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("tree is empty")]
pub struct EmptyTreeError;
