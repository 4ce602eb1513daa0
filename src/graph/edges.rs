//! Edge records and the handle naming convention.

use serde::{Deserialize, Serialize};

/// Direction of a component handle, encoded in its id suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleDirection {
    In,
    Out,
}

/// Parse a handle id's direction from its `-in` / `-out` suffix.
///
/// Returns `None` when the id carries neither suffix; loading rejects such
/// handles before they reach the graph.
#[must_use]
pub fn handle_direction(handle: &str) -> Option<HandleDirection> {
    if handle.ends_with("-out") {
        Some(HandleDirection::Out)
    } else if handle.ends_with("-in") {
        Some(HandleDirection::In)
    } else {
        None
    }
}

/// Strip the direction suffix, leaving the semantic channel name.
///
/// `"order-in"` and `"order-out"` both name the channel `"order"`. Ids
/// without a direction suffix are returned unchanged.
#[must_use]
pub fn handle_channel(handle: &str) -> &str {
    handle
        .strip_suffix("-out")
        .or_else(|| handle.strip_suffix("-in"))
        .unwrap_or(handle)
}

/// Rotate a handle id to its outbound side.
///
/// A token arriving on `"order-in"` leaves on `"order-out"`: the segment
/// after the last dash is replaced by `out`. Ids without a dash are returned
/// unchanged.
#[must_use]
pub fn rotate_out(handle: &str) -> String {
    match handle.rfind('-') {
        Some(pos) => format!("{}-out", &handle[..pos]),
        None => handle.to_string(),
    }
}

/// One edge of the workflow topology, as loaded from the edge list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub source_handle: String,
    pub target: String,
    pub target_handle: String,
    pub id: String,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        source_handle: impl Into<String>,
        target: impl Into<String>,
        target_handle: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            source_handle: source_handle.into(),
            target: target.into(),
            target_handle: target_handle.into(),
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_comes_from_the_suffix() {
        assert_eq!(handle_direction("order-out"), Some(HandleDirection::Out));
        assert_eq!(handle_direction("order-in"), Some(HandleDirection::In));
        assert_eq!(handle_direction("order"), None);
        // "-in" is checked after "-out": a handle named "x-out" never parses as input
        assert_eq!(handle_direction("x-out-in"), Some(HandleDirection::In));
    }

    #[test]
    fn channel_strips_one_suffix() {
        assert_eq!(handle_channel("order-in"), "order");
        assert_eq!(handle_channel("order-out"), "order");
        assert_eq!(handle_channel("plain"), "plain");
    }

    #[test]
    fn rotate_replaces_the_last_segment() {
        assert_eq!(rotate_out("order-in"), "order-out");
        assert_eq!(rotate_out("order-out"), "order-out");
        assert_eq!(rotate_out("a-b-in"), "a-b-out");
        assert_eq!(rotate_out("nodash"), "nodash");
    }
}
