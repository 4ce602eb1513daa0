//! The in-flight token container.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{GenType, PayloadError};

/// An in-flight message travelling along graph edges.
///
/// A container carries one or more typed payloads (a subset of the registered
/// [`GenType`](super::GenType)s, keyed by type name) plus the routing fields
/// the dispatch protocol rewrites at each hop. It is created by a generator
/// or forwarded by a processing stage, travels exactly one edge per hop, and
/// is dropped when no component retains it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenContainer {
    pub container_id: u64,
    #[serde(default)]
    pub data: FxHashMap<String, GenType>,
    /// Destination component id, or unset until routing resolves it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_comp: Option<String>,
    /// Destination handle id, or unset until routing resolves it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handler: Option<String>,
}

impl GenContainer {
    #[must_use]
    pub fn new(container_id: u64) -> Self {
        Self {
            container_id,
            ..Default::default()
        }
    }

    /// Add a payload; the type name must not already be present.
    pub fn insert(&mut self, gen_type: GenType) -> Result<(), PayloadError> {
        if self.data.contains_key(&gen_type.type_name) {
            return Err(PayloadError::TypeExists(gen_type.type_name));
        }
        self.data.insert(gen_type.type_name.clone(), gen_type);
        Ok(())
    }

    /// Add several payloads at once; fails on the first duplicate.
    pub fn insert_all(
        &mut self,
        types: impl IntoIterator<Item = GenType>,
    ) -> Result<(), PayloadError> {
        for gen_type in types {
            self.insert(gen_type)?;
        }
        Ok(())
    }

    pub fn get(&self, type_name: &str) -> Option<&GenType> {
        self.data.get(type_name)
    }

    pub fn get_mut(&mut self, type_name: &str) -> Option<&mut GenType> {
        self.data.get_mut(type_name)
    }

    /// Rewrite the routing fields to the resolved destination pair.
    pub fn set_next_target(&mut self, comp: impl Into<String>, handler: impl Into<String>) {
        self.target_comp = Some(comp.into());
        self.target_handler = Some(handler.into());
    }

    /// Derive the default outbound handle.
    ///
    /// Defined only when the container carries exactly one payload type `T`,
    /// in which case the handle is `"T-out"`. With zero or several payloads
    /// there is no unambiguous channel and the token cannot be auto-routed.
    #[must_use]
    pub fn default_handler(&self) -> Option<String> {
        if self.data.len() == 1 {
            self.data.keys().next().map(|name| format!("{name}-out"))
        } else {
            None
        }
    }
}
