//! Result encoding
//!
//! Each descriptor carries its resolved paths as a JSON object under a named
//! opaque key, so callers need no second round trip. Keys are ordered, which
//! keeps the encoding byte-for-byte deterministic.

use crate::selection::Candidate;
use indexmap::IndexMap;
use spacereg_core::{OpaqueEntry, ProviderDescriptor, RegistryError, Result, SpaceId};
use std::collections::BTreeMap;

/// Opaque key holding the `space id -> resolved path` map
pub const SPACE_PATHS_KEY: &str = "space_paths";
/// Opaque key holding the mount paths matched by the static registry
pub const MOUNT_PATHS_KEY: &str = "mount_paths";
/// Decoder name of JSON payloads
pub const JSON_DECODER: &str = "json";

/// Encode a space path map
pub fn encode_space_paths(paths: &BTreeMap<SpaceId, String>) -> Result<OpaqueEntry> {
    Ok(OpaqueEntry::new(JSON_DECODER, serde_json::to_vec(paths)?))
}

/// Decode a space path map
pub fn decode_space_paths(entry: &OpaqueEntry) -> Result<BTreeMap<SpaceId, String>> {
    decode_json(entry)
}

/// Encode a mount path list
pub fn encode_mount_paths(paths: &[String]) -> Result<OpaqueEntry> {
    Ok(OpaqueEntry::new(JSON_DECODER, serde_json::to_vec(paths)?))
}

/// Decode a mount path list
pub fn decode_mount_paths(entry: &OpaqueEntry) -> Result<Vec<String>> {
    decode_json(entry)
}

fn decode_json<T: serde::de::DeserializeOwned>(entry: &OpaqueEntry) -> Result<T> {
    if entry.decoder != JSON_DECODER {
        return Err(RegistryError::invalid(format!(
            "unsupported opaque decoder '{}'",
            entry.decoder
        )));
    }
    Ok(serde_json::from_slice(&entry.value)?)
}

/// Typed access to the encoded extras of a descriptor
pub trait DescriptorExt {
    /// Resolved space paths; empty when none are attached
    fn space_paths(&self) -> Result<BTreeMap<SpaceId, String>>;

    /// Matched mount paths; empty when none are attached
    fn mount_paths(&self) -> Result<Vec<String>>;
}

impl DescriptorExt for ProviderDescriptor {
    fn space_paths(&self) -> Result<BTreeMap<SpaceId, String>> {
        self.opaque
            .get(SPACE_PATHS_KEY)
            .map_or_else(|| Ok(BTreeMap::new()), decode_space_paths)
    }

    fn mount_paths(&self) -> Result<Vec<String>> {
        self.opaque
            .get(MOUNT_PATHS_KEY)
            .map_or_else(|| Ok(Vec::new()), decode_mount_paths)
    }
}

#[derive(Default)]
struct Group {
    paths: BTreeMap<SpaceId, String>,
    storage_ids: Vec<String>,
}

/// Group selected spaces into one descriptor per provider address
///
/// Descriptors come out in order of the first candidate of each address.
/// `provider_id` is set when every space of a descriptor lives on the same
/// storage.
pub fn group_by_address(candidates: Vec<Candidate>) -> Result<Vec<ProviderDescriptor>> {
    let mut groups: IndexMap<String, Group> = IndexMap::new();
    for candidate in candidates {
        let group = groups.entry(candidate.address).or_default();
        if !group.storage_ids.contains(&candidate.space.root.storage_id) {
            group.storage_ids.push(candidate.space.root.storage_id);
        }
        group.paths.insert(candidate.space.id, candidate.path);
    }

    groups
        .into_iter()
        .map(|(address, group)| {
            let mut descriptor = ProviderDescriptor::new(address);
            if let [storage_id] = group.storage_ids.as_slice() {
                if !storage_id.is_empty() {
                    descriptor.provider_id = Some(storage_id.clone());
                }
            }
            descriptor
                .opaque
                .insert(SPACE_PATHS_KEY, encode_space_paths(&group.paths)?);
            Ok(descriptor)
        })
        .collect()
}
