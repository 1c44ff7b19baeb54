//! Recency Index Module
//!
//! Key layout and ordering for a `key -> last used` index kept under
//! [`INTERNAL_NAMESPACE`](crate::driver::INTERNAL_NAMESPACE).
//!
//! Index keys are `last_used:<namespace length>:<namespace>:<key>`, so one
//! namespace's entries never collide with another's, even when names contain
//! the separator. Values are 8-byte little-endian use stamps; larger means
//! more recent.

const PREFIX: &str = "last_used";

/// Index key recording the last use of `key` in `namespace`.
pub fn index_key(namespace: &str, key: &str) -> String {
    format!("{}{}", namespace_prefix(namespace), key)
}

/// Common prefix of every index key of `namespace`.
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{}:{}:{}:", PREFIX, namespace.len(), namespace)
}

pub fn encode_stamp(stamp: u64) -> Vec<u8> {
    stamp.to_le_bytes().to_vec()
}

/// Reads a use stamp; malformed values sort as oldest.
pub fn decode_stamp(bytes: &[u8]) -> u64 {
    bytes.try_into().map(u64::from_le_bytes).unwrap_or(0)
}

// == LRU Order ==
/// Orders the index entries of `namespace` oldest first.
///
/// `entries` yields `(index key, stamp bytes)` pairs; entries of other
/// namespaces are skipped. Ties break on the key.
pub fn lru_order<'a, I>(namespace: &str, entries: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let prefix = namespace_prefix(namespace);
    let mut keyed: Vec<(u64, &str)> = entries
        .into_iter()
        .filter_map(|(index_key, stamp)| {
            index_key
                .strip_prefix(prefix.as_str())
                .map(|key| (decode_stamp(stamp), key))
        })
        .collect();
    keyed.sort_unstable();
    keyed.into_iter().map(|(_, key)| key.to_string()).collect()
}
