//! Remote-to-local path mapping.
//!
//! Project roots are recorded by the control plane as they appear on the
//! acquisition network (`/nrs/...`, `Z:\...`); worker machines see those
//! trees under different mount points. An ordered list of prefix pairs
//! rewrites the former into the latter.

/// One `remote → local` prefix rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPair {
    pub remote: String,
    pub local: String,
}

impl MountPair {
    pub fn new(remote: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            local: local.into(),
        }
    }
}

/// Ordered prefix-rewrite table.
///
/// Matching is literal on bytes; the first pair whose `remote` prefixes the
/// input wins and no later pair is consulted. Unmatched paths pass through
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct PathMap {
    pairs: Vec<MountPair>,
}

impl PathMap {
    pub fn new(pairs: Vec<MountPair>) -> Self {
        Self { pairs }
    }

    /// An empty map; every path passes through.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Rewrites `path` through the first matching pair.
    pub fn map(&self, path: &str) -> String {
        for pair in &self.pairs {
            if let Some(remainder) = path.strip_prefix(pair.remote.as_str()) {
                return format!("{}{}", pair.local, remainder);
            }
        }
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> PathMap {
        PathMap::new(vec![
            MountPair::new("/nrs/mouselight", "/mnt/nrs"),
            MountPair::new("/nrs", "/mnt/other-nrs"),
            MountPair::new(r"Z:\acq", "/mnt/acq"),
        ])
    }

    #[test]
    fn first_match_wins() {
        // Both the first and second pair prefix this path; order decides.
        assert_eq!(map().map("/nrs/mouselight/p1"), "/mnt/nrs/p1");
        assert_eq!(map().map("/nrs/flylight/p2"), "/mnt/other-nrs/flylight/p2");
    }

    #[test]
    fn unmatched_passes_through() {
        assert_eq!(map().map("/groups/elsewhere/p3"), "/groups/elsewhere/p3");
    }

    #[test]
    fn matching_is_byte_literal() {
        // A Windows-style prefix only matches the same bytes.
        assert_eq!(map().map(r"Z:\acq\run7"), r"/mnt/acq\run7");
        assert_eq!(map().map("Z:/acq/run7"), "Z:/acq/run7");
    }

    #[test]
    fn identity_map_changes_nothing() {
        assert_eq!(PathMap::identity().map("/any/path"), "/any/path");
    }
}
