//! The Link Capacity Oracle (spec.md §6.3): a read-only, externally-written file mapping
//! `"{a}-{b}"` to the current capacity of that directed link in Mbps.
//!
//! Grounded in the teacher's `parsimon-driver::read_network_spec`, which reads an external JSON
//! document via `serde` rather than a bespoke parser.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ids::SwitchId;
use crate::units::Mbps;

/// Raw on-disk shape: `"{a}-{b}" -> Mbps`, both directions present.
type OracleDocument = HashMap<String, f64>;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("failed to read oracle file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse oracle file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads the capacity oracle file on demand. Holds no cached state: spec.md §6.3 requires a fresh
/// read "each time it processes a port-stats reply", and spec.md §9 notes the read rate is low
/// enough that this is acceptable without a TTL cache.
#[derive(Debug, Clone)]
pub struct LinkCapacityOracle {
    path: PathBuf,
}

impl LinkCapacityOracle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Looks up the capacity of the directed link `a -> b`. Per spec.md §6.3 and §7 ("Oracle file
    /// unreadable"): an unreadable or unparsable file, or a missing key, both yield `Mbps::ZERO`
    /// rather than an error the caller must propagate. The error variants exist so the caller can
    /// log the distinction between "file missing" and "key missing".
    pub fn capacity(&self, a: SwitchId, b: SwitchId) -> Result<Mbps, OracleError> {
        let doc = self.read()?;
        Ok(doc
            .get(&format!("{a}-{b}"))
            .copied()
            .map(Mbps::new)
            .unwrap_or(Mbps::ZERO))
    }

    /// Same lookup, but collapses any read/parse error to `Mbps::ZERO` per spec.md §7's policy,
    /// for callers (the Link Store) that must not fail a stats tick over an oracle hiccup.
    pub fn capacity_or_zero(&self, a: SwitchId, b: SwitchId) -> Mbps {
        self.capacity(a, b).unwrap_or(Mbps::ZERO)
    }

    fn read(&self) -> Result<OracleDocument, OracleError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| OracleError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| OracleError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_key_is_zero() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"1-2": 10.0}}"#).unwrap();
        let oracle = LinkCapacityOracle::new(f.path());
        assert_eq!(
            oracle.capacity(SwitchId::new(3), SwitchId::new(4)).unwrap(),
            Mbps::ZERO
        );
    }

    #[test]
    fn present_key_round_trips() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"1-2": 10.0, "2-1": 10.0}}"#).unwrap();
        let oracle = LinkCapacityOracle::new(f.path());
        assert_eq!(
            oracle.capacity(SwitchId::new(1), SwitchId::new(2)).unwrap(),
            Mbps::new(10.0)
        );
    }

    #[test]
    fn unreadable_file_collapses_to_zero() {
        let oracle = LinkCapacityOracle::new("/nonexistent/oracle.json");
        assert_eq!(
            oracle.capacity_or_zero(SwitchId::new(1), SwitchId::new(2)),
            Mbps::ZERO
        );
    }
}
