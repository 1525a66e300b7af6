//! Controller configuration (spec.md §6.4), built with `typed_builder::TypedBuilder` the way the
//! teacher builds `SimOpts`/`Spec`.

use std::path::PathBuf;

use crate::units::BytesPerSec;

/// All tunables spec.md §6.4 enumerates, plus the oracle file location a real deployment needs
/// (AMBIENT, SPEC_FULL.md module 11). `Deserialize` with a container-level `#[serde(default)]`
/// lets `renet-controller` load a config file that only overrides a handful of fields, the same
/// way the teacher's `NetworkSpec` round-trips through JSON.
#[derive(
    Debug,
    Clone,
    typed_builder::TypedBuilder,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(default)]
pub struct ControllerConfig {
    /// Stats Collector tick period (spec.md §4.4).
    #[builder(default = 5)]
    pub stats_interval_seconds: u64,

    /// Per-flow throughput goal, in bits/second as spec.md §6.4 states it; converted to
    /// [`BytesPerSec`] via [`ControllerConfig::desired_rate`] for comparisons against measured
    /// rates.
    #[builder(default = 1_000_000)]
    pub desired_rate_bps: u64,

    /// K in the Path Selector's K-shortest-paths search (spec.md §4.7).
    #[builder(default = 5)]
    pub k_shortest_paths: usize,

    /// Fraction of `desired_rate` below which a flow becomes a re-routing candidate (spec.md
    /// §4.10 step 1).
    #[builder(default = 0.75)]
    pub reroute_ratio_trigger: f64,

    /// Factor a candidate path's throughput must exceed the current rate by to trigger a
    /// re-route (spec.md §4.10 step 3).
    #[builder(default = 1.25)]
    pub reroute_ratio_improvement: f64,

    /// Ticks a flow is exempt from re-routing consideration after being moved (spec.md §4.10
    /// step 3, §6.4).
    #[builder(default = 2)]
    pub reroute_cooldown_ticks: u32,

    /// Ticks of inactivity before an unrefreshed flow is marked inactive (spec.md §4.4, §6.4).
    #[builder(default = 2)]
    pub active_countdown_ticks: u32,

    /// Path to the Link Capacity Oracle document (spec.md §6.3).
    #[builder(default = PathBuf::from("link_bandwidths.json"))]
    pub oracle_file_path: PathBuf,
}

impl ControllerConfig {
    pub fn desired_rate(&self) -> BytesPerSec {
        BytesPerSec::new(self.desired_rate_bps as f64 / 8.0)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = ControllerConfig::builder().build();
        assert_eq!(config.stats_interval_seconds, 5);
        assert_eq!(config.k_shortest_paths, 5);
        assert_eq!(config.reroute_ratio_trigger, 0.75);
        assert_eq!(config.reroute_ratio_improvement, 1.25);
        assert_eq!(config.reroute_cooldown_ticks, 2);
        assert_eq!(config.active_countdown_ticks, 2);
        assert_eq!(config.desired_rate(), BytesPerSec::new(125_000.0));
    }

    #[test]
    fn partial_json_fills_in_remaining_defaults() {
        let config: ControllerConfig = serde_json::from_str(r#"{"k_shortest_paths": 3}"#).unwrap();
        assert_eq!(config.k_shortest_paths, 3);
        assert_eq!(config.stats_interval_seconds, 5, "untouched fields keep their default");
    }
}
