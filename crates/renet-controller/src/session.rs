//! Command-line surface (spec.md §6.2's `--dump-state` flag), grounded in the teacher's
//! `parsimon-worker::Args`/`examples/poisson::Args` `clap::Parser` derive style.

use std::path::PathBuf;

use renet_core::config::ControllerConfig;

/// `renet-controller [--config <path>] [--dump-state] <command>`.
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Session {
    /// Path to a JSON file overriding a subset of [`ControllerConfig`]'s fields (spec.md §6.4);
    /// fields it omits keep their default.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Print a [`renet_core::diagnostics::DiagnosticsSnapshot`] as JSON after the run completes
    /// (spec.md §6.2: an optional, read-only northbound surface).
    #[clap(long)]
    pub dump_state: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Runs the built-in triangle scenario (spec.md §8 scenario 1) against
    /// [`renet_core::testing::MockSouthbound`] and exits.
    Smoke,
    /// Runs a scripted scenario file (a JSON array of
    /// [`crate::scenario::ScenarioEvent`]) against `MockSouthbound`.
    Replay {
        /// Path to the scenario file.
        scenario: PathBuf,
    },
    /// Prints the effective configuration (after applying `--config`) as JSON and exits.
    ShowConfig,
}

impl Session {
    pub fn load_config(&self) -> Result<ControllerConfig, crate::Error> {
        match &self.config {
            Some(path) => crate::load_config(path),
            None => Ok(ControllerConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn smoke_subcommand_parses_with_no_flags() {
        let session = Session::parse_from(["renet-controller", "smoke"]);
        assert!(!session.dump_state);
        assert!(matches!(session.command, Command::Smoke));
    }

    #[test]
    fn replay_subcommand_captures_scenario_path() {
        let session =
            Session::parse_from(["renet-controller", "--dump-state", "replay", "scenario.json"]);
        assert!(session.dump_state);
        let Command::Replay { scenario } = session.command else {
            panic!("expected Replay");
        };
        assert_eq!(scenario, PathBuf::from("scenario.json"));
    }
}
