//! Case inventory queried from the runner at startup
//!
//! The runner lists its linked cases one identifier per line when invoked
//! with `--listGMs` or `--listTests`. Both lists are fetched once, before any
//! job line is parsed, so group names can expand to their full membership.

use super::{Invocation, Runner};
use crate::error::{SetupError, SetupResult};
use std::path::Path;
use tracing::{debug, info};

/// A named group of cases a job line can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseGroup {
    /// Visual cases (`gm`, `gms`)
    VisualCases,
    /// Unit tests (`test`, `tests`)
    UnitTests,
}

impl CaseGroup {
    /// All groups, in query order
    pub const ALL: [CaseGroup; 2] = [CaseGroup::VisualCases, CaseGroup::UnitTests];

    /// Recognize a job token naming this group (exact match)
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gm" | "gms" => Some(CaseGroup::VisualCases),
            "test" | "tests" => Some(CaseGroup::UnitTests),
            _ => None,
        }
    }

    /// Runner flag that lists this group's members
    pub fn list_flag(self) -> &'static str {
        match self {
            CaseGroup::VisualCases => "--listGMs",
            CaseGroup::UnitTests => "--listTests",
        }
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            CaseGroup::VisualCases => "visual cases",
            CaseGroup::UnitTests => "unit tests",
        }
    }
}

/// Membership of every case group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    visual_cases: Vec<String>,
    unit_tests: Vec<String>,
}

impl Inventory {
    /// Build an inventory from known group memberships
    pub fn new(visual_cases: Vec<String>, unit_tests: Vec<String>) -> Self {
        Self {
            visual_cases,
            unit_tests,
        }
    }

    /// Members of a group, in the order the runner listed them
    pub fn members(&self, group: CaseGroup) -> &[String] {
        match group {
            CaseGroup::VisualCases => &self.visual_cases,
            CaseGroup::UnitTests => &self.unit_tests,
        }
    }

    /// Ask the runner for both group memberships.
    ///
    /// Any failed query is fatal to the run.
    pub fn query(runner: &dyn Runner, program: &Path, resources: &Path) -> SetupResult<Self> {
        let mut inventory = Self::default();

        for group in CaseGroup::ALL {
            let invocation = Invocation::query(program, resources, group.list_flag());
            debug!(command = %invocation, "Querying runner inventory");

            let outcome = runner.run(&invocation);
            if let Some(failure) = outcome.failure {
                return Err(SetupError::InventoryQuery {
                    flag: group.list_flag().to_string(),
                    source: failure,
                });
            }

            let members: Vec<String> = String::from_utf8_lossy(&outcome.stdout)
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();

            info!(group = group.name(), count = members.len(), "Runner inventory loaded");

            match group {
                CaseGroup::VisualCases => inventory.visual_cases = members,
                CaseGroup::UnitTests => inventory.unit_tests = members,
            }
        }

        Ok(inventory)
    }
}
