//! Test suite model
//!
//! A suite is a named, nestable grouping of tests with its own hook scope.
//! Parent links are arena ids; suites live until the registry is reset.

use serde::{Deserialize, Serialize};

use crate::pipeline::StageName;

use super::hooks::HookSet;
use super::TestId;

/// Arena identifier of a suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteId(pub(crate) usize);

impl SuiteId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A named grouping of test cases and scoped hooks.
#[derive(Clone, Debug)]
pub struct TestSuite {
    pub id: SuiteId,
    pub name: String,
    pub parent: Option<SuiteId>,
    pub stage: StageName,
    /// Insertion order is the default execution order.
    pub tests: Vec<TestId>,
    pub(crate) hooks: HookSet,
}

impl TestSuite {
    pub fn new(id: SuiteId, name: impl Into<String>, parent: Option<SuiteId>, stage: StageName) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            stage,
            tests: Vec::new(),
            hooks: HookSet::default(),
        }
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }
}
