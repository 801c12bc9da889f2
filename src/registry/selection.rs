//! Run-set selection
//!
//! If any case in the target set is marked `only`, the effective set is
//! exactly the only-cases; otherwise every non-skip case runs. Excluded
//! cases are surfaced as `Skipped` results rather than silently omitted, so
//! summaries stay auditable.

use std::sync::Arc;

use super::TestCase;

/// The outcome of selection over one stage's target set.
#[derive(Clone, Default)]
pub struct StageSelection {
    /// Cases to execute, in registration order.
    pub runnable: Vec<Arc<TestCase>>,
    /// Cases reported `Skipped` without being run, with the reason.
    pub excluded: Vec<(Arc<TestCase>, String)>,
}

impl StageSelection {
    pub fn is_empty(&self) -> bool {
        self.runnable.is_empty() && self.excluded.is_empty()
    }

    pub fn total(&self) -> usize {
        self.runnable.len() + self.excluded.len()
    }
}

pub(crate) fn select<'a>(cases: impl Iterator<Item = &'a Arc<TestCase>>) -> StageSelection {
    let cases: Vec<&Arc<TestCase>> = cases.collect();
    let has_only = cases.iter().any(|c| c.only && !c.skip);

    let mut selection = StageSelection::default();
    for case in cases {
        if case.skip {
            selection
                .excluded
                .push((case.clone(), "skipped at registration".to_string()));
        } else if has_only && !case.only {
            selection
                .excluded
                .push((case.clone(), "not in only set".to_string()));
        } else {
            selection.runnable.push(case.clone());
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use crate::pipeline::StageName;
    use crate::registry::TestRegistry;

    #[test]
    fn skip_cases_are_excluded() {
        let mut registry = TestRegistry::new();
        registry.test("runs", || async { Ok(()) });
        registry.skip("skipped", || async { Ok(()) });

        let selection = registry.stage_cases(StageName::Unit);
        assert_eq!(selection.runnable.len(), 1);
        assert_eq!(selection.excluded.len(), 1);
        assert_eq!(selection.runnable[0].name, "runs");
    }

    #[test]
    fn only_excludes_everything_else() {
        let mut registry = TestRegistry::new();
        registry.test("ordinary", || async { Ok(()) });
        registry.only("focused", || async { Ok(()) });
        registry.skip("skipped", || async { Ok(()) });

        let selection = registry.stage_cases(StageName::Unit);
        assert_eq!(selection.runnable.len(), 1);
        assert_eq!(selection.runnable[0].name, "focused");
        assert_eq!(selection.excluded.len(), 2);
    }

    #[test]
    fn skip_beats_only() {
        let mut registry = TestRegistry::new();
        registry.test("ordinary", || async { Ok(()) });
        let id = registry.only("focused but skipped", || async { Ok(()) });
        // flag collision: skip always wins
        {
            let case = registry.case(id).expect("registered");
            assert!(case.only);
        }
        assert!(registry.set_skip(id));

        let selection = registry.stage_cases(StageName::Unit);
        // no effective only-case remains, so the ordinary test runs
        assert_eq!(selection.runnable.len(), 1);
        assert_eq!(selection.runnable[0].name, "ordinary");
    }

    #[test]
    fn selection_is_scoped_to_stage() {
        let mut registry = TestRegistry::new();
        registry.test("unit test", || async { Ok(()) });
        registry.suite_in(StageName::Integration, "api", |r| {
            r.test("integration test", || async { Ok(()) });
        });

        let unit = registry.stage_cases(StageName::Unit);
        let integration = registry.stage_cases(StageName::Integration);
        assert_eq!(unit.runnable.len(), 1);
        assert_eq!(integration.runnable.len(), 1);
        assert_eq!(integration.runnable[0].name, "integration test");
    }
}
