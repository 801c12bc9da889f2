//! Lifecycle hooks
//!
//! Four ordered hook sequences per suite. Hooks execute in registration
//! order; a failed hook aborts the remainder of its chain for that
//! invocation.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::TestFailure;

/// A lifecycle hook callable.
pub type HookFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), TestFailure>> + Send + Sync>;

/// The four hook positions around tests and suites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    BeforeAll,
    BeforeEach,
    AfterEach,
    AfterAll,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::BeforeAll => "beforeAll",
            HookKind::BeforeEach => "beforeEach",
            HookKind::AfterEach => "afterEach",
            HookKind::AfterAll => "afterAll",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered hook sequences for one suite scope.
#[derive(Clone, Default)]
pub struct HookSet {
    before_all: Vec<HookFn>,
    before_each: Vec<HookFn>,
    after_each: Vec<HookFn>,
    after_all: Vec<HookFn>,
}

impl HookSet {
    pub fn add(&mut self, kind: HookKind, hook: HookFn) {
        match kind {
            HookKind::BeforeAll => self.before_all.push(hook),
            HookKind::BeforeEach => self.before_each.push(hook),
            HookKind::AfterEach => self.after_each.push(hook),
            HookKind::AfterAll => self.after_all.push(hook),
        }
    }

    pub fn get(&self, kind: HookKind) -> &[HookFn] {
        match kind {
            HookKind::BeforeAll => &self.before_all,
            HookKind::BeforeEach => &self.before_each,
            HookKind::AfterEach => &self.after_each,
            HookKind::AfterAll => &self.after_all,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before_all.is_empty()
            && self.before_each.is_empty()
            && self.after_each.is_empty()
            && self.after_all.is_empty()
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("before_all", &self.before_all.len())
            .field("before_each", &self.before_each.len())
            .field("after_each", &self.after_each.len())
            .field("after_all", &self.after_all.len())
            .finish()
    }
}
