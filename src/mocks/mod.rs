//! Mock/stub/spy subsystem
//!
//! Rust has no property monkey-patching, so replacement happens at an
//! injection seam: subjects-under-test resolve their collaborators through a
//! [`MockRegistry`] keyed by `(target, property)`, and the registry swaps the
//! resolved callable while a mock or stub is active.
//!
//! Capture/restore contract:
//! - the original implementation is captured exactly once per key; nested
//!   `mock` calls on an already-mocked key swap only the active replacement
//! - every new mock/stub/spy session starts with an empty call log
//! - `restore` writes the first original back and is idempotent
//! - there is no automatic cleanup: callers acquire at test start and
//!   restore in `afterEach`, otherwise state leaks across tests
//! - a single lock over the slot map serializes mock/restore per key; tests
//!   that mock the same key must not run concurrently in a parallel stage

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;

/// A replaceable collaborator: positional JSON arguments in, JSON value or
/// error message out.
pub type MockFn = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

type MockKey = (String, String);

struct MockSlot {
    /// First-captured implementation; never overwritten after capture.
    original: MockFn,
    /// Active replacement, `None` when restored or spying.
    replacement: Option<MockFn>,
    /// Whether calls through this slot are appended to the log.
    recording: bool,
    calls: Vec<Vec<Value>>,
}

/// Shared mapping of `(target, property)` to replaceable implementations.
#[derive(Default)]
pub struct MockRegistry {
    slots: Mutex<HashMap<MockKey, MockSlot>>,
}

impl MockRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Install the real implementation for a key. Subjects-under-test call
    /// this once during wiring; mocking an unregistered key falls back to a
    /// null-returning original.
    pub fn register<F>(&self, target: &str, property: &str, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        let mut slots = self.slots.lock().unwrap();
        let key = (target.to_string(), property.to_string());
        match slots.get_mut(&key) {
            // Registering over a live mock would lose the caller's intent;
            // keep the captured original authoritative.
            Some(slot) if slot.replacement.is_some() => {
                warn!("register called for mocked {target}.{property}; ignoring");
            }
            Some(slot) => slot.original = Arc::new(f),
            None => {
                slots.insert(key, MockSlot::new(Arc::new(f)));
            }
        }
    }

    /// Dispatch a call through the seam: the active replacement if one is
    /// installed, the original otherwise. Calls are recorded while a mock or
    /// spy is active.
    pub fn invoke(&self, target: &str, property: &str, args: &[Value]) -> Result<Value, String> {
        let f = {
            let mut slots = self.slots.lock().unwrap();
            let key = (target.to_string(), property.to_string());
            let slot = slots
                .get_mut(&key)
                .ok_or_else(|| format!("no implementation registered for {target}.{property}"))?;
            if slot.recording {
                slot.calls.push(args.to_vec());
            }
            slot.replacement
                .clone()
                .unwrap_or_else(|| slot.original.clone())
        };
        // Lock released before dispatch so an implementation may re-enter
        // the registry.
        f(args)
    }

    /// Replace a key's behavior with a recording mock. Without an explicit
    /// implementation the mock returns `Value::Null`.
    pub fn mock(self: &Arc<Self>, target: &str, property: &str, imp: Option<MockFn>) -> MockHandle {
        let replacement = imp.unwrap_or_else(|| Arc::new(|_: &[Value]| Ok(Value::Null)));
        self.install(target, property, Some(replacement), true);
        MockHandle {
            registry: self.clone(),
            key: (target.to_string(), property.to_string()),
        }
    }

    /// Reversible constant overwrite, no call recording.
    pub fn stub(self: &Arc<Self>, target: &str, property: &str, value: Value) -> StubHandle {
        let replacement: MockFn = Arc::new(move |_: &[Value]| Ok(value.clone()));
        self.install(target, property, Some(replacement), false);
        StubHandle {
            registry: self.clone(),
            key: (target.to_string(), property.to_string()),
        }
    }

    /// Record calls while delegating to the existing implementation.
    pub fn spy(self: &Arc<Self>, target: &str, property: &str) -> SpyHandle {
        self.install(target, property, None, true);
        SpyHandle {
            registry: self.clone(),
            key: (target.to_string(), property.to_string()),
        }
    }

    /// Forget every slot. Only for tearing down between independent runs;
    /// outstanding handles become inert.
    pub fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }

    fn install(&self, target: &str, property: &str, replacement: Option<MockFn>, recording: bool) {
        let mut slots = self.slots.lock().unwrap();
        let key = (target.to_string(), property.to_string());
        match slots.get_mut(&key) {
            // Re-mocking an already-captured pair: the first original is
            // kept, only the active replacement and recording mode change.
            // The call log belongs to the session and starts empty.
            Some(slot) => {
                slot.replacement = replacement;
                slot.recording = recording;
                slot.calls.clear();
            }
            None => {
                let mut slot = MockSlot::new(Arc::new(|_: &[Value]| Ok(Value::Null)));
                slot.replacement = replacement;
                slot.recording = recording;
                slots.insert(key, slot);
            }
        }
    }

    fn set_replacement(&self, key: &MockKey, replacement: MockFn) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(key) {
            slot.replacement = Some(replacement);
        }
    }

    fn restore(&self, key: &MockKey) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(key) {
            // Idempotent: a second restore finds nothing to clear and the
            // first original is never lost.
            slot.replacement = None;
            slot.recording = false;
        }
    }

    fn calls(&self, key: &MockKey) -> Vec<Vec<Value>> {
        let slots = self.slots.lock().unwrap();
        slots.get(key).map(|s| s.calls.clone()).unwrap_or_default()
    }
}

impl MockSlot {
    fn new(original: MockFn) -> Self {
        Self {
            original,
            replacement: None,
            recording: false,
            calls: Vec::new(),
        }
    }
}

/// Handle to an active mock: behavior swapping, call inspection, restore.
pub struct MockHandle {
    registry: Arc<MockRegistry>,
    key: MockKey,
}

impl MockHandle {
    pub fn mock_implementation<F>(&self, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.registry.set_replacement(&self.key, Arc::new(f));
    }

    pub fn mock_return_value(&self, value: Value) {
        self.registry
            .set_replacement(&self.key, Arc::new(move |_: &[Value]| Ok(value.clone())));
    }

    /// Successful settlement; identical to a return value at this seam.
    pub fn mock_resolved_value(&self, value: Value) {
        self.mock_return_value(value);
    }

    /// Failed settlement: every call reports the given error.
    pub fn mock_rejected_value(&self, error: impl Into<String>) {
        let error = error.into();
        self.registry
            .set_replacement(&self.key, Arc::new(move |_: &[Value]| Err(error.clone())));
    }

    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.registry.calls(&self.key)
    }

    pub fn call_count(&self) -> usize {
        self.registry.calls(&self.key).len()
    }

    pub fn was_called_with(&self, args: &[Value]) -> bool {
        self.registry.calls(&self.key).iter().any(|c| c == args)
    }

    pub fn restore(&self) {
        self.registry.restore(&self.key);
    }
}

/// Handle to an active stub.
pub struct StubHandle {
    registry: Arc<MockRegistry>,
    key: MockKey,
}

impl StubHandle {
    pub fn restore(&self) {
        self.registry.restore(&self.key);
    }
}

/// Handle to an active spy.
pub struct SpyHandle {
    registry: Arc<MockRegistry>,
    key: MockKey,
}

impl SpyHandle {
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.registry.calls(&self.key)
    }

    pub fn call_count(&self) -> usize {
        self.registry.calls(&self.key).len()
    }

    pub fn was_called_with(&self, args: &[Value]) -> bool {
        self.registry.calls(&self.key).iter().any(|c| c == args)
    }

    pub fn restore(&self) {
        self.registry.restore(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry_with_adder() -> Arc<MockRegistry> {
        let registry = MockRegistry::new();
        registry.register("math", "add", |args| {
            let a = args[0].as_i64().ok_or("not a number")?;
            let b = args[1].as_i64().ok_or("not a number")?;
            Ok(json!(a + b))
        });
        registry
    }

    #[test]
    fn invoke_dispatches_original() {
        let registry = registry_with_adder();
        let result = registry.invoke("math", "add", &[json!(2), json!(3)]);
        assert_eq!(result, Ok(json!(5)));
    }

    #[test]
    fn mock_replaces_and_restore_reverts() {
        let registry = registry_with_adder();
        let handle = registry.mock("math", "add", None);
        handle.mock_return_value(json!(99));

        assert_eq!(registry.invoke("math", "add", &[json!(2), json!(3)]), Ok(json!(99)));

        handle.restore();
        assert_eq!(registry.invoke("math", "add", &[json!(2), json!(3)]), Ok(json!(5)));
    }

    #[test]
    fn nested_mock_keeps_first_original() {
        let registry = registry_with_adder();
        let first = registry.mock("math", "add", None);
        first.mock_return_value(json!(1));
        let second = registry.mock("math", "add", None);
        second.mock_return_value(json!(2));

        assert_eq!(registry.invoke("math", "add", &[json!(0), json!(0)]), Ok(json!(2)));

        second.restore();
        // Restoration goes all the way back to the pre-mock behavior.
        assert_eq!(registry.invoke("math", "add", &[json!(2), json!(3)]), Ok(json!(5)));
    }

    #[test]
    fn restore_is_idempotent() {
        let registry = registry_with_adder();
        let handle = registry.mock("math", "add", None);
        handle.mock_return_value(json!(7));
        handle.restore();
        handle.restore();
        assert_eq!(registry.invoke("math", "add", &[json!(2), json!(3)]), Ok(json!(5)));
    }

    #[test]
    fn mock_records_calls() {
        let registry = registry_with_adder();
        let handle = registry.mock("math", "add", None);

        registry.invoke("math", "add", &[json!(1), json!(2)]).unwrap();
        registry.invoke("math", "add", &[json!(3), json!(4)]).unwrap();

        assert_eq!(handle.call_count(), 2);
        assert!(handle.was_called_with(&[json!(3), json!(4)]));
        assert!(!handle.was_called_with(&[json!(9), json!(9)]));
    }

    #[test]
    fn fresh_mock_starts_with_empty_call_log() {
        let registry = registry_with_adder();
        let first = registry.mock("math", "add", None);
        registry.invoke("math", "add", &[json!(1), json!(1)]).unwrap();
        assert_eq!(first.call_count(), 1);
        first.restore();

        // a new session on the same key must not inherit recorded calls
        let second = registry.mock("math", "add", None);
        assert_eq!(second.call_count(), 0);

        registry.invoke("math", "add", &[json!(2), json!(2)]).unwrap();
        assert_eq!(second.call_count(), 1);
        second.restore();
    }

    #[test]
    fn mock_rejected_value_errors() {
        let registry = registry_with_adder();
        let handle = registry.mock("math", "add", None);
        handle.mock_rejected_value("backend down");

        assert_eq!(
            registry.invoke("math", "add", &[json!(1), json!(1)]),
            Err("backend down".to_string())
        );
        handle.restore();
    }

    #[test]
    fn stub_overwrites_without_recording() {
        let registry = registry_with_adder();
        let stub = registry.stub("math", "add", json!(0));

        assert_eq!(registry.invoke("math", "add", &[json!(1), json!(1)]), Ok(json!(0)));

        stub.restore();
        assert_eq!(registry.invoke("math", "add", &[json!(1), json!(1)]), Ok(json!(2)));
    }

    #[test]
    fn spy_delegates_and_records() {
        let registry = registry_with_adder();
        let spy = registry.spy("math", "add");

        assert_eq!(registry.invoke("math", "add", &[json!(2), json!(3)]), Ok(json!(5)));
        assert_eq!(spy.call_count(), 1);
        assert!(spy.was_called_with(&[json!(2), json!(3)]));
        spy.restore();
    }

    #[test]
    fn invoke_unregistered_key_errors() {
        let registry = MockRegistry::new();
        let result = registry.invoke("ghost", "call", &[]);
        assert!(result.unwrap_err().contains("no implementation registered"));
    }

    #[test]
    fn mock_with_explicit_implementation_delegates() {
        let registry = registry_with_adder();
        let imp: MockFn = Arc::new(|args| Ok(json!(args.len())));
        let handle = registry.mock("math", "add", Some(imp));

        assert_eq!(registry.invoke("math", "add", &[json!(1), json!(2)]), Ok(json!(2)));
        handle.restore();
    }
}
