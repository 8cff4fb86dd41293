use std::sync::atomic::{AtomicU32, Ordering};

/// Generates unique database names for test isolation.
///
/// Each test gets its own MySQL database or PostgreSQL schema named
/// `test_{process_id}_{test_counter}`, so tests running in parallel (within
/// or across processes) never see each other's tables.
#[derive(Clone)]
#[allow(dead_code)] // Only used when server database features are enabled
pub struct TestIsolation {
    process_id: u32,
    test_counter: u32,
}

// Global counter shared across all tests in this process
#[allow(dead_code)]
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

#[allow(dead_code)]
impl TestIsolation {
    pub fn new() -> Self {
        Self {
            process_id: std::process::id(),
            test_counter: TEST_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Name of the database (MySQL) or schema (PostgreSQL) for this test.
    pub fn namespace(&self) -> String {
        format!("test_{}_{}", self.process_id, self.test_counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_are_unique() {
        let a = TestIsolation::new();
        let b = TestIsolation::new();

        assert_ne!(a.namespace(), b.namespace());
        assert!(a.namespace().starts_with("test_"));
        assert!(!a.namespace().contains('-'));
    }
}
