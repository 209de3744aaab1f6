//! Engine tunables.

use std::time::Duration;

/// Configuration for a [`FlowEngine`](crate::engine::FlowEngine).
///
/// Defaults match the deployed questionnaire graphs: 500 ms variable
/// evaluations, 1500 ms ad-hoc evaluations, a 100-row evaluator query cap,
/// strict predicate failures, and `AddressHistory` containers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default sandbox timeout for variable definitions without `timeoutMs`.
    pub variable_timeout: Duration,

    /// Sandbox timeout for ad-hoc evaluations (askWhen, source expressions).
    pub eval_timeout: Duration,

    /// Row cap for evaluator-path graph queries.
    pub row_cap: usize,

    /// When true, `askWhen` evaluation failures are logged and treated as
    /// false instead of failing the walk.
    pub lenient_predicates: bool,

    /// Label identifying container nodes whose answered-question checks are
    /// redirected to the owning parent.
    pub container_label: String,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            variable_timeout: Duration::from_millis(500),
            eval_timeout: Duration::from_millis(1500),
            row_cap: 100,
            lenient_predicates: false,
            container_label: "AddressHistory".to_string(),
        }
    }

    pub fn with_variable_timeout(mut self, timeout: Duration) -> Self {
        self.variable_timeout = timeout;
        self
    }

    pub fn with_eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout = timeout;
        self
    }

    pub fn with_row_cap(mut self, cap: usize) -> Self {
        self.row_cap = cap;
        self
    }

    pub fn with_lenient_predicates(mut self, lenient: bool) -> Self {
        self.lenient_predicates = lenient;
        self
    }

    pub fn with_container_label(mut self, label: impl Into<String>) -> Self {
        self.container_label = label.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
