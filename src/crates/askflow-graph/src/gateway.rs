//! Gateway - retrying, parameter-filtering front door to the graph store.
//!
//! Every statement the engine issues goes through here. The gateway:
//!
//! - strips parameters the store cannot accept (graph entities, private
//!   `__`-prefixed keys) before dispatch,
//! - retries transient failures per the configured [`RetryPolicy`],
//! - optionally enforces a row cap for evaluator-path queries.
//!
//! Non-transient errors surface immediately; transient errors surface once
//! the attempt budget is exhausted.

use crate::error::{Result, StoreError};
use crate::record::Record;
use crate::retry::RetryPolicy;
use crate::store::GraphStore;
use crate::value::Params;
use std::sync::Arc;

/// Retrying wrapper around a [`GraphStore`].
#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn GraphStore>,
    policy: RetryPolicy,
}

impl Gateway {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Execute `statement`, retrying transient failures with backoff.
    pub async fn run(&self, statement: &str, params: Params) -> Result<Vec<Record>> {
        let params = filter_params(params);
        let mut attempt = 0usize;
        loop {
            match self.store.run(statement, params.clone()).await {
                Ok(records) => return Ok(records),
                Err(err) if err.is_transient() && self.policy.should_retry(attempt + 1) => {
                    let delay = self.policy.calculate_delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient store error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Execute `statement` and fail with [`StoreError::RowCap`] if the
    /// result exceeds `cap` rows. Used for the evaluator query path.
    pub async fn run_bounded(
        &self,
        statement: &str,
        params: Params,
        cap: usize,
    ) -> Result<Vec<Record>> {
        let records = self.run(statement, params).await?;
        if records.len() > cap {
            return Err(StoreError::RowCap {
                returned: records.len(),
                cap,
            });
        }
        Ok(records)
    }
}

/// Drop parameters the store driver would reject: private `__`-prefixed keys
/// and graph entities (nodes, relationships, paths).
fn filter_params(params: Params) -> Params {
    params
        .into_iter()
        .filter(|(key, value)| !key.starts_with("__") && !value.is_graph_entity())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{GraphNode, GraphValue};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    /// Store that fails a configurable number of times before succeeding,
    /// recording the parameters it saw.
    struct FlakyStore {
        failures_left: Mutex<usize>,
        transient: bool,
        seen_params: Mutex<Vec<Params>>,
    }

    impl FlakyStore {
        fn new(failures: usize, transient: bool) -> Self {
            Self {
                failures_left: Mutex::new(failures),
                transient,
                seen_params: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GraphStore for FlakyStore {
        async fn run(&self, _statement: &str, params: Params) -> Result<Vec<Record>> {
            self.seen_params.lock().push(params);
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(if self.transient {
                    StoreError::Unavailable("simulated outage".into())
                } else {
                    StoreError::Query("bad statement".into())
                });
            }
            Ok(vec![Record::from_pairs(vec![(
                "ok".to_string(),
                GraphValue::Bool(true),
            )])])
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3)
            .with_initial_interval(std::time::Duration::from_millis(1))
            .with_jitter(false)
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let store = Arc::new(FlakyStore::new(2, true));
        let gateway = Gateway::new(store.clone()).with_policy(fast_policy());

        let records = gateway.run("RETURN 1", Params::new()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(store.seen_params.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempt_budget() {
        let store = Arc::new(FlakyStore::new(10, true));
        let gateway = Gateway::new(store.clone()).with_policy(fast_policy());

        let err = gateway.run("RETURN 1", Params::new()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.seen_params.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_non_transient_fails_immediately() {
        let store = Arc::new(FlakyStore::new(10, false));
        let gateway = Gateway::new(store.clone()).with_policy(fast_policy());

        let err = gateway.run("RETURN 1", Params::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
        assert_eq!(store.seen_params.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_filters_private_and_entity_params() {
        let store = Arc::new(FlakyStore::new(0, true));
        let gateway = Gateway::new(store.clone());

        let mut params = Params::new();
        params.insert("keep".into(), GraphValue::Int(1));
        params.insert("__private".into(), GraphValue::Int(2));
        params.insert(
            "node".into(),
            GraphValue::Node(GraphNode {
                id: 1,
                element_id: "mem:1".into(),
                labels: vec![],
                properties: BTreeMap::new(),
            }),
        );

        gateway.run("RETURN 1", params).await.unwrap();
        let seen = store.seen_params.lock();
        assert_eq!(seen[0].len(), 1);
        assert!(seen[0].contains_key("keep"));
    }

    #[tokio::test]
    async fn test_row_cap_enforced() {
        struct ManyRows;
        #[async_trait]
        impl GraphStore for ManyRows {
            async fn run(&self, _s: &str, _p: Params) -> Result<Vec<Record>> {
                Ok((0..5)
                    .map(|i| Record::from_pairs(vec![("n".to_string(), GraphValue::Int(i))]))
                    .collect())
            }
        }

        let gateway = Gateway::new(Arc::new(ManyRows));
        let err = gateway
            .run_bounded("RETURN n", Params::new(), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RowCap { returned: 5, cap: 4 }));

        let ok = gateway.run_bounded("RETURN n", Params::new(), 5).await;
        assert_eq!(ok.unwrap().len(), 5);
    }
}
