//! Extensible graph store trait for custom backend implementations
//!
//! This module defines the **[`GraphStore`]** trait - the seam between the
//! traversal engine and whatever labeled property graph holds the
//! questionnaire. The engine issues parameterized statements and consumes
//! materialized rows; it never sees sessions, cursors, or driver types.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  askflow-core                                       │
//! │  • traversal, predicates, variable resolution       │
//! │  • issues statements from the catalog + authored    │
//! │    snippets embedded in the questionnaire graph     │
//! └───────────────┬─────────────────────────────────────┘
//!                 │ Gateway (retry, parameter filtering)
//!                 ↓
//! ┌─────────────────────────────────────────────────────┐
//! │  GraphStore trait                                   │
//! │  run(statement, params) → Vec<Record>               │
//! └───────────────┬─────────────────────────────────────┘
//!                 │
//!       ┌─────────┴──────────┐
//!       ↓                    ↓
//!  MemoryGraph          Bolt-backed driver
//!  (bundled, tests/dev) (external collaborator)
//! ```
//!
//! # Implementation requirements
//!
//! - **Materialize** every result inside the session: the returned `Vec` must
//!   be complete before `run` resolves. Never hand out live cursors.
//! - **Preserve identity**: node results must carry the store's stable
//!   element id and/or numeric id; downstream code supports both shapes.
//! - **Preserve labels**: label sets drive Question/Action/container
//!   dispatch in the engine.
//! - **Classify failures**: return [`StoreError`] variants whose
//!   `is_transient()` answer is accurate, because the gateway's retry policy
//!   keys off it.
//!
//! Implementations must be `Send + Sync`; one store instance is shared by
//! every concurrent walk.

use crate::error::Result;
use crate::record::Record;
use crate::value::Params;
use async_trait::async_trait;

/// A labeled property graph that executes parameterized statements.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Execute `statement` with named `params` and return the materialized
    /// result rows.
    async fn run(&self, statement: &str, params: Params) -> Result<Vec<Record>>;
}
