//! askflow-core - graph-driven questionnaire traversal engine
//!
//! A questionnaire is a directed graph of Sections, Questions, and Actions
//! whose edges carry ordering, conditional predicates, variable definitions,
//! and source-node expressions. Given a starting Section and an execution
//! context, [`FlowEngine::walk`] returns exactly one of: the next unanswered
//! Question, a jump to another Section, the ids of newly created nodes, or a
//! completion signal.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  FlowEngine::walk(section_id, params)                    │
//! │  • load Section, resolve its source node                 │
//! │  • install Section variable definitions                  │
//! └─────────────┬────────────────────────────────────────────┘
//!               ↓
//! ┌──────────────────────────────────────────────────────────┐
//! │  traversal: ordered depth-first edge walk                │
//! │  per edge: merge vars → propagate source → askWhen       │
//! │  dispatch: Question stop/descend · Action · next edge    │
//! └───┬──────────────┬──────────────┬────────────────────────┘
//!     ↓              ↓              ↓
//!  predicate      resolver       answered
//!  (askWhen)      (lazy vars)    (supply patterns)
//!     └──────┬───────┘
//!            ↓
//! ┌──────────────────────────────────────────────────────────┐
//! │  eval: shared substitution pipeline                      │
//! │  template {{ ... }} → literals → quote normalization     │
//! │  cypher → Gateway (row cap)    script → rhai Sandbox     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is stateless across calls - all durable state lives in the
//! graph store behind [`askflow_graph::GraphStore`]. Within one walk,
//! variable resolution is memoized and edge order is deterministic, so a
//! walk over a fixed graph state is reproducible.

pub mod action;
pub mod answered;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod eval;
pub mod model;
pub mod predicate;
pub mod resolver;
pub mod sandbox;
pub mod source;
pub mod template;
pub mod traversal;

pub use config::EngineConfig;
pub use context::{Context, VarSlot};
pub use engine::FlowEngine;
pub use error::{FlowError, Result};
pub use model::{
    ActionKind, EngineResponse, EvaluatorKind, QuestionRef, VarValue, VariableDef, Warning,
};
pub use sandbox::Sandbox;
