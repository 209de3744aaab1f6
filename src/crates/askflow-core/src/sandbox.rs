//! Sandboxed expression evaluation
//!
//! Script-target snippets (`askWhen` predicates, variable definitions,
//! source expressions) are evaluated by an embedded rhai engine built fresh
//! for every call - workers are never shared across walks. The sandbox is
//! locked down along three axes:
//!
//! - **Surface**: a raw engine plus the standard operator package, with no
//!   module resolver (so `import` fails), `eval` disabled, and a small
//!   whitelist of registered helpers: `len`, `min`, `max`, `sum`, `sorted`,
//!   regex matching, and date arithmetic.
//! - **Shape**: only expressions compile. Statements (`let`, loops, function
//!   definitions) are rejected as a [`FlowError::Security`] violation, as
//!   are unresolved names.
//! - **Time and size**: expression depth, string/array/map sizes, and an
//!   operation-progress deadline are bounded. The evaluation runs on a
//!   blocking worker wrapped in `tokio::time::timeout`; whichever boundary
//!   trips first surfaces [`FlowError::EvaluatorTimeout`], and the progress
//!   deadline guarantees an already-detached worker terminates itself too.

use crate::error::FlowError;
use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use rhai::packages::{Package, StandardPackage};
use rhai::{Array, Dynamic, Engine, EvalAltResult, Scope};
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

type Helper = dyn Fn(&mut Engine) + Send + Sync;

/// Sandboxed evaluator for script-target snippets.
#[derive(Clone, Default)]
pub struct Sandbox {
    helpers: Vec<Arc<Helper>>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional host function hook, applied to every engine
    /// this sandbox builds. Deployments use this to expose domain helpers to
    /// questionnaire authors.
    pub fn with_helper(mut self, helper: impl Fn(&mut Engine) + Send + Sync + 'static) -> Self {
        self.helpers.push(Arc::new(helper));
        self
    }

    /// Evaluate `snippet` as a single expression against `scope`, within
    /// `timeout`. Returns the result as JSON.
    pub async fn eval(
        &self,
        snippet: &str,
        scope: Vec<(String, Json)>,
        timeout: Duration,
    ) -> Result<Json, FlowError> {
        let snippet = snippet.trim().to_string();
        if snippet.is_empty() {
            return Err(FlowError::Contract("empty expression".to_string()));
        }

        let helpers = self.helpers.clone();
        let ms = timeout.as_millis() as u64;

        let worker = tokio::task::spawn_blocking(move || -> Result<Json, FlowError> {
            let engine = build_engine(&helpers, timeout);

            let ast = engine
                .compile_expression(&snippet)
                .map_err(|err| FlowError::Security(format!("not a valid expression: {err}")))?;

            let mut scope_values = Scope::new();
            for (name, value) in scope {
                let dynamic = rhai::serde::to_dynamic(&value)
                    .map_err(|err| FlowError::Evaluation(format!("scope value '{name}': {err}")))?;
                scope_values.push_dynamic(name, dynamic);
            }

            let result = engine
                .eval_ast_with_scope::<Dynamic>(&mut scope_values, &ast)
                .map_err(|err| map_eval_error(err, ms))?;

            rhai::serde::from_dynamic::<Json>(&result)
                .map_err(|err| FlowError::Evaluation(format!("unserializable result: {err}")))
        });

        match tokio::time::timeout(timeout, worker).await {
            Err(_) => Err(FlowError::EvaluatorTimeout { ms }),
            Ok(Err(join_err)) => Err(FlowError::Evaluation(format!(
                "sandbox worker failed: {join_err}"
            ))),
            Ok(Ok(result)) => result,
        }
    }
}

fn build_engine(helpers: &[Arc<Helper>], timeout: Duration) -> Engine {
    let mut engine = Engine::new_raw();
    engine.register_global_module(StandardPackage::new().as_shared_module());
    engine.disable_symbol("eval");
    engine.set_max_expr_depths(64, 32);
    engine.set_max_string_size(64 * 1024);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(10_000);

    let deadline = Instant::now() + timeout;
    engine.on_progress(move |_| {
        if Instant::now() >= deadline {
            Some(Dynamic::UNIT)
        } else {
            None
        }
    });

    register_builtins(&mut engine);
    for helper in helpers {
        helper(&mut engine);
    }
    engine
}

fn map_eval_error(err: Box<EvalAltResult>, ms: u64) -> FlowError {
    match *err {
        EvalAltResult::ErrorTerminated(_, _) => FlowError::EvaluatorTimeout { ms },
        EvalAltResult::ErrorVariableNotFound(ref name, _) => {
            FlowError::Security(format!("unresolved name '{name}'"))
        }
        EvalAltResult::ErrorFunctionNotFound(ref signature, _) => {
            FlowError::Security(format!("function not allowed: {signature}"))
        }
        ref other => FlowError::Evaluation(other.to_string()),
    }
}

fn register_builtins(engine: &mut Engine) {
    engine.register_fn("len", |s: &str| s.chars().count() as i64);
    engine.register_fn("len", |arr: Array| arr.len() as i64);
    engine.register_fn("len", |map: rhai::Map| map.len() as i64);

    engine.register_fn("min", |a: i64, b: i64| a.min(b));
    engine.register_fn("max", |a: i64, b: i64| a.max(b));
    engine.register_fn("min", |a: f64, b: f64| a.min(b));
    engine.register_fn("max", |a: f64, b: f64| a.max(b));
    engine.register_fn("min", |arr: Array| extremum(arr, Ordering::Less));
    engine.register_fn("max", |arr: Array| extremum(arr, Ordering::Greater));
    engine.register_fn("sum", array_sum);
    engine.register_fn("sorted", array_sorted);

    engine.register_fn(
        "regex_is_match",
        |pattern: &str, text: &str| -> Result<bool, Box<EvalAltResult>> {
            let re = Regex::new(pattern).map_err(|err| err.to_string())?;
            Ok(re.is_match(text))
        },
    );
    engine.register_fn(
        "regex_find",
        |pattern: &str, text: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let re = Regex::new(pattern).map_err(|err| err.to_string())?;
            Ok(re
                .find(text)
                .map(|m| Dynamic::from(m.as_str().to_string()))
                .unwrap_or(Dynamic::UNIT))
        },
    );

    engine.register_fn("today_iso", || Utc::now().date_naive().to_string());
    engine.register_fn("current_year", || Utc::now().year() as i64);
    engine.register_fn(
        "date_from_iso",
        |s: &str| -> Result<String, Box<EvalAltResult>> {
            Ok(parse_iso_date(s)?.to_string())
        },
    );
    engine.register_fn(
        "days_between",
        |from: &str, to: &str| -> Result<i64, Box<EvalAltResult>> {
            let from = parse_iso_date(from)?;
            let to = parse_iso_date(to)?;
            Ok((to - from).num_days())
        },
    );
}

fn parse_iso_date(s: &str) -> Result<NaiveDate, Box<EvalAltResult>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|err| Box::<EvalAltResult>::from(format!("invalid ISO date '{s}': {err}")))
}

fn compare(a: &Dynamic, b: &Dynamic) -> Result<Ordering, Box<EvalAltResult>> {
    if let (Ok(x), Ok(y)) = (a.as_int(), b.as_int()) {
        return Ok(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal));
    }
    if a.is_string() && b.is_string() {
        let x = a.clone().into_string().unwrap_or_default();
        let y = b.clone().into_string().unwrap_or_default();
        return Ok(x.cmp(&y));
    }
    Err("values are not comparable".to_string().into())
}

fn as_number(v: &Dynamic) -> Option<f64> {
    v.as_int().ok().map(|i| i as f64).or_else(|| v.as_float().ok())
}

fn extremum(arr: Array, want: Ordering) -> Result<Dynamic, Box<EvalAltResult>> {
    let mut iter = arr.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| Box::<EvalAltResult>::from("min/max of empty array".to_string()))?;
    for item in iter {
        if compare(&item, &best)? == want {
            best = item;
        }
    }
    Ok(best)
}

fn array_sum(arr: Array) -> Result<Dynamic, Box<EvalAltResult>> {
    let mut int_sum: i64 = 0;
    let mut float_sum = 0.0;
    let mut all_ints = true;
    for item in &arr {
        if let Ok(i) = item.as_int() {
            int_sum += i;
            float_sum += i as f64;
        } else if let Ok(f) = item.as_float() {
            all_ints = false;
            float_sum += f;
        } else {
            return Err("sum expects numbers".to_string().into());
        }
    }
    Ok(if all_ints {
        Dynamic::from(int_sum)
    } else {
        Dynamic::from(float_sum)
    })
}

fn array_sorted(arr: Array) -> Result<Array, Box<EvalAltResult>> {
    let mut items = arr;
    let mut failure: Option<Box<EvalAltResult>> = None;
    items.sort_by(|a, b| match compare(a, b) {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(items),
    }
}
