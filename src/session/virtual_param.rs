//! Virtual parameters
//!
//! A virtual parameter carries no channel data of its own; it is an
//! expression over catalogued parameters, evaluated lap by lap at query
//! time. Expressions are stored in the catalog so every reader of the
//! session sees the same derived values.

use serde::{Deserialize, Serialize};

/// Expression tree of a virtual parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VirtualExpr {
    /// Physical value of a catalogued parameter, held at the evaluation tick
    Source(String),
    /// Linear transform: inner * factor + offset
    Scale {
        expr: Box<VirtualExpr>,
        factor: f64,
        offset: f64,
    },
    /// Sum of sub-expressions
    Sum(Vec<VirtualExpr>),
    /// Left minus right
    Difference(Box<VirtualExpr>, Box<VirtualExpr>),
    /// Number of the lap containing the evaluation tick (0 outside laps)
    LapNumber,
}

impl VirtualExpr {
    pub fn source(identifier: impl Into<String>) -> Self {
        VirtualExpr::Source(identifier.into())
    }

    /// Linear transform of a single source parameter
    pub fn scale(source: impl Into<String>, factor: f64, offset: f64) -> Self {
        VirtualExpr::Scale {
            expr: Box::new(VirtualExpr::Source(source.into())),
            factor,
            offset,
        }
    }

    /// Linear transform of an arbitrary sub-expression
    pub fn scaled(expr: VirtualExpr, factor: f64, offset: f64) -> Self {
        VirtualExpr::Scale {
            expr: Box::new(expr),
            factor,
            offset,
        }
    }

    pub fn sum(exprs: Vec<VirtualExpr>) -> Self {
        VirtualExpr::Sum(exprs)
    }

    pub fn difference(left: VirtualExpr, right: VirtualExpr) -> Self {
        VirtualExpr::Difference(Box::new(left), Box::new(right))
    }

    /// Collect source parameter identifiers, in first-reference order
    pub fn collect_sources(&self, out: &mut Vec<String>) {
        match self {
            VirtualExpr::Source(id) => {
                if !out.iter().any(|s| s == id) {
                    out.push(id.clone());
                }
            }
            VirtualExpr::Scale { expr, .. } => expr.collect_sources(out),
            VirtualExpr::Sum(exprs) => {
                for expr in exprs {
                    expr.collect_sources(out);
                }
            }
            VirtualExpr::Difference(left, right) => {
                left.collect_sources(out);
                right.collect_sources(out);
            }
            VirtualExpr::LapNumber => {}
        }
    }

    /// Evaluate at one tick
    ///
    /// `resolve` supplies the held physical value of a source parameter
    /// at the tick; `lap_number` is the number of the containing lap.
    pub fn evaluate(&self, resolve: &dyn Fn(&str) -> f64, lap_number: f64) -> f64 {
        match self {
            VirtualExpr::Source(id) => resolve(id),
            VirtualExpr::Scale {
                expr,
                factor,
                offset,
            } => expr.evaluate(resolve, lap_number) * factor + offset,
            VirtualExpr::Sum(exprs) => exprs.iter().map(|e| e.evaluate(resolve, lap_number)).sum(),
            VirtualExpr::Difference(left, right) => {
                left.evaluate(resolve, lap_number) - right.evaluate(resolve, lap_number)
            }
            VirtualExpr::LapNumber => lap_number,
        }
    }
}

/// A derived parameter defined by an expression
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VirtualParameter {
    /// Unique identifier (`name:group`, same namespace as real parameters)
    pub identifier: String,
    pub name: String,
    pub group: String,
    pub description: String,
    pub expr: VirtualExpr,
}

impl VirtualParameter {
    pub fn new(name: impl Into<String>, group: impl Into<String>, expr: VirtualExpr) -> Self {
        let name = name.into();
        let group = group.into();
        Self {
            identifier: format!("{}:{}", name, group),
            name,
            group,
            description: String::new(),
            expr,
        }
    }

    /// Builder: set description
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Source parameters this expression reads, in first-reference order
    pub fn source_identifiers(&self) -> Vec<String> {
        let mut sources = Vec::new();
        self.expr.collect_sources(&mut sources);
        sources
    }
}
