//! Logical plan nodes (spec §4.8) and the "tree with uniform child
//! accessor" shape spec §9 names explicitly: every node can enumerate its
//! children and rebuild itself with replacements, so the rewrite passes in
//! [`crate::optimizer`] compose generically instead of hand-matching each
//! variant.

use std::sync::Arc;

use colframe_core::{Field, Schema};
use colframe_error::{ColframeError, ColframeResult};
use colframe_expr::Expr;
use colframe_ops::JoinType;
use indexmap::IndexMap;

use crate::source::ScanSource;

/// One node of a logical query plan (spec §4.8's node list, one-to-one).
#[derive(Clone)]
pub enum LogicalPlan {
    Scan {
        source: ScanSource,
        projected_columns: Option<Vec<String>>,
        pushed_predicates: Vec<Expr>,
    },
    Project(Arc<LogicalPlan>, Vec<Expr>),
    Filter(Arc<LogicalPlan>, Expr),
    Sort {
        input: Arc<LogicalPlan>,
        by: Vec<String>,
        descending: Vec<bool>,
        nulls_last: bool,
    },
    Limit(Arc<LogicalPlan>, usize),
    Aggregate {
        input: Arc<LogicalPlan>,
        keys: Vec<String>,
        aggs: IndexMap<String, Expr>,
    },
    Join {
        left: Arc<LogicalPlan>,
        right: Arc<LogicalPlan>,
        kind: JoinType,
        left_keys: Vec<String>,
        right_keys: Vec<String>,
    },
    WithColumn(Arc<LogicalPlan>, String, Expr),
}

impl LogicalPlan {
    pub fn scan(source: ScanSource) -> Self {
        LogicalPlan::Scan {
            source,
            projected_columns: None,
            pushed_predicates: Vec::new(),
        }
    }

    /// This node's direct children, in a fixed order `with_children`
    /// accepts back (spec §9: "each node knows how to list and replace
    /// its children").
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Scan { .. } => vec![],
            LogicalPlan::Project(input, _) => vec![input],
            LogicalPlan::Filter(input, _) => vec![input],
            LogicalPlan::Sort { input, .. } => vec![input],
            LogicalPlan::Limit(input, _) => vec![input],
            LogicalPlan::Aggregate { input, .. } => vec![input],
            LogicalPlan::Join { left, right, .. } => vec![left, right],
            LogicalPlan::WithColumn(input, _, _) => vec![input],
        }
    }

    /// Rebuild this node with new children, same order as [`Self::children`]
    /// (spec §4.8: "every node can ... rebuild itself with new children to
    /// support pure rewrites").
    pub fn with_children(&self, mut new_children: Vec<Arc<LogicalPlan>>) -> LogicalPlan {
        match self {
            LogicalPlan::Scan { .. } => self.clone(),
            LogicalPlan::Project(_, exprs) => LogicalPlan::Project(new_children.remove(0), exprs.clone()),
            LogicalPlan::Filter(_, predicate) => LogicalPlan::Filter(new_children.remove(0), predicate.clone()),
            LogicalPlan::Sort { by, descending, nulls_last, .. } => LogicalPlan::Sort {
                input: new_children.remove(0),
                by: by.clone(),
                descending: descending.clone(),
                nulls_last: *nulls_last,
            },
            LogicalPlan::Limit(_, n) => LogicalPlan::Limit(new_children.remove(0), *n),
            LogicalPlan::Aggregate { keys, aggs, .. } => LogicalPlan::Aggregate {
                input: new_children.remove(0),
                keys: keys.clone(),
                aggs: aggs.clone(),
            },
            LogicalPlan::Join { kind, left_keys, right_keys, .. } => LogicalPlan::Join {
                left: new_children.remove(0),
                right: new_children.remove(0),
                kind: *kind,
                left_keys: left_keys.clone(),
                right_keys: right_keys.clone(),
            },
            LogicalPlan::WithColumn(_, name, expr) => LogicalPlan::WithColumn(new_children.remove(0), name.clone(), expr.clone()),
        }
    }

    /// The output schema this node produces, inferred without
    /// materializing data where the node itself doesn't need to (spec
    /// §4.8: pushdown passes reason about "columns a node needs/produces"
    /// purely from schema).
    pub fn schema(&self) -> ColframeResult<Schema> {
        match self {
            LogicalPlan::Scan { source, projected_columns, .. } => {
                let full = source.schema()?;
                match projected_columns {
                    None => Ok(full),
                    Some(cols) => {
                        let fields = cols
                            .iter()
                            .map(|c| full.get(c).cloned().ok_or_else(|| ColframeError::column_not_found(c)))
                            .collect::<ColframeResult<Vec<_>>>()?;
                        Schema::try_from_fields(fields)
                    },
                }
            },
            LogicalPlan::Project(input, exprs) => {
                let input_schema = input.schema()?;
                let fields = exprs
                    .iter()
                    .map(|e| Ok(Field::new(e.output_name(), e.output_dtype(&input_schema)?)))
                    .collect::<ColframeResult<Vec<_>>>()?;
                Schema::try_from_fields(fields)
            },
            LogicalPlan::Filter(input, _) => input.schema(),
            LogicalPlan::Sort { input, .. } => input.schema(),
            LogicalPlan::Limit(input, _) => input.schema(),
            LogicalPlan::Aggregate { input, keys, aggs } => {
                let input_schema = input.schema()?;
                let mut fields = Vec::with_capacity(keys.len() + aggs.len());
                for k in keys {
                    fields.push(
                        input_schema
                            .get(k)
                            .cloned()
                            .ok_or_else(|| ColframeError::column_not_found(k))?,
                    );
                }
                for (name, expr) in aggs {
                    fields.push(Field::new(name.as_str(), expr.output_dtype(&input_schema)?));
                }
                Schema::try_from_fields(fields)
            },
            LogicalPlan::Join { left, right, left_keys, right_keys, .. } => {
                let ls = left.schema()?;
                let rs = right.schema()?;
                let mut fields: Vec<Field> = ls.iter().cloned().collect();
                let left_names: std::collections::HashSet<&str> = ls.names().collect();
                for f in rs.iter() {
                    if right_keys.contains(&f.name().to_string()) && left_keys.contains(&f.name().to_string()) {
                        continue;
                    }
                    if left_names.contains(f.name()) {
                        fields.push(Field::new(format!("{}_right", f.name()), f.dtype().clone()));
                    } else {
                        fields.push(f.clone());
                    }
                }
                Schema::try_from_fields(fields)
            },
            LogicalPlan::WithColumn(input, name, expr) => {
                let input_schema = input.schema()?;
                let new_dtype = expr.output_dtype(&input_schema)?;
                let mut fields: Vec<Field> = input_schema.iter().cloned().collect();
                match fields.iter().position(|f| f.name() == name.as_str()) {
                    Some(idx) => fields[idx] = Field::new(name.as_str(), new_dtype),
                    None => fields.push(Field::new(name.as_str(), new_dtype)),
                }
                Schema::try_from_fields(fields)
            },
        }
    }

    /// A human-readable indented tree (spec §4.8: "a plan can be
    /// explained ... useful for tests").
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        match self {
            LogicalPlan::Scan { source, projected_columns, pushed_predicates } => {
                out.push_str(&format!("{pad}Scan: {source:?}"));
                if let Some(cols) = projected_columns {
                    out.push_str(&format!(" project={cols:?}"));
                }
                if !pushed_predicates.is_empty() {
                    out.push_str(&format!(" predicates={}", pushed_predicates.len()));
                }
                out.push('\n');
            },
            LogicalPlan::Project(_, exprs) => {
                out.push_str(&format!("{pad}Project: {} expr(s)\n", exprs.len()));
            },
            LogicalPlan::Filter(_, predicate) => {
                out.push_str(&format!("{pad}Filter: {predicate:?}\n"));
            },
            LogicalPlan::Sort { by, descending, .. } => {
                out.push_str(&format!("{pad}Sort: {by:?} desc={descending:?}\n"));
            },
            LogicalPlan::Limit(_, n) => {
                out.push_str(&format!("{pad}Limit: {n}\n"));
            },
            LogicalPlan::Aggregate { keys, aggs, .. } => {
                out.push_str(&format!("{pad}Aggregate: keys={keys:?} aggs={}\n", aggs.len()));
            },
            LogicalPlan::Join { kind, left_keys, right_keys, .. } => {
                out.push_str(&format!("{pad}Join({kind:?}): {left_keys:?} = {right_keys:?}\n"));
            },
            LogicalPlan::WithColumn(_, name, _) => {
                out.push_str(&format!("{pad}WithColumn: {name}\n"));
            },
        }
        for child in self.children() {
            child.explain_into(out, depth + 1);
        }
    }
}
