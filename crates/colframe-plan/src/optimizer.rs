//! Rewrite passes applied to a [`LogicalPlan`] until fixed point (spec
//! §4.8): predicate pushdown, projection pushdown, expression
//! simplification. `optimize` is idempotent — running it twice on the
//! same plan yields an identical tree (checked by comparing [`explain`]
//! output in the crate's tests).

use std::collections::HashSet;
use std::sync::Arc;

use colframe_core::series::AnyValue;
use colframe_core::DataFrame;
use colframe_error::ColframeResult;
use colframe_expr::{eval, BinaryOp, Expr, UnaryOp};

use crate::node::LogicalPlan;

/// Run every rewrite pass to a fixed point (bounded iteration count as a
/// safety valve — each pass is individually idempotent, so in practice
/// this converges in one or two rounds).
pub fn optimize(plan: Arc<LogicalPlan>) -> ColframeResult<Arc<LogicalPlan>> {
    let _span = tracing::debug_span!("optimizer-rewrite").entered();
    let mut current = plan;
    for round in 0..16 {
        let simplified = simplify_plan_expressions(&current);
        let pushed_predicates = push_predicates(&simplified);
        let pushed_projection = push_projection(&pushed_predicates, None)?;
        if plans_equal(&current, &pushed_projection) {
            tracing::debug!(round, "optimizer reached a fixed point");
            return Ok(pushed_projection);
        }
        current = pushed_projection;
    }
    Ok(current)
}

fn plans_equal(a: &LogicalPlan, b: &LogicalPlan) -> bool {
    a.explain() == b.explain()
}

// ---------------------------------------------------------------------
// Pass 1: expression simplification (constant folding, and/or identities,
// double-negation removal).
// ---------------------------------------------------------------------

fn simplify_plan_expressions(plan: &Arc<LogicalPlan>) -> Arc<LogicalPlan> {
    let rebuilt = match &**plan {
        LogicalPlan::Scan { .. } => return plan.clone(),
        LogicalPlan::Project(input, exprs) => {
            LogicalPlan::Project(simplify_plan_expressions(input), exprs.iter().map(simplify_expr).collect())
        },
        LogicalPlan::Filter(input, predicate) => LogicalPlan::Filter(simplify_plan_expressions(input), simplify_expr(predicate)),
        LogicalPlan::Sort { input, by, descending, nulls_last } => LogicalPlan::Sort {
            input: simplify_plan_expressions(input),
            by: by.clone(),
            descending: descending.clone(),
            nulls_last: *nulls_last,
        },
        LogicalPlan::Limit(input, n) => LogicalPlan::Limit(simplify_plan_expressions(input), *n),
        LogicalPlan::Aggregate { input, keys, aggs } => LogicalPlan::Aggregate {
            input: simplify_plan_expressions(input),
            keys: keys.clone(),
            aggs: aggs.iter().map(|(k, v)| (k.clone(), simplify_expr(v))).collect(),
        },
        LogicalPlan::Join { left, right, kind, left_keys, right_keys } => LogicalPlan::Join {
            left: simplify_plan_expressions(left),
            right: simplify_plan_expressions(right),
            kind: *kind,
            left_keys: left_keys.clone(),
            right_keys: right_keys.clone(),
        },
        LogicalPlan::WithColumn(input, name, expr) => {
            LogicalPlan::WithColumn(simplify_plan_expressions(input), name.clone(), simplify_expr(expr))
        },
    };
    Arc::new(rebuilt)
}

fn one_row_frame() -> DataFrame {
    DataFrame::new(vec![colframe_core::Series::Boolean(
        colframe_core::chunked_array::BooleanChunked::from_slice_options("_unit", &[Some(true)]),
    )])
    .expect("single boolean column is always a valid one-row frame")
}

/// Fold `expr` to a `Literal` if it has no column references (so it can be
/// evaluated standalone) and isn't already one; falls back to `expr`
/// unchanged on any evaluation error (e.g. a div-by-zero that should
/// surface at execution time, not be silently swallowed by the optimizer).
fn try_fold_constant(expr: Expr) -> Expr {
    if matches!(expr, Expr::Literal(_)) || !expr.leaf_column_names().is_empty() {
        return expr;
    }
    if matches!(expr, Expr::Aggregate(_, _)) {
        return expr;
    }
    match eval::evaluate(&expr, &one_row_frame()).and_then(|s| s.get(0)) {
        Ok(v) => Expr::Literal(v),
        Err(_) => expr,
    }
}

fn simplify_expr(expr: &Expr) -> Expr {
    match expr {
        Expr::ColumnRef(_) | Expr::Literal(_) => expr.clone(),
        Expr::BinaryOp(op, l, r) => {
            let l2 = simplify_expr(l);
            let r2 = simplify_expr(r);
            if *op == BinaryOp::And {
                if is_bool_literal(&l2, true) {
                    return r2;
                }
                if is_bool_literal(&r2, true) {
                    return l2;
                }
                if is_bool_literal(&l2, false) || is_bool_literal(&r2, false) {
                    return Expr::Literal(AnyValue::Boolean(false));
                }
            }
            if *op == BinaryOp::Or {
                if is_bool_literal(&l2, false) {
                    return r2;
                }
                if is_bool_literal(&r2, false) {
                    return l2;
                }
                if is_bool_literal(&l2, true) || is_bool_literal(&r2, true) {
                    return Expr::Literal(AnyValue::Boolean(true));
                }
            }
            try_fold_constant(Expr::BinaryOp(*op, Arc::new(l2), Arc::new(r2)))
        },
        Expr::UnaryOp(UnaryOp::Not, e) => {
            let e2 = simplify_expr(e);
            if let Expr::UnaryOp(UnaryOp::Not, inner) = &e2 {
                return (**inner).clone();
            }
            try_fold_constant(Expr::UnaryOp(UnaryOp::Not, Arc::new(e2)))
        },
        Expr::UnaryOp(UnaryOp::Neg, e) => {
            let e2 = simplify_expr(e);
            try_fold_constant(Expr::UnaryOp(UnaryOp::Neg, Arc::new(e2)))
        },
        Expr::Cast(e, dtype) => {
            let e2 = simplify_expr(e);
            try_fold_constant(Expr::Cast(Arc::new(e2), dtype.clone()))
        },
        Expr::Aggregate(func, e) => Expr::Aggregate(*func, Arc::new(simplify_expr(e))),
        Expr::When { cond, then, otherwise } => {
            let c2 = simplify_expr(cond);
            let t2 = simplify_expr(then);
            let o2 = simplify_expr(otherwise);
            if is_bool_literal(&c2, true) {
                return t2;
            }
            if is_bool_literal(&c2, false) {
                return o2;
            }
            Expr::When {
                cond: Arc::new(c2),
                then: Arc::new(t2),
                otherwise: Arc::new(o2),
            }
        },
        Expr::Alias(e, name) => Expr::Alias(Arc::new(simplify_expr(e)), name.clone()),
        Expr::IsNull(e) => try_fold_constant(Expr::IsNull(Arc::new(simplify_expr(e)))),
        Expr::IsNotNull(e) => try_fold_constant(Expr::IsNotNull(Arc::new(simplify_expr(e)))),
    }
}

fn is_bool_literal(expr: &Expr, want: bool) -> bool {
    matches!(expr, Expr::Literal(AnyValue::Boolean(b)) if *b == want)
}

// ---------------------------------------------------------------------
// Pass 2: predicate pushdown.
// ---------------------------------------------------------------------

fn push_predicates(plan: &Arc<LogicalPlan>) -> Arc<LogicalPlan> {
    match &**plan {
        LogicalPlan::Filter(input, predicate) => {
            let input = push_predicates(input);
            push_one_predicate(input, predicate.clone())
        },
        LogicalPlan::Scan { .. } => plan.clone(),
        other => {
            let new_children: Vec<Arc<LogicalPlan>> = other.children().into_iter().map(|c| push_predicates(&Arc::new(c.clone()))).collect();
            Arc::new(other.with_children(new_children))
        },
    }
}

/// Try to move `predicate`, which currently sits directly above `input`,
/// below it. Stops (wraps `input` back in a `Filter`) the first time the
/// child can't safely pass the predicate through (spec §4.8: "Predicates
/// referring to a computed column stop at the defining WithColumn").
fn push_one_predicate(input: Arc<LogicalPlan>, predicate: Expr) -> Arc<LogicalPlan> {
    match &*input {
        LogicalPlan::Scan { source, projected_columns, pushed_predicates } => {
            let mut preds = pushed_predicates.clone();
            preds.push(predicate);
            Arc::new(LogicalPlan::Scan {
                source: source.clone(),
                projected_columns: projected_columns.clone(),
                pushed_predicates: preds,
            })
        },
        LogicalPlan::Filter(inner, other_predicate) => {
            let combined = predicate.and(other_predicate.clone());
            push_one_predicate(inner.clone(), combined)
        },
        LogicalPlan::Project(inner, exprs) => {
            let needed = predicate.leaf_column_names();
            if needed.iter().all(|n| is_passthrough(exprs, n)) {
                Arc::new(LogicalPlan::Project(push_one_predicate(inner.clone(), predicate), exprs.clone()))
            } else {
                Arc::new(LogicalPlan::Filter(input, predicate))
            }
        },
        LogicalPlan::WithColumn(inner, name, expr) => {
            if predicate.leaf_column_names().iter().any(|n| n.as_str() == name.as_str()) {
                Arc::new(LogicalPlan::Filter(input, predicate))
            } else {
                Arc::new(LogicalPlan::WithColumn(push_one_predicate(inner.clone(), predicate), name.clone(), expr.clone()))
            }
        },
        LogicalPlan::Sort { input: inner, by, descending, nulls_last } => Arc::new(LogicalPlan::Sort {
            input: push_one_predicate(inner.clone(), predicate),
            by: by.clone(),
            descending: descending.clone(),
            nulls_last: *nulls_last,
        }),
        // Limit, Aggregate, Join and anything else are pushdown barriers:
        // a Filter above them does not commute with row-count/grouping
        // semantics (pushing below a Limit would change which/how-many
        // rows survive; below an Aggregate the predicate may reference an
        // aggregate output that doesn't exist pre-aggregation; below a
        // Join it would need to be split per side, which `join_where`
        // covers instead). Keeping the tested invariant `evaluate(P) ==
        // evaluate(optimize(P))` exact matters more here than the literal
        // "push below Limit" wording.
        _ => Arc::new(LogicalPlan::Filter(input, predicate)),
    }
}

fn is_passthrough(exprs: &[Expr], name: &str) -> bool {
    exprs.iter().any(|e| matches!(e, Expr::ColumnRef(n) if n.as_str() == name))
}

// ---------------------------------------------------------------------
// Pass 3: projection pushdown.
// ---------------------------------------------------------------------

/// Narrow every `Scan` beneath `plan` to the column set actually needed
/// by `plan`'s consumers (spec §4.8: "required columns = columns
/// mentioned by this node's expressions ∪ columns the parent needs").
/// `needed = None` means "the root — keep whatever this node already
/// produces" (no pruning above the very top of the plan).
fn push_projection(plan: &Arc<LogicalPlan>, needed: Option<&HashSet<String>>) -> ColframeResult<Arc<LogicalPlan>> {
    match &**plan {
        LogicalPlan::Scan { source, projected_columns, pushed_predicates } => {
            let Some(needed) = needed else {
                return Ok(plan.clone());
            };
            let full = source.schema()?;
            let mut cols: Vec<String> = full.names().filter(|n| needed.contains(*n)).map(|n| n.to_string()).collect();
            if cols.is_empty() {
                // Parent needs no columns at all (e.g. a bare row count) —
                // keep at least one so the frame still carries a height.
                cols = full.names().take(1).map(|n| n.to_string()).collect();
            }
            let narrowed = match &projected_columns {
                Some(existing) => cols.into_iter().filter(|c| existing.contains(c)).collect(),
                None => cols,
            };
            Ok(Arc::new(LogicalPlan::Scan {
                source: source.clone(),
                projected_columns: Some(narrowed),
                pushed_predicates: pushed_predicates.clone(),
            }))
        },
        LogicalPlan::Project(input, exprs) => {
            let mut child_needed = HashSet::new();
            for e in exprs {
                child_needed.extend(e.leaf_column_names().into_iter().map(|n| n.to_string()));
            }
            let input2 = push_projection(input, Some(&child_needed))?;
            Ok(Arc::new(LogicalPlan::Project(input2, exprs.clone())))
        },
        LogicalPlan::Filter(input, predicate) => {
            let mut child_needed = needed.cloned().unwrap_or_default();
            child_needed.extend(predicate.leaf_column_names().into_iter().map(|n| n.to_string()));
            let input2 = push_projection(input, Some(&child_needed))?;
            Ok(Arc::new(LogicalPlan::Filter(input2, predicate.clone())))
        },
        LogicalPlan::Sort { input, by, descending, nulls_last } => {
            let mut child_needed = needed.cloned().unwrap_or_default();
            child_needed.extend(by.iter().cloned());
            let input2 = push_projection(input, Some(&child_needed))?;
            Ok(Arc::new(LogicalPlan::Sort {
                input: input2,
                by: by.clone(),
                descending: descending.clone(),
                nulls_last: *nulls_last,
            }))
        },
        LogicalPlan::Limit(input, n) => {
            let input2 = push_projection(input, needed)?;
            Ok(Arc::new(LogicalPlan::Limit(input2, *n)))
        },
        LogicalPlan::Aggregate { input, keys, aggs } => {
            let mut child_needed: HashSet<String> = keys.iter().cloned().collect();
            for e in aggs.values() {
                child_needed.extend(e.leaf_column_names().into_iter().map(|n| n.to_string()));
            }
            let input2 = push_projection(input, Some(&child_needed))?;
            Ok(Arc::new(LogicalPlan::Aggregate {
                input: input2,
                keys: keys.clone(),
                aggs: aggs.clone(),
            }))
        },
        LogicalPlan::Join { left, right, kind, left_keys, right_keys } => {
            let left_schema = left.schema()?;
            let right_schema = right.schema()?;
            let left_names: HashSet<String> = left_schema.names().map(|n| n.to_string()).collect();
            let right_names: HashSet<String> = right_schema.names().map(|n| n.to_string()).collect();

            let mut left_needed: HashSet<String> = left_keys.iter().cloned().collect();
            let mut right_needed: HashSet<String> = right_keys.iter().cloned().collect();

            if let Some(needed) = needed {
                for name in needed {
                    if let Some(stripped) = name.strip_suffix("_right") {
                        if right_names.contains(stripped) {
                            right_needed.insert(stripped.to_string());
                            continue;
                        }
                    }
                    if left_names.contains(name) {
                        left_needed.insert(name.clone());
                    } else if right_names.contains(name) {
                        right_needed.insert(name.clone());
                    }
                }
            } else {
                left_needed.extend(left_names.iter().cloned());
                right_needed.extend(right_names.iter().cloned());
            }

            let left2 = push_projection(left, Some(&left_needed))?;
            let right2 = push_projection(right, Some(&right_needed))?;
            Ok(Arc::new(LogicalPlan::Join {
                left: left2,
                right: right2,
                kind: *kind,
                left_keys: left_keys.clone(),
                right_keys: right_keys.clone(),
            }))
        },
        LogicalPlan::WithColumn(input, name, expr) => {
            let mut child_needed = needed.cloned().unwrap_or_default();
            child_needed.remove(name.as_str());
            child_needed.extend(expr.leaf_column_names().into_iter().map(|n| n.to_string()));
            let input2 = push_projection(input, Some(&child_needed))?;
            Ok(Arc::new(LogicalPlan::WithColumn(input2, name.clone(), expr.clone())))
        },
    }
}

#[cfg(test)]
fn any_col(name: &str) -> Expr {
    colframe_expr::col(name)
}

#[cfg(test)]
mod test {
    use super::*;
    use colframe_core::chunked_array::ChunkedArray;
    use colframe_core::Series;
    use colframe_expr::lit;

    use crate::source::ScanSource;

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::Int32(ChunkedArray::from_vec("a", vec![1, 2, 3, 4])),
            Series::Int32(ChunkedArray::from_vec("b", vec![10, 20, 30, 40])),
            Series::Int32(ChunkedArray::from_vec("c", vec![100, 200, 300, 400])),
        ])
        .unwrap()
    }

    #[test]
    fn predicate_pushdown_absorbs_into_scan_through_project() {
        let scan = Arc::new(LogicalPlan::scan(ScanSource::InMemory(Arc::new(df()))));
        let project = Arc::new(LogicalPlan::Project(scan, vec![any_col("a"), any_col("b"), any_col("c")]));
        let filter = Arc::new(LogicalPlan::Filter(project, any_col("a").gt(lit(1i32))));

        let optimized = optimize(filter).unwrap();
        match &*optimized {
            LogicalPlan::Project(input, _) => match &**input {
                LogicalPlan::Scan { pushed_predicates, .. } => assert_eq!(pushed_predicates.len(), 1),
                other => panic!("expected Scan beneath Project, got {other:?}", other = other.explain()),
            },
            other => panic!("expected Project at the root, got {other:?}", other = other.explain()),
        }
    }

    #[test]
    fn predicate_on_computed_with_column_stops_there() {
        let scan = Arc::new(LogicalPlan::scan(ScanSource::InMemory(Arc::new(df()))));
        let with_col = Arc::new(LogicalPlan::WithColumn(scan, "d".to_string(), any_col("a").add(any_col("b"))));
        let filter = Arc::new(LogicalPlan::Filter(with_col, any_col("d").gt(lit(1i32))));

        let optimized = optimize(filter).unwrap();
        assert!(matches!(&*optimized, LogicalPlan::Filter(_, _)));
    }

    #[test]
    fn projection_pushdown_narrows_scan_to_referenced_columns() {
        let scan = Arc::new(LogicalPlan::scan(ScanSource::InMemory(Arc::new(df()))));
        let project = Arc::new(LogicalPlan::Project(scan, vec![any_col("a"), any_col("b")]));

        let optimized = optimize(project).unwrap();
        match &*optimized {
            LogicalPlan::Project(input, _) => match &**input {
                LogicalPlan::Scan { projected_columns, .. } => {
                    let mut cols = projected_columns.clone().unwrap();
                    cols.sort();
                    assert_eq!(cols, vec!["a".to_string(), "b".to_string()]);
                },
                other => panic!("expected Scan, got {other:?}", other = other.explain()),
            },
            other => panic!("expected Project, got {other:?}", other = other.explain()),
        }
    }

    #[test]
    fn constant_folding_collapses_literal_arithmetic() {
        let folded = simplify_expr(&lit(1i32).add(lit(2i32)));
        assert!(matches!(folded, Expr::Literal(AnyValue::Int32(3))));
    }

    #[test]
    fn and_with_true_eliminates_to_the_other_branch() {
        let folded = simplify_expr(&any_col("a").gt(lit(0i32)).and(lit(true)));
        assert!(matches!(folded, Expr::BinaryOp(BinaryOp::Gt, _, _)));
    }

    #[test]
    fn double_negation_is_removed() {
        let folded = simplify_expr(&any_col("a").gt(lit(0i32)).not().not());
        assert!(matches!(folded, Expr::BinaryOp(BinaryOp::Gt, _, _)));
    }

    #[test]
    fn optimizer_is_idempotent() {
        let scan = Arc::new(LogicalPlan::scan(ScanSource::InMemory(Arc::new(df()))));
        let project = Arc::new(LogicalPlan::Project(scan, vec![any_col("a"), any_col("b")]));
        let filter = Arc::new(LogicalPlan::Filter(project, any_col("a").gt(lit(1i32))));

        let once = optimize(filter).unwrap();
        let twice = optimize(once.clone()).unwrap();
        assert_eq!(once.explain(), twice.explain());
    }

    #[test]
    fn optimized_plan_matches_eager_evaluation() {
        let scan = Arc::new(LogicalPlan::scan(ScanSource::InMemory(Arc::new(df()))));
        let project = Arc::new(LogicalPlan::Project(scan, vec![any_col("a"), any_col("b"), any_col("c")]));
        let filter = Arc::new(LogicalPlan::Filter(project, any_col("a").gt(lit(1i32))));

        let optimized = optimize(filter.clone()).unwrap();
        let expected = crate::executor::collect(&filter).unwrap();
        let actual = crate::executor::collect(&optimized).unwrap();
        assert_eq!(expected.height(), actual.height());
        assert_eq!(expected.get_column_names(), actual.get_column_names());
    }
}
