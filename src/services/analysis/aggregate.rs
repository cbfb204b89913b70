use super::types::*;
use std::collections::HashMap;

/// Compute the exact aggregates an intent asks for. Pure computation over
/// already-loaded data; no model or network involvement, so numeric answers
/// are reproducible regardless of language-model sampling.
pub fn execute(dataset: &Dataset, intent: &QueryIntent) -> AggregationResult {
    let rows_analyzed = dataset.row_count();

    match intent.group_by.as_deref() {
        Some(group_column) if intent.kind == IntentKind::GroupedAggregation => {
            let groups = grouped(dataset, group_column, intent);
            AggregationResult::Grouped {
                rows_analyzed,
                group_by: group_column.to_string(),
                groups,
            }
        }
        _ => {
            let all_rows: Vec<usize> = (0..dataset.row_count()).collect();
            AggregationResult::Direct {
                rows_analyzed,
                targets: aggregate_targets(dataset, &all_rows, intent),
            }
        }
    }
}

fn grouped(dataset: &Dataset, group_column: &str, intent: &QueryIntent) -> Vec<GroupAggregate> {
    // Distinct group values in first-encounter order; null cells join no group.
    let mut order: Vec<String> = Vec::new();
    let mut membership: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, _) in dataset.rows.iter().enumerate() {
        let cell = dataset.value(idx, group_column);
        if cell.is_missing() {
            continue;
        }
        let key = cell.to_string();
        membership
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(idx);
    }

    order
        .into_iter()
        .map(|key| {
            let rows = &membership[&key];
            GroupAggregate {
                count: rows.len(),
                targets: aggregate_targets(dataset, rows, intent),
                key,
            }
        })
        .collect()
}

fn aggregate_targets(
    dataset: &Dataset,
    row_indices: &[usize],
    intent: &QueryIntent,
) -> Vec<TargetAggregate> {
    intent
        .targets
        .iter()
        .filter_map(|column| {
            let nums: Vec<f64> = row_indices
                .iter()
                .filter_map(|&idx| dataset.value(idx, column).as_number())
                .collect();
            if nums.is_empty() {
                // No coercible values; omit the column rather than emit a
                // divide-by-zero artifact.
                return None;
            }
            Some(TargetAggregate {
                column: column.clone(),
                stats: column_aggregates(&nums, &intent.operations),
            })
        })
        .collect()
}

fn column_aggregates(nums: &[f64], ops: &Operations) -> ColumnAggregates {
    let sum: f64 = nums.iter().sum();
    ColumnAggregates {
        average: ops.average.then(|| sum / nums.len() as f64),
        sum: ops.sum.then_some(sum),
        count: ops.count.then_some(nums.len()),
        min: ops.min.then(|| nums.iter().cloned().fold(f64::INFINITY, f64::min)),
        max: ops
            .max
            .then(|| nums.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn dataset(columns: &[&str], rows: Vec<Vec<Value>>) -> Dataset {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|cells| {
                columns
                    .iter()
                    .cloned()
                    .zip(cells)
                    .collect::<HashMap<_, _>>()
            })
            .collect();
        Dataset { columns, rows }
    }

    fn intent(kind: IntentKind, ops: Operations, group_by: Option<&str>, targets: &[&str]) -> QueryIntent {
        QueryIntent {
            kind,
            operations: ops,
            group_by: group_by.map(String::from),
            targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn grouped_average_by_region() {
        let ds = dataset(
            &["region", "score"],
            vec![
                vec![text("A"), Value::Number(10.0)],
                vec![text("A"), Value::Number(20.0)],
                vec![text("B"), Value::Number(5.0)],
            ],
        );
        let intent = intent(
            IntentKind::GroupedAggregation,
            Operations { average: true, ..Default::default() },
            Some("region"),
            &["score"],
        );

        match execute(&ds, &intent) {
            AggregationResult::Grouped { rows_analyzed, group_by, groups } => {
                assert_eq!(rows_analyzed, 3);
                assert_eq!(group_by, "region");
                assert_eq!(groups.len(), 2);
                assert_eq!(groups[0].key, "A");
                assert_eq!(groups[0].count, 2);
                assert_eq!(groups[0].targets[0].column, "score");
                assert_eq!(groups[0].targets[0].stats.average, Some(15.0));
                assert_eq!(groups[1].key, "B");
                assert_eq!(groups[1].targets[0].stats.average, Some(5.0));
            }
            other => panic!("expected grouped result, got {:?}", other),
        }
    }

    #[test]
    fn non_coercible_cells_are_excluded_from_mean() {
        let ds = dataset(
            &["score"],
            vec![
                vec![Value::Number(10.0)],
                vec![text("n/a")],
                vec![Value::Number(20.0)],
            ],
        );
        let intent = intent(
            IntentKind::DirectAggregation,
            Operations { average: true, count: true, ..Default::default() },
            None,
            &["score"],
        );

        match execute(&ds, &intent) {
            AggregationResult::Direct { rows_analyzed, targets } => {
                assert_eq!(rows_analyzed, 3);
                assert_eq!(targets[0].stats.average, Some(15.0));
                assert_eq!(targets[0].stats.count, Some(2));
            }
            other => panic!("expected direct result, got {:?}", other),
        }
    }

    #[test]
    fn only_requested_operations_are_computed() {
        let ds = dataset(
            &["v"],
            vec![vec![Value::Number(1.0)], vec![Value::Number(3.0)]],
        );
        let intent = intent(
            IntentKind::DirectAggregation,
            Operations { sum: true, max: true, ..Default::default() },
            None,
            &["v"],
        );

        match execute(&ds, &intent) {
            AggregationResult::Direct { targets, .. } => {
                let stats = &targets[0].stats;
                assert_eq!(stats.sum, Some(4.0));
                assert_eq!(stats.max, Some(3.0));
                assert!(stats.average.is_none());
                assert!(stats.min.is_none());
                assert!(stats.count.is_none());
            }
            other => panic!("expected direct result, got {:?}", other),
        }
    }

    #[test]
    fn group_without_numeric_values_omits_the_target() {
        let ds = dataset(
            &["region", "score"],
            vec![
                vec![text("A"), Value::Number(10.0)],
                vec![text("B"), text("n/a")],
            ],
        );
        let intent = intent(
            IntentKind::GroupedAggregation,
            Operations { average: true, ..Default::default() },
            Some("region"),
            &["score"],
        );

        match execute(&ds, &intent) {
            AggregationResult::Grouped { groups, .. } => {
                assert_eq!(groups[0].targets.len(), 1);
                assert!(groups[1].targets.is_empty());
                assert_eq!(groups[1].count, 1);
            }
            other => panic!("expected grouped result, got {:?}", other),
        }
    }

    #[test]
    fn null_group_cells_join_no_group_and_order_is_first_encounter() {
        let ds = dataset(
            &["region", "score"],
            vec![
                vec![text("Z"), Value::Number(1.0)],
                vec![Value::Null, Value::Number(2.0)],
                vec![text("A"), Value::Number(3.0)],
                vec![text("Z"), Value::Number(4.0)],
            ],
        );
        let intent = intent(
            IntentKind::GroupedAggregation,
            Operations { sum: true, ..Default::default() },
            Some("region"),
            &["score"],
        );

        match execute(&ds, &intent) {
            AggregationResult::Grouped { rows_analyzed, groups, .. } => {
                assert_eq!(rows_analyzed, 4);
                let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
                assert_eq!(keys, vec!["Z", "A"]);
                assert_eq!(groups[0].targets[0].stats.sum, Some(5.0));
            }
            other => panic!("expected grouped result, got {:?}", other),
        }
    }
}
