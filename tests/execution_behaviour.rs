// tests/execution_behaviour.rs

mod common;

use std::collections::BTreeMap;

use anyhow::anyhow;
use dagpool::{
    execute, inflate, prefix, schedule, task_fn, Args, Dependency, ExecuteOptions, Graph,
    ResultTree, ScheduleOptions, Task, TaskId, TaskResult, Value,
};

use common::{add, arithmetic_graph, identity, int, square, sum_squares_graph};

fn ok_int(n: i64) -> TaskResult {
    TaskResult::Ok(Value::Int(n))
}

#[tokio::test]
async fn arithmetic_dag_computes_expected_results() {
    let graph = arithmetic_graph();
    let sched = schedule(&graph, 3, ScheduleOptions::default()).unwrap();
    let out = execute(sched, ExecuteOptions::default()).await.unwrap();

    assert_eq!(out.result(&TaskId::Int(0)), Some(&ok_int(9)));
    assert_eq!(out.result(&TaskId::Int(1)), Some(&ok_int(16)));
    assert_eq!(out.result(&TaskId::Int(2)), Some(&ok_int(5)));
    assert_eq!(out.result(&TaskId::Int(3)), Some(&ok_int(25)));
    assert_eq!(out.result(&TaskId::Int(4)), Some(&ok_int(45)));
    assert_eq!(out.result(&TaskId::Int(5)), Some(&ok_int(-20)));
}

#[tokio::test]
async fn results_do_not_depend_on_the_worker_count() {
    let graph = arithmetic_graph();
    for workers in 1..=4 {
        let sched = schedule(&graph, workers, ScheduleOptions::default()).unwrap();
        let out = execute(sched, ExecuteOptions::default()).await.unwrap();
        assert_eq!(
            out.result(&TaskId::Int(5)),
            Some(&ok_int(-20)),
            "wrong result with {workers} workers"
        );
        assert_eq!(out.results.len(), 6);
    }
}

#[tokio::test]
async fn sum_of_squares_over_two_workers() {
    let sched = schedule(&sum_squares_graph(), 2, ScheduleOptions::default()).unwrap();
    let out = execute(sched, ExecuteOptions::default()).await.unwrap();

    assert_eq!(out.result(&TaskId::from("s1")), Some(&ok_int(9)));
    assert_eq!(out.result(&TaskId::from("s2")), Some(&ok_int(64)));
    assert_eq!(out.result(&TaskId::from("sum")), Some(&ok_int(73)));
}

#[tokio::test]
async fn output_filter_returns_only_the_requested_tasks() {
    let options = ScheduleOptions {
        output_tasks: Some(vec![TaskId::from("sum")]),
        ..ScheduleOptions::default()
    };
    let sched = schedule(&sum_squares_graph(), 2, options).unwrap();
    let out = execute(sched, ExecuteOptions::default()).await.unwrap();

    assert_eq!(out.results.len(), 1);
    assert_eq!(out.result(&TaskId::from("sum")), Some(&ok_int(73)));
}

#[tokio::test]
async fn eliminated_duplicates_still_appear_in_the_result_map() {
    let square = square();
    let mut graph = Graph::new();
    graph.insert(
        TaskId::from("a"),
        Task::new(square.clone(), Args::single(Value::Int(3)), 5.0),
    );
    graph.insert(
        TaskId::from("b"),
        Task::new(square, Args::single(Value::Int(3)), 5.0),
    );
    graph.insert(
        TaskId::from("c"),
        Task::new(
            add(),
            Args::positional([
                Dependency::on("a").cost(1.0).into(),
                Dependency::on("b").cost(1.0).into(),
            ]),
            1.0,
        ),
    );

    let sched = schedule(&graph, 2, ScheduleOptions::default()).unwrap();
    // Only two tasks actually run.
    let scheduled: usize = sched.work_items.iter().map(Vec::len).sum();
    assert_eq!(scheduled, 2);

    let out = execute(sched, ExecuteOptions::default()).await.unwrap();
    assert_eq!(out.result(&TaskId::from("a")), Some(&ok_int(9)));
    assert_eq!(out.result(&TaskId::from("b")), Some(&ok_int(9)));
    assert_eq!(out.result(&TaskId::from("c")), Some(&ok_int(18)));
}

#[tokio::test]
async fn keyword_arguments_and_extraction_paths() {
    let stats = task_fn(|args| {
        let items = match args.into_single()? {
            Value::List(items) => items,
            other => anyhow::bail!("expected a list, got {other:?}"),
        };
        let values: Vec<i64> = items.iter().filter_map(Value::as_int).collect();
        let n = values.len() as i64;
        if n == 0 {
            anyhow::bail!("expected a non-empty list");
        }
        let mu = values.iter().sum::<i64>() / n;
        let var = values.iter().map(|v| (v - mu) * (v - mu)).sum::<i64>() / n;

        let mut inner = BTreeMap::new();
        inner.insert("mu".to_string(), Value::Int(mu));
        inner.insert("var".to_string(), Value::Int(var));
        let mut outer = BTreeMap::new();
        outer.insert("dummy".to_string(), Value::Map(inner));
        Ok(Value::Map(outer))
    });
    let spread = task_fn(|args| {
        let mu = int(args.keyword("mu")?)?;
        let var = int(args.keyword("var")?)?;
        Ok(Value::Int(mu + var))
    });

    let mut graph = Graph::new();
    graph.insert(
        TaskId::from("stats"),
        Task::new(
            stats,
            Args::single(Value::List(vec![
                Value::Int(2),
                Value::Int(4),
                Value::Int(6),
            ])),
            10.0,
        ),
    );
    graph.insert(
        TaskId::from("spread"),
        Task::new(
            spread,
            Args::keyword([
                (
                    "mu",
                    Dependency::on("stats")
                        .extract("dummy")
                        .extract("mu")
                        .cost(1.0)
                        .into(),
                ),
                (
                    "var",
                    Dependency::on("stats")
                        .extract("dummy")
                        .extract("var")
                        .into(),
                ),
            ]),
            5.0,
        ),
    );

    let sched = schedule(&graph, 2, ScheduleOptions::default()).unwrap();
    let out = execute(sched, ExecuteOptions::default()).await.unwrap();

    // mu = 4, var = ((-2)^2 + 0 + 2^2) / 3 = 2
    assert_eq!(out.result(&TaskId::from("spread")), Some(&ok_int(6)));
}

#[tokio::test]
async fn index_extraction_reads_into_list_results() {
    let thirds = task_fn(|args| {
        let x = int(&args.into_single()?)?;
        Ok(Value::List(vec![
            Value::Int(x),
            Value::Int(2 * x),
            Value::Int(3 * x),
        ]))
    });

    let mut graph = Graph::new();
    graph.insert(
        TaskId::from("thirds"),
        Task::new(thirds, Args::single(Value::Int(7)), 2.0),
    );
    graph.insert(
        TaskId::from("last"),
        Task::new(
            identity(),
            Args::single(Dependency::on("thirds").extract(2).cost(1.0)),
            1.0,
        ),
    );

    let sched = schedule(&graph, 2, ScheduleOptions::default()).unwrap();
    let out = execute(sched, ExecuteOptions::default()).await.unwrap();
    assert_eq!(out.result(&TaskId::from("last")), Some(&ok_int(21)));
}

#[tokio::test]
async fn measured_costs_cover_every_reported_task() {
    let graph = arithmetic_graph();
    let sched = schedule(&graph, 3, ScheduleOptions::default()).unwrap();
    let options = ExecuteOptions {
        costs: true,
        ..ExecuteOptions::default()
    };
    let out = execute(sched, options).await.unwrap();

    let costs = out.costs.expect("costs were requested");
    assert_eq!(costs.len(), graph.len());
    for (id, cost) in &costs {
        assert!(cost.compute >= 0.0, "negative compute time for task {id}");
        for (producer, latency) in &cost.communication {
            assert!(graph.contains_key(producer));
            assert!(*latency >= 0.0);
        }
    }
}

#[tokio::test]
async fn structured_ids_inflate_into_nested_mappings() {
    let constant =
        |n: i64| task_fn(move |_| Ok(Value::Int(n)));

    let sums = |a: i64, b: i64| TaskId::Path(vec![TaskId::from("sums"), TaskId::Int(a), TaskId::Int(b)]);

    let mut graph = Graph::new();
    graph.insert(sums(0, 0), Task::new(constant(10), Args::positional([]), 1.0));
    graph.insert(sums(0, 1), Task::new(constant(20), Args::positional([]), 1.0));
    graph.insert(sums(1, 0), Task::new(constant(30), Args::positional([]), 1.0));

    let sched = schedule(&graph, 2, ScheduleOptions::default()).unwrap();
    let options = ExecuteOptions {
        inflate: true,
        ..ExecuteOptions::default()
    };
    let out = execute(sched, options).await.unwrap();

    let sums_level = out.results.get(&TaskId::from("sums")).expect("sums level");
    let zero = sums_level.get(&TaskId::Int(0)).expect("sums.0 level");
    let one = sums_level.get(&TaskId::Int(1)).expect("sums.1 level");

    assert_eq!(
        zero.get(&TaskId::Int(0)).and_then(ResultTree::as_result),
        Some(&ok_int(10))
    );
    assert_eq!(
        zero.get(&TaskId::Int(1)).and_then(ResultTree::as_result),
        Some(&ok_int(20))
    );
    assert_eq!(
        one.get(&TaskId::Int(0)).and_then(ResultTree::as_result),
        Some(&ok_int(30))
    );
    assert_eq!(one.len(), 1);
}

#[test]
fn inflation_is_lossless_and_order_independent() {
    let key = |parts: Vec<TaskId>| TaskId::Path(parts);
    let mut flat = BTreeMap::new();
    flat.insert(
        key(vec![TaskId::from("sums"), TaskId::Int(0), TaskId::Int(0)]),
        ok_int(1),
    );
    flat.insert(
        key(vec![TaskId::from("sums"), TaskId::Int(0), TaskId::Int(1)]),
        ok_int(2),
    );
    flat.insert(
        key(vec![TaskId::from("sums"), TaskId::Int(1), TaskId::Int(0)]),
        ok_int(3),
    );
    // A plain key coexists with structured ones at the top level.
    flat.insert(TaskId::from("final"), ok_int(4));

    let nested = inflate(flat.clone());
    assert_eq!(nested.flatten(), flat);
}

#[tokio::test]
async fn prefixed_graphs_compose_and_execute_together() {
    let graph = sum_squares_graph();
    let mut merged = prefix(&graph, &TaskId::from("left"));
    merged.extend(prefix(&graph, &TaskId::from("right")));

    let sched = schedule(&merged, 2, ScheduleOptions::default()).unwrap();
    let out = execute(sched, ExecuteOptions::default()).await.unwrap();

    let left_sum = TaskId::Path(vec![TaskId::from("left"), TaskId::from("sum")]);
    let right_sum = TaskId::Path(vec![TaskId::from("right"), TaskId::from("sum")]);
    assert_eq!(out.result(&left_sum), Some(&ok_int(73)));
    assert_eq!(out.result(&right_sum), Some(&ok_int(73)));
}

#[tokio::test]
async fn an_empty_graph_executes_to_an_empty_result_map() {
    let sched = schedule(&Graph::new(), 2, ScheduleOptions::default()).unwrap();
    let out = execute(sched, ExecuteOptions::default()).await.unwrap();
    assert!(out.results.is_empty());
}

#[tokio::test]
async fn single_values_are_not_splatted_into_positional_arguments() {
    // A list that is the sole argument arrives as one list value.
    let len = task_fn(|args| {
        let xs = args.into_single()?;
        match xs {
            Value::List(items) => Ok(Value::Int(items.len() as i64)),
            other => Err(anyhow!("expected a list, got {other:?}")),
        }
    });

    let mut graph = Graph::new();
    graph.insert(
        TaskId::from("len"),
        Task::new(
            len,
            Args::single(Value::List(vec![Value::Int(1), Value::Int(2)])),
            1.0,
        ),
    );

    let sched = schedule(&graph, 1, ScheduleOptions::default()).unwrap();
    let out = execute(sched, ExecuteOptions::default()).await.unwrap();
    assert_eq!(out.result(&TaskId::from("len")), Some(&ok_int(2)));
}
