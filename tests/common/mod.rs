// tests/common/mod.rs

//! Shared task functions and graph fixtures for the integration tests.

#![allow(dead_code)]

use anyhow::anyhow;
use dagpool::graph::traverse::{communication_costs_of, predecessor_map};
use dagpool::{
    remove_duplicates, task_fn, Args, Dependency, Graph, Schedule, Task, TaskFn, TaskId, Value,
};

pub fn int(value: &Value) -> anyhow::Result<i64> {
    value
        .as_int()
        .ok_or_else(|| anyhow!("expected an integer, got {value:?}"))
}

/// x -> x^2 over a single integer argument.
pub fn square() -> TaskFn {
    task_fn(|args| {
        let x = int(&args.into_single()?)?;
        Ok(Value::Int(x * x))
    })
}

/// x -> x / 2 over a single integer argument.
pub fn half() -> TaskFn {
    task_fn(|args| {
        let x = int(&args.into_single()?)?;
        Ok(Value::Int(x / 2))
    })
}

/// Returns its single argument unchanged.
pub fn identity() -> TaskFn {
    task_fn(|args| args.into_single())
}

pub fn add() -> TaskFn {
    task_fn(|args| {
        let args = args.into_positional()?;
        Ok(Value::Int(int(&args[0])? + int(&args[1])?))
    })
}

pub fn mul() -> TaskFn {
    task_fn(|args| {
        let args = args.into_positional()?;
        Ok(Value::Int(int(&args[0])? * int(&args[1])?))
    })
}

pub fn sub() -> TaskFn {
    task_fn(|args| {
        let args = args.into_positional()?;
        Ok(Value::Int(int(&args[0])? - int(&args[1])?))
    })
}

/// The arithmetic DAG computing (3^2 + 4^2) - (3^2 * 10/2) over six tasks.
///
/// Expected results: {0: 9, 1: 16, 2: 5, 3: 25, 4: 45, 5: -20}.
pub fn arithmetic_graph() -> Graph {
    let square = square();
    let mut graph = Graph::new();
    graph.insert(
        TaskId::Int(0),
        Task::new(square.clone(), Args::single(Value::Int(3)), 10.8),
    );
    graph.insert(
        TaskId::Int(1),
        Task::new(square, Args::single(Value::Int(4)), 10.8),
    );
    graph.insert(
        TaskId::Int(2),
        Task::new(half(), Args::single(Value::Int(10)), 11.0),
    );
    graph.insert(
        TaskId::Int(3),
        Task::new(
            add(),
            Args::positional([
                Dependency::on(0).cost(1.0).into(),
                Dependency::on(1).cost(1.0).into(),
            ]),
            10.7,
        ),
    );
    graph.insert(
        TaskId::Int(4),
        Task::new(
            mul(),
            Args::positional([
                Dependency::on(0).cost(1.0).into(),
                Dependency::on(2).cost(1.0).into(),
            ]),
            10.8,
        ),
    );
    graph.insert(
        TaskId::Int(5),
        Task::new(
            sub(),
            Args::positional([
                Dependency::on(3).cost(1.0).into(),
                Dependency::on(4).cost(1.0).into(),
            ]),
            10.9,
        ),
    );
    graph
}

/// Two squares feeding a sum: {"s1": 9, "s2": 64, "sum": 73}.
pub fn sum_squares_graph() -> Graph {
    let square = square();
    let mut graph = Graph::new();
    graph.insert(
        TaskId::from("s1"),
        Task::new(square.clone(), Args::single(Value::Int(3)), 8.0),
    );
    graph.insert(
        TaskId::from("s2"),
        Task::new(square, Args::single(Value::Int(8)), 8.0),
    );
    graph.insert(
        TaskId::from("sum"),
        Task::new(
            add(),
            Args::positional([
                Dependency::on("s1").cost(1.0).into(),
                Dependency::on("s2").cost(1.0).into(),
            ]),
            1.0,
        ),
    );
    graph
}

/// Assert that the placement respects every dependency edge: a consumer
/// starts no earlier than each producer's finish, plus the communication
/// cost when they sit on different workers.
pub fn assert_precedence(graph: &Graph, schedule: &Schedule) {
    let (reduced, _aliases) = remove_duplicates(graph);
    for (consumer, producers) in predecessor_map(&reduced) {
        let placed_consumer = &schedule.placements[&consumer];
        let comm = communication_costs_of(&reduced[&consumer]);
        for producer in producers {
            let placed_producer = &schedule.placements[&producer];
            let mut ready = placed_producer.finish;
            if placed_producer.worker != placed_consumer.worker {
                ready += comm.get(&producer).copied().unwrap_or(0.0);
            }
            assert!(
                placed_consumer.start >= ready - 1e-9,
                "task {consumer} starts at {} before its dependency {producer} is ready at {ready}",
                placed_consumer.start,
            );
        }
    }
}
