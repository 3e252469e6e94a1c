// src/graph/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};

/// Identifier of a task in a computation graph.
///
/// Any equality-comparable token works as an ID; `Path` is the structured
/// form (a fixed-length sequence of tokens) used by [`prefix`] and by result
/// inflation.
///
/// [`prefix`]: crate::graph::compose::prefix
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskId {
    Int(i64),
    Name(String),
    Path(Vec<TaskId>),
}

impl TaskId {
    /// Prepend a token, turning any ID into a structured one.
    ///
    /// A `Path` ID grows by one leading component; any other ID becomes a
    /// two-component path.
    pub fn prefixed(&self, token: &TaskId) -> TaskId {
        match self {
            TaskId::Path(parts) => {
                let mut prefixed = Vec::with_capacity(parts.len() + 1);
                prefixed.push(token.clone());
                prefixed.extend(parts.iter().cloned());
                TaskId::Path(prefixed)
            }
            other => TaskId::Path(vec![token.clone(), other.clone()]),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Int(n) => write!(f, "{n}"),
            TaskId::Name(name) => write!(f, "{name}"),
            TaskId::Path(parts) => {
                write!(f, "(")?;
                for (k, part) in parts.iter().enumerate() {
                    if k > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{part}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<i64> for TaskId {
    fn from(n: i64) -> Self {
        TaskId::Int(n)
    }
}

impl From<&str> for TaskId {
    fn from(name: &str) -> Self {
        TaskId::Name(name.to_string())
    }
}

impl From<String> for TaskId {
    fn from(name: String) -> Self {
        TaskId::Name(name)
    }
}

impl From<Vec<TaskId>> for TaskId {
    fn from(parts: Vec<TaskId>) -> Self {
        TaskId::Path(parts)
    }
}

/// A single lookup token applied to a producer's result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(k) => write!(f, "[{k}]"),
            Key::Name(name) => write!(f, ".{name}"),
        }
    }
}

impl From<usize> for Key {
    fn from(k: usize) -> Self {
        Key::Index(k)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

/// A sequence of lookup tokens applied in order to a producer's result.
///
/// An empty path takes the whole result; a path of one token is a single
/// lookup. A caller that wants to look up *by* a sequence-valued key must
/// wrap it in a one-token path itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPath(pub Vec<Key>);

impl KeyPath {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(whole result)");
        }
        for key in &self.0 {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Self-describing runtime value passed between tasks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Apply a single lookup token.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        match (self, key) {
            (Value::List(items), Key::Index(k)) => items.get(*k),
            (Value::Map(entries), Key::Name(name)) => entries.get(name),
            _ => None,
        }
    }

    /// Apply a whole extraction path in order.
    pub fn extract(&self, path: &KeyPath) -> Option<&Value> {
        let mut current = self;
        for key in &path.0 {
            current = current.get(key)?;
        }
        Some(current)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

/// Reference to the result of another task.
///
/// The referenced result is fetched before the consuming task runs, the
/// extraction path is applied, and the value is spliced into the argument
/// tree in place of the marker. `cost` is the estimated communication cost,
/// incurred only when producer and consumer land on different workers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dependency {
    pub task: TaskId,
    pub key: KeyPath,
    pub cost: f64,
}

impl Dependency {
    /// Depend on a task's whole result at zero communication cost.
    pub fn on(task: impl Into<TaskId>) -> Self {
        Self {
            task: task.into(),
            key: KeyPath::default(),
            cost: 0.0,
        }
    }

    /// Append a lookup token to the extraction path.
    pub fn extract(mut self, key: impl Into<Key>) -> Self {
        self.key.0.push(key.into());
        self
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

// Two dependencies are equivalent when they reference the same task through
// the same extraction path; the cost estimate does not participate.
impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.task == other.task && self.key == other.key
    }
}

/// One node of an argument tree: a concrete value, a dependency marker, or
/// a nested container that may hold markers at any depth.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgNode {
    Value(Value),
    Dep(Dependency),
    List(Vec<ArgNode>),
    Map(BTreeMap<String, ArgNode>),
}

impl From<Value> for ArgNode {
    fn from(value: Value) -> Self {
        ArgNode::Value(value)
    }
}

impl From<Dependency> for ArgNode {
    fn from(dep: Dependency) -> Self {
        ArgNode::Dep(dep)
    }
}

impl From<i64> for ArgNode {
    fn from(n: i64) -> Self {
        ArgNode::Value(Value::Int(n))
    }
}

impl From<f64> for ArgNode {
    fn from(x: f64) -> Self {
        ArgNode::Value(Value::Float(x))
    }
}

impl From<&str> for ArgNode {
    fn from(s: &str) -> Self {
        ArgNode::Value(Value::Str(s.to_string()))
    }
}

/// Argument specification of a task: a single value, an ordered sequence of
/// positional values, or a keyed mapping of keyword values.
///
/// The three shapes are distinct on purpose; a list that is itself the sole
/// argument goes through `Single`.
#[derive(Clone, Debug, PartialEq)]
pub enum Args {
    Single(ArgNode),
    Positional(Vec<ArgNode>),
    Keyword(BTreeMap<String, ArgNode>),
}

impl Args {
    pub fn single(arg: impl Into<ArgNode>) -> Self {
        Args::Single(arg.into())
    }

    pub fn positional<I>(args: I) -> Self
    where
        I: IntoIterator<Item = ArgNode>,
    {
        Args::Positional(args.into_iter().collect())
    }

    pub fn keyword<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ArgNode)>,
    {
        Args::Keyword(
            entries
                .into_iter()
                .map(|(name, node)| (name.into(), node))
                .collect(),
        )
    }
}

/// Fully materialized arguments as handed to a task function, mirroring the
/// three shapes of [`Args`].
#[derive(Clone, Debug, PartialEq)]
pub enum CallArgs {
    Single(Value),
    Positional(Vec<Value>),
    Keyword(BTreeMap<String, Value>),
}

impl CallArgs {
    pub fn into_single(self) -> anyhow::Result<Value> {
        match self {
            CallArgs::Single(value) => Ok(value),
            other => bail!("expected a single argument, got {other:?}"),
        }
    }

    pub fn into_positional(self) -> anyhow::Result<Vec<Value>> {
        match self {
            CallArgs::Positional(values) => Ok(values),
            other => bail!("expected positional arguments, got {other:?}"),
        }
    }

    pub fn keyword(&self, name: &str) -> anyhow::Result<&Value> {
        match self {
            CallArgs::Keyword(entries) => entries
                .get(name)
                .ok_or_else(|| anyhow!("missing keyword argument '{name}'")),
            other => bail!("expected keyword arguments, got {other:?}"),
        }
    }
}

/// A task function. Compared by identity only: two tasks share a function
/// exactly when they hold clones of the same `Arc`.
pub type TaskFn = Arc<dyn Fn(CallArgs) -> anyhow::Result<Value> + Send + Sync>;

/// Wrap a closure as a [`TaskFn`].
pub fn task_fn<F>(f: F) -> TaskFn
where
    F: Fn(CallArgs) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn same_func(a: &TaskFn, b: &TaskFn) -> bool {
    Arc::ptr_eq(a, b)
}

/// A computational task: function, argument specification, and an estimated
/// compute cost in the same (arbitrary) unit as communication costs.
#[derive(Clone)]
pub struct Task {
    pub func: TaskFn,
    pub args: Args,
    pub cost: f64,
}

impl Task {
    pub fn new(func: TaskFn, args: Args, cost: f64) -> Self {
        Self { func, args, cost }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("args", &self.args)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

/// A computation graph: tasks keyed by ID, edges implied by the dependency
/// markers inside each task's argument tree.
pub type Graph = BTreeMap<TaskId, Task>;
