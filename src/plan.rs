//! Plan computation.
//!
//! Given the prior state and the proposed new state of a resource, produce the
//! state the provider intends to reach, the attribute-level changes, and
//! whether the change can only be applied by replacing the resource.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::duration;
use crate::schema::{Block, Equivalence, Schema};

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<Value>,
    /// The value after the change (None if removing).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }

    fn between(path: String, before: &Value, after: &Value) -> Self {
        match (before.is_null(), after.is_null()) {
            (true, _) => Self::added(path, after.clone()),
            (false, true) => Self::removed(path, before.clone()),
            (false, false) => Self::modified(path, before.clone(), after.clone()),
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        let encode = |v: Option<Value>| {
            v.and_then(|v| serde_json::to_vec(&v).ok())
                .unwrap_or_default()
        };
        Self {
            path: change.path,
            before: encode(change.before),
            after: encode(change.after),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Whether applying the plan does anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Compute the plan for moving from `prior` (None when creating) to `proposed`.
///
/// - Unset attributes with a default take the default.
/// - Unset computed attributes keep their prior value, unless the resource
///   is being replaced.
/// - Duration attributes equal in length to the prior value keep the prior text.
/// - A change to a force-new attribute, at any depth, requires replacement.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: Value) -> PlanResult {
    let prior = prior.and_then(Value::as_object);
    let mut planned = match proposed {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let mut planner = Planner::default();
    planner.block(&schema.block, prior, &mut planned, "");

    if planner.requires_replace {
        for path in &planner.carried {
            clear_path(&mut planned, path);
        }
        planner.changes.retain(|c| !planner.carried.contains(&c.path));
    }

    PlanResult {
        planned_state: Value::Object(planned),
        changes: planner.changes,
        requires_replace: planner.requires_replace,
    }
}

#[derive(Default)]
struct Planner {
    changes: Vec<AttributeChange>,
    carried: Vec<String>,
    requires_replace: bool,
}

impl Planner {
    fn block(
        &mut self,
        block: &Block,
        prior: Option<&Map<String, Value>>,
        planned: &mut Map<String, Value>,
        path: &str,
    ) {
        let updating = prior.is_some();

        for (name, attr) in &block.attributes {
            let attr_path = join_path(path, name);
            let before = prior
                .and_then(|m| m.get(name))
                .cloned()
                .unwrap_or(Value::Null);
            let after = planned.entry(name.clone()).or_insert(Value::Null);

            if after.is_null() {
                if let Some(default) = &attr.default {
                    *after = default.clone();
                } else if attr.flags.computed && !before.is_null() {
                    *after = before.clone();
                    self.carried.push(attr_path.clone());
                }
            }

            if attr.equivalence == Equivalence::Duration && durations_match(&before, after) {
                *after = before.clone();
            }

            if before != *after && !(before.is_null() && after.is_null()) {
                if updating && attr.force_new {
                    self.requires_replace = true;
                }
                self.changes
                    .push(AttributeChange::between(attr_path, &before, after));
            }
        }

        for (name, nested) in &block.blocks {
            let block_path = join_path(path, name);
            let before = prior.and_then(|m| m.get(name)).and_then(single_object);
            let after = planned.get(name).and_then(single_object).cloned();

            match after {
                Some(mut after) => {
                    self.block(&nested.block, before, &mut after, &block_path);
                    planned.insert(name.clone(), Value::Object(after));
                }
                None if nested.computed && before.is_some() => {
                    let carried = before.cloned().map(Value::Object).unwrap_or(Value::Null);
                    planned.insert(name.clone(), carried);
                    self.carried.push(block_path);
                }
                None => {
                    planned.insert(name.clone(), Value::Null);
                    if let Some(before) = before {
                        if updating && has_force_new(&nested.block) {
                            self.requires_replace = true;
                        }
                        self.changes.push(AttributeChange::removed(
                            block_path,
                            Value::Object(before.clone()),
                        ));
                    }
                }
            }
        }
    }
}

fn single_object(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.first().and_then(Value::as_object),
        _ => None,
    }
}

fn has_force_new(block: &Block) -> bool {
    block.attributes.values().any(|a| a.force_new)
        || block.blocks.values().any(|b| has_force_new(&b.block))
}

fn durations_match(before: &Value, after: &Value) -> bool {
    match (before.as_str(), after.as_str()) {
        (Some(a), Some(b)) => duration::equivalent(a, b),
        _ => false,
    }
}

fn clear_path(state: &mut Map<String, Value>, path: &str) {
    let mut parts = path.split('.').peekable();
    let mut current = state;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), Value::Null);
            return;
        }
        match current.get_mut(part).and_then(Value::as_object_mut) {
            Some(next) => current = next,
            None => return,
        }
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}
