//! Configuration checks run before any plan or API call.
//!
//! A configuration is walked alongside its [`Schema`]. Each problem becomes
//! one error [`Diagnostic`] whose `attribute` is the dotted path of the
//! offending field (`kubernetes.role`, `namespaces.1`).
//!
//! ```
//! use terraform_provider_infra::schema::{Attribute, Schema};
//! use terraform_provider_infra::validation::validate;
//! use terraform_provider_infra::validators::Validator;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string().with_validator(Validator::Name));
//!
//! assert!(validate(&schema, &json!({"name": "developers"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "na@me"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));
//! ```

use serde_json::{Map, Value};

use crate::schema::{
    Attribute, AttributeType, Block, Constraint, Diagnostic, NestedBlock, Schema,
};

/// Check `config` against `schema`. An empty result means the configuration is valid.
///
/// Computed-only attributes are ignored. Value validators only run once the
/// value has the declared type.
pub fn validate(schema: &Schema, config: &Value) -> Vec<Diagnostic> {
    let mut walker = Walker::default();
    walker.block(&schema.block, config, &Path::root());
    walker.diagnostics
}

/// Whether a configured field counts as set: present, non-null, and not an empty block list.
pub(crate) fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

#[derive(Clone)]
struct Path(String);

impl Path {
    fn root() -> Self {
        Path(String::new())
    }

    fn field(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Path(name.to_string())
        } else {
            Path(format!("{}.{}", self.0, name))
        }
    }

    fn index(&self, i: usize) -> Self {
        self.field(&i.to_string())
    }

    /// Attach this path to `diagnostic` unless it is the root.
    fn locate(&self, diagnostic: Diagnostic) -> Diagnostic {
        if self.0.is_empty() {
            diagnostic
        } else {
            diagnostic.with_attribute(self.0.clone())
        }
    }
}

#[derive(Default)]
struct Walker {
    diagnostics: Vec<Diagnostic>,
}

impl Walker {
    fn report(&mut self, at: &Path, summary: impl Into<String>, detail: impl Into<String>) {
        self.diagnostics
            .push(at.locate(Diagnostic::error(summary).with_detail(detail)));
    }

    fn block(&mut self, block: &Block, value: &Value, at: &Path) {
        let fields = match value {
            Value::Object(fields) => fields,
            Value::Null => return,
            other => {
                self.report(
                    at,
                    "Incorrect block type",
                    format!("A block is expected here, got {}.", kind(other)),
                );
                return;
            }
        };

        for (name, attr) in &block.attributes {
            self.attribute(attr, fields.get(name), &at.field(name));
        }
        for (name, nested) in &block.blocks {
            self.nested(nested, fields.get(name), &at.field(name));
        }
        for constraint in &block.constraints {
            self.constraint(constraint, fields, at);
        }
    }

    fn attribute(&mut self, attr: &Attribute, value: Option<&Value>, at: &Path) {
        let flags = attr.flags;
        if flags.computed && !flags.optional && !flags.required {
            return;
        }

        let value = match value {
            Some(v) if !v.is_null() => v,
            _ => {
                if flags.required {
                    self.report(
                        at,
                        "Missing required argument",
                        format!("The argument \"{}\" is required.", at.0),
                    );
                }
                return;
            }
        };

        if !self.typed(&attr.attr_type, value, at) {
            return;
        }
        for validator in &attr.validators {
            for message in validator.check(&at.0, value) {
                self.report(at, "Invalid attribute value", message);
            }
        }
    }

    /// Report every type mismatch under `value`; `true` when there were none.
    fn typed(&mut self, ty: &AttributeType, value: &Value, at: &Path) -> bool {
        let ok = match (ty, value) {
            (AttributeType::String, Value::String(_)) => true,
            (AttributeType::Bool, Value::Bool(_)) => true,
            (AttributeType::Int64, v) if is_whole_number(v) => true,
            (AttributeType::List(element), Value::Array(items)) => {
                let mut ok = true;
                for (i, item) in items.iter().enumerate() {
                    ok &= self.typed(element, item, &at.index(i));
                }
                return ok;
            }
            (AttributeType::Object(shape), Value::Object(fields)) => {
                let mut ok = true;
                for (name, field_ty) in shape {
                    if let Some(v) = fields.get(name).filter(|v| !v.is_null()) {
                        ok &= self.typed(field_ty, v, &at.field(name));
                    }
                }
                return ok;
            }
            _ => false,
        };
        if !ok {
            self.report(
                at,
                "Incorrect attribute value type",
                format!("{} required, got {}.", type_label(ty), kind(value)),
            );
        }
        ok
    }

    fn nested(&mut self, nested: &NestedBlock, value: Option<&Value>, at: &Path) {
        match value {
            None | Some(Value::Null) => {}
            // the host may send a single block as a list of at most one element
            Some(Value::Array(items)) => match items.as_slice() {
                [] => {}
                [item] => self.block(&nested.block, item, at),
                _ => self.report(
                    at,
                    "Too many blocks",
                    format!(
                        "No more than 1 \"{}\" block is allowed, got {}.",
                        at.0,
                        items.len()
                    ),
                ),
            },
            Some(item) => self.block(&nested.block, item, at),
        }
    }

    fn constraint(&mut self, constraint: &Constraint, fields: &Map<String, Value>, at: &Path) {
        let names = constraint.fields();
        let set: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| is_set(fields.get(*name)))
            .collect();
        let all = names.join(",");

        match constraint {
            Constraint::ExactlyOneOf(_) if set.is_empty() => self.report(
                at,
                "Invalid combination of arguments",
                format!("one of `{}` must be specified", all),
            ),
            Constraint::ExactlyOneOf(_) if set.len() > 1 => self.report(
                at,
                "Invalid combination of arguments",
                format!(
                    "only one of `{}` can be specified, but `{}` were specified.",
                    all,
                    set.join(",")
                ),
            ),
            Constraint::ConflictsWith(_) if set.len() > 1 => {
                for name in &set {
                    let others: Vec<&str> = set.iter().copied().filter(|o| o != name).collect();
                    let field = at.field(name);
                    self.report(
                        &field,
                        "Conflicting configuration arguments",
                        format!("\"{}\": conflicts with {}", field.0, others.join(", ")),
                    );
                }
            }
            Constraint::RequiredTogether(_) if !set.is_empty() && set.len() < names.len() => self
                .report(
                    at,
                    "Missing required argument",
                    format!("all of `{}` must be specified", all),
                ),
            _ => {}
        }
    }
}

fn is_whole_number(value: &Value) -> bool {
    let Value::Number(n) = value else {
        return false;
    };
    n.as_i64().is_some()
        || n
            .as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
}

fn type_label(ty: &AttributeType) -> &'static str {
    match ty {
        AttributeType::String => "string",
        AttributeType::Int64 => "number",
        AttributeType::Bool => "bool",
        AttributeType::List(_) => "list",
        AttributeType::Object(_) => "object",
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, Schema};
    use crate::validators::Validator;
    use serde_json::json;

    fn group_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(Validator::Name),
            )
    }

    #[test]
    fn test_missing_and_mistyped_name() {
        let schema = group_schema();
        assert!(validate(&schema, &json!({"name": "developers"})).is_empty());

        for config in [json!({}), json!({"name": null})] {
            let diagnostics = validate(&schema, &config);
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].summary, "Missing required argument");
            assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));
        }

        // the name check does not run on a number
        let diagnostics = validate(&schema, &json!({"name": 12}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Incorrect attribute value type");
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("string required, got number.")
        );
    }

    #[test]
    fn test_computed_id_is_ignored() {
        let schema = group_schema();
        assert!(validate(&schema, &json!({"name": "developers", "id": 5})).is_empty());
    }

    #[test]
    fn test_invalid_name() {
        let diagnostics = validate(&group_schema(), &json!({"name": "na@me"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid attribute value");
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));
    }

    #[test]
    fn test_whole_numbers() {
        let schema = Schema::v0().with_attribute("minimum_length", Attribute::optional_int64());

        assert!(validate(&schema, &json!({"minimum_length": 8})).is_empty());
        assert!(validate(&schema, &json!({"minimum_length": 8.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"minimum_length": 8.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"minimum_length": "8"})).len(), 1);
    }

    #[test]
    fn test_list_and_object_paths() {
        let schema = Schema::v0()
            .with_attribute(
                "namespaces",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                ),
            )
            .with_attribute(
                "destination",
                Attribute::new(
                    AttributeType::object([
                        ("id", AttributeType::String),
                        ("roles", AttributeType::list(AttributeType::String)),
                    ]),
                    AttributeFlags::optional(),
                ),
            );

        assert!(validate(
            &schema,
            &json!({
                "namespaces": ["default", "kube-system"],
                "destination": {"id": "a", "roles": ["view"]},
            })
        )
        .is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"namespaces": ["default", 1], "destination": {"id": 1}}),
        );
        let mut paths: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        paths.sort();
        assert_eq!(paths, ["destination.id", "namespaces.1"]);
    }

    #[test]
    fn test_grant_needs_one_privilege_block() {
        let role = || NestedBlock::single(Block::new().with_attribute("role", Attribute::required_string()));
        let schema = Schema::v0()
            .with_attribute("user_id", Attribute::optional_string())
            .with_attribute("user_name", Attribute::optional_string())
            .with_exactly_one_of(["user_id", "user_name"])
            .with_block("infra", role())
            .with_block("kubernetes", role())
            .with_exactly_one_of(["infra", "kubernetes"]);

        let ok = json!({"user_id": "2", "infra": {"role": "admin"}});
        assert!(validate(&schema, &ok).is_empty());
        let ok = json!({"user_id": "2", "infra": [{"role": "admin"}]});
        assert!(validate(&schema, &ok).is_empty());

        let diagnostics = validate(&schema, &json!({"user_id": "2", "infra": []}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("one of `infra,kubernetes` must be specified")
        );

        let diagnostics = validate(
            &schema,
            &json!({
                "user_id": "2",
                "user_name": "alice@example.com",
                "infra": {"role": "admin"},
            }),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .is_some_and(|d| d.starts_with("only one of `user_id,user_name`")));

        let diagnostics = validate(&schema, &json!({"user_id": "2", "kubernetes": {}}));
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("kubernetes.role"));
    }

    #[test]
    fn test_access_key_expiry_conflicts() {
        let schema = Schema::v0()
            .with_attribute("expires_in", Attribute::optional_string())
            .with_attribute("expires_at", Attribute::optional_string())
            .with_conflicts(["expires_in", "expires_at"]);

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"expires_in": "1h"})).is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"expires_in": "1h", "expires_at": "2030-01-01T00:00:00Z"}),
        );
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .any(|d| d.detail.as_deref() == Some("\"expires_in\": conflicts with expires_at")));
    }

    #[test]
    fn test_google_credentials_together() {
        let schema = Schema::v0().with_block(
            "google",
            NestedBlock::single(
                Block::new()
                    .with_attribute("admin_email", Attribute::optional_string())
                    .with_attribute("service_account_key", Attribute::optional_string())
                    .with_required_together(["admin_email", "service_account_key"]),
            ),
        );

        assert!(validate(&schema, &json!({"google": {}})).is_empty());
        assert!(validate(
            &schema,
            &json!({"google": {"admin_email": "a@b.co", "service_account_key": "{}"}})
        )
        .is_empty());

        let diagnostics = validate(&schema, &json!({"google": {"admin_email": "a@b.co"}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("google"));
    }

    #[test]
    fn test_single_block_as_list() {
        let schema = Schema::v0().with_block(
            "password_requirements",
            NestedBlock::single(Block::new().with_attribute("minimum_length", Attribute::optional_int64())),
        );

        assert!(validate(&schema, &json!({"password_requirements": []})).is_empty());
        assert!(validate(&schema, &json!({"password_requirements": [{"minimum_length": 8}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"password_requirements": [{"minimum_length": "8"}]}));
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("password_requirements.minimum_length")
        );

        let diagnostics = validate(&schema, &json!({"password_requirements": [{}, {}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Too many blocks");
    }

    #[test]
    fn test_root_must_be_an_object() {
        let diagnostics = validate(&group_schema(), &json!("developers"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Incorrect block type");
        assert!(diagnostics[0].attribute.is_none());
    }
}
