//! Schema declarations for the provider configuration, resources and data sources.
//!
//! Besides shape (types, nesting, flags) a schema carries the checks that run
//! during validation: per-attribute [`Validator`]s and block-level constraints
//! between sibling fields (exactly one of, at most one of, all or none of).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::validators::Validator;

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A boolean value.
    Bool,
    /// Ordered, homogeneous list.
    List(Box<AttributeType>),
    /// Fixed-shape object.
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    /// `list(element_type)`
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create an object type from `(name, type)` pairs.
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeType)>,
        K: Into<String>,
    {
        Self::Object(
            attributes
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        )
    }
}

/// Whether an attribute is configured, filled in by the provider, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// Must appear in configuration.
    pub required: bool,
    /// May appear in configuration.
    pub optional: bool,
    /// Set by the provider.
    pub computed: bool,
    /// Redacted in host output.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Required.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Optional.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Computed only.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Optional, computed when unset.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    /// Redact in host output.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// How a planned value is compared against the prior one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Equivalence {
    /// JSON equality.
    #[default]
    Exact,
    /// Both sides parse as durations of the same length, e.g. `720h` and `720h0m0s`.
    Duration,
}

/// One attribute of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Required / optional / computed / sensitive.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Markdown shown in generated docs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A change replaces the remote entity.
    #[serde(default)]
    pub force_new: bool,
    /// Planned when the configuration leaves the attribute null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Checks run against the configured value.
    #[serde(skip)]
    pub validators: Vec<Validator>,
    /// Comparison used when planning.
    #[serde(skip)]
    pub equivalence: Equivalence,
}

impl Attribute {
    /// Bare attribute with no description, default or checks.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
            validators: Vec::new(),
            equivalence: Equivalence::Exact,
        }
    }

    /// `String`, required.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// `String`, optional.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// `String`, set by the provider.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Create an optional string attribute the provider fills in when unset.
    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed())
    }

    /// `Int64`, optional.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// `Bool`, optional.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Markdown shown in generated docs.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A change replaces the remote entity.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Planned when the configuration leaves the attribute null.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Redact in host output.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Attach a value check.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Compare planned values with `equivalence` instead of JSON equality.
    pub fn with_equivalence(mut self, equivalence: Equivalence) -> Self {
        self.equivalence = equivalence;
        self
    }

    /// The description as shown to users, including the default value.
    pub fn full_description(&self) -> String {
        let mut out = self.description.clone().unwrap_or_default();
        if let Some(default) = &self.default {
            let shown = match default {
                serde_json::Value::String(s) => format!("`{}`", s),
                other => format!("`{}`", other),
            };
            append_sentence(&mut out, &format!("Default is {}.", shown));
        }
        out
    }

    fn append_description(&mut self, sentence: &str) {
        let mut out = self.description.take().unwrap_or_default();
        append_sentence(&mut out, sentence);
        self.description = Some(out);
    }
}

fn append_sentence(out: &mut String, sentence: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(sentence);
}

fn quoted_list<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    names
        .into_iter()
        .map(|n| format!("`{}`", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A relationship between sibling fields of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "fields")]
pub enum Constraint {
    /// Exactly one of the fields must be set.
    ExactlyOneOf(Vec<String>),
    /// At most one of the fields may be set.
    ConflictsWith(Vec<String>),
    /// Either all of the fields are set or none are.
    RequiredTogether(Vec<String>),
}

impl Constraint {
    /// The fields this constraint relates.
    pub fn fields(&self) -> &[String] {
        match self {
            Self::ExactlyOneOf(f) | Self::ConflictsWith(f) | Self::RequiredTogether(f) => f,
        }
    }
}

/// A block of attributes and nested blocks.
///
/// Field names are unique across `attributes` and `blocks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    /// Keyed by attribute name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Attribute>,
    /// Keyed by block name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub blocks: HashMap<String, NestedBlock>,
    /// Markdown description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Constraints between fields of this block.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl Block {
    /// Empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Declare a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Markdown shown in generated docs.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Require exactly one of `fields` to be set.
    ///
    /// Each named attribute already in the block has its description extended.
    pub fn with_exactly_one_of<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_constraint(Constraint::ExactlyOneOf(collect_names(fields)))
    }

    /// Allow at most one of `fields` to be set.
    pub fn with_conflicts<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_constraint(Constraint::ConflictsWith(collect_names(fields)))
    }

    /// Require `fields` to be set together or not at all.
    pub fn with_required_together<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_constraint(Constraint::RequiredTogether(collect_names(fields)))
    }

    fn with_constraint(mut self, constraint: Constraint) -> Self {
        let fields = constraint.fields().to_vec();
        for name in &fields {
            let others = fields.iter().filter(|other| *other != name);
            let sentence = match &constraint {
                Constraint::ExactlyOneOf(_) => {
                    format!("One of {} must be set.", quoted_list(fields.iter()))
                }
                Constraint::ConflictsWith(_) => {
                    format!("Cannot be used with {}.", quoted_list(others))
                }
                Constraint::RequiredTogether(_) => {
                    format!("Must be set together with {}.", quoted_list(others))
                }
            };
            if let Some(attr) = self.attributes.get_mut(name) {
                attr.append_description(&sentence);
            } else if let Some(nested) = self.blocks.get_mut(name) {
                let mut out = nested.block.description.take().unwrap_or_default();
                append_sentence(&mut out, &sentence);
                nested.block.description = Some(out);
            }
        }
        self.constraints.push(constraint);
        self
    }

    /// Whether `name` is declared as an attribute or a nested block.
    pub fn has_field(&self, name: &str) -> bool {
        self.attributes.contains_key(name) || self.blocks.contains_key(name)
    }
}

fn collect_names<I, S>(fields: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fields.into_iter().map(Into::into).collect()
}

/// A block declared inside another block, present at most once.
///
/// State holds it as an object (or null); configuration may also carry it as
/// a list of at most one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// The block definition.
    #[serde(flatten)]
    pub block: Block,
    /// When omitted from configuration, the prior value is kept.
    #[serde(default)]
    pub computed: bool,
}

impl NestedBlock {
    /// Wrap `block`.
    pub fn single(block: Block) -> Self {
        Self {
            block,
            computed: false,
        }
    }

    /// Keep the prior value when the block is omitted from configuration.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }
}

/// The declared shape of a resource, data source or the provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Bumped whenever stored state changes shape.
    #[serde(default)]
    pub version: u64,
    /// Top-level block.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// Empty schema at `version`.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// Empty schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Set the description shown for the resource or data source.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }

    /// Declare a top-level attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block to the schema.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }

    /// See [`Block::with_exactly_one_of`].
    pub fn with_exactly_one_of<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block = self.block.with_exactly_one_of(fields);
        self
    }

    /// See [`Block::with_conflicts`].
    pub fn with_conflicts<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block = self.block.with_conflicts(fields);
        self
    }

    /// Attribute names marked force-new, at the top level.
    pub fn force_new_attributes(&self) -> impl Iterator<Item = &str> {
        self.block
            .attributes
            .iter()
            .filter(|(_, a)| a.force_new)
            .map(|(name, _)| name.as_str())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Everything the provider declares, as returned from `GetSchema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// The `provider "infra"` block.
    #[serde(default)]
    pub provider: Schema,
    /// Keyed by resource type name.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
    /// Keyed by data source type name.
    #[serde(default)]
    pub data_sources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// No provider, resource or data source schemas yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the `provider "infra"` block schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Register a resource type.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Register a data source type.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Fails the operation.
    Error,
    /// Reported, but the operation proceeds.
    Warning,
}

/// A message returned to the host alongside (or instead of) a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: DiagnosticSeverity,
    /// One-line message.
    pub summary: String,
    /// Longer explanation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted path of the offending attribute, e.g. `filter.user_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Failing diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Non-failing diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Attach a longer explanation.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Point at an attribute path.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// `true` for [`DiagnosticSeverity::Error`].
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}
