//! Model templates for building data items.
//!
//! A [`Template`] declares the fields every item should carry and how each
//! one is copied into a new instance. It is compiled once, when the data
//! source is constructed, into a [`CompiledTemplate`]: a fixed list of
//! `(field, strategy)` pairs. Instantiation only reads that plan.

use crate::{config::ConfigError, FieldMap};
use std::collections::HashSet;
use std::fmt;

/// How a template field behaves, decided when the template is declared.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Plain value; the default is copied when the field is not provided
    Value(serde_json::Value),
    /// Value owned by each instance; never shared between items
    Observable(serde_json::Value),
    /// Nested model built from its own template
    NestedModel(Template),
    /// Object whose default keys are deep-copied, provided keys merged over them
    PlainObject(FieldMap),
    /// Client-only value; never sent to the remote store and never diffed
    Opaque(serde_json::Value),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Value(_) => write!(f, "Value"),
            FieldKind::Observable(_) => write!(f, "Observable"),
            FieldKind::NestedModel(_) => write!(f, "NestedModel"),
            FieldKind::PlainObject(_) => write!(f, "PlainObject"),
            FieldKind::Opaque(_) => write!(f, "Opaque"),
        }
    }
}

/// A named template field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,
    /// Field behaviour
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Create a new field descriptor.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Declaration of the fields of a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    fields: Vec<FieldDescriptor>,
}

impl Template {
    /// Create an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field descriptor.
    pub fn add_field(&mut self, field: FieldDescriptor) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Builder-style method to add a field descriptor.
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.add_field(field);
        self
    }

    pub fn value(self, name: impl Into<String>, default: impl Into<serde_json::Value>) -> Self {
        self.with_field(FieldDescriptor::new(name, FieldKind::Value(default.into())))
    }

    pub fn observable(self, name: impl Into<String>, default: impl Into<serde_json::Value>) -> Self {
        self.with_field(FieldDescriptor::new(
            name,
            FieldKind::Observable(default.into()),
        ))
    }

    pub fn nested(self, name: impl Into<String>, template: Template) -> Self {
        self.with_field(FieldDescriptor::new(name, FieldKind::NestedModel(template)))
    }

    pub fn plain_object(self, name: impl Into<String>, default: FieldMap) -> Self {
        self.with_field(FieldDescriptor::new(name, FieldKind::PlainObject(default)))
    }

    pub fn opaque(self, name: impl Into<String>, default: impl Into<serde_json::Value>) -> Self {
        self.with_field(FieldDescriptor::new(name, FieldKind::Opaque(default.into())))
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Compile the template into an instantiation plan.
    ///
    /// Fails on empty or duplicate field names, including inside nested
    /// templates.
    pub fn compile(&self) -> Result<CompiledTemplate, ConfigError> {
        let mut seen = HashSet::new();
        let mut plan = Vec::with_capacity(self.fields.len());

        for field in &self.fields {
            if field.name.is_empty() {
                return Err(ConfigError::InvalidTemplate(
                    "field name must not be empty".into(),
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigError::InvalidTemplate(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }

            let strategy = match &field.kind {
                FieldKind::Value(default) | FieldKind::Observable(default) => {
                    CopyStrategy::Replace(default.clone())
                }
                FieldKind::NestedModel(template) => CopyStrategy::Instantiate(template.compile()?),
                FieldKind::PlainObject(default) => CopyStrategy::MergeObject(default.clone()),
                FieldKind::Opaque(default) => CopyStrategy::LocalOnly(default.clone()),
            };
            plan.push((field.name.clone(), strategy));
        }

        Ok(CompiledTemplate { plan })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CopyStrategy {
    Replace(serde_json::Value),
    MergeObject(FieldMap),
    Instantiate(CompiledTemplate),
    LocalOnly(serde_json::Value),
}

/// A template compiled into a fixed instantiation plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledTemplate {
    plan: Vec<(String, CopyStrategy)>,
}

impl CompiledTemplate {
    /// Build the fields of a new instance from the provided fields.
    ///
    /// Fields the template does not name pass through unchanged.
    pub fn instantiate(&self, provided: FieldMap) -> FieldMap {
        let mut fields = provided;

        for (name, strategy) in &self.plan {
            match strategy {
                CopyStrategy::Replace(default) | CopyStrategy::LocalOnly(default) => {
                    if !fields.contains_key(name) {
                        fields.insert(name.clone(), default.clone());
                    }
                }
                CopyStrategy::MergeObject(default) => match fields.remove(name) {
                    Some(serde_json::Value::Object(overrides)) => {
                        let mut merged = default.clone();
                        merged.extend(overrides);
                        fields.insert(name.clone(), serde_json::Value::Object(merged));
                    }
                    Some(other) => {
                        fields.insert(name.clone(), other);
                    }
                    None => {
                        fields.insert(name.clone(), serde_json::Value::Object(default.clone()));
                    }
                },
                CopyStrategy::Instantiate(nested) => match fields.remove(name) {
                    Some(serde_json::Value::Object(sub)) => {
                        fields.insert(name.clone(), nested.instantiate(sub).into());
                    }
                    Some(other) => {
                        fields.insert(name.clone(), other);
                    }
                    None => {
                        fields.insert(name.clone(), nested.instantiate(FieldMap::new()).into());
                    }
                },
            }
        }

        fields
    }

    /// The fields of `fields` that are sent to the remote store.
    pub fn payload(&self, fields: &FieldMap) -> FieldMap {
        let mut payload = fields.clone();

        for (name, strategy) in &self.plan {
            match strategy {
                CopyStrategy::LocalOnly(_) => {
                    payload.remove(name);
                }
                CopyStrategy::Instantiate(nested) => {
                    if let Some(serde_json::Value::Object(sub)) = payload.get_mut(name) {
                        *sub = nested.payload(sub);
                    }
                }
                _ => {}
            }
        }

        payload
    }

    /// Copy the local-only values of `previous` into `fields`.
    pub fn retain_local(&self, previous: &FieldMap, fields: &mut FieldMap) {
        for (name, strategy) in &self.plan {
            match strategy {
                CopyStrategy::LocalOnly(_) => {
                    if let Some(value) = previous.get(name) {
                        fields.insert(name.clone(), value.clone());
                    }
                }
                CopyStrategy::Instantiate(nested) => {
                    if let (
                        Some(serde_json::Value::Object(prev)),
                        Some(serde_json::Value::Object(sub)),
                    ) = (previous.get(name), fields.get_mut(name))
                    {
                        nested.retain_local(prev, sub);
                    }
                }
                _ => {}
            }
        }
    }

    /// Whether the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }
}
