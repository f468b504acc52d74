//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining resource and data source
//! schemas, plus the schema-driven checks run on configuration and plans:
//! [`validate_config`] and [`plan_change`].

use crate::plan_modifier::{PlanModifier, PlanModifyRequest};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use crate::validator::Validator;
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>), // Ordered, allows duplicates
    Set(Box<AttributeType>),  // Unordered, no duplicates
    Map(Box<AttributeType>),  // String keys only
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested_block(&self, name: &str) -> Option<&NestedBlock> {
        self.block.block_types.iter().find(|b| b.type_name == name)
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub deprecated: bool,
    /// Groups of attribute or block names where exactly one must be set
    pub exactly_one_of: Vec<Vec<String>>,
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub deprecated: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    /// Run against each element of a list or set value
    pub element_validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &(self.validators.len() + self.element_validators.len()),
            )
            .field("plan_modifiers", &self.plan_modifiers.len())
            .finish()
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    /// Zero means unbounded
    pub max_items: i64,
    /// Computed blocks keep the provider's value when absent from config
    pub computed: bool,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
}

impl std::fmt::Debug for NestedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedBlock")
            .field("type_name", &self.type_name)
            .field("block", &self.block)
            .field("nesting", &self.nesting)
            .field("min_items", &self.min_items)
            .field("max_items", &self.max_items)
            .field("computed", &self.computed)
            .field("plan_modifiers", &self.plan_modifiers.len())
            .finish()
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    List,
    Set,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                deprecated: false,
                validators: Vec::new(),
                element_validators: Vec::new(),
                plan_modifiers: Vec::new(),
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn element_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.attribute.element_validators.push(validator);
        self
    }

    pub fn plan_modifier(mut self, modifier: Arc<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// NestedBlockBuilder builds list or set blocks such as `oidc_config { ... }`
pub struct NestedBlockBuilder {
    nested: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn new(type_name: &str) -> Self {
        Self {
            nested: NestedBlock {
                type_name: type_name.to_string(),
                block: Block::default(),
                nesting: NestingMode::List,
                min_items: 0,
                max_items: 0,
                computed: false,
                plan_modifiers: Vec::new(),
            },
        }
    }

    pub fn nesting(mut self, nesting: NestingMode) -> Self {
        self.nested.nesting = nesting;
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.nested.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.nested.max_items = max;
        self
    }

    pub fn computed(mut self) -> Self {
        self.nested.computed = true;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.nested.block.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.nested.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.nested.block.block_types.push(block);
        self
    }

    pub fn plan_modifier(mut self, modifier: Arc<dyn PlanModifier>) -> Self {
        self.nested.plan_modifiers.push(modifier);
        self
    }

    pub fn build(self) -> NestedBlock {
        self.nested
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::default(),
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    /// Exactly one of the named attributes or blocks must be configured
    pub fn exactly_one_of(mut self, names: &[&str]) -> Self {
        self.schema
            .block
            .exactly_one_of
            .push(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a configuration against the schema: required attributes, read-only
/// attributes, block item counts, validators and exactly-one-of groups.
pub fn validate_config(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(
        &schema.block,
        &config.value,
        &AttributePath::root(),
        &mut diagnostics,
    );
    diagnostics
}

fn validate_block(
    block: &Block,
    value: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if value.is_unknown() {
        return;
    }
    let field = |name: &str| field_value(value, name);

    for attr in &block.attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let attr_value = field(&attr.name);

        if attr_value.is_null() {
            if attr.required {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!(
                            "The argument \"{}\" is required, but no definition was found.",
                            attr.name
                        ),
                    )
                    .with_attribute(attr_path),
                );
            }
            continue;
        }

        if attr.computed && !attr.optional && !attr.required {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid Configuration for Read-Only Attribute",
                    format!(
                        "Cannot set value for \"{}\" as the provider has marked it as read-only.",
                        attr.name
                    ),
                )
                .with_attribute(attr_path),
            );
            continue;
        }

        if attr_value.is_unknown() {
            continue;
        }

        for validator in &attr.validators {
            validator.validate(attr_value, &attr_path, diagnostics);
        }
        if let Some(elements) = attr_value.as_list() {
            for (idx, element) in elements.iter().enumerate() {
                let element_path = attr_path.clone().index(idx as i64);
                for validator in &attr.element_validators {
                    validator.validate(element, &element_path, diagnostics);
                }
            }
        }
    }

    for nested in &block.block_types {
        let block_path = path.clone().attribute(&nested.type_name);
        let block_value = field(&nested.type_name);
        if block_value.is_unknown() {
            continue;
        }
        let items = block_value.as_list().unwrap_or_default();

        if (items.len() as i64) < nested.min_items {
            diagnostics.push(
                Diagnostic::error(
                    format!("Insufficient {} blocks", nested.type_name),
                    format!(
                        "At least {} \"{}\" blocks are required.",
                        nested.min_items, nested.type_name
                    ),
                )
                .with_attribute(block_path.clone()),
            );
        }
        if nested.max_items > 0 && items.len() as i64 > nested.max_items {
            diagnostics.push(
                Diagnostic::error(
                    format!("Too many {} blocks", nested.type_name),
                    format!(
                        "No more than {} \"{}\" blocks are allowed",
                        nested.max_items, nested.type_name
                    ),
                )
                .with_attribute(block_path.clone()),
            );
        }

        for (idx, item) in items.iter().enumerate() {
            validate_block(
                &nested.block,
                item,
                &block_path.clone().index(idx as i64),
                diagnostics,
            );
        }
    }

    for group in &block.exactly_one_of {
        let specified: Vec<&str> = group
            .iter()
            .map(String::as_str)
            .filter(|name| {
                let v = field(name);
                v.is_unknown() || !v.is_zero()
            })
            .collect();
        let Some(first) = group.first() else {
            continue;
        };
        let joined = group.join(",");

        match specified.len() {
            1 => {}
            0 => diagnostics.push(
                Diagnostic::error(
                    "Invalid combination of arguments",
                    format!("\"{}\": one of `{}` must be specified", first, joined),
                )
                .with_attribute(path.clone().attribute(first)),
            ),
            _ => diagnostics.push(
                Diagnostic::error(
                    "Invalid combination of arguments",
                    format!(
                        "\"{}\": only one of `{}` can be specified, but `{}` were specified.",
                        specified[0],
                        joined,
                        specified.join(",")
                    ),
                )
                .with_attribute(path.clone().attribute(specified[0])),
            ),
        }
    }
}

fn field_value<'a>(value: &'a Dynamic, name: &str) -> &'a Dynamic {
    const NULL: &Dynamic = &Dynamic::Null;
    value.as_map().and_then(|m| m.get(name)).unwrap_or(NULL)
}

/// Outcome of planning a resource change
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Turn Terraform's proposed new state into a plan.
///
/// On create, computed values the configuration left null become unknown.
/// Plan modifiers of root attributes and blocks then run against the prior
/// state. Replacement is only ever requested for existing resources.
pub fn plan_change(
    schema: &Schema,
    prior_state: &DynamicValue,
    proposed_new_state: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    let mut planned = proposed_new_state.clone();
    let mut requires_replace = Vec::new();
    let mut diagnostics = Vec::new();

    if planned.is_null() {
        // destroy plan
        return PlannedChange {
            planned_state: planned,
            requires_replace,
            diagnostics,
        };
    }

    let creating = prior_state.is_null();
    let targets = schema
        .block
        .attributes
        .iter()
        .map(|a| (a.name.as_str(), a.computed, &a.plan_modifiers))
        .chain(
            schema
                .block
                .block_types
                .iter()
                .map(|b| (b.type_name.as_str(), b.computed, &b.plan_modifiers)),
        );

    for (name, computed, modifiers) in targets {
        let path = AttributePath::new(name);
        let mut plan_value = planned.get_or_null(&path);
        let config_value = config.get_or_null(&path);

        if creating && computed && config_value.is_zero() && plan_value.is_zero() {
            plan_value = Dynamic::Unknown;
        }

        for modifier in modifiers {
            let response = modifier.modify_plan(PlanModifyRequest {
                state: prior_state.get_or_null(&path),
                plan: plan_value,
                config: config_value.clone(),
                attribute_path: path.clone(),
            });
            plan_value = response.plan_value;
            diagnostics.extend(response.diagnostics);
            if response.requires_replace && !creating && !requires_replace.contains(&path) {
                requires_replace.push(path.clone());
            }
        }

        if let Err(e) = planned.set(&path, plan_value) {
            diagnostics.push(
                Diagnostic::error("Failed to build plan", e.to_string()).with_attribute(path),
            );
        }
    }

    PlannedChange {
        planned_state: planned,
        requires_replace,
        diagnostics,
    }
}

/// Paths whose change between `prior` and `planned` forces replacement
pub fn requires_replace(
    schema: &Schema,
    prior: &DynamicValue,
    planned: &DynamicValue,
) -> Vec<AttributePath> {
    plan_change(schema, prior, planned, planned).requires_replace
}
