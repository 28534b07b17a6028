//! Component registry & factory.
//!
//! Every pluggable part of the engine — parser, chunker, embedder,
//! indexer, searcher, optimizer — is a [`Component`] registered under a
//! [`Category`] by name. Orchestrators never name a concrete
//! implementation; they ask the registry to `create` one from a config
//! blob, the way `llmspell-rag`'s `EmbeddingFactory` routes on a
//! provider-type enum rather than matching on concrete structs.

use crate::error::{PipelineError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The fixed, closed set of component categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Byte + filename -> normalized text.
    Parsers,
    /// Text -> positioned chunks.
    Chunkers,
    /// Text -> dense vectors.
    Embedders,
    /// Vector/text persistence.
    Indexers,
    /// Query -> ranked results.
    Searchers,
    /// Result list -> result list.
    Optimizers,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsers => "parsers",
            Self::Chunkers => "chunkers",
            Self::Embedders => "embedders",
            Self::Indexers => "indexers",
            Self::Searchers => "searchers",
            Self::Optimizers => "optimizers",
        };
        write!(f, "{name}")
    }
}

/// Describes a registered component for discovery (`list`) purposes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComponentMetadata {
    /// Registered name, e.g. "recursive".
    pub name: String,
    /// One-line description of what the component does.
    pub description: String,
    /// JSON-Schema-shaped config schema (informal: a map of param name to
    /// an object describing type/required/enum).
    pub config_schema: Value,
    /// Output vector dimension, populated only for embedders.
    pub output_dimension: Option<usize>,
}

/// A single parameter's schema, used to validate configs generically.
#[derive(Debug, Clone)]
pub struct ParamSchema {
    /// Parameter name as it appears in the config JSON object.
    pub name: &'static str,
    /// Expected JSON type: "string", "number", "integer", "boolean", "array", "object".
    pub kind: &'static str,
    /// Whether the key must be present.
    pub required: bool,
    /// Allowed values, if this parameter is an enum. Empty means unconstrained.
    pub allowed: &'static [&'static str],
}

/// A component's declared config schema: which params it accepts.
#[derive(Debug, Clone, Default)]
pub struct ConfigSchema {
    /// The parameters this component's config object may contain.
    pub params: Vec<ParamSchema>,
}

impl ConfigSchema {
    /// Validate a config object against this schema.
    ///
    /// Enforces required keys, type compatibility, enum membership, and
    /// rejects unknown keys.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` on any schema violation.
    pub fn validate(&self, config: &Value) -> Result<()> {
        let obj = config.as_object().ok_or_else(|| {
            PipelineError::validation("component config must be a JSON object")
        })?;

        let known: std::collections::HashSet<&str> =
            self.params.iter().map(|p| p.name).collect();
        for key in obj.keys() {
            if key == "type" {
                continue;
            }
            if !known.contains(key.as_str()) {
                return Err(PipelineError::validation(format!(
                    "unknown parameter '{key}'"
                )));
            }
        }

        for param in &self.params {
            let Some(value) = obj.get(param.name) else {
                if param.required {
                    return Err(PipelineError::validation(format!(
                        "missing required parameter '{}'",
                        param.name
                    )));
                }
                continue;
            };

            let type_ok = match param.kind {
                "string" => value.is_string(),
                "number" => value.is_number(),
                "integer" => value.is_i64() || value.is_u64(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !type_ok {
                return Err(PipelineError::validation(format!(
                    "parameter '{}' must be of type {}",
                    param.name, param.kind
                )));
            }

            if !param.allowed.is_empty() {
                let s = value.as_str().ok_or_else(|| {
                    PipelineError::validation(format!(
                        "parameter '{}' must be a string to match an enum",
                        param.name
                    ))
                })?;
                if !param.allowed.contains(&s) {
                    return Err(PipelineError::validation(format!(
                        "parameter '{}' must be one of {:?}, got '{}'",
                        param.name, param.allowed, s
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A component registered under a category: a name, a config schema, and
/// a constructor that yields a boxed instance. The instance type is
/// erased behind `Box<dyn Any + Send + Sync>`-free category-specific
/// factories (see `ParserFactory`, `ChunkerFactory`, etc.) rather than a
/// single `dyn Any` registry, so each category's `create` returns a
/// properly typed trait object — verified at registration time, not cast
/// at call time.
pub trait ComponentDescriptor: Send + Sync {
    /// Registered name.
    fn name(&self) -> &str;
    /// One-line description.
    fn description(&self) -> &str;
    /// Config schema for validation.
    fn schema(&self) -> &ConfigSchema;
    /// Output dimension, for embedders only.
    fn output_dimension(&self) -> Option<usize> {
        None
    }
}

/// A generic, name-keyed factory for one category of component.
///
/// `T` is the trait object type the category produces, e.g.
/// `Arc<dyn crate::parsers::Parser>`.
pub struct Factory<T> {
    category: Category,
    constructors: HashMap<String, Arc<dyn Fn(&Value) -> Result<T> + Send + Sync>>,
    schemas: HashMap<String, ConfigSchema>,
    descriptions: HashMap<String, String>,
    dimensions: HashMap<String, usize>,
}

impl<T> Factory<T> {
    /// Create an empty factory for the given category.
    #[must_use]
    pub fn new(category: Category) -> Self {
        Self {
            category,
            constructors: HashMap::new(),
            schemas: HashMap::new(),
            descriptions: HashMap::new(),
            dimensions: HashMap::new(),
        }
    }

    /// Register a component constructor under `name`. Idempotent within a
    /// process lifetime: re-registering the same name overwrites the
    /// previous constructor rather than erroring.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ConfigSchema,
        constructor: impl Fn(&Value) -> Result<T> + Send + Sync + 'static,
    ) {
        let name = name.into();
        self.descriptions.insert(name.clone(), description.into());
        self.schemas.insert(name.clone(), schema);
        self.constructors.insert(name, Arc::new(constructor));
    }

    /// Register a component that additionally declares a fixed output
    /// dimension (used for embedders).
    pub fn register_with_dimension(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ConfigSchema,
        dimension: usize,
        constructor: impl Fn(&Value) -> Result<T> + Send + Sync + 'static,
    ) {
        let name = name.into();
        self.dimensions.insert(name.clone(), dimension);
        self.register(name, description, schema, constructor);
    }

    /// Validate a config against a registered component's schema without
    /// constructing it.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if the name is unknown or the
    /// config fails schema validation.
    pub fn validate(&self, name: &str, config: &Value) -> Result<()> {
        let schema = self
            .schemas
            .get(name)
            .ok_or_else(|| self.unknown_component_error(name))?;
        schema.validate(config)
    }

    /// Construct an instance of the named component.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if the name is unknown (the
    /// error lists available names) or the config fails validation.
    pub fn create(&self, name: &str, config: &Value) -> Result<T> {
        self.validate(name, config)?;
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| self.unknown_component_error(name))?;
        constructor(config)
    }

    /// List metadata for all registered components in this category.
    #[must_use]
    pub fn list(&self) -> Vec<ComponentMetadata> {
        let mut names: Vec<&String> = self.descriptions.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| ComponentMetadata {
                name: name.clone(),
                description: self.descriptions.get(name).cloned().unwrap_or_default(),
                config_schema: schema_to_json(self.schemas.get(name)),
                output_dimension: self.dimensions.get(name).copied(),
            })
            .collect()
    }

    fn unknown_component_error(&self, name: &str) -> PipelineError {
        let mut available: Vec<&String> = self.constructors.keys().collect();
        available.sort();
        PipelineError::validation(format!(
            "unknown {} component '{}'; available: {:?}",
            self.category, name, available
        ))
    }
}

fn schema_to_json(schema: Option<&ConfigSchema>) -> Value {
    let Some(schema) = schema else {
        return Value::Null;
    };
    let params: serde_json::Map<String, Value> = schema
        .params
        .iter()
        .map(|p| {
            (
                p.name.to_string(),
                serde_json::json!({
                    "type": p.kind,
                    "required": p.required,
                    "enum": p.allowed,
                }),
            )
        })
        .collect();
    Value::Object(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> ConfigSchema {
        ConfigSchema {
            params: vec![
                ParamSchema {
                    name: "chunk_size",
                    kind: "integer",
                    required: true,
                    allowed: &[],
                },
                ParamSchema {
                    name: "mode",
                    kind: "string",
                    required: false,
                    allowed: &["fast", "accurate"],
                },
            ],
        }
    }

    #[test]
    fn unknown_component_lists_available_names() {
        let mut factory: Factory<()> = Factory::new(Category::Chunkers);
        factory.register("recursive", "desc", ConfigSchema::default(), |_| Ok(()));
        let err = factory.create("bogus", &serde_json::json!({})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("recursive"));
    }

    #[test]
    fn schema_rejects_missing_required_and_unknown_params() {
        let schema = sample_schema();
        assert!(schema.validate(&serde_json::json!({"mode": "fast"})).is_err());
        assert!(schema
            .validate(&serde_json::json!({"chunk_size": 10, "bogus": 1}))
            .is_err());
        assert!(schema
            .validate(&serde_json::json!({"chunk_size": 10, "mode": "slow"}))
            .is_err());
        assert!(schema
            .validate(&serde_json::json!({"chunk_size": 10, "mode": "fast"}))
            .is_ok());
    }

    #[test]
    fn register_is_idempotent_within_process() {
        let mut factory: Factory<i32> = Factory::new(Category::Embedders);
        factory.register("x", "first", ConfigSchema::default(), |_| Ok(1));
        factory.register("x", "second", ConfigSchema::default(), |_| Ok(2));
        let created = factory.create("x", &serde_json::json!({})).unwrap();
        assert_eq!(created, 2);
        assert_eq!(factory.list().len(), 1);
    }
}
