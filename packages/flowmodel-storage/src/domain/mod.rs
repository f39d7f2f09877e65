//! Domain layer for flow models
//!
//! # Domain Models
//!
//! - `MethodSignature`: identity of one external API callable
//! - `ModeledMethod`: the model attached to a callable (summary, sink, source, neutral)
//! - `ModelKind`: the four kinds a query stage can produce, in stage order
//! - `ModelMap`: signature → model, last write wins
//!
//! Row parsing and writing for each kind lives in [`rows`].
//!
//! # Examples
//!
//! ```rust
//! use flowmodel_storage::domain::{MethodSignature, ModelKind, ModelMap, rows};
//!
//! let (signature, method) = rows::parse_tuple(
//!     ModelKind::Sink,
//!     "java.sql;Statement;true;execute;(String);;Argument[0];sql;df-generated",
//! )
//! .unwrap();
//! assert_eq!(signature.to_string(), "java.sql.Statement#execute(String)");
//!
//! let mut models = ModelMap::new();
//! models.insert(signature, method);
//! assert_eq!(models.len(), 1);
//! ```

pub mod rows;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::StorageError;

// ═══════════════════════════════════════════════════════════════════════════
// Signature
// ═══════════════════════════════════════════════════════════════════════════

/// Identity of one callable API member
///
/// Canonical form is `{package}.{type_name}#{name}{parameters}`, for example
/// `com.foo.Bar#baz(String)`. The type name and member name are never empty and
/// the parameter shape is always a parenthesised list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodSignature {
    package: String,
    type_name: String,
    name: String,
    parameters: String,
}

impl MethodSignature {
    /// Build a signature from its components, rejecting garbled input
    pub fn new(
        package: impl Into<String>,
        type_name: impl Into<String>,
        name: impl Into<String>,
        parameters: impl Into<String>,
    ) -> Option<Self> {
        let signature = Self {
            package: package.into(),
            type_name: type_name.into(),
            name: name.into(),
            parameters: parameters.into(),
        };
        signature.is_well_formed().then_some(signature)
    }

    fn is_well_formed(&self) -> bool {
        let reserved = |s: &str| s.contains(['#', ';', '(', ')']);

        !self.type_name.is_empty()
            && !self.name.is_empty()
            && !reserved(&self.package)
            && !reserved(&self.type_name)
            && !self.type_name.contains('.')
            && !reserved(&self.name)
            && self.parameters.starts_with('(')
            && self.parameters.ends_with(')')
            && !self.parameters.contains(';')
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &str {
        &self.parameters
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}#{}{}",
            self.package, self.type_name, self.name, self.parameters
        )
    }
}

impl FromStr for MethodSignature {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (qualified_type, member) = s
            .split_once('#')
            .ok_or_else(|| StorageError::invalid_signature(s))?;
        let (package, type_name) = qualified_type
            .rsplit_once('.')
            .unwrap_or(("", qualified_type));
        let paren = member
            .find('(')
            .ok_or_else(|| StorageError::invalid_signature(s))?;
        let (name, parameters) = member.split_at(paren);

        MethodSignature::new(package, type_name, name, parameters)
            .ok_or_else(|| StorageError::invalid_signature(s))
    }
}

impl Serialize for MethodSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MethodSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Model kinds
// ═══════════════════════════════════════════════════════════════════════════

/// Model type tag as seen by callers, including the "no model" default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeledMethodType {
    Summary,
    Sink,
    Source,
    Neutral,
    #[default]
    None,
}

impl ModeledMethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeledMethodType::Summary => "summary",
            ModeledMethodType::Sink => "sink",
            ModeledMethodType::Source => "source",
            ModeledMethodType::Neutral => "neutral",
            ModeledMethodType::None => "none",
        }
    }
}

impl fmt::Display for ModeledMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kinds a generation stage produces (every type except `none`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Summary,
    Sink,
    Source,
    Neutral,
}

impl ModelKind {
    /// All kinds in stage order
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Summary,
        ModelKind::Sink,
        ModelKind::Source,
        ModelKind::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        ModeledMethodType::from(*self).as_str()
    }

    /// Name of the extensible predicate a data extension adds rows to
    pub fn extensible_predicate(&self) -> &'static str {
        match self {
            ModelKind::Summary => "summaryModel",
            ModelKind::Sink => "sinkModel",
            ModelKind::Source => "sourceModel",
            ModelKind::Neutral => "neutralModel",
        }
    }

    pub fn from_extensible_predicate(name: &str) -> Option<Self> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.extensible_predicate() == name)
    }
}

impl From<ModelKind> for ModeledMethodType {
    fn from(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Summary => ModeledMethodType::Summary,
            ModelKind::Sink => ModeledMethodType::Sink,
            ModelKind::Source => ModeledMethodType::Source,
            ModelKind::Neutral => ModeledMethodType::Neutral,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Propagation kind of a summary model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    /// Output is derived from (tainted by) the input
    Taint,
    /// Output is the input value itself
    Value,
}

impl SummaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryKind::Taint => "taint",
            SummaryKind::Value => "value",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "taint" => Some(SummaryKind::Taint),
            "value" => Some(SummaryKind::Value),
            _ => None,
        }
    }
}

/// Where a model came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Manual,
    Generated,
    DfGenerated,
    DfManual,
    AiGenerated,
    AiManual,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Manual => "manual",
            Provenance::Generated => "generated",
            Provenance::DfGenerated => "df-generated",
            Provenance::DfManual => "df-manual",
            Provenance::AiGenerated => "ai-generated",
            Provenance::AiManual => "ai-manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Provenance::Manual),
            "generated" => Some(Provenance::Generated),
            "df-generated" => Some(Provenance::DfGenerated),
            "df-manual" => Some(Provenance::DfManual),
            "ai-generated" => Some(Provenance::AiGenerated),
            "ai-manual" => Some(Provenance::AiManual),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Modeled method
// ═══════════════════════════════════════════════════════════════════════════

/// Data-flow model of one external API method
///
/// `input`/`output` are access paths such as `Argument[0]` or `ReturnValue`.
/// Sink and source kinds are open-ended labels (`sql`, `remote`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModeledMethod {
    /// Propagates taint from `input` to `output`
    Summary {
        input: String,
        output: String,
        kind: SummaryKind,
        provenance: Provenance,
    },
    /// Consumes data flowing into `input` unsafely
    Sink {
        input: String,
        kind: String,
        provenance: Provenance,
    },
    /// Introduces tainted data at `output`
    Source {
        output: String,
        kind: String,
        provenance: Provenance,
    },
    /// Explicitly has no flow effect
    Neutral { provenance: Provenance },
    /// No model
    #[default]
    None,
}

impl ModeledMethod {
    pub fn method_type(&self) -> ModeledMethodType {
        match self {
            ModeledMethod::Summary { .. } => ModeledMethodType::Summary,
            ModeledMethod::Sink { .. } => ModeledMethodType::Sink,
            ModeledMethod::Source { .. } => ModeledMethodType::Source,
            ModeledMethod::Neutral { .. } => ModeledMethodType::Neutral,
            ModeledMethod::None => ModeledMethodType::None,
        }
    }

    /// Stage kind of this model, `None` for the "no model" state
    pub fn kind(&self) -> Option<ModelKind> {
        match self {
            ModeledMethod::Summary { .. } => Some(ModelKind::Summary),
            ModeledMethod::Sink { .. } => Some(ModelKind::Sink),
            ModeledMethod::Source { .. } => Some(ModelKind::Source),
            ModeledMethod::Neutral { .. } => Some(ModelKind::Neutral),
            ModeledMethod::None => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Model map
// ═══════════════════════════════════════════════════════════════════════════

/// Signature → model, iterated in signature order
///
/// Inserting an existing signature replaces its model, so folding stage
/// results in stage order leaves the latest stage's model in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelMap {
    entries: BTreeMap<MethodSignature, ModeledMethod>,
}

impl ModelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a model, returning the one it replaced
    pub fn insert(
        &mut self,
        signature: MethodSignature,
        method: ModeledMethod,
    ) -> Option<ModeledMethod> {
        self.entries.insert(signature, method)
    }

    pub fn get(&self, signature: &MethodSignature) -> Option<&ModeledMethod> {
        self.entries.get(signature)
    }

    pub fn remove(&mut self, signature: &MethodSignature) -> Option<ModeledMethod> {
        self.entries.remove(signature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MethodSignature, &ModeledMethod)> {
        self.entries.iter()
    }

    /// Entries of one kind, in signature order
    pub fn of_kind(
        &self,
        kind: ModelKind,
    ) -> impl Iterator<Item = (&MethodSignature, &ModeledMethod)> {
        self.entries
            .iter()
            .filter(move |(_, method)| method.kind() == Some(kind))
    }
}

impl Extend<(MethodSignature, ModeledMethod)> for ModelMap {
    fn extend<I: IntoIterator<Item = (MethodSignature, ModeledMethod)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl FromIterator<(MethodSignature, ModeledMethod)> for ModelMap {
    fn from_iter<I: IntoIterator<Item = (MethodSignature, ModeledMethod)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ModelMap {
    type Item = (MethodSignature, ModeledMethod);
    type IntoIter = std::collections::btree_map::IntoIter<MethodSignature, ModeledMethod>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(s: &str) -> MethodSignature {
        s.parse().unwrap()
    }

    #[test]
    fn test_signature_parse_and_display() {
        let signature = sig("com.foo.Bar#baz(String,int)");
        assert_eq!(signature.package(), "com.foo");
        assert_eq!(signature.type_name(), "Bar");
        assert_eq!(signature.name(), "baz");
        assert_eq!(signature.parameters(), "(String,int)");
        assert_eq!(signature.to_string(), "com.foo.Bar#baz(String,int)");
    }

    #[test]
    fn test_signature_nested_type_and_default_package() {
        let nested = sig("java.util.Map$Entry#getKey()");
        assert_eq!(nested.package(), "java.util");
        assert_eq!(nested.type_name(), "Map$Entry");

        let default_package = MethodSignature::new("", "Main", "run", "()").unwrap();
        assert_eq!(default_package.to_string(), ".Main#run()");
        assert_eq!(sig(".Main#run()"), default_package);
    }

    #[test]
    fn test_signature_rejects_garbled_input() {
        for garbled in ["", "#", "com.foo.Bar", "com.foo.Bar#baz", "com.foo.#baz()", "com.foo.Bar#(String)"] {
            assert!(garbled.parse::<MethodSignature>().is_err(), "{garbled:?}");
        }
        assert!(MethodSignature::new("com.foo", "Bar", "baz", "String").is_none());
        assert!(MethodSignature::new("com;foo", "Bar", "baz", "()").is_none());
    }

    #[test]
    fn test_model_kind_stage_order() {
        assert_eq!(
            ModelKind::ALL.map(|k| k.as_str()),
            ["summary", "sink", "source", "neutral"]
        );
    }

    #[test]
    fn test_model_kind_extensible_predicate_roundtrip() {
        for kind in ModelKind::ALL {
            assert_eq!(
                ModelKind::from_extensible_predicate(kind.extensible_predicate()),
                Some(kind)
            );
        }
        assert_eq!(ModelKind::from_extensible_predicate("typeModel"), None);
    }

    #[test]
    fn test_modeled_method_default_is_none() {
        let method = ModeledMethod::default();
        assert_eq!(method.method_type(), ModeledMethodType::None);
        assert_eq!(method.kind(), None);
        assert_eq!(ModeledMethodType::default(), ModeledMethodType::None);
    }

    #[test]
    fn test_modeled_method_json_shape() {
        let method = ModeledMethod::Summary {
            input: "Argument[0]".to_string(),
            output: "ReturnValue".to_string(),
            kind: SummaryKind::Taint,
            provenance: Provenance::DfGenerated,
        };
        let json = serde_json::to_value(&method).unwrap();
        assert_eq!(json["type"], "summary");
        assert_eq!(json["kind"], "taint");
        assert_eq!(json["provenance"], "df-generated");
    }

    #[test]
    fn test_model_map_last_write_wins() {
        let mut models = ModelMap::new();
        let key = sig("com.foo.Bar#baz(String)");

        models.insert(
            key.clone(),
            ModeledMethod::Sink {
                input: "Argument[0]".to_string(),
                kind: "sql".to_string(),
                provenance: Provenance::Generated,
            },
        );
        let replaced = models.insert(
            key.clone(),
            ModeledMethod::Neutral {
                provenance: Provenance::Manual,
            },
        );

        assert!(matches!(replaced, Some(ModeledMethod::Sink { .. })));
        assert_eq!(models.len(), 1);
        assert_eq!(models.get(&key).unwrap().method_type(), ModeledMethodType::Neutral);
    }

    #[test]
    fn test_model_map_of_kind() {
        let models: ModelMap = [
            (
                sig("a.A#f()"),
                ModeledMethod::Neutral {
                    provenance: Provenance::Manual,
                },
            ),
            (sig("a.A#g()"), ModeledMethod::None),
        ]
        .into_iter()
        .collect();

        assert_eq!(models.of_kind(ModelKind::Neutral).count(), 1);
        assert_eq!(models.of_kind(ModelKind::Sink).count(), 0);
    }
}
