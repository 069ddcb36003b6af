//! Model catalog: short labels clients send, mapped to a provider and the
//! model ID used on the wire.

use sandcode_provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Label used when a request names no model or an unknown one.
pub const DEFAULT_MODEL_LABEL: &str = "kimi2";

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub provider: ProviderKind,
    pub model: String,
}

impl ModelEntry {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

const BUILTIN: &[(&str, ProviderKind, &str)] = &[
    ("kimi2", ProviderKind::Groq, "llama3-70b-8192"),
    ("llama3-8b", ProviderKind::Groq, "llama3-8b-8192"),
    ("mixtral", ProviderKind::Groq, "mixtral-8x7b-32768"),
    ("gpt5", ProviderKind::OpenAI, "gpt-5-2025-08-07"),
    ("gpt4o", ProviderKind::OpenAI, "gpt-4o"),
    ("gpt4o-mini", ProviderKind::OpenAI, "gpt-4o-mini"),
    ("gpt41-mini", ProviderKind::OpenAI, "gpt-4.1-mini"),
    ("claude", ProviderKind::Anthropic, "claude-3-opus-20240229"),
];

/// Label → model lookup with a default fallback.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: BTreeMap<String, ModelEntry>,
    default_label: String,
    default_entry: ModelEntry,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelCatalog {
    /// The built-in labels.
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(label, provider, model)| (label.to_string(), ModelEntry::new(*provider, *model)))
            .collect();
        Self {
            entries,
            default_label: DEFAULT_MODEL_LABEL.to_string(),
            default_entry: ModelEntry::new(ProviderKind::Groq, "llama3-70b-8192"),
        }
    }

    /// Add or override labels.
    pub fn with_entries(mut self, extra: HashMap<String, ModelEntry>) -> Self {
        if let Some(entry) = extra.get(&self.default_label) {
            self.default_entry = entry.clone();
        }
        self.entries.extend(extra);
        self
    }

    /// Change the fallback label. Ignored (with a warning) when the label is
    /// not in the catalog.
    pub fn with_default(mut self, label: &str) -> Self {
        if let Some(entry) = self.entries.get(label) {
            self.default_entry = entry.clone();
            self.default_label = label.to_string();
        } else {
            warn!(label = %label, "Unknown default model label, keeping {}", self.default_label);
        }
        self
    }

    pub fn default_label(&self) -> &str {
        &self.default_label
    }

    /// Resolve a label, falling back to the default for `None` and unknown
    /// labels. Returns the label actually used.
    pub fn resolve<'a>(&'a self, label: Option<&'a str>) -> (&'a str, &'a ModelEntry) {
        if let Some((label, entry)) = label.and_then(|l| self.entries.get_key_value(l)) {
            return (label.as_str(), entry);
        }
        if let Some(label) = label {
            warn!(label = %label, fallback = %self.default_label, "Unknown model label");
        }
        (self.default_label.as_str(), &self.default_entry)
    }

    /// All labels with their entries, sorted by label.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ModelEntry)> {
        self.entries.iter().map(|(label, entry)| (label.as_str(), entry))
    }
}
