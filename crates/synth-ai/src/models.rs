//! Model registry: a small table of presets with a public lookup API.

use crate::{Model, Provider};

struct ModelEntry {
    id: &'static str,
    name: &'static str,
    provider: Provider,
}

const MODEL_ENTRIES: &[ModelEntry] = &[
    ModelEntry {
        id: "Compressa-Qwen2.5-14B-Instruct",
        name: "Compressa Qwen2.5 14B Instruct",
        provider: Provider::Compressa,
    },
    ModelEntry {
        id: "gpt-4o-mini",
        name: "GPT-4o mini",
        provider: Provider::OpenAI,
    },
    ModelEntry {
        id: "gpt-4o",
        name: "GPT-4o",
        provider: Provider::OpenAI,
    },
    ModelEntry {
        id: "llama3.1",
        name: "Llama 3.1 (Ollama)",
        provider: Provider::Ollama,
    },
];

impl ModelEntry {
    fn to_model(&self) -> Model {
        Model {
            id: self.id.to_string(),
            name: self.name.to_string(),
            provider: self.provider,
            base_url: self.provider.default_base_url().to_string(),
            headers: Default::default(),
        }
    }
}

/// Look up a model by provider and ID.
pub fn get_model(provider: Provider, id: &str) -> Option<Model> {
    MODEL_ENTRIES
        .iter()
        .find(|e| e.id == id && e.provider == provider)
        .map(|e| e.to_model())
}

/// First registered model for a provider.
pub fn default_model(provider: Provider) -> Option<Model> {
    MODEL_ENTRIES
        .iter()
        .find(|e| e.provider == provider)
        .map(|e| e.to_model())
}

/// Resolve a model for the given provider. Registered models are returned as
/// is; unknown IDs get a generic definition. `base_url` overrides the
/// provider default either way.
pub fn resolve_model(provider: Provider, id: Option<&str>, base_url: Option<&str>) -> Model {
    let mut model = match id {
        Some(id) => get_model(provider, id).unwrap_or_else(|| Model {
            id: id.to_string(),
            name: id.to_string(),
            provider,
            base_url: provider.default_base_url().to_string(),
            headers: Default::default(),
        }),
        None => default_model(provider).unwrap_or_else(|| Model {
            id: "default".to_string(),
            name: "default".to_string(),
            provider,
            base_url: provider.default_base_url().to_string(),
            headers: Default::default(),
        }),
    };

    if let Some(url) = base_url {
        model.base_url = url.trim_end_matches('/').to_string();
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_compressa_model() {
        let model = default_model(Provider::Compressa).unwrap();
        assert_eq!(model.base_url, "https://compressa-api.mil-team.ru/v1");
    }

    #[test]
    fn test_resolve_unknown_id_keeps_provider_url() {
        let model = resolve_model(Provider::OpenAI, Some("my-finetune"), None);
        assert_eq!(model.id, "my-finetune");
        assert_eq!(model.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_resolve_base_url_override() {
        let model = resolve_model(Provider::Custom, Some("local"), Some("http://127.0.0.1:8000/v1/"));
        assert_eq!(model.base_url, "http://127.0.0.1:8000/v1");
        assert_eq!(model.provider, Provider::Custom);
    }

    #[test]
    fn test_registered_model_matches_provider() {
        let model = resolve_model(Provider::OpenAI, Some("gpt-4o-mini"), None);
        assert_eq!(model.name, "GPT-4o mini");
        assert!(get_model(Provider::Ollama, "gpt-4o-mini").is_none());
    }
}
