use serde::{Deserialize, Serialize};

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, rename = "apiKey")]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default, rename = "baseUrl")]
    pub base_url: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            base_url: None,
        }
    }
}

redact_debug!(GeminiConfig, redact(api_key), model, base_url,);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
}
