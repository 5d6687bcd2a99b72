use serde::{Deserialize, Serialize};

/// Configuration for an LLM model.
///
/// Immutable: the `with_*` builders return modified copies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub top_p: f64,
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

impl ModelConfig {
    /// Creates a config with the default sampling parameters
    /// (temperature 0.7, 4096 max tokens).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: String::new(),
            temperature: 0.7,
            max_tokens: 4096,
            top_p: 0.0,
        }
    }

    pub fn with_temperature(mut self, t: f64) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_max_tokens(mut self, t: u32) -> Self {
        self.max_tokens = t;
        self
    }

    pub fn with_top_p(mut self, p: f64) -> Self {
        self.top_p = p;
        self
    }

    pub fn with_provider(mut self, p: impl Into<String>) -> Self {
        self.provider = p.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let m = ModelConfig::new("gpt-4");
        assert_eq!(m.temperature, 0.7);
        assert_eq!(m.max_tokens, 4096);
    }

    #[test]
    fn builders_return_copies() {
        let base = ModelConfig::new("gpt-4");
        let warm = base.clone().with_temperature(1.0);
        assert_eq!(base.temperature, 0.7);
        assert_eq!(warm.temperature, 1.0);
    }
}
