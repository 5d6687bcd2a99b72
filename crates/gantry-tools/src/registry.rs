use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use gantry_core::{AgentError, ErrorKind, ToolSchema};

use crate::{to_schemas, FetchUrl, Tool, WebSearch};

/// Concurrent name-to-tool map. Writes take the exclusive lock, reads the
/// shared one.
#[derive(Default)]
pub struct Registry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        let Ok(mut guard) = self.tools.write() else { return };
        guard.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let guard = self.tools.read().ok()?;
        guard.get(name).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        let Ok(guard) = self.tools.read() else { return Vec::new() };
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }

    /// Looks up a set of tools by name, failing on the first missing one.
    pub fn get_multiple(&self, names: &[String]) -> Result<Vec<Arc<dyn Tool>>, AgentError> {
        let guard = self.tools.read().map_err(|_| {
            AgentError::new("registry.get", ErrorKind::ExecutionFailed("lock poisoned".into()))
        })?;

        let mut result = Vec::with_capacity(names.len());
        for name in names {
            let tool = guard.get(name).ok_or_else(|| {
                AgentError::new("registry.get", ErrorKind::ToolNotFound(name.clone()))
            })?;
            result.push(Arc::clone(tool));
        }
        Ok(result)
    }

    pub fn schemas(&self, names: &[String]) -> Result<Vec<ToolSchema>, AgentError> {
        let tools = self.get_multiple(names)?;
        Ok(to_schemas(&tools))
    }
}

static DEFAULT_REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(|| {
    let registry = Registry::new();
    registry.register(Arc::new(FetchUrl::new()));
    registry.register(Arc::new(WebSearch::unconfigured()));
    Arc::new(registry)
});

/// The process-wide registry, pre-seeded with the self-contained
/// built-ins. Engines fall back to it when no explicit registry is
/// configured; tests should always pass their own.
pub fn default_registry() -> Arc<Registry> {
    Arc::clone(&DEFAULT_REGISTRY)
}

pub fn register(tool: Arc<dyn Tool>) {
    default_registry().register(tool);
}

pub fn get(name: &str) -> Option<Arc<dyn Tool>> {
    default_registry().get(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })
        }

        async fn execute(&self, args: Value) -> Result<String, AgentError> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[test]
    fn register_and_get() {
        let registry = Registry::new();
        registry.register(Arc::new(Echo));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.list(), vec!["echo"]);
    }

    #[test]
    fn get_multiple_fails_on_missing_tool() {
        let registry = Registry::new();
        registry.register(Arc::new(Echo));

        let err = match registry.get_multiple(&["echo".into(), "missing".into()]) {
            Ok(_) => panic!("expected get_multiple to fail"),
            Err(e) => e,
        };
        assert!(matches!(err.kind, ErrorKind::ToolNotFound(ref name) if name == "missing"));
    }

    #[test]
    fn schemas_carry_parameter_documents() {
        let registry = Registry::new();
        registry.register(Arc::new(Echo));

        let schemas = registry.schemas(&["echo".into()]).unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "echo");
        assert_eq!(schemas[0].parameters["type"], "object");
    }

    #[test]
    fn default_registry_has_builtins() {
        assert!(default_registry().get("fetch_url").is_some());
        assert!(default_registry().get("web_search").is_some());
    }
}
