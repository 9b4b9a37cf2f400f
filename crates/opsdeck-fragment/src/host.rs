use std::sync::{Arc, Mutex};

use opsdeck_core::ScriptTaskError;

use crate::container::{Container, ScriptKind, ScriptTask};

/// Fresh executable node built from an inert script: same attributes,
/// same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptNode {
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl ScriptNode {
    pub fn from_task(task: &ScriptTask) -> Self {
        let text = match &task.kind {
            ScriptKind::Inline { code } => code.clone(),
            ScriptKind::External { .. } => String::new(),
        };
        Self {
            attributes: task.attributes.clone(),
            text,
        }
    }

    pub fn src(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("src"))
            .map(|(_, v)| v.as_str())
    }

    pub fn to_html(&self) -> String {
        let mut out = String::from("<script");
        for (name, value) in &self.attributes {
            if value.is_empty() {
                out.push_str(&format!(" {name}"));
            } else {
                out.push_str(&format!(" {name}=\"{}\"", escape_attr(value)));
            }
        }
        out.push('>');
        out.push_str(&self.text);
        out.push_str("</script>");
        out
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Where reanimated scripts are appended (document body scope, never the
/// result container itself).
#[async_trait::async_trait]
pub trait ScriptHost: Send + Sync {
    /// Append an external script and resolve once it has loaded or failed.
    async fn append_external(&self, node: &ScriptNode, src: &str) -> Result<(), ScriptTaskError>;

    /// Append an inline script; it runs on insertion.
    async fn append_inline(&self, node: &ScriptNode);
}

/// Fetches an external script so its load outcome can be reported.
#[async_trait::async_trait]
pub trait ResourceLoader: Send + Sync {
    async fn load(&self, src: &str) -> Result<(), String>;
}

// ── DocumentHost ──

/// Host that assembles a standalone HTML document: the installed result
/// followed by every reanimated script in dispatch order. External loads
/// are checked through an optional [`ResourceLoader`]; without one they
/// are assumed to load.
pub struct DocumentHost {
    loader: Option<Arc<dyn ResourceLoader>>,
    body: Mutex<Vec<ScriptNode>>,
}

impl Default for DocumentHost {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DocumentHost {
    pub fn new(loader: Option<Arc<dyn ResourceLoader>>) -> Self {
        Self {
            loader,
            body: Mutex::new(Vec::new()),
        }
    }

    /// Nodes appended so far, in order.
    pub fn appended(&self) -> Vec<ScriptNode> {
        self.body.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Render the document around `container`.
    pub fn to_html(&self, title: &str, container: &Container) -> String {
        let scripts: String = self
            .appended()
            .iter()
            .map(|n| format!("{}\n", n.to_html()))
            .collect();
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<div id=\"results-box\">\n{}\n</div>\n{}</body>\n</html>\n",
            escape_attr(title),
            container.markup(),
            scripts
        )
    }

    fn push(&self, node: &ScriptNode) {
        self.body
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(node.clone());
    }
}

#[async_trait::async_trait]
impl ScriptHost for DocumentHost {
    async fn append_external(&self, node: &ScriptNode, src: &str) -> Result<(), ScriptTaskError> {
        self.push(node);
        match &self.loader {
            Some(loader) => loader
                .load(src)
                .await
                .map_err(|reason| ScriptTaskError::Load {
                    src: src.to_string(),
                    reason,
                }),
            None => Ok(()),
        }
    }

    async fn append_inline(&self, node: &ScriptNode) {
        self.push(node);
    }
}
