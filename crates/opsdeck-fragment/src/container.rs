use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").expect("script pattern")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern")
});

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("style pattern"));

static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|h[1-6]|li|tr|table|pre|ul|ol)\s*>").expect("break pattern")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));

/// One executable snippet found in a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTask {
    /// Position among the fragment's scripts, from 0.
    pub order: usize,
    pub kind: ScriptKind,
    /// Attributes in source order, values with entities decoded.
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptKind {
    External { src: String },
    Inline { code: String },
}

impl ScriptTask {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_external(&self) -> bool {
        matches!(self.kind, ScriptKind::External { .. })
    }

    /// Short description for logs: the source URL or the first line of code.
    pub fn label(&self) -> String {
        match &self.kind {
            ScriptKind::External { src } => src.clone(),
            ScriptKind::Inline { code } => {
                let first = code.trim().lines().next().unwrap_or("");
                let short: String = first.chars().take(40).collect();
                format!("inline #{}: {short}", self.order + 1)
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Markup(String),
    Script { task: ScriptTask, raw: String },
}

/// The result area's installed markup, with inert script elements tracked
/// separately so they can be replaced and then removed one by one.
#[derive(Debug, Clone, Default)]
pub struct Container {
    segments: Vec<Segment>,
}

impl Container {
    /// Install a fragment. Scripts are located but not run.
    pub fn install(markup: &str) -> Self {
        let mut segments = Vec::new();
        let mut cursor = 0;
        let mut order = 0;
        for caps in SCRIPT_RE.captures_iter(markup) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > cursor {
                segments.push(Segment::Markup(markup[cursor..whole.start()].to_string()));
            }
            let attributes = parse_attributes(caps.get(1).map_or("", |m| m.as_str()));
            let body = caps.get(2).map_or("", |m| m.as_str());
            let src = attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("src"))
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty());
            let kind = match src {
                Some(src) => ScriptKind::External { src },
                None => ScriptKind::Inline {
                    code: body.to_string(),
                },
            };
            segments.push(Segment::Script {
                task: ScriptTask {
                    order,
                    kind,
                    attributes,
                },
                raw: whole.as_str().to_string(),
            });
            order += 1;
            cursor = whole.end();
        }
        if cursor < markup.len() {
            segments.push(Segment::Markup(markup[cursor..].to_string()));
        }
        Self { segments }
    }

    /// Scripts still present in the container, in document order.
    pub fn pending_scripts(&self) -> Vec<ScriptTask> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Script { task, .. } => Some(task.clone()),
                Segment::Markup(_) => None,
            })
            .collect()
    }

    /// Remove the inert original of a script once its replacement is in place.
    /// Returns false if it was already gone.
    pub fn remove_script(&mut self, order: usize) -> bool {
        let before = self.segments.len();
        self.segments
            .retain(|s| !matches!(s, Segment::Script { task, .. } if task.order == order));
        self.segments.len() != before
    }

    /// Current markup, including any scripts not yet removed.
    pub fn markup(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Markup(m) => m.as_str(),
                Segment::Script { raw, .. } => raw.as_str(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Readable text of the markup (scripts and styles dropped, tags
    /// stripped, common entities decoded, blank runs collapsed).
    pub fn text(&self) -> String {
        let markup: String = self
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Markup(m) => Some(m.as_str()),
                Segment::Script { .. } => None,
            })
            .collect();
        markup_to_text(&markup)
    }
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or(String::new(), |m| decode_entities(m.as_str()));
            Some((name, value))
        })
        .collect()
}

/// Decode the common named entities; `&amp;` goes last so `&amp;lt;`
/// stays `&lt;`.
fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Strip markup down to display text.
pub fn markup_to_text(markup: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(markup, "");
    let without_styles = STYLE_RE.replace_all(&without_scripts, "");
    let with_breaks = BREAK_RE.replace_all(&without_styles, "\n");
    let bare = TAG_RE.replace_all(&with_breaks, "");
    let decoded = decode_entities(&bare);

    let mut out: Vec<&str> = Vec::new();
    for line in decoded.lines().map(str::trim) {
        if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = r#"<div class='llama-response'><h3>DD_Errors</h3>
<script src="https://cdn.example.com/chart.js"></script>
<canvas id="c1"></canvas>
<SCRIPT type="text/javascript">
  new Chart(document.getElementById('c1'), {});
</SCRIPT>
<script async data-id='x' src=/static/extra.js>ignored()</script>
</div>"#;

    #[test]
    fn finds_scripts_in_document_order() {
        let c = Container::install(FRAGMENT);
        let tasks = c.pending_scripts();
        assert_eq!(tasks.len(), 3);
        assert_eq!(
            tasks.iter().map(|t| t.order).collect::<Vec<_>>(),
            [0, 1, 2]
        );
        assert_eq!(
            tasks[0].kind,
            ScriptKind::External {
                src: "https://cdn.example.com/chart.js".into()
            }
        );
        assert!(
            matches!(&tasks[1].kind, ScriptKind::Inline { code } if code.contains("new Chart"))
        );
        assert_eq!(tasks[1].attribute("TYPE"), Some("text/javascript"));
    }

    #[test]
    fn src_wins_over_inline_text_and_attributes_are_kept() {
        let c = Container::install(FRAGMENT);
        let third = &c.pending_scripts()[2];
        assert_eq!(
            third.kind,
            ScriptKind::External {
                src: "/static/extra.js".into()
            }
        );
        assert_eq!(
            third.attributes,
            vec![
                ("async".to_string(), String::new()),
                ("data-id".to_string(), "x".to_string()),
                ("src".to_string(), "/static/extra.js".to_string()),
            ]
        );
    }

    #[test]
    fn attribute_entities_are_decoded_once() {
        let c = Container::install(r#"<script src="/q.js?x=1&amp;y=2" data-t='&amp;lt;'></script>"#);
        let task = &c.pending_scripts()[0];
        assert_eq!(
            task.kind,
            ScriptKind::External {
                src: "/q.js?x=1&y=2".into()
            }
        );
        assert_eq!(task.attribute("data-t"), Some("&lt;"));
    }

    #[test]
    fn removing_originals_prevents_duplicates() {
        let mut c = Container::install(FRAGMENT);
        for task in c.pending_scripts() {
            assert!(c.remove_script(task.order));
        }
        assert!(c.pending_scripts().is_empty());
        assert!(!c.remove_script(0));
        let markup = c.markup();
        assert!(!markup.to_lowercase().contains("<script"));
        assert!(markup.contains(r#"<canvas id="c1"></canvas>"#));
    }

    #[test]
    fn markup_round_trips_until_scripts_are_removed() {
        let c = Container::install(FRAGMENT);
        assert_eq!(c.markup(), FRAGMENT);
    }

    #[test]
    fn fragment_without_scripts() {
        let c = Container::install("<p>No results returned</p>");
        assert!(c.pending_scripts().is_empty());
        assert_eq!(c.text(), "No results returned");
    }

    #[test]
    fn text_drops_scripts_styles_and_tags() {
        let html = "<style>.x{}</style><h3>Wiki</h3><p>Restart &amp; retry</p><br><ul><li>one</li><li>two</li></ul><script>x()</script>";
        assert_eq!(markup_to_text(html), "Wiki\nRestart & retry\n\none\ntwo");
    }

    #[test]
    fn inline_label_is_short() {
        let c = Container::install("<script>\n  console.log('a very long line of code that keeps going and going');\n</script>");
        let label = c.pending_scripts()[0].label();
        assert!(label.starts_with("inline #1: console.log("));
        assert!(label.chars().count() <= "inline #1: ".len() + 40);
    }
}
