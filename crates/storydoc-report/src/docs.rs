//! Doc-entry rendering: one fixed Markdown template per kind, plus the
//! custom-renderer registry.
//!
//! The schema is a closed tagged union; `custom` is the single open
//! extension point, resolved by a type-string lookup. Unknown types and
//! failing renderers both land on the JSON fenced-block fallback, so no
//! entry can abort a report.

use std::collections::BTreeMap;

use storydoc_types::DocEntry;

/// A user-supplied renderer for one `custom` entry type. Returns the
/// Markdown lines to insert (un-indented; the caller applies indent), or
/// an error message to fall back on.
pub type CustomRenderer =
    Box<dyn Fn(&str, &serde_json::Value) -> Result<Vec<String>, String> + Send + Sync>;

/// Registry of custom renderers keyed by entry type.
#[derive(Default)]
pub struct CustomRendererRegistry {
    renderers: BTreeMap<String, CustomRenderer>,
}

impl std::fmt::Debug for CustomRendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomRendererRegistry")
            .field("types", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CustomRendererRegistry {
    /// An empty registry: every custom entry takes the JSON fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a renderer for `type_name`, replacing any previous one.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        renderer: impl Fn(&str, &serde_json::Value) -> Result<Vec<String>, String>
            + Send
            + Sync
            + 'static,
    ) {
        self.renderers.insert(type_name.into(), Box::new(renderer));
    }

    fn get(&self, type_name: &str) -> Option<&CustomRenderer> {
        self.renderers.get(type_name)
    }
}

/// Render one doc entry into `lines`, each prefixed with `indent`.
pub fn render_doc_entry(
    lines: &mut Vec<String>,
    entry: &DocEntry,
    indent: &str,
    registry: &CustomRendererRegistry,
) {
    let push = |lines: &mut Vec<String>, line: &str| lines.push(format!("{indent}{line}"));

    match entry {
        DocEntry::Note { text, .. } => {
            push(lines, &format!("> {text}"));
        }
        DocEntry::Kv { label, value, .. } => {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            push(lines, &format!("**{label}:** {rendered}"));
        }
        DocEntry::Code {
            label,
            content,
            lang,
            ..
        } => {
            push(lines, &format!("**{label}**"));
            lines.push(indent.to_owned());
            push(lines, &format!("```{}", lang.as_deref().unwrap_or("")));
            for line in content.split('\n') {
                push(lines, line);
            }
            push(lines, "```");
            lines.push(indent.to_owned());
        }
        DocEntry::Table {
            label,
            columns,
            rows,
            ..
        } => {
            push(lines, &format!("**{label}**"));
            lines.push(indent.to_owned());
            push(lines, &format!("| {} |", columns.join(" | ")));
            push(
                lines,
                &format!(
                    "| {} |",
                    columns.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
                ),
            );
            for row in rows {
                push(lines, &format!("| {} |", row.join(" | ")));
            }
            lines.push(indent.to_owned());
        }
        DocEntry::Link { label, url, .. } => {
            push(lines, &format!("[{label}]({url})"));
        }
        DocEntry::Section {
            title, markdown, ..
        } => {
            push(lines, &format!("**{title}**"));
            lines.push(indent.to_owned());
            for line in markdown.split('\n') {
                push(lines, line);
            }
            lines.push(indent.to_owned());
        }
        DocEntry::Mermaid { code, title, .. } => {
            if let Some(title) = title {
                push(lines, &format!("**{title}**"));
            }
            push(lines, "```mermaid");
            for line in code.split('\n') {
                push(lines, line);
            }
            push(lines, "```");
        }
        DocEntry::Screenshot { path, alt, .. } => {
            push(
                lines,
                &format!("![{}]({path})", alt.as_deref().unwrap_or("Screenshot")),
            );
        }
        DocEntry::Tag { names, .. } => {
            let spans: Vec<String> = names.iter().map(|n| format!("`{n}`")).collect();
            push(lines, &format!("Tags: {}", spans.join(", ")));
        }
        DocEntry::Custom {
            type_name, data, ..
        } => {
            if let Some(renderer) = registry.get(type_name) {
                match renderer(type_name, data) {
                    Ok(rendered) => {
                        for line in rendered {
                            push(lines, &line);
                        }
                        return;
                    }
                    Err(detail) => {
                        tracing::warn!(
                            type_name = type_name.as_str(),
                            detail = detail.as_str(),
                            "custom renderer failed; using JSON fallback"
                        );
                    }
                }
            }
            render_custom_fallback(lines, indent, type_name, data);
        }
    }
}

/// Default rendering for custom entries: type label plus a JSON block.
fn render_custom_fallback(
    lines: &mut Vec<String>,
    indent: &str,
    type_name: &str,
    data: &serde_json::Value,
) {
    let push = |lines: &mut Vec<String>, line: &str| lines.push(format!("{indent}{line}"));
    push(lines, &format!("**[{type_name}]**"));
    lines.push(indent.to_owned());
    push(lines, "```json");
    let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| "null".to_owned());
    for line in pretty.split('\n') {
        push(lines, line);
    }
    push(lines, "```");
    lines.push(indent.to_owned());
}

/// Plain-text rendering used by JUnit `system-out`.
#[must_use]
pub fn render_doc_entry_plain(entry: &DocEntry, indent: &str) -> String {
    match entry {
        DocEntry::Note { text, .. } => format!("{indent}> {text}"),
        DocEntry::Kv { label, value, .. } => {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{indent}{label}: {rendered}")
        }
        DocEntry::Code {
            label,
            content,
            lang,
            ..
        } => {
            let lang_label = lang
                .as_deref()
                .map_or_else(String::new, |l| format!(" ({l})"));
            let body = content
                .split('\n')
                .map(|l| format!("{indent}  {l}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{indent}{label}{lang_label}:\n{body}")
        }
        DocEntry::Table {
            label,
            columns,
            rows,
            ..
        } => {
            let mut out = vec![format!("{indent}{label}:")];
            out.push(format!("{indent}| {} |", columns.join(" | ")));
            out.push(format!(
                "{indent}| {} |",
                columns.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
            ));
            for row in rows {
                out.push(format!("{indent}| {} |", row.join(" | ")));
            }
            out.join("\n")
        }
        DocEntry::Link { label, url, .. } => format!("{indent}{label}: {url}"),
        DocEntry::Section {
            title, markdown, ..
        } => {
            let body = markdown
                .split('\n')
                .map(|l| format!("{indent}  {l}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{indent}{title}:\n{body}")
        }
        DocEntry::Mermaid { code, title, .. } => {
            let mut out = Vec::new();
            if let Some(title) = title {
                out.push(format!("{indent}{title}:"));
            }
            for line in code.split('\n') {
                out.push(format!("{indent}  {line}"));
            }
            out.join("\n")
        }
        DocEntry::Screenshot { path, alt, .. } => {
            format!("{indent}Screenshot: {}", alt.as_deref().unwrap_or(path))
        }
        DocEntry::Tag { names, .. } => format!("{indent}Tags: {}", names.join(", ")),
        DocEntry::Custom {
            type_name, data, ..
        } => {
            let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| "null".to_owned());
            let body = pretty
                .split('\n')
                .map(|l| format!("{indent}  {l}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{indent}[{type_name}]:\n{body}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storydoc_types::DocPhase;

    fn render(entry: &DocEntry, registry: &CustomRendererRegistry) -> Vec<String> {
        let mut lines = Vec::new();
        render_doc_entry(&mut lines, entry, "    ", registry);
        lines
    }

    #[test]
    fn note_renders_as_blockquote() {
        let lines = render(
            &DocEntry::Note {
                text: "remember this".into(),
                phase: DocPhase::Static,
            },
            &CustomRendererRegistry::new(),
        );
        assert_eq!(lines, vec!["    > remember this".to_owned()]);
    }

    #[test]
    fn kv_string_value_is_not_requoted() {
        let lines = render(
            &DocEntry::Kv {
                label: "User".into(),
                value: serde_json::json!("alice"),
                phase: DocPhase::Static,
            },
            &CustomRendererRegistry::new(),
        );
        assert_eq!(lines, vec!["    **User:** alice".to_owned()]);
    }

    #[test]
    fn code_block_carries_language_tag() {
        let lines = render(
            &DocEntry::Code {
                label: "Query".into(),
                content: "SELECT 1;".into(),
                lang: Some("sql".into()),
                phase: DocPhase::Static,
            },
            &CustomRendererRegistry::new(),
        );
        assert!(lines.contains(&"    ```sql".to_owned()));
        assert!(lines.contains(&"    SELECT 1;".to_owned()));
    }

    #[test]
    fn table_renders_gfm_separator() {
        let lines = render(
            &DocEntry::Table {
                label: "Cases".into(),
                columns: vec!["a".into(), "b".into()],
                rows: vec![vec!["1".into(), "2".into()]],
                phase: DocPhase::Static,
            },
            &CustomRendererRegistry::new(),
        );
        assert!(lines.contains(&"    | --- | --- |".to_owned()));
        assert!(lines.contains(&"    | 1 | 2 |".to_owned()));
    }

    #[test]
    fn unregistered_custom_takes_json_fallback() {
        let lines = render(
            &DocEntry::Custom {
                type_name: "widget".into(),
                data: serde_json::json!({"n": 1}),
                phase: DocPhase::Runtime,
            },
            &CustomRendererRegistry::new(),
        );
        assert_eq!(lines[0], "    **[widget]**");
        assert!(lines.iter().any(|l| l.contains("```json")));
    }

    #[test]
    fn failing_custom_renderer_falls_back_not_aborts() {
        let mut registry = CustomRendererRegistry::new();
        registry.register("widget", |_, _| Err("renderer broke".to_owned()));
        let lines = render(
            &DocEntry::Custom {
                type_name: "widget".into(),
                data: serde_json::json!(7),
                phase: DocPhase::Runtime,
            },
            &registry,
        );
        assert_eq!(lines[0], "    **[widget]**");
    }

    #[test]
    fn registered_custom_renderer_wins() {
        let mut registry = CustomRendererRegistry::new();
        registry.register("widget", |type_name, data| {
            Ok(vec![format!("custom {type_name}: {data}")])
        });
        let lines = render(
            &DocEntry::Custom {
                type_name: "widget".into(),
                data: serde_json::json!(7),
                phase: DocPhase::Runtime,
            },
            &registry,
        );
        assert_eq!(lines, vec!["    custom widget: 7".to_owned()]);
    }

    #[test]
    fn tag_entry_renders_inline_code_spans() {
        let lines = render(
            &DocEntry::Tag {
                names: vec!["admin".into(), "elevated".into()],
                phase: DocPhase::Static,
            },
            &CustomRendererRegistry::new(),
        );
        assert_eq!(lines, vec!["    Tags: `admin`, `elevated`".to_owned()]);
    }
}
