use colored::*;

use crate::markup::{self, MarkupBlock, Span};
use crate::models::{Category, QueryResponse};
use crate::normalize::{DisplayBlock, FieldValue};

/// Terminal rendering for answers, generated content and status lines.
///
/// Every method returns the text to print so callers decide where it goes.
#[derive(Debug, Default, Clone, Copy)]
pub struct VisualOutput;

impl VisualOutput {
    pub fn new() -> Self {
        Self
    }

    pub fn answer(&self, response: &QueryResponse) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", "🜄 Oracle's Insight".bright_cyan().bold()));
        out.push_str(&self.markup(&response.answer, "  "));

        if !response.references.is_empty() {
            out.push_str(&format!("{}\n", "↳ Echoes:".cyan()));
            for (i, reference) in response.references.iter().enumerate() {
                out.push_str(&format!("  {}\n", format!("[{}]", i + 1).bright_black()));
                out.push_str(&self.markup(reference, "    "));
            }
        }
        out
    }

    pub fn results(&self, category: Category, blocks: &[DisplayBlock]) -> String {
        if blocks.is_empty() {
            return format!("{}\n", "The forge stays silent: no results.".bright_black());
        }

        let mut out = format!(
            "{}\n",
            format!("🜂 Your creations await ({})", category.label())
                .bright_yellow()
                .bold()
        );
        for (i, block) in blocks.iter().enumerate() {
            out.push_str(&format!("{}\n", format!("── #{} ", i + 1).bright_black()));
            out.push_str(&self.block(block));
        }
        out
    }

    fn block(&self, block: &DisplayBlock) -> String {
        match block {
            DisplayBlock::Text(text) => format!("  {}\n", text.white()),
            DisplayBlock::Rows(rows) => {
                let mut out = String::new();
                for row in rows {
                    match &row.value {
                        FieldValue::Plain(value) => out.push_str(&format!(
                            "  {} {}\n",
                            format!("{}:", row.key).yellow(),
                            value
                        )),
                        FieldValue::Markup(value) => {
                            out.push_str(&format!("  {}\n", format!("{}:", row.key).yellow()));
                            out.push_str(&self.markup(value, "    "));
                        }
                    }
                }
                out
            }
            DisplayBlock::Dump(dump) => dump
                .lines()
                .map(|line| format!("  {}\n", line.bright_black()))
                .collect(),
        }
    }

    /// Render markdown through the markup tree, one indented line per block.
    pub fn markup(&self, text: &str, indent: &str) -> String {
        let mut out = String::new();
        for block in markup::render(text) {
            match block {
                MarkupBlock::Heading { spans, .. } => {
                    out.push_str(&format!("{indent}{}\n", spans_text(&spans).bold().underline()))
                }
                MarkupBlock::Paragraph(spans) => {
                    push_lines(&mut out, indent, &styled(&spans));
                }
                MarkupBlock::ListItem {
                    depth,
                    marker,
                    spans,
                } => {
                    let pad = "  ".repeat(depth);
                    let marker = marker.unwrap_or_else(|| " ".to_string());
                    out.push_str(&format!(
                        "{indent}{pad}{} {}\n",
                        marker.cyan(),
                        styled(&spans)
                    ));
                }
                MarkupBlock::Quote(spans) => {
                    out.push_str(&format!(
                        "{indent}{} {}\n",
                        "│".bright_black(),
                        spans_text(&spans).italic()
                    ));
                }
                MarkupBlock::Code { text, .. } => {
                    for line in text.lines() {
                        out.push_str(&format!("{indent}  {}\n", line.green()));
                    }
                }
                MarkupBlock::Rule => {
                    out.push_str(&format!("{indent}{}\n", "────────".bright_black()))
                }
            }
        }
        out
    }

    pub fn error(&self, message: &str) -> String {
        format!("{} {}", "✗".red(), message.red())
    }

    pub fn success(&self, message: &str) -> String {
        format!("{} {}", "✓".green(), message.green())
    }

    pub fn hint(&self, message: &str) -> String {
        message.bright_black().to_string()
    }
}

fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

fn styled(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|span| {
            let mut text = span.text.normal();
            if span.style.strong {
                text = text.bold();
            }
            if span.style.emphasis {
                text = text.italic();
            }
            if span.style.strikethrough {
                text = text.strikethrough();
            }
            if span.style.code {
                text = text.green();
            }
            text.to_string()
        })
        .collect()
}

fn push_lines(out: &mut String, indent: &str, text: &str) {
    for line in text.split('\n') {
        out.push_str(indent);
        out.push_str(line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{FieldRow, display};
    use serde_json::json;

    fn plain() -> VisualOutput {
        colored::control::set_override(false);
        VisualOutput::new()
    }

    #[test]
    fn answer_lists_numbered_references() {
        let out = plain().answer(&QueryResponse {
            answer: "The **Warden**.".to_string(),
            references: vec!["Scroll 3".to_string(), "- a\n- b".to_string()],
        });
        assert_eq!(
            out,
            "🜄 Oracle's Insight\n  The Warden.\n↳ Echoes:\n  [1]\n    Scroll 3\n  [2]\n    • a\n    • b\n"
        );
    }

    #[test]
    fn answer_without_references_has_no_echo_section() {
        let out = plain().answer(&QueryResponse {
            answer: "Nobody.".to_string(),
            references: vec![],
        });
        assert!(!out.contains("Echoes"));
    }

    #[test]
    fn record_rows_and_markup_fields() {
        let block = display(&json!({"name": "Bob", "backstory": "Born in **Hollow**.\nLeft young."}).into());
        let out = plain().results(Category::Npc, &[block]);
        assert_eq!(
            out,
            "🜂 Your creations await (NPC)\n── #1 \n  name: Bob\n  backstory:\n    Born in Hollow. Left young.\n"
        );
    }

    #[test]
    fn text_and_dump_blocks() {
        let out = plain().results(
            Category::Name,
            &[
                DisplayBlock::Text("Kael".to_string()),
                DisplayBlock::Dump("[\n  1\n]".to_string()),
            ],
        );
        assert!(out.contains("  Kael\n"));
        assert!(out.contains("  [\n    1\n  ]\n"));
    }

    #[test]
    fn empty_results_message() {
        let out = plain().results(Category::Item, &[]);
        assert!(out.contains("no results"));
    }

    #[test]
    fn rows_keep_server_field_order() {
        let rows = vec![
            FieldRow {
                key: "b".to_string(),
                value: FieldValue::Plain("2".to_string()),
            },
            FieldRow {
                key: "a".to_string(),
                value: FieldValue::Plain("1".to_string()),
            },
        ];
        let out = plain().results(Category::Item, &[DisplayBlock::Rows(rows)]);
        let b = out.find("b: 2").expect("b row");
        let a = out.find("a: 1").expect("a row");
        assert!(b < a);
    }
}
