//! Output formatters for catalog results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use datacat_core::{
    CatalogRecord, HierarchyTree, ImportSummary, LoadedRecord, LocalizedText, MutationOutcome,
    Page,
};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format one page of records.
    fn format_page(&self, page: &Page<CatalogRecord>) -> String;

    /// Format a record with its edges and resolved name.
    fn format_record(&self, record: &LoadedRecord, name: Option<&LocalizedText>) -> String;

    /// Format the result of a relationship mutation.
    fn format_outcome(&self, outcome: &MutationOutcome) -> String;

    /// Format a match count.
    fn format_count(&self, count: usize) -> String;

    /// Format an expanded hierarchy.
    fn format_hierarchy(&self, tree: &HierarchyTree) -> String;

    /// Format a resolved translation.
    fn format_text(&self, bundle_id: &str, text: Option<&LocalizedText>) -> String;

    /// Format an import summary.
    fn format_import(&self, summary: &ImportSummary) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_page(&self, page: &Page<CatalogRecord>) -> String {
        if page.is_empty() {
            return format!("No results ({} total)", page.total_elements);
        }

        let mut table = Table::new();
        table.set_header(vec!["id", "type", "status", "tags", "label"]);
        for record in &page.content {
            table.add_row(record_row(record));
        }

        format!(
            "{}\npage {} of {}, {} record(s)",
            table,
            page.page_number + 1,
            page.total_pages().max(1),
            page.total_elements
        )
    }

    fn format_record(&self, record: &LoadedRecord, name: Option<&LocalizedText>) -> String {
        let inner = &record.record;
        let mut table = Table::new();
        table.set_header(vec!["field", "value"]);
        table.add_row(vec!["id", inner.id.as_str()]);
        table.add_row(vec![Cell::new("type"), Cell::new(inner.kind)]);
        table.add_row(vec![Cell::new("status"), Cell::new(format!("{:?}", inner.status))]);
        table.add_row(vec![
            Cell::new("version"),
            Cell::new(format!("{}.{}", inner.major_version, inner.minor_version)),
        ]);
        if let Some(name) = name {
            table.add_row(vec![
                Cell::new("name"),
                Cell::new(format!("{} [{}]", name.value, name.locale)),
            ]);
        }
        if let Some(value) = inner.text_value() {
            table.add_row(vec!["text", value]);
        }
        if let Some(code) = inner.language_code() {
            table.add_row(vec!["language", code]);
        }
        if !inner.tags.is_empty() {
            table.add_row(vec![Cell::new("tags"), Cell::new(inner.tags.join(", "))]);
        }

        let mut edges = Table::new();
        edges.set_header(vec!["direction", "relation", "records"]);
        for (relation, ids) in &record.outgoing {
            edges.add_row(vec![Cell::new("->"), Cell::new(relation), Cell::new(ids.join(", "))]);
        }
        for (relation, ids) in &record.incoming {
            edges.add_row(vec![Cell::new("<-"), Cell::new(relation), Cell::new(ids.join(", "))]);
        }

        if record.outgoing.is_empty() && record.incoming.is_empty() {
            table.to_string()
        } else {
            format!("{}\n{}", table, edges)
        }
    }

    fn format_outcome(&self, outcome: &MutationOutcome) -> String {
        match outcome {
            MutationOutcome::Applied(record) => format!("Updated {}", record.id()),
            MutationOutcome::Ignored(record) => {
                format!("Ignored: relation not supported for {}", record.id())
            }
        }
    }

    fn format_count(&self, count: usize) -> String {
        format!("{} record(s)", count)
    }

    fn format_hierarchy(&self, tree: &HierarchyTree) -> String {
        if tree.is_empty() {
            return "No results".to_string();
        }

        let mut output = String::new();
        for &root in &tree.roots {
            render_node(tree, root, None, &mut output);
        }
        output.push_str(&format!("{} node(s), {} path(s)", tree.len(), tree.paths.len()));
        output
    }

    fn format_text(&self, bundle_id: &str, text: Option<&LocalizedText>) -> String {
        match text {
            Some(text) => format!("{} [{}]", text.value, text.locale),
            None => format!("No translation of {} for the requested languages", bundle_id),
        }
    }

    fn format_import(&self, summary: &ImportSummary) -> String {
        let mut table = Table::new();
        table.set_header(vec!["records", "translations", "relations", "ignored"]);
        table.add_row(vec![
            summary.records,
            summary.translations,
            summary.relations_applied,
            summary.relations_ignored,
        ]);
        table.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_page(&self, page: &Page<CatalogRecord>) -> String {
        serde_json::to_string_pretty(page).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_record(&self, record: &LoadedRecord, name: Option<&LocalizedText>) -> String {
        serde_json::to_string_pretty(&serde_json::json!({
            "record": record,
            "name": name,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    fn format_outcome(&self, outcome: &MutationOutcome) -> String {
        serde_json::to_string_pretty(outcome).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_count(&self, count: usize) -> String {
        serde_json::json!({ "count": count }).to_string()
    }

    fn format_hierarchy(&self, tree: &HierarchyTree) -> String {
        serde_json::to_string_pretty(tree).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_text(&self, bundle_id: &str, text: Option<&LocalizedText>) -> String {
        serde_json::json!({
            "bundle": bundle_id,
            "text": text,
        })
        .to_string()
    }

    fn format_import(&self, summary: &ImportSummary) -> String {
        serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
    }
}

fn record_row(record: &CatalogRecord) -> Vec<Cell> {
    let label = record
        .labels
        .values()
        .next()
        .map(String::as_str)
        .or_else(|| record.text_value())
        .unwrap_or("");
    vec![
        Cell::new(&record.id),
        Cell::new(record.kind),
        Cell::new(format!("{:?}", record.status)),
        Cell::new(record.tags.join(", ")),
        Cell::new(label),
    ]
}

/// Render a subtree with two spaces of indent per level.
fn render_node(tree: &HierarchyTree, index: usize, via: Option<&str>, output: &mut String) {
    let node = &tree.nodes[index];
    let indent = "  ".repeat(node.depth);
    match via {
        Some(relation) => output.push_str(&format!(
            "{}{} ({}) via {}\n",
            indent, node.record.id, node.record.kind, relation
        )),
        None => output.push_str(&format!("{}{} ({})\n", indent, node.record.id, node.record.kind)),
    }

    for edge in tree.child_edges(index) {
        render_node(tree, edge.child, Some(edge.relation.label()), output);
    }
}
