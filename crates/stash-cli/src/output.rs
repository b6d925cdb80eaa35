//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use stash_entity::node::Node;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Node display row for table output
#[derive(Debug, Serialize, Tabled)]
pub struct NodeRow {
    /// Node ID
    id: String,
    /// Name
    name: String,
    /// Folder or file
    kind: String,
    /// Payload size in bytes
    size: String,
    /// Tier holding the payload
    tier: String,
    /// Created at
    created_at: String,
    /// Trashed at
    deleted_at: String,
}

impl From<&Node> for NodeRow {
    fn from(node: &Node) -> Self {
        let payload = node.payload();
        Self {
            id: node.id.to_string(),
            name: node.name.clone(),
            kind: if node.is_folder() { "folder" } else { "file" }.to_string(),
            size: payload.map(|p| p.size.to_string()).unwrap_or_default(),
            tier: payload.map(|p| p.tier().to_string()).unwrap_or_default(),
            created_at: node.created_at.format("%Y-%m-%d %H:%M").to_string(),
            deleted_at: node
                .deleted_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Print nodes as rows, or as full records in JSON.
pub fn print_nodes(nodes: &[Node], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let rows: Vec<NodeRow> = nodes.iter().map(NodeRow::from).collect();
            print_list(&rows, format);
        }
        OutputFormat::Json => print_json(&nodes, "[]"),
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputFormat::Json => print_json(&items, "[]"),
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{item:#?}"),
        OutputFormat::Json => print_json(item, "{}"),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T, fallback: &str) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| fallback.to_string());
    println!("{json}");
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}
