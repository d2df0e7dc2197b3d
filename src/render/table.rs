//! JSON to markdown pipe tables.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    /// Rows may be shorter than `headers`; missing cells render empty.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || (self.headers.is_empty() && self.rows.iter().all(Vec::is_empty))
    }

    pub fn to_markdown(&self) -> String {
        if self.is_empty() {
            return "No data to display.".to_string();
        }

        let width = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);

        let mut headers = self.headers.clone();
        headers.resize(width, String::new());

        let mut out = String::new();
        push_row(&mut out, &headers);
        out.push('|');
        for _ in 0..width {
            out.push_str("---|");
        }
        out.push('\n');
        for row in &self.rows {
            let mut cells = row.clone();
            cells.resize(width, String::new());
            push_row(&mut out, &cells);
        }
        out.truncate(out.trim_end().len());
        out
    }
}

fn push_row(out: &mut String, cells: &[String]) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(&escape_cell(cell));
        out.push_str(" |");
    }
    out.push('\n');
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

/// Flattens nested mappings into dotted paths. Sequences and scalars are
/// leaves; an empty nested mapping is kept as a leaf so its key still shows.
pub fn flatten(map: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(map, "", &mut out);
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(inner, &path, out),
            other => out.push((path, other.clone())),
        }
    }
}

/// Text of a single cell: strings as-is, null as empty, everything else as
/// compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Builds a table from a mapping (one row) or a sequence (one row per
/// element). Returns `None` for scalars.
pub fn build_table(value: &Value) -> Option<Table> {
    match value {
        Value::Object(map) => {
            let flat = flatten(map);
            Some(Table {
                headers: flat.iter().map(|(key, _)| key.clone()).collect(),
                rows: vec![flat.iter().map(|(_, value)| cell_text(value)).collect()],
            })
        }
        Value::Array(items) => Some(table_from_items(items)),
        _ => None,
    }
}

enum RowSource {
    Mapping(Vec<(String, Value)>),
    Single(String),
}

fn table_from_items(items: &[Value]) -> Table {
    let mut headers: Vec<String> = Vec::new();
    let mut sources = Vec::with_capacity(items.len());

    for item in items {
        match item {
            Value::Object(map) => {
                let flat = flatten(map);
                for (key, _) in &flat {
                    if !headers.contains(key) {
                        headers.push(key.clone());
                    }
                }
                sources.push(RowSource::Mapping(flat));
            }
            other => sources.push(RowSource::Single(cell_text(other))),
        }
    }

    if headers.is_empty() && !sources.is_empty() {
        headers.push("value".to_string());
    }

    let rows = sources
        .into_iter()
        .map(|source| match source {
            RowSource::Mapping(flat) => headers
                .iter()
                .map(|header| {
                    flat.iter()
                        .find(|(key, _)| key == header)
                        .map(|(_, value)| cell_text(value))
                        .unwrap_or_default()
                })
                .collect(),
            RowSource::Single(text) => vec![text],
        })
        .collect();

    Table { headers, rows }
}
