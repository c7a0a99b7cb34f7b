//! Boards: named groups of JQL columns rendered as a table or a list.
//!
//! A style names the columns (each a JQL fragment), the fields to fetch, and
//! two `minijinja` templates: one for column headings and one for items.
//! Items are rendered against the issue with its `fields` merged on top, so
//! `{{ key }}` and `{{ summary }}` both work.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use terminal_size::{terminal_size, Width};

/// Width used when the terminal size cannot be determined.
pub const DEFAULT_WIDTH: usize = 80;

/// Style used by `jm kanban` without `--style`.
pub const DEFAULT_STYLE: &str = "kanban";

const TODO_QUERY: &str = "(status = Open OR status = Reopened OR status = \"On Deck\" \
    OR status = \"Waiting Estimation Approval\" OR status = \"Testing (Signoff)\" \
    OR status = \"Testing (Review)\" OR status = \"Testing - Bug Found\")";

/// How a board is fetched and drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KanbanStyle {
    /// Fields requested for every issue.
    pub fields: Vec<String>,
    /// Heading template; `column` is the column name.
    pub heading: String,
    /// Item template, rendered per issue.
    pub item: String,
    /// Column display order. Empty means sorted by name.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    /// Draw a table instead of a list.
    pub table: bool,
    /// Column name to JQL fragment.
    pub columns: BTreeMap<String, String>,
}

impl Default for KanbanStyle {
    fn default() -> Self {
        Self {
            fields: vec!["key".to_string(), "summary".to_string()],
            heading: "{{ column }}".to_string(),
            item: "{{ key }} {{ summary }}".to_string(),
            order: Vec::new(),
            table: false,
            columns: BTreeMap::new(),
        }
    }
}

impl KanbanStyle {
    fn with_columns(mut self, columns: &[(&str, &str)]) -> Self {
        self.columns = columns
            .iter()
            .map(|(name, query)| (name.to_string(), query.to_string()))
            .collect();
        self
    }

    fn with_order(mut self, order: &[&str]) -> Self {
        self.order = order.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add or replace a column from `NAME=JQL`.
    pub fn set_column(&mut self, spec: &str) -> Result<()> {
        let (name, query) = parse_column(spec)?;
        self.columns.insert(name, query);
        Ok(())
    }

    /// Columns in display order.
    ///
    /// Names listed in `order` come first (skipping ones with no column),
    /// then any remaining columns sorted by name.
    pub fn column_order(&self) -> Vec<String> {
        let mut ordered: Vec<String> = self
            .order
            .iter()
            .filter(|name| self.columns.contains_key(*name))
            .cloned()
            .collect();
        for name in self.columns.keys() {
            if !ordered.contains(name) {
                ordered.push(name.clone());
            }
        }
        ordered
    }
}

/// Split a `NAME=JQL` column spec on the first `=`.
pub fn parse_column(spec: &str) -> Result<(String, String)> {
    match spec.split_once('=') {
        Some((name, query)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), query.trim().to_string()))
        }
        _ => bail!("Invalid column '{}': expected NAME=JQL", spec),
    }
}

/// Styles that exist without any configuration.
pub fn builtin_styles() -> BTreeMap<String, KanbanStyle> {
    let mut styles = BTreeMap::new();

    styles.insert("empty".to_string(), KanbanStyle::default());

    styles.insert(
        "status".to_string(),
        KanbanStyle {
            heading: "#### {{ column }}".to_string(),
            item: "- {{ key }} {{ summary }}".to_string(),
            ..KanbanStyle::default()
        }
        .with_columns(&[
            ("Done", "status = 'Pending Release'"),
            ("Testing", "status = Testing"),
            ("InProgress", "status = \"In Progress\""),
            ("Todo", TODO_QUERY),
        ])
        .with_order(&["Done", "Testing", "InProgress", "Todo"]),
    );

    styles.insert(
        "kanban".to_string(),
        KanbanStyle {
            item: "{{ key }}\n {{ summary }}".to_string(),
            table: true,
            ..KanbanStyle::default()
        }
        .with_columns(&[
            ("Testing", "status = Testing"),
            ("InProgress", "status = \"In Progress\""),
            ("Todo", TODO_QUERY),
        ])
        .with_order(&["Todo", "InProgress", "Testing"]),
    );

    styles.insert(
        "taskpaper".to_string(),
        KanbanStyle {
            fields: vec![
                "key".to_string(),
                "summary".to_string(),
                "duedate".to_string(),
            ],
            heading: "{{ column }}:".to_string(),
            item: "- {{ summary }} @jira({{ key }}) {% if duedate %}@due({{ duedate }}){% endif %}"
                .to_string(),
            ..KanbanStyle::default()
        }
        .with_columns(&[
            ("InProgress", "status = \"In Progress\""),
            ("Todo", "status = Open"),
        ]),
    );

    styles
}

/// The issue with its `fields` lifted to the top level.
pub fn item_context(issue: &Value) -> Value {
    let mut context: Map<String, Value> = issue.as_object().cloned().unwrap_or_default();
    if let Some(fields) = issue.get("fields").and_then(Value::as_object) {
        for (name, value) in fields {
            context.insert(name.clone(), value.clone());
        }
    }
    Value::Object(context)
}

/// Render a `minijinja` template against `context`.
pub fn render_template(template: &str, context: &Value) -> Result<String> {
    let environment = Environment::new();
    environment
        .render_str(template, context)
        .with_context(|| format!("Failed to render template '{}'", template))
}

/// One fetched column.
#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    pub name: String,
    pub issues: Vec<Value>,
}

/// Current terminal width, or [`DEFAULT_WIDTH`].
pub fn terminal_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Width available to each cell of a table with `columns` columns.
///
/// Leaves room for two border characters on each side and three per column.
pub fn cell_width(width: usize, columns: usize) -> usize {
    if columns == 0 {
        return width;
    }
    (width.saturating_sub(4 + 3 * columns) / columns).max(1)
}

fn truncate_lines(text: &str, width: usize) -> Vec<String> {
    text.lines()
        .map(|line| line.chars().take(width).collect())
        .collect()
}

/// Draw the columns of a board with `style`.
pub fn render_board(style: &KanbanStyle, columns: &[BoardColumn], width: usize) -> Result<String> {
    let cell = if style.table {
        cell_width(width, columns.len())
    } else {
        width
    };

    let mut headings = Vec::with_capacity(columns.len());
    let mut cells = Vec::with_capacity(columns.len());
    for column in columns {
        let heading = render_template(&style.heading, &json!({ "column": column.name }))?;
        // A table heading shares a single row with its neighbours.
        headings.push(if style.table {
            truncate_lines(&heading.replace('\n', " "), cell).concat()
        } else {
            truncate_lines(&heading, cell).join("\n")
        });
        let items = column
            .issues
            .iter()
            .map(|issue| {
                render_template(&style.item, &item_context(issue))
                    .map(|text| truncate_lines(&text, cell))
            })
            .collect::<Result<Vec<_>>>()?;
        cells.push(items);
    }

    if style.table {
        Ok(draw_table(&headings, &cells))
    } else {
        Ok(draw_list(&headings, &cells))
    }
}

fn draw_list(headings: &[String], cells: &[Vec<Vec<String>>]) -> String {
    let mut out = String::new();
    for (heading, items) in headings.iter().zip(cells) {
        out.push_str(heading);
        out.push('\n');
        for line in items.iter().flatten() {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

fn draw_table(headings: &[String], cells: &[Vec<Vec<String>>]) -> String {
    let widths: Vec<usize> = headings
        .iter()
        .zip(cells)
        .map(|(heading, items)| {
            items
                .iter()
                .flatten()
                .map(|line| line.chars().count())
                .chain(std::iter::once(heading.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule = {
        let mut rule = String::from("+");
        for width in &widths {
            rule.push_str(&"-".repeat(width + 2));
            rule.push('+');
        }
        rule
    };
    let row = |lines: Vec<&str>| {
        let mut out = String::from("|");
        for (text, width) in lines.iter().zip(&widths) {
            let pad = width - text.chars().count();
            out.push_str(&format!(" {}{} |", text, " ".repeat(pad)));
        }
        out
    };

    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&row(headings.iter().map(String::as_str).collect()));
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    // Short columns are padded with empty cells so every row is complete.
    let rows = cells.iter().map(Vec::len).max().unwrap_or(0);
    for index in 0..rows {
        let height = cells
            .iter()
            .filter_map(|items| items.get(index))
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(1);
        for line in 0..height {
            let texts = cells
                .iter()
                .map(|items| {
                    items
                        .get(index)
                        .and_then(|lines| lines.get(line))
                        .map(String::as_str)
                        .unwrap_or("")
                })
                .collect();
            out.push_str(&row(texts));
            out.push('\n');
        }
    }
    out.push_str(&rule);
    out.push('\n');
    out
}
