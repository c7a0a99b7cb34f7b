//! Boards and status lists.

use super::*;
use crate::board::{builtin_styles, BoardColumn, KanbanStyle};
use crate::cli::BoardArgs;
use crate::jql;

impl<T: IssueTracker> CommandExecutor<T> {
    /// Look up a style by name, configured styles first, and apply the
    /// command-line overrides to it.
    pub fn board_style(&self, name: &str, args: &BoardArgs) -> Result<KanbanStyle> {
        let mut styles = builtin_styles();
        styles.extend(self.settings.kanban_styles.clone());

        let Some(mut style) = styles.get(name).cloned() else {
            let known: Vec<&str> = styles.keys().map(String::as_str).collect();
            bail!("Invalid style '{}'. Valid styles: {}", name, known.join(", "));
        };

        for column in &args.column {
            style.set_column(column)?;
        }
        if !args.fields.is_empty() {
            style.fields = args.fields.clone();
        }
        if let Some(ref heading) = args.heading {
            style.heading = heading.clone();
        }
        if let Some(ref item) = args.item {
            style.item = item.clone();
        }
        Ok(style)
    }

    /// Run every column query of `style`, in display order.
    pub fn board(&self, style: &KanbanStyle, raw: bool) -> Result<Vec<BoardColumn>> {
        let project = if raw {
            None
        } else {
            Some(self.settings.require_project()?)
        };
        let fields: Vec<&str> = style.fields.iter().map(String::as_str).collect();

        style
            .column_order()
            .into_iter()
            .map(|name| {
                let fragment = style.columns.get(&name).map(String::as_str).unwrap_or("");
                let query = jql::board_query(project, fragment);
                let issues = self.tracker.search(&query, &fields)?;
                Ok(BoardColumn { name, issues })
            })
            .collect()
    }
}
