//! The progress report: estimate, time spent and due date per issue.

use super::*;
use crate::domain::issue_field;
use crate::jql;
use chrono::NaiveDate;
use serde::Serialize;

const FIELDS: &[&str] = &[
    "key",
    "workratio",
    "aggregatetimespent",
    "duedate",
    "aggregatetimeoriginalestimate",
];

/// One issue of the progress report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressRow {
    pub key: String,
    pub estimate_hours: f64,
    pub spent_hours: f64,
    pub percent: i64,
    pub due: Option<String>,
    /// Over estimate, or due today or earlier.
    pub overdue: bool,
}

impl ProgressRow {
    fn from_issue(issue: &Value, today: NaiveDate) -> Self {
        let hours = |path: &str| {
            issue_field(issue, path)
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
                / 3600.0
        };
        let estimate_hours = hours("fields.aggregatetimeoriginalestimate");
        let spent_hours = hours("fields.aggregatetimespent");
        let due = issue_field(issue, "fields.duedate")
            .and_then(Value::as_str)
            .map(str::to_string);

        let workratio = issue_field(issue, "fields.workratio")
            .and_then(Value::as_i64)
            .unwrap_or(-1);
        let percent = if workratio >= 0 {
            workratio
        } else if estimate_hours > 0.0 {
            (spent_hours / estimate_hours * 100.0).floor() as i64
        } else {
            0
        };

        let past_due = due
            .as_deref()
            .and_then(|due| NaiveDate::parse_from_str(due, "%Y-%m-%d").ok())
            .is_some_and(|due| due <= today);

        Self {
            key: issue["key"].as_str().unwrap_or_default().to_string(),
            estimate_hours,
            spent_hours,
            percent,
            due,
            overdue: spent_hours > estimate_hours || past_due,
        }
    }
}

impl<T: IssueTracker> CommandExecutor<T> {
    /// Progress of the current user's issues, sorted by key number.
    ///
    /// Without keys or statuses only issues in progress are reported.
    pub fn progress(
        &self,
        tokens: &[String],
        statuses: &[String],
        today: NaiveDate,
    ) -> Result<Vec<ProgressRow>> {
        let project = self.settings.require_project()?;
        let issue_keys = self.expand_keys(tokens)?;
        let query = jql::progress_query(project, &issue_keys, statuses);

        let mut rows: Vec<ProgressRow> = self
            .tracker
            .search(&query, FIELDS)?
            .iter()
            .map(|issue| ProgressRow::from_issue(issue, today))
            .collect();
        rows.sort_by_key(|row| keys::key_number(&row.key));
        Ok(rows)
    }
}

fn format_hours(hours: f64) -> String {
    let text = format!("{:.2}", hours);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Draw the report as a table; overdue rows are bold.
pub fn render_progress(rows: &[ProgressRow]) -> String {
    let headings = ["key", "estimated", "progress", "percent", "due"];
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.key.clone(),
                format_hours(row.estimate_hours),
                format_hours(row.spent_hours),
                format!("{}%", row.percent),
                row.due.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = headings.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule = widths
        .iter()
        .fold(String::from("+"), |rule, width| {
            rule + &"-".repeat(width + 2) + "+"
        });
    let line = |cells: &[String], bold: bool| {
        let mut out = String::from("|");
        for (index, (cell, width)) in cells.iter().zip(&widths).enumerate() {
            // Numbers are right aligned.
            let padded = if (1..=3).contains(&index) {
                format!("{:>width$}", cell, width = *width)
            } else {
                format!("{:<width$}", cell, width = *width)
            };
            if bold {
                out.push_str(&format!(" \x1b[1m{}\x1b[0m |", padded));
            } else {
                out.push_str(&format!(" {} |", padded));
            }
        }
        out
    };

    let mut out = vec![rule.clone()];
    out.push(line(&headings.map(str::to_string), false));
    out.push(rule.clone());
    for (row, cells) in rows.iter().zip(&cells) {
        out.push(line(cells, row.overdue));
    }
    out.push(rule);
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::InMemoryTracker;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()
    }

    fn issue(key: &str, ratio: i64, spent: u64, estimate: Option<u64>, due: Option<&str>) -> Value {
        json!({
            "key": key,
            "fields": {
                "workratio": ratio,
                "aggregatetimespent": spent,
                "aggregatetimeoriginalestimate": estimate,
                "duedate": due,
            }
        })
    }

    #[test]
    fn test_row_uses_workratio_when_present() {
        let row = ProgressRow::from_issue(&issue("APP-1", 25, 3600, Some(4 * 3600), None), today());
        assert_eq!(row.percent, 25);
        assert_eq!(row.estimate_hours, 4.0);
        assert_eq!(row.spent_hours, 1.0);
        assert!(!row.overdue);
    }

    #[test]
    fn test_row_computes_percent_without_workratio() {
        let row = ProgressRow::from_issue(&issue("APP-1", -1, 3 * 3600, Some(4 * 3600), None), today());
        assert_eq!(row.percent, 75);

        let row = ProgressRow::from_issue(&issue("APP-1", -1, 0, None, None), today());
        assert_eq!(row.percent, 0);
        assert_eq!(row.estimate_hours, 0.0);
    }

    #[test]
    fn test_overdue_when_over_estimate_or_past_due() {
        let over = ProgressRow::from_issue(&issue("APP-1", 150, 6 * 3600, Some(4 * 3600), None), today());
        assert!(over.overdue);

        let due_today = ProgressRow::from_issue(
            &issue("APP-2", 10, 3600, Some(10 * 3600), Some("2024-03-12")),
            today(),
        );
        assert!(due_today.overdue);

        let due_later = ProgressRow::from_issue(
            &issue("APP-3", 10, 3600, Some(10 * 3600), Some("2024-04-01")),
            today(),
        );
        assert!(!due_later.overdue);
    }

    #[test]
    fn test_progress_queries_and_sorts_by_key_number() {
        let query = jql::progress_query("APP", &[] as &[String], &[] as &[String]);
        let tracker = InMemoryTracker::new().with_search(
            &query,
            vec![
                issue("APP-10", 0, 0, Some(3600), None),
                issue("APP-9", 0, 0, Some(3600), None),
            ],
        );
        let executor = CommandExecutor::new(
            tracker,
            Settings {
                project: Some("APP".to_string()),
                ..Settings::default()
            },
        );

        let rows = executor.progress(&[], &[], today()).unwrap();
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["APP-9", "APP-10"]);
    }

    #[test]
    fn test_progress_requires_project() {
        let executor = CommandExecutor::new(InMemoryTracker::new(), Settings::default());
        assert!(executor.progress(&[], &[], today()).is_err());
    }

    #[test]
    fn test_render_bolds_overdue_rows() {
        let rows = vec![
            ProgressRow::from_issue(&issue("APP-1", 25, 3600, Some(4 * 3600), None), today()),
            ProgressRow::from_issue(&issue("APP-2", 150, 6 * 3600, Some(4 * 3600), None), today()),
        ];
        let table = render_progress(&rows);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[1].contains("estimated"));
        assert!(lines[3].contains("APP-1") && !lines[3].contains("\x1b[1m"));
        assert!(lines[4].contains("\x1b[1mAPP-2"));
        assert!(lines[3].contains("     25% |"));
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(4.0), "4");
        assert_eq!(format_hours(1.5), "1.5");
        assert_eq!(format_hours(1.0 / 3.0), "0.33");
    }
}
