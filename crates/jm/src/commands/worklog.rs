//! Logging work against an issue.

use super::*;
use crate::domain::WorklogEntry;
use crate::duration::{format_started, parse_started, parse_time_spent};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

/// What was (or, in a dry run, would have been) logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorklogResult {
    pub key: String,
    pub entry: WorklogEntry,
    pub dry_run: bool,
}

impl<T: IssueTracker> CommandExecutor<T> {
    /// Log `time_spent` (free text such as `1h 12m`) on one issue.
    ///
    /// `date` is resolved against `now`; without it the tracker records the
    /// current time.
    pub fn log_work(
        &self,
        token: &str,
        time_spent: &[String],
        message: &str,
        date: Option<&str>,
        now: DateTime<Local>,
    ) -> Result<WorklogResult> {
        let key = self.single_key(token)?;
        let seconds = parse_time_spent(&time_spent.join(" "), &self.settings.worklog)?;
        let started = date
            .map(|date| parse_started(date, now))
            .transpose()?
            .map(|started| format_started(&started));

        let entry = WorklogEntry {
            comment: message.to_string(),
            time_spent_seconds: seconds,
            started,
        };

        if self.settings.dry_run {
            info!("{}: dry run, would log {}s", key, seconds);
        } else {
            self.tracker.log_work(&key, &entry)?;
            info!("{}: logged {}s", key, seconds);
        }

        Ok(WorklogResult {
            key,
            entry,
            dry_run: self.settings.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::InMemoryTracker;
    use chrono::TimeZone;

    fn executor(tracker: InMemoryTracker, dry_run: bool) -> CommandExecutor<InMemoryTracker> {
        CommandExecutor::new(
            tracker,
            Settings {
                project: Some("APP".to_string()),
                dry_run,
                ..Settings::default()
            },
        )
    }

    fn now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 12, 9, 0, 0)
            .earliest()
            .unwrap()
    }

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_logs_parsed_duration() {
        let tracker = InMemoryTracker::new().with_issue("APP-42", "Bug", "Open");
        let result = executor(tracker.clone(), false)
            .log_work("42", &words("1h 12m"), "pairing", None, now())
            .unwrap();

        assert_eq!(result.key, "APP-42");
        let logged = tracker.worklogs();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].0, "APP-42");
        assert_eq!(logged[0].1.time_spent_seconds, 4320);
        assert_eq!(logged[0].1.comment, "pairing");
        assert!(logged[0].1.started.is_none());
    }

    #[test]
    fn test_date_is_formatted_for_the_tracker() {
        let tracker = InMemoryTracker::new().with_issue("APP-42", "Bug", "Open");
        let result = executor(tracker, false)
            .log_work("APP-42", &words("30m"), "", Some("2017-02-07"), now())
            .unwrap();

        let started = result.entry.started.unwrap();
        assert!(started.starts_with("2017-02-07T09:00:00.000"));
    }

    #[test]
    fn test_dry_run_logs_nothing() {
        let tracker = InMemoryTracker::new().with_issue("APP-42", "Bug", "Open");
        let result = executor(tracker.clone(), true)
            .log_work("42", &words("1h"), "", None, now())
            .unwrap();

        assert!(result.dry_run);
        assert_eq!(tracker.mutation_count(), 0);
    }

    #[test]
    fn test_bad_inputs_are_rejected_before_any_call() {
        let tracker = InMemoryTracker::new().with_issue("APP-42", "Bug", "Open");
        let executor = executor(tracker.clone(), false);

        assert!(executor
            .log_work("nope", &words("1h"), "", None, now())
            .is_err());
        assert!(executor
            .log_work("42", &words("90"), "", None, now())
            .is_err());
        assert!(executor
            .log_work("42", &words("1h"), "", Some("someday"), now())
            .is_err());
        assert!(tracker.calls().is_empty());
    }
}
