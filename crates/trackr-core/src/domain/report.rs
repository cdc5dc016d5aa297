//! Report record and its status state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::TransitionError;
use super::ids::{ProjectId, ReportId, UserId};
use super::summary::ReportSummary;

/// Which period a report covers. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    #[default]
    Weekly,
    Monthly,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Weekly => "WEEKLY",
            ReportType::Monthly => "MONTHLY",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown report type '{0}', expected WEEKLY or MONTHLY")]
pub struct UnknownReportType(pub String);

impl FromStr for ReportType {
    type Err = UnknownReportType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WEEKLY" => Ok(ReportType::Weekly),
            "MONTHLY" => Ok(ReportType::Monthly),
            other => Err(UnknownReportType(other.to_string())),
        }
    }
}

/// Report status.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Failed
///
/// Completed / Failed are terminal: the record is never written again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// Created by the service, job sitting in the queue.
    Pending,

    /// Picked up by a worker.
    Processing,

    /// Summary attached.
    Completed,

    /// Worker gave up.
    Failed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Processing => "PROCESSING",
            ReportStatus::Completed => "COMPLETED",
            ReportStatus::Failed => "FAILED",
        }
    }

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }

    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Processing)
                | (ReportStatus::Processing, ReportStatus::Completed)
                | (ReportStatus::Processing, ReportStatus::Failed)
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown report status '{0}'")]
pub struct UnknownReportStatus(pub String);

impl FromStr for ReportStatus {
    type Err = UnknownReportStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReportStatus::Pending),
            "PROCESSING" => Ok(ReportStatus::Processing),
            "COMPLETED" => Ok(ReportStatus::Completed),
            "FAILED" => Ok(ReportStatus::Failed),
            other => Err(UnknownReportStatus(other.to_string())),
        }
    }
}

/// One status write issued by the worker.
///
/// Each variant knows the status it expects to find, so a store can apply it
/// as a single compare-and-set keyed by report id.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportTransition {
    StartProcessing,
    Complete {
        summary: ReportSummary,
        completed_at: DateTime<Utc>,
    },
    Fail,
}

impl ReportTransition {
    /// Status the report must currently be in.
    pub fn expected(&self) -> ReportStatus {
        match self {
            ReportTransition::StartProcessing => ReportStatus::Pending,
            ReportTransition::Complete { .. } | ReportTransition::Fail => ReportStatus::Processing,
        }
    }

    /// Status the report ends up in.
    pub fn target(&self) -> ReportStatus {
        match self {
            ReportTransition::StartProcessing => ReportStatus::Processing,
            ReportTransition::Complete { .. } => ReportStatus::Completed,
            ReportTransition::Fail => ReportStatus::Failed,
        }
    }
}

/// Persisted report record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub summary: Option<ReportSummary>,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Report {
    /// New report in `Pending`.
    pub fn pending(
        id: ReportId,
        project_id: ProjectId,
        user_id: UserId,
        report_type: ReportType,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            project_id,
            user_id,
            report_type,
            status: ReportStatus::Pending,
            summary: None,
            requested_at,
            completed_at: None,
        }
    }

    /// Apply a transition in place, refusing anything the state machine forbids.
    pub fn apply(&mut self, transition: ReportTransition) -> Result<(), TransitionError> {
        let to = transition.target();
        if self.status != transition.expected() || !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }

        if let ReportTransition::Complete {
            summary,
            completed_at,
        } = transition
        {
            self.summary = Some(summary);
            self.completed_at = Some(completed_at);
        }
        self.status = to;
        Ok(())
    }
}

/// skip/take pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub take: u32,
}

impl Page {
    /// Default for `PipelineConfig::default_page_size`.
    pub const DEFAULT_TAKE: u32 = 10;

    /// `take == 0` means "unset"; `ReportService` fills it from the config.
    pub fn new(skip: u32, take: u32) -> Self {
        Self { skip, take }
    }

    pub fn or_take(self, default_take: u32) -> Self {
        if self.take == 0 {
            Self {
                take: default_take,
                ..self
            }
        } else {
            self
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_TAKE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn pending_report() -> Report {
        Report::pending(
            ReportId::new("r1"),
            ProjectId::new("p1"),
            UserId::new("u1"),
            ReportType::Weekly,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[rstest]
    #[case::start(ReportStatus::Pending, ReportStatus::Processing, true)]
    #[case::complete(ReportStatus::Processing, ReportStatus::Completed, true)]
    #[case::fail(ReportStatus::Processing, ReportStatus::Failed, true)]
    #[case::skip_processing(ReportStatus::Pending, ReportStatus::Completed, false)]
    #[case::fail_from_pending(ReportStatus::Pending, ReportStatus::Failed, false)]
    #[case::back_to_pending(ReportStatus::Processing, ReportStatus::Pending, false)]
    #[case::reopen_completed(ReportStatus::Completed, ReportStatus::Processing, false)]
    #[case::completed_to_failed(ReportStatus::Completed, ReportStatus::Failed, false)]
    #[case::failed_to_completed(ReportStatus::Failed, ReportStatus::Completed, false)]
    fn transition_table(
        #[case] from: ReportStatus,
        #[case] to: ReportStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn terminal_states() {
        assert!(ReportStatus::Completed.is_terminal());
        assert!(ReportStatus::Failed.is_terminal());
        assert!(!ReportStatus::Pending.is_terminal());
        assert!(!ReportStatus::Processing.is_terminal());
    }

    #[test]
    fn apply_walks_the_happy_path() {
        let mut report = pending_report();
        report.apply(ReportTransition::StartProcessing).unwrap();
        assert_eq!(report.status, ReportStatus::Processing);

        let completed_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();
        report
            .apply(ReportTransition::Complete {
                summary: ReportSummary::default(),
                completed_at,
            })
            .unwrap();
        assert_eq!(report.status, ReportStatus::Completed);
        assert_eq!(report.completed_at, Some(completed_at));
        assert!(report.summary.is_some());
    }

    #[test]
    fn terminal_report_is_never_rewritten() {
        let mut report = pending_report();
        report.apply(ReportTransition::StartProcessing).unwrap();
        report.apply(ReportTransition::Fail).unwrap();

        let before = report.clone();
        let err = report.apply(ReportTransition::StartProcessing).unwrap_err();
        assert_eq!(err.from, ReportStatus::Failed);
        assert_eq!(report, before);
    }

    #[test]
    fn status_and_type_use_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReportStatus::Processing).unwrap(),
            "\"PROCESSING\""
        );
        assert_eq!("MONTHLY".parse::<ReportType>(), Ok(ReportType::Monthly));
        assert!("DAILY".parse::<ReportType>().is_err());
        assert!("weekly".parse::<ReportType>().is_err());
    }

    #[test]
    fn report_serializes_camel_case() {
        let v = serde_json::to_value(pending_report()).unwrap();
        assert_eq!(v["projectId"], "p1");
        assert_eq!(v["reportType"], "WEEKLY");
        assert_eq!(v["status"], "PENDING");
        assert!(v["summary"].is_null());
        assert!(v["completedAt"].is_null());
    }

    #[test]
    fn zero_take_is_filled_from_the_given_default() {
        assert_eq!(Page::new(5, 0).or_take(3), Page { skip: 5, take: 3 });
        assert_eq!(Page::new(5, 7).or_take(3), Page { skip: 5, take: 7 });
        assert_eq!(Page::default().take, Page::DEFAULT_TAKE);
    }
}
