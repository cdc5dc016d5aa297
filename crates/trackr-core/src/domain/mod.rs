//! Domain model (ids, reports, jobs, tasks, summaries).
//!
//! - ids: 型付き ID（ReportId / ProjectId / UserId / TaskId）
//! - report: Report レコードと状態遷移（PENDING → PROCESSING → COMPLETED | FAILED）
//! - job: キューに流す ReportJob
//! - task: 集計対象のタスクとプロジェクト
//! - summary: ReportSummary / ProjectSummary の計算
//! - errors: エラー分類と遷移エラー

pub mod errors;
pub mod ids;
pub mod job;
pub mod report;
pub mod summary;
pub mod task;

pub use self::errors::{ErrorKind, TransitionError};
pub use self::ids::{ProjectId, ReportId, TaskId, UserId};
pub use self::job::ReportJob;
pub use self::report::{Page, Report, ReportStatus, ReportTransition, ReportType};
pub use self::summary::{PriorityBreakdown, ProjectSummary, ReportSummary};
pub use self::task::{Assignee, Project, TaskPriority, TaskSnapshot, TaskStatus};
