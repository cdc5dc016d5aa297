//! ReportJob - キューを流れるペイロード
//!
//! 値のスナップショットなので、ワーカーは ID から全部を取り直します。
//! キューに積まれたあとで行が消えたり進んだりしていても構いません。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ProjectId, ReportId};
use super::report::{Report, ReportType};

/// `{"reportId", "projectId", "reportType", "requestedAt"}` の JSON で運ぶ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportJob {
    pub report_id: ReportId,
    pub project_id: ProjectId,
    pub report_type: ReportType,
    pub requested_at: DateTime<Utc>,
}

impl From<&Report> for ReportJob {
    fn from(report: &Report) -> Self {
        Self {
            report_id: report.id.clone(),
            project_id: report.project_id.clone(),
            report_type: report.report_type,
            requested_at: report.requested_at,
        }
    }
}
