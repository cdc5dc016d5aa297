//! Errors - エラーの運用分類と状態遷移エラー

use super::report::ReportStatus;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（リトライ推奨。キュー停止など）
/// - Permanent: 恒久的なエラー（リトライ無意味。権限なし、入力不正など）
/// - Infrastructure: インフラエラー（DB/Redis の障害。原因次第）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

/// 許可されていない状態遷移
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid report transition {from} -> {to}")]
pub struct TransitionError {
    pub from: ReportStatus,
    pub to: ReportStatus,
}
