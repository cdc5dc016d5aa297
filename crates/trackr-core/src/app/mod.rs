//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてレポートパイプラインを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **ReportService**: 認可・レポート作成・enqueue・サマリー読み取り
//! - **ReportWorker**: ジョブ 1 つの集計と状態遷移
//! - **DispatcherGroup**: Queue → Worker のループ群

pub mod builder;
pub mod dispatcher;
pub mod report_service;
pub mod worker;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::dispatcher::DispatcherGroup;
pub use self::report_service::{ReportService, ServiceError};
pub use self::worker::{ReportWorker, WorkerError, WorkerMessage};
