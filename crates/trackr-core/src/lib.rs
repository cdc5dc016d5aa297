//! trackr-core
//!
//! Core building blocks for the trackr report pipeline.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, report, job, task, summary, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, ReportQueue, SummaryCache, Clock, IdGenerator）
//! - **impls**: in-memory 実装（テスト・単一プロセス開発用）
//! - **app**: ReportService / ReportWorker / DispatcherGroup / AppBuilder
//! - **config**: PipelineConfig
//! - **observability**: dispatcher のカウンタ

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use self::app::{App, AppBuilder, ServiceError};
pub use self::config::PipelineConfig;
