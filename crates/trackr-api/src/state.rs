use std::sync::Arc;

use trackr_core::app::ReportService;

use crate::auth::JwtKeys;

/// ハンドラーが共有する状態
pub struct ApiState {
    pub reports: Arc<ReportService>,
    pub keys: JwtKeys,
}

impl ApiState {
    pub fn new(reports: Arc<ReportService>, keys: JwtKeys) -> Self {
        Self { reports, keys }
    }
}
