use async_trait::async_trait;
use tracing::info;

use super::error::RouterError;
use super::report::ServiceReport;
use super::Router;
use crate::metrics;

/// 멤버십을 로그로만 내보내는 라우터. 투영 대상 없이 디스커버리
/// 파이프라인을 점검할 때 쓴다.
pub struct ConsoleRouter;

impl ConsoleRouter {
    pub fn new() -> Self {
        metrics::register_router("console");
        Self
    }
}

impl Default for ConsoleRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Router for ConsoleRouter {
    fn kind(&self) -> &'static str {
        "console"
    }

    async fn update(&mut self, report: ServiceReport) -> Result<(), RouterError> {
        info!(
            service = %report.service.name,
            members = report.reports.len(),
            "서비스 리포트"
        );
        for host in &report.reports {
            info!(
                service = %report.service.name,
                name = %host.name,
                address = %format!("{}:{}", host.host, host.port),
                weight = ?host.weight,
                available = ?host.available,
                "멤버"
            );
        }
        Ok(())
    }
}
