mod console;
mod error;
mod haproxy;
pub mod report;

pub use console::ConsoleRouter;
pub use error::RouterError;
pub use haproxy::HaproxyRouter;

use async_trait::async_trait;
use std::sync::Arc;

use report::{Service, ServiceReport};
use crate::settings::{RouterType, Settings};

/// 서비스 리포트를 소비해 투영 대상에 반영하는 단일 소비자.
#[async_trait]
pub trait Router: Send {
    fn kind(&self) -> &'static str;

    async fn update(&mut self, report: ServiceReport) -> Result<(), RouterError>;
}

/// 설정의 라우터 타입에 맞는 구현을 만든다.
pub fn router_from_settings(
    settings: &Settings,
    services: &[Arc<Service>],
) -> Result<Box<dyn Router>, RouterError> {
    match settings.router.router_type {
        RouterType::Haproxy => Ok(Box::new(HaproxyRouter::new(&settings.haproxy, services)?)),
        RouterType::Console => Ok(Box::new(ConsoleRouter::new())),
    }
}
