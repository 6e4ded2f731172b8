use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

use super::error::RouterError;
use super::report::{DiscoveredHost, Service, ServiceReport};
use super::Router;
use crate::haproxy::{HaproxyClient, ServerOptionsTemplates};
use crate::metrics;
use crate::settings::HaproxySettings;

const ROUTER_KIND: &str = "haproxy";

/// 서비스 리포트를 HAProxy 설정으로 번역하는 라우터.
///
/// 마지막으로 반영한 리포트를 서비스별로 보관해 두 가지에 쓴다.
/// 사라진 멤버를 maint 상태로 되살리는 diff와, 구조가 그대로인지
/// 판단하는 소켓 갱신 가능성 검사다.
pub struct HaproxyRouter {
    client: HaproxyClient,
    templates: ServerOptionsTemplates,
    last_events: HashMap<String, ServiceReport>,
    disabled_regex: Regex,
}

impl HaproxyRouter {
    pub fn new(
        settings: &HaproxySettings,
        services: &[Arc<Service>],
    ) -> Result<Self, RouterError> {
        let client = HaproxyClient::new(settings).map_err(|e| RouterError::Init {
            reason: e.to_string(),
        })?;
        let templates = ServerOptionsTemplates::compile(services)?;
        let disabled_regex = Regex::new("disabled").map_err(|e| RouterError::Init {
            reason: e.to_string(),
        })?;
        metrics::register_router(ROUTER_KIND);

        Ok(Self {
            client,
            templates,
            last_events: HashMap::new(),
            disabled_regex,
        })
    }

    /// 이전 리포트에 있던 멤버가 새 리포트에서 빠졌으면 `available=false`로
    /// 되살려 붙인다. 그냥 지우면 리로드 전까지 HAProxy 메모리에 남은 서버가
    /// 트래픽을 계속 받기 때문이다.
    ///
    /// 이전 리포트가 없거나 멤버가 늘어난 경우는 건드리지 않는다.
    fn diff_with_old_report(&self, mut report: ServiceReport) -> ServiceReport {
        let Some(previous) = self.last_events.get(&report.service.name) else {
            return report;
        };
        if previous.reports.len() < report.reports.len() {
            return report;
        }

        for old in &previous.reports {
            let still_present = report.reports.iter().any(|new| new.name == old.name);
            if !still_present {
                debug!(
                    service = %report.service.name,
                    server = %old.name,
                    "리포트에서 사라진 멤버, maint로 되살림"
                );
                let mut revived = old.clone();
                revived.available = Some(false);
                report.reports.push(revived);
            }
        }
        report
    }

    /// 모든 멤버가 이전 리포트의 어떤 멤버와 (port, name, 서버 옵션) 튜플이
    /// 일치하면 소켓으로 갱신할 수 있다. weight와 available 변화만 허용된다.
    fn is_socket_updatable(&self, report: &ServiceReport) -> bool {
        let Some(previous) = self.last_events.get(&report.service.name) else {
            debug!(service = %report.service.name, "이전 리포트 없음, 리로드 필요");
            return false;
        };

        for new in &report.reports {
            let weight_only = previous.reports.iter().any(|old| {
                new.port == old.port
                    && new.name == old.name
                    && new.haproxy_server_options == old.haproxy_server_options
            });
            if !weight_only {
                debug!(
                    service = %report.service.name,
                    server = %new.name,
                    "새 서버이거나 옵션이 바뀜, 리로드 필요"
                );
                return false;
            }
        }
        true
    }

    /// 리포트를 frontend/backend 라인으로 번역한다.
    fn to_frontend_and_backend(
        &self,
        report: &ServiceReport,
    ) -> Result<(Vec<String>, Vec<String>), RouterError> {
        let options = report.service.router_options.as_ref();

        let mut frontend = options.map(|o| o.frontend.clone()).unwrap_or_default();
        frontend.push(format!("default_backend {}", report.service.key()));

        let mut backend = options.map(|o| o.backend.clone()).unwrap_or_default();
        for host in &report.reports {
            backend.push(self.server_line(&report.service, host)?);
        }

        Ok((frontend, backend))
    }

    fn server_line(
        &self,
        service: &Service,
        host: &DiscoveredHost,
    ) -> Result<String, RouterError> {
        let mut line = format!("server {} {}:{} ", host.name, host.host, host.port);
        if let Some(weight) = host.weight {
            line.push_str(&format!("weight {}", weight));
        }
        line.push(' ');
        line.push_str(&host.haproxy_server_options);
        line.push(' ');
        line.push_str(&self.templates.render(service, host)?);
        if host.is_draining() && !self.disabled_regex.is_match(&host.haproxy_server_options) {
            line.push_str(" disabled");
        }
        if host.is_draining() {
            // 소켓 경로가 maint 상태를 알아보는 표식
            line.push_str(" #isDisabled");
        }
        Ok(line)
    }
}

#[async_trait]
impl Router for HaproxyRouter {
    fn kind(&self) -> &'static str {
        ROUTER_KIND
    }

    async fn update(&mut self, report: ServiceReport) -> Result<(), RouterError> {
        let report = self.diff_with_old_report(report);
        let reload_needed = !self.client.has_socket() || !self.is_socket_updatable(&report);

        self.last_events
            .insert(report.service.name.clone(), report.clone());

        let (frontend, backend) = self.to_frontend_and_backend(&report)?;
        let key = report.service.key();
        self.client.config.frontend.insert(key.clone(), frontend);
        self.client.config.backend.insert(key, backend);

        if reload_needed {
            self.client.reload().await.map_err(|e| RouterError::Reload {
                service: report.service.name.clone(),
                source: e,
            })?;
        } else if let Err(e) = self.client.socket_update().await {
            metrics::record_socket_failure(ROUTER_KIND);
            error!(
                service = %report.service.name,
                error = %e,
                "소켓 갱신 실패, 리로드로 대체"
            );
            self.client.reload().await.map_err(|e| RouterError::Reload {
                service: report.service.name.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}
