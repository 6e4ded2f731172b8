use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use super::error::DiscoveryError;
use super::retry::{with_retry, RetryPolicy, SessionConnect};
use super::session::{DirectorySession, SessionState};
use crate::router::report::{DiscoveredHost, Service, ServiceReport};
use crate::settings::RegistrySettings;

/// 감시 패스가 끝난 이유
enum PassOutcome {
    /// 종료 신호 수신 또는 소비자 소멸
    Stopped,
}

/// 한 서비스의 레지스트리 경로를 감시해 `ServiceReport`를 만들어낸다.
///
/// 바깥 루프가 세션을 다시 세우고, 안쪽 감시 패스는 상태를 갖지 않는다.
/// 패스가 오류로 끝나면 백오프 후 전체를 다시 시작한다.
pub struct ServiceWatcher {
    service: Arc<Service>,
    session: DirectorySession,
    retry_policy: RetryPolicy,
    backoff: Duration,
}

impl ServiceWatcher {
    pub fn new(
        service: Arc<Service>,
        session: DirectorySession,
        settings: &RegistrySettings,
    ) -> Self {
        Self {
            service,
            session,
            retry_policy: RetryPolicy::from(settings),
            backoff: Duration::from_millis(settings.restart_backoff_in_milli),
        }
    }

    pub async fn run(
        mut self,
        mut stop: broadcast::Receiver<()>,
        events: mpsc::Sender<ServiceReport>,
    ) {
        info!(
            service = %self.service.name,
            path = %self.service.path,
            "서비스 감시 시작"
        );

        loop {
            let connect = SessionConnect {
                session: &mut self.session,
            };
            match with_retry(connect, self.retry_policy.clone()).await {
                Ok(state) => {
                    debug!(service = %self.service.name, state = ?state, "레지스트리 연결됨")
                }
                Err(e) => {
                    warn!(
                        service = %self.service.name,
                        error = %e,
                        "레지스트리 연결 실패, 대기 후 재시도"
                    );
                    if self.wait_or_stop(&mut stop).await {
                        break;
                    }
                    continue;
                }
            }

            match self.watch_pass(&mut stop, &events).await {
                Ok(PassOutcome::Stopped) => break,
                Err(e) => {
                    warn!(
                        service = %self.service.name,
                        error = %e,
                        "감시 루프 오류, 세션을 다시 세움"
                    );
                    self.session.close();
                }
            }

            if self.wait_or_stop(&mut stop).await {
                break;
            }
        }

        self.session.close();
        debug!(service = %self.service.name, "서비스 감시 종료");
    }

    /// 상태 없는 감시 패스. 매 반복마다 자식 스냅샷을 읽어 리포트를 방출하고
    /// 일회성 감시를 다시 등록한 뒤 발화 또는 종료 신호를 기다린다.
    async fn watch_pass(
        &mut self,
        stop: &mut broadcast::Receiver<()>,
        events: &mpsc::Sender<ServiceReport>,
    ) -> Result<PassOutcome, DiscoveryError> {
        loop {
            let (children, fired) = self
                .session
                .children_and_watch(&self.service.path)
                .await?;

            let report = self.snapshot_report(children).await?;
            debug!(
                service = %self.service.name,
                members = report.reports.len(),
                "서비스 리포트 방출"
            );
            if events.send(report).await.is_err() {
                // 소비자가 사라졌다면 더 감시할 이유가 없다
                return Ok(PassOutcome::Stopped);
            }

            tokio::select! {
                _ = stop.recv() => {
                    info!(service = %self.service.name, "종료 신호 수신");
                    return Ok(PassOutcome::Stopped);
                }
                event = fired.fired() => {
                    if let Some(reason) = event.error {
                        return Err(DiscoveryError::WatchFailed {
                            path: self.service.path.clone(),
                            reason,
                        });
                    }
                    if event.state == SessionState::Disconnected {
                        return Err(DiscoveryError::WatchFailed {
                            path: self.service.path.clone(),
                            reason: "감시 중 세션이 끊겼습니다".to_string(),
                        });
                    }
                    debug!(
                        service = %self.service.name,
                        state = ?event.state,
                        "감시 발화, 재등록"
                    );
                }
            }
        }
    }

    /// 자식 목록을 레지스트리 순서 그대로 리포트로 조립한다.
    /// 페이로드 디코딩에 실패한 멤버는 로그만 남기고 건너뛴다.
    async fn snapshot_report(
        &self,
        children: Vec<String>,
    ) -> Result<ServiceReport, DiscoveryError> {
        let mut reports = Vec::with_capacity(children.len());
        for child in children {
            let node_path = format!("{}/{}", self.service.path, child);
            let data = self.session.get(&node_path).await?;
            match DiscoveredHost::decode(&data, &child) {
                Ok(host) => reports.push(host),
                Err(e) => {
                    let error = DiscoveryError::PayloadDecode {
                        path: node_path,
                        source: e,
                    };
                    warn!(
                        service = %self.service.name,
                        error = %error,
                        "페이로드 디코딩 실패, 해당 멤버 제외"
                    );
                }
            }
        }
        Ok(ServiceReport {
            service: self.service.clone(),
            reports,
        })
    }

    /// 백오프만큼 기다린다. 종료 신호를 받으면 true를 돌려준다.
    async fn wait_or_stop(&self, stop: &mut broadcast::Receiver<()>) -> bool {
        tokio::select! {
            _ = stop.recv() => true,
            _ = sleep(self.backoff) => false,
        }
    }
}
