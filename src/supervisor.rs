use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::discovery::{DirectorySession, RegistryConnector, ServiceWatcher};
use crate::metrics;
use crate::router::report::{Service, ServiceReport};
use crate::router::Router;
use crate::settings::Settings;

const EVENTS_CHANNEL_CAPACITY: usize = 32;

/// 종료 신호 조정자. 장수 태스크들이 구독하는 브로드캐스트 채널 하나를 가진다.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// 감시자들과 라우터를 엮는 최상위 루프.
///
/// 서비스마다 감시 태스크를 하나씩 띄우고, 공유 채널로 들어오는 리포트를
/// 수신 순서대로 라우터에 넘긴다. 종료 신호가 오면 모든 태스크가 끝날
/// 때까지 기다린 뒤 돌아온다.
pub struct Supervisor {
    services: Vec<Arc<Service>>,
    router: Box<dyn Router>,
    connector: Arc<dyn RegistryConnector>,
    settings: Settings,
}

impl Supervisor {
    pub fn new(
        settings: Settings,
        services: Vec<Arc<Service>>,
        router: Box<dyn Router>,
        connector: Arc<dyn RegistryConnector>,
    ) -> Self {
        Self {
            services,
            router,
            connector,
            settings,
        }
    }

    pub async fn run(mut self, shutdown: &Shutdown) {
        let (events_tx, mut events_rx) = mpsc::channel::<ServiceReport>(EVENTS_CHANNEL_CAPACITY);

        let mut tasks = Vec::with_capacity(self.services.len());
        for service in &self.services {
            let watcher = ServiceWatcher::new(
                service.clone(),
                DirectorySession::new(self.connector.clone()),
                &self.settings.registry,
            );
            tasks.push(tokio::spawn(
                watcher.run(shutdown.subscribe(), events_tx.clone()),
            ));
        }
        // 송신측은 감시자들만 들고 있게 한다. 전부 죽으면 채널이 닫힌다.
        drop(events_tx);

        info!(
            services = self.services.len(),
            router = self.router.kind(),
            "감독자 기동"
        );

        let mut stop = shutdown.subscribe();
        loop {
            tokio::select! {
                maybe_report = events_rx.recv() => match maybe_report {
                    Some(report) => {
                        let service = report.service.name.clone();
                        if let Err(e) = self.router.update(report).await {
                            metrics::record_update_failure(self.router.kind());
                            error!(
                                service = %service,
                                error = %e,
                                "리포트 반영 실패"
                            );
                        }
                    }
                    None => {
                        warn!("모든 감시자가 종료되어 이벤트 채널이 닫힘");
                        break;
                    }
                },
                _ = stop.recv() => {
                    info!("종료 신호 수신, 감시자 정리 시작");
                    break;
                }
            }
        }

        // 종료 장벽: 모든 감시 태스크가 세션을 닫고 끝날 때까지 기다린다
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "감시 태스크 비정상 종료");
            }
        }
        info!("감독자 종료");
    }
}
