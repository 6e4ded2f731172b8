use std::sync::Arc;
use tracing::{error, info};

use synapse_haproxy::discovery::ZookeeperConnector;
use synapse_haproxy::logging::init_logging;
use synapse_haproxy::metrics::init_metrics;
use synapse_haproxy::router::report::Service;
use synapse_haproxy::router::router_from_settings;
use synapse_haproxy::settings::Settings;
use synapse_haproxy::supervisor::{Shutdown, Supervisor};

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1);
    let settings = match Settings::load(config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&settings.logging) {
        eprintln!("로깅 초기화 실패: {}", e);
        std::process::exit(1);
    }

    if let Some(address) = &settings.metrics.address {
        match address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(e) => error!(address = %address, error = %e, "메트릭 주소 파싱 실패"),
        }
    }

    let services: Vec<Arc<Service>> = settings
        .services
        .iter()
        .map(Service::from_settings)
        .collect();

    let router = match router_from_settings(&settings, &services) {
        Ok(router) => router,
        Err(e) => {
            error!(error = %e, "라우터 초기화 실패");
            std::process::exit(1);
        }
    };

    let connector = Arc::new(ZookeeperConnector::new(&settings.registry));
    let shutdown = Shutdown::new();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("종료 시그널 수신");
                shutdown.trigger();
            }
        });
    }

    Supervisor::new(settings, services, router, connector)
        .run(&shutdown)
        .await;
}
