//! 라우터 갱신 실패 카운터 노출.

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

const UPDATE_FAILURES: &str = "synapse_router_update_failures";

/// 소켓 경로 실패를 구분하는 라벨 접미사
pub const SOCKET_LABEL_SUFFIX: &str = "_socket";

/// Prometheus 익스포터를 기동한다. 실패해도 프로세스는 계속 동작한다.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => info!(address = %addr, "메트릭 익스포터 기동"),
        Err(e) => warn!(address = %addr, error = %e, "메트릭 익스포터 기동 실패"),
    }
}

/// 라우터 기동 시 실패 카운터를 0으로 등록한다.
pub fn register_router(kind: &str) {
    counter!(UPDATE_FAILURES, "router" => kind.to_string()).absolute(0);
    counter!(UPDATE_FAILURES, "router" => format!("{}{}", kind, SOCKET_LABEL_SUFFIX)).absolute(0);
}

pub fn record_update_failure(kind: &str) {
    counter!(UPDATE_FAILURES, "router" => kind.to_string()).increment(1);
}

pub fn record_socket_failure(kind: &str) {
    counter!(UPDATE_FAILURES, "router" => format!("{}{}", kind, SOCKET_LABEL_SUFFIX)).increment(1);
}
