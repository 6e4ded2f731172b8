use serde::Deserialize;
use std::sync::Arc;

use crate::settings::{RouterOptions, ServiceSettings};

/// 레지스트리 노드 하나에서 복원된 백엔드 멤버.
///
/// `weight`와 `available`은 와이어에서 "있음/없음"이 의미를 가지므로
/// 기본값으로 접지 않고 `Option`으로 보존한다. 투영 결과가
/// "weight 지시어 없음"과 "weight 0" 사이에서 달라지기 때문이다.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiscoveredHost {
    /// 레지스트리 자식 노드 이름. 디코딩 후 항상 채워진다.
    #[serde(skip)]
    pub name: String,

    pub host: String,

    pub port: u16,

    #[serde(default)]
    pub weight: Option<u32>,

    #[serde(default)]
    pub available: Option<bool>,

    #[serde(default, rename = "haProxyServerOptions")]
    pub haproxy_server_options: String,

    /// 디코딩 전의 원본 페이로드
    #[serde(skip)]
    pub payload: serde_json::Value,
}

impl DiscoveredHost {
    /// 노드 페이로드를 디코딩한다. `name`은 레지스트리 노드 이름으로 채운다.
    pub fn decode(data: &[u8], node_name: &str) -> Result<Self, serde_json::Error> {
        let payload: serde_json::Value = serde_json::from_slice(data)?;
        let mut host: DiscoveredHost = serde_json::from_value(payload.clone())?;
        host.name = node_name.to_string();
        host.payload = payload;
        Ok(host)
    }

    /// 멤버가 존재하되 빠져야 하는(drain) 상태인지
    pub fn is_draining(&self) -> bool {
        self.available == Some(false)
    }
}

/// 정적 설정에서 만들어져 프로세스가 사는 동안 유지되는 논리 서비스.
#[derive(Debug)]
pub struct Service {
    pub name: String,
    pub id: u32,
    pub path: String,
    pub server_options_template: Option<String>,
    pub router_options: Option<RouterOptions>,
}

impl Service {
    pub fn from_settings(settings: &ServiceSettings) -> Arc<Self> {
        Arc::new(Self {
            name: settings.name.clone(),
            id: settings.id,
            path: settings.path.clone(),
            server_options_template: settings.server_options_template.clone(),
            router_options: settings.router_options.clone(),
        })
    }

    /// frontend/backend 블록 키
    pub fn key(&self) -> String {
        format!("{}_{}", self.name, self.id)
    }
}

/// 스냅샷 하나당 방출되는 멤버십 뷰.
#[derive(Debug, Clone)]
pub struct ServiceReport {
    pub service: Arc<Service>,
    /// 레지스트리 순서를 그대로 따르는 멤버 목록
    pub reports: Vec<DiscoveredHost>,
}
