//! 테스트용 인메모리 레지스트리 구현.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use synapse_haproxy::discovery::{
    DiscoveryError, RegistryConn, RegistryConnector, RegistryEvent, SessionState, WatchFired,
};

#[derive(Default)]
struct FakeState {
    /// 경로 -> (자식 이름 -> 페이로드). BTreeMap이라 자식 순서가 곧 레지스트리 순서다.
    nodes: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    state: Option<SessionState>,
    watchers: Vec<oneshot::Sender<RegistryEvent>>,
    connect_count: usize,
}

/// 커넥터와 세션 역할을 같이 하는 가짜 레지스트리.
/// 테스트가 자식 목록을 바꾸고 감시 발화를 직접 일으킨다.
#[derive(Clone)]
pub struct FakeRegistry {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        let registry = Self {
            inner: Arc::new(Mutex::new(FakeState::default())),
        };
        registry.set_state(SessionState::HasSession);
        registry
    }

    pub fn set_state(&self, state: SessionState) {
        self.inner.lock().unwrap().state = Some(state);
    }

    pub fn set_children(&self, path: &str, entries: Vec<(&str, &[u8])>) {
        let mut inner = self.inner.lock().unwrap();
        let children = inner.nodes.entry(path.to_string()).or_default();
        children.clear();
        for (name, payload) in entries {
            children.insert(name.to_string(), payload.to_vec());
        }
    }

    /// 등록된 모든 일회성 감시를 발화시킨다.
    pub fn fire(&self) {
        let watchers: Vec<_> = self.inner.lock().unwrap().watchers.drain(..).collect();
        for watcher in watchers {
            let _ = watcher.send(RegistryEvent {
                state: SessionState::HasSession,
                error: None,
            });
        }
    }

    /// 감시를 오류로 발화시켜 감시 루프를 끝낸다.
    pub fn fire_error(&self, reason: &str) {
        let watchers: Vec<_> = self.inner.lock().unwrap().watchers.drain(..).collect();
        for watcher in watchers {
            let _ = watcher.send(RegistryEvent {
                state: SessionState::HasSession,
                error: Some(reason.to_string()),
            });
        }
    }

    pub fn connect_count(&self) -> usize {
        self.inner.lock().unwrap().connect_count
    }

    pub fn pending_watchers(&self) -> usize {
        self.inner.lock().unwrap().watchers.len()
    }
}

#[async_trait]
impl RegistryConnector for FakeRegistry {
    async fn connect(&self) -> Result<Box<dyn RegistryConn>, DiscoveryError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connect_count += 1;
        if inner.state.is_none() {
            return Err(DiscoveryError::ConnectFailed {
                hosts: "fake".to_string(),
                reason: "접속 거부".to_string(),
            });
        }
        Ok(Box::new(FakeConn {
            inner: self.inner.clone(),
        }))
    }
}

struct FakeConn {
    inner: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl RegistryConn for FakeConn {
    fn state(&self) -> SessionState {
        self.inner
            .lock()
            .unwrap()
            .state
            .unwrap_or(SessionState::Disconnected)
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, DiscoveryError> {
        let inner = self.inner.lock().unwrap();
        let (parent, child) = path.rsplit_once('/').ok_or_else(|| DiscoveryError::NodeRead {
            path: path.to_string(),
            reason: "잘못된 경로".to_string(),
        })?;
        inner
            .nodes
            .get(parent)
            .and_then(|children| children.get(child))
            .cloned()
            .ok_or_else(|| DiscoveryError::NodeRead {
                path: path.to_string(),
                reason: "노드 없음".to_string(),
            })
    }

    async fn children_and_watch(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, WatchFired), DiscoveryError> {
        let mut inner = self.inner.lock().unwrap();
        let children = inner
            .nodes
            .get(path)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        let (tx, rx) = oneshot::channel();
        inner.watchers.push(tx);
        Ok((children, WatchFired::new(rx)))
    }
}
