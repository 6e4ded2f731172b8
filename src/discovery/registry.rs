use async_trait::async_trait;
use tokio::sync::{oneshot, watch};
use zookeeper_client as zk;

use super::error::DiscoveryError;
use super::events::{RegistryEvent, WatchFired};
use super::session::SessionState;
use crate::settings::RegistrySettings;

/// 레지스트리 접속을 수립하는 쪽의 경계.
#[async_trait]
pub trait RegistryConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RegistryConn>, DiscoveryError>;
}

/// 수립된 레지스트리 세션이 제공하는 연산.
///
/// 자식 감시는 일회성이다. 호출마다 현재 자식 스냅샷과 다음 변경을
/// 기다리는 핸들을 함께 돌려주고, 발화 후에는 다시 등록해야 한다.
#[async_trait]
pub trait RegistryConn: Send + Sync {
    fn state(&self) -> SessionState;

    async fn get(&self, path: &str) -> Result<Vec<u8>, DiscoveryError>;

    async fn children_and_watch(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, WatchFired), DiscoveryError>;
}

pub struct ZookeeperConnector {
    cluster: String,
}

impl ZookeeperConnector {
    pub fn new(settings: &RegistrySettings) -> Self {
        Self {
            cluster: settings.cluster(),
        }
    }
}

#[async_trait]
impl RegistryConnector for ZookeeperConnector {
    async fn connect(&self) -> Result<Box<dyn RegistryConn>, DiscoveryError> {
        let client = zk::Client::connect(&self.cluster).await.map_err(|e| {
            DiscoveryError::ConnectFailed {
                hosts: self.cluster.clone(),
                reason: e.to_string(),
            }
        })?;
        let state = track_session_state(client.state_watcher());
        Ok(Box::new(ZookeeperConn { client, state }))
    }
}

struct ZookeeperConn {
    client: zk::Client,
    state: watch::Receiver<SessionState>,
}

#[async_trait]
impl RegistryConn for ZookeeperConn {
    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, DiscoveryError> {
        let (data, _stat) = self.client.get_data(path).await.map_err(|e| {
            DiscoveryError::NodeRead {
                path: path.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(data)
    }

    async fn children_and_watch(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, WatchFired), DiscoveryError> {
        let (children, watcher) = self
            .client
            .list_and_watch_children(path)
            .await
            .map_err(|e| DiscoveryError::WatchFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let event = watcher.changed().await;
            let _ = tx.send(RegistryEvent {
                state: map_session_state(event.session_state),
                error: None,
            });
        });

        Ok((children, WatchFired::new(rx)))
    }
}

/// 세션 상태 전이를 백그라운드에서 추적해 마지막 상태를 보관한다.
fn track_session_state(mut watcher: zk::StateWatcher) -> watch::Receiver<SessionState> {
    let (tx, rx) = watch::channel(map_session_state(watcher.state()));
    tokio::spawn(async move {
        loop {
            let state = watcher.changed().await;
            let terminal = matches!(
                state,
                zk::SessionState::Expired | zk::SessionState::AuthFailed | zk::SessionState::Closed
            );
            if tx.send(map_session_state(state)).is_err() {
                break;
            }
            if terminal {
                break;
            }
        }
    });
    rx
}

fn map_session_state(state: zk::SessionState) -> SessionState {
    match state {
        zk::SessionState::SyncConnected => SessionState::HasSession,
        zk::SessionState::ConnectedReadOnly => SessionState::ReadOnly,
        zk::SessionState::Disconnected => SessionState::Disconnected,
        zk::SessionState::Expired => SessionState::Expired,
        zk::SessionState::AuthFailed => SessionState::AuthFailed,
        zk::SessionState::Closed => SessionState::Disconnected,
        _ => SessionState::Unknown,
    }
}
