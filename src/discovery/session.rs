use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::DiscoveryError;
use super::events::WatchFired;
use super::registry::{RegistryConn, RegistryConnector};

/// 디렉터리 세션의 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    HasSession,
    Expired,
    AuthFailed,
    ReadOnly,
    Unknown,
}

impl SessionState {
    /// 연산이 가능한 상태인지 확인
    pub fn is_operational(&self) -> bool {
        matches!(self, SessionState::Connected | SessionState::HasSession)
    }
}

/// 레지스트리와의 장수 연결을 감싼다. 재접속 정책만 책임진다.
pub struct DirectorySession {
    connector: Arc<dyn RegistryConnector>,
    conn: Option<Box<dyn RegistryConn>>,
}

impl DirectorySession {
    pub fn new(connector: Arc<dyn RegistryConnector>) -> Self {
        Self {
            connector,
            conn: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.conn
            .as_ref()
            .map(|c| c.state())
            .unwrap_or(SessionState::Disconnected)
    }

    /// 현재 상태를 확인하고 필요하면 다시 접속한다.
    ///
    /// 기존 연결이 운영 가능한 상태면 아무것도 하지 않는다. 불량 상태면
    /// 먼저 끊고 새로 접속하며, Disconnected면 바로 재접속한다.
    pub async fn connect(&mut self) -> Result<SessionState, DiscoveryError> {
        if let Some(conn) = self.conn.take() {
            let state = conn.state();
            match state {
                SessionState::Unknown
                | SessionState::ReadOnly
                | SessionState::Expired
                | SessionState::AuthFailed
                | SessionState::Connecting => {
                    warn!(state = ?state, "레지스트리 세션 상태 불량, 끊고 재접속");
                    drop(conn);
                }
                SessionState::Connected | SessionState::HasSession => {
                    debug!(state = ?state, "레지스트리 세션 유지, 재접속 불필요");
                    self.conn = Some(conn);
                    return Ok(state);
                }
                SessionState::Disconnected => {
                    info!("레지스트리 세션 끊김, 재접속");
                    drop(conn);
                }
            }
        }

        let conn = self.connector.connect().await?;
        let state = conn.state();
        self.conn = Some(conn);
        Ok(state)
    }

    pub async fn get(&self, path: &str) -> Result<Vec<u8>, DiscoveryError> {
        self.conn()?.get(path).await
    }

    /// 자식 스냅샷과 다음 변경을 기다리는 일회성 감시 핸들을 돌려준다.
    /// 발화 후에는 다시 호출해 감시를 재등록해야 한다.
    pub async fn children_and_watch(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, WatchFired), DiscoveryError> {
        self.conn()?.children_and_watch(path).await
    }

    /// 연결과 파생된 감시를 모두 해제한다.
    pub fn close(&mut self) {
        self.conn = None;
    }

    fn conn(&self) -> Result<&dyn RegistryConn, DiscoveryError> {
        self.conn
            .as_deref()
            .ok_or(DiscoveryError::NotConnected)
    }
}
