use tokio::sync::oneshot;

use super::session::SessionState;

/// 일회성 자식 감시가 발화했을 때 전달되는 이벤트.
#[derive(Debug, Clone)]
pub struct RegistryEvent {
    /// 이벤트 시점의 세션 상태
    pub state: SessionState,
    /// 레지스트리가 전달한 오류 (있다면 감시 루프를 끝낸다)
    pub error: Option<String>,
}

/// 감시 발화를 기다리는 핸들. 감시는 일회성이라 소비하면 끝난다.
pub struct WatchFired {
    rx: oneshot::Receiver<RegistryEvent>,
}

impl WatchFired {
    pub fn new(rx: oneshot::Receiver<RegistryEvent>) -> Self {
        Self { rx }
    }

    pub async fn fired(self) -> RegistryEvent {
        match self.rx.await {
            Ok(event) => event,
            // 송신측이 사라졌다면 연결 자체가 끝난 것으로 취급
            Err(_) => RegistryEvent {
                state: SessionState::Disconnected,
                error: Some("감시 채널이 닫혔습니다".to_string()),
            },
        }
    }
}
