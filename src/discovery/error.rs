use std::fmt;

#[derive(Debug)]
pub enum DiscoveryError {
    /// 레지스트리 접속 실패
    ConnectFailed {
        hosts: String,
        reason: String,
    },
    /// 세션 없이 레지스트리 연산을 시도함
    NotConnected,
    /// 자식 감시 등록 또는 감시 이벤트 오류
    WatchFailed {
        path: String,
        reason: String,
    },
    /// 노드 데이터 조회 실패
    NodeRead {
        path: String,
        reason: String,
    },
    /// 노드 페이로드 디코딩 실패. 해당 멤버만 제외된다.
    PayloadDecode {
        path: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed { hosts, reason } =>
                write!(f, "레지스트리 {} 접속 실패: {}", hosts, reason),
            Self::NotConnected =>
                write!(f, "레지스트리 세션이 없습니다"),
            Self::WatchFailed { path, reason } =>
                write!(f, "경로 {} 감시 오류: {}", path, reason),
            Self::NodeRead { path, reason } =>
                write!(f, "노드 {} 조회 실패: {}", path, reason),
            Self::PayloadDecode { path, source } =>
                write!(f, "노드 {} 페이로드 디코딩 실패: {}", path, source),
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PayloadDecode { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl DiscoveryError {
    /// 재시도 가능한 오류인지 확인. 페이로드 디코딩 실패는 재시도해도 달라지지 않는다.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::PayloadDecode { .. })
    }
}
