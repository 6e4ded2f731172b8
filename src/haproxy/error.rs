use std::fmt;

#[derive(Debug)]
pub enum HaproxyError {
    /// 설정 파일 쓰기 실패
    ConfigWrite {
        path: String,
        source: std::io::Error,
    },
    /// 실행할 명령이 비어 있음
    EmptyCommand,
    /// 자식 프로세스 실패 (기동 실패 또는 0이 아닌 종료 코드)
    CommandFailed {
        command: String,
        reason: String,
    },
    /// 명령이 제한 시간 안에 끝나지 않음
    CommandTimeout {
        command: String,
        timeout_in_milli: u64,
    },
    /// 소켓 경로가 설정에 없음
    SocketUnavailable,
    /// 관리 소켓 I/O 실패
    SocketIo {
        socket: String,
        source: std::io::Error,
    },
    /// 관리 소켓이 명령을 거부함
    SocketRejected {
        response: String,
    },
    /// 내부 패턴 컴파일 실패
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

impl fmt::Display for HaproxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigWrite { path, source } =>
                write!(f, "설정 파일 {} 쓰기 실패: {}", path, source),
            Self::EmptyCommand =>
                write!(f, "실행할 명령이 비어 있습니다"),
            Self::CommandFailed { command, reason } =>
                write!(f, "명령 [{}] 실패: {}", command, reason),
            Self::CommandTimeout { command, timeout_in_milli } =>
                write!(f, "명령 [{}]이 {}ms 안에 끝나지 않음", command, timeout_in_milli),
            Self::SocketUnavailable =>
                write!(f, "소켓 경로가 없어 소켓 갱신 불가"),
            Self::SocketIo { socket, source } =>
                write!(f, "소켓 {} I/O 실패: {}", socket, source),
            Self::SocketRejected { response } =>
                write!(f, "소켓 명령 거부됨: {}", response),
            Self::InvalidPattern { pattern, source } =>
                write!(f, "패턴 {} 컴파일 실패: {}", pattern, source),
        }
    }
}

impl std::error::Error for HaproxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigWrite { source, .. } => Some(source),
            Self::SocketIo { source, .. } => Some(source),
            Self::InvalidPattern { source, .. } => Some(source),
            _ => None,
        }
    }
}
