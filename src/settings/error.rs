use std::fmt;

#[derive(Debug)]
pub enum SettingsError {
    EnvVarMissing {
        var_name: String,
    },
    EnvVarInvalid {
        var_name: String,
        value: String,
        reason: String,
    },
    FileError {
        path: String,
        error: std::io::Error,
    },
    ParseError {
        source: toml::de::Error,
    },
    LogFileOpen {
        path: String,
        error: std::io::Error,
    },
    InvalidConfig(String),
    DuplicateService(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvVarMissing { var_name } =>
                write!(f, "환경 변수 누락: {}", var_name),
            Self::EnvVarInvalid { var_name, value, reason } =>
                write!(f, "환경 변수 {} 값 {} 오류: {}", var_name, value, reason),
            Self::FileError { path, error } =>
                write!(f, "설정 파일 {} 오류: {}", path, error),
            Self::ParseError { source } =>
                write!(f, "설정 파싱 오류: {}", source),
            Self::LogFileOpen { path, error } =>
                write!(f, "로그 파일 {} 열기 실패: {}", path, error),
            Self::InvalidConfig(reason) =>
                write!(f, "유효하지 않은 설정: {}", reason),
            Self::DuplicateService(key) =>
                write!(f, "중복된 서비스 키: {}", key),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ParseError { source } => Some(source),
            Self::FileError { error, .. } => Some(error),
            Self::LogFileOpen { error, .. } => Some(error),
            _ => None,
        }
    }
}
