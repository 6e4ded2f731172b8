use serde::Deserialize;
use std::env;
use super::{parse_env_var, SettingsError};

/// 재시작 백오프 하한. 워치 재등록 폭주를 막기 위해 이 값 아래로 내려갈 수 없다.
const MIN_RESTART_BACKOFF_IN_MILLI: u64 = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySettings {
    /// 레지스트리 접속 주소 목록 (host:port)
    #[serde(default)]
    pub hosts: Vec<String>,

    /// 감시 루프 재시작 사이의 대기 시간 (기본값: 500ms)
    #[serde(default = "default_restart_backoff")]
    pub restart_backoff_in_milli: u64,

    /// 세션 접속 재시도 횟수 (기본값: 3)
    #[serde(default = "default_connect_max_attempts")]
    pub connect_max_attempts: u32,
}

fn default_restart_backoff() -> u64 { MIN_RESTART_BACKOFF_IN_MILLI }
fn default_connect_max_attempts() -> u32 { 3 }

impl RegistrySettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let hosts = match env::var("SYNAPSE_REGISTRY_HOSTS") {
            Ok(value) => value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(env::VarError::NotPresent) => Vec::new(),
            Err(e) => {
                return Err(SettingsError::EnvVarInvalid {
                    var_name: "SYNAPSE_REGISTRY_HOSTS".to_string(),
                    value: "".to_string(),
                    reason: e.to_string(),
                })
            }
        };

        Ok(Self {
            hosts,
            restart_backoff_in_milli: parse_env_var("SYNAPSE_RESTART_BACKOFF_IN_MILLI", default_restart_backoff)?,
            connect_max_attempts: parse_env_var("SYNAPSE_CONNECT_MAX_ATTEMPTS", default_connect_max_attempts)?,
        })
    }

    /// 접속 문자열 (쉼표로 연결된 host:port 목록)
    pub fn cluster(&self) -> String {
        self.hosts.join(",")
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.hosts.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "레지스트리 호스트가 하나 이상 필요합니다".to_string(),
            ));
        }
        if self.restart_backoff_in_milli < MIN_RESTART_BACKOFF_IN_MILLI {
            return Err(SettingsError::InvalidConfig(format!(
                "restart_backoff_in_milli는 {}ms 이상이어야 합니다",
                MIN_RESTART_BACKOFF_IN_MILLI
            )));
        }
        if self.connect_max_attempts == 0 {
            return Err(SettingsError::InvalidConfig(
                "connect_max_attempts는 0이 될 수 없습니다".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            restart_backoff_in_milli: default_restart_backoff(),
            connect_max_attempts: default_connect_max_attempts(),
        }
    }
}
