use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use super::{parse_env_var, SettingsError};

#[derive(Debug, Clone, Deserialize)]
pub struct HaproxySettings {
    /// HAProxy 설정 파일 경로 (필수)
    #[serde(default)]
    pub config_path: String,

    /// 리로드 명령 argv (필수, 비어 있으면 안 됨)
    #[serde(default)]
    pub reload_command: Vec<String>,

    /// 리로드 성공 후 분리 실행되는 정리 명령 argv (선택)
    #[serde(default)]
    pub cleanup_command: Vec<String>,

    /// 연속 리로드 사이의 최소 간격 (기본값: 500ms)
    #[serde(default = "default_reload_min_interval")]
    pub reload_min_interval_in_milli: u64,

    /// 리로드 명령 제한 시간 (기본값: 1000ms)
    #[serde(default = "default_reload_timeout")]
    pub reload_timeout_in_milli: u64,

    /// 정리 명령 제한 시간 (기본값: 35000ms)
    #[serde(default = "default_cleanup_timeout")]
    pub cleanup_timeout_in_milli: u64,

    /// 서버 상태 파일 경로. 현재 코어 경로에서는 사용하지 않는다.
    #[serde(default)]
    pub state_path: Option<String>,

    /// global 섹션 시드 라인
    #[serde(default)]
    pub global: Vec<String>,

    /// defaults 섹션 시드 라인
    #[serde(default)]
    pub defaults: Vec<String>,

    /// listen 블록 시드 (이름 -> 라인 목록)
    #[serde(default)]
    pub listen: BTreeMap<String, Vec<String>>,
}

fn default_reload_min_interval() -> u64 { 500 }
fn default_reload_timeout() -> u64 { 1000 }
fn default_cleanup_timeout() -> u64 { 35 * 1000 }

impl HaproxySettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            config_path: env::var("SYNAPSE_HAPROXY_CONFIG_PATH").unwrap_or_default(),
            reload_command: split_command(env::var("SYNAPSE_RELOAD_COMMAND").ok()),
            cleanup_command: split_command(env::var("SYNAPSE_CLEANUP_COMMAND").ok()),
            reload_min_interval_in_milli: parse_env_var(
                "SYNAPSE_RELOAD_MIN_INTERVAL_IN_MILLI",
                default_reload_min_interval,
            )?,
            reload_timeout_in_milli: parse_env_var(
                "SYNAPSE_RELOAD_TIMEOUT_IN_MILLI",
                default_reload_timeout,
            )?,
            cleanup_timeout_in_milli: parse_env_var(
                "SYNAPSE_CLEANUP_TIMEOUT_IN_MILLI",
                default_cleanup_timeout,
            )?,
            state_path: env::var("SYNAPSE_HAPROXY_STATE_PATH").ok(),
            global: Vec::new(),
            defaults: Vec::new(),
            listen: BTreeMap::new(),
        })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.config_path.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "config_path는 haproxy 라우터에 필수입니다".to_string(),
            ));
        }
        if self.reload_command.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "reload_command는 haproxy 라우터에 필수입니다".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for HaproxySettings {
    fn default() -> Self {
        Self {
            config_path: String::new(),
            reload_command: Vec::new(),
            cleanup_command: Vec::new(),
            reload_min_interval_in_milli: default_reload_min_interval(),
            reload_timeout_in_milli: default_reload_timeout(),
            cleanup_timeout_in_milli: default_cleanup_timeout(),
            state_path: None,
            global: Vec::new(),
            defaults: Vec::new(),
            listen: BTreeMap::new(),
        }
    }
}

fn split_command(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(|s| s.to_string()).collect())
        .unwrap_or_default()
}
