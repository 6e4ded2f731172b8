use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

mod error;
mod haproxy;
pub mod logging;
mod registry;
mod service;

pub use error::SettingsError;
pub use haproxy::HaproxySettings;
pub use logging::{LogFormat, LogOutput, LogSettings};
pub use registry::RegistrySettings;
pub use service::{RouterOptions, ServiceSettings};

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterType {
    Haproxy,
    Console,
}

impl Default for RouterType {
    fn default() -> Self {
        RouterType::Haproxy
    }
}

impl std::str::FromStr for RouterType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "haproxy" => Ok(RouterType::Haproxy),
            "console" => Ok(RouterType::Console),
            _ => Err(format!("Invalid router type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterSettings {
    #[serde(default, rename = "type")]
    pub router_type: RouterType,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Prometheus 익스포터 바인드 주소 (예: "0.0.0.0:9090"). 없으면 비활성.
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    // 레지스트리 접속 설정
    #[serde(default)]
    pub registry: RegistrySettings,

    // HAProxy 투영 설정
    #[serde(default)]
    pub haproxy: HaproxySettings,

    #[serde(default)]
    pub router: RouterSettings,

    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    /// 감시 대상 서비스 목록
    #[serde(default)]
    pub services: Vec<ServiceSettings>,
}

impl Settings {
    /// 설정 로드. 인자 또는 SYNAPSE_CONFIG_FILE이 가리키는 TOML 파일을 우선하고,
    /// 없으면 환경 변수에서 구성한다.
    pub fn load(config_path: Option<String>) -> Result<Self> {
        let path = config_path.or_else(|| env::var("SYNAPSE_CONFIG_FILE").ok());
        let settings = match path {
            Some(path) => Self::from_toml_file(&path)?,
            None => Self::from_env()?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!(path = %path.as_ref().display(), "설정 파일 로드");
        let content = fs::read_to_string(&path).map_err(|e| SettingsError::FileError {
            path: path.as_ref().to_string_lossy().to_string(),
            error: e,
        })?;

        let settings: Self = toml::from_str(&content)
            .map_err(|e| SettingsError::ParseError { source: e })?;

        Ok(settings)
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self {
            registry: RegistrySettings::from_env()?,
            haproxy: HaproxySettings::from_env()?,
            router: RouterSettings {
                router_type: parse_env_var("SYNAPSE_ROUTER_TYPE", RouterType::default)?,
            },
            logging: LogSettings::from_env()?,
            metrics: MetricsSettings {
                address: env::var("SYNAPSE_METRICS_ADDRESS").ok(),
            },
            // 서비스 목록은 환경 변수로 표현할 수 없어 설정 파일에서만 온다
            services: Vec::new(),
        })
    }

    /// 설정 유효성 검증. 실패하면 기동이 중단된다.
    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        self.logging.validate()?;

        if self.router.router_type == RouterType::Haproxy {
            self.haproxy.validate()?;
        }

        if self.services.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "서비스가 하나 이상 필요합니다".to_string(),
            ));
        }

        let mut keys = HashSet::new();
        for service in &self.services {
            service.validate()?;
            if !keys.insert(service.key()) {
                return Err(SettingsError::DuplicateService(service.key()));
            }
        }

        Ok(())
    }
}

pub fn parse_env_var<T: std::str::FromStr, F: FnOnce() -> T>(name: &str, default: F) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}
