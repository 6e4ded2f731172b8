use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::settings::logging::open_log_file;
use crate::settings::{LogFormat, LogOutput, LogSettings, SettingsError};

/// 전역 트레이싱 구독자를 설치한다. 프로세스당 한 번만 호출해야 한다.
/// 로그 파일을 열 수 없으면 기동이 중단된다.
pub fn init_logging(settings: &LogSettings) -> Result<(), SettingsError> {
    let filter = EnvFilter::from_default_env()
        .add_directive(settings.level.into())
        .add_directive("synapse_haproxy=debug".parse().unwrap());

    match (&settings.format, &settings.output) {
        (LogFormat::Text, LogOutput::Stdout) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        (LogFormat::Json, LogOutput::Stdout) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .json()
                .init();
        }
        (LogFormat::Text, LogOutput::File(path)) => {
            let file = Arc::new(open_log_file(path)?);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(file)
                .init();
        }
        (LogFormat::Json, LogOutput::File(path)) => {
            let file = Arc::new(open_log_file(path)?);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .json()
                .with_writer(file)
                .init();
        }
    }
    Ok(())
}
