mod config;
mod error;
mod template;

pub use config::{HaproxyConfig, CONFIG_BANNER};
pub use error::HaproxyError;
pub use template::{rand_string, sha1_string, ServerOptionsTemplates};

use regex::Regex;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::{debug, info, warn};

use crate::settings::HaproxySettings;

const WEIGHT_PATTERN: &str = r"server[\s]+([\S]+)\s(\S+):(\d+)\sweight[\s]+([\d]+)";
const DISABLED_PATTERN: &str = "#isDisabled";
const ACCEPTABLE_PATTERN: &str = r"^no\s+need\s+to\s+change.*";
const SOCKET_PATTERN: &str = r"stats[\s]+socket[\s]+(\S+)";

struct ReloadState {
    last_reload: Option<Instant>,
}

/// 실행 중인 HAProxy로 설정을 투영하는 클라이언트.
///
/// 두 경로를 가진다. 리로드 경로는 설정 파일을 다시 쓰고 리로드 명령을
/// 실행하며, 소켓 경로는 관리 소켓으로 `set server` 명령을 흘려 넣는다.
/// 리로드는 뮤텍스로 직렬화되고 최소 간격이 보장된다.
pub struct HaproxyClient {
    pub config: HaproxyConfig,
    config_path: PathBuf,
    reload_command: Vec<String>,
    cleanup_command: Vec<String>,
    reload_min_interval: Duration,
    reload_timeout_in_milli: u64,
    cleanup_timeout_in_milli: u64,
    socket_path: Option<String>,
    weight_regex: Regex,
    disabled_regex: Regex,
    acceptable_regex: Regex,
    reload_state: Mutex<ReloadState>,
}

impl HaproxyClient {
    pub fn new(settings: &HaproxySettings) -> Result<Self, HaproxyError> {
        let config = HaproxyConfig {
            global: settings.global.clone(),
            defaults: settings.defaults.clone(),
            listen: settings.listen.clone(),
            ..Default::default()
        };

        let socket_path = find_socket_path(&settings.global)?;
        if socket_path.is_none() {
            warn!(
                config = %settings.config_path,
                "소켓 경로가 없어 리로드로만 갱신합니다"
            );
        }

        Ok(Self {
            config,
            config_path: PathBuf::from(&settings.config_path),
            reload_command: settings.reload_command.clone(),
            cleanup_command: settings.cleanup_command.clone(),
            reload_min_interval: Duration::from_millis(settings.reload_min_interval_in_milli),
            reload_timeout_in_milli: settings.reload_timeout_in_milli,
            cleanup_timeout_in_milli: settings.cleanup_timeout_in_milli,
            socket_path,
            weight_regex: compile(WEIGHT_PATTERN)?,
            disabled_regex: compile(DISABLED_PATTERN)?,
            acceptable_regex: compile(ACCEPTABLE_PATTERN)?,
            reload_state: Mutex::new(ReloadState { last_reload: None }),
        })
    }

    pub fn has_socket(&self) -> bool {
        self.socket_path.is_some()
    }

    /// 설정 파일을 렌더링해 0644로 기록한다.
    pub async fn write_config(&self) -> Result<(), HaproxyError> {
        let rendered = self.config.render();
        tokio::fs::write(&self.config_path, rendered.as_bytes())
            .await
            .map_err(|e| HaproxyError::ConfigWrite {
                path: self.config_path.display().to_string(),
                source: e,
            })?;
        tokio::fs::set_permissions(&self.config_path, std::fs::Permissions::from_mode(0o644))
            .await
            .map_err(|e| HaproxyError::ConfigWrite {
                path: self.config_path.display().to_string(),
                source: e,
            })?;
        Ok(())
    }

    /// 느린 경로. 설정 파일을 다시 쓰고 리로드 명령을 실행한다.
    ///
    /// 직전 리로드와의 간격이 최소 간격보다 짧으면 그만큼 기다린다.
    /// `last_reload`는 성공이든 실패든 갱신된다.
    pub async fn reload(&self) -> Result<(), HaproxyError> {
        let mut state = self.reload_state.lock().await;

        self.write_config().await?;

        if let Some(last) = state.last_reload {
            let elapsed = last.elapsed();
            if elapsed < self.reload_min_interval {
                let wait = self.reload_min_interval - elapsed;
                debug!(wait = ?wait, "리로드 간격이 너무 짧아 대기");
                sleep(wait).await;
            }
        }

        info!(config = %self.config_path.display(), "HAProxy 리로드");
        let result = self
            .run_command(&self.reload_command, self.reload_timeout_in_milli)
            .await;

        if result.is_ok() && !self.cleanup_command.is_empty() {
            let cleanup = self.cleanup_command.clone();
            let config_path = self.config_path.clone();
            let timeout_in_milli = self.cleanup_timeout_in_milli;
            tokio::spawn(async move {
                if let Err(e) = exec_command(&cleanup, &config_path, timeout_in_milli).await {
                    warn!(error = %e, "정리 명령 실패");
                }
            });
        }

        state.last_reload = Some(Instant::now());
        result
    }

    /// 빠른 경로. 관리 소켓으로 백엔드 서버 상태를 갱신한다.
    ///
    /// 파일은 디스크를 맞춰 두기 위해 최선으로 기록하며, 실패해도
    /// 이 경로를 중단하지 않는다.
    pub async fn socket_update(&self) -> Result<(), HaproxyError> {
        let socket_path = self
            .socket_path
            .as_ref()
            .ok_or(HaproxyError::SocketUnavailable)?;
        debug!(socket = %socket_path, "소켓으로 HAProxy 갱신");

        if let Err(e) = self.write_config().await {
            warn!(error = %e, "설정 파일 기록 실패, 소켓 갱신은 계속 진행");
        }

        let commands = self.socket_commands();
        if commands.is_empty() {
            debug!("소켓으로 갱신할 서버 없음");
            return Ok(());
        }

        let mut stream = UnixStream::connect(socket_path).await.map_err(|e| {
            HaproxyError::SocketIo {
                socket: socket_path.clone(),
                source: e,
            }
        })?;

        stream
            .write_all(commands.as_bytes())
            .await
            .map_err(|e| HaproxyError::SocketIo {
                socket: socket_path.clone(),
                source: e,
            })?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| HaproxyError::SocketIo {
                socket: socket_path.clone(),
                source: e,
            })?;

        let line = line.trim_end();
        if !line.is_empty() && !self.acceptable_regex.is_match(line) {
            return Err(HaproxyError::SocketRejected {
                response: line.to_string(),
            });
        }

        Ok(())
    }

    /// 백엔드 라인을 파싱해 소켓 명령 블록을 만든다.
    /// `server <name> <ip>:<port> weight <w>` 꼴이 아닌 라인은 건너뛴다.
    fn socket_commands(&self) -> String {
        let mut commands = String::new();
        for (backend_name, servers) in &self.config.backend {
            for server in servers {
                let Some(caps) = self.weight_regex.captures(server) else {
                    continue;
                };
                let server_name = &caps[1];
                let server_ip = &caps[2];
                let weight = &caps[4];
                let state = if self.disabled_regex.is_match(server) {
                    "maint"
                } else {
                    "ready"
                };
                debug!(
                    backend = %backend_name,
                    server = %server_name,
                    ip = %server_ip,
                    weight = %weight,
                    state = %state,
                    "소켓 명령"
                );
                commands.push_str(&format!(
                    "set server {backend_name}/{server_name} addr {server_ip};\n"
                ));
                commands.push_str(&format!(
                    "set server {backend_name}/{server_name} weight {weight};\n"
                ));
                commands.push_str(&format!(
                    "set server {backend_name}/{server_name} state {state};\n"
                ));
            }
        }
        commands
    }

    async fn run_command(
        &self,
        argv: &[String],
        timeout_in_milli: u64,
    ) -> Result<(), HaproxyError> {
        exec_command(argv, &self.config_path, timeout_in_milli).await
    }
}

/// argv를 자식 프로세스로 실행한다. 환경은 상속하고 `HAP_CONFIG`만 더한다.
async fn exec_command(
    argv: &[String],
    config_path: &Path,
    timeout_in_milli: u64,
) -> Result<(), HaproxyError> {
    let (program, args) = argv.split_first().ok_or(HaproxyError::EmptyCommand)?;

    let mut command = Command::new(program);
    command
        .args(args)
        .env("HAP_CONFIG", config_path)
        .kill_on_drop(true);

    let status = timeout(Duration::from_millis(timeout_in_milli), command.status())
        .await
        .map_err(|_| HaproxyError::CommandTimeout {
            command: argv.join(" "),
            timeout_in_milli,
        })?
        .map_err(|e| HaproxyError::CommandFailed {
            command: argv.join(" "),
            reason: e.to_string(),
        })?;

    if !status.success() {
        return Err(HaproxyError::CommandFailed {
            command: argv.join(" "),
            reason: match status.code() {
                Some(code) => format!("종료 코드 {}", code),
                None => "시그널로 종료됨".to_string(),
            },
        });
    }
    Ok(())
}

fn find_socket_path(global: &[String]) -> Result<Option<String>, HaproxyError> {
    let socket_regex = compile(SOCKET_PATTERN)?;
    for line in global {
        if let Some(caps) = socket_regex.captures(line) {
            return Ok(Some(caps[1].to_string()));
        }
    }
    Ok(None)
}

fn compile(pattern: &str) -> Result<Regex, HaproxyError> {
    Regex::new(pattern).map_err(|e| HaproxyError::InvalidPattern {
        pattern: pattern.to_string(),
        source: e,
    })
}
