use serde::Deserialize;
use super::SettingsError;

/// 라우터가 서비스 블록 앞부분에 끼워 넣는 추가 라인들.
/// console 라우터는 무시한다.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RouterOptions {
    #[serde(default)]
    pub frontend: Vec<String>,

    #[serde(default)]
    pub backend: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    /// 논리 서비스 이름
    pub name: String,

    /// 서비스 식별자. 블록 키는 `{name}_{id}` 형태가 된다.
    pub id: u32,

    /// 레지스트리 상의 서비스 경로
    pub path: String,

    /// 서버 라인마다 렌더링되는 템플릿 (선택)
    #[serde(default)]
    pub server_options_template: Option<String>,

    #[serde(default)]
    pub router_options: Option<RouterOptions>,
}

impl ServiceSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.name.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "서비스 이름은 비어 있을 수 없습니다".to_string(),
            ));
        }
        if !self.path.starts_with('/') {
            return Err(SettingsError::InvalidConfig(format!(
                "서비스 {} 경로는 /로 시작해야 합니다: {}",
                self.name, self.path
            )));
        }
        Ok(())
    }

    pub fn key(&self) -> String {
        format!("{}_{}", self.name, self.id)
    }
}
