use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError,
};
use rand::Rng;
use sha1::{Digest, Sha1};
use std::sync::Arc;

use crate::router::report::{DiscoveredHost, Service};
use crate::router::RouterError;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Go 렌더러가 값 없는 자리에 남기던 표식. 설정 작성자가 실수로 넣으면
/// 해당 리포트 반영을 중단한다.
const NO_VALUE_SENTINEL: &str = "<no value>";

pub fn rand_string(n: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

pub fn sha1_string(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

fn rand_string_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let len = h
        .param(0)
        .and_then(|p| p.value().as_u64())
        .ok_or_else(|| RenderError::new("randString는 길이 인자가 필요합니다"))?;
    out.write(&rand_string(len as usize))?;
    Ok(())
}

fn sha1_string_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let input = h
        .param(0)
        .and_then(|p| p.value().as_str().map(|s| s.to_string()))
        .unwrap_or_default();
    out.write(&sha1_string(&input))?;
    Ok(())
}

/// 헬퍼가 등록된 새 레지스트리. 템플릿을 파싱하기 전에 헬퍼부터 들어간다.
fn new_registry() -> Handlebars<'static> {
    let mut registry = Handlebars::new();
    registry.register_helper("randString", Box::new(rand_string_helper));
    registry.register_helper("sha1String", Box::new(sha1_string_helper));
    registry
}

/// 서비스별 서버 옵션 템플릿 모음. 기동 시 한 번 컴파일되고 이후 불변이다.
pub struct ServerOptionsTemplates {
    registry: Handlebars<'static>,
}

impl ServerOptionsTemplates {
    /// 모든 서비스의 템플릿을 컴파일한다. 파싱 실패는 기동 실패다.
    pub fn compile(services: &[Arc<Service>]) -> Result<Self, RouterError> {
        let mut registry = new_registry();
        for service in services {
            if let Some(template) = &service.server_options_template {
                registry
                    .register_template_string(&service.name, template)
                    .map_err(|e| RouterError::TemplateParse {
                        service: service.name.clone(),
                        reason: e.to_string(),
                    })?;
            }
        }
        Ok(Self { registry })
    }

    /// 한 멤버의 서버 옵션을 렌더링한다. 템플릿이 없는 서비스는 빈 문자열.
    pub fn render(&self, service: &Service, host: &DiscoveredHost) -> Result<String, RouterError> {
        if service.server_options_template.is_none() {
            return Ok(String::new());
        }

        let rendered = self
            .registry
            .render(&service.name, &serde_json::json!({ "Name": host.name }))
            .map_err(|e| RouterError::TemplateRender {
                service: service.name.clone(),
                server: host.name.clone(),
                reason: e.to_string(),
            })?;

        if rendered.contains(NO_VALUE_SENTINEL) {
            return Err(RouterError::TemplateNoValue {
                service: service.name.clone(),
                content: rendered,
            });
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ServiceSettings;

    fn service(template: Option<&str>) -> Arc<Service> {
        Service::from_settings(&ServiceSettings {
            name: "web".to_string(),
            id: 1,
            path: "/services/web".to_string(),
            server_options_template: template.map(|t| t.to_string()),
            router_options: None,
        })
    }

    fn host(name: &str) -> DiscoveredHost {
        DiscoveredHost::decode(br#"{"host":"10.0.0.1","port":80}"#, name).unwrap()
    }

    #[test]
    fn test_rand_string_length_and_alphabet() {
        let value = rand_string(16);
        assert_eq!(value.len(), 16);
        assert!(value.bytes().all(|b| LETTERS.contains(&b)));
        assert_eq!(rand_string(0), "");
    }

    #[test]
    fn test_sha1_string_hex_digest() {
        // sha1("abc")의 알려진 다이제스트
        assert_eq!(sha1_string("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_render_name_substitution() {
        let service = service(Some("check port {{Name}}"));
        let templates = ServerOptionsTemplates::compile(&[service.clone()]).unwrap();
        let rendered = templates.render(&service, &host("a")).unwrap();
        assert_eq!(rendered, "check port a");
    }

    #[test]
    fn test_render_sha1_helper() {
        let service = service(Some("id-{{sha1String Name}}"));
        let templates = ServerOptionsTemplates::compile(&[service.clone()]).unwrap();
        let rendered = templates.render(&service, &host("abc")).unwrap();
        assert_eq!(rendered, "id-a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_render_rand_helper_length() {
        let service = service(Some("{{randString 8}}"));
        let templates = ServerOptionsTemplates::compile(&[service.clone()]).unwrap();
        let rendered = templates.render(&service, &host("a")).unwrap();
        assert_eq!(rendered.len(), 8);
    }

    #[test]
    fn test_render_without_template_is_empty() {
        let service = service(None);
        let templates = ServerOptionsTemplates::compile(&[service.clone()]).unwrap();
        assert_eq!(templates.render(&service, &host("a")).unwrap(), "");
    }

    #[test]
    fn test_render_rejects_no_value_sentinel() {
        let service = service(Some("check <no value>"));
        let templates = ServerOptionsTemplates::compile(&[service.clone()]).unwrap();
        match templates.render(&service, &host("a")) {
            Err(RouterError::TemplateNoValue { service, .. }) => assert_eq!(service, "web"),
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn test_compile_rejects_broken_template() {
        let service = service(Some("{{#if}}"));
        assert!(ServerOptionsTemplates::compile(&[service]).is_err());
    }
}
