use std::collections::BTreeMap;

/// 설정 파일 머리에 붙는 경고 배너
pub const CONFIG_BANNER: &str = "# Handled by synapse. Do not modify it.";

/// 투영된 HAProxy 설정 전체.
///
/// listen/frontend/backend는 블록 키 순서가 렌더링 결과를 결정하므로
/// `BTreeMap`으로 들고 있는다. 같은 입력이면 언제나 같은 바이트가 나온다.
#[derive(Debug, Clone, Default)]
pub struct HaproxyConfig {
    pub global: Vec<String>,
    pub defaults: Vec<String>,
    pub listen: BTreeMap<String, Vec<String>>,
    pub frontend: BTreeMap<String, Vec<String>>,
    pub backend: BTreeMap<String, Vec<String>>,
}

impl HaproxyConfig {
    /// 설정 파일 본문을 렌더링한다.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(CONFIG_BANNER);
        out.push('\n');

        out.push_str("global\n");
        for line in &self.global {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }

        out.push_str("\ndefaults\n");
        for line in &self.defaults {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }

        Self::render_blocks(&mut out, "listen", &self.listen);
        Self::render_blocks(&mut out, "frontend", &self.frontend);
        Self::render_blocks(&mut out, "backend", &self.backend);

        out
    }

    fn render_blocks(out: &mut String, section: &str, blocks: &BTreeMap<String, Vec<String>>) {
        for (name, lines) in blocks {
            out.push('\n');
            out.push_str(section);
            out.push(' ');
            out.push_str(name);
            out.push('\n');
            for line in lines {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_reference_layout() {
        let mut config = HaproxyConfig {
            global: vec![
                "stats socket /var/run/haproxy.sock".to_string(),
                "maxconn 4096".to_string(),
            ],
            defaults: vec!["mode http".to_string()],
            ..Default::default()
        };
        config
            .listen
            .insert("stats".to_string(), vec!["bind *:9000".to_string()]);
        config.frontend.insert(
            "web_1".to_string(),
            vec!["bind *:8080".to_string(), "default_backend web_1".to_string()],
        );
        config.backend.insert(
            "web_1".to_string(),
            vec!["server a 10.0.0.1:80 weight 10 check".to_string()],
        );

        let expected = "\
# Handled by synapse. Do not modify it.
global
  stats socket /var/run/haproxy.sock
  maxconn 4096

defaults
  mode http

listen stats
  bind *:9000

frontend web_1
  bind *:8080
  default_backend web_1

backend web_1
  server a 10.0.0.1:80 weight 10 check
";
        assert_eq!(config.render(), expected);
    }

    #[test]
    fn test_render_is_deterministic_across_insert_order() {
        let mut first = HaproxyConfig::default();
        first.backend.insert("b_2".to_string(), vec!["x".to_string()]);
        first.backend.insert("a_1".to_string(), vec!["y".to_string()]);

        let mut second = HaproxyConfig::default();
        second.backend.insert("a_1".to_string(), vec!["y".to_string()]);
        second.backend.insert("b_2".to_string(), vec!["x".to_string()]);

        assert_eq!(first.render(), second.render());
    }

    #[test]
    fn test_render_empty_sections() {
        let config = HaproxyConfig::default();
        let rendered = config.render();
        assert!(rendered.starts_with(CONFIG_BANNER));
        assert!(rendered.contains("global\n"));
        assert!(rendered.contains("defaults\n"));
        assert!(!rendered.contains("backend"));
    }
}
