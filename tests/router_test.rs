use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use synapse_haproxy::router::report::{DiscoveredHost, Service, ServiceReport};
use synapse_haproxy::router::{HaproxyRouter, Router};
use synapse_haproxy::settings::{HaproxySettings, ServiceSettings};

fn svc_service() -> Arc<Service> {
    Service::from_settings(&ServiceSettings {
        name: "svc".to_string(),
        id: 1,
        path: "/services/svc".to_string(),
        server_options_template: None,
        router_options: None,
    })
}

fn settings_without_socket(dir: &TempDir) -> HaproxySettings {
    let marker = dir.path().join("reloads");
    HaproxySettings {
        config_path: dir.path().join("haproxy.cfg").display().to_string(),
        reload_command: vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("echo reload >> {}", marker.display()),
        ],
        defaults: vec!["mode http".to_string()],
        ..Default::default()
    }
}

fn member(name: &str, host: &str, weight: Option<u32>) -> DiscoveredHost {
    let payload = match weight {
        Some(w) => format!(
            r#"{{"host":"{}","port":80,"weight":{},"available":true}}"#,
            host, w
        ),
        None => format!(r#"{{"host":"{}","port":80,"available":true}}"#, host),
    };
    DiscoveredHost::decode(payload.as_bytes(), name).unwrap()
}

fn report(service: &Arc<Service>, members: Vec<DiscoveredHost>) -> ServiceReport {
    ServiceReport {
        service: service.clone(),
        reports: members,
    }
}

fn reload_count(dir: &TempDir) -> usize {
    std::fs::read_to_string(dir.path().join("reloads"))
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

fn read_config(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_cold_start_reloads_with_two_servers() {
    let dir = TempDir::new().unwrap();
    let settings = settings_without_socket(&dir);
    let service = svc_service();
    let mut router = HaproxyRouter::new(&settings, &[service.clone()]).unwrap();

    router
        .update(report(
            &service,
            vec![member("a", "10.0.0.1", Some(10)), member("b", "10.0.0.2", Some(5))],
        ))
        .await
        .unwrap();

    assert_eq!(reload_count(&dir), 1);

    let config = read_config(Path::new(&settings.config_path));
    assert!(config.starts_with("# Handled by synapse. Do not modify it.\n"));
    assert!(config.contains("\nfrontend svc_1\n  default_backend svc_1\n"));
    assert!(config.contains("\nbackend svc_1\n"));
    assert!(config.contains("  server a 10.0.0.1:80 weight 10  \n"));
    assert!(config.contains("  server b 10.0.0.2:80 weight 5  \n"));
}

#[tokio::test]
async fn test_removed_member_survives_as_draining() {
    let dir = TempDir::new().unwrap();
    let settings = settings_without_socket(&dir);
    let service = svc_service();
    let mut router = HaproxyRouter::new(&settings, &[service.clone()]).unwrap();

    router
        .update(report(
            &service,
            vec![member("a", "10.0.0.1", Some(10)), member("b", "10.0.0.2", Some(5))],
        ))
        .await
        .unwrap();
    router
        .update(report(&service, vec![member("a", "10.0.0.1", Some(10))]))
        .await
        .unwrap();

    assert_eq!(reload_count(&dir), 2);

    // 사라진 b는 조용히 지워지지 않고 maint 표식과 함께 남아야 한다
    let config = read_config(Path::new(&settings.config_path));
    assert!(config.contains("  server a 10.0.0.1:80 weight 10  \n"));
    assert!(config.contains("  server b 10.0.0.2:80 weight 5   disabled #isDisabled\n"));
}

#[tokio::test]
async fn test_added_member_forces_reload() {
    let dir = TempDir::new().unwrap();
    let settings = settings_without_socket(&dir);
    let service = svc_service();
    let mut router = HaproxyRouter::new(&settings, &[service.clone()]).unwrap();

    router
        .update(report(
            &service,
            vec![member("a", "10.0.0.1", Some(10)), member("b", "10.0.0.2", Some(5))],
        ))
        .await
        .unwrap();
    router
        .update(report(
            &service,
            vec![
                member("a", "10.0.0.1", Some(10)),
                member("b", "10.0.0.2", Some(5)),
                member("c", "10.0.0.3", None),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(reload_count(&dir), 2);

    // 새 멤버 c는 weight 지시어 없이 들어간다
    let config = read_config(Path::new(&settings.config_path));
    assert!(config.contains("  server c 10.0.0.3:80   \n"));
}

#[tokio::test]
async fn test_frontend_and_backend_updated_together() {
    let dir = TempDir::new().unwrap();
    let settings = settings_without_socket(&dir);
    let service = svc_service();
    let mut router = HaproxyRouter::new(&settings, &[service.clone()]).unwrap();

    router
        .update(report(&service, vec![member("a", "10.0.0.1", Some(10))]))
        .await
        .unwrap();

    let config = read_config(Path::new(&settings.config_path));
    let has_frontend = config.contains("frontend svc_1");
    let has_backend = config.contains("backend svc_1");
    assert_eq!(has_frontend, has_backend);
    assert!(has_frontend);
}

#[tokio::test]
async fn test_empty_report_drains_backend_members() {
    let dir = TempDir::new().unwrap();
    let settings = settings_without_socket(&dir);
    let service = svc_service();
    let mut router = HaproxyRouter::new(&settings, &[service.clone()]).unwrap();

    router
        .update(report(&service, vec![member("a", "10.0.0.1", Some(10))]))
        .await
        .unwrap();
    router.update(report(&service, Vec::new())).await.unwrap();

    assert_eq!(reload_count(&dir), 2);
    let config = read_config(Path::new(&settings.config_path));
    assert!(config.contains("  server a 10.0.0.1:80 weight 10   disabled #isDisabled\n"));
}

#[tokio::test]
async fn test_template_no_value_aborts_service_projection() {
    let dir = TempDir::new().unwrap();
    let settings = settings_without_socket(&dir);
    let service = Service::from_settings(&ServiceSettings {
        name: "svc".to_string(),
        id: 1,
        path: "/services/svc".to_string(),
        server_options_template: Some("check <no value>".to_string()),
        router_options: None,
    });
    let mut router = HaproxyRouter::new(&settings, &[service.clone()]).unwrap();

    let result = router
        .update(report(&service, vec![member("a", "10.0.0.1", Some(10))]))
        .await;
    assert!(result.is_err());

    // 반영이 중단됐으므로 설정 파일도 쓰이지 않아야 한다
    assert_eq!(reload_count(&dir), 0);
    assert!(!Path::new(&settings.config_path).exists());
}

#[tokio::test]
async fn test_deterministic_render_across_batching() {
    let dir_one = TempDir::new().unwrap();
    let dir_two = TempDir::new().unwrap();
    let service = svc_service();

    // 같은 스냅샷 수열을 다르게 묶어 흘려도 최종 파일은 같아야 한다
    let settings_one = settings_without_socket(&dir_one);
    let mut router_one = HaproxyRouter::new(&settings_one, &[service.clone()]).unwrap();
    router_one
        .update(report(&service, vec![member("a", "10.0.0.1", Some(10))]))
        .await
        .unwrap();
    router_one
        .update(report(
            &service,
            vec![member("a", "10.0.0.1", Some(10)), member("b", "10.0.0.2", Some(5))],
        ))
        .await
        .unwrap();

    let settings_two = settings_without_socket(&dir_two);
    let mut router_two = HaproxyRouter::new(&settings_two, &[service.clone()]).unwrap();
    router_two
        .update(report(
            &service,
            vec![member("a", "10.0.0.1", Some(10)), member("b", "10.0.0.2", Some(5))],
        ))
        .await
        .unwrap();

    assert_eq!(
        read_config(Path::new(&settings_one.config_path)),
        read_config(Path::new(&settings_two.config_path))
    );
}
