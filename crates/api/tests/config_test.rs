use pretty_assertions::assert_eq;
use rallybot_api::config::HealthConfig;
use rstest::rstest;

fn load(host: Option<&str>, port: Option<&str>) -> eyre::Result<HealthConfig> {
    HealthConfig::from_lookup(|key| match key {
        "HEALTH_HOST" => host.map(str::to_string),
        "HEALTH_PORT" => port.map(str::to_string),
        _ => None,
    })
}

#[test]
fn test_disabled_without_port() {
    let config = load(None, None).unwrap();

    assert_eq!(config.port, None);
    assert_eq!(config.server_addr(), None);
}

#[rstest]
#[case(None, "8080", "0.0.0.0:8080")]
#[case(Some("127.0.0.1"), "9000", "127.0.0.1:9000")]
#[case(Some(""), " 80 ", "0.0.0.0:80")]
fn test_server_addr(#[case] host: Option<&str>, #[case] port: &str, #[case] expected: &str) {
    let config = load(host, Some(port)).unwrap();
    assert_eq!(config.server_addr().as_deref(), Some(expected));
}

#[test]
fn test_empty_port_disables() {
    assert_eq!(load(None, Some("")).unwrap().port, None);
}

#[rstest]
#[case("http")]
#[case("70000")]
fn test_invalid_port(#[case] port: &str) {
    assert!(load(None, Some(port)).is_err());
}
