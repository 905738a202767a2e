// Host-spec grammar, identity derivation, and config/CLI precedence

use dtop::config::{AppConfig, HostKind, HostSpec, resolve_hosts};

#[test]
fn host_id_is_local_for_the_local_socket() {
    let spec = HostSpec::parse("local", None).unwrap();
    assert_eq!(spec.kind, HostKind::Local);
    assert_eq!(spec.host_id(), "local");
}

#[test]
fn host_id_strips_ssh_port_but_keeps_user() {
    let spec = HostSpec::parse("ssh://deploy@box.example.com:2222", None).unwrap();
    assert_eq!(spec.kind, HostKind::Ssh);
    assert_eq!(spec.host_id(), "deploy@box.example.com");

    let spec = HostSpec::parse("ssh://box.example.com", None).unwrap();
    assert_eq!(spec.host_id(), "box.example.com");
}

#[test]
fn host_id_keeps_tcp_authority_verbatim() {
    let spec = HostSpec::parse("tcp://h:2375", None).unwrap();
    assert_eq!(spec.kind, HostKind::Tcp);
    assert_eq!(spec.host_id(), "h:2375");

    let spec = HostSpec::parse("tcp://h", None).unwrap();
    assert_eq!(spec.host_id(), "h");
}

#[test]
fn unsupported_scheme_names_the_accepted_forms() {
    let err = HostSpec::parse("ftp://nope", None).unwrap_err().to_string();
    assert!(err.contains("ftp://nope"));
    assert!(err.contains("local"));
    assert!(err.contains("tcp://"));
    assert!(err.contains("ssh://"));
}

#[test]
fn specs_that_collapse_to_one_host_id_are_both_accepted() {
    // Two distinct ssh specs may share an identity once the port is
    // stripped; both stay configured
    let a = HostSpec::parse("ssh://deploy@box:22", None).unwrap();
    let b = HostSpec::parse("ssh://deploy@box:2222", None).unwrap();
    assert_eq!(a.host_id(), b.host_id());
    assert_ne!(a.raw, b.raw);
}

#[test]
fn cli_hosts_override_config_entirely() {
    let config = AppConfig::load_from_str(
        "hosts:\n  - host: ssh://a@one\n  - host: ssh://a@two\n",
    )
    .unwrap();
    let specs = resolve_hosts(config, &["tcp://three:2375".to_string()]).unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].raw, "tcp://three:2375");
    assert_eq!(specs[0].dozzle, None, "CLI hosts carry no dozzle URL");
}

#[test]
fn config_hosts_used_when_cli_absent() {
    let config = AppConfig::load_from_str(
        "hosts:\n  - host: ssh://a@one\n    dozzle: https://logs.example.com\n",
    )
    .unwrap();
    let specs = resolve_hosts(config, &[]).unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].raw, "ssh://a@one");
    assert_eq!(
        specs[0].dozzle.as_deref(),
        Some("https://logs.example.com"),
        "per-host settings survive the merge"
    );
}

#[test]
fn defaults_to_local_when_nothing_configured() {
    let specs = resolve_hosts(AppConfig::default(), &[]).unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].kind, HostKind::Local);
    assert_eq!(specs[0].host_id(), "local");
}

#[test]
fn bad_cli_spec_fails_resolution() {
    let err = resolve_hosts(AppConfig::default(), &["unix:///var/run".to_string()]);
    assert!(err.is_err());
}
