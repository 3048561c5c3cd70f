use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

// =============================================================================
// defaults
// =============================================================================

#[test]
fn empty_environment_uses_defaults() {
    let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config.port, 3001);
    assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    assert_eq!(config.channel_capacity, 256);
    assert!(config.client_origin.is_none());
    assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3001");
}

#[test]
fn blank_values_count_as_unset() {
    let config = ServerConfig::from_lookup(lookup(&[("PORT", "  "), ("CLIENT_URL", "")])).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert!(config.client_origin.is_none());
}

// =============================================================================
// overrides
// =============================================================================

#[test]
fn values_are_parsed() {
    let config = ServerConfig::from_lookup(lookup(&[
        ("PORT", "8080"),
        ("BIND_ADDR", "127.0.0.1"),
        ("CLIENT_URL", "http://localhost:5173/"),
        ("RELAY_CHANNEL_CAPACITY", "16"),
    ]))
    .unwrap();
    assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
    assert_eq!(config.channel_capacity, 16);
    assert_eq!(config.client_origin.unwrap(), "http://localhost:5173");
}

// =============================================================================
// errors
// =============================================================================

#[test]
fn invalid_port_is_an_error() {
    let err = ServerConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    assert_eq!(err.to_string(), "invalid PORT: \"http\"");
}

#[test]
fn out_of_range_port_is_an_error() {
    let err = ServerConfig::from_lookup(lookup(&[("PORT", "70000")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
}

#[test]
fn invalid_bind_addr_is_an_error() {
    let err = ServerConfig::from_lookup(lookup(&[("BIND_ADDR", "localhost")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "BIND_ADDR", .. }));
}

#[test]
fn zero_channel_capacity_is_an_error() {
    let err = ServerConfig::from_lookup(lookup(&[("RELAY_CHANNEL_CAPACITY", "0")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "RELAY_CHANNEL_CAPACITY", .. }));
}

#[test]
fn client_url_with_control_chars_is_an_error() {
    let err = ServerConfig::from_lookup(lookup(&[("CLIENT_URL", "http://a\nb")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "CLIENT_URL", .. }));
}
