//! Host address resolution
//!
//! A host address comes from the configuration when it holds a valid IP.
//! Otherwise it is read from the first line of a file whose path is held in
//! an environment variable (WSL writes its current address there at boot),
//! and the resolved value is written back into the configuration so later
//! lookups and saves see it.

use crate::config::AppConfig;
use crate::error::{Result, SeatError};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Socket addresses for every endpoint of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointAddresses {
    pub display: SocketAddr,
    pub renderer: SocketAddr,
    /// `source1`, `source2`, `source3`
    pub samplers: [SocketAddr; 3],
}

/// Resolve one host address, persisting a fallback result into `ipaddress`.
///
/// `lookup` reads an environment variable; tests pass a closure instead of
/// touching the process environment.
pub fn resolve_address<F>(
    label: &str,
    ipaddress: &mut String,
    ip_env_variable: Option<&str>,
    lookup: F,
) -> Result<IpAddr>
where
    F: Fn(&str) -> Option<String>,
{
    if let Ok(ip) = ipaddress.trim().parse::<IpAddr>() {
        tracing::debug!(label, %ip, "Using configured address");
        return Ok(ip);
    }

    let variable = ip_env_variable.ok_or_else(|| {
        SeatError::Configuration(format!(
            "{} address '{}' is not a valid IP and no fallback variable is set",
            label, ipaddress
        ))
    })?;
    let file = lookup(variable).ok_or_else(|| {
        SeatError::Configuration(format!(
            "{} address not configured and ${} is not set",
            label, variable
        ))
    })?;

    tracing::info!(label, file = %file, "Reading address from file");
    let ip = read_address_file(Path::new(&file))?;

    *ipaddress = ip.to_string();
    tracing::info!(label, %ip, variable, "Resolved address from environment");
    Ok(ip)
}

fn read_address_file(path: &Path) -> Result<IpAddr> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        SeatError::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    let first = contents.lines().next().unwrap_or("").trim();
    first.parse().map_err(|_| {
        SeatError::Configuration(format!(
            "invalid address '{}' in {}",
            first,
            path.display()
        ))
    })
}

/// Resolve every endpoint from the process environment
pub fn resolve_endpoints(config: &mut AppConfig) -> Result<EndpointAddresses> {
    resolve_endpoints_with(config, |name| std::env::var(name).ok())
}

/// Resolve every endpoint using `lookup` for environment variables
pub fn resolve_endpoints_with<F>(config: &mut AppConfig, lookup: F) -> Result<EndpointAddresses>
where
    F: Fn(&str) -> Option<String>,
{
    let display_ip = resolve_address("display", &mut config.display.ipaddress, None, &lookup)?;

    let renderer = &mut config.renderer;
    let renderer_ip = resolve_address(
        "renderer",
        &mut renderer.ipaddress,
        renderer.ip_env_variable.as_deref(),
        &lookup,
    )?;

    let sampler = &mut config.sampler;
    let sampler_ip = resolve_address(
        "sampler",
        &mut sampler.ipaddress,
        sampler.ip_env_variable.as_deref(),
        &lookup,
    )?;

    Ok(EndpointAddresses {
        display: SocketAddr::new(display_ip, config.display.oscport),
        renderer: SocketAddr::new(renderer_ip, config.renderer.oscport),
        samplers: config
            .sampler
            .source_ports
            .map(|port| SocketAddr::new(sampler_ip, port)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_configured_address_wins() {
        let mut ip = "192.168.1.20".to_string();
        let resolved = resolve_address("renderer", &mut ip, Some("UNUSED"), no_env).unwrap();
        assert_eq!(resolved, "192.168.1.20".parse::<IpAddr>().unwrap());
        assert_eq!(ip, "192.168.1.20");
    }

    #[test]
    fn test_fallback_reads_first_line_and_persists() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  172.28.0.5  ").unwrap();
        writeln!(file, "ignored").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let mut ip = String::new();
        let resolved = resolve_address("renderer", &mut ip, Some("TASCAR_IP_FILE"), |name| {
            assert_eq!(name, "TASCAR_IP_FILE");
            Some(path.clone())
        })
        .unwrap();

        assert_eq!(resolved, "172.28.0.5".parse::<IpAddr>().unwrap());
        assert_eq!(ip, "172.28.0.5");
    }

    #[test]
    fn test_missing_variable_is_configuration_error() {
        let mut ip = "not-an-ip".to_string();
        let err = resolve_address("sampler", &mut ip, Some("TASCAR_IP_FILE"), no_env).unwrap_err();
        assert!(matches!(err, SeatError::Configuration(_)));
        assert_eq!(ip, "not-an-ip");
    }

    #[test]
    fn test_invalid_address_in_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "localhost").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let mut ip = String::new();
        let result = resolve_address("renderer", &mut ip, Some("X"), |_| Some(path.clone()));
        assert!(result.is_err());
        assert!(ip.is_empty());
    }

    #[test]
    fn test_no_fallback_variable() {
        let mut ip = String::new();
        assert!(resolve_address("display", &mut ip, None, no_env).is_err());
    }

    #[test]
    fn test_resolve_endpoints_shares_sampler_host() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10.1.2.3").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let mut config = AppConfig::default();
        config.renderer.ipaddress = "127.0.0.1".to_string();

        let addrs = resolve_endpoints_with(&mut config, |_| Some(path.clone())).unwrap();
        assert_eq!(addrs.display, "127.0.0.1:7000".parse().unwrap());
        assert_eq!(addrs.renderer, "127.0.0.1:9877".parse().unwrap());
        assert_eq!(addrs.samplers[0], "10.1.2.3:9001".parse().unwrap());
        assert_eq!(addrs.samplers[2], "10.1.2.3:9003".parse().unwrap());
        assert_eq!(config.sampler.ipaddress, "10.1.2.3");
    }
}
