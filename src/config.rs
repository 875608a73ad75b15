use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tracing::warn;

const DEFAULT_DATA_PATH: &str = "data/state.json";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_path = lookup("APP_DATA_PATH")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        let port = match lookup("PORT") {
            Some(value) => value.parse::<u16>().unwrap_or_else(|_| {
                warn!("invalid PORT '{value}', using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let host = match lookup("HOST") {
            Some(value) => value.parse::<IpAddr>().unwrap_or_else(|_| {
                warn!("invalid HOST '{value}', binding all interfaces");
                IpAddr::V4(Ipv4Addr::UNSPECIFIED)
            }),
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        Self {
            data_path,
            host,
            port,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.data_path, PathBuf::from("data/state.json"));
        assert_eq!(config.addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let config = config_from(&[
            ("APP_DATA_PATH", "/tmp/hub.json"),
            ("PORT", "9191"),
            ("HOST", "127.0.0.1"),
        ]);
        assert_eq!(config.data_path, PathBuf::from("/tmp/hub.json"));
        assert_eq!(config.addr().to_string(), "127.0.0.1:9191");

        let config = config_from(&[("PORT", "eighty"), ("HOST", "localhost")]);
        assert_eq!(config.addr().to_string(), "0.0.0.0:8080");
    }
}
