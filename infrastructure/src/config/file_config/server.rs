//! Server configuration from TOML (`[server]` section)

use jury_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// ```toml
/// [server]
/// bind = "127.0.0.1:8080"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    pub bind: String,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl FileServerConfig {
    pub fn parse_bind(&self) -> (SocketAddr, Vec<ConfigIssue>) {
        match self.bind.parse::<SocketAddr>() {
            Ok(addr) => (addr, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::Unparseable {
                        field: "server.bind".to_string(),
                        value: self.bind.clone(),
                    },
                    format!(
                        "server.bind: '{}' is not a socket address, falling back to '{DEFAULT_BIND}'",
                        self.bind
                    ),
                );
                (SocketAddr::from(([127, 0, 0, 1], 8080)), vec![issue])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind() {
        let (addr, issues) = FileServerConfig::default().parse_bind();
        assert_eq!(addr.port(), 8080);
        assert!(issues.is_empty());

        let bad = FileServerConfig {
            bind: "localhost".to_string(),
        };
        let (addr, issues) = bad.parse_bind();
        assert_eq!(addr.to_string(), DEFAULT_BIND);
        assert_eq!(issues.len(), 1);
    }
}
