//! Configuration for the pentulz tool engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Port and service tables used to rate open nmap ports.
///
/// Lookups run in order: `high_ports`, `medium_ports`, `high_services`,
/// `medium_services`; anything else is low.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NmapSeverityRules {
    #[serde(default = "default_high_ports")]
    pub high_ports: Vec<u16>,
    #[serde(default = "default_medium_ports")]
    pub medium_ports: Vec<u16>,
    #[serde(default = "default_high_services")]
    pub high_services: Vec<String>,
    #[serde(default = "default_medium_services")]
    pub medium_services: Vec<String>,
}

fn default_high_ports() -> Vec<u16> {
    vec![
        21, 22, 23, 25, 53, 80, 110, 143, 443, 993, 995, 1433, 1521, 3306, 3389, 5432, 5900,
        6379, 8080, 8443,
    ]
}

fn default_medium_ports() -> Vec<u16> {
    vec![
        135, 139, 445, 1433, 1521, 3306, 3389, 5432, 5900, 6379, 8080, 8443,
    ]
}

fn default_high_services() -> Vec<String> {
    [
        "ssh",
        "telnet",
        "ftp",
        "smtp",
        "http",
        "https",
        "mysql",
        "postgresql",
        "redis",
        "rdp",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_medium_services() -> Vec<String> {
    ["dns", "pop3", "imap", "ldap", "kerberos"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for NmapSeverityRules {
    fn default() -> Self {
        Self {
            high_ports: default_high_ports(),
            medium_ports: default_medium_ports(),
            high_services: default_high_services(),
            medium_services: default_medium_services(),
        }
    }
}

/// Severity classification tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityConfig {
    #[serde(default)]
    pub nmap: NmapSeverityRules,
}

/// Report generation defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_name")]
    pub default_name: String,
}

fn default_report_name() -> String {
    "Security Assessment Report".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_name: default_report_name(),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub severity: SeverityConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.report.default_name.trim().is_empty() {
            return Err(crate::Error::Config(
                "report.default_name must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Load configuration from default locations with cascade:
    /// 1. ./pentulz.toml (local override)
    /// 2. ~/.pentulz/config.toml (global defaults)
    /// 3. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(config) = Self::from_file("pentulz.toml") {
            return config;
        }

        if let Some(global_path) = Self::global_config_path()
            && let Ok(config) = Self::from_file(&global_path)
        {
            return config;
        }

        Self::default()
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pentulz").join("config.toml"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::parse("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.severity.nmap.high_ports.contains(&22));
        assert!(config.severity.nmap.medium_ports.contains(&445));
        assert_eq!(config.report.default_name, "Security Assessment Report");
    }

    #[test]
    fn test_partial_nmap_override() {
        let toml = r#"
[severity.nmap]
high_ports = [22, 2222]
"#;
        let config = EngineConfig::parse(toml).unwrap();
        assert_eq!(config.severity.nmap.high_ports, vec![22, 2222]);
        // untouched tables keep their defaults
        assert!(config.severity.nmap.medium_ports.contains(&139));
        assert!(config.severity.nmap.high_services.iter().any(|s| s == "ssh"));
    }

    #[test]
    fn test_report_section() {
        let toml = r#"
[report]
default_name = "Quarterly external test"
"#;
        let config = EngineConfig::parse(toml).unwrap();
        assert_eq!(config.report.default_name, "Quarterly external test");
    }

    #[test]
    fn test_blank_report_name_is_rejected() {
        let result = EngineConfig::parse("[report]\ndefault_name = \"  \"\n");
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result = EngineConfig::parse("[severity.nmap\nhigh_ports = 1");
        assert!(matches!(result, Err(crate::Error::Toml(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[severity.nmap]\nmedium_services = [\"snmp\"]").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.severity.nmap.medium_services, vec!["snmp".to_string()]);
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = EngineConfig::from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
