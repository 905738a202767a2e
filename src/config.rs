// YAML config file, CLI merge, and host spec parsing

use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

use crate::models::HostId;

/// One host entry as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct HostEntry {
    pub host: String,
    #[serde(default)]
    pub dozzle: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}

impl AppConfig {
    /// Load the first config file found among the candidate paths. Absence
    /// of a file is not an error; a file that fails to parse is.
    pub fn load() -> anyhow::Result<(Self, Option<PathBuf>)> {
        for path in Self::candidate_paths() {
            if path.exists() {
                let s = std::fs::read_to_string(&path)?;
                let config = Self::load_from_str(&s)
                    .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
                return Ok((config, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("config.yaml"),
            PathBuf::from("config.yml"),
            PathBuf::from(".dtop.yaml"),
            PathBuf::from(".dtop.yml"),
        ];
        if let Some(home) = dirs::home_dir() {
            let config_dir = home.join(".config").join("dtop");
            paths.push(config_dir.join("config.yaml"));
            paths.push(config_dir.join("config.yml"));
            paths.push(home.join(".dtop.yaml"));
            paths.push(home.join(".dtop.yml"));
        }
        paths
    }

    fn validate(&self) -> anyhow::Result<()> {
        for entry in &self.hosts {
            anyhow::ensure!(!entry.host.is_empty(), "hosts[].host must be non-empty");
            HostSpec::parse(&entry.host, entry.dozzle.clone())?;
        }
        Ok(())
    }
}

/// How to reach one engine endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Local,
    Tcp,
    Ssh,
}

/// A validated host spec plus its per-host settings.
#[derive(Debug, Clone)]
pub struct HostSpec {
    pub raw: String,
    pub kind: HostKind,
    pub dozzle: Option<String>,
    host_id: HostId,
}

impl HostSpec {
    pub fn parse(spec: &str, dozzle: Option<String>) -> anyhow::Result<Self> {
        let (kind, host_id) = if spec == "local" {
            (HostKind::Local, "local".to_string())
        } else if spec.starts_with("tcp://") {
            let url = Url::parse(spec)?;
            let host = url
                .host_str()
                .ok_or_else(|| anyhow::anyhow!("tcp host spec '{}' has no host", spec))?;
            // The raw authority, port included
            let id = match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            (HostKind::Tcp, id)
        } else if spec.starts_with("ssh://") {
            let url = Url::parse(spec)?;
            let host = url
                .host_str()
                .ok_or_else(|| anyhow::anyhow!("ssh host spec '{}' has no host", spec))?;
            // Port stripped, user kept
            let id = if url.username().is_empty() {
                host.to_string()
            } else {
                format!("{}@{}", url.username(), host)
            };
            (HostKind::Ssh, id)
        } else {
            anyhow::bail!(
                "unsupported host spec '{}': use 'local', 'tcp://host[:port]', or 'ssh://[user@]host[:port]'",
                spec
            );
        };
        Ok(Self {
            raw: spec.to_string(),
            kind,
            dozzle,
            host_id,
        })
    }

    /// Short stable identifier shown in the HOST column: "local" for the
    /// local socket, "user@box" for SSH, the raw authority for TCP.
    pub fn host_id(&self) -> HostId {
        self.host_id.clone()
    }
}

/// Resolve the final host list: explicit `--host` flags win outright,
/// otherwise config hosts, otherwise a single local endpoint.
pub fn resolve_hosts(config: AppConfig, cli_hosts: &[String]) -> anyhow::Result<Vec<HostSpec>> {
    let mut specs = Vec::new();
    if !cli_hosts.is_empty() {
        for spec in cli_hosts {
            specs.push(HostSpec::parse(spec, None)?);
        }
    } else if !config.hosts.is_empty() {
        for entry in config.hosts {
            specs.push(HostSpec::parse(&entry.host, entry.dozzle)?);
        }
    } else {
        specs.push(HostSpec::parse("local", None)?);
    }
    Ok(specs)
}
