use crate::config::schema::{self, OutputConfig, PollerConfig};
use crate::error::{Error, Result};
use crate::output::{console::ConsoleOutput, json::JsonOutput, OutputHandler};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use validator::Validate;

/// Prefix for environment overrides, e.g. `POLLER_API_URL`.
pub const ENV_PREFIX: &str = "POLLER";

#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    api_url: Option<String>,
    status_path: Option<String>,
    timeout_ms: Option<u64>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<PollerConfig> {
        let path = path.as_ref();
        let mut visited = HashSet::new();
        let config = Self::load_with_inheritance(path, &mut visited)?;
        Self::finish(config)
    }

    /// Built-in defaults plus environment overrides, for runs without a file.
    pub fn defaults() -> Result<PollerConfig> {
        Self::finish(PollerConfig::default())
    }

    fn finish(config: PollerConfig) -> Result<PollerConfig> {
        let env = ::config::Config::builder()
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        let config = Self::apply_overrides(config, env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(mut config: PollerConfig, source: ::config::Config) -> Result<PollerConfig> {
        let overrides: EnvOverrides = source.try_deserialize()?;

        if let Some(api_url) = overrides.api_url {
            log::debug!("api_url overridden from environment: {}", api_url);
            config.api_url = api_url;
        }
        if let Some(status_path) = overrides.status_path {
            config.status_path = status_path;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        Ok(config)
    }

    fn load_with_inheritance(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<PollerConfig> {
        let path = fs::canonicalize(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        if visited.contains(&path) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }
        visited.insert(path.clone());

        let config = Self::load_file(&path)?;

        let final_config = if let Some(parent_path_str) = &config.extends {
            let parent_path = path
                .parent()
                .ok_or_else(|| {
                    Error::Config(format!(
                        "Cannot determine parent directory for {}",
                        path.display()
                    ))
                })?
                .join(parent_path_str);

            let parent_config = Self::load_with_inheritance(&parent_path, visited)?;
            Self::merge_configs(parent_config, config)
        } else {
            config
        };

        Ok(final_config)
    }

    fn load_file(path: &Path) -> Result<PollerConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    /// Child values win wherever they differ from the built-in defaults.
    /// Flags win whenever the child sets them at all.
    fn merge_configs(mut parent: PollerConfig, child: PollerConfig) -> PollerConfig {
        if child.name != schema::default_name() {
            parent.name = child.name;
        }
        if child.api_url != schema::default_api_url() {
            parent.api_url = child.api_url;
        }
        if child.status_path != schema::default_status_path() {
            parent.status_path = child.status_path;
        }
        if child.timeout_ms != schema::default_timeout() {
            parent.timeout_ms = child.timeout_ms;
        }
        if child.user_agent != schema::default_user_agent() {
            parent.user_agent = child.user_agent;
        }
        parent.live_view = child.live_view.or(parent.live_view);
        parent.prefetch = child.prefetch.or(parent.prefetch);
        if child.output.is_some() {
            parent.output = child.output;
        }

        parent.extends = None;
        parent
    }

    pub fn create_output(
        config: &PollerConfig,
        multi: Option<Arc<indicatif::MultiProgress>>,
    ) -> Result<Box<dyn OutputHandler>> {
        let handler: Box<dyn OutputHandler> = match &config.output {
            Some(OutputConfig::Json { path }) => Box::new(JsonOutput::new(PathBuf::from(path))?),
            Some(OutputConfig::Console) | None => Box::new(ConsoleOutput::new(multi)),
        };
        Ok(handler)
    }
}
