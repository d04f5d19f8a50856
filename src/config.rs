use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::StepGraphConfig;
use crate::policy::FormulaTags;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VerifierConfig {
    /// 每条路由最多探索的不同步数.
    #[serde(default = "default_state_limit")]
    pub state_limit: Option<usize>,
    /// 每条路由最多枚举的路径数.
    #[serde(default = "default_path_limit")]
    pub path_limit: Option<usize>,
    #[serde(default = "default_logging_tag")]
    pub logging_tag: String,
    #[serde(default = "default_notification_tag")]
    pub notification_tag: String,
    /// Also reject N_TIMES_USAGE rules whose bound is exceeded by
    /// concurrently executing reads.
    #[serde(default = "default_check_parallel_reads")]
    pub check_parallel_reads: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            state_limit: default_state_limit(),
            path_limit: default_path_limit(),
            logging_tag: default_logging_tag(),
            notification_tag: default_notification_tag(),
            check_parallel_reads: default_check_parallel_reads(),
        }
    }
}

impl VerifierConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: VerifierConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn step_graph(&self) -> StepGraphConfig {
        StepGraphConfig {
            state_limit: self.state_limit,
        }
    }

    pub fn formula_tags(&self) -> FormulaTags {
        FormulaTags {
            logging: self.logging_tag.clone(),
            notification: self.notification_tag.clone(),
        }
    }
}

fn default_state_limit() -> Option<usize> {
    Some(10_000)
}

fn default_path_limit() -> Option<usize> {
    Some(100_000)
}

fn default_logging_tag() -> String {
    "logging".to_string()
}

fn default_notification_tag() -> String {
    "notification".to_string()
}

fn default_check_parallel_reads() -> bool {
    true
}
