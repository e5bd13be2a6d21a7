//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use shadowfolio::allocate::MAX_GROUP_SIZE;
use shadowfolio::{AllocatorSettings, Rebalance, SelectionRule, TierRatios};

use crate::error::{Error, Result};

/// Top-level configuration. Every section may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub weighting: WeightingConfig,
    pub allocation: AllocationConfig,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeightingConfig {
    pub max_tier1_ratio: f64,
    pub tier1_to_tier2_ratio: f64,
    pub tier2_to_tier3_ratio: f64,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        let ratios = TierRatios::default();
        Self {
            max_tier1_ratio: ratios.max_tier1_ratio,
            tier1_to_tier2_ratio: ratios.tier1_to_tier2_ratio,
            tier2_to_tier3_ratio: ratios.tier2_to_tier3_ratio,
        }
    }
}

/// Which allocator variant a `plan` run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    GroupWeighted,
    #[default]
    Direct,
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "group-weighted" => Ok(Method::GroupWeighted),
            "direct" => Ok(Method::Direct),
            other => Err(format!(
                "unknown method '{other}' (expected group-weighted or direct)"
            )),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::GroupWeighted => write!(f, "group-weighted"),
            Method::Direct => write!(f, "direct"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub method: Method,
    pub selection: SelectionRule,
    pub max_group_size: usize,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        let settings = AllocatorSettings::default();
        Self {
            method: Method::default(),
            selection: settings.rule,
            max_group_size: settings.max_group_size,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub max_orders_per_run: usize,
    pub orders_file: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_orders_per_run: 50,
            orders_file: "orders.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "./logs".into(),
            audit_file: "audit.jsonl".into(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        self.ratios()
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        if self.allocation.max_group_size == 0 || self.allocation.max_group_size > MAX_GROUP_SIZE {
            return Err(Error::Config(format!(
                "max_group_size must be in [1, {MAX_GROUP_SIZE}]"
            )));
        }
        if self.execution.max_orders_per_run == 0 {
            return Err(Error::Config("max_orders_per_run must be > 0".into()));
        }
        if self.execution.orders_file.is_empty() {
            return Err(Error::Config("orders_file must not be empty".into()));
        }
        if self.logging.audit_file.is_empty() {
            return Err(Error::Config("audit_file must not be empty".into()));
        }
        Ok(())
    }

    pub fn ratios(&self) -> TierRatios {
        TierRatios {
            max_tier1_ratio: self.weighting.max_tier1_ratio,
            tier1_to_tier2_ratio: self.weighting.tier1_to_tier2_ratio,
            tier2_to_tier3_ratio: self.weighting.tier2_to_tier3_ratio,
        }
    }

    /// Pipeline settings assembled from the weighting and allocation sections.
    pub fn rebalance(&self) -> Rebalance {
        Rebalance {
            ratios: self.ratios(),
            allocator: AllocatorSettings {
                rule: self.allocation.selection,
                max_group_size: self.allocation.max_group_size,
            },
        }
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
