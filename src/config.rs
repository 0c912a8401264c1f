// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "TENANT_RESOURCES_CONFIG";

// ControllerConfig is read once at startup and shared read-only with every reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    pub tenant_default_service_account: Option<String>,
    pub global_default_service_account: Option<String>,
    pub global_default_service_account_namespace: Option<String>,
    #[serde(with = "humantime_serde")]
    pub default_resync_period: Duration,
    #[serde(with = "humantime_serde")]
    pub error_requeue: Duration,
    pub concurrency: u16,
    pub field_manager_prefix: String,
    pub reporter: String,
    pub allow_cross_namespace_selection: bool,
}

impl Default for ControllerConfig {
    fn default() -> ControllerConfig {
        ControllerConfig {
            tenant_default_service_account: None,
            global_default_service_account: None,
            global_default_service_account_namespace: None,
            default_resync_period: Duration::from_secs(60),
            error_requeue: Duration::from_secs(10),
            concurrency: 4,
            field_manager_prefix: "capsule".to_string(),
            reporter: "tenant-resources-controller".to_string(),
            allow_cross_namespace_selection: false,
        }
    }
}

impl ControllerConfig {
    pub fn from_yaml(content: &str) -> Result<ControllerConfig> {
        serde_yaml::from_str(content).context("malformed controller configuration")
    }

    pub fn from_file(path: &Path) -> Result<ControllerConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading controller configuration {}", path.display()))?;
        ControllerConfig::from_yaml(&content)
    }

    // Loads the file named by TENANT_RESOURCES_CONFIG, or the defaults when it is unset.
    pub fn load() -> Result<ControllerConfig> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => ControllerConfig::from_file(Path::new(&path)),
            None => Ok(ControllerConfig::default()),
        }
    }
}
