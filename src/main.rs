// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use anyhow::Result;
use kube::CustomResourceExt;
use std::env;
use tenant_resources_controller::config::ControllerConfig;
use tenant_resources_controller::crds::{GlobalTenantResource, TenantResource};
use tenant_resources_controller::shim_layer::controller_runtime;
use tracing::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or_default();
    if cmd == "export" {
        info!("exporting custom resource definitions");
        println!("{}", serde_yaml::to_string(&GlobalTenantResource::crd())?);
        println!("---");
        println!("{}", serde_yaml::to_string(&TenantResource::crd())?);
    } else if cmd == "run" {
        info!("running tenant-resources-controller");
        let config = ControllerConfig::load()?;
        controller_runtime::run(config).await?;
    } else {
        warn!("wrong command; please use \"export\" or \"run\"");
    }
    Ok(())
}
