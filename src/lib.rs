// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod config;
pub mod crds;
pub mod error;
pub mod kubernetes_api_objects;
pub mod metrics;
pub mod processor;
pub mod reconciler;
pub mod shim_layer;
