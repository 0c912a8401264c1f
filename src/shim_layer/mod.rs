// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod api;
pub mod controller_runtime;
pub mod kube_api;
