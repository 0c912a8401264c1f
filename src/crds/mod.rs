// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod global_tenant_resource;
pub mod resource_spec;
pub mod status;
pub mod tenant;
pub mod tenant_resource;

pub use global_tenant_resource::*;
pub use resource_spec::*;
pub use status::*;
pub use tenant::*;
pub use tenant_resource::*;

pub const GROUP: &str = "capsule.clastix.io";
pub const VERSION: &str = "v1beta2";
pub const API_VERSION: &str = "capsule.clastix.io/v1beta2";
