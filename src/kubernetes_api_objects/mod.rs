// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod document;
pub mod error;
pub mod kind_registry;
pub mod label_selector;
pub mod object_key;
