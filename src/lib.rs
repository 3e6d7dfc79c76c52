// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod cli;
pub mod config;
pub mod constants;
pub mod deploy;
pub mod error;
pub mod health;
pub mod helm;
pub mod kubernetes;
pub mod poll;
pub mod process;
pub mod values;

#[cfg(test)]
pub mod test_utils;
