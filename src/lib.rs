//! RocketBlend - package manager for Blender builds and addons
//!
//! Projects pin a Blender build and a set of addons by reference in
//! `.rocketblend/profile.json`. References are resolved against package
//! descriptors hosted in git registries, and the resources they name are
//! downloaded into a shared installation cache.
//!
//! The library is organised bottom-up:
//! - [`reference`], [`platform`], [`package`] and [`profile`] are the data model
//! - [`task`] runs batches of blocking work under a cancellation token
//! - [`filelock`] guards a single installation directory across processes
//! - [`registry`] clones registries and reads package descriptors
//! - [`installation`] downloads and extracts package sources
//! - [`driver`] sequences load, tidy, install, resolve and save over profiles
//! - [`services`] wires those together from a [`config::Config`]

pub mod cli;
pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod filelock;
pub mod git;
pub mod installation;
pub mod logging;
pub mod package;
pub mod platform;
pub mod profile;
pub mod reference;
pub mod registry;
pub mod services;
pub mod task;

#[cfg(test)]
mod test_fixtures;
