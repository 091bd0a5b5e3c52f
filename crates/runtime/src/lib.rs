#![doc = include_str!("../../../README.md")]

pub mod application;
pub mod data_center;
pub mod entity;
pub mod error;
pub mod experiment;
pub mod metrics;
pub mod network_link;
pub mod parser;
pub mod placement;
pub mod placement_strategies;
pub mod placement_strategy;
pub mod provider;
pub mod region;
pub mod run_result;
pub mod search;
pub mod service;
pub mod user;
pub mod world;

pub use error::{Error, Result};
pub use world::World;
