//! Graph descriptions and schedule reports for cadence.
//!
//! This crate adapts TOML files to the `cadence-core` graph builder and turns
//! a compiled schedule back into a named, serializable report.
//!
//! # Features
//!
//! - **Descriptions**: Load and save [`GraphConfig`] TOML files (nodes,
//!   ports, element types, edges, compile options)
//! - **Reports**: [`ScheduleReport`] lists repetitions, order, capacities and
//!   memory by name, as JSON or TOML
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_config::{GraphConfig, ScheduleReport};
//!
//! let config = GraphConfig::load("pipeline.toml").unwrap();
//! let (_graph, compiled) = config.compile().unwrap();
//! let report = ScheduleReport::new(&config.name, &compiled);
//! println!("{}", report.to_json().unwrap());
//! ```

mod description;
mod error;
mod report;

pub use description::{
    EdgeConfig, GraphConfig, ModeConfig, NodeConfig, PortConfig, port_name,
};
pub use error::ConfigError;
pub use report::{EdgeReport, NodeReport, ScheduleReport};
