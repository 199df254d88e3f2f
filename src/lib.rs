pub mod broker;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod reporter;
pub mod ui;
