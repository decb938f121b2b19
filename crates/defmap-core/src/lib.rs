pub mod config;
pub mod consts;
pub mod detection;
pub mod error;
pub mod filters;
pub mod flow;
pub mod frame;
pub mod io;
pub mod metric;
pub mod pipeline;
pub mod sampling;
pub mod stack;
pub mod stats;
