//! Stock alert monitor: configuration, the periodic monitoring loop, the
//! universe scan service and the snapshot sink.

pub mod cli;
pub mod config;
pub mod gen_config;
pub mod monitor;
pub mod scan;
pub mod snapshot;
