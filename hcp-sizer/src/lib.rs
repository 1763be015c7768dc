pub mod cli;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod output;
pub mod prompt;
pub mod resource;
pub mod utils;

pub use cli::Cli;
pub use config::SizingConstants;
pub use resource::{
  estimate_etcd_storage, estimate_max_hcps, scale_to_cluster, size, BindingResource, NodeCapacity, SizingInput,
  SizingResult, WorkloadSignal,
};
