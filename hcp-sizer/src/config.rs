use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// vCPU reserved for the hosting platform's own control plane when it is modeled
pub const CONTROL_PLANE_CPU_RESERVE: f64 = 8.0;

/// Memory (GiB) reserved for the hosting platform's own control plane when it is modeled
pub const CONTROL_PLANE_MEMORY_RESERVE_GIB: f64 = 2.5;

/// Calibrated constants used by the sizing model
///
/// The defaults come from performance and scale regression fitting of hosted control planes
/// and are subject to change as more data is collected:
/// https://access.redhat.com/documentation/en-us/red_hat_advanced_cluster_management_for_kubernetes/2.9/html/clusters/cluster_mce_overview#hosted-sizing-guidance
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizingConstants {
  /// vCPU reserved for the platform control plane on each worker node
  pub control_plane_cpu_reserve: f64,

  /// Memory (GiB) reserved for the platform control plane on each worker node
  pub control_plane_memory_reserve_gib: f64,

  /// vCPU requested per HCP
  pub cpu_per_hcp: f64,

  /// Memory (GiB) requested per HCP
  pub memory_per_hcp_gib: f64,

  /// Pods per HCP
  pub pods_per_hcp: f64,

  /// vCPU used by an HCP with no API load
  pub idle_cpu_per_hcp: f64,

  /// Memory (GiB) used by an HCP with no API load
  pub idle_memory_per_hcp_gib: f64,

  /// Additional vCPU used per 1000 QPS of API traffic
  pub incremental_cpu_per_1k_qps: f64,

  /// Additional memory (GiB) used per 1000 QPS of API traffic
  pub incremental_memory_per_1k_qps_gib: f64,

  /// etcd storage (GiB) per planned pod
  pub etcd_storage_slope: f64,

  /// Baseline etcd storage (GiB)
  pub etcd_storage_offset: f64,
}

impl Default for SizingConstants {
  fn default() -> Self {
    Self {
      control_plane_cpu_reserve: 0.0,
      control_plane_memory_reserve_gib: 0.0,
      cpu_per_hcp: 5.0,
      memory_per_hcp_gib: 18.0,
      pods_per_hcp: 75.0,
      idle_cpu_per_hcp: 2.9,
      idle_memory_per_hcp_gib: 11.1,
      incremental_cpu_per_1k_qps: 9.0,
      incremental_memory_per_1k_qps_gib: 2.5,
      etcd_storage_slope: 6.66e-4,
      etcd_storage_offset: 0.103,
    }
  }
}

impl SizingConstants {
  /// Read constants from a YAML file
  ///
  /// Keys missing from the file keep their default values
  pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open constants file {}", path.display()))?;
    let reader = BufReader::new(file);
    let constants: SizingConstants = serde_yaml::from_reader(reader)
      .with_context(|| format!("Failed to parse constants file {}", path.display()))?;

    debug!("Loaded sizing constants from {}: {constants:?}", path.display());
    Ok(constants)
  }

  /// Load constants from the optional file, falling back to the defaults
  pub fn load(path: Option<&Path>) -> Result<Self> {
    match path {
      Some(path) => Self::read(path),
      None => Ok(Self::default()),
    }
  }

  /// Reserve CPU and memory on each node for the hosting platform's own control plane
  pub fn with_control_plane_reserve(self) -> Self {
    Self {
      control_plane_cpu_reserve: CONTROL_PLANE_CPU_RESERVE,
      control_plane_memory_reserve_gib: CONTROL_PLANE_MEMORY_RESERVE_GIB,
      ..self
    }
  }
}
