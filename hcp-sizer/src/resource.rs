use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SizingConstants;

/// Allocatable resources of a representative worker node
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCapacity {
  /// Allocatable vCPUs
  pub cpu_cores: f64,

  /// Allocatable memory in GiB
  pub memory_gib: f64,

  /// Maximum number of schedulable pods
  pub max_pods: f64,
}

/// Selects between request-based and load-based sizing
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSignal {
  /// Size by observed per-HCP usage under API load instead of static per-HCP requests
  pub use_load_based: bool,

  /// API server request rate (QPS); ignored unless `use_load_based` is set
  pub api_request_rate_qps: f64,
}

impl WorkloadSignal {
  pub fn request_based() -> Self {
    Self::default()
  }

  pub fn load_based(api_request_rate_qps: f64) -> Self {
    Self {
      use_load_based: true,
      api_request_rate_qps,
    }
  }
}

/// The resource dimension that limits the number of HCPs on a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingResource {
  Cpu,
  Memory,
  Pods,
}

impl fmt::Display for BindingResource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Cpu => write!(f, "CPU"),
      Self::Memory => write!(f, "Memory"),
      Self::Pods => write!(f, "Pods"),
    }
  }
}

/// Maximum HCPs per node as limited by each resource on its own
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintTerms {
  pub by_cpu: f64,
  pub by_cpu_usage: f64,
  pub by_memory: f64,
  pub by_memory_usage: f64,
  pub by_pods: f64,
}

impl ConstraintTerms {
  /// Computes the request-based and usage-based terms for a node
  ///
  /// Request-based sizing collapses the usage terms onto the request terms so the same
  /// minimum applies to both strategies.
  pub fn new(node: &NodeCapacity, workload: &WorkloadSignal, constants: &SizingConstants) -> Self {
    let by_cpu = (node.cpu_cores - constants.control_plane_cpu_reserve) / constants.cpu_per_hcp;
    let by_memory = (node.memory_gib - constants.control_plane_memory_reserve_gib) / constants.memory_per_hcp_gib;
    let by_pods = node.max_pods / constants.pods_per_hcp;

    let (by_cpu_usage, by_memory_usage) = if workload.use_load_based {
      let kqps = workload.api_request_rate_qps / 1000.0;
      (
        node.cpu_cores / (constants.idle_cpu_per_hcp + kqps * constants.incremental_cpu_per_1k_qps),
        node.memory_gib / (constants.idle_memory_per_hcp_gib + kqps * constants.incremental_memory_per_1k_qps_gib),
      )
    } else {
      (by_cpu, by_memory)
    };

    Self {
      by_cpu,
      by_cpu_usage,
      by_memory,
      by_memory_usage,
      by_pods,
    }
  }

  /// The most constrained term
  ///
  /// NaN terms (0/0) never win over a number and +inf (x/0) is never below a finite term.
  pub fn min(&self) -> f64 {
    self
      .by_cpu
      .min(self.by_cpu_usage)
      .min(self.by_memory)
      .min(self.by_memory_usage)
      .min(self.by_pods)
  }

  /// Attributes `min` to a resource, checking CPU, then memory, then pods
  ///
  /// Later matches overwrite earlier ones, so exact ties resolve to the last resource checked.
  pub fn binding_resource(&self, min: f64) -> BindingResource {
    let mut binding = BindingResource::Cpu;

    if self.by_cpu == min || self.by_cpu_usage == min {
      binding = BindingResource::Cpu;
    }
    if self.by_memory == min || self.by_memory_usage == min {
      binding = BindingResource::Memory;
    }
    if self.by_pods == min {
      binding = BindingResource::Pods;
    }

    binding
  }
}

/// Per-node HCP estimate
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HcpEstimate {
  /// Continuous estimate, not floored
  pub max_hcps_per_node: f64,
  pub binding_resource: BindingResource,
  pub terms: ConstraintTerms,
}

/// Estimates the maximum number of HCPs a node can host
///
/// The result is the minimum of the per-resource limits. It is negative when the control plane
/// reserve exceeds the node's capacity, which means the node cannot host any HCP.
pub fn estimate_max_hcps(node: &NodeCapacity, workload: &WorkloadSignal, constants: &SizingConstants) -> HcpEstimate {
  debug!("node: {node:?}");
  debug!("workload: {workload:?}");

  let terms = ConstraintTerms::new(node, workload, constants);
  let max_hcps_per_node = terms.min();
  let binding_resource = terms.binding_resource(max_hcps_per_node);
  debug!("terms: {terms:?}, minimum: {max_hcps_per_node} ({binding_resource})");

  HcpEstimate {
    max_hcps_per_node,
    binding_resource,
    terms,
  }
}

/// Estimates the etcd storage (GiB) needed for the planned number of pods
///
/// Linear fit: slope * pods + offset
pub fn estimate_etcd_storage(planned_pod_count: f64, constants: &SizingConstants) -> f64 {
  constants.etcd_storage_slope * planned_pod_count + constants.etcd_storage_offset
}

/// Total HCPs across `node_count` identical nodes
///
/// Each node hosts a whole number of HCPs, so the per-node estimate is floored before scaling.
pub fn scale_to_cluster(max_hcps_per_node: f64, node_count: f64) -> f64 {
  node_count * max_hcps_per_node.floor()
}

/// Everything a single sizing run needs
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizingInput {
  pub node: NodeCapacity,
  pub workload: WorkloadSignal,

  /// Pods planned across the hosted clusters, drives the etcd estimate
  pub planned_pod_count: f64,

  /// Number of worker nodes like `node`
  pub node_count: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizingResult {
  pub max_hcps_per_node: f64,
  pub binding_resource: BindingResource,
  pub etcd_storage_gib: f64,
  pub total_hcps_in_cluster: Option<f64>,
  pub terms: ConstraintTerms,
}

impl SizingResult {
  /// Whole HCPs that fit on one node
  pub fn whole_hcps_per_node(&self) -> f64 {
    self.max_hcps_per_node.floor()
  }

  /// The node does not have room for a single HCP
  pub fn is_undersized(&self) -> bool {
    self.max_hcps_per_node < 1.0
  }
}

pub fn size(input: &SizingInput, constants: &SizingConstants) -> SizingResult {
  let estimate = estimate_max_hcps(&input.node, &input.workload, constants);

  SizingResult {
    max_hcps_per_node: estimate.max_hcps_per_node,
    binding_resource: estimate.binding_resource,
    etcd_storage_gib: estimate_etcd_storage(input.planned_pod_count, constants),
    total_hcps_in_cluster: input
      .node_count
      .map(|count| scale_to_cluster(estimate.max_hcps_per_node, count)),
    terms: estimate.terms,
  }
}
