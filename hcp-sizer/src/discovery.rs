use std::path::Path;

use anyhow::{anyhow, Context, Result};
use k8s_openapi::api::core::v1::Node;
use kube::{
  api::{Api, ListParams, ResourceExt},
  config::{KubeConfigOptions, Kubeconfig},
  Client, Config,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{resource::NodeCapacity, utils};

/// Label selector matching control plane nodes
pub const CONTROL_PLANE_SELECTOR: &str = "node-role.kubernetes.io/control-plane=";

/// Max pods assumed when a node does not report an allocatable pod count
pub const DEFAULT_MAX_PODS: i64 = 250;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Allocatable resources reported by a single node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResources {
  pub name: String,

  /// Allocatable vCPUs
  pub cpu: f64,

  /// Allocatable memory in GiB
  pub memory_gib: f64,

  /// Allocatable pods, `None` when missing or not a whole number; negative counts are kept as reported
  pub max_pods: Option<i64>,
}

impl NodeResources {
  /// Read allocatable CPU, memory and pods from the node status
  pub fn from_node(node: &Node) -> Result<Self> {
    let name = node.name_any();
    let allocatable = node
      .status
      .as_ref()
      .and_then(|status| status.allocatable.as_ref())
      .ok_or_else(|| anyhow!("Node {name} does not report allocatable resources"))?;

    let cpu = match allocatable.get("cpu") {
      Some(q) => utils::parse_quantity(&q.0)?.milli_value() / 1000.0,
      None => return Err(anyhow!("Node {name} does not report allocatable cpu")),
    };
    let memory_gib = match allocatable.get("memory") {
      Some(q) => utils::parse_quantity(&q.0)?.value() / BYTES_PER_GIB,
      None => return Err(anyhow!("Node {name} does not report allocatable memory")),
    };
    let max_pods = allocatable
      .get("pods")
      .and_then(|q| utils::parse_quantity(&q.0).ok())
      .and_then(|q| q.as_int());

    Ok(Self {
      name,
      cpu,
      memory_gib,
      max_pods,
    })
  }

  /// Model input for this node, substituting [`DEFAULT_MAX_PODS`] for an unknown pod count
  pub fn capacity(&self) -> NodeCapacity {
    let max_pods = match self.max_pods {
      Some(pods) => pods,
      None => {
        warn!(
          "Node {} does not report a usable allocatable pod count, assuming {DEFAULT_MAX_PODS}",
          self.name
        );
        DEFAULT_MAX_PODS
      }
    };

    NodeCapacity {
      cpu_cores: self.cpu,
      memory_gib: self.memory_gib,
      max_pods: max_pods as f64,
    }
  }
}

/// Nodes found by discovery
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discovered {
  pub nodes: Vec<NodeResources>,
}

impl Discovered {
  pub fn from_nodes(nodes: &[Node]) -> Result<Self> {
    let nodes = nodes.iter().map(NodeResources::from_node).collect::<Result<Vec<_>>>()?;
    Ok(Self { nodes })
  }

  /// The node sized on behalf of all discovered nodes; the first one listed
  pub fn representative(&self) -> Result<&NodeResources> {
    self
      .nodes
      .first()
      .ok_or_else(|| anyhow!("No nodes matched the node selector"))
  }
}

/// Build a cluster client from an explicit kubeconfig and/or context, otherwise infer it
/// from `KUBECONFIG`, `~/.kube/config` or the in-cluster service account
pub async fn get_client(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Client> {
  let options = KubeConfigOptions {
    context: context.map(str::to_owned),
    ..Default::default()
  };

  let config = match (kubeconfig, context) {
    (Some(path), _) => {
      let kubeconfig =
        Kubeconfig::read_from(path).with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
      Config::from_custom_kubeconfig(kubeconfig, &options).await?
    }
    (None, Some(_)) => Config::from_kubeconfig(&options).await?,
    (None, None) => Config::infer().await.context("Failed to infer cluster configuration")?,
  };
  debug!("Cluster endpoint: {}", config.cluster_url);

  Client::try_from(config).context("Failed to create cluster client")
}

/// List nodes matching `selector` and read their allocatable resources
pub async fn discover(client: Client, selector: &str) -> Result<Discovered> {
  let nodes: Api<Node> = Api::all(client);
  let list = nodes
    .list(&ListParams::default().labels(selector))
    .await
    .with_context(|| format!("Failed to list nodes matching {selector:?}"))?;
  info!("Found {} nodes matching {selector:?}", list.items.len());

  let discovered = Discovered::from_nodes(&list.items)?;
  for node in &discovered.nodes {
    debug!(
      "{}: cpu={} memory={:.3}GiB pods={:?}",
      node.name, node.cpu, node.memory_gib, node.max_pods
    );
  }

  Ok(discovered)
}
