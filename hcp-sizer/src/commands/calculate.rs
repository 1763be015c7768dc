use std::{
  io::{self, BufRead, Write},
  path::PathBuf,
};

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  config::SizingConstants,
  discovery::{self, Discovered, CONTROL_PLANE_SELECTOR},
  output::{self, OutputFormat, Report, Source},
  prompt::Prompter,
  resource::{self, NodeCapacity, SizingInput, WorkloadSignal},
  utils,
};

const QPS_HINT: &str = "❗️Hint: Run the following query in an existing cluster to estimate your QPS:";
const QPS_QUERY: &str = r#"sum(rate(apiserver_request_total{namespace=~"clusters-$name*"}[2m])) by (namespace)"#;

/// Strategy used to estimate per-HCP resource consumption
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum SizingMethod {
  /// Static per-HCP resource requests
  RequestBased,
  /// Observed per-HCP usage under API load; requires the API request rate
  LoadBased,
}

impl SizingMethod {
  const LABELS: [&'static str; 2] = ["Request-Based", "Load-Based"];

  fn from_index(index: usize) -> Self {
    match index {
      1 => Self::LoadBased,
      _ => Self::RequestBased,
    }
  }
}

#[derive(Args, Debug, Default, Serialize, Deserialize)]
pub struct CalculateInput {
  /// Read worker node resources from the cluster instead of prompting for them
  #[arg(long, conflicts_with_all = ["cpus", "memory", "max_pods"])]
  pub discover: bool,

  /// Path to the kubeconfig used for discovery
  ///
  /// Defaults to `KUBECONFIG`, `~/.kube/config` or the in-cluster service account
  #[arg(long, requires = "discover")]
  pub kubeconfig: Option<PathBuf>,

  /// Kubeconfig context used for discovery
  #[arg(long, requires = "discover")]
  pub context: Option<String>,

  /// Label selector for the nodes read during discovery [default: node-role.kubernetes.io/control-plane=]
  #[arg(long, requires = "discover")]
  pub node_selector: Option<String>,

  /// Allocatable vCPUs on the worker node
  #[arg(long, allow_negative_numbers = true, value_parser = utils::parse_number)]
  pub cpus: Option<f64>,

  /// Allocatable memory (GiB) on the worker node
  #[arg(long, allow_negative_numbers = true, value_parser = utils::parse_number)]
  pub memory: Option<f64>,

  /// Maximum number of pods on the worker node (usually 250 or 500)
  #[arg(long, allow_negative_numbers = true, value_parser = utils::parse_number)]
  pub max_pods: Option<f64>,

  /// Number of pods planned across the hosted clusters, used for the etcd storage estimate
  #[arg(long, allow_negative_numbers = true, value_parser = utils::parse_number)]
  pub pod_count: Option<f64>,

  /// Number of worker nodes like the one being sized
  ///
  /// With `--discover` this defaults to the number of matching nodes
  #[arg(long, allow_negative_numbers = true, value_parser = utils::parse_number)]
  pub node_count: Option<f64>,

  /// Calculation method
  #[arg(long, value_enum)]
  pub method: Option<SizingMethod>,

  /// API server request rate (QPS) for the load-based method
  #[arg(long, allow_negative_numbers = true, value_parser = utils::parse_number)]
  pub api_rate: Option<f64>,

  /// YAML file overriding the sizing constants
  #[arg(long, env = "HCP_SIZER_CONSTANTS")]
  pub constants: Option<PathBuf>,

  /// Reserve 8 vCPU and 2.5 GiB on each node for the hosting platform's control plane
  #[arg(long)]
  pub with_control_plane_reserve: bool,
}

impl CalculateInput {
  pub fn sizing_constants(&self) -> Result<SizingConstants> {
    let constants = SizingConstants::load(self.constants.as_deref())?;

    Ok(match self.with_control_plane_reserve {
      true => constants.with_control_plane_reserve(),
      false => constants,
    })
  }

  /// Fill in every value not given as a flag by prompting for it
  pub fn gather<R: BufRead, W: Write>(
    &self,
    prompter: &mut Prompter<R, W>,
    discovered: Option<&Discovered>,
  ) -> Result<SizingInput> {
    let node = match discovered {
      Some(discovered) => discovered.representative()?.capacity(),
      None => NodeCapacity {
        cpu_cores: value_or_prompt(self.cpus, prompter, "Enter the number of vCPUs on the worker node")?,
        memory_gib: value_or_prompt(self.memory, prompter, "Enter the memory (in GiB) on the worker node")?,
        max_pods: value_or_prompt(
          self.max_pods,
          prompter,
          "Enter the maximum number of pods on the worker node (usually 250 or 500)",
        )?,
      },
    };

    let planned_pod_count = value_or_prompt(
      self.pod_count,
      prompter,
      "Enter the number of pods you plan to run on your cluster (for etcd storage calculation)",
    )?;

    let node_count = match (self.node_count, discovered) {
      (Some(count), _) => count,
      (None, Some(discovered)) => discovered.nodes.len() as f64,
      (None, None) => prompter.number("Enter the number of worker nodes")?,
    };

    let method = match self.method {
      Some(method) => method,
      None => SizingMethod::from_index(prompter.select("Select Calculation Method", &SizingMethod::LABELS)?),
    };

    let workload = match method {
      SizingMethod::RequestBased => WorkloadSignal::request_based(),
      SizingMethod::LoadBased => {
        let api_rate = match self.api_rate {
          Some(rate) => rate,
          None => {
            prompter.hint(QPS_HINT)?;
            prompter.hint(QPS_QUERY)?;
            prompter.number("Enter the estimated API rate (QPS)")?
          }
        };
        WorkloadSignal::load_based(api_rate)
      }
    };

    Ok(SizingInput {
      node,
      workload,
      planned_pod_count,
      node_count: Some(node_count),
    })
  }

  /// Collect the inputs, run the sizing model and assemble the report
  pub async fn calculate(&self) -> Result<Report> {
    let constants = self.sizing_constants()?;

    let discovered = match self.discover {
      true => {
        let client = discovery::get_client(self.kubeconfig.as_deref(), self.context.as_deref()).await?;
        let selector = self.node_selector.as_deref().unwrap_or(CONTROL_PLANE_SELECTOR);
        Some(discovery::discover(client, selector).await?)
      }
      false => None,
    };

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stderr());
    let input = self.gather(&mut prompter, discovered.as_ref())?;

    let source = match &discovered {
      Some(discovered) => {
        let node = discovered.representative()?;
        info!("Sizing with node {} as representative", node.name);
        Source::Discovered {
          node: node.name.clone(),
          matched: discovered.nodes.len(),
        }
      }
      None => Source::Manual,
    };

    debug!("input: {input:?}");
    let result = resource::size(&input, &constants);
    debug!("result: {result:?}");

    Ok(Report {
      source,
      input,
      constants,
      result,
    })
  }

  pub async fn result(&self, format: OutputFormat) -> Result<()> {
    let report = self.calculate().await?;

    let stdout = io::stdout();
    output::render(&report, format, &mut stdout.lock())
  }
}

fn value_or_prompt<R: BufRead, W: Write>(
  value: Option<f64>,
  prompter: &mut Prompter<R, W>,
  label: &str,
) -> Result<f64> {
  match value {
    Some(value) => Ok(value),
    None => prompter.number(label),
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;
  use crate::discovery::NodeResources;

  fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
    colored::control::set_override(false);
    Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
  }

  #[test]
  fn it_uses_flags_without_prompting() {
    let input = CalculateInput {
      cpus: Some(64.0),
      memory: Some(256.0),
      max_pods: Some(500.0),
      pod_count: Some(1000.0),
      node_count: Some(3.0),
      method: Some(SizingMethod::LoadBased),
      api_rate: Some(2000.0),
      ..Default::default()
    };

    let sizing = input.gather(&mut prompter(""), None).unwrap();
    assert_eq!(sizing.node.cpu_cores, 64.0);
    assert_eq!(sizing.node.memory_gib, 256.0);
    assert_eq!(sizing.node.max_pods, 500.0);
    assert_eq!(sizing.planned_pod_count, 1000.0);
    assert_eq!(sizing.node_count, Some(3.0));
    assert_eq!(sizing.workload, WorkloadSignal::load_based(2000.0));
  }

  #[test]
  fn it_prompts_in_order() {
    let input = CalculateInput::default();
    let mut prompter = prompter("64\n256\n500\n1000\n3\n2\nabc\n2000\n");

    let sizing = input.gather(&mut prompter, None).unwrap();
    assert_eq!(
      sizing.node,
      NodeCapacity {
        cpu_cores: 64.0,
        memory_gib: 256.0,
        max_pods: 500.0,
      }
    );
    assert_eq!(sizing.planned_pod_count, 1000.0);
    assert_eq!(sizing.node_count, Some(3.0));
    assert_eq!(sizing.workload, WorkloadSignal::load_based(2000.0));
  }

  #[test]
  fn it_skips_api_rate_for_request_based() {
    let input = CalculateInput {
      cpus: Some(16.0),
      memory: Some(64.0),
      max_pods: Some(250.0),
      ..Default::default()
    };
    let mut prompter = prompter("100\n1\n1\n");

    let sizing = input.gather(&mut prompter, None).unwrap();
    assert_eq!(sizing.workload, WorkloadSignal::request_based());
    assert_eq!(sizing.node_count, Some(1.0));

    let output = String::from_utf8(prompter.into_writer()).unwrap();
    assert!(!output.contains("apiserver_request_total"));
  }

  #[test]
  fn it_uses_discovered_node() {
    let discovered = Discovered {
      nodes: vec![
        NodeResources {
          name: "master-0".to_owned(),
          cpu: 32.0,
          memory_gib: 128.0,
          max_pods: None,
        },
        NodeResources {
          name: "master-1".to_owned(),
          cpu: 64.0,
          memory_gib: 256.0,
          max_pods: Some(500),
        },
      ],
    };
    let input = CalculateInput {
      discover: true,
      pod_count: Some(0.0),
      method: Some(SizingMethod::RequestBased),
      ..Default::default()
    };

    let sizing = input.gather(&mut prompter(""), Some(&discovered)).unwrap();
    assert_eq!(
      sizing.node,
      NodeCapacity {
        cpu_cores: 32.0,
        memory_gib: 128.0,
        max_pods: 250.0,
      }
    );
    assert_eq!(sizing.node_count, Some(2.0));
  }

  #[test]
  fn it_fails_on_empty_discovery() {
    let input = CalculateInput {
      discover: true,
      ..Default::default()
    };
    let discovered = Discovered { nodes: vec![] };

    assert!(input.gather(&mut prompter(""), Some(&discovered)).is_err());
  }

  #[test]
  fn it_applies_control_plane_reserve() {
    let input = CalculateInput {
      with_control_plane_reserve: true,
      ..Default::default()
    };

    let constants = input.sizing_constants().unwrap();
    assert_eq!(constants.control_plane_cpu_reserve, 8.0);
    assert_eq!(constants.control_plane_memory_reserve_gib, 2.5);
  }
}
