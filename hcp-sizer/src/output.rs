use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::{
  config::SizingConstants,
  resource::{SizingInput, SizingResult},
};

/// Output format for results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize)]
pub enum OutputFormat {
  /// Human readable summary and table
  #[default]
  Text,
  /// Pretty printed JSON
  Json,
}

/// Where the node capacity came from
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Source {
  Manual,
  Discovered {
    /// Representative node
    node: String,
    /// Number of nodes matching the selector
    matched: usize,
  },
}

/// Inputs and results of one sizing run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
  pub source: Source,
  pub input: SizingInput,
  pub constants: SizingConstants,
  pub result: SizingResult,
}

#[derive(Tabled)]
struct TermRow {
  #[tabled(rename = "Resource")]
  resource: &'static str,
  #[tabled(rename = "Request-based")]
  request_based: String,
  #[tabled(rename = "Usage-based")]
  usage_based: String,
}

fn term_rows(result: &SizingResult) -> Vec<TermRow> {
  let terms = &result.terms;
  vec![
    TermRow {
      resource: "CPU",
      request_based: format!("{:.3}", terms.by_cpu),
      usage_based: format!("{:.3}", terms.by_cpu_usage),
    },
    TermRow {
      resource: "Memory",
      request_based: format!("{:.3}", terms.by_memory),
      usage_based: format!("{:.3}", terms.by_memory_usage),
    },
    TermRow {
      resource: "Pods",
      request_based: format!("{:.3}", terms.by_pods),
      usage_based: "-".to_owned(),
    },
  ]
}

pub fn render<W: Write>(report: &Report, format: OutputFormat, writer: &mut W) -> Result<()> {
  match format {
    OutputFormat::Text => render_text(report, writer),
    OutputFormat::Json => {
      writeln!(writer, "{}", serde_json::to_string_pretty(report)?)?;
      Ok(())
    }
  }
}

fn render_text<W: Write>(report: &Report, writer: &mut W) -> Result<()> {
  let input = &report.input;
  let result = &report.result;

  let node = format!(
    "{:.2} vCPU, {:.2} GiB memory, {} max pods",
    input.node.cpu_cores, input.node.memory_gib, input.node.max_pods
  );
  match &report.source {
    Source::Manual => writeln!(writer, "Worker node: {node}")?,
    Source::Discovered { node: name, matched } => {
      writeln!(writer, "Worker node {name} (1 of {matched} discovered): {node}")?
    }
  }

  match input.workload.use_load_based {
    true => writeln!(
      writer,
      "Calculation method: Load-Based ({} QPS)",
      input.workload.api_request_rate_qps
    )?,
    false => writeln!(writer, "Calculation method: Request-Based")?,
  }

  let table = Table::new(term_rows(result)).with(Style::rounded()).to_string();
  writeln!(writer, "{table}")?;

  if result.is_undersized() {
    writeln!(
      writer,
      "{} Worker node cannot host a single HCP: {} allows {:.3} HCPs",
      "⚠".yellow().bold(),
      result.binding_resource,
      result.max_hcps_per_node
    )?;
  }

  let lines = [
    format!("Maximum HCPs per node: {:.2}", result.whole_hcps_per_node()),
    format!("Binding resource: {}", result.binding_resource),
  ];
  for line in lines {
    writeln!(writer, "{}", line.yellow().italic())?;
  }

  if let (Some(total), Some(nodes)) = (result.total_hcps_in_cluster, input.node_count) {
    let line = format!("Maximum HCPs in cluster ({nodes} nodes): {total:.2}");
    writeln!(writer, "{}", line.yellow().italic())?;
  }

  let line = format!("Estimated HCP etcd storage requirement: {:.3} GiB", result.etcd_storage_gib);
  writeln!(writer, "{}", line.yellow().italic())?;

  Ok(())
}
