use std::io::Write;

use assert_cmd::Command;
use rstest::*;
use tempfile::NamedTempFile;

fn hcp_sizer() -> Command {
  let mut cmd = Command::cargo_bin("hcp-sizer").unwrap();
  cmd.env_remove("HCP_SIZER_CONSTANTS").arg("--no-color");
  cmd
}

fn stdout(cmd: &mut Command) -> String {
  let output = cmd.assert().success().get_output().stdout.clone();
  String::from_utf8(output).unwrap()
}

#[test]
fn it_sizes_request_based_from_flags() {
  let mut cmd = hcp_sizer();
  cmd.args([
    "--cpus",
    "64",
    "--memory",
    "256",
    "--max-pods",
    "500",
    "--pod-count",
    "1000",
    "--node-count",
    "3",
    "--method",
    "request-based",
    "--with-control-plane-reserve",
  ]);

  let out = stdout(&mut cmd);
  assert!(out.contains("Maximum HCPs per node: 6.00\n"), "{out}");
  assert!(out.contains("Binding resource: Pods\n"), "{out}");
  assert!(out.contains("Maximum HCPs in cluster (3 nodes): 18.00\n"), "{out}");
  assert!(out.contains("Estimated HCP etcd storage requirement: 0.769 GiB\n"), "{out}");
}

#[rstest]
// 64/20.9 vCPU usage term binds
#[case("64", "256", "500", "2000", "3.00", "CPU")]
// request-based memory term 256/18 stays below the usage terms
#[case("512", "256", "2000", "100", "14.00", "Memory")]
// idle load, pods bind at 250/75
#[case("64", "256", "250", "0", "3.00", "Pods")]
fn it_sizes_load_based_from_flags(
  #[case] cpus: &str,
  #[case] memory: &str,
  #[case] max_pods: &str,
  #[case] api_rate: &str,
  #[case] expected_hcps: &str,
  #[case] expected_binding: &str,
) {
  let mut cmd = hcp_sizer();
  cmd.args([
    "--cpus",
    cpus,
    "--memory",
    memory,
    "--max-pods",
    max_pods,
    "--pod-count",
    "0",
    "--node-count",
    "1",
    "--method",
    "load-based",
    "--api-rate",
    api_rate,
  ]);

  let out = stdout(&mut cmd);
  assert!(out.contains(&format!("Maximum HCPs per node: {expected_hcps}\n")), "{out}");
  assert!(out.contains(&format!("Binding resource: {expected_binding}\n")), "{out}");
}

#[test]
fn it_prompts_for_missing_values() {
  let mut cmd = hcp_sizer();
  cmd
    .args(["--cpus", "64", "--memory", "256", "--max-pods", "500", "--node-count", "2"])
    .write_stdin("many\n1000\n2\n2000\n");

  let assert = cmd.assert().success();
  let output = assert.get_output();
  let out = String::from_utf8(output.stdout.clone()).unwrap();
  let err = String::from_utf8(output.stderr.clone()).unwrap();

  assert!(err.contains("Invalid number"), "{err}");
  assert!(err.contains("apiserver_request_total"), "{err}");
  assert!(out.contains("Calculation method: Load-Based (2000 QPS)"), "{out}");
  assert!(out.contains("Binding resource: CPU\n"), "{out}");
  assert!(out.contains("Maximum HCPs in cluster (2 nodes): 6.00\n"), "{out}");
  assert!(!out.contains("apiserver_request_total"), "{out}");
}

#[test]
fn it_fails_when_input_closes() {
  let mut cmd = hcp_sizer();
  cmd.args(["--cpus", "64"]).write_stdin("");

  cmd.assert().failure();
}

#[test]
fn it_renders_json() {
  let mut cmd = hcp_sizer();
  cmd.args([
    "--cpus",
    "64",
    "--memory",
    "256",
    "--max-pods",
    "500",
    "--pod-count",
    "1000",
    "--node-count",
    "3",
    "--method",
    "request-based",
    "--output",
    "json",
  ]);

  let out = stdout(&mut cmd);
  let report: serde_json::Value = serde_json::from_str(&out).unwrap();
  assert_eq!(report["source"]["type"], "manual");
  assert_eq!(report["result"]["bindingResource"], "pods");
  assert_eq!(report["result"]["totalHcpsInCluster"], 18.0);
  assert_eq!(report["input"]["workload"]["useLoadBased"], false);
  assert_eq!(report["constants"]["controlPlaneCpuReserve"], 0.0);
  assert_eq!(report["result"]["terms"]["byPods"], 500.0 / 75.0);
  assert!(report["result"].get("binding_resource").is_none(), "{out}");
}

#[test]
fn it_reads_constants_file() {
  let mut file = NamedTempFile::new().unwrap();
  writeln!(file, "podsPerHcp: 50").unwrap();

  let mut cmd = hcp_sizer();
  cmd.arg("--constants").arg(file.path()).args([
    "--cpus",
    "64",
    "--memory",
    "256",
    "--max-pods",
    "500",
    "--pod-count",
    "0",
    "--node-count",
    "1",
    "--method",
    "request-based",
  ]);

  // 500/50 pods = 10, cpu 64/5 = 12.8
  let out = stdout(&mut cmd);
  assert!(out.contains("Maximum HCPs per node: 10.00\n"), "{out}");
  assert!(out.contains("Binding resource: Pods\n"), "{out}");
}

#[test]
fn it_surfaces_undersized_nodes() {
  let mut cmd = hcp_sizer();
  cmd.args([
    "--cpus",
    "4",
    "--memory",
    "2",
    "--max-pods",
    "250",
    "--pod-count",
    "0",
    "--node-count",
    "1",
    "--method",
    "request-based",
    "--with-control-plane-reserve",
  ]);

  let out = stdout(&mut cmd);
  assert!(out.contains("Worker node cannot host a single HCP"), "{out}");
  assert!(out.contains("Maximum HCPs per node: -1.00\n"), "{out}");
}

#[rstest]
#[case(&["--cpus", "four"])]
#[case(&["--discover", "--memory", "64"])]
#[case(&["--method", "maybe"])]
#[case(&["--node-selector", "node-role.kubernetes.io/worker=", "--cpus", "64"])]
fn it_rejects_invalid_flags(#[case] args: &[&str]) {
  let mut cmd = hcp_sizer();
  cmd.args(args);

  cmd.assert().failure().code(2);
}

#[test]
fn it_shows_help() {
  let mut cmd = hcp_sizer();
  cmd.arg("--help");

  let out = stdout(&mut cmd);
  assert!(out.contains("--discover"), "{out}");
  assert!(out.contains("--api-rate"), "{out}");
}
