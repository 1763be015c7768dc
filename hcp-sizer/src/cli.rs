use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};

use crate::{commands, output::OutputFormat};

/// Styles for CLI
fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .literal(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightCyan))),
    )
    .usage(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
}

/// Estimate how many hosted control planes (HCPs) a worker node and cluster can host
///
/// Values not given as flags are prompted for. With `--discover` the worker node resources are
/// read from the first node matching the node selector.
#[derive(Debug, Parser)]
#[command(name = "hcp-sizer", author, version)]
#[command(styles=get_styles())]
pub struct Cli {
  #[command(flatten)]
  pub calculate: commands::calculate::CalculateInput,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  pub output: OutputFormat,

  /// Disable colored output
  #[arg(long)]
  pub no_color: bool,

  #[clap(flatten)]
  pub verbose: Verbosity<WarnLevel>,
}
