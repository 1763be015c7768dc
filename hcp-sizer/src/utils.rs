use anyhow::{anyhow, bail, Context, Result};
use regex_lite::Regex;

/// Parse a plain number as entered on the command line or at a prompt
///
/// Any float syntax is accepted, including negative values and infinities; `NaN` is not a number
pub fn parse_number(input: &str) -> Result<f64> {
  match input.trim().parse::<f64>() {
    Ok(value) if !value.is_nan() => Ok(value),
    _ => Err(anyhow!("invalid number: {input:?}")),
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Multiplier {
  /// Power of ten
  Decimal(i32),
  /// Power of 1024
  Binary(u32),
}

/// A Kubernetes resource quantity split into its decimal digits and suffix multiplier
///
/// The number is held exactly as `mantissa * 10^-scale`, so `2.007` is 2007 thousandths and not the
/// nearest float.
///
/// https://kubernetes.io/docs/reference/kubernetes-api/common-definitions/quantity/
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParsedQuantity {
  mantissa: i128,
  scale: u32,
  multiplier: Multiplier,
}

impl ParsedQuantity {
  /// The quantity times `10^decimal_shift` as an exact `numerator / denominator`
  ///
  /// `None` when either side does not fit in an `i128`
  fn ratio(&self, decimal_shift: i32) -> Option<(i128, i128)> {
    let (factor, exp10) = match self.multiplier {
      Multiplier::Decimal(exp) => (1, exp.saturating_add(decimal_shift).saturating_sub(self.scale as i32)),
      Multiplier::Binary(exp) => (1024i128.checked_pow(exp)?, decimal_shift - self.scale as i32),
    };
    let numerator = self.mantissa.checked_mul(factor)?;

    match exp10 >= 0 {
      true => Some((numerator.checked_mul(10i128.checked_pow(exp10.unsigned_abs())?)?, 1)),
      false => Some((numerator, 10i128.checked_pow(exp10.unsigned_abs())?)),
    }
  }

  /// Float fallback for quantities too large or too small for `ratio`
  fn approximate(&self, decimal_shift: i32) -> f64 {
    let number = self.mantissa as f64 / 10f64.powi(self.scale as i32);
    match self.multiplier {
      Multiplier::Decimal(exp) => number * 10f64.powi(exp.saturating_add(decimal_shift)),
      Multiplier::Binary(exp) => number * 1024f64.powi(exp as i32) * 10f64.powi(decimal_shift),
    }
  }

  /// The quantity in base units (cores, bytes, pods)
  pub fn value(&self) -> f64 {
    match self.ratio(0) {
      Some((numerator, denominator)) => numerator as f64 / denominator as f64,
      None => self.approximate(0),
    }
  }

  /// The quantity in thousandths of a base unit, rounded up when there is a remainder
  pub fn milli_value(&self) -> f64 {
    match self.ratio(3) {
      Some((numerator, denominator)) => {
        let quotient = numerator.div_euclid(denominator);
        match numerator.rem_euclid(denominator) {
          0 => quotient as f64,
          _ => (quotient + 1) as f64,
        }
      }
      None => self.approximate(3).ceil(),
    }
  }

  /// The quantity as a whole number, or `None` when it has a fractional part or exceeds `i64`
  pub fn as_int(&self) -> Option<i64> {
    let (numerator, denominator) = self.ratio(0)?;
    match numerator % denominator {
      0 => i64::try_from(numerator / denominator).ok(),
      _ => None,
    }
  }
}

/// Parse a Kubernetes resource quantity such as `3920m`, `16308196Ki`, `1.5G` or `12e3`
pub fn parse_quantity(quantity: &str) -> Result<ParsedQuantity> {
  let re = Regex::new(r"^([+-]?)(\d*)(?:\.(\d*))?(Ki|Mi|Gi|Ti|Pi|Ei|[eE][+-]?\d+|n|u|m|k|M|G|T|P|E)?$")?;
  let caps = match re.captures(quantity.trim()) {
    Some(caps) => caps,
    None => bail!("Unable to parse quantity {quantity:?}"),
  };

  let whole = caps.get(2).map_or("", |m| m.as_str());
  let fraction = caps.get(3).map_or("", |m| m.as_str());
  if whole.is_empty() && fraction.is_empty() {
    bail!("Unable to parse quantity {quantity:?}");
  }

  let digits = format!("{whole}{fraction}");
  let magnitude = digits
    .parse::<i128>()
    .with_context(|| format!("Unable to parse quantity {quantity:?}"))?;
  let mantissa = match caps.get(1).map(|m| m.as_str()) {
    Some("-") => -magnitude,
    _ => magnitude,
  };
  let scale = u32::try_from(fraction.len())?;

  let multiplier = match caps.get(4).map(|m| m.as_str()) {
    None => Multiplier::Decimal(0),
    Some("Ki") => Multiplier::Binary(1),
    Some("Mi") => Multiplier::Binary(2),
    Some("Gi") => Multiplier::Binary(3),
    Some("Ti") => Multiplier::Binary(4),
    Some("Pi") => Multiplier::Binary(5),
    Some("Ei") => Multiplier::Binary(6),
    Some("n") => Multiplier::Decimal(-9),
    Some("u") => Multiplier::Decimal(-6),
    Some("m") => Multiplier::Decimal(-3),
    Some("k") => Multiplier::Decimal(3),
    Some("M") => Multiplier::Decimal(6),
    Some("G") => Multiplier::Decimal(9),
    Some("T") => Multiplier::Decimal(12),
    Some("P") => Multiplier::Decimal(15),
    Some("E") => Multiplier::Decimal(18),
    Some(exponent) => Multiplier::Decimal(exponent[1..].parse::<i32>()?),
  };

  Ok(ParsedQuantity {
    mantissa,
    scale,
    multiplier,
  })
}
