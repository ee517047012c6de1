use anyhow::{Context, Result};

use crate::indicators::registry::Registry;
use crate::report;

pub fn run() -> Result<()> {
    // Surface configuration faults here rather than at the first refresh
    let catalog = Registry::catalog().context("Indicator catalog is misconfigured")?;
    print!("{}", report::render_catalog());
    println!();
    println!("{} indicators, weights sum to {:.2}", catalog.len(), catalog.weight_sum());
    Ok(())
}
