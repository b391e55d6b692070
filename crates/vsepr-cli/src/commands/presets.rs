use crate::error::{CliError, Result};
use tracing::info;
use vsepr::core::models::real_shape::{self, RealMoleculeShape};

pub fn run() -> Result<()> {
    let presets = real_shape::presets();
    info!("Listing {} built-in molecule(s).", presets.len());

    println!("{:<22} {:<8} {:<8} {}", "NAME", "FORMULA", "AXE", "GEOMETRY");
    for shape in &presets {
        println!("{}", describe(shape)?);
    }
    println!("\nRelax one with: vsepr relax --preset <NAME>");
    Ok(())
}

fn describe(shape: &RealMoleculeShape) -> Result<String> {
    let configuration = shape.vsepr_configuration().map_err(|e| {
        CliError::Config(format!("Preset '{}' is inconsistent: {}", shape.name, e))
    })?;
    Ok(format!(
        "{:<22} {:<8} {:<8} {}",
        shape.name,
        shape.formula.as_deref().unwrap_or("-"),
        configuration.notation(),
        configuration.molecule_geometry
    ))
}
