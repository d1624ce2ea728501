pub mod capabilities;
pub mod install;
pub mod render;

pub use capabilities::run_capabilities;
pub use install::run_install;
pub use render::run_render;

use templar::LoadOutcome;

/// Print a one-line summary of a load outcome.
fn report(outcome: &LoadOutcome) {
    match outcome {
        LoadOutcome::Disabled => println!("Template generation is disabled"),
        LoadOutcome::Skipped { name } => {
            println!("Template '{}' already exists, use --overwrite to replace it", name)
        }
        LoadOutcome::Loaded { name } => println!("Template '{}' loaded", name),
    }
}
