//! Registered command listing

use cmdr_engine::Registry;

pub fn execute(registry: &Registry) -> Result<(), Box<dyn std::error::Error>> {
    for registration in registry.registrations() {
        let spec = registration.spec();
        println!(
            "{}\t{}\t{}",
            spec.name,
            spec.shape().as_str(),
            spec.about.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
