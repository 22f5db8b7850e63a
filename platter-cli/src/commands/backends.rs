//! Backends command implementation.

use platter_core::dispatch::{self, Backend};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct BackendInfo {
    name: &'static str,
    supported: bool,
    hardware: bool,
    folds: bool,
    selected: bool,
}

fn backend_table() -> Vec<BackendInfo> {
    let selected = dispatch::global().backend();
    Backend::ALL
        .into_iter()
        .map(|backend| BackendInfo {
            name: backend.name(),
            supported: backend.is_supported(),
            hardware: backend.is_hardware(),
            folds: backend.folds(),
            selected: backend == selected,
        })
        .collect()
}

pub fn cmd_backends(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let table = backend_table();

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    match dispatch::hardware_backend() {
        Some(backend) => println!("Carry-less multiply: {}", backend),
        None => println!("Carry-less multiply: not available"),
    }
    println!();
    println!("{:<12} {:>9} {:>8}", "Backend", "Supported", "Selected");
    println!("{}", "-".repeat(31));
    for info in &table {
        println!(
            "{:<12} {:>9} {:>8}",
            info.name,
            if info.supported { "yes" } else { "no" },
            if info.selected { "*" } else { "" }
        );
    }

    Ok(())
}
