//! Print what the snapserver currently knows about
//!
//! Reads `SNAPCAST_HOST` / `SNAPCAST_PORT` and logs according to
//! `SNAPCAST_LOG_MODE`.
//!
//! Run with: SNAPCAST_HOST=192.168.1.20 cargo run -p snapcast-bridge --example status

use snapcast_bridge::{logging, SnapcastBridge};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging_from_env()?;

    let bridge = SnapcastBridge::from_env()?;
    let snapshot = bridge.current_snapshot();
    let summary = snapshot.summary();

    println!(
        "Snapserver {} ({} clients, {} groups, {} streams)",
        summary.server_version.as_deref().unwrap_or("unknown version"),
        summary.clients,
        summary.groups,
        summary.streams
    );

    println!("\nGroups:");
    for group in snapshot.groups() {
        let selection = snapshot
            .selection_of(&group.id)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "no stream".to_string());
        println!("  {} [{}]", group.display_name(), selection);

        for client in snapshot.members_of(&group.id) {
            println!(
                "    {:<24} {:>3}%{}{}",
                client.display_name(),
                client.volume,
                if client.muted { " muted" } else { "" },
                if client.connected { "" } else { " (offline)" }
            );
        }
    }

    println!("\nStream choices:");
    for choice in snapshot.stream_choices() {
        println!("  {:<12} {}", choice.selection.form_value(), choice.label);
    }

    bridge.shutdown();
    Ok(())
}
