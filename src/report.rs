//! Status reporting and text formatting helpers

use crate::core::types::{DeviceState, Domain};

/// Compose the home status overview from a snapshot.
pub fn status_dashboard(snapshot: &[DeviceState]) -> String {
    let count = |domain: Domain| {
        snapshot
            .iter()
            .filter(|s| s.domain() == Some(domain))
            .count()
    };
    let count_in_state = |domain: Domain, state: &str| {
        snapshot
            .iter()
            .filter(|s| s.domain() == Some(domain) && s.state == state)
            .count()
    };

    let lights_on = count_in_state(Domain::Light, "on");
    let lights_total = count(Domain::Light);
    let switches_on = count_in_state(Domain::Switch, "on");
    let switches_total = count(Domain::Switch);
    let locks_locked = count_in_state(Domain::Lock, "locked");
    let locks_total = count(Domain::Lock);

    let climate: Vec<&DeviceState> = snapshot
        .iter()
        .filter(|s| s.domain() == Some(Domain::Climate))
        .take(2)
        .collect();

    let open_doors = snapshot
        .iter()
        .filter(|s| s.entity_id.contains("door") && matches!(s.state.as_str(), "on" | "open"))
        .count();

    let mut msg = String::from("🏠 Home Status Overview\n\n");
    msg.push_str(&format!("Lights:   {}/{} on\n", lights_on, lights_total));
    msg.push_str(&format!(
        "Switches: {}/{} on\n",
        switches_on, switches_total
    ));

    if climate.is_empty() {
        msg.push_str("Climate:  no climate devices found\n");
    } else {
        for device in &climate {
            msg.push_str(&format!("Climate:  {} ({})\n", device.label(), device.state));
        }
    }

    msg.push_str(&format!(
        "Security: {}/{} locks secured, {} door(s) open\n",
        locks_locked, locks_total, open_doors
    ));

    msg
}

/// Format a device list for display, truncated past `max_items`.
pub fn format_device_list(devices: &[DeviceState], max_items: usize) -> String {
    if devices.is_empty() {
        return "No devices found".into();
    }

    let mut lines: Vec<String> = devices
        .iter()
        .take(max_items)
        .map(|device| {
            let icon = if device.is_active() { "✅" } else { "⭕" };
            format!("{} {} ({})", icon, device.label(), device.state)
        })
        .collect();

    if devices.len() > max_items {
        lines.push(format!("... and {} more", devices.len() - max_items));
    }

    lines.join("\n")
}

/// Format a temperature for display.
pub fn format_temperature(temp: f64) -> String {
    format!("{:.1}°C", temp)
}

/// Format a duration in seconds to a human-readable form ("2h 15m").
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{}s", seconds);
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    let remaining_minutes = minutes % 60;
    if hours < 24 {
        return if remaining_minutes > 0 {
            format!("{}h {}m", hours, remaining_minutes)
        } else {
            format!("{}h", hours)
        };
    }

    let days = hours / 24;
    format!("{}d {}h", days, hours % 24)
}
