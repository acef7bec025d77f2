//! Console output formatting for scans, ownership and tools

use argos_application::ScanReport;
use argos_domain::{
    AcquireOutcome, DetectedDevice, DeviceStatus, ForceReleaseOutcome, ReleaseOutcome, ResourceState,
    ScarceDevice, ToolDefinition,
};
use colored::Colorize;

/// Formats runtime results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a hardware scan: one line per device, then totals
    pub fn format_scan(report: &ScanReport) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Hardware Scan"));
        output.push('\n');

        if report.devices.is_empty() {
            output.push_str(&format!("\n{}\n", "No devices detected".dimmed()));
        } else {
            output.push_str(&Self::section_header("Devices"));
            for device in &report.devices {
                output.push_str(&Self::device_line(device));
                output.push('\n');
            }
        }

        if !report.disconnected.is_empty() {
            output.push_str(&Self::section_header("Disconnected"));
            for id in &report.disconnected {
                output.push_str(&format!("  {} {}\n", "x".red(), id));
            }
        }

        output.push_str(&Self::section_header("Summary"));
        output.push_str(&format!(
            "{} {} ({} connected)\n",
            "Total:".cyan().bold(),
            report.stats.total,
            report.stats.connected
        ));
        for (category, count) in &report.stats.by_category {
            output.push_str(&format!("  {:<10} {}\n", category.as_str(), count));
        }
        output.push_str(&format!(
            "{} {}ms\n",
            "Scan time:".dimmed(),
            report.duration.as_millis()
        ));

        output.push_str(&Self::footer());
        output
    }

    /// Format a scan report as JSON
    pub fn format_scan_json(report: &ScanReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn device_line(device: &DetectedDevice) -> String {
        let marker = match device.status {
            DeviceStatus::Connected => "v".green(),
            DeviceStatus::Disconnected => "x".red(),
            _ => "?".yellow(),
        };
        let mut line = format!(
            "  {} {:<28} {:<9} {:<8} {}",
            marker,
            device.id.bold(),
            device.category.as_str(),
            device.connection.as_str(),
            device.name
        );
        if let Some(path) = &device.device_path {
            line.push_str(&format!(" {}", path.dimmed()));
        } else if let Some(ip) = &device.ip_address {
            let address = match device.port {
                Some(port) => format!("{}:{}", ip, port),
                None => ip.clone(),
            };
            line.push_str(&format!(" {}", address.dimmed()));
        }
        line
    }

    /// Format scarce-device ownership
    pub fn format_status(states: &[ResourceState]) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Scarce Devices"));
        output.push('\n');

        for state in states {
            let detected = if state.is_detected {
                "detected".green()
            } else {
                "not detected".dimmed()
            };
            let ownership = match &state.owner {
                Some(owner) => {
                    let since = state
                        .connected_since
                        .map(|t| format!(" since {}", t.format("%Y-%m-%d %H:%M:%S UTC")))
                        .unwrap_or_default();
                    format!("{} {}{}", "held by".yellow(), owner.bold(), since)
                }
                None => "available".green().to_string(),
            };
            output.push_str(&format!(
                "  {:<10} {:<14} {}\n",
                state.device.as_str().bold(),
                detected,
                ownership
            ));
        }

        output.push_str(&Self::footer());
        output
    }

    pub fn format_acquire(device: ScarceDevice, owner: &str, outcome: &AcquireOutcome) -> String {
        match outcome {
            AcquireOutcome::Granted => {
                format!("{} {} acquired by {}", "v".green(), device, owner.bold())
            }
            other => format!(
                "{} {} not acquired: held by {}",
                "x".red(),
                device,
                other.current_owner().unwrap_or("unknown")
            ),
        }
    }

    pub fn format_release(device: ScarceDevice, outcome: &ReleaseOutcome) -> String {
        match outcome.error_message() {
            None => format!("{} {} released", "v".green(), device),
            Some(message) => format!("{} {} not released: {}", "x".red(), device, message),
        }
    }

    pub fn format_force_release(device: ScarceDevice, outcome: &ForceReleaseOutcome) -> String {
        let mut output = format!(
            "{} {} force released (previous owner: {})\n",
            "!".yellow().bold(),
            device,
            outcome.previous_owner.as_deref().unwrap_or("none")
        );
        if !outcome.killed_processes.is_empty() {
            output.push_str(&format!(
                "  {} {}\n",
                "Killed:".cyan(),
                outcome.killed_processes.join(", ")
            ));
        }
        if !outcome.stopped_containers.is_empty() {
            output.push_str(&format!(
                "  {} {}\n",
                "Stopped:".cyan(),
                outcome.stopped_containers.join(", ")
            ));
        }
        output
    }

    /// Format a tool listing grouped by namespace
    pub fn format_tools(tools: &[&ToolDefinition]) -> String {
        let mut tools = tools.to_vec();
        tools.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));

        let mut output = String::new();
        let mut namespace: Option<&str> = None;
        for tool in &tools {
            if namespace != Some(tool.namespace.as_str()) {
                output.push_str(&Self::section_header(&tool.namespace));
                namespace = Some(tool.namespace.as_str());
            }
            let mut line = format!(
                "  {:<28} {:<9} {}",
                tool.name.bold(),
                tool.transport_type().as_str().dimmed(),
                tool.description
            );
            if let Some(device) = tool.requires_device {
                line.push_str(&format!(" {}", format!("[{}]", device).yellow()));
            }
            output.push_str(&line);
            output.push('\n');
        }
        output.push_str(&format!("\n{} {}\n", "Tools:".cyan().bold(), tools.len()));
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_domain::{
        ConnectionType, DeviceCapabilities, DeviceCategory, DeviceStats, InProcessConfig, TransportConfig,
    };
    use std::time::Duration;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_format_scan_lists_devices_and_totals() {
        plain();
        let device = DetectedDevice::new(
            "gps-ttyUSB0",
            "GPS Module (ttyUSB0)",
            DeviceCategory::Gps,
            ConnectionType::Serial,
            DeviceCapabilities::generic(),
        )
        .with_device_path("/dev/ttyUSB0");
        let report = ScanReport {
            stats: DeviceStats::from_devices([&device]),
            devices: vec![device],
            disconnected: vec!["hackrf-0000".to_string()],
            duration: Duration::from_millis(42),
        };

        let output = ConsoleFormatter::format_scan(&report);

        assert!(output.contains("gps-ttyUSB0"));
        assert!(output.contains("/dev/ttyUSB0"));
        assert!(output.contains("hackrf-0000"));
        assert!(output.contains("Total: 1"));
        assert!(output.contains("42ms"));
    }

    #[test]
    fn test_format_status_shows_owner() {
        plain();
        let mut held = ResourceState::vacant(ScarceDevice::Hackrf);
        held.claim("spectrum-sweep");
        let free = ResourceState::vacant(ScarceDevice::Alfa);

        let output = ConsoleFormatter::format_status(&[held, free]);

        assert!(output.contains("held by spectrum-sweep"));
        assert!(output.contains("alfa"));
        assert!(output.contains("available"));
    }

    #[test]
    fn test_format_acquire_denied() {
        plain();
        let outcome = AcquireOutcome::Held {
            owner: "kismet".to_string(),
        };
        let output = ConsoleFormatter::format_acquire(ScarceDevice::Alfa, "wifite", &outcome);
        assert_eq!(output, "x alfa not acquired: held by kismet");
    }

    #[test]
    fn test_format_tools_groups_by_namespace() {
        plain();
        let internal = |h: &str| {
            TransportConfig::InProcess(InProcessConfig {
                handler: h.to_string(),
            })
        };
        let a = ToolDefinition::new("geo.distance", "geo", "Distance", internal("d"));
        let b = ToolDefinition::new("hardware.scan", "hardware", "Scan", internal("s"))
            .with_device(ScarceDevice::Hackrf);

        let output = ConsoleFormatter::format_tools(&[&b, &a]);

        let geo = output.find("geo.distance").unwrap();
        let hw = output.find("hardware.scan").unwrap();
        assert!(geo < hw);
        assert!(output.contains("[hackrf]"));
        assert!(output.contains("Tools: 2"));
    }
}
