//! Statistics display and formatting

use arq::{ReceiverStats, SenderStats};
use std::io::Write;
use std::time::Duration;

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format bandwidth in human-readable form
pub fn format_bandwidth(bps: u64) -> String {
    const KBPS: u64 = 1000;
    const MBPS: u64 = KBPS * 1000;
    const GBPS: u64 = MBPS * 1000;

    if bps >= GBPS {
        format!("{:.2} Gbps", bps as f64 / GBPS as f64)
    } else if bps >= MBPS {
        format!("{:.2} Mbps", bps as f64 / MBPS as f64)
    } else if bps >= KBPS {
        format!("{:.2} Kbps", bps as f64 / KBPS as f64)
    } else {
        format!("{} bps", bps)
    }
}

/// Format duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else if secs > 0 {
        format!("{}s", seconds)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Average throughput in bits per second
pub fn throughput_bps(bytes: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 * 8.0 / secs) as u64
    } else {
        0
    }
}

/// Overwrite the current terminal line with a running byte count
pub fn print_progress(label: &str, bytes: u64) {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\r{:50}\r{}: {} bytes", "", label, bytes);
    let _ = stdout.flush();
}

/// Display sender statistics
pub fn display_sender_stats(stats: &SenderStats, elapsed: Duration) {
    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ TRANSFER COMPLETE                                           │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Sent:       {} in {} ({})",
        format_bytes(stats.bytes_sent),
        format_duration(elapsed),
        format_bandwidth(throughput_bps(stats.bytes_sent, elapsed))
    );
    println!("│ Windows:    {}", stats.windows_sent);
    println!(
        "│ Packets:    {} sent / {} retransmitted",
        stats.packets_sent, stats.packets_retransmitted
    );
    println!(
        "│ Acks:       {} received / {} duplicate / {} stale",
        stats.acks_received, stats.duplicate_acks, stats.stale_acks
    );
    println!("│ Silent:     {} attempts", stats.silent_attempts);
    println!("└─────────────────────────────────────────────────────────────┘");
}

/// Display receiver statistics
pub fn display_receiver_stats(stats: &ReceiverStats, elapsed: Duration) {
    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ TRANSFER COMPLETE                                           │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Received:   {} in {} ({})",
        format_bytes(stats.bytes_received),
        format_duration(elapsed),
        format_bandwidth(throughput_bps(stats.bytes_received, elapsed))
    );
    println!("│ Windows:    {}", stats.windows_received);
    println!(
        "│ Packets:    {} accepted / {} duplicate / {} stale",
        stats.packets_accepted, stats.duplicate_packets, stats.stale_packets
    );
    println!("│ Acks sent:  {}", stats.acks_sent);
    println!("└─────────────────────────────────────────────────────────────┘");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(2 * 1024 * 1024), "2.00 MB");
    }

    #[test]
    fn test_format_bandwidth() {
        assert_eq!(format_bandwidth(500), "500 bps");
        assert_eq!(format_bandwidth(10_000), "10.00 Kbps");
        assert_eq!(format_bandwidth(10_000_000), "10.00 Mbps");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 01m 01s");
    }

    #[test]
    fn test_throughput() {
        assert_eq!(throughput_bps(1000, Duration::from_secs(1)), 8000);
        assert_eq!(throughput_bps(1000, Duration::ZERO), 0);
    }
}
