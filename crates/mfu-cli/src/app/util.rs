const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Human-readable size for upload and download summaries, in 1024 steps.
pub(crate) fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < SIZE_UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }

    match unit {
        0 => format!("{} B", bytes),
        _ => format!("{:.2} {}", value, SIZE_UNITS[unit]),
    }
}
