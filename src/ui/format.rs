// Cell formatting helpers

/// Format a byte rate with binary prefixes ("340B/s", "1.2M/s").
pub fn format_rate(bytes_per_sec: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let rate = bytes_per_sec.max(0.0);
    if rate >= GIB {
        format!("{:.1}G/s", rate / GIB)
    } else if rate >= MIB {
        format!("{:.1}M/s", rate / MIB)
    } else if rate >= KIB {
        format!("{:.1}K/s", rate / KIB)
    } else {
        format!("{:.0}B/s", rate)
    }
}

/// Coarse human duration for the STATUS column ("42s", "3m12s", "2h5m",
/// "4d7h").
pub fn format_duration(secs: i64) -> String {
    if secs < 0 {
        return "-".to_string();
    }
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d{}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Truncate to at most `width` characters, appending `…` when shortened.
/// Slices on char boundaries, never inside a code point.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Text progress bar for a fraction in [0, 1]: filled blocks plus the
/// percentage.
pub fn meter(fraction: f64, width: usize) -> String {
    let bar_width = width.saturating_sub(7).max(1);
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = (fraction * bar_width as f64).round() as usize;
    let empty = bar_width.saturating_sub(filled);
    format!(
        "{}{} {:5.1}%",
        "█".repeat(filled),
        "░".repeat(empty),
        fraction * 100.0
    )
}

/// OSC-8 hyperlink wrapper: clickable `text` pointing at `url`.
pub fn hyperlink(text: &str, url: &str) -> String {
    format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_picks_binary_prefixes() {
        assert_eq!(format_rate(0.0), "0B/s");
        assert_eq!(format_rate(512.0), "512B/s");
        assert_eq!(format_rate(2048.0), "2.0K/s");
        assert_eq!(format_rate(3.5 * 1024.0 * 1024.0), "3.5M/s");
        assert_eq!(format_rate(-5.0), "0B/s");
    }

    #[test]
    fn duration_steps_through_units() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(192), "3m12s");
        assert_eq!(format_duration(2 * 3600 + 5 * 60), "2h5m");
        assert_eq!(format_duration(4 * 86400 + 7 * 3600), "4d7h");
        assert_eq!(format_duration(-1), "-");
    }

    #[test]
    fn truncate_never_splits_multibyte_chars() {
        assert_eq!(truncate("grafana", 10), "grafana");
        assert_eq!(truncate("cache-väärä", 6), "cache…");
        assert_eq!(truncate("日本語データベース", 4), "日本語…");
        assert_eq!(truncate("anything", 0), "");
        // Every width over an emoji-laden name must be safe
        let s = "app-🚀-prod";
        for w in 0..=12 {
            let _ = truncate(s, w);
        }
    }

    #[test]
    fn meter_fills_proportionally_and_clamps() {
        let m = meter(0.5, 17);
        assert!(m.contains("50.0%"));
        let full = meter(2.0, 17);
        assert!(full.contains("100.0%"));
        assert!(!full.contains('░'));
        let empty = meter(0.0, 17);
        assert!(!empty.contains('█'));
    }

    #[test]
    fn hyperlink_wraps_with_osc8_escapes() {
        let link = hyperlink("web", "https://logs.example.com/container/abc");
        assert!(link.starts_with("\x1b]8;;https://logs.example.com/container/abc\x1b\\"));
        assert!(link.ends_with("\x1b]8;;\x1b\\"));
        assert!(link.contains("web"));
    }
}
