/// Colors handed out in rotation to chart series.
pub const PALETTE: [&str; 10] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6", "#f97316",
    "#6366f1", "#84cc16",
];

pub const GLOBE: &str = "🌐";

const FLAGS: &[(&str, &str)] = &[
    ("United States", "🇺🇸"),
    ("United Kingdom", "🇬🇧"),
    ("Canada", "🇨🇦"),
    ("Germany", "🇩🇪"),
    ("France", "🇫🇷"),
    ("India", "🇮🇳"),
    ("Japan", "🇯🇵"),
    ("Australia", "🇦🇺"),
    ("Brazil", "🇧🇷"),
    ("Netherlands", "🇳🇱"),
    ("Spain", "🇪🇸"),
    ("Italy", "🇮🇹"),
    ("China", "🇨🇳"),
    ("Mexico", "🇲🇽"),
    ("Indonesia", "🇮🇩"),
    ("Singapore", "🇸🇬"),
];

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

pub fn country_flag(country: &str) -> &'static str {
    FLAGS
        .iter()
        .find(|(name, _)| *name == country)
        .map(|(_, flag)| *flag)
        .unwrap_or(GLOBE)
}

/// Renders a duration in seconds as `"{minutes}m {seconds}s"`.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as i64
    } else {
        0
    };
    format!("{}m {}s", total / 60, total % 60)
}

/// `part / whole` as a percentage with one decimal and a trailing `%`.
pub fn format_rate(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", part as f64 / whole as f64 * 100.0)
}

/// `part / whole` as a whole-number percentage; 0 when `whole` is 0.
pub fn rounded_percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}
