//! Terminal output. Nothing here holds state.

use jatim_weather_core::{
    DistrictStatus, Progress, Round, Snapshot, WeatherRecord,
    stats::{Metric, Summary},
};

const RULE_WIDTH: usize = 60;

pub fn format_temperature(celsius: f64) -> String {
    format!("{celsius:.1}°C")
}

pub fn format_speed(kph: f64) -> String {
    format!("{kph:.1} km/h")
}

pub fn print_header() {
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("     EAST JAVA WEATHER INFORMATION SYSTEM");
    println!("{}", "=".repeat(RULE_WIDTH));
}

pub fn print_info(message: &str) {
    println!("ℹ️  {message}");
}

pub fn print_success(message: &str) {
    println!("✅ {message}");
}

pub fn print_error(message: &str) {
    println!("❌ Error: {message}");
}

pub fn print_loading(districts: usize) {
    println!("⏳ Fetching weather for {districts} districts...");
}

pub fn print_progress(progress: &Progress) {
    let mark = if progress.status.is_fetched() { '✓' } else { '✗' };
    println!("{mark} {progress}");
}

pub fn print_round_done(round: &Round, total: usize) {
    println!();
    println!("Done! Fetched {} of {total} districts", round.records.len());
    for (district, status) in round.failures() {
        match status {
            DistrictStatus::Failed(reason) | DistrictStatus::Crashed(reason) => {
                println!("   {district}: {reason}")
            }
            DistrictStatus::Fetched => {}
        }
    }
}

pub fn summary_row(r: &WeatherRecord) -> String {
    format!(
        "{:<14} {:<14} {:>8} {:<24} {:>5} {:>11}",
        r.district,
        r.location_name,
        format_temperature(r.temperature_c),
        r.condition_text,
        format!("{}%", r.humidity_pct),
        format_speed(r.wind_speed_kph),
    )
}

pub fn print_summary(snapshot: &Snapshot) {
    if snapshot.is_empty() {
        print_error("No weather data available");
        return;
    }

    println!("📊 EAST JAVA WEATHER SUMMARY ({} districts)", snapshot.len());
    println!("{}", "=".repeat(82));
    println!(
        "{:<14} {:<14} {:>8} {:<24} {:>5} {:>11}",
        "District", "Location", "Temp", "Condition", "Hum", "Wind"
    );
    println!("{}", "-".repeat(82));
    for record in snapshot.values() {
        println!("{}", summary_row(record));
    }
}

pub fn print_detail(r: &WeatherRecord) {
    println!("🌡️  WEATHER DETAIL - {}", r.district.to_uppercase());
    println!("{}", "=".repeat(50));
    println!("Location       : {}", r.location_name);
    println!("Temperature    : {}", format_temperature(r.temperature_c));
    println!("Feels like     : {}", format_temperature(r.feels_like_c));
    println!("Condition      : {}", r.condition_text);
    println!("Humidity       : {}%", r.humidity_pct);
    println!("Wind           : {} ({})", format_speed(r.wind_speed_kph), r.wind_direction);
    println!("Visibility     : {:.1} km", r.visibility_km);
    println!("Pressure       : {:.1} mb", r.pressure_mb);
    println!("UV index       : {:.1}", r.uv_index);
    println!("Last updated   : {}", r.last_updated.format("%Y-%m-%d %H:%M"));
    println!("{}", "=".repeat(50));
}

pub fn print_districts(districts: &[String]) {
    println!("📍 DISTRICTS:");
    for (i, district) in districts.iter().enumerate() {
        println!("{:2}. {district}", i + 1);
    }
}

pub fn print_condition_matches(needle: &str, matches: &[&WeatherRecord]) {
    if matches.is_empty() {
        print_error(&format!("No district reports condition '{needle}'"));
        return;
    }

    println!("🔍 DISTRICTS WITH CONDITION '{}':", needle.to_uppercase());
    println!("{}", "=".repeat(RULE_WIDTH));
    for r in matches {
        println!(
            "📍 {:<15} - {} ({})",
            r.district,
            r.condition_text,
            format_temperature(r.temperature_c)
        );
    }
}

pub fn print_statistics(described: &[(Metric, Summary)], conditions: &[(String, usize)]) {
    println!("📈 EAST JAVA WEATHER STATISTICS");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!(
        "{:<12} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "metric", "count", "mean", "std", "min", "median", "max"
    );
    for (metric, s) in described {
        println!(
            "{:<12} {:>6} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
            metric.as_str(),
            s.count,
            s.mean,
            s.std,
            s.min,
            s.median,
            s.max
        );
    }

    println!();
    println!("☁️  MOST FREQUENT CONDITIONS:");
    for (condition, count) in conditions.iter().take(5) {
        println!("   {condition}: {count} districts");
    }
}
