use footprint_kernel::AllocationTable;
use std::fmt::Write as _;
use std::path::Path;

/// Exit status for unreadable input, bad flags or bad config.
pub const EXIT_INPUT: i32 = 1;
/// Exit status for a failed allocation run.
pub const EXIT_ALLOCATION: i32 = 2;

pub fn exit_with(code: i32, message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(code);
}

/// Render `Layer,area_ha` rows in table order.
pub fn render_csv(table: &AllocationTable) -> String {
    let mut out = String::from("Layer,area_ha\n");
    for row in &table.rows {
        let _ = writeln!(out, "{},{:.1}", csv_field(&row.layer), row.area_ha);
    }
    out
}

pub fn write_csv(path: &Path, table: &AllocationTable) -> Result<(), String> {
    std::fs::write(path, render_csv(table))
        .map_err(|e| format!("failed to write {}: {e}", path.display()))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Print a rows block sorted by area, largest first.
pub fn print_rows_block(table: &AllocationTable) {
    println!("  Layers: {}", table.len());
    let width = table
        .rows
        .iter()
        .map(|row| row.layer.chars().count())
        .max()
        .unwrap_or(0);
    for row in table.by_area_desc() {
        println!("    - {:<width$}  {:>10.1} ha", row.layer, row.area_ha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use footprint_kernel::LayerAggregator;

    #[test]
    fn csv_quotes_awkward_layer_names() {
        let mut agg = LayerAggregator::new();
        agg.add("plain", 1.25);
        agg.add("a,b", 2.0);
        agg.add("say \"hi\"", 0.0);
        let csv = render_csv(&agg.finalize());
        assert_eq!(
            csv,
            "Layer,area_ha\nplain,1.3\n\"a,b\",2.0\n\"say \"\"hi\"\"\",0.0\n"
        );
    }
}
