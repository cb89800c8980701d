use crate::support::{EXIT_INPUT, exit_with};
use footprint_kernel::{Crs, working_crs_for};
use serde_json::json;

pub fn run(id: String, json_output: bool) {
    let crs: Crs = id.parse().unwrap_or_else(|e| exit_with(EXIT_INPUT, e));
    let working = working_crs_for(&crs, None).unwrap_or_else(|e| exit_with(EXIT_INPUT, e));
    let kind = if crs.is_geographic() {
        "geographic"
    } else {
        "projected"
    };

    if json_output {
        let payload = json!({
            "crs": crs.to_string(),
            "kind": kind,
            "workingCrs": working.to_string(),
            "reprojected": working != crs,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).expect("json serialization")
        );
    } else {
        println!("footprint crs {id}");
        println!("  CRS: {crs} ({kind})");
        println!("  Working CRS: {working}");
    }
}
