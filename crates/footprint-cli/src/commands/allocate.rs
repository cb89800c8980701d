use crate::cli::LayerNameArg;
use crate::job::JobFile;
use crate::support::{EXIT_ALLOCATION, EXIT_INPUT, exit_with, print_rows_block, write_csv};
use footprint_kernel::{AllocationConfig, Allocator, ProcessingOrder};
use serde_json::json;
use std::path::PathBuf;

pub struct Args {
    pub job: String,
    pub config: Option<String>,
    pub epsilon: Option<f64>,
    pub working_crs: Option<String>,
    pub layer_name_from: LayerNameArg,
    pub no_sort: bool,
    pub priority: Vec<String>,
    pub csv: Option<String>,
    pub json: bool,
}

fn load_config(args: &Args) -> AllocationConfig {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
                exit_with(EXIT_INPUT, format!("failed to read config {path}: {e}"))
            });
            AllocationConfig::from_toml_str(&text)
                .unwrap_or_else(|e| exit_with(EXIT_INPUT, format!("{path}: {e}")))
        }
        None => AllocationConfig::default(),
    };

    if let Some(epsilon) = args.epsilon {
        config.epsilon = epsilon;
    }
    if let Some(crs) = &args.working_crs {
        config.working_crs = Some(crs.clone());
    }
    if args.no_sort {
        config.ordering = ProcessingOrder::AsGiven;
    } else if !args.priority.is_empty() {
        config.ordering = ProcessingOrder::Priority {
            layers: args.priority.clone(),
        };
    }
    config
}

pub fn run(args: Args) {
    let config = load_config(&args);
    let allocator = Allocator::from_config(&config).unwrap_or_else(|e| exit_with(EXIT_INPUT, e));

    let job_path = PathBuf::from(&args.job);
    let job = JobFile::load(&job_path)
        .and_then(|job| job.into_kernel(args.layer_name_from))
        .unwrap_or_else(|e| exit_with(EXIT_INPUT, e));

    let component_count = job.components.len();
    tracing::info!(
        job = %job_path.display(),
        components = component_count,
        master_crs = %job.master.crs(),
        "loaded job"
    );
    let outcome = allocator
        .allocate(&job.master, job.components)
        .unwrap_or_else(|e| exit_with(EXIT_ALLOCATION, e));
    let digest = outcome.table.digest();

    if let Some(csv) = args.csv.as_deref() {
        write_csv(&PathBuf::from(csv), &outcome.table).unwrap_or_else(|e| exit_with(EXIT_INPUT, e));
    }

    if args.json {
        let payload = json!({
            "job": job_path.display().to_string(),
            "digest": digest,
            "outcome": outcome,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).expect("json serialization")
        );
        return;
    }

    println!("footprint allocate {}", args.job);
    println!("  Working CRS: {}", outcome.working_crs);
    println!("  Components: {component_count}");
    println!("  Master: {:.1} ha", outcome.initial_ha);
    println!("  Allocated: {:.1} ha", outcome.table.total_ha());
    println!("  Residual: {:.1} ha", outcome.residual_ha);
    if let Some(index) = outcome.exhausted_after {
        println!("  Exhausted after: {}", outcome.claims[index].source);
    }
    println!("  Digest: {digest}");
    print_rows_block(&outcome.table);
    if let Some(csv) = args.csv.as_deref() {
        println!("  CSV: {csv}");
    }
}
