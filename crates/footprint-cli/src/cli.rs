use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "footprint",
    about = "Footprint: allocate a master area among overlapping component layers without double counting",
    version
)]
pub struct Cli {
    /// Verbose logging to stderr (overridden by FOOTPRINT_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Allocate the master footprint of a job file among its components
    Allocate {
        /// Path to the job JSON (master + components with GeoJSON geometry)
        job: String,

        /// Optional allocation config (TOML); flags below override it
        #[arg(long)]
        config: Option<String>,

        /// Exhaustion tolerance in square metres
        #[arg(long)]
        epsilon: Option<f64>,

        /// Projected working CRS override, e.g. EPSG:6933
        #[arg(long)]
        working_crs: Option<String>,

        /// How layer names are derived from component sources
        #[arg(long, value_enum, default_value = "parent-folder")]
        layer_name_from: LayerNameArg,

        /// Process components in job-file order instead of sorting by source
        #[arg(long, conflicts_with = "priority")]
        no_sort: bool,

        /// Layer processed ahead of the rest (repeatable, in priority order)
        #[arg(long = "priority")]
        priority: Vec<String>,

        /// Write `Layer,area_ha` rows to this CSV path
        #[arg(long)]
        csv: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a CRS identifier and show the working CRS it selects
    Crs {
        /// CRS identifier, e.g. EPSG:4326
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LayerNameArg {
    /// Name of the directory containing the source
    #[value(name = "parent-folder")]
    ParentFolder,
    /// File stem of the source
    #[value(name = "filename")]
    Filename,
}
