use bambam_traffic::{app, model::TrafficCliError};
use clap::{Parser, Subcommand};
use std::path::Path;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct TrafficAppArguments {
    #[command(subcommand)]
    app: App,
}

#[derive(Subcommand)]
pub enum App {
    /// match traffic links onto a road graph and build the pattern lookup
    Match {
        #[arg(long, help = "path to file with traffic matching parameters (.toml or .json)")]
        configuration_file: String,
        #[arg(long, help = "directory containing the vectorized road graph")]
        graph_directory: String,
        #[arg(long, help = "output path for the traffic storage and diagnostics")]
        output_directory: String,
    },
    /// report the pattern and speed of an oriented edge from a traffic storage
    Query {
        #[arg(long, help = "directory of a traffic storage written by 'match'")]
        storage_directory: String,
        #[arg(long)]
        edge_id: usize,
        #[arg(long)]
        base_node: usize,
        #[arg(long)]
        adj_node: usize,
        #[arg(long, help = "day of the week, such as 'mon' or 'Monday'")]
        weekday: String,
        #[arg(long, help = "time of day as HH:MM", default_value = "00:00")]
        time: String,
    },
}

pub fn run(app: &App) -> Result<(), TrafficCliError> {
    env_logger::init();
    match app {
        App::Match {
            configuration_file,
            graph_directory,
            output_directory,
        } => {
            let summary = app::run_match(
                configuration_file,
                Path::new(graph_directory),
                Path::new(output_directory),
            )?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            eprintln!("finished.");
            Ok(())
        }
        App::Query {
            storage_directory,
            edge_id,
            base_node,
            adj_node,
            weekday,
            time,
        } => {
            let result = app::run_query(
                Path::new(storage_directory),
                *edge_id,
                *base_node,
                *adj_node,
                weekday,
                time,
            )?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

fn main() {
    let args = TrafficAppArguments::parse();
    if let Err(e) = run(&args.app) {
        log::error!("bambam-traffic failed: {e}");
        eprintln!("{e}");
        std::process::exit(1);
    }
}
