//! svmachine command line interface
//!
//! Inspect, run and repackage trained SVM models: print model metadata,
//! stream LibSVM-format data through a model, and wrap raw model files into
//! attributed container stores.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process;
use svmachine::persistence::{self, AttrStore};
use svmachine::{Machine, Result, SparseRecordFile};

#[derive(Parser)]
#[command(name = "svmachine")]
#[command(about = "SVM inference and model management")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Display model information
    Info(InfoArgs),
    /// Run a model over a data file
    Predict(PredictArgs),
    /// Wrap a raw model file into a container store
    Convert(ConvertArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Model file (raw solver format, or a container store with --store)
    model: PathBuf,

    /// Treat the model file as a container store
    #[arg(long)]
    store: bool,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file in LibSVM format
    #[arg(long)]
    data: PathBuf,

    /// Treat the model file as a container store
    #[arg(long)]
    store: bool,

    /// Print per-class probability estimates
    #[arg(short, long)]
    probability: bool,
}

#[derive(Args)]
struct ConvertArgs {
    /// Raw model file in the solver's native format
    #[arg(short, long)]
    model: PathBuf,

    /// Output container store
    #[arg(short, long)]
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Info(args) => info_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Convert(args) => convert_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn load_machine(path: &Path, store: bool) -> Result<Machine> {
    if store {
        info!("Loading container store {:?}", path);
        let store = AttrStore::load_from_file(path)?;
        persistence::load_machine(&store)
    } else {
        info!("Loading model file {:?}", path);
        Machine::from_model_file(path)
    }
}

fn info_command(args: InfoArgs) -> Result<()> {
    let machine = load_machine(&args.model, args.store)?;

    println!("Machine type:  {}", machine.machine_type());
    println!("Kernel type:   {}", machine.kernel_type());
    println!("Input size:    {}", machine.input_size());
    println!("Output size:   {}", machine.output_size());
    println!("Classes:       {}", machine.num_classes());
    if machine.machine_type().is_classification() {
        let labels: Vec<String> = (0..machine.num_classes())
            .map(|i| machine.class_label(i).map(|l| l.to_string()))
            .collect::<Result<_>>()?;
        println!("Labels:        {}", labels.join(" "));
    }
    println!("Probability:   {}", machine.supports_probability());
    println!("Gamma:         {}", machine.gamma());

    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    let mut machine = load_machine(&args.model, args.store)?;
    let mut records = SparseRecordFile::open(&args.data)?;

    info!(
        "Predicting {} records of shape {} with input size {}",
        records.sample_count(),
        records.shape(),
        machine.input_size()
    );

    // A file narrower than the model means its trailing features are all
    // zero, so the input is padded up to the model width.
    let mut record = vec![0.0; records.shape()];
    let mut input = vec![0.0; records.shape().max(machine.input_size())];
    let mut probabilities = vec![0.0; machine.output_size()];

    let mut row = 0usize;
    let mut correct = 0usize;
    while let Some(label) = records.read(&mut record)? {
        input[..record.len()].copy_from_slice(&record);

        let predicted = if args.probability {
            machine.predict_class_and_probabilities(&input, &mut probabilities)?
        } else {
            machine.predict_class(&input)?
        };

        if args.probability {
            let rendered: Vec<String> =
                probabilities.iter().map(|p| format!("{p:.4}")).collect();
            println!("{row}: {predicted} [{}]", rendered.join(" "));
        } else {
            println!("{row}: {predicted}");
        }

        if predicted == label {
            correct += 1;
        }
        row += 1;
    }

    if row > 0 {
        println!(
            "Accuracy: {:.2}% ({correct}/{row})",
            100.0 * correct as f64 / row as f64
        );
    }

    Ok(())
}

fn convert_command(args: ConvertArgs) -> Result<()> {
    let machine = Machine::from_model_file(&args.model)?;

    let mut store = AttrStore::new();
    persistence::save_machine(&machine, &mut store)?;
    store.save_to_file(&args.output)?;

    info!(
        "Wrote container store {:?} ({} classes, input size {})",
        args.output,
        machine.num_classes(),
        machine.input_size()
    );

    Ok(())
}
