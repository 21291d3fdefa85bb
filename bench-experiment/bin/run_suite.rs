use anyhow::Context;
use clap::{Parser, ValueEnum};
use optbench_core::Colormap;
use optbench_experiment::{CountingSink, Experiment, ExperimentConfig, Report, SolverKind, load_config};
use optbench_problems::ProblemKind;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "run_suite",
    about = "Run a solver over a benchmark suite and aggregate the ECDF of its runs"
)]
struct Cli {
    /// Experiment configuration (.toml or .json); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Independent runs per problem
    #[arg(long)]
    runs: Option<usize>,

    /// Evaluations per run
    #[arg(long)]
    budget: Option<u64>,

    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Solver under test
    #[arg(long, value_enum)]
    solver: Option<SolverChoice>,

    /// Disable parallel evaluation of the suite
    #[arg(long)]
    no_parallel: bool,

    /// Number of worker threads (0 = use all available cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Write the JSON report to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print the attainment distribution as a text colormap
    #[arg(long)]
    colormap: bool,

    /// List all available problems and exit
    #[arg(long)]
    list_problems: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SolverChoice {
    RandomSearch,
    OnePlusOne,
}

impl From<SolverChoice> for SolverKind {
    fn from(choice: SolverChoice) -> Self {
        match choice {
            SolverChoice::RandomSearch => SolverKind::RandomSearch,
            SolverChoice::OnePlusOne => SolverKind::OnePlusOne,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    if args.list_problems {
        list_available_problems();
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    apply_overrides(&mut config, &args);

    let mut experiment = Experiment::from_config(&config)?;
    println!(
        "Running {} on suite '{}' ({} problems, {} runs each, budget {})...",
        experiment.solver_kind(),
        experiment.suite().name(),
        experiment.suite().included_count(),
        config.experiment.runs,
        config.experiment.budget
    );

    let (summary, counts) = if config.experiment.parallel {
        let (summary, sinks) = experiment.run_parallel(CountingSink::new)?;
        (summary, sinks.iter().sum::<CountingSink>())
    } else {
        let mut counts = CountingSink::new();
        let summary = experiment.run(&mut counts)?;
        (summary, counts)
    };

    let report = Report::new(&experiment, summary, counts)?;
    report.print_summary();

    if args.colormap {
        let distribution = experiment.engine().distribution()?;
        let colormap = Colormap::new().with_legend(experiment.engine().ranges());
        println!("\n{}", colormap.render(&distribution));
    }

    if let Some(path) = &args.json {
        report
            .save_json(path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn apply_overrides(config: &mut ExperimentConfig, args: &Cli) {
    let run = &mut config.experiment;
    if let Some(runs) = args.runs {
        run.runs = runs;
    }
    if let Some(budget) = args.budget {
        run.budget = budget;
    }
    if let Some(seed) = args.seed {
        run.seed = seed;
    }
    if let Some(solver) = args.solver {
        run.solver = solver.into();
    }
    if args.no_parallel {
        run.parallel = false;
    }
    if let Some(threads) = args.threads {
        run.threads = (threads != 0).then_some(threads);
    }
}

fn list_available_problems() {
    println!("Available problems ({}):", ProblemKind::ALL.len());
    for kind in ProblemKind::ALL {
        let modality = if kind.multimodal() {
            "multimodal"
        } else {
            "unimodal"
        };
        println!("- {:<12} {:<11} {}", kind.name(), modality, kind.description());
    }
}
