use clap::Args;
use serde::Serialize;
use solotrack_core::{Config, Database, Requirement, RequirementSummary, TrainingStage};

#[derive(Args)]
pub struct ProgressArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ProgressReport {
    training_stage: TrainingStage,
    requirements: Vec<Requirement>,
    requirements_met: usize,
    total_requirements: usize,
    overall_progress: f64,
}

pub fn run(args: ProgressArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let flights = db.list_flights()?;

    let summary = RequirementSummary::new();
    let report = ProgressReport {
        training_stage: config.profile.training_stage,
        requirements: summary.compute(&flights),
        requirements_met: summary.requirements_met(&flights),
        total_requirements: summary.total_requirements(),
        overall_progress: summary.overall_progress(&flights),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} ({})", report.training_stage.display_title(), report.training_stage);
    for req in &report.requirements {
        let mark = if req.is_met() { "x" } else { " " };
        println!(
            "  [{mark}] {:<22} {:>16}  {:>3}%  {}",
            req.title,
            req.formatted_progress(),
            req.percent_complete(),
            req.key
        );
    }
    println!(
        "{}/{} requirements met ({:.0}% overall)",
        report.requirements_met,
        report.total_requirements,
        report.overall_progress * 100.0
    );
    Ok(())
}
