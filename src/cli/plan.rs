//! CLI handler for the `plan` subcommand
//!
//! Validates a brief and prints the document DAG in generation order.

use crate::brief::ProjectBrief;
use crate::cli::PlanArgs;
use crate::config::Config;
use crate::planner::{plan_project, DocumentPlan};
use tracing::info;

pub async fn execute(args: PlanArgs) -> anyhow::Result<()> {
    let config = Config::load_or_default(&args.config)?;
    config.validate()?;

    info!("Loading brief from {:?}", args.brief);
    let brief = ProjectBrief::load(&args.brief)?;
    let plan = plan_project(&brief, &config.planner)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &DocumentPlan) {
    let frameworks: Vec<&str> = plan.frameworks.iter().map(|f| f.as_str()).collect();
    println!("Project: {}", plan.project_id);
    if frameworks.is_empty() {
        println!("Frameworks: (none)");
    } else {
        println!("Frameworks: {}", frameworks.join(", "));
    }

    println!("\n┌─ Plan ({} documents) ───────────────────────────────────────────────┐", plan.len());
    for spec in &plan.specs {
        let deps: Vec<String> = spec
            .dependencies
            .iter()
            .map(|d| {
                let mut label = d.id.clone();
                if d.optional {
                    label.push('?');
                }
                label
            })
            .collect();
        let after = if deps.is_empty() {
            String::new()
        } else {
            format!(" (after {})", deps.join(", "))
        };
        let required = if spec.required { " *" } else { "" };
        println!(
            "│ {} {}{} [{}]{}",
            spec.id, spec.title, required, spec.document_type, after
        );
    }
    println!("└────────────────────────────────────────────────────────────────────┘");

    if !plan.success_criteria.is_empty() {
        println!("\nSuccess criteria:");
        for (index, criterion) in plan.success_criteria.iter().enumerate() {
            println!("  {} {}", criterion.id(index), criterion.description());
        }
    }

    let ready = plan.specs.iter().filter(|s| s.dependencies.is_empty()).count();
    println!("\n  {} ready, {} blocked", ready, plan.len() - ready);
}
