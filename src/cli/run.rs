use crate::brief::ProjectBrief;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::output::{project_report_dir, write_project_report};
use crate::pipeline::Pipeline;
use crate::provider::CommandGenerator;
use crate::validate::Severity;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    info!("Loading config from {:?}", args.config);
    let mut config = Config::load_or_default(&args.config)?;

    // Apply CLI overrides
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout_sec) = args.timeout_sec {
        config.timeout_sec = timeout_sec;
    }
    if let Some(report_dir) = args.report_dir {
        config.report_dir = report_dir;
    }
    config.validate()?;

    info!("Loading brief from {:?}", args.brief);
    let brief = ProjectBrief::load(&args.brief)?;

    let generator = Arc::new(CommandGenerator::from_config(
        &config.generator,
        config.generation_timeout(),
    ));
    let pipeline = Pipeline::new(config.clone(), generator);

    // Ctrl-C stops the run the same way the deadline does
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping outstanding generations");
            on_interrupt.cancel();
        }
    });

    let project = pipeline.run(&brief, cancel).await?;

    let report_dir = project_report_dir(&config.report_dir, &project.project_id);
    info!("Writing reports to {:?}", report_dir);
    let summary = write_project_report(&report_dir, &project)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&project)?);
    } else {
        let counts = project.counts();
        println!(
            "{}: {} ({} of {} documents generated), risk {}, coverage {:.0}%",
            project.project_id,
            project.overall_status,
            counts.generated,
            counts.total,
            project.risk_level,
            project.compliance_coverage * 100.0
        );
        println!(
            "  {} critical / {} warning issues, {} gaps",
            project.issue_count(Severity::Critical),
            project.issue_count(Severity::Warning),
            summary.gaps
        );
        println!("  Reports: {}", report_dir.display());
    }

    if args.fail_on_incomplete && !project.is_complete() {
        error!(
            "Exiting with error: project {} is {}",
            project.project_id, project.overall_status
        );
        std::process::exit(1);
    }

    Ok(())
}
