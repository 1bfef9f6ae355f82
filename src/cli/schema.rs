use crate::brief::ProjectBrief;
use crate::cli::{SchemaArgs, SchemaTarget};
use crate::config::Config;
use schemars::schema_for;

pub fn execute(args: SchemaArgs) -> anyhow::Result<()> {
    let schema = match args.target {
        SchemaTarget::Config => schema_for!(Config),
        SchemaTarget::Brief => schema_for!(ProjectBrief),
    };
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{}", json);
    Ok(())
}
