//! Schema command

use stevedore_common::spec::DeploySpec;

pub fn run() -> anyhow::Result<()> {
    let schema = schemars::schema_for!(DeploySpec);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
