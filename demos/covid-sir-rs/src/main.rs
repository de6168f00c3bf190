pub mod output;
pub mod parameters;
pub mod scenario;

use anyhow::Context;
use sir::Environment;

use parameters::ScenarioConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let env = Environment::from_stdin().context("failed to read the run document")?;

    // Reference scenario, overridden by the scenario file and then the input section
    let config = ScenarioConfig::resolve(&env).context("invalid scenario input")?;
    config.warn_outside_reference_ranges();

    let results = scenario::run(&config).context("simulation failed")?;

    output::write(&env, &config, &results).context("failed to write outputs")?;
    Ok(())
}
