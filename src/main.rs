use anyhow::Context;
use milestone_closer::{cli, config, logging, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let args = match cli::parser::parse_args(&args) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };

    logging::init(args.log_json)?;

    let file_values = match &args.config {
        Some(path) => config::load_config_file(path)?,
        None => Default::default(),
    };
    let values = config::update_config(&file_values, &args.config_values());
    let config = config::Config::from_values(&values).context("Invalid configuration")?;

    let today = chrono::Local::now().date_naive();
    let report = run::run(&config, today, None).await?;

    if report.failed().next().is_some() {
        anyhow::bail!(
            "{} milestone(s) could not be processed",
            report.failed().count()
        );
    }
    Ok(())
}
