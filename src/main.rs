use std::env;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
	config::Config,
	normalize::Normalizer,
	reporter::Reporter,
	source::CommandSource,
	statsd::StatsdSink,
};

mod config;
mod normalize;
mod reporter;
mod snapshot;
mod source;
mod statsd;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_owned());
	let config = Config::load(&config_path)?;

	let normalizer = Normalizer::new(config.datadog_config.watchlist.iter().cloned());
	for (field, rule) in normalizer.watched() {
		if !rule.is_numeric() {
			info!("{field} has no numeric conversion, it is watched as pass-through and never emitted");
		}
	}

	let sink = StatsdSink::connect(&config.datadog_config).await?;
	info!(
		"reporting to statsd at {}:{} under namespace \"{}\" every {}s",
		config.datadog_config.host, config.datadog_config.port, config.datadog_config.namespace, config.poll.interval_secs
	);

	let mut reporter = Reporter::new(CommandSource::from(&config.poll), sink, normalizer, config.poll.timeout());
	reporter
		.run(config.poll.interval(), async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				error!("cannot listen for ctrl-c, running until killed: {e}");
				std::future::pending::<()>().await
			}
		})
		.await;

	Ok(())
}
