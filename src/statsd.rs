use std::{
	future::Future,
	net::{Ipv4Addr, Ipv6Addr, SocketAddr},
};

use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};

use crate::config::DatadogConfig;

/// Destination for converted measurements.
pub trait MetricSink {
	fn histogram(&mut self, name: &str, value: f64) -> impl Future<Output = Result<(), SinkError>> + Send;
}

#[derive(Error, Debug)]
pub enum SinkError {
	#[error("could not resolve statsd address {0}")]
	Resolve(String),
	#[error("statsd socket error: {0}")]
	Io(#[from] std::io::Error),
}

/// Sends DogStatsD histogram datagrams over UDP, one per measurement.
#[derive(Debug)]
pub struct StatsdSink {
	socket: UdpSocket,
	namespace: String,
}

impl StatsdSink {
	pub async fn connect(config: &DatadogConfig) -> Result<Self, SinkError> {
		let target = format!("{}:{}", config.host, config.port);
		let addr = lookup_host(target.as_str()).await?.next().ok_or_else(|| SinkError::Resolve(target.clone()))?;
		let bind = if addr.is_ipv4() { SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0) } else { SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0) };
		let socket = UdpSocket::bind(bind).await?;
		socket.connect(addr).await?;
		Ok(Self {
			socket,
			namespace: config.namespace.clone(),
		})
	}
}

impl MetricSink for StatsdSink {
	async fn histogram(&mut self, name: &str, value: f64) -> Result<(), SinkError> {
		self.socket.send(format_histogram(&self.namespace, name, value).as_bytes()).await?;
		Ok(())
	}
}

pub fn format_histogram(namespace: &str, name: &str, value: f64) -> String {
	if namespace.is_empty() {
		format!("{name}:{value}|h")
	} else {
		format!("{namespace}.{name}:{value}|h")
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use tokio::net::UdpSocket;

	use super::{format_histogram, MetricSink, SinkError, StatsdSink};
	use crate::config::DatadogConfig;

	#[rstest]
	#[case("ups", "BCHARGE", 99.0, "ups.BCHARGE:99|h")]
	#[case("ups", "BATTV", 26.8, "ups.BATTV:26.8|h")]
	#[case("", "TIMELEFT", 9432.0, "TIMELEFT:9432|h")]
	#[case("home.rack", "MAXTIME", 0.0, "home.rack.MAXTIME:0|h")]
	fn test_format_histogram(#[case] namespace: &str, #[case] name: &str, #[case] value: f64, #[case] expected: &str) {
		assert_eq!(format_histogram(namespace, name, value), expected);
	}

	#[tokio::test]
	async fn test_sends_datagram() -> Result<(), Box<dyn std::error::Error>> {
		let server = UdpSocket::bind("127.0.0.1:0").await?;
		let config = DatadogConfig {
			host: "127.0.0.1".into(),
			port: server.local_addr()?.port(),
			namespace: "ups".into(),
			watchlist: vec![],
		};
		let mut sink = StatsdSink::connect(&config).await?;
		sink.histogram("TIMELEFT", 9432.0).await?;

		let mut buf = [0u8; 512];
		let len = server.recv(&mut buf).await?;
		assert_eq!(&buf[..len], b"ups.TIMELEFT:9432|h");
		Ok(())
	}

	#[tokio::test]
	async fn test_unresolvable_host() {
		let config = DatadogConfig {
			host: "statsd.invalid".into(),
			..Default::default()
		};
		assert!(matches!(StatsdSink::connect(&config).await, Err(SinkError::Io(_) | SinkError::Resolve(_))));
	}
}
