use clap::Parser;
use client::input::SimulatedInput;
use client::network::Client;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(short = 'H', long, default_value = shared::DEFAULT_HOST)]
    host: String,

    /// Server port to connect to
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Input send rate (MOVE messages per second)
    #[arg(short, long, default_value_t = shared::DEFAULT_INPUT_RATE,
          value_parser = clap::value_parser!(u32).range(1..))]
    input_rate: u32,

    /// Delay between reconnection attempts, in seconds
    #[arg(short, long, default_value_t = shared::DEFAULT_RECONNECT_DELAY_SECS)]
    reconnect_delay: u64,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();
    let server_addr = format!("{}:{}", args.host, args.port);

    info!("starting client against {server_addr}");

    let mut client = Client::new(
        server_addr,
        Box::new(SimulatedInput::new()),
        args.input_rate,
        Duration::from_secs(args.reconnect_delay),
    );
    client.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_input_rate_is_rejected() {
        assert!(Args::try_parse_from(["client", "--input-rate", "0"]).is_err());
    }

    #[test]
    fn test_defaults_parse() {
        let args = Args::try_parse_from(["client"]).unwrap();
        assert_eq!(args.input_rate, shared::DEFAULT_INPUT_RATE);
        assert_eq!(args.reconnect_delay, shared::DEFAULT_RECONNECT_DELAY_SECS);
    }
}
