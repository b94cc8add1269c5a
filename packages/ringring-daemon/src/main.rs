mod daemon;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ringring-daemon",
    about = "Device-control daemon for the ringring rotary SIP handset"
)]
struct Cli {
    #[command(flatten)]
    daemon: daemon::DaemonArgs,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    daemon::run(cli.daemon).await;
}
