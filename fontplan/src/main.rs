use std::io::Write;

use clap::Parser;
use fontplan::{clean, run, Cli, Command, Error};
use log::{error, warn};

fn main() -> Result<(), Error> {
    env_logger::builder()
        .format(|buf, record| {
            let ts = buf.timestamp_micros();
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{}: {:?}: {style}{}{style:#}: {}",
                ts,
                std::thread::current().id(),
                record.level(),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();
    let report = match cli.command {
        Command::Clean(args) => return clean(&args),
        Command::Build(args) => run(&args)?,
    };

    for (target, e) in report.failed.iter() {
        error!("{target} failed: {e}");
    }
    for target in report.skipped.iter() {
        warn!("{target} was not started");
    }
    if report.is_success() {
        return Ok(());
    }
    Err(Error::TargetsFailed {
        failed: report.failed.len(),
        total: report.built.len() + report.failed.len() + report.skipped.len(),
    })
}
