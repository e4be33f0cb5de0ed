use anyhow::Result;
use clap::Parser;
use std::io;
use tablechart::cli::Args;
use tablechart::source::DataSource;
use tablechart::{build_chart, output, ChartError};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // Logs share stderr with the user-facing message, so stay quiet unless asked
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(err) = run(&args) {
        match err.downcast_ref::<ChartError>() {
            Some(chart_err) => eprint!("{}", chart_err),
            None => eprint!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let request = args.to_request();

    let piped = if args.data.is_none() {
        DataSource::read_piped_stdin()?
    } else {
        None
    };
    let source = DataSource::select(args.data.as_deref(), piped)?;
    let table = source.load()?;

    let chart = build_chart(&request, table)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::emit(&chart, &request.output, &mut handle)?;

    Ok(())
}
