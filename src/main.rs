use chrono::NaiveDate;
use clap::Parser;
use log::{warn, LevelFilter};
use mortgage::loan::LoanTerms;
use mortgage::report::Report;
use simple_logger::SimpleLogger;
use std::{error::Error, io, process};

/// Fixed-rate mortgage calculator with optional amortization schedule and
/// inflation adjustment
#[derive(Parser, Debug)]
#[command(name = "mortgage", version, about, allow_negative_numbers = true)]
struct Cli {
    /// Loan amount (e.g. 300000)
    loan: f64,

    /// Term in years (e.g. 30)
    years: i32,

    /// Annual interest rate in percent (e.g. 6.5)
    #[arg(long, default_value_t = 0.)]
    rate: f64,

    /// Print the month-by-month amortization schedule
    #[arg(long)]
    schedule: bool,

    /// Annual inflation rate in percent (e.g. 3.5); payments are discounted to
    /// present value using continuous compounding
    #[arg(long, default_value_t = 0.)]
    inflation: f64,

    /// Loan start date (YYYY-MM-DD); labels each scheduled payment with its date
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Log more detail (-v for info, -vv for trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    SimpleLogger::new()
        .with_level(log_level(cli.verbose))
        .env()
        .init()?;

    if cli.loan <= 0. {
        warn!("loan amount {} is not positive", cli.loan);
    }
    if cli.rate < 0. {
        warn!("negative interest rate {}%", cli.rate);
    }

    let mut report = Report::new(LoanTerms::new(cli.loan, cli.years, cli.rate), cli.inflation);
    if let Some(start) = cli.start {
        report = report.with_start_date(start);
    }

    let mut out = io::stdout().lock();
    if cli.schedule {
        report.write_schedule(&mut out)?;
    } else {
        report.write_summary(&mut out)?;
    }
    Ok(())
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

// compiles only for types that are Send + Sync + Unpin
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<mortgage::loan::ScheduleRow>();
    is_normal::<mortgage::loan::Schedule>();
    is_normal::<LoanTerms>();
    is_normal::<Report>();
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}

#[test]
fn parse_args() {
    let cli = Cli::try_parse_from([
        "mortgage",
        "300000",
        "30",
        "--rate",
        "5.5",
        "--schedule",
        "--inflation",
        "3.5",
        "--start",
        "2024-03-01",
        "-vv",
    ])
    .unwrap();
    assert_eq!(cli.loan, 300000.);
    assert_eq!(cli.years, 30);
    assert_eq!(cli.rate, 5.5);
    assert!(cli.schedule);
    assert_eq!(cli.inflation, 3.5);
    assert_eq!(cli.start, NaiveDate::from_ymd_opt(2024, 3, 1));
    assert_eq!(log_level(cli.verbose), LevelFilter::Debug);

    let cli = Cli::try_parse_from(["mortgage", "300000", "-5"]).unwrap();
    assert_eq!(cli.years, -5);
    assert_eq!(cli.rate, 0.);
    assert!(!cli.schedule);
    assert_eq!(cli.start, None);

    assert!(Cli::try_parse_from(["mortgage", "300000"]).is_err());
    assert!(Cli::try_parse_from(["mortgage", "300000", "30", "--start", "March"]).is_err());
}
