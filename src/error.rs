use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum LoanError {
    #[error("term must be a positive number of years, got {term_years}")]
    InvalidTerm { term_years: i32 },

    #[error("term of {term_years} years has more months than can be scheduled")]
    TermTooLong { term_years: i32 },
}

pub type Result<T> = std::result::Result<T, LoanError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Loan(#[from] LoanError),

    #[error("no payment date exists {month} months after {start}")]
    DateOutOfRange {
        start: chrono::NaiveDate,
        month: u32,
    },

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}
