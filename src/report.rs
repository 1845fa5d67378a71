//! Plain-text rendering of loan results.
//!
//! Money columns are shown in whole units with `,` thousands separators; the
//! headline payment and present value keep two decimals.

use crate::error::ReportError;
use crate::loan::{LoanTerms, ScheduleRow};
use chrono::{Months, NaiveDate};
use log::info;
use std::io::Write;

const DIVIDER_WIDTH: usize = 100;

/// Formats `value` with `decimals` fractional digits and `,` between each
/// group of three integer digits. Values that round to zero never carry a sign.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, frac) = match formatted.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(formatted.len() + whole.len() / 3 + 1);
    if value < 0. && formatted.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        grouped.push('-');
    }
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

pub fn schedule_header(with_inflation: bool, with_dates: bool) -> String {
    let mut header = String::new();
    if with_dates {
        header.push_str(&format!("{:>10} ", "Date"));
    }
    header.push_str(&format!(
        "{:>5} {:>12} {:>12} {:>12} {:>12}",
        "Month", "Payment", "Interest", "Principal", "Balance"
    ));
    if with_inflation {
        header.push_str(&format!(
            " {:>10} {:>12} {:>12} {:>12}",
            "Discount", "Pay.Real", "Int.Real", "Prin.Real"
        ));
    }
    header
}

pub fn format_row(row: &ScheduleRow, with_inflation: bool, date: Option<NaiveDate>) -> String {
    let mut line = String::new();
    if let Some(date) = date {
        line.push_str(&format!("{:>10} ", date.format("%Y-%m-%d")));
    }
    line.push_str(&format!(
        "{:>5} {:>12} {:>12} {:>12} {:>12}",
        row.month,
        group_thousands(row.payment, 0),
        group_thousands(row.interest, 0),
        group_thousands(row.principal, 0),
        group_thousands(row.balance, 0)
    ));
    if with_inflation {
        line.push_str(&format!(
            " {:>10.6} {:>12} {:>12} {:>12}",
            row.discount_factor,
            group_thousands(row.payment_real, 0),
            group_thousands(row.interest_real, 0),
            group_thousands(row.principal_real, 0)
        ));
    }
    line
}

/// Date of the `month`-th payment on a loan that starts on `start`. Each date
/// is counted from the start, so a loan starting on the 31st pays on the last
/// day of shorter months without drifting afterwards.
pub fn payment_date(start: NaiveDate, month: u32) -> Option<NaiveDate> {
    start.checked_add_months(Months::new(month))
}

/// A loan together with the presentation options chosen for it.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Report {
    pub terms: LoanTerms,
    pub inflation_rate: f64,
    pub start_date: Option<NaiveDate>,
}

impl Report {
    pub fn new(terms: LoanTerms, inflation_rate: f64) -> Self {
        Self {
            terms,
            inflation_rate,
            start_date: None,
        }
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn inflation_enabled(&self) -> bool {
        self.inflation_rate != 0.
    }

    /// Writes the monthly payment, plus the present value of all payments
    /// when inflation is enabled.
    pub fn write_summary<W: Write>(&self, out: &mut W) -> Result<(), ReportError> {
        let pmt_amount = self.terms.monthly_payment()?;
        writeln!(out, "Monthly payment: {:.2}", pmt_amount)?;

        if self.inflation_enabled() {
            let present_value = self.terms.schedule(self.inflation_rate)?.present_value();
            self.write_present_value(out, present_value)?;
        }
        Ok(())
    }

    /// Writes the full month-by-month schedule with a divider after every
    /// year, followed by the totals.
    pub fn write_schedule<W: Write>(&self, out: &mut W) -> Result<(), ReportError> {
        let schedule = self.terms.schedule(self.inflation_rate)?;
        let with_inflation = self.inflation_enabled();
        info!(
            "writing {} month schedule, inflation {}%",
            schedule.months(),
            self.inflation_rate
        );

        writeln!(out, "Monthly payment: {:.2}\n", schedule.pmt_amount())?;
        writeln!(
            out,
            "{}",
            schedule_header(with_inflation, self.start_date.is_some())
        )?;

        let mut total_paid = 0.;
        let mut total_interest = 0.;
        let mut present_value = 0.;
        for row in schedule {
            let date = self
                .start_date
                .map(|start| {
                    payment_date(start, row.month).ok_or(ReportError::DateOutOfRange {
                        start,
                        month: row.month,
                    })
                })
                .transpose()?;
            total_paid += row.payment;
            total_interest += row.interest;
            present_value += row.payment_real;

            writeln!(out, "{}", format_row(&row, with_inflation, date))?;
            if row.month % 12 == 0 {
                writeln!(out, "{}", "-".repeat(DIVIDER_WIDTH))?;
            }
        }

        writeln!(out)?;
        writeln!(out, "Total paid: {}", group_thousands(total_paid, 2))?;
        writeln!(out, "Total interest: {}", group_thousands(total_interest, 2))?;
        if with_inflation {
            self.write_present_value(out, present_value)?;
        }
        Ok(())
    }

    fn write_present_value<W: Write>(
        &self,
        out: &mut W,
        present_value: f64,
    ) -> Result<(), ReportError> {
        writeln!(
            out,
            "Present value of all payments at {:.2}% inflation: {:.2}",
            self.inflation_rate, present_value
        )?;
        Ok(())
    }
}
