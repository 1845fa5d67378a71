use crate::error::{LoanError, Result};
use log::{debug, trace};
use std::{fmt, iter::FusedIterator};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const MONTHS_PER_YEAR: u32 = 12;

// balances closer to zero than this are reported as exactly zero
const BALANCE_EPSILON: f64 = 1e-8;

/// The inputs of a fixed-rate loan. Rates are annual percentages (5.5 means 5.5%).
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoanTerms {
    pub principal: f64,
    pub term_years: i32,
    pub annual_rate: f64,
}

impl LoanTerms {
    pub fn new(principal: f64, term_years: i32, annual_rate: f64) -> Self {
        Self {
            principal,
            term_years,
            annual_rate,
        }
    }

    /// Zero-interest terms: the principal is repaid in equal monthly parts.
    pub fn interest_free(principal: f64, term_years: i32) -> Self {
        Self::new(principal, term_years, 0.)
    }

    pub fn months(&self) -> Result<u32> {
        checked_months(self.term_years)
    }

    pub fn monthly_rate(&self) -> f64 {
        monthly_rate(self.annual_rate)
    }

    pub fn monthly_payment(&self) -> Result<f64> {
        monthly_payment(self.principal, self.term_years, self.annual_rate)
    }

    pub fn schedule(&self, inflation_rate: f64) -> Result<Schedule> {
        amortization_schedule(
            self.principal,
            self.term_years,
            self.annual_rate,
            inflation_rate,
        )
    }
}

/// One month of an amortization schedule, with nominal and present-value figures.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScheduleRow {
    pub month: u32,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub balance: f64,
    pub discount_factor: f64,
    pub payment_real: f64,
    pub interest_real: f64,
    pub principal_real: f64,
}

impl fmt::Display for ScheduleRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "month {}, payment ${:.4}, interest ${:.4}, principal ${:.4}, ending balance ${:.4}, discount {:.6}",
            self.month,
            self.payment,
            self.interest,
            self.principal,
            self.balance,
            self.discount_factor
        )
    }
}

/// Lazy month-by-month amortization of a loan.
///
/// The running balance lives in the iterator itself, so every call to
/// [`amortization_schedule`] starts a fresh, independent run. Once the final
/// month has been yielded the schedule is exhausted.
#[derive(Debug)]
pub struct Schedule {
    pmt_amount: f64,
    monthly_rate: f64,
    inflation_rate: f64,
    balance: f64,
    month: u32,
    months: u32,
}

impl Schedule {
    /// The constant monthly payment the schedule amortizes with.
    pub fn pmt_amount(&self) -> f64 {
        self.pmt_amount
    }

    /// Total number of months in the schedule, including those already yielded.
    pub fn months(&self) -> u32 {
        self.months
    }

    /// Consumes the remaining rows and sums their present-value payments.
    pub fn present_value(self) -> f64 {
        present_value(self)
    }
}

impl Iterator for Schedule {
    type Item = ScheduleRow;

    fn next(&mut self) -> Option<ScheduleRow> {
        if self.month >= self.months {
            return None;
        }
        self.month += 1;

        let interest = if self.monthly_rate == 0. {
            0.
        } else {
            self.balance * self.monthly_rate
        };
        let mut principal = self.pmt_amount - interest;

        // the last month pays off exactly what is left, whatever rounding has accumulated
        let payment = if principal > self.balance || self.month == self.months {
            principal = self.balance;
            interest + principal
        } else {
            self.pmt_amount
        };

        self.balance -= principal;
        if self.balance.abs() < BALANCE_EPSILON {
            self.balance = 0.;
        }

        let discount = discount_factor(self.inflation_rate, self.month);
        let row = ScheduleRow {
            month: self.month,
            payment,
            interest,
            principal,
            balance: self.balance,
            discount_factor: discount,
            payment_real: payment * discount,
            interest_real: interest * discount,
            principal_real: principal * discount,
        };
        trace!("{}", row);

        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.months - self.month) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Schedule {}

impl FusedIterator for Schedule {}

/// Fixed monthly payment that amortizes `principal` over `term_years` at
/// `annual_rate` percent.
///
/// With a zero rate the principal is simply split evenly across the months;
/// otherwise the standard annuity formula `P·r·(1+r)^n / ((1+r)^n − 1)` is used.
pub fn monthly_payment(principal: f64, term_years: i32, annual_rate: f64) -> Result<f64> {
    let months = checked_months(term_years)?;
    let rate = monthly_rate(annual_rate);

    let pmt_amount = if rate == 0. {
        principal / months as f64
    } else {
        let factor = (1. + rate).powf(months as f64);
        principal * rate * factor / (factor - 1.)
    };
    debug!(
        "principal {}, {} months at monthly rate {}: payment {}",
        principal, months, rate, pmt_amount
    );

    Ok(pmt_amount)
}

/// Month-by-month schedule for a loan, with each payment discounted to
/// present value at `inflation_rate` percent (continuous compounding).
///
/// An `inflation_rate` of zero leaves every discount factor at exactly 1.
pub fn amortization_schedule(
    principal: f64,
    term_years: i32,
    annual_rate: f64,
    inflation_rate: f64,
) -> Result<Schedule> {
    let months = checked_months(term_years)?;
    let pmt_amount = monthly_payment(principal, term_years, annual_rate)?;

    Ok(Schedule {
        pmt_amount,
        monthly_rate: monthly_rate(annual_rate),
        inflation_rate,
        balance: principal,
        month: 0,
        months,
    })
}

/// Sum of the present-value payments of `rows`.
pub fn present_value<I>(rows: I) -> f64
where
    I: IntoIterator<Item = ScheduleRow>,
{
    rows.into_iter().map(|row| row.payment_real).sum()
}

/// Present-value factor for a payment made at the end of `month`.
pub fn discount_factor(inflation_rate: f64, month: u32) -> f64 {
    if inflation_rate == 0. {
        1.
    } else {
        (-(inflation_rate / 100.) * (month as f64 / MONTHS_PER_YEAR as f64)).exp()
    }
}

fn monthly_rate(annual_rate: f64) -> f64 {
    (annual_rate / 100.) / MONTHS_PER_YEAR as f64
}

fn checked_months(term_years: i32) -> Result<u32> {
    if term_years <= 0 {
        return Err(LoanError::InvalidTerm { term_years });
    }
    (term_years as u32)
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or(LoanError::TermTooLong { term_years })
}


#[cfg(test)]
mod property_tests {
    use super::{amortization_schedule, discount_factor, monthly_payment};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn principal_strategy() -> impl Strategy<Value = f64> {
        1.0..1e7
    }

    fn years_strategy() -> impl Strategy<Value = i32> {
        1..=100
    }

    // positive rates start at 0.01%: below ~1e-14% the monthly factor rounds to exactly 1
    fn rate_strategy() -> impl Strategy<Value = f64> {
        prop_oneof![Just(0.), 0.01..20.0]
    }

    // non-zero inflation, far enough from zero that monthly factors stay distinguishable
    fn inflation_strategy() -> impl Strategy<Value = f64> {
        prop_oneof![-10.0..-0.01, 0.01..10.0]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn test_zero_rate_payment_is_straight_line(
            principal in principal_strategy(),
            years in years_strategy()
        ) {
            let pmt_amount = monthly_payment(principal, years, 0.).unwrap();
            prop_assert_eq!(pmt_amount, principal / (years * 12) as f64);
        }

        #[test]
        fn test_schedule_repays_principal(
            principal in principal_strategy(),
            years in years_strategy(),
            rate in rate_strategy()
        ) {
            let sched: Vec<_> = amortization_schedule(principal, years, rate, 0.)
                .unwrap()
                .collect();
            prop_assert_eq!(sched.len(), years as usize * 12);

            let total: f64 = sched.iter().map(|row| row.principal).sum();
            assert_relative_eq!(total, principal, epsilon = 1e-6, max_relative = 1e-12);

            for pair in sched.windows(2) {
                prop_assert!(pair[1].balance <= pair[0].balance);
            }

            let last = sched.last().unwrap();
            prop_assert_eq!(last.balance, 0.);
            prop_assert_eq!(last.payment, last.interest + last.principal);
        }

        #[test]
        fn test_no_inflation_keeps_nominal_values(
            principal in principal_strategy(),
            years in years_strategy(),
            rate in rate_strategy()
        ) {
            for row in amortization_schedule(principal, years, rate, 0.).unwrap() {
                prop_assert_eq!(row.discount_factor, 1.);
                prop_assert_eq!(row.payment_real, row.payment);
                prop_assert_eq!(row.interest_real, row.interest);
                prop_assert_eq!(row.principal_real, row.principal);
            }
        }

        #[test]
        fn test_discount_is_continuous_and_monotone(
            principal in principal_strategy(),
            years in years_strategy(),
            rate in rate_strategy(),
            inflation in inflation_strategy()
        ) {
            let sched: Vec<_> = amortization_schedule(principal, years, rate, inflation)
                .unwrap()
                .collect();

            for row in &sched {
                let expected = (-(inflation / 100.) * (row.month as f64 / 12.)).exp();
                assert_relative_eq!(row.discount_factor, expected, max_relative = 1e-12);
                prop_assert_eq!(row.discount_factor, discount_factor(inflation, row.month));
                prop_assert_eq!(row.payment_real, row.payment * row.discount_factor);
            }
            for pair in sched.windows(2) {
                if inflation > 0. {
                    prop_assert!(pair[1].discount_factor < pair[0].discount_factor);
                } else {
                    prop_assert!(pair[1].discount_factor > pair[0].discount_factor);
                }
            }
            prop_assert_eq!(sched.last().unwrap().balance, 0.);
        }
    }
}
