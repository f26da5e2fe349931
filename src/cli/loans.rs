use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{KhataError, Result};
use crate::fmt::money;
use crate::loans;
use crate::models::{InterestMode, LoanKind};

pub fn add(
    person: &str,
    loan_type: &str,
    principal: f64,
    rate: f64,
    start: &str,
    notes: Option<&str>,
) -> Result<()> {
    let mut conn = super::open_authed()?;
    let loan = loans::create_loan(
        &mut conn,
        person,
        LoanKind::parse(loan_type)?,
        principal,
        rate,
        start,
        notes,
    )?;
    println!(
        "Recorded loan #{}: {} {} {} at {}% from {}",
        loan.id,
        money(loan.principal),
        loan.kind.as_str(),
        loan.person_name,
        loan.interest_rate,
        loan.start_date
    );
    Ok(())
}

pub fn list(loan_type: Option<&str>) -> Result<()> {
    let conn = super::open_authed()?;
    let kind = loan_type.map(LoanKind::parse).transpose()?;
    let all = loans::list_loans(&conn, kind)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Person", "Type", "Principal", "Repaid", "Outstanding", "Rate", "Since"]);
    for loan in &all {
        table.add_row(vec![
            Cell::new(loan.id),
            Cell::new(&loan.person_name),
            Cell::new(loan.kind.as_str()),
            Cell::new(money(loan.principal)),
            Cell::new(money(loan.total_repaid)),
            Cell::new(money(loan.outstanding())),
            Cell::new(format!("{}%", loan.interest_rate)),
            Cell::new(&loan.start_date),
        ]);
    }
    println!("Loans\n{table}");
    Ok(())
}

pub fn repay(id: i64, amount: f64, date: &str, interest: bool) -> Result<()> {
    let mut conn = super::open_authed()?;
    let loan = loans::record_repayment(&mut conn, id, amount, date, interest)?;
    if interest {
        println!(
            "Recorded interest payment of {} — interest paid so far {}",
            money(amount),
            money(loan.interest_paid)
        );
    } else {
        println!(
            "Recorded repayment of {} — outstanding {}",
            money(amount),
            money(loan.outstanding())
        );
        if loan.total_repaid > loan.principal {
            println!(
                "{} repaid {} exceeds the principal {}",
                "warning:".yellow(),
                money(loan.total_repaid),
                money(loan.principal)
            );
        }
    }
    Ok(())
}

pub fn interest(id: i64, as_of: Option<&str>, mode: &str) -> Result<()> {
    let conn = super::open_authed()?;
    let loan = loans::get_loan(&conn, id)?;
    let mode = InterestMode::parse(mode)?;
    let as_of = match as_of {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|_| KhataError::Validation(format!("Invalid date '{d}', expected YYYY-MM-DD")))?,
        None => chrono::Local::now().date_naive(),
    };
    let summary = loans::interest_summary(&loan, as_of, mode)?;

    println!("Loan #{} — {} ({})", loan.id, loan.person_name, loan.kind.as_str());
    println!("  principal:    {}", money(summary.principal));
    println!("  outstanding:  {}", money(summary.outstanding_principal));
    println!("  rate:         {}% ({mode:?})", summary.interest_rate);
    println!("  days elapsed: {}", summary.days_elapsed);
    println!("  accrued:      {}", money(summary.accrued_interest));
    println!("  interest paid:{}", money(summary.interest_paid));
    println!("  interest due: {}", money(summary.interest_due));
    println!("  total due:    {}", money(summary.total_due));

    let repayments = loans::list_repayments(&conn, loan.id)?;
    if !repayments.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Amount", "Against"]);
        for repayment in &repayments {
            table.add_row(vec![
                Cell::new(&repayment.date),
                Cell::new(money(repayment.amount)),
                Cell::new(if repayment.is_interest { "interest" } else { "principal" }),
            ]);
        }
        println!("\nRepayments\n{table}");
    }
    Ok(())
}

pub fn update(
    id: i64,
    person: Option<&str>,
    principal: Option<f64>,
    rate: Option<f64>,
    notes: Option<&str>,
) -> Result<()> {
    let mut conn = super::open_authed()?;
    let loan = loans::update_loan(
        &mut conn,
        id,
        loans::LoanPatch {
            person_name: person.map(str::to_string),
            principal,
            interest_rate: rate,
            notes: notes.map(str::to_string),
        },
    )?;
    println!("Updated loan #{}: {} {}", loan.id, loan.person_name, money(loan.principal));
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let mut conn = super::open_authed()?;
    loans::delete_loan(&mut conn, id)?;
    println!("Deleted loan #{id} and its linked account.");
    Ok(())
}
