mod auth;
mod categories;
mod cli;
mod db;
mod error;
mod exporter;
mod fmt;
mod importer;
mod ledger;
mod loans;
mod models;
mod reports;
mod settings;
mod tagger;
mod transactions;

use clap::Parser;

use cli::{
    AccountsCommands, CategoriesCommands, Cli, Commands, ExportCommands, ImportCommands,
    LoansCommands, PatternsCommands, ReportCommands, TxCommands,
};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Setup => cli::auth::setup(),
        Commands::Login => cli::auth::login(),
        Commands::Logout => cli::auth::logout(),
        Commands::Passwd => cli::auth::passwd(),
        Commands::Reset { yes } => cli::auth::reset(yes),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                name,
                category,
                kind,
                opening,
                person,
                description,
            } => cli::accounts::add(
                &name,
                &category,
                kind.as_deref(),
                opening,
                person.as_deref(),
                description.as_deref(),
            ),
            AccountsCommands::List { kind, category } => {
                cli::accounts::list(kind.as_deref(), category.as_deref())
            }
            AccountsCommands::Show { name } => cli::accounts::show(&name),
            AccountsCommands::Update {
                name,
                new_name,
                opening,
                description,
            } => cli::accounts::update(&name, new_name.as_deref(), opening, description.as_deref()),
            AccountsCommands::Delete { name } => cli::accounts::delete(&name),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::Add { name, kind, parent } => {
                cli::categories::add(&name, &kind, parent.as_deref())
            }
            CategoriesCommands::List { kind } => cli::categories::list(kind.as_deref()),
            CategoriesCommands::Delete { name } => cli::categories::delete(&name),
        },
        Commands::Tx { command } => match command {
            TxCommands::Add {
                date,
                description,
                amount,
                account,
                kind,
                category,
                loan,
                reference,
                notes,
            } => cli::tx::add(
                &date,
                &description,
                amount,
                &account,
                &kind,
                category.as_deref(),
                loan,
                reference.as_deref(),
                notes.as_deref(),
            ),
            TxCommands::List {
                account,
                category,
                kind,
                from_date,
                to_date,
                untagged,
                search,
                limit,
            } => cli::tx::list(
                account.as_deref(),
                category.as_deref(),
                kind.as_deref(),
                from_date.as_deref(),
                to_date.as_deref(),
                untagged,
                search.as_deref(),
                limit,
            ),
            TxCommands::Edit {
                id,
                date,
                description,
                amount,
                kind,
                account,
                category,
                notes,
            } => cli::tx::edit(
                id,
                date.as_deref(),
                description.as_deref(),
                amount,
                kind.as_deref(),
                account.as_deref(),
                category.as_deref(),
                notes.as_deref(),
            ),
            TxCommands::Delete { id } => cli::tx::delete(id),
            TxCommands::Transfer {
                date,
                description,
                amount,
                from,
                to,
                notes,
            } => cli::tx::transfer(&date, &description, amount, &from, &to, notes.as_deref()),
            TxCommands::BulkTag { category, ids } => cli::tx::bulk_tag(&category, &ids),
        },
        Commands::Import { command } => match command {
            ImportCommands::Parse { file, out } => cli::import::parse(&file, out.as_deref()),
            ImportCommands::Commit { file, account } => cli::import::commit(&file, &account),
        },
        Commands::Loans { command } => match command {
            LoansCommands::Add {
                person,
                loan_type,
                principal,
                rate,
                start,
                notes,
            } => cli::loans::add(&person, &loan_type, principal, rate, &start, notes.as_deref()),
            LoansCommands::List { loan_type } => cli::loans::list(loan_type.as_deref()),
            LoansCommands::Repay {
                id,
                amount,
                date,
                interest,
            } => cli::loans::repay(id, amount, &date, interest),
            LoansCommands::Interest { id, as_of, mode } => {
                cli::loans::interest(id, as_of.as_deref(), &mode)
            }
            LoansCommands::Update {
                id,
                person,
                principal,
                rate,
                notes,
            } => cli::loans::update(id, person.as_deref(), principal, rate, notes.as_deref()),
            LoansCommands::Delete { id } => cli::loans::delete(id),
        },
        Commands::Report { command } => match command {
            ReportCommands::Dashboard { recent } => cli::report::dashboard(recent),
            ReportCommands::BalanceSheet => cli::report::balance_sheet(),
            ReportCommands::IncomeExpense { from_date, to_date } => {
                cli::report::income_expense(from_date.as_deref(), to_date.as_deref())
            }
            ReportCommands::Category {
                name,
                from_date,
                to_date,
            } => cli::report::category(&name, from_date.as_deref(), to_date.as_deref()),
        },
        Commands::Export { command } => match command {
            ExportCommands::Transactions {
                out,
                from_date,
                to_date,
            } => cli::export::transactions(&out, from_date.as_deref(), to_date.as_deref()),
            ExportCommands::BalanceSheet { out } => cli::export::balance_sheet(&out),
        },
        Commands::Patterns { command } => match command {
            PatternsCommands::List => cli::patterns::list(),
            PatternsCommands::Delete { id } => cli::patterns::delete(id),
        },
        Commands::Doctor => cli::doctor::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
