//! One function per subcommand. Each writes its human-readable output to
//! the given writer and leaves logging to `tracing`.

pub mod expenses;
pub mod tax;
pub mod vehicles;

use std::io::Write;

use anyhow::Result;

use crate::app::App;
use crate::cli::{Command, ExpensesCommand, TaxCommand, VehiclesCommand};

pub async fn run(
    app: &App,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Vehicles(VehiclesCommand::Import { file }) => {
            vehicles::import(app, &file, out).await
        }
        Command::Tax(cmd) => match cmd {
            TaxCommand::Search { query } => tax::search(app, &query, out).await,
            TaxCommand::Available => tax::available(app, out).await,
            TaxCommand::Compute(args) => tax::compute(app, &args, out).await,
            TaxCommand::Show { chassis } => tax::show(app, &chassis, out).await,
            TaxCommand::Delete { chassis } => tax::delete(app, &chassis, out).await,
            TaxCommand::Invoice { chassis } => tax::invoice(app, &chassis, out).await,
        },
        Command::Expenses(args) => {
            let user = expenses::user(&args);
            match args.command {
                ExpensesCommand::Add {
                    description,
                    amount,
                    date,
                } => expenses::add(app, &user, date, &description, &amount, out).await,
                ExpensesCommand::Today { date } => expenses::day(app, &user, date, out).await,
                ExpensesCommand::Delete { id } => expenses::delete(app, id, out).await,
                ExpensesCommand::Report { year, month } => {
                    expenses::report(app, &user, year, month, out).await
                }
            }
        }
    }
}
