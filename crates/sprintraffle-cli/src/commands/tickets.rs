use clap::Subcommand;

use super::{block_on, print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum TicketsAction {
    /// Show confirmed tickets, multiplier and ad views
    Show {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: TicketsAction) -> CliResult {
    let mut ctx = Context::open()?;
    match action {
        TicketsAction::Show { json } => {
            block_on(ctx.session.refresh_tickets(&ctx.api))??;
            let view = ctx.session.tickets();
            if json {
                print_json(&view)?;
            } else {
                println!("Tickets: {}", view.my_tickets);
                println!("Multiplier: x{}", view.multiplier);
                println!("Ad views: {}", view.ad_views);
                println!("Effective tickets: {}", view.effective_tickets);
            }
        }
    }
    Ok(())
}
