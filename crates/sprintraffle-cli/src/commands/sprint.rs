use clap::Subcommand;
use sprintraffle_core::sprint::Phase;
use sprintraffle_core::Sprint;

use super::format::sprint_summary;
use super::{block_on, print_events, print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum SprintAction {
    /// Show the current sprint
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the next scheduled sprint
    Next {
        #[arg(long)]
        json: bool,
    },
    /// Follow the countdown, one JSON tick per line
    Watch {
        /// Stop after this many ticks (default: until the sprint ends)
        #[arg(long)]
        ticks: Option<u64>,
    },
}

pub fn run(action: SprintAction) -> CliResult {
    let mut ctx = Context::open()?;
    block_on(execute(&mut ctx, action))?
}

async fn execute(ctx: &mut Context, action: SprintAction) -> CliResult {
    ctx.session.refresh_sprints(&ctx.api).await?;
    match action {
        SprintAction::Status { json } => status(ctx, json),
        SprintAction::Next { json } => next(ctx, json),
        SprintAction::Watch { ticks } => watch(ctx, ticks).await,
    }
}

fn status(ctx: &Context, json: bool) -> CliResult {
    if json {
        return print_json(&ctx.session.schedule().as_deref());
    }
    match ctx.session.current_sprint() {
        Some(sprint) => println!("{}", summary(ctx, &sprint)),
        None => println!("No active sprint"),
    }
    Ok(())
}

fn summary(ctx: &Context, sprint: &Sprint) -> String {
    sprint_summary(
        sprint,
        ctx.session.now(),
        ctx.session.locale(),
        ctx.config.announcement_delay(),
    )
}

fn next(ctx: &Context, json: bool) -> CliResult {
    let next = ctx.session.next_sprint();
    if json {
        return print_json(&next.as_deref());
    }
    match next {
        Some(sprint) => println!("{}", summary(ctx, &sprint)),
        None => println!("No upcoming sprint"),
    }
    Ok(())
}

async fn watch(ctx: &mut Context, ticks: Option<u64>) -> CliResult {
    if let Err(e) = ctx.session.sync_clock(&ctx.api).await {
        tracing::warn!(error = %e, "server time unavailable, using the local clock");
    }
    let mut ticker = ctx.session.ticker();
    let mut seen = 0;
    while let Some(_seq) = ticker.tick().await {
        print_events(&ctx.session.tick())?;
        seen += 1;
        let finished = match ctx.session.snapshot() {
            Some(snap) => snap.phase == Phase::Ended,
            None => true,
        };
        if finished || ticks.is_some_and(|limit| seen >= limit) {
            break;
        }
    }
    ticker.stop().await;
    Ok(())
}
