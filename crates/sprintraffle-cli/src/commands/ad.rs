use clap::Subcommand;
use uuid::Uuid;

use super::{block_on, print_events, print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum AdAction {
    /// Report a finished ad playback for the current sprint
    View {
        /// Ad ID
        #[arg(long)]
        ad: String,
        /// Seconds watched
        #[arg(long)]
        duration: u64,
        /// Idempotency key; generated when omitted
        #[arg(long)]
        request_id: Option<Uuid>,
    },
    /// Pick the next ad to play during the current sprint
    Next {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: AdAction) -> CliResult {
    let mut ctx = Context::open()?;
    match action {
        AdAction::View {
            ad,
            duration,
            request_id,
        } => {
            let events = block_on(async {
                ctx.session.refresh_sprints(&ctx.api).await?;
                ctx.session.refresh_tickets(&ctx.api).await?;
                ctx.session
                    .record_ad_view(&ctx.api, &ad, duration, request_id)
                    .await
            })??;
            print_events(&events)?;
        }
        AdAction::Next { json } => {
            let ad = block_on(async {
                ctx.session.refresh_sprints(&ctx.api).await?;
                ctx.session.next_ad(&ctx.api).await
            })??;
            if json {
                return print_json(&ad);
            }
            match ad {
                Some(ad) => println!(
                    "{} {} ({}s) {}",
                    ad.id,
                    ad.title,
                    ad.duration,
                    ad.video_url.as_deref().unwrap_or("")
                ),
                None => println!("No playable ad"),
            }
        }
    }
    Ok(())
}
