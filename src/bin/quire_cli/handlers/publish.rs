#![deny(clippy::all, clippy::pedantic)]

use crate::args::PublishArgs;
use crate::client::{CliError, Ctx};
use crate::io::parse_time_opt;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, args: PublishArgs) -> Result<(), CliError> {
    let published_at = parse_time_opt(args.at)?;
    let response = ctx.publisher()?.publish(&args.id, published_at).await?;
    if let Some(warning) = &response.warning {
        eprintln!("warning: {warning}");
    }
    print_json(&response)
}
