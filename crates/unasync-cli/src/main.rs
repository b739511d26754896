use anyhow::Result;
use unasync_cli::{command, render_summary, run, Options};
use unasync_core::init_tracing;

fn main() -> Result<()> {
    let matches = command().get_matches();
    let options = Options::from_matches(&matches)?;

    // Initialize logging
    init_tracing(options.verbose);

    let summary = run(&options)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", render_summary(&summary));
    }

    Ok(())
}
