use std::sync::Arc;

use anyhow::{bail, Context, Result};
use morse_tone::{
    audio::CpalBackend,
    config::Settings,
    playback::{PlaybackController, PlaybackState},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod args;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let matches = args::parse_args();
    let Some((command, m)) = matches.subcommand() else {
        bail!("Missing subcommand");
    };

    let settings = Settings::from_args(m);
    let text = args::text(m);

    match command {
        "encode" => println!("{}", settings.transcoder().encode(&text)),
        "decode" => {
            let decoded = settings
                .transcoder()
                .decode(&text)
                .context("Failed to decode message")?;
            println!("{decoded}");
        }
        "schedule" => {
            let line = settings.transcoder().encode(&text);
            let schedule = settings.scheduler()?.build(&line)?;
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
        "play" => play(&settings, &text)?,
        _ => bail!("Invalid subcommand `{command}`"),
    }

    Ok(())
}

fn play(settings: &Settings, text: &str) -> Result<()> {
    let line = settings.transcoder().encode(text);
    let timing = settings.timing()?;
    let schedule = settings.scheduler()?.build(&line)?;

    let backend = CpalBackend::new(settings.device.as_str(), settings.gain);
    let controller = PlaybackController::new(Arc::new(backend));
    let states = controller.subscribe();

    controller
        .play(&schedule)
        .context("Failed to start playback")?;
    info!(
        "Sending `{line}` at {:.1} WPM ({:.0} ms)",
        timing.wpm(),
        schedule.total_duration_ms()
    );

    for state in states.iter() {
        if state == PlaybackState::Idle {
            break;
        }
    }

    Ok(())
}
