use r_radiocli::commentary::{CommentaryPlayer, VirtualChannel};
use r_radiocli::config::Settings;
use r_radiocli::device::{spawn_state_watcher, PlaybackDevice, SimulatedDevice, WebApiDevice};
use r_radiocli::init_app_dirs;
use r_radiocli::radio::{self, Phase, Radio, RadioCommand, RadioStateUpdate};
use r_radiocli::speech::ConsoleSpeech;
use r_radiocli::ui::{read_plan, Cli};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Instrument};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Parse command-line arguments and initialize CLI
    let cli = Cli::new();
    let args = &cli.args;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "r_radiocli=info".into()))
        .with(args.log_json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!args.log_json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();

    // Load configuration from file or create default
    let config_path = args.config_path();
    if args.config.is_none() {
        init_app_dirs()?;
    }
    let mut settings = Settings::load(&config_path)?;
    args.apply_to(&mut settings);
    settings.validate()?;

    let plan = read_plan(&args.plan, args.tracks.as_deref())?;
    cli.display_plan(&plan);

    let device: Arc<dyn PlaybackDevice> = if args.dry_run {
        info!("Dry run: using the simulated device.");
        Arc::new(SimulatedDevice::new())
    } else {
        let (device_id, session) = settings.device_credentials()?;
        Arc::new(WebApiDevice::new(&settings.api_base_url, &device_id, session)?)
    };

    let commentary = CommentaryPlayer::new(
        Arc::new(ConsoleSpeech::new(settings.words_per_minute)),
        Arc::new(VirtualChannel::new()),
        settings.fade,
        settings.voice.clone(),
    );

    let show_id = Uuid::new_v4();
    let span = tracing::info_span!("show", %show_id);

    let (mut radio, commands) = Radio::new(device.clone(), commentary, settings.radio_options());
    let mut updates = radio.subscribe_state_updates();
    let radio_task = tokio::spawn(async move { radio.run().await }.instrument(span));
    let watcher = spawn_state_watcher(device, settings.state_poll_interval(), commands.clone());

    radio::load_plan(&commands, plan).await?;

    let mut exit_error: Option<String> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping the show...");
                let _ = commands.send(RadioCommand::Cancel).await;
                break;
            }
            update = updates.recv() => match update {
                Ok(update) => {
                    cli.display_update(&update);
                    match update {
                        RadioStateUpdate::PhaseChanged { phase: Phase::Finished, .. } => break,
                        RadioStateUpdate::PhaseChanged { phase: Phase::Failed | Phase::Idle, .. } => {
                            exit_error.get_or_insert_with(|| "the show stopped early".to_string());
                            break;
                        }
                        RadioStateUpdate::Error(message) => exit_error = Some(message),
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} state updates.", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    }

    watcher.abort();
    let _ = commands.send(RadioCommand::Shutdown).await;
    radio_task.await?;

    match exit_error {
        Some(message) => Err(message.into()),
        None => {
            println!("That's the show. Thanks for listening!");
            Ok(())
        }
    }
}
