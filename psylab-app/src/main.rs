mod app;
mod args;
mod keys;
mod task;

use anyhow::{Context, Result};
use app::App;
use args::{Args, Command, DATA_DIR_ENV, TaskKind, USAGE};
use chrono::Local;
use psylab_experiment::{
    ExperimentError, PreferenceStateMachine, RotationStateMachine, TaskConfig,
};
use psylab_report::{SessionPaths, date_stamp};
use psylab_timing::HighPrecisionTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use task::{PreferenceTask, RotationTask};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "psylab=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = match Args::parse(std::env::args().skip(1), std::env::var(DATA_DIR_ENV).ok()) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e:#}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => TaskConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => TaskConfig::default(),
    };
    let date = date_stamp(&Local::now());
    tracing::info!(
        participant = %args.participant,
        name = args.name.as_deref().unwrap_or(""),
        date = %date,
        "session"
    );

    match args.task {
        TaskKind::Rotation => {
            let mut rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let machine = RotationStateMachine::new(config.rotation, HighPrecisionTimer::new(), &mut rng)?;
            let paths = SessionPaths::rotation(&args.data_dir, &args.participant, &date);
            paths.ensure_dir()?;
            tracing::info!(
                practice = machine.practice_trials().len(),
                main = machine.main_trials().len(),
                output = %paths.base().display(),
                "rotation task ready"
            );
            App::new(RotationTask::new(machine, paths), args.fullscreen).run()
        }
        TaskKind::Preference => {
            let pref = config.preference;
            match pref.check_images() {
                Ok(()) => {}
                Err(ExperimentError::MissingImage(missing)) => {
                    tracing::error!(?missing, "choice images not found");
                    println!(
                        "Place {} and {} in the working directory",
                        pref.left_image.display(),
                        pref.right_image.display()
                    );
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
            let paths = SessionPaths::preference(&args.data_dir, &args.participant, &date);
            paths.ensure_dir()?;
            let machine = PreferenceStateMachine::new(pref, HighPrecisionTimer::new(), args.participant.clone());
            App::new(PreferenceTask::new(machine, paths), args.fullscreen).run()
        }
    }
}
