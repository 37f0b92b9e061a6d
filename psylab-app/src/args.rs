use anyhow::{Context, Result, bail};
use std::path::PathBuf;

pub const USAGE: &str = "\
usage: psylab <rotation|preference> [options]

options:
  --participant ID   participant number (default 01)
  --name NAME        participant name, logged only
  --data-dir DIR     output directory (default $PSYLAB_DATA_DIR or ./data)
  --config FILE      JSON overrides for task parameters
  --seed N           seed the trial order
  --fullscreen       borderless fullscreen on the primary monitor
  -h, --help         show this message";

pub const DATA_DIR_ENV: &str = "PSYLAB_DATA_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Rotation,
    Preference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub task: TaskKind,
    pub participant: String,
    pub name: Option<String>,
    pub data_dir: PathBuf,
    pub config: Option<PathBuf>,
    pub seed: Option<u64>,
    pub fullscreen: bool,
}

/// What the command line asked for
#[derive(Debug, PartialEq)]
pub enum Command {
    Run(Args),
    Help,
}

impl Args {
    /// Parses everything after the program name. `env_data_dir` is the
    /// value of `PSYLAB_DATA_DIR`, if set.
    pub fn parse<I>(args: I, env_data_dir: Option<String>) -> Result<Command>
    where
        I: IntoIterator<Item = String>,
    {
        let mut it = args.into_iter();
        let mut task = None;
        let mut participant = "01".to_string();
        let mut name = None;
        let mut data_dir = None;
        let mut config = None;
        let mut seed = None;
        let mut fullscreen = false;

        while let Some(arg) = it.next() {
            let mut value = |flag: &str| it.next().with_context(|| format!("{flag} needs a value"));
            match arg.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "--participant" => participant = value("--participant")?,
                "--name" => name = Some(value("--name")?),
                "--data-dir" => data_dir = Some(PathBuf::from(value("--data-dir")?)),
                "--config" => config = Some(PathBuf::from(value("--config")?)),
                "--seed" => {
                    let raw = value("--seed")?;
                    seed = Some(raw.parse().with_context(|| format!("invalid seed {raw:?}"))?);
                }
                "--fullscreen" => fullscreen = true,
                "rotation" if task.is_none() => task = Some(TaskKind::Rotation),
                "preference" if task.is_none() => task = Some(TaskKind::Preference),
                other => bail!("unexpected argument {other:?}"),
            }
        }

        let Some(task) = task else {
            bail!("missing task name (rotation or preference)");
        };
        if participant.trim().is_empty() {
            bail!("participant id must not be empty");
        }
        let data_dir = data_dir
            .or_else(|| env_data_dir.filter(|d| !d.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("data"));

        Ok(Command::Run(Args {
            task,
            participant,
            name,
            data_dir,
            config,
            seed,
            fullscreen,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        Args::parse(args.iter().map(|s| s.to_string()), None)
    }

    fn run(args: &[&str]) -> Args {
        match parse(args).unwrap() {
            Command::Run(a) => a,
            Command::Help => panic!("expected a run command"),
        }
    }

    #[test]
    fn defaults() {
        let a = run(&["rotation"]);
        assert_eq!(a.task, TaskKind::Rotation);
        assert_eq!(a.participant, "01");
        assert_eq!(a.data_dir, PathBuf::from("data"));
        assert!(!a.fullscreen);
        assert_eq!(a.seed, None);
    }

    #[test]
    fn all_flags() {
        let a = run(&[
            "--seed", "7", "preference", "--participant", "12", "--name", "Ana", "--data-dir", "out",
            "--config", "c.json", "--fullscreen",
        ]);
        assert_eq!(a.task, TaskKind::Preference);
        assert_eq!(a.participant, "12");
        assert_eq!(a.name.as_deref(), Some("Ana"));
        assert_eq!(a.data_dir, PathBuf::from("out"));
        assert_eq!(a.config, Some(PathBuf::from("c.json")));
        assert_eq!(a.seed, Some(7));
        assert!(a.fullscreen);
    }

    #[test]
    fn env_data_dir_is_the_fallback() {
        let cmd = Args::parse(vec!["rotation".to_string()], Some("/tmp/d".into())).unwrap();
        let Command::Run(a) = cmd else { panic!() };
        assert_eq!(a.data_dir, PathBuf::from("/tmp/d"));

        let cmd = Args::parse(
            ["rotation", "--data-dir", "x"].map(String::from),
            Some("/tmp/d".into()),
        )
        .unwrap();
        let Command::Run(a) = cmd else { panic!() };
        assert_eq!(a.data_dir, PathBuf::from("x"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["rotation", "preference"]).is_err());
        assert!(parse(&["rotation", "--seed", "abc"]).is_err());
        assert!(parse(&["rotation", "--participant"]).is_err());
        assert!(parse(&["rotation", "--participant", " "]).is_err());
        assert!(parse(&["stroop"]).is_err());
    }

    #[test]
    fn help_wins() {
        assert_eq!(parse(&["rotation", "--help"]).unwrap(), Command::Help);
    }
}
