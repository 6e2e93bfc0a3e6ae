mod app;
mod config;
mod corruption;
mod diary;
mod input;
mod logging;
mod model;
mod omens;
mod render;
mod sim;
mod storage;
mod text;
mod triggers;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::{path::PathBuf, rc::Rc};

use crate::config::{load_settings, project_paths};
use crate::corruption::{CorruptionLedger, CorruptionStage};
use crate::diary::Diary;
use crate::model::{GameState, Language};
use crate::omens::Ending;
use crate::sim::ActionKind;
use crate::storage::{FileStore, GameStore, MemoryStore, SharedStore};

#[derive(Parser, Debug)]
#[command(name = "nero")]
#[command(about = "A black cat who lives in your terminal and keeps your diary")]
struct Cli {
    /// Data directory (defaults to $NERO_DATA_DIR, then the per-user data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Language for this run; the saved preference is left alone
    #[arg(long, value_enum, global = true)]
    lang: Option<LangArg>,

    /// Keep everything in memory; nothing is read from or written to disk
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Open the terminal companion (default)
    Play,
    /// Print the current state as JSON
    Status,
    /// Run one action and print what Nero says
    Act {
        /// write-diary, feed, water, play, delete-diary, switch-tab or try-close
        action: ActionKind,
    },
    /// Set one value directly (clamped to 0..=100)
    Set {
        #[arg(value_enum)]
        field: Field,
        #[arg(allow_negative_numbers = true)]
        value: i32,
    },
    /// Forget everything: state, corruption record and diary
    Reset,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LangArg {
    En,
    Zh,
}

impl From<LangArg> for Language {
    fn from(v: LangArg) -> Self {
        match v {
            LangArg::En => Language::En,
            LangArg::Zh => Language::Zh,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Field {
    SyncRate,
    Corruption,
    Energy,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = project_paths(cli.data_dir.as_deref())?;
    logging::init(&paths.log_path)?;

    let settings = load_settings(&paths.settings_path);
    let store: SharedStore = if cli.ephemeral {
        Rc::new(MemoryStore::default())
    } else {
        Rc::new(FileStore::open(&paths.store_dir).context("opening data store")?)
    };
    let lang = cli.lang.map(Language::from);

    match cli.command.unwrap_or(Cmd::Play) {
        Cmd::Play => app::run(settings, paths, store, lang),
        Cmd::Status => {
            let game = GameStore::open_with_language(store, settings.language);
            print_status(&game.state());
            Ok(())
        }
        Cmd::Act { action } => {
            let mut game = GameStore::open_with_language(Rc::clone(&store), settings.language);
            if let Some(lang) = lang {
                game.use_language(lang);
            }
            let line = game.execute_action(action, settings.player().as_ref());
            CorruptionLedger::open(store).set(game.state().corruption());
            if let Some(line) = line {
                println!("Nero: {line}");
            }
            print_status(&game.state());
            Ok(())
        }
        Cmd::Set { field, value } => {
            let mut game = GameStore::open(Rc::clone(&store));
            match field {
                Field::SyncRate => game.set_sync_rate(value),
                Field::Corruption => game.set_corruption(value),
                Field::Energy => game.set_energy(value),
            }
            CorruptionLedger::open(store).set(game.state().corruption());
            print_status(&game.state());
            Ok(())
        }
        Cmd::Reset => {
            GameStore::open(Rc::clone(&store)).reset();
            CorruptionLedger::open(Rc::clone(&store)).set(0);
            Diary::open(store).clear();
            print_status(&GameState::default());
            Ok(())
        }
    }
}

fn print_status(st: &GameState) {
    let ending = Ending::for_state(st).map(|e| match e {
        Ending::Bad => "bad",
        Ending::Crash => "crash",
    });
    let corruption_stage = match CorruptionStage::from_value(st.corruption()) {
        CorruptionStage::Normal => "normal",
        CorruptionStage::Suspicious => "suspicious",
        CorruptionStage::Aggressive => "aggressive",
        CorruptionStage::Ending => "ending",
    };
    let v = serde_json::json!({
        "syncRate": st.sync_rate(),
        "corruption": st.corruption(),
        "energy": st.energy(),
        "stage": st.stage().as_str(),
        "corruptionStage": corruption_stage,
        "ending": ending,
    });
    println!("{v}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_actions_and_flags() {
        let cli = Cli::try_parse_from(["nero", "--lang", "zh", "act", "delete-diary"]).unwrap();
        assert!(matches!(cli.lang, Some(LangArg::Zh)));
        assert!(matches!(
            cli.command,
            Some(Cmd::Act {
                action: ActionKind::DeleteDiary
            })
        ));
    }

    #[test]
    fn cli_rejects_unknown_actions() {
        assert!(Cli::try_parse_from(["nero", "act", "pet"]).is_err());
    }

    #[test]
    fn cli_set_accepts_negative_values() {
        let cli = Cli::try_parse_from(["nero", "set", "energy", "-5"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Cmd::Set {
                field: Field::Energy,
                value: -5
            })
        ));
    }

    #[test]
    fn no_subcommand_means_play() {
        let cli = Cli::try_parse_from(["nero", "--ephemeral"]).unwrap();
        assert!(cli.ephemeral);
        assert!(cli.command.is_none());
    }
}
