use crate::config::{save_settings_atomic, Paths, Settings};
use crate::corruption::CorruptionLedger;
use crate::diary::Diary;
use crate::input::{collect_input_nonblocking, map_event, Command};
use crate::model::{Language, PlayerContext, RNGState};
use crate::omens::{Distortion, Ending};
use crate::render::{
    apply_distortion, dialogue_line, draw_box, draw_cat_ascii, ending_overlay, footer,
    stats_panel, strip_color, Terminal,
};
use crate::sim::ActionKind;
use crate::storage::{GameStore, SharedStore};
use crate::text::lines;
use crate::triggers::{PassiveTriggers, Reaction, Signal};
use crossterm::style::Color;
use std::time::{Duration, Instant};
use tracing::info;

const NOTE_TTL: Duration = Duration::from_secs(6);
const DIARY_INPUT_MAX: usize = 600;

#[derive(Clone, Debug)]
pub(crate) enum Scene {
    Main,
    Help,
    /// Composing a diary page.
    Writing(String),
    Ending(Ending),
}

/// Game session without the terminal: everything the frame loop drives.
pub(crate) struct Session {
    pub(crate) game: GameStore,
    pub(crate) ledger: CorruptionLedger,
    pub(crate) diary: Diary,
    pub(crate) triggers: PassiveTriggers,
    pub(crate) player: Option<PlayerContext>,
    pub(crate) scene: Scene,
    pub(crate) note: Option<(String, Instant)>,
    pub(crate) should_quit: bool,
}

impl Session {
    #[cfg(test)]
    pub(crate) fn open(store: SharedStore, player: Option<PlayerContext>, now: Instant) -> Self {
        Self::open_with_language(store, player, Language::default(), None, now)
    }

    /// `lang` overrides for this session only; `fallback` applies when nothing was saved.
    pub(crate) fn open_with_language(
        store: SharedStore,
        player: Option<PlayerContext>,
        fallback: Language,
        lang: Option<Language>,
        now: Instant,
    ) -> Self {
        let mut game = GameStore::open_with_language(store.clone(), fallback);
        if let Some(lang) = lang {
            game.use_language(lang);
        }
        let mut ledger = CorruptionLedger::open(store.clone());
        ledger.load_pending();
        let diary = Diary::open(store);
        ledger.set(game.state().corruption());
        let note = ledger.take_pending().map(|m| (m, now));
        let mut s = Self {
            game,
            ledger,
            diary,
            triggers: PassiveTriggers::default(),
            player,
            scene: Scene::Main,
            note,
            should_quit: false,
        };
        s.check_ending();
        s
    }

    pub(crate) fn note(&self, now: Instant) -> Option<&str> {
        match &self.note {
            Some((text, at)) if now.saturating_duration_since(*at) < NOTE_TTL => Some(text),
            _ => None,
        }
    }

    fn say(&mut self, text: impl Into<String>, now: Instant) {
        self.note = Some((text.into(), now));
    }

    fn act(&mut self, kind: ActionKind, now: Instant) -> Option<String> {
        let line = self.game.execute_action(kind, self.player.as_ref());
        self.ledger.set(self.game.state().corruption());
        if let Some(l) = &line {
            self.say(l.clone(), now);
        }
        self.check_ending();
        line
    }

    fn check_ending(&mut self) {
        if let Some(ending) = Ending::for_state(&self.game.state()) {
            if !matches!(self.scene, Scene::Ending(_)) {
                info!(?ending, "ending reached");
                self.scene = Scene::Ending(ending);
            }
        }
    }

    pub(crate) fn handle(&mut self, cmd: Command, now: Instant) {
        let l = lines(self.game.language());
        if !matches!(cmd, Command::Passive(_)) {
            self.triggers.release_close();
        }
        match cmd {
            Command::Act(kind) => {
                if self.game.state().allows(kind) {
                    self.act(kind, now);
                } else {
                    self.say(l.too_tired, now);
                }
            }
            Command::OpenDiary => self.scene = Scene::Writing(String::new()),
            Command::DiaryChar(ch) => {
                if let Scene::Writing(text) = &mut self.scene {
                    if text.chars().count() < DIARY_INPUT_MAX {
                        text.push(ch);
                    }
                }
            }
            Command::DiaryBackspace => {
                if let Scene::Writing(text) = &mut self.scene {
                    text.pop();
                }
            }
            Command::DiaryCommit => {
                let text = match std::mem::replace(&mut self.scene, Scene::Main) {
                    Scene::Writing(text) => text,
                    other => {
                        self.scene = other;
                        return;
                    }
                };
                if self.diary.write(&text, chrono::Utc::now()).is_some() {
                    self.say(l.diary_saved, now);
                    self.act(ActionKind::WriteDiary, now);
                }
            }
            Command::DeleteDiary => {
                if self.diary.delete_latest().is_some() {
                    self.act(ActionKind::DeleteDiary, now);
                } else {
                    self.say(l.diary_empty, now);
                }
            }
            Command::ToggleLanguage => {
                let next = self.game.language().toggled();
                self.game.set_language(next);
            }
            Command::HelpToggle => {
                self.scene = match self.scene {
                    Scene::Help => Scene::Main,
                    _ => Scene::Help,
                };
            }
            Command::Back => {
                if !matches!(self.scene, Scene::Ending(_)) {
                    self.scene = Scene::Main;
                }
            }
            Command::Restart => {
                self.game.reset();
                self.ledger.set(self.game.state().corruption());
                self.diary.clear();
                self.note = None;
                self.scene = Scene::Main;
            }
            Command::Passive(signal) => self.on_signal(signal, now),
        }
    }

    fn on_signal(&mut self, signal: Signal, now: Instant) {
        let st = self.game.state();
        match self.triggers.on_signal(signal, &st, self.game.language(), now) {
            Reaction::Ignore => {}
            Reaction::SwitchedAway { pending } => {
                self.act(ActionKind::SwitchTab, now);
                self.ledger.set_pending(pending);
            }
            Reaction::Leave { hold } => {
                self.act(ActionKind::TryClose, now);
                match hold {
                    Some(warning) => self.say(warning, now),
                    None => self.should_quit = true,
                }
            }
            Reaction::Exit => self.should_quit = true,
            Reaction::Say(text) => self.say(text, now),
        }
    }
}

pub(crate) struct App {
    settings: Settings,
    paths: Paths,
    session: Session,
    rng: RNGState,
    term: Terminal,
}

impl App {
    fn init(
        settings: Settings,
        paths: Paths,
        store: SharedStore,
        lang: Option<Language>,
    ) -> anyhow::Result<Self> {
        let rng = RNGState::new(settings.seed);
        let session = Session::open_with_language(
            store,
            settings.player(),
            settings.language,
            lang,
            Instant::now(),
        );
        let term = Terminal::begin()?;
        Ok(Self {
            settings,
            paths,
            session,
            rng,
            term,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        while !self.session.should_quit {
            let _resized = self.term.resize_if_needed()?;

            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(cmd) = map_event(&self.session.scene, ev) {
                    self.session.handle(cmd, Instant::now());
                }
                if self.session.should_quit {
                    break;
                }
            }

            self.render_frame()?;
            spin_sleep(frame_dt, Instant::now());
        }

        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        info!("session closed");
        Ok(())
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        let now = Instant::now();
        let s = &self.session;
        let st = s.game.state();
        let lang = s.game.language();
        let l = lines(lang);
        let buf = &mut self.term.cur;
        buf.clear(Color::Black);

        if let Scene::Ending(ending) = s.scene {
            ending_overlay(buf, ending, lang, s.player.as_ref(), s.diary.entries());
            if !self.settings.enable_color {
                strip_color(buf);
            }
            self.term.present(true)?;
            return Ok(());
        }

        let cols = buf.w as i32;
        let rows = buf.h as i32;
        stats_panel(buf, &st, lang, s.diary.entries().len());
        let panel_w = (cols / 3).clamp(26.min(cols), cols);
        draw_cat_ascii(buf, &st, panel_w + (cols - panel_w) / 2, rows / 2 - 2);

        if let Some(text) = s.note(now) {
            dialogue_line(buf, text, st.corruption());
        }

        let keys = match lang {
            Language::En => {
                "f feed | w water | p play | d write diary | x delete page | l language | h help | q quit"
            }
            Language::Zh => {
                "f 喂食 | w 喂水 | p 玩耍 | d 写日记 | x 删除 | l 语言 | h 帮助 | q 退出"
            }
        };
        footer(buf, keys);

        match &s.scene {
            Scene::Help => {
                let body = [
                    "Write diary pages to restore energy and grow the link.",
                    "Feeding, water and play cost energy and calm Nero down.",
                    "Deleting pages is remembered.",
                    "",
                    "Esc or H to close.",
                ]
                .map(String::from);
                draw_box(buf, "Nero", &body, Color::White, Color::Black);
            }
            Scene::Writing(text) => {
                let mut preview = text.clone();
                preview.push('_');
                let body = [
                    preview,
                    String::new(),
                    "Enter save | Esc cancel | Backspace delete".to_string(),
                ];
                draw_box(buf, l.diary_prompt, &body, Color::White, Color::Black);
            }
            Scene::Main | Scene::Ending(_) => {}
        }

        if self.settings.enable_glitch {
            apply_distortion(buf, &Distortion::for_state(&st), &mut self.rng);
        }
        if !self.settings.enable_color {
            strip_color(buf);
        }

        self.term.present(true)?;
        Ok(())
    }
}

pub(crate) fn run(
    settings: Settings,
    paths: Paths,
    store: SharedStore,
    lang: Option<Language>,
) -> anyhow::Result<()> {
    let mut app = App::init(settings, paths, store, lang)?;
    let result = app.run();
    if result.is_err() {
        let _ = app.term.end();
    }
    result
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corruption::PENDING_MESSAGE_KEY;
    use crate::model::GameState;
    use crate::storage::tests::memory;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn session_with(store: &SharedStore, st: GameState) -> Session {
        let mut game = GameStore::open(Rc::clone(store));
        game.set_sync_rate(st.sync_rate());
        game.set_corruption(st.corruption());
        game.set_energy(st.energy());
        Session::open(Rc::clone(store), None, Instant::now())
    }

    #[test]
    fn writing_a_page_runs_write_diary() {
        let kv = memory();
        let mut s = Session::open(Rc::clone(&kv), None, Instant::now());
        let now = Instant::now();
        s.handle(Command::OpenDiary, now);
        for ch in "hi nero".chars() {
            s.handle(Command::DiaryChar(ch), now);
        }
        s.handle(Command::DiaryCommit, now);
        assert!(matches!(s.scene, Scene::Main));
        assert_eq!(s.diary.entries().len(), 1);
        assert_eq!(s.game.state(), GameState::new(2, 1, 100));
        assert_eq!(s.ledger.value(), 1);
    }

    #[test]
    fn empty_page_changes_nothing() {
        let mut s = Session::open(memory(), None, Instant::now());
        let now = Instant::now();
        s.handle(Command::OpenDiary, now);
        s.handle(Command::DiaryCommit, now);
        assert_eq!(s.game.state(), GameState::default());
    }

    #[test]
    fn deleting_with_no_pages_is_refused() {
        let mut s = Session::open(memory(), None, Instant::now());
        s.handle(Command::DeleteDiary, Instant::now());
        assert_eq!(s.game.state(), GameState::default());
        assert_eq!(s.note(Instant::now()), Some(lines(Default::default()).diary_empty));
    }

    #[test]
    fn tired_nero_refuses_care() {
        let kv = memory();
        let mut s = session_with(&kv, GameState::new(0, 20, 5));
        s.handle(Command::Act(ActionKind::Feed), Instant::now());
        assert_eq!(s.game.state(), GameState::new(0, 20, 5));
    }

    #[test]
    fn focus_loss_queues_a_pending_message() {
        let kv = memory();
        let mut s = session_with(&kv, GameState::new(30, 10, 100));
        s.handle(Command::Passive(Signal::FocusLost), Instant::now());
        assert_eq!(s.game.state(), GameState::new(31, 15, 100));
        assert!(kv.get(PENDING_MESSAGE_KEY).unwrap().is_some());

        let mut next = Session::open(Rc::clone(&kv), None, Instant::now());
        assert_eq!(next.note(Instant::now()), Some("Where did you just go?"));
        assert!(kv.get(PENDING_MESSAGE_KEY).unwrap().is_none());
        next.note = None;
        let again = Session::open(kv, None, Instant::now());
        assert_eq!(again.note(Instant::now()), None);
    }

    #[test]
    fn headless_commands_leave_the_pending_message_for_the_next_session() {
        let kv = memory();
        let mut s = session_with(&kv, GameState::new(30, 10, 100));
        s.handle(Command::Passive(Signal::FocusLost), Instant::now());
        drop(s);

        // What `nero act feed` does between two interactive sessions.
        let mut game = GameStore::open(Rc::clone(&kv));
        game.execute_action(ActionKind::Feed, None);
        CorruptionLedger::open(Rc::clone(&kv)).set(game.state().corruption());

        let next = Session::open(kv, None, Instant::now());
        assert_eq!(next.note(Instant::now()), Some("Where did you just go?"));
    }

    #[test]
    fn quit_in_establishment_leaves_state_alone() {
        let mut s = Session::open(memory(), None, Instant::now());
        s.handle(Command::Passive(Signal::QuitRequested), Instant::now());
        assert!(s.should_quit);
        assert_eq!(s.game.state(), GameState::default());
    }

    #[test]
    fn haunted_quit_needs_confirmation() {
        let kv = memory();
        let mut s = session_with(&kv, GameState::new(60, 70, 100));
        let now = Instant::now();
        s.handle(Command::Passive(Signal::QuitRequested), now);
        assert!(!s.should_quit);
        assert_eq!(s.game.state().corruption(), 73);
        s.handle(Command::Passive(Signal::QuitRequested), now);
        assert!(s.should_quit);
        assert_eq!(s.game.state().corruption(), 73);
    }

    #[test]
    fn going_back_to_play_rearms_the_quit_hold() {
        let kv = memory();
        let mut s = session_with(&kv, GameState::new(60, 70, 100));
        let now = Instant::now();
        s.handle(Command::Passive(Signal::QuitRequested), now);
        s.handle(Command::HelpToggle, now);
        s.handle(Command::Passive(Signal::QuitRequested), now);
        assert!(!s.should_quit);
        assert_eq!(s.game.state().corruption(), 76);
    }

    #[test]
    fn corruption_past_ninety_ends_the_game() {
        let kv = memory();
        let mut s = session_with(&kv, GameState::new(90, 85, 100));
        s.diary.write("first", chrono::Utc::now());
        s.handle(Command::DeleteDiary, Instant::now());
        assert!(matches!(s.scene, Scene::Ending(Ending::Bad)));

        s.handle(Command::Restart, Instant::now());
        assert!(matches!(s.scene, Scene::Main));
        assert_eq!(s.game.state(), GameState::default());
        assert_eq!(s.ledger.value(), 0);
        assert!(s.diary.entries().is_empty());
    }

    #[test]
    fn restored_ending_state_opens_on_the_ending() {
        let kv = memory();
        let s = session_with(&kv, GameState::new(40, 95, 100));
        assert!(matches!(s.scene, Scene::Ending(Ending::Crash)));
    }
}
