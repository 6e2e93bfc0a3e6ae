use crate::app::Scene;
use crate::sim::ActionKind;
use crate::triggers::Signal;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum InputEvent {
    Key { key: KeyCode, mods: KeyModifiers },
    FocusLost,
    FocusGained,
    Pointer { row: u16 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Act(ActionKind),
    OpenDiary,
    DeleteDiary,
    ToggleLanguage,
    HelpToggle,
    Back,
    Restart,
    DiaryChar(char),
    DiaryBackspace,
    DiaryCommit,
    Passive(Signal),
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        let ev = match event::read()? {
            Event::Key(k) if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat => {
                InputEvent::Key {
                    key: k.code,
                    mods: k.modifiers,
                }
            }
            Event::FocusLost => InputEvent::FocusLost,
            Event::FocusGained => InputEvent::FocusGained,
            Event::Mouse(m) if matches!(m.kind, MouseEventKind::Moved | MouseEventKind::Drag(_)) => {
                InputEvent::Pointer { row: m.row }
            }
            _ => continue,
        };
        out.push(ev);
        if out.len() >= 32 {
            break;
        }
    }
    Ok(out)
}

pub(crate) fn map_event(scene: &Scene, ev: InputEvent) -> Option<Command> {
    let (key, mods) = match ev {
        InputEvent::FocusLost => return Some(Command::Passive(Signal::FocusLost)),
        InputEvent::FocusGained => return Some(Command::Passive(Signal::FocusGained)),
        InputEvent::Pointer { row } => return Some(Command::Passive(Signal::PointerRow(row))),
        InputEvent::Key { key, mods } => (key, mods),
    };

    if matches!(key, KeyCode::Char('c')) && mods.contains(KeyModifiers::CONTROL) {
        return Some(Command::Passive(Signal::QuitRequested));
    }

    match scene {
        Scene::Writing(_) => match key {
            KeyCode::Enter => Some(Command::DiaryCommit),
            KeyCode::Esc => Some(Command::Back),
            KeyCode::Backspace => Some(Command::DiaryBackspace),
            KeyCode::Char(ch) if !ch.is_control() => Some(Command::DiaryChar(ch)),
            _ => None,
        },
        Scene::Ending(_) => match key {
            KeyCode::Char('r') | KeyCode::Char('R') => Some(Command::Restart),
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                Some(Command::Passive(Signal::QuitRequested))
            }
            _ => None,
        },
        Scene::Help => match key {
            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H') => Some(Command::HelpToggle),
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                Some(Command::Passive(Signal::QuitRequested))
            }
            _ => None,
        },
        Scene::Main => match key {
            KeyCode::Char('f') | KeyCode::Char('F') => Some(Command::Act(ActionKind::Feed)),
            KeyCode::Char('w') | KeyCode::Char('W') => Some(Command::Act(ActionKind::Water)),
            KeyCode::Char('p') | KeyCode::Char('P') => Some(Command::Act(ActionKind::Play)),
            KeyCode::Char('d') | KeyCode::Char('D') => Some(Command::OpenDiary),
            KeyCode::Char('x') | KeyCode::Char('X') => Some(Command::DeleteDiary),
            KeyCode::Char('l') | KeyCode::Char('L') => Some(Command::ToggleLanguage),
            KeyCode::Char('h') | KeyCode::Char('H') => Some(Command::HelpToggle),
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                Some(Command::Passive(Signal::QuitRequested))
            }
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omens::Ending;
    use pretty_assertions::assert_eq;

    fn key(ch: char) -> InputEvent {
        InputEvent::Key {
            key: KeyCode::Char(ch),
            mods: KeyModifiers::NONE,
        }
    }

    #[test]
    fn main_scene_keys() {
        assert_eq!(
            map_event(&Scene::Main, key('f')),
            Some(Command::Act(ActionKind::Feed))
        );
        assert_eq!(
            map_event(&Scene::Main, key('W')),
            Some(Command::Act(ActionKind::Water))
        );
        assert_eq!(map_event(&Scene::Main, key('x')), Some(Command::DeleteDiary));
        assert_eq!(
            map_event(&Scene::Main, key('q')),
            Some(Command::Passive(Signal::QuitRequested))
        );
        assert_eq!(map_event(&Scene::Main, key('z')), None);
    }

    #[test]
    fn writing_captures_letters() {
        let scene = Scene::Writing(String::new());
        assert_eq!(map_event(&scene, key('q')), Some(Command::DiaryChar('q')));
        assert_eq!(
            map_event(
                &scene,
                InputEvent::Key {
                    key: KeyCode::Enter,
                    mods: KeyModifiers::NONE
                }
            ),
            Some(Command::DiaryCommit)
        );
    }

    #[test]
    fn ctrl_c_is_a_quit_attempt_everywhere() {
        let ev = InputEvent::Key {
            key: KeyCode::Char('c'),
            mods: KeyModifiers::CONTROL,
        };
        for scene in [
            Scene::Main,
            Scene::Help,
            Scene::Writing("x".to_string()),
            Scene::Ending(Ending::Crash),
        ] {
            assert_eq!(
                map_event(&scene, ev.clone()),
                Some(Command::Passive(Signal::QuitRequested))
            );
        }
    }

    #[test]
    fn terminal_signals_pass_through() {
        assert_eq!(
            map_event(&Scene::Help, InputEvent::FocusLost),
            Some(Command::Passive(Signal::FocusLost))
        );
        assert_eq!(
            map_event(&Scene::Main, InputEvent::Pointer { row: 0 }),
            Some(Command::Passive(Signal::PointerRow(0)))
        );
    }

    #[test]
    fn ending_only_restarts_or_quits() {
        let scene = Scene::Ending(Ending::Bad);
        assert_eq!(map_event(&scene, key('r')), Some(Command::Restart));
        assert_eq!(map_event(&scene, key('f')), None);
    }
}
