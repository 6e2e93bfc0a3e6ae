use crate::diary::DiaryEntry;
use crate::model::{GameState, Language, PlayerContext, RNGState, Stage};
use crate::omens::{Distortion, Ending, Tint};
use crate::text::{lines, stage_caption};
use crossterm::{
    cursor,
    event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Marks the right half of a double-width glyph.
const WIDE_TAIL: char = '\0';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            *c = Cell {
                bg,
                ..Cell::default()
            };
        }
    }
    #[cfg(test)]
    pub(crate) fn row_text(&self, y: u16) -> String {
        (0..self.w)
            .filter_map(|x| self.get(x, y))
            .map(|c| c.ch)
            .filter(|&ch| ch != WIDE_TAIL)
            .collect()
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            EnableFocusChange,
            EnableMouseCapture,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            DisableMouseCapture,
            DisableFocusChange,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        // Force a full repaint.
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c.ch == WIDE_TAIL || (diff_only && c == self.prev.cells[i]) {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Text
------------------------------ */

fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6)
}

pub(crate) fn text_width(s: &str) -> usize {
    s.chars().map(|c| if is_wide(c) { 2 } else { 1 }).sum()
}

/// Draws `s` from `(x, y)`, clipping at the buffer edge. Returns the cells used.
pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) -> u16 {
    let mut xx = x;
    for ch in s.chars() {
        let wide = is_wide(ch);
        let need = if wide { 2 } else { 1 };
        if y >= buf.h || xx.saturating_add(need) > buf.w {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
        if wide {
            buf.set(xx + 1, y, Cell { ch: WIDE_TAIL, fg, bg });
        }
        xx += need;
    }
    xx - x
}

/// Greedy wrap on display width; breaks anywhere for scripts without spaces.
pub(crate) fn wrap(s: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    let mut line = String::new();
    let mut used = 0;
    for word in s.split_inclusive(' ') {
        let ww = text_width(word.trim_end());
        if used > 0 && used + ww > width {
            out.push(line.trim_end().to_string());
            line.clear();
            used = 0;
        }
        for ch in word.chars() {
            let cw = if is_wide(ch) { 2 } else { 1 };
            if used + cw > width {
                out.push(line.trim_end().to_string());
                line.clear();
                used = 0;
            }
            line.push(ch);
            used += cw;
        }
    }
    if !line.trim().is_empty() {
        out.push(line.trim_end().to_string());
    }
    out
}

fn bar(value: i32, width: usize) -> String {
    let v = (value as f32 / 100.0).clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::new();
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}

/* -----------------------------
   Panels
------------------------------ */

fn stage_color(stage: Stage) -> Color {
    match stage {
        Stage::Establishment => Color::Green,
        Stage::Disturbance => Color::Yellow,
        Stage::Distortion => Color::DarkYellow,
        Stage::Possession => Color::Red,
    }
}

fn sync_color(sync_rate: i32) -> Color {
    stage_color(Stage::from_sync_rate(sync_rate))
}

fn energy_color(energy: i32) -> Color {
    if energy <= 20 {
        Color::Red
    } else if energy <= 50 {
        Color::Yellow
    } else {
        Color::Green
    }
}

pub(crate) fn stats_panel(buf: &mut CellBuffer, st: &GameState, lang: Language, diary_pages: usize) {
    let bg = Color::Black;
    let fg = Color::White;
    let l = lines(lang);

    draw_text(buf, 1, 0, "Nero", fg, bg);
    draw_text(buf, 1, 2, stage_caption(st.stage(), lang), stage_color(st.stage()), bg);

    draw_text(buf, 1, 4, l.sync_label, fg, bg);
    let s = format!("{} {:>3}%", bar(st.sync_rate(), 16), st.sync_rate());
    draw_text(buf, 1, 5, &s, sync_color(st.sync_rate()), bg);

    draw_text(buf, 1, 7, l.energy_label, fg, bg);
    let s = format!("{} {:>3}%", bar(st.energy(), 16), st.energy());
    draw_text(buf, 1, 8, &s, energy_color(st.energy()), bg);

    if st.energy() <= 20 {
        draw_text(buf, 1, 9, l.low_energy, Color::Red, bg);
    }

    let pages = match lang {
        Language::En => format!("Diary pages: {diary_pages}"),
        Language::Zh => format!("日记页数: {diary_pages}"),
    };
    draw_text(buf, 1, 11, &pages, Color::Grey, bg);
}

pub(crate) fn dialogue_line(buf: &mut CellBuffer, text: &str, corruption: i32) {
    let bg = Color::Black;
    let fg = if corruption >= 60 { Color::Red } else { Color::Cyan };
    let width = buf.w.saturating_sub(4) as usize;
    let base = buf.h.saturating_sub(4);
    for (i, line) in wrap(text, width).iter().take(2).enumerate() {
        draw_text(buf, 2, base + i as u16, line, fg, bg);
    }
}

pub(crate) fn footer(buf: &mut CellBuffer, text: &str) {
    draw_text(buf, 1, buf.h.saturating_sub(1), text, Color::DarkGrey, Color::Black);
}

pub(crate) fn draw_cat_ascii(buf: &mut CellBuffer, st: &GameState, cx: i32, cy: i32) {
    let bg = Color::Black;
    let fg = if st.stage() == Stage::Possession {
        Color::DarkRed
    } else {
        Color::White
    };

    let mut grid = [
        "  /\\_____/\\  ",
        " /  o   o  \\ ",
        "( ==  ^  == )",
        " )    w    ( ",
        "(  (     )  )",
        " \\_(_____)_/ ",
    ];

    // eyes follow the corruption
    if st.corruption() >= 90 {
        grid[1] = " /  ●   ●  \\ ";
    } else if st.corruption() >= 60 {
        grid[1] = " /  ◉   ◉  \\ ";
    } else if st.energy() <= 20 {
        grid[1] = " /  -   -  \\ ";
    }

    let h = grid.len() as i32;
    let w = text_width(grid[0]) as i32;
    let x0 = cx - w / 2;
    let y0 = cy - h / 2;

    for (yy, line) in grid.iter().enumerate() {
        let y = y0 + yy as i32;
        if y < 0 || y >= buf.h as i32 {
            continue;
        }
        let mut x = x0;
        for ch in line.chars() {
            if x >= 0 && x < buf.w as i32 {
                buf.set(x as u16, y as u16, Cell { ch, fg, bg });
            }
            x += 1;
        }
    }
}

pub(crate) fn draw_box(buf: &mut CellBuffer, title: &str, body: &[String], fg: Color, bg: Color) {
    let w = buf.w;
    let h = buf.h;

    let bw = 60.min(w.saturating_sub(4));
    let bh = 18.min(h.saturating_sub(4));
    if bw < 4 || bh < 4 {
        return;
    }
    let x0 = (w - bw) / 2;
    let y0 = (h - bh) / 2;

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            let edge_x = x == x0 || x == x0 + bw - 1;
            let edge_y = y == y0 || y == y0 + bh - 1;
            let ch = match (edge_x, edge_y) {
                (true, true) => match (x == x0, y == y0) {
                    (true, true) => '┌',
                    (false, true) => '┐',
                    (true, false) => '└',
                    (false, false) => '┘',
                },
                (true, false) => '│',
                (false, true) => '─',
                (false, false) => ' ',
            };
            buf.set(x, y, Cell { ch, fg, bg });
        }
    }

    draw_text(buf, x0 + 2, y0 + 1, title, fg, bg);

    let inner = bw.saturating_sub(4) as usize;
    let mut yy = y0 + 3;
    for line in body.iter().flat_map(|l| {
        if l.is_empty() {
            vec![String::new()]
        } else {
            wrap(l, inner)
        }
    }) {
        if yy >= y0 + bh - 1 {
            break;
        }
        draw_text(buf, x0 + 2, yy, &line, fg, bg);
        yy += 1;
    }
}

pub(crate) fn ending_overlay(
    buf: &mut CellBuffer,
    ending: Ending,
    lang: Language,
    player: Option<&PlayerContext>,
    remembered: &[DiaryEntry],
) {
    let l = lines(lang);
    match ending {
        Ending::Bad => {
            let mut body: Vec<String> = l.bad_ending.iter().map(|s| s.to_string()).collect();
            body.push(String::new());
            if let Some(p) = player {
                body.push(format!("{}: {}", p.nickname, p.hobby));
            }
            if remembered.is_empty() {
                body.push(l.nothing_recorded.to_string());
            }
            for e in remembered.iter().take(3) {
                body.push(format!("{}  {}", e.date.format("%Y-%m-%d"), e.content));
            }
            body.push(String::new());
            body.push(l.never_forget.to_string());
            body.push(l.start_over.to_string());
            buf.clear(Color::Black);
            draw_box(buf, l.final_entry, &body, Color::Red, Color::Black);
        }
        Ending::Crash => {
            let body = vec![
                l.crash_message.to_string(),
                String::new(),
                l.crash_code.to_string(),
                l.crash_instruction.to_string(),
                String::new(),
                l.start_over.to_string(),
            ];
            buf.clear(Color::DarkBlue);
            draw_box(buf, l.crash_title, &body, Color::White, Color::DarkBlue);
        }
    }
}

/// Monochrome output for terminals without color.
pub(crate) fn strip_color(buf: &mut CellBuffer) {
    for c in &mut buf.cells {
        c.fg = Color::White;
        c.bg = Color::Black;
    }
}

/* -----------------------------
   Distortion pass
------------------------------ */

const GLITCH_CHARS: [char; 8] = ['░', '▒', '▓', '█', '#', '%', '¿', '∆'];

fn tint_color(c: Color, tint: Tint) -> Color {
    match tint {
        Tint::None => c,
        Tint::Mild => match c {
            Color::White => Color::Grey,
            other => other,
        },
        Tint::Heavy => match c {
            Color::Red | Color::DarkRed => c,
            Color::Green | Color::Cyan | Color::Yellow => Color::Grey,
            _ => Color::DarkGrey,
        },
        Tint::Severe => match c {
            Color::Red | Color::DarkRed => Color::Red,
            _ => Color::DarkRed,
        },
    }
}

/// Corrupts the finished frame in place.
pub(crate) fn apply_distortion(buf: &mut CellBuffer, d: &Distortion, rng: &mut RNGState) {
    if d.is_calm() {
        return;
    }

    if d.shake && rng.roll(0.15) {
        let shift = 1 + rng.below(2);
        for y in 0..buf.h {
            let start = buf.idx(0, y);
            let row = &mut buf.cells[start..start + buf.w as usize];
            row.rotate_right(shift.min(row.len()));
        }
    }

    let w = buf.w as f32;
    let h = buf.h as f32;
    for y in 0..buf.h {
        for x in 0..buf.w {
            let i = buf.idx(x, y);
            let mut c = buf.cells[i];
            c.fg = tint_color(c.fg, d.tint);
            if d.red_wash && c.bg == Color::Black {
                c.bg = Color::Rgb { r: 24, g: 0, b: 0 };
            }
            if d.scanlines && y % 2 == 1 && c.ch == ' ' {
                c.ch = '·';
                c.fg = Color::DarkGrey;
            }
            if d.vignette > 0.0 {
                let dx = (x as f32 / w.max(1.0)) * 2.0 - 1.0;
                let dy = (y as f32 / h.max(1.0)) * 2.0 - 1.0;
                let edge = (dx * dx + dy * dy).sqrt() / std::f32::consts::SQRT_2;
                if edge > 1.0 - d.vignette * 0.5 && c.ch == ' ' {
                    c.ch = '░';
                    c.fg = Color::DarkGrey;
                }
            }
            buf.cells[i] = c;
        }
    }

    if rng.roll(d.glitch_chance) {
        let bursts = 1 + rng.below(3 + (d.glitch_chance * 10.0) as usize);
        for _ in 0..bursts {
            let y = rng.below(buf.h as usize) as u16;
            let x = rng.below(buf.w as usize) as u16;
            let len = 2 + rng.below(8);
            for k in 0..len as u16 {
                let xx = x.saturating_add(k);
                if let Some(old) = buf.get(xx, y) {
                    if old.ch == WIDE_TAIL {
                        continue;
                    }
                    let ch = GLITCH_CHARS[rng.below(GLITCH_CHARS.len())];
                    // Never leave half of a wide glyph behind.
                    if is_wide(old.ch) {
                        buf.set(xx + 1, y, Cell { ch: ' ', ..old });
                    }
                    buf.set(xx, y, Cell { ch, fg: Color::Red, ..old });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wide_text_takes_two_cells() {
        let mut buf = CellBuffer::new(10, 1);
        let used = draw_text(&mut buf, 0, 0, "别走。", Color::White, Color::Black);
        assert_eq!(used, 6);
        assert_eq!(buf.row_text(0), "别走。    ");
    }

    #[test]
    fn text_clips_at_edge() {
        let mut buf = CellBuffer::new(5, 1);
        let used = draw_text(&mut buf, 2, 0, "hello", Color::White, Color::Black);
        assert_eq!(used, 3);
        assert_eq!(buf.row_text(0), "  hel");
    }

    #[test]
    fn wrap_on_words_and_wide_chars() {
        assert_eq!(
            wrap("Are you going to abandon me?", 12),
            vec!["Are you", "going to", "abandon me?"]
        );
        assert_eq!(wrap("求你了别走", 4), vec!["求你", "了别", "走"]);
    }

    #[test]
    fn calm_distortion_leaves_frame_untouched() {
        let mut buf = CellBuffer::new(8, 4);
        draw_text(&mut buf, 0, 0, "meow", Color::White, Color::Black);
        let before = buf.cells.clone();
        apply_distortion(&mut buf, &Distortion::CALM, &mut RNGState::new(1));
        assert_eq!(buf.cells, before);
    }

    #[test]
    fn possession_washes_the_background() {
        let mut buf = CellBuffer::new(8, 4);
        let st = GameState::new(95, 10, 50);
        apply_distortion(&mut buf, &Distortion::for_state(&st), &mut RNGState::new(3));
        assert!(buf
            .cells
            .iter()
            .all(|c| c.bg == Color::Rgb { r: 24, g: 0, b: 0 }));
    }

    #[test]
    fn stats_panel_shows_stage_caption() {
        let mut buf = CellBuffer::new(60, 14);
        stats_panel(&mut buf, &GameState::new(30, 0, 15), Language::En, 2);
        assert!(buf.row_text(2).contains("reading emotional frequency"));
        assert!(buf.row_text(9).contains("Write a diary"));
        assert!(buf.row_text(11).contains("Diary pages: 2"));
    }
}
