use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use log::{error, info, warn};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

use crate::chip8::Chip8;
use crate::clock::Pacer;
use crate::display::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::keypad::{Key, Keypad};

pub const DEFAULT_FRAME_RATE: u64 = 60;
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u64 = 500;

pub struct Settings {
    pub frame_rate: u64,
    pub ips: u64,
    pub rom: PathBuf,
    pub seed: Option<u64>,
}

impl Settings {
    pub fn new(rom: impl Into<PathBuf>) -> Self {
        Settings {
            frame_rate: DEFAULT_FRAME_RATE,
            ips: DEFAULT_INSTRUCTIONS_PER_SECOND,
            rom: rom.into(),
            seed: None,
        }
    }

    fn rom_name(&self) -> String {
        self.rom
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown ROM".to_string())
    }
}

#[derive(Debug, PartialEq)]
enum InputEvent {
    Down(Key),
    Up(Key),
    Quit,
    HookLost,
}

/// Host keyboard layout, by the character printed on each key:
///
/// ```text
/// 1 2 3 4    ->    1 2 3 C
/// Q W E R    ->    4 5 6 D
/// A S D F    ->    7 8 9 E
/// Z X C V    ->    A 0 B F
/// ```
fn key_for_char(c: char) -> Option<Key> {
    let key = match c.to_ascii_lowercase() {
        '1' => Key::Key1,
        '2' => Key::Key2,
        '3' => Key::Key3,
        '4' => Key::KeyC,
        'q' => Key::Key4,
        'w' => Key::Key5,
        'e' => Key::Key6,
        'r' => Key::KeyD,
        'a' => Key::Key7,
        's' => Key::Key8,
        'd' => Key::Key9,
        'f' => Key::KeyE,
        'z' => Key::KeyA,
        'x' => Key::Key0,
        'c' => Key::KeyB,
        'v' => Key::KeyF,
        _ => return None,
    };
    Some(key)
}

fn map_host_key(key: rdev::Key) -> Option<Key> {
    use rdev::Key as Host;

    let c = match key {
        Host::Num1 => '1',
        Host::Num2 => '2',
        Host::Num3 => '3',
        Host::Num4 => '4',
        Host::KeyQ => 'q',
        Host::KeyW => 'w',
        Host::KeyE => 'e',
        Host::KeyR => 'r',
        Host::KeyA => 'a',
        Host::KeyS => 's',
        Host::KeyD => 'd',
        Host::KeyF => 'f',
        Host::KeyZ => 'z',
        Host::KeyX => 'x',
        Host::KeyC => 'c',
        Host::KeyV => 'v',
        _ => return None,
    };
    key_for_char(c)
}

fn map_terminal_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Char(c) => key_for_char(c),
        _ => None,
    }
}

fn translate(event_type: rdev::EventType) -> Option<InputEvent> {
    match event_type {
        rdev::EventType::KeyPress(rdev::Key::Escape) => Some(InputEvent::Quit),
        rdev::EventType::KeyPress(key) => map_host_key(key).map(InputEvent::Down),
        rdev::EventType::KeyRelease(key) => map_host_key(key).map(InputEvent::Up),
        _ => None,
    }
}

/// Terminals only report key presses, so key-up comes from a global hook.
/// `rdev::listen` never returns while it works, hence the thread.
fn spawn_key_listener(tx: Sender<InputEvent>) {
    let tx_lost = tx.clone();
    std::thread::spawn(move || {
        let result = rdev::listen(move |event| {
            if let Some(input) = translate(event.event_type) {
                let _ = tx.send(input);
            }
        });
        if let Err(e) = result {
            error!("keyboard listener stopped: {e:?}");
            let _ = tx_lost.send(InputEvent::HookLost);
        }
    });
}

/// The keypad and the event stream that feeds it.
struct Input {
    keypad: Keypad,
    events: Receiver<InputEvent>,
    /// Set once the global hook is gone. Terminal key presses then hold a
    /// key down until the end of the frame, since terminals send no key-up.
    press_only: bool,
}

impl Input {
    fn new(events: Receiver<InputEvent>) -> Self {
        Input {
            keypad: Keypad::new(),
            events,
            press_only: false,
        }
    }

    /// Applies queued hook events to the keypad. Returns false once the user
    /// asked to quit.
    fn apply(&mut self) -> bool {
        loop {
            match self.events.try_recv() {
                Ok(InputEvent::Down(key)) => self.keypad.press_key(key),
                Ok(InputEvent::Up(key)) => self.keypad.release_key(key),
                Ok(InputEvent::Quit) => return false,
                Ok(InputEvent::HookLost) => {
                    warn!("global keyboard hook lost, using terminal key presses");
                    self.press_only = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return true,
            }
        }
    }

    /// Handles a key event read from the terminal. Returns false on Esc.
    fn terminal_key(&mut self, event: KeyEvent) -> bool {
        if event.code == KeyCode::Esc {
            return false;
        }
        if self.press_only && event.kind == KeyEventKind::Press {
            if let Some(key) = map_terminal_key(event.code) {
                self.keypad.press_key(key);
            }
        }
        true
    }

    fn end_frame(&mut self) {
        if self.press_only {
            self.keypad.release_all();
        }
    }
}

pub struct Emulator {
    chip8: Chip8,
    settings: Settings,
    input: Input,
}

impl Emulator {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let mut chip8 = Chip8::with_seed(settings.seed);
        chip8
            .load_rom_file(&settings.rom)
            .with_context(|| format!("failed to load {}", settings.rom.display()))?;

        let (tx, rx) = mpsc::channel();
        spawn_key_listener(tx);

        Ok(Emulator {
            chip8,
            settings,
            input: Input::new(rx),
        })
    }

    fn draw(&self, frame: &mut ratatui::Frame, area: Rect, rom_name: &str) {
        // Calculate the exact size needed for 64x32 display plus borders
        let game_width = (DISPLAY_WIDTH as u16) + 2;
        let game_height = (DISPLAY_HEIGHT as u16) + 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(game_height),
                Constraint::Length(7),
                Constraint::Min(0),
            ])
            .split(area);

        // Center the game horizontally if the terminal is wider than needed
        let game_area = if chunks[0].width > game_width {
            let horizontal_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Min(0),
                    Constraint::Length(game_width),
                    Constraint::Min(0),
                ])
                .split(chunks[0]);
            horizontal_chunks[1]
        } else {
            chunks[0]
        };

        let framebuffer = self.chip8.framebuffer();
        let mut screen = String::with_capacity(DISPLAY_WIDTH * DISPLAY_HEIGHT + DISPLAY_HEIGHT);
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                screen.push(if framebuffer.pixel(x, y) { '█' } else { ' ' });
            }
            screen.push('\n');
        }

        let title = if self.chip8.sound_active() {
            format!("{rom_name} ♪")
        } else {
            rom_name.to_string()
        };
        let game_paragraph = Paragraph::new(screen)
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().fg(Color::White));
        frame.render_widget(game_paragraph, game_area);

        let key_mapping = "Key Mapping (Esc quits):\n\
    1 2 3 4    →    1 2 3 C\n\
    Q W E R    →    4 5 6 D\n\
    A S D F    →    7 8 9 E\n\
    Z X C V    →    A 0 B F";
        let keypad_title = if self.input.press_only {
            "Keypad (press only)"
        } else {
            "Keypad"
        };
        let key_paragraph = Paragraph::new(key_mapping)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(keypad_title))
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(key_paragraph, chunks[1]);
    }

    fn main_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let rom_name = self.settings.rom_name();
        let start = Instant::now();
        let mut cpu_clock = Pacer::new(self.settings.ips, start);
        let mut frame_clock = Pacer::new(self.settings.frame_rate, start);

        loop {
            // Consume crossterm events so keys do not echo
            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    if !self.input.terminal_key(key) {
                        return Ok(());
                    }
                }
            }

            let now = Instant::now();
            for _ in 0..cpu_clock.due(now) {
                if !self.input.apply() {
                    return Ok(());
                }
                self.chip8.step(&self.input.keypad)?;
            }

            let frames = frame_clock.due(now);
            if frames > 0 {
                for _ in 0..frames {
                    self.chip8.tick_timers();
                }
                terminal.draw(|frame| {
                    let area = frame.area();
                    self.draw(frame, area, &rom_name);
                })?;
                self.input.end_frame();
            }

            if !self.input.apply() {
                return Ok(());
            }

            let now = Instant::now();
            std::thread::sleep(cpu_clock.until_next(now).min(frame_clock.until_next(now)));
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        info!(
            "running {} at {} instructions/s, {} frames/s",
            self.settings.rom.display(),
            self.settings.ips,
            self.settings.frame_rate
        );

        enable_raw_mode()?;
        let stdout = std::io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.main_loop(&mut terminal);

        let cleared = terminal.clear();
        disable_raw_mode()?;
        cleared?;
        info!("stopped");

        result.context("emulation halted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn maps_the_conventional_layout() {
        use rdev::Key as Host;

        let rows = [
            ([Host::Num1, Host::Num2, Host::Num3, Host::Num4], [0x1, 0x2, 0x3, 0xC]),
            ([Host::KeyQ, Host::KeyW, Host::KeyE, Host::KeyR], [0x4, 0x5, 0x6, 0xD]),
            ([Host::KeyA, Host::KeyS, Host::KeyD, Host::KeyF], [0x7, 0x8, 0x9, 0xE]),
            ([Host::KeyZ, Host::KeyX, Host::KeyC, Host::KeyV], [0xA, 0x0, 0xB, 0xF]),
        ];
        for (host, logical) in rows {
            for (host, logical) in host.into_iter().zip(logical) {
                assert_eq!(map_host_key(host), Key::from_index(logical));
            }
        }
        assert_eq!(map_host_key(rdev::Key::KeyP), None);
    }

    #[test]
    fn translates_press_release_and_escape() {
        assert_eq!(
            translate(rdev::EventType::KeyPress(rdev::Key::KeyW)),
            Some(InputEvent::Down(Key::Key5))
        );
        assert_eq!(
            translate(rdev::EventType::KeyRelease(rdev::Key::KeyW)),
            Some(InputEvent::Up(Key::Key5))
        );
        assert_eq!(
            translate(rdev::EventType::KeyPress(rdev::Key::Escape)),
            Some(InputEvent::Quit)
        );
        assert_eq!(translate(rdev::EventType::KeyRelease(rdev::Key::Escape)), None);
    }

    #[test]
    fn terminal_keys_use_the_same_layout() {
        assert_eq!(map_terminal_key(KeyCode::Char('q')), Some(Key::Key4));
        assert_eq!(map_terminal_key(KeyCode::Char('V')), Some(Key::KeyF));
        assert_eq!(map_terminal_key(KeyCode::Char('p')), None);
        assert_eq!(map_terminal_key(KeyCode::Enter), None);
    }

    #[test]
    fn hook_events_drive_the_keypad() {
        let (tx, rx) = mpsc::channel();
        let mut input = Input::new(rx);
        tx.send(InputEvent::Down(Key::Key7)).unwrap();
        assert!(input.apply());
        assert!(input.keypad.is_key_pressed(Key::Key7));

        // Terminal presses are ignored while the hook reports key-up
        assert!(input.terminal_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::NONE)));
        assert!(!input.keypad.is_key_pressed(Key::Key5));

        input.end_frame();
        assert!(input.keypad.is_key_pressed(Key::Key7));

        tx.send(InputEvent::Up(Key::Key7)).unwrap();
        tx.send(InputEvent::Quit).unwrap();
        assert!(!input.apply());
        assert!(!input.keypad.is_key_pressed(Key::Key7));
    }

    #[test]
    fn losing_the_hook_falls_back_to_terminal_presses() {
        let (tx, rx) = mpsc::channel();
        let mut input = Input::new(rx);
        tx.send(InputEvent::HookLost).unwrap();
        drop(tx);
        assert!(input.apply());
        assert!(input.press_only);

        assert!(input.terminal_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::NONE)));
        assert!(input.keypad.is_key_pressed(Key::Key5));

        // Held for the rest of the frame, then released
        assert!(input.apply());
        assert!(input.keypad.is_key_pressed(Key::Key5));
        input.end_frame();
        assert!(!input.keypad.is_key_pressed(Key::Key5));

        assert!(!input.terminal_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
    }

    #[test]
    fn settings_default_rates() {
        let settings = Settings::new("roms/pong.ch8");
        assert_eq!(settings.frame_rate, 60);
        assert_eq!(settings.ips, 500);
        assert_eq!(settings.rom_name(), "pong");
    }
}
