// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod keys;
mod render;
mod theme;

pub use keys::*;
pub use render::*;
pub use theme::*;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use rpcdeck_app::{Area, Command, Dispatcher, Message, Session};
use std::io;
use std::sync::mpsc::Receiver;
use std::time::Duration;

const IDLE_POLL: Duration = Duration::from_millis(120);

/// What one turn of the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Quit,
    /// Commands ran or messages arrived; another turn should follow right away.
    Busy,
    Idle,
}

/// Couples the session to the dispatcher: commands out, messages back in.
///
/// Holds no terminal state so it can be driven headless.
pub struct AppLoop<'a> {
    session: &'a mut Session,
    dispatcher: &'a mut Dispatcher,
    rx: &'a Receiver<Message>,
    pending: Vec<Command>,
}

impl<'a> AppLoop<'a> {
    pub fn new(
        session: &'a mut Session,
        dispatcher: &'a mut Dispatcher,
        rx: &'a Receiver<Message>,
    ) -> Self {
        let pending = session.init();
        Self {
            session,
            dispatcher,
            rx,
            pending,
        }
    }

    pub fn session(&self) -> &Session {
        self.session
    }

    pub fn handle(&mut self, message: Message) {
        let commands = self.session.handle(message);
        self.pending.extend(commands);
    }

    /// Runs queued commands, releases at most one invocation event, and applies every queued
    /// message.
    pub fn step(&mut self) -> Step {
        let mut busy = !self.pending.is_empty();
        for command in std::mem::take(&mut self.pending) {
            if command == Command::Quit {
                tracing::debug!("quit requested");
                return Step::Quit;
            }
            self.dispatcher.execute(command);
        }

        busy |= self.dispatcher.pump_invocation();
        while let Ok(message) = self.rx.try_recv() {
            busy = true;
            self.handle(message);
        }

        if busy { Step::Busy } else { Step::Idle }
    }
}

/// Runs the interactive session until the user quits.
pub fn run_app(
    session: &mut Session,
    dispatcher: &mut Dispatcher,
    rx: &Receiver<Message>,
    keys: &KeyMap,
    theme: &Theme,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let result = match Terminal::new(backend).context("create terminal") {
        Ok(mut terminal) => event_loop(&mut terminal, session, dispatcher, rx, keys, theme),
        Err(error) => Err(error),
    };

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut Session,
    dispatcher: &mut Dispatcher,
    rx: &Receiver<Message>,
    keys: &KeyMap,
    theme: &Theme,
) -> Result<()> {
    let size = terminal.size().context("read terminal size")?;
    let mut app = AppLoop::new(session, dispatcher, rx);
    app.handle(Message::Resize(Area::new(size.width, size.height)));

    loop {
        let step = app.step();
        if step == Step::Quit {
            return Ok(());
        }

        terminal
            .draw(|frame| render(frame, app.session(), keys, theme))
            .context("draw frame")?;

        let timeout = if step == Step::Busy {
            Duration::ZERO
        } else {
            IDLE_POLL
        };
        if !event::poll(timeout).context("poll event")? {
            continue;
        }
        match event::read().context("read event")? {
            Event::Key(key) => {
                let session = app.session();
                if let Some(input) = keys.input_for(session.view(), session.filtering(), &key) {
                    app.handle(Message::Input(input));
                }
            }
            Event::Resize(width, height) => app.handle(Message::Resize(Area::new(width, height))),
            _ => {}
        }
    }
}
