use std::{
    collections::HashMap,
    io::{self, Write},
    thread::{self, JoinHandle},
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use log::error;

use crate::error::{Error, Result};
use crate::models::message::OutputRecord;

const SEPARATOR: &str = " |";

pub const PALETTE: [Color; 14] = [
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Red,
    Color::DarkCyan,
    Color::DarkGreen,
    Color::DarkYellow,
    Color::DarkBlue,
    Color::DarkMagenta,
    Color::DarkRed,
    Color::Grey,
    Color::White,
];

/// Renders records from every task with a padded, colored source prefix.
///
/// All state here is owned by the single consumer thread, so the color table
/// and the prefix width never need locking.
pub struct LineSink<W: Write> {
    writer: W,
    colored: bool,
    colors: HashMap<String, Color>,
    width: usize,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self {
            writer,
            colored,
            colors: HashMap::new(),
            width: 0,
        }
    }

    /// Color for `source`, assigning the next palette entry on first sight.
    pub fn color_for(&mut self, source: &str) -> Color {
        if let Some(color) = self.colors.get(source) {
            return *color;
        }
        let color = PALETTE[self.colors.len() % PALETTE.len()];
        self.colors.insert(source.to_string(), color);
        self.width = self.width.max(source.chars().count());
        color
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Writes one record as a single unit and flushes it.
    pub fn render(&mut self, record: &OutputRecord) -> io::Result<()> {
        let color = self.color_for(&record.source);
        let prefix = format!("{:<width$}{}", record.source, SEPARATOR, width = self.width);
        if self.colored {
            queue!(
                self.writer,
                SetForegroundColor(color),
                Print(prefix),
                ResetColor,
                Print(" "),
                Print(&record.text),
                Print("\n")
            )?;
        } else {
            writeln!(self.writer, "{} {}", prefix, record.text)?;
        }
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// The consumer thread behind a [`LineSink`] plus the sending side feeding it.
pub struct Console<W: Write + Send + 'static> {
    sender: Sender<OutputRecord>,
    handle: JoinHandle<W>,
}

impl<W: Write + Send + 'static> Console<W> {
    pub fn spawn(writer: W, colored: bool) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let handle = thread::Builder::new()
            .name("console".to_string())
            .spawn(move || drain(LineSink::new(writer, colored), receiver))
            .map_err(|e| Error::Console(format!("failed to start console thread: {}", e)))?;
        Ok(Self { sender, handle })
    }

    pub fn sender(&self) -> Sender<OutputRecord> {
        self.sender.clone()
    }

    /// Closes our side of the channel and waits until every pending record
    /// has been rendered. Records still held by other senders keep the
    /// consumer alive until those senders are dropped too.
    pub fn finish(self) -> Result<W> {
        drop(self.sender);
        self.handle
            .join()
            .map_err(|_| Error::Console("console thread panicked".to_string()))
    }
}

fn drain<W: Write>(mut sink: LineSink<W>, receiver: Receiver<OutputRecord>) -> W {
    for record in receiver {
        if let Err(e) = sink.render(&record) {
            error!("Failed to write line from '{}': {}", record.source, e);
        }
    }
    sink.into_inner()
}
