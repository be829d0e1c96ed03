use crate::entry::{Entry, EntryKind};
use crate::short_path::{PathShortener, SystemShortener};
use crate::template::{format_timestamp, human_size};
use chrono::{DateTime, Local};
use std::path::Path;

const TIMESTAMP_WIDTH: usize = 19;
const SIZE_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayOptions {
    pub detailed: bool,
    pub short_names: bool,
}

/// Turns entries and moves into result lines.
#[derive(Debug, Clone, Default)]
pub struct Presenter<S = SystemShortener> {
    options: DisplayOptions,
    shortener: S,
}

impl Presenter<SystemShortener> {
    pub fn new(options: DisplayOptions) -> Self {
        Self::with_shortener(options, SystemShortener)
    }
}

impl<S: PathShortener> Presenter<S> {
    pub fn with_shortener(options: DisplayOptions, shortener: S) -> Self {
        Self { options, shortener }
    }

    pub fn display_path(&self, path: &Path) -> String {
        if self.options.short_names {
            self.shortener.shorten(path).display().to_string()
        } else {
            path.display().to_string()
        }
    }

    pub fn search_line(&self, entry: &Entry) -> String {
        self.with_prefix(entry, self.display_path(&entry.path))
    }

    pub fn replace_line(&self, entry: &Entry, destination: &Path) -> String {
        let line = format!(
            "{}  --->  {}",
            self.display_path(&entry.path),
            self.display_path(destination)
        );
        self.with_prefix(entry, line)
    }

    fn with_prefix(&self, entry: &Entry, line: String) -> String {
        if self.options.detailed {
            format!("{} {}", detail_prefix(entry), line)
        } else {
            line
        }
    }
}

/// Fixed-width `[created] [modified] size` block.
pub fn detail_prefix(entry: &Entry) -> String {
    let size = match entry.kind {
        EntryKind::Directory => "<DIR>".to_string(),
        EntryKind::File => entry.size.map(human_size).unwrap_or_default(),
    };
    format!(
        "[{}] [{}] {:>width$}",
        padded_time(entry.created.as_ref()),
        padded_time(entry.modified.as_ref()),
        size,
        width = SIZE_WIDTH
    )
}

fn padded_time(time: Option<&DateTime<Local>>) -> String {
    let text = time.map(format_timestamp).unwrap_or_default();
    format!("{:<width$}", text, width = TIMESTAMP_WIDTH)
}
