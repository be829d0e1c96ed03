use crate::filter::MatchedEntry;
use crate::template::{parse_template, render_template, TemplatePart};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReplaceOptions {
    /// Go through every step except the rename itself.
    pub mock: bool,
    /// Splice the expansion into the comparison string at the matched span
    /// instead of using it as the whole new name.
    pub match_only: bool,
    /// Overwrite existing destinations without asking.
    pub force: bool,
}

/// Asked before a move would replace an existing object.
pub trait OverwritePrompt {
    fn confirm_overwrite(&mut self, source: &Path, destination: &Path) -> Result<bool>;
}

impl<F> OverwritePrompt for F
where
    F: FnMut(&Path, &Path) -> Result<bool>,
{
    fn confirm_overwrite(&mut self, source: &Path, destination: &Path) -> Result<bool> {
        self(source, destination)
    }
}

#[derive(Debug)]
pub enum ReplaceOutcome {
    Moved {
        from: PathBuf,
        to: PathBuf,
        mocked: bool,
    },
    Unchanged {
        path: PathBuf,
    },
    /// Destination existed and the overwrite was declined.
    Skipped {
        from: PathBuf,
        to: PathBuf,
    },
    Failed {
        from: PathBuf,
        to: Option<PathBuf>,
        error: anyhow::Error,
    },
}

impl ReplaceOutcome {
    pub fn source(&self) -> &Path {
        match self {
            ReplaceOutcome::Moved { from, .. }
            | ReplaceOutcome::Skipped { from, .. }
            | ReplaceOutcome::Failed { from, .. } => from,
            ReplaceOutcome::Unchanged { path } => path,
        }
    }

    pub fn destination(&self) -> Option<&Path> {
        match self {
            ReplaceOutcome::Moved { to, .. } | ReplaceOutcome::Skipped { to, .. } => Some(to),
            ReplaceOutcome::Unchanged { path } => Some(path),
            ReplaceOutcome::Failed { to, .. } => to.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ReplaceStats {
    pub matched: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ReplaceStats {
    pub fn record(&mut self, outcome: &ReplaceOutcome) {
        self.matched += 1;
        match outcome {
            ReplaceOutcome::Moved { .. } => self.replaced += 1,
            ReplaceOutcome::Unchanged { .. } => self.unchanged += 1,
            ReplaceOutcome::Skipped { .. } => self.skipped += 1,
            ReplaceOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mover {
    template: Vec<TemplatePart>,
    options: ReplaceOptions,
}

impl Mover {
    pub fn new(replacement: &str, options: ReplaceOptions) -> Self {
        Self {
            template: parse_template(replacement),
            options,
        }
    }

    /// Absolute destination for one matched entry.
    pub fn destination(&self, matched: &MatchedEntry) -> Result<PathBuf> {
        let expanded = render_template(&self.template, &matched.captures, &matched.entry);
        let target = if self.options.match_only {
            splice_match(matched, &expanded)
        } else {
            expanded
        };

        if target.is_empty() {
            anyhow::bail!(
                "The replacement for '{}' expands to an empty name",
                matched.entry.path.display()
            );
        }

        let target = Path::new(&target);
        if target.is_absolute() || target.has_root() {
            Ok(target.to_path_buf())
        } else {
            Ok(matched.entry.parent().join(target))
        }
    }

    /// Resolves, checks and performs the move of one entry. Never panics or
    /// aborts on per-entry problems; they come back as `Failed`.
    pub fn apply(&self, matched: &MatchedEntry, prompt: &mut dyn OverwritePrompt) -> ReplaceOutcome {
        let from = matched.entry.path.clone();
        let to = match self.destination(matched) {
            Ok(to) => to,
            Err(error) => {
                return ReplaceOutcome::Failed {
                    from,
                    to: None,
                    error,
                }
            }
        };

        if to == from {
            debug!(path = %from.display(), "destination equals source");
            return ReplaceOutcome::Unchanged { path: from };
        }

        if exists(&to) && !self.options.force {
            match prompt.confirm_overwrite(&from, &to) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(to = %to.display(), "overwrite declined");
                    return ReplaceOutcome::Skipped { from, to };
                }
                Err(error) => {
                    return ReplaceOutcome::Failed {
                        from,
                        to: Some(to),
                        error,
                    }
                }
            }
        }

        if self.options.mock {
            return ReplaceOutcome::Moved {
                from,
                to,
                mocked: true,
            };
        }

        match move_entry(&from, &to) {
            Ok(()) => {
                info!(from = %from.display(), to = %to.display(), "moved");
                ReplaceOutcome::Moved {
                    from,
                    to,
                    mocked: false,
                }
            }
            Err(error) => ReplaceOutcome::Failed {
                from,
                to: Some(to),
                error,
            },
        }
    }
}

fn splice_match(matched: &MatchedEntry, expanded: &str) -> String {
    let captures = &matched.captures;
    if !captures.success {
        return matched.comparison.clone();
    }
    let source = &matched.comparison;
    let end = captures.start + captures.length;
    format!("{}{}{}", &source[..captures.start], expanded, &source[end..])
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// A single rename: directories move as a whole subtree, files replace an
/// existing file at the destination.
fn move_entry(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to)
        .with_context(|| format!("Could not move '{}' to '{}'", from.display(), to.display()))
}
