mod entry;
mod error;
mod filter;
mod launcher;
mod mover;
mod presenter;
mod short_path;
mod template;
mod walker;

pub use entry::{Entry, EntryKind};
pub use error::{Result, RsrError};
pub use filter::{
    compile_pattern, find, select, FilterOptions, KindFilter, MatchInfo, MatchedEntry, Matcher,
    ResultSet,
};
pub use launcher::{launch, ChildSlot};
pub use mover::{Mover, OverwritePrompt, ReplaceOptions, ReplaceOutcome, ReplaceStats};
pub use presenter::{detail_prefix, DisplayOptions, Presenter};
pub use short_path::{Identity, PathShortener, SystemShortener};
pub use template::{
    expand, format_timestamp, format_timestamp_utc, human_size, parse_template, render_template,
    MetaToken, TemplatePart,
};
pub use walker::{enumerate, Entries};
