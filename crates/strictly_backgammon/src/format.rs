//! One entry point per direction for every match format.

use crate::error::{MatchError, MatchErrorKind};
use crate::game::Match;
use crate::{jf, jfibs, md, stn};
use serde::{Deserialize, Serialize};
use strictly_stn::WriterOptions;
use tracing::instrument;

/// Match file formats.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchFormat {
    /// Standard tree notation with the backgammon flavor.
    Stn,
    /// Match dump.
    Md,
    /// JF event log (read only).
    Jf,
    /// JFibs tabular transcript (read only).
    #[strum(serialize = "jfibs")]
    JFibs,
}

impl MatchFormat {
    /// Whether [`write_match`] supports the format.
    pub fn is_writable(self) -> bool {
        matches!(self, Self::Stn | Self::Md)
    }
}

/// Reads a match in the given format.
#[instrument(skip(input), fields(bytes = input.len()))]
pub fn read_match(input: &[u8], format: MatchFormat) -> Result<Match, MatchError> {
    match format {
        MatchFormat::Stn => stn::read_stn(input),
        MatchFormat::Md => md::read_md(input),
        MatchFormat::Jf => jf::read_jf(input),
        MatchFormat::JFibs => jfibs::read_jfibs(input),
    }
}

/// Writes a match in the given format.
///
/// Only [`MatchFormat::Stn`] and [`MatchFormat::Md`] can be written.
#[instrument(skip(record, options))]
pub fn write_match(
    record: &Match,
    format: MatchFormat,
    options: &WriterOptions,
) -> Result<Vec<u8>, MatchError> {
    match format {
        MatchFormat::Stn => stn::write_stn(record, options),
        MatchFormat::Md => {
            let mut buffer = Vec::new();
            md::write_md(record, &mut buffer)?;
            Ok(buffer)
        }
        MatchFormat::Jf | MatchFormat::JFibs => Err(MatchError::new(
            MatchErrorKind::InvalidArgument,
            format!("{} cannot be written", format),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!("jfibs".parse::<MatchFormat>().unwrap(), MatchFormat::JFibs);
        assert_eq!(MatchFormat::Md.to_string(), "md");
        assert!(!MatchFormat::Jf.is_writable());
    }

    #[test]
    fn legacy_formats_are_read_only() {
        let record = Match::new("a", "b", 1, false);
        let err = write_match(&record, MatchFormat::Jf, &WriterOptions::default()).unwrap_err();
        assert_eq!(err.kind(), MatchErrorKind::InvalidArgument);
    }
}
