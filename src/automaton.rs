//! On-disk codec for `automaton.daac` and the in-memory matching engine
//! built from it.
//!
//! The `aho-corasick` crate (already this codebase's dependency for
//! multi-pattern matching) does not expose a public byte-serialization of
//! its internal automaton. `automaton.daac` therefore persists the
//! ordered, length-prefixed pattern byte-strings — exactly what is needed
//! to deterministically rebuild an identical automaton — and the loader
//! reconstructs the `AhoCorasick` value from that file. See DESIGN.md for
//! the full rationale.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::error::{BuildError, MatchError};

const MAGIC: &[u8; 4] = b"PFAC";
const FORMAT_VERSION: u16 = 1;

/// Writes the ordered pattern byte-strings to `path` in insertion order.
pub fn write_patterns(path: &Path, patterns: &[Vec<u8>]) -> Result<(), BuildError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&(patterns.len() as u32).to_le_bytes())?;
    for pattern in patterns {
        writer.write_all(&(pattern.len() as u32).to_le_bytes())?;
        writer.write_all(pattern)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads back the ordered pattern byte-strings, verifying the magic and
/// format version. This is the "deserialize and verify" step the loader
/// performs before handing the patterns to the automaton builder.
pub fn read_patterns(path: &Path) -> Result<Vec<Vec<u8>>, MatchError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(|_| MatchError::CorruptAutomaton {
        path: path.display().to_string(),
        reason: "truncated header".to_string(),
    })?;
    if &magic != MAGIC {
        return Err(MatchError::CorruptAutomaton {
            path: path.display().to_string(),
            reason: "bad magic bytes".to_string(),
        });
    }

    let mut version_buf = [0u8; 2];
    reader.read_exact(&mut version_buf)?;
    let version = u16::from_le_bytes(version_buf);
    if version != FORMAT_VERSION {
        return Err(MatchError::CorruptAutomaton {
            path: path.display().to_string(),
            reason: format!("unsupported format version {version}"),
        });
    }

    let mut count_buf = [0u8; 4];
    reader.read_exact(&mut count_buf)?;
    let num_patterns = u32::from_le_bytes(count_buf) as usize;

    let mut patterns = Vec::with_capacity(num_patterns);
    for _ in 0..num_patterns {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf)?;
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut pattern = vec![0u8; len];
        reader.read_exact(&mut pattern)?;
        patterns.push(pattern);
    }

    Ok(patterns)
}

/// Builds the overlapping-match automaton used by the matcher. Pattern
/// index equals insertion order, matching the payload table's indexing.
pub fn build_automaton(patterns: &[Vec<u8>]) -> Result<AhoCorasick, MatchError> {
    let automaton = AhoCorasickBuilder::new()
        .match_kind(MatchKind::Standard)
        .build(patterns)?;
    Ok(automaton)
}

/// Loads `automaton.daac` into a ready-to-query `AhoCorasick`, returning
/// the pattern count alongside it so the caller can cross-check it
/// against the manifest.
pub fn load_automaton(path: &Path) -> Result<(AhoCorasick, u32), MatchError> {
    let patterns = read_patterns(path)?;
    let num_patterns = patterns.len() as u32;
    let automaton = build_automaton(&patterns)?;
    Ok((automaton, num_patterns))
}
