//! Trace Decoder
//!
//! Instrumented test binaries report what they executed as one fact per
//! line:
//!
//! ```text
//! <test-id> $<global-block-id>$ branch[<block-index> <distance>]
//! <test-id> $<global-block-id>$ root
//! ```
//!
//! Trace channels are shared with ordinary log output, so lines that do not
//! start with a numeric test id (or carry no `$..$` block identity) are
//! skipped rather than rejected. A well-formed line with an unknown kind is
//! a format violation.

mod store;

pub use store::{FileTraceStore, MemoryTraceStore, StoreError, StoreResult, TraceStore, TRACE_FILE_ENV};

use crate::coverage::{BasicBlock, Coverage};
use std::collections::BTreeMap;
use thiserror::Error;

pub type TraceResult<T> = Result<T, TraceError>;

#[derive(Debug, Error, PartialEq)]
pub enum TraceError {
    /// Kind token other than `branch` or `root`
    #[error("unknown trace kind '{kind}' in line: {line}")]
    UnknownKind { kind: String, line: String },

    /// `branch` payload that is not `[<index> <distance>]`
    #[error("malformed trace payload in line: {line}")]
    MalformedPayload { line: String },
}

/// One decoded execution fact.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFact {
    pub test_id: u64,
    pub block: BasicBlock,
    pub distance: f64,
}

impl TraceFact {
    /// Protocol line for this fact; `root` facts round-trip as `root`.
    pub fn to_line(&self) -> String {
        if self.block.block_id == 0 && self.distance == 0.0 {
            format!("{} ${}$ root", self.test_id, self.block.global_id)
        } else {
            format!(
                "{} ${}$ branch[{} {}]",
                self.test_id, self.block.global_id, self.block.block_id, self.distance
            )
        }
    }
}

/// Decode a single line. `Ok(None)` means the line is not a trace fact.
pub fn parse_line(line: &str) -> TraceResult<Option<TraceFact>> {
    let line = line.trim();
    let Some(test_id) = line
        .split_whitespace()
        .next()
        .and_then(|tok| tok.parse::<u64>().ok())
    else {
        return Ok(None);
    };

    let (Some(first), Some(last)) = (line.find('$'), line.rfind('$')) else {
        return Ok(None);
    };
    if first == last {
        return Ok(None);
    }
    let global_id = &line[first + 1..last];
    let rest = line[last + 1..].trim();

    let (kind, payload) = match rest.find('[') {
        Some(open) => (&rest[..open], Some(&rest[open..])),
        None => (rest, None),
    };

    match kind {
        "root" => Ok(Some(TraceFact {
            test_id,
            block: BasicBlock::new(global_id, 0),
            distance: 0.0,
        })),
        "branch" => {
            let (block_id, distance) = payload
                .and_then(parse_branch_payload)
                .ok_or_else(|| TraceError::MalformedPayload {
                    line: line.to_string(),
                })?;
            Ok(Some(TraceFact {
                test_id,
                block: BasicBlock::new(global_id, block_id),
                distance,
            }))
        }
        other => Err(TraceError::UnknownKind {
            kind: other.to_string(),
            line: line.to_string(),
        }),
    }
}

fn parse_branch_payload(payload: &str) -> Option<(u64, f64)> {
    let inner = payload.strip_prefix('[')?.strip_suffix(']')?;
    let mut parts = inner.split_whitespace();
    let block_id = parts.next()?.parse::<u64>().ok()?;
    let distance = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() || !distance.is_finite() || distance < 0.0 {
        return None;
    }
    Some((block_id, distance))
}

/// Decode every line and group facts by test id. For repeated hits on the
/// same block the smallest distance wins.
pub fn decode<'a, I>(lines: I) -> TraceResult<BTreeMap<u64, Coverage>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut traces: BTreeMap<u64, Coverage> = BTreeMap::new();
    let mut skipped = 0usize;
    for line in lines {
        match parse_line(line)? {
            Some(fact) => traces
                .entry(fact.test_id)
                .or_default()
                .record(fact.block, fact.distance),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, tests = traces.len(), "ignored non-trace lines");
    }
    Ok(traces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_line() {
        let fact = parse_line("3 $mycrate::foo$ branch[2 0.75]").unwrap().unwrap();
        assert_eq!(fact.test_id, 3);
        assert_eq!(fact.block, BasicBlock::new("mycrate::foo", 2));
        assert_eq!(fact.distance, 0.75);
    }

    #[test]
    fn test_root_line() {
        let fact = parse_line("3 $mycrate::foo$ root").unwrap().unwrap();
        assert_eq!(fact.block.block_id, 0);
        assert_eq!(fact.distance, 0.0);
    }

    #[test]
    fn test_noise_is_ignored() {
        assert_eq!(parse_line("garbage not a trace").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("12 tests passed").unwrap(), None);
        assert_eq!(parse_line("4 $only-one-dollar branch[1 1.0]").unwrap(), None);
    }

    #[test]
    fn test_unknown_kind_is_fatal() {
        let err = parse_line("3 $mycrate::foo$ loop[1 2.0]").unwrap_err();
        assert!(matches!(err, TraceError::UnknownKind { ref kind, .. } if kind == "loop"));
    }

    #[test]
    fn test_malformed_branch_payload() {
        for line in [
            "3 $a$ branch",
            "3 $a$ branch[2]",
            "3 $a$ branch[x 1.0]",
            "3 $a$ branch[2 -1.0]",
            "3 $a$ branch[2 NaN]",
            "3 $a$ branch[2 1.0 7]",
        ] {
            assert!(
                matches!(parse_line(line), Err(TraceError::MalformedPayload { .. })),
                "{line}"
            );
        }
    }

    #[test]
    fn test_global_id_spans_first_to_last_dollar() {
        let fact = parse_line("1 $a$b$ root").unwrap().unwrap();
        assert_eq!(fact.block.global_id, "a$b");
    }

    #[test]
    fn test_decode_groups_by_test_and_keeps_minimum() {
        let lines = [
            "3 $mycrate::foo$ root",
            "3 $mycrate::foo$ branch[2 0.75]",
            "running 2 tests",
            "3 $mycrate::foo$ branch[2 0.25]",
            "5 $mycrate::bar$ branch[1 4.0]",
        ];
        let traces = decode(lines).unwrap();
        assert_eq!(traces.len(), 2);
        let foo = &traces[&3];
        assert_eq!(foo.distance(&BasicBlock::new("mycrate::foo", 2)), Some(0.25));
        assert!(foo.is_covered(&BasicBlock::new("mycrate::foo", 0)));
        assert_eq!(traces[&5].len(), 1);
    }

    #[test]
    fn test_to_line_parses_back() {
        let fact = TraceFact {
            test_id: 8,
            block: BasicBlock::new("c::f", 3),
            distance: 1.5,
        };
        assert_eq!(parse_line(&fact.to_line()).unwrap(), Some(fact));
    }
}
