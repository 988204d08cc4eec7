//! Trace protocol decoding through the public API.

use synthesis::trace::{decode, parse_line, MemoryTraceStore, TraceError, TraceStore};
use synthesis::BasicBlock;

#[test]
fn test_documented_examples() {
    let branch = parse_line("3 $mycrate::foo$ branch[2 0.75]").unwrap().unwrap();
    assert_eq!(branch.test_id, 3);
    assert_eq!(branch.block, BasicBlock::new("mycrate::foo", 2));
    assert_eq!(branch.distance, 0.75);

    let root = parse_line("3 $mycrate::foo$ root").unwrap().unwrap();
    assert_eq!(root.block, BasicBlock::new("mycrate::foo", 0));
    assert_eq!(root.distance, 0.0);

    assert!(parse_line("garbage not a trace").unwrap().is_none());
}

#[test]
fn test_interleaved_log_output() {
    let output = "\
   Compiling mycrate v0.1.0
running 2 tests
1 $mycrate::a$ root
[INFO] instrumented mycrate
1 $mycrate::a$ branch[3 12]
2 $mycrate::b$ branch[1 0]
test result: ok. 2 passed
";
    let traces = decode(output.lines()).unwrap();
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[&1].distance(&BasicBlock::new("mycrate::a", 3)), Some(12.0));
    assert_eq!(traces[&2].covered_blocks(), 1);
}

#[test]
fn test_unknown_kind_aborts_decoding() {
    let lines = ["1 $a$ root", "1 $a$ switch[0 1.0]"];
    assert!(matches!(decode(lines), Err(TraceError::UnknownKind { .. })));
}

#[test]
fn prop_decode_keeps_minimum_distance() {
    for seed in 1..40u64 {
        let mut store = MemoryTraceStore::new();
        let mut expected = f64::INFINITY;
        for i in 0..(seed % 7 + 1) {
            let distance = ((seed * 31 + i * 17) % 23) as f64 / 4.0;
            expected = expected.min(distance);
            store.push_line(format!("{seed} $mycrate::f$ branch[5 {distance}]"));
        }
        let traces = store.drain().unwrap();
        assert_eq!(
            traces[&seed].distance(&BasicBlock::new("mycrate::f", 5)),
            Some(expected),
            "seed {seed}"
        );
    }
}
