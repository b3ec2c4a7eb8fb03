//! Property tests for line framing

use chillerlink::{FrameEvent, LineFramer};
use proptest::prelude::*;

const MAX_LINE: usize = 64;

fn feed_in_chunks(input: &[u8], cuts: &[usize]) -> Vec<FrameEvent> {
    let mut framer = LineFramer::new(MAX_LINE);
    let mut events = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        let end = cut.min(input.len()).max(start);
        events.extend(framer.feed(&input[start..end]));
        start = end;
    }
    events.extend(framer.feed(&input[start..]));
    events
}

fn stream() -> impl Strategy<Value = Vec<u8>> {
    // Mostly printable bytes with frequent terminators and the odd long run
    prop::collection::vec(
        prop_oneof![
            8 => prop::sample::select(b"{}\":,. 0123456789abcXYZ_".to_vec()),
            2 => Just(b'\n'),
            1 => Just(b'\r'),
            1 => any::<u8>(),
        ],
        0..400,
    )
}

proptest! {
    #[test]
    fn events_do_not_depend_on_chunking(
        input in stream(),
        mut cuts in prop::collection::vec(0usize..400, 0..20),
    ) {
        cuts.sort_unstable();
        let whole = {
            let mut framer = LineFramer::new(MAX_LINE);
            framer.feed(&input)
        };
        prop_assert_eq!(feed_in_chunks(&input, &cuts), whole);
    }

    #[test]
    fn lines_respect_bound_and_are_trimmed(input in stream()) {
        let mut framer = LineFramer::new(MAX_LINE);
        for event in framer.feed(&input) {
            if let FrameEvent::Line(line) = event {
                prop_assert!(!line.is_empty());
                prop_assert!(line.len() <= MAX_LINE * 3);
                prop_assert_eq!(line.trim(), line.as_str());
                prop_assert!(!line.contains('\n'));
            }
        }
        prop_assert!(framer.buffered_len() <= MAX_LINE);
    }
}
