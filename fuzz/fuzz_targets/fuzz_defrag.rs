#![no_main]
use libfuzzer_sys::fuzz_target;

use mote_tls::record::defrag::Defragmenter;
use mote_tls::record::RecordFramer;

fuzz_target!(|data: &[u8]| {
    let mut framer = RecordFramer::new();
    let mut defrag = Defragmenter::new();
    // Feed in two halves to exercise partial-buffer paths.
    let mid = data.len() / 2;
    framer.feed(&data[..mid]);
    while let Ok(Some(_)) = defrag.next_message(&mut framer) {}
    framer.feed(&data[mid..]);
    while let Ok(Some(_)) = defrag.next_message(&mut framer) {}
});
