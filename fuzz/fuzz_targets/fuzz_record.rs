#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut framer = mote_tls::record::RecordFramer::new();
    framer.feed(data);
    // Drain until the framer either errors or runs out of bytes.
    while let Ok(Some(_)) = framer.next_record() {}
});
