#![no_main]

use glyph_protocol::{decode, decode_request, ResponseKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode(data, ResponseKind::Info);
    let _ = decode(data, ResponseKind::Action);
    let _ = decode_request(data);
});
