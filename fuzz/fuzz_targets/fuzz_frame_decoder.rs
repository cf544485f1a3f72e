//! Fuzz target: `codec::decode`
//!
//! Feeds arbitrary text into the frame payload decoder. Anything it accepts
//! must be a full frame that survives a re-encode unchanged.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermocam::frame::PIXELS;
use thermocam::stream::codec;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(frame) = codec::decode(text) {
        assert_eq!(frame.temperatures().len(), PIXELS);
        let payload = codec::encode(&frame).expect("decoded frame must encode");
        let again = codec::decode(&payload).expect("own payload must decode");
        assert_eq!(again, frame);
    }
});
