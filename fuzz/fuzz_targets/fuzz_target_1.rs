#![no_main]

use hexabus::Packet;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding untrusted datagrams must never panic, and accepted packets re-encode stably
    if let Ok(packet) = Packet::decode(data) {
        if let Ok(bytes) = packet.encode() {
            let again = Packet::decode(&bytes).ok().and_then(|p| p.encode().ok());
            assert_eq!(again.as_deref(), Some(&bytes[..]));
        }
    }
});
