#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate dnsquery;

fuzz_target!(|data: &[u8]| {
    if let Ok(m) = dnsquery::Message::from_slice(data) {
        let _ = m.to_string();

        // Names are written uncompressed, so only record data grown past its
        // 16 bit length may fail to encode. Anything that encodes decodes.
        match m.to_vec() {
            Ok(buf) => {
                dnsquery::Message::from_slice(&buf).expect("encoded message failed to decode");
            }
            Err(dnsquery::Error::Format(e)) => assert!(e.contains("too long"), "{}", e),
            Err(e) => panic!("decoded message failed to encode: {}", e),
        }
    }
});
