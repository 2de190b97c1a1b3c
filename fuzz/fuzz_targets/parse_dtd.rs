#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as DOCTYPE content, then compile the content models.
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(dtd) = erdx::parse_doctype(text) {
            let _ = erdx::ContentAutomata::compile(&dtd);
        }
    }
});
