#![no_main]
use libfuzzer_sys::fuzz_target;

use erdx::{
    EntityHandling, EntityResolvingReader, NodeKind, ReaderOptions, TokenRead, TokenSource,
};

fuzz_target!(|data: &[u8]| {
    // Expand mode: drive the document to the end or the first error.
    let mut reader = EntityResolvingReader::for_document(data);
    while let Ok(true) = reader.advance() {}

    // Report mode: resolve every reference, walk every attribute value.
    let options = ReaderOptions::default().with_entity_handling(EntityHandling::Report);
    let mut reader = EntityResolvingReader::with_options(TokenSource::for_document(data), options);
    while let Ok(true) = reader.advance() {
        match reader.kind() {
            NodeKind::EntityReference => {
                let _ = reader.resolve_entity();
            }
            NodeKind::StartElement => {
                if reader.move_to_first_attribute() {
                    while reader.read_attribute_value() {
                        if reader.kind() == NodeKind::EntityReference {
                            let _ = reader.resolve_entity();
                        }
                    }
                }
                reader.move_to_element();
            }
            _ => {}
        }
    }
});
