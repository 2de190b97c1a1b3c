//! erdx – DTD-Validierung und Entity-auflösendes XML-Lesen
//!
//! # Beispiel
//!
//! ```
//! use erdx::{EntityResolvingReader, NodeKind, TokenRead};
//!
//! let xml = r#"<!DOCTYPE gruss [ <!ENTITY wer "Welt"> ]><gruss>Hallo &wer;!</gruss>"#;
//! let mut reader = EntityResolvingReader::for_document(xml);
//!
//! let mut text = String::new();
//! while reader.advance()? {
//!     if reader.kind() == NodeKind::Text {
//!         text.push_str(reader.value());
//!     }
//! }
//! assert_eq!(text, "Hallo Welt!");
//! # Ok::<(), erdx::Error>(())
//! ```

pub mod automata;
pub mod dtd;
pub mod error;
pub mod name_table;
pub mod reader;
pub mod validate;

pub use error::{Error, Result};

/// HashMap mit ahash (schnell, nicht DoS-resistent; nur für interne
/// Datenstrukturen).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Reader
pub use reader::resolving::EntityResolvingReader;
pub use reader::source::TokenSource;
pub use reader::{EntityHandling, NodeKind, ReadState, ReaderOptions, TokenRead};

// Public API: DTD
pub use dtd::parser::parse_doctype;
pub use dtd::{
    AttDef, AttDefault, AttType, AttlistDecl, ContentParticle, ContentSpec, Dtd, ElementDecl,
    EntityDecl, NotationDecl, Occurrence, ParticleKind,
};

// Public API: Inhaltsmodell-Automaten
pub use automata::{AutomatonId, AutomatonKind, ContentAutomata};
pub use name_table::{NameId, NameTable};

// Public API: Validierung
pub use validate::{DtdValidator, validate_document};
