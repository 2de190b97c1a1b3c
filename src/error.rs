//! Fehlertypen für DTD-Verarbeitung, Entity-Auflösung und Validierung.
//!
//! Ein Enum für alle Fehlerfälle der Crate. Wohlgeformtheits- und
//! Gültigkeitsverletzungen zitieren die einschlägige Stelle der
//! XML 1.0 Spezifikation (Fifth Edition).
//!
//! Positionsangaben sind 1-basiert (Zeile/Spalte) und beziehen sich auf
//! die gerade aktive Eingabe: das Basisdokument oder, während einer
//! Entity-Expansion, den Ersetzungstext.

use core::fmt;
use std::borrow::Cow;

/// Fehler bei DTD-Verarbeitung, Entity-Auflösung oder Validierung.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Syntaxfehler im XML-Dokument selbst (vom Tokenizer gemeldet).
    XmlSyntax {
        /// Beschreibung des Syntaxfehlers.
        message: Cow<'static, str>,
        /// Zeile (1-basiert).
        line: u64,
        /// Spalte (1-basiert).
        column: u64,
    },

    /// Syntaxfehler in einer Markup-Deklaration des Internal Subset (XML 1.0 §2.8).
    DtdSyntax {
        /// Beschreibung des Syntaxfehlers.
        message: Cow<'static, str>,
        /// Byte-Offset innerhalb des DOCTYPE-Texts.
        offset: usize,
    },

    /// Eine Operation wurde in einem Zustand aufgerufen, der sie nicht
    /// erlaubt (z.B. `resolve_entity` ohne aktuelle Entity-Referenz).
    InvalidOperation(Cow<'static, str>),

    /// Entity-Referenz ohne verfügbare DTD angetroffen.
    NoDtd {
        /// Zeile der Referenz (1-basiert).
        line: u64,
        /// Spalte der Referenz (1-basiert).
        column: u64,
    },

    /// Referenz auf eine nicht deklarierte Entity (XML 1.0 §4.1, WFC: Entity Declared).
    UndeclaredEntity {
        /// Name der referenzierten Entity.
        name: Cow<'static, str>,
        /// Zeile der Referenz (1-basiert).
        line: u64,
        /// Spalte der Referenz (1-basiert).
        column: u64,
    },

    /// Eine Entity referenziert sich direkt oder indirekt selbst
    /// (XML 1.0 §4.1, WFC: No Recursion).
    RecursiveEntity {
        /// Name der Entity, die den Zyklus schließt.
        name: Cow<'static, str>,
        /// Zeile der Referenz (1-basiert).
        line: u64,
        /// Spalte der Referenz (1-basiert).
        column: u64,
    },

    /// Die konfigurierte maximale Entity-Verschachtelungstiefe wurde überschritten.
    EntityNestingTooDeep {
        /// Die überschrittene Tiefengrenze.
        limit: usize,
        /// Zeile der Referenz (1-basiert).
        line: u64,
        /// Spalte der Referenz (1-basiert).
        column: u64,
    },

    /// Start-Tag eines Elements ohne Element-Deklaration (XML 1.0 §3, VC: Element Valid).
    UndeclaredElement {
        /// Name des nicht deklarierten Elements.
        name: Cow<'static, str>,
        /// Zeile (1-basiert).
        line: u64,
        /// Spalte (1-basiert).
        column: u64,
    },

    /// Kindelement an dieser Stelle vom Content-Modell nicht erlaubt
    /// (XML 1.0 §3, VC: Element Valid).
    InvalidChildElement {
        /// Name des umgebenden Elements.
        element: Cow<'static, str>,
        /// Name des unzulässigen Kindelements.
        child: Cow<'static, str>,
        /// Zeile (1-basiert).
        line: u64,
        /// Spalte (1-basiert).
        column: u64,
    },

    /// Element wurde geschlossen, obwohl das Content-Modell noch weitere
    /// Kinder verlangt (XML 1.0 §3, VC: Element Valid).
    IncompleteContent {
        /// Name des Elements.
        element: Cow<'static, str>,
        /// Zeile des End-Tags (1-basiert).
        line: u64,
        /// Spalte des End-Tags (1-basiert).
        column: u64,
    },

    /// Zeichendaten in einem Element mit reinem Element-Content (XML 1.0 §3.2.1).
    CharDataNotAllowed {
        /// Name des Elements.
        element: Cow<'static, str>,
        /// Zeile (1-basiert).
        line: u64,
        /// Spalte (1-basiert).
        column: u64,
    },

    /// Ein als `#REQUIRED` deklariertes Attribut fehlt
    /// (XML 1.0 §3.3.2, VC: Required Attribute).
    MissingRequiredAttribute {
        /// Name des Elements.
        element: Cow<'static, str>,
        /// Name des fehlenden Attributs.
        attribute: Cow<'static, str>,
        /// Zeile des Start-Tags (1-basiert).
        line: u64,
        /// Spalte des Start-Tags (1-basiert).
        column: u64,
    },

    /// I/O-Fehler beim Lesen oder Schreiben.
    IoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XmlSyntax { message, line, column } => {
                write!(f, "XML-Syntaxfehler: {message} (Zeile {line}, Spalte {column})")
            }
            Self::DtdSyntax { message, offset } => {
                write!(f, "DTD-Syntaxfehler: {message} (DOCTYPE, Offset {offset})")
            }
            Self::InvalidOperation(context) => {
                write!(f, "Unzulässige Operation: {context}")
            }
            Self::NoDtd { line, column } => {
                write!(
                    f,
                    "Entity-Referenz ohne DTD nicht auflösbar (Zeile {line}, Spalte {column})"
                )
            }
            Self::UndeclaredEntity { name, line, column } => {
                write!(
                    f,
                    "Referenz auf nicht deklarierte Entity '{name}' \
                     (XML 1.0 §4.1, Zeile {line}, Spalte {column})"
                )
            }
            Self::RecursiveEntity { name, line, column } => {
                write!(
                    f,
                    "Rekursive Entity-Referenz '{name}' \
                     (XML 1.0 §4.1, Zeile {line}, Spalte {column})"
                )
            }
            Self::EntityNestingTooDeep { limit, line, column } => {
                write!(
                    f,
                    "Entity-Verschachtelung überschreitet Limit {limit} \
                     (Zeile {line}, Spalte {column})"
                )
            }
            Self::UndeclaredElement { name, line, column } => {
                write!(
                    f,
                    "Element '{name}' ist nicht deklariert \
                     (XML 1.0 §3, Zeile {line}, Spalte {column})"
                )
            }
            Self::InvalidChildElement { element, child, line, column } => {
                write!(
                    f,
                    "Element '{child}' an dieser Stelle in '{element}' nicht erlaubt \
                     (XML 1.0 §3, Zeile {line}, Spalte {column})"
                )
            }
            Self::IncompleteContent { element, line, column } => {
                write!(
                    f,
                    "Content-Modell von '{element}' ist unvollständig \
                     (XML 1.0 §3, Zeile {line}, Spalte {column})"
                )
            }
            Self::CharDataNotAllowed { element, line, column } => {
                write!(
                    f,
                    "Zeichendaten in '{element}' nicht erlaubt, Content-Modell \
                     verlangt Element-Content (XML 1.0 §3.2.1, Zeile {line}, Spalte {column})"
                )
            }
            Self::MissingRequiredAttribute { element, attribute, line, column } => {
                write!(
                    f,
                    "Attribut '{attribute}' an '{element}' ist #REQUIRED, fehlt aber \
                     (XML 1.0 §3.3.2, Zeile {line}, Spalte {column})"
                )
            }
            Self::IoError(message) => {
                write!(f, "I/O-Fehler: {message}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Erstellt einen [`Error::XmlSyntax`].
    pub fn xml_syntax(message: impl Into<Cow<'static, str>>, line: u64, column: u64) -> Self {
        Self::XmlSyntax { message: message.into(), line, column }
    }

    /// Erstellt einen [`Error::DtdSyntax`].
    pub fn dtd_syntax(message: impl Into<Cow<'static, str>>, offset: usize) -> Self {
        Self::DtdSyntax { message: message.into(), offset }
    }

    /// Erstellt einen [`Error::InvalidOperation`].
    pub fn invalid_operation(context: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidOperation(context.into())
    }

    /// Erstellt einen [`Error::UndeclaredEntity`].
    pub fn undeclared_entity(name: impl Into<Cow<'static, str>>, line: u64, column: u64) -> Self {
        Self::UndeclaredEntity { name: name.into(), line, column }
    }

    /// Erstellt einen [`Error::RecursiveEntity`].
    pub fn recursive_entity(name: impl Into<Cow<'static, str>>, line: u64, column: u64) -> Self {
        Self::RecursiveEntity { name: name.into(), line, column }
    }

    /// Erstellt einen [`Error::UndeclaredElement`].
    pub fn undeclared_element(name: impl Into<Cow<'static, str>>, line: u64, column: u64) -> Self {
        Self::UndeclaredElement { name: name.into(), line, column }
    }

    /// Erstellt einen [`Error::InvalidChildElement`].
    pub fn invalid_child_element(
        element: impl Into<Cow<'static, str>>,
        child: impl Into<Cow<'static, str>>,
        line: u64,
        column: u64,
    ) -> Self {
        Self::InvalidChildElement {
            element: element.into(),
            child: child.into(),
            line,
            column,
        }
    }

    /// Erstellt einen [`Error::IncompleteContent`].
    pub fn incomplete_content(
        element: impl Into<Cow<'static, str>>,
        line: u64,
        column: u64,
    ) -> Self {
        Self::IncompleteContent { element: element.into(), line, column }
    }

    /// Erstellt einen [`Error::CharDataNotAllowed`].
    pub fn char_data_not_allowed(
        element: impl Into<Cow<'static, str>>,
        line: u64,
        column: u64,
    ) -> Self {
        Self::CharDataNotAllowed { element: element.into(), line, column }
    }

    /// Erstellt einen [`Error::MissingRequiredAttribute`].
    pub fn missing_required_attribute(
        element: impl Into<Cow<'static, str>>,
        attribute: impl Into<Cow<'static, str>>,
        line: u64,
        column: u64,
    ) -> Self {
        Self::MissingRequiredAttribute {
            element: element.into(),
            attribute: attribute.into(),
            line,
            column,
        }
    }
}

/// Crate-weiter Result-Alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Display Tests ====================

    #[test]
    fn display_xml_syntax() {
        let err = Error::xml_syntax("unerwartetes '<'", 3, 17);
        let msg = err.to_string();
        assert!(msg.contains("XML-Syntaxfehler"), "{msg}");
        assert!(msg.contains("unerwartetes '<'"), "{msg}");
        assert!(msg.contains("Zeile 3"), "{msg}");
        assert!(msg.contains("Spalte 17"), "{msg}");
    }

    #[test]
    fn display_dtd_syntax() {
        let err = Error::dtd_syntax("'(' erwartet", 42);
        let msg = err.to_string();
        assert!(msg.contains("DTD-Syntaxfehler"), "{msg}");
        assert!(msg.contains("'(' erwartet"), "{msg}");
        assert!(msg.contains("Offset 42"), "{msg}");
    }

    #[test]
    fn display_invalid_operation() {
        let err = Error::invalid_operation("resolve_entity ohne Entity-Referenz");
        let msg = err.to_string();
        assert!(msg.contains("Unzulässige Operation"), "{msg}");
        assert!(msg.contains("resolve_entity"), "{msg}");
    }

    #[test]
    fn display_no_dtd() {
        let err = Error::NoDtd { line: 1, column: 9 };
        let msg = err.to_string();
        assert!(msg.contains("ohne DTD"), "{msg}");
        assert!(msg.contains("Zeile 1"), "{msg}");
    }

    #[test]
    fn display_undeclared_entity_nennt_namen() {
        let err = Error::undeclared_entity("nbsp", 4, 12);
        let msg = err.to_string();
        assert!(msg.contains("'nbsp'"), "{msg}");
        assert!(msg.contains("§4.1"), "{msg}");
        assert!(msg.contains("Zeile 4"), "{msg}");
        assert!(msg.contains("Spalte 12"), "{msg}");
    }

    #[test]
    fn display_recursive_entity() {
        let err = Error::recursive_entity("a", 2, 8);
        let msg = err.to_string();
        assert!(msg.contains("Rekursive"), "{msg}");
        assert!(msg.contains("'a'"), "{msg}");
        assert!(msg.contains("§4.1"), "{msg}");
    }

    #[test]
    fn display_entity_nesting_too_deep() {
        let err = Error::EntityNestingTooDeep { limit: 32, line: 7, column: 3 };
        let msg = err.to_string();
        assert!(msg.contains("Limit 32"), "{msg}");
        assert!(msg.contains("Zeile 7"), "{msg}");
    }

    #[test]
    fn display_undeclared_element() {
        let err = Error::undeclared_element("widget", 10, 5);
        let msg = err.to_string();
        assert!(msg.contains("'widget'"), "{msg}");
        assert!(msg.contains("nicht deklariert"), "{msg}");
        assert!(msg.contains("§3"), "{msg}");
    }

    #[test]
    fn display_invalid_child_element() {
        let err = Error::invalid_child_element("list", "table", 6, 2);
        let msg = err.to_string();
        assert!(msg.contains("'table'"), "{msg}");
        assert!(msg.contains("'list'"), "{msg}");
        assert!(msg.contains("nicht erlaubt"), "{msg}");
    }

    #[test]
    fn display_incomplete_content() {
        let err = Error::incomplete_content("doc", 20, 1);
        let msg = err.to_string();
        assert!(msg.contains("'doc'"), "{msg}");
        assert!(msg.contains("unvollständig"), "{msg}");
    }

    #[test]
    fn display_char_data_not_allowed() {
        let err = Error::char_data_not_allowed("items", 5, 11);
        let msg = err.to_string();
        assert!(msg.contains("'items'"), "{msg}");
        assert!(msg.contains("Element-Content"), "{msg}");
        assert!(msg.contains("§3.2.1"), "{msg}");
    }

    #[test]
    fn display_missing_required_attribute() {
        let err = Error::missing_required_attribute("img", "src", 8, 4);
        let msg = err.to_string();
        assert!(msg.contains("'src'"), "{msg}");
        assert!(msg.contains("'img'"), "{msg}");
        assert!(msg.contains("#REQUIRED"), "{msg}");
        assert!(msg.contains("§3.3.2"), "{msg}");
    }

    #[test]
    fn display_io_error() {
        let err = Error::IoError("Datei nicht gefunden".to_string());
        let msg = err.to_string();
        assert!(msg.contains("I/O-Fehler"), "{msg}");
        assert!(msg.contains("Datei nicht gefunden"), "{msg}");
    }

    // ==================== Eigenschaften ====================

    #[test]
    fn error_ist_clone_und_eq() {
        let err = Error::undeclared_entity("x", 1, 1);
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }

    #[test]
    fn owned_namen_in_cow_feldern() {
        let name = String::from("dynamisch");
        let err = Error::undeclared_entity(name, 1, 2);
        assert!(err.to_string().contains("'dynamisch'"));
    }

    #[test]
    fn error_implementiert_std_error() {
        fn nimmt_std_error(_e: &dyn std::error::Error) {}
        let err = Error::NoDtd { line: 1, column: 1 };
        nimmt_std_error(&err);
    }
}
