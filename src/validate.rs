//! DTD-Validierung über dem Tokenstrom.
//!
//! [`DtdValidator`] zieht Token aus einem beliebigen [`TokenRead`], kompiliert
//! beim DOCTYPE die Inhaltsmodelle zu einem [`ContentAutomata`]-Pool und führt
//! je offenem Element dessen Automaten-Zustand mit. Verstöße werden gesammelt
//! statt abzubrechen; nur Lesefehler des Stroms sind fatal.
//!
//! Geprüft werden nicht deklarierte Elemente, unzulässige Kindelemente,
//! unvollständiger Inhalt am End-Tag, Zeichendaten in Element-Content sowie
//! fehlende `#REQUIRED`-Attribute. ID/IDREF-Querbezüge und Attributwert-Typen
//! bleiben außen vor.
//!
//! # Beispiel
//!
//! ```
//! use erdx::validate::validate_document;
//!
//! let xml = r#"<!DOCTYPE liste [
//!     <!ELEMENT liste (eintrag)+>
//!     <!ELEMENT eintrag (#PCDATA)>
//! ]><liste><eintrag>eins</eintrag></liste>"#;
//! let befunde = validate_document(xml)?;
//! assert!(befunde.is_empty());
//! # Ok::<(), erdx::Error>(())
//! ```

use crate::automata::{AutomatonId, ContentAutomata};
use crate::dtd::parser::parse_doctype;
use crate::dtd::{ContentSpec, Dtd};
use crate::name_table::NameId;
use crate::reader::resolving::EntityResolvingReader;
use crate::reader::{NodeKind, TokenRead};
use crate::{Error, Result};

/// Was der Inhalt eines Elements zulässt, neben dem Automaten-Zustand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentRule {
    /// `EMPTY`: gar kein Inhalt, auch kein Whitespace.
    Empty,
    /// `ANY`: beliebiger Inhalt aus deklarierten Elementen.
    Any,
    /// Mixed-Content: Zeichendaten erlaubt.
    Mixed,
    /// Element-Content: nur Kindelemente, Whitespace als Separator.
    Children,
    /// Nicht deklariert; nach dem Befund wird der Inhalt nicht weiter
    /// geprüft.
    Undeclared,
}

#[derive(Debug)]
struct ElementState {
    name: NameId,
    state: AutomatonId,
    rule: ContentRule,
}

// ============================================================================
// DtdValidator
// ============================================================================

/// Validierender Konsument eines Tokenstroms.
pub struct DtdValidator<R: TokenRead> {
    reader: R,
    dtd: Option<Dtd>,
    automata: ContentAutomata,
    stack: Vec<ElementState>,
    errors: Vec<Error>,
    missing_dtd_reported: bool,
}

impl<R: TokenRead> DtdValidator<R> {
    /// Validator über einem Tokenstrom.
    pub fn new(reader: R) -> DtdValidator<R> {
        DtdValidator {
            reader,
            dtd: None,
            automata: ContentAutomata::new(),
            stack: Vec::new(),
            errors: Vec::new(),
            missing_dtd_reported: false,
        }
    }

    /// Liest den Strom bis zum Ende und sammelt alle Verstöße.
    ///
    /// # Errors
    ///
    /// Lesefehler des Stroms und DTD-Syntaxfehler brechen die Validierung
    /// ab; Gültigkeitsverstöße landen stattdessen in [`errors`](Self::errors).
    pub fn run(&mut self) -> Result<&[Error]> {
        while self.reader.advance()? {
            match self.reader.kind() {
                NodeKind::DocumentType => self.load_dtd()?,
                NodeKind::StartElement => self.enter_element(),
                NodeKind::EndElement => self.leave_element(),
                NodeKind::Text | NodeKind::CData => self.check_char_data(false),
                NodeKind::Whitespace => self.check_char_data(true),
                _ => {}
            }
        }
        log::debug!("Validierung abgeschlossen, {} Befunde", self.errors.len());
        Ok(&self.errors)
    }

    /// Die bisher gesammelten Verstöße.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Zerlegt den Validator in die gesammelten Verstöße.
    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    /// Der zugrunde liegende Tokenstrom.
    pub fn reader(&self) -> &R {
        &self.reader
    }

    fn load_dtd(&mut self) -> Result<()> {
        let dtd = parse_doctype(self.reader.value())?;
        self.automata = ContentAutomata::compile(&dtd);
        self.dtd = Some(dtd);
        Ok(())
    }

    fn enter_element(&mut self) {
        let name = self.reader.name().to_string();
        let (line, column) = (self.reader.line(), self.reader.column());
        let child = self.automata.intern_name(&name);

        let Some(dtd) = self.dtd.as_ref() else {
            if !self.missing_dtd_reported {
                self.missing_dtd_reported = true;
                self.errors.push(Error::NoDtd { line, column });
            }
            let any = self.automata.any();
            self.stack.push(ElementState { name: child, state: any, rule: ContentRule::Undeclared });
            return;
        };

        // Übergang im Inhaltsmodell des Elternelements.
        if let Some(parent) = self.stack.last_mut() {
            let next = self.automata.try_start_element(parent.state, child);
            if self.automata.is_invalid(next) {
                let parent_name = self.automata.name(parent.name).to_string();
                self.errors.push(Error::invalid_child_element(
                    parent_name,
                    name.clone(),
                    line,
                    column,
                ));
                // Erholung: der alte Zustand bleibt stehen, damit spätere
                // Geschwister noch geprüft werden.
            } else {
                parent.state = next;
            }
        }

        // Deklaration und Startzustand des Elements selbst.
        match self.automata.start(child) {
            Some(start) => {
                let rule = dtd
                    .element(&name)
                    .map_or(ContentRule::Undeclared, |decl| content_rule(&decl.content));
                self.stack.push(ElementState { name: child, state: start, rule });
            }
            None => {
                self.errors.push(Error::undeclared_element(name.clone(), line, column));
                let any = self.automata.any();
                self.stack.push(ElementState {
                    name: child,
                    state: any,
                    rule: ContentRule::Undeclared,
                });
            }
        }

        // Pflichtattribute.
        if let Some(attlist) = dtd.attlist(&name) {
            for required in attlist.required() {
                if self.reader.attribute(required).is_none() {
                    self.errors.push(Error::missing_required_attribute(
                        name.clone(),
                        required.to_string(),
                        line,
                        column,
                    ));
                }
            }
        }
    }

    fn leave_element(&mut self) {
        let (line, column) = (self.reader.line(), self.reader.column());
        let Some(entry) = self.stack.pop() else {
            return;
        };
        if entry.rule == ContentRule::Undeclared {
            return;
        }
        let after = self.automata.try_end_element(entry.state);
        if self.automata.is_invalid(after) {
            let name = self.automata.name(entry.name).to_string();
            self.errors.push(Error::incomplete_content(name, line, column));
        }
    }

    fn check_char_data(&mut self, whitespace: bool) {
        let Some(entry) = self.stack.last() else {
            return;
        };
        let forbidden = match entry.rule {
            ContentRule::Children => !whitespace,
            ContentRule::Empty => true,
            ContentRule::Any | ContentRule::Mixed | ContentRule::Undeclared => false,
        };
        if forbidden {
            let name = self.automata.name(entry.name).to_string();
            self.errors.push(Error::char_data_not_allowed(
                name,
                self.reader.line(),
                self.reader.column(),
            ));
        }
    }
}

fn content_rule(spec: &ContentSpec) -> ContentRule {
    match spec {
        ContentSpec::Empty => ContentRule::Empty,
        ContentSpec::Any => ContentRule::Any,
        ContentSpec::Mixed(_) => ContentRule::Mixed,
        ContentSpec::Children(_) => ContentRule::Children,
    }
}

/// Validiert ein vollständiges Dokument mit expandierenden Entities und
/// liefert alle Verstöße.
///
/// # Errors
///
/// Lesefehler und DTD-Syntaxfehler des Dokuments.
pub fn validate_document(input: impl Into<Vec<u8>>) -> Result<Vec<Error>> {
    let reader = EntityResolvingReader::for_document(input);
    let mut validator = DtdValidator::new(reader);
    validator.run()?;
    Ok(validator.into_errors())
}
