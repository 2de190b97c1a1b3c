//! Entity-auflösender Pull-Reader.
//!
//! [`EntityResolvingReader`] legt die Auflösung von General-Entities über den
//! Basis-Tokenizer: Ersetzungstexte werden als eigene [`TokenSource`]-Frames
//! geöffnet und in den Tokenstrom eingeflochten. Ein expliziter Frame-Stapel
//! hält die aktiven Entities; seine Länge ist durch
//! [`ReaderOptions::max_entity_depth`](crate::reader::ReaderOptions::max_entity_depth)
//! begrenzt, und eine Referenz auf eine bereits aktive Entity wird als
//! [`Error::RecursiveEntity`] abgewiesen.
//!
//! Unter [`EntityHandling::Expand`] erscheinen Referenzen nie im Strom: der
//! Reader öffnet den Ersetzungstext selbst und liefert dessen Knoten, auch in
//! Attributwerten. Unter [`EntityHandling::Report`] bleibt jede Referenz als
//! [`NodeKind::EntityReference`] sichtbar; erst
//! [`resolve_entity`](TokenRead::resolve_entity) plus der nächste Lesevorgang
//! betreten den Ersetzungstext, und dessen Ende wird als
//! [`NodeKind::EndEntity`] gemeldet.
//!
//! # Beispiel
//!
//! ```
//! use erdx::reader::resolving::EntityResolvingReader;
//! use erdx::reader::{NodeKind, TokenRead};
//!
//! let xml = r#"<!DOCTYPE gruss [ <!ENTITY wer "Welt"> ]><gruss>Hallo &wer;!</gruss>"#;
//! let mut reader = EntityResolvingReader::for_document(xml);
//! let mut text = String::new();
//! while reader.advance()? {
//!     if reader.kind() == NodeKind::Text {
//!         text.push_str(reader.value());
//!     }
//! }
//! assert_eq!(text, "Hallo Welt!");
//! # Ok::<(), erdx::Error>(())
//! ```

use std::io::Read;
use std::rc::Rc;

use crate::dtd::parser::parse_doctype;
use crate::dtd::{Dtd, EntityDecl};
use crate::reader::source::{TokenSource, ValueSegment};
use crate::reader::{EntityHandling, NodeKind, ReadState, ReaderOptions, TokenRead};
use crate::{Error, Result};

// ============================================================================
// Frames
// ============================================================================

/// Eine aktive Entity: ihr Ersetzungstext als eigener Tokenstrom.
#[derive(Debug)]
struct EntityFrame {
    name: Rc<str>,
    source: TokenSource,
    /// Im Attributwert geöffnet; wird von Dokument-Bewegungen geschlossen.
    in_attribute: bool,
    /// Hat bereits mindestens einen Knoten geliefert.
    pumped: bool,
    /// Erschöpft; der Cursor steht auf dem [`NodeKind::EndEntity`]-Knoten.
    done: bool,
}

/// Eine per [`TokenRead::resolve_entity`] angemeldete Auflösung.
///
/// Der Frame wird erst beim nächsten Lesevorgang auf den Stapel gelegt;
/// bis dahin bleibt die Referenz der aktuelle Knoten.
#[derive(Debug)]
struct PendingResolve {
    name: Rc<str>,
    source: TokenSource,
    in_attribute: bool,
}

// ============================================================================
// EntityResolvingReader
// ============================================================================

/// Pull-Reader mit DTD-gestützter Entity-Auflösung.
pub struct EntityResolvingReader {
    base: TokenSource,
    options: ReaderOptions,
    dtd: Option<Rc<Dtd>>,
    chain: Vec<EntityFrame>,
    pending: Option<PendingResolve>,
    failed: bool,
    closed: bool,
}

impl std::fmt::Debug for EntityResolvingReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EntityResolvingReader({:?}, {} aktive Entities)",
            self.read_state(),
            self.chain.len()
        )
    }
}

impl EntityResolvingReader {
    /// Reader über einem Basis-Tokenizer mit Standard-Optionen.
    pub fn new(source: TokenSource) -> EntityResolvingReader {
        Self::with_options(source, ReaderOptions::default())
    }

    /// Reader über einem Basis-Tokenizer mit den gegebenen Optionen.
    pub fn with_options(source: TokenSource, options: ReaderOptions) -> EntityResolvingReader {
        EntityResolvingReader {
            base: source,
            options,
            dtd: None,
            chain: Vec::new(),
            pending: None,
            failed: false,
            closed: false,
        }
    }

    /// Reader über einem vollständigen Dokument im Speicher.
    pub fn for_document(input: impl Into<Vec<u8>>) -> EntityResolvingReader {
        Self::new(TokenSource::for_document(input))
    }

    /// Liest die Eingabe vollständig und öffnet sie als Dokument.
    ///
    /// # Errors
    ///
    /// [`Error::IoError`], wenn die Eingabe nicht gelesen werden kann.
    pub fn from_reader(input: impl Read) -> Result<EntityResolvingReader> {
        Ok(Self::new(TokenSource::from_reader(input)?))
    }

    /// Die aus dem DOCTYPE geladene DTD, sobald sie gelesen wurde.
    pub fn dtd(&self) -> Option<&Dtd> {
        self.dtd.as_deref()
    }

    /// Die beim Bau übergebenen Optionen.
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Anzahl der gerade aktiven Entities.
    pub fn entity_depth(&self) -> usize {
        self.chain.len()
    }

    // ========================================================================
    // Frame-Verwaltung
    // ========================================================================

    /// Legt eine angemeldete Auflösung als Frame auf den Stapel.
    fn perform_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::trace!(
                "öffne Entity-Frame '{}' (Tiefe {})",
                pending.name,
                self.chain.len() + 1
            );
            self.chain.push(EntityFrame {
                name: pending.name,
                source: pending.source,
                in_attribute: pending.in_attribute,
                pumped: false,
                done: false,
            });
        }
    }

    /// Schließt Frames, über die ein Lesevorgang hinweggeht: erledigte
    /// sowie im Attributwert geöffnete.
    fn close_spent_frames(&mut self) {
        while let Some(frame) = self.chain.last() {
            if !frame.in_attribute && !frame.done {
                break;
            }
            log::trace!("schließe Entity-Frame '{}'", frame.name);
            self.chain.pop();
        }
    }

    /// Schließt im Attributwert geöffnete Frames samt einer dort
    /// angemeldeten Auflösung; Inhalts-Frames bleiben bestehen.
    fn close_attribute_frames(&mut self) {
        if self.pending.as_ref().is_some_and(|p| p.in_attribute) {
            self.pending = None;
        }
        while let Some(frame) = self.chain.last() {
            if !frame.in_attribute {
                break;
            }
            log::trace!("schließe Attribut-Frame '{}'", frame.name);
            self.chain.pop();
        }
    }

    /// Der Strom, dessen Knoten gerade sichtbar ist: der innerste
    /// liefernde Frame, sonst die Basis.
    fn active_source(&self) -> &TokenSource {
        match self.chain.iter().rposition(|f| f.pumped && !f.done) {
            Some(index) => &self.chain[index].source,
            None => &self.base,
        }
    }

    fn active_source_mut(&mut self) -> &mut TokenSource {
        match self.chain.iter().rposition(|f| f.pumped && !f.done) {
            Some(index) => &mut self.chain[index].source,
            None => &mut self.base,
        }
    }

    /// Ob der Cursor in einem Attributwert steht, auch innerhalb eines
    /// dort geöffneten Frames.
    fn in_attribute_position(&self) -> bool {
        self.chain.last().is_some_and(|f| f.in_attribute) || self.active_source().in_attribute()
    }

    // ========================================================================
    // Auflösung
    // ========================================================================

    /// Prüft eine Referenz gegen DTD, Tiefenlimit und aktive Kette und
    /// liefert den Ersetzungstext.
    fn validate_entity(&self, name: &str, line: u64, column: u64) -> Result<Rc<str>> {
        let Some(dtd) = self.dtd.as_deref() else {
            return Err(Error::NoDtd { line, column });
        };
        let Some(decl) = dtd.entity(name) else {
            return Err(Error::undeclared_entity(name.to_string(), line, column));
        };
        let limit = self.options.max_entity_depth;
        if self.chain.len() >= limit {
            return Err(Error::EntityNestingTooDeep { limit, line, column });
        }
        if self.chain.iter().any(|frame| &*frame.name == name) {
            return Err(Error::recursive_entity(name.to_string(), line, column));
        }
        replacement_text(decl, line, column)
    }

    /// Expandiert die Referenz, auf der der aktive Strom steht, zu einem
    /// Inhalts-Frame. Nur unter [`EntityHandling::Expand`].
    fn open_current_reference(&mut self) -> Result<()> {
        let name = self.active_source().name().to_string();
        let (line, column) = (self.line(), self.column());
        let replacement = self.validate_entity(&name, line, column)?;
        let scope = self.active_source().namespace_snapshot();
        log::trace!("expandiere Entity '{name}' (Tiefe {})", self.chain.len() + 1);
        self.chain.push(EntityFrame {
            name: Rc::from(name.as_str()),
            source: TokenSource::for_fragment(&replacement, scope),
            in_attribute: false,
            pumped: false,
            done: false,
        });
        Ok(())
    }

    /// Liest den DOCTYPE-Text des aktuellen Knotens als DTD ein.
    fn load_dtd(&mut self) -> Result<()> {
        let dtd = parse_doctype(self.base.value())?;
        log::debug!(
            "DTD '{}' geladen: {} Elemente, {} Entities",
            dtd.root_name().unwrap_or("?"),
            dtd.element_count(),
            dtd.entity_count()
        );
        self.dtd = Some(Rc::new(dtd));
        Ok(())
    }

    /// Ersetzt unter [`EntityHandling::Expand`] alle General-Referenzen in
    /// den Attributwerten des aktuellen Start-Tags.
    fn expand_attribute_values(&mut self) -> Result<()> {
        let count = self.active_source().attribute_count();
        for index in 0..count {
            let needs_expansion = self
                .active_source()
                .attribute_segments(index)
                .is_some_and(|segments| {
                    segments.iter().any(|s| matches!(s, ValueSegment::EntityRef(_)))
                });
            if !needs_expansion {
                continue;
            }
            let (line, column) = (self.line(), self.column());
            let Some(dtd) = self.dtd.clone() else {
                return Err(Error::NoDtd { line, column });
            };
            let segments: Vec<ValueSegment> = self
                .active_source()
                .attribute_segments(index)
                .map(<[ValueSegment]>::to_vec)
                .unwrap_or_default();
            let mut expanded = String::new();
            for segment in &segments {
                match segment {
                    ValueSegment::Text(text) => expanded.push_str(text),
                    ValueSegment::EntityRef(name) => {
                        let mut stack = Vec::new();
                        expand_attribute_entity(
                            &dtd,
                            name,
                            &mut expanded,
                            &mut stack,
                            self.options.max_entity_depth,
                            line,
                            column,
                        )?;
                    }
                }
            }
            self.active_source_mut().set_attribute_value(index, expanded);
        }
        Ok(())
    }

    fn advance_inner(&mut self) -> Result<bool> {
        self.perform_pending();
        self.close_spent_frames();
        loop {
            if let Some(frame) = self.chain.last_mut() {
                if frame.source.advance()? {
                    frame.pumped = true;
                } else if self.options.entity_handling == EntityHandling::Report {
                    // Ende-Marke: der Cursor steht auf EndEntity, der Frame
                    // wird erst vom nächsten Lesevorgang geschlossen.
                    frame.done = true;
                    return Ok(true);
                } else {
                    let name = frame.name.clone();
                    self.chain.pop();
                    log::trace!("Entity '{name}' vollständig expandiert");
                    continue;
                }
            } else if !self.base.advance()? {
                return Ok(false);
            }

            let kind = match self.chain.last() {
                Some(frame) => frame.source.kind(),
                None => self.base.kind(),
            };
            match kind {
                NodeKind::EntityReference
                    if self.options.entity_handling == EntityHandling::Expand =>
                {
                    // Die Referenz wird nie sichtbar: Frame öffnen und
                    // dessen ersten Knoten liefern.
                    self.open_current_reference()?;
                    continue;
                }
                NodeKind::StartElement
                    if self.options.entity_handling == EntityHandling::Expand =>
                {
                    self.expand_attribute_values()?;
                    return Ok(true);
                }
                NodeKind::DocumentType => {
                    self.load_dtd()?;
                    return Ok(true);
                }
                _ => return Ok(true),
            }
        }
    }
}

// ============================================================================
// TokenRead
// ============================================================================

impl TokenRead for EntityResolvingReader {
    fn advance(&mut self) -> Result<bool> {
        if self.closed || self.failed {
            return Ok(false);
        }
        match self.advance_inner() {
            Ok(found) => Ok(found),
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    fn kind(&self) -> NodeKind {
        match self.chain.last() {
            Some(frame) if frame.done => NodeKind::EndEntity,
            _ => self.active_source().kind(),
        }
    }

    fn name(&self) -> &str {
        match self.chain.last() {
            Some(frame) if frame.done => &frame.name,
            _ => self.active_source().name(),
        }
    }

    fn value(&self) -> &str {
        match self.chain.last() {
            Some(frame) if frame.done => "",
            _ => self.active_source().value(),
        }
    }

    fn depth(&self) -> usize {
        // Referenzstelle plus eine Ebene je lieferndem Frame; angemeldete
        // und erledigte Frames zählen nicht.
        let mut depth = self.base.depth();
        for frame in &self.chain {
            if frame.pumped && !frame.done {
                depth += frame.source.depth() + 1;
            }
        }
        depth
    }

    fn is_empty_element(&self) -> bool {
        match self.chain.last() {
            Some(frame) if frame.done => false,
            _ => self.active_source().is_empty_element(),
        }
    }

    fn read_state(&self) -> ReadState {
        if self.closed {
            ReadState::Closed
        } else if self.failed {
            ReadState::Error
        } else {
            self.base.read_state()
        }
    }

    fn line(&self) -> u64 {
        self.active_source().line()
    }

    fn column(&self) -> u64 {
        self.active_source().column()
    }

    fn attribute_count(&self) -> usize {
        self.active_source().attribute_count()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.active_source().attribute(name)
    }

    fn move_to_attribute(&mut self, name: &str) -> bool {
        self.close_attribute_frames();
        self.active_source_mut().move_to_attribute(name)
    }

    fn move_to_attribute_index(&mut self, index: usize) -> bool {
        self.close_attribute_frames();
        self.active_source_mut().move_to_attribute_index(index)
    }

    fn move_to_first_attribute(&mut self) -> bool {
        self.close_attribute_frames();
        self.active_source_mut().move_to_first_attribute()
    }

    fn move_to_next_attribute(&mut self) -> bool {
        self.close_attribute_frames();
        self.active_source_mut().move_to_next_attribute()
    }

    fn move_to_element(&mut self) -> bool {
        self.close_attribute_frames();
        self.active_source_mut().move_to_element()
    }

    fn read_attribute_value(&mut self) -> bool {
        self.perform_pending();
        loop {
            let Some(frame) = self.chain.last_mut() else {
                break;
            };
            if !frame.in_attribute {
                break;
            }
            if frame.done {
                self.chain.pop();
                continue;
            }
            // Attributtext-Ströme lesen aus einer Warteschlange und
            // schlagen nicht fehl.
            match frame.source.advance() {
                Ok(true) => {
                    frame.pumped = true;
                    return true;
                }
                _ => {
                    frame.done = true;
                    return true;
                }
            }
        }
        self.active_source_mut().read_attribute_value()
    }

    fn resolve_entity(&mut self) -> Result<()> {
        if self.kind() != NodeKind::EntityReference {
            return Err(Error::invalid_operation(
                "resolve_entity: aktueller Knoten ist keine Entity-Referenz",
            ));
        }
        let name = self.name().to_string();
        let (line, column) = (self.line(), self.column());
        let replacement = self.validate_entity(&name, line, column)?;
        let in_attribute = self.in_attribute_position();
        let source = if in_attribute {
            TokenSource::for_attribute_text(&replacement).map_err(|e| match e {
                Error::XmlSyntax { message, .. } => {
                    Error::xml_syntax(format!("Entity '{name}': {message}"), line, column)
                }
                other => other,
            })?
        } else {
            TokenSource::for_fragment(&replacement, self.active_source().namespace_snapshot())
        };
        log::trace!("löse Entity '{name}' auf (Tiefe {})", self.chain.len() + 1);
        self.pending = Some(PendingResolve { name: Rc::from(name.as_str()), source, in_attribute });
        Ok(())
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        self.active_source().lookup_namespace(prefix)
    }

    fn close(&mut self) {
        self.base.close();
        self.chain.clear();
        self.pending = None;
        self.closed = true;
    }
}

// ============================================================================
// Freie Helfer
// ============================================================================

/// Der Ersetzungstext einer Deklaration; ungeparste und externe Entities
/// sind nicht referenzierbar.
fn replacement_text(decl: &EntityDecl, line: u64, column: u64) -> Result<Rc<str>> {
    if decl.is_unparsed() {
        return Err(Error::xml_syntax(
            format!("Referenz auf ungeparste Entity '{}' (XML 1.0 §4.4.4)", decl.name),
            line,
            column,
        ));
    }
    match decl.replacement.as_ref() {
        Some(text) => Ok(Rc::clone(text)),
        None => Err(Error::xml_syntax(
            format!("externe Entity '{}' wird nicht aufgelöst", decl.name),
            line,
            column,
        )),
    }
}

/// Expandiert eine Referenz in einem Attributwert rekursiv zu Text
/// (XML 1.0 §3.3.3).
fn expand_attribute_entity(
    dtd: &Dtd,
    name: &str,
    out: &mut String,
    stack: &mut Vec<String>,
    limit: usize,
    line: u64,
    column: u64,
) -> Result<()> {
    let Some(decl) = dtd.entity(name) else {
        return Err(Error::undeclared_entity(name.to_string(), line, column));
    };
    if stack.len() >= limit {
        return Err(Error::EntityNestingTooDeep { limit, line, column });
    }
    if stack.iter().any(|entry| entry == name) {
        return Err(Error::recursive_entity(name.to_string(), line, column));
    }
    let replacement = replacement_text(decl, line, column)?;
    let mut source = TokenSource::for_attribute_text(&replacement).map_err(|e| match e {
        Error::XmlSyntax { message, .. } => {
            Error::xml_syntax(format!("Entity '{name}': {message}"), line, column)
        }
        other => other,
    })?;
    stack.push(name.to_string());
    while source.advance()? {
        match source.kind() {
            NodeKind::Text => out.push_str(source.value()),
            NodeKind::EntityReference => {
                let nested = source.name().to_string();
                expand_attribute_entity(dtd, &nested, out, stack, limit, line, column)?;
            }
            _ => {}
        }
    }
    stack.pop();
    Ok(())
}
