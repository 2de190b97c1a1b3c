//! Basis-Tokenizer über quick-xml.
//!
//! [`TokenSource`] zerlegt einen XML-Strom in die Knoten des
//! [`TokenRead`]-Vertrags, ohne Entity-Referenzen aufzulösen: Zeichen- und
//! vordefinierte Referenzen werden sofort substituiert, General-Referenzen
//! erscheinen als [`NodeKind::EntityReference`]-Knoten. Die Auflösung ist
//! Sache des [`EntityResolvingReader`](crate::reader::resolving::EntityResolvingReader),
//! der für Ersetzungstexte weitere `TokenSource`-Instanzen im
//! Fragment-Modus öffnet.
//!
//! Drei Betriebsarten: ganzes Dokument (mit Wohlgeformtheits-Prüfungen der
//! Dokumentebene), Fragment (Entity-Ersetzungstext, Text und mehrere
//! Wurzeln erlaubt, Namespace-Scope der Referenzstelle wird geerbt) und
//! Attributtext (Ersetzungstext im Attributkontext, nur Text- und
//! Referenz-Knoten, kein Markup).

use std::collections::VecDeque;
use std::io;

use memchr::memchr;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::reader::{NodeKind, ReadState, TokenRead};
use crate::{Error, Result};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

// ============================================================================
// Hilfstypen
// ============================================================================

/// Eine Namespace-Bindung im aktuellen Gültigkeitsbereich.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NsBinding {
    pub(crate) prefix: String,
    pub(crate) uri: String,
}

/// Ein Bestandteil eines Attributwerts nach der Referenz-Zerlegung.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ValueSegment {
    /// Literaler Text; Zeichen- und vordefinierte Referenzen sind bereits
    /// substituiert.
    Text(String),
    /// Nicht aufgelöste General-Entity-Referenz.
    EntityRef(String),
}

#[derive(Debug, Clone)]
struct AttributeEntry {
    name: String,
    /// Flacher Wert; General-Referenzen stehen literal als `&name;` darin.
    value: String,
    segments: Vec<ValueSegment>,
}

#[derive(Debug, Clone, Default)]
struct Token {
    kind: NodeKind,
    name: String,
    value: String,
    depth: usize,
    empty: bool,
    line: u64,
    column: u64,
}

/// Cursor-Position innerhalb des aktuellen Tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Token,
    Attribute(usize),
    ValuePart { attribute: usize, part: usize },
}

/// Zeile/Spalte zu einem monoton wachsenden Byte-Offset.
#[derive(Debug, Clone)]
struct PositionTracker {
    offset: usize,
    line: u64,
    column: u64,
}

impl PositionTracker {
    fn new() -> Self {
        PositionTracker { offset: 0, line: 1, column: 1 }
    }

    fn advance_to(&mut self, target: usize, data: &[u8]) {
        let end = target.min(data.len());
        while self.offset < end {
            if data[self.offset] == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.offset += 1;
        }
    }
}

// ============================================================================
// TokenSource
// ============================================================================

/// Pull-Tokenizer über einem im Speicher liegenden XML-Strom.
pub struct TokenSource {
    reader: Option<Reader<io::Cursor<Vec<u8>>>>,
    buf: Vec<u8>,
    queued: VecDeque<Token>,
    current: Token,
    attributes: Vec<AttributeEntry>,
    focus: Focus,
    state: ReadState,
    /// Dokument-Modus: genau ein Wurzelelement, DOCTYPE nur davor,
    /// keine Zeichendaten außerhalb der Wurzel.
    document: bool,
    seen_root: bool,
    doctype_allowed: bool,
    elem_depth: usize,
    scope: Vec<NsBinding>,
    marks: Vec<usize>,
    tracker: PositionTracker,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenSource({:?}, {:?})", self.state, self.current.kind)
    }
}

impl TokenSource {
    /// Tokenizer über einem vollständigen Dokument.
    pub fn for_document(input: impl Into<Vec<u8>>) -> TokenSource {
        Self::with_reader(input.into(), true, Vec::new())
    }

    /// Liest die Eingabe vollständig und tokenisiert sie als Dokument.
    ///
    /// # Errors
    ///
    /// [`Error::IoError`], wenn die Eingabe nicht gelesen werden kann.
    pub fn from_reader(mut input: impl io::Read) -> Result<TokenSource> {
        let mut data = Vec::new();
        input
            .read_to_end(&mut data)
            .map_err(|e| Error::IoError(format!("Eingabe nicht lesbar: {e}")))?;
        Ok(Self::for_document(data))
    }

    /// Tokenizer über einem Entity-Ersetzungstext in Inhaltskontext.
    ///
    /// `scope` sind die an der Referenzstelle sichtbaren
    /// Namespace-Bindungen.
    pub(crate) fn for_fragment(text: &str, scope: Vec<NsBinding>) -> TokenSource {
        Self::with_reader(text.as_bytes().to_vec(), false, scope)
    }

    fn with_reader(data: Vec<u8>, document: bool, scope: Vec<NsBinding>) -> TokenSource {
        let mut reader = Reader::from_reader(io::Cursor::new(data));
        reader.config_mut().trim_text(false);
        TokenSource {
            reader: Some(reader),
            buf: Vec::new(),
            queued: VecDeque::new(),
            current: Token::default(),
            attributes: Vec::new(),
            focus: Focus::Token,
            state: ReadState::Initial,
            document,
            seen_root: false,
            doctype_allowed: document,
            elem_depth: 0,
            scope,
            marks: Vec::new(),
            tracker: PositionTracker::new(),
        }
    }

    /// Tokenizer über einem Entity-Ersetzungstext in Attributkontext.
    ///
    /// Im Attributkontext ist kein Markup zulässig; der Text zerfällt in
    /// [`Text`](NodeKind::Text)- und
    /// [`EntityReference`](NodeKind::EntityReference)-Knoten.
    ///
    /// # Errors
    ///
    /// [`Error::XmlSyntax`] bei `<` im Text oder einer unbeendeten
    /// Referenz (Positionen relativ zum Ersetzungstext).
    pub(crate) fn for_attribute_text(text: &str) -> Result<TokenSource> {
        let mut queued = VecDeque::new();
        let mut pending = String::new();
        let mut pending_start: Option<(u64, u64)> = None;
        let mut line: u64 = 1;
        let mut column: u64 = 1;

        let mut rest = text;
        while !rest.is_empty() {
            let bytes = rest.as_bytes();
            if bytes[0] == b'<' {
                return Err(Error::xml_syntax(
                    "'<' ist im Attributwert nicht zulässig (XML 1.0 §3.1)",
                    line,
                    column,
                ));
            }
            if bytes[0] == b'&' {
                let Some(rel_semi) = memchr(b';', bytes) else {
                    return Err(Error::xml_syntax("unbeendete Referenz", line, column));
                };
                let name = &rest[1..rel_semi];
                if let Some(stripped) = name.strip_prefix('#') {
                    let Some(ch) = resolve_char_reference(stripped) else {
                        return Err(Error::xml_syntax(
                            "ungültige Zeichen-Referenz",
                            line,
                            column,
                        ));
                    };
                    pending_start.get_or_insert((line, column));
                    pending.push(ch);
                } else if let Some(predefined) = resolve_predefined_entity(name) {
                    pending_start.get_or_insert((line, column));
                    pending.push_str(predefined);
                } else {
                    flush_text(&mut queued, &mut pending, &mut pending_start);
                    queued.push_back(Token {
                        kind: NodeKind::EntityReference,
                        name: name.to_string(),
                        line,
                        column,
                        ..Token::default()
                    });
                }
                column += (rel_semi + 1) as u64;
                rest = &rest[rel_semi + 1..];
                continue;
            }
            let ch_len = rest.chars().next().map_or(1, char::len_utf8);
            pending_start.get_or_insert((line, column));
            pending.push_str(&rest[..ch_len]);
            if bytes[0] == b'\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
            rest = &rest[ch_len..];
        }
        flush_text(&mut queued, &mut pending, &mut pending_start);

        Ok(TokenSource {
            reader: None,
            buf: Vec::new(),
            queued,
            current: Token::default(),
            attributes: Vec::new(),
            focus: Focus::Token,
            state: ReadState::Initial,
            document: false,
            seen_root: false,
            doctype_allowed: false,
            elem_depth: 0,
            scope: Vec::new(),
            marks: Vec::new(),
            tracker: PositionTracker::new(),
        })
    }

    // ========================================================================
    // Interna für den auflösenden Reader
    // ========================================================================

    /// Momentaufnahme der sichtbaren Namespace-Bindungen.
    pub(crate) fn namespace_snapshot(&self) -> Vec<NsBinding> {
        self.scope.clone()
    }

    /// Ob der Cursor auf einem Attribut oder in dessen Wert steht.
    pub(crate) fn in_attribute(&self) -> bool {
        self.focus != Focus::Token
    }

    /// Die Bestandteile des Attributwerts mit diesem Index.
    pub(crate) fn attribute_segments(&self, index: usize) -> Option<&[ValueSegment]> {
        self.attributes.get(index).map(|a| a.segments.as_slice())
    }

    /// Ersetzt den Wert eines Attributs durch expandierten Text.
    pub(crate) fn set_attribute_value(&mut self, index: usize, value: String) {
        if let Some(entry) = self.attributes.get_mut(index) {
            entry.segments = vec![ValueSegment::Text(value.clone())];
            entry.value = value;
        }
    }

    // ========================================================================
    // Pump
    // ========================================================================

    fn pump(&mut self) -> Result<bool> {
        loop {
            let Some(reader) = self.reader.as_mut() else {
                // Attributtext-Modus: Warteschlange war die ganze Quelle.
                self.current = Token::default();
                self.state = ReadState::EndOfFile;
                return Ok(false);
            };
            let start = reader.buffer_position() as usize;
            self.tracker.advance_to(start, reader.get_ref().get_ref());
            let line = self.tracker.line;
            let column = self.tracker.column;

            match reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => {
                    let name = decode_name(e.name().as_ref(), line, column)?;
                    let attrs = collect_attributes(&e, line, column)?;
                    return self.finish_start(name, attrs, false, line, column);
                }
                Ok(Event::Empty(e)) => {
                    let name = decode_name(e.name().as_ref(), line, column)?;
                    let attrs = collect_attributes(&e, line, column)?;
                    return self.finish_start(name, attrs, true, line, column);
                }
                Ok(Event::End(e)) => {
                    let name = decode_name(e.name().as_ref(), line, column)?;
                    let Some(depth) = self.elem_depth.checked_sub(1) else {
                        return Err(self.fail(
                            format!("unerwartetes End-Tag '</{name}>'"),
                            line,
                            column,
                        ));
                    };
                    self.elem_depth = depth;
                    if let Some(mark) = self.marks.pop() {
                        self.scope.truncate(mark);
                    }
                    return self.finish(Token {
                        kind: NodeKind::EndElement,
                        name,
                        depth,
                        line,
                        column,
                        ..Token::default()
                    });
                }
                Ok(Event::Text(e)) => {
                    let raw = decode_bytes(e.as_ref(), line, column)?;
                    let whitespace = raw
                        .bytes()
                        .all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'));
                    if self.document && self.elem_depth == 0 && !whitespace {
                        return Err(self.fail(
                            "Zeichendaten außerhalb des Wurzelelements",
                            line,
                            column,
                        ));
                    }
                    let value = normalize_line_endings(&raw);
                    let kind = if whitespace { NodeKind::Whitespace } else { NodeKind::Text };
                    return self.finish(Token {
                        kind,
                        value,
                        depth: self.elem_depth,
                        line,
                        column,
                        ..Token::default()
                    });
                }
                Ok(Event::CData(e)) => {
                    let raw = decode_bytes(&e.into_inner(), line, column)?;
                    if self.document && self.elem_depth == 0 {
                        return Err(self.fail(
                            "Zeichendaten außerhalb des Wurzelelements",
                            line,
                            column,
                        ));
                    }
                    return self.finish(Token {
                        kind: NodeKind::CData,
                        value: normalize_line_endings(&raw),
                        depth: self.elem_depth,
                        line,
                        column,
                        ..Token::default()
                    });
                }
                Ok(Event::Comment(e)) => {
                    let value = decode_bytes(e.as_ref(), line, column)?;
                    return self.finish(Token {
                        kind: NodeKind::Comment,
                        value: normalize_line_endings(&value),
                        depth: self.elem_depth,
                        line,
                        column,
                        ..Token::default()
                    });
                }
                Ok(Event::PI(e)) => {
                    let name = decode_bytes(e.target(), line, column)?;
                    let content = decode_bytes(e.content(), line, column)?;
                    // XML 1.0 §2.6: Whitespace zwischen PITarget und Daten
                    // ist Separator, nicht Teil der Daten.
                    let value = normalize_line_endings(content.trim_start());
                    return self.finish(Token {
                        kind: NodeKind::ProcessingInstruction,
                        name,
                        value,
                        depth: self.elem_depth,
                        line,
                        column,
                        ..Token::default()
                    });
                }
                Ok(Event::DocType(e)) => {
                    let raw = decode_bytes(e.as_ref(), line, column)?;
                    if !self.doctype_allowed {
                        return Err(self.fail(
                            "DOCTYPE an unzulässiger Stelle",
                            line,
                            column,
                        ));
                    }
                    self.doctype_allowed = false;
                    return self.finish(Token {
                        kind: NodeKind::DocumentType,
                        name: doctype_root_name(&raw),
                        value: raw,
                        depth: 0,
                        line,
                        column,
                        ..Token::default()
                    });
                }
                Ok(Event::GeneralRef(e)) => {
                    let name = decode_bytes(e.as_ref(), line, column)?;
                    if self.document && self.elem_depth == 0 {
                        return Err(self.fail(
                            "Referenz außerhalb des Wurzelelements",
                            line,
                            column,
                        ));
                    }
                    if let Some(stripped) = name.strip_prefix('#') {
                        let Some(ch) = resolve_char_reference(stripped) else {
                            return Err(self.fail(
                                "ungültige Zeichen-Referenz",
                                line,
                                column,
                            ));
                        };
                        return self.finish(Token {
                            kind: NodeKind::Text,
                            value: ch.to_string(),
                            depth: self.elem_depth,
                            line,
                            column,
                            ..Token::default()
                        });
                    }
                    if let Some(predefined) = resolve_predefined_entity(&name) {
                        return self.finish(Token {
                            kind: NodeKind::Text,
                            value: predefined.to_string(),
                            depth: self.elem_depth,
                            line,
                            column,
                            ..Token::default()
                        });
                    }
                    return self.finish(Token {
                        kind: NodeKind::EntityReference,
                        name,
                        depth: self.elem_depth,
                        line,
                        column,
                        ..Token::default()
                    });
                }
                Ok(Event::Decl(_)) => {
                    // XML-Deklaration trägt keinen eigenen Knoten bei.
                }
                Ok(Event::Eof) => {
                    if self.elem_depth > 0 {
                        return Err(self.fail(
                            "unerwartetes Ende: Elemente sind noch offen",
                            line,
                            column,
                        ));
                    }
                    if self.document && !self.seen_root {
                        return Err(self.fail("Wurzelelement fehlt", line, column));
                    }
                    self.current = Token::default();
                    self.state = ReadState::EndOfFile;
                    return Ok(false);
                }
                Err(e) => {
                    return Err(self.fail(format!("{e}"), line, column));
                }
            }
        }
    }

    fn finish_start(
        &mut self,
        name: String,
        raw_attrs: Vec<(String, String)>,
        empty: bool,
        line: u64,
        column: u64,
    ) -> Result<bool> {
        if self.document && self.elem_depth == 0 {
            if self.seen_root {
                return Err(self.fail("mehrere Wurzelelemente", line, column));
            }
            self.seen_root = true;
            self.doctype_allowed = false;
        }
        self.marks.push(self.scope.len());

        let mut entries = Vec::with_capacity(raw_attrs.len());
        for (attr_name, raw_value) in raw_attrs {
            let (value, segments) = match split_attribute_value(&raw_value) {
                Ok(split) => split,
                Err(message) => {
                    return Err(self.fail(message, line, column));
                }
            };
            if let Some(binding) = namespace_binding(&attr_name, &value) {
                self.scope.push(binding);
            }
            entries.push(AttributeEntry { name: attr_name, value, segments });
        }

        let depth = self.elem_depth;
        if empty {
            self.queued.push_back(Token {
                kind: NodeKind::EndElement,
                name: name.clone(),
                depth,
                line,
                column,
                ..Token::default()
            });
        } else {
            self.elem_depth += 1;
        }
        self.attributes = entries;
        self.current = Token {
            kind: NodeKind::StartElement,
            name,
            depth,
            empty,
            line,
            column,
            ..Token::default()
        };
        self.state = ReadState::Interactive;
        Ok(true)
    }

    fn finish(&mut self, token: Token) -> Result<bool> {
        self.current = token;
        self.state = ReadState::Interactive;
        Ok(true)
    }

    fn fail(&mut self, message: impl Into<std::borrow::Cow<'static, str>>, line: u64, column: u64) -> Error {
        self.state = ReadState::Error;
        Error::xml_syntax(message, line, column)
    }
}

// ============================================================================
// TokenRead
// ============================================================================

impl TokenRead for TokenSource {
    fn advance(&mut self) -> Result<bool> {
        match self.state {
            ReadState::Closed | ReadState::EndOfFile | ReadState::Error => return Ok(false),
            ReadState::Initial | ReadState::Interactive => {}
        }
        self.focus = Focus::Token;
        if let Some(token) = self.queued.pop_front() {
            if token.kind == NodeKind::EndElement
                && let Some(mark) = self.marks.pop()
            {
                self.scope.truncate(mark);
            }
            self.attributes.clear();
            self.current = token;
            self.state = ReadState::Interactive;
            return Ok(true);
        }
        self.attributes.clear();
        self.pump()
    }

    fn kind(&self) -> NodeKind {
        match self.focus {
            Focus::Token => self.current.kind,
            Focus::Attribute(_) => NodeKind::Attribute,
            Focus::ValuePart { attribute, part } => {
                match self.segment_at(attribute, part) {
                    Some(ValueSegment::Text(_)) => NodeKind::Text,
                    Some(ValueSegment::EntityRef(_)) => NodeKind::EntityReference,
                    None => NodeKind::None,
                }
            }
        }
    }

    fn name(&self) -> &str {
        match self.focus {
            Focus::Token => &self.current.name,
            Focus::Attribute(index) => {
                self.attributes.get(index).map_or("", |a| a.name.as_str())
            }
            Focus::ValuePart { attribute, part } => match self.segment_at(attribute, part) {
                Some(ValueSegment::EntityRef(name)) => name,
                _ => "",
            },
        }
    }

    fn value(&self) -> &str {
        match self.focus {
            Focus::Token => &self.current.value,
            Focus::Attribute(index) => {
                self.attributes.get(index).map_or("", |a| a.value.as_str())
            }
            Focus::ValuePart { attribute, part } => match self.segment_at(attribute, part) {
                Some(ValueSegment::Text(text)) => text,
                _ => "",
            },
        }
    }

    fn depth(&self) -> usize {
        match self.focus {
            Focus::Token => self.current.depth,
            Focus::Attribute(_) => self.current.depth + 1,
            Focus::ValuePart { .. } => self.current.depth + 2,
        }
    }

    fn is_empty_element(&self) -> bool {
        self.focus == Focus::Token && self.current.empty
    }

    fn read_state(&self) -> ReadState {
        self.state
    }

    fn line(&self) -> u64 {
        self.current.line
    }

    fn column(&self) -> u64 {
        self.current.column
    }

    fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    fn move_to_attribute(&mut self, name: &str) -> bool {
        match self.attributes.iter().position(|a| a.name == name) {
            Some(index) => {
                self.focus = Focus::Attribute(index);
                true
            }
            None => false,
        }
    }

    fn move_to_attribute_index(&mut self, index: usize) -> bool {
        if index < self.attributes.len() {
            self.focus = Focus::Attribute(index);
            true
        } else {
            false
        }
    }

    fn move_to_first_attribute(&mut self) -> bool {
        self.move_to_attribute_index(0)
    }

    fn move_to_next_attribute(&mut self) -> bool {
        match self.focus {
            Focus::Token => self.move_to_attribute_index(0),
            Focus::Attribute(index) | Focus::ValuePart { attribute: index, .. } => {
                self.move_to_attribute_index(index + 1)
            }
        }
    }

    fn move_to_element(&mut self) -> bool {
        if self.focus == Focus::Token {
            false
        } else {
            self.focus = Focus::Token;
            true
        }
    }

    fn read_attribute_value(&mut self) -> bool {
        match self.focus {
            Focus::Token => false,
            Focus::Attribute(attribute) => {
                if self.segment_at(attribute, 0).is_some() {
                    self.focus = Focus::ValuePart { attribute, part: 0 };
                    true
                } else {
                    false
                }
            }
            Focus::ValuePart { attribute, part } => {
                if self.segment_at(attribute, part + 1).is_some() {
                    self.focus = Focus::ValuePart { attribute, part: part + 1 };
                    true
                } else {
                    false
                }
            }
        }
    }

    fn resolve_entity(&mut self) -> Result<()> {
        if self.kind() != NodeKind::EntityReference {
            return Err(Error::invalid_operation(
                "resolve_entity: aktueller Knoten ist keine Entity-Referenz",
            ));
        }
        // Der Basis-Tokenizer kennt keine DTD; Auflösung übernimmt der
        // umschließende Reader.
        Err(Error::NoDtd { line: self.current.line, column: self.current.column })
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        match prefix {
            "xml" => return Some(XML_NAMESPACE),
            "xmlns" => return Some(XMLNS_NAMESPACE),
            _ => {}
        }
        let binding = self.scope.iter().rev().find(|b| b.prefix == prefix)?;
        if binding.uri.is_empty() {
            // xmlns="" hebt den Default-Namespace auf.
            None
        } else {
            Some(&binding.uri)
        }
    }

    fn close(&mut self) {
        self.state = ReadState::Closed;
        self.current = Token::default();
        self.attributes.clear();
        self.queued.clear();
        self.focus = Focus::Token;
    }
}

impl TokenSource {
    fn segment_at(&self, attribute: usize, part: usize) -> Option<&ValueSegment> {
        self.attributes.get(attribute)?.segments.get(part)
    }
}

// ============================================================================
// Freie Helfer
// ============================================================================

fn flush_text(
    queued: &mut VecDeque<Token>,
    pending: &mut String,
    pending_start: &mut Option<(u64, u64)>,
) {
    if pending.is_empty() {
        *pending_start = None;
        return;
    }
    let (line, column) = pending_start.take().unwrap_or((1, 1));
    queued.push_back(Token {
        kind: NodeKind::Text,
        value: std::mem::take(pending),
        line,
        column,
        ..Token::default()
    });
}

fn decode_bytes(bytes: &[u8], line: u64, column: u64) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(e) => Err(Error::xml_syntax(format!("ungültiges UTF-8: {e}"), line, column)),
    }
}

fn decode_name(bytes: &[u8], line: u64, column: u64) -> Result<String> {
    decode_bytes(bytes, line, column)
}

fn collect_attributes(
    e: &BytesStart<'_>,
    line: u64,
    column: u64,
) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            Error::xml_syntax(format!("fehlerhaftes Attribut: {err}"), line, column)
        })?;
        let name = decode_bytes(attr.key.as_ref(), line, column)?;
        let value = decode_bytes(attr.value.as_ref(), line, column)?;
        attrs.push((name, value));
    }
    Ok(attrs)
}

/// Zerlegt einen rohen Attributwert in den flachen Wert und seine
/// Bestandteile.
///
/// Zeichen- und vordefinierte Referenzen werden substituiert, literaler
/// Whitespace wird zu `#x20` normalisiert (XML 1.0 §3.3.3), per
/// Zeichen-Referenz geschriebener Whitespace bleibt erhalten.
/// General-Referenzen bleiben im flachen Wert literal stehen und bilden
/// eigene Segmente.
fn split_attribute_value(raw: &str) -> std::result::Result<(String, Vec<ValueSegment>), String> {
    let mut segments: Vec<ValueSegment> = Vec::new();
    let mut text = String::with_capacity(raw.len());
    let bytes = raw.as_bytes();
    let mut pos = 0;

    while pos < raw.len() {
        match memchr(b'&', &bytes[pos..]) {
            None => {
                push_normalized(&mut text, &raw[pos..]);
                break;
            }
            Some(rel) => {
                let amp = pos + rel;
                push_normalized(&mut text, &raw[pos..amp]);
                let Some(rel_semi) = memchr(b';', &bytes[amp + 1..]) else {
                    return Err("unbeendete Referenz im Attributwert".to_string());
                };
                let semi = amp + 1 + rel_semi;
                let name = &raw[amp + 1..semi];
                if let Some(stripped) = name.strip_prefix('#') {
                    match resolve_char_reference(stripped) {
                        Some(ch) => text.push(ch),
                        None => {
                            return Err(format!(
                                "ungültige Zeichen-Referenz '&{name};' im Attributwert"
                            ));
                        }
                    }
                } else if let Some(predefined) = resolve_predefined_entity(name) {
                    text.push_str(predefined);
                } else {
                    if !text.is_empty() {
                        segments.push(ValueSegment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(ValueSegment::EntityRef(name.to_string()));
                }
                pos = semi + 1;
            }
        }
    }
    if !text.is_empty() {
        segments.push(ValueSegment::Text(text));
    }

    let mut flat = String::with_capacity(raw.len());
    for segment in &segments {
        match segment {
            ValueSegment::Text(t) => flat.push_str(t),
            ValueSegment::EntityRef(name) => {
                flat.push('&');
                flat.push_str(name);
                flat.push(';');
            }
        }
    }
    Ok((flat, segments))
}

/// Attributwert-Normalisierung für literalen Text: Whitespace wird zu
/// `#x20` (XML 1.0 §3.3.3).
fn push_normalized(out: &mut String, literal: &str) {
    let mut chars = literal.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' | '\t' => out.push(' '),
            other => out.push(other),
        }
    }
}

/// XML 1.0 §2.11: `\r\n` und alleinstehende `\r` werden zu `\n`.
fn normalize_line_endings(s: &str) -> String {
    if memchr(b'\r', s.as_bytes()).is_none() {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(ch);
        }
    }
    out
}

/// [66] CharRef: `stripped` ist der Teil nach `&#`, ohne `;`.
fn resolve_char_reference(stripped: &str) -> Option<char> {
    let (digits, radix) = match stripped.strip_prefix('x') {
        Some(hex) => (hex, 16),
        None => (stripped, 10),
    };
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, radix).ok().and_then(char::from_u32)
}

fn namespace_binding(attr_name: &str, value: &str) -> Option<NsBinding> {
    if attr_name == "xmlns" {
        return Some(NsBinding { prefix: String::new(), uri: value.to_string() });
    }
    let prefix = attr_name.strip_prefix("xmlns:")?;
    Some(NsBinding { prefix: prefix.to_string(), uri: value.to_string() })
}

fn doctype_root_name(raw: &str) -> String {
    raw.trim_start()
        .chars()
        .take_while(|&c| !c.is_whitespace() && c != '[' && c != '>')
        .collect()
}
