//! Recursive-Descent-Parser für DOCTYPE-Text und Internal Subset.
//!
//! Eingabe ist der rohe DOCTYPE-Inhalt, wie ihn der Tokenizer liefert
//! (alles zwischen `<!DOCTYPE` und dem schließenden `>`): Wurzelname,
//! optionale ExternalID, optional das Internal Subset in `[...]`.
//!
//! Produktionsnummern beziehen sich auf XML 1.0 Fifth Edition.
//! Nicht abgedeckt, bewusst: Parameter-Entity-Expansion (Deklarationen
//! und Referenzen werden tolerant übersprungen), Conditional Sections
//! (nur im externen Subset zulässig), Laden des externen Subsets.

use std::borrow::Cow;
use std::rc::Rc;

use crate::dtd::{
    AttDef, AttDefault, AttType, ContentParticle, ContentSpec, Dtd, ElementDecl, EntityDecl,
    NotationDecl, Occurrence, ParticleKind,
};
use crate::{Error, Result};

/// Parst den Inhalt einer DOCTYPE-Deklaration zu einer [`Dtd`].
///
/// `text` ist der Text zwischen `<!DOCTYPE` und `>`, also z.B.
/// `doc SYSTEM "doc.dtd" [ <!ELEMENT doc (p)*> ]`.
///
/// # Beispiel
///
/// ```
/// use erdx::dtd::parser::parse_doctype;
///
/// let dtd = parse_doctype(r#"doc [ <!ENTITY gruss "Hallo"> ]"#).unwrap();
/// assert_eq!(dtd.root_name(), Some("doc"));
/// assert!(dtd.entity("gruss").is_some());
/// ```
pub fn parse_doctype(text: &str) -> Result<Dtd> {
    let mut parser = Parser::new(text);
    let mut dtd = Dtd::new();

    parser.skip_ws();
    let root = parser.parse_name("Wurzelelement-Name")?;
    dtd.set_root_name(Rc::from(root));

    parser.skip_ws();
    if parser.remaining().starts_with("SYSTEM") || parser.remaining().starts_with("PUBLIC") {
        let (public_id, system_id) = parser.parse_external_id(true)?;
        dtd.set_external_id(public_id, system_id);
        parser.skip_ws();
    }

    if parser.peek() == Some('[') {
        parser.advance();
        parser.parse_internal_subset(&mut dtd)?;
    }

    parser.skip_ws();
    if parser.peek().is_some() {
        return parser.fail("unerwarteter Inhalt am Ende der DOCTYPE-Deklaration");
    }
    Ok(dtd)
}

/// [4] NameStartChar (vereinfacht: Nicht-ASCII wird durchgereicht).
fn is_name_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || c as u32 >= 0x80
}

/// [4a] NameChar.
fn is_name_char(c: char) -> bool {
    is_name_start_char(c) || c.is_ascii_digit() || c == '-' || c == '.'
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser { input, pos: 0 }
    }

    // ========================================================================
    // Low-Level Helpers
    // ========================================================================

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn fail<T>(&self, message: impl Into<Cow<'static, str>>) -> Result<T> {
        Err(Error::dtd_syntax(message, self.pos))
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        if self.peek() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            self.fail(format!("'{expected}' erwartet"))
        }
    }

    /// Konsumiert ein bereits per `starts_with` verifiziertes Literal.
    fn consume_literal(&mut self, literal: &str) {
        debug_assert!(self.remaining().starts_with(literal));
        self.pos += literal.len();
    }

    /// Konsumiert `keyword`, wenn es hier steht und nicht Teil eines
    /// längeren Namens ist.
    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if let Some(after) = self.remaining().strip_prefix(keyword)
            && after.chars().next().is_none_or(|c| !is_name_char(c))
        {
            self.pos += keyword.len();
            return true;
        }
        false
    }

    /// [3] S ::= (#x20 | #x9 | #xD | #xA)+
    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| matches!(c, ' ' | '\t' | '\r' | '\n')) {
            self.advance();
        }
    }

    fn require_ws(&mut self, message: &'static str) -> Result<()> {
        let before = self.pos;
        self.skip_ws();
        if self.pos == before {
            return self.fail(message);
        }
        Ok(())
    }

    /// [5] Name ::= NameStartChar (NameChar)*
    fn parse_name(&mut self, what: &str) -> Result<&'a str> {
        if !self.peek().is_some_and(is_name_start_char) {
            return self.fail(format!("{what} erwartet"));
        }
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.advance();
        }
        Ok(&self.input[start..self.pos])
    }

    /// [7] Nmtoken ::= (NameChar)+
    fn parse_nmtoken(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.advance();
        }
        if self.pos == start {
            return self.fail("Nmtoken erwartet");
        }
        Ok(&self.input[start..self.pos])
    }

    /// Quoted Literal ohne Referenz-Verarbeitung
    /// ([11] SystemLiteral, [12] PubidLiteral, [10] AttValue als Rohtext).
    fn parse_quoted(&mut self, what: &str) -> Result<&'a str> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.advance();
                q
            }
            _ => return self.fail(format!("{what} in Anführungszeichen erwartet")),
        };
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let literal = &self.input[start..self.pos];
                self.advance();
                return Ok(literal);
            }
            self.advance();
        }
        self.fail(format!("{what}: schließendes Anführungszeichen fehlt"))
    }

    // ========================================================================
    // Internal Subset
    // ========================================================================

    /// [28b] intSubset ::= (markupdecl | DeclSep)*
    ///
    /// Konsumiert bis einschließlich des schließenden `]`.
    fn parse_internal_subset(&mut self, dtd: &mut Dtd) -> Result<()> {
        loop {
            self.skip_ws();
            match self.peek() {
                None => return self.fail("']' am Ende des Internal Subset erwartet"),
                Some(']') => {
                    self.advance();
                    return Ok(());
                }
                Some('%') => self.skip_pe_reference()?,
                Some('<') => self.parse_markup_decl(dtd)?,
                Some(_) => return self.fail("Markup-Deklaration oder ']' erwartet"),
            }
        }
    }

    /// [29] markupdecl ::= elementdecl | AttlistDecl | EntityDecl
    ///                   | NotationDecl | PI | Comment
    fn parse_markup_decl(&mut self, dtd: &mut Dtd) -> Result<()> {
        let rest = self.remaining();
        if rest.starts_with("<!--") {
            self.skip_comment()
        } else if rest.starts_with("<?") {
            self.skip_pi()
        } else if rest.starts_with("<!ELEMENT") {
            self.parse_element_decl(dtd)
        } else if rest.starts_with("<!ATTLIST") {
            self.parse_attlist_decl(dtd)
        } else if rest.starts_with("<!ENTITY") {
            self.parse_entity_decl(dtd)
        } else if rest.starts_with("<!NOTATION") {
            self.parse_notation_decl(dtd)
        } else {
            self.fail("unbekannte Markup-Deklaration")
        }
    }

    /// [15] Comment (innerhalb des Subsets nur übersprungen).
    fn skip_comment(&mut self) -> Result<()> {
        self.consume_literal("<!--");
        match self.remaining().find("-->") {
            Some(end) => {
                self.pos += end + 3;
                Ok(())
            }
            None => self.fail("unbeendeter Kommentar"),
        }
    }

    /// [16] PI (innerhalb des Subsets nur übersprungen).
    fn skip_pi(&mut self) -> Result<()> {
        self.consume_literal("<?");
        match self.remaining().find("?>") {
            Some(end) => {
                self.pos += end + 2;
                Ok(())
            }
            None => self.fail("unbeendete Processing Instruction"),
        }
    }

    /// [69] PEReference ::= '%' Name ';'
    ///
    /// Als DeclSep toleriert; Parameter-Entities werden nicht expandiert.
    fn skip_pe_reference(&mut self) -> Result<()> {
        self.expect_char('%')?;
        let name = self.parse_name("Parameter-Entity-Name")?;
        self.expect_char(';')?;
        log::debug!("Parameter-Entity-Referenz '%{name};' übersprungen");
        Ok(())
    }

    /// Überspringt eine Deklaration bis `>`, Literale in
    /// Anführungszeichen eingeschlossen.
    fn skip_to_decl_end(&mut self) -> Result<()> {
        loop {
            match self.advance() {
                None => return self.fail("'>' am Ende der Deklaration erwartet"),
                Some('>') => return Ok(()),
                Some(q @ ('"' | '\'')) => {
                    while let Some(c) = self.advance() {
                        if c == q {
                            break;
                        }
                    }
                }
                Some(_) => {}
            }
        }
    }

    // ========================================================================
    // Element-Deklarationen
    // ========================================================================

    /// [45] elementdecl ::= '<!ELEMENT' S Name S contentspec S? '>'
    fn parse_element_decl(&mut self, dtd: &mut Dtd) -> Result<()> {
        self.consume_literal("<!ELEMENT");
        self.require_ws("Whitespace nach '<!ELEMENT' erwartet")?;
        let name = self.parse_name("Element-Name")?;
        self.require_ws("Whitespace nach dem Element-Namen erwartet")?;
        let content = self.parse_content_spec()?;
        self.skip_ws();
        self.expect_char('>')?;
        dtd.add_element(ElementDecl { name: Rc::from(name), content });
        Ok(())
    }

    /// [46] contentspec ::= 'EMPTY' | 'ANY' | Mixed | children
    fn parse_content_spec(&mut self) -> Result<ContentSpec> {
        if self.consume_keyword("EMPTY") {
            return Ok(ContentSpec::Empty);
        }
        if self.consume_keyword("ANY") {
            return Ok(ContentSpec::Any);
        }
        if self.peek() == Some('(') {
            // Lookahead: Mixed beginnt mit '(' S? '#PCDATA'
            let saved = self.pos;
            self.advance();
            self.skip_ws();
            let mixed = self.remaining().starts_with("#PCDATA");
            self.pos = saved;
            return if mixed {
                self.parse_mixed()
            } else {
                Ok(ContentSpec::Children(self.parse_group()?))
            };
        }
        self.fail("'EMPTY', 'ANY' oder '(' erwartet")
    }

    /// [51] Mixed ::= '(' S? '#PCDATA' (S? '|' S? Name)* S? ')*'
    ///              | '(' S? '#PCDATA' S? ')'
    fn parse_mixed(&mut self) -> Result<ContentSpec> {
        self.expect_char('(')?;
        self.skip_ws();
        self.consume_literal("#PCDATA");
        let mut names: Vec<Rc<str>> = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('|') => {
                    self.advance();
                    self.skip_ws();
                    let name = self.parse_name("Element-Name nach '|'")?;
                    names.push(Rc::from(name));
                }
                Some(')') => {
                    self.advance();
                    if self.peek() == Some('*') {
                        self.advance();
                    } else if !names.is_empty() {
                        return self.fail("')*' nach Mixed-Content mit Element-Namen erwartet");
                    }
                    return Ok(ContentSpec::Mixed(names));
                }
                _ => return self.fail("'|' oder ')' in Mixed-Content erwartet"),
            }
        }
    }

    /// [49] choice ::= '(' S? cp ( S? '|' S? cp )+ S? ')'
    /// [50] seq    ::= '(' S? cp ( S? ',' S? cp )* S? ')'
    ///
    /// Eine Gruppe mit genau einem cp und ohne Separator zählt als seq.
    fn parse_group(&mut self) -> Result<ContentParticle> {
        self.expect_char('(')?;
        self.skip_ws();
        let first = self.parse_cp()?;
        self.skip_ws();
        let mut items = vec![first];
        let kind = match self.peek() {
            Some('|') => {
                while self.peek() == Some('|') {
                    self.advance();
                    self.skip_ws();
                    items.push(self.parse_cp()?);
                    self.skip_ws();
                }
                ParticleKind::Choice(items)
            }
            Some(',') => {
                while self.peek() == Some(',') {
                    self.advance();
                    self.skip_ws();
                    items.push(self.parse_cp()?);
                    self.skip_ws();
                }
                ParticleKind::Seq(items)
            }
            Some(')') => ParticleKind::Seq(items),
            _ => return self.fail("'|', ',' oder ')' erwartet"),
        };
        self.expect_char(')')?;
        Ok(ContentParticle::new(kind, self.parse_occurrence()))
    }

    /// [48] cp ::= (Name | choice | seq) ('?' | '*' | '+')?
    fn parse_cp(&mut self) -> Result<ContentParticle> {
        if self.peek() == Some('(') {
            return self.parse_group();
        }
        let name = self.parse_name("Element-Name oder '('")?;
        Ok(ContentParticle::new(
            ParticleKind::Name(Rc::from(name)),
            self.parse_occurrence(),
        ))
    }

    fn parse_occurrence(&mut self) -> Occurrence {
        match self.peek() {
            Some('?') => {
                self.advance();
                Occurrence::Optional
            }
            Some('*') => {
                self.advance();
                Occurrence::ZeroOrMore
            }
            Some('+') => {
                self.advance();
                Occurrence::OneOrMore
            }
            _ => Occurrence::Once,
        }
    }

    // ========================================================================
    // Attributlisten
    // ========================================================================

    /// [52] AttlistDecl ::= '<!ATTLIST' S Name AttDef* S? '>'
    fn parse_attlist_decl(&mut self, dtd: &mut Dtd) -> Result<()> {
        self.consume_literal("<!ATTLIST");
        self.require_ws("Whitespace nach '<!ATTLIST' erwartet")?;
        let element = self.parse_name("Element-Name")?;
        let mut defs = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('>') {
                self.advance();
                break;
            }
            defs.push(self.parse_att_def()?);
        }
        dtd.add_attlist(Rc::from(element), defs);
        Ok(())
    }

    /// [53] AttDef ::= S Name S AttType S DefaultDecl
    fn parse_att_def(&mut self) -> Result<AttDef> {
        let name = self.parse_name("Attribut-Name")?;
        self.require_ws("Whitespace nach dem Attribut-Namen erwartet")?;
        let att_type = self.parse_att_type()?;
        self.require_ws("Whitespace vor der Default-Deklaration erwartet")?;
        let default = self.parse_default_decl()?;
        Ok(AttDef { name: Rc::from(name), att_type, default })
    }

    /// [54] AttType ::= StringType | TokenizedType | EnumeratedType
    /// [55] StringType ::= 'CDATA'
    /// [56] TokenizedType ::= 'ID' | 'IDREF' | 'IDREFS' | 'ENTITY'
    ///                      | 'ENTITIES' | 'NMTOKEN' | 'NMTOKENS'
    fn parse_att_type(&mut self) -> Result<AttType> {
        if self.consume_keyword("CDATA") {
            return Ok(AttType::CData);
        }
        if self.consume_keyword("IDREFS") {
            return Ok(AttType::IdRefs);
        }
        if self.consume_keyword("IDREF") {
            return Ok(AttType::IdRef);
        }
        if self.consume_keyword("ID") {
            return Ok(AttType::Id);
        }
        if self.consume_keyword("ENTITIES") {
            return Ok(AttType::Entities);
        }
        if self.consume_keyword("ENTITY") {
            return Ok(AttType::Entity);
        }
        if self.consume_keyword("NMTOKENS") {
            return Ok(AttType::NmTokens);
        }
        if self.consume_keyword("NMTOKEN") {
            return Ok(AttType::NmToken);
        }
        if self.consume_keyword("NOTATION") {
            // [58] NotationType ::= 'NOTATION' S '(' S? Name (S? '|' S? Name)* S? ')'
            self.require_ws("Whitespace nach 'NOTATION' erwartet")?;
            let names = self.parse_token_group(false)?;
            return Ok(AttType::Notation(names));
        }
        if self.peek() == Some('(') {
            // [59] Enumeration ::= '(' S? Nmtoken (S? '|' S? Nmtoken)* S? ')'
            let tokens = self.parse_token_group(true)?;
            return Ok(AttType::Enumeration(tokens));
        }
        self.fail("Attributtyp erwartet")
    }

    fn parse_token_group(&mut self, nmtoken: bool) -> Result<Vec<Rc<str>>> {
        self.expect_char('(')?;
        let mut names = Vec::new();
        loop {
            self.skip_ws();
            let name = if nmtoken {
                self.parse_nmtoken()?
            } else {
                self.parse_name("Notation-Name")?
            };
            names.push(Rc::from(name));
            self.skip_ws();
            match self.advance() {
                Some('|') => {}
                Some(')') => return Ok(names),
                _ => return self.fail("'|' oder ')' erwartet"),
            }
        }
    }

    /// [60] DefaultDecl ::= '#REQUIRED' | '#IMPLIED' | (('#FIXED' S)? AttValue)
    ///
    /// Default-Werte werden als Rohtext gespeichert; Referenzen darin
    /// werden nicht expandiert.
    fn parse_default_decl(&mut self) -> Result<AttDefault> {
        if self.consume_keyword("#REQUIRED") {
            return Ok(AttDefault::Required);
        }
        if self.consume_keyword("#IMPLIED") {
            return Ok(AttDefault::Implied);
        }
        if self.consume_keyword("#FIXED") {
            self.require_ws("Whitespace nach '#FIXED' erwartet")?;
            let value = self.parse_quoted("Attribut-Default")?;
            return Ok(AttDefault::Fixed(Rc::from(value)));
        }
        let value = self.parse_quoted("Attribut-Default")?;
        Ok(AttDefault::Default(Rc::from(value)))
    }

    // ========================================================================
    // Entities und Notationen
    // ========================================================================

    /// [71] GEDecl ::= '<!ENTITY' S Name S EntityDef S? '>'
    /// [72] PEDecl ::= '<!ENTITY' S '%' S Name S PEDef S? '>'
    /// [73] EntityDef ::= EntityValue | (ExternalID NDataDecl?)
    /// [76] NDataDecl ::= S 'NDATA' S Name
    fn parse_entity_decl(&mut self, dtd: &mut Dtd) -> Result<()> {
        self.consume_literal("<!ENTITY");
        self.require_ws("Whitespace nach '<!ENTITY' erwartet")?;
        if self.peek() == Some('%') {
            // Parameter-Entity: Deklaration wird weder gespeichert noch
            // expandiert.
            log::debug!("Parameter-Entity-Deklaration übersprungen");
            return self.skip_to_decl_end();
        }
        let name = self.parse_name("Entity-Name")?;
        self.require_ws("Whitespace nach dem Entity-Namen erwartet")?;

        let decl = match self.peek() {
            Some('"' | '\'') => {
                let value_start = self.pos;
                let replacement = self.parse_entity_value()?;
                // Direkte Selbstreferenz macht jede spätere Expansion
                // endlos; sie wird schon hier abgewiesen.
                if replacement.contains(&format!("&{name};")) {
                    return Err(Error::dtd_syntax(
                        format!("Entity '{name}' referenziert sich selbst"),
                        value_start,
                    ));
                }
                EntityDecl {
                    name: Rc::from(name),
                    public_id: None,
                    system_id: None,
                    notation: None,
                    replacement: Some(Rc::from(replacement.as_str())),
                }
            }
            _ => {
                let (public_id, system_id) = self.parse_external_id(true)?;
                let mut notation = None;
                self.skip_ws();
                if self.consume_keyword("NDATA") {
                    self.require_ws("Whitespace nach 'NDATA' erwartet")?;
                    notation = Some(Rc::from(self.parse_name("Notation-Name")?));
                }
                EntityDecl {
                    name: Rc::from(name),
                    public_id,
                    system_id,
                    notation,
                    replacement: None,
                }
            }
        };

        self.skip_ws();
        self.expect_char('>')?;
        dtd.add_entity(decl);
        Ok(())
    }

    /// [9] EntityValue ::= '"' ([^%&"] | PEReference | Reference)* '"' | ...
    ///
    /// Zeichen-Referenzen werden sofort substituiert, General-Entity-
    /// Referenzen bleiben literal im Ersetzungstext stehen (XML 1.0 §4.5).
    fn parse_entity_value(&mut self) -> Result<String> {
        let Some(quote) = self.advance() else {
            return self.fail("Anführungszeichen erwartet");
        };
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return self.fail("Entity-Wert: schließendes Anführungszeichen fehlt"),
                Some(c) if c == quote => return Ok(value),
                Some('&') => {
                    if self.peek() == Some('#') {
                        value.push(self.parse_char_reference()?);
                    } else {
                        value.push('&');
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    /// [66] CharRef ::= '&#' [0-9]+ ';' | '&#x' [0-9a-fA-F]+ ';'
    ///
    /// Das `&` ist beim Aufruf bereits konsumiert.
    fn parse_char_reference(&mut self) -> Result<char> {
        self.expect_char('#')?;
        let hex = self.peek() == Some('x');
        if hex {
            self.advance();
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| {
            if hex { c.is_ascii_hexdigit() } else { c.is_ascii_digit() }
        }) {
            self.advance();
        }
        let digits = &self.input[start..self.pos];
        if digits.is_empty() {
            return self.fail("Ziffern in der Zeichen-Referenz erwartet");
        }
        self.expect_char(';')?;
        u32::from_str_radix(digits, if hex { 16 } else { 10 })
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| {
                Error::dtd_syntax("ungültiger Codepunkt in Zeichen-Referenz", self.pos)
            })
    }

    /// [75] ExternalID ::= 'SYSTEM' S SystemLiteral
    ///                   | 'PUBLIC' S PubidLiteral S SystemLiteral
    /// [83] PublicID   ::= 'PUBLIC' S PubidLiteral
    ///
    /// `system_required = false` erlaubt die PublicID-Form (nur in
    /// NOTATION-Deklarationen zulässig).
    fn parse_external_id(
        &mut self,
        system_required: bool,
    ) -> Result<(Option<Rc<str>>, Option<Rc<str>>)> {
        if self.consume_keyword("SYSTEM") {
            self.require_ws("Whitespace nach 'SYSTEM' erwartet")?;
            let system = self.parse_quoted("System-Literal")?;
            return Ok((None, Some(Rc::from(system))));
        }
        if self.consume_keyword("PUBLIC") {
            self.require_ws("Whitespace nach 'PUBLIC' erwartet")?;
            let public = self.parse_quoted("Public-Literal")?;
            let saved = self.pos;
            self.skip_ws();
            if matches!(self.peek(), Some('"' | '\'')) {
                let system = self.parse_quoted("System-Literal")?;
                return Ok((Some(Rc::from(public)), Some(Rc::from(system))));
            }
            self.pos = saved;
            if system_required {
                return self.fail("System-Literal nach dem Public-Literal erwartet");
            }
            return Ok((Some(Rc::from(public)), None));
        }
        self.fail("'SYSTEM' oder 'PUBLIC' erwartet")
    }

    /// [82] NotationDecl ::= '<!NOTATION' S Name S (ExternalID | PublicID) S? '>'
    fn parse_notation_decl(&mut self, dtd: &mut Dtd) -> Result<()> {
        self.consume_literal("<!NOTATION");
        self.require_ws("Whitespace nach '<!NOTATION' erwartet")?;
        let name = self.parse_name("Notation-Name")?;
        self.require_ws("Whitespace nach dem Notation-Namen erwartet")?;
        let (public_id, system_id) = self.parse_external_id(false)?;
        self.skip_ws();
        self.expect_char('>')?;
        dtd.add_notation(NotationDecl { name: Rc::from(name), public_id, system_id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subset(decls: &str) -> Dtd {
        parse_doctype(&format!("doc [ {decls} ]")).expect("DTD parse error")
    }

    // ==================== DOCTYPE Tests ====================

    #[test]
    fn nur_wurzelname() {
        let dtd = parse_doctype("html").unwrap();
        assert_eq!(dtd.root_name(), Some("html"));
        assert_eq!(dtd.element_count(), 0);
    }

    #[test]
    fn wurzelname_mit_system_id() {
        let dtd = parse_doctype(r#"doc SYSTEM "doc.dtd""#).unwrap();
        assert_eq!(dtd.root_name(), Some("doc"));
        assert_eq!(dtd.system_id(), Some("doc.dtd"));
        assert_eq!(dtd.public_id(), None);
    }

    #[test]
    fn wurzelname_mit_public_id() {
        let dtd = parse_doctype(
            r#"html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN"
               "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd""#,
        )
        .unwrap();
        assert_eq!(dtd.public_id(), Some("-//W3C//DTD XHTML 1.0 Strict//EN"));
        assert_eq!(
            dtd.system_id(),
            Some("http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd")
        );
    }

    #[test]
    fn externe_id_und_subset_kombiniert() {
        let dtd = parse_doctype(r#"doc SYSTEM "doc.dtd" [ <!ELEMENT doc EMPTY> ]"#).unwrap();
        assert_eq!(dtd.system_id(), Some("doc.dtd"));
        assert!(dtd.element("doc").is_some());
    }

    #[test]
    fn inhalt_nach_subset_ist_fehler() {
        let result = parse_doctype("doc [ ] quatsch");
        assert!(matches!(result, Err(Error::DtdSyntax { .. })), "{result:?}");
    }

    // ==================== elementdecl Tests ====================

    /// [46] contentspec: EMPTY und ANY
    #[test]
    fn element_empty_und_any() {
        let dtd = subset("<!ELEMENT br EMPTY> <!ELEMENT div ANY>");
        assert_eq!(dtd.element("br").unwrap().content, ContentSpec::Empty);
        assert_eq!(dtd.element("div").unwrap().content, ContentSpec::Any);
    }

    /// [50] seq: Folge von Namen
    #[test]
    fn element_sequenz() {
        let dtd = subset("<!ELEMENT buch (titel, autor, kapitel)>");
        let ContentSpec::Children(particle) = &dtd.element("buch").unwrap().content else {
            panic!("Children erwartet");
        };
        let ParticleKind::Seq(items) = &particle.kind else {
            panic!("Seq erwartet");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].kind, ParticleKind::Name(Rc::from("titel")));
        assert_eq!(particle.occurrence, Occurrence::Once);
    }

    /// [49] choice: Alternativen
    #[test]
    fn element_choice() {
        let dtd = subset("<!ELEMENT medium (buch | film | spiel)>");
        let ContentSpec::Children(particle) = &dtd.element("medium").unwrap().content else {
            panic!("Children erwartet");
        };
        let ParticleKind::Choice(items) = &particle.kind else {
            panic!("Choice erwartet");
        };
        assert_eq!(items.len(), 3);
    }

    /// [48] cp: Occurrence-Suffixe an Namen und Gruppen
    #[test]
    fn element_occurrence_suffixe() {
        let dtd = subset("<!ELEMENT doc (a?, b*, c+, d)>");
        let ContentSpec::Children(particle) = &dtd.element("doc").unwrap().content else {
            panic!("Children erwartet");
        };
        let ParticleKind::Seq(items) = &particle.kind else {
            panic!("Seq erwartet");
        };
        assert_eq!(items[0].occurrence, Occurrence::Optional);
        assert_eq!(items[1].occurrence, Occurrence::ZeroOrMore);
        assert_eq!(items[2].occurrence, Occurrence::OneOrMore);
        assert_eq!(items[3].occurrence, Occurrence::Once);
    }

    #[test]
    fn element_gruppen_suffix() {
        let dtd = subset("<!ELEMENT doc (a, b)*>");
        let ContentSpec::Children(particle) = &dtd.element("doc").unwrap().content else {
            panic!("Children erwartet");
        };
        assert_eq!(particle.occurrence, Occurrence::ZeroOrMore);
    }

    #[test]
    fn element_verschachtelte_gruppen() {
        let dtd = subset("<!ELEMENT doc ((a | b)+, c)>");
        let ContentSpec::Children(particle) = &dtd.element("doc").unwrap().content else {
            panic!("Children erwartet");
        };
        let ParticleKind::Seq(items) = &particle.kind else {
            panic!("Seq erwartet");
        };
        let ParticleKind::Choice(inner) = &items[0].kind else {
            panic!("innere Choice erwartet");
        };
        assert_eq!(inner.len(), 2);
        assert_eq!(items[0].occurrence, Occurrence::OneOrMore);
    }

    #[test]
    fn element_einzelgruppe_ist_seq() {
        let dtd = subset("<!ELEMENT doc (nur)>");
        let ContentSpec::Children(particle) = &dtd.element("doc").unwrap().content else {
            panic!("Children erwartet");
        };
        let ParticleKind::Seq(items) = &particle.kind else {
            panic!("Seq erwartet");
        };
        assert_eq!(items.len(), 1);
    }

    // ==================== Mixed Tests ====================

    /// [51] Mixed mit Element-Namen
    #[test]
    fn mixed_mit_namen() {
        let dtd = subset("<!ELEMENT p (#PCDATA | em | strong)*>");
        let ContentSpec::Mixed(names) = &dtd.element("p").unwrap().content else {
            panic!("Mixed erwartet");
        };
        let names: Vec<&str> = names.iter().map(|n| &**n).collect();
        assert_eq!(names, vec!["em", "strong"]);
    }

    /// [51] Mixed: reines #PCDATA, beide Schreibweisen
    #[test]
    fn mixed_nur_pcdata() {
        let dtd = subset("<!ELEMENT a (#PCDATA)> <!ELEMENT b (#PCDATA)*>");
        assert_eq!(dtd.element("a").unwrap().content, ContentSpec::Mixed(vec![]));
        assert_eq!(dtd.element("b").unwrap().content, ContentSpec::Mixed(vec![]));
    }

    /// [51] Mixed mit Namen verlangt ')*'
    #[test]
    fn mixed_ohne_stern_ist_fehler() {
        let result = parse_doctype("doc [ <!ELEMENT p (#PCDATA | em)> ]");
        assert!(matches!(result, Err(Error::DtdSyntax { .. })), "{result:?}");
    }

    // ==================== AttlistDecl Tests ====================

    /// [52] AttlistDecl mit CDATA und #REQUIRED
    #[test]
    fn attlist_cdata_required() {
        let dtd = subset(r#"<!ATTLIST img src CDATA #REQUIRED>"#);
        let def = dtd.attlist("img").unwrap().def("src").unwrap();
        assert_eq!(def.att_type, AttType::CData);
        assert_eq!(def.default, AttDefault::Required);
    }

    /// [56] TokenizedType: alle sieben Varianten
    #[test]
    fn attlist_tokenized_typen() {
        let dtd = subset(
            "<!ATTLIST e
                a1 ID #IMPLIED
                a2 IDREF #IMPLIED
                a3 IDREFS #IMPLIED
                a4 ENTITY #IMPLIED
                a5 ENTITIES #IMPLIED
                a6 NMTOKEN #IMPLIED
                a7 NMTOKENS #IMPLIED>",
        );
        let attlist = dtd.attlist("e").unwrap();
        assert_eq!(attlist.def("a1").unwrap().att_type, AttType::Id);
        assert_eq!(attlist.def("a2").unwrap().att_type, AttType::IdRef);
        assert_eq!(attlist.def("a3").unwrap().att_type, AttType::IdRefs);
        assert_eq!(attlist.def("a4").unwrap().att_type, AttType::Entity);
        assert_eq!(attlist.def("a5").unwrap().att_type, AttType::Entities);
        assert_eq!(attlist.def("a6").unwrap().att_type, AttType::NmToken);
        assert_eq!(attlist.def("a7").unwrap().att_type, AttType::NmTokens);
    }

    /// [59] Enumeration
    #[test]
    fn attlist_enumeration() {
        let dtd = subset(r#"<!ATTLIST task status (offen | erledigt) "offen">"#);
        let def = dtd.attlist("task").unwrap().def("status").unwrap();
        let AttType::Enumeration(tokens) = &def.att_type else {
            panic!("Enumeration erwartet");
        };
        let tokens: Vec<&str> = tokens.iter().map(|t| &**t).collect();
        assert_eq!(tokens, vec!["offen", "erledigt"]);
        assert_eq!(def.default, AttDefault::Default(Rc::from("offen")));
    }

    /// [58] NotationType
    #[test]
    fn attlist_notation_typ() {
        let dtd = subset("<!ATTLIST bild format NOTATION (gif | png) #IMPLIED>");
        let def = dtd.attlist("bild").unwrap().def("format").unwrap();
        let AttType::Notation(names) = &def.att_type else {
            panic!("Notation erwartet");
        };
        assert_eq!(names.len(), 2);
    }

    /// [60] DefaultDecl: #FIXED
    #[test]
    fn attlist_fixed_default() {
        let dtd = subset(r#"<!ATTLIST doc version CDATA #FIXED "1.0">"#);
        let def = dtd.attlist("doc").unwrap().def("version").unwrap();
        assert_eq!(def.default, AttDefault::Fixed(Rc::from("1.0")));
    }

    #[test]
    fn attlist_leer_ist_erlaubt() {
        // AttDef* erlaubt null Definitionen.
        let dtd = subset("<!ATTLIST e>");
        assert!(dtd.attlist("e").unwrap().defs.is_empty());
    }

    // ==================== EntityDecl Tests ====================

    /// [71] GEDecl: interne Entity
    #[test]
    fn interne_entity() {
        let dtd = subset(r#"<!ENTITY gruss "Hallo Welt">"#);
        let decl = dtd.entity("gruss").unwrap();
        assert!(decl.is_internal());
        assert_eq!(decl.replacement.as_deref(), Some("Hallo Welt"));
    }

    /// [66] CharRef im Entity-Wert wird sofort substituiert
    #[test]
    fn zeichen_referenzen_im_entity_wert() {
        let dtd = subset(r#"<!ENTITY e "A&#66;C &#x44;">"#);
        assert_eq!(dtd.entity("e").unwrap().replacement.as_deref(), Some("ABC D"));
    }

    /// XML 1.0 §4.5: General-Referenzen bleiben literal im Ersetzungstext
    #[test]
    fn general_referenz_bleibt_literal() {
        let dtd = subset(r#"<!ENTITY outer "vor &inner; nach">"#);
        assert_eq!(
            dtd.entity("outer").unwrap().replacement.as_deref(),
            Some("vor &inner; nach")
        );
    }

    #[test]
    fn selbstreferenz_wird_abgewiesen() {
        let result = parse_doctype(r#"doc [ <!ENTITY kreis "a &kreis; b"> ]"#);
        let Err(Error::DtdSyntax { message, .. }) = result else {
            panic!("Selbstreferenz muss abgewiesen werden: {result:?}");
        };
        assert!(message.contains("kreis"), "{message}");
        assert!(message.contains("selbst"), "{message}");
    }

    #[test]
    fn entity_wert_mit_markup() {
        let dtd = subset(r#"<!ENTITY block "<p>Text</p>">"#);
        assert_eq!(
            dtd.entity("block").unwrap().replacement.as_deref(),
            Some("<p>Text</p>")
        );
    }

    /// [73] EntityDef: externe Entity mit SYSTEM
    #[test]
    fn externe_entity_system() {
        let dtd = subset(r#"<!ENTITY kap1 SYSTEM "kapitel1.xml">"#);
        let decl = dtd.entity("kap1").unwrap();
        assert!(!decl.is_internal());
        assert_eq!(decl.system_id.as_deref(), Some("kapitel1.xml"));
    }

    /// [76] NDataDecl: unparsed Entity
    #[test]
    fn unparsed_entity_mit_ndata() {
        let dtd = subset(
            r#"<!NOTATION gif SYSTEM "viewer">
               <!ENTITY logo SYSTEM "logo.gif" NDATA gif>"#,
        );
        let decl = dtd.entity("logo").unwrap();
        assert!(decl.is_unparsed());
        assert_eq!(decl.notation.as_deref(), Some("gif"));
    }

    /// [72] PEDecl wird tolerant übersprungen
    #[test]
    fn parameter_entity_wird_uebersprungen() {
        let dtd = subset(r#"<!ENTITY % felder "a, b"> <!ELEMENT doc EMPTY>"#);
        assert_eq!(dtd.entity_count(), 0);
        assert!(dtd.element("doc").is_some());
    }

    /// [69] PEReference als DeclSep wird toleriert
    #[test]
    fn pe_referenz_zwischen_deklarationen() {
        let dtd = subset("<!ELEMENT a EMPTY> %module; <!ELEMENT b EMPTY>");
        assert!(dtd.element("a").is_some());
        assert!(dtd.element("b").is_some());
    }

    // ==================== NotationDecl Tests ====================

    /// [82] NotationDecl mit SYSTEM
    #[test]
    fn notation_system() {
        let dtd = subset(r#"<!NOTATION png SYSTEM "png-viewer">"#);
        let decl = dtd.notation("png").unwrap();
        assert_eq!(decl.system_id.as_deref(), Some("png-viewer"));
    }

    /// [83] PublicID: PUBLIC ohne System-Literal nur in NOTATION
    #[test]
    fn notation_public_ohne_system() {
        let dtd = subset(r#"<!NOTATION tex PUBLIC "+//ISBN 0-201-13448-9::Knuth//NOTATION TeX">"#);
        let decl = dtd.notation("tex").unwrap();
        assert!(decl.public_id.is_some());
        assert!(decl.system_id.is_none());
    }

    // ==================== Kommentare und PIs ====================

    #[test]
    fn kommentare_und_pis_werden_uebersprungen() {
        let dtd = subset(
            "<!-- Deklarationen --> <!ELEMENT a EMPTY> <?verarbeitung anweisung?> \
             <!ELEMENT b ANY>",
        );
        assert!(dtd.element("a").is_some());
        assert!(dtd.element("b").is_some());
    }

    #[test]
    fn kommentar_mit_spitzklammern() {
        let dtd = subset("<!-- <!ELEMENT fake EMPTY> --> <!ELEMENT echt EMPTY>");
        assert!(dtd.element("fake").is_none());
        assert!(dtd.element("echt").is_some());
    }

    // ==================== Fehlerfälle ====================

    #[test]
    fn unbekannte_deklaration_ist_fehler() {
        let result = parse_doctype("doc [ <!UNSINN foo> ]");
        assert!(matches!(result, Err(Error::DtdSyntax { .. })), "{result:?}");
    }

    #[test]
    fn fehlendes_schliessendes_tag() {
        let result = parse_doctype("doc [ <!ELEMENT a EMPTY ]");
        assert!(matches!(result, Err(Error::DtdSyntax { .. })), "{result:?}");
    }

    #[test]
    fn ungeschlossene_gruppe() {
        let result = parse_doctype("doc [ <!ELEMENT a (b, c> ]");
        assert!(matches!(result, Err(Error::DtdSyntax { .. })), "{result:?}");
    }

    #[test]
    fn unbeendeter_kommentar() {
        let result = parse_doctype("doc [ <!-- offen ]");
        assert!(matches!(result, Err(Error::DtdSyntax { .. })), "{result:?}");
    }

    #[test]
    fn ungueltige_zeichen_referenz() {
        let result = parse_doctype(r#"doc [ <!ENTITY e "&#xD800;"> ]"#);
        assert!(matches!(result, Err(Error::DtdSyntax { .. })), "{result:?}");
    }

    #[test]
    fn fehler_traegt_offset() {
        let Err(Error::DtdSyntax { offset, .. }) = parse_doctype("doc [ <!ELEMENT > ]") else {
            panic!("DtdSyntax erwartet");
        };
        assert!(offset > 0);
    }

    #[test]
    fn entity_wert_mit_beiden_quote_arten() {
        let dtd = subset(r#"<!ENTITY a 'einfach "doppelt"'> <!ENTITY b "doppelt 'einfach'">"#);
        assert_eq!(
            dtd.entity("a").unwrap().replacement.as_deref(),
            Some(r#"einfach "doppelt""#)
        );
        assert_eq!(
            dtd.entity("b").unwrap().replacement.as_deref(),
            Some("doppelt 'einfach'")
        );
    }
}
