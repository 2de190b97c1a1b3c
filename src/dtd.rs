//! DTD-Objektmodell: die vier Deklarations-Sammlungen des Internal Subset.
//!
//! Reines Datenmodell ohne Parsing-Logik (das übernimmt [`parser`]):
//! Element-Deklarationen mit ihrem Content-Modell, Attributlisten,
//! General Entities und Notationen, jeweils Name → Deklaration.
//!
//! Re-Deklarationen: die erste Deklaration gewinnt, für alle vier
//! Sammlungen einheitlich. XML 1.0 §4.2 schreibt das für Entities vor;
//! für Attribut-Definitionen gilt es pro Attributname über alle
//! `ATTLIST`-Deklarationen eines Elements hinweg (XML 1.0 §3.3).
//!
//! Das Content-Modell liegt hier deklarativ vor ([`ContentSpec`],
//! [`ContentParticle`]); die Übersetzung in Automaten macht das
//! automata-Modul.

pub mod parser;

use std::rc::Rc;

use crate::FastIndexMap;

// ============================================================================
// Content-Modelle
// ============================================================================

/// Wiederholungs-Suffix eines Partikels: `?`, `*`, `+` oder keins
/// (XML 1.0 §3.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occurrence {
    /// Genau einmal (kein Suffix).
    #[default]
    Once,
    /// `?`: null- oder einmal.
    Optional,
    /// `*`: beliebig oft, auch gar nicht.
    ZeroOrMore,
    /// `+`: mindestens einmal.
    OneOrMore,
}

/// Art eines Content-Partikels (XML 1.0 §3.2.1, Produktion `cp`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticleKind {
    /// Ein einzelner Element-Name.
    Name(Rc<str>),
    /// `(cp | cp | ...)`: Alternativen.
    Choice(Vec<ContentParticle>),
    /// `(cp , cp , ...)`: Folge.
    Seq(Vec<ContentParticle>),
}

/// Ein Partikel des Element-Content-Modells: Inhalt plus Wiederholung.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentParticle {
    /// Name, Choice-Gruppe oder Seq-Gruppe.
    pub kind: ParticleKind,
    /// Wiederholungs-Suffix.
    pub occurrence: Occurrence,
}

impl ContentParticle {
    /// Erstellt einen Partikel.
    pub fn new(kind: ParticleKind, occurrence: Occurrence) -> Self {
        Self { kind, occurrence }
    }
}

/// Content-Spezifikation einer Element-Deklaration (XML 1.0 §3.2,
/// Produktion `contentspec`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSpec {
    /// `EMPTY`: weder Kinder noch Zeichendaten.
    Empty,
    /// `ANY`: beliebige deklarierte Elemente und Zeichendaten.
    Any,
    /// `(#PCDATA | n1 | ...)*` oder `(#PCDATA)`: Mixed Content
    /// (XML 1.0 §3.2.2). Die Liste enthält die erlaubten Element-Namen.
    Mixed(Vec<Rc<str>>),
    /// Element-Content mit Partikel-Grammatik (XML 1.0 §3.2.1).
    Children(ContentParticle),
}

/// Eine Element-Deklaration: `<!ELEMENT name contentspec>` (XML 1.0 §3.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDecl {
    /// Der deklarierte Element-Name.
    pub name: Rc<str>,
    /// Das Content-Modell.
    pub content: ContentSpec,
}

// ============================================================================
// Attributlisten
// ============================================================================

/// Attributtyp (XML 1.0 §3.3.1, Produktion `AttType`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttType {
    /// `CDATA`: beliebige Zeichendaten.
    CData,
    /// `ID`.
    Id,
    /// `IDREF`.
    IdRef,
    /// `IDREFS`.
    IdRefs,
    /// `ENTITY`.
    Entity,
    /// `ENTITIES`.
    Entities,
    /// `NMTOKEN`.
    NmToken,
    /// `NMTOKENS`.
    NmTokens,
    /// `NOTATION (n1 | n2 | ...)`.
    Notation(Vec<Rc<str>>),
    /// `(tok1 | tok2 | ...)`: Aufzählung von Nmtokens.
    Enumeration(Vec<Rc<str>>),
}

/// Default-Deklaration eines Attributs (XML 1.0 §3.3.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttDefault {
    /// `#REQUIRED`: muss im Dokument angegeben werden.
    Required,
    /// `#IMPLIED`: optional, ohne Default.
    Implied,
    /// `#FIXED "wert"`: muss, falls angegeben, diesen Wert haben.
    Fixed(Rc<str>),
    /// `"wert"`: Default-Wert.
    Default(Rc<str>),
}

/// Eine einzelne Attribut-Definition innerhalb einer `ATTLIST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttDef {
    /// Der Attribut-Name.
    pub name: Rc<str>,
    /// Der deklarierte Typ.
    pub att_type: AttType,
    /// Die Default-Deklaration.
    pub default: AttDefault,
}

/// Die zusammengeführten Attribut-Definitionen eines Element-Typs
/// (XML 1.0 §3.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttlistDecl {
    /// Der Element-Name, für den die Attribute gelten.
    pub element: Rc<str>,
    /// Definitionen in Deklarationsreihenfolge, pro Name dedupliziert.
    pub defs: Vec<AttDef>,
}

impl AttlistDecl {
    /// Sucht die Definition eines Attributs.
    pub fn def(&self, name: &str) -> Option<&AttDef> {
        self.defs.iter().find(|d| &*d.name == name)
    }

    /// Alle als `#REQUIRED` deklarierten Attribut-Namen.
    pub fn required(&self) -> impl Iterator<Item = &Rc<str>> {
        self.defs
            .iter()
            .filter(|d| d.default == AttDefault::Required)
            .map(|d| &d.name)
    }
}

// ============================================================================
// Entities und Notationen
// ============================================================================

/// Eine General-Entity-Deklaration: `<!ENTITY name ...>` (XML 1.0 §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecl {
    /// Der Entity-Name.
    pub name: Rc<str>,
    /// Public Identifier (nur externe Entities).
    pub public_id: Option<Rc<str>>,
    /// System Identifier (nur externe Entities).
    pub system_id: Option<Rc<str>>,
    /// Notation-Name aus `NDATA` (nur unparsed Entities, XML 1.0 §4.2.2).
    pub notation: Option<Rc<str>>,
    /// Ersetzungstext interner Entities. Zeichen-Referenzen sind bereits
    /// substituiert, General-Entity-Referenzen stehen literal darin
    /// (XML 1.0 §4.5).
    pub replacement: Option<Rc<str>>,
}

impl EntityDecl {
    /// Ob dies eine interne Entity mit Ersetzungstext ist.
    pub fn is_internal(&self) -> bool {
        self.replacement.is_some()
    }

    /// Ob dies eine unparsed Entity ist (`NDATA`-Deklaration).
    pub fn is_unparsed(&self) -> bool {
        self.notation.is_some()
    }
}

/// Eine Notation-Deklaration: `<!NOTATION name ...>` (XML 1.0 §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotationDecl {
    /// Der Notation-Name.
    pub name: Rc<str>,
    /// Public Identifier.
    pub public_id: Option<Rc<str>>,
    /// System Identifier.
    pub system_id: Option<Rc<str>>,
}

// ============================================================================
// Dtd: die Deklarations-Sammlung
// ============================================================================

/// Die geparsten Deklarationen einer Document Type Definition.
///
/// Einfüge-Reihenfolge bleibt erhalten (deterministische Iteration für
/// Kompilierung und Diagnosen). Nach dem Parsen unveränderlich; Leser
/// teilen sich die DTD per `Rc`.
#[derive(Debug, Clone, Default)]
pub struct Dtd {
    root_name: Option<Rc<str>>,
    public_id: Option<Rc<str>>,
    system_id: Option<Rc<str>>,
    elements: FastIndexMap<Rc<str>, ElementDecl>,
    attlists: FastIndexMap<Rc<str>, AttlistDecl>,
    entities: FastIndexMap<Rc<str>, EntityDecl>,
    notations: FastIndexMap<Rc<str>, NotationDecl>,
}

impl Dtd {
    /// Erstellt eine leere DTD.
    pub fn new() -> Self {
        Self::default()
    }

    /// Der im DOCTYPE deklarierte Wurzelelement-Name.
    pub fn root_name(&self) -> Option<&str> {
        self.root_name.as_deref()
    }

    /// Public Identifier des externen Subsets, falls deklariert.
    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    /// System Identifier des externen Subsets, falls deklariert.
    /// Das externe Subset selbst wird nicht geladen.
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    pub(crate) fn set_root_name(&mut self, name: Rc<str>) {
        self.root_name = Some(name);
    }

    pub(crate) fn set_external_id(
        &mut self,
        public_id: Option<Rc<str>>,
        system_id: Option<Rc<str>>,
    ) {
        self.public_id = public_id;
        self.system_id = system_id;
    }

    /// Fügt eine Element-Deklaration hinzu. Die erste Deklaration eines
    /// Namens gewinnt; spätere werden ignoriert.
    ///
    /// Gibt `false` zurück, wenn der Name bereits deklariert war.
    pub fn add_element(&mut self, decl: ElementDecl) -> bool {
        if self.elements.contains_key(&decl.name) {
            log::debug!("Element '{}' erneut deklariert, ignoriert", decl.name);
            return false;
        }
        self.elements.insert(Rc::clone(&decl.name), decl);
        true
    }

    /// Führt eine `ATTLIST`-Deklaration mit eventuell vorhandenen
    /// Definitionen für dasselbe Element zusammen. Pro Attributname ist
    /// die erste Definition bindend (XML 1.0 §3.3).
    pub fn add_attlist(&mut self, element: Rc<str>, defs: Vec<AttDef>) {
        let entry = self
            .attlists
            .entry(Rc::clone(&element))
            .or_insert_with(|| AttlistDecl { element, defs: Vec::new() });
        for def in defs {
            if entry.def(&def.name).is_some() {
                log::debug!(
                    "Attribut '{}' an '{}' erneut definiert, ignoriert",
                    def.name,
                    entry.element
                );
                continue;
            }
            entry.defs.push(def);
        }
    }

    /// Fügt eine Entity-Deklaration hinzu. Die erste Deklaration eines
    /// Namens ist bindend (XML 1.0 §4.2).
    pub fn add_entity(&mut self, decl: EntityDecl) -> bool {
        if self.entities.contains_key(&decl.name) {
            log::debug!("Entity '{}' erneut deklariert, ignoriert", decl.name);
            return false;
        }
        self.entities.insert(Rc::clone(&decl.name), decl);
        true
    }

    /// Fügt eine Notation-Deklaration hinzu, erste gewinnt.
    pub fn add_notation(&mut self, decl: NotationDecl) -> bool {
        if self.notations.contains_key(&decl.name) {
            log::debug!("Notation '{}' erneut deklariert, ignoriert", decl.name);
            return false;
        }
        self.notations.insert(Rc::clone(&decl.name), decl);
        true
    }

    /// Sucht eine Element-Deklaration.
    pub fn element(&self, name: &str) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    /// Sucht die Attributliste eines Elements.
    pub fn attlist(&self, element: &str) -> Option<&AttlistDecl> {
        self.attlists.get(element)
    }

    /// Sucht eine Entity-Deklaration.
    pub fn entity(&self, name: &str) -> Option<&EntityDecl> {
        self.entities.get(name)
    }

    /// Sucht eine Notation-Deklaration.
    pub fn notation(&self, name: &str) -> Option<&NotationDecl> {
        self.notations.get(name)
    }

    /// Alle Element-Deklarationen in Deklarationsreihenfolge.
    pub fn elements(&self) -> impl Iterator<Item = &ElementDecl> {
        self.elements.values()
    }

    /// Alle Entity-Deklarationen in Deklarationsreihenfolge.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDecl> {
        self.entities.values()
    }

    /// Anzahl der Element-Deklarationen.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Anzahl der Entity-Deklarationen.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}
