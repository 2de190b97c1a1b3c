//! Inhaltsmodell-Automaten für DTD-Element-Deklarationen.
//!
//! Jede Element-Deklaration wird einmal in einen deterministischen
//! Automaten übersetzt und danach Ereignis für Ereignis weitergeschaltet:
//! [`ContentAutomata::try_start_element`] konsumiert ein Start-Tag und
//! liefert den Folgezustand, [`ContentAutomata::try_end_element`] prüft, ob
//! das Inhaltsmodell an dieser Stelle abgeschlossen werden darf.
//! Fehlschläge werden nie geworfen, sondern als expliziter
//! [`Invalid`](AutomatonKind::Invalid)-Zustand durch die Algebra gereicht;
//! der aufrufende Validierer entscheidet, wie er den Verstoß meldet.
//!
//! Zustände sind hash-consed: strukturell gleiche Automaten existieren pro
//! Pool genau einmal, Folgezustände werden über
//! [`ContentAutomata::make_choice`] und [`ContentAutomata::make_sequence`]
//! kanonisiert. Ohne dieses Teilen würde die Zustandskonstruktion für
//! Modelle wie `(a, b, c)*` kombinatorisch explodieren.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::FastHashMap;
use crate::dtd::{ContentParticle, ContentSpec, Dtd, Occurrence, ParticleKind};
use crate::name_table::{NameId, NameTable};

// ============================================================================
// Ids und Knoten
// ============================================================================

/// Feste Indizes der drei Singleton-Zustände, angelegt in
/// [`ContentAutomata::new`].
const EMPTY_INDEX: usize = 0;
const ANY_INDEX: usize = 1;
const INVALID_INDEX: usize = 2;

/// Prozessweiter Zähler für Pool-Kennungen.
static NEXT_ROOT: AtomicU32 = AtomicU32::new(1);

/// Handle auf einen Automaten-Zustand innerhalb eines [`ContentAutomata`]-Pools.
///
/// Ids tragen die Kennung ihres Pools; jede Operation prüft sie, denn eine
/// Id aus einem fremden Pool würde sonst stillschweigend falsche Zustände
/// adressieren.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AutomatonId {
    root: u32,
    index: usize,
}

impl fmt::Debug for AutomatonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AutomatonId({})", self.index)
    }
}

/// Die sieben Zustandsarten eines Inhaltsmodell-Automaten.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AutomatonKind {
    /// Genau ein Start-Tag mit diesem Namen.
    Element(NameId),
    /// Einer der beiden Zweige.
    Choice(AutomatonId, AutomatonId),
    /// Erst links vollständig, dann rechts.
    Sequence(AutomatonId, AutomatonId),
    /// Eine oder mehr Wiederholungen des inneren Automaten.
    OneOrMore(AutomatonId),
    /// Das leere Wort; mit null Eingabe erfüllt.
    Empty,
    /// Wildcard; absorbiert jede Eingabe und ist immer erfüllt.
    Any,
    /// Ablehnungszustand; absorbiert jede Eingabe, terminal.
    Invalid,
}

// ============================================================================
// Pool
// ============================================================================

/// Pool aller Automaten-Zustände einer DTD samt Kanonisierungscache.
///
/// Knoten sind nach Konstruktion unveränderlich und leben bis der Pool
/// verworfen wird; der Cache ist append-only. Element-Namen werden im
/// pooleigenen [`NameTable`] interniert, Namensvergleiche in
/// [`try_start_element`](Self::try_start_element) sind damit reine
/// Id-Vergleiche.
pub struct ContentAutomata {
    root: u32,
    names: NameTable,
    nodes: Vec<AutomatonKind>,
    interned: FastHashMap<AutomatonKind, usize>,
    nullable_cache: Vec<Option<bool>>,
    starts: FastHashMap<NameId, AutomatonId>,
}

impl ContentAutomata {
    /// Erstellt einen leeren Pool mit den drei Singleton-Zuständen.
    pub fn new() -> Self {
        let mut automata = ContentAutomata {
            root: NEXT_ROOT.fetch_add(1, Ordering::Relaxed),
            names: NameTable::new(),
            nodes: Vec::new(),
            interned: FastHashMap::default(),
            nullable_cache: Vec::new(),
            starts: FastHashMap::default(),
        };
        let empty = automata.intern(AutomatonKind::Empty);
        let any = automata.intern(AutomatonKind::Any);
        let invalid = automata.intern(AutomatonKind::Invalid);
        debug_assert_eq!(empty.index, EMPTY_INDEX);
        debug_assert_eq!(any.index, ANY_INDEX);
        debug_assert_eq!(invalid.index, INVALID_INDEX);
        automata
    }

    /// Kompiliert alle Element-Deklarationen einer DTD in einen Pool.
    ///
    /// Der Startzustand pro Element ist danach über [`start`](Self::start)
    /// abrufbar.
    pub fn compile(dtd: &Dtd) -> Self {
        let mut automata = ContentAutomata::new();
        for decl in dtd.elements() {
            let name = automata.names.intern(&decl.name);
            let start = automata.compile_spec(&decl.content);
            automata.starts.insert(name, start);
        }
        log::debug!(
            "{} Inhaltsmodelle kompiliert, {} Automaten-Knoten",
            dtd.element_count(),
            automata.nodes.len()
        );
        automata
    }

    // ========================================================================
    // Zugriff
    // ========================================================================

    /// Der `Empty`-Singleton.
    #[inline]
    pub fn empty(&self) -> AutomatonId {
        AutomatonId { root: self.root, index: EMPTY_INDEX }
    }

    /// Der `Any`-Singleton.
    #[inline]
    pub fn any(&self) -> AutomatonId {
        AutomatonId { root: self.root, index: ANY_INDEX }
    }

    /// Der `Invalid`-Singleton.
    #[inline]
    pub fn invalid(&self) -> AutomatonId {
        AutomatonId { root: self.root, index: INVALID_INDEX }
    }

    /// Ob `id` der Ablehnungszustand ist.
    #[inline]
    pub fn is_invalid(&self, id: AutomatonId) -> bool {
        self.check_root(id);
        id.index == INVALID_INDEX
    }

    /// Die Zustandsart hinter einer Id.
    pub fn kind(&self, id: AutomatonId) -> &AutomatonKind {
        self.check_root(id);
        &self.nodes[id.index]
    }

    /// Interniert einen Element-Namen im pooleigenen Namensraum.
    pub fn intern_name(&mut self, name: &str) -> NameId {
        self.names.intern(name)
    }

    /// Löst eine [`NameId`] zum Namen auf.
    pub fn name(&self, id: NameId) -> &str {
        self.names.resolve(id)
    }

    /// Startzustand des Inhaltsmodells eines deklarierten Elements.
    pub fn start(&self, element: NameId) -> Option<AutomatonId> {
        self.starts.get(&element).copied()
    }

    /// Anzahl der Knoten im Pool (inklusive der drei Singletons).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ========================================================================
    // Konstruktion
    // ========================================================================

    /// Zustand, der genau ein Start-Tag namens `name` akzeptiert.
    pub fn element(&mut self, name: NameId) -> AutomatonId {
        self.intern(AutomatonKind::Element(name))
    }

    /// Zustand für eine oder mehr Wiederholungen von `inner`.
    pub fn one_or_more(&mut self, inner: AutomatonId) -> AutomatonId {
        self.check_root(inner);
        self.intern(AutomatonKind::OneOrMore(inner))
    }

    /// Kanonisierende Alternative zweier Zustände.
    ///
    /// Vereinfachungen laufen vor dem Cache, damit äquivalente Grammatiken
    /// auf denselben Repräsentanten fallen: ein `Invalid`-Zweig trägt nie
    /// bei, `Empty|Empty` und `Any|Any` kollabieren auf den Singleton, und
    /// ein `Empty`-Zweig wandert nach links (reine Normalisierung für
    /// bessere Cache-Treffer, keine semantische Regel).
    pub fn make_choice(&mut self, a: AutomatonId, b: AutomatonId) -> AutomatonId {
        self.check_root(a);
        self.check_root(b);
        if self.is_invalid(a) {
            return b;
        }
        if self.is_invalid(b) {
            return a;
        }
        let empty = self.empty();
        if (a == empty && b == empty) || (a == self.any() && b == self.any()) {
            return a;
        }
        if b == empty {
            return self.intern(AutomatonKind::Choice(b, a));
        }
        self.intern(AutomatonKind::Choice(a, b))
    }

    /// Kanonisierende Verkettung zweier Zustände.
    ///
    /// `Invalid` propagiert, `Empty` ist neutrales Element.
    pub fn make_sequence(&mut self, a: AutomatonId, b: AutomatonId) -> AutomatonId {
        self.check_root(a);
        self.check_root(b);
        if self.is_invalid(a) || self.is_invalid(b) {
            return self.invalid();
        }
        if a == self.empty() {
            return b;
        }
        if b == self.empty() {
            return a;
        }
        self.intern(AutomatonKind::Sequence(a, b))
    }

    // ========================================================================
    // Übergänge
    // ========================================================================

    /// Konsumiert ein Start-Tag und liefert den Folgezustand.
    ///
    /// Liefert den [`Invalid`](AutomatonKind::Invalid)-Zustand, wenn das Tag
    /// an dieser Stelle nicht zulässig ist; es wird nie ein Fehler geworfen.
    pub fn try_start_element(&mut self, state: AutomatonId, name: NameId) -> AutomatonId {
        self.check_root(state);
        match self.nodes[state.index].clone() {
            AutomatonKind::Element(expected) => {
                if expected == name {
                    self.empty()
                } else {
                    self.invalid()
                }
            }
            AutomatonKind::Choice(left, right) => {
                let after_left = self.try_start_element(left, name);
                let after_right = self.try_start_element(right, name);
                self.make_choice(after_left, after_right)
            }
            AutomatonKind::Sequence(left, right) => {
                let after_left = self.try_start_element(left, name);
                if self.is_invalid(after_left) {
                    if self.nullable(left) {
                        self.try_start_element(right, name)
                    } else {
                        self.invalid()
                    }
                } else {
                    let when_left_consumed = self.make_sequence(after_left, right);
                    if self.nullable(left) {
                        // Mehrdeutig: entweder hat links das Tag konsumiert,
                        // oder links wurde übersprungen und rechts hat es.
                        let after_right = self.try_start_element(right, name);
                        self.make_choice(after_right, when_left_consumed)
                    } else {
                        when_left_consumed
                    }
                }
            }
            AutomatonKind::OneOrMore(inner) => {
                let after = self.try_start_element(inner, name);
                if self.is_invalid(after) {
                    self.invalid()
                } else {
                    // Nach einer Wiederholung: aufhören oder erneut schleifen.
                    let empty = self.empty();
                    let looped = self.make_choice(empty, state);
                    self.make_sequence(after, looped)
                }
            }
            AutomatonKind::Empty => self.invalid(),
            AutomatonKind::Any | AutomatonKind::Invalid => state,
        }
    }

    /// Prüft, ob das umschließende Element hier schließen darf.
    ///
    /// Liefert den Folgezustand nach dem End-Tag oder den
    /// [`Invalid`](AutomatonKind::Invalid)-Zustand, wenn das Inhaltsmodell
    /// noch nicht erfüllt ist.
    pub fn try_end_element(&mut self, state: AutomatonId) -> AutomatonId {
        self.check_root(state);
        match self.nodes[state.index].clone() {
            AutomatonKind::Element(_) => self.invalid(),
            AutomatonKind::Choice(left, right) => {
                let after_left = self.try_end_element(left);
                let after_right = self.try_end_element(right);
                self.make_choice(after_left, after_right)
            }
            AutomatonKind::Sequence(left, right) => {
                // Auch der rechte Rest muss abschließbar sein; (a, b?, c)
                // darf nach `a` nicht enden.
                if self.nullable(left) {
                    self.try_end_element(right)
                } else {
                    self.invalid()
                }
            }
            AutomatonKind::OneOrMore(inner) => {
                if self.nullable(state) {
                    self.try_end_element(inner)
                } else {
                    self.invalid()
                }
            }
            AutomatonKind::Empty | AutomatonKind::Any | AutomatonKind::Invalid => state,
        }
    }

    /// Ob der Zustand mit null weiterer Eingabe erfüllt ist.
    ///
    /// Strukturelle Eigenschaft, beim ersten Zugriff berechnet und pro
    /// Knoten gemerkt. `OneOrMore` gilt als erfüllbar, wenn sein innerer
    /// Automat es ist; `(a?)+` akzeptiert damit auch null Vorkommen.
    pub fn nullable(&mut self, id: AutomatonId) -> bool {
        self.check_root(id);
        if let Some(cached) = self.nullable_cache[id.index] {
            return cached;
        }
        let value = match self.nodes[id.index].clone() {
            AutomatonKind::Empty | AutomatonKind::Any => true,
            AutomatonKind::Element(_) | AutomatonKind::Invalid => false,
            AutomatonKind::Choice(left, right) => self.nullable(left) || self.nullable(right),
            AutomatonKind::Sequence(left, right) => self.nullable(left) && self.nullable(right),
            AutomatonKind::OneOrMore(inner) => self.nullable(inner),
        };
        self.nullable_cache[id.index] = Some(value);
        value
    }

    // ========================================================================
    // Kompilierung aus Deklarationen
    // ========================================================================

    fn compile_spec(&mut self, spec: &ContentSpec) -> AutomatonId {
        match spec {
            ContentSpec::Empty => self.empty(),
            ContentSpec::Any => self.any(),
            ContentSpec::Mixed(names) => match names.split_first() {
                // Reines (#PCDATA): keine Kind-Elemente zulässig.
                None => self.empty(),
                Some((first, rest)) => {
                    let id = self.names.intern(first);
                    let mut alternatives = self.element(id);
                    for name in rest {
                        let id = self.names.intern(name);
                        let elem = self.element(id);
                        alternatives = self.make_choice(alternatives, elem);
                    }
                    let repeated = self.one_or_more(alternatives);
                    let empty = self.empty();
                    self.make_choice(empty, repeated)
                }
            },
            ContentSpec::Children(particle) => self.compile_particle(particle),
        }
    }

    fn compile_particle(&mut self, particle: &ContentParticle) -> AutomatonId {
        let base = match &particle.kind {
            ParticleKind::Name(name) => {
                let id = self.names.intern(name);
                self.element(id)
            }
            ParticleKind::Choice(items) => self.fold_choice(items),
            ParticleKind::Seq(items) => self.fold_sequence(items),
        };
        match particle.occurrence {
            Occurrence::Once => base,
            Occurrence::Optional => {
                let empty = self.empty();
                self.make_choice(empty, base)
            }
            Occurrence::ZeroOrMore => {
                let repeated = self.one_or_more(base);
                let empty = self.empty();
                self.make_choice(empty, repeated)
            }
            Occurrence::OneOrMore => self.one_or_more(base),
        }
    }

    fn fold_choice(&mut self, items: &[ContentParticle]) -> AutomatonId {
        let Some((first, rest)) = items.split_first() else {
            return self.empty();
        };
        let mut result = self.compile_particle(first);
        for item in rest {
            let next = self.compile_particle(item);
            result = self.make_choice(result, next);
        }
        result
    }

    fn fold_sequence(&mut self, items: &[ContentParticle]) -> AutomatonId {
        let Some((first, rest)) = items.split_first() else {
            return self.empty();
        };
        let mut result = self.compile_particle(first);
        for item in rest {
            let next = self.compile_particle(item);
            result = self.make_sequence(result, next);
        }
        result
    }

    // ========================================================================
    // Intern
    // ========================================================================

    fn intern(&mut self, kind: AutomatonKind) -> AutomatonId {
        if let Some(&index) = self.interned.get(&kind) {
            return AutomatonId { root: self.root, index };
        }
        let index = self.nodes.len();
        self.nodes.push(kind.clone());
        self.nullable_cache.push(None);
        self.interned.insert(kind, index);
        AutomatonId { root: self.root, index }
    }

    /// Komposition über Pool-Grenzen ist ein Programmierfehler und bricht
    /// sofort ab, statt still falsche Zustände zu adressieren.
    #[inline]
    fn check_root(&self, id: AutomatonId) {
        assert!(
            id.root == self.root,
            "AutomatonId stammt aus einem fremden ContentAutomata-Pool"
        );
    }
}

impl Default for ContentAutomata {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContentAutomata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContentAutomata({} Knoten, {} Startzustände)",
            self.nodes.len(),
            self.starts.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtd::parser::parse_doctype;

    // ==================== Kanonisierung Tests ====================

    #[test]
    fn make_choice_liefert_identische_knoten() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let b = pool.intern_name("b");
        let ea = pool.element(a);
        let eb = pool.element(b);
        let first = pool.make_choice(ea, eb);
        let second = pool.make_choice(ea, eb);
        assert_eq!(first, second);
    }

    #[test]
    fn make_sequence_liefert_identische_knoten() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let b = pool.intern_name("b");
        let ea = pool.element(a);
        let eb = pool.element(b);
        let first = pool.make_sequence(ea, eb);
        let second = pool.make_sequence(ea, eb);
        assert_eq!(first, second);
    }

    #[test]
    fn gleiche_element_namen_teilen_knoten() {
        let mut pool = ContentAutomata::new();
        let a1 = pool.intern_name("a");
        let a2 = pool.intern_name("a");
        assert_eq!(pool.element(a1), pool.element(a2));
    }

    #[test]
    fn empty_zweig_wird_normalisiert() {
        // Choice(X, Empty) und Choice(Empty, X) fallen auf denselben Knoten.
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let ea = pool.element(a);
        let empty = pool.empty();
        let links = pool.make_choice(empty, ea);
        let rechts = pool.make_choice(ea, empty);
        assert_eq!(links, rechts);
    }

    // ==================== Identitätsgesetze Tests ====================

    #[test]
    fn choice_mit_invalid_ist_identitaet() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let x = pool.element(a);
        let invalid = pool.invalid();
        assert_eq!(pool.make_choice(invalid, x), x);
        assert_eq!(pool.make_choice(x, invalid), x);
    }

    #[test]
    fn sequence_mit_empty_ist_identitaet() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let x = pool.element(a);
        let empty = pool.empty();
        assert_eq!(pool.make_sequence(empty, x), x);
        assert_eq!(pool.make_sequence(x, empty), x);
    }

    #[test]
    fn sequence_mit_invalid_ist_invalid() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let x = pool.element(a);
        let invalid = pool.invalid();
        assert_eq!(pool.make_sequence(invalid, x), invalid);
        assert_eq!(pool.make_sequence(x, invalid), invalid);
    }

    #[test]
    fn choice_singletons_sind_idempotent() {
        let mut pool = ContentAutomata::new();
        let empty = pool.empty();
        let any = pool.any();
        assert_eq!(pool.make_choice(empty, empty), empty);
        assert_eq!(pool.make_choice(any, any), any);
    }

    // ==================== Nullbarkeit Tests ====================

    #[test]
    fn element_ist_nicht_nullbar() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let ea = pool.element(a);
        assert!(!pool.nullable(ea));
    }

    #[test]
    fn singletons_nullbarkeit() {
        let mut pool = ContentAutomata::new();
        let empty = pool.empty();
        let any = pool.any();
        let invalid = pool.invalid();
        assert!(pool.nullable(empty));
        assert!(pool.nullable(any));
        assert!(!pool.nullable(invalid));
    }

    #[test]
    fn choice_nullbar_wenn_ein_zweig_nullbar() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let b = pool.intern_name("b");
        let ea = pool.element(a);
        let eb = pool.element(b);
        let beide_pflicht = pool.make_choice(ea, eb);
        assert!(!pool.nullable(beide_pflicht));
        let empty = pool.empty();
        let optional = pool.make_choice(empty, ea);
        assert!(pool.nullable(optional));
    }

    #[test]
    fn sequence_nullbar_wenn_beide_nullbar() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let b = pool.intern_name("b");
        let ea = pool.element(a);
        let eb = pool.element(b);
        let empty = pool.empty();
        let opt_a = pool.make_choice(empty, ea);
        let opt_b = pool.make_choice(empty, eb);
        let beide_optional = pool.make_sequence(opt_a, opt_b);
        assert!(pool.nullable(beide_optional));
        let gemischt = pool.make_sequence(opt_a, eb);
        assert!(!pool.nullable(gemischt));
    }

    #[test]
    fn one_or_more_nullbar_wenn_inneres_nullbar() {
        // (a?)+ akzeptiert auch null Vorkommen.
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let ea = pool.element(a);
        let plus = pool.one_or_more(ea);
        assert!(!pool.nullable(plus));
        let empty = pool.empty();
        let opt = pool.make_choice(empty, ea);
        let opt_plus = pool.one_or_more(opt);
        assert!(pool.nullable(opt_plus));
        let ende = pool.try_end_element(opt_plus);
        assert!(!pool.is_invalid(ende));
    }

    // ==================== Übergänge Tests ====================

    /// Inhaltsmodell `(a, b?)`: b darf kommen, muss aber nicht.
    #[test]
    fn sequenz_mit_optionalem_zweiten_element() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let b = pool.intern_name("b");
        let c = pool.intern_name("c");
        let ea = pool.element(a);
        let eb = pool.element(b);
        let empty = pool.empty();
        let opt_b = pool.make_choice(empty, eb);
        let start = pool.make_sequence(ea, opt_b);

        let nach_a = pool.try_start_element(start, a);
        assert!(!pool.is_invalid(nach_a));

        let nach_ab = pool.try_start_element(nach_a, b);
        assert!(!pool.is_invalid(nach_ab));
        assert!(pool.nullable(nach_ab));

        let ende_ohne_b = pool.try_end_element(nach_a);
        assert!(!pool.is_invalid(ende_ohne_b));

        let falsch = pool.try_start_element(start, c);
        assert!(pool.is_invalid(falsch));
    }

    /// Inhaltsmodell `(a)+`: schleift auf sich selbst zurück.
    #[test]
    fn one_or_more_schleife() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let ea = pool.element(a);
        let start = pool.one_or_more(ea);

        let sofort_ende = pool.try_end_element(start);
        assert!(pool.is_invalid(sofort_ende));

        let s1 = pool.try_start_element(start, a);
        assert!(!pool.is_invalid(s1));
        let s2 = pool.try_start_element(s1, a);
        // Kanonisierung: der Schleifenzustand ist physisch derselbe Knoten.
        assert_eq!(s2, s1);

        let ende = pool.try_end_element(s1);
        assert!(!pool.is_invalid(ende));
    }

    #[test]
    fn any_absorbiert_alles() {
        let mut pool = ContentAutomata::new();
        let x = pool.intern_name("irgendwas");
        let any = pool.any();
        assert_eq!(pool.try_start_element(any, x), any);
        assert_eq!(pool.try_end_element(any), any);
    }

    #[test]
    fn empty_lehnt_starts_ab() {
        let mut pool = ContentAutomata::new();
        let x = pool.intern_name("x");
        let empty = pool.empty();
        let nach_start = pool.try_start_element(empty, x);
        assert!(pool.is_invalid(nach_start));
        assert_eq!(pool.try_end_element(empty), empty);
    }

    #[test]
    fn invalid_ist_terminal() {
        let mut pool = ContentAutomata::new();
        let x = pool.intern_name("x");
        let invalid = pool.invalid();
        assert_eq!(pool.try_start_element(invalid, x), invalid);
        assert_eq!(pool.try_end_element(invalid), invalid);
    }

    // ==================== Pool-Grenzen Tests ====================

    #[test]
    #[should_panic(expected = "fremden ContentAutomata-Pool")]
    fn fremde_id_wird_abgewiesen() {
        let mut pool_a = ContentAutomata::new();
        let mut pool_b = ContentAutomata::new();
        let name = pool_b.intern_name("a");
        let fremd = pool_b.element(name);
        let eigen = pool_a.empty();
        pool_a.make_choice(eigen, fremd);
    }

    // ==================== Kompilierung Tests ====================

    fn compile(decls: &str) -> ContentAutomata {
        let dtd = parse_doctype(&format!("doc [ {decls} ]")).expect("DTD parse error");
        ContentAutomata::compile(&dtd)
    }

    #[test]
    fn kompilierte_sequenz_mit_wiederholung() {
        // (titel, kapitel+): ein Titel, dann mindestens ein Kapitel.
        let mut pool = compile("<!ELEMENT buch (titel, kapitel+)>");
        let buch = pool.intern_name("buch");
        let titel = pool.intern_name("titel");
        let kapitel = pool.intern_name("kapitel");

        let start = pool.start(buch).expect("Startzustand fehlt");
        let s = pool.try_start_element(start, titel);
        assert!(!pool.is_invalid(s));
        let zu_frueh = pool.try_end_element(s);
        assert!(pool.is_invalid(zu_frueh), "Kapitel fehlt noch");

        let s = pool.try_start_element(s, kapitel);
        assert!(!pool.is_invalid(s));
        let ende = pool.try_end_element(s);
        assert!(!pool.is_invalid(ende));

        let s = pool.try_start_element(s, kapitel);
        assert!(!pool.is_invalid(s), "kapitel+ erlaubt Wiederholung");

        let falsch = pool.try_start_element(start, kapitel);
        assert!(pool.is_invalid(falsch), "Titel muss zuerst kommen");
    }

    #[test]
    fn kompilierte_choice_gruppe() {
        let mut pool = compile("<!ELEMENT medium (buch | film)>");
        let medium = pool.intern_name("medium");
        let buch = pool.intern_name("buch");
        let film = pool.intern_name("film");

        let start = pool.start(medium).expect("Startzustand fehlt");
        let nach_buch = pool.try_start_element(start, buch);
        assert!(!pool.is_invalid(nach_buch));
        let ende = pool.try_end_element(nach_buch);
        assert!(!pool.is_invalid(ende));

        let nach_film = pool.try_start_element(start, film);
        assert!(!pool.is_invalid(nach_film));

        let beides = pool.try_start_element(nach_buch, film);
        assert!(pool.is_invalid(beides), "nur eine Alternative erlaubt");
    }

    #[test]
    fn kompiliertes_empty_modell() {
        let mut pool = compile("<!ELEMENT br EMPTY>");
        let br = pool.intern_name("br");
        let kind = pool.intern_name("kind");
        let start = pool.start(br).expect("Startzustand fehlt");
        assert_eq!(start, pool.empty());
        let nach_kind = pool.try_start_element(start, kind);
        assert!(pool.is_invalid(nach_kind));
        let ende = pool.try_end_element(start);
        assert!(!pool.is_invalid(ende));
    }

    #[test]
    fn kompiliertes_any_modell() {
        let mut pool = compile("<!ELEMENT div ANY>");
        let div = pool.intern_name("div");
        let wild = pool.intern_name("wild");
        let start = pool.start(div).expect("Startzustand fehlt");
        assert_eq!(start, pool.any());
        assert_eq!(pool.try_start_element(start, wild), start);
    }

    #[test]
    fn kompiliertes_mixed_modell() {
        let mut pool = compile("<!ELEMENT p (#PCDATA | em | strong)*>");
        let p = pool.intern_name("p");
        let em = pool.intern_name("em");
        let strong = pool.intern_name("strong");
        let div = pool.intern_name("div");

        let start = pool.start(p).expect("Startzustand fehlt");
        assert!(pool.nullable(start));
        let leer_ende = pool.try_end_element(start);
        assert!(!pool.is_invalid(leer_ende));

        let s = pool.try_start_element(start, em);
        assert!(!pool.is_invalid(s));
        let s = pool.try_start_element(s, strong);
        assert!(!pool.is_invalid(s));
        let s = pool.try_start_element(s, em);
        assert!(!pool.is_invalid(s), "Mixed erlaubt beliebige Reihenfolge");
        let ende = pool.try_end_element(s);
        assert!(!pool.is_invalid(ende));

        let fremdes_kind = pool.try_start_element(start, div);
        assert!(pool.is_invalid(fremdes_kind));
    }

    #[test]
    fn kompiliertes_pcdata_modell() {
        let mut pool = compile("<!ELEMENT notiz (#PCDATA)>");
        let notiz = pool.intern_name("notiz");
        let start = pool.start(notiz).expect("Startzustand fehlt");
        assert_eq!(start, pool.empty());
    }

    #[test]
    fn optionale_elemente_ueberspringbar() {
        // (a?, b): b darf direkt kommen.
        let mut pool = compile("<!ELEMENT doc (a?, b)>");
        let doc = pool.intern_name("doc");
        let a = pool.intern_name("a");
        let b = pool.intern_name("b");

        let start = pool.start(doc).expect("Startzustand fehlt");
        let direkt_b = pool.try_start_element(start, b);
        assert!(!pool.is_invalid(direkt_b));
        let ende = pool.try_end_element(direkt_b);
        assert!(!pool.is_invalid(ende));

        let nach_a = pool.try_start_element(start, a);
        let nach_ab = pool.try_start_element(nach_a, b);
        assert!(!pool.is_invalid(nach_ab));
        let ohne_b = pool.try_end_element(nach_a);
        assert!(pool.is_invalid(ohne_b), "b ist Pflicht");
    }

    #[test]
    fn nullbarer_mittelteil_entbindet_nicht_vom_rest() {
        // (a, b?, c): nach a allein ist das Modell nicht erfüllt.
        let mut pool = compile("<!ELEMENT doc (a, b?, c)>");
        let doc = pool.intern_name("doc");
        let a = pool.intern_name("a");
        let c = pool.intern_name("c");

        let start = pool.start(doc).expect("Startzustand fehlt");
        let nach_a = pool.try_start_element(start, a);
        assert!(!pool.is_invalid(nach_a));
        let ohne_c = pool.try_end_element(nach_a);
        assert!(pool.is_invalid(ohne_c), "c ist Pflicht");

        let nach_ac = pool.try_start_element(nach_a, c);
        assert!(!pool.is_invalid(nach_ac));
        let ende = pool.try_end_element(nach_ac);
        assert!(!pool.is_invalid(ende));
    }

    #[test]
    fn verschachtelte_gruppen_mit_wiederholung() {
        // ((a | b)+, c)
        let mut pool = compile("<!ELEMENT doc ((a | b)+, c)>");
        let doc = pool.intern_name("doc");
        let a = pool.intern_name("a");
        let b = pool.intern_name("b");
        let c = pool.intern_name("c");

        let start = pool.start(doc).expect("Startzustand fehlt");
        let s = pool.try_start_element(start, a);
        let s = pool.try_start_element(s, b);
        let s = pool.try_start_element(s, a);
        assert!(!pool.is_invalid(s));
        let zu_frueh = pool.try_end_element(s);
        assert!(pool.is_invalid(zu_frueh), "c fehlt noch");

        let s = pool.try_start_element(s, c);
        assert!(!pool.is_invalid(s));
        let ende = pool.try_end_element(s);
        assert!(!pool.is_invalid(ende));

        let direkt_c = pool.try_start_element(start, c);
        assert!(pool.is_invalid(direkt_c), "erst (a|b)+");
    }

    #[test]
    fn gleiche_modelle_teilen_startzustand() {
        let mut pool = compile("<!ELEMENT a (x)> <!ELEMENT b (x)>");
        let a = pool.intern_name("a");
        let b = pool.intern_name("b");
        assert_eq!(pool.start(a), pool.start(b));
        // Drei Singletons plus ein geteilter Element-Knoten.
        assert_eq!(pool.node_count(), 4);
    }

    #[test]
    fn kind_liefert_zustandsart() {
        let mut pool = ContentAutomata::new();
        let a = pool.intern_name("a");
        let ea = pool.element(a);
        assert_eq!(pool.kind(ea), &AutomatonKind::Element(a));
        let empty = pool.empty();
        assert_eq!(pool.kind(empty), &AutomatonKind::Empty);
    }

    #[test]
    fn unbekanntes_element_hat_keinen_startzustand() {
        let mut pool = compile("<!ELEMENT a EMPTY>");
        let fremd = pool.intern_name("nie-deklariert");
        assert!(pool.start(fremd).is_none());
    }

    #[test]
    fn zero_or_more_gruppe() {
        let mut pool = compile("<!ELEMENT liste (eintrag)*>");
        let liste = pool.intern_name("liste");
        let eintrag = pool.intern_name("eintrag");

        let start = pool.start(liste).expect("Startzustand fehlt");
        let leer = pool.try_end_element(start);
        assert!(!pool.is_invalid(leer), "leere Liste erlaubt");

        let s = pool.try_start_element(start, eintrag);
        let s = pool.try_start_element(s, eintrag);
        assert!(!pool.is_invalid(s));
        let ende = pool.try_end_element(s);
        assert!(!pool.is_invalid(ende));
    }
}
