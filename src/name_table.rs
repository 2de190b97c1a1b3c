//! Name-Interning für Content-Modelle.
//!
//! DTDs sind namespace-unaware: verglichen wird der literale Tag-Name
//! (inklusive eventuellem Prefix), wie er im Dokument steht. Die
//! Automaten vergleichen Namen millionenfach; interned Indizes machen
//! daraus `usize`-Vergleiche statt String-Vergleiche.
//!
//! Jeder String wird einmalig als `Rc<str>` gespeichert. Ein
//! Direct-Mapped Cache (32 Slots) vermeidet HashMap-Lookups für
//! wiederkehrende Namen; typische DTDs haben 10-100 unique Namen bei
//! beliebig vielen Vorkommen im Dokument.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::FastHashMap;

const LOOKUP_CACHE_SLOTS: usize = 32;

/// Index in die [`NameTable`]. `Copy`-Type, kein Heap.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameId(pub(crate) usize);

impl fmt::Debug for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameId({})", self.0)
    }
}

/// String-Pool für Element-Namen.
///
/// `names` (Index→String) und `lookup` (String→Index) teilen dieselben
/// `Rc<str>`-Instanzen. Einfügen ist append-only; Indizes bleiben über
/// die Lebensdauer der Tabelle stabil.
#[derive(Clone)]
pub struct NameTable {
    names: Vec<Rc<str>>,
    lookup: FastHashMap<Rc<str>, usize>,
    /// Direct-Mapped Cache: (hash, NameId). Slot usize::MAX = leer.
    cache: [(u64, usize); LOOKUP_CACHE_SLOTS],
}

impl NameTable {
    /// Erstellt eine neue, leere Tabelle.
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            lookup: FastHashMap::default(),
            cache: [(0, usize::MAX); LOOKUP_CACHE_SLOTS],
        }
    }

    /// Internt einen Namen. Bereits bekannte Namen werden dedupliziert.
    pub fn intern(&mut self, name: &str) -> NameId {
        let hash = {
            let mut hasher = ahash::AHasher::default();
            name.hash(&mut hasher);
            hasher.finish()
        };
        let slot = hash as usize % LOOKUP_CACHE_SLOTS;
        let (cached_hash, cached_idx) = self.cache[slot];
        if cached_hash == hash
            && cached_idx != usize::MAX
            && self.names.get(cached_idx).is_some_and(|v| &**v == name)
        {
            return NameId(cached_idx);
        }

        if let Some(&idx) = self.lookup.get(name) {
            self.cache[slot] = (hash, idx);
            return NameId(idx);
        }
        let idx = self.names.len();
        let rc: Rc<str> = Rc::from(name);
        self.names.push(Rc::clone(&rc));
        self.lookup.insert(rc, idx);
        self.cache[slot] = (hash, idx);
        NameId(idx)
    }

    /// Löst eine NameId zu &str auf.
    #[inline]
    pub fn resolve(&self, id: NameId) -> &str {
        &self.names[id.0]
    }

    /// Anzahl der internierten Namen.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Ob die Tabelle leer ist.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameTable({} Namen)", self.names.len())
    }
}
