//! Pull-Reader-Abstraktion: Knoten-Arten, Lesezustand, Optionen und der
//! [`TokenRead`]-Vertrag, den Basis-Tokenizer und Entity-auflösender
//! Reader gemeinsam erfüllen.
//!
//! # Beispiel
//!
//! ```
//! use erdx::reader::{EntityHandling, ReaderOptions};
//!
//! let opts = ReaderOptions::default()
//!     .with_entity_handling(EntityHandling::Report)
//!     .with_max_entity_depth(8);
//!
//! assert_eq!(opts.entity_handling(), EntityHandling::Report);
//! assert_eq!(opts.max_entity_depth(), 8);
//! ```

pub mod resolving;
pub mod source;

use crate::Result;

/// Art des Knotens, auf dem ein Reader gerade steht.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    /// Vor dem ersten [`advance`](TokenRead::advance) oder nach dem Ende.
    #[default]
    None,
    /// Öffnendes Tag (`<a>` oder `<a/>`).
    StartElement,
    /// Schließendes Tag (`</a>`; bei `<a/>` synthetisiert).
    EndElement,
    /// Attribut eines Elements, erreicht über die `move_to_*`-Navigation.
    Attribute,
    /// Zeichendaten mit mindestens einem Nicht-Whitespace-Zeichen.
    Text,
    /// `<![CDATA[...]]>`-Abschnitt.
    CData,
    /// Zeichendaten, die nur aus Whitespace bestehen.
    Whitespace,
    /// `<!-- ... -->`.
    Comment,
    /// `<?ziel inhalt?>`.
    ProcessingInstruction,
    /// `<!DOCTYPE ...>`.
    DocumentType,
    /// Nicht aufgelöste General-Entity-Referenz (`&name;`).
    EntityReference,
    /// Ende eines aufgelösten Entity-Inhalts (nur unter
    /// [`EntityHandling::Report`]).
    EndEntity,
}

/// Lesezustand eines Pull-Readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    /// Noch kein [`advance`](TokenRead::advance) aufgerufen.
    #[default]
    Initial,
    /// Mitten im Dokument, aktueller Knoten gültig.
    Interactive,
    /// Stromende erreicht.
    EndOfFile,
    /// Ein Fehler hat das Lesen beendet.
    Error,
    /// [`close`](TokenRead::close) wurde aufgerufen.
    Closed,
}

/// Behandlung von General-Entity-Referenzen im Dokumentinhalt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityHandling {
    /// Referenzen werden transparent durch ihren Inhalt ersetzt; der
    /// Referenz-Knoten selbst erscheint nie im Tokenstrom (Default).
    #[default]
    Expand,
    /// Referenzen erscheinen als [`NodeKind::EntityReference`]-Knoten;
    /// die Auflösung geschieht nur auf expliziten Aufruf und wird mit
    /// [`NodeKind::EndEntity`] abgeschlossen.
    Report,
}

/// Optionen für den Entity-auflösenden Reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    pub(crate) entity_handling: EntityHandling,
    pub(crate) max_entity_depth: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            entity_handling: EntityHandling::Expand,
            max_entity_depth: 32,
        }
    }
}

impl ReaderOptions {
    // --- Getter ---

    /// Behandlung von Entity-Referenzen im Inhalt.
    pub fn entity_handling(&self) -> EntityHandling {
        self.entity_handling
    }

    /// Maximale Schachtelungstiefe von Entity-Expansionen (Default: 32).
    ///
    /// Beim Überschreiten schlägt die Auflösung mit
    /// [`Error::EntityNestingTooDeep`](crate::Error::EntityNestingTooDeep)
    /// fehl; `0` verbietet jede Expansion.
    pub fn max_entity_depth(&self) -> usize {
        self.max_entity_depth
    }

    // --- Builder-Setter (Fluent API) ---

    /// Setzt die Entity-Behandlung.
    pub fn with_entity_handling(mut self, handling: EntityHandling) -> Self {
        self.entity_handling = handling;
        self
    }

    /// Setzt die maximale Entity-Schachtelungstiefe.
    pub fn with_max_entity_depth(mut self, depth: usize) -> Self {
        self.max_entity_depth = depth;
        self
    }

    // --- Mutable Setter ---

    /// Setzt die Entity-Behandlung.
    pub fn set_entity_handling(&mut self, handling: EntityHandling) {
        self.entity_handling = handling;
    }

    /// Setzt die maximale Entity-Schachtelungstiefe.
    pub fn set_max_entity_depth(&mut self, depth: usize) {
        self.max_entity_depth = depth;
    }
}

/// Pull-basierter Token-Cursor über einem XML-Strom.
///
/// Der Vertrag folgt dem üblichen Lebenszyklus
/// [`Initial`](ReadState::Initial) → [`Interactive`](ReadState::Interactive)
/// → [`EndOfFile`](ReadState::EndOfFile) / [`Closed`](ReadState::Closed):
/// erst [`advance`](Self::advance) macht den ersten Knoten sichtbar, danach
/// beschreiben die Accessoren den jeweils aktuellen Knoten. Attribute
/// werden nicht als eigene Token geliefert, sondern über die
/// `move_to_*`-Navigation am Element erreicht.
pub trait TokenRead {
    /// Liest das nächste Token. `false` bedeutet Stromende.
    fn advance(&mut self) -> Result<bool>;

    /// Art des aktuellen Knotens.
    fn kind(&self) -> NodeKind;

    /// Name des aktuellen Knotens (Tag-Name, Attribut-Name, Entity-Name,
    /// PI-Ziel); leer für namenlose Knoten wie Text.
    fn name(&self) -> &str;

    /// Textwert des aktuellen Knotens (Zeichendaten, Attributwert,
    /// Kommentar- oder PI-Inhalt); leer für wertlose Knoten.
    fn value(&self) -> &str;

    /// Schachtelungstiefe des aktuellen Knotens. Die Dokumentwurzel hat
    /// Tiefe 0, Attribute liegen eine Ebene unter ihrem Element.
    fn depth(&self) -> usize;

    /// Ob das aktuelle Start-Tag ein Empty-Element-Tag (`<a/>`) ist.
    fn is_empty_element(&self) -> bool;

    /// Aktueller Lesezustand.
    fn read_state(&self) -> ReadState;

    /// Zeile der aktuellen Position, 1-basiert.
    fn line(&self) -> u64;

    /// Spalte der aktuellen Position, 1-basiert.
    fn column(&self) -> u64;

    /// Anzahl der Attribute des aktuellen Elements (0 für andere Knoten).
    fn attribute_count(&self) -> usize;

    /// Wert eines Attributs des aktuellen Elements, ohne die Position zu
    /// bewegen.
    fn attribute(&self, name: &str) -> Option<&str>;

    /// Stellt den Cursor auf das benannte Attribut.
    fn move_to_attribute(&mut self, name: &str) -> bool;

    /// Stellt den Cursor auf das Attribut mit diesem Index.
    fn move_to_attribute_index(&mut self, index: usize) -> bool;

    /// Stellt den Cursor auf das erste Attribut.
    fn move_to_first_attribute(&mut self) -> bool;

    /// Stellt den Cursor auf das nächste Attribut.
    fn move_to_next_attribute(&mut self) -> bool;

    /// Kehrt von einem Attribut zum Element zurück. `false`, wenn der
    /// Cursor nicht auf einem Attribut stand.
    fn move_to_element(&mut self) -> bool;

    /// Zerlegt den Wert des aktuellen Attributs in seine Bestandteile
    /// ([`Text`](NodeKind::Text)- und
    /// [`EntityReference`](NodeKind::EntityReference)-Knoten) und rückt zum
    /// nächsten vor. `false`, wenn keine Bestandteile mehr folgen.
    fn read_attribute_value(&mut self) -> bool;

    /// Löst die Entity-Referenz am aktuellen Knoten auf.
    ///
    /// # Errors
    ///
    /// Schlägt fehl, wenn der aktuelle Knoten keine
    /// [`EntityReference`](NodeKind::EntityReference) ist oder der Strom
    /// Entity-Auflösung nicht unterstützt.
    fn resolve_entity(&mut self) -> Result<()>;

    /// Löst ein Namespace-Präfix im aktuellen Gültigkeitsbereich auf.
    /// Das leere Präfix erfragt den Default-Namespace.
    fn lookup_namespace(&self, prefix: &str) -> Option<&str>;

    /// Überspringt den aktuellen Knoten samt Kindern.
    fn skip(&mut self) -> Result<()> {
        self.move_to_element();
        if self.kind() == NodeKind::StartElement && !self.is_empty_element() {
            let target = self.depth();
            while self.advance()? {
                if self.kind() == NodeKind::EndElement && self.depth() == target {
                    break;
                }
            }
        }
        self.advance()?;
        Ok(())
    }

    /// Beendet das Lesen; weitere [`advance`](Self::advance)-Aufrufe
    /// liefern `false`.
    fn close(&mut self);
}
