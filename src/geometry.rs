//! Geometrische Hilfsfunktionen für Überschneidungen in der Grundfläche.
//!
//! Blöcke derselben Schicht teilen sich die XY-Ebene; diese Funktionen prüfen
//! ihre Grundflächen gegeneinander.

use crate::model::Block;

/// Prüft, ob sich die Grundflächen zweier Blöcke überschneiden.
///
/// Ein nicht platzierter Block überschneidet sich mit nichts. Berührende
/// Kanten zählen nicht als Überschneidung.
pub fn footprints_overlap(a: &Block, b: &Block) -> bool {
    match (a.footprint(), b.footprint()) {
        (Some(fa), Some(fb)) => fa.intersects(&fb),
        _ => false,
    }
}

/// Berechnet die Überlappung zweier Intervalle in einer Dimension.
///
/// # Rückgabewert
/// Länge der Überlappung, mindestens 0.0
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Berechnet die Überlappungsfläche zweier platzierter Blöcke in der XY-Ebene.
pub fn overlap_area(a: &Block, b: &Block) -> f64 {
    match (a.footprint(), b.footprint()) {
        (Some(fa), Some(fb)) => {
            let overlap_x = overlap_1d(fa.min_x(), fa.max_x(), fb.min_x(), fb.max_x());
            let overlap_y = overlap_1d(fa.min_y(), fa.max_y(), fb.min_y(), fb.max_y());
            overlap_x * overlap_y
        }
        _ => 0.0,
    }
}
