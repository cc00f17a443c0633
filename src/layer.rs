//! Schichtweise 2D-Platzierung mit freien Rechtecken.
//!
//! Eine Schicht ist eine flache Scheibe fester Tiefe. Ihre Grundfläche wird
//! mit einer Liste freier Rechtecke verwaltet: Ein Block landet in der
//! minimalen Ecke des ersten passenden freien Rechtecks (neueste zuerst), das
//! verbrauchte Rechteck wird per Guillotine-Schnitt in einen rechten und
//! einen oberen Rest zerlegt.

use std::cmp::Ordering;

use crate::model::Block;
use crate::types::{Dimensional, EPSILON_GENERAL, Point2, Rect};

/// Geordnete Liste freier Rechtecke einer Schicht.
///
/// Nach jeder Platzierung aufsteigend nach `(min_y, min_x)` sortiert.
#[derive(Clone, Debug, PartialEq)]
pub struct FreeRectangles {
    rects: Vec<Rect>,
}

impl FreeRectangles {
    /// Beginnt mit der gesamten Grundfläche als einzigem freien Rechteck.
    pub fn full(width: f64, height: f64) -> Self {
        Self {
            rects: vec![Rect::new(0.0, 0.0, width, height)],
        }
    }

    pub fn as_slice(&self) -> &[Rect] {
        &self.rects
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Summe der noch verfolgten freien Fläche.
    pub fn total_area(&self) -> f64 {
        self.rects.iter().map(Rect::area).sum()
    }

    /// Sucht vom Ende zum Anfang das erste Rechteck, das `width × height` aufnimmt.
    ///
    /// # Rückgabewert
    /// Index des gewählten Rechtecks, `None` wenn keines passt
    pub fn find_fit(&self, width: f64, height: f64) -> Option<usize> {
        self.rects
            .iter()
            .enumerate()
            .rev()
            .find(|(_, rect)| rect.fits(width, height))
            .map(|(idx, _)| idx)
    }

    /// Verbucht eine Platzierung in der minimalen Ecke des Rechtecks `index`.
    ///
    /// Entfernt das Rechteck, hängt die nicht-leeren Reste (rechts, oben) an
    /// und sortiert neu. Alles in einem Schritt, damit nie ein halb
    /// aktualisierter Zustand sichtbar ist.
    ///
    /// # Rückgabewert
    /// Die Position (minimale Ecke) des verbrauchten Rechtecks, `None` bei
    /// ungültigem `index` (die Liste bleibt dann unverändert)
    pub(crate) fn apply_placement(
        &mut self,
        index: usize,
        width: f64,
        height: f64,
    ) -> Option<Point2> {
        if index >= self.rects.len() {
            return None;
        }
        let chosen = self.rects.remove(index);

        // Rechter Streifen: Höhe des Blocks, Rest der Breite
        let right = Rect::new(
            chosen.x + width,
            chosen.y,
            chosen.width - width,
            height,
        );
        // Oberer Streifen: volle Breite, Rest der Höhe
        let top = Rect::new(
            chosen.x,
            chosen.y + height,
            chosen.width,
            chosen.height - height,
        );

        for remainder in [right, top] {
            if !remainder.is_degenerate() {
                self.rects.push(remainder);
            }
        }

        self.rects.sort_by(|a, b| {
            a.min_y()
                .partial_cmp(&b.min_y())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.min_x().partial_cmp(&b.min_x()).unwrap_or(Ordering::Equal))
        });

        Some(chosen.origin())
    }
}

/// Eine Schicht fester Tiefe mit ihren platzierten Blöcken.
#[derive(Clone, Debug)]
pub struct Layer {
    depth: f64,
    blocks: Vec<Block>,
    free: FreeRectangles,
}

impl Layer {
    /// Erstellt eine leere Schicht über der gesamten Containergrundfläche.
    pub fn new(depth: f64, container_width: f64, container_height: f64) -> Self {
        Self {
            depth,
            blocks: Vec::new(),
            free: FreeRectangles::full(container_width, container_height),
        }
    }

    /// Einheitliche Tiefe, festgelegt durch den ersten platzierten Block.
    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Platzierte Blöcke in Platzierungsreihenfolge.
    ///
    /// Der Index im Slice ist die fortlaufende Nummer des Blocks innerhalb
    /// der Schicht (0, 1, 2, ...); `Block::id` bleibt die Kennung des Aufrufers.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn free_rectangles(&self) -> &[Rect] {
        self.free.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Belegte Grundfläche.
    pub fn used_area(&self) -> f64 {
        self.blocks.iter().map(|b| b.footprint_area()).sum()
    }

    /// Volumen aller Blöcke dieser Schicht.
    pub fn used_volume(&self) -> f64 {
        self.blocks.iter().map(|b| b.volume()).sum()
    }

    /// Noch verfolgte freie Fläche (kann kleiner sein als die echte Restfläche).
    pub fn free_area(&self) -> f64 {
        self.free.total_area()
    }

    /// Versucht, einen Block in dieser Schicht zu platzieren.
    ///
    /// 1. Tiefenprüfung: Der erste Block legt die Schichttiefe fest, jeder
    ///    weitere darf nicht tiefer sein (exakter Vergleich, ohne Toleranz).
    /// 2. Kandidaten: die übergebene Ausrichtung unverändert, danach (falls erlaubt) um 90°
    ///    gedreht.
    /// 3. Pro Kandidat wird das neueste passende freie Rechteck gewählt.
    ///
    /// # Rückgabewert
    /// Der platzierte Block oder `None`, wenn die Schicht ihn ablehnt
    pub fn try_place(
        &mut self,
        block: &Block,
        container_width: f64,
        container_height: f64,
        allow_rotation: bool,
    ) -> Option<&Block> {
        let first = self.blocks.is_empty();
        if !first && block.depth() > self.depth {
            log::debug!(
                "Block {} (Tiefe {}) zu tief für Schicht mit Tiefe {}",
                block.id(),
                block.depth(),
                self.depth
            );
            return None;
        }

        let base = block.unplaced();
        let mut candidates = vec![base.clone()];
        if allow_rotation && !base.is_square() {
            candidates.push(base.rotated());
        }

        let (candidate, index) = candidates.into_iter().find_map(|candidate| {
            if candidate.width() > container_width + EPSILON_GENERAL
                || candidate.height() > container_height + EPSILON_GENERAL
            {
                return None;
            }
            self.free
                .find_fit(candidate.width(), candidate.height())
                .map(|idx| (candidate, idx))
        })?;

        let origin = self
            .free
            .apply_placement(index, candidate.width(), candidate.height())?;
        if first {
            self.depth = block.depth();
        }
        self.blocks.push(candidate.placed_at(origin));
        self.blocks.last()
    }
}
