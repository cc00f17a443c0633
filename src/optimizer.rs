//! Schichtbasierte Verpackungslogik für Blöcke in einem Container.
//!
//! Der Container hält eine geordnete Folge von Schichten. Jeder eingehende
//! Block wird der ersten Schicht angeboten, die ihn annimmt; findet sich
//! keine, entsteht eine neue Schicht mit der Tiefe des Blocks. Es gibt kein
//! Backtracking: Ein Block, den auch eine frische Schicht ablehnt, bleibt
//! unverpackt.
//!
//! Die Reihenfolge der Blöcke bestimmt der Aufrufer. `sort_for_layering`
//! liefert die Referenzsortierung (tiefe Blöcke zuerst, dann große
//! Grundflächen), wird aber nie intern angewendet.

use std::cmp::Ordering;

use serde::Serialize;

use crate::layer::Layer;
use crate::model::{Block, ValidationError, validate_extents};
use crate::types::{Dimensional, EPSILON_GENERAL, Point2};

/// Konfiguration für den Packing-Algorithmus.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// Ob ein Block um 90° gedreht (Breite/Höhe getauscht) werden darf
    pub allow_rotation: bool,
    /// Ob `pack_blocks` die Referenzsortierung vor dem Packen anwendet
    pub presort: bool,
}

impl PackingConfig {
    pub const DEFAULT_ALLOW_ROTATION: bool = true;
    pub const DEFAULT_PRESORT: bool = true;

    /// Erstellt einen Builder für benutzerdefinierte Konfiguration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            allow_rotation: Self::DEFAULT_ALLOW_ROTATION,
            presort: Self::DEFAULT_PRESORT,
        }
    }
}

/// Builder für PackingConfig.
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    /// Erlaubt oder verbietet die 90°-Drehung.
    pub fn allow_rotation(mut self, allow: bool) -> Self {
        self.config.allow_rotation = allow;
        self
    }

    /// Schaltet die Vorsortierung in `pack_blocks` ein oder aus.
    pub fn presort(mut self, presort: bool) -> Self {
        self.config.presort = presort;
        self
    }

    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Gründe, warum ein Block nicht platziert werden konnte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnplacedReason {
    /// Keine bestehende Schicht und auch keine neue Schicht nimmt den Block auf.
    RejectedByAllLayers,
}

impl UnplacedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::RejectedByAllLayers => "rejected_by_all_layers",
        }
    }
}

impl std::fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnplacedReason::RejectedByAllLayers => {
                write!(
                    f,
                    "Grundfläche des Blocks passt in keiner Ausrichtung in den Container"
                )
            }
        }
    }
}

/// Ergebnis eines einzelnen `add_block`-Aufrufs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlacementResult {
    Placed {
        layer_index: usize,
        position: Point2,
        rotated: bool,
    },
    Rejected(UnplacedReason),
}

impl PlacementResult {
    pub fn is_placed(&self) -> bool {
        matches!(self, PlacementResult::Placed { .. })
    }
}

/// Container mit fester Grundfläche und einer Folge gestapelter Schichten.
///
/// Die Tiefe ist nur ein Richtwert: Sie wird gegen die Summe der
/// Schichttiefen nicht erzwungen.
#[derive(Clone, Debug)]
pub struct Container {
    width: f64,
    height: f64,
    depth: f64,
    layers: Vec<Layer>,
}

impl Container {
    /// Erstellt einen leeren Container mit Validierung.
    ///
    /// # Rückgabewert
    /// `Ok(Container)` bei gültigen Werten, sonst `Err(ValidationError)`
    pub fn new(width: f64, height: f64, depth: f64) -> Result<Self, ValidationError> {
        validate_extents(width, height, depth, "Container")?;
        Ok(Self {
            width,
            height,
            depth,
            layers: Vec::new(),
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Schichten in Erstellungsreihenfolge (vorne, z = 0, nach hinten).
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Platziert einen Block mit Standardkonfiguration (Drehung erlaubt).
    pub fn add_block(&mut self, block: Block) -> PlacementResult {
        self.add_block_with(block, &PackingConfig::default())
    }

    /// Platziert einen Block in der ersten Schicht, die ihn annimmt.
    ///
    /// Nimmt keine bestehende Schicht ihn auf, wird eine neue Schicht mit der
    /// Tiefe des Blocks angelegt. Lehnt auch diese ab, wird die Schicht
    /// verworfen und der Block als `Rejected` gemeldet.
    pub fn add_block_with(&mut self, block: Block, config: &PackingConfig) -> PlacementResult {
        let (width, height) = (self.width, self.height);

        for (layer_index, layer) in self.layers.iter_mut().enumerate() {
            if let Some(placed) = layer.try_place(&block, width, height, config.allow_rotation) {
                let result = placed_result(layer_index, placed);
                log::debug!("Block {} in Schicht {} platziert", block.id(), layer_index);
                return result;
            }
        }

        let mut layer = Layer::new(block.depth(), width, height);
        let result = match layer.try_place(&block, width, height, config.allow_rotation) {
            Some(placed) => placed_result(self.layers.len(), placed),
            None => {
                log::debug!(
                    "Block {} ({} × {}) passt auch in keine neue Schicht",
                    block.id(),
                    block.width(),
                    block.height()
                );
                return PlacementResult::Rejected(UnplacedReason::RejectedByAllLayers);
            }
        };

        self.layers.push(layer);
        log::debug!(
            "Neue Schicht {} mit Tiefe {} für Block {}",
            self.layers.len() - 1,
            block.depth(),
            block.id()
        );
        if self.exceeds_depth() {
            log::warn!(
                "Schichtstapel ({}) überschreitet die Containertiefe ({})",
                self.stacked_depth(),
                self.depth
            );
        }
        result
    }

    /// Versatz der Schicht `index` entlang der Stapelachse.
    ///
    /// Summe der Tiefen aller davor angelegten Schichten.
    pub fn stack_offset(&self, index: usize) -> f64 {
        self.layers.iter().take(index).map(Layer::depth).sum()
    }

    /// Gesamttiefe aller Schichten.
    pub fn stacked_depth(&self) -> f64 {
        self.layers.iter().map(Layer::depth).sum()
    }

    /// Ob der Schichtstapel tiefer ist als der Container.
    pub fn exceeds_depth(&self) -> bool {
        self.stacked_depth() > self.depth + EPSILON_GENERAL
    }

    pub fn placed_count(&self) -> usize {
        self.layers.iter().map(|l| l.blocks().len()).sum()
    }

    pub fn used_volume(&self) -> f64 {
        self.layers.iter().map(Layer::used_volume).sum()
    }

    pub fn total_volume(&self) -> f64 {
        self.width * self.height * self.depth
    }

    /// Auslastung des Containervolumens in Prozent.
    pub fn utilization_percent(&self) -> f64 {
        let total = self.total_volume();
        if total <= 0.0 {
            return 0.0;
        }
        (self.used_volume() / total) * 100.0
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> (f64, f64, f64) {
        (self.width, self.height, self.depth)
    }
}

fn placed_result(layer_index: usize, placed: &Block) -> PlacementResult {
    PlacementResult::Placed {
        layer_index,
        position: placed.position().unwrap_or_else(Point2::origin),
        rotated: placed.is_rotated(),
    }
}

/// Referenzsortierung: absteigend nach Tiefe, bei gleicher Tiefe
/// absteigend nach Grundfläche. Stabil, gleiche Blöcke behalten ihre
/// Reihenfolge.
pub fn sort_for_layering(blocks: &mut [Block]) {
    blocks.sort_by(|a, b| {
        b.depth()
            .partial_cmp(&a.depth())
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.footprint_area()
                    .partial_cmp(&a.footprint_area())
                    .unwrap_or(Ordering::Equal)
            })
    });
}

/// Block, der nicht platziert werden konnte.
#[derive(Clone, Debug)]
pub struct UnplacedBlock {
    pub block: Block,
    pub reason: UnplacedReason,
}

/// Ergebnis eines Packlaufs.
#[derive(Clone, Debug)]
pub struct PackingResult {
    pub container: Container,
    pub unplaced: Vec<UnplacedBlock>,
}

impl PackingResult {
    /// Gibt an, ob alle Blöcke verpackt wurden.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn layer_count(&self) -> usize {
        self.container.layers().len()
    }

    pub fn placed_count(&self) -> usize {
        self.container.placed_count()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }
}

/// Ereignisse, die während des Packens auftreten, um Live-Visualisierung zu ermöglichen.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// Eine neue Schicht wurde angelegt.
    LayerStarted {
        index: usize,
        depth: f64,
        offset: f64,
    },
    /// Ein Block wurde platziert. `dims` ist die platzierte Ausrichtung,
    /// `slot` die fortlaufende Nummer in der Schicht.
    BlockPlaced {
        layer_index: usize,
        slot: usize,
        id: usize,
        pos: (f64, f64),
        dims: (f64, f64, f64),
        rotated: bool,
    },
    /// Ein Block konnte nicht platziert werden.
    BlockRejected {
        id: usize,
        dims: (f64, f64, f64),
        reason_code: String,
        reason_text: String,
    },
    /// Packen abgeschlossen.
    Finished { layers: usize, unplaced: usize },
}

/// Packt alle Blöcke in der gegebenen (bzw. vorsortierten) Reihenfolge.
pub fn pack_blocks(container: Container, blocks: Vec<Block>, config: PackingConfig) -> PackingResult {
    pack_blocks_with_progress(container, blocks, config, |_| {})
}

/// Wie `pack_blocks`, ruft aber für jeden Schritt ein Callback auf (geeignet für SSE).
///
/// Ein abgelehnter Block bricht den Lauf nie ab; er landet in `unplaced`.
pub fn pack_blocks_with_progress(
    mut container: Container,
    blocks: Vec<Block>,
    config: PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> PackingResult {
    let mut blocks = blocks;
    if config.presort {
        sort_for_layering(&mut blocks);
    }

    let mut unplaced = Vec::new();

    for block in blocks {
        let layers_before = container.layers().len();
        match container.add_block_with(block.clone(), &config) {
            PlacementResult::Placed {
                layer_index,
                position,
                rotated,
            } => {
                let layer = &container.layers()[layer_index];
                if container.layers().len() > layers_before {
                    on_event(&PackEvent::LayerStarted {
                        index: layer_index,
                        depth: layer.depth(),
                        offset: container.stack_offset(layer_index),
                    });
                }
                let slot = layer.blocks().len().saturating_sub(1);
                let dims = layer
                    .blocks()
                    .last()
                    .map_or_else(|| block.dimensions(), Dimensional::dimensions);
                on_event(&PackEvent::BlockPlaced {
                    layer_index,
                    slot,
                    id: block.id(),
                    pos: position.as_tuple(),
                    dims,
                    rotated,
                });
            }
            PlacementResult::Rejected(reason) => {
                on_event(&PackEvent::BlockRejected {
                    id: block.id(),
                    dims: block.dimensions(),
                    reason_code: reason.code().to_string(),
                    reason_text: reason.to_string(),
                });
                unplaced.push(UnplacedBlock { block, reason });
            }
        }
    }

    log::info!(
        "📦 Packlauf beendet: {} Blöcke in {} Schichten, {} unverpackt",
        container.placed_count(),
        container.layers().len(),
        unplaced.len()
    );
    on_event(&PackEvent::Finished {
        layers: container.layers().len(),
        unplaced: unplaced.len(),
    });

    PackingResult {
        container,
        unplaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::footprints_overlap;
    use crate::types::Rect;

    fn block(id: usize, w: f64, h: f64, d: f64) -> Block {
        Block::new(id, w, h, d).unwrap()
    }

    fn assert_layers_valid(container: &Container) {
        let bounds = Rect::new(0.0, 0.0, container.width(), container.height());
        for (idx, layer) in container.layers().iter().enumerate() {
            let blocks = layer.blocks();
            assert!(!blocks.is_empty(), "Schicht {} ist leer", idx);
            assert_eq!(layer.depth(), blocks[0].depth());
            for (i, a) in blocks.iter().enumerate() {
                assert!(a.depth() <= layer.depth());
                assert!(bounds.contains(&a.footprint().unwrap()));
                for b in &blocks[i + 1..] {
                    assert!(
                        !footprints_overlap(a, b),
                        "Block {} überlappt Block {} in Schicht {}",
                        a.id(),
                        b.id(),
                        idx
                    );
                }
            }
        }
    }

    #[test]
    fn invalid_container_rejected() {
        assert!(Container::new(0.0, 10.0, 10.0).is_err());
        assert!(Container::new(10.0, -1.0, 10.0).is_err());
        assert!(Container::new(10.0, 10.0, f64::NAN).is_err());
    }

    #[test]
    fn first_block_anchors_at_origin() {
        let mut container = Container::new(202.0, 120.0, 202.0).unwrap();
        let result = container.add_block(block(1, 180.0, 77.0, 12.0));
        assert_eq!(
            result,
            PlacementResult::Placed {
                layer_index: 0,
                position: Point2::origin(),
                rotated: false,
            }
        );
        assert_eq!(container.layers().len(), 1);
    }

    #[test]
    fn oversized_block_is_rejected_without_layer() {
        let mut container = Container::new(202.0, 120.0, 202.0).unwrap();
        let result = container.add_block(block(1, 500.0, 500.0, 10.0));
        assert_eq!(
            result,
            PlacementResult::Rejected(UnplacedReason::RejectedByAllLayers)
        );
        assert!(container.layers().is_empty());
    }

    #[test]
    fn deeper_block_opens_new_layer() {
        let mut container = Container::new(100.0, 100.0, 100.0).unwrap();
        container.add_block(block(1, 10.0, 10.0, 5.0));
        let result = container.add_block(block(2, 10.0, 10.0, 8.0));
        assert!(matches!(
            result,
            PlacementResult::Placed { layer_index: 1, .. }
        ));
        assert_eq!(container.layers()[1].depth(), 8.0);
        assert_eq!(container.stack_offset(0), 0.0);
        assert_eq!(container.stack_offset(1), 5.0);
        assert_eq!(container.stacked_depth(), 13.0);
    }

    #[test]
    fn marginally_deeper_block_opens_new_layer() {
        let mut container = Container::new(100.0, 100.0, 100.0).unwrap();
        container.add_block(block(1, 10.0, 10.0, 10.0));
        let result = container.add_block(block(2, 10.0, 10.0, 10.000_000_5));
        assert!(matches!(
            result,
            PlacementResult::Placed { layer_index: 1, .. }
        ));
        assert_eq!(container.layers()[0].blocks().len(), 1);
        assert_layers_valid(&container);
    }

    #[test]
    fn shallower_block_joins_earlier_layer() {
        let mut container = Container::new(100.0, 100.0, 100.0).unwrap();
        container.add_block(block(1, 50.0, 50.0, 10.0));
        container.add_block(block(2, 50.0, 50.0, 20.0));
        let result = container.add_block(block(3, 20.0, 20.0, 4.0));
        assert!(matches!(
            result,
            PlacementResult::Placed { layer_index: 0, .. }
        ));
        assert_layers_valid(&container);
    }

    #[test]
    fn full_layer_spills_into_new_layer() {
        let mut container = Container::new(100.0, 100.0, 100.0).unwrap();
        for id in 0..4 {
            let result = container.add_block(block(id, 50.0, 50.0, 10.0));
            assert!(matches!(
                result,
                PlacementResult::Placed { layer_index: 0, .. }
            ));
        }
        assert!(container.layers()[0].free_rectangles().is_empty());
        let result = container.add_block(block(4, 50.0, 50.0, 10.0));
        assert!(matches!(
            result,
            PlacementResult::Placed { layer_index: 1, .. }
        ));
        assert_layers_valid(&container);
    }

    #[test]
    fn depth_is_advisory() {
        let mut container = Container::new(10.0, 10.0, 15.0).unwrap();
        container.add_block(block(1, 10.0, 10.0, 10.0));
        let result = container.add_block(block(2, 10.0, 10.0, 10.0));
        assert!(result.is_placed());
        assert!(container.exceeds_depth());
    }

    #[test]
    fn sort_for_layering_orders_by_depth_then_area() {
        let mut blocks = vec![
            block(1, 30.0, 22.0, 8.0),
            block(2, 77.0, 75.0, 12.0),
            block(3, 90.0, 22.0, 10.0),
            block(4, 180.0, 77.0, 12.0),
            block(5, 120.0, 76.0, 12.0),
        ];
        sort_for_layering(&mut blocks);
        let ids: Vec<usize> = blocks.iter().map(Block::id).collect();
        assert_eq!(ids, vec![4, 5, 2, 3, 1]);
    }

    #[test]
    fn add_block_keeps_submission_order() {
        // Small block first: it anchors the layer even though a bigger one follows
        let mut container = Container::new(100.0, 100.0, 100.0).unwrap();
        container.add_block(block(1, 10.0, 10.0, 10.0));
        container.add_block(block(2, 90.0, 90.0, 10.0));
        assert_eq!(container.layers()[0].blocks()[0].id(), 1);
    }

    #[test]
    fn pack_blocks_collects_unplaced_and_continues() {
        let container = Container::new(202.0, 120.0, 202.0).unwrap();
        let blocks = vec![
            block(1, 180.0, 77.0, 12.0),
            block(2, 500.0, 500.0, 12.0),
            block(3, 30.0, 22.0, 8.0),
        ];
        let result = pack_blocks(container, blocks, PackingConfig::default());
        assert!(!result.is_complete());
        assert_eq!(result.unplaced_count(), 1);
        assert_eq!(result.unplaced[0].block.id(), 2);
        assert_eq!(result.placed_count(), 2);
        assert_layers_valid(&result.container);
    }

    #[test]
    fn pack_blocks_emits_events() {
        let container = Container::new(100.0, 100.0, 100.0).unwrap();
        let blocks = vec![
            block(1, 50.0, 50.0, 10.0),
            block(2, 50.0, 50.0, 10.0),
            block(3, 200.0, 10.0, 10.0),
        ];
        let config = PackingConfig::builder().presort(false).build();
        let mut events = Vec::new();
        pack_blocks_with_progress(container, blocks, config, |evt| events.push(evt.clone()));

        let layer_starts = events
            .iter()
            .filter(|e| matches!(e, PackEvent::LayerStarted { .. }))
            .count();
        let placed = events
            .iter()
            .filter(|e| matches!(e, PackEvent::BlockPlaced { .. }))
            .count();
        let rejected = events
            .iter()
            .filter(|e| matches!(e, PackEvent::BlockRejected { .. }))
            .count();
        assert_eq!(layer_starts, 1);
        assert_eq!(placed, 2);
        assert_eq!(rejected, 1);
        assert!(matches!(
            events.last(),
            Some(PackEvent::Finished {
                layers: 1,
                unplaced: 1
            })
        ));
    }

    #[test]
    fn placed_event_reports_placed_orientation() {
        let container = Container::new(100.0, 100.0, 100.0).unwrap();
        // 90×40, already turned by the caller
        let blocks = vec![block(1, 40.0, 90.0, 5.0).rotated(), block(2, 10.0, 10.0, 5.0)];
        let config = PackingConfig::builder().presort(false).build();
        let mut events = Vec::new();
        let result =
            pack_blocks_with_progress(container, blocks, config, |evt| events.push(evt.clone()));

        let placed = &result.container.layers()[0].blocks()[0];
        assert_eq!((placed.width(), placed.height()), (90.0, 40.0));

        let reported: Vec<(usize, (f64, f64, f64), bool)> = events
            .iter()
            .filter_map(|e| match e {
                PackEvent::BlockPlaced {
                    slot,
                    dims,
                    rotated,
                    ..
                } => Some((*slot, *dims, *rotated)),
                _ => None,
            })
            .collect();
        assert_eq!(
            reported,
            vec![(0, (90.0, 40.0, 5.0), true), (1, (10.0, 10.0, 5.0), false)]
        );
        for (slot, placed) in result.container.layers()[0].blocks().iter().enumerate() {
            assert_eq!(reported[slot].1, placed.dimensions());
            assert_eq!(reported[slot].2, placed.is_rotated());
        }
    }

    #[test]
    fn rotation_can_be_disabled() {
        let config = PackingConfig::builder().allow_rotation(false).build();
        let mut container = Container::new(100.0, 50.0, 100.0).unwrap();
        let result = container.add_block_with(block(1, 40.0, 90.0, 5.0), &config);
        assert!(!result.is_placed());

        let result = container.add_block(block(1, 40.0, 90.0, 5.0));
        assert!(matches!(result, PlacementResult::Placed { rotated: true, .. }));
    }

    #[test]
    fn packing_is_deterministic() {
        let run = || {
            let container = Container::new(202.0, 120.0, 202.0).unwrap();
            let blocks = vec![
                block(1, 180.0, 77.0, 12.0),
                block(2, 77.0, 75.0, 12.0),
                block(3, 120.0, 76.0, 12.0),
                block(4, 30.0, 22.0, 8.0),
                block(5, 90.0, 22.0, 10.0),
            ];
            let result = pack_blocks(container, blocks, PackingConfig::default());
            result
                .container
                .layers()
                .iter()
                .flat_map(|l| l.blocks().iter().map(|b| (b.id(), b.footprint())))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn utilization_counts_placed_volume() {
        let mut container = Container::new(10.0, 10.0, 10.0).unwrap();
        container.add_block(block(1, 10.0, 10.0, 5.0));
        approx::assert_relative_eq!(container.utilization_percent(), 50.0);
    }
}
