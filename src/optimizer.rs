//! Packing engine: first-fit-decreasing over volume and weight.
//!
//! Every container of a run is an instance of the same `ContainerSpec`.
//! Items are only tracked by their aggregate volume and weight; there is no
//! spatial placement. `PackBatch::new` checks the input contract once; the
//! run itself then proceeds in three phases:
//! - unfit classification of every item against the container spec
//! - stable sort by descending volume
//! - first-fit assignment, scanning open containers in creation order

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::model::{ContainerSpec, Item, ValidationError};

/// Caller contract violations detected before packing starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackError {
    #[error("Item {id} is invalid: {source}")]
    InvalidItem {
        id: usize,
        #[source]
        source: ValidationError,
    },
    #[error("Item id {0} occurs more than once")]
    DuplicateItemId(usize),
    #[error("Item {id} weighs {weight}, more than the container weight capacity of {capacity}")]
    ItemTooHeavy {
        id: usize,
        weight: f64,
        capacity: f64,
    },
}

/// Why an item can never be placed in a container of the run's type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnfitReason {
    DimensionsExceedContainer,
    DegenerateCapacity,
}

impl UnfitReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnfitReason::DimensionsExceedContainer => "dimensions_exceed_container",
            UnfitReason::DegenerateCapacity => "degenerate_capacity",
        }
    }
}

impl fmt::Display for UnfitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnfitReason::DimensionsExceedContainer => {
                write!(f, "Item exceeds the container in at least one dimension")
            }
            UnfitReason::DegenerateCapacity => {
                write!(f, "Container has no usable finite volume")
            }
        }
    }
}

/// An item that cannot be placed in any container of the run.
#[derive(Clone, Debug, PartialEq)]
pub struct UnfitItem {
    pub id: usize,
    pub reason: UnfitReason,
}

/// A container opened during a run, with the items assigned to it.
///
/// `items` is in assignment order. The capacities are copies of the run's
/// values so the container can be reported on its own.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedContainer {
    pub id: usize,
    pub items: Vec<usize>,
    pub used_volume: f64,
    pub used_weight: f64,
    pub volume_capacity: f64,
    pub weight_capacity: f64,
}

impl PackedContainer {
    fn open(id: usize, volume_capacity: f64, weight_capacity: f64) -> Self {
        Self {
            id,
            items: Vec::new(),
            used_volume: 0.0,
            used_weight: 0.0,
            volume_capacity,
            weight_capacity,
        }
    }

    /// Both limits are inclusive.
    pub fn can_accept(&self, volume: f64, weight: f64) -> bool {
        self.used_volume + volume <= self.volume_capacity
            && self.used_weight + weight <= self.weight_capacity
    }

    fn assign(&mut self, id: usize, volume: f64, weight: f64) {
        self.items.push(id);
        self.used_volume += volume;
        self.used_weight += weight;
    }

    pub fn residual_volume(&self) -> f64 {
        self.volume_capacity - self.used_volume
    }

    pub fn residual_weight(&self) -> f64 {
        self.weight_capacity - self.used_weight
    }

    /// Volume usage in percent (0.0 to 100.0).
    pub fn volume_utilization_percent(&self) -> f64 {
        if self.volume_capacity <= 0.0 {
            return 0.0;
        }
        (self.used_volume / self.volume_capacity) * 100.0
    }
}

/// Outcome of a packing run.
///
/// Either `unfit` is empty and every item sits in exactly one container, or
/// `unfit` lists the offending items and `containers` is empty.
#[derive(Clone, Debug, PartialEq)]
pub struct PackingPlan {
    pub containers: Vec<PackedContainer>,
    pub unfit: Vec<UnfitItem>,
}

impl PackingPlan {
    fn empty() -> Self {
        Self {
            containers: Vec::new(),
            unfit: Vec::new(),
        }
    }

    /// Whether every item was packed.
    pub fn is_complete(&self) -> bool {
        self.unfit.is_empty()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn unfit_count(&self) -> usize {
        self.unfit.len()
    }

    pub fn unfit_ids(&self) -> Vec<usize> {
        self.unfit.iter().map(|u| u.id).collect()
    }

    /// Average volume usage over all containers, in percent.
    pub fn average_utilization(&self) -> f64 {
        if self.containers.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .containers
            .iter()
            .map(|c| c.volume_utilization_percent())
            .sum();
        sum / self.containers.len() as f64
    }

    pub fn total_packed_weight(&self) -> f64 {
        self.containers.iter().map(|c| c.used_weight).sum()
    }
}

/// Progress events emitted while packing, used for live streaming.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A new container was opened.
    ContainerOpened {
        id: usize,
        volume_capacity: f64,
        weight_capacity: f64,
    },
    /// An item was assigned to a container.
    ItemAssigned {
        container_id: usize,
        item_id: usize,
        volume: f64,
        weight: f64,
        used_volume: f64,
        used_weight: f64,
    },
    /// An item can never be placed; the run will produce no containers.
    ItemRejected {
        item_id: usize,
        reason_code: String,
        reason_text: String,
    },
    /// Packing finished.
    Finished { containers: usize, unfit: usize },
}

/// An item paired with its volume for the duration of one run.
struct SizedItem<'a> {
    item: &'a Item,
    volume: f64,
}

/// An item list checked against one container spec, ready to pack.
///
/// Holding a `PackBatch` means the ids are unique, every item value is
/// positive and finite and no item alone outweighs the container, so packing
/// it cannot fail.
#[derive(Clone, Debug)]
pub struct PackBatch {
    spec: ContainerSpec,
    items: Vec<Item>,
}

impl PackBatch {
    /// Checks `items` against `spec`.
    ///
    /// The spec's dimensions are not validated; a zero, negative or
    /// non-finite volume makes every item unfit instead.
    pub fn new(spec: ContainerSpec, items: Vec<Item>) -> Result<Self, PackError> {
        validate_items(&spec, &items)?;
        Ok(Self { spec, items })
    }

    pub fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Packs the batch into as few containers as the heuristic finds.
    pub fn pack(&self) -> PackingPlan {
        self.pack_with_progress(|_| {})
    }

    /// Like `pack`, but reports each step to `on_event`.
    pub fn pack_with_progress(&self, mut on_event: impl FnMut(&PackEvent)) -> PackingPlan {
        let spec = &self.spec;
        let items = &self.items;

        if items.is_empty() {
            on_event(&PackEvent::Finished {
                containers: 0,
                unfit: 0,
            });
            return PackingPlan::empty();
        }

        let volume_capacity = spec.volume_capacity();
        let weight_capacity = spec.max_weight;

        let unfit: Vec<UnfitItem> = items
            .iter()
            .filter_map(|item| {
                classify_unfit(spec, volume_capacity, item).map(|reason| UnfitItem {
                    id: item.id,
                    reason,
                })
            })
            .collect();

        if !unfit.is_empty() {
            for entry in &unfit {
                debug!(item_id = entry.id, reason = entry.reason.code(), "item rejected");
                on_event(&PackEvent::ItemRejected {
                    item_id: entry.id,
                    reason_code: entry.reason.code().to_string(),
                    reason_text: entry.reason.to_string(),
                });
            }
            on_event(&PackEvent::Finished {
                containers: 0,
                unfit: unfit.len(),
            });
            info!(
                items = items.len(),
                unfit = unfit.len(),
                "packing aborted, unfit items present"
            );
            return PackingPlan {
                containers: Vec::new(),
                unfit,
            };
        }

        let mut sized: Vec<SizedItem<'_>> = items
            .iter()
            .map(|item| SizedItem {
                item,
                volume: item.volume(),
            })
            .collect();
        // `sort_by` is stable: equal volumes keep their input order.
        sized.sort_by(|a, b| b.volume.total_cmp(&a.volume));

        let mut containers: Vec<PackedContainer> = Vec::new();

        for SizedItem { item, volume } in sized {
            let idx = match containers
                .iter()
                .position(|c| c.can_accept(volume, item.weight))
            {
                Some(idx) => idx,
                None => {
                    let id = containers.len() + 1;
                    containers.push(PackedContainer::open(id, volume_capacity, weight_capacity));
                    debug!(container_id = id, "container opened");
                    on_event(&PackEvent::ContainerOpened {
                        id,
                        volume_capacity,
                        weight_capacity,
                    });
                    containers.len() - 1
                }
            };

            let container = &mut containers[idx];
            container.assign(item.id, volume, item.weight);
            debug!(
                container_id = container.id,
                item_id = item.id,
                used_volume = container.used_volume,
                used_weight = container.used_weight,
                "item assigned"
            );
            on_event(&PackEvent::ItemAssigned {
                container_id: container.id,
                item_id: item.id,
                volume,
                weight: item.weight,
                used_volume: container.used_volume,
                used_weight: container.used_weight,
            });
        }

        on_event(&PackEvent::Finished {
            containers: containers.len(),
            unfit: 0,
        });
        info!(
            items = items.len(),
            containers = containers.len(),
            "packing finished"
        );

        PackingPlan {
            containers,
            unfit: Vec::new(),
        }
    }
}

/// Packs `items` into containers of type `spec` in one call.
///
/// # Returns
/// `Ok(PackingPlan)` with either containers or unfit items,
/// `Err(PackError)` if the item list violates the input contract
#[allow(dead_code)]
pub fn pack_items(spec: &ContainerSpec, items: &[Item]) -> Result<PackingPlan, PackError> {
    Ok(PackBatch::new(*spec, items.to_vec())?.pack())
}

/// Checks item values, id uniqueness and per-item weight in input order.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
fn validate_items(spec: &ContainerSpec, items: &[Item]) -> Result<(), PackError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        item.validate()
            .map_err(|source| PackError::InvalidItem { id: item.id, source })?;
        if !seen.insert(item.id) {
            return Err(PackError::DuplicateItemId(item.id));
        }
        // Also rejects every item when the capacity is NaN.
        if !(item.weight <= spec.max_weight) {
            return Err(PackError::ItemTooHeavy {
                id: item.id,
                weight: item.weight,
                capacity: spec.max_weight,
            });
        }
    }
    Ok(())
}

/// Decides whether `item` can never be placed, looking only at its
/// dimensions and the container spec.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
fn classify_unfit(spec: &ContainerSpec, volume_capacity: f64, item: &Item) -> Option<UnfitReason> {
    if !spec.fits_dimensions(item) {
        return Some(UnfitReason::DimensionsExceedContainer);
    }
    // Also catches NaN and a product that overflowed to infinity.
    if !(volume_capacity > 0.0 && volume_capacity.is_finite()) {
        return Some(UnfitReason::DegenerateCapacity);
    }
    None
}
