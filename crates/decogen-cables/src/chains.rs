use crate::bulbs::{
    bulb_parameters, bulb_up_direction, light_source_indices, up_blend_weight, Bulb,
};
use crate::curve::{
    build_curve, cable_thickness, curve_point, normalize_or_zero, to_vec3, Anchor, CableMeshStore,
};
use crate::pool::{BulbId, BulbKind, BulbPool, CableCatalog};
use decogen_core::geom::Vec3;
use decogen_core::model::{BulbSetType, BulbSetting, ChainSetting};
use decogen_core::report::{LoadReport, Warning};
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;

/// Outbound notifications. Consumers subscribe explicitly; every method has
/// a default no-op so observers implement only what they care about. Calls
/// are synchronous and fire-and-forget.
pub trait ChainObserver {
    /// Savable settings after any mutating operation (the save system hook).
    fn settings_modified(&mut self, _savable: &[ChainSetting]) {}

    /// Full settings plus the in-progress chain, after a chain edit.
    fn chain_changed(&mut self, _all: &[ChainSetting], _pending: &[BulbSetting]) {}

    /// A bulb went invisible/pooled; the spatial-overlap cache evicts it.
    fn bulb_hidden(&mut self, _bulb: BulbId) {}
}

/// Owns all cable-chain runtime state: the bulb arena, both bulb pools, the
/// cable mesh store, per-curve and per-chain membership maps, and the
/// persisted settings arena. Constructed explicitly and passed by reference;
/// there is no global instance.
pub struct ChainEngine {
    catalog: CableCatalog,
    bulbs: Vec<Bulb>,
    hook_pool: BulbPool,
    inline_pool: BulbPool,
    cables: CableMeshStore,
    curve_to_bulbs: HashMap<i32, Vec<BulbId>>,
    chain_to_bulbs: HashMap<usize, Vec<BulbId>>,
    bulb_order: Vec<BulbId>,
    settings: Vec<ChainSetting>,
    chain_ids: Vec<usize>,
    pending_settings: Vec<BulbSetting>,
    current_set_type: BulbSetType,
    current_chain: usize,
    next_chain_id: usize,
    last_curve_index: i32,
    last_bulb: Option<BulbId>,
    pending_save: bool,
    current_seed: i32,
    observers: Vec<Box<dyn ChainObserver>>,
}

impl ChainEngine {
    pub fn new(catalog: CableCatalog) -> Self {
        Self {
            catalog,
            bulbs: Vec::new(),
            hook_pool: BulbPool::default(),
            inline_pool: BulbPool::default(),
            cables: CableMeshStore::default(),
            curve_to_bulbs: HashMap::new(),
            chain_to_bulbs: HashMap::new(),
            bulb_order: Vec::new(),
            settings: Vec::new(),
            chain_ids: Vec::new(),
            pending_settings: Vec::new(),
            current_set_type: BulbSetType::RegularBulbs,
            current_chain: 0,
            next_chain_id: 0,
            last_curve_index: 0,
            last_bulb: None,
            pending_save: false,
            current_seed: 0,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn ChainObserver>) {
        self.observers.push(observer);
    }

    pub fn set_bulb_type(&mut self, set_type: BulbSetType) {
        self.current_set_type = set_type;
    }

    /// Start a fresh chain. The seed comes from the interaction layer and is
    /// persisted verbatim; the engine itself never draws randomness.
    pub fn begin_chain(&mut self, seed: i32) {
        self.pending_settings.clear();
        self.current_chain = self.next_chain_id;
        self.next_chain_id += 1;
        self.current_seed = seed;
        self.pending_save = true;
        self.last_bulb = None;
    }

    /// Spawn an anchor-mounted bulb. Returns None (and spawns nothing) when
    /// the current set type has no prototype and no pooled bulb.
    pub fn place_hook_bulb(
        &mut self,
        position: Point3<f32>,
        contact_normal: Vector3<f32>,
        price: f32,
    ) -> Option<BulbId> {
        let weight = self
            .catalog
            .get(self.current_set_type)
            .map(|p| p.up_lerp_weight)
            .unwrap_or(0.01);
        let id = self.acquire_bulb(BulbKind::Hook)?;

        let curve_index = self.last_curve_index;
        let chain = self.current_chain;
        let bulb = &mut self.bulbs[id];
        bulb.position = position;
        bulb.up = bulb_up_direction(&normalize_or_zero(contact_normal), weight);
        bulb.placed = true;
        bulb.visible = true;
        bulb.price = price;
        bulb.chain_index = chain;
        bulb.curve_index = curve_index;

        self.last_bulb = Some(id);
        self.bulb_order.push(id);
        self.chain_to_bulbs.entry(chain).or_default().push(id);
        self.assign_light_sources();
        Some(id)
    }

    /// Rebuild or extend one curve segment: re-tessellates the cable mesh in
    /// place, records/updates the anchors' tension in the settings, and
    /// spawns or repositions the bulbs hanging on the curve.
    ///
    /// `generating_new` extends the chain with a fresh curve index and a new
    /// hook bulb at `b`; otherwise segment `index` is rebuilt (tension drag).
    /// `from_load` suppresses change notifications while replaying saves.
    pub fn generate_cable(
        &mut self,
        a: Anchor,
        b: Anchor,
        tension: f32,
        price: f32,
        generating_new: bool,
        index: i32,
        from_load: bool,
    ) {
        let down = normalize_or_zero(a.tangent + b.tangent);
        let left = normalize_or_zero(normalize_or_zero(b.position - a.position).cross(&down));
        let points = build_curve(&a, &b, tension);

        let cable_index = if generating_new {
            self.last_curve_index + 1
        } else {
            index
        };
        if !self.cables.has_live(cable_index) {
            self.last_curve_index = cable_index;
        }
        let thickness = cable_thickness(self.current_set_type);
        let mesh = self.cables.get_or_make(thickness, cable_index);
        mesh.tessellate(&points, left, down * 1.25);

        self.update_cable_settings(&a, &b, tension, price);

        if generating_new {
            self.place_hook_bulb(b.position, b.tangent, price);
            self.spawn_bulbs_between(&a, &b, tension, price, cable_index);
            self.assign_light_sources();
        } else {
            self.spawn_bulbs_between(&a, &b, tension, price, cable_index);
        }

        if !from_load {
            self.notify_chain_changed();
        }
    }

    /// Undo the newest curve segment: its mesh and bulbs return to their
    /// pools.
    pub fn hide_last_cable(&mut self) {
        let Some(cable_index) = self.cables.release_last() else {
            return;
        };
        if let Some(ids) = self.curve_to_bulbs.remove(&cable_index) {
            for id in ids {
                self.release_bulb(id);
            }
        }
        self.last_curve_index -= 1;
    }

    /// Remove one bulb interactively (the newest hook while adjusting).
    pub fn remove_bulb(&mut self, id: BulbId) {
        self.release_bulb(id);
        if self.last_bulb == Some(id) {
            self.last_bulb = None;
        }
        self.assign_light_sources();
        self.pending_settings.pop();
        self.notify_chain_changed();
    }

    /// Commit the in-progress chain to the settings arena. A chain with
    /// fewer than two anchors is discarded instead: its bulbs go back to
    /// their pools.
    pub fn commit_chain(&mut self) {
        if self.pending_save {
            if self.pending_settings.len() > 1 {
                let price = self.visible_bulb_expenses();
                let base_price = self.base_price();
                self.settings.push(ChainSetting::new(
                    self.pending_settings.clone(),
                    price,
                    base_price,
                    self.current_seed,
                ));
                self.chain_ids.push(self.current_chain);
            } else if let Some(ids) = self.chain_to_bulbs.remove(&self.current_chain) {
                for id in ids {
                    self.release_bulb(id);
                }
                self.assign_light_sources();
            }
            self.pending_save = false;
        }
        self.notify_settings_modified();
    }

    /// Soft-delete a committed chain: the record stays in memory for undo
    /// (flagged not_savable), every bulb returns to its pool, and both
    /// membership maps forget the chain. Light sources are redistributed
    /// over the remaining global bulb set.
    pub fn remove_chain(&mut self, index: usize) {
        if index >= self.settings.len() {
            return;
        }
        self.settings[index].not_savable = true;
        let chain_id = self.chain_ids[index];
        if let Some(ids) = self.chain_to_bulbs.remove(&chain_id) {
            for id in ids {
                self.release_bulb(id);
            }
        }
        self.assign_light_sources();
        self.pending_settings.clear();
        self.notify_settings_modified();
        self.notify_chain_changed();
    }

    pub fn set_turned_on(&mut self, index: usize, turned_on: bool) {
        if index >= self.settings.len() {
            return;
        }
        self.settings[index].turned_on = turned_on;
        self.notify_settings_modified();
    }

    /// Replay persisted chains. Malformed records are skipped with a
    /// warning; the rest of the load always continues.
    pub fn load(&mut self, chains: Vec<ChainSetting>) -> LoadReport {
        let mut report = LoadReport::default();
        let bulbs_before = self.bulb_order.len();

        for (n, chain) in chains.into_iter().enumerate() {
            if let Err(err) = chain.validate() {
                report.chains_skipped += 1;
                report
                    .warnings
                    .push(Warning::new("invalid_chain", format!("chain {n}: {err}")));
                continue;
            }
            let first_type = chain.settings[0].set_type;
            if self.catalog.get(first_type).is_none() {
                report.warnings.push(Warning::new(
                    "unconfigured_set_type",
                    format!("chain {n}: no prototype for {first_type:?}, loading without bulbs"),
                ));
            }

            self.set_bulb_type(first_type);
            self.begin_chain(chain.seed);
            for j in 0..chain.settings.len() - 1 {
                let s0 = chain.settings[j];
                let s1 = chain.settings[j + 1];
                self.set_bulb_type(s0.set_type);
                let a = Anchor::from_setting(&s0);
                let b = Anchor::from_setting(&s1);
                if j < 1 {
                    self.place_hook_bulb(a.position, a.tangent, s0.price);
                }
                self.generate_cable(a, b, s1.tension, s0.price, true, 0, true);
                report.cables_built += 1;
            }

            self.pending_settings = chain.settings.clone();
            self.settings.push(chain);
            self.chain_ids.push(self.current_chain);
            report.chains_loaded += 1;
        }

        self.pending_save = false;
        report.bulbs_placed = self.bulb_order.len() - bulbs_before;
        self.notify_chain_changed();
        report
    }

    /// Settings eligible for persistence (soft-deleted chains excluded).
    pub fn savable_settings(&self) -> Vec<ChainSetting> {
        self.settings
            .iter()
            .filter(|s| !s.not_savable)
            .cloned()
            .collect()
    }

    /// Redistribute the light-source role over the global ordered bulb set.
    pub fn assign_light_sources(&mut self) {
        for &id in &self.bulb_order {
            self.bulbs[id].is_light_source = false;
        }
        for i in light_source_indices(self.bulb_order.len()) {
            let id = self.bulb_order[i];
            self.bulbs[id].is_light_source = true;
        }
    }

    pub fn visible_bulb_expenses(&self) -> f32 {
        self.chain_to_bulbs
            .get(&self.current_chain)
            .map(|ids| ids.iter().map(|id| self.bulbs[*id].price).sum())
            .unwrap_or(0.0)
    }

    /// Projected cost of the next segment at the current set's density.
    pub fn next_cable_expenses(&self, single_bulb_price: f32, distance: f32) -> f32 {
        let Some(params) = self.catalog.get(self.current_set_type) else {
            return 0.0;
        };
        let on_cable = (distance * params.bulb_density).floor();
        single_bulb_price * (on_cable + 1.0)
    }

    fn base_price(&self) -> f32 {
        self.chain_to_bulbs
            .get(&self.current_chain)
            .and_then(|ids| ids.first())
            .map(|id| self.bulbs[*id].price)
            .unwrap_or(0.0)
    }

    fn acquire_bulb(&mut self, kind: BulbKind) -> Option<BulbId> {
        let pool = match kind {
            BulbKind::Hook => &mut self.hook_pool,
            BulbKind::Inline => &mut self.inline_pool,
        };
        if let Some(id) = pool.acquire(self.current_set_type) {
            let bulb = &mut self.bulbs[id];
            bulb.visible = true;
            bulb.chain_index = self.current_chain;
            return Some(id);
        }
        // no pooled bulb: instantiate from the prototype, or skip silently
        self.catalog.get(self.current_set_type)?;
        let id = self.bulbs.len();
        self.bulbs
            .push(Bulb::new(id, self.current_set_type, kind, self.current_chain));
        Some(id)
    }

    fn release_bulb(&mut self, id: BulbId) {
        let (set_type, kind, curve_index, chain_index) = {
            let bulb = &mut self.bulbs[id];
            bulb.visible = false;
            bulb.placed = false;
            bulb.is_light_source = false;
            (bulb.set_type, bulb.kind, bulb.curve_index, bulb.chain_index)
        };
        match kind {
            BulbKind::Hook => self.hook_pool.release(set_type, id),
            BulbKind::Inline => self.inline_pool.release(set_type, id),
        }
        self.bulb_order.retain(|b| *b != id);
        let emptied = self
            .curve_to_bulbs
            .get_mut(&curve_index)
            .map(|ids| {
                ids.retain(|b| *b != id);
                ids.is_empty()
            })
            .unwrap_or(false);
        if emptied {
            self.curve_to_bulbs.remove(&curve_index);
        }
        // both membership maps must forget a pooled bulb, or a later chain
        // removal would release it twice and the pool would hand the same
        // arena slot to two chains
        let chain_emptied = self
            .chain_to_bulbs
            .get_mut(&chain_index)
            .map(|ids| {
                ids.retain(|b| *b != id);
                ids.is_empty()
            })
            .unwrap_or(false);
        if chain_emptied {
            self.chain_to_bulbs.remove(&chain_index);
        }
        self.notify_bulb_hidden(id);
    }

    fn spawn_bulbs_between(
        &mut self,
        a: &Anchor,
        b: &Anchor,
        tension: f32,
        price: f32,
        cable_index: i32,
    ) {
        let Some(params) = self.catalog.get(self.current_set_type).cloned() else {
            return;
        };
        let distance = (a.position - b.position).norm();
        let parameters = bulb_parameters(distance, params.bulb_density);
        let weight = up_blend_weight(&a.tangent, &b.tangent, params.up_lerp_weight);
        let up = bulb_up_direction(&a.tangent, weight);

        if let Some(existing) = self.curve_to_bulbs.get(&cable_index).cloned() {
            // curve already populated: reposition its bulbs in place
            for (slot, t) in parameters.iter().enumerate() {
                let Some(&id) = existing.get(slot) else { break };
                let bulb = &mut self.bulbs[id];
                bulb.position = curve_point(a, b, tension, *t);
                bulb.up = up;
            }
            return;
        }

        let mut on_cable = Vec::new();
        for t in parameters {
            let position = curve_point(a, b, tension, t);
            let Some(id) = self.acquire_bulb(BulbKind::Inline) else {
                continue;
            };
            let chain = self.current_chain;
            let bulb = &mut self.bulbs[id];
            bulb.position = position;
            bulb.up = up;
            bulb.placed = true;
            bulb.visible = true;
            bulb.price = price;
            bulb.chain_index = chain;
            bulb.curve_index = cable_index;
            on_cable.push(id);
            self.bulb_order.push(id);
            self.chain_to_bulbs.entry(chain).or_default().push(id);
        }
        self.curve_to_bulbs.insert(cable_index, on_cable);
    }

    /// Keep the persisted tension in step with the rebuilt curve: a matching
    /// committed anchor is updated in place, otherwise the in-progress chain
    /// gains or updates records for both anchors.
    fn update_cable_settings(&mut self, a: &Anchor, b: &Anchor, tension: f32, price: f32) {
        let b_pos = to_vec3(&b.position);
        for chain in self.settings.iter_mut() {
            for setting in chain.settings.iter_mut() {
                if setting.position_matches(&b_pos) {
                    setting.tension = tension;
                    return;
                }
            }
        }

        for anchor in [a, b] {
            let pos = to_vec3(&anchor.position);
            if let Some(setting) = self
                .pending_settings
                .iter_mut()
                .find(|s| s.position_matches(&pos))
            {
                setting.tension = tension;
            } else {
                let t = anchor.tangent;
                self.pending_settings.push(BulbSetting {
                    position: pos,
                    tangent: Vec3::new(t.x, t.y, t.z),
                    tension,
                    curve_index: self.last_curve_index,
                    price,
                    set_type: self.current_set_type,
                });
            }
        }
    }

    fn notify_settings_modified(&mut self) {
        let savable = self.savable_settings();
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            observer.settings_modified(&savable);
        }
        self.observers = observers;
    }

    fn notify_chain_changed(&mut self) {
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            observer.chain_changed(&self.settings, &self.pending_settings);
        }
        self.observers = observers;
    }

    fn notify_bulb_hidden(&mut self, id: BulbId) {
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            observer.bulb_hidden(id);
        }
        self.observers = observers;
    }

    // accessors, mainly for consumers that render or test the state

    pub fn bulb(&self, id: BulbId) -> &Bulb {
        &self.bulbs[id]
    }

    pub fn bulb_order(&self) -> &[BulbId] {
        &self.bulb_order
    }

    pub fn cables(&self) -> &CableMeshStore {
        &self.cables
    }

    pub fn settings(&self) -> &[ChainSetting] {
        &self.settings
    }

    pub fn pending_settings(&self) -> &[BulbSetting] {
        &self.pending_settings
    }

    pub fn curve_bulbs(&self, curve_index: i32) -> Option<&[BulbId]> {
        self.curve_to_bulbs.get(&curve_index).map(Vec::as_slice)
    }

    pub fn chain_bulbs(&self, chain_id: usize) -> Option<&[BulbId]> {
        self.chain_to_bulbs.get(&chain_id).map(Vec::as_slice)
    }

    pub fn chain_id_for_setting(&self, index: usize) -> Option<usize> {
        self.chain_ids.get(index).copied()
    }

    pub fn pooled_bulb_count(&self) -> usize {
        self.hook_pool.len() + self.inline_pool.len()
    }
}
