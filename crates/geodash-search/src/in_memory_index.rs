//! `InMemoryIndex` - the per-worker structure built once from a `GeoStore` scan: an id map,
//! two name tries, a per-country inverted list, and an optional spatial index (spec §4.C).

use geodash_core::City;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::collections::HashMap;

#[derive(Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    terminal_ids: Vec<u32>,
}

impl TrieNode {
    fn insert(&mut self, key: &str, id: u32) {
        let mut node = self;
        for ch in key.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.terminal_ids.push(id);
    }

    fn node_at(&self, key: &str) -> Option<&TrieNode> {
        let mut node = self;
        for ch in key.chars() {
            node = node.children.get(&ch)?;
        }
        Some(node)
    }

    fn collect_ids(&self, out: &mut Vec<u32>) {
        out.extend_from_slice(&self.terminal_ids);
        for child in self.children.values() {
            child.collect_ids(out);
        }
    }
}

/// A city's coordinate, indexed by `rstar` for rectangle queries. Carries only the id; the
/// full `City` lives in `by_id` so the spatial index stays small.
#[derive(Clone, Copy, Debug)]
struct SpatialPoint {
    id: u32,
    lat: f64,
    lng: f64,
}

impl RTreeObject for SpatialPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

impl PointDistance for SpatialPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.lng - point[0];
        let dy = self.lat - point[1];
        dx * dx + dy * dy
    }
}

/// Per-process structure built by scanning a `GeoStore` once at worker start (spec §4.C).
/// Immutable after `build()`.
pub struct InMemoryIndex {
    by_id: HashMap<u32, City>,
    // Both tries key on `ascii_name` (spec §4.C build protocol inserts the same canonical
    // fold into each); kept as two structures in case future data carries distinct
    // display-name and ascii-name spellings worth indexing separately.
    name_trie: TrieNode,
    ascii_trie: TrieNode,
    country_cities: HashMap<String, Vec<u32>>,
    spatial_index: Option<RTree<SpatialPoint>>,
}

impl InMemoryIndex {
    /// Builds the index from an already-fetched row set (the caller streams `city_data` from
    /// the store; this just does the in-memory assembly, spec §4.C's "Build protocol").
    pub fn build(rows: Vec<City>, enable_spatial: bool) -> Self {
        let mut by_id = HashMap::with_capacity(rows.len());
        let mut name_trie = TrieNode::default();
        let mut ascii_trie = TrieNode::default();
        let mut country_cities: HashMap<String, Vec<u32>> = HashMap::new();
        let mut spatial_points = Vec::with_capacity(if enable_spatial { rows.len() } else { 0 });

        for city in rows {
            let id = city.id;
            let key = city.ascii_name.clone();
            name_trie.insert(&key, id);
            ascii_trie.insert(&key, id);
            country_cities.entry(city.country_code.to_lowercase()).or_default().push(id);
            if enable_spatial {
                spatial_points.push(SpatialPoint { id, lat: city.lat, lng: city.lng });
            }
            by_id.insert(id, city);
        }

        let spatial_index = enable_spatial.then(|| RTree::bulk_load(spatial_points));

        Self { by_id, name_trie, ascii_trie, country_cities, spatial_index }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&City> {
        self.by_id.get(&id)
    }

    /// Terminal-node lookup on both tries; duplicates removed (spec §4.C `exact`).
    pub fn exact(&self, query: &str) -> Vec<u32> {
        let mut ids = Vec::new();
        if let Some(node) = self.name_trie.node_at(query) {
            ids.extend_from_slice(&node.terminal_ids);
        }
        if let Some(node) = self.ascii_trie.node_at(query) {
            for id in &node.terminal_ids {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        }
        ids
    }

    /// Collects all terminal-id-lists under the trie node at `prefix`; intersected with
    /// `country_cities[country]` when `country` is given (spec §4.C `prefix`).
    pub fn prefix(&self, prefix: &str, country: Option<&str>) -> Vec<u32> {
        let mut ids = Vec::new();
        if let Some(node) = self.ascii_trie.node_at(prefix) {
            node.collect_ids(&mut ids);
        }
        ids.sort_unstable();
        ids.dedup();

        if let Some(country) = country {
            let allowed = self.country_cities.get(&country.to_lowercase());
            match allowed {
                Some(allowed) => {
                    let allowed: std::collections::HashSet<u32> = allowed.iter().copied().collect();
                    ids.retain(|id| allowed.contains(id));
                }
                None => ids.clear(),
            }
        }
        ids
    }

    /// Iterates `(ascii_name, id)` pairs, optionally restricted to one country - the
    /// candidate universe the fuzzy stage scores against (spec §4.C `iter_names`).
    pub fn iter_names<'a>(&'a self, country: Option<&str>) -> Box<dyn Iterator<Item = (&'a str, u32)> + 'a> {
        match country {
            Some(country) => {
                let ids = self.country_cities.get(&country.to_lowercase());
                match ids {
                    Some(ids) => Box::new(
                        ids.iter()
                            .filter_map(move |id| self.by_id.get(id).map(|c| (c.ascii_name.as_str(), *id))),
                    ),
                    None => Box::new(std::iter::empty()),
                }
            }
            None => Box::new(self.by_id.values().map(|c| (c.ascii_name.as_str(), c.id))),
        }
    }

    /// Candidate ids whose indexed point falls in the axis-aligned rectangle
    /// `[lat-lat_radius, lat+lat_radius] x [lng-lng_radius, lng+lng_radius]` (spec §4.E step
    /// 2). Returns `None` if no spatial auxiliary was built, signalling the caller to fall
    /// back to a full `by_id` scan.
    pub fn spatial_candidates(&self, lat: f64, lng: f64, lat_radius: f64, lng_radius: f64) -> Option<Vec<u32>> {
        let tree = self.spatial_index.as_ref()?;
        let envelope = AABB::from_corners(
            [lng - lng_radius, lat - lat_radius],
            [lng + lng_radius, lat + lat_radius],
        );
        Some(tree.locate_in_envelope(&envelope).map(|p| p.id).collect())
    }

    pub fn all_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_id.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(id: u32, name: &str, country: &str, lat: f64, lng: f64) -> City {
        City {
            id,
            name: name.to_string(),
            ascii_name: geodash_core::ascii_fold(name),
            country: country.to_string(),
            country_code: country.to_string(),
            state: None,
            state_code: None,
            lat,
            lng,
            population: None,
            timezone: None,
            geonames_id: None,
        }
    }

    fn sample_index() -> InMemoryIndex {
        InMemoryIndex::build(
            vec![
                city(1, "London", "GB", 51.5072, -0.1276),
                city(2, "Londonderry", "GB", 54.997, -7.309),
                city(3, "Paris", "FR", 48.8566, 2.3522),
            ],
            true,
        )
    }

    #[test]
    fn exact_matches_only_full_key() {
        let index = sample_index();
        assert_eq!(index.exact("london"), vec![1]);
    }

    #[test]
    fn prefix_matches_all_descendants() {
        let index = sample_index();
        let mut ids = index.prefix("london", None);
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn prefix_intersects_with_country_filter() {
        let index = sample_index();
        assert_eq!(index.prefix("london", Some("GB")), vec![1, 2]);
        assert!(index.prefix("london", Some("FR")).is_empty());
    }

    #[test]
    fn unknown_prefix_is_empty() {
        let index = sample_index();
        assert!(index.prefix("zzz", None).is_empty());
    }

    #[test]
    fn spatial_candidates_returns_points_in_rectangle() {
        let index = sample_index();
        let candidates = index.spatial_candidates(51.5, -0.1, 1.0, 1.0).unwrap();
        assert!(candidates.contains(&1));
        assert!(!candidates.contains(&3));
    }

    #[test]
    fn spatial_candidates_none_when_disabled() {
        let index = InMemoryIndex::build(vec![city(1, "London", "GB", 51.5, -0.1)], false);
        assert!(index.spatial_candidates(51.5, -0.1, 1.0, 1.0).is_none());
    }
}
