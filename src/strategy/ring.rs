use std::collections::{BTreeMap, HashSet};

use crate::cluster::{Broker, BrokerId, Error, Result};

/// Cyclic order of broker IDs, interleaving failure domains.
///
/// Brokers are grouped by rack, sorted by ID inside each rack, and taken one
/// rack at a time (racks ordered by label) at increasing depth. Brokers
/// without a rack share the empty label and form one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring(Vec<BrokerId>);

impl Ring {
    pub fn build(brokers: &[Broker]) -> Result<Self> {
        if brokers.is_empty() {
            return Err(Error::EmptyTopology);
        }

        let mut seen = HashSet::with_capacity(brokers.len());
        let mut racks: BTreeMap<&str, Vec<BrokerId>> = BTreeMap::new();
        for broker in brokers {
            if !seen.insert(broker.id) {
                return Err(Error::DuplicateBroker(broker.id));
            }
            racks.entry(broker.rack.as_str()).or_default().push(broker.id);
        }

        let mut racks = racks.into_values().collect::<Vec<_>>();
        for ids in &mut racks {
            ids.sort_unstable();
        }

        let depth = racks.iter().map(Vec::len).max().unwrap_or_default();
        let ring = (0..depth)
            .flat_map(|k| racks.iter().filter_map(move |ids| ids.get(k).copied()))
            .collect();

        Ok(Self(ring))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[BrokerId] {
        &self.0
    }

    /// Ring position of a broker.
    pub fn position(&self, id: BrokerId) -> Option<usize> {
        self.0.iter().position(|b| *b == id)
    }

    /// The `len` brokers following `start` (inclusive), wrapping around.
    ///
    /// Callers must keep `len <= self.len()` for the entries to be distinct.
    pub fn window(&self, start: usize, len: usize) -> Vec<BrokerId> {
        let n = self.0.len();
        (0..len).map(|j| self.0[(start + j) % n]).collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::*;

    fn brokers(layout: &[(BrokerId, &str)]) -> Vec<Broker> {
        layout.iter().map(|(id, rack)| Broker::new(*id, *rack)).collect()
    }

    #[test]
    fn interleaves_racks() {
        let ring = Ring::build(&brokers(&[(1, "A"), (2, "A"), (3, "B")])).unwrap();
        assert_eq!(ring.as_slice(), &[1, 3, 2]);

        let ring = Ring::build(&brokers(&[
            (6, "c"),
            (5, "b"),
            (4, "a"),
            (3, "c"),
            (2, "b"),
            (1, "a"),
            (7, "a"),
        ]))
        .unwrap();
        assert_eq!(ring.as_slice(), &[1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn no_rack_is_round_robin_by_id() {
        let ring = Ring::build(&brokers(&[(3, ""), (1, ""), (2, "")])).unwrap();
        assert_eq!(ring.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn empty_rack_is_its_own_domain() {
        let ring = Ring::build(&brokers(&[(1, "a"), (2, "a"), (3, "")])).unwrap();
        assert_eq!(ring.as_slice(), &[3, 1, 2]);
    }

    #[test]
    fn rejects_bad_topologies() {
        assert_matches!(Ring::build(&[]), Err(Error::EmptyTopology));
        assert_matches!(
            Ring::build(&brokers(&[(1, "a"), (2, "b"), (1, "c")])),
            Err(Error::DuplicateBroker(1))
        );
    }

    #[test]
    fn window_wraps() {
        let ring = Ring::build(&brokers(&[(1, ""), (2, ""), (3, "")])).unwrap();
        assert_eq!(ring.window(2, 3), vec![3, 1, 2]);
        assert_eq!(ring.window(1, 1), vec![2]);
        assert_eq!(ring.position(3), Some(2));
        assert_eq!(ring.position(9), None);
    }

    fn arb_brokers() -> impl Strategy<Value = Vec<Broker>> {
        proptest::collection::btree_map(0..1000i32, 0..4u8, 1..40).prop_map(|m| {
            m.into_iter()
                .map(|(id, rack)| Broker::new(id, format!("r{rack}")))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn ring_is_permutation(brokers in arb_brokers()) {
            let ring = Ring::build(&brokers).unwrap();
            prop_assert_eq!(ring.len(), brokers.len());

            let mut got = ring.as_slice().to_vec();
            got.sort_unstable();
            let mut want = brokers.iter().map(|b| b.id).collect::<Vec<_>>();
            want.sort_unstable();
            prop_assert_eq!(got, want);
        }

        #[test]
        fn first_cycle_spans_every_rack(brokers in arb_brokers()) {
            let ring = Ring::build(&brokers).unwrap();
            let racks = brokers
                .iter()
                .map(|b| (b.id, b.rack.as_str()))
                .collect::<std::collections::HashMap<_, _>>();
            let domains = racks.values().collect::<HashSet<_>>().len();

            let window = ring.window(0, domains);
            let distinct = window.iter().map(|id| racks[id]).collect::<HashSet<_>>();
            prop_assert_eq!(distinct.len(), domains);
        }
    }
}
