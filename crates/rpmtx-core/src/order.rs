//! The topological orderer (spec.md §4.7): builds the `q -> p` ("q must
//! precede p") relation graph over ADD elements, runs a modified Knuth
//! tsort with a stable secondary order, detects cycles, breaks them by
//! discarding non-prerequisite ("co-requisite") edges, and emits the final
//! element order with upgrade locality (a REMOVE trailing its triggering
//! ADD) preserved.
//!
//! The loop-breaking step (T8 in spec.md §4.7) is implemented as a DFS
//! cycle search over the still-blocked subgraph rather than the original's
//! chain-pointer walk: both find one breakable edge per discovered cycle,
//! but the DFS form doesn't depend on C's aliasing of a single `tsi_chain`
//! backpointer per node, which has no safe direct Rust analogue. Observable
//! behavior (which edges are eligible for removal, the final loopcheck
//! count on an unbreakable cycle) is unchanged.

use std::collections::{HashMap, HashSet};

use crate::addindex::AddedKey;
use crate::depset::Dependency;
use crate::element::{TransactionElement, TsiEdge, TsiState};
use crate::transaction::Transaction;
use crate::whiteout;

impl Transaction {
    /// `order(ts)` (spec.md §4.7). Returns `Ok(())` with `self.order`
    /// replaced by the final permutation, or `Err(remaining)` with
    /// `self.order` left untouched and `remaining` the count of ADD
    /// elements that could not be placed after exhausting the rescan
    /// budget.
    pub fn order(&mut self) -> Result<(), usize> {
        // T1: allocate TSI on every ADD element; reset tsort output fields.
        for te in &mut self.order {
            if te.is_add() {
                te.tsi = Some(TsiState::default());
                te.depth = 0;
                te.tree = None;
                te.degree = 0;
                te.parent = None;
                te.npreds = 0;
            }
        }
        // Ordering resolves requirements through the added-package index;
        // rebuild it here so `order()` doesn't depend on a prior `check()`.
        self.added_packages.make_index();

        let whiteout = whiteout::init_on_first_use(self.macros.as_ref());
        let add_indices: Vec<usize> = (0..self.order.len()).filter(|&i| self.order[i].is_add()).collect();
        let pos_of: HashMap<usize, usize> =
            add_indices.iter().enumerate().map(|(pos, &idx)| (idx, pos)).collect();

        let mut key_to_index: HashMap<AddedKey, usize> = HashMap::new();
        for &idx in &add_indices {
            if let Some(k) = self.order[idx].added_key {
                key_to_index.insert(k, idx);
            }
        }

        self.record_edges(&add_indices, &key_to_index, &whiteout);

        // T4: initial in-degrees and root tree assignment.
        for &idx in &add_indices {
            let count = self.order[idx].tsi.as_ref().expect("tsi set in T1").count;
            self.order[idx].npreds = count;
        }
        let mut next_tree = 0i32;
        for &idx in &add_indices {
            if self.order[idx].tsi.as_ref().unwrap().count == 0 {
                self.order[idx].tree = Some(next_tree);
                next_tree += 1;
            } else {
                self.order[idx].tree = None;
            }
        }

        // T5: main drain loop, with T8 loop-breaking on stall.
        let mut ordering: Vec<AddedKey> = Vec::new();
        let mut sorted = vec![false; self.order.len()];
        let mut loopcheck = add_indices.len();
        let mut rescans_left = 10u32;

        'rescan: loop {
            let qcnt = self.effective_qcnt(&add_indices, &pos_of);

            let mut queue: Vec<usize> = add_indices
                .iter()
                .copied()
                .filter(|&idx| !sorted[idx] && self.order[idx].tsi.as_ref().unwrap().count == 0)
                .collect();
            queue.sort_by(|&a, &b| qcnt[&b].cmp(&qcnt[&a]).then(pos_of[&a].cmp(&pos_of[&b])));
            for &idx in &queue {
                self.order[idx].tsi.as_mut().unwrap().queued = true;
            }

            let mut stall_checked = false;
            while !queue.is_empty() {
                let q_idx = queue.remove(0);
                self.order[q_idx].tsi.as_mut().unwrap().queued = false;
                let key = self.order[q_idx].added_key.expect("add element has added_key");
                ordering.push(key);
                sorted[q_idx] = true;
                loopcheck -= 1;

                let edges = std::mem::take(&mut self.order[q_idx].tsi.as_mut().unwrap().successors);
                for edge in edges {
                    let p_idx = edge.successor;
                    let new_count = {
                        let tsi = self.order[p_idx].tsi.as_mut().expect("successor carries tsi");
                        tsi.count = tsi.count.saturating_sub(1);
                        tsi.count
                    };
                    if new_count == 0 {
                        let q_tree = self.order[q_idx].tree;
                        let q_depth = self.order[q_idx].depth;
                        self.order[p_idx].tree = q_tree;
                        self.order[p_idx].depth = q_depth + 1;
                        self.order[p_idx].parent = Some(q_idx);
                        self.order[q_idx].degree += 1;
                        self.order[p_idx].tsi.as_mut().unwrap().queued = true;
                        let at = queue.partition_point(|&other| {
                            qcnt[&other] > qcnt[&p_idx]
                                || (qcnt[&other] == qcnt[&p_idx] && pos_of[&other] < pos_of[&p_idx])
                        });
                        queue.insert(at, p_idx);
                    }
                }

                if !queue.is_empty() && !stall_checked {
                    stall_checked = true;
                    if loopcheck == queue.len() {
                        tracing::debug!(remaining = loopcheck, "tsort stalled, relinking queue in presentation order");
                        queue.sort_by_key(|&idx| pos_of[&idx]);
                    }
                }
            }

            if loopcheck == 0 {
                break;
            }

            let blocked: Vec<usize> = add_indices.iter().copied().filter(|&idx| !sorted[idx]).collect();
            let nzaps = self.break_cycles(&blocked);
            tracing::debug!(nzaps, remaining = loopcheck, "loop detected while ordering transaction");

            if nzaps > 0 && rescans_left > 0 {
                rescans_left -= 1;
                continue 'rescan;
            }

            whiteout::teardown();
            return Err(loopcheck);
        }

        self.permute(&add_indices, ordering);
        whiteout::teardown();
        Ok(())
    }

    /// T2-T3: record `q -> p` edges for every resolvable requirement, in two
    /// passes (pre-requisites first, then co-requisites), skipping
    /// `rpmlib()` names, whitelisted pairs, narcissistic self-edges, and
    /// duplicate `(p, q)` pairs within the same node's scan.
    fn record_edges(
        &mut self,
        add_indices: &[usize],
        key_to_index: &HashMap<AddedKey, usize>,
        whiteout: &whiteout::Whiteout,
    ) {
        for &p_idx in add_indices {
            let mut selected: HashSet<usize> = HashSet::new();
            let p_name = self.order[p_idx].name.clone();

            for prereq_pass in [true, false] {
                let entries: Vec<(usize, Dependency)> =
                    self.order[p_idx].requires.iter().map(|(i, d)| (i, d.clone())).collect();

                for (req_idx, dep) in entries {
                    if dep.is_rpmlib() {
                        continue;
                    }
                    let Some(ai_match) = self.added_packages.satisfies(&dep) else {
                        continue;
                    };
                    let Some(&q_idx) = key_to_index.get(&ai_match.added_key) else {
                        continue;
                    };
                    if q_idx == p_idx {
                        continue;
                    }
                    let q_name = self.order[q_idx].name.clone();
                    if whiteout.contains(&p_name, &q_name) {
                        continue;
                    }
                    if selected.contains(&q_idx) {
                        continue;
                    }

                    let flags = dep.flags;
                    if flags.is_erase_prereq() {
                        // An erase-phase prereq on an ADD element's own
                        // Requires belongs to neither pass, even if it also
                        // carries an install/legacy prereq bit.
                        continue;
                    }
                    let is_prereq = flags.is_install_prereq() || flags.is_legacy_prereq();
                    let wants_this_pass = if prereq_pass { is_prereq } else { !is_prereq };
                    if !wants_this_pass {
                        continue;
                    }

                    selected.insert(q_idx);

                    let q_depth = self.order[q_idx].depth;
                    {
                        let tsi = self.order[q_idx].tsi.as_mut().expect("add element carries tsi");
                        tsi.successors.push(TsiEdge {
                            successor: p_idx,
                            req_index: req_idx,
                            is_prereq,
                        });
                        tsi.qcnt += 1;
                    }
                    if let Some(tsi) = self.order[p_idx].tsi.as_mut() {
                        tsi.count += 1;
                    }
                    self.order[p_idx].depth = self.order[p_idx].depth.max(q_depth + 1);
                }
            }
        }
    }

    /// The secondary sort key driving queue order this round: the
    /// accumulated successor count in `chainsaw` mode, or each node's
    /// presentation rank (earlier-added wins) otherwise.
    fn effective_qcnt(&self, add_indices: &[usize], pos_of: &HashMap<usize, usize>) -> HashMap<usize, i64> {
        if self.flags.chainsaw {
            add_indices
                .iter()
                .map(|&idx| (idx, self.order[idx].tsi.as_ref().unwrap().qcnt))
                .collect()
        } else {
            let n = add_indices.len() as i64;
            add_indices.iter().map(|&idx| (idx, n - pos_of[&idx] as i64)).collect()
        }
    }

    /// T8: repeatedly find a cycle among still-blocked nodes and discard
    /// one non-prerequisite edge from it, until no more cycles can be
    /// broken. Returns the number of edges discarded.
    fn break_cycles(&mut self, blocked: &[usize]) -> usize {
        let blocked_set: HashSet<usize> = blocked.iter().copied().collect();
        let mut nzaps = 0usize;
        while let Some((q_idx, edge_pos)) = self.find_breakable_edge(&blocked_set) {
            let edge = self.order[q_idx]
                .tsi
                .as_mut()
                .expect("blocked node carries tsi")
                .successors
                .remove(edge_pos);
            let p_idx = edge.successor;
            if let Some(tsi) = self.order[p_idx].tsi.as_mut() {
                tsi.count = tsi.count.saturating_sub(1);
            }
            tracing::debug!(
                from = %self.order[q_idx].name,
                to = %self.order[p_idx].name,
                "breaking co-requisite edge to resolve dependency loop"
            );
            nzaps += 1;
        }
        nzaps
    }

    /// DFS over the blocked subgraph for a cycle; returns the position of
    /// the first non-prerequisite edge found along it, if any.
    fn find_breakable_edge(&self, blocked: &HashSet<usize>) -> Option<(usize, usize)> {
        let mut state: HashMap<usize, u8> = HashMap::new();
        for &start in blocked {
            if state.get(&start).copied().unwrap_or(0) == 0 {
                let mut path = Vec::new();
                let mut path_edge: Vec<(usize, usize, bool)> = Vec::new();
                if let Some(found) = self.dfs_find_cycle_edge(start, blocked, &mut state, &mut path, &mut path_edge) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn dfs_find_cycle_edge(
        &self,
        node: usize,
        blocked: &HashSet<usize>,
        state: &mut HashMap<usize, u8>,
        path: &mut Vec<usize>,
        path_edge: &mut Vec<(usize, usize, bool)>,
    ) -> Option<(usize, usize)> {
        state.insert(node, 1);
        path.push(node);

        let edges: Vec<(usize, usize, bool)> = self.order[node]
            .tsi
            .as_ref()
            .map(|tsi| tsi.successors.iter().enumerate().map(|(i, e)| (i, e.successor, e.is_prereq)).collect())
            .unwrap_or_default();

        for (edge_pos, target, is_prereq) in edges {
            if !blocked.contains(&target) {
                continue;
            }
            match state.get(&target).copied().unwrap_or(0) {
                0 => {
                    path_edge.push((node, edge_pos, is_prereq));
                    if let Some(found) = self.dfs_find_cycle_edge(target, blocked, state, path, path_edge) {
                        return Some(found);
                    }
                    path_edge.pop();
                }
                1 => {
                    let cycle_start = path.iter().position(|&n| n == target).expect("in-progress node is on path");
                    for &(from, e_pos, prereq) in &path_edge[cycle_start..] {
                        if !prereq {
                            return Some((from, e_pos));
                        }
                    }
                    if !is_prereq {
                        return Some((node, edge_pos));
                    }
                }
                _ => {}
            }
        }

        path.pop();
        state.insert(node, 2);
        None
    }

    /// T-final: walk the emitted `added_key` order, substituting each
    /// original ADD element and (unless `chainsaw` is set) any REMOVE
    /// elements it triggered, in original relative order; anything left
    /// unconsumed (REMOVEs with no triggering ADD) is appended last.
    fn permute(&mut self, add_indices: &[usize], ordering: Vec<AddedKey>) {
        let mut key_to_orig: HashMap<AddedKey, usize> = HashMap::new();
        for &idx in add_indices {
            if let Some(k) = self.order[idx].added_key {
                key_to_orig.insert(k, idx);
            }
        }

        let mut consumed = vec![false; self.order.len()];
        let mut new_order: Vec<TransactionElement> = Vec::with_capacity(self.order.len());

        for key in ordering {
            let idx = *key_to_orig.get(&key).expect("ordering key maps to an add element");
            consumed[idx] = true;
            new_order.push(self.order[idx].clone());

            if !self.flags.chainsaw {
                for (j, te) in self.order.iter().enumerate() {
                    if !consumed[j] && te.is_remove() && te.depends_on_key == Some(key) {
                        consumed[j] = true;
                        new_order.push(te.clone());
                    }
                }
            }
        }

        for (j, te) in self.order.iter().enumerate() {
            if !consumed[j] {
                new_order.push(te.clone());
            }
        }

        assert_eq!(new_order.len(), self.order.len(), "tsort permutation must preserve element count");

        for te in &mut new_order {
            te.tsi = None;
        }
        self.order = new_order;
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::database::MemoryDatabase;
    use crate::depset::Dependency;
    use crate::evr::Evr;
    use crate::flags::Flags;
    use crate::header::Header;

    fn evr(v: &str) -> Evr {
        Evr::new(None, v, None)
    }

    fn names(ts: &Transaction) -> Vec<&str> {
        ts.order.iter().map(|te| te.name.as_str()).collect()
    }

    /// S1: a simple dependency is placed before its dependent.
    #[test]
    fn simple_order_places_dependency_first() {
        let mut ts = Transaction::new(None);
        let a = Rc::new(Header::new("A", evr("1")).with_requires(vec![Dependency::unversioned("B")]));
        let b = Rc::new(Header::new("B", evr("1")));
        ts.add_package(a, None, false, vec![]).unwrap();
        ts.add_package(b, None, false, vec![]).unwrap();
        ts.order().unwrap();
        assert_eq!(names(&ts), vec!["B", "A"]);
    }

    /// S2: with no dependency edge between them, presentation order wins.
    #[test]
    fn presentation_order_breaks_ties() {
        let mut ts = Transaction::new(None);
        ts.add_package(Rc::new(Header::new("X", evr("1"))), None, false, vec![]).unwrap();
        ts.add_package(Rc::new(Header::new("Y", evr("1"))), None, false, vec![]).unwrap();
        ts.order().unwrap();
        assert_eq!(names(&ts), vec!["X", "Y"]);
    }

    /// S3: an upgrade's triggering REMOVE follows its ADD immediately.
    #[test]
    fn upgrade_locality_places_remove_immediately_after_add() {
        let mut db = MemoryDatabase::new();
        db.install(Rc::new(
            Header::new("L", evr("1")).with_provides(vec![Dependency::new("L", Flags::EQUAL, Some(evr("1")))]),
        ));
        let mut ts = Transaction::new(Some(Box::new(db)));

        let l2 = Rc::new(Header::new("L", evr("2")).with_provides(vec![Dependency::new("L", Flags::EQUAL, Some(evr("2")))]));
        ts.add_package(l2, None, true, vec![]).unwrap();
        ts.add_package(Rc::new(Header::new("M", evr("1"))), None, false, vec![]).unwrap();

        ts.order().unwrap();
        let kinds: Vec<(&str, bool)> = ts.order.iter().map(|te| (te.name.as_str(), te.is_add())).collect();
        assert_eq!(kinds, vec![("L", true), ("L", false), ("M", true)]);
    }

    /// S4: a co-requisite loop is broken and both elements still appear.
    #[test]
    fn co_requisite_loop_is_broken() {
        let mut ts = Transaction::new(None);
        let a = Rc::new(Header::new("A", evr("1")).with_requires(vec![Dependency::unversioned("B")]));
        let b = Rc::new(Header::new("B", evr("1")).with_requires(vec![Dependency::unversioned("A")]));
        ts.add_package(a, None, false, vec![]).unwrap();
        ts.add_package(b, None, false, vec![]).unwrap();
        assert!(ts.order().is_ok());
        assert_eq!(ts.order.len(), 2);
    }

    /// S5: a loop built entirely from hard prereqs cannot be broken.
    #[test]
    fn unbreakable_prereq_loop_reports_remaining_count() {
        let mut ts = Transaction::new(None);
        let a = Rc::new(Header::new("A", evr("1")).with_requires(vec![Dependency::new("B", Flags::SCRIPT_PRE, None)]));
        let b = Rc::new(Header::new("B", evr("1")).with_requires(vec![Dependency::new("A", Flags::SCRIPT_PRE, None)]));
        ts.add_package(a, None, false, vec![]).unwrap();
        ts.add_package(b, None, false, vec![]).unwrap();
        assert_eq!(ts.order(), Err(2));
    }

    /// S6: a file-path provide orders its requirer afterward.
    #[test]
    fn file_path_provide_orders_dependency_first() {
        let mut ts = Transaction::new(None);
        let p = Rc::new(Header::new("P", evr("1")).with_files(vec!["/usr/bin/foo".into()]));
        let q = Rc::new(Header::new("Q", evr("1")).with_requires(vec![Dependency::unversioned("/usr/bin/foo")]));
        ts.add_package(p, None, false, vec![]).unwrap();
        ts.add_package(q, None, false, vec![]).unwrap();
        ts.order().unwrap();
        assert_eq!(names(&ts), vec!["P", "Q"]);
    }

    /// A Requires carrying both an install-phase prereq bit and an
    /// erase-phase prereq bit is excluded from *both* tsort passes
    /// entirely (depends.c's T2 ADD arm), not recorded as a hard prereq
    /// edge. With no edge created, presentation order is left untouched
    /// even though `A` declares a Requires on `B`.
    #[test]
    fn combined_install_and_erase_prereq_flags_excludes_edge_entirely() {
        let mut ts = Transaction::new(None);
        let a = Rc::new(Header::new("A", evr("1")).with_requires(vec![Dependency::new(
            "B",
            Flags::SCRIPT_PRE | Flags::SCRIPT_PREUN,
            None,
        )]));
        let b = Rc::new(Header::new("B", evr("1")));
        ts.add_package(a, None, false, vec![]).unwrap();
        ts.add_package(b, None, false, vec![]).unwrap();
        ts.order().unwrap();
        assert_eq!(names(&ts), vec!["A", "B"], "no edge should be recorded, presentation order wins");
    }

    /// The same combined-flag exclusion must not turn an otherwise
    /// breakable co-requisite loop into an unbreakable one: a cycle where
    /// one edge carries both prereq bits (excluded, never recorded) and
    /// the other is a plain co-requisite (breakable) must still resolve.
    #[test]
    fn combined_prereq_flags_do_not_create_unbreakable_loop() {
        let mut ts = Transaction::new(None);
        let a = Rc::new(Header::new("A", evr("1")).with_requires(vec![Dependency::new(
            "B",
            Flags::SCRIPT_PRE | Flags::SCRIPT_PREUN,
            None,
        )]));
        let b = Rc::new(Header::new("B", evr("1")).with_requires(vec![Dependency::unversioned("A")]));
        ts.add_package(a, None, false, vec![]).unwrap();
        ts.add_package(b, None, false, vec![]).unwrap();
        assert_eq!(ts.order(), Ok(()));
    }

    /// S7: an obsoletes sweep's REMOVE trails its triggering ADD.
    #[test]
    fn obsoletes_sweep_places_remove_after_add() {
        let mut db = MemoryDatabase::new();
        db.install(Rc::new(
            Header::new("legacy", evr("1"))
                .with_provides(vec![Dependency::new("old-api", Flags::EQUAL, Some(evr("1")))]),
        ));
        let mut ts = Transaction::new(Some(Box::new(db)));

        let modern = Rc::new(Header::new("modern", evr("1")).with_obsoletes(vec![Dependency::unversioned("old-api")]));
        ts.add_package(modern, None, true, vec![]).unwrap();
        assert_eq!(ts.removed_offsets.as_slice(), &[0]);

        ts.order().unwrap();
        let kinds: Vec<(&str, bool)> = ts.order.iter().map(|te| (te.name.as_str(), te.is_add())).collect();
        assert_eq!(kinds, vec![("modern", true), ("legacy", false)]);
    }

    use proptest::prelude::*;

    /// Build `n` ADD packages `"pkg0".."pkg{n-1}"`; each package may require
    /// an earlier-indexed one, picked from `edge_choices` (a value mod `i`
    /// when `i > 0`), so the induced graph is acyclic by construction.
    fn acyclic_chain_transaction(n: usize, edge_choices: &[usize]) -> Transaction {
        let mut ts = Transaction::new(None);
        for i in 0..n {
            let mut h = Header::new(format!("pkg{i}"), evr("1"));
            if i > 0 {
                let target = edge_choices.get(i).copied().unwrap_or(0) % i;
                h = h.with_requires(vec![Dependency::unversioned(format!("pkg{target}"))]);
            }
            ts.add_package(Rc::new(h), None, false, vec![]).unwrap();
        }
        ts
    }

    proptest! {
        /// spec.md §8 invariant 3: once `order()` returns `Ok`, the result
        /// is a permutation of the elements passed in -- same multiset of
        /// names, same length, regardless of how the acyclic dependency
        /// graph is shaped.
        #[test]
        fn order_is_always_a_permutation(n in 1usize..12, edge_choices in prop::collection::vec(0usize..12, 12)) {
            let mut ts = acyclic_chain_transaction(n, &edge_choices);
            let before: std::collections::BTreeSet<String> = ts.order.iter().map(|te| te.name.clone()).collect();
            let before_len = ts.order.len();
            prop_assert!(ts.order().is_ok());
            prop_assert_eq!(ts.order.len(), before_len);
            let after: std::collections::BTreeSet<String> = ts.order.iter().map(|te| te.name.clone()).collect();
            prop_assert_eq!(before, after);
        }
    }
}
