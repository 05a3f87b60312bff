//! Turns the votes of a period into a winner.

use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;

use log::{debug, info};
use rand::Rng;

use crate::config::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
pub(crate) struct VoteCount(pub(crate) u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
    const ONE: VoteCount = VoteCount(1);
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

/// Per-candidate vote counts of one period.
///
/// Candidates that received no vote are absent.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Tally {
    counts: BTreeMap<CandidateId, VoteCount>,
}

impl Tally {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, candidate: CandidateId) -> u64 {
        self.counts.get(&candidate).map(|vc| vc.0).unwrap_or(0)
    }

    pub fn counts(&self) -> Vec<(CandidateId, u64)> {
        self.counts.iter().map(|(cid, vc)| (*cid, vc.0)).collect()
    }

    /// The candidates sharing the highest count, sorted by id, with that count.
    pub fn top_candidates(&self) -> Option<(Vec<CandidateId>, u64)> {
        let max_count: VoteCount = *self.counts.values().max()?;
        let top: Vec<CandidateId> = self
            .counts
            .iter()
            .filter_map(|(cid, vc)| if *vc == max_count { Some(*cid) } else { None })
            .collect();
        Some((top, max_count.0))
    }

    /// Picks the winner.
    ///
    /// A single top candidate wins by `MostVotes`. Otherwise the winner is
    /// drawn uniformly among the tied candidates and the reason is `Random`.
    /// Returns None when nobody voted.
    pub fn decide<R: Rng>(&self, rng: &mut R) -> Option<Decision> {
        let (top, top_count) = self.top_candidates()?;
        debug!("decide: top candidates {:?} with {} votes", top, top_count);
        let decision = match top.as_slice() {
            [winner] => Decision {
                winner: *winner,
                reason: ReasonCode::MostVotes,
                top_count,
            },
            tied => {
                let idx = rng.gen_range(0..tied.len());
                Decision {
                    winner: tied[idx],
                    reason: ReasonCode::Random,
                    top_count,
                }
            }
        };
        info!(
            "decide: winner {} ({}) with {} votes",
            decision.winner, decision.reason, decision.top_count
        );
        Some(decision)
    }

    /// The counts labelled with candidate names, highest count first, then by name.
    ///
    /// A candidate missing from `candidates` is labelled by its id.
    pub fn breakdown(&self, candidates: &[Candidate]) -> Vec<TallyEntry> {
        let names: HashMap<CandidateId, &str> = candidates
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect();
        let mut res: Vec<TallyEntry> = self
            .counts
            .iter()
            .map(|(cid, vc)| TallyEntry {
                candidate: *cid,
                name: names
                    .get(cid)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| cid.to_string()),
                votes: vc.0,
            })
            .collect();
        res.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)));
        res
    }
}

/// Groups the votes by candidate.
pub fn compute_tally(votes: &[Vote]) -> Tally {
    let mut counts: BTreeMap<CandidateId, VoteCount> = BTreeMap::new();
    for v in votes.iter() {
        let e = counts.entry(v.candidate).or_insert(VoteCount::EMPTY);
        *e += VoteCount::ONE;
    }
    debug!("compute_tally: {} votes -> {:?}", votes.len(), counts);
    Tally { counts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn votes_for(spec: &[(u32, usize)]) -> Vec<Vote> {
        let cast_at = Utc.timestamp_opt(1_000, 0).unwrap();
        let mut res = Vec::new();
        for (cid, n) in spec.iter() {
            for i in 0..*n {
                res.push(Vote {
                    id: VoteId(res.len() as u64 + 1),
                    voter: VoterId(format!("voter-{}-{}", cid, i)),
                    candidate: CandidateId(*cid),
                    cast_at,
                });
            }
        }
        res
    }

    #[test]
    fn clear_majority() {
        init();
        let tally = compute_tally(&votes_for(&[(1, 5), (2, 3), (3, 1)]));
        let mut rng = StdRng::seed_from_u64(0);
        let d = tally.decide(&mut rng).unwrap();
        assert_eq!(d.winner, CandidateId(1));
        assert_eq!(d.reason, ReasonCode::MostVotes);
        assert_eq!(d.top_count, 5);
    }

    #[test]
    fn no_votes_no_decision() {
        init();
        let tally = compute_tally(&[]);
        assert!(tally.is_empty());
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(tally.decide(&mut rng), None);
    }

    #[test]
    fn tie_is_random_among_top() {
        init();
        let tally = compute_tally(&votes_for(&[(1, 4), (2, 4), (3, 2)]));
        let mut seen: HashSet<CandidateId> = HashSet::new();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let d = tally.decide(&mut rng).unwrap();
            assert_eq!(d.reason, ReasonCode::Random);
            assert!(d.winner == CandidateId(1) || d.winner == CandidateId(2));
            seen.insert(d.winner);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn tie_is_reproducible_with_seed() {
        let tally = compute_tally(&votes_for(&[(1, 1), (2, 1), (3, 1)]));
        let a = tally.decide(&mut StdRng::seed_from_u64(42)).unwrap();
        let b = tally.decide(&mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tie_draw_is_roughly_uniform() {
        let tally = compute_tally(&votes_for(&[(1, 2), (2, 2), (3, 2)]));
        let mut rng = StdRng::seed_from_u64(7);
        let mut wins: HashMap<CandidateId, u32> = HashMap::new();
        for _ in 0..3000 {
            let d = tally.decide(&mut rng).unwrap();
            *wins.entry(d.winner).or_insert(0) += 1;
        }
        for cid in [CandidateId(1), CandidateId(2), CandidateId(3)] {
            let w = *wins.get(&cid).unwrap_or(&0);
            assert!((800..1200).contains(&w), "{:?} won {} times", cid, w);
        }
    }

    #[test]
    fn breakdown_sorted_by_count_then_name() {
        let tally = compute_tally(&votes_for(&[(1, 1), (2, 3), (3, 1), (4, 2)]));
        let candidates = vec![
            Candidate {
                id: CandidateId(1),
                name: "Wingspan".to_string(),
                enabled: true,
            },
            Candidate {
                id: CandidateId(2),
                name: "Catan".to_string(),
                enabled: true,
            },
            Candidate {
                id: CandidateId(3),
                name: "Azul".to_string(),
                enabled: false,
            },
        ];
        let rows: Vec<(String, u64)> = tally
            .breakdown(&candidates)
            .into_iter()
            .map(|e| (e.name, e.votes))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Catan".to_string(), 3),
                ("#4".to_string(), 2),
                ("Azul".to_string(), 1),
                ("Wingspan".to_string(), 1),
            ]
        );
    }
}
