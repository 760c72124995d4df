//! Parallel vanity address search
//!
//! Races independent worker threads, each generating and testing one
//! candidate per loop iteration, against a single-assignment winner slot.
//! The slot is a set-once atomic flag claimed by compare-and-set plus a
//! bounded(1) channel that hands the winning candidate to the
//! coordinator; if several workers match in the same instant exactly one
//! claim succeeds and the other matches are discarded. Cancellation is
//! cooperative: workers poll the shared flag once per iteration, so a
//! worker can burn at most one extra candidate after cancellation is
//! requested.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::debug;

use crate::error::Error;
use crate::keygen::{KeypairGenerator, LedgerKeypairGenerator, ADDRESS_ALPHABET, RESERVED_LEADING_CHAR};

/// Candidates checked between per-worker progress reports.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Longest prefix worth validating; addresses never exceed this.
const MAX_PREFIX_LEN: usize = 34;

/// Parameters for one vanity search
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Leading substring the address must start with, including the
    /// reserved `r`.
    pub prefix: String,
    pub case_sensitive: bool,
    /// Worker threads to race; 0 = auto (75% of available parallelism).
    pub worker_count: usize,
    /// Per-worker attempt budget; `None` searches until a match or
    /// cancellation.
    pub max_attempts_per_worker: Option<u64>,
}

/// The winning candidate, reported exactly once per successful search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub address: String,
    pub secret: String,
    /// Generate calls the winning worker made, including the winning one.
    /// Losing workers' counters are discarded.
    pub attempts: u64,
    pub worker_id: usize,
    pub elapsed_seconds: f64,
}

impl SearchResult {
    /// Rough attempts/sec across the whole search: the winner's counter
    /// extrapolated over every worker.
    pub fn estimated_rate(&self, worker_count: usize) -> f64 {
        if self.elapsed_seconds <= 0.0 {
            return 0.0;
        }
        (self.attempts * worker_count as u64) as f64 / self.elapsed_seconds
    }
}

/// Terminal outcome of a search that was accepted and run
#[derive(Debug)]
pub enum SearchOutcome {
    Found(SearchResult),
    /// Every worker exhausted its attempt budget without a match.
    NotFound,
    /// External interruption arrived before any match.
    Cancelled,
}

/// Set-once flag shared by the coordinator, its workers and any external
/// caller that wants to interrupt the search. Once set it is never unset.
/// Internally it doubles as the winner slot's claim: the first
/// `claim()` wins and everything afterwards reads it as cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cooperative shutdown. Workers observe this within one
    /// candidate generation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Exactly one caller ever sees `true`.
    fn claim(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

struct WorkerMatch {
    address: String,
    secret: String,
    attempts: u64,
    worker_id: usize,
}

/// Orchestrates the worker race. Stateless; every search gets fresh
/// workers, a fresh channel and (unless the caller shares one) a fresh
/// token, so nothing can leak between searches.
pub struct SearchCoordinator;

impl SearchCoordinator {
    /// Search with the production keypair generator. Blocks until a
    /// winner claims the slot, every worker exhausts its budget, or
    /// `cancel` is set externally. All workers are joined before this
    /// returns, whatever the outcome.
    pub fn search(request: &SearchRequest, cancel: &CancellationToken) -> Result<SearchOutcome, Error> {
        Self::search_with(request, cancel, |_| LedgerKeypairGenerator)
    }

    /// Like [`SearchCoordinator::search`] but with a caller-supplied
    /// generator per worker (worker ids start at 1).
    pub fn search_with<G, F>(
        request: &SearchRequest,
        cancel: &CancellationToken,
        mut make_generator: F,
    ) -> Result<SearchOutcome, Error>
    where
        G: KeypairGenerator + 'static,
        F: FnMut(usize) -> G,
    {
        let prefix = validate_prefix(request)?;
        let workers = resolve_worker_count(request.worker_count);

        // A token that was already set belongs to an earlier interruption;
        // running on it would let stale state bleed into this search.
        if cancel.is_cancelled() {
            return Ok(SearchOutcome::Cancelled);
        }

        let started = Instant::now();
        let (result_tx, result_rx) = mpsc::sync_channel::<WorkerMatch>(1);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 1..=workers {
            let mut generator = make_generator(worker_id);
            let token = cancel.clone();
            let tx = result_tx.clone();
            let prefix = prefix.clone();
            let case_sensitive = request.case_sensitive;
            let budget = request.max_attempts_per_worker;

            let spawned = thread::Builder::new()
                .name(format!("vanity-{worker_id}"))
                .spawn(move || {
                    run_worker(worker_id, &mut generator, &prefix, case_sensitive, budget, &token, &tx)
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    // Surface before reporting any outcome; tear down
                    // whatever already started.
                    cancel.cancel();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(Error::Io(err));
                }
            }
        }
        drop(result_tx);

        // Blocks until the slot is claimed, or every worker has exited
        // and dropped its sender (budget exhausted or cancelled).
        let winner = result_rx.recv().ok();
        for handle in handles {
            let _ = handle.join();
        }

        match winner {
            Some(m) => Ok(SearchOutcome::Found(SearchResult {
                address: m.address,
                secret: m.secret,
                attempts: m.attempts,
                worker_id: m.worker_id,
                elapsed_seconds: started.elapsed().as_secs_f64(),
            })),
            None if cancel.is_cancelled() => Ok(SearchOutcome::Cancelled),
            None => Ok(SearchOutcome::NotFound),
        }
    }
}

fn run_worker<G: KeypairGenerator>(
    worker_id: usize,
    generator: &mut G,
    prefix: &str,
    case_sensitive: bool,
    budget: Option<u64>,
    token: &CancellationToken,
    tx: &mpsc::SyncSender<WorkerMatch>,
) {
    let prefix_len = prefix.len();
    let mut attempts: u64 = 0;

    while !token.is_cancelled() {
        if budget.is_some_and(|max| attempts >= max) {
            return;
        }
        let candidate = generator.generate();
        attempts += 1;

        if prefix_matches(&candidate.address, prefix, prefix_len, case_sensitive) {
            // First claim wins; a simultaneous match elsewhere is dropped.
            if token.claim() {
                let _ = tx.send(WorkerMatch {
                    address: candidate.address,
                    secret: candidate.secret,
                    attempts,
                    worker_id,
                });
            }
            return;
        }

        if attempts % PROGRESS_INTERVAL == 0 {
            debug!(worker_id, attempts, "still searching");
        }
    }
}

fn prefix_matches(address: &str, prefix: &str, prefix_len: usize, case_sensitive: bool) -> bool {
    match address.get(..prefix_len) {
        Some(head) if case_sensitive => head == prefix,
        Some(head) => head.eq_ignore_ascii_case(prefix),
        None => false,
    }
}

/// Number of threads a request will actually race.
pub fn resolve_worker_count(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    let total = thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(4);
    (total * 3 / 4).max(1)
}

/// Checks the request and returns the prefix to match against, folded to
/// lowercase for case-insensitive searches.
fn validate_prefix(request: &SearchRequest) -> Result<String, Error> {
    let prefix = request.prefix.as_str();
    if prefix.is_empty() {
        return Err(Error::InvalidPrefix("prefix is empty".into()));
    }
    if !prefix.starts_with(RESERVED_LEADING_CHAR) {
        return Err(Error::InvalidPrefix(format!(
            "prefix must start with '{RESERVED_LEADING_CHAR}'"
        )));
    }
    if prefix.len() < 2 {
        return Err(Error::InvalidPrefix(
            "prefix needs at least one character after the leading 'r'".into(),
        ));
    }
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(Error::InvalidPrefix(format!(
            "prefix longer than {MAX_PREFIX_LEN} characters can never match"
        )));
    }
    for c in prefix.chars().skip(1) {
        let allowed = if request.case_sensitive {
            ADDRESS_ALPHABET.contains(c)
        } else {
            ADDRESS_ALPHABET.contains(c.to_ascii_lowercase())
                || ADDRESS_ALPHABET.contains(c.to_ascii_uppercase())
        };
        if !allowed {
            return Err(Error::InvalidPrefix(format!(
                "'{c}' cannot appear in an address"
            )));
        }
    }
    Ok(if request.case_sensitive {
        prefix.to_string()
    } else {
        prefix.to_ascii_lowercase()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::Candidate;
    use std::time::Duration;

    const MISS: &str = "rJunkJunkJunkJunkJunkJunkJunk";

    /// Replays a fixed address script, then misses forever.
    struct ScriptedGenerator {
        script: Vec<&'static str>,
        next: usize,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<&'static str>) -> Self {
            Self { script, next: 0 }
        }

        fn misses() -> Self {
            Self::new(Vec::new())
        }
    }

    impl KeypairGenerator for ScriptedGenerator {
        fn generate(&mut self) -> Candidate {
            let address = self.script.get(self.next).copied().unwrap_or(MISS);
            self.next += 1;
            Candidate {
                address: address.to_string(),
                secret: format!("s{address}"),
            }
        }
    }

    fn request(prefix: &str, case_sensitive: bool, workers: usize) -> SearchRequest {
        SearchRequest {
            prefix: prefix.to_string(),
            case_sensitive,
            worker_count: workers,
            max_attempts_per_worker: None,
        }
    }

    #[test]
    fn test_scripted_fifth_attempt_wins() {
        let outcome = SearchCoordinator::search_with(
            &request("rCAT", true, 4),
            &CancellationToken::new(),
            |worker_id| {
                if worker_id == 2 {
                    ScriptedGenerator::new(vec![MISS, MISS, MISS, MISS, "rCATxyzExampleExampleExam"])
                } else {
                    ScriptedGenerator::misses()
                }
            },
        )
        .unwrap();

        match outcome {
            SearchOutcome::Found(result) => {
                assert_eq!(result.address, "rCATxyzExampleExampleExam");
                assert_eq!(result.secret, "srCATxyzExampleExampleExam");
                assert_eq!(result.attempts, 5);
                assert_eq!(result.worker_id, 2);
                assert!(result.elapsed_seconds >= 0.0);
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_single_worker_same_contract() {
        let outcome = SearchCoordinator::search_with(
            &request("rCAT", true, 1),
            &CancellationToken::new(),
            |_| ScriptedGenerator::new(vec![MISS, "rCATsingleWorkerExample"]),
        )
        .unwrap();

        match outcome {
            SearchOutcome::Found(result) => {
                assert_eq!(result.attempts, 2);
                assert_eq!(result.worker_id, 1);
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_simultaneous_matches_single_winner() {
        // Every worker matches on its first candidate; the claim must
        // collapse the race to a single reported result.
        let outcome = SearchCoordinator::search_with(
            &request("rCAT", true, 4),
            &CancellationToken::new(),
            |worker_id| {
                let address: &'static str = match worker_id {
                    1 => "rCATwinnerAexampleexample",
                    2 => "rCATwinnerBexampleexample",
                    3 => "rCATwinnerCexampleexample",
                    _ => "rCATwinnerDexampleexample",
                };
                ScriptedGenerator::new(vec![address])
            },
        )
        .unwrap();

        match outcome {
            SearchOutcome::Found(result) => {
                assert!(result.address.starts_with("rCATwinner"));
                assert_eq!(result.attempts, 1);
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_claim_exactly_once() {
        let token = CancellationToken::new();
        let claims: Vec<_> = (0..8)
            .map(|_| {
                let token = token.clone();
                thread::spawn(move || token.claim())
            })
            .collect();
        let wins = claims.into_iter().map(|h| h.join().unwrap()).filter(|w| *w).count();
        assert_eq!(wins, 1);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_case_insensitive_match() {
        let outcome = SearchCoordinator::search_with(
            &request("rcat", false, 1),
            &CancellationToken::new(),
            |_| ScriptedGenerator::new(vec!["rCaTmixedCaseExampleExam"]),
        )
        .unwrap();
        assert!(matches!(outcome, SearchOutcome::Found(_)));
    }

    #[test]
    fn test_case_sensitive_rejects_wrong_case() {
        let mut req = request("rCAT", true, 1);
        req.max_attempts_per_worker = Some(3);
        let outcome = SearchCoordinator::search_with(&req, &CancellationToken::new(), |_| {
            ScriptedGenerator::new(vec!["rcatLowerCaseExampleExam"])
        })
        .unwrap();
        assert!(matches!(outcome, SearchOutcome::NotFound));
    }

    #[test]
    fn test_exhausted_budget_not_found() {
        let mut req = request("rCAT", true, 2);
        req.max_attempts_per_worker = Some(10);
        let outcome =
            SearchCoordinator::search_with(&req, &CancellationToken::new(), |_| ScriptedGenerator::misses())
                .unwrap();
        assert!(matches!(outcome, SearchOutcome::NotFound));
    }

    #[test]
    fn test_pre_cancelled_token() {
        let token = CancellationToken::new();
        token.cancel();
        let outcome = SearchCoordinator::search_with(&request("rCAT", true, 2), &token, |_| {
            ScriptedGenerator::misses()
        })
        .unwrap();
        assert!(matches!(outcome, SearchOutcome::Cancelled));
    }

    #[test]
    fn test_external_interruption() {
        let token = CancellationToken::new();
        let searcher = {
            let token = token.clone();
            thread::spawn(move || {
                SearchCoordinator::search_with(&request("rCAT", true, 2), &token, |_| {
                    ScriptedGenerator::misses()
                })
            })
        };
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        let outcome = searcher.join().unwrap().unwrap();
        assert!(matches!(outcome, SearchOutcome::Cancelled));
    }

    #[test]
    fn test_malformed_prefixes() {
        let token = CancellationToken::new();
        for bad in ["", "r", "xCAT", "rC T", "r0AT", "rCATrCATrCATrCATrCATrCATrCATrCATrCA"] {
            let result = SearchCoordinator::search_with(&request(bad, true, 1), &token, |_| {
                ScriptedGenerator::misses()
            });
            assert!(
                matches!(result, Err(Error::InvalidPrefix(_))),
                "{bad:?} should be rejected"
            );
        }
        // Validation failures must not touch the caller's token.
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_lowercase_l_folding() {
        // 'l' is outside the alphabet, but folds onto 'L' which is inside.
        let strict = SearchCoordinator::search_with(
            &request("rl", true, 1),
            &CancellationToken::new(),
            |_| ScriptedGenerator::misses(),
        );
        assert!(matches!(strict, Err(Error::InvalidPrefix(_))));

        let mut folded = request("rl", false, 1);
        folded.max_attempts_per_worker = Some(1);
        let outcome = SearchCoordinator::search_with(&folded, &CancellationToken::new(), |_| {
            ScriptedGenerator::new(vec!["rLfoldedExampleExampleExa"])
        })
        .unwrap();
        assert!(matches!(outcome, SearchOutcome::Found(_)));
    }

    #[test]
    fn test_auto_worker_count() {
        assert!(resolve_worker_count(0) >= 1);
        assert_eq!(resolve_worker_count(3), 3);
    }
}
