//! Registration, submission and round management.

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use murmur_crypto::{poseidon, Fr};
use murmur_nullifier::{MemoryNullifierStore, NullifierStore, Scope};
use murmur_registry::{MembershipTree, RootHistory};
use murmur_signal::verifier::AUDIT_TARGET;
use murmur_signal::{
    ExternalNullifier, PublicOutputs, RejectReason, SignalProof, SignalVerifier, Verdict,
};
use murmur_types::events::SignalAccepted;
use murmur_types::wire::{Receipt, SignalRecord, SubmitRequest};
use murmur_types::{Hash, DEFAULT_ROOT_HISTORY};

use crate::events::{EventBus, Subscription};
use crate::storage::{EphemeralStorage, LedgerStorage};
use crate::{LedgerError, Result};

struct State {
    tree: MembershipTree,
    roots: RootHistory,
    round: ExternalNullifier,
}

/// The relay's ledger.
pub struct Ledger {
    verifier: SignalVerifier,
    nullifiers: Arc<dyn NullifierStore>,
    storage: Arc<dyn LedgerStorage>,
    state: RwLock<State>,
    latest: RwLock<Option<SignalRecord>>,
    /// Sequence number of the last stored signal. Held while storing the next.
    last_sequence: Mutex<u64>,
    bus: EventBus,
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn decode_field(bytes: &Hash, what: &str) -> Result<Fr> {
    poseidon::bytes_to_field(bytes).map_err(|e| LedgerError::Malformed(format!("{what}: {e}")))
}

impl Ledger {
    /// A ledger over `tree` with an in-memory spent set and no durable log.
    pub fn new(tree: MembershipTree, round: ExternalNullifier, verifier: SignalVerifier) -> Self {
        let roots = RootHistory::with_root(DEFAULT_ROOT_HISTORY, tree.root());
        Self {
            verifier,
            nullifiers: Arc::new(MemoryNullifierStore::new()),
            storage: Arc::new(EphemeralStorage),
            state: RwLock::new(State { tree, roots, round }),
            latest: RwLock::new(None),
            last_sequence: Mutex::new(0),
            bus: EventBus::default(),
        }
    }

    /// Accept proofs against the last `window` roots.
    pub fn with_root_history(mut self, window: usize) -> Self {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        state.roots = RootHistory::with_root(window, state.tree.root());
        self
    }

    pub fn with_nullifier_store(mut self, store: Arc<dyn NullifierStore>) -> Self {
        self.nullifiers = store;
        self
    }

    /// Record into `storage`, resuming its signal log.
    pub fn with_storage(mut self, storage: Arc<dyn LedgerStorage>) -> Result<Self> {
        self.last_sequence = Mutex::new(storage.last_sequence()?);
        self.latest = RwLock::new(storage.latest_signal()?);
        self.storage = storage;
        Ok(self)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a member commitment and publish the new root.
    ///
    /// The commitment is stored before the tree changes; a storage failure
    /// leaves the registry as it was.
    pub fn register(&self, commitment: Fr) -> Result<usize> {
        let mut state = self.write_state();
        let index = state.tree.next_index(&commitment)?;
        self.storage
            .append_commitment(index, &poseidon::field_to_bytes(&commitment))?;
        state.tree.append(commitment)?;
        let root = state.tree.root();
        state.roots.push(root);
        tracing::info!(
            leaf_index = index,
            commitment = %poseidon::to_hex(&commitment),
            root = %poseidon::to_hex(&root),
            "member registered"
        );
        Ok(index)
    }

    pub fn current_root(&self) -> Fr {
        self.read_state().tree.root()
    }

    /// Registered commitments in leaf order.
    pub fn commitments(&self) -> Vec<Fr> {
        self.read_state().tree.leaves().to_vec()
    }

    pub fn depth(&self) -> usize {
        self.read_state().tree.depth()
    }

    pub fn current_round(&self) -> ExternalNullifier {
        self.read_state().round
    }

    /// Switch to a new round. Spent sets of earlier rounds are kept.
    pub fn advance_round(&self, round: ExternalNullifier) -> Result<()> {
        let mut state = self.write_state();
        let previous = state.round;
        state.round = round;
        self.storage.set_round(&round.to_bytes())?;
        tracing::info!(previous = %previous, current = %round, "round advanced");
        Ok(())
    }

    /// Verify and record a submission.
    ///
    /// A signal is accepted only once it is stored. If storing fails, or the
    /// round advanced while the proof was being checked, its nullifier is
    /// released and the submission can be retried.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownRoot`] if the proof's root left the window
    /// - [`LedgerError::Rejected`] for a spent nullifier, an invalid proof or
    ///   a proof for a round that ended during verification
    /// - [`LedgerError::Malformed`] if a field does not decode to a scalar
    /// - [`LedgerError::Storage`] if the accepted signal could not be stored
    pub fn submit(&self, request: &SubmitRequest) -> Result<Receipt> {
        let nullifier_hash = decode_field(&request.nullifier_hash, "nullifier_hash")?;
        let (roots, round, current_root) = {
            let state = self.read_state();
            (state.roots.clone(), state.round, state.tree.root())
        };
        let root = match &request.root {
            Some(bytes) => decode_field(bytes, "root")?,
            None => current_root,
        };

        let proof = SignalProof {
            bytes: request.proof.clone(),
        };
        let outputs = PublicOutputs {
            root,
            nullifier_hash,
        };
        let verdict = self
            .verifier
            .verify(
                &proof,
                &outputs,
                &round,
                &request.signal,
                &roots,
                self.nullifiers.as_ref(),
            )
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        if let Verdict::Reject(reason) = verdict {
            return Err(reason.into());
        }

        let scope = round.to_bytes();
        let record = match self.record(round, request, root) {
            Ok(record) => record,
            Err(e) => {
                self.release(&scope, &request.nullifier_hash);
                return Err(e);
            }
        };
        tracing::info!(
            sequence = record.sequence,
            round = %round,
            nullifier_hash = %poseidon::to_hex(&nullifier_hash),
            "signal accepted"
        );
        Ok(record.receipt())
    }

    /// Store a verified signal under the next sequence number and publish it.
    fn record(
        &self,
        round: ExternalNullifier,
        request: &SubmitRequest,
        root: Fr,
    ) -> Result<SignalRecord> {
        // Held until the signal is stored, so the round cannot advance past it.
        let state = self.read_state();
        if state.round != round {
            tracing::warn!(
                target: AUDIT_TARGET,
                proven = %round,
                current = %state.round,
                "signal rejected: round advanced during verification"
            );
            return Err(RejectReason::InvalidProof.into());
        }

        let mut last = self.last_sequence.lock().unwrap_or_else(|e| e.into_inner());
        let record = SignalRecord {
            sequence: *last + 1,
            round: round.to_bytes(),
            signal: request.signal.clone(),
            nullifier_hash: request.nullifier_hash,
            root: poseidon::field_to_bytes(&root),
            accepted_at: now(),
        };
        if let Err(e) = self.storage.append_signal(&record) {
            tracing::error!(sequence = record.sequence, error = %e, "failed to persist accepted signal");
            return Err(e);
        }
        *last = record.sequence;
        *self.latest.write().unwrap_or_else(|e| e.into_inner()) = Some(record.clone());
        self.bus.emit(SignalAccepted::from(&record));
        Ok(record)
    }

    /// Unspend a nullifier whose signal was not recorded.
    fn release(&self, scope: &Scope, nullifier_hash: &Hash) {
        match self.nullifiers.remove(scope, nullifier_hash) {
            Ok(_) => tracing::debug!(
                nullifier_hash = %hex::encode(nullifier_hash),
                "nullifier released"
            ),
            Err(e) => tracing::error!(
                nullifier_hash = %hex::encode(nullifier_hash),
                error = %e,
                "failed to release nullifier"
            ),
        }
    }

    /// The most recently accepted signal.
    pub fn latest_signal(&self) -> Option<SignalRecord> {
        self.latest
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }
}
