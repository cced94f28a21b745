// Round lifecycle: entries, eligibility, randomness request and winner resolution.
//
// Everything here works on an in-memory `RoundState`. The processor loads the
// account, runs one of these steps and stores the result only if it succeeded.
use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::config::MAX_PLAYERS;
use crate::error::RaffleError;
use crate::oracle::{winner_index, RandomnessOracle, RandomnessRequest};
use crate::state::{PendingRequest, RafflePhase, RoundState};

/// Push transfer of the prize to the winner. May fail.
pub trait Payout {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), ProgramError>;
}

impl RoundState {
    /// Adds `participant` to the current round.
    pub fn enter(&mut self, participant: Pubkey, payment: u64) -> Result<(), RaffleError> {
        if payment < self.config.entrance_fee {
            msg!(
                "Payment of {} lamports is below the entrance fee of {}",
                payment,
                self.config.entrance_fee
            );
            return Err(RaffleError::InsufficientPayment);
        }
        if self.phase != RafflePhase::Open {
            msg!("Round is calculating, entries are closed");
            return Err(RaffleError::RoundNotOpen);
        }
        if self.players.len() >= MAX_PLAYERS {
            msg!("Round already holds {} players", MAX_PLAYERS);
            return Err(RaffleError::RoundFull);
        }
        self.players.push(participant);
        Ok(())
    }

    /// True when a winner may be requested: the interval elapsed, the round is open,
    /// and there are funds and players.
    pub fn check_upkeep(&self, now: UnixTimestamp, balance: u64) -> bool {
        let time_passed = now.saturating_sub(self.last_timestamp) >= self.config.interval;
        let is_open = self.phase == RafflePhase::Open;
        let has_balance = balance > 0;
        let has_players = !self.players.is_empty();
        time_passed && is_open && has_balance && has_players
    }

    pub fn ensure_upkeep(&self, now: UnixTimestamp, balance: u64) -> Result<(), RaffleError> {
        if self.check_upkeep(now, balance) {
            return Ok(());
        }
        Err(RaffleError::UpkeepNotNeeded {
            balance,
            player_count: self.players.len() as u64,
            phase: self.phase,
        })
    }

    /// Closes the round and asks `oracle` for one random word.
    ///
    /// The returned token is the only request the round will accept an answer for.
    pub fn request_winner<O: RandomnessOracle>(
        &mut self,
        now: UnixTimestamp,
        balance: u64,
        oracle: &mut O,
    ) -> Result<PendingRequest, RaffleError> {
        self.ensure_upkeep(now, balance)?;

        let nonce = self
            .request_nonce
            .checked_add(1)
            .ok_or(RaffleError::Overflow)?;
        let request = RandomnessRequest::new(&self.config, nonce);
        let request_id = oracle.request_random_words(&request).map_err(|e| {
            msg!("Randomness request rejected: {}", e);
            RaffleError::OracleRequestFailed
        })?;

        let pending = PendingRequest {
            request_id,
            requested_at: now,
        };
        self.phase = RafflePhase::Calculating;
        self.pending_request = Some(pending);
        self.request_nonce = nonce;
        Ok(pending)
    }

    /// Computes the resolved round for `request_id` without touching `self`.
    ///
    /// Returns the next state together with the drawn winner.
    pub fn settle(
        &self,
        request_id: u64,
        random_value: u64,
        now: UnixTimestamp,
    ) -> Result<(RoundState, Pubkey), RaffleError> {
        match self.pending_request {
            Some(pending)
                if pending.request_id == request_id && self.phase == RafflePhase::Calculating => {}
            _ => {
                msg!("No outstanding randomness request with id {}", request_id);
                return Err(RaffleError::UnknownRequest);
            }
        }

        let index = winner_index(random_value, self.players.len());
        let winner = *self.players.get(index).ok_or_else(|| {
            msg!("Outstanding request has no players to draw from");
            RaffleError::UnknownRequest
        })?;

        let mut next = self.clone();
        next.recent_winner = Some(winner);
        next.phase = RafflePhase::Open;
        next.players = Vec::new();
        next.last_timestamp = now;
        next.pending_request = None;
        Ok((next, winner))
    }

    /// Resolves the outstanding request and pays `balance` to the winner.
    ///
    /// The resolved state is committed only once the payout went through. On failure
    /// `self` is left exactly as it was, still calculating, with the same request pending.
    pub fn fulfill<P: Payout>(
        &mut self,
        request_id: u64,
        random_value: u64,
        now: UnixTimestamp,
        balance: u64,
        payout: &mut P,
    ) -> Result<Pubkey, RaffleError> {
        let (next, winner) = self.settle(request_id, random_value, now)?;
        payout.transfer(&winner, balance).map_err(|e| {
            msg!("Payout of {} lamports to {} failed: {}", balance, winner, e);
            RaffleError::PayoutFailed
        })?;
        *self = next;
        Ok(winner)
    }

    /// Drops a request the coordinator never answered and reopens the round.
    ///
    /// Players and funds stay in place for the next request.
    pub fn reopen(&mut self, now: UnixTimestamp) -> Result<PendingRequest, RaffleError> {
        let pending = match (self.phase, self.pending_request) {
            (RafflePhase::Calculating, Some(pending)) => pending,
            _ => return Err(RaffleError::RoundNotCalculating),
        };
        if now.saturating_sub(pending.requested_at) < self.config.request_timeout {
            msg!(
                "Request {} issued at {} is not stale before {}",
                pending.request_id,
                pending.requested_at,
                pending.requested_at.saturating_add(self.config.request_timeout)
            );
            return Err(RaffleError::RequestNotStale);
        }
        self.phase = RafflePhase::Open;
        self.pending_request = None;
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RaffleConfig;

    const FEE: u64 = 1;
    const INTERVAL: i64 = 30;
    const START: i64 = 1_000;

    struct FixedOracle {
        next_id: u64,
        requests: Vec<RandomnessRequest>,
    }

    impl FixedOracle {
        fn new(next_id: u64) -> Self {
            Self {
                next_id,
                requests: Vec::new(),
            }
        }
    }

    impl RandomnessOracle for FixedOracle {
        fn request_random_words(
            &mut self,
            request: &RandomnessRequest,
        ) -> Result<u64, ProgramError> {
            self.requests.push(*request);
            let id = self.next_id;
            self.next_id += 1;
            Ok(id)
        }
    }

    struct DownOracle;

    impl RandomnessOracle for DownOracle {
        fn request_random_words(&mut self, _: &RandomnessRequest) -> Result<u64, ProgramError> {
            Err(ProgramError::Custom(99))
        }
    }

    #[derive(Default)]
    struct Ledger {
        transfers: Vec<(Pubkey, u64)>,
        refuse: Option<Pubkey>,
    }

    impl Payout for Ledger {
        fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), ProgramError> {
            if self.refuse == Some(*recipient) {
                return Err(ProgramError::InvalidArgument);
            }
            self.transfers.push((*recipient, amount));
            Ok(())
        }
    }

    fn round() -> RoundState {
        RoundState::new(
            Pubkey::new_unique(),
            255,
            RaffleConfig {
                entrance_fee: FEE,
                interval: INTERVAL,
                key_hash: [5u8; 32],
                callback_gas_limit: 500_000,
                coordinator: Pubkey::new_unique(),
                request_timeout: 600,
            },
            START,
        )
    }

    fn round_with(players: &[Pubkey]) -> RoundState {
        let mut state = round();
        for player in players {
            state.enter(*player, FEE).unwrap();
        }
        state
    }

    fn abc() -> [Pubkey; 3] {
        [Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()]
    }

    #[test]
    fn entries_are_recorded_in_call_order() {
        let [a, b, c] = abc();
        let mut state = round();
        state.enter(a, FEE).unwrap();
        state.enter(b, FEE + 5).unwrap();
        state.enter(a, FEE).unwrap();
        state.enter(c, FEE).unwrap();
        assert_eq!(state.players, vec![a, b, a, c]);
    }

    #[test]
    fn underpaid_entry_is_rejected() {
        let mut state = round();
        state.config.entrance_fee = 10;
        assert_eq!(
            state.enter(Pubkey::new_unique(), 9),
            Err(RaffleError::InsufficientPayment)
        );
        assert!(state.players.is_empty());
    }

    #[test]
    fn entry_is_rejected_while_calculating() {
        let [a, b, c] = abc();
        let mut state = round_with(&[a, b]);
        state
            .request_winner(START + INTERVAL, 2, &mut FixedOracle::new(1))
            .unwrap();
        let before = state.clone();
        assert_eq!(state.enter(c, FEE), Err(RaffleError::RoundNotOpen));
        assert_eq!(state, before);
    }

    #[test]
    fn underpayment_is_reported_before_closed_round() {
        let [a, b, _] = abc();
        let mut state = round_with(&[a]);
        state
            .request_winner(START + INTERVAL, 1, &mut FixedOracle::new(1))
            .unwrap();
        assert_eq!(state.enter(b, 0), Err(RaffleError::InsufficientPayment));
    }

    #[test]
    fn entries_stop_at_capacity() {
        let mut state = round();
        for _ in 0..MAX_PLAYERS {
            state.enter(Pubkey::new_unique(), FEE).unwrap();
        }
        assert_eq!(
            state.enter(Pubkey::new_unique(), FEE),
            Err(RaffleError::RoundFull)
        );
        assert_eq!(state.players.len(), MAX_PLAYERS);
    }

    #[test]
    fn upkeep_needs_every_condition() {
        let [a, _, _] = abc();
        let state = round_with(&[a]);
        let now = START + INTERVAL;
        assert!(state.check_upkeep(now, 1));

        assert!(!state.check_upkeep(now - 1, 1), "interval not elapsed");
        assert!(!state.check_upkeep(now, 0), "no balance");
        assert!(!round().check_upkeep(now, 1), "no players");

        let mut calculating = state.clone();
        calculating.phase = RafflePhase::Calculating;
        assert!(!calculating.check_upkeep(now, 1), "not open");
    }

    #[test]
    fn refused_request_reports_diagnostics_and_keeps_state() {
        let state = round();
        let mut after = state.clone();
        let mut oracle = FixedOracle::new(1);
        assert_eq!(
            after.request_winner(START + INTERVAL, 0, &mut oracle),
            Err(RaffleError::UpkeepNotNeeded {
                balance: 0,
                player_count: 0,
                phase: RafflePhase::Open,
            })
        );
        assert_eq!(after, state);
        assert!(oracle.requests.is_empty());
    }

    #[test]
    fn request_closes_round_and_records_token() {
        let [a, b, _] = abc();
        let mut state = round_with(&[a, b]);
        let mut oracle = FixedOracle::new(42);

        let pending = state.request_winner(START + INTERVAL, 2, &mut oracle).unwrap();

        assert_eq!(pending.request_id, 42);
        assert_eq!(pending.requested_at, START + INTERVAL);
        assert_eq!(state.phase, RafflePhase::Calculating);
        assert_eq!(state.pending_request, Some(pending));
        assert_eq!(state.request_nonce, 1);
        assert_eq!(oracle.requests.len(), 1);
        assert_eq!(oracle.requests[0].num_words, 1);
        assert_eq!(oracle.requests[0].request_confirmations, 3);
        assert_eq!(oracle.requests[0].nonce, 1);
    }

    #[test]
    fn second_request_is_refused_while_one_is_outstanding() {
        let [a, _, _] = abc();
        let mut state = round_with(&[a]);
        let mut oracle = FixedOracle::new(1);
        state.request_winner(START + INTERVAL, 1, &mut oracle).unwrap();
        let err = state
            .request_winner(START + INTERVAL, 1, &mut oracle)
            .unwrap_err();
        assert_eq!(
            err,
            RaffleError::UpkeepNotNeeded {
                balance: 1,
                player_count: 1,
                phase: RafflePhase::Calculating,
            }
        );
        assert_eq!(oracle.requests.len(), 1);
    }

    #[test]
    fn oracle_failure_leaves_round_open() {
        let [a, _, _] = abc();
        let mut state = round_with(&[a]);
        let before = state.clone();
        assert_eq!(
            state.request_winner(START + INTERVAL, 1, &mut DownOracle),
            Err(RaffleError::OracleRequestFailed)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn three_entrants_random_seven_pays_second() {
        let [a, b, c] = abc();
        let mut state = round_with(&[a, b, c]);
        let pending = state
            .request_winner(START + INTERVAL, 3, &mut FixedOracle::new(11))
            .unwrap();
        let mut ledger = Ledger::default();
        let resolved_at = START + INTERVAL + 5;

        let winner = state
            .fulfill(pending.request_id, 7, resolved_at, 3, &mut ledger)
            .unwrap();

        assert_eq!(winner, b);
        assert_eq!(ledger.transfers, vec![(b, 3)]);
        assert!(state.players.is_empty());
        assert_eq!(state.recent_winner, Some(b));
        assert_eq!(state.phase, RafflePhase::Open);
        assert_eq!(state.last_timestamp, resolved_at);
        assert_eq!(state.pending_request, None);
    }

    #[test]
    fn failed_payout_rolls_back_everything() {
        let [a, b, c] = abc();
        let mut state = round_with(&[a, b, c]);
        let previous_winner = Pubkey::new_unique();
        state.recent_winner = Some(previous_winner);
        let pending = state
            .request_winner(START + INTERVAL, 3, &mut FixedOracle::new(11))
            .unwrap();
        let before = state.clone();
        let mut ledger = Ledger {
            refuse: Some(b),
            ..Ledger::default()
        };

        assert_eq!(
            state.fulfill(pending.request_id, 7, START + 99, 3, &mut ledger),
            Err(RaffleError::PayoutFailed)
        );

        assert_eq!(state, before);
        assert_eq!(state.phase, RafflePhase::Calculating);
        assert_eq!(state.players, vec![a, b, c]);
        assert_eq!(state.recent_winner, Some(previous_winner));
        assert!(ledger.transfers.is_empty());

        // the same answer can be delivered again once the winner accepts funds
        ledger.refuse = None;
        assert_eq!(
            state.fulfill(pending.request_id, 7, START + 100, 3, &mut ledger),
            Ok(b)
        );
    }

    #[test]
    fn request_resolves_only_once() {
        let [a, b, _] = abc();
        let mut state = round_with(&[a, b]);
        let pending = state
            .request_winner(START + INTERVAL, 2, &mut FixedOracle::new(3))
            .unwrap();
        let mut ledger = Ledger::default();
        state
            .fulfill(pending.request_id, 0, START + INTERVAL, 2, &mut ledger)
            .unwrap();

        let after = state.clone();
        assert_eq!(
            state.fulfill(pending.request_id, 1, START + INTERVAL, 2, &mut ledger),
            Err(RaffleError::UnknownRequest)
        );
        assert_eq!(state, after);
        assert_eq!(ledger.transfers, vec![(a, 2)]);
    }

    #[test]
    fn unknown_request_id_is_rejected() {
        let [a, _, _] = abc();
        let mut state = round_with(&[a]);
        let pending = state
            .request_winner(START + INTERVAL, 1, &mut FixedOracle::new(8))
            .unwrap();
        let mut ledger = Ledger::default();
        assert_eq!(
            state.fulfill(pending.request_id + 1, 0, START, 1, &mut ledger),
            Err(RaffleError::UnknownRequest)
        );
        assert_eq!(state.phase, RafflePhase::Calculating);
        assert!(ledger.transfers.is_empty());
    }

    #[test]
    fn settle_does_not_mutate() {
        let [a, b, _] = abc();
        let mut state = round_with(&[a, b]);
        let pending = state
            .request_winner(START + INTERVAL, 2, &mut FixedOracle::new(1))
            .unwrap();
        let before = state.clone();
        let (next, winner) = state.settle(pending.request_id, 3, START + 60).unwrap();
        assert_eq!(state, before);
        assert_eq!(winner, b);
        assert_eq!(next.recent_winner, Some(b));
        assert_eq!(next.request_nonce, before.request_nonce);
    }

    #[test]
    fn new_round_waits_for_interval_after_resolution() {
        let [a, b, _] = abc();
        let mut state = round_with(&[a]);
        let mut oracle = FixedOracle::new(1);
        let pending = state.request_winner(START + INTERVAL, 1, &mut oracle).unwrap();
        let resolved_at = START + 100;
        state
            .fulfill(pending.request_id, 0, resolved_at, 1, &mut Ledger::default())
            .unwrap();

        state.enter(b, FEE).unwrap();
        assert!(!state.check_upkeep(resolved_at + INTERVAL - 1, 1));
        let second = state
            .request_winner(resolved_at + INTERVAL, 1, &mut oracle)
            .unwrap();
        assert_ne!(second.request_id, pending.request_id);
        assert_eq!(state.request_nonce, 2);
    }

    #[test]
    fn stale_request_can_be_abandoned() {
        let [a, b, _] = abc();
        let mut state = round_with(&[a, b]);
        let pending = state
            .request_winner(START + INTERVAL, 2, &mut FixedOracle::new(4))
            .unwrap();
        let timeout = state.config.request_timeout;

        assert_eq!(
            state.reopen(pending.requested_at + timeout - 1),
            Err(RaffleError::RequestNotStale)
        );
        assert_eq!(state.phase, RafflePhase::Calculating);

        assert_eq!(state.reopen(pending.requested_at + timeout), Ok(pending));
        assert_eq!(state.phase, RafflePhase::Open);
        assert_eq!(state.pending_request, None);
        assert_eq!(state.players, vec![a, b]);
        assert_eq!(state.last_timestamp, START);

        // the late answer no longer resolves anything
        assert_eq!(
            state.fulfill(pending.request_id, 1, START + 10_000, 2, &mut Ledger::default()),
            Err(RaffleError::UnknownRequest)
        );
    }

    #[test]
    fn open_round_cannot_be_reopened() {
        let mut state = round();
        assert_eq!(state.reopen(START + 10_000), Err(RaffleError::RoundNotCalculating));
    }
}
