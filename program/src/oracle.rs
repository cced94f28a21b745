// Randomness coordinator integration
//
// The coordinator is an off-chain service that watches the program log for
// `RandomnessRequested` events and answers each one by signing a
// `FulfillRandomness` instruction with the random word.
use solana_program::{hash::hashv, program_error::ProgramError, pubkey::Pubkey};

use crate::config::{RaffleConfig, NUM_WORDS, REQUEST_CONFIRMATIONS};
use crate::events::RaffleEvent;

/// Parameters of a single randomness request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomnessRequest {
    pub key_hash: [u8; 32],
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
    /// Randomness is paid through the subscription, never in native lamports
    pub native_payment: bool,
    /// Per-round counter making each request id unique
    pub nonce: u64,
}

impl RandomnessRequest {
    pub fn new(config: &RaffleConfig, nonce: u64) -> Self {
        Self {
            key_hash: config.key_hash,
            request_confirmations: REQUEST_CONFIRMATIONS,
            callback_gas_limit: config.callback_gas_limit,
            num_words: NUM_WORDS,
            native_payment: false,
            nonce,
        }
    }
}

/// Source of asynchronous randomness.
///
/// Submitting a request returns its id; the answer arrives later in a separate call.
pub trait RandomnessOracle {
    fn request_random_words(&mut self, request: &RandomnessRequest) -> Result<u64, ProgramError>;
}

/// Publishes requests for the off-chain coordinator of one round account
pub struct CoordinatorQueue<'a> {
    raffle: &'a Pubkey,
}

impl<'a> CoordinatorQueue<'a> {
    pub fn new(raffle: &'a Pubkey) -> Self {
        Self { raffle }
    }
}

impl RandomnessOracle for CoordinatorQueue<'_> {
    fn request_random_words(&mut self, request: &RandomnessRequest) -> Result<u64, ProgramError> {
        let request_id = request_id(&request.key_hash, self.raffle, request.nonce);
        RaffleEvent::RandomnessRequested {
            raffle: *self.raffle,
            request_id,
            key_hash: request.key_hash,
            request_confirmations: request.request_confirmations,
            callback_gas_limit: request.callback_gas_limit,
            num_words: request.num_words,
        }
        .emit();
        Ok(request_id)
    }
}

/// Derives the id of a request from its lane, requester and nonce
pub fn request_id(key_hash: &[u8; 32], raffle: &Pubkey, nonce: u64) -> u64 {
    let hash = hashv(&[&key_hash[..], raffle.as_ref(), &nonce.to_le_bytes()]);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.to_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Index of the winning entry for a delivered random value
pub fn winner_index(random_value: u64, player_count: usize) -> usize {
    if player_count == 0 {
        return 0;
    }
    (random_value % player_count as u64) as usize
}
