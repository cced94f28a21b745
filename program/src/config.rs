use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

use crate::error::RaffleError;

/// Confirmations the coordinator waits for before answering a request
pub const REQUEST_CONFIRMATIONS: u16 = 3;

/// Random words asked for per request
pub const NUM_WORDS: u32 = 1;

/// Capacity of the participant list in a round account
pub const MAX_PLAYERS: usize = 200;

/// Parameters fixed when a raffle is initialized. None of them can change afterwards.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum payment in lamports to join a round
    pub entrance_fee: u64,
    /// Minimum number of seconds between two draws
    pub interval: i64,
    /// Oracle lane the randomness is requested on
    pub key_hash: [u8; 32],
    /// Compute budget the coordinator attaches to its callback
    pub callback_gas_limit: u32,
    /// Signing identity of the randomness coordinator
    pub coordinator: Pubkey,
    /// Seconds after which an unanswered request may be discarded by the authority
    pub request_timeout: i64,
}

impl RaffleConfig {
    pub const LEN: usize = 8 + 8 + 32 + 4 + 32 + 8;

    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.entrance_fee == 0 {
            msg!("Entrance fee must be greater than zero");
            return Err(RaffleError::InvalidConfig);
        }
        if self.interval < 0 {
            msg!("Interval cannot be negative");
            return Err(RaffleError::InvalidConfig);
        }
        if self.callback_gas_limit == 0 {
            msg!("Callback gas limit must be greater than zero");
            return Err(RaffleError::InvalidConfig);
        }
        if self.request_timeout <= 0 {
            msg!("Request timeout must be greater than zero");
            return Err(RaffleError::InvalidConfig);
        }
        if self.coordinator == Pubkey::default() {
            msg!("Coordinator must be set");
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }
}
