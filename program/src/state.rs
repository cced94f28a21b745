use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    clock::UnixTimestamp,
    msg,
    program_error::ProgramError,
    program_pack::IsInitialized,
    pubkey::Pubkey,
};

use crate::config::{RaffleConfig, MAX_PLAYERS};
use crate::error::RaffleError;

/// Phase of the current round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RafflePhase {
    /// Accepting entries
    Open,
    /// Waiting for the coordinator to deliver randomness
    Calculating,
}

impl Default for RafflePhase {
    fn default() -> Self {
        RafflePhase::Open
    }
}

/// Token for the single randomness request in flight
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_id: u64,
    /// When the request was issued
    pub requested_at: UnixTimestamp,
}

/// Round account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundState {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Creator of the raffle, allowed to reopen a stale round
    pub authority: Pubkey,
    /// Bump of the round PDA
    pub bump: u8,
    pub config: RaffleConfig,
    /// Entrants of the current round, in entry order
    pub players: Vec<Pubkey>,
    /// Time of the last round reset
    pub last_timestamp: UnixTimestamp,
    /// Winner of the last resolved round
    pub recent_winner: Option<Pubkey>,
    pub phase: RafflePhase,
    pub pending_request: Option<PendingRequest>,
    /// Number of randomness requests issued so far
    pub request_nonce: u64,
}

impl IsInitialized for RoundState {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl RoundState {
    /// Space reserved for a round account holding `MAX_PLAYERS` entrants.
    pub const LEN: usize = 1
        + 32
        + 1
        + RaffleConfig::LEN
        + (4 + 32 * MAX_PLAYERS)
        + 8
        + (1 + 32)
        + 1
        + (1 + 8 + 8)
        + 8;

    pub fn new(
        authority: Pubkey,
        bump: u8,
        config: RaffleConfig,
        now: UnixTimestamp,
    ) -> Self {
        Self {
            is_initialized: true,
            authority,
            bump,
            config,
            players: Vec::new(),
            last_timestamp: now,
            recent_winner: None,
            phase: RafflePhase::Open,
            pending_request: None,
            request_nonce: 0,
        }
    }

    /// Reads the round from an account owned by `program_id`.
    pub fn load(account: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if account.owner != program_id {
            msg!("Round account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let state = Self::unpack_unchecked(&account.data.borrow())?;
        if !state.is_initialized() {
            msg!("Round account {} is not initialized", account.key);
            return Err(RaffleError::NotInitialized.into());
        }
        Ok(state)
    }

    /// Decodes the round without checking initialization.
    pub fn unpack_unchecked(src: &[u8]) -> Result<Self, ProgramError> {
        Self::deserialize(&mut &src[..]).map_err(|_| ProgramError::InvalidAccountData)
    }

    pub fn store(&self, account: &AccountInfo) -> Result<(), ProgramError> {
        let mut data = account.data.borrow_mut();
        let mut dst: &mut [u8] = &mut data[..];
        self.serialize(&mut dst)
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> i64 {
        self.config.interval
    }

    pub fn phase(&self) -> RafflePhase {
        self.phase
    }

    pub fn player(&self, index: usize) -> Option<&Pubkey> {
        self.players.get(index)
    }

    pub fn number_of_players(&self) -> usize {
        self.players.len()
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.recent_winner
    }

    pub fn pending_request(&self) -> Option<PendingRequest> {
        self.pending_request
    }
}
