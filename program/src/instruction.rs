use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::config::RaffleConfig;
use crate::error::RaffleError;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create the round account of an authority
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The authority, pays for the round account
    /// 1. `[writable]` The round account (PDA of `["raffle", authority]`)
    /// 2. `[]` The system program
    InitializeRaffle { config: RaffleConfig },

    /// Join the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player paying the entry
    /// 1. `[writable]` The round account
    /// 2. `[]` The system program
    Enter {
        /// Lamports moved into the pot, at least the entrance fee
        payment: u64,
    },

    /// Report whether a winner may be requested. The answer is set as return data
    /// (`[1]` or `[0]`).
    ///
    /// Accounts expected:
    /// 0. `[]` The round account
    CheckUpkeep,

    /// Close the round and request randomness
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any caller acting as the trigger
    /// 1. `[writable]` The round account
    RequestWinner,

    /// Deliver the random word for the outstanding request and pay the winner
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator configured for the round
    /// 1. `[writable]` The round account
    /// 2. `[writable]` The drawn winner
    FulfillRandomness { request_id: u64, random_value: u64 },

    /// Abandon a request the coordinator never answered
    ///
    /// Accounts expected:
    /// 0. `[signer]` The raffle authority
    /// 1. `[writable]` The round account
    ReopenRound,
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| RaffleError::InvalidInstruction.into())
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        self.try_to_vec().unwrap_or_default()
    }
}

/// Find the round account of an authority
pub fn find_raffle_address(program_id: &Pubkey, authority: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"raffle", authority.as_ref()], program_id)
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    authority: &Pubkey,
    config: RaffleConfig,
) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id, authority);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::InitializeRaffle { config }.pack(),
    }
}

/// Create enter instruction
pub fn enter(program_id: &Pubkey, player: &Pubkey, raffle: &Pubkey, payment: u64) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*player, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::Enter { payment }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, raffle: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle, false)],
        data: RaffleInstruction::CheckUpkeep.pack(),
    }
}

/// Create request_winner instruction
pub fn request_winner(program_id: &Pubkey, caller: &Pubkey, raffle: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*caller, true),
            AccountMeta::new(*raffle, false),
        ],
        data: RaffleInstruction::RequestWinner.pack(),
    }
}

/// Create fulfill_randomness instruction
pub fn fulfill_randomness(
    program_id: &Pubkey,
    coordinator: &Pubkey,
    raffle: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_value: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*coordinator, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new(*winner, false),
        ],
        data: RaffleInstruction::FulfillRandomness {
            request_id,
            random_value,
        }
        .pack(),
    }
}

/// Create reopen_round instruction
pub fn reopen_round(program_id: &Pubkey, authority: &Pubkey, raffle: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*raffle, false),
        ],
        data: RaffleInstruction::ReopenRound.pack(),
    }
}
