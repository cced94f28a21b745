// VRF Raffle
// A recurring lottery round: players pay an entrance fee, a randomness
// coordinator picks the winner and the whole pot goes to them.

pub mod config;
pub mod error;
pub mod events;
pub mod instruction;
pub mod oracle;
pub mod processor;
pub mod round;
pub mod state;
pub mod utils;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
