use solana_program::{decode_error::DecodeError, program_error::ProgramError};
use thiserror::Error;

use crate::state::RafflePhase;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstruction,

    #[error("Raffle already initialized")]
    AlreadyInitialized,

    #[error("Raffle not initialized")]
    NotInitialized,

    /// Initialization parameters are out of bounds
    #[error("Invalid raffle config")]
    InvalidConfig,

    /// Payment attached to an entry is below the entrance fee
    #[error("Payment below the entrance fee")]
    InsufficientPayment,

    /// Entries are only accepted while the round is open
    #[error("Round is not open")]
    RoundNotOpen,

    /// The participant list reached its capacity
    #[error("Round is full")]
    RoundFull,

    /// The trigger asked for a winner while the round was not eligible
    #[error("Upkeep not needed (balance {balance}, players {player_count}, phase {phase:?})")]
    UpkeepNotNeeded {
        balance: u64,
        player_count: u64,
        phase: RafflePhase,
    },

    /// The randomness oracle refused the request
    #[error("Randomness request failed")]
    OracleRequestFailed,

    /// No outstanding request carries this id
    #[error("Unknown or already fulfilled randomness request")]
    UnknownRequest,

    /// The prize could not be delivered to the winner
    #[error("Payout to the winner failed")]
    PayoutFailed,

    #[error("Signer is not allowed to perform this action")]
    Unauthorized,

    #[error("Round is not waiting for randomness")]
    RoundNotCalculating,

    /// The outstanding request has not yet reached the request timeout
    #[error("Randomness request is not stale yet")]
    RequestNotStale,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl RaffleError {
    /// Stable custom error code reported through `ProgramError::Custom`.
    pub fn code(&self) -> u32 {
        match self {
            RaffleError::InvalidInstruction => 0,
            RaffleError::AlreadyInitialized => 1,
            RaffleError::NotInitialized => 2,
            RaffleError::InvalidConfig => 3,
            RaffleError::InsufficientPayment => 4,
            RaffleError::RoundNotOpen => 5,
            RaffleError::RoundFull => 6,
            RaffleError::UpkeepNotNeeded { .. } => 7,
            RaffleError::OracleRequestFailed => 8,
            RaffleError::UnknownRequest => 9,
            RaffleError::PayoutFailed => 10,
            RaffleError::Unauthorized => 11,
            RaffleError::RoundNotCalculating => 12,
            RaffleError::RequestNotStale => 13,
            RaffleError::Overflow => 14,
        }
    }
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e.code())
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upkeep_not_needed_keeps_one_code_for_any_diagnostics() {
        let a = RaffleError::UpkeepNotNeeded {
            balance: 0,
            player_count: 0,
            phase: RafflePhase::Open,
        };
        let b = RaffleError::UpkeepNotNeeded {
            balance: 30,
            player_count: 3,
            phase: RafflePhase::Calculating,
        };
        assert_eq!(ProgramError::from(a), ProgramError::from(b));
        assert_eq!(ProgramError::from(a), ProgramError::Custom(7));
    }

    #[test]
    fn upkeep_message_carries_diagnostics() {
        let e = RaffleError::UpkeepNotNeeded {
            balance: 30,
            player_count: 3,
            phase: RafflePhase::Calculating,
        };
        assert_eq!(
            e.to_string(),
            "Upkeep not needed (balance 30, players 3, phase Calculating)"
        );
    }
}
