use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Events published in the program log for off-chain indexers and the coordinator.
///
/// Each event is written twice: borsh-encoded through `sol_log_data` and as a readable line.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    RaffleInitialized {
        raffle: Pubkey,
        entrance_fee: u64,
        interval: i64,
    },
    Entered {
        player: Pubkey,
    },
    RandomnessRequested {
        raffle: Pubkey,
        request_id: u64,
        key_hash: [u8; 32],
        request_confirmations: u16,
        callback_gas_limit: u32,
        num_words: u32,
    },
    WinnerPicked {
        winner: Pubkey,
        prize: u64,
    },
    RoundReopened {
        request_id: u64,
    },
}

impl RaffleEvent {
    pub fn emit(&self) {
        match self {
            RaffleEvent::RaffleInitialized {
                raffle,
                entrance_fee,
                interval,
            } => msg!(
                "RaffleInitialized: raffle={} fee={} interval={}",
                raffle,
                entrance_fee,
                interval
            ),
            RaffleEvent::Entered { player } => msg!("Entered: {}", player),
            RaffleEvent::RandomnessRequested { request_id, .. } => {
                msg!("RandomnessRequested: {}", request_id)
            }
            RaffleEvent::WinnerPicked { winner, prize } => {
                msg!("WinnerPicked: {} prize={}", winner, prize)
            }
            RaffleEvent::RoundReopened { request_id } => {
                msg!("RoundReopened: abandoned request {}", request_id)
            }
        }
        match self.try_to_vec() {
            Ok(data) => sol_log_data(&[&data]),
            Err(e) => msg!("Failed to encode event: {}", e),
        }
    }
}
