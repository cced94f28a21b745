use solana_program::{account_info::AccountInfo, rent::Rent};

/// Lamports held for the pot, above the rent-exempt reserve of the account
pub fn held_balance(account: &AccountInfo, rent: &Rent) -> u64 {
    pot_of(account.lamports(), account.data_len(), rent)
}

fn pot_of(lamports: u64, data_len: usize, rent: &Rent) -> u64 {
    lamports.saturating_sub(rent.minimum_balance(data_len))
}
