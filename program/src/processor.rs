use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};

use crate::{
    config::RaffleConfig,
    error::RaffleError,
    events::RaffleEvent,
    instruction::{find_raffle_address, RaffleInstruction},
    oracle::CoordinatorQueue,
    round::Payout,
    state::RoundState,
    utils::held_balance,
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle { config } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(program_id, accounts, config)
            }
            RaffleInstruction::Enter { payment } => {
                msg!("Instruction: Enter");
                Self::process_enter(program_id, accounts, payment)
            }
            RaffleInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            RaffleInstruction::RequestWinner => {
                msg!("Instruction: Request Winner");
                Self::process_request_winner(program_id, accounts)
            }
            RaffleInstruction::FulfillRandomness {
                request_id,
                random_value,
            } => {
                msg!("Instruction: Fulfill Randomness");
                Self::process_fulfill_randomness(program_id, accounts, request_id, random_value)
            }
            RaffleInstruction::ReopenRound => {
                msg!("Instruction: Reopen Round");
                Self::process_reopen_round(program_id, accounts)
            }
        }
    }

    fn process_initialize_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        config: RaffleConfig,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if system_program_info.key != &system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }
        config.validate().map_err(report)?;

        let (expected, bump) = find_raffle_address(program_id, authority_info.key);
        if expected != *raffle_info.key {
            msg!("Round account must be the PDA {}", expected);
            return Err(ProgramError::InvalidSeeds);
        }
        if raffle_info.owner == program_id || raffle_info.data_len() > 0 {
            return Err(report(RaffleError::AlreadyInitialized));
        }

        let clock = Clock::get()?;
        let rent = Rent::get()?;
        let space = RoundState::LEN;
        let bump_seed = [bump];
        let signer_seeds: &[&[u8]] = &[b"raffle", authority_info.key.as_ref(), &bump_seed];
        if raffle_info.lamports() == 0 {
            invoke_signed(
                &system_instruction::create_account(
                    authority_info.key,
                    raffle_info.key,
                    rent.minimum_balance(space),
                    space as u64,
                    program_id,
                ),
                &[
                    authority_info.clone(),
                    raffle_info.clone(),
                    system_program_info.clone(),
                ],
                &[signer_seeds],
            )?;
        } else {
            // The address already holds lamports, so create_account would be refused
            msg!("Round account is prefunded with {} lamports", raffle_info.lamports());
            let top_up = rent
                .minimum_balance(space)
                .saturating_sub(raffle_info.lamports());
            if top_up > 0 {
                invoke(
                    &system_instruction::transfer(authority_info.key, raffle_info.key, top_up),
                    &[
                        authority_info.clone(),
                        raffle_info.clone(),
                        system_program_info.clone(),
                    ],
                )?;
            }
            invoke_signed(
                &system_instruction::allocate(raffle_info.key, space as u64),
                &[raffle_info.clone(), system_program_info.clone()],
                &[signer_seeds],
            )?;
            invoke_signed(
                &system_instruction::assign(raffle_info.key, program_id),
                &[raffle_info.clone(), system_program_info.clone()],
                &[signer_seeds],
            )?;
        }

        RoundState::new(*authority_info.key, bump, config, clock.unix_timestamp)
            .store(raffle_info)?;

        RaffleEvent::RaffleInitialized {
            raffle: *raffle_info.key,
            entrance_fee: config.entrance_fee,
            interval: config.interval,
        }
        .emit();
        Ok(())
    }

    fn process_enter(program_id: &Pubkey, accounts: &[AccountInfo], payment: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut state = RoundState::load(raffle_info, program_id)?;
        state.enter(*player_info.key, payment).map_err(report)?;

        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, payment),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;
        state.store(raffle_info)?;

        RaffleEvent::Entered {
            player: *player_info.key,
        }
        .emit();
        Ok(())
    }

    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let state = RoundState::load(raffle_info, program_id)?;
        let now = Clock::get()?.unix_timestamp;
        let balance = held_balance(raffle_info, &Rent::get()?);

        let upkeep_needed = state.check_upkeep(now, balance);
        msg!(
            "Upkeep needed: {} (balance {}, players {}, phase {:?})",
            upkeep_needed,
            balance,
            state.number_of_players(),
            state.phase()
        );
        set_return_data(&[upkeep_needed as u8]);
        Ok(())
    }

    fn process_request_winner(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut state = RoundState::load(raffle_info, program_id)?;
        let now = Clock::get()?.unix_timestamp;
        let balance = held_balance(raffle_info, &Rent::get()?);

        let mut oracle = CoordinatorQueue::new(raffle_info.key);
        let pending = state
            .request_winner(now, balance, &mut oracle)
            .map_err(report)?;
        state.store(raffle_info)?;

        msg!(
            "Round closed with {} players, waiting for request {}",
            state.number_of_players(),
            pending.request_id
        );
        Ok(())
    }

    fn process_fulfill_randomness(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_value: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let coordinator_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let mut state = RoundState::load(raffle_info, program_id)?;
        if !coordinator_info.is_signer || *coordinator_info.key != state.config.coordinator {
            msg!("Randomness must be delivered by coordinator {}", state.config.coordinator);
            return Err(report(RaffleError::Unauthorized));
        }

        let now = Clock::get()?.unix_timestamp;
        let prize = held_balance(raffle_info, &Rent::get()?);

        let mut payout = LamportPayout {
            from: raffle_info,
            to: winner_info,
        };
        let winner = state
            .fulfill(request_id, random_value, now, prize, &mut payout)
            .map_err(report)?;
        RaffleEvent::WinnerPicked { winner, prize }.emit();
        state.store(raffle_info)?;
        Ok(())
    }

    fn process_reopen_round(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;

        let mut state = RoundState::load(raffle_info, program_id)?;
        if !authority_info.is_signer || *authority_info.key != state.authority {
            msg!("Only the raffle authority can reopen a round");
            return Err(report(RaffleError::Unauthorized));
        }

        let now = Clock::get()?.unix_timestamp;
        let abandoned = state.reopen(now).map_err(report)?;
        state.store(raffle_info)?;

        RaffleEvent::RoundReopened {
            request_id: abandoned.request_id,
        }
        .emit();
        Ok(())
    }
}

/// Moves the prize out of the round account into the winner account
struct LamportPayout<'a, 'info> {
    from: &'a AccountInfo<'info>,
    to: &'a AccountInfo<'info>,
}

impl Payout for LamportPayout<'_, '_> {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        if self.to.key != recipient {
            msg!("Winner account {} is not the drawn winner {}", self.to.key, recipient);
            return Err(ProgramError::InvalidArgument);
        }
        if !self.to.is_writable {
            msg!("Winner account must be writable");
            return Err(ProgramError::InvalidArgument);
        }

        let from_lamports = self
            .from
            .lamports()
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        let to_lamports = self
            .to
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::Overflow)?;
        **self.from.try_borrow_mut_lamports()? = from_lamports;
        **self.to.try_borrow_mut_lamports()? = to_lamports;
        Ok(())
    }
}

fn report(e: RaffleError) -> ProgramError {
    msg!("Error: {}", e);
    e.into()
}
