use crate::raffle_error::RaffleError;
use crate::raffle_events::RaffleEvent;
use crate::raffle_instruction::RaffleInstruction;
use crate::raffle_state::{Raffle, RaffleConfig};
use crate::utils::{lamports_to_sol, LamportPayout};
use crate::vrf::CoordinatorOracle;

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, set_return_data},
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack},
    pubkey::Pubkey,
    system_instruction,
    system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
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
            RaffleInstruction::InitializeRaffle {
                entrance_fee,
                interval,
                key_hash,
                subscription_id,
                request_confirmations,
                callback_gas_limit,
                num_words,
            } => {
                msg!("Instruction: Initialize Raffle");
                let params = RaffleParams {
                    entrance_fee,
                    interval,
                    key_hash,
                    subscription_id,
                    request_confirmations,
                    callback_gas_limit,
                    num_words,
                };
                Self::process_initialize_raffle(accounts, params, program_id)
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, amount, program_id)
            }
            RaffleInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
            RaffleInstruction::PerformUpkeep => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(accounts, request_id, &random_words, program_id)
            }
        }
    }

    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        params: RaffleParams,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let vrf_coordinator_info = next_account_info(account_info_iter)?;
        let fulfillment_authority_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        // The raffle account is a fresh keypair, so both must sign
        if !payer_info.is_signer || !raffle_info.is_signer {
            msg!("Payer and raffle account must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        check_system_program(system_program_info)?;

        let config = RaffleConfig {
            entrance_fee: params.entrance_fee,
            interval: params.interval,
            vrf_coordinator: *vrf_coordinator_info.key,
            fulfillment_authority: *fulfillment_authority_info.key,
            key_hash: params.key_hash,
            subscription_id: params.subscription_id,
            request_confirmations: params.request_confirmations,
            callback_gas_limit: params.callback_gas_limit,
            num_words: params.num_words,
        };
        config.validate().map_err(RaffleError::report)?;

        // Create the account on first use, refuse to overwrite a live raffle
        if raffle_info.owner == program_id {
            if Raffle::unpack_unchecked(&raffle_info.data.borrow())?.is_initialized() {
                msg!("Raffle account is already initialized");
                return Err(ProgramError::AccountAlreadyInitialized);
            }
        } else if raffle_info.owner == &system_program::id() {
            let rent_lamports = Rent::get()?.minimum_balance(Raffle::LEN);
            invoke(
                &system_instruction::create_account(
                    payer_info.key,
                    raffle_info.key,
                    rent_lamports,
                    Raffle::LEN as u64,
                    program_id,
                ),
                &[
                    payer_info.clone(),
                    raffle_info.clone(),
                    system_program_info.clone(),
                ],
            )?;
        } else {
            msg!("Raffle account is owned by another program");
            return Err(ProgramError::IncorrectProgramId);
        }

        // The first round starts now
        let now = Clock::get()?.unix_timestamp;
        let raffle = Raffle::new(config, now);
        raffle.save(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: EntranceFee={} SOL, Interval={}s, Coordinator={}",
            lamports_to_sol(config.entrance_fee),
            config.interval,
            config.vrf_coordinator
        );
        Ok(())
    }

    fn process_enter_raffle(
        accounts: &[AccountInfo],
        amount: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        check_system_program(system_program_info)?;

        let mut raffle = load_raffle(raffle_info, program_id)?;
        raffle.enter(*player_info.key, amount).map_err(RaffleError::report)?;

        // Move the entry into the pot
        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, amount),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        raffle.save(&mut raffle_info.data.borrow_mut())?;
        RaffleEvent::Entered {
            player: *player_info.key,
        }
        .emit()?;

        msg!(
            "Entry of {} lamports accepted. Players: {}, Pot: {} lamports",
            amount,
            raffle.number_of_players(),
            raffle.balance()
        );
        Ok(())
    }

    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let raffle = load_raffle(raffle_info, program_id)?;
        let status = raffle.upkeep_status(Clock::get()?.unix_timestamp);

        msg!(
            "Upkeep needed: {} (open={}, time_passed={}, has_players={}, has_balance={})",
            status.needed(),
            status.is_open,
            status.time_passed,
            status.has_players,
            status.has_balance
        );
        // One byte answer for the scheduler: 1 when upkeep is due
        set_return_data(&[status.needed() as u8]);
        Ok(())
    }

    /// Closes the round and asks the coordinator for randomness. The
    /// coordinator is handed the raffle account already in `Calculating`.
    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        let vrf_coordinator_info = next_account_info(account_info_iter)?;
        let coordinator_state_info = next_account_info(account_info_iter)?;
        let remaining_accounts = account_info_iter.as_slice();

        let mut raffle = load_raffle(raffle_info, program_id)?;

        // Only the configured coordinator may be asked for randomness
        if *vrf_coordinator_info.key != raffle.config.vrf_coordinator {
            return Err(RaffleError::InvalidOracle.report());
        }

        let now = Clock::get()?.unix_timestamp;
        let mut oracle = CoordinatorOracle {
            coordinator_program: vrf_coordinator_info,
            coordinator_state: coordinator_state_info,
            consumer: raffle_info,
            remaining_accounts,
        };
        let request_id = raffle.perform_upkeep(now, &mut oracle)?;

        // Persist the pending request id
        raffle.save(&mut raffle_info.data.borrow_mut())?;

        RaffleEvent::RandomWordsRequested { request_id }.emit()?;
        msg!(
            "Randomness requested: RequestId={}, Players={}",
            request_id,
            raffle.number_of_players()
        );
        Ok(())
    }

    fn process_fulfill_random_words(
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[u64],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let mut raffle = load_raffle(raffle_info, program_id)?;

        // Words are only accepted from the oracle's authority
        if !authority_info.is_signer || *authority_info.key != raffle.config.fulfillment_authority {
            return Err(RaffleError::UnauthorizedFulfillment.report());
        }

        let now = Clock::get()?.unix_timestamp;
        let mut payout = LamportPayout {
            source: raffle_info,
            destination: winner_info,
        };
        let settled = raffle
            .fulfill_random_words(request_id, random_words, now, &mut payout)
            .map_err(RaffleError::report)?;

        raffle.save(&mut raffle_info.data.borrow_mut())?;
        RaffleEvent::WinnerPicked {
            winner: settled.winner,
        }
        .emit()?;

        msg!(
            "Winner {} paid {} SOL for request {}",
            settled.winner,
            lamports_to_sol(settled.amount),
            request_id
        );
        Ok(())
    }
}

/// Construction arguments carried by `InitializeRaffle`
struct RaffleParams {
    entrance_fee: u64,
    interval: u64,
    key_hash: [u8; 32],
    subscription_id: u64,
    request_confirmations: u16,
    callback_gas_limit: u32,
    num_words: u32,
}

fn load_raffle(raffle_info: &AccountInfo, program_id: &Pubkey) -> Result<Raffle, ProgramError> {
    if raffle_info.owner != program_id {
        msg!("Raffle account must be owned by the program");
        return Err(ProgramError::IncorrectProgramId);
    }
    Raffle::unpack(&raffle_info.data.borrow())
}

fn check_system_program(system_program_info: &AccountInfo) -> ProgramResult {
    if *system_program_info.key != system_program::id() {
        msg!("Expected the system program");
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}
