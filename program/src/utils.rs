// Raffle Program - Utility Functions
use solana_program::{account_info::AccountInfo, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::raffle_error::RaffleError;

/// Position of the winning entry for a random word, `None` for an empty ledger
pub fn winner_index(random_word: u64, player_count: usize) -> Option<usize> {
    if player_count == 0 {
        return None;
    }
    Some((random_word % player_count as u64) as usize)
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}

/// Moves the prize to the round winner
pub trait PayoutTransfer {
    fn transfer(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError>;
}

/// Pays out of a program-owned account by moving lamports directly
pub struct LamportPayout<'a, 'info> {
    pub source: &'a AccountInfo<'info>,
    pub destination: &'a AccountInfo<'info>,
}

impl<'a, 'info> PayoutTransfer for LamportPayout<'a, 'info> {
    fn transfer(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        if self.destination.key != winner {
            msg!(
                "Prize recipient {} is not the winner {}",
                self.destination.key,
                winner
            );
            return Err(ProgramError::InvalidArgument);
        }

        let source_lamports = self
            .source
            .lamports()
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        let destination_lamports = self
            .destination
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::Overflow)?;

        **self.source.try_borrow_mut_lamports()? = source_lamports;
        **self.destination.try_borrow_mut_lamports()? = destination_lamports;
        Ok(())
    }
}
