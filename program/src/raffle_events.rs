use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, program_error::ProgramError, pubkey::Pubkey};

/// Notifications published by the raffle. Each one is logged as a readable
/// line and as a borsh payload for indexers.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    /// A player joined the current round
    Entered { player: Pubkey },
    /// Randomness was requested for the current round
    RandomWordsRequested { request_id: u64 },
    /// The round was drawn and paid out
    WinnerPicked { winner: Pubkey },
}

impl RaffleEvent {
    pub fn emit(&self) -> Result<(), ProgramError> {
        match self {
            RaffleEvent::Entered { player } => msg!("Entered: {}", player),
            RaffleEvent::RandomWordsRequested { request_id } => {
                msg!("RandomWordsRequested: {}", request_id)
            }
            RaffleEvent::WinnerPicked { winner } => msg!("WinnerPicked: {}", winner),
        }

        let data = self
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        sol_log_data(&[&data]);
        Ok(())
    }
}
