use num_traits::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

use crate::raffle_state::RaffleState;

/// Errors that may be returned by the Raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Attached value is below the entrance fee
    #[error("Not enough lamports sent to enter the raffle")]
    InsufficientPayment,

    /// Raffle is drawing a winner and does not accept entries
    #[error("Raffle is not open")]
    RaffleNotOpen,

    /// Upkeep was requested while the raffle is not eligible
    #[error("Upkeep not needed: balance={balance}, players={players}, state={state:?}")]
    UpkeepNotNeeded {
        balance: u64,
        players: u64,
        state: RaffleState,
    },

    /// Fulfillment does not match the outstanding randomness request
    #[error("Fulfillment for unknown request")]
    UnknownRequest,

    /// The payout to the winner could not be made
    #[error("Transfer to winner failed")]
    TransferFailed,

    /// Fulfillment carried no random words
    #[error("Fulfillment carried no random words")]
    MissingRandomWords,

    /// Entry ledger has no free slot
    #[error("Raffle is full")]
    RaffleFull,

    /// Player lookup past the end of the ledger
    #[error("Player index out of range")]
    PlayerIndexOutOfRange,

    /// Fulfillment not signed by the configured oracle authority
    #[error("Fulfillment not signed by the oracle authority")]
    UnauthorizedFulfillment,

    /// Coordinator account does not match the raffle configuration
    #[error("Unexpected randomness coordinator")]
    InvalidOracle,

    /// Coordinator returned no usable request id
    #[error("Malformed response from randomness coordinator")]
    MalformedOracleResponse,

    /// Construction parameters rejected
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    Overflow,
}

impl RaffleError {
    /// Stable custom error code reported to clients.
    pub fn code(&self) -> u32 {
        match self {
            RaffleError::InsufficientPayment => 0,
            RaffleError::RaffleNotOpen => 1,
            RaffleError::UpkeepNotNeeded { .. } => 2,
            RaffleError::UnknownRequest => 3,
            RaffleError::TransferFailed => 4,
            RaffleError::MissingRandomWords => 5,
            RaffleError::RaffleFull => 6,
            RaffleError::PlayerIndexOutOfRange => 7,
            RaffleError::UnauthorizedFulfillment => 8,
            RaffleError::InvalidOracle => 9,
            RaffleError::MalformedOracleResponse => 10,
            RaffleError::InvalidConfig => 11,
            RaffleError::Overflow => 12,
        }
    }
}

impl RaffleError {
    /// Logs the error and converts it for the runtime
    pub fn report(self) -> ProgramError {
        self.print::<RaffleError>();
        self.into()
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

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}

// Decodes a custom code back to its variant. Diagnostic fields are not
// carried by the code and come back zeroed.
impl FromPrimitive for RaffleError {
    fn from_i64(n: i64) -> Option<Self> {
        u64::try_from(n).ok().and_then(Self::from_u64)
    }

    fn from_u64(n: u64) -> Option<Self> {
        let err = match n {
            0 => RaffleError::InsufficientPayment,
            1 => RaffleError::RaffleNotOpen,
            2 => RaffleError::UpkeepNotNeeded {
                balance: 0,
                players: 0,
                state: RaffleState::Open,
            },
            3 => RaffleError::UnknownRequest,
            4 => RaffleError::TransferFailed,
            5 => RaffleError::MissingRandomWords,
            6 => RaffleError::RaffleFull,
            7 => RaffleError::PlayerIndexOutOfRange,
            8 => RaffleError::UnauthorizedFulfillment,
            9 => RaffleError::InvalidOracle,
            10 => RaffleError::MalformedOracleResponse,
            11 => RaffleError::InvalidConfig,
            12 => RaffleError::Overflow,
            _ => return None,
        };
        Some(err)
    }
}
