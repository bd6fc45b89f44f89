// Randomness coordinator integration: wire contract and CPI client
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    raffle_error::RaffleError,
    raffle_state::{Raffle, RaffleConfig},
};

/// Seed of the PDA a coordinator signs fulfillments with
pub const FULFILLMENT_AUTHORITY_SEED: &[u8] = b"fulfillment-authority";

pub const DEFAULT_REQUEST_CONFIRMATIONS: u16 = 3;
pub const DEFAULT_CALLBACK_GAS_LIMIT: u32 = 500_000;
pub const DEFAULT_NUM_WORDS: u32 = 1;

/// Parameters of one randomness request, forwarded verbatim to the coordinator
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomWordsRequest {
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl From<&RaffleConfig> for RandomWordsRequest {
    fn from(config: &RaffleConfig) -> Self {
        RandomWordsRequest {
            key_hash: config.key_hash,
            subscription_id: config.subscription_id,
            request_confirmations: config.request_confirmations,
            callback_gas_limit: config.callback_gas_limit,
            num_words: config.num_words,
        }
    }
}

/// Instructions understood by a randomness coordinator program
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum VrfCoordinatorInstruction {
    /// Register a request for random words. The coordinator answers with the
    /// request id (u64, little endian) through return data.
    ///
    /// Accounts expected:
    /// 0. `[writable]` Coordinator state account
    /// 1. `[]` Consumer account (the raffle)
    RequestRandomWords(RandomWordsRequest),

    /// Deliver random words for a pending request to its consumer
    ///
    /// Accounts expected:
    /// 0. `[writable]` Coordinator state account
    /// 1. `[]` Coordinator fulfillment authority (PDA)
    /// 2. `[]` Consumer program
    /// 3. `[writable]` Consumer account (the raffle)
    /// 4. `[writable]` Prize recipient
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<u64>,
    },
}

impl VrfCoordinatorInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))
    }
}

/// Address a coordinator program signs fulfillments with
pub fn find_fulfillment_authority(vrf_coordinator: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[FULFILLMENT_AUTHORITY_SEED], vrf_coordinator)
}

/// Create a coordinator fulfill_random_words instruction
pub fn fulfill_random_words(
    vrf_coordinator: &Pubkey,
    coordinator_state: &Pubkey,
    consumer_program: &Pubkey,
    consumer: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<u64>,
) -> Result<Instruction, ProgramError> {
    let data = VrfCoordinatorInstruction::FulfillRandomWords {
        request_id,
        random_words,
    }
    .pack()?;
    let (authority, _) = find_fulfillment_authority(vrf_coordinator);

    let accounts = vec![
        AccountMeta::new(*coordinator_state, false),
        AccountMeta::new_readonly(authority, false),
        AccountMeta::new_readonly(*consumer_program, false),
        AccountMeta::new(*consumer, false),
        AccountMeta::new(*winner, false),
    ];

    Ok(Instruction {
        program_id: *vrf_coordinator,
        accounts,
        data,
    })
}

/// Source of verifiable randomness
pub trait RandomnessOracle {
    /// Issue a request on behalf of `raffle` and return its identifier.
    /// `raffle` is already closed to entries when this is called.
    fn request_random_words(
        &mut self,
        raffle: &Raffle,
        request: &RandomWordsRequest,
    ) -> Result<u64, ProgramError>;
}

/// Requests randomness from the configured coordinator program through CPI
pub struct CoordinatorOracle<'a, 'info> {
    pub coordinator_program: &'a AccountInfo<'info>,
    pub coordinator_state: &'a AccountInfo<'info>,
    pub consumer: &'a AccountInfo<'info>,
    pub remaining_accounts: &'a [AccountInfo<'info>],
}

impl<'a, 'info> RandomnessOracle for CoordinatorOracle<'a, 'info> {
    fn request_random_words(
        &mut self,
        raffle: &Raffle,
        request: &RandomWordsRequest,
    ) -> Result<u64, ProgramError> {
        // Anything the coordinator reaches must see the closed round
        raffle.save(&mut self.consumer.data.borrow_mut())?;

        let mut accounts = vec![
            AccountMeta::new(*self.coordinator_state.key, false),
            AccountMeta::new_readonly(*self.consumer.key, false),
        ];
        accounts.extend(self.remaining_accounts.iter().map(|acc| AccountMeta {
            pubkey: *acc.key,
            is_signer: acc.is_signer,
            is_writable: acc.is_writable,
        }));

        let instruction = Instruction {
            program_id: *self.coordinator_program.key,
            accounts,
            data: VrfCoordinatorInstruction::RequestRandomWords(*request).pack()?,
        };

        let mut account_infos = vec![
            self.coordinator_state.clone(),
            self.consumer.clone(),
            self.coordinator_program.clone(),
        ];
        account_infos.extend_from_slice(self.remaining_accounts);

        invoke(&instruction, &account_infos)?;

        let request_id = match get_return_data() {
            Some((program_id, data)) if program_id == *self.coordinator_program.key => {
                <[u8; 8]>::try_from(data.as_slice())
                    .map(u64::from_le_bytes)
                    .ok()
            }
            _ => None,
        };

        match request_id {
            Some(request_id) if request_id != 0 => Ok(request_id),
            _ => {
                msg!("Coordinator did not return a request id");
                Err(RaffleError::MalformedOracleResponse.into())
            }
        }
    }
}
