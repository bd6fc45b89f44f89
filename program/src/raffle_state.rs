use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};
use std::convert::TryFrom;

use crate::raffle_error::RaffleError;

/// Maximum number of entries a single round can hold
pub const MAX_PLAYERS: usize = 64;

const PLAYERS_LEN: usize = 32 * MAX_PLAYERS;

/// Phase of the current round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries
    Open,
    /// Waiting for the oracle to deliver randomness
    Calculating,
}

impl TryFrom<u8> for RaffleState {
    type Error = ProgramError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RaffleState::Open),
            1 => Ok(RaffleState::Calculating),
            _ => Err(ProgramError::InvalidAccountData),
        }
    }
}

impl From<RaffleState> for u8 {
    fn from(state: RaffleState) -> Self {
        match state {
            RaffleState::Open => 0,
            RaffleState::Calculating => 1,
        }
    }
}

/// Construction-time parameters. Never modified once the raffle exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum lamports required to enter
    pub entrance_fee: u64,
    /// Minimum round length in seconds
    pub interval: u64,
    /// Program id of the randomness coordinator
    pub vrf_coordinator: Pubkey,
    /// Only signer allowed to deliver random words
    pub fulfillment_authority: Pubkey,
    /// Coordinator key selector ("gas lane")
    pub key_hash: [u8; 32],
    /// Coordinator subscription paying for requests
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    /// Random words requested per round
    pub num_words: u32,
}

impl RaffleConfig {
    pub const LEN: usize = 8 + 8 + 32 + 32 + 32 + 8 + 2 + 4 + 4;

    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.num_words == 0 {
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }

    fn unpack_from(src: &[u8; RaffleConfig::LEN]) -> Self {
        let (
            entrance_fee,
            interval,
            vrf_coordinator,
            fulfillment_authority,
            key_hash,
            subscription_id,
            request_confirmations,
            callback_gas_limit,
            num_words,
        ) = array_refs![src, 8, 8, 32, 32, 32, 8, 2, 4, 4];

        RaffleConfig {
            entrance_fee: u64::from_le_bytes(*entrance_fee),
            interval: u64::from_le_bytes(*interval),
            vrf_coordinator: Pubkey::new_from_array(*vrf_coordinator),
            fulfillment_authority: Pubkey::new_from_array(*fulfillment_authority),
            key_hash: *key_hash,
            subscription_id: u64::from_le_bytes(*subscription_id),
            request_confirmations: u16::from_le_bytes(*request_confirmations),
            callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
            num_words: u32::from_le_bytes(*num_words),
        }
    }

    fn pack_into(&self, dst: &mut [u8; RaffleConfig::LEN]) {
        let (
            entrance_fee_dst,
            interval_dst,
            vrf_coordinator_dst,
            fulfillment_authority_dst,
            key_hash_dst,
            subscription_id_dst,
            request_confirmations_dst,
            callback_gas_limit_dst,
            num_words_dst,
        ) = mut_array_refs![dst, 8, 8, 32, 32, 32, 8, 2, 4, 4];

        *entrance_fee_dst = self.entrance_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        vrf_coordinator_dst.copy_from_slice(self.vrf_coordinator.as_ref());
        fulfillment_authority_dst.copy_from_slice(self.fulfillment_authority.as_ref());
        *key_hash_dst = self.key_hash;
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        *request_confirmations_dst = self.request_confirmations.to_le_bytes();
        *callback_gas_limit_dst = self.callback_gas_limit.to_le_bytes();
        *num_words_dst = self.num_words.to_le_bytes();
    }
}

/// Raffle account data. One account holds the whole engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    pub config: RaffleConfig,
    pub state: RaffleState,
    /// Start of the current round
    pub last_timestamp: UnixTimestamp,
    /// Winner of the last completed round
    pub recent_winner: Pubkey,
    /// Outstanding randomness request for this round
    pub pending_request: Option<u64>,
    /// Lamports collected since the last payout, rent reserve excluded
    pub balance: u64,
    /// Entries of the current round, in order
    pub players: Vec<Pubkey>,
}

impl Raffle {
    pub fn new(config: RaffleConfig, now: UnixTimestamp) -> Self {
        Raffle {
            is_initialized: true,
            config,
            state: RaffleState::Open,
            last_timestamp: now,
            recent_winner: Pubkey::default(),
            pending_request: None,
            balance: 0,
            players: Vec::new(),
        }
    }

    /// Writes the account data, rejecting buffers of the wrong size.
    pub fn save(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        if dst.len() != Raffle::LEN {
            return Err(ProgramError::InvalidAccountData);
        }
        self.pack_into_slice(dst);
        Ok(())
    }

    pub fn raffle_state(&self) -> RaffleState {
        self.state
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.config.interval
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn recent_winner(&self) -> Pubkey {
        self.recent_winner
    }

    pub fn player(&self, index: usize) -> Result<Pubkey, RaffleError> {
        self.players
            .get(index)
            .copied()
            .ok_or(RaffleError::PlayerIndexOutOfRange)
    }

    pub fn number_of_players(&self) -> usize {
        self.players.len()
    }

    pub fn num_words(&self) -> u32 {
        self.config.num_words
    }

    pub fn request_confirmations(&self) -> u16 {
        self.config.request_confirmations
    }

    pub fn pending_request(&self) -> Option<u64> {
        self.pending_request
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }
}

impl Sealed for Raffle {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Raffle {
    const LEN: usize = 1 + RaffleConfig::LEN + 1 + 8 + 32 + 1 + 8 + 8 + 4 + PLAYERS_LEN;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        if src.len() < Raffle::LEN {
            return Err(ProgramError::InvalidAccountData);
        }
        let src = array_ref![src, 0, Raffle::LEN];
        let (
            is_initialized,
            config,
            state,
            last_timestamp,
            recent_winner,
            has_pending_request,
            pending_request,
            balance,
            player_count,
            players,
        ) = array_refs![src, 1, RaffleConfig::LEN, 1, 8, 32, 1, 8, 8, 4, PLAYERS_LEN];

        let is_initialized = match is_initialized[0] {
            0 => false,
            1 => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };

        let player_count = u32::from_le_bytes(*player_count) as usize;
        if player_count > MAX_PLAYERS {
            return Err(ProgramError::InvalidAccountData);
        }
        let players = players
            .chunks_exact(32)
            .take(player_count)
            .map(|slot| Pubkey::new_from_array(*array_ref![slot, 0, 32]))
            .collect();

        let pending_request = match has_pending_request[0] {
            0 => None,
            1 => Some(u64::from_le_bytes(*pending_request)),
            _ => return Err(ProgramError::InvalidAccountData),
        };

        Ok(Raffle {
            is_initialized,
            config: RaffleConfig::unpack_from(config),
            state: RaffleState::try_from(state[0])?,
            last_timestamp: UnixTimestamp::from_le_bytes(*last_timestamp),
            recent_winner: Pubkey::new_from_array(*recent_winner),
            pending_request,
            balance: u64::from_le_bytes(*balance),
            players,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Raffle::LEN];
        let (
            is_initialized_dst,
            config_dst,
            state_dst,
            last_timestamp_dst,
            recent_winner_dst,
            has_pending_request_dst,
            pending_request_dst,
            balance_dst,
            player_count_dst,
            players_dst,
        ) = mut_array_refs![dst, 1, RaffleConfig::LEN, 1, 8, 32, 1, 8, 8, 4, PLAYERS_LEN];

        is_initialized_dst[0] = self.is_initialized as u8;
        self.config.pack_into(config_dst);
        state_dst[0] = self.state.into();
        *last_timestamp_dst = self.last_timestamp.to_le_bytes();
        recent_winner_dst.copy_from_slice(self.recent_winner.as_ref());
        match self.pending_request {
            Some(request_id) => {
                has_pending_request_dst[0] = 1;
                *pending_request_dst = request_id.to_le_bytes();
            }
            None => {
                has_pending_request_dst[0] = 0;
                *pending_request_dst = [0; 8];
            }
        }
        *balance_dst = self.balance.to_le_bytes();
        *player_count_dst = (self.players.len() as u32).to_le_bytes();

        players_dst.fill(0);
        for (slot, player) in players_dst.chunks_exact_mut(32).zip(self.players.iter()) {
            slot.copy_from_slice(player.as_ref());
        }
    }
}
