// Round state machine: entry, upkeep, randomness request and payout
use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    raffle_error::RaffleError,
    raffle_state::{Raffle, RaffleState, MAX_PLAYERS},
    utils::{winner_index, PayoutTransfer},
    vrf::{RandomWordsRequest, RandomnessOracle},
};

/// The four conditions that make a round ready to draw
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepStatus {
    pub is_open: bool,
    pub time_passed: bool,
    pub has_players: bool,
    pub has_balance: bool,
}

impl UpkeepStatus {
    pub fn needed(&self) -> bool {
        self.is_open && self.time_passed && self.has_players && self.has_balance
    }
}

/// Result of a completed round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payout {
    pub winner: Pubkey,
    pub amount: u64,
}

impl Raffle {
    /// Record an entry of `value` lamports for `player`.
    pub fn enter(&mut self, player: Pubkey, value: u64) -> Result<(), RaffleError> {
        if self.state != RaffleState::Open {
            return Err(RaffleError::RaffleNotOpen);
        }
        if value < self.config.entrance_fee {
            return Err(RaffleError::InsufficientPayment);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RaffleError::RaffleFull);
        }

        self.balance = self
            .balance
            .checked_add(value)
            .ok_or(RaffleError::Overflow)?;
        self.players.push(player);
        Ok(())
    }

    pub fn upkeep_status(&self, now: UnixTimestamp) -> UpkeepStatus {
        // A clock behind the round start never counts as elapsed
        let time_passed = now
            .checked_sub(self.last_timestamp)
            .filter(|elapsed| *elapsed >= 0)
            .map_or(false, |elapsed| elapsed as u64 >= self.config.interval);

        UpkeepStatus {
            is_open: self.state == RaffleState::Open,
            time_passed,
            has_players: !self.players.is_empty(),
            has_balance: self.balance > 0,
        }
    }

    /// Read-only eligibility predicate polled by the upkeep scheduler.
    pub fn check_upkeep(&self, now: UnixTimestamp) -> bool {
        self.upkeep_status(now).needed()
    }

    /// Re-validates eligibility and closes the round to entries.
    ///
    /// The returned request must be handed to the oracle and its id passed
    /// to [`Raffle::record_request`]. The state is `Calculating` from here on,
    /// so any re-entrant `enter` or upkeep is rejected.
    pub fn begin_upkeep(&mut self, now: UnixTimestamp) -> Result<RandomWordsRequest, RaffleError> {
        if !self.check_upkeep(now) {
            return Err(RaffleError::UpkeepNotNeeded {
                balance: self.balance,
                players: self.players.len() as u64,
                state: self.state,
            });
        }

        self.state = RaffleState::Calculating;
        Ok(RandomWordsRequest::from(&self.config))
    }

    pub fn record_request(&mut self, request_id: u64) -> Result<(), RaffleError> {
        if request_id == 0 {
            return Err(RaffleError::MalformedOracleResponse);
        }
        self.pending_request = Some(request_id);
        Ok(())
    }

    /// Closes the round and requests randomness from `oracle`. A failed
    /// request leaves the raffle exactly as it was.
    pub fn perform_upkeep<O: RandomnessOracle>(
        &mut self,
        now: UnixTimestamp,
        oracle: &mut O,
    ) -> Result<u64, ProgramError> {
        let snapshot = self.clone();
        let request = self.begin_upkeep(now).map_err(RaffleError::report)?;

        let recorded = oracle
            .request_random_words(self, &request)
            .and_then(|request_id| {
                self.record_request(request_id)
                    .map_err(RaffleError::report)?;
                Ok(request_id)
            });
        if recorded.is_err() {
            *self = snapshot;
        }
        recorded
    }

    /// Consumes the pending request and resets the round.
    ///
    /// Every piece of owned state is reset before the caller moves any
    /// value, so a recipient observing the raffle mid-transfer sees an open
    /// round with an empty ledger.
    pub fn settle(
        &mut self,
        request_id: u64,
        random_words: &[u64],
        now: UnixTimestamp,
    ) -> Result<Payout, RaffleError> {
        if self.pending_request != Some(request_id) {
            return Err(RaffleError::UnknownRequest);
        }
        let random_word = random_words
            .first()
            .ok_or(RaffleError::MissingRandomWords)?;
        let index = winner_index(*random_word, self.players.len())
            .ok_or(RaffleError::PlayerIndexOutOfRange)?;
        let winner = self.player(index)?;
        let amount = self.balance;

        self.recent_winner = winner;
        self.players.clear();
        self.last_timestamp = now;
        self.state = RaffleState::Open;
        self.pending_request = None;
        self.balance = 0;

        Ok(Payout { winner, amount })
    }

    /// Oracle callback: pick the winner, reset the round and pay out.
    /// If the payout fails nothing changes.
    pub fn fulfill_random_words<P: PayoutTransfer>(
        &mut self,
        request_id: u64,
        random_words: &[u64],
        now: UnixTimestamp,
        payout: &mut P,
    ) -> Result<Payout, RaffleError> {
        let snapshot = self.clone();
        let settled = self.settle(request_id, random_words, now)?;

        if payout.transfer(&settled.winner, settled.amount).is_err() {
            *self = snapshot;
            return Err(RaffleError::TransferFailed);
        }
        Ok(settled)
    }
}
