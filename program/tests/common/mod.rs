// Shared harness for the program tests: a local randomness coordinator and
// a funded raffle fixture
#![allow(dead_code)]

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
};
use solana_program_test::*;
use solana_sdk::{
    account::Account,
    instruction::Instruction,
    signature::{Keypair, Signer},
    system_program,
    sysvar::clock::Clock,
    transaction::Transaction,
};

use vrf_raffle::{
    process_instruction,
    raffle_instruction,
    raffle_state::{Raffle, RaffleConfig},
    vrf::{
        find_fulfillment_authority, VrfCoordinatorInstruction, DEFAULT_CALLBACK_GAS_LIMIT,
        DEFAULT_NUM_WORDS, DEFAULT_REQUEST_CONFIRMATIONS, FULFILLMENT_AUTHORITY_SEED,
    },
};

pub const ENTRANCE_FEE: u64 = 10_000_000; // 0.01 SOL
pub const INTERVAL: u64 = 30;
pub const PLAYER_FUNDS: u64 = 10_000_000_000; // 10 SOL
pub const COORDINATOR_STATE_LEN: usize = 1024;

/// Error raised by the coordinator for a request it does not hold
pub const NONEXISTENT_REQUEST: u32 = 0x100;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default)]
pub struct PendingRequest {
    pub request_id: u64,
    pub consumer: Pubkey,
    pub num_words: u32,
}

/// Coordinator bookkeeping, borsh encoded at the front of its state account
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default)]
pub struct CoordinatorState {
    pub last_request_id: u64,
    pub pending: Vec<PendingRequest>,
}

impl CoordinatorState {
    fn load(data: &[u8]) -> Result<Self, ProgramError> {
        Self::deserialize(&mut &data[..]).map_err(|_| ProgramError::InvalidAccountData)
    }

    fn store(&self, data: &mut [u8]) -> Result<(), ProgramError> {
        let mut dst = data;
        self.serialize(&mut dst)
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))
    }
}

/// Local coordinator: hands out sequential request ids starting at 1 and
/// delivers caller-chosen words to the consumer under its PDA signature.
pub fn process_coordinator(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    input: &[u8],
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let state_info = next_account_info(account_info_iter)?;
    if state_info.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }
    let mut state = CoordinatorState::load(&state_info.data.borrow())?;

    match VrfCoordinatorInstruction::unpack(input)? {
        VrfCoordinatorInstruction::RequestRandomWords(request) => {
            let consumer_info = next_account_info(account_info_iter)?;
            state.last_request_id += 1;
            let request_id = state.last_request_id;
            state.pending.push(PendingRequest {
                request_id,
                consumer: *consumer_info.key,
                num_words: request.num_words,
            });
            state.store(&mut state_info.data.borrow_mut())?;

            msg!("Coordinator: request {} for {} words", request_id, request.num_words);
            set_return_data(&request_id.to_le_bytes());
            Ok(())
        }
        VrfCoordinatorInstruction::FulfillRandomWords {
            request_id,
            random_words,
        } => {
            let authority_info = next_account_info(account_info_iter)?;
            let consumer_program_info = next_account_info(account_info_iter)?;
            let consumer_info = next_account_info(account_info_iter)?;
            let winner_info = next_account_info(account_info_iter)?;

            let position = state
                .pending
                .iter()
                .position(|pending| pending.request_id == request_id)
                .ok_or_else(|| {
                    msg!("Coordinator: nonexistent request");
                    ProgramError::Custom(NONEXISTENT_REQUEST)
                })?;
            let pending = state.pending.remove(position);
            if pending.consumer != *consumer_info.key {
                return Err(ProgramError::InvalidArgument);
            }
            state.store(&mut state_info.data.borrow_mut())?;

            let (authority, bump) = find_fulfillment_authority(program_id);
            if authority != *authority_info.key {
                return Err(ProgramError::InvalidSeeds);
            }

            let instruction = raffle_instruction::fulfill_random_words(
                consumer_program_info.key,
                authority_info.key,
                consumer_info.key,
                winner_info.key,
                request_id,
                random_words,
            )?;
            invoke_signed(
                &instruction,
                &[
                    authority_info.clone(),
                    consumer_info.clone(),
                    winner_info.clone(),
                    consumer_program_info.clone(),
                ],
                &[&[FULFILLMENT_AUTHORITY_SEED, &[bump]]],
            )
        }
    }
}

pub fn clone_keypair(keypair: &Keypair) -> Keypair {
    Keypair::from_bytes(&keypair.to_bytes()).unwrap()
}

pub struct RaffleFixture {
    pub context: ProgramTestContext,
    pub program_id: Pubkey,
    pub coordinator_id: Pubkey,
    pub coordinator_state: Pubkey,
    pub raffle: Keypair,
    pub players: Vec<Keypair>,
    pub config: RaffleConfig,
}

/// Starts a bank with the raffle, the coordinator and `player_count` funded
/// players, then creates the raffle. `fulfillment_authority` defaults to the
/// coordinator PDA.
pub async fn setup(player_count: usize, fulfillment_authority: Option<Pubkey>) -> RaffleFixture {
    let program_id = Pubkey::new_unique();
    let coordinator_id = Pubkey::new_unique();
    let coordinator_state = Pubkey::new_unique();

    let mut program_test = ProgramTest::new(
        "vrf_raffle",
        program_id,
        processor!(process_instruction),
    );
    program_test.add_program(
        "vrf_coordinator",
        coordinator_id,
        processor!(process_coordinator),
    );

    program_test.add_account(
        coordinator_state,
        Account {
            lamports: 1_000_000_000,
            data: vec![0; COORDINATOR_STATE_LEN],
            owner: coordinator_id,
            ..Account::default()
        },
    );

    let players: Vec<Keypair> = (0..player_count).map(|_| Keypair::new()).collect();
    for player in &players {
        program_test.add_account(
            player.pubkey(),
            Account {
                lamports: PLAYER_FUNDS,
                owner: system_program::id(),
                ..Account::default()
            },
        );
    }

    let context = program_test.start_with_context().await;

    let config = RaffleConfig {
        entrance_fee: ENTRANCE_FEE,
        interval: INTERVAL,
        vrf_coordinator: coordinator_id,
        fulfillment_authority: fulfillment_authority
            .unwrap_or_else(|| find_fulfillment_authority(&coordinator_id).0),
        key_hash: [0x47; 32],
        subscription_id: 1,
        request_confirmations: DEFAULT_REQUEST_CONFIRMATIONS,
        callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
        num_words: DEFAULT_NUM_WORDS,
    };

    let mut fixture = RaffleFixture {
        context,
        program_id,
        coordinator_id,
        coordinator_state,
        raffle: Keypair::new(),
        players,
        config,
    };

    let initialize_ix = raffle_instruction::initialize_raffle(
        &fixture.program_id,
        &fixture.context.payer.pubkey(),
        &fixture.raffle.pubkey(),
        &fixture.config,
    )
    .unwrap();
    let raffle = clone_keypair(&fixture.raffle);
    fixture.process(&[initialize_ix], &[&raffle]).await.unwrap();

    fixture
}

impl RaffleFixture {
    /// Sends the instructions with the context payer as fee payer
    pub async fn process(
        &mut self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> Result<(), BanksClientError> {
        let payer = clone_keypair(&self.context.payer);
        let mut all_signers = vec![&payer];
        all_signers.extend_from_slice(signers);

        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&payer.pubkey()),
            &all_signers,
            self.context.last_blockhash,
        );
        self.context.banks_client.process_transaction(transaction).await
    }

    pub async fn enter(&mut self, player: usize, amount: u64) -> Result<(), BanksClientError> {
        let player = clone_keypair(&self.players[player]);
        let ix = raffle_instruction::enter_raffle(
            &self.program_id,
            &player.pubkey(),
            &self.raffle.pubkey(),
            amount,
        )
        .unwrap();
        self.process(&[ix], &[&player]).await
    }

    pub async fn perform_upkeep(&mut self) -> Result<(), BanksClientError> {
        let ix = raffle_instruction::perform_upkeep(
            &self.program_id,
            &self.raffle.pubkey(),
            &self.coordinator_id,
            &self.coordinator_state,
            &[],
        )
        .unwrap();
        self.process(&[ix], &[]).await
    }

    /// Delivers words through the coordinator, as the oracle network would
    pub async fn fulfill_through_coordinator(
        &mut self,
        request_id: u64,
        winner: &Pubkey,
        random_words: Vec<u64>,
    ) -> Result<(), BanksClientError> {
        let ix = vrf_raffle::vrf::fulfill_random_words(
            &self.coordinator_id,
            &self.coordinator_state,
            &self.program_id,
            &self.raffle.pubkey(),
            winner,
            request_id,
            random_words,
        )
        .unwrap();
        self.process(&[ix], &[]).await
    }

    /// Runs the instructions against the current bank without committing.
    /// Returns the program log and the return data, if any.
    pub async fn simulate(
        &mut self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> (Vec<String>, Option<(Pubkey, Vec<u8>)>) {
        let payer = clone_keypair(&self.context.payer);
        let mut all_signers = vec![&payer];
        all_signers.extend_from_slice(signers);

        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&payer.pubkey()),
            &all_signers,
            self.context.last_blockhash,
        );
        let simulation = self
            .context
            .banks_client
            .simulate_transaction(transaction)
            .await
            .unwrap();
        assert!(matches!(simulation.result, Some(Ok(()))));

        let details = simulation.simulation_details.unwrap();
        let return_data = details
            .return_data
            .map(|return_data| (return_data.program_id, return_data.data));
        (details.logs, return_data)
    }

    /// Byte published by `CheckUpkeep` through return data. The runtime
    /// trims trailing zero bytes when recording, so a lone `0` may come back
    /// as no data at all.
    pub async fn check_upkeep_answer(&mut self) -> u8 {
        let ix = raffle_instruction::check_upkeep(&self.program_id, &self.raffle.pubkey()).unwrap();
        let (_, return_data) = self.simulate(&[ix], &[]).await;
        match return_data {
            Some((program_id, data)) => {
                assert_eq!(program_id, self.program_id);
                assert!(data.len() <= 1);
                data.first().copied().unwrap_or(0)
            }
            None => 0,
        }
    }

    pub async fn check_upkeep(&mut self) -> bool {
        self.check_upkeep_answer().await == 1
    }

    /// Program log lines of the raffle, with the runtime prefix removed
    pub fn program_messages(logs: &[String]) -> Vec<String> {
        logs.iter()
            .filter_map(|line| line.strip_prefix("Program log: "))
            .map(str::to_owned)
            .collect()
    }

    pub async fn raffle_state(&mut self) -> Raffle {
        let account = self
            .context
            .banks_client
            .get_account(self.raffle.pubkey())
            .await
            .unwrap()
            .unwrap();
        Raffle::unpack(&account.data).unwrap()
    }

    pub async fn coordinator_state(&mut self) -> CoordinatorState {
        let account = self
            .context
            .banks_client
            .get_account(self.coordinator_state)
            .await
            .unwrap()
            .unwrap();
        CoordinatorState::load(&account.data).unwrap()
    }

    pub async fn lamports(&mut self, address: &Pubkey) -> u64 {
        self.context
            .banks_client
            .get_balance(*address)
            .await
            .unwrap()
    }

    pub async fn set_unix_timestamp(&mut self, unix_timestamp: i64) {
        let mut clock: Clock = self.context.banks_client.get_sysvar().await.unwrap();
        clock.unix_timestamp = unix_timestamp;
        self.context.set_sysvar(&clock);
    }

    /// Moves the clock to `offset` seconds after the current round started
    pub async fn warp_into_round(&mut self, offset: i64) {
        let started = self.raffle_state().await.last_timestamp;
        self.set_unix_timestamp(started + offset).await;
    }

    /// Enters every player once and lets the interval pass
    pub async fn fill_round(&mut self) {
        for player in 0..self.players.len() {
            self.enter(player, ENTRANCE_FEE).await.unwrap();
        }
        self.warp_into_round(INTERVAL as i64 + 1).await;
    }
}
