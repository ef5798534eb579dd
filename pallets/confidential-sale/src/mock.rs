use crate::pallet as pallet_confidential_sale;
use confidential_sale_primitives::{
    decryption::{DecryptionPermit, PermitError},
    EncryptedAmount, EncryptedArithmetic, EncryptedTransfer, SaleLedgerFactory, TokenId,
    ZERO_HANDLE,
};
use frame_support::{
    construct_runtime, derive_impl, pallet_prelude::*, parameter_types, traits::ConstU32, PalletId,
};
use sp_runtime::{traits::IdentityLookup, BuildStorage};
use std::cell::{Cell, RefCell};

/// Wide enough for `modl` + an 8-byte PalletId + a `TokenId`, so every
/// ledger gets its own sub-account.
pub type AccountId = u128;
pub type Balance = u64;
/// The all-zero account, treated as a null address by the ledger.
pub const NULL: AccountId = 0;
pub const ALICE: AccountId = 1;
pub const BOB: AccountId = 2;
pub const CHARLIE: AccountId = 3;

/// 0.001 of an 18-decimal native unit.
pub const MILLI: Balance = 1_000_000_000_000_000;
pub const INITIAL_BALANCE: Balance = 5_000 * MILLI;
/// Unix time used for decryption permits.
pub const NOW: u64 = 1_700_000_000;

// --- Mock encrypted arithmetic -------------------------------------------------
// Handles carry their clear value in the first 8 bytes and a nonce in the next 8,
// so tests can decrypt while the pallet still treats them as opaque bytes.
// State lives in storage so it rolls back with the pallet's storage layers.

#[frame_support::storage_alias]
pub type HandleNonce = StorageValue<MockFheStore, u64, ValueQuery>;

#[frame_support::storage_alias]
pub type DecryptAcl = StorageDoubleMap<
    MockFheStore,
    Blake2_128Concat,
    EncryptedAmount,
    Blake2_128Concat,
    AccountId,
    (),
    OptionQuery,
>;

thread_local! {
    static EXISTENTIAL_DEPOSIT: Cell<Balance> = const { Cell::new(1) };
    static FAIL_TRANSFERS: Cell<bool> = const { Cell::new(false) };
    static TRANSFER_HOOK: RefCell<Option<Box<dyn FnOnce() -> DispatchResult>>> =
        const { RefCell::new(None) };
    static HOOK_RESULT: RefCell<Option<DispatchResult>> = const { RefCell::new(None) };
}

#[derive(Debug, PartialEq, Eq)]
pub enum DecryptError {
    Permit(PermitError),
    NotAllowed,
}

pub struct MockFhe;

impl MockFhe {
    fn fresh(value: u64) -> EncryptedAmount {
        let nonce = HandleNonce::mutate(|n| {
            *n += 1;
            *n
        });
        let mut handle = [0u8; 64];
        handle[..8].copy_from_slice(&value.to_le_bytes());
        handle[8..16].copy_from_slice(&nonce.to_le_bytes());
        handle
    }

    fn value(handle: &EncryptedAmount) -> u64 {
        u64::from_le_bytes(handle[..8].try_into().expect("8 bytes"))
    }

    /// What the off-chain relay does for a user decryption request.
    pub fn user_decrypt(
        handle: &EncryptedAmount,
        ledger: TokenId,
        permit: &DecryptionPermit<AccountId>,
        now: u64,
    ) -> Result<u64, DecryptError> {
        permit.check(ledger, now).map_err(DecryptError::Permit)?;
        if *handle == ZERO_HANDLE {
            return Ok(0);
        }
        if !DecryptAcl::contains_key(handle, permit.requester) {
            return Err(DecryptError::NotAllowed);
        }
        Ok(Self::value(handle))
    }

    /// Run `hook` from inside the next encrypted transfer.
    pub fn on_next_transfer(hook: impl FnOnce() -> DispatchResult + 'static) {
        TRANSFER_HOOK.with(|h| *h.borrow_mut() = Some(Box::new(hook)));
    }

    pub fn hook_result() -> Option<DispatchResult> {
        HOOK_RESULT.with(|r| r.borrow_mut().take())
    }

    pub fn fail_transfers(fail: bool) {
        FAIL_TRANSFERS.with(|f| f.set(fail));
    }
}

impl EncryptedArithmetic<AccountId> for MockFhe {
    fn encrypt_clear(value: u64) -> Result<EncryptedAmount, DispatchError> {
        Ok(Self::fresh(value))
    }

    fn transfer(
        from: &EncryptedAmount,
        to: &EncryptedAmount,
        amount: &EncryptedAmount,
    ) -> Result<EncryptedTransfer, DispatchError> {
        if let Some(hook) = TRANSFER_HOOK.with(|h| h.borrow_mut().take()) {
            let result = hook();
            HOOK_RESULT.with(|r| *r.borrow_mut() = Some(result));
        }
        if FAIL_TRANSFERS.with(|f| f.get()) {
            return Err(DispatchError::Other("mock fhe transfer failed"));
        }
        // Same semantics as an fhEVM select: an unaffordable transfer moves nothing.
        let (from_v, to_v, amount_v) = (Self::value(from), Self::value(to), Self::value(amount));
        let moved = if amount_v <= from_v { amount_v } else { 0 };
        Ok(EncryptedTransfer {
            from_balance: Self::fresh(from_v - moved),
            to_balance: Self::fresh(to_v.saturating_add(moved)),
            transferred: Self::fresh(moved),
        })
    }

    fn allow(handle: &EncryptedAmount, who: &AccountId) -> DispatchResult {
        DecryptAcl::insert(handle, who, ());
        Ok(())
    }
}

// --- Runtime ---------------------------------------------------------------------

pub struct ExistentialDeposit;
impl Get<Balance> for ExistentialDeposit {
    fn get() -> Balance {
        EXISTENTIAL_DEPOSIT.with(|ed| ed.get())
    }
}

pub fn set_existential_deposit(ed: Balance) {
    EXISTENTIAL_DEPOSIT.with(|v| v.set(ed));
}

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Runtime {
    type Block = frame_system::mocking::MockBlock<Runtime>;
    type AccountId = AccountId;
    type Lookup = IdentityLookup<Self::AccountId>;
    type AccountData = pallet_balances::AccountData<Balance>;
}

#[derive_impl(pallet_balances::config_preludes::TestDefaultConfig)]
impl pallet_balances::Config for Runtime {
    type AccountStore = System;
    type ExistentialDeposit = ExistentialDeposit;
}

parameter_types! {
    pub const SalePalletId: PalletId = PalletId(*b"cf/sales");
}

impl pallet_confidential_sale::Config for Runtime {
    type RuntimeEvent = RuntimeEvent;
    type Currency = Balances;
    type Encrypted = MockFhe;
    type PalletId = SalePalletId;
    type MaxNameLength = ConstU32<32>;
    type MaxSymbolLength = ConstU32<8>;
    type WeightInfo = ();
}

construct_runtime!(
    pub enum Runtime {
        System: frame_system,
        Balances: pallet_balances,
        ConfidentialSale: pallet_confidential_sale,
    }
);

// Build a fresh externalities for each test.
pub fn new_test_ext() -> sp_io::TestExternalities {
    set_existential_deposit(1);
    MockFhe::fail_transfers(false);
    TRANSFER_HOOK.with(|h| *h.borrow_mut() = None);
    HOOK_RESULT.with(|r| *r.borrow_mut() = None);

    let mut t = frame_system::GenesisConfig::<Runtime>::default()
        .build_storage()
        .unwrap();
    pallet_balances::GenesisConfig::<Runtime> {
        balances: vec![
            (ALICE, INITIAL_BALANCE),
            (BOB, INITIAL_BALANCE),
            (CHARLIE, INITIAL_BALANCE),
        ],
        ..Default::default()
    }
    .assimilate_storage(&mut t)
    .unwrap();

    let mut ext = sp_io::TestExternalities::new(t);
    ext.execute_with(|| System::set_block_number(1));
    ext
}

// Handy helpers

/// Ledger named "Shadow"/"SHDW" owned by `owner`.
pub fn create_ledger(owner: AccountId, total_supply: u64, price_per_token: Balance) -> TokenId {
    <ConfidentialSale as SaleLedgerFactory<AccountId, Balance>>::create_ledger(
        &owner,
        b"Shadow".to_vec(),
        b"SHDW".to_vec(),
        total_supply,
        price_per_token,
    )
    .expect("ledger created")
}

pub fn permit_for(who: AccountId, ledger: TokenId) -> DecryptionPermit<AccountId> {
    DecryptionPermit {
        requester: who,
        ledgers: vec![ledger].try_into().expect("bounded vec"),
        start_timestamp: NOW - 60,
        duration_days: 1,
        signature: vec![0x11; 65].try_into().expect("bounded vec"),
    }
}

/// Clear balance of `who` on `ledger`, decrypted through a valid permit.
pub fn decrypted_balance(ledger: TokenId, who: AccountId) -> u64 {
    let handle = ConfidentialSale::confidential_balance_of(ledger, &who);
    MockFhe::user_decrypt(&handle, ledger, &permit_for(who, ledger), NOW).expect("decryptable")
}

pub fn free_balance(who: AccountId) -> Balance {
    Balances::free_balance(who)
}
