#![allow(deprecated)]

//! # The Den Manager Blueprint
//!
//! One `DenManager` component runs the accounting of a single collateral market. It creates the
//! market's debt token and borrower badges, holds the collateral, and drives the den ledger
//! (`DenLedger`) with the ledger clock and the price feed.
//!
//! ## Overview
//! - **Borrowing:** The borrower operations component (holding a controller badge) opens,
//!   adjusts and closes dens on behalf of badge holders.
//! - **Liquidation:** A liquidation manager (holding a controller badge) closes liquidated dens,
//!   offsets debt against the stability pool and redistributes the rest over all other dens.
//! - **Redemption:** Anyone holding debt tokens can redeem them for collateral at face value,
//!   starting with the riskiest den that still has a collateral ratio of at least 100%.
//! - **Surplus:** Collateral left over after a full redemption is claimable with the borrower badge.
//!
//! ## Custody
//! - `collateral_vault` holds active, defaulted and surplus collateral.
//! - `gas_pool` holds the debt gas compensation of every active den.
//! - Borrowing fees (debt tokens) and redemption fees (collateral) are kept in separate fee vaults.
//!
//! All ledger accounting of a call happens before any vault or resource is touched. The events
//! recorded by the ledger are emitted at the end of every mutating call.

use crate::den_ledger::*;
use crate::errors::OrAbort;
use crate::events::*;
use crate::math::*;
use crate::redemption::*;
use crate::shared_structs::*;
use scrypto::prelude::*;

#[blueprint]
#[events(
    EventDenUpdated,
    EventDenIndexUpdated,
    EventDenSnapshotsUpdated,
    EventTotalStakesUpdated,
    EventSystemSnapshotsUpdated,
    EventLTermsUpdated,
    EventBaseRateUpdated,
    EventLastFeeOpTimeUpdated,
    EventRedemption,
    EventCollateralClaimed,
    EventInterestCollected,
    EventParametersUpdated,
    EventSunsetStarted,
)]
mod den_manager_component {
    enable_method_auth! {
        methods {
            open_den => restrict_to: [OWNER];
            adjust_den => restrict_to: [OWNER];
            close_den => restrict_to: [OWNER];
            close_den_by_liquidation => restrict_to: [OWNER];
            apply_pending_rewards => restrict_to: [OWNER];
            move_pending_rewards_to_active => restrict_to: [OWNER];
            add_collateral_surplus => restrict_to: [OWNER];
            finalize_liquidation => restrict_to: [OWNER];
            decrease_debt_and_send_collateral => restrict_to: [OWNER];
            decay_base_rate_and_get_borrowing_fee => restrict_to: [OWNER];
            collect_interests => restrict_to: [OWNER];
            withdraw_fees => restrict_to: [OWNER];
            set_parameters => restrict_to: [OWNER];
            set_paused => restrict_to: [OWNER];
            start_sunset => restrict_to: [OWNER];
            set_interest_exempt_den => restrict_to: [OWNER];
            set_price_feed => restrict_to: [OWNER];
            mint_controller_badge => restrict_to: [OWNER];
            redeem_collateral => PUBLIC;
            claim_collateral => PUBLIC;
            mint_borrower_badge => PUBLIC;
            get_entire_debt_and_coll => PUBLIC;
            get_current_icr => PUBLIC;
            get_nominal_icr => PUBLIC;
            get_entire_system_debt => PUBLIC;
            get_entire_system_coll => PUBLIC;
            get_entire_system_balances => PUBLIC;
            get_redemption_rate => PUBLIC;
            get_redemption_rate_with_decay => PUBLIC;
            get_redemption_fee_with_decay => PUBLIC;
            get_borrowing_rate => PUBLIC;
            get_borrowing_rate_with_decay => PUBLIC;
            get_borrowing_fee => PUBLIC;
            get_borrowing_fee_with_decay => PUBLIC;
            get_den_info => PUBLIC;
            get_den_status => PUBLIC;
            get_pending_rewards => PUBLIC;
            has_pending_rewards => PUBLIC;
            get_den_owners_count => PUBLIC;
            get_den_from_owners_array => PUBLIC;
            get_sorted_dens => PUBLIC;
            get_surplus_balance => PUBLIC;
            get_total_active_collateral => PUBLIC;
            get_total_active_debt => PUBLIC;
            get_parameters => PUBLIC;
            fetch_price => PUBLIC;
            get_debt_token_address => PUBLIC;
        }
    }
    struct DenManager {
        /// The complete den ledger of this market.
        state: DenLedger,
        collateral_address: ResourceAddress,
        /// Active, defaulted and surplus collateral.
        collateral_vault: Vault,
        /// Collateral taken as redemption fees.
        collateral_fee_vault: Vault,
        /// Debt tokens taken as borrowing fees.
        debt_fee_vault: Vault,
        /// Debt gas compensation reserved for every active den.
        gas_pool: Vault,
        debt_token_manager: ResourceManager,
        borrower_badge_manager: ResourceManager,
        controller_badge_manager: ResourceManager,
        /// A counter to generate unique IDs for each new borrower badge.
        borrower_badge_counter: u64,
        price_feed: Global<AnyComponent>,
        /// Method of `price_feed` returning the collateral price, called with the collateral address.
        price_feed_method: String,
    }

    impl DenManager {
        /// Instantiates a `DenManager` for one collateral resource.
        ///
        /// # Arguments
        /// * `collateral_address`: The collateral resource of this market.
        /// * `price_feed_address`: Component providing the collateral price.
        /// * `price_feed_method`: Method of the price feed, taking the collateral `ResourceAddress`
        ///   and returning a `Decimal` price.
        ///
        /// # Returns
        /// * `Global<DenManager>`: The new component.
        /// * `Bucket`: The initially minted controller badges (supply: 30). Holding 0.75 of them is
        ///   the OWNER role of the component.
        /// * `ResourceAddress`: The debt token.
        /// * `ResourceAddress`: The borrower badge.
        pub fn instantiate(
            collateral_address: ResourceAddress,
            price_feed_address: ComponentAddress,
            price_feed_method: String,
        ) -> (Global<DenManager>, Bucket, ResourceAddress, ResourceAddress) {
            let (address_reservation, component_address) =
                Runtime::allocate_component_address(DenManager::blueprint_id());

            let controller_role: Bucket = ResourceBuilder::new_fungible(OwnerRole::Fixed(rule!(
                require(global_caller(component_address))
            )))
            .divisibility(DIVISIBILITY_MAXIMUM)
            .metadata(metadata! (
                init {
                    "name" => "controller badge den manager", locked;
                    "symbol" => "denCTRL", locked;
                }
            ))
            .mint_roles(mint_roles!(
                minter => rule!(require(global_caller(component_address)));
                minter_updater => rule!(deny_all);
            ))
            .mint_initial_supply(30)
            .into();

            let controller_badge_manager: ResourceManager = controller_role.resource_manager();

            let debt_token_manager: ResourceManager = ResourceBuilder::new_fungible(OwnerRole::Fixed(
                rule!(require(controller_role.resource_address())),
            ))
            .divisibility(DIVISIBILITY_MAXIMUM)
            .metadata(metadata! (
                init {
                    "name" => "Den Debt Token", updatable;
                    "symbol" => "DEBT", updatable;
                    "tags" => vec!["stablecoin", "defi"], updatable;
                }
            ))
            .mint_roles(mint_roles!(
                minter => rule!(require(global_caller(component_address))
                || require_amount(
                    dec!("0.75"),
                    controller_role.resource_address()
                ));
                minter_updater => rule!(require_amount(
                    dec!("0.75"),
                    controller_role.resource_address()
                ));
            ))
            .burn_roles(burn_roles!(
                burner => rule!(require(global_caller(component_address))
                || require_amount(
                    dec!("0.75"),
                    controller_role.resource_address()
                ));
                burner_updater => rule!(require_amount(
                    dec!("0.75"),
                    controller_role.resource_address()
                ));
            ))
            .create_with_no_initial_supply()
            .into();

            let borrower_badge_manager: ResourceManager =
                ResourceBuilder::new_integer_non_fungible::<BorrowerBadge>(OwnerRole::Fixed(rule!(
                    require_amount(dec!("0.75"), controller_role.resource_address())
                )))
                .metadata(metadata!(
                    init {
                        "name" => "Den Borrower", locked;
                        "symbol" => "denBRW", locked;
                        "description" => "A badge identifying a den in a collateral market.", locked;
                    }
                ))
                .mint_roles(mint_roles!(
                    minter => rule!(require(global_caller(component_address))
                    || require_amount(
                        dec!("0.75"),
                        controller_role.resource_address()
                    ));
                    minter_updater => rule!(require_amount(
                        dec!("0.75"),
                        controller_role.resource_address()
                    ));
                ))
                .create_with_no_initial_supply()
                .into();

            let now = Clock::current_time_rounded_to_seconds().seconds_since_unix_epoch;

            let den_manager = Self {
                state: DenLedger::new(DenManagerParameters::default(), now),
                collateral_address,
                collateral_vault: Vault::new(collateral_address),
                collateral_fee_vault: Vault::new(collateral_address),
                debt_fee_vault: Vault::new(debt_token_manager.address()),
                gas_pool: Vault::new(debt_token_manager.address()),
                debt_token_manager,
                borrower_badge_manager,
                controller_badge_manager,
                borrower_badge_counter: 0,
                price_feed: Global::from(price_feed_address),
                price_feed_method,
            }
            .instantiate()
            .prepare_to_globalize(OwnerRole::Fixed(rule!(require_amount(
                dec!("0.75"),
                controller_role.resource_address()
            ))))
            .with_address(address_reservation)
            .metadata(metadata! {
                init {
                    "name" => "Den Manager".to_string(), updatable;
                    "description" => "Den accounting and redemptions for a single collateral".to_string(), updatable;
                }
            })
            .globalize();

            (
                den_manager,
                controller_role,
                debt_token_manager.address(),
                borrower_badge_manager.address(),
            )
        }

        /// Opens a den and mints the requested debt against the deposited collateral.
        ///
        /// The den's composite debt is `debt_amount` plus the borrowing fee plus the gas
        /// compensation. The fee is minted into the debt fee vault, the gas compensation into the
        /// gas pool.
        ///
        /// # Arguments
        /// * `borrower`: Local id of the borrower badge owning the den.
        /// * `collateral`: The collateral to lock.
        /// * `debt_amount`: Debt tokens to mint to the caller.
        /// * `upper_hint`, `lower_hint`: Expected neighbours in the sorted list.
        ///
        /// # Panics
        /// * If the collateral or the borrower badge is of the wrong resource.
        /// * If the net debt is below the minimum or the den would be below the MCR.
        /// * If the market is paused or sunsetting, the den is already active or the debt limit
        ///   would be exceeded.
        pub fn open_den(
            &mut self,
            borrower: DenId,
            collateral: Bucket,
            debt_amount: Decimal,
            upper_hint: Option<DenId>,
            lower_hint: Option<DenId>,
        ) -> Bucket {
            assert!(
                collateral.resource_address() == self.collateral_address,
                "Wrong collateral provided."
            );

            let now = Self::now();
            let price = self.fetch_price();
            let parameters = self.state.parameters.clone();

            let borrowing_fee = self
                .state
                .decay_base_rate_and_get_borrowing_fee(debt_amount, now);
            let net_debt = debt_amount + borrowing_fee;
            assert!(
                net_debt >= parameters.min_net_debt,
                "Net debt is less than the minimum required amount."
            );

            let composite_debt = net_debt + parameters.debt_gas_compensation;
            let collateral_amount = collateral.amount();
            assert!(
                compute_cr(collateral_amount, composite_debt, price) >= parameters.mcr,
                "Collateral ratio would be below the MCR."
            );

            self.state
                .open(
                    borrower,
                    collateral_amount,
                    composite_debt,
                    compute_nominal_cr(collateral_amount, composite_debt),
                    upper_hint,
                    lower_hint,
                    now,
                )
                .or_abort();

            self.collateral_vault.put(collateral);
            self.mint_into_fee_vault(borrowing_fee);
            self.mint_into_gas_pool(parameters.debt_gas_compensation);
            let debt_tokens = self.debt_token_manager.mint(debt_amount);

            self.emit_ledger_events();

            debt_tokens
        }

        /// Adjusts an active den's collateral and debt.
        ///
        /// # Arguments
        /// * `borrower`: Local id of the den's borrower badge.
        /// * `collateral_deposit`: Collateral to add, if any.
        /// * `collateral_withdrawal`: Collateral to withdraw. Cannot be combined with a deposit.
        /// * `debt_change`: Debt to mint (on increase) or repay (on decrease).
        /// * `is_debt_increase`: Direction of `debt_change`.
        /// * `debt_payment`: Debt tokens to repay with, required when decreasing the debt.
        /// * `upper_hint`, `lower_hint`: Expected neighbours at the den's new position.
        ///
        /// # Returns
        /// * The withdrawn collateral, if any.
        /// * The minted debt tokens, or what is left of `debt_payment`.
        pub fn adjust_den(
            &mut self,
            borrower: DenId,
            collateral_deposit: Option<Bucket>,
            collateral_withdrawal: Decimal,
            debt_change: Decimal,
            is_debt_increase: bool,
            debt_payment: Option<Bucket>,
            upper_hint: Option<DenId>,
            lower_hint: Option<DenId>,
        ) -> (Option<Bucket>, Option<Bucket>) {
            let deposit_amount = collateral_deposit
                .as_ref()
                .map_or(Decimal::ZERO, |bucket| bucket.amount());
            assert!(
                deposit_amount == Decimal::ZERO || collateral_withdrawal == Decimal::ZERO,
                "Cannot withdraw and add collateral at once."
            );
            if let Some(deposit) = &collateral_deposit {
                assert!(
                    deposit.resource_address() == self.collateral_address,
                    "Wrong collateral provided."
                );
            }

            let now = Self::now();
            let price = self.fetch_price();
            let parameters = self.state.parameters.clone();

            let is_coll_increase = deposit_amount > Decimal::ZERO;
            let borrowing_fee = if is_debt_increase && debt_change > Decimal::ZERO {
                self.state
                    .decay_base_rate_and_get_borrowing_fee(debt_change, now)
            } else {
                Decimal::ZERO
            };

            let adjusted = self
                .state
                .adjust(
                    borrower,
                    &DenAdjustment {
                        is_debt_increase,
                        debt_change,
                        net_debt_change: debt_change + borrowing_fee,
                        is_coll_increase,
                        coll_change: if is_coll_increase {
                            deposit_amount
                        } else {
                            collateral_withdrawal
                        },
                        upper_hint,
                        lower_hint,
                    },
                    now,
                )
                .or_abort();

            assert!(
                adjusted.new_debt - parameters.debt_gas_compensation >= parameters.min_net_debt,
                "Net debt is less than the minimum required amount."
            );
            if is_debt_increase || collateral_withdrawal > Decimal::ZERO {
                assert!(
                    compute_cr(adjusted.new_coll, adjusted.new_debt, price) >= parameters.mcr,
                    "Collateral ratio would be below the MCR."
                );
            }

            if let Some(deposit) = collateral_deposit {
                self.collateral_vault.put(deposit);
            }
            let withdrawn = if collateral_withdrawal > Decimal::ZERO {
                Some(self.take_collateral(collateral_withdrawal))
            } else {
                None
            };

            let debt_tokens = if debt_change == Decimal::ZERO {
                debt_payment
            } else if is_debt_increase {
                self.mint_into_fee_vault(borrowing_fee);
                Some(self.debt_token_manager.mint(debt_change))
            } else {
                let mut payment = debt_payment.expect("Debt payment required to repay debt.");
                assert!(
                    payment.resource_address() == self.debt_token_manager.address(),
                    "Wrong debt token provided."
                );
                assert!(payment.amount() >= debt_change, "Not enough debt tokens supplied.");
                payment.take(debt_change).burn();
                Some(payment)
            };

            self.emit_ledger_events();

            (withdrawn, debt_tokens)
        }

        /// Closes a den, repaying its debt and returning all of its collateral.
        ///
        /// The gas compensation part of the debt is burned from the gas pool, so `payment` only
        /// needs to cover the rest.
        ///
        /// # Returns
        /// * The den's collateral.
        /// * What is left of `payment`.
        pub fn close_den(&mut self, borrower: DenId, mut payment: Bucket) -> (Bucket, Bucket) {
            assert!(
                payment.resource_address() == self.debt_token_manager.address(),
                "Wrong debt token provided."
            );

            let now = Self::now();
            let gas_compensation = self.state.parameters.debt_gas_compensation;

            let (coll, debt) = self.state.apply_pending_rewards(&borrower, now).or_abort();
            self.state.close(borrower, coll, debt, now).or_abort();

            let to_repay = debt - gas_compensation;
            assert!(
                payment.amount() >= to_repay,
                "not enough debt tokens supplied to close completely"
            );

            payment.take(to_repay).burn();
            self.burn_from_gas_pool(gas_compensation);
            let collateral = self.take_collateral(coll);

            self.emit_ledger_events();

            (collateral, payment)
        }

        pub fn close_den_by_liquidation(&mut self, borrower: DenId) {
            self.state.close_by_liquidation(borrower).or_abort();
            self.emit_ledger_events();
        }

        /// Brings a den up to date and returns its `(coll, debt)`.
        pub fn apply_pending_rewards(&mut self, borrower: DenId) -> (Decimal, Decimal) {
            let balances = self
                .state
                .apply_pending_rewards(&borrower, Self::now())
                .or_abort();
            self.emit_ledger_events();
            balances
        }

        pub fn move_pending_rewards_to_active(&mut self, debt: Decimal, coll: Decimal) {
            self.state
                .move_pending_rewards_to_active(debt, coll)
                .or_abort();
        }

        pub fn add_collateral_surplus(&mut self, borrower: DenId, amount: Decimal) {
            self.state.add_collateral_surplus(borrower, amount);
        }

        /// Settles a liquidation batch.
        ///
        /// Redistributes `debt` and `coll` over all remaining stakes, removes `coll_surplus` from
        /// the active collateral and pays out the gas compensation.
        ///
        /// # Returns
        /// * The debt gas compensation, taken from the gas pool.
        /// * The collateral gas compensation.
        pub fn finalize_liquidation(
            &mut self,
            debt: Decimal,
            coll: Decimal,
            coll_surplus: Decimal,
            debt_gas_compensation: Decimal,
            coll_gas_compensation: Decimal,
        ) -> (Bucket, Bucket) {
            self.state
                .finalize_liquidation(debt, coll, coll_surplus, coll_gas_compensation)
                .or_abort();

            let debt_gas = self
                .gas_pool
                .take_advanced(debt_gas_compensation, WithdrawStrategy::Rounded(RoundingMode::ToZero));
            let coll_gas = self.take_collateral(coll_gas_compensation);

            self.emit_ledger_events();

            (debt_gas, coll_gas)
        }

        /// Burns debt offset by the stability pool and returns the collateral it receives.
        pub fn decrease_debt_and_send_collateral(&mut self, debt: Bucket, coll: Decimal) -> Bucket {
            assert!(
                debt.resource_address() == self.debt_token_manager.address(),
                "Wrong debt token provided."
            );

            self.state
                .decrease_debt_and_send_collateral(debt.amount(), coll);

            debt.burn();
            self.take_collateral(coll)
        }

        pub fn decay_base_rate_and_get_borrowing_fee(&mut self, debt: Decimal) -> Decimal {
            let fee = self
                .state
                .decay_base_rate_and_get_borrowing_fee(debt, Self::now());
            self.emit_ledger_events();
            fee
        }

        /// Mints all interest accrued so far.
        pub fn collect_interests(&mut self) -> Bucket {
            let amount = self.state.collect_interests(Self::now()).or_abort();
            self.emit_ledger_events();
            self.debt_token_manager.mint(amount)
        }

        /// Withdraws the collected borrowing fees (debt tokens) and redemption fees (collateral).
        pub fn withdraw_fees(&mut self) -> (Bucket, Bucket) {
            (
                self.debt_fee_vault.take_all(),
                self.collateral_fee_vault.take_all(),
            )
        }

        pub fn set_parameters(&mut self, parameters: DenManagerParameters) {
            self.state
                .set_parameters(parameters, Self::now())
                .or_abort();
            info!("Den manager parameters updated");
            self.emit_ledger_events();
        }

        pub fn set_paused(&mut self, paused: bool) {
            self.state.set_paused(paused);
            info!("Den manager paused: {}", paused);
        }

        /// Winds the market down. Openings and increases are rejected from now on, redemptions
        /// are free and remaining debt accrues the sunsetting interest rate.
        pub fn start_sunset(&mut self) {
            self.state.start_sunset(Self::now());
            info!("Den manager sunset started");
            self.emit_ledger_events();
        }

        pub fn set_interest_exempt_den(&mut self, den: Option<DenId>) {
            self.state.set_interest_exempt_den(den).or_abort();
        }

        pub fn set_price_feed(&mut self, price_feed_address: ComponentAddress, method: String) {
            self.price_feed = Global::from(price_feed_address);
            self.price_feed_method = method;
        }

        /// Mint a controller badge
        pub fn mint_controller_badge(&self, amount: Decimal) -> Bucket {
            self.controller_badge_manager.mint(amount)
        }

        /// Redeems debt tokens for collateral, starting at the riskiest den with a collateral ratio
        /// of at least 100%.
        ///
        /// # Arguments
        /// * `payment`: Debt tokens to redeem with. At least `debt_amount`.
        /// * `debt_amount`: Debt to redeem.
        /// * `first_redemption_hint`: Expected first den to redeem from. Verified, and replaced
        ///   by a scan from the riskiest end when wrong.
        /// * `upper_partial_redemption_hint`, `lower_partial_redemption_hint`: Expected neighbours
        ///   of the partially redeemed den at its new position.
        /// * `partial_redemption_hint_nicr`: Expected NICR of the partially redeemed den. If it is
        ///   off by more than `PARTIAL_HINT_TOLERANCE`, the partial redemption is skipped.
        /// * `max_iterations`: Maximum number of dens to redeem from, zero for the default of 100.
        /// * `max_fee_percentage`: Highest acceptable redemption fee, as a fraction of the
        ///   collateral drawn.
        ///
        /// # Returns
        /// * The redeemed collateral, net of the redemption fee.
        /// * The unused part of `payment`.
        pub fn redeem_collateral(
            &mut self,
            mut payment: Bucket,
            debt_amount: Decimal,
            first_redemption_hint: Option<DenId>,
            upper_partial_redemption_hint: Option<DenId>,
            lower_partial_redemption_hint: Option<DenId>,
            partial_redemption_hint_nicr: Decimal,
            max_iterations: u64,
            max_fee_percentage: Decimal,
        ) -> (Bucket, Bucket) {
            assert!(
                payment.resource_address() == self.debt_token_manager.address(),
                "Wrong debt token provided."
            );

            let price = self.fetch_price();
            let totals = self
                .state
                .redeem_collateral(
                    RedemptionRequest {
                        debt_amount,
                        first_redemption_hint,
                        upper_partial_redemption_hint,
                        lower_partial_redemption_hint,
                        partial_redemption_hint_nicr,
                        max_iterations,
                        max_fee_percentage,
                        available_debt: payment.amount(),
                    },
                    price,
                    Self::now(),
                )
                .or_abort();

            payment.take(totals.total_debt_to_redeem).burn();
            self.burn_from_gas_pool(totals.gas_compensation_to_burn);

            let fee = self.take_collateral(totals.collateral_fee);
            self.collateral_fee_vault.put(fee);
            let collateral = self.take_collateral(totals.collateral_to_redeemer);

            self.emit_ledger_events();

            (collateral, payment)
        }

        /// Claims the surplus collateral of a den closed by redemption or liquidation.
        pub fn claim_collateral(&mut self, borrower_proof: NonFungibleProof) -> Bucket {
            let borrower_proof = borrower_proof.check_with_message(
                self.borrower_badge_manager.address(),
                "Incorrect proof! Are you sure this den is yours?",
            );
            let borrower = borrower_proof.non_fungible::<BorrowerBadge>().local_id().clone();

            let amount = self.state.claim_collateral(&borrower).or_abort();
            self.emit_ledger_events();

            self.take_collateral(amount)
        }

        /// Mints a new borrower badge. Its local id is the id of the den it can own.
        pub fn mint_borrower_badge(&mut self) -> Bucket {
            self.borrower_badge_counter += 1;
            self.borrower_badge_manager.mint_non_fungible(
                &NonFungibleLocalId::integer(self.borrower_badge_counter),
                BorrowerBadge {
                    key_image_url: Url::of("https://dens.example.com/borrower.png"),
                    collateral_address: self.collateral_address,
                },
            )
        }

        //GETTERS

        pub fn get_entire_debt_and_coll(&self, borrower: DenId) -> EntireDebtAndColl {
            self.state.entire_debt_and_coll(&borrower, Self::now())
        }

        pub fn get_current_icr(&self, borrower: DenId) -> Decimal {
            self.state
                .current_icr(&borrower, self.fetch_price(), Self::now())
        }

        pub fn get_nominal_icr(&self, borrower: DenId) -> Decimal {
            self.state.nominal_icr(&borrower, Self::now())
        }

        pub fn get_entire_system_debt(&self) -> Decimal {
            self.state.entire_system_debt(Self::now())
        }

        pub fn get_entire_system_coll(&self) -> Decimal {
            self.state.entire_system_coll()
        }

        /// Returns `(entire system collateral, entire system debt, price)`.
        pub fn get_entire_system_balances(&self) -> (Decimal, Decimal, Decimal) {
            (
                self.state.entire_system_coll(),
                self.state.entire_system_debt(Self::now()),
                self.fetch_price(),
            )
        }

        pub fn get_redemption_rate(&self) -> Decimal {
            self.state.redemption_rate()
        }

        pub fn get_redemption_rate_with_decay(&self) -> Decimal {
            self.state.redemption_rate_with_decay(Self::now())
        }

        pub fn get_redemption_fee_with_decay(&self, collateral_drawn: Decimal) -> Decimal {
            self.state
                .redemption_fee_with_decay(collateral_drawn, Self::now())
                .or_abort()
        }

        pub fn get_borrowing_rate(&self) -> Decimal {
            self.state.borrowing_rate()
        }

        pub fn get_borrowing_rate_with_decay(&self) -> Decimal {
            self.state.borrowing_rate_with_decay(Self::now())
        }

        pub fn get_borrowing_fee(&self, debt: Decimal) -> Decimal {
            self.state.borrowing_fee(debt)
        }

        pub fn get_borrowing_fee_with_decay(&self, debt: Decimal) -> Decimal {
            self.state.borrowing_fee_with_decay(debt, Self::now())
        }

        pub fn get_den_info(&self, borrower: DenId) -> DenInfo {
            self.state.den_info(&borrower, Self::now())
        }

        pub fn get_den_status(&self, borrower: DenId) -> DenStatus {
            self.state.den_status(&borrower)
        }

        /// Returns the pending `(collateral, debt)` rewards of a den.
        pub fn get_pending_rewards(&self, borrower: DenId) -> (Decimal, Decimal) {
            self.state.pending_rewards(&borrower)
        }

        pub fn has_pending_rewards(&self, borrower: DenId) -> bool {
            self.state.has_pending_rewards(&borrower)
        }

        pub fn get_den_owners_count(&self) -> u64 {
            self.state.den_owners_count()
        }

        pub fn get_den_from_owners_array(&self, index: u64) -> Option<DenId> {
            self.state.den_from_owners_array(index)
        }

        /// Walks up to `count` dens from the riskiest end of the sorted list.
        pub fn get_sorted_dens(&self, count: u64) -> SortedDensInfo {
            self.state.sorted_dens_info(count, Self::now())
        }

        pub fn get_surplus_balance(&self, borrower: DenId) -> Decimal {
            self.state.surplus_balance(&borrower)
        }

        pub fn get_total_active_collateral(&self) -> Decimal {
            self.state.total_active_collateral
        }

        pub fn get_total_active_debt(&self) -> Decimal {
            self.state.total_active_debt
        }

        pub fn get_parameters(&self) -> DenManagerParameters {
            self.state.parameters.clone()
        }

        /// Current collateral price, read from the price feed.
        pub fn fetch_price(&self) -> Decimal {
            self.price_feed.call_raw(
                &self.price_feed_method,
                scrypto_args!(self.collateral_address),
            )
        }

        pub fn get_debt_token_address(&self) -> ResourceAddress {
            self.debt_token_manager.address()
        }

        //HELPER METHODS

        fn now() -> i64 {
            Clock::current_time_rounded_to_seconds().seconds_since_unix_epoch
        }

        fn take_collateral(&mut self, amount: Decimal) -> Bucket {
            self.collateral_vault
                .take_advanced(amount, WithdrawStrategy::Rounded(RoundingMode::ToZero))
        }

        fn mint_into_fee_vault(&mut self, amount: Decimal) {
            if amount > Decimal::ZERO {
                self.debt_fee_vault.put(self.debt_token_manager.mint(amount));
            }
        }

        fn mint_into_gas_pool(&mut self, amount: Decimal) {
            if amount > Decimal::ZERO {
                self.gas_pool.put(self.debt_token_manager.mint(amount));
            }
        }

        fn burn_from_gas_pool(&mut self, amount: Decimal) {
            if amount > Decimal::ZERO {
                self.gas_pool
                    .take_advanced(amount, WithdrawStrategy::Rounded(RoundingMode::ToZero))
                    .burn();
            }
        }

        /// Emits everything the ledger recorded during this call, in order.
        fn emit_ledger_events(&mut self) {
            for event in self.state.take_journal() {
                match event {
                    LedgerEvent::DenUpdated(event) => Runtime::emit_event(event),
                    LedgerEvent::DenIndexUpdated(event) => Runtime::emit_event(event),
                    LedgerEvent::DenSnapshotsUpdated(event) => Runtime::emit_event(event),
                    LedgerEvent::TotalStakesUpdated(event) => Runtime::emit_event(event),
                    LedgerEvent::SystemSnapshotsUpdated(event) => Runtime::emit_event(event),
                    LedgerEvent::LTermsUpdated(event) => Runtime::emit_event(event),
                    LedgerEvent::BaseRateUpdated(event) => Runtime::emit_event(event),
                    LedgerEvent::LastFeeOpTimeUpdated(event) => Runtime::emit_event(event),
                    LedgerEvent::Redemption(event) => Runtime::emit_event(event),
                    LedgerEvent::CollateralClaimed(event) => Runtime::emit_event(event),
                    LedgerEvent::InterestCollected(event) => Runtime::emit_event(event),
                    LedgerEvent::ParametersUpdated(event) => Runtime::emit_event(event),
                    LedgerEvent::SunsetStarted(event) => Runtime::emit_event(event),
                }
            }
        }
    }
}
