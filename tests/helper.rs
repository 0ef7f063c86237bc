#![allow(dead_code)]

use den_protocol::den_manager_component::den_manager_component_test::*;
use den_protocol::shared_structs::*;
use dummy_price_feed_component::price_feed_test::*;
use scrypto_test::prelude::*;

pub struct Helper {
    pub env: TestEnvironment<InMemorySubstateDatabase>,
    pub package_address: PackageAddress,
    pub collateral: Bucket,
    pub other_token: Bucket,
    pub collateral_address: ResourceAddress,
    pub debt_token_address: ResourceAddress,
    pub borrower_badge_address: ResourceAddress,
    pub controller_badge: Bucket,
    pub den_manager: DenManager,
    pub price_feed: PriceFeed,
    /// Borrower badges are minted with sequential integer ids.
    pub badges_minted: u64,
}

impl Helper {
    pub fn new() -> Result<Self, RuntimeError> {
        let mut env = TestEnvironmentBuilder::new()
            .build();

        let collateral = ResourceBuilder::new_fungible(OwnerRole::None)
            .divisibility(18)
            .mint_initial_supply(1000000, &mut env)?;
        let other_token = ResourceBuilder::new_fungible(OwnerRole::None)
            .divisibility(18)
            .mint_initial_supply(1000000, &mut env)?;

        let collateral_address = collateral.resource_address(&mut env)?;

        let price_feed_package_address = PackageFactory::compile_and_publish(
            "./dummy_price_feed_component",
            &mut env,
            CompileProfile::Standard,
        )?;

        let price_feed = PriceFeed::instantiate_price_feed(
            collateral_address,
            dec!(1),
            price_feed_package_address,
            &mut env
        )?;

        let package_address = PackageFactory::compile_and_publish(
            this_package!(),
            &mut env,
            CompileProfile::Standard,
        )?;

        let (
            mut den_manager,
            controller_badge,
            debt_token_address,
            borrower_badge_address,
        ) = DenManager::instantiate(
            collateral_address,
            ComponentAddress::try_from(price_feed.0.clone()).unwrap(),
            "get_price".to_string(),
            package_address,
            &mut env,
        )?;

        // Redemptions are open right away in tests
        env.disable_auth_module();
        den_manager.set_parameters(
            DenManagerParameters {
                bootstrap_period: 0,
                ..DenManagerParameters::default()
            },
            &mut env,
        )?;
        env.enable_auth_module();

        Ok(Self {
            env,
            package_address,
            collateral: collateral.into(),
            other_token: other_token.into(),
            collateral_address,
            debt_token_address,
            borrower_badge_address,
            controller_badge,
            den_manager,
            price_feed: PriceFeed(price_feed.0),
            badges_minted: 0,
        })
    }

    /////////////////////////////////////////////////
    ////////////// BORROWER OPERATIONS //////////////
    /////////////////////////////////////////////////

    pub fn mint_borrower_badge(&mut self) -> Result<(Bucket, DenId), RuntimeError> {
        let badge = self.den_manager.mint_borrower_badge(&mut self.env)?;
        self.badges_minted += 1;

        Ok((badge, NonFungibleLocalId::integer(self.badges_minted)))
    }

    /// Mints a badge and opens a den for it. Returns the badge, its den id and the minted debt.
    pub fn open_den(
        &mut self,
        collateral_amount: Decimal,
        debt_amount: Decimal,
    ) -> Result<(Bucket, DenId, Bucket), RuntimeError> {
        let (badge, den_id) = self.mint_borrower_badge()?;
        let collateral = self.collateral.take(collateral_amount, &mut self.env)?;

        self.env.disable_auth_module();
        let debt = self.den_manager.open_den(
            den_id.clone(),
            collateral,
            debt_amount,
            None,
            None,
            &mut self.env,
        );
        self.env.enable_auth_module();

        Ok((badge, den_id, debt?))
    }

    pub fn close_den(
        &mut self,
        den_id: DenId,
        payment: Bucket,
    ) -> Result<(Bucket, Bucket), RuntimeError> {
        self.env.disable_auth_module();
        let result = self.den_manager.close_den(den_id, payment, &mut self.env);
        self.env.enable_auth_module();

        result
    }

    pub fn adjust_den(
        &mut self,
        den_id: DenId,
        collateral_deposit: Option<Bucket>,
        collateral_withdrawal: Decimal,
        debt_change: Decimal,
        is_debt_increase: bool,
        debt_payment: Option<Bucket>,
    ) -> Result<(Option<Bucket>, Option<Bucket>), RuntimeError> {
        self.env.disable_auth_module();
        let result = self.den_manager.adjust_den(
            den_id,
            collateral_deposit,
            collateral_withdrawal,
            debt_change,
            is_debt_increase,
            debt_payment,
            None,
            None,
            &mut self.env,
        );
        self.env.enable_auth_module();

        result
    }

    /////////////////////////////////////////////////
    ///////////////// REDEMPTIONS ///////////////////
    /////////////////////////////////////////////////

    pub fn redeem(
        &mut self,
        payment: Bucket,
        debt_amount: Decimal,
        partial_redemption_hint_nicr: Decimal,
    ) -> Result<(Bucket, Bucket), RuntimeError> {
        self.den_manager.redeem_collateral(
            payment,
            debt_amount,
            None,
            None,
            None,
            partial_redemption_hint_nicr,
            0,
            Decimal::ONE,
            &mut self.env,
        )
    }

    /////////////////////////////////////////////////
    //////////////////// ADMIN //////////////////////
    /////////////////////////////////////////////////

    pub fn set_paused(&mut self, paused: bool) -> Result<(), RuntimeError> {
        self.env.disable_auth_module();
        self.den_manager.set_paused(paused, &mut self.env)?;
        self.env.enable_auth_module();

        Ok(())
    }

    /// Applies `change` on top of the test defaults (no bootstrap period).
    pub fn set_parameters(
        &mut self,
        change: impl FnOnce(&mut DenManagerParameters),
    ) -> Result<(), RuntimeError> {
        let mut parameters = DenManagerParameters {
            bootstrap_period: 0,
            ..DenManagerParameters::default()
        };
        change(&mut parameters);

        self.env.disable_auth_module();
        let result = self.den_manager.set_parameters(parameters, &mut self.env);
        self.env.enable_auth_module();

        result
    }

    pub fn start_sunset(&mut self) -> Result<(), RuntimeError> {
        self.env.disable_auth_module();
        let result = self.den_manager.start_sunset(&mut self.env);
        self.env.enable_auth_module();

        result
    }

    pub fn set_interest_exempt_den(&mut self, den: Option<DenId>) -> Result<(), RuntimeError> {
        self.env.disable_auth_module();
        let result = self.den_manager.set_interest_exempt_den(den, &mut self.env);
        self.env.enable_auth_module();

        result
    }

    pub fn advance_days(&mut self, days: i64) {
        let new_time = self.env.get_current_time().add_days(days).unwrap();
        self.env.set_current_time(new_time);
    }

    pub fn change_collateral_price(&mut self, price: Decimal) -> Result<(), RuntimeError> {
        self.env.disable_auth_module();
        self.price_feed.set_price(self.collateral_address, price, &mut self.env)?;
        self.env.enable_auth_module();

        Ok(())
    }

    /////////////////////////////////////////////////
    ////////////////// GETTERS //////////////////////
    /////////////////////////////////////////////////

    pub fn get_den_info(&mut self, den_id: DenId) -> Result<DenInfo, RuntimeError> {
        self.den_manager.get_den_info(den_id, &mut self.env)
    }

    pub fn assert_bucket_eq(
        &mut self,
        bucket: &Bucket,
        address: ResourceAddress,
        amount: Decimal,
    ) -> Result<(), RuntimeError> {
        assert_eq!(bucket.resource_address(&mut self.env)?, address);
        assert_eq!(bucket.amount(&mut self.env)?, amount);

        Ok(())
    }
}
