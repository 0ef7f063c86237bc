//! # Dummy Price Feed Blueprint
//! Fixed, owner-settable collateral prices for testing the den manager without a real oracle.

use scrypto::prelude::*;

#[blueprint]
mod price_feed {
    enable_method_auth! {
        methods {
            get_price => PUBLIC;
            set_price => restrict_to: [OWNER];
        }
    }

    struct PriceFeed {
        prices: HashMap<ResourceAddress, Decimal>,
    }

    impl PriceFeed {
        pub fn instantiate_price_feed(collateral: ResourceAddress, price: Decimal) -> Global<PriceFeed> {
            let mut prices: HashMap<ResourceAddress, Decimal> = HashMap::new();
            prices.insert(collateral, price);

            Self { prices }
                .instantiate()
                .prepare_to_globalize(OwnerRole::None)
                .metadata(metadata! {
                    init {
                        "name" => "Dummy Price Feed".to_string(), updatable;
                        "description" => "A dummy price feed used for testing the den manager".to_string(), updatable;
                    }
                })
                .globalize()
        }

        pub fn get_price(&self, collateral: ResourceAddress) -> Decimal {
            self.prices
                .get(&collateral)
                .cloned()
                .expect("Price not set for this collateral")
        }

        pub fn set_price(&mut self, collateral: ResourceAddress, price: Decimal) {
            self.prices.insert(collateral, price);
        }
    }
}
