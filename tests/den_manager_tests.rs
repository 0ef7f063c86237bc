mod helper;
use helper::Helper;
use den_protocol::math::{compute_cr, compute_nominal_cr};
use den_protocol::shared_structs::*;

use scrypto_test::prelude::*;

#[test]
fn test_open_den() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (_badge, den_id, debt) = helper.open_den(dec!(5000), dec!(2000))?;

    // 2000 requested + 0.5% borrowing fee + 200 gas compensation
    helper.assert_bucket_eq(&debt, helper.debt_token_address, dec!(2000))?;

    let den_info = helper.get_den_info(den_id.clone())?;
    assert_eq!(den_info.status, DenStatus::Active);
    assert_eq!(den_info.stored_debt, dec!(2210));
    assert_eq!(den_info.stored_coll, dec!(5000));
    assert_eq!(den_info.stake, dec!(5000));
    assert_eq!(den_info.nominal_cr, compute_nominal_cr(dec!(5000), dec!(2210)));

    assert_eq!(helper.den_manager.get_den_owners_count(&mut helper.env)?, 1);
    assert_eq!(
        helper.den_manager.get_den_from_owners_array(0, &mut helper.env)?,
        Some(den_id)
    );
    assert_eq!(helper.den_manager.get_total_active_debt(&mut helper.env)?, dec!(2210));
    assert_eq!(helper.den_manager.get_entire_system_debt(&mut helper.env)?, dec!(2210));
    assert_eq!(helper.den_manager.get_entire_system_coll(&mut helper.env)?, dec!(5000));

    Ok(())
}

#[test]
fn test_open_den_is_restricted_to_owner() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();
    let (_badge, den_id) = helper.mint_borrower_badge()?;
    let collateral = helper.collateral.take(dec!(5000), &mut helper.env)?;

    let result = helper.den_manager.open_den(
        den_id,
        collateral,
        dec!(2000),
        None,
        None,
        &mut helper.env,
    );

    assert!(result.is_err());

    Ok(())
}

#[test]
fn test_open_den_below_min_net_debt() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    // Net debt of 1005 is below the 1800 minimum
    assert!(helper.open_den(dec!(5000), dec!(1000)).is_err());

    Ok(())
}

#[test]
fn test_open_den_below_mcr() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    // 2420 collateral against 2210 debt is below the 110% MCR
    assert!(helper.open_den(dec!(2420), dec!(2000)).is_err());

    Ok(())
}

#[test]
fn test_open_den_wrong_collateral() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();
    let (_badge, den_id) = helper.mint_borrower_badge()?;
    let wrong_collateral = helper.other_token.take(dec!(5000), &mut helper.env)?;

    helper.env.disable_auth_module();
    let result = helper.den_manager.open_den(
        den_id,
        wrong_collateral,
        dec!(2000),
        None,
        None,
        &mut helper.env,
    );
    helper.env.enable_auth_module();

    assert!(result.is_err());

    Ok(())
}

#[test]
fn test_open_den_while_paused() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    helper.set_paused(true)?;
    helper.set_paused(false)?;
    let (_badge, _den_id, _debt) = helper.open_den(dec!(5000), dec!(2000))?;

    helper.set_paused(true)?;
    assert!(helper.open_den(dec!(5000), dec!(2000)).is_err());

    Ok(())
}

#[test]
fn test_close_den() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (_badge, den_id, debt) = helper.open_den(dec!(5000), dec!(2000))?;
    let (_badge_2, den_id_2, debt_2) = helper.open_den(dec!(5000), dec!(2000))?;
    debt.put(debt_2, &mut helper.env)?;

    let (collateral, leftover) = helper.close_den(den_id.clone(), debt)?;

    // The gas compensation is burned from the gas pool, the rest is repaid
    helper.assert_bucket_eq(&collateral, helper.collateral_address, dec!(5000))?;
    helper.assert_bucket_eq(&leftover, helper.debt_token_address, dec!(1990))?;

    let den_info = helper.get_den_info(den_id)?;
    assert_eq!(den_info.status, DenStatus::ClosedByOwner);
    assert_eq!(den_info.stored_debt, Decimal::ZERO);
    assert_eq!(den_info.stored_coll, Decimal::ZERO);

    // The remaining den was swapped into the freed slot
    assert_eq!(helper.den_manager.get_den_owners_count(&mut helper.env)?, 1);
    assert_eq!(
        helper.den_manager.get_den_from_owners_array(0, &mut helper.env)?,
        Some(den_id_2)
    );
    assert_eq!(helper.den_manager.get_total_active_debt(&mut helper.env)?, dec!(2210));

    Ok(())
}

#[test]
fn test_close_den_requires_full_repayment() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (_badge, den_id, debt) = helper.open_den(dec!(5000), dec!(2000))?;

    assert!(helper.close_den(den_id, debt).is_err());

    Ok(())
}

#[test]
fn test_adjust_den_repay_and_top_up() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (_badge, den_id, debt) = helper.open_den(dec!(5000), dec!(2000))?;
    let top_up = helper.collateral.take(dec!(1000), &mut helper.env)?;

    let (withdrawn, leftover) = helper.adjust_den(
        den_id.clone(),
        Some(top_up),
        Decimal::ZERO,
        dec!(200),
        false,
        Some(debt),
    )?;

    assert!(withdrawn.is_none());
    helper.assert_bucket_eq(&leftover.unwrap(), helper.debt_token_address, dec!(1800))?;

    let den_info = helper.get_den_info(den_id)?;
    assert_eq!(den_info.stored_coll, dec!(6000));
    assert_eq!(den_info.stored_debt, dec!(2010));
    assert_eq!(den_info.stake, dec!(6000));

    Ok(())
}

#[test]
fn test_adjust_den_borrow_and_withdraw() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (_badge, den_id, _debt) = helper.open_den(dec!(5000), dec!(2000))?;

    let (withdrawn, minted) = helper.adjust_den(
        den_id.clone(),
        None,
        dec!(1000),
        dec!(1000),
        true,
        None,
    )?;

    helper.assert_bucket_eq(&withdrawn.unwrap(), helper.collateral_address, dec!(1000))?;
    helper.assert_bucket_eq(&minted.unwrap(), helper.debt_token_address, dec!(1000))?;

    // 1000 borrowed plus a 0.5% fee
    let den_info = helper.get_den_info(den_id.clone())?;
    assert_eq!(den_info.stored_coll, dec!(4000));
    assert_eq!(den_info.stored_debt, dec!(3215));

    // Withdrawing down to 110% of 3215 is not allowed
    let result = helper.adjust_den(den_id, None, dec!(500), Decimal::ZERO, false, None);
    assert!(result.is_err());

    Ok(())
}

#[test]
fn test_partial_redemption() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (_badge, den_id, debt) = helper.open_den(dec!(6000), dec!(4000))?;
    let (_badge_2, den_id_2, debt_2) = helper.open_den(dec!(20000), dec!(2000))?;
    debt.put(debt_2, &mut helper.env)?;

    // The riskiest den ends up with 5000 collateral against 3220 debt
    let hint_nicr = compute_nominal_cr(dec!(5000), dec!(3220));
    let (collateral, leftover) = helper.redeem(debt, dec!(1000), hint_nicr)?;

    let redeemed = collateral.amount(&mut helper.env)?;
    assert!(redeemed < dec!(1000));
    assert!(redeemed > dec!(900));
    helper.assert_bucket_eq(&leftover, helper.debt_token_address, dec!(5000))?;

    let den_info = helper.get_den_info(den_id)?;
    assert_eq!(den_info.status, DenStatus::Active);
    assert_eq!(den_info.stored_debt, dec!(3220));
    assert_eq!(den_info.stored_coll, dec!(5000));

    // Untouched
    assert_eq!(helper.get_den_info(den_id_2)?.stored_debt, dec!(2210));

    // The redemption pushed the base rate up
    assert!(helper.den_manager.get_redemption_rate(&mut helper.env)? > dec!("0.005"));

    Ok(())
}

#[test]
fn test_stale_partial_hint_redeems_nothing() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (_badge, _den_id, debt) = helper.open_den(dec!(6000), dec!(4000))?;
    let (_badge_2, _den_id_2, debt_2) = helper.open_den(dec!(20000), dec!(2000))?;
    debt.put(debt_2, &mut helper.env)?;

    // The only candidate partial step is cancelled, leaving nothing redeemed
    assert!(helper.redeem(debt, dec!(1000), dec!(1)).is_err());

    Ok(())
}

#[test]
fn test_full_redemption_and_claim() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (badge, den_id, debt) = helper.open_den(dec!(3000), dec!(2000))?;
    let (_badge_2, _den_id_2, debt_2) = helper.open_den(dec!(20000), dec!(2000))?;
    debt.put(debt_2, &mut helper.env)?;

    // Everything but the gas compensation
    let (collateral, leftover) = helper.redeem(debt, dec!(2010), Decimal::ZERO)?;

    assert!(collateral.amount(&mut helper.env)? < dec!(2010));
    helper.assert_bucket_eq(&leftover, helper.debt_token_address, dec!(1990))?;

    let den_info = helper.get_den_info(den_id.clone())?;
    assert_eq!(den_info.status, DenStatus::ClosedByRedemption);
    assert_eq!(den_info.surplus, dec!(990));
    assert_eq!(helper.den_manager.get_den_owners_count(&mut helper.env)?, 1);

    let badge_proof = NonFungibleProof(badge.create_proof_of_all(&mut helper.env)?);
    let surplus = helper
        .den_manager
        .claim_collateral(badge_proof, &mut helper.env)?;
    helper.assert_bucket_eq(&surplus, helper.collateral_address, dec!(990))?;

    assert_eq!(
        helper.den_manager.get_surplus_balance(den_id, &mut helper.env)?,
        Decimal::ZERO
    );

    // Nothing left to claim
    let badge_proof = NonFungibleProof(badge.create_proof_of_all(&mut helper.env)?);
    assert!(helper
        .den_manager
        .claim_collateral(badge_proof, &mut helper.env)
        .is_err());

    Ok(())
}

#[test]
fn test_redemption_blocked_below_mcr() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (_badge, _den_id, debt) = helper.open_den(dec!(6000), dec!(4000))?;
    let (_badge_2, _den_id_2, debt_2) = helper.open_den(dec!(20000), dec!(2000))?;
    debt.put(debt_2, &mut helper.env)?;

    // 26000 collateral at 0.25 against 6430 debt
    helper.change_collateral_price(dec!("0.25"))?;

    let hint_nicr = compute_nominal_cr(dec!(5000), dec!(3220));
    assert!(helper.redeem(debt, dec!(1000), hint_nicr).is_err());

    Ok(())
}

#[test]
fn test_getters() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    assert_eq!(helper.den_manager.fetch_price(&mut helper.env)?, dec!(1));
    assert_eq!(helper.den_manager.get_borrowing_rate(&mut helper.env)?, dec!("0.005"));
    assert_eq!(helper.den_manager.get_redemption_rate(&mut helper.env)?, dec!("0.005"));
    assert_eq!(
        helper.den_manager.get_borrowing_fee(dec!(2000), &mut helper.env)?,
        dec!(10)
    );
    assert_eq!(
        helper.den_manager.get_debt_token_address(&mut helper.env)?,
        helper.debt_token_address
    );
    assert_eq!(
        helper.den_manager.get_parameters(&mut helper.env)?.bootstrap_period,
        0
    );

    let (_badge, den_id, _debt) = helper.open_den(dec!(5000), dec!(2000))?;

    assert_eq!(
        helper.den_manager.get_current_icr(den_id.clone(), &mut helper.env)?,
        compute_cr(dec!(5000), dec!(2210), dec!(1))
    );
    assert!(!helper.den_manager.has_pending_rewards(den_id.clone(), &mut helper.env)?);
    assert_eq!(
        helper.den_manager.get_den_status(den_id.clone(), &mut helper.env)?,
        DenStatus::Active
    );

    let sorted = helper.den_manager.get_sorted_dens(10, &mut helper.env)?;
    assert_eq!(sorted.size, 1);
    assert_eq!(sorted.last, Some(den_id));

    Ok(())
}

#[test]
fn test_collect_interests_without_interest_fails() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();
    let (_badge, _den_id, _debt) = helper.open_den(dec!(5000), dec!(2000))?;

    helper.env.disable_auth_module();
    let result = helper.den_manager.collect_interests(&mut helper.env);
    helper.env.enable_auth_module();

    assert!(result.is_err());

    Ok(())
}

#[test]
fn test_liquidation_offset_and_redistribution() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (_badge, den_id, debt) = helper.open_den(dec!(5000), dec!(2000))?;
    let (_badge_2, _den_id_2, _debt_2) = helper.open_den(dec!(20000), dec!(2000))?;
    let (badge_3, den_id_3, _debt_3) = helper.open_den(dec!(2500), dec!(2000))?;

    helper.env.disable_auth_module();

    let (coll, den_debt) = helper
        .den_manager
        .apply_pending_rewards(den_id_3.clone(), &mut helper.env)?;
    assert_eq!((coll, den_debt), (dec!(2500), dec!(2210)));

    helper
        .den_manager
        .close_den_by_liquidation(den_id_3.clone(), &mut helper.env)?;

    // The stability pool absorbs 1000 debt for 1100 collateral
    let offset = debt.take(dec!(1000), &mut helper.env)?;
    let pool_collateral = helper
        .den_manager
        .decrease_debt_and_send_collateral(offset, dec!(1100), &mut helper.env)?;
    helper.assert_bucket_eq(&pool_collateral, helper.collateral_address, dec!(1100))?;

    // The rest is redistributed, 100 stays claimable and 25 pays the liquidator
    helper
        .den_manager
        .add_collateral_surplus(den_id_3.clone(), dec!(100), &mut helper.env)?;
    let (debt_gas, coll_gas) = helper.den_manager.finalize_liquidation(
        dec!(1210),
        dec!(1275),
        dec!(100),
        dec!(200),
        dec!(25),
        &mut helper.env,
    )?;

    helper.env.enable_auth_module();

    helper.assert_bucket_eq(&debt_gas, helper.debt_token_address, dec!(200))?;
    helper.assert_bucket_eq(&coll_gas, helper.collateral_address, dec!(25))?;

    assert_eq!(
        helper.den_manager.get_den_status(den_id_3.clone(), &mut helper.env)?,
        DenStatus::ClosedByLiquidation
    );
    assert_eq!(helper.den_manager.get_den_owners_count(&mut helper.env)?, 2);
    assert_eq!(
        helper.den_manager.get_total_active_collateral(&mut helper.env)?,
        dec!(25000)
    );
    assert_eq!(helper.den_manager.get_entire_system_debt(&mut helper.env)?, dec!(5630));

    // 5000 of 25000 stakes carries a fifth of the redistribution
    assert_eq!(
        helper.den_manager.get_pending_rewards(den_id.clone(), &mut helper.env)?,
        (dec!(255), dec!(242))
    );
    let entire = helper
        .den_manager
        .get_entire_debt_and_coll(den_id, &mut helper.env)?;
    assert_eq!(entire.coll, dec!(5255));
    assert_eq!(entire.debt, dec!(2452));

    let badge_proof = NonFungibleProof(badge_3.create_proof_of_all(&mut helper.env)?);
    let surplus = helper
        .den_manager
        .claim_collateral(badge_proof, &mut helper.env)?;
    helper.assert_bucket_eq(&surplus, helper.collateral_address, dec!(100))?;

    assert_eq!(
        helper.den_manager.get_surplus_balance(den_id_3, &mut helper.env)?,
        Decimal::ZERO
    );

    Ok(())
}

#[test]
fn test_collect_interests_after_a_year() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();
    helper.set_parameters(|parameters| parameters.interest_rate_in_bps = 1000)?;

    let (_badge, den_id, _debt) = helper.open_den(dec!(5000), dec!(2000))?;

    helper.advance_days(365);

    // 10% on 2210 for one year
    let entire_debt = helper
        .den_manager
        .get_entire_debt_and_coll(den_id, &mut helper.env)?
        .debt;
    assert!(entire_debt > dec!("2430.99") && entire_debt <= dec!(2431));

    helper.env.disable_auth_module();
    let interest = helper.den_manager.collect_interests(&mut helper.env)?;
    helper.env.enable_auth_module();

    let collected = interest.amount(&mut helper.env)?;
    assert_eq!(interest.resource_address(&mut helper.env)?, helper.debt_token_address);
    assert!(collected > dec!("220.99") && collected <= dec!(221));

    assert_eq!(
        helper.den_manager.get_total_active_debt(&mut helper.env)?,
        dec!(2210) + collected
    );

    Ok(())
}

#[test]
fn test_interest_exempt_den() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();
    helper.set_parameters(|parameters| parameters.interest_rate_in_bps = 1000)?;

    // Badges are numbered from 1, so the first den opened below is exempt
    helper.set_interest_exempt_den(Some(NonFungibleLocalId::integer(1)))?;

    let (_badge, den_id, _debt) = helper.open_den(dec!(5000), dec!(2000))?;
    let (_badge_2, den_id_2, _debt_2) = helper.open_den(dec!(5000), dec!(2000))?;

    helper.advance_days(365);

    assert_eq!(
        helper
            .den_manager
            .get_entire_debt_and_coll(den_id, &mut helper.env)?
            .debt,
        dec!(2210)
    );
    assert!(
        helper
            .den_manager
            .get_entire_debt_and_coll(den_id_2, &mut helper.env)?
            .debt
            > dec!(2430)
    );

    // The exempt den is active, so it cannot be replaced
    assert!(helper.set_interest_exempt_den(None).is_err());

    Ok(())
}

#[test]
fn test_sunset_redemptions_are_free() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    let (_badge, den_id, debt) = helper.open_den(dec!(3000), dec!(2000))?;
    let (_badge_2, _den_id_2, debt_2) = helper.open_den(dec!(20000), dec!(2000))?;
    debt.put(debt_2, &mut helper.env)?;

    helper.start_sunset()?;

    let parameters = helper.den_manager.get_parameters(&mut helper.env)?;
    assert_eq!(parameters.redemption_fee_floor, Decimal::ZERO);
    assert_eq!(parameters.max_system_debt, Decimal::ZERO);

    // No fee is kept: 2010 debt buys exactly 2010 collateral at a price of 1
    let (collateral, leftover) = helper.redeem(debt, dec!(2010), Decimal::ZERO)?;
    helper.assert_bucket_eq(&collateral, helper.collateral_address, dec!(2010))?;
    helper.assert_bucket_eq(&leftover, helper.debt_token_address, dec!(1990))?;

    let den_info = helper.get_den_info(den_id)?;
    assert_eq!(den_info.status, DenStatus::ClosedByRedemption);
    assert_eq!(den_info.surplus, dec!(990));

    assert!(helper.open_den(dec!(5000), dec!(2000)).is_err());

    Ok(())
}

#[test]
fn test_gas_compensation_locked_while_dens_are_open() -> Result<(), RuntimeError> {
    let mut helper = Helper::new().unwrap();

    helper.set_parameters(|parameters| parameters.debt_gas_compensation = dec!(100))?;
    let (_badge, _den_id, _debt) = helper.open_den(dec!(5000), dec!(2000))?;

    // Other parameters can still change
    helper.set_parameters(|parameters| {
        parameters.debt_gas_compensation = dec!(100);
        parameters.mcr = dec!("1.2");
    })?;
    assert_eq!(
        helper.den_manager.get_parameters(&mut helper.env)?.mcr,
        dec!("1.2")
    );

    assert!(helper
        .set_parameters(|parameters| parameters.debt_gas_compensation = dec!(200))
        .is_err());

    Ok(())
}
