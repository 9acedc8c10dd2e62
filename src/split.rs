use crate::CURRENCY_PRECISION;
use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use thiserror::Error;

const FULL_SHARE: Decimal = dec!(100);

// Percentages typed in by hand (e.g. 33.33 x 3) rarely land exactly on 100.
const RATIO_TOLERANCE: Decimal = dec!(0.01);

/// One member's share of a group subscription, as a percentage
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemberRatio {
    pub member_id: u64,
    pub percentage: Decimal,
}

/// The amount a member pays towards a shared charge
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemberShare {
    pub member_id: u64,
    pub amount: Decimal,
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum SplitError {
    #[error("ratio {1}% for member {0} must be between 0 and 100")]
    RatioOutOfRange(u64, Decimal),
    #[error("ratios total {0}% but must total 100%")]
    RatioTotal(Decimal),
    #[error("member {0} has more than one ratio")]
    DuplicateMember(u64),
    #[error("a split needs at least one member")]
    NoMembers,
    #[error("cannot split a negative amount {0}")]
    NegativeAmount(Decimal),
}

/// Check that a set of ratios is a valid split of a subscription.
pub fn validate_ratios(ratios: &[MemberRatio]) -> Result<(), SplitError> {
    if ratios.is_empty() {
        return Err(SplitError::NoMembers);
    }

    let mut seen = HashSet::new();
    for ratio in ratios {
        if ratio.percentage < Decimal::ZERO || ratio.percentage > FULL_SHARE {
            return Err(SplitError::RatioOutOfRange(ratio.member_id, ratio.percentage));
        }

        if !seen.insert(ratio.member_id) {
            return Err(SplitError::DuplicateMember(ratio.member_id));
        }
    }

    let total: Decimal = ratios.iter().map(|r| r.percentage).sum();
    if (total - FULL_SHARE).abs() > RATIO_TOLERANCE {
        return Err(SplitError::RatioTotal(total));
    }

    Ok(())
}

/// Share a subscription evenly between members. This is what a group gets before its
/// admin sets any ratios.
pub fn equal_ratios(member_ids: &[u64]) -> Result<Vec<MemberRatio>, SplitError> {
    if member_ids.is_empty() {
        return Err(SplitError::NoMembers);
    }

    let percentage = FULL_SHARE / Decimal::from(member_ids.len());

    Ok(member_ids
        .iter()
        .map(|id| MemberRatio {
            member_id: *id,
            percentage,
        })
        .collect())
}

/// Divide `amount` between members according to their ratios.
///
/// Each share is rounded to whole cents. Rounding can leave the shares a cent or two
/// away from `amount`, so the member with the largest ratio takes up the difference
/// (the first of them on a tie) and the shares always add back up to exactly
/// `amount`. An over-allocation is taken from the largest ratios first and never
/// drives a share below zero.
pub fn split_amount(
    amount: Decimal,
    ratios: &[MemberRatio],
) -> Result<Vec<MemberShare>, SplitError> {
    validate_ratios(ratios)?;

    if amount < Decimal::ZERO {
        return Err(SplitError::NegativeAmount(amount));
    }

    let mut shares: Vec<MemberShare> = ratios
        .iter()
        .map(|r| MemberShare {
            member_id: r.member_id,
            amount: (amount * r.percentage / FULL_SHARE).round_dp(CURRENCY_PRECISION),
        })
        .collect();

    let allocated: Decimal = shares.iter().map(|s| s.amount).sum();
    let mut remainder = amount - allocated;

    if !remainder.is_zero() {
        debug!(
            "splitting {} leaves {} after rounding; assigning by largest ratio",
            amount, remainder
        );

        // Stable, so equal ratios keep their input order
        let mut by_ratio: Vec<usize> = (0..ratios.len()).collect();
        by_ratio.sort_by(|a, b| ratios[*b].percentage.cmp(&ratios[*a].percentage));

        for i in by_ratio {
            if remainder.is_zero() {
                break;
            }

            let share = &mut shares[i].amount;
            let adjustment = remainder.max(-*share);
            *share += adjustment;
            remainder -= adjustment;
        }
    }

    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(member_id: u64, percentage: Decimal) -> MemberRatio {
        MemberRatio {
            member_id,
            percentage,
        }
    }

    #[test]
    fn validate_ratios_exact() {
        assert_eq!(
            validate_ratios(&[ratio(1, dec!(25.5)), ratio(2, dec!(74.5))]),
            Ok(())
        );
    }

    #[test]
    fn validate_ratios_within_tolerance() {
        let ratios = [ratio(1, dec!(33.33)), ratio(2, dec!(33.33)), ratio(3, dec!(33.33))];
        assert_eq!(validate_ratios(&ratios), Ok(()));
    }

    #[test]
    fn validate_ratios_bad_total() {
        assert_eq!(
            validate_ratios(&[ratio(1, dec!(50)), ratio(2, dec!(40))]),
            Err(SplitError::RatioTotal(dec!(90)))
        );
    }

    #[test]
    fn validate_ratios_out_of_range() {
        assert_eq!(
            validate_ratios(&[ratio(1, dec!(120)), ratio(2, dec!(-20))]),
            Err(SplitError::RatioOutOfRange(1, dec!(120)))
        );
    }

    #[test]
    fn validate_ratios_duplicate_member() {
        assert_eq!(
            validate_ratios(&[ratio(7, dec!(50)), ratio(7, dec!(50))]),
            Err(SplitError::DuplicateMember(7))
        );
    }

    #[test]
    fn validate_ratios_empty() {
        assert_eq!(validate_ratios(&[]), Err(SplitError::NoMembers));
    }

    #[test]
    fn equal_ratios_four_members() {
        let ratios = equal_ratios(&[1, 2, 3, 4]).unwrap();
        assert_eq!(ratios.len(), 4);
        assert!(ratios.iter().all(|r| r.percentage == dec!(25)));
        assert_eq!(validate_ratios(&ratios), Ok(()));
    }

    #[test]
    fn equal_ratios_empty() {
        assert_eq!(equal_ratios(&[]), Err(SplitError::NoMembers));
    }

    #[test]
    fn split_amount_even() {
        let shares = split_amount(dec!(20), &[ratio(1, dec!(50)), ratio(2, dec!(50))]).unwrap();
        assert_eq!(
            shares,
            vec![
                MemberShare {
                    member_id: 1,
                    amount: dec!(10),
                },
                MemberShare {
                    member_id: 2,
                    amount: dec!(10),
                },
            ]
        );
    }

    #[test]
    fn split_amount_first_of_equal_ratios_takes_remainder() {
        let ratios = equal_ratios(&[1, 2, 3]).unwrap();
        let shares = split_amount(dec!(10), &ratios).unwrap();

        let amounts: Vec<_> = shares.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![dec!(3.34), dec!(3.33), dec!(3.33)]);
        assert_eq!(amounts.iter().copied().sum::<Decimal>(), dec!(10));
    }

    #[test]
    fn split_amount_largest_ratio_takes_remainder() {
        let ratios = [ratio(1, dec!(33.33)), ratio(2, dec!(33.34)), ratio(3, dec!(33.33))];
        let shares = split_amount(dec!(0.10), &ratios).unwrap();

        let amounts: Vec<_> = shares.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![dec!(0.03), dec!(0.04), dec!(0.03)]);
    }

    #[test]
    fn split_amount_over_allocation_never_negative() {
        // Totals 100.01, which is within tolerance
        let ratios = [ratio(1, dec!(100)), ratio(2, dec!(0.01)), ratio(3, dec!(0))];
        let shares = split_amount(dec!(10000), &ratios).unwrap();

        assert_eq!(
            shares,
            vec![
                MemberShare {
                    member_id: 1,
                    amount: dec!(9999),
                },
                MemberShare {
                    member_id: 2,
                    amount: dec!(1),
                },
                MemberShare {
                    member_id: 3,
                    amount: dec!(0),
                },
            ]
        );
        assert!(shares.iter().all(|s| s.amount >= Decimal::ZERO));
        assert_eq!(shares.iter().map(|s| s.amount).sum::<Decimal>(), dec!(10000));
    }

    #[test]
    fn split_amount_rejects_negative_amount() {
        assert_eq!(
            split_amount(dec!(-5), &[ratio(1, dec!(100))]),
            Err(SplitError::NegativeAmount(dec!(-5)))
        );
    }

    #[test]
    fn split_amount_rejects_invalid_ratios() {
        assert_eq!(
            split_amount(dec!(10), &[ratio(1, dec!(10))]),
            Err(SplitError::RatioTotal(dec!(10)))
        );
    }
}
