//! Activity type taxonomy.
//!
//! The original system treats activity types as bare integers validated by
//! a lookup table maintained "alongside code." Here the enum *is* that
//! table: `sign_class()` is the single authoritative source for which
//! activity types may credit, debit, or go either way.

/// The direction a `PointsTransaction.delta` is allowed to take for a given
/// activity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignClass {
    Positive,
    Negative,
    Bidirectional,
}

/// Ledger activity type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ActivityType {
    Adjustment = 1,
    Credit2 = 2,
    Credit4 = 4,
    Credit5 = 5,
    /// Incentive credit.
    Incentive = 6,
    Credit7 = 7,
    /// Auto-refill credit.
    Refill = 10,
    Credit12 = 12,
    Credit18 = 18,
    Credit24 = 24,
    Debit3 = 3,
    /// Carpool rider fee.
    CarpoolRiderFee = 8,
    /// Debit into escrow.
    IntoEscrow = 9,
    Debit11 = 11,
    Debit19 = 19,
    Debit22 = 22,
    Debit25 = 25,
    Debit26 = 26,
}

impl ActivityType {
    /// Decodes a raw activity type code into its typed form.
    ///
    /// Unknown codes are a programmer error: the
    /// caller should treat `None` as fatal for the operation, not retry.
    pub fn from_code(code: i32) -> Option<Self> {
        use ActivityType::*;
        Some(match code {
            1 => Adjustment,
            2 => Credit2,
            4 => Credit4,
            5 => Credit5,
            6 => Incentive,
            7 => Credit7,
            10 => Refill,
            12 => Credit12,
            18 => Credit18,
            24 => Credit24,
            3 => Debit3,
            8 => CarpoolRiderFee,
            9 => IntoEscrow,
            11 => Debit11,
            19 => Debit19,
            22 => Debit22,
            25 => Debit25,
            26 => Debit26,
            _ => return None,
        })
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Authoritative sign classification.
    pub fn sign_class(self) -> SignClass {
        use ActivityType::*;
        use SignClass::*;
        match self {
            Adjustment => Bidirectional,
            Credit2 | Credit4 | Credit5 | Incentive | Credit7 | Refill | Credit12 | Credit18
            | Credit24 => Positive,
            Debit3 | CarpoolRiderFee | IntoEscrow | Debit11 | Debit19 | Debit22 | Debit25
            | Debit26 => Negative,
        }
    }

    /// Whether a `delta` of the given sign is permitted for this activity.
    pub fn accepts_delta_sign(self, delta: rust_decimal::Decimal) -> bool {
        match self.sign_class() {
            SignClass::Positive => delta > rust_decimal::Decimal::ZERO,
            SignClass::Negative => delta < rust_decimal::Decimal::ZERO,
            SignClass::Bidirectional => true,
        }
    }
}

/// Escrow detail activity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowDirection {
    /// Debits the user wallet into escrow (activity 9).
    Increase,
    /// Credits the user wallet out of escrow (activity 10).
    Decrease,
}

impl EscrowDirection {
    /// Activities 1-5, 12, 24 increase (debit user into escrow); everything
    /// else decreases (credit user out of escrow).
    pub fn for_activity_code(code: i32) -> Self {
        match code {
            1..=5 | 12 | 24 => EscrowDirection::Increase,
            _ => EscrowDirection::Decrease,
        }
    }
}

/// Well-known `system_coins_transaction` account ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAccount {
    Budget,
    Escrow,
    User(i64),
}

impl SystemAccount {
    pub fn id(self) -> i64 {
        match self {
            SystemAccount::Budget => 2000,
            SystemAccount::Escrow => 2001,
            SystemAccount::User(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn from_code_round_trips_through_code() {
        for code in [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 18, 19, 22, 24, 25, 26] {
            let activity = ActivityType::from_code(code).expect("known code");
            assert_eq!(activity.code(), code);
        }
    }

    #[test]
    fn unknown_code_decodes_to_none() {
        assert!(ActivityType::from_code(999).is_none());
    }

    #[test]
    fn positive_activity_rejects_non_positive_delta() {
        assert!(!ActivityType::Refill.accepts_delta_sign(Decimal::ZERO));
        assert!(!ActivityType::Refill.accepts_delta_sign(Decimal::from(-1)));
        assert!(ActivityType::Refill.accepts_delta_sign(Decimal::from(1)));
    }

    #[test]
    fn negative_activity_rejects_non_negative_delta() {
        assert!(!ActivityType::CarpoolRiderFee.accepts_delta_sign(Decimal::ZERO));
        assert!(!ActivityType::CarpoolRiderFee.accepts_delta_sign(Decimal::from(1)));
        assert!(ActivityType::CarpoolRiderFee.accepts_delta_sign(Decimal::from(-1)));
    }

    #[test]
    fn bidirectional_activity_accepts_any_sign() {
        assert!(ActivityType::Adjustment.accepts_delta_sign(Decimal::ZERO));
        assert!(ActivityType::Adjustment.accepts_delta_sign(Decimal::from(5)));
        assert!(ActivityType::Adjustment.accepts_delta_sign(Decimal::from(-5)));
    }

    #[test]
    fn escrow_direction_splits_on_known_increase_codes() {
        assert_eq!(EscrowDirection::for_activity_code(1), EscrowDirection::Increase);
        assert_eq!(EscrowDirection::for_activity_code(12), EscrowDirection::Increase);
        assert_eq!(EscrowDirection::for_activity_code(24), EscrowDirection::Increase);
        assert_eq!(EscrowDirection::for_activity_code(8), EscrowDirection::Decrease);
        assert_eq!(EscrowDirection::for_activity_code(9), EscrowDirection::Decrease);
    }

    #[test]
    fn system_account_ids_are_well_known() {
        assert_eq!(SystemAccount::Budget.id(), 2000);
        assert_eq!(SystemAccount::Escrow.id(), 2001);
        assert_eq!(SystemAccount::User(42).id(), 42);
    }
}
