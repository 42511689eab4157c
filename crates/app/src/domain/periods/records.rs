//! Vacation period and allocation records.

use jiff::{Timestamp, civil::Date};

use crate::{
    domain::{companies::records::CompanyUuid, users::records::UserUuid},
    uuids::TypedUuid,
};

pub type PeriodUuid = TypedUuid<VacationPeriodRecord>;
pub type AllocationUuid = TypedUuid<VacationAllocationRecord>;

/// A company-configurable accounting year, commonly April through March.
#[derive(Debug, Clone)]
pub struct VacationPeriodRecord {
    pub uuid: PeriodUuid,
    pub company_uuid: CompanyUuid,

    /// Unique per company.
    pub name: String,

    pub start_date: Date,
    pub end_date: Date,

    /// At most one default period per company.
    pub is_default: bool,

    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl VacationPeriodRecord {
    #[must_use]
    pub fn contains(&self, day: Date) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

#[derive(Debug, Clone)]
pub struct NewVacationPeriod {
    pub name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub is_default: bool,
    pub is_active: bool,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct PeriodPatch {
    pub name: Option<String>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct VacationAllocationRecord {
    pub uuid: AllocationUuid,
    pub user_uuid: UserUuid,
    pub period_uuid: PeriodUuid,
    pub total_days: f64,
    pub carried_over_days: f64,
    pub days_used: f64,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl VacationAllocationRecord {
    #[must_use]
    pub fn total_available(&self) -> f64 {
        self.total_days + self.carried_over_days
    }

    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.total_available() - self.days_used
    }
}

/// Admin-set allocation figures for one user in one period.
#[derive(Debug, Clone)]
pub struct AllocationUpsert {
    pub user_uuid: UserUuid,
    pub total_days: f64,
    pub carried_over_days: f64,
    pub notes: Option<String>,
}

/// Balance projection for one period. Never mutates anything.
#[derive(Debug, Clone)]
pub struct BalanceEntry {
    pub period: VacationPeriodRecord,
    pub allocation: VacationAllocationRecord,

    /// Sum of `days_count` over the user's pending requests in the period.
    pub pending_days: f64,
}

impl BalanceEntry {
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.allocation.remaining()
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    fn period(start: Date, end: Date) -> VacationPeriodRecord {
        VacationPeriodRecord {
            uuid: PeriodUuid::new(),
            company_uuid: CompanyUuid::new(),
            name: "2025-2026".to_string(),
            start_date: start,
            end_date: end,
            is_default: true,
            is_active: true,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn period_bounds_are_inclusive() {
        let period = period(date(2025, 4, 1), date(2026, 3, 31));

        assert!(period.contains(date(2025, 4, 1)));
        assert!(period.contains(date(2026, 3, 31)));
        assert!(period.contains(date(2025, 7, 14)));
        assert!(!period.contains(date(2025, 3, 31)));
        assert!(!period.contains(date(2026, 4, 1)));
    }

    #[test]
    fn remaining_subtracts_used_from_total_and_carryover() {
        let allocation = VacationAllocationRecord {
            uuid: AllocationUuid::new(),
            user_uuid: UserUuid::new(),
            period_uuid: PeriodUuid::new(),
            total_days: 25.0,
            carried_over_days: 2.5,
            days_used: 5.0,
            notes: None,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        };

        assert!((allocation.total_available() - 27.5).abs() < f64::EPSILON);
        assert!((allocation.remaining() - 22.5).abs() < f64::EPSILON);
    }
}
