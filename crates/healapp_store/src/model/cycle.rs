//! Menstrual-cycle tracking and contraceptive-pill schedules.

use super::account::UserId;
use super::{read_flag, require_ordered, require_range, ValidationError};
use crate::query::{entity_fields, Entity};
use crate::repo::RepoResult;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type CycleId = i64;
pub type PregnancyLogId = i64;
pub type PillsId = i64;
pub type PillLogId = i64;

/// One recorded menstrual cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenstrualCycle {
    pub id: CycleId,
    pub user_id: UserId,
    pub start_date: NaiveDate,
    /// Days of bleeding, `1..=30`.
    pub number_of_days: i64,
    /// Days from this start to the next.
    pub cycle_length: i64,
    pub ovulation_date: NaiveDate,
    pub ovulation_remind: bool,
    pub pregnancy_remind: bool,
    pub created_at: NaiveDateTime,
}

impl MenstrualCycle {
    pub fn new(
        user_id: UserId,
        start_date: NaiveDate,
        number_of_days: i64,
        cycle_length: i64,
        ovulation_date: NaiveDate,
    ) -> Self {
        Self {
            id: 0,
            user_id,
            start_date,
            number_of_days,
            cycle_length,
            ovulation_date,
            ovulation_remind: false,
            pregnancy_remind: false,
            created_at: Local::now().naive_local(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_range("number_of_days", self.number_of_days, 1, 30)?;
        require_range("cycle_length", self.cycle_length, 1, i64::MAX)?;
        require_ordered(
            "start_date",
            &self.start_date,
            "ovulation_date",
            &self.ovulation_date,
        )
    }
}

entity_fields! {
    MenstrualCycleField {
        Id => "cycle_id",
        UserId => "user_id",
        StartDate => "start_date",
        OvulationDate => "ovulation_date",
        OvulationRemind => "ovulation_remind",
        PregnancyRemind => "pregnancy_remind",
        CreatedAt => "created_at",
    }
}

impl Entity for MenstrualCycle {
    type Field = MenstrualCycleField;
    const NAME: &'static str = "menstrual cycle";
    const TABLE: &'static str = "menstrual_cycles";
    const PRIMARY_KEY: &'static str = "cycle_id";
    const COLUMNS: &'static [&'static str] = &[
        "cycle_id",
        "user_id",
        "start_date",
        "number_of_days",
        "cycle_length",
        "ovulation_date",
        "ovulation_remind",
        "pregnancy_remind",
        "created_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("cycle_id")?,
            user_id: row.get("user_id")?,
            start_date: row.get("start_date")?,
            number_of_days: row.get("number_of_days")?,
            cycle_length: row.get("cycle_length")?,
            ovulation_date: row.get("ovulation_date")?,
            ovulation_remind: read_flag(row, Self::TABLE, "ovulation_remind")?,
            pregnancy_remind: read_flag(row, Self::TABLE, "pregnancy_remind")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Estimated pregnancy probability for one day of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PregnancyProbLog {
    pub id: PregnancyLogId,
    pub cycle_id: CycleId,
    pub date: NaiveDate,
    /// Percentage, `0..=100`.
    pub probability: f64,
}

impl PregnancyProbLog {
    pub fn new(cycle_id: CycleId, date: NaiveDate, probability: f64) -> Self {
        Self {
            id: 0,
            cycle_id,
            date,
            probability,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=100.0).contains(&self.probability) {
            return Err(ValidationError::OutOfRange {
                field: "probability",
                value: self.probability as i64,
                min: 0,
                max: 100,
            });
        }
        Ok(())
    }
}

entity_fields! {
    PregnancyProbLogField {
        Id => "id",
        CycleId => "cycle_id",
        Date => "date",
    }
}

impl Entity for PregnancyProbLog {
    type Field = PregnancyProbLogField;
    const NAME: &'static str = "pregnancy probability log";
    const TABLE: &'static str = "pregnancy_prob_logs";
    const PRIMARY_KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "cycle_id", "date", "probability"];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            cycle_id: row.get("cycle_id")?,
            date: row.get("date")?,
            probability: row.get("probability")?,
        })
    }
}

/// A contraceptive-pill schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPills {
    pub id: PillsId,
    pub user_id: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub remind_time: NaiveTime,
    /// Consecutive pill days per pack.
    pub number_days_drinking: i64,
    /// Break days between packs.
    pub number_days_off: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ControlPills {
    pub fn new(
        user_id: UserId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        remind_time: NaiveTime,
        number_days_drinking: i64,
        number_days_off: i64,
    ) -> Self {
        let now = Local::now().naive_local();
        Self {
            id: 0,
            user_id,
            start_date,
            end_date,
            is_active: true,
            remind_time,
            number_days_drinking,
            number_days_off,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_ordered("start_date", &self.start_date, "end_date", &self.end_date)?;
        require_range("number_days_drinking", self.number_days_drinking, 1, i64::MAX)?;
        require_range("number_days_off", self.number_days_off, 0, i64::MAX)
    }
}

entity_fields! {
    ControlPillsField {
        Id => "pills_id",
        UserId => "user_id",
        StartDate => "start_date",
        EndDate => "end_date",
        IsActive => "is_active",
        RemindTime => "remind_time",
        CreatedAt => "created_at",
    }
}

impl Entity for ControlPills {
    type Field = ControlPillsField;
    const NAME: &'static str = "pill schedule";
    const TABLE: &'static str = "control_pills";
    const PRIMARY_KEY: &'static str = "pills_id";
    const COLUMNS: &'static [&'static str] = &[
        "pills_id",
        "user_id",
        "start_date",
        "end_date",
        "is_active",
        "remind_time",
        "number_days_drinking",
        "number_days_off",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("pills_id")?,
            user_id: row.get("user_id")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            is_active: read_flag(row, Self::TABLE, "is_active")?,
            remind_time: row.get("remind_time")?,
            number_days_drinking: row.get("number_days_drinking")?,
            number_days_off: row.get("number_days_off")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Whether the pill was taken on one day of a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillLog {
    pub id: PillLogId,
    pub pills_id: PillsId,
    pub log_date: NaiveDate,
    /// `true` once taken.
    pub status: bool,
    pub check_in: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl PillLog {
    pub fn new(pills_id: PillsId, log_date: NaiveDate) -> Self {
        Self {
            id: 0,
            pills_id,
            log_date,
            status: false,
            check_in: None,
            created_at: Local::now().naive_local(),
            updated_at: None,
        }
    }
}

entity_fields! {
    PillLogField {
        Id => "log_id",
        PillsId => "pills_id",
        LogDate => "log_date",
        Status => "status",
    }
}

impl Entity for PillLog {
    type Field = PillLogField;
    const NAME: &'static str = "pill log";
    const TABLE: &'static str = "pill_logs";
    const PRIMARY_KEY: &'static str = "log_id";
    const COLUMNS: &'static [&'static str] = &[
        "log_id",
        "pills_id",
        "log_date",
        "status",
        "check_in",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("log_id")?,
            pills_id: row.get("pills_id")?,
            log_date: row.get("log_date")?,
            status: read_flag(row, Self::TABLE, "status")?,
            check_in: row.get("check_in")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ControlPills, MenstrualCycle, PregnancyProbLog};
    use chrono::{NaiveDate, NaiveTime};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn cycle_bleeding_days_are_bounded() {
        assert!(MenstrualCycle::new(1, day(1), 5, 28, day(14)).validate().is_ok());
        assert!(MenstrualCycle::new(1, day(1), 31, 28, day(14)).validate().is_err());
        assert!(MenstrualCycle::new(1, day(1), 5, 0, day(14)).validate().is_err());
    }

    #[test]
    fn pill_schedule_must_not_end_before_start() {
        let remind = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
        assert!(ControlPills::new(1, day(10), day(2), remind, 21, 7)
            .validate()
            .is_err());
        assert!(ControlPills::new(1, day(2), day(30), remind, 21, 7)
            .validate()
            .is_ok());
    }

    #[test]
    fn probability_is_a_percentage() {
        assert!(PregnancyProbLog::new(1, day(3), 33.5).validate().is_ok());
        assert!(PregnancyProbLog::new(1, day(3), 120.0).validate().is_err());
    }
}
