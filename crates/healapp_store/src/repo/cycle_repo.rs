//! Menstrual-cycle and contraceptive-pill accessors.

use super::{sqlite_accessor, Accessor, RepoResult};
use crate::model::account::UserId;
use crate::model::cycle::{
    ControlPills, ControlPillsField, CycleId, MenstrualCycle, MenstrualCycleField, PillLog,
    PillLogField, PillLogId, PillsId, PregnancyLogId, PregnancyProbLog, PregnancyProbLogField,
};
use crate::query::{Filter, Sort};
use chrono::{Local, NaiveDate};
use log::info;
use rusqlite::params;

pub trait MenstrualCycleRepository {
    fn create(&self, cycle: &MenstrualCycle) -> RepoResult<CycleId>;
    fn find_all_by_user(&self, user_id: UserId) -> RepoResult<Vec<MenstrualCycle>>;
    /// Most recent cycle that started strictly before `today`.
    fn find_latest_before(
        &self,
        user_id: UserId,
        today: NaiveDate,
    ) -> RepoResult<Option<MenstrualCycle>>;
    fn find_latest_by_user(&self, user_id: UserId) -> RepoResult<Option<MenstrualCycle>>;
}

sqlite_accessor! {
    /// SQLite-backed menstrual-cycle accessor.
    SqliteMenstrualCycleRepository => MenstrualCycle
}

impl MenstrualCycleRepository for SqliteMenstrualCycleRepository<'_> {
    fn create(&self, cycle: &MenstrualCycle) -> RepoResult<CycleId> {
        cycle.validate()?;
        self.executor().insert::<MenstrualCycle>(
            &[
                "user_id",
                "start_date",
                "number_of_days",
                "cycle_length",
                "ovulation_date",
                "ovulation_remind",
                "pregnancy_remind",
                "created_at",
            ],
            params![
                cycle.user_id,
                cycle.start_date,
                cycle.number_of_days,
                cycle.cycle_length,
                cycle.ovulation_date,
                cycle.ovulation_remind,
                cycle.pregnancy_remind,
                cycle.created_at,
            ],
        )
    }

    fn find_all_by_user(&self, user_id: UserId) -> RepoResult<Vec<MenstrualCycle>> {
        self.find_all(
            &Filter::eq(MenstrualCycleField::UserId, user_id),
            &[Sort::asc(MenstrualCycleField::StartDate)],
        )
    }

    fn find_latest_before(
        &self,
        user_id: UserId,
        today: NaiveDate,
    ) -> RepoResult<Option<MenstrualCycle>> {
        let filter = Filter::eq(MenstrualCycleField::UserId, user_id)
            .and(Filter::lt(MenstrualCycleField::StartDate, today));
        self.find_first(&filter, &[Sort::desc(MenstrualCycleField::StartDate)])
    }

    fn find_latest_by_user(&self, user_id: UserId) -> RepoResult<Option<MenstrualCycle>> {
        self.find_first(
            &Filter::eq(MenstrualCycleField::UserId, user_id),
            &[Sort::desc(MenstrualCycleField::StartDate)],
        )
    }
}

pub trait PregnancyProbLogRepository {
    fn create(&self, log: &PregnancyProbLog) -> RepoResult<PregnancyLogId>;
    /// Logs of a cycle, earliest date first.
    fn find_by_cycle(&self, cycle_id: CycleId) -> RepoResult<Vec<PregnancyProbLog>>;
    fn find_by_cycle_and_date(
        &self,
        cycle_id: CycleId,
        date: NaiveDate,
    ) -> RepoResult<Option<PregnancyProbLog>>;
    /// Logs dated within `[from, to]`, earliest first.
    fn find_by_cycle_between(
        &self,
        cycle_id: CycleId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<PregnancyProbLog>>;
}

sqlite_accessor! {
    /// SQLite-backed pregnancy-probability log accessor.
    SqlitePregnancyProbLogRepository => PregnancyProbLog
}

impl PregnancyProbLogRepository for SqlitePregnancyProbLogRepository<'_> {
    fn create(&self, log: &PregnancyProbLog) -> RepoResult<PregnancyLogId> {
        log.validate()?;
        self.executor().insert::<PregnancyProbLog>(
            &["cycle_id", "date", "probability"],
            params![log.cycle_id, log.date, log.probability],
        )
    }

    fn find_by_cycle(&self, cycle_id: CycleId) -> RepoResult<Vec<PregnancyProbLog>> {
        self.find_all(
            &Filter::eq(PregnancyProbLogField::CycleId, cycle_id),
            &[Sort::asc(PregnancyProbLogField::Date)],
        )
    }

    fn find_by_cycle_and_date(
        &self,
        cycle_id: CycleId,
        date: NaiveDate,
    ) -> RepoResult<Option<PregnancyProbLog>> {
        let filter = Filter::eq(PregnancyProbLogField::CycleId, cycle_id)
            .and(Filter::eq(PregnancyProbLogField::Date, date));
        self.find_first(&filter, &[])
    }

    fn find_by_cycle_between(
        &self,
        cycle_id: CycleId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepoResult<Vec<PregnancyProbLog>> {
        let filter = Filter::eq(PregnancyProbLogField::CycleId, cycle_id)
            .and(Filter::between(PregnancyProbLogField::Date, from, to));
        self.find_all(&filter, &[Sort::asc(PregnancyProbLogField::Date)])
    }
}

pub trait ControlPillsRepository {
    fn create(&self, pills: &ControlPills) -> RepoResult<PillsId>;
    fn find_by_user_and_active(&self, user_id: UserId, active: bool)
        -> RepoResult<Vec<ControlPills>>;
    fn find_by_active(&self, active: bool) -> RepoResult<Vec<ControlPills>>;
    fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<ControlPills>>;
}

sqlite_accessor! {
    /// SQLite-backed pill-schedule accessor.
    SqliteControlPillsRepository => ControlPills
}

impl ControlPillsRepository for SqliteControlPillsRepository<'_> {
    fn create(&self, pills: &ControlPills) -> RepoResult<PillsId> {
        pills.validate()?;
        self.executor().insert::<ControlPills>(
            &[
                "user_id",
                "start_date",
                "end_date",
                "is_active",
                "remind_time",
                "number_days_drinking",
                "number_days_off",
                "created_at",
                "updated_at",
            ],
            params![
                pills.user_id,
                pills.start_date,
                pills.end_date,
                pills.is_active,
                pills.remind_time,
                pills.number_days_drinking,
                pills.number_days_off,
                pills.created_at,
                pills.updated_at,
            ],
        )
    }

    fn find_by_user_and_active(
        &self,
        user_id: UserId,
        active: bool,
    ) -> RepoResult<Vec<ControlPills>> {
        let filter = Filter::eq(ControlPillsField::UserId, user_id)
            .and(Filter::eq(ControlPillsField::IsActive, active));
        self.find_all(&filter, &[])
    }

    fn find_by_active(&self, active: bool) -> RepoResult<Vec<ControlPills>> {
        self.find_all(&Filter::eq(ControlPillsField::IsActive, active), &[])
    }

    fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<ControlPills>> {
        self.find_all(
            &Filter::eq(ControlPillsField::UserId, user_id),
            &[Sort::desc(ControlPillsField::CreatedAt)],
        )
    }
}

pub trait PillLogRepository {
    fn create(&self, log: &PillLog) -> RepoResult<PillLogId>;
    /// Removes logs of `pills_id` dated after the local calendar day; returns removed rows.
    fn delete_logs_after_today(&self, pills_id: PillsId) -> RepoResult<usize>;
    /// Removes logs of `pills_id` dated strictly after `day`; returns removed rows.
    fn delete_logs_after(&self, pills_id: PillsId, day: NaiveDate) -> RepoResult<usize>;
    fn find_by_pills_and_date(
        &self,
        pills_id: PillsId,
        log_date: NaiveDate,
    ) -> RepoResult<Option<PillLog>>;
    /// Logs of a schedule, earliest date first.
    fn find_by_pills(&self, pills_id: PillsId) -> RepoResult<Vec<PillLog>>;
}

sqlite_accessor! {
    /// SQLite-backed pill-log accessor.
    SqlitePillLogRepository => PillLog
}

impl PillLogRepository for SqlitePillLogRepository<'_> {
    fn create(&self, log: &PillLog) -> RepoResult<PillLogId> {
        self.executor().insert::<PillLog>(
            &[
                "pills_id",
                "log_date",
                "status",
                "check_in",
                "created_at",
                "updated_at",
            ],
            params![
                log.pills_id,
                log.log_date,
                log.status,
                log.check_in,
                log.created_at,
                log.updated_at,
            ],
        )
    }

    fn delete_logs_after_today(&self, pills_id: PillsId) -> RepoResult<usize> {
        self.delete_logs_after(pills_id, Local::now().date_naive())
    }

    fn delete_logs_after(&self, pills_id: PillsId, day: NaiveDate) -> RepoResult<usize> {
        let removed = self.delete_where(
            &Filter::eq(PillLogField::PillsId, pills_id).and(Filter::gt(PillLogField::LogDate, day)),
        )?;
        info!(
            "event=pill_logs_purged module=store status=ok pills_id={pills_id} after={day} removed={removed}"
        );
        Ok(removed)
    }

    fn find_by_pills_and_date(
        &self,
        pills_id: PillsId,
        log_date: NaiveDate,
    ) -> RepoResult<Option<PillLog>> {
        let filter = Filter::eq(PillLogField::PillsId, pills_id)
            .and(Filter::eq(PillLogField::LogDate, log_date));
        self.find_first(&filter, &[])
    }

    fn find_by_pills(&self, pills_id: PillsId) -> RepoResult<Vec<PillLog>> {
        self.find_all(
            &Filter::eq(PillLogField::PillsId, pills_id),
            &[Sort::asc(PillLogField::LogDate)],
        )
    }
}
