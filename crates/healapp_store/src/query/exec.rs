//! Generic statement executor shared by every accessor.
//!
//! # Responsibility
//! - Turn a `Filter`, sort keys and page request into one SQL statement.
//! - Enforce the configured page-size and unpaged-row bounds.
//! - Emit one `event=query` debug line per statement.
//!
//! # Invariants
//! - Every ordered read ends with the primary key ascending, so paging is stable.
//! - Unpaged reads never materialize more than `max_unpaged_rows` rows.
//! - Writes are single statements; [`Executor::atomically`] groups several.
//! - A page's total and items come from one read transaction.

use super::filter::{Field, Filter};
use super::page::{Page, PageRequest, Sort};
use super::Entity;
use crate::config::QueryLimits;
use crate::repo::{RepoError, RepoResult};
use log::{debug, warn};
use rusqlite::types::{FromSql, Value};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::time::Instant;

/// Runs entity queries against a borrowed connection.
///
/// A `rusqlite::Transaction` derefs to `Connection`, so an executor built from
/// one takes part in that transaction.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'conn> {
    conn: &'conn Connection,
    limits: QueryLimits,
}

impl<'conn> Executor<'conn> {
    pub fn new(conn: &'conn Connection, limits: QueryLimits) -> Self {
        Self {
            conn,
            limits: limits.normalized(),
        }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    pub fn find_by_id<E: Entity>(&self, id: i64) -> RepoResult<Option<E>> {
        self.traced("find_by_id", E::TABLE, |found: &Option<E>| usize::from(found.is_some()), || {
            let sql = format!("{} WHERE {} = ?1", select_sql::<E>(), E::PRIMARY_KEY);
            let mut items = self.load::<E>(&sql, vec![Value::Integer(id)])?;
            Ok(items.pop())
        })
    }

    /// First match in `sort` order.
    pub fn find_first<E: Entity>(
        &self,
        filter: &Filter<E::Field>,
        sort: &[Sort<E::Field>],
    ) -> RepoResult<Option<E>> {
        self.traced("find_first", E::TABLE, |found: &Option<E>| usize::from(found.is_some()), || {
            let (where_sql, mut bindings) = where_clause(filter);
            let sql = format!(
                "{} WHERE {where_sql}{} LIMIT ?",
                select_sql::<E>(),
                order_clause::<E>(sort)
            );
            bindings.push(Value::Integer(1));
            Ok(self.load::<E>(&sql, bindings)?.into_iter().next())
        })
    }

    /// Every match, failing with `ResultTooLarge` above `max_unpaged_rows`.
    pub fn find_all<E: Entity>(
        &self,
        filter: &Filter<E::Field>,
        sort: &[Sort<E::Field>],
    ) -> RepoResult<Vec<E>> {
        let cap = self.limits.max_unpaged_rows;
        self.traced("find_all", E::TABLE, |items: &Vec<E>| items.len(), || {
            let (where_sql, mut bindings) = where_clause(filter);
            let sql = format!(
                "{} WHERE {where_sql}{} LIMIT ?",
                select_sql::<E>(),
                order_clause::<E>(sort)
            );
            bindings.push(Value::Integer(i64::from(cap) + 1));
            let items = self.load::<E>(&sql, bindings)?;
            if items.len() > cap as usize {
                return Err(RepoError::ResultTooLarge {
                    table: E::TABLE,
                    limit: cap,
                });
            }
            Ok(items)
        })
    }

    /// Leading `limit` matches in `sort` order, capped at `max_unpaged_rows`.
    pub fn find_limited<E: Entity>(
        &self,
        filter: &Filter<E::Field>,
        sort: &[Sort<E::Field>],
        limit: u32,
    ) -> RepoResult<Vec<E>> {
        let limit = limit.min(self.limits.max_unpaged_rows);
        self.traced("find_limited", E::TABLE, |items: &Vec<E>| items.len(), || {
            let (where_sql, mut bindings) = where_clause(filter);
            let sql = format!(
                "{} WHERE {where_sql}{} LIMIT ?",
                select_sql::<E>(),
                order_clause::<E>(sort)
            );
            bindings.push(Value::Integer(i64::from(limit)));
            self.load::<E>(&sql, bindings)
        })
    }

    /// One page of matches plus the total match count.
    pub fn find_page<E: Entity>(
        &self,
        filter: &Filter<E::Field>,
        request: &PageRequest<E::Field>,
    ) -> RepoResult<Page<E>> {
        let size = self.limits.page_size(request.size);
        self.traced("find_page", E::TABLE, |page: &Page<E>| page.items.len(), || {
            let (where_sql, mut bindings) = where_clause(filter);
            // Count and slice read one snapshot.
            self.atomically(|_| {
                let total = self.count_where(E::TABLE, &where_sql, bindings.clone())?;
                let offset = u64::from(request.page) * u64::from(size);
                if offset >= total {
                    return Ok(Page::empty(request.page, size, total));
                }

                let sql = format!(
                    "{} WHERE {where_sql}{} LIMIT ? OFFSET ?",
                    select_sql::<E>(),
                    order_clause::<E>(&request.sort)
                );
                bindings.push(Value::Integer(i64::from(size)));
                bindings.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));
                Ok(Page {
                    items: self.load::<E>(&sql, bindings)?,
                    page: request.page,
                    size,
                    total,
                })
            })
        })
    }

    pub fn exists<E: Entity>(&self, filter: &Filter<E::Field>) -> RepoResult<bool> {
        self.traced("exists", E::TABLE, |found: &bool| usize::from(*found), || {
            let (where_sql, bindings) = where_clause(filter);
            let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {where_sql});", E::TABLE);
            let found: i64 = self
                .conn
                .query_row(&sql, params_from_iter(bindings), |row| row.get(0))?;
            Ok(found == 1)
        })
    }

    pub fn count<E: Entity>(&self, filter: &Filter<E::Field>) -> RepoResult<u64> {
        self.traced("count", E::TABLE, |_: &u64| 1, || {
            let (where_sql, bindings) = where_clause(filter);
            self.count_where(E::TABLE, &where_sql, bindings)
        })
    }

    /// `SUM(field)` over matches; 0 when nothing matches.
    pub fn sum<E: Entity>(&self, field: E::Field, filter: &Filter<E::Field>) -> RepoResult<i64> {
        self.traced("sum", E::TABLE, |_: &i64| 1, || {
            let (where_sql, bindings) = where_clause(filter);
            let sql = format!(
                "SELECT COALESCE(SUM({}), 0) FROM {} WHERE {where_sql};",
                field.expr(),
                E::TABLE
            );
            let total: i64 = self
                .conn
                .query_row(&sql, params_from_iter(bindings), |row| row.get(0))?;
            Ok(total)
        })
    }

    /// Match counts grouped by `key`, ordered by key ascending.
    pub fn group_count<E: Entity, K: FromSql>(
        &self,
        key: E::Field,
        filter: &Filter<E::Field>,
    ) -> RepoResult<Vec<(K, u64)>> {
        self.traced("group_count", E::TABLE, |groups: &Vec<(K, u64)>| groups.len(), || {
            let (where_sql, bindings) = where_clause(filter);
            let sql = format!(
                "SELECT {} AS group_key, COUNT(*) AS group_count
                 FROM {}
                 WHERE {where_sql}
                 GROUP BY group_key
                 ORDER BY group_key ASC;",
                key.expr(),
                E::TABLE
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bindings))?;
            let mut groups = Vec::new();
            while let Some(row) = rows.next()? {
                let count: i64 = row.get("group_count")?;
                groups.push((row.get("group_key")?, to_count(count)));
            }
            Ok(groups)
        })
    }

    /// `UPDATE ... SET ... WHERE filter`; returns affected rows.
    ///
    /// Assigned fields must be plain columns.
    pub fn update_where<E: Entity>(
        &self,
        assignments: &[(E::Field, Value)],
        filter: &Filter<E::Field>,
    ) -> RepoResult<usize> {
        if assignments.is_empty() {
            return Ok(0);
        }
        self.traced("update_where", E::TABLE, |changed: &usize| *changed, || {
            let mut bindings: Vec<Value> = Vec::with_capacity(assignments.len());
            let mut set_sql = String::new();
            for (index, (field, value)) in assignments.iter().enumerate() {
                if index > 0 {
                    set_sql.push_str(", ");
                }
                set_sql.push_str(field.expr());
                set_sql.push_str(" = ?");
                bindings.push(value.clone());
            }
            let (where_sql, where_bindings) = where_clause(filter);
            bindings.extend(where_bindings);
            let sql = format!("UPDATE {} SET {set_sql} WHERE {where_sql};", E::TABLE);
            Ok(self.conn.execute(&sql, params_from_iter(bindings))?)
        })
    }

    /// `DELETE ... WHERE filter`; returns affected rows.
    pub fn delete_where<E: Entity>(&self, filter: &Filter<E::Field>) -> RepoResult<usize> {
        self.traced("delete_where", E::TABLE, |changed: &usize| *changed, || {
            let (where_sql, bindings) = where_clause(filter);
            let sql = format!("DELETE FROM {} WHERE {where_sql};", E::TABLE);
            Ok(self.conn.execute(&sql, params_from_iter(bindings))?)
        })
    }

    pub fn delete_by_id<E: Entity>(&self, id: i64) -> RepoResult<bool> {
        self.traced("delete_by_id", E::TABLE, |deleted: &bool| usize::from(*deleted), || {
            let sql = format!("DELETE FROM {} WHERE {} = ?1;", E::TABLE, E::PRIMARY_KEY);
            Ok(self.conn.execute(&sql, [id])? == 1)
        })
    }

    /// Inserts one row and returns its rowid.
    ///
    /// `values` binds positionally to `columns`; build it with `rusqlite::params!`.
    pub fn insert<E: Entity>(
        &self,
        columns: &[&'static str],
        values: &[&dyn ToSql],
    ) -> RepoResult<i64> {
        self.traced("insert", E::TABLE, |_: &i64| 1, || {
            let placeholders = vec!["?"; columns.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                E::TABLE,
                columns.join(", ")
            );
            self.conn.execute(&sql, values)?;
            Ok(self.conn.last_insert_rowid())
        })
    }

    /// Overwrites `columns` of one row; returns affected rows.
    pub fn update_by_id<E: Entity>(
        &self,
        id: i64,
        columns: &[&'static str],
        values: &[&dyn ToSql],
    ) -> RepoResult<usize> {
        if columns.is_empty() {
            return Ok(0);
        }
        self.traced("update_by_id", E::TABLE, |changed: &usize| *changed, || {
            let set_sql = columns
                .iter()
                .map(|column| format!("{column} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE {} SET {set_sql} WHERE {} = ?;",
                E::TABLE,
                E::PRIMARY_KEY
            );
            let mut params = values.to_vec();
            params.push(&id);
            Ok(self.conn.execute(&sql, params.as_slice())?)
        })
    }

    /// Runs `work` in a transaction, or in a savepoint of the caller's open one.
    ///
    /// Any error undoes everything `work` wrote; the caller's earlier writes stay.
    pub fn atomically<T>(&self, work: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("SAVEPOINT healapp_atomically;")?;
            return match work(self.conn) {
                Ok(value) => {
                    self.conn.execute_batch("RELEASE healapp_atomically;")?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = self.conn.execute_batch(
                        "ROLLBACK TO healapp_atomically; RELEASE healapp_atomically;",
                    ) {
                        warn!(
                            "event=savepoint_rollback module=store status=error error={rollback_err}"
                        );
                    }
                    Err(err)
                }
            };
        }
        let tx = self.conn.unchecked_transaction()?;
        let value = work(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn load<E: Entity>(&self, sql: &str, bindings: Vec<Value>) -> RepoResult<Vec<E>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bindings))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(E::from_row(row)?);
        }
        Ok(items)
    }

    fn count_where(&self, table: &str, where_sql: &str, bindings: Vec<Value>) -> RepoResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE {where_sql};");
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bindings), |row| row.get(0))?;
        Ok(to_count(count))
    }

    fn traced<T>(
        &self,
        op: &'static str,
        table: &'static str,
        rows: impl FnOnce(&T) -> usize,
        run: impl FnOnce() -> RepoResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        match run() {
            Ok(value) => {
                debug!(
                    "event=query module=store op={op} table={table} status=ok rows={} duration_ms={}",
                    rows(&value),
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                warn!(
                    "event=query module=store op={op} table={table} status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn select_sql<E: Entity>() -> String {
    format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
}

fn where_clause<F: Field>(filter: &Filter<F>) -> (String, Vec<Value>) {
    let mut sql = String::new();
    let mut bindings = Vec::new();
    filter.render(&mut sql, &mut bindings);
    (sql, bindings)
}

fn order_clause<E: Entity>(sort: &[Sort<E::Field>]) -> String {
    let mut sql = String::from(" ORDER BY ");
    for key in sort {
        sql.push_str(key.field.expr());
        sql.push(' ');
        sql.push_str(key.direction.as_sql());
        sql.push_str(", ");
    }
    sql.push_str(E::PRIMARY_KEY);
    sql.push_str(" ASC");
    sql
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
