/// Dense position ordering for lists within a board and cards within a list
///
/// At every transaction boundary the live, non-archived siblings under one
/// parent hold positions exactly `1..=N`. All reshuffling is computed here on
/// plain id sequences; [`persist`] then writes only the rows whose
/// `(parent, position)` changed.
///
/// Callers follow one locking recipe:
///
/// 1. lock the parent row(s) `FOR UPDATE`, in id order
/// 2. lock the siblings with `ORDER BY parent, position FOR UPDATE`
/// 3. compute the new layout with [`reorder`] or [`move_across`]
/// 4. [`persist`] the difference
///
/// Moves additionally run at `SERIALIZABLE` isolation.
///
/// # Example
///
/// ```
/// use kanban_shared::ordering::{clamp_position, reorder};
///
/// // [L1, L2, L3], move L3 to the front
/// assert_eq!(reorder(&[1, 2, 3], 3, 1), Some(vec![3, 1, 2]));
/// // out-of-range targets clamp to the end
/// assert_eq!(clamp_position(99, 3), 3);
/// ```

use sqlx::PgConnection;
use std::collections::HashMap;

/// One positioned row: its id, its parent (board or list) and position
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Slot {
    pub id: i64,
    pub parent_id: i64,
    pub position: i32,
}

/// Which table a layout belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Siblings {
    /// Lists under a board
    Lists,
    /// Cards under a list
    Cards,
}

impl Siblings {
    fn table(&self) -> &'static str {
        match self {
            Siblings::Lists => "lists",
            Siblings::Cards => "cards",
        }
    }

    fn parent_column(&self) -> &'static str {
        match self {
            Siblings::Lists => "board_id",
            Siblings::Cards => "list_id",
        }
    }
}

/// Clamps a requested 1-based position into `[1, len]`
///
/// An empty sequence clamps to 1.
pub fn clamp_position(requested: i64, len: usize) -> usize {
    let upper = len.max(1) as i64;
    requested.clamp(1, upper) as usize
}

/// Position for a newly created sibling: `max + 1`, or 1 when there are none
pub fn next_position(siblings: &[Slot]) -> i32 {
    siblings.iter().map(|s| s.position).max().unwrap_or(0) + 1
}

/// Moves `id` to `target` within one parent
///
/// Returns `None` if `id` is not among `ids`.
pub fn reorder(ids: &[i64], id: i64, target: i64) -> Option<Vec<i64>> {
    let from = ids.iter().position(|x| *x == id)?;
    let mut out = ids.to_vec();
    out.remove(from);
    let at = clamp_position(target, ids.len()) - 1;
    out.insert(at, id);
    Some(out)
}

/// Moves `id` from `source` into `dest` at `target`
///
/// The target clamps to `[1, dest.len() + 1]`. Returns `None` if `id` is not
/// in `source` or already in `dest`.
pub fn move_across(source: &[i64], dest: &[i64], id: i64, target: i64) -> Option<(Vec<i64>, Vec<i64>)> {
    if dest.contains(&id) {
        return None;
    }
    let from = source.iter().position(|x| *x == id)?;

    let mut new_source = source.to_vec();
    new_source.remove(from);

    let mut new_dest = dest.to_vec();
    let at = clamp_position(target, dest.len() + 1) - 1;
    new_dest.insert(at, id);

    Some((new_source, new_dest))
}

/// Drops `id` from a sequence (archive, delete)
pub fn without(ids: &[i64], id: i64) -> Vec<i64> {
    ids.iter().copied().filter(|x| *x != id).collect()
}

/// Numbers a sequence `1..=N` under `parent_id`
pub fn layout(parent_id: i64, ids: &[i64]) -> Vec<Slot> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| Slot {
            id: *id,
            parent_id,
            position: i as i32 + 1,
        })
        .collect()
}

/// Slots of `after` that differ from `before` (new rows included)
pub fn changed(before: &[Slot], after: &[Slot]) -> Vec<Slot> {
    let old: HashMap<i64, (i64, i32)> = before
        .iter()
        .map(|s| (s.id, (s.parent_id, s.position)))
        .collect();

    after
        .iter()
        .filter(|s| old.get(&s.id) != Some(&(s.parent_id, s.position)))
        .copied()
        .collect()
}

/// Ids of the slots under `parent_id`, in position order
pub fn ids_under(slots: &[Slot], parent_id: i64) -> Vec<i64> {
    let mut under: Vec<&Slot> = slots.iter().filter(|s| s.parent_id == parent_id).collect();
    under.sort_by_key(|s| s.position);
    under.into_iter().map(|s| s.id).collect()
}

/// Writes changed slots in two phases
///
/// Phase one parks every changed row on a distinct negative position, which
/// the partial unique index accepts. Phase two writes the final parent and
/// position. No intermediate state collides with an unchanged row.
pub async fn persist(
    conn: &mut PgConnection,
    siblings: Siblings,
    changes: &[Slot],
) -> Result<(), sqlx::Error> {
    if changes.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = changes.iter().map(|s| s.id).collect();
    let parked: Vec<i32> = (1..=changes.len() as i32).map(|k| -k).collect();
    let parents: Vec<i64> = changes.iter().map(|s| s.parent_id).collect();
    let positions: Vec<i32> = changes.iter().map(|s| s.position).collect();

    let park = format!(
        "UPDATE {table} AS t SET position = v.position \
         FROM UNNEST($1::BIGINT[], $2::INT[]) AS v(id, position) \
         WHERE t.id = v.id",
        table = siblings.table(),
    );
    sqlx::query(&park)
        .bind(ids.clone())
        .bind(parked)
        .execute(&mut *conn)
        .await?;

    let place = format!(
        "UPDATE {table} AS t SET {parent} = v.parent_id, position = v.position, updated_at = NOW() \
         FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::INT[]) AS v(id, parent_id, position) \
         WHERE t.id = v.id",
        table = siblings.table(),
        parent = siblings.parent_column(),
    );
    sqlx::query(&place)
        .bind(ids)
        .bind(parents)
        .bind(positions)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(table = siblings.table(), rows = changes.len(), "Positions persisted");
    Ok(())
}

/// Raises the current transaction to `SERIALIZABLE`; must be its first statement
pub async fn serializable(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(conn)
        .await?;
    Ok(())
}
