/// Card service handlers
///
/// Lock order is parent list rows (by id), then cards. The board row is
/// never locked here.

use super::CardState;
use crate::support::{ensure_visible, publish, unique_ids};
use kanban_shared::authz::role::Role;
use kanban_shared::contracts::card::{
    CardDetail, CardLabelRequest, CardsResponse, CreateAttachmentRequest, CreateCardRequest,
    CreateCommentRequest, DeleteAttachmentRequest, DeleteCommentRequest, GetCardsByListRequest,
    MoveCardRequest, MoveCardResponse, UpdateCardRequest,
};
use kanban_shared::contracts::common::{Empty, IdRequest};
use kanban_shared::error::{FieldViolation, Status, StatusResult};
use kanban_shared::events::routing;
use kanban_shared::models::attachment::{Attachment, CreateAttachment, MAX_ATTACHMENTS_PER_CARD};
use kanban_shared::models::card::{Card, CardDetails, ParentList};
use kanban_shared::models::comment::Comment;
use kanban_shared::models::label::Label;
use kanban_shared::models::list::List;
use kanban_shared::ordering::{self, Siblings};
use kanban_shared::rpc::RequestContext;
use sqlx::{PgConnection, PgPool};

fn card_not_found() -> Status {
    Status::not_found("card not found")
}

fn list_not_found() -> Status {
    Status::not_found("list not found")
}

/// Every wanted list must be locked, on the caller's board and not archived
fn check_targets(locked: &[ParentList], wanted: &[i64], board_id: i64) -> StatusResult<()> {
    for id in wanted {
        let list = locked
            .iter()
            .find(|list| list.id == *id && list.board_id == board_id)
            .ok_or_else(list_not_found)?;
        if list.archived {
            return Err(Status::precondition_failed("cards cannot be placed in an archived list"));
        }
    }
    Ok(())
}

fn check_dates(details: &CardDetails) -> StatusResult<()> {
    let violations = details.date_violations();
    if violations.is_empty() {
        return Ok(());
    }
    Err(Status::validation(
        violations
            .into_iter()
            .map(|(field, message)| FieldViolation::new(field, "invalid", message))
            .collect(),
    ))
}

/// Applies a partial update on top of the stored card
fn merge(card: &Card, req: &UpdateCardRequest) -> CardDetails {
    let start_date = if req.clear_start_date { None } else { req.start_date.or(card.start_date) };
    let due_date = if req.clear_due_date { None } else { req.due_date.or(card.due_date) };

    CardDetails {
        name: req.name.clone().unwrap_or_else(|| card.name.clone()),
        description: req.description.clone().unwrap_or_else(|| card.description.clone()),
        completed: req.completed.unwrap_or(card.completed),
        start_date,
        due_date,
    }
}

/// Locks the card's list, then the card itself
///
/// Deleted cards are returned as-is; the second element is false when the
/// parent list is gone.
async fn lock_card(
    conn: &mut PgConnection,
    pool: &PgPool,
    board_id: i64,
    card_id: i64,
) -> StatusResult<(Card, bool)> {
    let (list_id, _) = Card::placement(pool, card_id)
        .await?
        .filter(|(_, board)| *board == board_id)
        .ok_or_else(card_not_found)?;

    let list_live = !Card::lock_lists(&mut *conn, &[list_id]).await?.is_empty();
    let card = Card::find_any(&mut *conn, card_id)
        .await?
        .ok_or_else(card_not_found)?;

    if card.list_id != list_id {
        return Err(Status::unavailable("card moved concurrently, retry"));
    }
    Ok((card, list_live))
}

/// Live card on the caller's board, without locks
async fn live_card(pool: &PgPool, board_id: i64, card_id: i64) -> StatusResult<Card> {
    Card::find_by_id(pool, card_id)
        .await?
        .filter(|card| card.board_id == board_id)
        .ok_or_else(card_not_found)
}

pub async fn create_card(state: CardState, ctx: RequestContext, req: CreateCardRequest) -> StatusResult<Card> {
    let board_id = ctx.board()?;
    let details = CardDetails {
        name: req.name,
        description: req.description.unwrap_or_default(),
        completed: req.completed,
        start_date: req.start_date,
        due_date: req.due_date,
    };
    check_dates(&details)?;

    let mut tx = state.pool.begin().await?;
    let locked = Card::lock_lists(&mut *tx, &[req.list_id]).await?;
    check_targets(&locked, &[req.list_id], board_id)?;

    let siblings = Card::lock_siblings(&mut *tx, &[req.list_id]).await?;
    let position = ordering::next_position(&siblings);
    let card = Card::insert(&mut *tx, req.list_id, board_id, position, &details).await?;
    tx.commit().await?;

    tracing::info!(card_id = card.id, list_id = card.list_id, board_id, position, "Card created");
    Ok(card)
}

pub async fn get_card_by_id(state: CardState, ctx: RequestContext, req: IdRequest) -> StatusResult<CardDetail> {
    let card = Card::find_by_id(&state.pool, req.id)
        .await?
        .ok_or_else(card_not_found)?;
    ensure_visible(state.oracle.as_ref(), &ctx, card.board_id).await?;

    let labels = Label::list_for_card(&state.pool, card.id).await?;
    let attachments = Attachment::list_for_card(&state.pool, card.id).await?;
    let comments = Comment::list_for_card(&state.pool, card.id).await?;

    Ok(CardDetail {
        card,
        labels,
        attachments,
        comments,
    })
}

pub async fn get_cards_by_list(
    state: CardState,
    ctx: RequestContext,
    req: GetCardsByListRequest,
) -> StatusResult<CardsResponse> {
    let list = List::find_by_id(&state.pool, req.list_id)
        .await?
        .ok_or_else(list_not_found)?;
    ensure_visible(state.oracle.as_ref(), &ctx, list.board_id).await?;

    let cards = Card::list_by_list(&state.pool, list.id, req.include_archived).await?;
    Ok(CardsResponse { cards })
}

pub async fn update_card(state: CardState, ctx: RequestContext, req: UpdateCardRequest) -> StatusResult<Card> {
    let board_id = ctx.board()?;

    let mut tx = state.pool.begin().await?;
    let card = Card::find_any(&mut *tx, req.id)
        .await?
        .filter(|card| card.deleted_at.is_none() && card.board_id == board_id)
        .ok_or_else(card_not_found)?;

    let details = merge(&card, &req);
    check_dates(&details)?;

    let card = Card::write_details(&mut *tx, card.id, &details).await?;
    tx.commit().await?;

    tracing::info!(card_id = card.id, board_id, "Card updated");
    Ok(card)
}

/// Target layouts for a move: in place, or across two lists
fn move_layout(
    siblings: &[ordering::Slot],
    card_id: i64,
    source: i64,
    dest: i64,
    target: i64,
) -> Option<Vec<ordering::Slot>> {
    let from = ordering::ids_under(siblings, source);
    if source == dest {
        let order = ordering::reorder(&from, card_id, target)?;
        return Some(ordering::layout(source, &order));
    }

    let into = ordering::ids_under(siblings, dest);
    let (from, into) = ordering::move_across(&from, &into, card_id, target)?;
    let mut after = ordering::layout(source, &from);
    after.extend(ordering::layout(dest, &into));
    Some(after)
}

/// Moves a card within its list or into another list of the same board
///
/// Runs serializable. Returns the active cards of every list touched.
pub async fn move_card(state: CardState, ctx: RequestContext, req: MoveCardRequest) -> StatusResult<MoveCardResponse> {
    let board_id = ctx.board()?;
    let (source, _) = Card::placement(&state.pool, req.id)
        .await?
        .filter(|(_, board)| *board == board_id)
        .ok_or_else(card_not_found)?;
    let dest = req.list_id.unwrap_or(source);
    let touched = unique_ids(&[source, dest]);

    let mut tx = state.pool.begin().await?;
    ordering::serializable(&mut *tx).await?;

    let locked = Card::lock_lists(&mut *tx, &touched).await?;
    check_targets(&locked, &touched, board_id)?;

    let card = Card::find_any(&mut *tx, req.id)
        .await?
        .filter(|card| card.deleted_at.is_none())
        .ok_or_else(card_not_found)?;
    if card.list_id != source {
        return Err(Status::unavailable("card moved concurrently, retry"));
    }
    if card.archived {
        return Err(Status::precondition_failed("archived cards cannot be moved"));
    }

    let siblings = Card::lock_siblings(&mut *tx, &touched).await?;
    let after = move_layout(&siblings, card.id, source, dest, req.new_position).ok_or_else(card_not_found)?;
    let changes = ordering::changed(&siblings, &after);
    ordering::persist(&mut *tx, Siblings::Cards, &changes).await?;
    tx.commit().await?;

    tracing::info!(
        card_id = card.id,
        from = source,
        to = dest,
        position = req.new_position,
        moved = changes.len(),
        "Card moved"
    );

    let mut cards = Vec::new();
    for list_id in touched {
        cards.extend(Card::list_by_list(&state.pool, list_id, false).await?);
    }
    Ok(MoveCardResponse { cards })
}

/// Archives the card and closes the gap in its list
pub async fn archive_card(state: CardState, ctx: RequestContext, req: IdRequest) -> StatusResult<Card> {
    let board_id = ctx.board()?;

    let mut tx = state.pool.begin().await?;
    let (card, list_live) = lock_card(&mut *tx, &state.pool, board_id, req.id).await?;
    if card.deleted_at.is_some() || !list_live {
        return Err(card_not_found());
    }
    if card.archived {
        return Ok(card);
    }

    let siblings = Card::lock_siblings(&mut *tx, &[card.list_id]).await?;
    let archived = Card::set_archived(&mut *tx, card.id, true, card.position).await?;

    let remaining = ordering::without(&ordering::ids_under(&siblings, card.list_id), card.id);
    let changes = ordering::changed(&siblings, &ordering::layout(card.list_id, &remaining));
    ordering::persist(&mut *tx, Siblings::Cards, &changes).await?;
    tx.commit().await?;

    tracing::info!(card_id = card.id, list_id = card.list_id, "Card archived");
    Ok(archived)
}

/// Restores an archived card at the end of its list
pub async fn restore_card(state: CardState, ctx: RequestContext, req: IdRequest) -> StatusResult<Card> {
    let board_id = ctx.board()?;

    let mut tx = state.pool.begin().await?;
    let (card, list_live) = lock_card(&mut *tx, &state.pool, board_id, req.id).await?;
    if card.deleted_at.is_some() || !list_live {
        return Err(card_not_found());
    }
    if !card.archived {
        return Ok(card);
    }

    let siblings = Card::lock_siblings(&mut *tx, &[card.list_id]).await?;
    let position = ordering::next_position(&siblings);
    let restored = Card::set_archived(&mut *tx, card.id, false, position).await?;
    tx.commit().await?;

    tracing::info!(card_id = card.id, list_id = card.list_id, position, "Card restored");
    Ok(restored)
}

/// Soft-deletes the card and announces `card.delete`
///
/// A card that is already deleted only republishes the event.
pub async fn delete_card(state: CardState, ctx: RequestContext, req: IdRequest) -> StatusResult<Empty> {
    let board_id = ctx.board()?;

    let mut tx = state.pool.begin().await?;
    let (card, _) = lock_card(&mut *tx, &state.pool, board_id, req.id).await?;

    if card.deleted_at.is_none() {
        let siblings = Card::lock_siblings(&mut *tx, &[card.list_id]).await?;
        Card::soft_delete(&mut *tx, card.id).await?;

        if !card.archived {
            let remaining = ordering::without(&ordering::ids_under(&siblings, card.list_id), card.id);
            let changes = ordering::changed(&siblings, &ordering::layout(card.list_id, &remaining));
            ordering::persist(&mut *tx, Siblings::Cards, &changes).await?;
        }
    }
    tx.commit().await?;

    tracing::info!(card_id = card.id, list_id = card.list_id, "Card deleted");
    publish(&ctx, state.publisher.as_ref(), routing::CARD_DELETE, &req).await?;
    Ok(Empty::default())
}

/// Label on the card's board; labels of other boards read as missing
async fn board_label(pool: &PgPool, card: &Card, label_id: i64) -> StatusResult<Label> {
    Label::find_by_id(pool, label_id)
        .await?
        .filter(|label| label.board_id == card.board_id)
        .ok_or_else(|| Status::not_found("label not found"))
}

pub async fn add_card_label(state: CardState, ctx: RequestContext, req: CardLabelRequest) -> StatusResult<Empty> {
    let card = live_card(&state.pool, ctx.board()?, req.id).await?;
    let label = board_label(&state.pool, &card, req.label_id).await?;

    Label::attach(&state.pool, card.id, label.id).await?;
    tracing::debug!(card_id = card.id, label_id = label.id, "Label attached");
    Ok(Empty::default())
}

pub async fn remove_card_label(state: CardState, ctx: RequestContext, req: CardLabelRequest) -> StatusResult<Empty> {
    let card = live_card(&state.pool, ctx.board()?, req.id).await?;

    if !Label::detach(&state.pool, card.id, req.label_id).await? {
        return Err(Status::not_found("label is not attached to this card"));
    }
    tracing::debug!(card_id = card.id, label_id = req.label_id, "Label detached");
    Ok(Empty::default())
}

pub async fn create_comment(state: CardState, ctx: RequestContext, req: CreateCommentRequest) -> StatusResult<Comment> {
    let author_id = ctx.caller()?;
    let card = live_card(&state.pool, ctx.board()?, req.id).await?;

    let comment = Comment::create(&state.pool, card.id, author_id, &req.content).await?;
    tracing::info!(card_id = card.id, comment_id = comment.id, author_id, "Comment created");
    Ok(comment)
}

/// Authors may delete their own comments; admins and the owner any comment
fn may_delete_comment(caller: i64, role: Role, comment: &Comment) -> bool {
    comment.author_id == caller || role.has_permission(Role::Admin)
}

pub async fn delete_comment(state: CardState, ctx: RequestContext, req: DeleteCommentRequest) -> StatusResult<Empty> {
    let caller = ctx.caller()?;
    let role = ctx.role()?;
    let card = live_card(&state.pool, ctx.board()?, req.id).await?;

    let comment = Comment::find_by_id(&state.pool, req.comment_id)
        .await?
        .filter(|comment| comment.card_id == card.id)
        .ok_or_else(|| Status::not_found("comment not found"))?;

    if !may_delete_comment(caller, role, &comment) {
        return Err(Status::forbidden("only the author or an admin can delete a comment"));
    }

    Comment::delete(&state.pool, comment.id).await?;
    tracing::info!(card_id = card.id, comment_id = comment.id, "Comment deleted");
    Ok(Empty::default())
}

/// Records attachment metadata; the per-card cap is checked under the card lock
pub async fn create_attachment(
    state: CardState,
    ctx: RequestContext,
    req: CreateAttachmentRequest,
) -> StatusResult<Attachment> {
    let uploaded_by = ctx.caller()?;
    let board_id = ctx.board()?;

    let mut tx = state.pool.begin().await?;
    let card = Card::find_any(&mut *tx, req.id)
        .await?
        .filter(|card| card.deleted_at.is_none() && card.board_id == board_id)
        .ok_or_else(card_not_found)?;

    if Attachment::count_for_card(&mut *tx, card.id).await? >= MAX_ATTACHMENTS_PER_CARD {
        return Err(Status::precondition_failed(format!(
            "a card holds at most {} attachments",
            MAX_ATTACHMENTS_PER_CARD
        )));
    }

    let attachment = Attachment::create(
        &mut *tx,
        CreateAttachment {
            card_id: card.id,
            board_id: card.board_id,
            file_name: req.file_name,
            content_type: req.content_type,
            size_bytes: req.size_bytes,
            storage_key: req.storage_key,
            uploaded_by,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(card_id = card.id, attachment_id = attachment.id, "Attachment created");
    Ok(attachment)
}

pub async fn delete_attachment(
    state: CardState,
    ctx: RequestContext,
    req: DeleteAttachmentRequest,
) -> StatusResult<Empty> {
    let card = live_card(&state.pool, ctx.board()?, req.id).await?;

    if !Attachment::delete(&state.pool, card.id, req.attachment_id).await? {
        return Err(Status::not_found("attachment not found"));
    }
    tracing::info!(card_id = card.id, attachment_id = req.attachment_id, "Attachment deleted");
    Ok(Empty::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use kanban_shared::error::Code;
    use kanban_shared::ordering::Slot;

    fn parent(id: i64, board_id: i64, archived: bool) -> ParentList {
        ParentList { id, board_id, archived }
    }

    #[test]
    fn test_cards_stay_out_of_archived_lists() {
        let locked = [parent(1, 10, false), parent(2, 10, true)];
        assert!(check_targets(&locked, &[1], 10).is_ok());

        let err = check_targets(&locked, &[1, 2], 10).unwrap_err();
        assert_eq!(err.code, Code::PreconditionFailed);
    }

    #[test]
    fn test_missing_or_foreign_lists_are_not_found() {
        let locked = [parent(1, 10, false), parent(3, 11, false)];
        assert_eq!(check_targets(&locked, &[1, 2], 10).unwrap_err().code, Code::NotFound);
        assert_eq!(check_targets(&locked, &[3], 10).unwrap_err().code, Code::NotFound);
    }

    fn card() -> Card {
        let now = Utc::now();
        Card {
            id: 7,
            list_id: 1,
            board_id: 10,
            name: "Write docs".to_string(),
            description: "first draft".to_string(),
            position: 1,
            archived: false,
            completed: false,
            start_date: Some(now),
            due_date: Some(now + Duration::days(2)),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn slots(parent_id: i64, ids: &[i64]) -> Vec<Slot> {
        ordering::layout(parent_id, ids)
    }

    fn positions(after: &[Slot], parent_id: i64) -> Vec<(i64, i32)> {
        after
            .iter()
            .filter(|s| s.parent_id == parent_id)
            .map(|s| (s.id, s.position))
            .collect()
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let card = card();
        let req = UpdateCardRequest {
            id: 7,
            name: Some("Ship docs".to_string()),
            ..Default::default()
        };

        let merged = merge(&card, &req);
        assert_eq!(merged.name, "Ship docs");
        assert_eq!(merged.description, "first draft");
        assert_eq!(merged.start_date, card.start_date);
        assert_eq!(merged.due_date, card.due_date);
    }

    #[test]
    fn test_merge_clears_dates_on_request() {
        let req = UpdateCardRequest {
            id: 7,
            clear_start_date: true,
            clear_due_date: true,
            ..Default::default()
        };

        let merged = merge(&card(), &req);
        assert!(merged.start_date.is_none());
        assert!(merged.due_date.is_none());
    }

    #[test]
    fn test_completing_without_due_date_is_rejected() {
        let req = UpdateCardRequest {
            id: 7,
            completed: Some(true),
            clear_due_date: true,
            ..Default::default()
        };

        let err = check_dates(&merge(&card(), &req)).unwrap_err();
        assert_eq!(err.code, Code::ValidationFailed);
        assert_eq!(err.details[0].field, "dueDate");
    }

    #[test]
    fn test_start_after_due_is_rejected() {
        let card = card();
        let req = UpdateCardRequest {
            id: 7,
            start_date: card.due_date.map(|due| due + Duration::hours(1)),
            ..Default::default()
        };

        let err = check_dates(&merge(&card, &req)).unwrap_err();
        assert_eq!(err.details[0].field, "startDate");
    }

    #[test]
    fn test_move_across_lists() {
        // A: [c1, c2, c3], B: [d1, d2]; c2 to B at 2
        let mut siblings = slots(1, &[11, 12, 13]);
        siblings.extend(slots(2, &[21, 22]));

        let after = move_layout(&siblings, 12, 1, 2, 2).unwrap();
        assert_eq!(positions(&after, 1), vec![(11, 1), (13, 2)]);
        assert_eq!(positions(&after, 2), vec![(21, 1), (12, 2), (22, 3)]);

        let changes = ordering::changed(&siblings, &after);
        let ids: Vec<i64> = changes.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![13, 12, 22]);
    }

    #[test]
    fn test_move_within_list_clamps() {
        let siblings = slots(1, &[11, 12, 13]);
        let after = move_layout(&siblings, 11, 1, 1, 99).unwrap();
        assert_eq!(positions(&after, 1), vec![(12, 1), (13, 2), (11, 3)]);
    }

    #[test]
    fn test_move_of_unknown_card() {
        let siblings = slots(1, &[11, 12]);
        assert!(move_layout(&siblings, 99, 1, 1, 1).is_none());
    }

    #[test]
    fn test_comment_deletion_rights() {
        let comment = Comment {
            id: 1,
            card_id: 7,
            author_id: 5,
            content: "looks good".to_string(),
            created_at: Utc::now(),
        };

        assert!(may_delete_comment(5, Role::Observer, &comment));
        assert!(may_delete_comment(6, Role::Admin, &comment));
        assert!(may_delete_comment(6, Role::Owner, &comment));
        assert!(!may_delete_comment(6, Role::Member, &comment));
    }
}
