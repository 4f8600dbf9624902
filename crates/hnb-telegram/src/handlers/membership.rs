use hnb_core::{
    messaging::types::MembershipChange, ports::GroupProfile, utils::AuditEvent, Result,
};

use crate::router::AppState;

/// The bot was added to or removed from a chat.
pub(super) async fn handle_membership(state: &AppState, change: MembershipChange) -> Result<()> {
    let title = change.chat.title.clone().unwrap_or_default();
    let status = if change.joined { "joined" } else { "left" };
    tracing::info!(chat_id = change.chat.id.0, title = %title, status, "membership changed");
    state
        .audit
        .record(AuditEvent::membership(change.chat.id.0, &title, status));

    if !change.joined || !change.chat.kind.is_group() {
        return Ok(());
    }
    let group = GroupProfile {
        id: change.chat.id,
        title,
        kind: change.chat.kind.as_str().to_string(),
        member_count: change.member_count,
    };
    state.persistence.upsert_group(&group).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use hnb_core::{domain::ChatId, ports::Persistence};

    use crate::handlers::test_support::*;

    #[tokio::test]
    async fn joining_a_group_records_it() {
        let h = Harness::new().await;

        h.membership(&group_chat(-300), true, Some(42)).await;
        h.membership(&private_chat(5), true, None).await;

        let groups = h.persistence.list_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, ChatId(-300));
        assert_eq!(groups[0].title, "Test Group");
        assert_eq!(groups[0].kind, "supergroup");
        assert_eq!(groups[0].member_count, Some(42));
        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn leaving_does_not_touch_the_store() {
        let h = Harness::new().await;

        h.membership(&group_chat(-301), false, None).await;

        assert!(h.persistence.list_groups().await.unwrap().is_empty());
    }
}
