//! Command and reaction handling.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::types::{
    CatalogingContext, CatalogingError, Command, CommandContext, ReactionOutcome,
};
use crate::access::AccessPolicy;
use crate::catalog::CatalogEntry;
use crate::ledger::VoteDirection;
use crate::messenger::{IncomingMessage, Messenger, ReactionEvent, UserId};
use crate::metrics;
use crate::mirror::{CardAuthor, MirrorPublisher, VoteReaction};
use crate::store::Store;
use crate::wizard::Wizard;

const ENTRY_TOKEN_PROMPT: &str = "What entry do you want to edit? Enter a name or an abbreviation.";
const ANNOUNCE_TOKEN_PROMPT: &str =
    "What entry is the update for? Enter a name or an abbreviation.";
const ANNOUNCE_URL_PROMPT: &str = "What is the URL to the update?";
const ANNOUNCE_TITLE_PROMPT: &str = "What is the title of the update?";

/// Sequences the wizard, the store and the mirror for each command and reaction.
pub struct Cataloger {
    store: Arc<dyn Store>,
    messenger: Arc<dyn Messenger>,
    wizard: Wizard,
    policy: Arc<dyn AccessPolicy>,
    publisher: MirrorPublisher,
    context: CatalogingContext,
}

impl Cataloger {
    pub fn new(
        store: Arc<dyn Store>,
        messenger: Arc<dyn Messenger>,
        wizard: Wizard,
        policy: Arc<dyn AccessPolicy>,
        context: CatalogingContext,
        author: CardAuthor,
    ) -> Self {
        let publisher =
            MirrorPublisher::new(store.clone(), messenger.clone(), context.channels, author);
        Self {
            store,
            messenger,
            wizard,
            policy,
            publisher,
            context,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn publisher(&self) -> &MirrorPublisher {
        &self.publisher
    }

    /// Offer a chat message to any wizard session waiting on its author.
    ///
    /// Returns whether a session consumed it.
    pub fn handle_message(&self, message: &IncomingMessage) -> bool {
        self.wizard.hub().deliver(message)
    }

    /// Number of wizard steps currently waiting for a reply.
    pub fn waiting_replies(&self) -> usize {
        self.wizard.hub().waiting()
    }

    /// Run a command and send its reply (or its error sentence) to the invoking channel.
    pub async fn run(&self, ctx: &CommandContext, command: Command) -> Result<(), CatalogingError> {
        let name = command.name();
        let started = Instant::now();
        let result = self.execute(ctx, command).await;
        metrics::COMMAND_DURATION
            .with_label_values(&[name])
            .observe(started.elapsed().as_secs_f64());

        let (outcome, reply) = match &result {
            Ok(reply) => ("success", reply.clone()),
            Err(e @ CatalogingError::PermissionDenied(_)) => ("denied", e.user_message()),
            Err(e) if e.is_user_error() => {
                debug!(command = name, error = %e, "Command aborted");
                ("aborted", e.user_message())
            }
            Err(e) => {
                error!(command = name, error = %e, "Command failed");
                ("error", e.user_message())
            }
        };
        metrics::COMMANDS
            .with_label_values(&[name, outcome])
            .inc();

        self.messenger.send_text(ctx.channel_id, &reply).await?;
        result.map(|_| ())
    }

    /// Run a command and return the reply text.
    pub async fn execute(
        &self,
        ctx: &CommandContext,
        command: Command,
    ) -> Result<String, CatalogingError> {
        if command.requires_staff() && !self.policy.is_staff(&ctx.invoker) {
            info!(
                command = command.name(),
                user = %ctx.invoker.user_id,
                "Command refused"
            );
            return Err(CatalogingError::PermissionDenied(command.name()));
        }

        match command {
            Command::Search { token } => self.search(&token),
            Command::Add => self.add(ctx).await,
            Command::Edit => self.edit(ctx).await,
            Command::Delete { token } => self.delete(&token).await,
            Command::Rebuild => self.rebuild().await,
            Command::Votes { member } => self.votes(member.unwrap_or(ctx.invoker.user_id)),
            Command::CleanLeavers { membership } => self.clean_leavers(membership).await,
            Command::Announce => self.announce(ctx).await,
            Command::Top => Ok("Currently unimplemented.".to_string()),
        }
    }

    fn search(&self, token: &str) -> Result<String, CatalogingError> {
        let entry = self.store.find_by_token(token)?;
        Ok(match entry.mirror {
            Some(mirror) => format!(
                "{} can be found at {}",
                entry.name(),
                self.messenger
                    .message_link(mirror.channel_id, mirror.message_id)
            ),
            None => format!("{} has not been published yet.", entry.name()),
        })
    }

    async fn add(&self, ctx: &CommandContext) -> Result<String, CatalogingError> {
        let fields = self
            .wizard
            .collect_create(ctx.channel_id, ctx.invoker.user_id)
            .await?;
        let entry = self.store.insert(fields)?;
        info!(entry_id = %entry.id, name = %entry.name(), "Entry created");

        self.publisher.publish(&entry).await?;
        Ok("Entry added successfully!".to_string())
    }

    async fn edit(&self, ctx: &CommandContext) -> Result<String, CatalogingError> {
        let (channel, author) = (ctx.channel_id, ctx.invoker.user_id);
        let token = self.wizard.ask_text(channel, author, ENTRY_TOKEN_PROMPT).await?;
        let entry = self.store.find_by_token(&token)?;

        let value = self.wizard.collect_edit(channel, author).await?;
        // The dialogue can outlast other edits; apply the one field to the current copy.
        let mut fields = self.store.get(entry.id)?.fields;
        value.apply(&mut fields);
        let updated = self.store.update(entry.id, fields)?;
        info!(entry_id = %updated.id, name = %updated.name(), "Entry updated");

        self.publisher.resync(&updated).await?;
        Ok("Entry updated successfully.".to_string())
    }

    async fn delete(&self, token: &str) -> Result<String, CatalogingError> {
        let entry = self.store.find_by_token(token)?;
        self.publisher.retract(&entry).await;
        self.store.delete(entry.id)?;
        info!(entry_id = %entry.id, name = %entry.name(), "Entry deleted");
        Ok("Entry deleted.".to_string())
    }

    async fn rebuild(&self) -> Result<String, CatalogingError> {
        self.publisher.clear_channels().await?;

        let mut published = 0;
        for entry in self.store.list()? {
            match self.publisher.publish(&entry).await {
                Ok(_) => published += 1,
                Err(e) => warn!(entry_id = %entry.id, error = %e, "Failed to republish entry"),
            }
        }
        info!(published = published, "Rebuilt mirror channels");
        Ok(format!("Rebuilt {} entries.", published))
    }

    fn votes(&self, member: UserId) -> Result<String, CatalogingError> {
        let mut upvoted = Vec::new();
        let mut downvoted = Vec::new();
        for record in self.store.list_by_member(member)? {
            let entry = match self.store.get(record.entry_id) {
                Ok(entry) => entry,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };
            match record.direction {
                VoteDirection::Up => upvoted.push(entry.fields.name),
                VoteDirection::Down => downvoted.push(entry.fields.name),
            }
        }
        Ok(format!(
            "```Upvoted```\n{}\n```Downvoted```\n{}",
            upvoted.join("\n"),
            downvoted.join("\n")
        ))
    }

    async fn clean_leavers(&self, membership: Vec<UserId>) -> Result<String, CatalogingError> {
        let membership: HashSet<UserId> = membership.into_iter().collect();
        let removed = self.store.prune_missing_members(&membership)?;
        metrics::LEAVER_RATINGS_PRUNED.inc_by(removed as u64);
        info!(removed = removed, members = membership.len(), "Pruned leaver ratings");

        if removed > 0 {
            self.refresh_published().await?;
        }
        Ok(format!("{} leavers removed from the votes!", removed))
    }

    /// Refresh the tally of every published entry. Individual failures are logged.
    async fn refresh_published(&self) -> Result<(), CatalogingError> {
        for entry in self.store.list()?.iter().filter(|e| e.mirror.is_some()) {
            if let Err(e) = self.publisher.refresh_tally(entry).await {
                warn!(entry_id = %entry.id, error = %e, "Failed to refresh tally");
            }
        }
        Ok(())
    }

    async fn announce(&self, ctx: &CommandContext) -> Result<String, CatalogingError> {
        let announcements = self
            .context
            .announcements
            .ok_or(CatalogingError::AnnouncementsNotConfigured)?;
        let (channel, author) = (ctx.channel_id, ctx.invoker.user_id);

        let token = self
            .wizard
            .ask_text(channel, author, ANNOUNCE_TOKEN_PROMPT)
            .await?;
        let entry = self.store.find_by_token(&token)?;
        let url = self.wizard.ask_text(channel, author, ANNOUNCE_URL_PROMPT).await?;
        let title = self
            .wizard
            .ask_text(channel, author, ANNOUNCE_TITLE_PROMPT)
            .await?;

        self.publisher
            .announce(
                &entry,
                announcements,
                &title,
                &url,
                self.context.announcement_role,
            )
            .await?;
        Ok("Announcement posted.".to_string())
    }

    /// Apply a reaction on a mirror card to the ledger and refresh the card's tally.
    pub async fn handle_reaction(
        &self,
        event: &ReactionEvent,
    ) -> Result<ReactionOutcome, CatalogingError> {
        if self.context.bot_user_id == Some(event.user_id)
            || !self.context.channels.contains(event.channel_id)
        {
            return Ok(ReactionOutcome::Ignored);
        }

        self.remove_reaction(event).await;

        let Some(reaction) = VoteReaction::from_emoji(&event.emoji) else {
            debug!(emoji = %event.emoji, "Ignoring foreign reaction");
            return Ok(ReactionOutcome::Ignored);
        };

        let entry = match self.store.find_by_mirror_message(event.message_id) {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => {
                debug!(message = %event.message_id, "Reaction on a message that is not a card");
                return Ok(ReactionOutcome::Ignored);
            }
            Err(e) => return Err(e.into()),
        };

        self.apply_vote(&entry, event.user_id, reaction)?;
        self.publisher.refresh_tally(&entry).await?;
        Ok(ReactionOutcome::Recorded {
            entry_id: entry.id,
            reaction,
        })
    }

    fn apply_vote(
        &self,
        entry: &CatalogEntry,
        member: UserId,
        reaction: VoteReaction,
    ) -> Result<(), CatalogingError> {
        match reaction.direction() {
            Some(direction) => self.store.upsert(member, entry.id, direction)?,
            None => {
                self.store.remove(member, entry.id)?;
            }
        }
        metrics::VOTES
            .with_label_values(&[reaction.action()])
            .inc();
        debug!(entry_id = %entry.id, member = %member, action = reaction.action(), "Vote recorded");
        Ok(())
    }

    /// Take the member's reaction off the card so votes stay private.
    async fn remove_reaction(&self, event: &ReactionEvent) {
        if let Err(e) = self
            .messenger
            .remove_reaction(
                event.channel_id,
                event.message_id,
                &event.emoji,
                event.user_id,
            )
            .await
        {
            warn!(message = %event.message_id, error = %e, "Failed to remove reaction");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::CatalogStore;
    use crate::access::{Invoker, OpenPolicy, StaffRolePolicy};
    use crate::ledger::{RatingLedger, Tally};
    use crate::messenger::{
        ChannelId, Embed, MessageId, MessengerError, OutgoingMessage, PostedMessage, RoleId,
    };
    use crate::mirror::{MirrorChannels, RATINGS_FIELD};
    use crate::store::JsonStore;
    use crate::testing::{deliver_reply, fixtures, MockMessenger};
    use crate::wizard::{ReplyHub, WizardError};

    const LISTED: ChannelId = ChannelId(100);
    const UNDETERMINED: ChannelId = ChannelId(200);
    const ANNOUNCEMENTS: ChannelId = ChannelId(300);
    const COMMANDS: ChannelId = ChannelId(5);
    const BOT: UserId = UserId(1);
    const MOD: UserId = UserId(2);
    const STAFF: RoleId = RoleId(77);

    struct Harness {
        store: Arc<JsonStore>,
        messenger: Arc<MockMessenger>,
        cataloger: Arc<Cataloger>,
    }

    fn cataloger_on(
        store: Arc<JsonStore>,
        messenger: Arc<dyn Messenger>,
        policy: Arc<dyn AccessPolicy>,
        timeout: Duration,
    ) -> Cataloger {
        let wizard = Wizard::new(ReplyHub::new(), messenger.clone(), timeout);
        let context = CatalogingContext {
            channels: MirrorChannels {
                listed: LISTED,
                undetermined: UNDETERMINED,
            },
            announcements: Some(ANNOUNCEMENTS),
            announcement_role: Some(RoleId(55)),
            bot_user_id: Some(BOT),
        };
        Cataloger::new(
            store,
            messenger,
            wizard,
            policy,
            context,
            CardAuthor {
                name: "Curator".to_string(),
                icon_url: None,
            },
        )
    }

    fn harness_with(policy: Arc<dyn AccessPolicy>, timeout: Duration) -> Harness {
        let store = Arc::new(JsonStore::in_memory());
        let messenger = Arc::new(MockMessenger::new());
        let cataloger = cataloger_on(store.clone(), messenger.clone(), policy, timeout);
        Harness {
            store,
            messenger,
            cataloger: Arc::new(cataloger),
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(OpenPolicy), Duration::from_secs(5))
    }

    fn moderator() -> CommandContext {
        CommandContext {
            channel_id: COMMANDS,
            invoker: Invoker {
                user_id: MOD,
                role_ids: vec![STAFF],
            },
        }
    }

    fn reply(content: &str) -> IncomingMessage {
        fixtures::message(COMMANDS, MOD, content)
    }

    fn reaction(message: MessageId, user: u64, emoji: &str) -> ReactionEvent {
        ReactionEvent {
            channel_id: LISTED,
            message_id: message,
            user_id: UserId(user),
            emoji: emoji.to_string(),
        }
    }

    async fn published(h: &Harness) -> CatalogEntry {
        let entry = h.store.insert(fixtures::bonk_quest()).unwrap();
        h.cataloger.publisher().publish(&entry).await.unwrap()
    }

    fn card_message(entry: &CatalogEntry) -> MessageId {
        entry.mirror.unwrap().message_id
    }

    #[tokio::test]
    async fn test_add_collects_fields_then_publishes() {
        let h = harness();
        let cataloger = h.cataloger.clone();
        let task = tokio::spawn(async move { cataloger.execute(&moderator(), Command::Add).await });

        let hub = h.cataloger.wizard.hub().clone();
        for text in ["Bonk Quest", "BQ bonk", "A, B", "http://x"] {
            deliver_reply(&hub, &reply(text)).await;
        }
        deliver_reply(
            &hub,
            &fixtures::image_message(COMMANDS, MOD, "http://img/bonk.png"),
        )
        .await;
        deliver_reply(&hub, &reply("no")).await;
        deliver_reply(&hub, &reply("no")).await;

        assert_eq!(task.await.unwrap().unwrap(), "Entry added successfully!");
        let entry = h.store.find_by_token("bq").unwrap();
        assert_eq!(entry.fields.abbreviations, ["bq", "bonk"]);
        assert_eq!(entry.mirror.unwrap().channel_id, LISTED);
        assert_eq!(h.messenger.messages_in(LISTED).await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_timeout_leaves_store_untouched() {
        let h = harness_with(Arc::new(OpenPolicy), Duration::from_millis(20));
        let cataloger = h.cataloger.clone();
        let task = tokio::spawn(async move { cataloger.execute(&moderator(), Command::Add).await });

        deliver_reply(h.cataloger.wizard.hub(), &reply("Bonk Quest")).await;

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, CatalogingError::Wizard(WizardError::Timeout)));
        assert_eq!(err.user_message(), "You took long. Aborting.");
        assert_eq!(h.store.entry_count().unwrap(), 0);
        assert!(h.messenger.messages_in(LISTED).await.is_empty());
    }

    #[tokio::test]
    async fn test_edit_moves_card_when_classification_changes() {
        let h = harness();
        let entry = published(&h).await;
        let old_card = card_message(&entry);

        let cataloger = h.cataloger.clone();
        let task =
            tokio::spawn(async move { cataloger.execute(&moderator(), Command::Edit).await });
        let hub = h.cataloger.wizard.hub().clone();
        deliver_reply(&hub, &reply("bq")).await;
        deliver_reply(&hub, &reply("7")).await;
        deliver_reply(&hub, &reply("yes")).await;

        assert_eq!(task.await.unwrap().unwrap(), "Entry updated successfully.");
        let moved = h.store.get(entry.id).unwrap();
        assert!(moved.fields.undetermined);
        assert_eq!(moved.mirror.unwrap().channel_id, UNDETERMINED);
        assert!(h.messenger.message(old_card).await.is_none());
    }

    #[tokio::test]
    async fn test_edit_keeps_changes_made_during_the_dialogue() {
        let h = harness();
        let entry = published(&h).await;

        let cataloger = h.cataloger.clone();
        let task =
            tokio::spawn(async move { cataloger.execute(&moderator(), Command::Edit).await });
        let hub = h.cataloger.wizard.hub().clone();
        deliver_reply(&hub, &reply("bq")).await;
        deliver_reply(&hub, &reply("7")).await;

        let mut concurrent = h.store.get(entry.id).unwrap().fields;
        concurrent.authors = vec!["C".to_string()];
        h.store.update(entry.id, concurrent).unwrap();
        deliver_reply(&hub, &reply("yes")).await;

        assert_eq!(task.await.unwrap().unwrap(), "Entry updated successfully.");
        let edited = h.store.get(entry.id).unwrap();
        assert!(edited.fields.undetermined);
        assert_eq!(edited.fields.authors, ["C"]);
    }

    #[tokio::test]
    async fn test_edit_unknown_token_is_not_found() {
        let h = harness();
        let cataloger = h.cataloger.clone();
        let task =
            tokio::spawn(async move { cataloger.execute(&moderator(), Command::Edit).await });
        deliver_reply(h.cataloger.wizard.hub(), &reply("nope")).await;

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.user_message(), "Entry not found.");
    }

    #[tokio::test]
    async fn test_search_replies() {
        let h = harness();
        let entry = h.store.insert(fixtures::bonk_quest()).unwrap();
        let search = || Command::Search {
            token: "BQ".to_string(),
        };

        let reply = h.cataloger.execute(&moderator(), search()).await.unwrap();
        assert_eq!(reply, "Bonk Quest has not been published yet.");

        let entry = h.cataloger.publisher().publish(&entry).await.unwrap();
        let reply = h.cataloger.execute(&moderator(), search()).await.unwrap();
        assert_eq!(
            reply,
            format!(
                "Bonk Quest can be found at https://discord.test/channels/{}/{}",
                LISTED,
                card_message(&entry)
            )
        );

        let err = h
            .cataloger
            .execute(
                &moderator(),
                Command::Search {
                    token: "zzz".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Entry not found.");
    }

    #[tokio::test]
    async fn test_delete_survives_vanished_card() {
        let h = harness();
        let entry = published(&h).await;
        h.store.upsert(UserId(9), entry.id, VoteDirection::Up).unwrap();
        h.messenger.vanish(card_message(&entry)).await;

        let reply = h
            .cataloger
            .execute(
                &moderator(),
                Command::Delete {
                    token: "bonk quest".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(reply, "Entry deleted.");
        assert!(h.store.get(entry.id).unwrap_err().is_not_found());
        assert_eq!(h.store.rating_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_staff_commands_are_refused_without_role() {
        let h = harness_with(
            Arc::new(StaffRolePolicy::new(STAFF)),
            Duration::from_secs(5),
        );
        h.store.insert(fixtures::bonk_quest()).unwrap();
        let member = CommandContext {
            channel_id: COMMANDS,
            invoker: Invoker {
                user_id: UserId(3),
                role_ids: Vec::new(),
            },
        };

        h.cataloger.run(&member, Command::Rebuild).await.unwrap_err();
        assert_eq!(
            h.messenger.last_text(COMMANDS).await.unwrap(),
            "You don't have permission to use this command."
        );

        h.cataloger
            .run(
                &member,
                Command::Search {
                    token: "bq".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            h.messenger.last_text(COMMANDS).await.unwrap(),
            "Bonk Quest has not been published yet."
        );
    }

    #[tokio::test]
    async fn test_upvote_reaction_updates_tally_and_card() {
        let h = harness();
        let entry = published(&h).await;
        let message = card_message(&entry);

        let outcome = h
            .cataloger
            .handle_reaction(&reaction(message, 9, "👍"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReactionOutcome::Recorded {
                entry_id: entry.id,
                reaction: VoteReaction::Up
            }
        );
        assert_eq!(h.store.tally(entry.id).unwrap(), Tally { up: 1, down: 0 });
        let card = h.messenger.message(message).await.unwrap().embed.unwrap();
        assert_eq!(card.field_value(RATINGS_FIELD), Some("👍 1 👎 0"));

        let removed = h.messenger.removed_reactions().await;
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].user_id, UserId(9));
    }

    /// Delegates to the mock but holds the first card fetch back.
    struct SlowFirstFetch {
        inner: Arc<MockMessenger>,
        delayed: AtomicBool,
    }

    #[async_trait]
    impl Messenger for SlowFirstFetch {
        fn name(&self) -> &str {
            "slow-first-fetch"
        }

        async fn send_message(
            &self,
            channel: ChannelId,
            message: OutgoingMessage,
        ) -> Result<MessageId, MessengerError> {
            self.inner.send_message(channel, message).await
        }

        async fn fetch_message(
            &self,
            channel: ChannelId,
            message: MessageId,
        ) -> Result<PostedMessage, MessengerError> {
            if !self.delayed.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            self.inner.fetch_message(channel, message).await
        }

        async fn edit_embed(
            &self,
            channel: ChannelId,
            message: MessageId,
            embed: Embed,
        ) -> Result<(), MessengerError> {
            self.inner.edit_embed(channel, message, embed).await
        }

        async fn delete_message(
            &self,
            channel: ChannelId,
            message: MessageId,
        ) -> Result<(), MessengerError> {
            self.inner.delete_message(channel, message).await
        }

        async fn add_reaction(
            &self,
            channel: ChannelId,
            message: MessageId,
            emoji: &str,
        ) -> Result<(), MessengerError> {
            self.inner.add_reaction(channel, message, emoji).await
        }

        async fn remove_reaction(
            &self,
            channel: ChannelId,
            message: MessageId,
            emoji: &str,
            user: UserId,
        ) -> Result<(), MessengerError> {
            self.inner
                .remove_reaction(channel, message, emoji, user)
                .await
        }

        async fn clear_channel(&self, channel: ChannelId) -> Result<usize, MessengerError> {
            self.inner.clear_channel(channel).await
        }

        async fn crosspost(
            &self,
            channel: ChannelId,
            message: MessageId,
        ) -> Result<(), MessengerError> {
            self.inner.crosspost(channel, message).await
        }

        fn message_link(&self, channel: ChannelId, message: MessageId) -> String {
            self.inner.message_link(channel, message)
        }
    }

    #[tokio::test]
    async fn test_concurrent_votes_leave_latest_tally_on_card() {
        let store = Arc::new(JsonStore::in_memory());
        let mock = Arc::new(MockMessenger::new());
        let slow = Arc::new(SlowFirstFetch {
            inner: mock.clone(),
            delayed: AtomicBool::new(false),
        });
        let cataloger = cataloger_on(
            store.clone(),
            slow,
            Arc::new(OpenPolicy),
            Duration::from_secs(5),
        );
        let entry = store.insert(fixtures::bonk_quest()).unwrap();
        let entry = cataloger.publisher().publish(&entry).await.unwrap();
        let message = card_message(&entry);

        let (early, late) = (reaction(message, 9, "👍"), reaction(message, 10, "👍"));
        let first = cataloger.handle_reaction(&early);
        let second = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cataloger.handle_reaction(&late).await
        };
        let (first, second) = tokio::join!(first, second);
        first.unwrap();
        second.unwrap();

        assert_eq!(store.tally(entry.id).unwrap(), Tally { up: 2, down: 0 });
        let card = mock.message(message).await.unwrap().embed.unwrap();
        assert_eq!(card.field_value(RATINGS_FIELD), Some("👍 2 👎 0"));
        let (_, last_edit) = mock.edits().await.pop().unwrap();
        assert_eq!(last_edit.field_value(RATINGS_FIELD), Some("👍 2 👎 0"));
    }

    #[tokio::test]
    async fn test_cancel_reaction_removes_vote() {
        let h = harness();
        let entry = published(&h).await;
        let message = card_message(&entry);

        h.cataloger
            .handle_reaction(&reaction(message, 9, "👎"))
            .await
            .unwrap();
        h.cataloger
            .handle_reaction(&reaction(message, 9, "❌"))
            .await
            .unwrap();

        assert_eq!(h.store.tally(entry.id).unwrap(), Tally::default());
    }

    #[tokio::test]
    async fn test_ignored_reactions() {
        let h = harness();
        let entry = published(&h).await;
        let message = card_message(&entry);

        let own = h
            .cataloger
            .handle_reaction(&reaction(message, BOT.get(), "👍"))
            .await
            .unwrap();
        assert_eq!(own, ReactionOutcome::Ignored);

        let mut elsewhere = reaction(message, 9, "👍");
        elsewhere.channel_id = COMMANDS;
        let outcome = h.cataloger.handle_reaction(&elsewhere).await.unwrap();
        assert_eq!(outcome, ReactionOutcome::Ignored);
        assert!(h.messenger.removed_reactions().await.is_empty());

        let foreign = h
            .cataloger
            .handle_reaction(&reaction(message, 9, "🎉"))
            .await
            .unwrap();
        assert_eq!(foreign, ReactionOutcome::Ignored);
        assert_eq!(h.messenger.removed_reactions().await.len(), 1);
        assert_eq!(h.store.rating_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_votes_lists_names_by_direction() {
        let h = harness();
        let bonk = h.store.insert(fixtures::bonk_quest()).unwrap();
        let other = h.store.insert(fixtures::named("Other Game")).unwrap();
        h.store.upsert(MOD, bonk.id, VoteDirection::Up).unwrap();
        h.store.upsert(MOD, other.id, VoteDirection::Down).unwrap();

        let reply = h
            .cataloger
            .execute(&moderator(), Command::Votes { member: None })
            .await
            .unwrap();
        assert_eq!(
            reply,
            "```Upvoted```\nBonk Quest\n```Downvoted```\nOther Game"
        );
    }

    #[tokio::test]
    async fn test_clean_leavers_refreshes_cards() {
        let h = harness();
        let entry = published(&h).await;
        h.store.upsert(UserId(9), entry.id, VoteDirection::Up).unwrap();
        h.store.upsert(UserId(10), entry.id, VoteDirection::Up).unwrap();

        let reply = h
            .cataloger
            .execute(
                &moderator(),
                Command::CleanLeavers {
                    membership: vec![MOD, UserId(10)],
                },
            )
            .await
            .unwrap();

        assert_eq!(reply, "1 leavers removed from the votes!");
        let card = h
            .messenger
            .message(card_message(&entry))
            .await
            .unwrap()
            .embed
            .unwrap();
        assert_eq!(card.field_value(RATINGS_FIELD), Some("👍 1 👎 0"));
    }

    #[tokio::test]
    async fn test_rebuild_republishes_everything() {
        let h = harness();
        let first = published(&h).await;
        h.store.insert(fixtures::named("Other Game")).unwrap();
        h.messenger.send_text(LISTED, "stray message").await.unwrap();

        let reply = h
            .cataloger
            .execute(&moderator(), Command::Rebuild)
            .await
            .unwrap();

        assert_eq!(reply, "Rebuilt 2 entries.");
        let cards = h.messenger.messages_in(LISTED).await;
        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|m| m.embed.is_some()));
        assert_ne!(h.store.get(first.id).unwrap().mirror, first.mirror);
    }

    #[tokio::test]
    async fn test_announce_posts_and_crossposts() {
        let h = harness();
        published(&h).await;

        let cataloger = h.cataloger.clone();
        let task =
            tokio::spawn(async move { cataloger.execute(&moderator(), Command::Announce).await });
        let hub = h.cataloger.wizard.hub().clone();
        deliver_reply(&hub, &reply("bq")).await;
        deliver_reply(&hub, &reply("http://x/devlog")).await;
        deliver_reply(&hub, &reply("Version 2")).await;

        assert_eq!(task.await.unwrap().unwrap(), "Announcement posted.");
        let posted = h.messenger.messages_in(ANNOUNCEMENTS).await;
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].content.as_deref(), Some("<@&55>"));
        assert!(posted[0].crossposted);
        let card = posted[0].embed.clone().unwrap();
        assert_eq!(card.title.as_deref(), Some("Bonk Quest: Version 2"));
        assert_eq!(card.url.as_deref(), Some("http://x/devlog"));
    }

    #[tokio::test]
    async fn test_top_is_a_stub() {
        let h = harness();
        let reply = h.cataloger.execute(&moderator(), Command::Top).await.unwrap();
        assert_eq!(reply, "Currently unimplemented.");
    }

    #[tokio::test]
    async fn test_messages_without_session_are_not_consumed() {
        let h = harness();
        assert!(!h.cataloger.handle_message(&reply("hello")));
    }
}
