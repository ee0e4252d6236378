pub mod access;
pub mod catalog;
pub mod cataloging;
pub mod config;
pub mod ledger;
pub mod messenger;
pub mod metrics;
pub mod mirror;
pub mod store;
pub mod testing;
pub mod wizard;

pub use access::{
    create_access_policy, create_relay_authenticator, AccessError, AccessPolicy, Invoker,
    RelayAuthenticator, RelayRequest,
};
pub use catalog::{CatalogEntry, CatalogStore, EntryFields, EntryId, MessageRef};
pub use cataloging::{
    CatalogingContext, CatalogingError, Cataloger, Command, CommandContext, ReactionOutcome,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, RelayAuthMethod,
    SanitizedConfig, StoreBackend,
};
pub use ledger::{RatingLedger, RatingRecord, Tally, VoteDirection};
pub use messenger::{
    ChannelId, DiscordMessenger, IncomingMessage, MessageId, Messenger, MessengerError,
    ReactionEvent, RoleId, UserId,
};
pub use mirror::{CardAuthor, MirrorChannels, MirrorError, MirrorPublisher, VoteReaction};
pub use store::{create_store, JsonStore, SqliteStore, Store, StoreError};
pub use wizard::{ReplyHub, Wizard, WizardError};
