//! Trait ports - interfaces the domain consumes, implemented by
//! infrastructure crates (or mocks in tests)

mod cache;
mod gateway;
mod ledger;
mod renderer;
mod repositories;

pub use cache::{CacheError, CacheResult, RemoteCache};
pub use gateway::{GatewayClient, GatewayError, GatewayResult, VoiceChannelMember};
pub use ledger::{CurrencyLedger, LedgerError, LedgerResult};
pub use renderer::{CardRenderer, ProfileCardData, RendererError};
pub use repositories::{
    CompetitionRepository, ModifierRepository, RepoResult, RewardRepository, UserXpRepository,
    XpSettingsRepository,
};
