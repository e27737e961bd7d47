//! Typed identifiers for game entities.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a game instance; the unit of isolation for resolution.
    GameId,
    "game"
);
id_type!(
    /// Identifier of a market sector.
    SectorId,
    "sector"
);
id_type!(
    /// Identifier of a company.
    CompanyId,
    "company"
);
id_type!(
    /// Identifier of a factory.
    FactoryId,
    "factory"
);
id_type!(
    /// Identifier of a marketing campaign.
    CampaignId,
    "campaign"
);
