//! Static troop metadata keyed by icon name.
//!
//! Icon templates are named after the troop they show (`knight.png`,
//! `field_dart_goblin.png`), so detections can be resolved to display names,
//! costs and traits through [`TroopCatalog::lookup`].

use crate::util::{BoardSightError, BoardSightResult};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Prefix carried by icons cropped from the battlefield.
const FIELD_PREFIX: &str = "field_";

/// Merge level (stars) of a troop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MergeLevel {
    OneStar = 1,
    TwoStar = 2,
    ThreeStar = 3,
    FourStar = 4,
}

impl MergeLevel {
    /// Returns the number of stars.
    pub fn stars(self) -> u8 {
        self as u8
    }

    /// Level for a star count in `1..=4`.
    pub fn from_stars(stars: u8) -> Option<Self> {
        match stars {
            1 => Some(Self::OneStar),
            2 => Some(Self::TwoStar),
            3 => Some(Self::ThreeStar),
            4 => Some(Self::FourStar),
            _ => None,
        }
    }
}

/// Troop trait (synergy class).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trait {
    Ace,
    Assassin,
    Avenger,
    Brawler,
    Clan,
    Goblin,
    Juggernaut,
    Noble,
    Ranger,
    Thrower,
    Undead,
}

impl Trait {
    /// All traits in declaration order.
    pub const ALL: [Trait; 11] = [
        Trait::Ace,
        Trait::Assassin,
        Trait::Avenger,
        Trait::Brawler,
        Trait::Clan,
        Trait::Goblin,
        Trait::Juggernaut,
        Trait::Noble,
        Trait::Ranger,
        Trait::Thrower,
        Trait::Undead,
    ];

    /// Returns the upper-case trait name.
    pub fn name(self) -> &'static str {
        match self {
            Trait::Ace => "ACE",
            Trait::Assassin => "ASSASSIN",
            Trait::Avenger => "AVENGER",
            Trait::Brawler => "BRAWLER",
            Trait::Clan => "CLAN",
            Trait::Goblin => "GOBLIN",
            Trait::Juggernaut => "JUGGERNAUT",
            Trait::Noble => "NOBLE",
            Trait::Ranger => "RANGER",
            Trait::Thrower => "THROWER",
            Trait::Undead => "UNDEAD",
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trait {
    type Err = BoardSightError;

    fn from_str(s: &str) -> BoardSightResult<Self> {
        Trait::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(BoardSightError::InvalidConfig {
                reason: "unknown trait name",
            })
    }
}

/// One troop definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Troop {
    /// Normalized lookup key (`spear_goblin`).
    pub key: &'static str,
    /// Display name (`Spear Goblin`).
    pub name: &'static str,
    /// Elixir cost.
    pub cost: u8,
    pub stars: MergeLevel,
    pub traits: &'static [Trait],
}

impl Troop {
    const fn base(
        key: &'static str,
        name: &'static str,
        cost: u8,
        traits: &'static [Trait],
    ) -> Self {
        Self {
            key,
            name,
            cost,
            stars: MergeLevel::OneStar,
            traits,
        }
    }

    /// Returns true if the troop carries `t`.
    pub fn has_trait(&self, t: Trait) -> bool {
        self.traits.contains(&t)
    }
}

impl fmt::Display for Troop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} elixir, {} star)",
            self.name,
            self.cost,
            self.stars.stars()
        )
    }
}

const STANDARD_TROOPS: [Troop; 20] = {
    use Trait::*;
    [
        Troop::base("archer", "Archer", 2, &[Clan, Ranger]),
        Troop::base("barbarian", "Barbarian", 2, &[Brawler, Clan]),
        Troop::base("bomber", "Bomber", 2, &[Thrower, Undead]),
        Troop::base("goblin", "Goblin", 2, &[Goblin, Assassin]),
        Troop::base("knight", "Knight", 2, &[Noble, Juggernaut]),
        Troop::base("spear_goblin", "Spear Goblin", 2, &[Thrower, Goblin]),
        Troop::base("giant_skeleton", "Giant Skeleton", 3, &[Brawler, Undead]),
        Troop::base("valkyrie", "Valkyrie", 3, &[Clan, Avenger]),
        Troop::base("pekka", "P.E.K.K.A", 3, &[Juggernaut, Ace]),
        Troop::base("prince", "Prince", 3, &[Noble, Brawler]),
        Troop::base("dart_goblin", "Dart Goblin", 3, &[Ranger, Goblin]),
        Troop::base("executioner", "Executioner", 3, &[Thrower, Ace]),
        Troop::base("goblin_machine", "Goblin Machine", 4, &[Juggernaut, Goblin]),
        Troop::base("princess", "Princess", 4, &[Ranger, Noble]),
        Troop::base("bandit", "Bandit", 4, &[Ace, Avenger]),
        Troop::base("royal_ghost", "Royal Ghost", 4, &[Undead, Assassin]),
        Troop::base("mega_knight", "Mega Knight", 4, &[Brawler, Ace]),
        Troop::base("archer_queen", "Archer Queen", 5, &[Clan, Avenger]),
        Troop::base("skeleton_king", "Skeleton King", 5, &[Undead, Juggernaut]),
        Troop::base("golden_knight", "Golden Knight", 5, &[Noble, Assassin]),
    ]
};

/// Normalizes an icon or display name to a catalog key.
///
/// Lower-cases, turns spaces into underscores, drops dots and strips the
/// battlefield icon prefix, so `"P.E.K.K.A"` and `"field_pekka"` both give
/// `"pekka"`.
pub fn normalize_name(name: &str) -> String {
    let key: String = name
        .trim()
        .chars()
        .filter(|c| *c != '.')
        .map(|c| if c == ' ' { '_' } else { c.to_ascii_lowercase() })
        .collect();
    match key.strip_prefix(FIELD_PREFIX) {
        Some(rest) => rest.to_string(),
        None => key,
    }
}

/// Immutable troop catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct TroopCatalog {
    troops: Vec<Troop>,
}

impl TroopCatalog {
    /// The built-in roster, built on first use and shared afterwards.
    pub fn standard() -> &'static TroopCatalog {
        static STANDARD: OnceLock<TroopCatalog> = OnceLock::new();
        STANDARD.get_or_init(|| TroopCatalog {
            troops: STANDARD_TROOPS.to_vec(),
        })
    }

    /// Creates a catalog from custom definitions.
    pub fn from_troops(troops: Vec<Troop>) -> Self {
        Self { troops }
    }

    /// Returns the number of troops.
    pub fn len(&self) -> usize {
        self.troops.len()
    }

    /// Returns true if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.troops.is_empty()
    }

    /// Finds a troop by icon name or display name.
    pub fn lookup(&self, name: &str) -> Option<&Troop> {
        let key = normalize_name(name);
        self.troops.iter().find(|t| t.key == key)
    }

    /// Display name for an icon, falling back to the normalized icon name.
    pub fn display_name(&self, icon_name: &str) -> String {
        match self.lookup(icon_name) {
            Some(troop) => troop.name.to_string(),
            None => normalize_name(icon_name),
        }
    }

    /// Troops costing `cost` elixir, in catalog order.
    pub fn by_cost(&self, cost: u8) -> Vec<&Troop> {
        self.troops.iter().filter(|t| t.cost == cost).collect()
    }

    /// Troops at merge level `stars`, in catalog order.
    pub fn by_stars(&self, stars: MergeLevel) -> Vec<&Troop> {
        self.troops.iter().filter(|t| t.stars == stars).collect()
    }

    /// Troops carrying `t`, in catalog order.
    pub fn with_trait(&self, t: Trait) -> Vec<&Troop> {
        self.troops.iter().filter(|troop| troop.has_trait(t)).collect()
    }

    /// All troops sorted by cost, then display name.
    pub fn all(&self) -> Vec<&Troop> {
        let mut troops: Vec<&Troop> = self.troops.iter().collect();
        troops.sort_by(|a, b| a.cost.cmp(&b.cost).then_with(|| a.name.cmp(b.name)));
        troops
    }

    /// Copy of the named troop at merge level `stars`; the catalog is unchanged.
    pub fn upgraded(&self, name: &str, stars: MergeLevel) -> Option<Troop> {
        self.lookup(name).map(|troop| Troop { stars, ..*troop })
    }
}
